use super::domain::Policy;
use crate::dates::creation_date_key;

/// Picks the month that anchors a customer's renewal cycle.
///
/// Majority vote over non-empty renewal months. Ties go to the policy with
/// the earliest creation date, then to the highest premium, then to the
/// first candidate in input order.
pub fn main_renewal_month<'a, I>(policies: I) -> String
where
    I: IntoIterator<Item = &'a Policy>,
{
    let dated: Vec<&Policy> = policies
        .into_iter()
        .filter(|policy| !policy.renewal_month.trim().is_empty())
        .collect();

    match dated.as_slice() {
        [] => return String::new(),
        [only] => return only.renewal_month.clone(),
        _ => {}
    }

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for policy in &dated {
        match counts
            .iter_mut()
            .find(|(month, _)| *month == policy.renewal_month)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((policy.renewal_month.as_str(), 1)),
        }
    }

    let top = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let tied: Vec<&str> = counts
        .iter()
        .filter(|(_, count)| *count == top)
        .map(|(month, _)| *month)
        .collect();

    if let [single] = tied.as_slice() {
        return (*single).to_string();
    }

    let candidates: Vec<&Policy> = dated
        .iter()
        .copied()
        .filter(|policy| tied.contains(&policy.renewal_month.as_str()))
        .collect();

    let with_creation: Vec<&Policy> = candidates
        .iter()
        .copied()
        .filter(|policy| !policy.details.creation_date.trim().is_empty())
        .collect();

    let pool = match with_creation
        .iter()
        .min_by_key(|policy| creation_date_key(&policy.details.creation_date))
    {
        Some(earliest) => {
            let earliest_date = earliest.details.creation_date.as_str();
            let earliest_group: Vec<&Policy> = with_creation
                .iter()
                .copied()
                .filter(|policy| policy.details.creation_date == earliest_date)
                .collect();
            if let [single] = earliest_group.as_slice() {
                return single.renewal_month.clone();
            }
            earliest_group
        }
        None => candidates.clone(),
    };

    highest_premium(&pool)
        .or_else(|| candidates.first().copied())
        .map(|policy| policy.renewal_month.clone())
        .unwrap_or_default()
}

/// First policy carrying the maximum premium.
fn highest_premium<'a>(policies: &[&'a Policy]) -> Option<&'a Policy> {
    let mut best: Option<&'a Policy> = None;
    for &policy in policies {
        match best {
            Some(current) if policy.annual_premium <= current.annual_premium => {}
            _ => best = Some(policy),
        }
    }
    best
}
