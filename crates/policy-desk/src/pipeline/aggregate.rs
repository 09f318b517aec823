use super::consent::MarketingConsentLookup;
use super::domain::{AxaDetails, Policy, SourceCategory};
use super::identity::ResolvedIdentity;
use super::renewal::main_renewal_month;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A normalized policy together with the identity it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPolicy {
    pub policy: Policy,
    pub identity: ResolvedIdentity,
}

impl ResolvedPolicy {
    /// Canonical id, or the lower-cased name when no id was found.
    pub fn grouping_key(&self) -> &str {
        if self.identity.canonical_id.is_empty() {
            &self.policy.customer_name
        } else {
            &self.identity.canonical_id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkArea {
    pub area: String,
    pub employees: f64,
}

/// Policy as it appears in the customer dataset. Work-injury rows sharing
/// a policy number arrive here already merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedPolicy {
    pub policy_number: String,
    pub product: String,
    pub annual_premium: f64,
    #[serde(rename = "renewal_date")]
    pub renewal_month: String,
    pub payment_frequency: String,
    pub reg_nr: String,
    pub case_handler: String,
    pub status: String,
    pub work_area: String,
    pub db_code: String,
    pub number_of_employees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_areas: Option<Vec<WorkArea>>,
    #[serde(flatten)]
    pub details: AxaDetails,
}

impl ConsolidatedPolicy {
    fn single(policy: &Policy) -> Self {
        Self {
            policy_number: policy.policy_number.clone(),
            product: policy.product.clone(),
            annual_premium: policy.annual_premium,
            renewal_month: policy.renewal_month.clone(),
            payment_frequency: policy.payment_frequency.clone(),
            reg_nr: policy.reg_nr.clone(),
            case_handler: policy.case_handler.clone(),
            status: policy.status.clone(),
            work_area: policy.work_area.clone(),
            db_code: policy.db_code.clone(),
            number_of_employees: policy.number_of_employees,
            work_areas: None,
            details: policy.details.clone(),
        }
    }

    /// Merges work-injury rows: premiums and employee counts are summed and
    /// every row contributes one work-area entry. The first row supplies the
    /// remaining fields.
    fn merged(rows: &[&Policy]) -> Option<Self> {
        let base = rows.first()?;
        let work_areas: Vec<WorkArea> = rows
            .iter()
            .map(|policy| WorkArea {
                area: policy.work_area.clone(),
                employees: policy.number_of_employees.unwrap_or(0.0),
            })
            .collect();
        let premium: f64 = rows.iter().map(|policy| policy.annual_premium).sum();
        let employees: f64 = work_areas.iter().map(|area| area.employees).sum();

        let mut merged = Self::single(base);
        merged.annual_premium = premium.round();
        merged.work_area = String::new();
        merged.number_of_employees = Some(employees);
        merged.work_areas = Some(work_areas);
        Some(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(rename = "cvr_cpr")]
    pub canonical_id: String,
    #[serde(rename = "formatted_name")]
    pub display_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub marketing_consent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub total_policies: usize,
    pub total_annual_premium: f64,
    #[serde(rename = "main_renewal_date")]
    pub main_renewal_month: String,
    pub most_common_case_handler: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_name: String,
    pub customer_details: CustomerDetails,
    pub summary: CustomerSummary,
    pub policies: Vec<ConsolidatedPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub axa_policies: usize,
    pub naersikring_policies: usize,
    pub ulykke_policies: usize,
}

impl ProcessingSummary {
    pub fn from_policies<'a, I>(policies: I) -> Self
    where
        I: IntoIterator<Item = &'a Policy>,
    {
        let mut summary = Self::default();
        for policy in policies {
            match policy.source {
                SourceCategory::Axa => summary.axa_policies += 1,
                SourceCategory::Naersikring => summary.naersikring_policies += 1,
                SourceCategory::AccidentHealth => summary.ulykke_policies += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub total_customers: usize,
    pub total_policies: usize,
    pub export_date: DateTime<Utc>,
    pub processing_summary: ProcessingSummary,
}

/// The persisted customer dataset consumed by reporting and mail tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDataset {
    pub customers: Vec<Customer>,
    pub metadata: DatasetMetadata,
}

/// Flat per-policy view used by table exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyRow {
    pub cvr_cpr: String,
    pub customer_name: String,
    pub formatted_name: String,
    pub address: String,
    pub policy_number: String,
    pub customer_policy_count: usize,
    pub product: String,
    pub annual_premium: f64,
    pub renewal_month: String,
    pub customer_renewal_month: String,
    pub payment_frequency: String,
    pub reg_nr: String,
    pub case_handler: String,
    pub status: String,
    pub work_area: String,
    pub db_code: String,
    pub number_of_employees: Option<f64>,
    pub phone: String,
    pub email: String,
    #[serde(flatten)]
    pub details: AxaDetails,
}

/// Groups resolved policies into customers.
pub struct PolicyAggregator<'a> {
    consent: &'a MarketingConsentLookup,
}

impl<'a> PolicyAggregator<'a> {
    pub fn new(consent: &'a MarketingConsentLookup) -> Self {
        Self { consent }
    }

    /// Customers sorted by total premium, highest first. Customers with the
    /// same total keep first-seen order.
    pub fn aggregate(&self, policies: &[ResolvedPolicy]) -> Vec<Customer> {
        let mut customers: Vec<Customer> = group_by_customer(policies)
            .into_iter()
            .filter_map(|group| self.build_customer(&group))
            .collect();

        customers.sort_by(|a, b| {
            b.summary
                .total_annual_premium
                .total_cmp(&a.summary.total_annual_premium)
        });
        customers
    }

    fn build_customer(&self, group: &[&ResolvedPolicy]) -> Option<Customer> {
        let first = group.first()?;
        let raw: Vec<&Policy> = group.iter().map(|resolved| &resolved.policy).collect();

        let policies = consolidate(&raw);
        let total_annual_premium = policies
            .iter()
            .map(|policy| policy.annual_premium)
            .sum::<f64>()
            .round();

        let identity = &first.identity;
        Some(Customer {
            customer_name: first.policy.customer_name.clone(),
            customer_details: CustomerDetails {
                canonical_id: identity.canonical_id.clone(),
                display_name: identity.display_name.clone(),
                address: identity.address.clone(),
                phone: identity.phone.clone(),
                email: identity.email.clone(),
                marketing_consent: self
                    .consent
                    .consent_for(&identity.canonical_id, &identity.display_name),
            },
            summary: CustomerSummary {
                total_policies: policies.len(),
                total_annual_premium,
                main_renewal_month: main_renewal_month(raw.iter().copied()),
                most_common_case_handler: most_common_case_handler(&raw),
            },
            policies,
        })
    }
}

/// Drops inactive and not-yet-started policies.
pub fn retain_active(policies: Vec<Policy>) -> Vec<Policy> {
    policies
        .into_iter()
        .filter(|policy| !policy.is_excluded_status())
        .collect()
}

/// Flat rows in input order, each carrying its customer's policy count and
/// main renewal month.
pub fn policy_rows(policies: &[ResolvedPolicy]) -> Vec<PolicyRow> {
    let groups = group_by_customer(policies);
    let mut per_customer: HashMap<&str, (usize, String)> = HashMap::new();
    for group in &groups {
        if let Some(first) = group.first() {
            let month = main_renewal_month(group.iter().map(|resolved| &resolved.policy));
            per_customer.insert(first.grouping_key(), (group.len(), month));
        }
    }

    policies
        .iter()
        .filter(|resolved| !resolved.policy.is_excluded_status())
        .map(|resolved| {
            let (count, month) = per_customer
                .get(resolved.grouping_key())
                .cloned()
                .unwrap_or((1, String::new()));
            let policy = &resolved.policy;
            PolicyRow {
                cvr_cpr: resolved.identity.canonical_id.clone(),
                customer_name: policy.customer_name.clone(),
                formatted_name: resolved.identity.display_name.clone(),
                address: resolved.identity.address.clone(),
                policy_number: policy.policy_number.clone(),
                customer_policy_count: count,
                product: policy.product.clone(),
                annual_premium: policy.annual_premium,
                renewal_month: policy.renewal_month.clone(),
                customer_renewal_month: month,
                payment_frequency: policy.payment_frequency.clone(),
                reg_nr: policy.reg_nr.clone(),
                case_handler: policy.case_handler.clone(),
                status: policy.status.clone(),
                work_area: policy.work_area.clone(),
                db_code: policy.db_code.clone(),
                number_of_employees: policy.number_of_employees,
                phone: resolved.identity.phone.clone(),
                email: resolved.identity.email.clone(),
                details: policy.details.clone(),
            }
        })
        .collect()
}

/// First-seen ordered groups of active policies.
fn group_by_customer(policies: &[ResolvedPolicy]) -> Vec<Vec<&ResolvedPolicy>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&ResolvedPolicy>> = Vec::new();

    for resolved in policies {
        if resolved.policy.is_excluded_status() {
            continue;
        }
        let key = resolved.grouping_key();
        match index.get(key) {
            Some(position) => groups[*position].push(resolved),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![resolved]);
            }
        }
    }

    groups
}

/// Non work-injury policies first, in input order, followed by one merged
/// record per work-injury policy number.
fn consolidate(policies: &[&Policy]) -> Vec<ConsolidatedPolicy> {
    let mut output = Vec::new();
    let mut work_injury_order: Vec<&str> = Vec::new();
    let mut work_injury_groups: HashMap<&str, Vec<&Policy>> = HashMap::new();

    for &policy in policies {
        if policy.is_work_injury() {
            let key = policy.policy_number.as_str();
            let rows = work_injury_groups.entry(key).or_default();
            if rows.is_empty() {
                work_injury_order.push(key);
            }
            rows.push(policy);
        } else {
            output.push(ConsolidatedPolicy::single(policy));
        }
    }

    for key in work_injury_order {
        if let Some(merged) = work_injury_groups
            .get(key)
            .and_then(|rows| ConsolidatedPolicy::merged(rows))
        {
            output.push(merged);
        }
    }

    output
}

/// Mode of the case handler; blank handlers count as `unknown` and ties go
/// to the handler seen first.
fn most_common_case_handler(policies: &[&Policy]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for policy in policies {
        let handler = match policy.case_handler.trim() {
            "" => "unknown",
            _ => policy.case_handler.as_str(),
        };
        match counts.iter_mut().find(|(name, _)| *name == handler) {
            Some((_, count)) => *count += 1,
            None => counts.push((handler, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (handler, count) in counts {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((handler, count)),
        }
    }
    best.map(|(handler, _)| handler.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::WORK_INJURY_PRODUCT;

    fn resolved(name: &str, id: &str, product: &str, premium: f64) -> ResolvedPolicy {
        let mut policy = Policy::new(SourceCategory::Axa);
        policy.customer_name = name.to_lowercase();
        policy.customer_name_original = name.to_string();
        policy.product = product.to_string();
        policy.annual_premium = premium;
        policy.status = "Active".to_string();
        ResolvedPolicy {
            identity: ResolvedIdentity {
                canonical_id: id.to_string(),
                display_name: name.to_string(),
                ..ResolvedIdentity::default()
            },
            policy,
        }
    }

    fn work_injury(area: &str, employees: f64, premium: f64) -> ResolvedPolicy {
        let mut row = resolved("Tømrer Jensen", "12345678", WORK_INJURY_PRODUCT, premium);
        row.policy.source = SourceCategory::Naersikring;
        row.policy.policy_number = "N-1".to_string();
        row.policy.work_area = area.to_string();
        row.policy.number_of_employees = Some(employees);
        row
    }

    #[test]
    fn work_injury_rows_merge_per_policy_number() {
        let consent = MarketingConsentLookup::default();
        let customers = PolicyAggregator::new(&consent).aggregate(&[
            work_injury("Produktion", 5.0, 1000.0),
            work_injury("Kontor", 3.0, 1500.0),
            work_injury("Lager", 2.0, 800.0),
        ]);

        assert_eq!(customers.len(), 1);
        let customer = &customers[0];
        assert_eq!(customer.summary.total_policies, 1);
        assert_eq!(customer.summary.total_annual_premium, 3300.0);
        let policy = &customer.policies[0];
        assert_eq!(policy.annual_premium, 3300.0);
        assert_eq!(policy.number_of_employees, Some(10.0));
        assert_eq!(policy.work_area, "");
        let areas = policy.work_areas.as_ref().expect("merged record lists work areas");
        assert_eq!(areas.len(), 3);
        assert_eq!(areas[1], WorkArea { area: "Kontor".to_string(), employees: 3.0 });
    }

    #[test]
    fn missing_employee_counts_sum_as_zero() {
        let mut unknown = work_injury("", 0.0, 400.0);
        unknown.policy.number_of_employees = None;
        let consent = MarketingConsentLookup::default();
        let customers =
            PolicyAggregator::new(&consent).aggregate(&[work_injury("Kontor", 2.5, 100.0), unknown]);
        let policy = &customers[0].policies[0];
        assert_eq!(policy.number_of_employees, Some(2.5));
        assert_eq!(policy.work_areas.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn other_products_precede_merged_work_injury() {
        let consent = MarketingConsentLookup::default();
        let customers = PolicyAggregator::new(&consent).aggregate(&[
            work_injury("Kontor", 1.0, 100.0),
            resolved("Tømrer Jensen", "12345678", "Bilforsikring", 200.0),
        ]);
        let products: Vec<&str> = customers[0]
            .policies
            .iter()
            .map(|policy| policy.product.as_str())
            .collect();
        assert_eq!(products, vec!["Bilforsikring", WORK_INJURY_PRODUCT]);
        assert_eq!(customers[0].summary.total_annual_premium, 300.0);
    }

    #[test]
    fn inactive_and_new_policies_are_dropped() {
        let mut inactive = resolved("Gammel Kunde", "11111111", "Bygning", 5000.0);
        inactive.policy.status = "INACTIVE".to_string();
        let mut pending = resolved("Bager ApS", "22222222", "Bygning", 700.0);
        pending.policy.status = "new".to_string();
        let active = resolved("Bager ApS", "22222222", "Løsøre", 300.0);

        let consent = MarketingConsentLookup::default();
        let customers = PolicyAggregator::new(&consent).aggregate(&[inactive, pending, active]);
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].summary.total_policies, 1);
        assert_eq!(customers[0].summary.total_annual_premium, 300.0);
    }

    #[test]
    fn customers_sort_by_premium_descending() {
        let consent = MarketingConsentLookup::default();
        let customers = PolicyAggregator::new(&consent).aggregate(&[
            resolved("Lille", "1", "Bygning", 100.0),
            resolved("Stor", "2", "Bygning", 900.0),
            resolved("Mellem", "3", "Bygning", 500.0),
            resolved("Lille", "1", "Løsøre", 50.0),
        ]);
        let totals: Vec<f64> = customers
            .iter()
            .map(|customer| customer.summary.total_annual_premium)
            .collect();
        assert_eq!(totals, vec![900.0, 500.0, 150.0]);
    }

    #[test]
    fn unresolved_customers_group_by_name() {
        let consent = MarketingConsentLookup::default();
        let customers = PolicyAggregator::new(&consent).aggregate(&[
            resolved("Uden Id", "", "Bygning", 100.0),
            resolved("Uden Id", "", "Løsøre", 100.0),
        ]);
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].customer_details.canonical_id, "");
        assert_eq!(customers[0].customer_name, "uden id");
    }

    #[test]
    fn case_handler_mode_prefers_first_on_ties() {
        let mut a = resolved("Kunde", "1", "Bygning", 1.0);
        a.policy.case_handler = "rovi_lb".to_string();
        let mut b = resolved("Kunde", "1", "Løsøre", 1.0);
        b.policy.case_handler = "flfa_lb".to_string();
        let c = resolved("Kunde", "1", "Bil", 1.0);

        let consent = MarketingConsentLookup::default();
        let customers = PolicyAggregator::new(&consent).aggregate(&[a, b, c]);
        assert_eq!(customers[0].summary.most_common_case_handler, "rovi_lb");
    }

    #[test]
    fn consent_is_looked_up_by_id_then_name() {
        let mut consent = MarketingConsentLookup::default();
        consent.insert("uden id", true);
        let customers = PolicyAggregator::new(&consent)
            .aggregate(&[resolved("Uden Id", "", "Bygning", 100.0)]);
        assert!(customers[0].customer_details.marketing_consent);
    }

    #[test]
    fn policy_rows_carry_customer_context() {
        let mut first = resolved("Kunde", "1", "Bygning", 100.0);
        first.policy.renewal_month = "Marts".to_string();
        let mut second = resolved("Kunde", "1", "Løsøre", 100.0);
        second.policy.renewal_month = "Marts".to_string();
        let rows = policy_rows(&[first, second]);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.customer_policy_count == 2));
        assert!(rows.iter().all(|row| row.customer_renewal_month == "Marts"));
    }

    #[test]
    fn serialized_customers_use_dataset_field_names() {
        let consent = MarketingConsentLookup::default();
        let customers =
            PolicyAggregator::new(&consent).aggregate(&[work_injury("Kontor", 1.0, 100.0)]);
        let value = serde_json::to_value(&customers[0]).expect("customer serializes");
        assert_eq!(value["customer_details"]["cvr_cpr"], "12345678");
        assert_eq!(value["customer_details"]["formatted_name"], "Tømrer Jensen");
        assert_eq!(value["summary"]["main_renewal_date"], "");
        assert_eq!(value["policies"][0]["work_areas"][0]["area"], "Kontor");
        assert!(value["policies"][0].get("seller").is_some());
    }
}
