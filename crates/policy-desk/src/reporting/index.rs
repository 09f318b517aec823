use super::filters::OfferFilter;
use super::labels::{advisor_code, product_label};
use super::offers::{Company, OfferDataset, OfferRecord};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OfferOutcome {
    Converted,
    NonConverted,
    Rejected,
}

/// An offer with every derived attribute the reports need resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedOffer {
    pub outcome: OfferOutcome,
    pub sales_date: Option<NaiveDate>,
    pub company: Option<Company>,
    pub product: String,
    pub advisor: String,
    pub premium: f64,
    pub positive_premium: Option<f64>,
    pub customer: Option<String>,
    is_work_injury: bool,
    passes_migrated_filter: bool,
}

impl IndexedOffer {
    fn new(outcome: OfferOutcome, record: &OfferRecord) -> Self {
        Self {
            outcome,
            sales_date: record.sales_date(),
            company: record.company(),
            product: product_label(&record.master_product_name),
            advisor: advisor_code(&record.case_handler),
            premium: record.premium(),
            positive_premium: record.positive_premium(),
            customer: record.customer_identifier(),
            is_work_injury: record.product == crate::pipeline::WORK_INJURY_PRODUCT,
            passes_migrated_filter: record.passes_migrated_filter(true),
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.sales_date.map(|date| date.year())
    }

    pub fn month(&self) -> Option<u32> {
        self.sales_date.map(|date| date.month())
    }

    pub fn is_work_injury(&self) -> bool {
        self.is_work_injury
    }

    /// Segment, migrated flag and advisor checks. Time checks are separate
    /// because some statistics look beyond the selected period.
    pub fn matches_scope(&self, filter: &OfferFilter) -> bool {
        if !filter.segment.includes(self.company) {
            return false;
        }
        if filter.exclude_migrated && !self.passes_migrated_filter {
            return false;
        }
        match &filter.advisor {
            Some(advisor) => &self.advisor == advisor,
            None => true,
        }
    }

    /// Offers without a readable sales date never match a year or month.
    pub fn matches_period(&self, filter: &OfferFilter) -> bool {
        if let Some(year) = filter.year {
            if self.year() != Some(year) {
                return false;
            }
        }
        if let Some(month) = filter.month {
            if self.month() != Some(month) {
                return false;
            }
        }
        true
    }

    pub fn matches(&self, filter: &OfferFilter) -> bool {
        self.matches_scope(filter) && self.matches_period(filter)
    }
}

/// Single pass over the offer dataset shared by every statistic of a render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferIndex {
    entries: Vec<IndexedOffer>,
}

impl OfferIndex {
    pub fn build(dataset: &OfferDataset) -> Self {
        let collections = [
            (OfferOutcome::Converted, &dataset.converted),
            (OfferOutcome::NonConverted, &dataset.non_converted),
            (OfferOutcome::Rejected, &dataset.rejected),
        ];

        let entries: Vec<IndexedOffer> = collections
            .into_iter()
            .flat_map(|(outcome, records)| {
                records.iter().map(move |record| IndexedOffer::new(outcome, record))
            })
            .collect();

        let undated = entries.iter().filter(|entry| entry.sales_date.is_none()).count();
        tracing::debug!(offers = entries.len(), undated, "built offer index");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexedOffer] {
        &self.entries
    }

    pub fn select<'a>(&'a self, filter: &'a OfferFilter) -> impl Iterator<Item = &'a IndexedOffer> + 'a {
        self.entries.iter().filter(move |entry| entry.matches(filter))
    }

    /// Premium per calendar month (index 0 = January) for converted offers.
    pub fn monthly_converted_premium(&self, filter: &OfferFilter) -> [f64; 12] {
        let mut months = [0.0; 12];
        for entry in self.select(filter) {
            if entry.outcome != OfferOutcome::Converted {
                continue;
            }
            if let Some(month) = entry.month() {
                months[(month - 1) as usize] += entry.premium;
            }
        }
        months
    }

    /// Years that have at least one dated offer, newest first.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.entries.iter().filter_map(IndexedOffer::year).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rows::CellValue;
    use crate::reporting::filters::CompanySegment;

    fn record(master: &str, date: &str, premium: f64, handler: &str) -> OfferRecord {
        OfferRecord {
            master_product_name: master.to_string(),
            conversion_date: date.to_string(),
            annual_premium: CellValue::Number(premium),
            case_handler: handler.to_string(),
            ..OfferRecord::default()
        }
    }

    fn dataset() -> OfferDataset {
        OfferDataset {
            converted: vec![
                record("HDI - Netbankforsikring", "2025-01-15", 1000.0, "flfa_lb"),
                record("HDI - Foo - MIG PROD", "2025-01-20", 500.0, "flfa_lb"),
                record("LB Master Bil - Pakke", "2025-03-02", 700.0, "Kevin Fitzgerald 2"),
                record("LB Master Bil - Pakke", "", 300.0, "kevfit"),
            ],
            non_converted: vec![record("HDI - Netbankforsikring", "2025-01-05", 900.0, "flfa_lb")],
            rejected: Vec::new(),
        }
    }

    #[test]
    fn index_resolves_derived_attributes() {
        let index = OfferIndex::build(&dataset());
        assert_eq!(index.len(), 5);
        let third = &index.entries()[2];
        assert_eq!(third.advisor, "kevfit");
        assert_eq!(third.product, "Bilforsikring");
        assert_eq!(third.company, Some(Company::Axa));
        assert_eq!(index.entries()[4].outcome, OfferOutcome::NonConverted);
    }

    #[test]
    fn monthly_premium_skips_undated_and_filtered() {
        let index = OfferIndex::build(&dataset());
        let all = OfferFilter::for_segment(CompanySegment::All, false).in_year(2025);
        let months = index.monthly_converted_premium(&all);
        assert_eq!(months[0], 1500.0);
        assert_eq!(months[2], 700.0);
        assert_eq!(months.iter().sum::<f64>(), 2200.0);

        let hdi_current = OfferFilter::for_segment(CompanySegment::Hdi, true).in_year(2025);
        assert_eq!(index.monthly_converted_premium(&hdi_current)[0], 1000.0);
    }

    #[test]
    fn malformed_dates_leave_offers_undated() {
        let mut dataset = dataset();
        dataset.converted.push(record("HDI - Netbankforsikring", "1e20", 400.0, "flfa_lb"));
        dataset.converted.push(record("HDI - Netbankforsikring", "99999999999999999999", 100.0, "flfa_lb"));

        let index = OfferIndex::build(&dataset);
        assert_eq!(index.len(), 7);
        assert_eq!(index.entries()[4].sales_date, None);
        assert_eq!(index.entries()[5].sales_date, None);

        let all = OfferFilter::for_segment(CompanySegment::All, false).in_year(2025);
        assert_eq!(index.monthly_converted_premium(&all).iter().sum::<f64>(), 2200.0);
    }

    #[test]
    fn advisor_scope_uses_mapped_codes() {
        let index = OfferIndex::build(&dataset());
        let filter = OfferFilter::default().for_advisor("kevfit");
        assert_eq!(index.select(&filter).count(), 2);
        assert_eq!(index.years(), vec![2025]);
    }
}
