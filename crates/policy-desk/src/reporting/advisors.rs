use super::filters::{CompanySegment, OfferFilter};
use super::index::{IndexedOffer, OfferIndex, OfferOutcome};
use super::labels::{is_rostered, ADVISOR_ROSTER, OTHER_ADVISORS};
use super::products::{ProductReport, ProductSort};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SalesCell {
    pub count: usize,
    pub premium: f64,
}

impl SalesCell {
    fn add(&mut self, premium: f64) {
        self.count += 1;
        self.premium += premium;
    }
}

/// One month of the advisor table. `cells` follows `AdvisorMonthTable::columns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorMonthRow {
    pub month: u32,
    pub cells: Vec<SalesCell>,
    pub total: f64,
}

/// Converted premium per month and advisor, with unrostered handlers pooled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorMonthTable {
    pub segment: CompanySegment,
    pub year: i32,
    pub columns: Vec<String>,
    pub rows: Vec<AdvisorMonthRow>,
    pub column_totals: Vec<f64>,
    pub grand_total: f64,
}

fn column_for(advisor: &str) -> usize {
    ADVISOR_ROSTER
        .iter()
        .position(|code| *code == advisor)
        .unwrap_or(ADVISOR_ROSTER.len())
}

impl AdvisorMonthTable {
    pub fn build(index: &OfferIndex, segment: CompanySegment, exclude_migrated: bool, year: i32) -> Self {
        let mut columns: Vec<String> = ADVISOR_ROSTER.iter().map(|code| code.to_string()).collect();
        columns.push(OTHER_ADVISORS.to_string());

        let mut grid = vec![vec![SalesCell::default(); columns.len()]; 12];
        let filter = OfferFilter::for_segment(segment, exclude_migrated).in_year(year);
        for entry in index.select(&filter) {
            if entry.outcome != OfferOutcome::Converted {
                continue;
            }
            let Some(month) = entry.month() else { continue };
            grid[(month - 1) as usize][column_for(&entry.advisor)].add(entry.premium);
        }

        let mut column_totals = vec![0.0; columns.len()];
        let rows: Vec<AdvisorMonthRow> = grid
            .into_iter()
            .zip(1..=12u32)
            .map(|(cells, month)| {
                for (total, cell) in column_totals.iter_mut().zip(&cells) {
                    *total += cell.premium;
                }
                AdvisorMonthRow {
                    month,
                    total: cells.iter().map(|cell| cell.premium).sum(),
                    cells,
                }
            })
            .collect();
        let grand_total = column_totals.iter().sum();

        Self {
            segment,
            year,
            columns,
            rows,
            column_totals,
            grand_total,
        }
    }
}

/// Monthly converted premium for a single advisor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorSalesSeries {
    pub advisor: String,
    pub year: i32,
    pub monthly_premium: [f64; 12],
    pub total_sales: f64,
    pub avg_monthly_sales: f64,
    /// First month holding the highest total, absent when nothing sold.
    pub best_month: Option<u32>,
}

impl AdvisorSalesSeries {
    pub fn build(
        index: &OfferIndex,
        advisor: &str,
        segment: CompanySegment,
        exclude_migrated: bool,
        year: i32,
    ) -> Self {
        let filter = OfferFilter::for_segment(segment, exclude_migrated)
            .in_year(year)
            .for_advisor(advisor);
        let monthly_premium = index.monthly_converted_premium(&filter);

        let total_sales: f64 = monthly_premium.iter().sum();
        let months_with_sales = monthly_premium.iter().filter(|value| **value > 0.0).count();
        let avg_monthly_sales = if months_with_sales > 0 {
            total_sales / months_with_sales as f64
        } else {
            0.0
        };

        let mut best_month = None;
        let mut best = 0.0;
        for (month, premium) in (1..=12u32).zip(monthly_premium) {
            if premium > best {
                best = premium;
                best_month = Some(month);
            }
        }

        Self {
            advisor: advisor.to_string(),
            year,
            monthly_premium,
            total_sales,
            avg_monthly_sales,
            best_month,
        }
    }
}

/// Per-customer figures for one advisor and year, across every company.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorCustomerStats {
    pub advisor: String,
    pub year: i32,
    pub new_customers: usize,
    pub customer_hitrate_percent: u32,
    pub months_counted: u32,
    pub avg_customers_per_month: f64,
    pub avg_policies_per_customer: f64,
    pub avg_premium_per_customer: f64,
}

/// Months that count toward the per-month average: all of a past year, the
/// completed months of the current one (at least one), none of a future year.
pub fn months_to_count(year: i32, today: NaiveDate) -> u32 {
    match year.cmp(&today.year()) {
        std::cmp::Ordering::Less => 12,
        std::cmp::Ordering::Equal => today.month().saturating_sub(1).max(1),
        std::cmp::Ordering::Greater => 0,
    }
}

impl AdvisorCustomerStats {
    pub fn build(
        index: &OfferIndex,
        advisor: &str,
        year: i32,
        today: NaiveDate,
        exclude_migrated: bool,
    ) -> Self {
        let scope = OfferFilter::for_segment(CompanySegment::All, exclude_migrated).for_advisor(advisor);
        let in_scope: Vec<&IndexedOffer> = index
            .entries()
            .iter()
            .filter(|entry| entry.matches_scope(&scope) && entry.sales_date.is_some())
            .collect();

        let mut first_acceptance: HashMap<&str, NaiveDate> = HashMap::new();
        for entry in &in_scope {
            if entry.outcome != OfferOutcome::Converted {
                continue;
            }
            let (Some(customer), Some(date)) = (entry.customer.as_deref(), entry.sales_date) else {
                continue;
            };
            first_acceptance
                .entry(customer)
                .and_modify(|first| *first = (*first).min(date))
                .or_insert(date);
        }
        let new_customers = first_acceptance
            .values()
            .filter(|date| date.year() == year)
            .count();

        let in_year: Vec<&IndexedOffer> = in_scope
            .into_iter()
            .filter(|entry| entry.year() == Some(year))
            .collect();

        let mut accepting: HashSet<&str> = HashSet::new();
        let mut offered: HashSet<&str> = HashSet::new();
        let mut policies = 0usize;
        let mut positive_premium = 0.0;
        for entry in &in_year {
            if entry.outcome == OfferOutcome::Converted {
                policies += 1;
                positive_premium += entry.positive_premium.unwrap_or(0.0);
            }
            let Some(customer) = entry.customer.as_deref() else { continue };
            offered.insert(customer);
            if entry.outcome == OfferOutcome::Converted {
                accepting.insert(customer);
            }
        }

        let customer_hitrate_percent = if offered.is_empty() {
            0
        } else {
            ((accepting.len() as f64 / offered.len() as f64) * 100.0).round() as u32
        };

        let months_counted = months_to_count(year, today);
        let avg_customers_per_month = if months_counted > 0 {
            let monthly_customers: usize = (1..=months_counted)
                .map(|month| {
                    in_year
                        .iter()
                        .filter(|entry| {
                            entry.outcome == OfferOutcome::Converted && entry.month() == Some(month)
                        })
                        .filter_map(|entry| entry.customer.as_deref())
                        .collect::<HashSet<_>>()
                        .len()
                })
                .sum();
            monthly_customers as f64 / f64::from(months_counted)
        } else {
            0.0
        };

        let (avg_policies_per_customer, avg_premium_per_customer) = if accepting.is_empty() {
            (0.0, 0.0)
        } else {
            let customers = accepting.len() as f64;
            (policies as f64 / customers, positive_premium / customers)
        };

        tracing::debug!(
            advisor,
            year,
            customers = offered.len(),
            accepting = accepting.len(),
            "computed advisor customer statistics"
        );

        Self {
            advisor: advisor.to_string(),
            year,
            new_customers,
            customer_hitrate_percent,
            months_counted,
            avg_customers_per_month,
            avg_policies_per_customer,
            avg_premium_per_customer,
        }
    }
}

/// Product table for one advisor, ordered by number of offers.
pub fn advisor_products(
    index: &OfferIndex,
    advisor: &str,
    segment: CompanySegment,
    exclude_migrated: bool,
    year: i32,
    month: Option<u32>,
) -> ProductReport {
    let filter = OfferFilter::for_segment(segment, exclude_migrated)
        .in_year(year)
        .in_month(month)
        .for_advisor(advisor);
    ProductReport::build(index, &filter, ProductSort::TotalOffers)
}

/// Whether an advisor code is one the advisor views accept.
pub fn is_known_advisor(code: &str) -> bool {
    is_rostered(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rows::CellValue;
    use crate::reporting::offers::{OfferDataset, OfferRecord};

    fn offer(handler: &str, cvr: &str, name: &str, date: &str, premium: f64) -> OfferRecord {
        OfferRecord {
            master_product_name: "HDI - Netbankforsikring".to_string(),
            conversion_date: date.to_string(),
            annual_premium: CellValue::Number(premium),
            case_handler: handler.to_string(),
            registration_id: cvr.to_string(),
            customer_name: name.to_string(),
            ..OfferRecord::default()
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn month_table_pools_unrostered_handlers() {
        let dataset = OfferDataset {
            converted: vec![
                offer("kevfit", "1", "", "2025-01-04", 100.0),
                offer("Maria Påskesen", "2", "", "2025-01-09", 200.0),
                offer("ekstern", "3", "", "2025-02-01", 50.0),
                offer("kevfit", "1", "", "2024-02-01", 999.0),
            ],
            non_converted: vec![offer("kevfit", "4", "", "2025-01-05", 400.0)],
            ..OfferDataset::default()
        };
        let index = OfferIndex::build(&dataset);
        let table = AdvisorMonthTable::build(&index, CompanySegment::All, true, 2025);

        assert_eq!(table.columns.len(), ADVISOR_ROSTER.len() + 1);
        let kevfit = column_for("kevfit");
        assert_eq!(table.rows[0].cells[kevfit], SalesCell { count: 1, premium: 100.0 });
        assert_eq!(table.rows[0].total, 300.0);
        assert_eq!(table.rows[1].cells[ADVISOR_ROSTER.len()].premium, 50.0);
        assert_eq!(table.column_totals[column_for("mapk_lb")], 200.0);
        assert_eq!(table.grand_total, 350.0);
    }

    #[test]
    fn sales_series_reports_best_month() {
        let dataset = OfferDataset {
            converted: vec![
                offer("kevfit", "1", "", "2025-03-04", 100.0),
                offer("kevfit", "1", "", "2025-05-04", 300.0),
                offer("kevfit", "2", "", "2025-07-04", 300.0),
                offer("adrb", "2", "", "2025-07-04", 900.0),
            ],
            ..OfferDataset::default()
        };
        let index = OfferIndex::build(&dataset);
        let series = AdvisorSalesSeries::build(&index, "kevfit", CompanySegment::All, true, 2025);

        assert_eq!(series.total_sales, 700.0);
        assert!((series.avg_monthly_sales - 700.0 / 3.0).abs() < 1e-9);
        assert_eq!(series.best_month, Some(5));

        let empty = AdvisorSalesSeries::build(&index, "jlar_lb", CompanySegment::All, true, 2025);
        assert_eq!(empty.best_month, None);
        assert_eq!(empty.avg_monthly_sales, 0.0);
    }

    #[test]
    fn months_to_count_caps_current_year() {
        let today = date(2025, 6, 15);
        assert_eq!(months_to_count(2024, today), 12);
        assert_eq!(months_to_count(2025, today), 5);
        assert_eq!(months_to_count(2025, date(2025, 1, 20)), 1);
        assert_eq!(months_to_count(2026, today), 0);
    }

    #[test]
    fn customer_stats_count_new_and_returning_customers() {
        let dataset = OfferDataset {
            converted: vec![
                offer("kevfit", "11", "Alpha", "2024-11-01", 500.0),
                offer("kevfit", "11", "Alpha", "2025-01-10", 1000.0),
                offer("kevfit", "", "Beta ApS", "2025-01-20", 2000.0),
                offer("kevfit", "", "Beta ApS", "2025-02-02", 0.0),
                offer("kevfit", "33", "Gamma", "2025-03-05", 600.0),
                offer("adrb", "44", "Delta", "2025-01-10", 9999.0),
            ],
            non_converted: vec![offer("kevfit", "55", "Epsilon", "2025-02-10", 0.0)],
            rejected: vec![
                offer("kevfit", "66", "Zeta", "2025-02-11", 0.0),
                offer("kevfit", "", "", "2025-02-12", 0.0),
            ],
        };
        let index = OfferIndex::build(&dataset);
        let stats = AdvisorCustomerStats::build(&index, "kevfit", 2025, date(2025, 4, 2), true);

        // Beta and Gamma are new, Alpha first bought in 2024
        assert_eq!(stats.new_customers, 2);
        // 3 accepting out of 5 identified customers
        assert_eq!(stats.customer_hitrate_percent, 60);
        assert_eq!(stats.months_counted, 3);
        // Jan: Alpha + Beta, Feb: Beta, Mar: Gamma
        assert!((stats.avg_customers_per_month - 4.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_policies_per_customer - 4.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_premium_per_customer - 3600.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn customer_stats_are_zero_without_offers() {
        let index = OfferIndex::build(&OfferDataset::default());
        let stats = AdvisorCustomerStats::build(&index, "kevfit", 2030, date(2025, 4, 2), true);
        assert_eq!(stats.customer_hitrate_percent, 0);
        assert_eq!(stats.months_counted, 0);
        assert_eq!(stats.avg_premium_per_customer, 0.0);
    }

    #[test]
    fn advisor_products_sort_by_offer_count() {
        let mut car = offer("kevfit", "1", "", "2025-03-04", 100.0);
        car.master_product_name = "LB Master Bil - Pakke".to_string();
        let dataset = OfferDataset {
            converted: vec![offer("kevfit", "1", "", "2025-03-04", 5000.0), car.clone()],
            non_converted: vec![car.clone(), car],
            ..OfferDataset::default()
        };
        let index = OfferIndex::build(&dataset);
        let report = advisor_products(&index, "kevfit", CompanySegment::All, true, 2025, Some(3));
        assert_eq!(report.rows[0].product, "Bilforsikring");
        assert_eq!(report.rows[0].total, 3);
        assert!(is_known_advisor("kevfit"));
        assert!(!is_known_advisor("andre"));
    }
}
