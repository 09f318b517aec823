use super::filters::OfferFilter;
use super::index::{OfferIndex, OfferOutcome};
use crate::pipeline::WORK_INJURY_PRODUCT;
use serde::Serialize;

/// Row ordering of a product table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// Dashboard view.
    #[default]
    TotalPremium,
    /// Advisor view.
    TotalOffers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRow {
    pub product: String,
    pub converted: usize,
    pub non_converted: usize,
    pub rejected: usize,
    pub total: usize,
    pub total_premium: f64,
    pub avg_premium: f64,
    /// Blank for work-injury products.
    pub hitrate_percent: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTotals {
    pub converted: usize,
    pub total_premium: f64,
    pub avg_premium: f64,
    pub hitrate_percent: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductReport {
    pub rows: Vec<ProductRow>,
    pub totals: ProductTotals,
}

/// `round(accepted / (accepted + open + rejected) * 100)`, absent without offers.
pub fn hit_rate(accepted: usize, open: usize, rejected: usize) -> Option<u32> {
    let total = accepted + open + rejected;
    if total == 0 {
        return None;
    }
    Some(((accepted as f64 / total as f64) * 100.0).round() as u32)
}

impl ProductReport {
    pub fn build(index: &OfferIndex, filter: &OfferFilter, sort: ProductSort) -> Self {
        let mut rows: Vec<ProductRow> = Vec::new();

        for entry in index.select(filter) {
            let position = match rows.iter().position(|row| row.product == entry.product) {
                Some(position) => position,
                None => {
                    rows.push(ProductRow {
                        product: entry.product.clone(),
                        converted: 0,
                        non_converted: 0,
                        rejected: 0,
                        total: 0,
                        total_premium: 0.0,
                        avg_premium: 0.0,
                        hitrate_percent: None,
                    });
                    rows.len() - 1
                }
            };

            let row = &mut rows[position];
            match entry.outcome {
                OfferOutcome::Converted => {
                    row.converted += 1;
                    row.total_premium += entry.premium;
                }
                OfferOutcome::NonConverted => row.non_converted += 1,
                OfferOutcome::Rejected => row.rejected += 1,
            }
        }

        let mut totals = ProductTotals::default();
        let mut hit_accepted = 0;
        let mut hit_offers = 0;

        for row in &mut rows {
            row.total = row.converted + row.non_converted + row.rejected;
            row.avg_premium = if row.converted > 0 {
                row.total_premium / row.converted as f64
            } else {
                0.0
            };

            totals.converted += row.converted;
            totals.total_premium += row.total_premium;

            if row.product != WORK_INJURY_PRODUCT {
                row.hitrate_percent = hit_rate(row.converted, row.non_converted, row.rejected);
                hit_accepted += row.converted;
                hit_offers += row.total;
            }
        }

        totals.avg_premium = if totals.converted > 0 {
            totals.total_premium / totals.converted as f64
        } else {
            0.0
        };
        totals.hitrate_percent = hit_rate(hit_accepted, hit_offers - hit_accepted, 0);

        match sort {
            ProductSort::TotalPremium => {
                rows.sort_by(|a, b| b.total_premium.total_cmp(&a.total_premium))
            }
            ProductSort::TotalOffers => rows.sort_by(|a, b| b.total.cmp(&a.total)),
        }

        Self { rows, totals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rows::CellValue;
    use crate::reporting::offers::{OfferDataset, OfferRecord};

    fn offer(master: &str, premium: f64) -> OfferRecord {
        OfferRecord {
            master_product_name: master.to_string(),
            conversion_date: "2025-02-10".to_string(),
            annual_premium: CellValue::Number(premium),
            ..OfferRecord::default()
        }
    }

    fn report(sort: ProductSort) -> ProductReport {
        let dataset = OfferDataset {
            converted: vec![
                offer("HDI - Netbankforsikring", 1000.0),
                offer("HDI - Netbankforsikring", 3000.0),
                offer("Nærsikring - Arbejdsskadeforsikring", 9000.0),
                offer("LB Master Bil - Pakke", 2500.0),
            ],
            non_converted: vec![
                offer("HDI - Netbankforsikring", 0.0),
                offer("Nærsikring - Arbejdsskadeforsikring", 0.0),
                offer("LB Master Bil - Pakke", 0.0),
                offer("LB Master Bil - Pakke", 0.0),
            ],
            rejected: vec![
                offer("LB Master Bil - Pakke", 0.0),
                offer("Nærsikring - Arbejdsskadeforsikring", 0.0),
            ],
        };
        let index = OfferIndex::build(&dataset);
        ProductReport::build(&index, &OfferFilter::default().in_year(2025), sort)
    }

    #[test]
    fn hit_rate_rounds_percentage() {
        assert_eq!(hit_rate(1, 1, 1), Some(33));
        assert_eq!(hit_rate(2, 1, 0), Some(67));
        assert_eq!(hit_rate(0, 0, 0), None);
    }

    #[test]
    fn work_injury_is_left_out_of_hit_rates() {
        let report = report(ProductSort::TotalPremium);
        let work_injury = report
            .rows
            .iter()
            .find(|row| row.product == WORK_INJURY_PRODUCT)
            .expect("work injury row present");
        assert_eq!(work_injury.total, 3);
        assert_eq!(work_injury.hitrate_percent, None);

        // Netbank 2 of 3, Bil 1 of 4
        assert_eq!(report.totals.hitrate_percent, Some(43));
        assert_eq!(report.totals.converted, 4);
        assert_eq!(report.totals.total_premium, 15500.0);
        assert_eq!(report.totals.avg_premium, 3875.0);
    }

    #[test]
    fn rows_sort_by_premium_or_offer_count() {
        let by_premium = report(ProductSort::TotalPremium);
        let products: Vec<&str> = by_premium.rows.iter().map(|row| row.product.as_str()).collect();
        assert_eq!(products, vec![WORK_INJURY_PRODUCT, "Netbank", "Bilforsikring"]);
        assert_eq!(by_premium.rows[1].avg_premium, 2000.0);
        assert_eq!(by_premium.rows[1].hitrate_percent, Some(67));

        let by_offers = report(ProductSort::TotalOffers);
        assert_eq!(by_offers.rows[0].product, "Bilforsikring");
        assert_eq!(by_offers.rows[0].total, 4);
    }

    #[test]
    fn totals_hit_rate_absent_without_eligible_offers() {
        let dataset = OfferDataset {
            converted: vec![offer("Nærsikring - Arbejdsskadeforsikring", 100.0)],
            ..OfferDataset::default()
        };
        let index = OfferIndex::build(&dataset);
        let report = ProductReport::build(&index, &OfferFilter::default(), ProductSort::TotalPremium);
        assert_eq!(report.totals.hitrate_percent, None);
    }
}
