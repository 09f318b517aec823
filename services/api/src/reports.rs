use chrono::{Datelike, NaiveDate};
use policy_desk::reporting::{
    advisor_products, AdvisorCustomerStats, AdvisorMonthTable, AdvisorSalesSeries,
    CompanySegment, GoalComparison, OfferFilter, ProductReport, ProductSort, ReportData,
};
use serde::Serialize;

/// Segment shown when a caller does not pick one.
pub(crate) const DEFAULT_SEGMENT: CompanySegment = CompanySegment::HdiAxa;

/// Parameters shared by every report, resolved against the reporting date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReportParams {
    pub(crate) segment: CompanySegment,
    pub(crate) exclude_migrated: bool,
    pub(crate) year: i32,
    pub(crate) month: Option<u32>,
    pub(crate) today: NaiveDate,
}

impl ReportParams {
    pub(crate) fn new(
        segment: Option<CompanySegment>,
        include_migrated: bool,
        year: Option<i32>,
        month: Option<u32>,
        today: NaiveDate,
    ) -> Self {
        Self {
            segment: segment.unwrap_or(DEFAULT_SEGMENT),
            exclude_migrated: !include_migrated,
            year: year.unwrap_or_else(|| today.year()),
            month: month.filter(|month| (1..=12).contains(month)),
            today,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdvisorOverview {
    pub(crate) advisor: String,
    pub(crate) sales: AdvisorSalesSeries,
    pub(crate) products: ProductReport,
}

pub(crate) fn product_report(data: &ReportData, params: &ReportParams) -> ProductReport {
    let filter = OfferFilter::for_segment(params.segment, params.exclude_migrated)
        .in_year(params.year)
        .in_month(params.month);
    ProductReport::build(&data.index, &filter, ProductSort::TotalPremium)
}

pub(crate) fn goal_comparison(data: &ReportData, params: &ReportParams) -> GoalComparison {
    GoalComparison::build(
        &data.index,
        &data.goals,
        params.segment,
        params.exclude_migrated,
        params.today,
    )
}

pub(crate) fn advisor_table(data: &ReportData, params: &ReportParams) -> AdvisorMonthTable {
    AdvisorMonthTable::build(&data.index, params.segment, params.exclude_migrated, params.year)
}

pub(crate) fn advisor_overview(data: &ReportData, advisor: &str, params: &ReportParams) -> AdvisorOverview {
    AdvisorOverview {
        advisor: advisor.to_string(),
        sales: AdvisorSalesSeries::build(
            &data.index,
            advisor,
            params.segment,
            params.exclude_migrated,
            params.year,
        ),
        products: advisor_products(
            &data.index,
            advisor,
            params.segment,
            params.exclude_migrated,
            params.year,
            params.month,
        ),
    }
}

/// Customer statistics always span every company.
pub(crate) fn advisor_customers(
    data: &ReportData,
    advisor: &str,
    params: &ReportParams,
) -> AdvisorCustomerStats {
    AdvisorCustomerStats::build(
        &data.index,
        advisor,
        params.year,
        params.today,
        params.exclude_migrated,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_default_to_current_year_without_migrated_sales() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 2).expect("valid date");
        let params = ReportParams::new(None, false, None, Some(13), today);
        assert_eq!(params.segment, CompanySegment::HdiAxa);
        assert!(params.exclude_migrated);
        assert_eq!(params.year, 2025);
        assert_eq!(params.month, None);
    }
}
