use super::filters::{CompanySegment, OfferFilter};
use super::index::OfferIndex;
use crate::dates::{days_in_month, month_key};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monthly sales goals: company key (`hdi`, `axa`, `nærsikring`) to
/// `YYYY-MM` to goal amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesGoals {
    goals: BTreeMap<String, BTreeMap<String, f64>>,
}

impl SalesGoals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, company_key: &str, month: &str, goal: f64) {
        self.goals
            .entry(company_key.to_string())
            .or_default()
            .insert(month.to_string(), goal);
    }

    pub fn with(mut self, company_key: &str, month: &str, goal: f64) -> Self {
        self.set(company_key, month, goal);
        self
    }

    fn company_goal(&self, company_key: &str, month: &str) -> Option<f64> {
        self.goals.get(company_key)?.get(month).copied()
    }

    /// Combined segments sum their companies' goals, treating gaps as zero.
    pub fn goal_for(&self, segment: CompanySegment, month: &str) -> Option<f64> {
        match segment.companies() {
            [company] => self.company_goal(company.goal_key(), month),
            companies => Some(
                companies
                    .iter()
                    .map(|company| self.company_goal(company.goal_key(), month).unwrap_or(0.0))
                    .sum(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPoint {
    pub month: String,
    pub actual: f64,
    pub goal: Option<f64>,
    pub fulfillment_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalComparison {
    pub segment: CompanySegment,
    pub year: i32,
    pub months: Vec<GoalPoint>,
    pub total_sales_full_year: f64,
    pub total_sales_ytd: f64,
    pub total_goal_ytd: f64,
    pub ytd_fulfillment_percent: u32,
    pub avg_monthly_sales: f64,
    pub annual_goal: f64,
    pub annual_fulfillment_percent: u32,
}

fn percent(actual: f64, goal: f64) -> u32 {
    if goal <= 0.0 || actual <= 0.0 {
        return 0;
    }
    ((actual / goal) * 100.0).round() as u32
}

impl GoalComparison {
    /// Converted premium against goals for the year of `today`. The current
    /// month's goal counts pro rata by elapsed days.
    pub fn build(
        index: &OfferIndex,
        goals: &SalesGoals,
        segment: CompanySegment,
        exclude_migrated: bool,
        today: NaiveDate,
    ) -> Self {
        let year = today.year();
        let filter = OfferFilter::for_segment(segment, exclude_migrated).in_year(year);
        let actuals = index.monthly_converted_premium(&filter);

        let months: Vec<GoalPoint> = (1..=12u32)
            .zip(actuals)
            .map(|(month, actual)| {
                let key = month_key(year, month);
                let goal = goals.goal_for(segment, &key);
                GoalPoint {
                    fulfillment_percent: percent(actual, goal.unwrap_or(0.0)),
                    month: key,
                    actual,
                    goal,
                }
            })
            .collect();

        let current_month = today.month() as usize;
        let goal_at = |index: usize| months[index].goal.unwrap_or(0.0);

        let total_sales_full_year: f64 = actuals.iter().sum();
        let total_sales_ytd: f64 = actuals[..current_month].iter().sum();
        let complete_months_goal: f64 = (0..current_month - 1).map(goal_at).sum();
        let elapsed = f64::from(today.day()) / f64::from(days_in_month(year, today.month()));
        let total_goal_ytd = complete_months_goal + goal_at(current_month - 1) * elapsed;
        let annual_goal: f64 = (0..12).map(goal_at).sum();

        let months_with_sales = actuals.iter().filter(|value| **value > 0.0).count();
        let avg_monthly_sales = if months_with_sales > 0 {
            total_sales_full_year / months_with_sales as f64
        } else {
            0.0
        };

        Self {
            segment,
            year,
            total_sales_full_year,
            total_sales_ytd,
            total_goal_ytd,
            ytd_fulfillment_percent: percent(total_sales_ytd, total_goal_ytd),
            avg_monthly_sales,
            annual_goal,
            annual_fulfillment_percent: percent(total_sales_ytd, annual_goal),
            months,
        }
    }
}
