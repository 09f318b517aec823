use serde::{Deserialize, Serialize};

/// Sentinel tax id used when a source row carries no CVR/CPR.
pub const NO_TAX_ID: &str = "no cvr";

/// Product whose rows are merged per policy number into one record.
pub const WORK_INJURY_PRODUCT: &str = "Arbejdsskadeforsikring";

/// Back-office system a policy row was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Axa,
    Naersikring,
    AccidentHealth,
}

impl SourceCategory {
    pub const fn ordered() -> [Self; 3] {
        [Self::Axa, Self::Naersikring, Self::AccidentHealth]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Axa => "AXA",
            Self::Naersikring => "Nærsikring",
            Self::AccidentHealth => "Ulykke",
        }
    }
}

/// AXA-only attributes. Empty for every other source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxaDetails {
    pub seller: String,
    pub brand: String,
    pub member_group: String,
    pub org_id: String,
    pub creation_date: String,
    pub policy_effective_date: String,
    pub next_renewal_date: String,
    pub cancellation_date: String,
    pub external_policy_nr: String,
    pub external_customer_nr: String,
    pub master_policy_id: String,
    pub master_policy_name: String,
    pub fire_sum: String,
    pub water_sum: String,
    pub theft_sum: String,
    pub bi_sum: String,
    pub square_meters: String,
    pub insured_location: String,
    pub turnover: String,
    pub employee_category: String,
}

/// One normalized policy row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub source: SourceCategory,
    pub policy_number: String,
    pub product: String,
    /// Lower-cased grouping key.
    pub customer_name: String,
    pub customer_name_original: String,
    pub tax_id: String,
    pub annual_premium: f64,
    pub renewal_month: String,
    pub payment_frequency: String,
    pub reg_nr: String,
    pub case_handler: String,
    pub status: String,
    pub work_area: String,
    pub number_of_employees: Option<f64>,
    pub db_code: String,
    #[serde(flatten)]
    pub details: AxaDetails,
}

impl Policy {
    pub fn new(source: SourceCategory) -> Self {
        Self {
            source,
            policy_number: String::new(),
            product: String::new(),
            customer_name: String::new(),
            customer_name_original: String::new(),
            tax_id: NO_TAX_ID.to_string(),
            annual_premium: 0.0,
            renewal_month: String::new(),
            payment_frequency: String::new(),
            reg_nr: String::new(),
            case_handler: String::new(),
            status: String::new(),
            work_area: String::new(),
            number_of_employees: None,
            db_code: String::new(),
            details: AxaDetails::default(),
        }
    }

    pub fn has_tax_id(&self) -> bool {
        !self.tax_id.is_empty() && self.tax_id != NO_TAX_ID
    }

    /// Inactive and not-yet-started policies never reach customer output.
    pub fn is_excluded_status(&self) -> bool {
        let status = self.status.trim().to_lowercase();
        status == "inactive" || status == "new"
    }

    pub fn is_work_injury(&self) -> bool {
        self.product == WORK_INJURY_PRODUCT
    }
}
