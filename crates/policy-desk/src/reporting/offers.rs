use crate::dates::parse_flexible_date;
use crate::pipeline::domain::WORK_INJURY_PRODUCT;
use crate::pipeline::rows::{CellValue, RawRow};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const MIGRATED_MARKER: &str = "MIG PROD";
const HDI_PREFIX: &str = "HDI";
const NAERSIKRING_PREFIX: &str = "Nærsikring";

/// Insurer behind an offer, derived from the master product name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Company {
    Hdi,
    Axa,
    Naersikring,
}

impl Company {
    pub const fn ordered() -> [Self; 3] {
        [Self::Hdi, Self::Axa, Self::Naersikring]
    }

    /// Key used by the sales goal table.
    pub const fn goal_key(self) -> &'static str {
        match self {
            Self::Hdi => "hdi",
            Self::Axa => "axa",
            Self::Naersikring => "nærsikring",
        }
    }

    pub fn from_master_name(master_name: &str) -> Option<Self> {
        if master_name.is_empty() {
            None
        } else if master_name.starts_with(HDI_PREFIX) {
            Some(Self::Hdi)
        } else if master_name.starts_with(NAERSIKRING_PREFIX) {
            Some(Self::Naersikring)
        } else {
            Some(Self::Axa)
        }
    }
}

/// One offer as stored in the offer dataset. Columns without a typed field
/// are kept in `extra` so that saving a dataset never drops data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferRecord {
    #[serde(rename = "PRODUKT", default, deserialize_with = "lenient_text")]
    pub product: String,
    #[serde(rename = "MASTER_POLICE_NAVN", default, deserialize_with = "lenient_text")]
    pub master_product_name: String,
    #[serde(rename = "KONVERTERINGS_DATO", default, deserialize_with = "lenient_text")]
    pub conversion_date: String,
    #[serde(rename = "TILBUD_START_DATO", default, deserialize_with = "lenient_text")]
    pub offer_start_date: String,
    #[serde(rename = "TILBUDS_DATO", default, deserialize_with = "lenient_text")]
    pub offer_date: String,
    #[serde(rename = "TILBUD_DATO", default, deserialize_with = "lenient_text")]
    pub offer_date_alt: String,
    #[serde(rename = "AARLIG_PRAEMIE", default)]
    pub annual_premium: CellValue,
    #[serde(rename = "SAGSBEHANDLER", default, deserialize_with = "lenient_text")]
    pub case_handler: String,
    #[serde(rename = "FORSIKRINGSTAGER_CVR", default, deserialize_with = "lenient_text")]
    pub registration_id: String,
    #[serde(rename = "FORSIKRINGSTAGER_NAVN", default, deserialize_with = "lenient_text")]
    pub customer_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts strings, numbers, booleans and nulls for text columns.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => CellValue::from(other.clone()).as_text(),
    }
}

impl OfferRecord {
    /// Builds a record from a spreadsheet row, keeping unknown columns.
    pub fn from_row(row: &RawRow) -> Self {
        let mut record = Self::default();
        for column in row.columns() {
            let cell = row.cell(column).cloned().unwrap_or_default();
            record.set(column, cell);
        }
        record
    }

    pub fn set(&mut self, column: &str, cell: CellValue) {
        let text = cell.as_text();
        match column {
            "PRODUKT" => self.product = text,
            "MASTER_POLICE_NAVN" => self.master_product_name = text,
            "KONVERTERINGS_DATO" => self.conversion_date = text,
            "TILBUD_START_DATO" => self.offer_start_date = text,
            "TILBUDS_DATO" => self.offer_date = text,
            "TILBUD_DATO" => self.offer_date_alt = text,
            "AARLIG_PRAEMIE" => self.annual_premium = cell,
            "SAGSBEHANDLER" => self.case_handler = text,
            "FORSIKRINGSTAGER_CVR" => self.registration_id = text,
            "FORSIKRINGSTAGER_NAVN" => self.customer_name = text,
            _ => {
                let value = serde_json::to_value(&cell).unwrap_or(Value::Null);
                self.extra.insert(column.to_string(), value);
            }
        }
    }

    pub fn extra_text(&self, column: &str) -> String {
        self.extra.get(column).map(value_text).unwrap_or_default()
    }

    /// Raw sales date: work-injury offers always use the offer start date,
    /// other offers the first non-empty of conversion, offer start and the
    /// two offer date columns.
    pub fn sales_date_text(&self) -> Option<&str> {
        if self.product == WORK_INJURY_PRODUCT {
            return Some(self.offer_start_date.as_str()).filter(|date| !date.trim().is_empty());
        }

        [
            &self.conversion_date,
            &self.offer_start_date,
            &self.offer_date,
            &self.offer_date_alt,
        ]
        .into_iter()
        .map(String::as_str)
        .find(|date| !date.trim().is_empty())
    }

    pub fn sales_date(&self) -> Option<NaiveDate> {
        self.sales_date_text().and_then(parse_flexible_date)
    }

    /// Premium as a plain number; anything unreadable counts as zero.
    pub fn premium(&self) -> f64 {
        self.annual_premium.as_f64().unwrap_or(0.0)
    }

    /// Premium read leniently from formatted text, kept only when positive.
    pub fn positive_premium(&self) -> Option<f64> {
        let cleaned: String = self
            .annual_premium
            .as_text()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        cleaned.parse::<f64>().ok().filter(|premium| *premium > 0.0)
    }

    pub fn company(&self) -> Option<Company> {
        Company::from_master_name(&self.master_product_name)
    }

    pub fn is_migrated(&self) -> bool {
        self.master_product_name.contains(MIGRATED_MARKER)
    }

    /// Migrated offers are only dropped when the filter is on, and never
    /// for Nærsikring products.
    pub fn passes_migrated_filter(&self, exclude_migrated: bool) -> bool {
        if !exclude_migrated || self.master_product_name.starts_with(NAERSIKRING_PREFIX) {
            return true;
        }
        !self.is_migrated()
    }

    /// `CVR:<id>` when a registration id exists, else `NAME:<name>`.
    pub fn customer_identifier(&self) -> Option<String> {
        let cvr = self.registration_id.trim();
        if !cvr.is_empty() {
            return Some(format!("CVR:{cvr}"));
        }
        let name = self.customer_name.trim();
        if name.is_empty() {
            None
        } else {
            Some(format!("NAME:{name}"))
        }
    }
}

/// Offer outcome collections as persisted in `db.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDataset {
    #[serde(default)]
    pub converted: Vec<OfferRecord>,
    #[serde(default)]
    pub non_converted: Vec<OfferRecord>,
    #[serde(default)]
    pub rejected: Vec<OfferRecord>,
}

impl OfferDataset {
    pub fn len(&self) -> usize {
        self.converted.len() + self.non_converted.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
