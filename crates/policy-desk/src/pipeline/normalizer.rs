use super::domain::{AxaDetails, Policy, SourceCategory, NO_TAX_ID, WORK_INJURY_PRODUCT};
use super::mapping::{case_handler_code, danish_month, danish_month_for_number, payment_frequency};
use super::rows::{resolve_alias, CellValue, RawRow};
use crate::dates::render_date_cell;
use tracing::{debug, warn};

const AXA_POLICY_PREFIX: &str = "1031170000";
const AXA_GENERIC_PRODUCT: &str = "HDI Produkt SME";
const NAERSIKRING_LABEL_PREFIX_CHARS: usize = 8;
const INSURED_LOCATION_MIN_CHARS: usize = 6;
const GROUP_ACCIDENT_MARKER: &str = "gruppeulykke";

/// Normalizes a single row. Accident/Health rows resolve their column aliases
/// against the row itself; use [`normalize_accident_health`] for whole
/// exports so the year filter sees every row.
pub fn normalize(source: SourceCategory, row: &RawRow) -> Option<Policy> {
    match source {
        SourceCategory::Axa => Some(normalize_axa(row)),
        SourceCategory::Naersikring => Some(normalize_naersikring(row)),
        SourceCategory::AccidentHealth => {
            let columns = AccidentColumns::resolve(row);
            columns
                .extract(row)
                .filter(|candidate| !candidate.is_group_accident())
                .map(|candidate| candidate.policy)
        }
    }
}

pub fn normalize_axa(row: &RawRow) -> Policy {
    let mut policy = Policy::new(SourceCategory::Axa);

    let name = row.text_or_empty("FORSIKRINGSTAGER_NAVN");
    policy.customer_name = name.to_lowercase();
    policy.customer_name_original = name;
    policy.tax_id = row
        .text("FORSIKRINGSTAGER_CVR")
        .unwrap_or_else(|| NO_TAX_ID.to_string());
    policy.policy_number = row
        .text("POLICE_NR")
        .map(|number| strip_policy_prefix(&number))
        .unwrap_or_default();

    let master_name = row.text_or_empty("MASTER_POLICE_NAVN");
    let product = row.text_or_empty("PRODUKT");
    policy.product = if product == AXA_GENERIC_PRODUCT {
        master_name.clone()
    } else {
        product
    };

    policy.annual_premium = row.number("AARLIG_PRAEMIE").map(f64::round).unwrap_or(0.0);
    policy.renewal_month = danish_month(&row.text_or_empty("DREJEDATO_MAANED"));
    policy.payment_frequency = payment_frequency(&row.text_or_empty("BETALINGSTERMIN"));
    policy.reg_nr = row.text_or_empty("REG_NR");
    policy.case_handler = row.text_or_empty("SAGSBEHANDLER");
    policy.status = row.text_or_empty("STATUS");
    policy.db_code = row.text_or_empty("DB_KODE");

    let insured_location = row.text_or_empty("INSURED_LOCATION");
    policy.details = AxaDetails {
        seller: row.text_or_empty("SAELGER"),
        brand: row.text_or_empty("BRAND"),
        member_group: row.text_or_empty("MEDLEMSGRUPPE"),
        org_id: row.text_or_empty("ORG_ID"),
        creation_date: render_date_cell(row.cell("OPRETTELSES_DATO")),
        policy_effective_date: render_date_cell(row.cell("POLICE_IKRAFT_DATO")),
        next_renewal_date: render_date_cell(row.cell("NAESTE_DREJEDATO")),
        cancellation_date: render_date_cell(row.cell("OPSIGELSES_DATO")),
        external_policy_nr: row.text_or_empty("EKSTERN_POLICE_NR"),
        external_customer_nr: row.text_or_empty("EKSTERN_KUNDE_NR"),
        master_policy_id: row.text_or_empty("MASTER_POLICE_ID"),
        master_policy_name: master_name,
        fire_sum: row.text_or_empty("FIRE_SUM"),
        water_sum: row.text_or_empty("WATER_SUM"),
        theft_sum: row.text_or_empty("THEFT_SUM"),
        bi_sum: row.text_or_empty("BI_SUM"),
        square_meters: row.text_or_empty("SQUARE_METERS"),
        insured_location: if insured_location.chars().count() >= INSURED_LOCATION_MIN_CHARS {
            insured_location
        } else {
            String::new()
        },
        turnover: row.text_or_empty("TURNOVER"),
        employee_category: row.text_or_empty("EMPLOYEE_CATEGORY"),
    };

    policy
}

pub fn normalize_naersikring(row: &RawRow) -> Policy {
    let mut policy = Policy::new(SourceCategory::Naersikring);

    let name: String = row
        .text_or_empty("Navnelabel")
        .chars()
        .skip(NAERSIKRING_LABEL_PREFIX_CHARS)
        .collect();
    policy.customer_name = name.to_lowercase();
    policy.customer_name_original = name;
    policy.tax_id = row
        .first_text(&["CVRnr.", "CVRnr"])
        .unwrap_or_else(|| NO_TAX_ID.to_string());
    policy.policy_number = row.first_text(&["Policenr.", "Policenr"]).unwrap_or_default();
    policy.product = WORK_INJURY_PRODUCT.to_string();
    policy.annual_premium = ["Årspræmie (Police)", "Årspræmie"]
        .iter()
        .find_map(|column| row.number(column))
        .map(f64::round)
        .unwrap_or(0.0);
    policy.renewal_month = row.text_or_empty("Hovedforfald");
    policy.payment_frequency = row.text_or_empty("Frekvens");
    policy.case_handler = row
        .text("Provisionsmodtager1")
        .map(|handler| case_handler_code(&handler))
        .unwrap_or_default();
    policy.status = "Active".to_string();
    policy.work_area = row.text_or_empty("Arbejdsområde");
    policy.number_of_employees = row
        .cell("Antal heltidsansatte ialt")
        .and_then(leading_number);
    policy.db_code = naersikring_db_code(row).unwrap_or_default();

    policy
}

/// `"<DB25-Erhverv> - <DB25-Nr>"`, only when both parts are present.
pub fn naersikring_db_code(row: &RawRow) -> Option<String> {
    let trade = row.text("DB25-Erhverv")?;
    let number = row.text("DB25-Nr")?;
    Some(format!("{trade} - {number}"))
}

/// Normalizes an Accident/Health export: aliases resolve from the first row,
/// only the most recent policy year is kept and group accident products are
/// dropped.
pub fn normalize_accident_health(rows: &[RawRow]) -> Vec<Policy> {
    let Some(sample) = rows.first() else {
        return Vec::new();
    };

    let columns = AccidentColumns::resolve(sample);
    if columns.year.is_none() || columns.product.is_none() {
        warn!("accident/health export lacks a year or product column; skipping all rows");
        return Vec::new();
    }

    let candidates: Vec<AccidentCandidate> = rows
        .iter()
        .filter_map(|row| {
            let candidate = columns.extract(row);
            if candidate.is_none() {
                debug!("skipping accident/health row without a usable year");
            }
            candidate
        })
        .collect();

    let Some(latest_year) = candidates.iter().map(|candidate| candidate.year).max() else {
        return Vec::new();
    };

    candidates
        .into_iter()
        .filter(|candidate| candidate.year == latest_year && !candidate.is_group_accident())
        .map(|candidate| candidate.policy)
        .collect()
}

/// Logical Accident/Health fields and the header spellings seen across export
/// variants, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccidentField {
    Year,
    Product,
    PolicyNumber,
    PolicyHolder,
    TaxId,
    Premium,
    RenewalMonth,
}

impl AccidentField {
    const fn ordered() -> [Self; 7] {
        [
            Self::Year,
            Self::Product,
            Self::PolicyNumber,
            Self::PolicyHolder,
            Self::TaxId,
            Self::Premium,
            Self::RenewalMonth,
        ]
    }

    const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Year => &["År", "Ar", "Year", "AA", "Å", "YEAR"],
            Self::Product => &["Produktbeskrivelse", "Produkt", "Product", "ProductType", "Type"],
            Self::PolicyNumber => &["Policenummer", "Police", "PolicyNumber", "Policy"],
            Self::PolicyHolder => &[
                "Forsikringstager",
                "Forsikringstagernavn",
                "PolicyHolder",
                "Name",
                "Client",
            ],
            Self::TaxId => &["Cvr", "CVR", "BusinessId", "CompanyId"],
            Self::Premium => &[
                "Årlig brutto præmie",
                "Præmie",
                "Premium",
                "GrossPremium",
                "AnnualPremium",
            ],
            Self::RenewalMonth => &["Måned", "Maaned", "Month", "RenewalMonth"],
        }
    }

    const fn label(self) -> &'static str {
        self.aliases()[0]
    }
}

#[derive(Debug, Default)]
struct AccidentColumns {
    year: Option<&'static str>,
    product: Option<&'static str>,
    policy_number: Option<&'static str>,
    policy_holder: Option<&'static str>,
    tax_id: Option<&'static str>,
    premium: Option<&'static str>,
    renewal_month: Option<&'static str>,
}

impl AccidentColumns {
    fn resolve(sample: &RawRow) -> Self {
        let mut columns = Self::default();
        for field in AccidentField::ordered() {
            let resolved = resolve_alias(sample, field.aliases());
            if resolved.is_none() {
                warn!(field = field.label(), "no matching accident/health column");
            }
            match field {
                AccidentField::Year => columns.year = resolved,
                AccidentField::Product => columns.product = resolved,
                AccidentField::PolicyNumber => columns.policy_number = resolved,
                AccidentField::PolicyHolder => columns.policy_holder = resolved,
                AccidentField::TaxId => columns.tax_id = resolved,
                AccidentField::Premium => columns.premium = resolved,
                AccidentField::RenewalMonth => columns.renewal_month = resolved,
            }
        }
        columns
    }

    fn text(&self, row: &RawRow, column: Option<&'static str>) -> String {
        column.map(|column| row.text_or_empty(column)).unwrap_or_default()
    }

    fn extract(&self, row: &RawRow) -> Option<AccidentCandidate> {
        let year_column = self.year?;
        self.product?;

        let year = row.cell(year_column).and_then(parse_year)?;

        let mut policy = Policy::new(SourceCategory::AccidentHealth);
        policy.policy_number = self.text(row, self.policy_number);
        policy.product = self.text(row, self.product);
        let name = self.text(row, self.policy_holder);
        policy.customer_name = name.to_lowercase();
        policy.customer_name_original = name;
        let tax_id = self.text(row, self.tax_id);
        if !tax_id.is_empty() {
            policy.tax_id = tax_id;
        }
        policy.annual_premium = self
            .premium
            .and_then(|column| row.cell(column))
            .map(parse_danish_amount)
            .unwrap_or(0.0)
            .round();
        policy.renewal_month = self
            .renewal_month
            .and_then(|column| row.cell(column))
            .and_then(month_number)
            .and_then(danish_month_for_number)
            .map(str::to_string)
            .unwrap_or_default();
        policy.status = "Active".to_string();

        Some(AccidentCandidate { year, policy })
    }
}

struct AccidentCandidate {
    year: i32,
    policy: Policy,
}

impl AccidentCandidate {
    fn is_group_accident(&self) -> bool {
        self.policy.product.to_lowercase().contains(GROUP_ACCIDENT_MARKER)
    }
}

/// Drops the fixed AXA prefix; purely numeric remainders lose leading zeros.
fn strip_policy_prefix(raw: &str) -> String {
    let remainder = raw.trim().strip_prefix(AXA_POLICY_PREFIX).unwrap_or(raw.trim());
    if !remainder.is_empty() && remainder.chars().all(|c| c.is_ascii_digit()) {
        match remainder.parse::<u64>() {
            Ok(number) => number.to_string(),
            Err(_) => remainder.to_string(),
        }
    } else {
        remainder.to_string()
    }
}

/// Leading integer of the cell, as spreadsheet tools tend to read it.
fn parse_year(cell: &CellValue) -> Option<i32> {
    match cell {
        CellValue::Number(number) => Some(number.trunc() as i32),
        CellValue::Text(text) => leading_integer(text),
        CellValue::Empty => None,
    }
}

fn month_number(cell: &CellValue) -> Option<u32> {
    match cell {
        CellValue::Number(number) if number.fract() == 0.0 => u32::try_from(*number as i64).ok(),
        CellValue::Number(_) => None,
        CellValue::Text(text) => leading_integer(text).and_then(|n| u32::try_from(n).ok()),
        CellValue::Empty => None,
    }
}

fn leading_integer(text: &str) -> Option<i32> {
    let trimmed = text.trim();
    let end = trimmed
        .char_indices()
        .find(|(index, c)| !(c.is_ascii_digit() || (*index == 0 && (*c == '-' || *c == '+'))))
        .map(|(index, _)| index)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Parses `"12.345,50 kr."` style amounts; unreadable or non-finite values
/// become zero.
fn parse_danish_amount(cell: &CellValue) -> f64 {
    let amount = match cell {
        CellValue::Number(number) => Some(*number),
        CellValue::Text(text) => {
            let cleaned = text.replace('.', "").replace(',', ".").replace("kr", "");
            cleaned.trim().parse::<f64>().ok()
        }
        CellValue::Empty => None,
    };
    amount.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Longest leading decimal number in the cell, so `"2,5"` reads as 2 and
/// `"12 ansatte"` as 12.
fn leading_number(cell: &CellValue) -> Option<f64> {
    let text = match cell {
        CellValue::Text(text) => text.trim(),
        other => return other.as_f64(),
    };
    let mut seen_dot = false;
    let end = text
        .char_indices()
        .find(|&(index, c)| match c {
            '0'..='9' => false,
            '-' | '+' => index != 0,
            '.' if !seen_dot => {
                seen_dot = true;
                false
            }
            _ => true,
        })
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    text[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}
