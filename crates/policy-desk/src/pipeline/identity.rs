use super::domain::Policy;
use super::rows::RawRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the customer master export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerMasterRecord {
    /// CPR (`SSN`).
    pub national_id: String,
    /// CVR (`CRN`).
    pub registration_id: String,
    pub name: String,
    pub address1: String,
    pub postal_code: String,
    pub city: String,
    pub mobile_phone: String,
    pub email: String,
}

impl CustomerMasterRecord {
    pub fn from_row(row: &RawRow) -> Self {
        Self {
            national_id: row.text_or_empty("SSN").trim().to_string(),
            registration_id: row.text_or_empty("CRN").trim().to_string(),
            name: row.text_or_empty("NAME"),
            address1: row.text_or_empty("ADDRESS1"),
            postal_code: row.text_or_empty("POSTAL_CODE"),
            city: row.text_or_empty("CITY"),
            mobile_phone: row.text_or_empty("MOBILE_PHONE"),
            email: row.text_or_empty("PRIMARY_EMAIL"),
        }
    }

    /// `"STREET, POSTAL CITY"`; the comma segment is left out when both
    /// postal code and city are blank.
    pub fn formatted_address(&self) -> Option<String> {
        let street = self.address1.trim();
        if street.is_empty() {
            return None;
        }

        let locality: Vec<&str> = [self.postal_code.trim(), self.city.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();

        if locality.is_empty() {
            Some(street.to_string())
        } else {
            Some(format!("{}, {}", street, locality.join(" ")))
        }
    }
}

/// Canonical identity attached to a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentity {
    /// CVR, CPR, or empty when nothing could be found.
    pub canonical_id: String,
    pub display_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// Read-only lookup tables over the customer master list.
///
/// The direct match scans records in list order and takes the first hit.
/// The name-keyed tables are filled in list order, so a later record with
/// the same lower-cased name replaces an earlier one.
#[derive(Debug, Clone, Default)]
pub struct CustomerDirectory {
    records: Vec<CustomerMasterRecord>,
    lowered_names: Vec<String>,
    national_id_by_name: HashMap<String, String>,
    registration_id_by_name: HashMap<String, String>,
    display_name_by_name: HashMap<String, String>,
    address_by_name: HashMap<String, String>,
}

impl CustomerDirectory {
    pub fn new(records: Vec<CustomerMasterRecord>) -> Self {
        let mut directory = Self {
            lowered_names: records.iter().map(|record| record.name.to_lowercase()).collect(),
            ..Self::default()
        };

        for (record, key) in records.iter().zip(&directory.lowered_names) {
            if record.name.is_empty() {
                continue;
            }
            if !record.national_id.is_empty() {
                directory
                    .national_id_by_name
                    .insert(key.clone(), record.national_id.clone());
            }
            if !record.registration_id.is_empty() {
                directory
                    .registration_id_by_name
                    .insert(key.clone(), record.registration_id.clone());
            }
            directory
                .display_name_by_name
                .insert(key.clone(), record.name.clone());
            if let Some(address) = record.formatted_address() {
                directory.address_by_name.insert(key.clone(), address);
            }
        }

        directory.records = records;
        tracing::debug!(
            records = directory.records.len(),
            named = directory.display_name_by_name.len(),
            "built customer directory"
        );
        directory
    }

    pub fn from_rows(rows: &[RawRow]) -> Self {
        Self::new(rows.iter().map(CustomerMasterRecord::from_row).collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact id equality, or lower-cased name equality when the policy has
    /// no id of its own.
    pub fn find_match(&self, policy: &Policy) -> Option<&CustomerMasterRecord> {
        let has_tax_id = policy.has_tax_id();
        self.records
            .iter()
            .zip(&self.lowered_names)
            .find(|(record, lowered)| {
                (has_tax_id && record.registration_id == policy.tax_id)
                    || (!has_tax_id && !policy.customer_name.is_empty() && **lowered == policy.customer_name)
            })
            .map(|(record, _)| record)
    }

    pub fn resolve(&self, policy: &Policy) -> ResolvedIdentity {
        let matched = self.find_match(policy);
        let name = policy.customer_name.as_str();

        let canonical_id = if policy.has_tax_id() {
            policy.tax_id.clone()
        } else {
            matched
                .map(|record| record.national_id.as_str())
                .filter(|id| !id.is_empty())
                .or_else(|| self.national_id_by_name.get(name).map(String::as_str))
                .or_else(|| self.registration_id_by_name.get(name).map(String::as_str))
                .unwrap_or_default()
                .to_string()
        };

        let display_name = Some(policy.customer_name_original.as_str())
            .filter(|original| !original.is_empty())
            .or_else(|| matched.map(|record| record.name.as_str()).filter(|n| !n.is_empty()))
            .or_else(|| self.display_name_by_name.get(name).map(String::as_str))
            .unwrap_or(name)
            .to_string();

        let address = match matched.and_then(CustomerMasterRecord::formatted_address) {
            Some(address) => address,
            None => self.address_by_name.get(name).cloned().unwrap_or_default(),
        };

        let phone = matched
            .map(|record| record.mobile_phone.split_whitespace().collect::<String>())
            .unwrap_or_default();
        let email = matched
            .map(|record| record.email.trim().to_string())
            .unwrap_or_default();

        ResolvedIdentity {
            canonical_id,
            display_name,
            address,
            phone,
            email,
        }
    }
}
