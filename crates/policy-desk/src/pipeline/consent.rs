use super::rows::RawRow;
use std::collections::HashMap;

/// Marketing consent keyed by registration id, or by lower-cased name for
/// rows without one.
#[derive(Debug, Clone, Default)]
pub struct MarketingConsentLookup {
    consent_by_key: HashMap<String, bool>,
}

impl MarketingConsentLookup {
    pub fn from_rows(rows: &[RawRow]) -> Self {
        let mut lookup = Self::default();
        for row in rows {
            let key = match row.text("CRN").map(|crn| crn.trim().to_string()) {
                Some(crn) if !crn.is_empty() => crn,
                _ => row.text_or_empty("CUSTOMER_NAME").trim().to_lowercase(),
            };
            lookup.insert(key, row.cell("MARKETING").is_some());
        }
        tracing::debug!(entries = lookup.len(), "built marketing consent lookup");
        lookup
    }

    /// Later entries for the same key replace earlier ones. Empty keys are ignored.
    pub fn insert(&mut self, key: impl Into<String>, has_consent: bool) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.consent_by_key.insert(key, has_consent);
    }

    pub fn len(&self) -> usize {
        self.consent_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consent_by_key.is_empty()
    }

    /// Tries the canonical id first, then the lower-cased display name.
    pub fn consent_for(&self, canonical_id: &str, display_name: &str) -> bool {
        if !canonical_id.is_empty() {
            if let Some(consent) = self.consent_by_key.get(canonical_id) {
                return *consent;
            }
        }

        let name_key = display_name.trim().to_lowercase();
        self.consent_by_key.get(&name_key).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_prefers_id_over_name() {
        let rows = vec![
            RawRow::new()
                .with("CRN", " 12345678 ")
                .with("CUSTOMER_NAME", "Bager ApS")
                .with("MARKETING", "Ja"),
            RawRow::new().with("CUSTOMER_NAME", "Smed ApS").with("MARKETING", "x"),
            RawRow::new().with("CUSTOMER_NAME", "Bager ApS").with("MARKETING", ""),
        ];
        let lookup = MarketingConsentLookup::from_rows(&rows);

        assert!(lookup.consent_for("12345678", "Bager ApS"));
        assert!(lookup.consent_for("", "SMED APS"));
        assert!(!lookup.consent_for("", "Bager ApS"));
        assert!(!lookup.consent_for("99999999", "Ukendt"));
    }
}
