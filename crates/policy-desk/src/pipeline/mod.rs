pub mod aggregate;
pub mod consent;
pub mod domain;
pub mod identity;
pub mod mapping;
pub mod normalizer;
pub mod renewal;
pub mod rows;

pub use aggregate::{
    policy_rows, retain_active, ConsolidatedPolicy, Customer, CustomerDataset, CustomerDetails,
    CustomerSummary, DatasetMetadata, PolicyAggregator, PolicyRow, ProcessingSummary,
    ResolvedPolicy, WorkArea,
};
pub use consent::MarketingConsentLookup;
pub use domain::{AxaDetails, Policy, SourceCategory, NO_TAX_ID, WORK_INJURY_PRODUCT};
pub use identity::{CustomerDirectory, CustomerMasterRecord, ResolvedIdentity};
pub use renewal::main_renewal_month;
pub use rows::{CellValue, RawRow};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Raw rows for every policy source of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRows {
    #[serde(default)]
    pub axa: Vec<RawRow>,
    #[serde(default)]
    pub naersikring: Vec<RawRow>,
    #[serde(default)]
    pub accident_health: Vec<RawRow>,
}

/// Batch transform from source rows to the customer dataset. Lookup tables
/// are built once and shared read-only across runs.
#[derive(Debug, Clone, Default)]
pub struct PolicyPipeline {
    directory: CustomerDirectory,
    consent: MarketingConsentLookup,
}

impl PolicyPipeline {
    pub fn new(directory: CustomerDirectory, consent: MarketingConsentLookup) -> Self {
        Self { directory, consent }
    }

    pub fn from_rows(customer_rows: &[RawRow], consent_rows: &[RawRow]) -> Self {
        Self::new(
            CustomerDirectory::from_rows(customer_rows),
            MarketingConsentLookup::from_rows(consent_rows),
        )
    }

    pub fn directory(&self) -> &CustomerDirectory {
        &self.directory
    }

    /// Normalized policies in source order: AXA, Nærsikring, Accident/Health.
    pub fn normalize(&self, sources: &SourceRows) -> Vec<Policy> {
        let mut policies: Vec<Policy> = sources.axa.iter().map(normalizer::normalize_axa).collect();
        policies.extend(sources.naersikring.iter().map(normalizer::normalize_naersikring));
        policies.extend(normalizer::normalize_accident_health(&sources.accident_health));

        info!(
            axa = sources.axa.len(),
            naersikring = sources.naersikring.len(),
            accident_health = sources.accident_health.len(),
            normalized = policies.len(),
            "normalized policy rows"
        );
        policies
    }

    pub fn resolve(&self, policies: Vec<Policy>) -> Vec<ResolvedPolicy> {
        policies
            .into_iter()
            .map(|policy| ResolvedPolicy {
                identity: self.directory.resolve(&policy),
                policy,
            })
            .collect()
    }

    /// Active, identity-resolved policies.
    pub fn resolved_policies(&self, sources: &SourceRows) -> Vec<ResolvedPolicy> {
        let normalized = self.normalize(sources);
        let before = normalized.len();
        let active = retain_active(normalized);
        if active.len() != before {
            info!(dropped = before - active.len(), "filtered inactive and new policies");
        }
        self.resolve(active)
    }

    pub fn run(&self, sources: &SourceRows, exported_at: DateTime<Utc>) -> CustomerDataset {
        let resolved = self.resolved_policies(sources);
        let customers = PolicyAggregator::new(&self.consent).aggregate(&resolved);
        let processing_summary =
            ProcessingSummary::from_policies(resolved.iter().map(|entry| &entry.policy));

        info!(
            customers = customers.len(),
            policies = resolved.len(),
            "aggregated customer dataset"
        );

        CustomerDataset {
            metadata: DatasetMetadata {
                total_customers: customers.len(),
                total_policies: resolved.len(),
                export_date: exported_at,
                processing_summary,
            },
            customers,
        }
    }

    pub fn policy_rows(&self, sources: &SourceRows) -> Vec<PolicyRow> {
        policy_rows(&self.resolved_policies(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_sources() -> SourceRows {
        SourceRows {
            axa: vec![RawRow::new()
                .with("FORSIKRINGSTAGER_NAVN", "Bager Hansen ApS")
                .with("FORSIKRINGSTAGER_CVR", "12345678")
                .with("PRODUKT", "Bygning")
                .with("AARLIG_PRAEMIE", 5000.0)
                .with("STATUS", "Active")],
            naersikring: vec![RawRow::new()
                .with("Navnelabel", "0000001 Jens Hansen")
                .with("Policenr.", "N-9")
                .with("Årspræmie (Police)", 1200.0)],
            accident_health: Vec::new(),
        }
    }

    #[test]
    fn run_fills_metadata() {
        let customers = vec![RawRow::new()
            .with("NAME", "Jens Hansen")
            .with("SSN", "123456-7890")];
        let pipeline = PolicyPipeline::from_rows(&customers, &[]);
        let exported_at = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();

        let dataset = pipeline.run(&sample_sources(), exported_at);
        assert_eq!(dataset.metadata.total_customers, 2);
        assert_eq!(dataset.metadata.total_policies, 2);
        assert_eq!(dataset.metadata.export_date, exported_at);
        assert_eq!(dataset.metadata.processing_summary.axa_policies, 1);
        assert_eq!(dataset.metadata.processing_summary.naersikring_policies, 1);
        assert_eq!(dataset.customers[1].customer_details.canonical_id, "123456-7890");
    }

    #[test]
    fn empty_sources_give_empty_dataset() {
        let pipeline = PolicyPipeline::default();
        let exported_at = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let dataset = pipeline.run(&SourceRows::default(), exported_at);
        assert!(dataset.customers.is_empty());
        assert_eq!(dataset.metadata.total_policies, 0);
    }
}
