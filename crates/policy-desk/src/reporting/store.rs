use super::cache::{Clock, SystemClock, TtlCache};
use super::goals::SalesGoals;
use super::index::OfferIndex;
use super::offers::OfferDataset;
use crate::config::DataConfig;
use chrono::Duration;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DATASET_FILE: &str = "db.json";
pub const GOALS_FILE: &str = "sales_goals.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no offer dataset at {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed json in {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode offer dataset: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Everything the report views read, indexed once per load.
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub offers: OfferDataset,
    pub goals: SalesGoals,
    pub index: OfferIndex,
}

impl ReportData {
    pub fn new(offers: OfferDataset, goals: SalesGoals) -> Self {
        let index = OfferIndex::build(&offers);
        Self {
            offers,
            goals,
            index,
        }
    }
}

/// File-backed offer dataset and sales goals behind a TTL cache.
#[derive(Debug)]
pub struct DatasetStore<C: Clock = SystemClock> {
    data_dir: PathBuf,
    cache: TtlCache<ReportData, C>,
}

impl DatasetStore<SystemClock> {
    pub fn new(config: &DataConfig) -> Self {
        Self::with_clock(&config.data_dir, config.cache_ttl(), SystemClock)
    }
}

impl<C: Clock> DatasetStore<C> {
    pub fn with_clock(data_dir: impl Into<PathBuf>, ttl: Duration, clock: C) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: TtlCache::with_clock(ttl, clock),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILE)
    }

    pub fn goals_path(&self) -> PathBuf {
        self.data_dir.join(GOALS_FILE)
    }

    pub fn load(&self) -> Result<Arc<ReportData>, StoreError> {
        self.cache.get_or_try_load(|| {
            let offers = self.read_offers()?;
            let goals = self.read_goals()?;
            tracing::info!(
                converted = offers.converted.len(),
                non_converted = offers.non_converted.len(),
                rejected = offers.rejected.len(),
                "loaded offer dataset"
            );
            Ok(ReportData::new(offers, goals))
        })
    }

    /// Replaces `db.json`; the next load reads it back.
    pub fn save(&self, offers: &OfferDataset) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Write {
            path: self.data_dir.clone(),
            source,
        })?;

        let path = self.dataset_path();
        let body = serde_json::to_vec_pretty(offers).map_err(StoreError::Encode)?;
        fs::write(&path, body).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;
        self.cache.invalidate();

        tracing::info!(path = %path.display(), offers = offers.len(), "saved offer dataset");
        Ok(())
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_loaded()
    }

    fn read_offers(&self) -> Result<OfferDataset, StoreError> {
        let path = self.dataset_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing { path });
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode { path, source })
    }

    fn read_goals(&self) -> Result<SalesGoals, StoreError> {
        let path = self.goals_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no sales goals found; reporting without goals");
                return Ok(SalesGoals::default());
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rows::CellValue;
    use crate::reporting::cache::tests::ManualClock;
    use crate::reporting::offers::OfferRecord;

    fn store(dir: &Path) -> DatasetStore<ManualClock> {
        DatasetStore::with_clock(dir, Duration::seconds(300), ManualClock::default())
    }

    fn dataset() -> OfferDataset {
        OfferDataset {
            converted: vec![OfferRecord {
                master_product_name: "HDI - Netbankforsikring".to_string(),
                conversion_date: "2025-01-10".to_string(),
                annual_premium: CellValue::Number(1200.0),
                ..OfferRecord::default()
            }],
            ..OfferDataset::default()
        }
    }

    #[test]
    fn missing_dataset_is_reported() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let err = store(tmp.path()).load().expect_err("no db.json");
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[test]
    fn save_then_load_reads_the_new_dataset() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let store = store(&tmp.path().join("data"));

        store.save(&OfferDataset::default()).expect("save empty");
        assert!(store.load().expect("load").offers.is_empty());

        store.save(&dataset()).expect("save");
        let data = store.load().expect("reload");
        assert_eq!(data.offers.converted.len(), 1);
        assert_eq!(data.index.len(), 1);
        assert_eq!(data.goals, SalesGoals::default());
    }

    #[test]
    fn goals_and_camel_case_collections_are_read() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        fs::write(
            tmp.path().join(DATASET_FILE),
            r#"{"converted": [], "nonConverted": [{"PRODUKT": "Bil", "AARLIG_PRAEMIE": "900"}]}"#,
        )
        .expect("write db");
        fs::write(
            tmp.path().join(GOALS_FILE),
            r#"{"hdi": {"2025-01": 1000}, "nærsikring": {"2025-01": 250.5}}"#,
        )
        .expect("write goals");

        let data = store(tmp.path()).load().expect("load");
        assert_eq!(data.offers.non_converted[0].product, "Bil");
        assert_eq!(data.offers.non_converted[0].premium(), 900.0);
        assert!(data.offers.rejected.is_empty());
        assert_eq!(
            data.goals
                .goal_for(crate::reporting::filters::CompanySegment::All, "2025-01"),
            Some(1250.5)
        );
    }

    #[test]
    fn malformed_goals_are_an_error() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        fs::write(tmp.path().join(DATASET_FILE), "{}").expect("write db");
        fs::write(tmp.path().join(GOALS_FILE), "[1, 2]").expect("write goals");
        let err = store(tmp.path()).load().expect_err("bad goals");
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
