use super::offers::{OfferDataset, OfferRecord};
use crate::import::{load_rows, ImportError};
use crate::pipeline::normalizer::naersikring_db_code;
use crate::pipeline::rows::{CellValue, RawRow};
use crate::pipeline::WORK_INJURY_PRODUCT;
use std::path::Path;

const WORK_INJURY_MASTER_NAME: &str = "Nærsikring - Arbejdsskadeforsikring";
const LABEL_PREFIX_CHARS: usize = 7;

/// The four exports that make up an offer dataset upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFileKind {
    Converted,
    NonConverted,
    Rejected,
    NaersikringPortfolio,
}

impl SourceFileKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Converted,
            Self::NonConverted,
            Self::Rejected,
            Self::NaersikringPortfolio,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Converted => "converted offers",
            Self::NonConverted => "non-converted offers",
            Self::Rejected => "rejected offers",
            Self::NaersikringPortfolio => "Nærsikring portfolio",
        }
    }

    /// Classifies an export by file name. "Not converted" names also contain
    /// "konverterede", so they are checked first.
    pub fn identify(file_name: &str) -> Option<Self> {
        let name = file_name.to_lowercase();
        let contains_any = |needles: &[&str]| needles.iter().any(|needle| name.contains(needle));

        if contains_any(&["ikkekonverteredetilbud", "ikkekonverterede", "ikke konverterede"]) {
            Some(Self::NonConverted)
        } else if contains_any(&["konverterede", "accepted"]) {
            Some(Self::Converted)
        } else if contains_any(&["afviste", "rejected"]) {
            Some(Self::Rejected)
        } else if contains_any(&["portefølje", "naersikring", "nærsikring"]) {
            Some(Self::NaersikringPortfolio)
        } else {
            None
        }
    }
}

/// Offer record for one row of the Nærsikring portfolio export.
pub fn naersikring_offer(row: &RawRow) -> OfferRecord {
    let label = row
        .first_text(&["Navnelabel", "navnelabel"])
        .unwrap_or_default();
    let name: String = label.chars().skip(LABEL_PREFIX_CHARS).collect();
    let short_label: String = label.chars().take(LABEL_PREFIX_CHARS).collect();

    let mut record = OfferRecord {
        product: WORK_INJURY_PRODUCT.to_string(),
        master_product_name: WORK_INJURY_MASTER_NAME.to_string(),
        offer_start_date: row.text_or_empty("Ikrafttrædelse"),
        annual_premium: row
            .cell("Årspræmie")
            .cloned()
            .unwrap_or(CellValue::Number(0.0)),
        case_handler: row.text_or_empty("Provisionsmodtager1"),
        registration_id: row.first_text(&["CVRnr.", "CVRnr"]).unwrap_or_default(),
        customer_name: if name.is_empty() { label.clone() } else { name },
        ..OfferRecord::default()
    };

    let extras = [
        ("SAELGER", row.text_or_empty("Selskab")),
        (
            "POLICE_NR",
            row.first_text(&["Policenr.", "Policenr"]).unwrap_or_default(),
        ),
        ("FORSIKRINGSTAGER", short_label),
        ("EKSTERN_KUNDE_NR", row.text_or_empty("Kundenr. andet selskab")),
        ("DB_KODE", naersikring_db_code(row).unwrap_or_default()),
    ];
    for (column, value) in extras {
        record.set(column, CellValue::Text(value));
    }
    record
}

/// Rows collected per export kind before assembly.
#[derive(Debug, Clone, Default)]
pub struct OfferSources {
    converted: Option<Vec<RawRow>>,
    non_converted: Option<Vec<RawRow>>,
    rejected: Option<Vec<RawRow>>,
    naersikring: Option<Vec<RawRow>>,
}

impl OfferSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores rows for an export kind, replacing any earlier file of that kind.
    pub fn insert(&mut self, kind: SourceFileKind, rows: Vec<RawRow>) {
        let slot = match kind {
            SourceFileKind::Converted => &mut self.converted,
            SourceFileKind::NonConverted => &mut self.non_converted,
            SourceFileKind::Rejected => &mut self.rejected,
            SourceFileKind::NaersikringPortfolio => &mut self.naersikring,
        };
        if slot.replace(rows).is_some() {
            tracing::warn!(kind = kind.label(), "export supplied twice; keeping the last one");
        }
    }

    pub fn with(mut self, kind: SourceFileKind, rows: Vec<RawRow>) -> Self {
        self.insert(kind, rows);
        self
    }

    /// Reads every file, classifying it by name.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ImportError> {
        let mut sources = Self::new();
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let kind = SourceFileKind::identify(&name)
                .ok_or_else(|| ImportError::UnidentifiedFile { name: name.clone() })?;
            let rows = load_rows(path)?;
            tracing::info!(file = %name, kind = kind.label(), rows = rows.len(), "read offer export");
            sources.insert(kind, rows);
        }
        Ok(sources)
    }

    fn missing(&self) -> Vec<&'static str> {
        let present = [
            (SourceFileKind::Converted, self.converted.is_some()),
            (SourceFileKind::NonConverted, self.non_converted.is_some()),
            (SourceFileKind::Rejected, self.rejected.is_some()),
            (SourceFileKind::NaersikringPortfolio, self.naersikring.is_some()),
        ];
        present
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(kind, _)| kind.label())
            .collect()
    }

    /// Builds the offer dataset; the Nærsikring portfolio is appended to the
    /// converted offers.
    pub fn assemble(self) -> Result<OfferDataset, ImportError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ImportError::MissingSources(missing));
        }

        let records = |rows: Option<Vec<RawRow>>| -> Vec<OfferRecord> {
            rows.unwrap_or_default().iter().map(OfferRecord::from_row).collect()
        };

        let mut converted = records(self.converted);
        let portfolio = self.naersikring.unwrap_or_default();
        converted.extend(portfolio.iter().map(naersikring_offer));

        let dataset = OfferDataset {
            converted,
            non_converted: records(self.non_converted),
            rejected: records(self.rejected),
        };
        tracing::info!(
            converted = dataset.converted.len(),
            portfolio = portfolio.len(),
            non_converted = dataset.non_converted.len(),
            rejected = dataset.rejected.len(),
            "assembled offer dataset"
        );
        Ok(dataset)
    }
}
