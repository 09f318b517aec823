use crate::pipeline::rows::{read_csv_rows, RawRow};
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    UnsupportedFormat { path: String },
    UnidentifiedFile { name: String },
    MissingSources(Vec<&'static str>),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            ImportError::Json(err) => write!(f, "invalid JSON rows: {}", err),
            ImportError::UnsupportedFormat { path } => {
                write!(f, "unsupported export format for '{}' (expected .csv or .json)", path)
            }
            ImportError::UnidentifiedFile { name } => {
                write!(f, "could not tell which export '{}' is from its name", name)
            }
            ImportError::MissingSources(missing) => {
                write!(f, "missing required exports: {}", missing.join(", "))
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::Json(err) => Some(err),
            ImportError::UnsupportedFormat { .. }
            | ImportError::UnidentifiedFile { .. }
            | ImportError::MissingSources(_) => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Encoding of a row export on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Csv,
    Json,
}

impl RowFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>, ImportError> {
    let path = path.as_ref();
    let format = RowFormat::from_path(path).ok_or_else(|| ImportError::UnsupportedFormat {
        path: path.display().to_string(),
    })?;
    let file = std::fs::File::open(path)?;
    let rows = rows_from_reader(file, format)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "loaded export rows");
    Ok(rows)
}

/// JSON exports are an array of objects keyed by column header.
pub fn rows_from_reader<R: Read>(reader: R, format: RowFormat) -> Result<Vec<RawRow>, ImportError> {
    match format {
        RowFormat::Csv => Ok(read_csv_rows(reader)?),
        RowFormat::Json => {
            let rows: Vec<RawRow> = serde_json::from_reader(reader)?;
            Ok(rows.into_iter().filter(|row| !row.is_blank()).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    #[test]
    fn format_follows_extension() {
        assert_eq!(RowFormat::from_path(&PathBuf::from("axa.CSV")), Some(RowFormat::Csv));
        assert_eq!(RowFormat::from_path(&PathBuf::from("kunder.json")), Some(RowFormat::Json));
        assert_eq!(RowFormat::from_path(&PathBuf::from("kunder.xlsx")), None);
    }

    #[test]
    fn json_rows_drop_blank_objects() {
        let json = r#"[{"NAME": "Bager Hansen"}, {"NAME": ""}]"#;
        let rows = rows_from_reader(Cursor::new(json), RowFormat::Json).expect("rows parse");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn unsupported_extension_is_reported() {
        let err = load_rows("exports/portefolje.xlsx").expect_err("xlsx is not supported");
        assert!(matches!(err, ImportError::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_sources_lists_every_gap() {
        let err = ImportError::MissingSources(vec!["converted", "rejected"]);
        assert_eq!(err.to_string(), "missing required exports: converted, rejected");
    }
}
