use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;

/// A single spreadsheet cell as handed over by the row producer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Text rendering; whole numbers drop their fractional part.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => format_number(*number),
            CellValue::Empty => String::new(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(number) if number.is_finite() => Some(*number),
            CellValue::Number(_) => None,
            CellValue::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Empty => None,
        }
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(flag) => CellValue::Text(flag.to_string()),
            Value::Number(number) => number
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or(CellValue::Empty),
            Value::String(text) if text.trim().is_empty() => CellValue::Empty,
            Value::String(text) => CellValue::Text(text),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CellValue::Text(text) => serializer.serialize_str(text),
            CellValue::Number(number) => serializer.serialize_f64(*number),
            CellValue::Empty => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(CellValue::from)
    }
}

/// Column-name keyed view over one spreadsheet row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow {
    cells: BTreeMap<String, CellValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<CellValue>) {
        self.cells.insert(clean_header(column), value.into());
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn cell(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column).filter(|cell| !cell.is_empty())
    }

    /// Non-empty text for the column, if any.
    pub fn text(&self, column: &str) -> Option<String> {
        self.cell(column).map(CellValue::as_text)
    }

    pub fn text_or_empty(&self, column: &str) -> String {
        self.text(column).unwrap_or_default()
    }

    /// First non-empty value across the given spellings of a column.
    pub fn first_text(&self, columns: &[&str]) -> Option<String> {
        columns.iter().find_map(|column| self.text(column))
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.cell(column).and_then(CellValue::as_f64)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_empty)
    }
}

/// Returns the first alias present as a column header in the row.
pub fn resolve_alias<'a>(row: &RawRow, aliases: &[&'a str]) -> Option<&'a str> {
    aliases.iter().copied().find(|alias| row.has_column(alias))
}

fn clean_header(value: &str) -> String {
    value.replace(['\u{feff}', '\u{200b}'], "").trim().to_string()
}

/// Reads a CSV export with a header row into raw rows, skipping blank lines.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let mut row = RawRow::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if header.trim().is_empty() {
                continue;
            }
            row.insert(header, field);
        }

        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}
