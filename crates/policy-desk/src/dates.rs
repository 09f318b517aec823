use crate::pipeline::rows::CellValue;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta};

/// Spreadsheet serials at or below this are treated as plain numbers.
const SERIAL_THRESHOLD: f64 = 1000.0;

/// 31-12-9999, the last date a spreadsheet can hold.
const MAX_SERIAL: f64 = 2_958_465.0;

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Serials outside the spreadsheet date range yield `None`.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= SERIAL_THRESHOLD || serial > MAX_SERIAL {
        return None;
    }
    let offset = TimeDelta::try_days(serial.trunc() as i64)?;
    excel_epoch().checked_add_signed(offset)
}

/// Renders date cells as `DD-MM-YYYY` when they carry a spreadsheet serial;
/// everything else is kept as the original text.
pub fn render_date_cell(cell: Option<&CellValue>) -> String {
    let Some(cell) = cell else {
        return String::new();
    };

    let serial = match cell {
        CellValue::Number(number) => Some(*number),
        CellValue::Text(text) => text.trim().parse::<f64>().ok(),
        CellValue::Empty => None,
    };

    match serial.and_then(excel_serial_to_date) {
        Some(date) => date.format("%d-%m-%Y").to_string(),
        None => cell.as_text(),
    }
}

/// Ordering key for `DD-MM-YYYY` creation dates: the dash-separated parts
/// reversed, so that plain string comparison sorts chronologically.
pub fn creation_date_key(value: &str) -> String {
    value.split('-').rev().collect::<Vec<_>>().join("-")
}

/// Parses the date formats found in offer exports.
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.contains('T') {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.date_naive());
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
                return Some(parsed.date());
            }
        }
        return value
            .split('T')
            .next()
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());
    }

    for format in ["%Y-%m-%d", "%Y.%m.%d", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.date());
    }

    value.parse::<f64>().ok().and_then(excel_serial_to_date)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

/// `YYYY-MM` key used by the goal tables.
pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

pub fn month_key_for(date: NaiveDate) -> String {
    month_key(date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn serials_render_as_danish_dates() {
        let cell = CellValue::Number(45000.0);
        assert_eq!(render_date_cell(Some(&cell)), "15-03-2023");
        let text = CellValue::Text("45000".to_string());
        assert_eq!(render_date_cell(Some(&text)), "15-03-2023");
    }

    #[test]
    fn non_serial_cells_pass_through() {
        let cell = CellValue::Text("01-02-2024".to_string());
        assert_eq!(render_date_cell(Some(&cell)), "01-02-2024");
        assert_eq!(render_date_cell(Some(&CellValue::Number(12.0))), "12");
        assert_eq!(render_date_cell(None), "");
    }

    #[test]
    fn creation_key_orders_chronologically() {
        assert!(creation_date_key("31-12-2019") < creation_date_key("01-01-2020"));
        assert_eq!(creation_date_key("05-03-2021"), "2021-03-05");
    }

    #[test]
    fn flexible_dates_cover_export_formats() {
        assert_eq!(parse_flexible_date("2025-03-14T23:00:00.000Z"), Some(date(2025, 3, 14)));
        assert_eq!(parse_flexible_date("2025-03-14T10:30:00"), Some(date(2025, 3, 14)));
        assert_eq!(parse_flexible_date("2025.03.14"), Some(date(2025, 3, 14)));
        assert_eq!(parse_flexible_date("2025-03-14"), Some(date(2025, 3, 14)));
        assert_eq!(parse_flexible_date("14-03-2025"), Some(date(2025, 3, 14)));
        assert_eq!(parse_flexible_date("45000"), Some(date(2023, 3, 15)));
        assert_eq!(parse_flexible_date("snart"), None);
        assert_eq!(parse_flexible_date(""), None);
    }

    #[test]
    fn out_of_range_serials_are_not_dates() {
        assert_eq!(excel_serial_to_date(2_958_465.0), Some(date(9999, 12, 31)));
        assert_eq!(excel_serial_to_date(2_958_466.0), None);
        assert_eq!(excel_serial_to_date(1e20), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
        assert_eq!(excel_serial_to_date(-45000.0), None);
    }

    #[test]
    fn malformed_date_cells_keep_their_text() {
        let huge = CellValue::Text("99999999999999999999".to_string());
        assert_eq!(render_date_cell(Some(&huge)), "99999999999999999999");
        let number = CellValue::Number(1e300);
        assert_eq!(render_date_cell(Some(&number)), number.as_text());
        let garbage = CellValue::Text("i morgen".to_string());
        assert_eq!(render_date_cell(Some(&garbage)), "i morgen");
    }

    #[test]
    fn unparseable_date_text_yields_none() {
        assert_eq!(parse_flexible_date("1e20"), None);
        assert_eq!(parse_flexible_date("99999999999999999999"), None);
        assert_eq!(parse_flexible_date("32-13-2025"), None);
        assert_eq!(parse_flexible_date("2025-02-30T10:00:00"), None);
        assert_eq!(parse_flexible_date("NaN"), None);
    }

    #[test]
    fn month_lengths_follow_calendar() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(month_key(2025, 3), "2025-03");
    }
}
