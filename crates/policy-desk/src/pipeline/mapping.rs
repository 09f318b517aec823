use std::collections::HashMap;
use std::sync::OnceLock;

static PAYMENT_FREQUENCY_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
static ENGLISH_MONTH_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

pub const DANISH_MONTHS: [&str; 12] = [
    "Januar", "Februar", "Marts", "April", "Maj", "Juni", "Juli", "August", "September",
    "Oktober", "November", "December",
];

/// Handler name fragments as they look after stripping everything but
/// ASCII letters and lower-casing; `å`, `æ` and `ø` disappear entirely.
const HANDLER_FRAGMENTS: &[(&str, &str)] = &[
    ("flemmingfalkengaard", "flfa_lb"),
    ("nilsaaskilde", "naas_lb"),
    ("ronjastterauvikjr", "rovi_lb"),
    ("jakobnymandlarsen", "jlar_lb"),
    ("kevinfitzgeraldfratrdt", "kevfit"),
    ("mariapskesen", "mapk_lb"),
];

/// Unknown frequencies are returned unchanged.
pub fn payment_frequency(value: &str) -> String {
    lookup_or_input(payment_frequency_map(), value)
}

/// English month names become Danish; anything else is returned unchanged.
pub fn danish_month(value: &str) -> String {
    lookup_or_input(english_month_map(), value)
}

/// Month number 1-12 to its Danish name.
pub fn danish_month_for_number(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    DANISH_MONTHS.get(index).copied()
}

/// Reduces free-text handler names to initials where a roster fragment is
/// found. Text without a known fragment comes back in its stripped form.
pub fn case_handler_code(value: &str) -> String {
    let mut stripped: String = value
        .chars()
        .filter(char::is_ascii_alphabetic)
        .collect::<String>()
        .to_ascii_lowercase();

    for (fragment, code) in HANDLER_FRAGMENTS {
        if stripped.contains(fragment) {
            stripped = stripped.replace(fragment, code);
        }
    }

    stripped
}

fn lookup_or_input(map: &HashMap<&'static str, &'static str>, value: &str) -> String {
    map.get(value)
        .map(|mapped| (*mapped).to_string())
        .unwrap_or_else(|| value.to_string())
}

fn payment_frequency_map() -> &'static HashMap<&'static str, &'static str> {
    PAYMENT_FREQUENCY_MAP.get_or_init(|| {
        const FREQUENCIES: &[(&str, &str)] = &[
            ("Annual (no fee)", "1 ÅR"),
            ("Quarterly (8% additional fee)", "3 MD"),
            ("Half-yearly (5% additional fee)", "6 MD"),
            ("Monthly", "1 MD"),
        ];
        FREQUENCIES.iter().copied().collect()
    })
}

fn english_month_map() -> &'static HashMap<&'static str, &'static str> {
    ENGLISH_MONTH_MAP.get_or_init(|| {
        const MONTHS: &[(&str, &str)] = &[
            ("January", "Januar"),
            ("February", "Februar"),
            ("March", "Marts"),
            ("April", "April"),
            ("May", "Maj"),
            ("June", "Juni"),
            ("July", "Juli"),
            ("August", "August"),
            ("September", "September"),
            ("October", "Oktober"),
            ("November", "November"),
            ("December", "December"),
        ];
        MONTHS.iter().copied().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequencies_fail_open() {
        assert_eq!(payment_frequency("Quarterly (8% additional fee)"), "3 MD");
        assert_eq!(payment_frequency("1 ÅR"), "1 ÅR");
        assert_eq!(payment_frequency(""), "");
    }

    #[test]
    fn months_translate_or_pass_through() {
        assert_eq!(danish_month("March"), "Marts");
        assert_eq!(danish_month("Marts"), "Marts");
        assert_eq!(danish_month_for_number(6), Some("Juni"));
        assert_eq!(danish_month_for_number(0), None);
        assert_eq!(danish_month_for_number(13), None);
    }

    #[test]
    fn handler_names_reduce_to_codes() {
        assert_eq!(case_handler_code("Flemming Falkengaard (12)"), "flfa_lb");
        assert_eq!(case_handler_code("Ronja Søtterau Vikjær"), "rovi_lb");
        assert_eq!(case_handler_code("Kevin Fitzgerald - fratrådt"), "kevfit");
        assert_eq!(case_handler_code("Ukendt Person 7"), "ukendtperson");
    }
}
