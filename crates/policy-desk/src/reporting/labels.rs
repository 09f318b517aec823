use std::collections::HashMap;
use std::sync::OnceLock;

static PRODUCT_LABEL_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

pub const UNKNOWN_PRODUCT: &str = "Ukendt";

/// Advisors with their own column in the month table.
pub const ADVISOR_ROSTER: [&str; 7] = [
    "flfa_lb", "jlar_lb", "rovi_lb", "naas_lb", "mapk_lb", "kevfit", "adrb",
];

/// Bucket for handlers outside the roster.
pub const OTHER_ADVISORS: &str = "andre";

/// Full names as they appear in Nærsikring handler text.
const ADVISOR_FULL_NAMES: &[(&str, &str)] = &[
    ("Flemming Falkengaard", "flfa_lb"),
    ("Jakob Nymand Larsen", "jlar_lb"),
    ("Kevin Fitzgerald", "kevfit"),
    ("Maria Påskesen", "mapk_lb"),
    ("Nils Aaskilde", "naas_lb"),
    ("Ronja Vikjær Rytter", "rovi_lb"),
    ("Andreas Dræby", "adrb"),
];

/// Short product label for a master product name. Unknown names are shown
/// as they are.
pub fn product_label(master_name: &str) -> String {
    if master_name.is_empty() {
        return UNKNOWN_PRODUCT.to_string();
    }
    product_label_map()
        .get(master_name)
        .map(|label| (*label).to_string())
        .unwrap_or_else(|| master_name.to_string())
}

/// Roster code for a handler: roster codes pass as-is, text containing a
/// known full name maps to its code, and anything else is returned unchanged.
pub fn advisor_code(case_handler: &str) -> String {
    if case_handler.is_empty() || ADVISOR_ROSTER.contains(&case_handler) {
        return case_handler.to_string();
    }

    ADVISOR_FULL_NAMES
        .iter()
        .find(|(full_name, _)| case_handler.contains(full_name))
        .map(|(_, code)| (*code).to_string())
        .unwrap_or_else(|| case_handler.to_string())
}

pub fn is_rostered(code: &str) -> bool {
    ADVISOR_ROSTER.contains(&code)
}

fn product_label_map() -> &'static HashMap<&'static str, &'static str> {
    PRODUCT_LABEL_MAP.get_or_init(|| {
        const LABELS: &[(&str, &str)] = &[
            ("LB Master Bil - Pakke", "Bilforsikring"),
            ("LB Master Bil - MIG PROD", "Bilforsikring"),
            ("LB Master Løsøre - Pakke", "Løsøreforsikring"),
            ("LB Master Løsøre - MIG PROD", "Løsøreforsikring"),
            // "Erhversansvar" is spelled this way in the exports
            ("LB Master Erhversansvar - Pakke", "Erhvervsansvar"),
            ("LB Master Erhversansvar - MIG PROD", "Erhvervsansvar"),
            ("LB Master Bygning - Pakke", "Bygning"),
            ("LB Master Bygning - MIG PROD", "Bygning"),
            ("LB Master Retshjælp - Pakke", "Retshjælp"),
            ("LB Master Retshjælp - MIG PROD", "Retshjælp"),
            ("LB Master Trailer - Pakke", "Trailer"),
            ("LB Master Trailer - MIG PROD", "Trailer"),
            ("HDI - Nøgleperson", "Nøgleperson"),
            ("HDI - Nøgleperson - MIG PROD", "Nøgleperson"),
            ("HDI - Professionel ansvarsforsikring", "Prof. ansvar"),
            ("HDI - Professionel ansvarsforsikring- IT", "Prof. ansvar IT"),
            ("HDI - Netbankforsikring", "Netbank"),
            ("HDI - Bestyrelsesansvar", "Bestyrelsesansvar"),
            ("HDI - Erhvervsrejse Årsrejse", "Erhvervsrejse Årsrejse"),
            ("HDI - Erhvervsrejse individuel", "Erhvervsrejse individuel"),
            ("HDI - Kollektiv ulykkeforsikring", "Kollektiv Ulykke"),
            ("Nærsikring - Arbejdsskadeforsikring", "Arbejdsskadeforsikring"),
        ];
        LABELS.iter().copied().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_labels_fail_open() {
        assert_eq!(product_label("LB Master Bil - MIG PROD"), "Bilforsikring");
        assert_eq!(product_label("HDI - Professionel ansvarsforsikring- IT"), "Prof. ansvar IT");
        assert_eq!(product_label("HDI - Cyber"), "HDI - Cyber");
        assert_eq!(product_label(""), UNKNOWN_PRODUCT);
    }

    #[test]
    fn advisor_codes_from_codes_and_names() {
        assert_eq!(advisor_code("kevfit"), "kevfit");
        assert_eq!(advisor_code("Maria Påskesen (44)"), "mapk_lb");
        assert_eq!(advisor_code("ekstern"), "ekstern");
        assert!(!is_rostered("ekstern"));
        assert!(is_rostered("adrb"));
    }
}
