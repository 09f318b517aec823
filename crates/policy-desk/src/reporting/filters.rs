use super::offers::Company;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Company selection offered by the report views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompanySegment {
    #[serde(rename = "hdi")]
    Hdi,
    #[serde(rename = "axa")]
    Axa,
    #[serde(rename = "nærsikring", alias = "naersikring")]
    Naersikring,
    #[serde(rename = "hdi-axa")]
    HdiAxa,
    #[default]
    #[serde(rename = "alle", alias = "all")]
    All,
}

impl CompanySegment {
    pub const fn ordered() -> [Self; 5] {
        [Self::Hdi, Self::Axa, Self::Naersikring, Self::HdiAxa, Self::All]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Hdi => "hdi",
            Self::Axa => "axa",
            Self::Naersikring => "nærsikring",
            Self::HdiAxa => "hdi-axa",
            Self::All => "alle",
        }
    }

    /// Companies whose goals add up to this segment's goal.
    pub const fn companies(self) -> &'static [Company] {
        match self {
            Self::Hdi => &[Company::Hdi],
            Self::Axa => &[Company::Axa],
            Self::Naersikring => &[Company::Naersikring],
            Self::HdiAxa => &[Company::Hdi, Company::Axa],
            Self::All => &[Company::Hdi, Company::Axa, Company::Naersikring],
        }
    }

    /// Every segment but `alle` needs a known company.
    pub fn includes(self, company: Option<Company>) -> bool {
        match (self, company) {
            (Self::All, _) => true,
            (_, None) => false,
            (segment, Some(company)) => segment.companies().contains(&company),
        }
    }
}

impl fmt::Display for CompanySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSegment(pub String);

impl fmt::Display for UnknownSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown company segment '{}' (expected hdi, axa, nærsikring, hdi-axa or alle)",
            self.0
        )
    }
}

impl std::error::Error for UnknownSegment {}

impl FromStr for CompanySegment {
    type Err = UnknownSegment;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "hdi" => Ok(Self::Hdi),
            "axa" => Ok(Self::Axa),
            "nærsikring" | "naersikring" => Ok(Self::Naersikring),
            "hdi-axa" => Ok(Self::HdiAxa),
            "alle" | "all" => Ok(Self::All),
            _ => Err(UnknownSegment(value.to_string())),
        }
    }
}

/// Filter applied to indexed offers before a statistic reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferFilter {
    pub segment: CompanySegment,
    pub exclude_migrated: bool,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub advisor: Option<String>,
}

impl OfferFilter {
    pub fn for_segment(segment: CompanySegment, exclude_migrated: bool) -> Self {
        Self {
            segment,
            exclude_migrated,
            ..Self::default()
        }
    }

    pub fn in_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn in_month(mut self, month: Option<u32>) -> Self {
        self.month = month;
        self
    }

    pub fn for_advisor(mut self, advisor: impl Into<String>) -> Self {
        self.advisor = Some(advisor.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_cover_their_companies() {
        assert!(CompanySegment::HdiAxa.includes(Some(Company::Hdi)));
        assert!(CompanySegment::HdiAxa.includes(Some(Company::Axa)));
        assert!(!CompanySegment::HdiAxa.includes(Some(Company::Naersikring)));
        assert!(CompanySegment::All.includes(None));
        assert!(!CompanySegment::Axa.includes(None));
    }

    #[test]
    fn segments_parse_from_labels() {
        for segment in CompanySegment::ordered() {
            assert_eq!(segment.label().parse::<CompanySegment>(), Ok(segment));
        }
        assert_eq!("Naersikring".parse::<CompanySegment>(), Ok(CompanySegment::Naersikring));
        assert!("lb".parse::<CompanySegment>().is_err());
    }
}
