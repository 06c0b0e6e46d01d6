//! Case intake: the facts a petitioner supplies about one immigration case.
//!
//! Intake arrives as JSON (from the CLI or an embedding web layer):
//!
//! ```json
//! {
//!   "petitioner": { "given_name": "John", "family_name": "Smith",
//!                   "date_of_birth": "1988-04-02" },
//!   "beneficiary": { "given_name": "Maria", "family_name": "Garcia",
//!                    "country_of_birth": "Mexico", "date_of_birth": "1990-09-15" },
//!   "relationship": "Spouse",
//!   "visa_type": "I-130 (Spouse)",
//!   "marriage_date": "2023-06-10"
//! }
//! ```

use crate::error::CasePackError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Country assumed for a petitioner who does not state one.
pub const DEFAULT_PETITIONER_COUNTRY: &str = "United States";

/// Long-form date, e.g. `June 10, 2023`.
pub const LONG_DATE_FORMAT: &str = "%B %d, %Y";

/// Date format the USCIS form fields expect, e.g. `06/10/2023`.
pub const FORM_DATE_FORMAT: &str = "%m/%d/%Y";

/// One party to the petition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub given_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_birth: Option<String>,
    pub date_of_birth: NaiveDate,
}

impl Person {
    /// `"Given Family"`, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name.trim(), self.family_name.trim())
            .trim()
            .to_string()
    }
}

/// How the beneficiary is related to the petitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Spouse,
    #[serde(rename = "Fiancé", alias = "Fiance")]
    Fiance,
    Parent,
    Child,
    Other,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relationship::Spouse => "Spouse",
            Relationship::Fiance => "Fiancé",
            Relationship::Parent => "Parent",
            Relationship::Child => "Child",
            Relationship::Other => "Other",
        })
    }
}

/// The visa category being pursued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisaType {
    #[serde(rename = "I-130 (Spouse)")]
    I130Spouse,
    #[serde(rename = "K-1 (Fiancé)", alias = "K-1 (Fiance)")]
    K1Fiance,
    Other,
}

impl fmt::Display for VisaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VisaType::I130Spouse => "I-130 (Spouse)",
            VisaType::K1Fiance => "K-1 (Fiancé)",
            VisaType::Other => "Other",
        })
    }
}

/// Everything needed to draft a checklist and fill the petition form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseIntake {
    pub petitioner: Person,
    pub beneficiary: Person,
    pub relationship: Relationship,
    pub visa_type: VisaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marriage_date: Option<NaiveDate>,
}

impl CaseIntake {
    /// Parse intake JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, CasePackError> {
        let intake: Self = serde_json::from_str(json)
            .map_err(|e| CasePackError::InvalidIntake(e.to_string()))?;
        intake.validate()?;
        Ok(intake)
    }

    /// Reject intake the form could not be filled from.
    pub fn validate(&self) -> Result<(), CasePackError> {
        for (role, person) in [("petitioner", &self.petitioner), ("beneficiary", &self.beneficiary)] {
            if person.given_name.trim().is_empty() {
                return Err(CasePackError::InvalidIntake(format!(
                    "{role} given name is empty"
                )));
            }
            if person.family_name.trim().is_empty() {
                return Err(CasePackError::InvalidIntake(format!(
                    "{role} family name is empty"
                )));
            }
        }
        Ok(())
    }

    pub fn petitioner_country(&self) -> &str {
        country_or(&self.petitioner, DEFAULT_PETITIONER_COUNTRY)
    }

    pub fn beneficiary_country(&self) -> &str {
        country_or(&self.beneficiary, "")
    }

    /// File-name stem shared by every artifact of this case, e.g.
    /// `john_smith_maria_garcia`.
    ///
    /// Only `[a-z0-9_]` survives; accented letters lose their marks first.
    pub fn case_slug(&self) -> String {
        let names = format!(
            "{} {}",
            self.petitioner.full_name(),
            self.beneficiary.full_name()
        );
        let folded = crate::pipeline::normalize::retain_supported(&names).to_lowercase();
        let mut slug = String::with_capacity(folded.len());
        for c in folded.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c);
            } else if !slug.is_empty() && !slug.ends_with('_') {
                slug.push('_');
            }
        }
        let slug = slug.trim_end_matches('_');
        if slug.is_empty() {
            "case".to_string()
        } else {
            slug.to_string()
        }
    }
}

fn country_or<'a>(person: &'a Person, fallback: &'a str) -> &'a str {
    match person.country_of_birth.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => fallback,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_intake() -> CaseIntake {
        CaseIntake {
            petitioner: Person {
                given_name: "John".into(),
                family_name: "Smith".into(),
                country_of_birth: None,
                date_of_birth: NaiveDate::from_ymd_opt(1988, 4, 2).unwrap(),
            },
            beneficiary: Person {
                given_name: "Mar\u{ed}a".into(),
                family_name: "Garc\u{ed}a".into(),
                country_of_birth: Some("Mexico".into()),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 9, 15).unwrap(),
            },
            relationship: Relationship::Spouse,
            visa_type: VisaType::I130Spouse,
            marriage_date: NaiveDate::from_ymd_opt(2023, 6, 10),
        }
    }

    #[test]
    fn parses_json_with_display_labels() {
        let json = r#"{
            "petitioner": {"given_name": "John", "family_name": "Smith", "date_of_birth": "1988-04-02"},
            "beneficiary": {"given_name": "Ana", "family_name": "Lopez",
                            "country_of_birth": "Peru", "date_of_birth": "1991-01-20"},
            "relationship": "Fiancé",
            "visa_type": "K-1 (Fiancé)"
        }"#;
        let intake = CaseIntake::from_json(json).unwrap();
        assert_eq!(intake.relationship, Relationship::Fiance);
        assert_eq!(intake.visa_type, VisaType::K1Fiance);
        assert_eq!(intake.marriage_date, None);
        assert_eq!(intake.petitioner_country(), DEFAULT_PETITIONER_COUNTRY);
        assert_eq!(intake.beneficiary_country(), "Peru");
    }

    #[test]
    fn ascii_aliases_accepted() {
        let r: Relationship = serde_json::from_str("\"Fiance\"").unwrap();
        assert_eq!(r, Relationship::Fiance);
        let v: VisaType = serde_json::from_str("\"K-1 (Fiance)\"").unwrap();
        assert_eq!(v, VisaType::K1Fiance);
    }

    #[test]
    fn display_matches_serde_label() {
        for v in [VisaType::I130Spouse, VisaType::K1Fiance, VisaType::Other] {
            assert_eq!(serde_json::to_string(&v).unwrap(), format!("\"{v}\""));
        }
        for r in [
            Relationship::Spouse,
            Relationship::Fiance,
            Relationship::Parent,
            Relationship::Child,
            Relationship::Other,
        ] {
            assert_eq!(serde_json::to_string(&r).unwrap(), format!("\"{r}\""));
        }
    }

    #[test]
    fn empty_names_rejected() {
        let mut intake = sample_intake();
        intake.beneficiary.family_name = "  ".into();
        let err = intake.validate().unwrap_err();
        assert!(err.to_string().contains("beneficiary family name"));
    }

    #[test]
    fn malformed_json_is_invalid_intake() {
        assert!(matches!(
            CaseIntake::from_json("{\"petitioner\": 3}"),
            Err(CasePackError::InvalidIntake(_))
        ));
    }

    #[test]
    fn slug_is_lowercase_ascii() {
        assert_eq!(sample_intake().case_slug(), "john_smith_maria_garcia");

        let mut intake = sample_intake();
        intake.petitioner.given_name = "Mary-Jane  O'Neil".into();
        assert_eq!(intake.case_slug(), "mary_jane_o_neil_smith_maria_garcia");
    }

    #[test]
    fn blank_country_falls_back() {
        let mut intake = sample_intake();
        intake.petitioner.country_of_birth = Some("   ".into());
        assert_eq!(intake.petitioner_country(), "United States");
        intake.beneficiary.country_of_birth = None;
        assert_eq!(intake.beneficiary_country(), "");
    }
}
