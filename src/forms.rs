//! Form schemas: which reference-document field receives which intake value.
//!
//! Field identifiers of a government form are only stable within one
//! revision of the PDF. Each [`FormSchema`] pins the identifiers of one
//! revision so a new revision is a new table, not a hunt for string literals.
//! [`FormSchema::missing_fields`] compares a schema against the fields a
//! template actually contains.

use crate::intake::{CaseIntake, FORM_DATE_FORMAT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field identifier → value to write, built once per submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An intake attribute that can be written into a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeField {
    PetitionerFamilyName,
    PetitionerGivenName,
    PetitionerDateOfBirth,
    PetitionerCountryOfBirth,
    BeneficiaryFamilyName,
    BeneficiaryGivenName,
    BeneficiaryDateOfBirth,
    BeneficiaryCountryOfBirth,
}

impl IntakeField {
    /// The display value for this attribute; dates use `MM/DD/YYYY`.
    pub fn value(self, intake: &CaseIntake) -> String {
        let p = &intake.petitioner;
        let b = &intake.beneficiary;
        match self {
            IntakeField::PetitionerFamilyName => p.family_name.trim().to_string(),
            IntakeField::PetitionerGivenName => p.given_name.trim().to_string(),
            IntakeField::PetitionerDateOfBirth => {
                p.date_of_birth.format(FORM_DATE_FORMAT).to_string()
            }
            IntakeField::PetitionerCountryOfBirth => intake.petitioner_country().to_string(),
            IntakeField::BeneficiaryFamilyName => b.family_name.trim().to_string(),
            IntakeField::BeneficiaryGivenName => b.given_name.trim().to_string(),
            IntakeField::BeneficiaryDateOfBirth => {
                b.date_of_birth.format(FORM_DATE_FORMAT).to_string()
            }
            IntakeField::BeneficiaryCountryOfBirth => intake.beneficiary_country().to_string(),
        }
    }
}

/// One row of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field_id: &'static str,
    pub source: IntakeField,
}

/// A named, versioned field table for one reference form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSchema {
    /// Short id used on the command line and in file names, e.g. `i-130`.
    pub id: &'static str,
    /// Edition of the reference PDF the identifiers were taken from.
    pub revision: &'static str,
    pub fields: &'static [FieldSpec],
}

/// USCIS Form I-130, Petition for Alien Relative.
pub const I130: FormSchema = FormSchema {
    id: "i-130",
    revision: "04/01/24",
    fields: &[
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt1Line1_FamilyName[0]",
            source: IntakeField::PetitionerFamilyName,
        },
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt1Line1_GivenName[0]",
            source: IntakeField::PetitionerGivenName,
        },
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt1Line5_DateofBirth[0]",
            source: IntakeField::PetitionerDateOfBirth,
        },
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt1Line6_Country[0]",
            source: IntakeField::PetitionerCountryOfBirth,
        },
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt4Line1_FamilyName[0]",
            source: IntakeField::BeneficiaryFamilyName,
        },
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt4Line1_GivenName[0]",
            source: IntakeField::BeneficiaryGivenName,
        },
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt4Line5_DateofBirth[0]",
            source: IntakeField::BeneficiaryDateOfBirth,
        },
        FieldSpec {
            field_id: "form1[0].#subform[0].Pt4Line6_Country[0]",
            source: IntakeField::BeneficiaryCountryOfBirth,
        },
    ],
};

/// Every schema this build knows about.
pub const SCHEMAS: &[FormSchema] = &[I130];

impl FormSchema {
    /// Find a schema by id, case-insensitively.
    pub fn lookup(id: &str) -> Option<&'static FormSchema> {
        SCHEMAS.iter().find(|s| s.id.eq_ignore_ascii_case(id.trim()))
    }

    /// Build the field map for one case.
    pub fn field_map(&self, intake: &CaseIntake) -> FieldMap {
        self.fields
            .iter()
            .map(|f| (f.field_id, f.source.value(intake)))
            .collect()
    }

    /// Schema identifiers not present among `template_fields`.
    pub fn missing_fields<'a, I>(&self, template_fields: I) -> Vec<&'static str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: std::collections::HashSet<&str> = template_fields.into_iter().collect();
        self.fields
            .iter()
            .map(|f| f.field_id)
            .filter(|id| !present.contains(id))
            .collect()
    }

    /// Upper-case id for display names, e.g. `I130`.
    pub fn display_id(&self) -> String {
        self.id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::sample_intake;

    #[test]
    fn i130_map_has_all_eight_fields() {
        let map = I130.field_map(&sample_intake());
        assert_eq!(map.len(), 8);
        assert_eq!(
            map.get("form1[0].#subform[0].Pt1Line1_FamilyName[0]"),
            Some("Smith")
        );
        assert_eq!(
            map.get("form1[0].#subform[0].Pt1Line5_DateofBirth[0]"),
            Some("04/02/1988")
        );
        assert_eq!(
            map.get("form1[0].#subform[0].Pt1Line6_Country[0]"),
            Some("United States")
        );
        assert_eq!(
            map.get("form1[0].#subform[0].Pt4Line1_GivenName[0]"),
            Some("Mar\u{ed}a")
        );
        assert_eq!(
            map.get("form1[0].#subform[0].Pt4Line6_Country[0]"),
            Some("Mexico")
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(FormSchema::lookup("I-130"), Some(&I130));
        assert_eq!(FormSchema::lookup(" i-130 "), Some(&I130));
        assert!(FormSchema::lookup("i-485").is_none());
    }

    #[test]
    fn field_ids_are_unique() {
        let mut ids: Vec<_> = I130.fields.iter().map(|f| f.field_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), I130.fields.len());
    }

    #[test]
    fn missing_fields_reports_revision_drift() {
        let template = [
            "form1[0].#subform[0].Pt1Line1_FamilyName[0]",
            "form1[0].#subform[0].Pt1Line1_GivenName[0]",
            "form1[0].#subform[0].SomethingNew[0]",
        ];
        let missing = I130.missing_fields(template);
        assert_eq!(missing.len(), 6);
        assert!(!missing.contains(&"form1[0].#subform[0].Pt1Line1_GivenName[0]"));
    }

    #[test]
    fn display_id_strips_punctuation() {
        assert_eq!(I130.display_id(), "I130");
    }

    #[test]
    fn field_map_insert_replaces() {
        let mut map: FieldMap = [("A", "Smith")].into_iter().collect();
        map.insert("A", "Jones");
        assert_eq!(map.get("A"), Some("Jones"));
        assert_eq!(map.len(), 1);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"A":"Jones"}"#);
    }
}
