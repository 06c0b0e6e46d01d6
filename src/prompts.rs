//! Prompts for drafting a case checklist.
//!
//! Every prompt lives here so wording changes never touch retry or
//! rendering code, and so tests can inspect prompts without a model.
//!
//! Callers can override the system prompt via
//! [`crate::config::CasePackConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

use crate::intake::{CaseIntake, LONG_DATE_FORMAT};

/// Default system prompt for checklist drafting.
///
/// The output rules line up with what the renderer recognises: short lines
/// ending in a colon become headings, `- ` bullets become checkboxes.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an immigration paralegal assistant preparing a document checklist for a family-based USCIS petition.

Follow these rules precisely:

1. CONTENT
   - List the forms, civil documents, and evidence USCIS expects for the stated relationship and visa type
   - Include a short draft summary of the form fields that can be filled from the case facts
   - Do not invent facts about the people involved

2. FORMAT
   - Put each section title on its own line, ending with a colon, in six words or fewer
   - Start every checklist item with "- " on its own line
   - Use plain text only: no Markdown headings, bold, tables, or emoji
   - Do not add a greeting, closing remarks, or legal disclaimers"#;

/// Closing instruction of the user prompt.
pub const CHECKLIST_INSTRUCTION: &str =
    "Create a USCIS document checklist and draft form field summary for this immigration case.";

/// Written in place of a marriage date the intake does not have.
pub const NO_MARRIAGE_DATE: &str = "N/A";

/// Build the user prompt describing one case.
pub fn checklist_prompt(intake: &CaseIntake) -> String {
    let marriage = intake
        .marriage_date
        .map(|d| d.format(LONG_DATE_FORMAT).to_string())
        .unwrap_or_else(|| NO_MARRIAGE_DATE.to_string());

    format!(
        "Petitioner: {}\n\
         Beneficiary: {}\n\
         Relationship: {}\n\
         Visa Type: {}\n\
         Country of Birth: {}\n\
         Date of Marriage: {}\n\
         Petitioner DOB: {}\n\
         Beneficiary DOB: {}\n\
         \n\
         {}",
        intake.petitioner.full_name(),
        intake.beneficiary.full_name(),
        intake.relationship,
        intake.visa_type,
        intake.beneficiary_country(),
        marriage,
        intake.petitioner.date_of_birth.format(LONG_DATE_FORMAT),
        intake.beneficiary.date_of_birth.format(LONG_DATE_FORMAT),
        CHECKLIST_INSTRUCTION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::sample_intake;

    #[test]
    fn prompt_lists_case_facts_in_order() {
        let prompt = checklist_prompt(&sample_intake());
        let expected = "Petitioner: John Smith\n\
                        Beneficiary: Mar\u{ed}a Garc\u{ed}a\n\
                        Relationship: Spouse\n\
                        Visa Type: I-130 (Spouse)\n\
                        Country of Birth: Mexico\n\
                        Date of Marriage: June 10, 2023\n\
                        Petitioner DOB: April 02, 1988\n\
                        Beneficiary DOB: September 15, 1990\n\
                        \n\
                        Create a USCIS document checklist and draft form field summary for this immigration case.";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn missing_marriage_date() {
        let mut intake = sample_intake();
        intake.marriage_date = None;
        assert!(checklist_prompt(&intake).contains("Date of Marriage: N/A\n"));
    }

    #[test]
    fn system_prompt_matches_renderer_conventions() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("ending with a colon"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("\"- \""));
    }
}
