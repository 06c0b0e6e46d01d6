//! Checklist document model and line classification.
//!
//! A checklist is just the normalised completion split on `\n`. Each
//! non-blank line is classified when it is rendered, using the same cheap
//! syntactic cues a reader would: a short line ending in a colon is a
//! heading, a bulleted or numbered line is a checklist item, anything else
//! is prose.

use serde::{Deserialize, Serialize};

/// Lines ending in `:` with at most this many words are headings.
pub const MAX_HEADING_WORDS: usize = 6;

/// Prefix drawn in front of every checklist item.
pub const CHECKBOX: &str = "[ ]";

/// One classified, non-blank checklist line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecklistLine {
    /// Section title, rendered bold.
    Heading(String),
    /// Actionable item; the content has its bullet or number removed.
    ListItem(String),
    /// Free text, wrapped at full width.
    Paragraph(String),
}

impl ChecklistLine {
    /// Classify a single raw line. Returns `None` for blank lines.
    pub fn classify(raw: &str) -> Option<Self> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        if line.ends_with(':') && line.split_whitespace().count() <= MAX_HEADING_WORDS {
            return Some(ChecklistLine::Heading(line.to_string()));
        }

        let numbered = line.chars().next().is_some_and(|c| c.is_ascii_digit());
        if line.starts_with("- ") || line.starts_with("* ") || numbered {
            return Some(ChecklistLine::ListItem(item_content(line).to_string()));
        }

        Some(ChecklistLine::Paragraph(line.to_string()))
    }

    /// The text as it should appear on the page (checkbox included for items).
    pub fn display_text(&self) -> String {
        match self {
            ChecklistLine::Heading(s) | ChecklistLine::Paragraph(s) => s.clone(),
            ChecklistLine::ListItem(s) => format!("{CHECKBOX} {s}"),
        }
    }
}

/// Strip the list marker from an item line: leading digits, periods and
/// spaces first, then surrounding `-`, `*` and spaces.
fn item_content(line: &str) -> &str {
    line.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ')
        .trim_matches(|c: char| c == '-' || c == '*' || c == ' ')
        .trim()
}

/// An ordered sequence of checklist lines.
///
/// Produced fresh per case from normalised text and consumed once by the
/// renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecklistDocument {
    lines: Vec<String>,
}

impl ChecklistDocument {
    /// Split `text` into lines on `\n`.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
        }
    }

    /// Raw lines, blank ones included.
    pub fn raw_lines(&self) -> &[String] {
        &self.lines
    }

    /// Classified lines in order; blank lines are skipped.
    pub fn lines(&self) -> impl Iterator<Item = ChecklistLine> + '_ {
        self.lines.iter().filter_map(|l| ChecklistLine::classify(l))
    }

    /// Number of checklist items.
    pub fn item_count(&self) -> usize {
        self.lines()
            .filter(|l| matches!(l, ChecklistLine::ListItem(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_heading_items_and_numbered_item() {
        let doc = ChecklistDocument::from_text(
            "Required Documents:\n- passport\n- birth certificate\n1. proof of address",
        );
        let lines: Vec<_> = doc.lines().collect();
        assert_eq!(
            lines,
            vec![
                ChecklistLine::Heading("Required Documents:".into()),
                ChecklistLine::ListItem("passport".into()),
                ChecklistLine::ListItem("birth certificate".into()),
                ChecklistLine::ListItem("proof of address".into()),
            ]
        );
        assert_eq!(doc.item_count(), 3);
    }

    #[test]
    fn long_colon_line_is_a_paragraph() {
        let line = "Please gather the following supporting documents before you file:";
        assert_eq!(
            ChecklistLine::classify(line),
            Some(ChecklistLine::Paragraph(line.into()))
        );
    }

    #[test]
    fn six_words_with_colon_is_still_a_heading() {
        let line = "one two three four five six:";
        assert!(matches!(
            ChecklistLine::classify(line),
            Some(ChecklistLine::Heading(_))
        ));
    }

    #[test]
    fn numbered_heading_wins_over_item() {
        assert_eq!(
            ChecklistLine::classify("2. Evidence:"),
            Some(ChecklistLine::Heading("2. Evidence:".into()))
        );
    }

    #[test]
    fn star_bullets_and_multi_digit_numbers() {
        assert_eq!(
            ChecklistLine::classify("* Form I-864"),
            Some(ChecklistLine::ListItem("Form I-864".into()))
        );
        assert_eq!(
            ChecklistLine::classify("12. Two passport photos"),
            Some(ChecklistLine::ListItem("Two passport photos".into()))
        );
        assert_eq!(
            ChecklistLine::classify("3.- joint lease *"),
            Some(ChecklistLine::ListItem("joint lease".into()))
        );
    }

    #[test]
    fn dash_without_space_is_prose() {
        assert_eq!(
            ChecklistLine::classify("-passport"),
            Some(ChecklistLine::Paragraph("-passport".into()))
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(ChecklistLine::classify("   \t "), None);
        let doc = ChecklistDocument::from_text("\n\nA:\n\n\n- b\n");
        assert_eq!(doc.lines().count(), 2);
        assert_eq!(doc.raw_lines().len(), 7);
    }

    #[test]
    fn item_display_has_checkbox() {
        let item = ChecklistLine::ListItem("passport".into());
        assert_eq!(item.display_text(), "[ ] passport");
        let heading = ChecklistLine::Heading("Forms:".into());
        assert_eq!(heading.display_text(), "Forms:");
    }

    #[test]
    fn surrounding_whitespace_ignored_for_classification() {
        assert_eq!(
            ChecklistLine::classify("   - passport   "),
            Some(ChecklistLine::ListItem("passport".into()))
        );
    }
}
