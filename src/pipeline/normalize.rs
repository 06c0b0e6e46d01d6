//! Checklist text normalisation: make a raw model completion safe to lay out.
//!
//! The checklist renderer writes with the standard Times Type1 fonts, which
//! only cover a single-byte encoding. Model output routinely contains emoji,
//! typographic quotes, non-breaking spaces and accented names, and some
//! models split words with stray spaces at token boundaries. This module
//! folds all of that into plain printable ASCII.
//!
//! ## Rule Order
//!
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. NFKD-decompose, then drop everything outside the supported set
//! 3. Collapse runs of two or more whitespace characters: to a line break
//!    when the run contains one, otherwise to one space
//! 4. Remove single spaces sitting between two word characters
//! 5. Trim
//!
//! Collapsing runs *before* the split-word repair keeps the transform
//! idempotent: a collapse can create a new word-space-word triple, which
//! the repair step then removes in the same pass.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Knobs for [`normalize_checklist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Remove a single space found directly between two word characters.
    ///
    /// This is a heuristic repair for tokenisation artefacts ("pass port")
    /// and is lossy by nature: it joins legitimate words too. Default: true.
    pub repair_split_words: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            repair_split_words: true,
        }
    }
}

/// Normalise with the default options.
pub fn normalize(input: &str) -> String {
    normalize_checklist(input, &NormalizeOptions::default())
}

/// Apply all normalisation rules to a raw completion.
///
/// Never fails; the worst case is an empty string.
pub fn normalize_checklist(input: &str, options: &NormalizeOptions) -> String {
    let s = normalise_line_endings(input);
    let s = retain_supported(&s);
    let s = collapse_whitespace_runs(&s);
    let s = if options.repair_split_words {
        remove_split_word_spaces(&s)
    } else {
        s
    };
    s.trim().to_string()
}

/// Whether `c` can be written by the checklist renderer.
///
/// Printable ASCII plus the two layout characters the renderer understands.
pub fn is_supported(c: char) -> bool {
    matches!(c, ' '..='~' | '\n' | '\t')
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Fold to the supported set ────────────────────────────────────────

/// Decompose compatibility characters and drop what is left unsupported.
///
/// `é` decomposes to `e` + U+0301 and keeps its base letter; `“`, `→`
/// and emoji have no ASCII decomposition and disappear entirely.
pub fn retain_supported(input: &str) -> String {
    input.nfkd().filter(|c| is_supported(*c)).collect()
}

// ── Rule 3: Collapse whitespace runs ─────────────────────────────────────────

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// A run holding a line break becomes one `\n`; any other run one space.
fn collapse_whitespace_runs(input: &str) -> String {
    RE_WHITESPACE_RUN
        .replace_all(input, |caps: &regex::Captures<'_>| {
            if caps[0].contains('\n') {
                "\n"
            } else {
                " "
            }
        })
        .to_string()
}

// ── Rule 4: Repair split words ───────────────────────────────────────────────

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Drop every `' '` whose left and right neighbours (in the input) are both
/// word characters. Neighbours are read from the input, so `"a b c"` becomes
/// `"abc"` in one pass.
fn remove_split_word_spaces(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' '
            && i > 0
            && i + 1 < chars.len()
            && is_word_char(chars[i - 1])
            && is_word_char(chars[i + 1])
        {
            continue;
        }
        out.push(c);
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
