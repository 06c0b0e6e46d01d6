//! Checklist rendering: lay out classified checklist lines and write a PDF.
//!
//! Rendering is split in two so each half is testable on its own:
//!
//! 1. [`layout_checklist`]: pure typesetting. Walks the classified lines,
//!    wraps them with real Times metrics and assigns every wrapped line a
//!    page and a baseline. No PDF objects are involved.
//! 2. [`write_pdf`]: turns the laid-out pages into a lopdf object graph
//!    (one content stream per page, two shared Type1 fonts) and serialises
//!    it to bytes.
//!
//! ## Geometry
//!
//! Positions are tracked in millimetres from the top-left corner, the way a
//! form designer measures a page, and converted to PDF points (origin
//! bottom-left) only when a run is emitted. Each output line occupies one
//! `line_height_mm` band; its baseline sits at the band's vertical centre
//! plus 0.3 em, which visually centres cap-height text in the band.

use crate::checklist::{ChecklistDocument, ChecklistLine};
use crate::error::CasePackError;
use crate::fonts::SerifFont;
use crate::output::RenderedPdf;
use crate::pipeline::normalize::is_supported;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Page geometry and typography for the checklist PDF.
///
/// Defaults: A4 portrait, 10 mm side and top margins, 15 mm bottom margin
/// reserved on every page, 10 mm line bands, 12 pt text, 10 mm item indent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_left_mm: f32,
    pub margin_right_mm: f32,
    pub margin_top_mm: f32,
    /// Space kept free at the bottom of every page; crossing it starts a new page.
    pub margin_bottom_mm: f32,
    pub line_height_mm: f32,
    pub font_size_pt: f32,
    /// Extra left indent for checklist items.
    pub item_indent_mm: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_left_mm: 10.0,
            margin_right_mm: 10.0,
            margin_top_mm: 10.0,
            margin_bottom_mm: 15.0,
            line_height_mm: 10.0,
            font_size_pt: 12.0,
            item_indent_mm: 10.0,
        }
    }
}

impl PageLayout {
    fn content_right_mm(&self) -> f32 {
        self.page_width_mm - self.margin_right_mm
    }

    fn break_trigger_mm(&self) -> f32 {
        self.page_height_mm - self.margin_bottom_mm
    }

    /// Validate that the layout leaves room for text.
    pub fn validate(&self) -> Result<(), CasePackError> {
        if self.page_width_mm <= 0.0 || self.page_height_mm <= 0.0 {
            return Err(CasePackError::InvalidConfig(
                "page dimensions must be positive".into(),
            ));
        }
        if self.margin_left_mm + self.item_indent_mm >= self.content_right_mm() {
            return Err(CasePackError::InvalidConfig(
                "horizontal margins leave no room for text".into(),
            ));
        }
        if self.margin_top_mm + self.line_height_mm > self.break_trigger_mm() {
            return Err(CasePackError::InvalidConfig(
                "vertical margins leave no room for a single line".into(),
            ));
        }
        if self.font_size_pt <= 0.0 || self.line_height_mm <= 0.0 {
            return Err(CasePackError::InvalidConfig(
                "font size and line height must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Which typographic treatment a run received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    Heading,
    Item,
    Paragraph,
}

/// One wrapped line of text, positioned in PDF user space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub style: LineStyle,
    pub font: SerifFont,
    pub size_pt: f32,
    /// Left edge, points from the page's left side.
    pub x_pt: f32,
    /// Baseline, points from the page's bottom.
    pub y_pt: f32,
    pub text: String,
}

/// All runs placed on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaidOutPage {
    pub runs: Vec<TextRun>,
}

/// Lay out `text` without producing any PDF bytes.
///
/// Always returns at least one page, possibly empty.
pub fn layout_checklist(text: &str, layout: &PageLayout) -> Vec<LaidOutPage> {
    let doc = ChecklistDocument::from_text(&drawable(text));
    let mut setter = Typesetter::new(layout);

    for line in doc.lines() {
        let (style, font, indent) = match &line {
            ChecklistLine::Heading(_) => (LineStyle::Heading, SerifFont::Bold, 0.0),
            ChecklistLine::ListItem(_) => {
                (LineStyle::Item, SerifFont::Regular, layout.item_indent_mm)
            }
            ChecklistLine::Paragraph(_) => (LineStyle::Paragraph, SerifFont::Regular, 0.0),
        };
        setter.block(&line.display_text(), style, font, indent);
    }

    setter.finish()
}

/// Render checklist text into an in-memory PDF.
pub fn render_checklist(text: &str, layout: &PageLayout) -> Result<RenderedPdf, CasePackError> {
    layout.validate()?;
    let pages = layout_checklist(text, layout);
    debug!(
        "Checklist laid out on {} page(s), {} line(s)",
        pages.len(),
        pages.iter().map(|p| p.runs.len()).sum::<usize>()
    );
    write_pdf(&pages, layout)
}

/// Render checklist text straight to `path`, creating parent directories.
///
/// The file is complete when this returns `Ok`.
pub fn render_checklist_to_file(
    text: &str,
    path: impl AsRef<Path>,
    layout: &PageLayout,
) -> Result<PathBuf, CasePackError> {
    let path = path.as_ref();
    let pdf = render_checklist(text, layout)?;
    pdf.write_to(path)?;
    Ok(path.to_path_buf())
}

/// Serialise laid-out pages into a PDF document.
pub fn write_pdf(pages: &[LaidOutPage], layout: &PageLayout) -> Result<RenderedPdf, CasePackError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary(SerifFont::Regular));
    let bold_id = doc.add_object(font_dictionary(SerifFont::Bold));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            SerifFont::Regular.resource_key() => regular_id,
            SerifFont::Bold.resource_key() => bold_id,
        },
    });

    let media_box: Vec<Object> = vec![
        Object::Integer(0),
        Object::Integer(0),
        (layout.page_width_mm * PT_PER_MM).into(),
        (layout.page_height_mm * PT_PER_MM).into(),
    ];

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len().max(1));
    let empty = [LaidOutPage::default()];
    let pages = if pages.is_empty() { &empty[..] } else { pages };

    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let data = content
            .encode()
            .map_err(|e| CasePackError::PdfWriteFailed {
                detail: format!("content stream: {e}"),
            })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, data));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| CasePackError::PdfWriteFailed {
            detail: e.to_string(),
        })?;

    Ok(RenderedPdf::new(bytes))
}

fn font_dictionary(font: SerifFont) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn page_operations(page: &LaidOutPage) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(page.runs.len() * 5);
    for run in &page.runs {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![run.font.resource_key().into(), run.size_pt.into()],
        ));
        ops.push(Operation::new("Td", vec![run.x_pt.into(), run.y_pt.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(run.text.as_str())],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Keep only characters the standard fonts can show; tabs become spaces.
fn drawable(text: &str) -> String {
    text.chars()
        .filter(|c| is_supported(*c))
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect()
}

// ── Typesetting ──────────────────────────────────────────────────────────────

struct Typesetter<'a> {
    layout: &'a PageLayout,
    done: Vec<LaidOutPage>,
    page: LaidOutPage,
    /// Top of the next line band, millimetres from the top edge.
    y_mm: f32,
}

impl<'a> Typesetter<'a> {
    fn new(layout: &'a PageLayout) -> Self {
        Self {
            layout,
            done: Vec::new(),
            page: LaidOutPage::default(),
            y_mm: layout.margin_top_mm,
        }
    }

    /// Wrap `text` to the width available at `indent_mm` and emit each line.
    fn block(&mut self, text: &str, style: LineStyle, font: SerifFont, indent_mm: f32) {
        let x_mm = self.layout.margin_left_mm + indent_mm;
        let max_width_pt = (self.layout.content_right_mm() - x_mm) * PT_PER_MM;
        for line in wrap_text(text, font, self.layout.font_size_pt, max_width_pt) {
            self.line(line, style, font, x_mm);
        }
    }

    fn line(&mut self, text: String, style: LineStyle, font: SerifFont, x_mm: f32) {
        let l = self.layout;
        if self.y_mm + l.line_height_mm > l.break_trigger_mm() && !self.page.runs.is_empty() {
            self.new_page();
        }

        let size_mm = l.font_size_pt / PT_PER_MM;
        let baseline_mm = self.y_mm + 0.5 * l.line_height_mm + 0.3 * size_mm;
        self.page.runs.push(TextRun {
            style,
            font,
            size_pt: l.font_size_pt,
            x_pt: x_mm * PT_PER_MM,
            y_pt: (l.page_height_mm - baseline_mm) * PT_PER_MM,
            text,
        });
        self.y_mm += l.line_height_mm;
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.page));
        self.y_mm = self.layout.margin_top_mm;
    }

    fn finish(mut self) -> Vec<LaidOutPage> {
        self.done.push(self.page);
        self.done
    }
}

/// Greedy word wrap. Words wider than a whole line are broken by character.
fn wrap_text(text: &str, font: SerifFont, size_pt: f32, max_width_pt: f32) -> Vec<String> {
    let fits = |s: &str| font.text_width(s, size_pt) <= max_width_pt;
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ').filter(|w| !w.is_empty()) {
        if !fits(word) {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut pieces = break_word(word, font, size_pt, max_width_pt);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
            continue;
        }

        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if fits(&candidate) {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split one over-long word into pieces that each fit; every piece holds at
/// least one character.
fn break_word(word: &str, font: SerifFont, size_pt: f32, max_width_pt: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0_f32;
    for c in word.chars() {
        let w = f32::from(font.advance(c)) * size_pt / 1000.0;
        if !piece.is_empty() && width + w > max_width_pt {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(c);
        width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
        let doc = Document::load_mem(bytes).expect("rendered PDF must parse");
        doc.get_pages()
            .values()
            .map(|&page_id| {
                let data = doc.get_page_content(page_id).expect("page content");
                let content = Content::decode(&data).expect("content decodes");
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| match op.operands.first() {
                        Some(Object::String(s, _)) => Some(String::from_utf8_lossy(s).into_owned()),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn empty_text_renders_one_blank_page() {
        let pages = layout_checklist("", &PageLayout::default());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].runs.is_empty());

        let pdf = render_checklist("", &PageLayout::default()).unwrap();
        assert!(pdf.as_bytes().starts_with(b"%PDF-"));
        let texts = page_texts(pdf.as_bytes());
        assert_eq!(texts.len(), 1);
        assert!(texts[0].is_empty());
    }

    #[test]
    fn styles_follow_classification() {
        let text = "Required Documents:\n- passport\n- birth certificate\n1. proof of address\nBring originals to the interview.";
        let pages = layout_checklist(text, &PageLayout::default());
        assert_eq!(pages.len(), 1);
        let runs = &pages[0].runs;
        assert_eq!(runs.len(), 5);

        assert_eq!(runs[0].style, LineStyle::Heading);
        assert_eq!(runs[0].font, SerifFont::Bold);
        assert_eq!(runs[0].text, "Required Documents:");

        for (run, content) in runs[1..4]
            .iter()
            .zip(["passport", "birth certificate", "proof of address"])
        {
            assert_eq!(run.style, LineStyle::Item);
            assert_eq!(run.font, SerifFont::Regular);
            assert_eq!(run.text, format!("[ ] {content}"));
            assert!(run.x_pt > runs[0].x_pt, "items are indented");
        }

        assert_eq!(runs[4].style, LineStyle::Paragraph);
        assert_eq!(runs[4].font, SerifFont::Regular);
        assert_eq!(runs[4].x_pt, runs[0].x_pt);
    }

    #[test]
    fn blank_lines_add_no_space() {
        let tight = layout_checklist("A:\n- b", &PageLayout::default());
        let loose = layout_checklist("A:\n\n\n   \n- b", &PageLayout::default());
        assert_eq!(tight, loose);
    }

    #[test]
    fn lines_step_down_the_page() {
        let pages = layout_checklist("one\ntwo\nthree", &PageLayout::default());
        let ys: Vec<f32> = pages[0].runs.iter().map(|r| r.y_pt).collect();
        assert!(ys[0] > ys[1] && ys[1] > ys[2]);
        let step = ys[0] - ys[1];
        assert!((step - 10.0 * PT_PER_MM).abs() < 1e-3);
    }

    #[test]
    fn long_paragraph_continues_on_next_page_with_same_style() {
        let paragraph = "evidence ".repeat(1500);
        let text = format!("Intro:\n{}", paragraph.trim());
        let layout = PageLayout::default();
        let pages = layout_checklist(&text, &layout);
        assert!(pages.len() > 1, "expected a page break, got {}", pages.len());

        let last_on_first = pages[0].runs.last().unwrap();
        let first_on_second = &pages[1].runs[0];
        assert_eq!(last_on_first.style, LineStyle::Paragraph);
        assert_eq!(first_on_second.style, LineStyle::Paragraph);
        assert_eq!(first_on_second.font, last_on_first.font);
        assert_eq!(first_on_second.x_pt, last_on_first.x_pt);
        // The continuation starts at the top again.
        assert!(first_on_second.y_pt > last_on_first.y_pt);

        let pdf = render_checklist(&text, &layout).unwrap();
        assert_eq!(page_texts(pdf.as_bytes()).len(), pages.len());
    }

    #[test]
    fn bottom_margin_is_respected() {
        let layout = PageLayout::default();
        let text = (0..100).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let pages = layout_checklist(&text, &layout);
        assert!(pages.len() >= 4);
        let floor_pt = layout.margin_bottom_mm * PT_PER_MM;
        for page in &pages {
            assert!(page.runs.len() <= 27);
            for run in &page.runs {
                assert!(run.y_pt > floor_pt, "run below bottom margin: {run:?}");
            }
        }
        assert_eq!(pages[0].runs.len(), 27);
    }

    #[test]
    fn wrapped_lines_fit_the_measure() {
        let layout = PageLayout::default();
        let text = "- ".to_string() + &"photocopy ".repeat(80);
        let pages = layout_checklist(&text, &layout);
        let right_pt = (layout.page_width_mm - layout.margin_right_mm) * PT_PER_MM;
        let runs: Vec<_> = pages.iter().flat_map(|p| &p.runs).collect();
        assert!(runs.len() > 1);
        for run in runs {
            let w = run.font.text_width(&run.text, run.size_pt);
            assert!(run.x_pt + w <= right_pt + 0.01, "overflow: {run:?}");
            assert_eq!(run.style, LineStyle::Item);
        }
    }

    #[test]
    fn unbreakable_word_is_split_by_character() {
        let word = "USCISDocumentChecklist".repeat(20);
        let lines = wrap_text(&word, SerifFont::Regular, 12.0, 200.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for l in &lines {
            assert!(SerifFont::Regular.text_width(l, 12.0) <= 200.0);
        }
    }

    #[test]
    fn wrap_keeps_short_text_on_one_line() {
        assert_eq!(
            wrap_text("two  words", SerifFont::Regular, 12.0, 500.0),
            vec!["two words".to_string()]
        );
        assert!(wrap_text("", SerifFont::Regular, 12.0, 500.0).is_empty());
    }

    #[test]
    fn unsupported_characters_are_not_drawn() {
        let pages = layout_checklist("Caf\u{e9}\tmenu \u{1F600}", &PageLayout::default());
        assert_eq!(pages[0].runs[0].text, "Caf menu");
    }

    #[test]
    fn pdf_contains_rendered_text() {
        let pdf = render_checklist("Forms:\n- I-130", &PageLayout::default()).unwrap();
        let texts = page_texts(pdf.as_bytes());
        assert_eq!(texts, vec![vec!["Forms:".to_string(), "[ ] I-130".to_string()]]);
    }

    #[test]
    fn render_to_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/checklist.pdf");
        let written = render_checklist_to_file("A:\n- b", &path, &PageLayout::default()).unwrap();
        assert_eq!(written, path);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn invalid_layout_rejected() {
        let layout = PageLayout {
            margin_left_mm: 150.0,
            margin_right_mm: 60.0,
            ..PageLayout::default()
        };
        assert!(matches!(
            render_checklist("x", &layout),
            Err(CasePackError::InvalidConfig(_))
        ));
    }
}
