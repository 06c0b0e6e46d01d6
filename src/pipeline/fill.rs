//! Fixed-layout form filling: write values into the widgets of a reference PDF.
//!
//! The reference document (for instance the official I-130) is loaded with
//! lopdf and walked page by page. Every widget annotation whose field name
//! appears in the [`FieldMap`] gets its `/V` replaced; nothing else in the
//! object graph is touched and no field is ever created.
//!
//! Unmatched names in either direction are normal (form revisions drift),
//! so they are collected into a [`FillReport`] instead of failing the fill.

use crate::error::CasePackError;
use crate::forms::FieldMap;
use crate::output::RenderedPdf;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// What a fill did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// Field names that received a value, in document order.
    pub filled: Vec<String>,
    /// FieldMap keys with no widget of that name in the document.
    pub unmatched_keys: Vec<String>,
    /// Widget names in the document that the FieldMap did not mention.
    pub untouched_fields: Vec<String>,
}

/// A filled document plus its report.
#[derive(Debug, Clone)]
pub struct FilledForm {
    pub pdf: RenderedPdf,
    pub report: FillReport,
}

/// A widget field found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFieldInfo {
    /// 1-based page number.
    pub page: u32,
    pub name: String,
    /// `/FT` when present on the widget (`Tx`, `Btn`, `Ch`, `Sig`).
    pub field_type: Option<String>,
    pub value: Option<String>,
}

/// Fill `reference` (PDF bytes) with `fields` and serialise the result.
pub fn fill_form(reference: &[u8], fields: &FieldMap) -> Result<FilledForm, CasePackError> {
    let mut doc = Document::load_mem(reference).map_err(|e| CasePackError::InvalidTemplate {
        detail: e.to_string(),
    })?;

    let report = fill_document(&mut doc, fields)?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| CasePackError::PdfWriteFailed {
            detail: e.to_string(),
        })?;

    Ok(FilledForm {
        pdf: RenderedPdf::new(bytes),
        report,
    })
}

/// Read the template at `reference_path`, fill it and write `output_path`.
pub fn fill_form_file(
    reference_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    fields: &FieldMap,
) -> Result<FillReport, CasePackError> {
    let reference_path = reference_path.as_ref();
    let output_path = output_path.as_ref();

    let reference = read_template(reference_path)?;
    let filled = fill_form(&reference, fields)?;
    filled.pdf.write_to(output_path)?;

    info!(
        "Filled {} field(s) into {}",
        filled.report.filled.len(),
        output_path.display()
    );
    Ok(filled.report)
}

/// List every named widget in `reference`, page by page.
pub fn list_form_fields(reference: &[u8]) -> Result<Vec<FormFieldInfo>, CasePackError> {
    let doc = Document::load_mem(reference).map_err(|e| CasePackError::InvalidTemplate {
        detail: e.to_string(),
    })?;
    check_page_tree(&doc)?;

    let mut out = Vec::new();
    for (page_no, page_id) in doc.get_pages() {
        for slot in annotation_slots(&doc, page_id) {
            let Some(annot) = slot.get(&doc) else { continue };
            let Some(name) = widget_name(annot) else { continue };
            out.push(FormFieldInfo {
                page: page_no,
                name,
                field_type: match annot.get(b"FT") {
                    Ok(Object::Name(n)) => Some(String::from_utf8_lossy(n).into_owned()),
                    _ => None,
                },
                value: match annot.get(b"V") {
                    Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
                    Ok(Object::Name(n)) => Some(String::from_utf8_lossy(n).into_owned()),
                    _ => None,
                },
            });
        }
    }
    Ok(out)
}

/// Apply `fields` to an already-loaded document in place.
pub fn fill_document(doc: &mut Document, fields: &FieldMap) -> Result<FillReport, CasePackError> {
    check_page_tree(doc)?;

    let mut report = FillReport::default();
    let mut matched: BTreeSet<String> = BTreeSet::new();
    let mut seen_untouched: BTreeSet<String> = BTreeSet::new();

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    for (page_no, page_id) in pages {
        for slot in annotation_slots(doc, page_id) {
            let Some(annot) = slot.get_mut(doc) else { continue };
            let Some(name) = widget_name(annot) else { continue };

            match fields.get(&name) {
                Some(value) => {
                    annot.set("V", encode_text_string(value));
                    debug!("Page {page_no}: set {name}");
                    if matched.insert(name.clone()) {
                        report.filled.push(name);
                    }
                }
                None => {
                    if seen_untouched.insert(name.clone()) {
                        report.untouched_fields.push(name);
                    }
                }
            }
        }
    }

    report.unmatched_keys = fields
        .keys()
        .filter(|k| !matched.contains(*k))
        .map(str::to_string)
        .collect();

    if !report.unmatched_keys.is_empty() {
        warn!(
            "{} field(s) not found in the reference form: {}",
            report.unmatched_keys.len(),
            report.unmatched_keys.join(", ")
        );
    }

    Ok(report)
}

fn read_template(path: &Path) -> Result<Vec<u8>, CasePackError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CasePackError::TemplateNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => CasePackError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => CasePackError::InvalidTemplate {
            detail: format!("{}: {e}", path.display()),
        },
    })
}

/// The trailer must point at a catalog whose `/Pages` is a dictionary.
fn check_page_tree(doc: &Document) -> Result<(), CasePackError> {
    let missing = |detail: &str| CasePackError::MissingPageTree {
        detail: detail.to_string(),
    };

    let root = doc
        .trailer
        .get(b"Root")
        .map_err(|_| missing("trailer has no /Root"))?;
    let catalog = match resolve(doc, root) {
        Some(Object::Dictionary(d)) => d,
        _ => return Err(missing("/Root is not a dictionary")),
    };
    let pages = catalog
        .get(b"Pages")
        .map_err(|_| missing("catalog has no /Pages"))?;
    match resolve(doc, pages) {
        Some(Object::Dictionary(_)) => Ok(()),
        _ => Err(missing("/Pages is not a dictionary")),
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

// ── Annotation access ────────────────────────────────────────────────────────

/// Where an annotation dictionary lives. `/Annots` may be inline in the page
/// or an indirect array, and its entries may be references or inline dicts.
enum AnnotSlot {
    Indirect(ObjectId),
    InPage { page: ObjectId, index: usize },
    InArray { array: ObjectId, index: usize },
}

impl AnnotSlot {
    fn get<'a>(&self, doc: &'a Document) -> Option<&'a Dictionary> {
        match *self {
            AnnotSlot::Indirect(id) => doc.get_dictionary(id).ok(),
            AnnotSlot::InPage { page, index } => doc
                .get_dictionary(page)
                .ok()?
                .get(b"Annots")
                .ok()?
                .as_array()
                .ok()?
                .get(index)?
                .as_dict()
                .ok(),
            AnnotSlot::InArray { array, index } => doc
                .get_object(array)
                .ok()?
                .as_array()
                .ok()?
                .get(index)?
                .as_dict()
                .ok(),
        }
    }

    fn get_mut<'a>(&self, doc: &'a mut Document) -> Option<&'a mut Dictionary> {
        match *self {
            AnnotSlot::Indirect(id) => doc.get_object_mut(id).ok()?.as_dict_mut().ok(),
            AnnotSlot::InPage { page, index } => doc
                .get_object_mut(page)
                .ok()?
                .as_dict_mut()
                .ok()?
                .get_mut(b"Annots")
                .ok()?
                .as_array_mut()
                .ok()?
                .get_mut(index)?
                .as_dict_mut()
                .ok(),
            AnnotSlot::InArray { array, index } => doc
                .get_object_mut(array)
                .ok()?
                .as_array_mut()
                .ok()?
                .get_mut(index)?
                .as_dict_mut()
                .ok(),
        }
    }
}

fn annotation_slots(doc: &Document, page_id: ObjectId) -> Vec<AnnotSlot> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let (entries, array_id) = match page.get(b"Annots") {
        Ok(Object::Array(a)) => (a, None),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(a)) => (a, Some(*id)),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Object::Reference(id) => Some(AnnotSlot::Indirect(*id)),
            Object::Dictionary(_) => Some(match array_id {
                Some(array) => AnnotSlot::InArray { array, index },
                None => AnnotSlot::InPage {
                    page: page_id,
                    index,
                },
            }),
            _ => None,
        })
        .collect()
}

/// The field name of a widget annotation, or `None` for anything else.
fn widget_name(annot: &Dictionary) -> Option<String> {
    match annot.get(b"Subtype") {
        Ok(Object::Name(n)) if n.as_slice() == b"Widget" => {}
        _ => return None,
    }
    match annot.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

// ── Text strings ─────────────────────────────────────────────────────────────

/// Decode a PDF text string: UTF-16BE when it starts with a BOM, otherwise
/// PDFDocEncoding, one byte per character.
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| pdf_doc_char(b)).collect(),
    }
}

/// PDFDocEncoding differs from Latin-1 at 0x18..=0x1F, 0x80..=0xA0 and 0xAD.
/// Undefined codes map to U+FFFD.
fn pdf_doc_char(b: u8) -> char {
    const LOW: [char; 8] = [
        '\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}',
        '\u{02DC}',
    ];
    const HIGH: [char; 33] = [
        '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}',
        '\u{2044}', '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}',
        '\u{201D}', '\u{2018}', '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}',
        '\u{0141}', '\u{0152}', '\u{0160}', '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}',
        '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}', '\u{20AC}',
    ];
    match b {
        0x18..=0x1F => LOW[usize::from(b - 0x18)],
        0x80..=0xA0 => HIGH[usize::from(b - 0x80)],
        0xAD => '\u{FFFD}',
        _ => char::from(b),
    }
}

/// Encode `value` as a PDF text string: a literal for ASCII, UTF-16BE with
/// a byte-order mark otherwise.
pub fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}
