//! Glyph metrics for the serif family the checklist renderer writes with.
//!
//! The renderer uses the standard Type1 fonts Times-Roman and Times-Bold,
//! which every conforming viewer ships, so nothing is embedded. Line
//! wrapping still needs real advance widths; they come from the Adobe AFM
//! files for printable ASCII (codes 32–126), in 1/1000 em units.

/// The two weights used by the checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerifFont {
    Regular,
    Bold,
}

impl SerifFont {
    /// PostScript name written to `/BaseFont`.
    pub fn base_font(self) -> &'static str {
        match self {
            SerifFont::Regular => "Times-Roman",
            SerifFont::Bold => "Times-Bold",
        }
    }

    /// Key under the page's `/Resources /Font` dictionary.
    pub fn resource_key(self) -> &'static str {
        match self {
            SerifFont::Regular => "F1",
            SerifFont::Bold => "F2",
        }
    }

    /// Advance width of `c` in 1/1000 em. Characters outside printable
    /// ASCII fall back to the width of a digit.
    pub fn advance(self, c: char) -> u16 {
        let table = match self {
            SerifFont::Regular => &TIMES_ROMAN,
            SerifFont::Bold => &TIMES_BOLD,
        };
        match c as u32 {
            code @ 32..=126 => table[(code - 32) as usize],
            _ => 500,
        }
    }

    /// Width of `text` in points at `size` points.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.advance(c))).sum();
        units as f32 * size / 1000.0
    }
}

#[rustfmt::skip]
static TIMES_ROMAN: [u16; 95] = [
    // 32-47: space ! " # $ % & ' ( ) * + , - . /
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    // 48-63
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    // 64-79
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    // 80-95
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    // 96-111
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    // 112-126
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD: [u16; 95] = [
    // 32-47
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    // 48-63
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    // 64-79
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    // 80-95
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    // 96-111
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    // 112-126
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];
