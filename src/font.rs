use crate::error::{ReportError, Result};
use crate::types::Pt;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const HELVETICA: &str = "Helvetica";
pub const HELVETICA_BOLD: &str = "Helvetica-Bold";

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;

// AFM advance widths for the printable ASCII range (32..=126), 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667,
    611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500,
    222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722, 722, 667,
    611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556,
    278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

// cp1252 code points 0x80..=0x9F; '\0' marks the unassigned slots.
const WINANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\0', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\0', '\u{017D}', '\0', '\0',
    '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\0', '\u{017E}', '\u{0178}',
];

/// Maps a character onto its WinAnsi (cp1252) byte, the encoding of the
/// base-14 fonts.
pub(crate) fn winansi_byte(ch: char) -> Option<u8> {
    match ch {
        '\u{0000}'..='\u{007F}' => Some(ch as u8),
        '\u{00A0}'..='\u{00FF}' => Some(ch as u32 as u8),
        _ => WINANSI_HIGH
            .iter()
            .position(|candidate| *candidate != '\0' && *candidate == ch)
            .map(|index| 0x80 + index as u8),
    }
}

/// Glyph-metric oracle used by the fitter and the drawing surface.
pub trait TextMeasure {
    fn text_width(&self, font: &str, size: Pt, text: &str) -> Pt;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Glyph {
    pub(crate) id: u16,
    /// Advance in 1/1000 em.
    pub(crate) advance: u16,
}

#[derive(Debug)]
pub(crate) enum CharMap {
    /// Base-14 advances indexed by WinAnsi byte, starting at `FIRST_CHAR`.
    WinAnsi(Vec<u16>),
    /// Unicode cmap of an embedded face.
    Unicode(HashMap<char, Glyph>),
}

#[derive(Debug)]
pub(crate) struct FontMetrics {
    pub(crate) chars: CharMap,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    /// Advance of `.notdef` for embedded faces, of an average glyph otherwise.
    pub(crate) missing_width: u16,
    pub(crate) is_fixed_pitch: bool,
}

impl FontMetrics {
    fn builtin(ascii: &[u16; 95]) -> Self {
        let missing_width = 556;
        let widths: Vec<u16> = (FIRST_CHAR..=LAST_CHAR)
            .map(|code| match code {
                32..=126 => ascii[(code - FIRST_CHAR) as usize],
                _ => missing_width,
            })
            .collect();
        Self {
            chars: CharMap::WinAnsi(widths),
            ascent: 718,
            descent: -207,
            cap_height: 718,
            italic_angle: 0,
            bbox: (-166, -225, 1000, 931),
            missing_width,
            is_fixed_pitch: false,
        }
    }

    fn from_face(face: &ttf_parser::Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let advance = |id: ttf_parser::GlyphId| {
            let units = face.glyph_hor_advance(id).unwrap_or(0);
            ((units as f32 * scale).round() as i32).clamp(0, u16::MAX as i32) as u16
        };

        let mut glyphs: HashMap<char, Glyph> = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|code| {
                    let Some(ch) = char::from_u32(code) else {
                        return;
                    };
                    if glyphs.contains_key(&ch) {
                        return;
                    }
                    if let Some(id) = subtable.glyph_index(code) {
                        glyphs.insert(
                            ch,
                            Glyph {
                                id: id.0,
                                advance: advance(id),
                            },
                        );
                    }
                });
            }
        }

        let ascent = scale_i16(face.ascender(), scale);
        let bbox = face.global_bounding_box();
        Self {
            chars: CharMap::Unicode(glyphs),
            ascent,
            descent: scale_i16(face.descender(), scale),
            cap_height: face
                .capital_height()
                .map(|value| scale_i16(value, scale))
                .unwrap_or(ascent),
            italic_angle: face
                .italic_angle()
                .map(|value| value.round() as i16)
                .unwrap_or(0),
            bbox: (
                scale_i16(bbox.x_min, scale),
                scale_i16(bbox.y_min, scale),
                scale_i16(bbox.x_max, scale),
                scale_i16(bbox.y_max, scale),
            ),
            missing_width: advance(ttf_parser::GlyphId(0)),
            is_fixed_pitch: face.is_monospaced(),
        }
    }

    /// Whether `ch` is drawn as itself rather than substituted.
    pub(crate) fn covers(&self, ch: char) -> bool {
        match &self.chars {
            CharMap::WinAnsi(_) => winansi_byte(ch).is_some(),
            CharMap::Unicode(glyphs) => glyphs.contains_key(&ch),
        }
    }

    /// Glyph drawn for `ch`; `.notdef` when the face lacks it.
    pub(crate) fn glyph(&self, ch: char) -> Glyph {
        match &self.chars {
            CharMap::Unicode(glyphs) => glyphs.get(&ch).copied(),
            CharMap::WinAnsi(_) => None,
        }
        .unwrap_or(Glyph {
            id: 0,
            advance: self.missing_width,
        })
    }

    fn advance(&self, ch: char) -> u16 {
        match &self.chars {
            CharMap::WinAnsi(widths) => {
                let byte = winansi_byte(ch).unwrap_or(b'?');
                if byte < FIRST_CHAR {
                    return 0;
                }
                widths
                    .get((byte - FIRST_CHAR) as usize)
                    .copied()
                    .unwrap_or(self.missing_width)
            }
            CharMap::Unicode(_) if ch.is_control() => 0,
            CharMap::Unicode(_) => self.glyph(ch).advance,
        }
    }

    fn measure(&self, size: Pt, text: &str) -> Pt {
        let total: i32 = text
            .chars()
            .map(|ch| self.advance(ch) as i32)
            .fold(0i32, |acc, adv| acc.saturating_add(adv));
        if total <= 0 {
            return Pt::ZERO;
        }
        size.mul_ratio(total, 1000)
    }
}

#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    /// Raw TrueType program; `None` for the base-14 fonts every viewer ships.
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) metrics: FontMetrics,
}

impl RegisteredFont {
    pub(crate) fn is_embedded(&self) -> bool {
        self.data.is_some()
    }
}

#[derive(Debug)]
pub struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
}

impl FontRegistry {
    /// A registry holding only the base-14 Helvetica faces.
    pub fn new() -> Self {
        let mut registry = Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
        };
        registry.insert(RegisteredFont {
            name: HELVETICA.to_string(),
            data: None,
            metrics: FontMetrics::builtin(&HELVETICA_WIDTHS),
        });
        registry.insert(RegisteredFont {
            name: HELVETICA_BOLD.to_string(),
            data: None,
            metrics: FontMetrics::builtin(&HELVETICA_BOLD_WIDTHS),
        });
        registry
    }

    fn insert(&mut self, font: RegisteredFont) -> String {
        let name = font.name.clone();
        let index = self.fonts.len();
        self.fonts.push(font);
        self.lookup.insert(normalize_name(&name), index);
        name
    }

    /// Registers a TrueType/OpenType file. Unlike directory scanning, an
    /// explicitly requested font that cannot be read is an error.
    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|err| ReportError::Font(format!("{}: {err}", path.display())))?;
        let stem = path.file_stem().and_then(|v| v.to_str());
        self.register_bytes(data, stem)
    }

    pub fn register_bytes(&mut self, data: Vec<u8>, source_name: Option<&str>) -> Result<String> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| ReportError::Font(format!("invalid font data for {source}: {err}")))?;
        if face.tables().cff.is_some() {
            return Err(ReportError::Font(format!(
                "{source} is a CFF-flavoured OpenType font; only TrueType outlines can be embedded"
            )));
        }
        let name = font_name(&face).unwrap_or_else(|| source.to_string());
        let metrics = FontMetrics::from_face(&face);
        drop(face);
        tracing::debug!(font = %name, bytes = data.len(), "registered font");
        Ok(self.insert(RegisteredFont {
            name,
            data: Some(data),
            metrics,
        }))
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<&RegisteredFont> {
        self.lookup
            .get(&normalize_name(name))
            .and_then(|index| self.fonts.get(*index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Height of one line box at `size`, from the font's ascent and descent.
    pub fn line_height(&self, name: &str, size: Pt) -> Pt {
        let Some(font) = self.resolve(name) else {
            return size;
        };
        let units = font.metrics.ascent as i32 - font.metrics.descent as i32;
        if units <= 0 {
            return size;
        }
        size.mul_ratio(units, 1000)
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for FontRegistry {
    fn text_width(&self, font: &str, size: Pt, text: &str) -> Pt {
        match self.resolve(font) {
            Some(font) => font.metrics.measure(size, text),
            None => (size * 0.6) * (text.chars().count() as i32),
        }
    }
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn font_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut post = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::POST_SCRIPT_NAME if post.is_none() => post = Some(name),
            name_id::FAMILY if family.is_none() => family = Some(name),
            _ => {}
        }
    }
    post.or(family)
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEJAVU: &[u8] = include_bytes!("../tests/fonts/DejaVuSansCondensed.ttf");

    #[test]
    fn helvetica_widths_follow_afm_tables() {
        let registry = FontRegistry::new();
        let size = Pt::from_f32(10.0);
        // "Hi" = 722 + 222 units.
        let width = registry.text_width(HELVETICA, size, "Hi");
        assert_eq!(width.to_milli_i64(), 9_440);
        let bold = registry.text_width(HELVETICA_BOLD, size, "Hi");
        assert_eq!(bold.to_milli_i64(), 10_000);
    }

    #[test]
    fn width_scales_linearly_with_size() {
        let registry = FontRegistry::new();
        let small = registry.text_width(HELVETICA, Pt::from_f32(8.0), "Engine runs well");
        let large = registry.text_width(HELVETICA, Pt::from_f32(16.0), "Engine runs well");
        assert!((large.to_f32() - small.to_f32() * 2.0).abs() < 0.01);
    }

    #[test]
    fn empty_text_has_no_width() {
        let registry = FontRegistry::new();
        assert_eq!(
            registry.text_width(HELVETICA, Pt::from_f32(12.0), ""),
            Pt::ZERO
        );
    }

    #[test]
    fn font_names_resolve_case_insensitively() {
        let registry = FontRegistry::new();
        assert!(registry.contains("helvetica-bold"));
        assert!(!registry.contains("DejaVuSansCondensed"));
    }

    #[test]
    fn unknown_fonts_fall_back_to_average_advance() {
        let registry = FontRegistry::new();
        let width = registry.text_width("Missing", Pt::from_f32(10.0), "abcd");
        assert_eq!(width.to_milli_i64(), 24_000);
    }

    #[test]
    fn winansi_covers_typographic_quotes() {
        assert_eq!(winansi_byte('\u{2019}'), Some(0x92));
        assert_eq!(winansi_byte('\u{00E9}'), Some(0xE9));
        assert_eq!(winansi_byte('\u{2026}'), Some(0x85));
        assert_eq!(winansi_byte('\u{4E2D}'), None);
    }

    #[test]
    fn embedded_faces_map_unicode_to_glyph_ids() {
        let mut registry = FontRegistry::new();
        let name = registry
            .register_bytes(DEJAVU.to_vec(), Some("DejaVuSansCondensed"))
            .unwrap();
        let font = registry.resolve(&name).unwrap();
        assert!(font.is_embedded());
        for ch in "\u{141}ukasz \u{41f}\u{435}\u{442}\u{440}\u{43e}\u{432} \u{2116}3 \u{2248} 400\u{b0}F".chars() {
            assert!(font.metrics.covers(ch), "{ch:?} should be covered");
            assert_ne!(font.metrics.glyph(ch).id, 0);
        }
        assert!(!font.metrics.covers('\u{4E2D}'));
        assert_eq!(font.metrics.glyph('\u{4E2D}').id, 0);
    }

    #[test]
    fn embedded_faces_measure_by_their_own_advances() {
        let mut registry = FontRegistry::new();
        let name = registry.register_bytes(DEJAVU.to_vec(), None).unwrap();
        let size = Pt::from_i32(10);
        let zhe = registry.text_width(&name, size, "\u{416}");
        let question = registry.text_width(&name, size, "?");
        assert!(zhe > question);
        assert_eq!(registry.text_width(&name, size, "\n"), Pt::ZERO);
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        let mut registry = FontRegistry::new();
        let err = registry
            .register_bytes(vec![0, 1, 2, 3], Some("broken"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Font(_)));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let mut registry = FontRegistry::new();
        let err = registry
            .register_file("/definitely/not/here/DejaVuSans.ttf")
            .unwrap_err();
        assert!(err.to_string().contains("DejaVuSans.ttf"));
    }
}
