use crate::assets::{AssetBundle, ImageData, decode_image, flate_compress};
use crate::canvas::{Command, Document, Page};
use crate::error::{ReportError, Result};
use crate::font::{CharMap, FontRegistry, HELVETICA, RegisteredFont, winansi_byte};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::types::{Color, Pt};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

pub const DEFAULT_TITLE: &str = "Engine Monitor Data Analysis Report";
const PRODUCER: &str = concat!("engine-report ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub compress_streams: bool,
    pub document_title: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
            document_title: Some(DEFAULT_TITLE.to_string()),
            creation_date: None,
        }
    }
}

struct FontResource<'a> {
    resource: String,
    object_id: usize,
    font: &'a RegisteredFont,
}

/// Objects are collected in order and numbered from 1; ids 1 and 2 are the
/// catalog and the page tree, filled in once every page is known.
struct ObjectTable {
    objects: Vec<String>,
}

impl ObjectTable {
    fn new() -> Self {
        Self {
            objects: vec![String::new(), String::new()],
        }
    }

    fn push(&mut self, body: String) -> usize {
        self.objects.push(body);
        self.objects.len()
    }

    fn reserve(&mut self) -> usize {
        self.push(String::new())
    }

    fn set(&mut self, id: usize, body: String) {
        if let Some(slot) = self.objects.get_mut(id - 1) {
            *slot = body;
        }
    }
}

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;

/// Serializes a recorded document. Fonts referenced by the pages must be
/// registered; images are looked up by resource id in `assets`.
pub fn document_to_pdf(
    document: &Document,
    registry: &FontRegistry,
    assets: &AssetBundle,
    options: &PdfOptions,
    mut metrics: Option<&mut DocumentMetrics>,
) -> Result<Vec<u8>> {
    let mut table = ObjectTable::new();

    let mut fonts: BTreeMap<String, FontResource<'_>> = BTreeMap::new();
    for (index, (name, used)) in collect_font_usage(document).into_iter().enumerate() {
        let font = registry
            .resolve(&name)
            .ok_or_else(|| ReportError::Font(format!("font {name} is not registered")))?;
        let missing: String = used.iter().filter(|ch| !font.metrics.covers(**ch)).collect();
        if !missing.is_empty() {
            tracing::warn!(
                font = %font.name,
                characters = %missing,
                "characters missing from the font are substituted"
            );
        }
        let object_id = build_font_objects(&mut table, font, &used);
        fonts.insert(
            name,
            FontResource {
                resource: format!("F{}", index + 1),
                object_id,
                font,
            },
        );
    }

    let mut images: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for (index, source) in collect_image_sources(document).into_iter().enumerate() {
        let asset = assets
            .image(&source)
            .ok_or_else(|| ReportError::Asset(format!("image {source} is not loaded")))?;
        let decoded = decode_image(asset)?;
        let smask = decoded
            .alpha
            .as_ref()
            .map(|alpha| table.push(image_smask_object(&decoded, alpha)));
        let object_id = table.push(image_object(&decoded, smask));
        images.insert(source, (format!("Im{}", index + 1), object_id));
    }

    let resources = resources_dict(&fonts, &images);
    let page_height = document.page_size.height;
    let mut page_ids = Vec::with_capacity(document.pages.len());
    for (index, page) in document.pages.iter().enumerate() {
        let content = render_page(page, page_height, &fonts, &images);
        let stream = if options.compress_streams {
            let compressed = flate_compress(content.as_bytes())?;
            encoded_stream_object(&compressed, "[/ASCIIHexDecode /FlateDecode]")
        } else {
            stream_object(&content)
        };
        if let Some(metrics) = metrics.as_deref_mut() {
            metrics.pages.push(PageMetrics::from_page(index + 1, page, stream.len()));
        }
        let content_id = table.push(stream);
        let page_id = table.push(format!(
            "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {} {}] /Resources {resources} /Contents {content_id} 0 R >>",
            fmt_pt(document.page_size.width),
            fmt_pt(page_height),
        ));
        page_ids.push(page_id);
    }

    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");
    table.set(
        PAGES_ID,
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", page_ids.len()),
    );
    table.set(
        CATALOG_ID,
        format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
    );
    let info_id = table.reserve();
    table.set(info_id, info_object(options));

    let bytes = build_pdf(&table.objects, info_id);
    if let Some(metrics) = metrics {
        metrics.total_bytes = bytes.len();
    }
    Ok(bytes)
}

/// Characters drawn with each font, keyed by font name.
fn collect_font_usage(document: &Document) -> BTreeMap<String, BTreeSet<char>> {
    let mut usage: BTreeMap<String, BTreeSet<char>> = BTreeMap::new();
    for page in &document.pages {
        // Text drawn before any explicit font change uses the canvas default.
        let mut current = HELVETICA.to_string();
        let mut saved = Vec::new();
        for command in &page.commands {
            match command {
                Command::SaveState => saved.push(current.clone()),
                Command::RestoreState => {
                    if let Some(name) = saved.pop() {
                        current = name;
                    }
                }
                Command::SetFontName(name) => current = name.clone(),
                Command::DrawString { text, .. } => {
                    usage
                        .entry(current.clone())
                        .or_default()
                        .extend(text.chars().filter(|ch| !ch.is_control()));
                }
                _ => {}
            }
        }
    }
    usage
}

fn collect_image_sources(document: &Document) -> BTreeSet<String> {
    document
        .pages
        .iter()
        .flat_map(|page| page.commands.iter())
        .filter_map(|command| match command {
            Command::DrawImage { resource_id, .. } => Some(resource_id.clone()),
            _ => None,
        })
        .collect()
}

fn build_font_objects(
    table: &mut ObjectTable,
    font: &RegisteredFont,
    used: &BTreeSet<char>,
) -> usize {
    tracing::trace!(font = %font.name, embedded = font.is_embedded(), "font resource");
    match font.data.as_deref() {
        None => table.push(font_object(&font.name)),
        Some(data) => {
            let mut glyphs: BTreeMap<u16, (u16, char)> = BTreeMap::new();
            for ch in used {
                let glyph = font.metrics.glyph(*ch);
                if glyph.id != 0 {
                    glyphs.entry(glyph.id).or_insert((glyph.advance, *ch));
                }
            }
            let file_id = table.push(font_file_object(data));
            let descriptor_id = table.push(font_descriptor_object(font, file_id));
            let cid_font_id = table.push(cid_font_object(font, descriptor_id, &glyphs));
            let to_unicode_id = table.push(stream_object(&to_unicode_cmap(&glyphs)));
            table.push(type0_font_object(font, cid_font_id, to_unicode_id))
        }
    }
}

fn resources_dict(
    fonts: &BTreeMap<String, FontResource<'_>>,
    images: &BTreeMap<String, (String, usize)>,
) -> String {
    let mut out = String::from("<< /ProcSet [/PDF /Text /ImageC]");
    if !fonts.is_empty() {
        out.push_str(" /Font <<");
        for font in fonts.values() {
            let _ = write!(out, " /{} {} 0 R", font.resource, font.object_id);
        }
        out.push_str(" >>");
    }
    if !images.is_empty() {
        out.push_str(" /XObject <<");
        for (resource, object_id) in images.values() {
            let _ = write!(out, " /{resource} {object_id} 0 R");
        }
        out.push_str(" >>");
    }
    out.push_str(" >>");
    out
}

fn render_page(
    page: &Page,
    page_height: Pt,
    fonts: &BTreeMap<String, FontResource<'_>>,
    images: &BTreeMap<String, (String, usize)>,
) -> String {
    let mut out = String::new();
    let mut font_name = HELVETICA.to_string();
    let mut font_size = Pt::from_i32(12);
    let mut saved: Vec<(String, Pt)> = Vec::new();

    for command in &page.commands {
        match command {
            Command::SaveState => {
                saved.push((font_name.clone(), font_size));
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some((name, size)) = saved.pop() {
                    font_name = name;
                    font_size = size;
                }
                out.push_str("Q\n");
            }
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => out.push_str(&color_op(*color, "rg")),
            Command::SetStrokeColor(color) => out.push_str(&color_op(*color, "RG")),
            Command::SetLineWidth(width) => {
                let _ = writeln!(out, "{} w", fmt_pt(*width));
            }
            Command::SetFontName(name) => font_name = name.clone(),
            Command::SetFontSize(size) => font_size = *size,
            Command::ClipRect {
                x,
                y,
                width,
                height,
            } => {
                // Top-left origin on our side, bottom-left in PDF user space.
                let _ = writeln!(
                    out,
                    "{} {} {} {} re\nW\nn",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                );
            }
            Command::MoveTo { x, y } => {
                let _ = writeln!(out, "{} {} m", fmt_pt(*x), fmt_pt(page_height - *y));
            }
            Command::LineTo { x, y } => {
                let _ = writeln!(out, "{} {} l", fmt_pt(*x), fmt_pt(page_height - *y));
            }
            Command::Stroke => out.push_str("S\n"),
            Command::DrawString { x, y, text } => {
                let Some(font) = fonts.get(&font_name) else {
                    continue;
                };
                let shown = match &font.font.metrics.chars {
                    CharMap::WinAnsi(_) => format!("({})", encode_winansi(text)),
                    CharMap::Unicode(_) => encode_glyph_ids(font.font, text),
                };
                let _ = writeln!(
                    out,
                    "BT\n/{} {} Tf\n{} {} Td\n{shown} Tj\nET",
                    font.resource,
                    fmt_pt(font_size),
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - font_size),
                );
            }
            Command::FillRect {
                x,
                y,
                width,
                height,
            } => {
                let _ = writeln!(
                    out,
                    "{} {} {} {} re\nf",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                );
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                let _ = writeln!(
                    out,
                    "{} {} {} {} re\nS",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                );
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                if let Some((resource, _)) = images.get(resource_id) {
                    let _ = writeln!(
                        out,
                        "q\n{} 0 0 {} {} {} cm\n/{resource} Do\nQ",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - *height)
                    );
                }
            }
        }
    }
    out
}

/// WinAnsi bytes inside a PDF literal string; characters outside the code
/// page become `?`, and everything non-printable is octal-escaped so the
/// content stream stays ASCII.
fn encode_winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match winansi_byte(ch).unwrap_or(b'?') {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            byte if !(0x20..0x7f).contains(&byte) => {
                let _ = write!(out, "\\{byte:03o}");
            }
            byte => out.push(byte as char),
        }
    }
    out
}

/// Two-byte glyph ids for an Identity-H font, as a hex string.
fn encode_glyph_ids(font: &RegisteredFont, text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 4 + 2);
    out.push('<');
    for ch in text.chars().filter(|ch| !ch.is_control()) {
        let _ = write!(out, "{:04X}", font.metrics.glyph(ch).id);
    }
    out.push('>');
    out
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ch if ch.is_ascii() => out.push(ch),
            _ => out.push('?'),
        }
    }
    out
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        HELVETICA.to_string()
    } else {
        out
    }
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn cid_font_object(
    font: &RegisteredFont,
    descriptor_id: usize,
    glyphs: &BTreeMap<u16, (u16, char)>,
) -> String {
    let widths = glyphs
        .iter()
        .map(|(id, (advance, _))| format!("{id} [{advance}]"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /FontDescriptor {} 0 R /DW {} /W [{}] /CIDToGIDMap /Identity >>",
        sanitize_font_name(&font.name),
        descriptor_id,
        font.metrics.missing_width,
        widths
    )
}

fn type0_font_object(font: &RegisteredFont, cid_font_id: usize, to_unicode_id: usize) -> String {
    format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
        sanitize_font_name(&font.name),
        cid_font_id,
        to_unicode_id
    )
}

/// Maps glyph ids back to text so drawn strings stay searchable.
fn to_unicode_cmap(glyphs: &BTreeMap<u16, (u16, char)>) -> String {
    let mut out = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    let entries: Vec<(u16, char)> = glyphs.iter().map(|(id, (_, ch))| (*id, *ch)).collect();
    // A bfchar block holds at most 100 mappings.
    for chunk in entries.chunks(100) {
        let _ = writeln!(out, "{} beginbfchar", chunk.len());
        for (id, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16 = ch
                .encode_utf16(&mut units)
                .iter()
                .fold(String::new(), |mut hex, unit| {
                    let _ = write!(hex, "{unit:04X}");
                    hex
                });
            let _ = writeln!(out, "<{id:04X}> <{utf16}>");
        }
        out.push_str("endbfchar\n");
    }
    out.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    out
}

fn font_descriptor_object(font: &RegisteredFont, font_file_id: usize) -> String {
    let metrics = &font.metrics;
    let mut flags = 32;
    if metrics.is_fixed_pitch {
        flags |= 1;
    }
    format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags {} /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV 80 /MissingWidth {} /FontFile2 {} 0 R >>",
        sanitize_font_name(&font.name),
        flags,
        metrics.bbox.0,
        metrics.bbox.1,
        metrics.bbox.2,
        metrics.bbox.3,
        metrics.italic_angle,
        metrics.ascent,
        metrics.descent,
        metrics.cap_height,
        metrics.missing_width,
        font_file_id
    )
}

fn font_file_object(data: &[u8]) -> String {
    let stream_data = encode_stream_data(data);
    format!(
        "<< /Length {} /Length1 {} /Filter /ASCIIHexDecode >>\nstream\n{}\nendstream",
        stream_data.len(),
        data.len(),
        stream_data
    )
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = match image.filter {
        "/DCTDecode" => "[/ASCIIHexDecode /DCTDecode]",
        _ => "[/ASCIIHexDecode /FlateDecode]",
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {id} 0 R"))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Length {} /Filter {}{} >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        stream_data.len(),
        filters,
        smask,
        stream_data
    )
}

fn image_smask_object(image: &ImageData, alpha: &[u8]) -> String {
    let stream_data = encode_stream_data(alpha);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        stream_data.len(),
        stream_data
    )
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn encoded_stream_object(data: &[u8], filters: &str) -> String {
    let stream_data = encode_stream_data(data);
    format!(
        "<< /Length {} /Filter {} >>\nstream\n{}\nendstream",
        stream_data.len(),
        filters,
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + data.len() / 32);
    for (index, byte) in data.iter().enumerate() {
        let _ = write!(out, "{byte:02X}");
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

fn info_object(options: &PdfOptions) -> String {
    let mut entries = vec![format!("/Producer ({})", escape_pdf_string(PRODUCER))];
    if let Some(title) = options.document_title.as_deref() {
        entries.push(format!("/Title ({})", escape_pdf_string(title)));
    }
    if let Some(created) = options.creation_date {
        entries.push(format!(
            "/CreationDate (D:{}Z)",
            created.format("%Y%m%d%H%M%S")
        ));
    }
    format!("<< {} >>", entries.join(" "))
}

/// The trailer /ID is derived from the object bodies, so identical input
/// produces byte-identical output.
fn file_id(objects: &[String]) -> String {
    let mut hasher = Sha256::new();
    for object in objects {
        hasher.update(object.as_bytes());
    }
    let digest = hasher.finalize();
    digest[..16].iter().fold(String::new(), |mut out, byte| {
        let _ = write!(out, "{byte:02X}");
        out
    })
}

fn build_pdf(objects: &[String], info_id: usize) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(object.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }

    let id = file_id(objects);
    let trailer = format!(
        "trailer\n<< /Size {} /Root {CATALOG_ID} 0 R /Info {info_id} 0 R /ID [<{id}> <{id}>] >>\nstartxref\n{xref_start}\n%%EOF",
        objects.len() + 1,
    );
    out.extend_from_slice(trailer.as_bytes());
    out
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        return format!("{sign}{int_part}");
    }
    let mut s = format!("{sign}{int_part}.{frac_part:03}");
    while s.ends_with('0') {
        s.pop();
    }
    s
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn fmt_unit(value: f32) -> String {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    format_milli((clamped * 1000.0).round() as i64)
}

fn color_op(color: Color, operator: &str) -> String {
    format!(
        "{} {} {} {operator}\n",
        fmt_unit(color.r),
        fmt_unit(color.g),
        fmt_unit(color.b)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Asset, AssetKind};
    use crate::canvas::Canvas;
    use crate::types::Size;

    fn one_page(text: &str) -> Document {
        let mut canvas = Canvas::new(Size::letter());
        canvas.set_font_name("Helvetica-Bold");
        canvas.set_font_size(Pt::from_i32(10));
        canvas.draw_string(Pt::from_i32(72), Pt::from_i32(72), text);
        canvas.move_to(Pt::from_i32(10), Pt::from_i32(10));
        canvas.line_to(Pt::from_i32(100), Pt::from_i32(10));
        canvas.stroke();
        canvas.finish()
    }

    fn uncompressed() -> PdfOptions {
        PdfOptions {
            compress_streams: false,
            ..PdfOptions::default()
        }
    }

    #[test]
    fn output_parses_with_lopdf() {
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(
            &one_page("Engine runs well"),
            &registry,
            &AssetBundle::default(),
            &PdfOptions::default(),
            None,
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn text_is_flipped_to_pdf_space() {
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(
            &one_page("Hi"),
            &registry,
            &AssetBundle::default(),
            &uncompressed(),
            None,
        )
        .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        // 792 - 72 - 10
        assert!(text.contains("72 710 Td"));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
        assert!(text.contains("(Hi) Tj"));
    }

    #[test]
    fn identical_documents_produce_identical_bytes() {
        let registry = FontRegistry::new();
        let render = || {
            document_to_pdf(
                &one_page("same"),
                &registry,
                &AssetBundle::default(),
                &PdfOptions::default(),
                None,
            )
            .unwrap()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn metrics_count_pages_and_bytes() {
        let registry = FontRegistry::new();
        let mut metrics = DocumentMetrics::default();
        let bytes = document_to_pdf(
            &one_page("x"),
            &registry,
            &AssetBundle::default(),
            &PdfOptions::default(),
            Some(&mut metrics),
        )
        .unwrap();
        assert_eq!(metrics.pages.len(), 1);
        assert_eq!(metrics.total_bytes, bytes.len());
        assert!(metrics.pages[0].content_bytes > 0);
    }

    #[test]
    fn unloaded_image_is_an_asset_error() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.draw_image(
            Pt::ZERO,
            Pt::ZERO,
            Pt::from_i32(10),
            Pt::from_i32(10),
            "logo",
        );
        let err = document_to_pdf(
            &canvas.finish(),
            &FontRegistry::new(),
            &AssetBundle::default(),
            &PdfOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::Asset(_)));
    }

    #[test]
    fn images_become_xobjects() {
        let png = {
            let image = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
            let mut out = std::io::Cursor::new(Vec::new());
            image::DynamicImage::ImageRgb8(image)
                .write_to(&mut out, image::ImageFormat::Png)
                .unwrap();
            out.into_inner()
        };
        let mut assets = AssetBundle::default();
        assets.add(Asset::new("logo", AssetKind::Image, png));
        let mut canvas = Canvas::new(Size::letter());
        canvas.draw_image(
            Pt::from_i32(28),
            Pt::from_i32(21),
            Pt::from_i32(170),
            Pt::from_i32(41),
            "logo",
        );
        let bytes = document_to_pdf(
            &canvas.finish(),
            &FontRegistry::new(),
            &assets,
            &uncompressed(),
            None,
        )
        .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Image"));
        assert!(text.contains("/Im1 Do"));
        assert!(lopdf::Document::load_mem(&bytes).is_ok());
    }

    #[test]
    fn winansi_escapes_delimiters_and_high_bytes() {
        assert_eq!(encode_winansi("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(encode_winansi("caf\u{e9}"), "caf\\351");
        assert_eq!(encode_winansi("\u{4e2d}"), "?");
    }

    #[test]
    fn embedded_fonts_draw_glyph_ids_through_identity_h() {
        let mut registry = FontRegistry::new();
        let name = registry
            .register_bytes(
                include_bytes!("../tests/fonts/DejaVuSansCondensed.ttf").to_vec(),
                None,
            )
            .unwrap();
        let mut canvas = Canvas::new(Size::letter());
        canvas.set_font_name(&name);
        canvas.set_font_size(Pt::from_i32(10));
        canvas.draw_string(Pt::from_i32(72), Pt::from_i32(72), "\u{41f}\u{2248}");
        let bytes = document_to_pdf(
            &canvas.finish(),
            &registry,
            &AssetBundle::default(),
            &uncompressed(),
            None,
        )
        .unwrap();

        let font = registry.resolve(&name).unwrap();
        let pe = font.metrics.glyph('\u{41f}').id;
        let approx = font.metrics.glyph('\u{2248}').id;
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Type0"));
        assert!(text.contains("/Encoding /Identity-H"));
        assert!(text.contains("/Subtype /CIDFontType2"));
        assert!(text.contains(&format!("<{pe:04X}{approx:04X}> Tj")));
        assert!(text.contains(&format!("<{pe:04X}> <041F>")));
        assert!(text.contains(&format!("<{approx:04X}> <2248>")));
        assert!(!text.contains("/WinAnsiEncoding"));
        assert!(lopdf::Document::load_mem(&bytes).is_ok());
    }

    #[test]
    fn info_carries_title_and_creation_date() {
        let options = PdfOptions {
            creation_date: chrono::DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
                .ok()
                .map(|date| date.with_timezone(&Utc)),
            ..PdfOptions::default()
        };
        let info = info_object(&options);
        assert!(info.contains("/Title (Engine Monitor Data Analysis Report)"));
        assert!(info.contains("/CreationDate (D:20240501123000Z)"));
    }

    #[test]
    fn milli_formatting_trims_zeros() {
        assert_eq!(format_milli(0), "0");
        assert_eq!(format_milli(12_500), "12.5");
        assert_eq!(format_milli(-3_000), "-3");
        assert_eq!(fmt_unit(0.2), "0.2");
    }
}
