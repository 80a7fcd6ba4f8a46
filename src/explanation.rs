//! The fixed pages: the explanation/glossary page closing every report and
//! the additional-remarks page that may follow a record.

use crate::fit::ELLIPSIS;
use crate::layout::{CONTENT_WIDTH, FontRange, PAGE_LEFT};
use crate::sections::{TITLE_BLUE, company_block, copyright_line};
use crate::surface::{Align, PageSurface, Weight};
use crate::types::{Color, Pt, cm};

pub const EXPLANATION_KIND: &str = "explanation";
pub const ADDITIONAL_KIND: &str = "additional";
pub const ADDITIONAL_TITLE: &str = "Additional Remarks";

const EXPLANATION_TITLE: &str = "Explanation of Engine Monitor Data Analysis Report";
const BODY_SIZES: [i32; 4] = [10, 9, 8, 7];
const BODY_LINE_HEIGHT: f32 = 0.42;
const GLOSSARY_LINE_HEIGHT: f32 = 0.45;
const GLOSSARY_COLUMN_GAP: f32 = 0.2;

struct GlossaryEntry {
    term: &'static str,
    meaning: &'static str,
    note: bool,
}

const fn term(term: &'static str, meaning: &'static str) -> GlossaryEntry {
    GlossaryEntry {
        term,
        meaning,
        note: false,
    }
}

const fn note(meaning: &'static str) -> GlossaryEntry {
    GlossaryEntry {
        term: "",
        meaning,
        note: true,
    }
}

const GLOSSARY: [(f32, &[GlossaryEntry]); 3] = [
    (
        5.5,
        &[
            term("EGT", " - Exhaust Gas Temperature"),
            term("CHT", " - Cylinder Head Temperature"),
            term("TIT", " - Turbine Inlet Temperature"),
            term("MAP", " - Manifold Pressure"),
        ],
    ),
    (
        5.9,
        &[
            term("RPM", " - Revolutions Per Minute"),
            term("FF", " - Fuel flow"),
            term("GPH/PPH", " - Gallons/Pounds Per Hr."),
            term("ROP/LOP", " - Rich/Lean of Peak EGT"),
        ],
    ),
    (
        6.0,
        &[
            term("EGTn/CHTn", " - EGT/CHT cylinder #n"),
            note("Cyl #1 is right rear on Continental, right front on Lycoming,"),
            note("odd #s on right, even #s on left (as seen from the cockpit)."),
            term("GAMI", " - General Aviation Modifications, Inc."),
            term("T/O", " - Takeoff"),
        ],
    ),
];

enum Block {
    Title(&'static str),
    Text(&'static str),
    Subtitle(&'static str, &'static str),
    Caution(&'static str),
}

const BODY: &[Block] = &[
    Block::Title("Client Comments Section"),
    Block::Text(
        "In this section, the analyst records any relevant client comments pertaining to the analysis. This might include the client's stated reason for requesting the analysis, description of the flight (including any flight test profile protocols flown), description of observed symptoms or abnormal indications (if any), etc.",
    ),
    Block::Title("Summary of Findings Section"),
    Block::Text(
        "In this section, the analyst provides a concise summary of analytical findings, with special emphasis on items that the analyst considers particularly significant, abnormal, or suboptimal. (Much more detail about these findings appears in the next section of the report.)",
    ),
    Block::Title("Analysis Detail Section"),
    Block::Text(
        "In this section, the analyst provides detailed analytical findings in each of seven specific functional areas. The findings for each of these areas are color-coded to indicate whether the analysis considers them to be Satisfactory, Caution, Alert, or Not Applicable. (\"Not applicable\" generally indicates that the engine monitor data necessary to assess a functional area is either missing or inadequate. Not all engine monitors are capable of capturing the data required to analyze some of these areas.)",
    ),
    Block::Subtitle(
        "GAMI Lean Test",
        "An analysis of mixture distribution quality: the extent to which all cylinders are operating at the same mixture. The \"GAMI spread\" (measured in term of fuel flow) indicates the mixture difference between the leanest- and richest-running cylinder. (For fuel-injected engines, a GAMI spread of 0.5 GPH or less is desirable.) This test requires that the engine monitor is capable of recording fuel flow and that the flight includes one or more \"mixture sweeps\" performed per Savvy's flight test protocol.",
    ),
    Block::Subtitle(
        "Ignition",
        "An analysis of ignition system performance: magneto condition, magneto timing, spark plug condition, and ignition harness condition. This test requires that the flight include an \"ignition system stress test\" (lean in-flight mag check) performed per Savvy's flight test protocol.",
    ),
    Block::Subtitle(
        "Max Power",
        "An analysis of key performance-related parameters -- fuel flow, manifold pressure, and RPM -- at full takeoff power. This test requires that the engine monitor is capable of recording these parameters.",
    ),
    Block::Subtitle(
        "Temperatures",
        "An analysis of key temperature parameters -- CHTs, EGTs and (for turbos) TITs -- during all phases of the flight. Significant exceedences are noted. (Temperature control is the key to engine longevity.)",
    ),
    Block::Subtitle(
        "Engine Monitor",
        "A performance evaluation of the engine monitor instrumentation itself. Any faulty sensors, harness and connector problems, noisy data, and system configuration errors will be noted here.",
    ),
    Block::Subtitle(
        "Powerplant Management",
        "An evaluation of the pilot's powerplant management procedures. This could include power settings, leaning technique, and compliance with Savvy's flight test profile protocols.",
    ),
    Block::Subtitle(
        "Electrical",
        "An analysis of the aircraft electrical system performance, including alternators, batteries, regulators/control units, etc. (Not all engine monitors record this information.)",
    ),
    Block::Title("Recommendations Section"),
    Block::Text(
        "In this section, the analyst may offer recommendations and suggestions for actions to be taken to remediate any less-than-satisfactory items identified by the analysis. These could include engine adjustments, preventive maintenance tasks, and/or changes to the pilot's powerplant management techniques.",
    ),
    Block::Caution(
        "CAUTION: Savvy-recommended engine adjustments and maintenance actions should be made only after consultation with a certificated mechanic or repair station. Savvy-recommended changes to powerplant management techniques must be implemented in compliance with the limitations section of the aircraft's Pilots Operating Handbook (POH) or Airplane Flight Manual (AFM) and the engine manufacturer's Operators Manual (or equivalent document).",
    ),
];

fn body_line_height(body: Pt) -> Pt {
    cm(BODY_LINE_HEIGHT * body.to_f32() / 10.0)
}

/// Logo, company block and a large blue title; returns the offset below it.
fn page_heading(
    surface: &mut PageSurface<'_>,
    kind: &str,
    logo: Option<&str>,
    title: &str,
    title_gap: f32,
) -> Pt {
    surface.add_page(kind);
    surface.set_margins(cm(PAGE_LEFT), cm(PAGE_LEFT), cm(PAGE_LEFT));
    let top = company_block(surface, logo, cm(1.1)) + cm(title_gap);
    surface.set_text_color(TITLE_BLUE);
    surface.set_font(Weight::Bold, Pt::from_i32(16));
    surface.set_xy(cm(PAGE_LEFT), top);
    surface.write(cm(0.5), title);
    top
}

fn glossary(surface: &mut PageSurface<'_>, top: Pt) -> Pt {
    let row_height = cm(GLOSSARY_LINE_HEIGHT);
    let mut left = cm(PAGE_LEFT);
    let mut bottom = top;
    surface.set_text_color(Color::BLACK);
    for (width, entries) in GLOSSARY {
        let width = cm(width);
        let mut y = top;
        for entry in entries {
            let size = Pt::from_i32(if entry.note { 8 } else { 10 });
            surface.set_font(Weight::Bold, size);
            surface.set_xy(left, y);
            surface.cell(width, row_height, entry.term, Align::Left, false);
            let term_width = surface.string_width(entry.term);

            surface.set_font(Weight::Regular, size);
            surface.set_xy(left + term_width + cm(0.1), y);
            surface.cell(
                width - term_width - cm(0.1),
                row_height,
                entry.meaning,
                Align::Left,
                false,
            );
            y += row_height;
        }
        bottom = bottom.max(y);
        left += width + cm(GLOSSARY_COLUMN_GAP);
    }
    bottom
}

fn section_title(surface: &mut PageSurface<'_>, title: &str) {
    surface.set_text_color(TITLE_BLUE);
    surface.set_font(Weight::Bold, Pt::from_i32(14));
    surface.write(cm(0.45), title);
    surface.ln(cm(0.55));
}

fn draw_explanation(surface: &mut PageSurface<'_>, logo: Option<&str>, year: i32, body: Pt) -> Pt {
    let top = page_heading(surface, EXPLANATION_KIND, logo, EXPLANATION_TITLE, 0.5);
    surface.ln(cm(0.6));

    surface.set_text_color(Color::BLACK);
    surface.set_font(Weight::Regular, Pt::from_i32(10));
    surface.write(cm(0.5), &copyright_line(year));
    surface.ln(cm(0.9));
    section_title(surface, "Glossary of Abbreviations");

    let glossary_top = surface.y().max(top + cm(2.0));
    let bottom = glossary(surface, glossary_top);
    surface.set_xy(cm(PAGE_LEFT), bottom + cm(0.2));

    let line_height = body_line_height(body);
    for block in BODY {
        match block {
            Block::Title(title) => section_title(surface, title),
            Block::Text(text) => {
                surface.set_text_color(Color::BLACK);
                surface.set_font(Weight::Regular, body);
                surface.write(line_height, text);
                surface.ln(line_height + cm(0.3));
            }
            Block::Subtitle(title, text) => {
                surface.set_text_color(TITLE_BLUE);
                surface.set_font(Weight::Bold, body);
                surface.write(line_height, &format!("{title}:  "));
                surface.set_text_color(Color::BLACK);
                surface.set_font(Weight::Regular, body);
                surface.write(line_height, text);
                surface.ln(line_height + cm(0.2));
            }
            Block::Caution(text) => {
                let width = cm(CONTENT_WIDTH);
                let lines = surface.fitter(Weight::Regular).wrap_text(text, body, width);
                surface.set_text_color(Color::BLACK);
                surface.set_font(Weight::Regular, body);
                surface.multi_cell(width, line_height, &lines, Align::Left, true);
            }
        }
    }
    surface.y()
}

/// Appends the explanation page. The body size is the largest of 10..7pt
/// at which a dry run of the page ends above the printable bottom.
pub fn explanation_page(surface: &mut PageSurface<'_>, logo: Option<&str>, year: i32) -> Pt {
    let limit = surface.printable_bottom();
    let mut chosen = Pt::from_i32(BODY_SIZES[BODY_SIZES.len() - 1]);
    for points in BODY_SIZES {
        let body = Pt::from_i32(points);
        let mut scratch =
            PageSurface::new(surface.page_size(), surface.fonts(), surface.faces().clone());
        let bottom = draw_explanation(&mut scratch, logo, year, body);
        if bottom <= limit {
            chosen = body;
            break;
        }
        tracing::trace!(size = points, bottom = bottom.to_cm(), "explanation overflows");
    }
    tracing::debug!(body_size = chosen.to_f32(), "explanation page");
    draw_explanation(surface, logo, year, chosen);
    chosen
}

/// Appends one "Additional Remarks" page. The remarks are flowed at 10pt,
/// shrunk towards the floor size until they fit the page, and cropped with
/// an ellipsis when even the floor is too large. Returns the number of
/// lines drawn.
pub fn additional_page(
    surface: &mut PageSurface<'_>,
    logo: Option<&str>,
    remarks: &str,
    range: FontRange,
) -> usize {
    page_heading(surface, ADDITIONAL_KIND, logo, ADDITIONAL_TITLE, 0.8);
    surface.ln(cm(0.9));

    let range = range.capped(Pt::from_i32(10));
    let width = cm(CONTENT_WIDTH);
    let top = surface.y();
    let available = surface.printable_bottom() - top;
    let capacity = |size: Pt| -> usize {
        let line_height = body_line_height(size);
        let mut lines = 0usize;
        while line_height * ((lines + 1) as i32) <= available {
            lines += 1;
        }
        lines
    };

    let (size, lines) = {
        let fitter = surface.fitter(Weight::Regular);
        let mut size = range.max;
        loop {
            let lines = fitter.wrap_text(remarks, size, width);
            if lines.len() <= capacity(size) {
                break (size, lines);
            }
            if size <= range.min {
                let cropped = fitter.crop_text(remarks, range.min, width, capacity(range.min));
                tracing::warn!(
                    chars = remarks.chars().count(),
                    truncated = cropped.ends_with(ELLIPSIS),
                    "additional remarks cropped to one page"
                );
                break (
                    range.min,
                    cropped.lines().map(str::to_string).collect::<Vec<_>>(),
                );
            }
            size = (size - Pt::from_i32(1)).max(range.min);
        }
    };

    surface.set_text_color(Color::BLACK);
    surface.set_font(Weight::Regular, size);
    surface.set_xy(cm(PAGE_LEFT), top);
    surface.multi_cell(width, body_line_height(size), &lines, Align::Left, false);
    lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::font::FontRegistry;
    use crate::surface::{FontFaces, PAGE_KIND_KEY};
    use crate::types::Size;

    fn lowest_text(page: &crate::canvas::Page) -> Pt {
        page.commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { y, .. } => Some(*y),
                _ => None,
            })
            .fold(Pt::ZERO, Pt::max)
    }

    #[test]
    fn explanation_fits_on_one_page() {
        let fonts = FontRegistry::new();
        let mut surface = PageSurface::new(Size::letter(), &fonts, FontFaces::default());
        let body = explanation_page(&mut surface, None, 2026);
        assert!(body >= Pt::from_i32(7) && body <= Pt::from_i32(10));
        assert_eq!(surface.page_count(), 1);
        let page = surface.current_page();
        assert_eq!(page.meta(PAGE_KIND_KEY), Some(EXPLANATION_KIND));
        assert!(page.contains_text("Glossary of Abbreviations"));
        assert!(page.contains_text("GPH/PPH"));
        assert!(page.texts().any(|text| text.starts_with("CAUTION:")));
        assert!(lowest_text(page) < surface.printable_bottom());
    }

    #[test]
    fn explanation_draws_the_logo_when_given() {
        let fonts = FontRegistry::new();
        let mut surface = PageSurface::new(Size::letter(), &fonts, FontFaces::default());
        explanation_page(&mut surface, Some("logo"), 2026);
        assert!(
            surface
                .current_page()
                .commands
                .iter()
                .any(|cmd| matches!(cmd, Command::DrawImage { resource_id, .. } if resource_id == "logo"))
        );
    }

    #[test]
    fn short_remarks_flow_at_ten_points() {
        let fonts = FontRegistry::new();
        let mut surface = PageSurface::new(Size::letter(), &fonts, FontFaces::default());
        let lines = additional_page(
            &mut surface,
            None,
            "Borescope cylinder 3 at next oil change.",
            FontRange::default(),
        );
        assert_eq!(lines, 1);
        let page = surface.current_page();
        assert!(page.contains_text(ADDITIONAL_TITLE));
        assert!(
            page.commands
                .contains(&Command::SetFontSize(Pt::from_i32(10)))
        );
    }

    #[test]
    fn an_unbroken_word_is_split_inside_the_margins() {
        let fonts = FontRegistry::new();
        let mut surface = PageSurface::new(Size::letter(), &fonts, FontFaces::default());
        let remarks = format!("See https://example.com/{}", "a".repeat(300));
        let lines = additional_page(&mut surface, None, &remarks, FontRange::default());
        assert!(lines > 1);

        let right = cm(PAGE_LEFT + CONTENT_WIDTH);
        let mut size = Pt::from_i32(12);
        let mut font = crate::font::HELVETICA.to_string();
        let mut body = String::new();
        for command in &surface.current_page().commands {
            match command {
                Command::SetFontSize(value) => size = *value,
                Command::SetFontName(name) => font = name.clone(),
                Command::DrawString { x, text, .. }
                    if text.starts_with("See")
                        || text.starts_with("https")
                        || (!text.is_empty() && text.chars().all(|ch| ch == 'a')) =>
                {
                    use crate::font::TextMeasure;
                    assert!(*x + fonts.text_width(&font, size, text) <= right, "{text}");
                    body.push_str(text);
                }
                _ => {}
            }
        }
        assert_eq!(body.replace(' ', ""), remarks.replace(' ', ""));
    }

    #[test]
    fn endless_remarks_stay_on_one_page() {
        let fonts = FontRegistry::new();
        let mut surface = PageSurface::new(Size::letter(), &fonts, FontFaces::default());
        let remarks = "The number four cylinder exhaust valve shows signs of distress. ".repeat(400);
        additional_page(&mut surface, None, &remarks, FontRange::default());
        assert_eq!(surface.page_count(), 1);
        let page = surface.current_page();
        assert!(lowest_text(page) < surface.printable_bottom());
        let last = page.texts().last().unwrap();
        assert!(last.ends_with(ELLIPSIS));
    }
}
