//! Semantic report regions drawn onto a [`PageSurface`].
//!
//! Each function takes the running vertical offset (`top`) and either
//! returns the new offset or the height it consumed, so the assembler can
//! thread page layout explicitly and sections can be exercised one by one.

use crate::fit::ELLIPSIS;
use crate::layout::{
    CHIP_HEIGHT, CHIP_PADDING, CONTENT_WIDTH, Column, DATA_LABEL_SIZE, DataBoxMetrics,
    FOOTER_SIZE, FontRange, HEADER_COLUMN_WIDTH, HEADER_LABEL_GAP, HEADER_LABEL_SIZE,
    HEADER_MARGIN, HEADER_ROW_HEIGHT, HEADING_ADVANCE, HEADING_HEIGHT, OBSERVATION_LINES,
    PAGE_LEFT, RULE_GAP, SWEEP_LINE_HEIGHT, SWEEP_MARGIN, SWEEP_ROW_HEIGHT, SWEEP_RULE_HEIGHT,
    SWEEP_TITLE_HEIGHT, TITLE_RULE, TextBlock, sweep_box_width,
};
use crate::record::{Assessment, FlightReportRecord, FunctionalArea, is_blank};
use crate::surface::{Align, PageSurface, Weight};
use crate::types::{Color, Pt, cm};
use chrono::NaiveDate;

pub const TITLE_BLUE: Color = Color::rgb8(54, 95, 145);
pub const COMPANY_RED: Color = Color::rgb8(182, 40, 32);
pub const ADDRESS_GRAY: Color = Color::rgb8(95, 95, 95);

pub const LOGO_RESOURCE: &str = "logo";

const HEADING_SIZE: i32 = 10;
const CHIP_SIZE: i32 = 10;
const CHIP_MIN_SIZE: i32 = 6;
const TWIN_SWEEP_SIZE: i32 = 9;
const TWIN_SWEEP_LINES: usize = 2;
const TWIN_SWEEP_LINE_HEIGHT: f32 = 0.35;
const TWIN_SWEEP_GUTTER: f32 = 0.5;

fn size(points: i32) -> Pt {
    Pt::from_i32(points)
}

/// Free text is fitted as one paragraph: embedded line breaks become spaces.
pub fn flatten(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

pub fn copyright_line(year: i32) -> String {
    format!(
        "Copyright 2012-{year} by Savvy Aircraft Maintenance Management, Inc. All rights reserved."
    )
}

/// Horizontal rule across a column.
pub fn rule(surface: &mut PageSurface<'_>, column: Column, y: Pt) {
    surface.set_draw_color(Color::BLACK);
    surface.line(column.x(), y, column.right_pt(), y);
}

/// Logo and the two-line report title; returns the offset of the rule
/// drawn beneath them.
pub fn title_block(surface: &mut PageSurface<'_>, logo: Option<&str>) -> Pt {
    if let Some(resource) = logo {
        surface.image(resource, cm(1.0), cm(0.76), cm(6.0), cm(1.44));
    }
    surface.set_font(Weight::Bold, size(16));
    surface.set_text_color(TITLE_BLUE);
    surface.set_xy(cm(10.7), cm(0.9));
    surface.cell(cm(10.0), Pt::ZERO, "Engine Monitor Data", Align::Right, false);
    surface.set_xy(cm(10.7), cm(1.6));
    surface.cell(cm(10.0), Pt::ZERO, "Analysis Report", Align::Right, false);

    let top = cm(TITLE_RULE);
    rule(surface, Column::FULL, top);
    top
}

/// Company name and address used by the static pages.
pub fn company_block(surface: &mut PageSurface<'_>, logo: Option<&str>, top: Pt) -> Pt {
    if let Some(resource) = logo {
        surface.image(resource, cm(1.0), cm(0.3), cm(6.0), cm(1.44));
    }
    surface.set_font(Weight::Bold, size(14));
    surface.set_text_color(COMPANY_RED);
    surface.set_xy(cm(8.8), top);
    surface.cell(cm(12.0), Pt::ZERO, "Savvy Aviation, Inc.", Align::Left, false);

    let top = top + cm(0.6);
    surface.set_font(Weight::Bold, size(12));
    surface.set_text_color(ADDRESS_GRAY);
    surface.set_xy(cm(8.8), top);
    surface.cell(
        cm(12.0),
        Pt::ZERO,
        "30 N. Gould St, Suite 7491, Sheridan, WY 82801",
        Align::Left,
        false,
    );
    top
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    pub label: String,
    pub value: String,
}

/// One of the three label/value column sets across the top of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSet {
    pub rows: [HeaderRow; 3],
}

impl HeaderSet {
    pub fn new(rows: [(&str, String); 3]) -> Self {
        Self {
            rows: rows.map(|(label, value)| HeaderRow {
                label: label.to_string(),
                value,
            }),
        }
    }
}

/// Header content for a record. `engine_position` is `None` on single
/// engine reports, where the third row of the last set stays blank.
pub fn header_sets(
    record: &FlightReportRecord,
    report_date: NaiveDate,
    fallback_label: &str,
    engine_position: Option<&str>,
) -> [HeaderSet; 3] {
    let aircraft = record.aircraft();
    let subscription = match aircraft.subscription_end {
        Some(end) => format!("Subscr. ends: {}", end.format("%Y-%m-%d")),
        None => fallback_label.to_string(),
    };
    let (position_label, position) = match engine_position {
        Some(position) => ("Engine Position:", position.to_string()),
        None => ("", String::new()),
    };
    [
        HeaderSet::new([
            ("Client:", aircraft.owner_name()),
            ("Aircraft:", aircraft.registration.clone()),
            ("Flight:", record.flight.date.format("%Y-%m-%d").to_string()),
        ]),
        HeaderSet::new([
            ("A/C Type:", aircraft.aircraft_type()),
            ("Engine:", aircraft.engine()),
            ("Monitor:", aircraft.monitor()),
        ]),
        HeaderSet::new([
            ("Report Date:", report_date.format("%Y-%m-%d").to_string()),
            ("", subscription),
            (position_label, position),
        ]),
    ]
}

/// Draws the header sets side by side. Within a set the label column is as
/// wide as its widest label, and the three values share one fitted size.
/// A row without a label lets its value use the whole column.
pub fn header(
    surface: &mut PageSurface<'_>,
    top: Pt,
    sets: &[HeaderSet; 3],
    range: FontRange,
) -> Pt {
    let column_width = cm(HEADER_COLUMN_WIDTH);
    let row_height = cm(HEADER_ROW_HEIGHT);
    surface.set_text_color(Color::BLACK);

    for (index, set) in sets.iter().enumerate() {
        let left = cm(PAGE_LEFT) + column_width * (index as i32);
        surface.set_font(Weight::Bold, size(HEADER_LABEL_SIZE));
        let label_widths = set.rows.clone().map(|row| surface.string_width(&row.label));
        let offset = label_widths.iter().copied().fold(Pt::ZERO, Pt::max);
        let remaining = column_width - offset - cm(HEADER_MARGIN) - cm(HEADER_LABEL_GAP);
        let available = label_widths.map(|width| {
            if width == Pt::ZERO {
                column_width - cm(HEADER_MARGIN)
            } else {
                remaining
            }
        });

        for (row_index, row) in set.rows.iter().enumerate() {
            surface.set_xy(left, top + row_height * (row_index as i32));
            surface.cell(offset, Pt::ZERO, &row.label, Align::Left, false);
        }

        let (value_size, values) = {
            let fitter = surface.fitter(Weight::Regular);
            let value_size = fitter.uniform_font_size(
                set.rows
                    .iter()
                    .zip(available)
                    .map(|(row, width)| (row.value.as_str(), width)),
                range.min,
                range.max,
            );
            let values: Vec<String> = set
                .rows
                .iter()
                .zip(available)
                .map(|(row, width)| fitter.crop_text(&row.value, value_size, width, 1))
                .collect();
            (value_size, values)
        };

        surface.set_font(Weight::Regular, value_size);
        for (row_index, value) in values.iter().enumerate() {
            let indent = if label_widths[row_index] == Pt::ZERO {
                Pt::ZERO
            } else {
                offset + cm(HEADER_LABEL_GAP)
            };
            surface.set_xy(left + indent, top + row_height * (row_index as i32));
            surface.cell(available[row_index], Pt::ZERO, value, Align::Left, false);
        }
    }
    top + row_height * 3
}

pub fn heading_width(surface: &mut PageSurface<'_>, text: &str) -> Pt {
    surface.set_font(Weight::Bold, size(HEADING_SIZE));
    surface.string_width(text) + cm(0.2)
}

/// Inverted banner (white on black) sized to its text; returns the
/// vertical advance.
pub fn section_heading(surface: &mut PageSurface<'_>, x: Pt, top: Pt, text: &str) -> Pt {
    let width = heading_width(surface, text);
    surface.set_fill_color(Color::BLACK);
    surface.set_text_color(Color::WHITE);
    surface.set_xy(x, top);
    surface.cell(width, cm(HEADING_HEIGHT), text, Align::Left, true);
    cm(HEADING_ADVANCE)
}

/// Traffic-light chip right-aligned against `right`. The chip text shrinks
/// (down to a small floor) when it would be wider than `available`.
pub fn traffic_chip(
    surface: &mut PageSurface<'_>,
    right: Pt,
    top: Pt,
    available: Pt,
    assessment: &Assessment,
    area: FunctionalArea,
) {
    let status = assessment.status();
    let label = status.label(area.chip_variant());
    let padding = cm(CHIP_PADDING);
    let chip_size = surface.fitter(Weight::Bold).fit_font_size(
        &label,
        size(CHIP_MIN_SIZE),
        size(CHIP_SIZE),
        available - padding,
    );
    surface.set_font(Weight::Bold, chip_size);
    surface.set_text_color(Color::BLACK);
    surface.set_fill_color(status.fill());
    let width = surface.string_width(&label);
    surface.set_xy(right - width - padding, top);
    surface.cell(width + padding, cm(CHIP_HEIGHT), &label, Align::Center, true);
}

/// Area title banner plus its chip at the right edge of the box.
pub fn area_heading(
    surface: &mut PageSurface<'_>,
    x: Pt,
    right: Pt,
    top: Pt,
    area: FunctionalArea,
    assessment: &Assessment,
) -> Pt {
    let advance = section_heading(surface, x, top, area.title());
    let used = heading_width(surface, area.title());
    let available = right - x - used - cm(0.3);
    traffic_chip(surface, right, top, available, assessment, area);
    advance
}

/// Fit-and-crop of one free-text block into a column; returns the fixed
/// advance of the block regardless of how much text it held.
pub fn section_text(
    surface: &mut PageSurface<'_>,
    column: Column,
    top: Pt,
    text: &str,
    block: TextBlock,
    range: FontRange,
) -> Pt {
    let width = column.width_pt();
    let (font_size, cropped) = {
        let fitter = surface.fitter(Weight::Regular);
        let font_size =
            fitter.fit_font_size(text, range.min, range.max, width * (block.max_lines as i32));
        (font_size, fitter.crop_text(text, font_size, width, block.max_lines))
    };
    if font_size <= range.min && cropped.ends_with(ELLIPSIS) {
        tracing::warn!(
            chars = text.chars().count(),
            max_lines = block.max_lines,
            "text cropped at the minimum font size"
        );
    }
    let lines: Vec<&str> = cropped.lines().collect();
    surface.set_font(Weight::Regular, font_size);
    surface.set_text_color(Color::BLACK);
    surface.set_xy(column.x(), top);
    surface.multi_cell(width, cm(block.line_height), &lines, Align::Left, false);
    cm(block.advance)
}

/// Heading, chip and four label/value lines of one functional area. All
/// four values are drawn at one shared size: the smallest that lets every
/// value fit beside its label.
pub fn data_box(
    surface: &mut PageSurface<'_>,
    x: Pt,
    top: Pt,
    area: FunctionalArea,
    assessment: &Assessment,
    metrics: DataBoxMetrics,
    range: FontRange,
) {
    let box_width = cm(metrics.width);
    area_heading(surface, x, x + box_width, top, area, assessment);

    let labels = area.labels().map(|label| format!("{label}: "));
    surface.set_font(Weight::Bold, size(DATA_LABEL_SIZE));
    let label_widths = labels.clone().map(|label| surface.string_width(&label));
    let raw_values = assessment.observations.clone().map(|value| {
        if is_blank(&value) {
            String::new()
        } else {
            flatten(&value)
        }
    });

    let (value_size, values) = {
        let fitter = surface.fitter(Weight::Regular);
        let value_size = fitter.uniform_font_size(
            raw_values
                .iter()
                .zip(label_widths)
                .map(|(value, label)| (value.as_str(), box_width - label)),
            range.min,
            range.max,
        );
        let values: Vec<String> = raw_values
            .iter()
            .zip(label_widths)
            .map(|(value, label)| fitter.crop_text(value, value_size, box_width - label, 1))
            .collect();
        (value_size, values)
    };

    surface.set_text_color(Color::BLACK);
    let line_height = cm(metrics.line_height);
    for (index, (label, value)) in labels.iter().zip(&values).enumerate() {
        let y = top + cm(metrics.first_line + metrics.line_pitch * index as f32);
        surface.set_xy(x, y);
        surface.set_font(Weight::Bold, size(DATA_LABEL_SIZE));
        surface.cell(label_widths[index], line_height, label, Align::Left, false);
        surface.set_font(Weight::Regular, value_size);
        surface.cell(box_width - label_widths[index], line_height, value, Align::Left, false);
    }
}

/// The 2x3 grid of data boxes on a single-engine page, with a divider
/// between the pair and a rule under each row. Returns the new offset.
pub fn data_box_grid(
    surface: &mut PageSurface<'_>,
    top: Pt,
    record: &FlightReportRecord,
    range: FontRange,
) -> Pt {
    let metrics = DataBoxMetrics::FULL;
    let right_offset = cm(metrics.width + 1.0);
    let middle = surface.page_size().width / 2;
    let mut top = top;
    for pair in FunctionalArea::DATA_BOXES.chunks(2) {
        for (index, area) in pair.iter().enumerate() {
            let x = cm(PAGE_LEFT) + if index == 0 { Pt::ZERO } else { right_offset };
            data_box(surface, x, top, *area, record.assessment(*area), metrics, range);
        }
        surface.line(
            middle,
            top + cm(0.1),
            middle,
            top + cm(metrics.height - 0.5),
        );
        top += cm(metrics.height);
        rule(surface, Column::FULL, top - cm(0.2));
    }
    top
}

/// Six data boxes stacked in one half-width column of a twin page.
pub fn data_box_stack(
    surface: &mut PageSurface<'_>,
    column: Column,
    top: Pt,
    record: &FlightReportRecord,
    range: FontRange,
) -> Pt {
    let metrics = DataBoxMetrics {
        width: column.width,
        ..DataBoxMetrics::TWIN
    };
    let mut top = top;
    for area in FunctionalArea::DATA_BOXES {
        data_box(surface, column.x(), top, area, record.assessment(area), metrics, range);
        top += cm(metrics.height);
        rule(surface, column, top - cm(0.05));
    }
    top
}

/// The four GAMI columns of a single-engine page: three sweeps wrapped into
/// their box and the observations cropped to a fixed line count. Returns
/// the fixed row height.
pub fn sweep_row(surface: &mut PageSurface<'_>, top: Pt, assessment: &Assessment) -> Pt {
    let box_width = sweep_box_width();
    let margin = cm(SWEEP_MARGIN);
    let body_size = size(10);
    let line_height = cm(SWEEP_LINE_HEIGHT);
    let body_height = line_height * (OBSERVATION_LINES as i32);
    let labels = FunctionalArea::Gami.labels();

    for (index, label) in labels.iter().enumerate() {
        let x = cm(PAGE_LEFT) + (box_width + margin) * (index as i32);
        let last = index + 1 == labels.len();
        surface.set_text_color(Color::BLACK);
        surface.set_font(Weight::Bold, body_size);
        surface.set_xy(x, top);
        surface.cell(box_width, cm(SWEEP_TITLE_HEIGHT), label, Align::Left, false);

        let content = &assessment.observations[index];
        let lines = {
            let fitter = surface.fitter(Weight::Regular);
            if is_blank(content) {
                Vec::new()
            } else if last {
                fitter
                    .crop_text(&flatten(content), body_size, box_width, OBSERVATION_LINES)
                    .lines()
                    .map(str::to_string)
                    .collect()
            } else {
                fitter.wrap_text(content, body_size, box_width)
            }
        };

        let body_top = top + cm(SWEEP_TITLE_HEIGHT);
        surface.clipped(x, body_top, box_width, body_height, |surface| {
            surface.set_font(Weight::Regular, body_size);
            surface.set_xy(x, body_top);
            surface.multi_cell(box_width, line_height, &lines, Align::Left, false);
        });

        if !last {
            let rule_x = x + box_width + margin / 2;
            surface.line(rule_x, top, rule_x, top + cm(SWEEP_RULE_HEIGHT));
        }
    }
    cm(SWEEP_ROW_HEIGHT)
}

/// The GAMI sweeps of one twin column as a 2x2 grid of small cells.
/// Returns the grid height.
pub fn sweep_grid(
    surface: &mut PageSurface<'_>,
    column: Column,
    top: Pt,
    assessment: &Assessment,
) -> Pt {
    let gutter = cm(TWIN_SWEEP_GUTTER);
    let cell_width = (column.width_pt() - gutter) / 2;
    let line_height = cm(TWIN_SWEEP_LINE_HEIGHT);
    let title_height = cm(SWEEP_TITLE_HEIGHT);
    let body_height = line_height * (TWIN_SWEEP_LINES as i32);
    let row_height = title_height + body_height + cm(RULE_GAP);
    let body_size = size(TWIN_SWEEP_SIZE);
    let labels = FunctionalArea::Gami.labels();

    for (index, label) in labels.iter().enumerate() {
        let x = column.x() + (cell_width + gutter) * ((index % 2) as i32);
        let y = top + row_height * ((index / 2) as i32);
        surface.set_text_color(Color::BLACK);
        surface.set_font(Weight::Bold, body_size);
        surface.set_xy(x, y);
        surface.cell(cell_width, title_height, label, Align::Left, false);

        let content = &assessment.observations[index];
        let lines: Vec<String> = if is_blank(content) {
            Vec::new()
        } else {
            let fitter = surface.fitter(Weight::Regular);
            if index + 1 == labels.len() {
                fitter
                    .crop_text(&flatten(content), body_size, cell_width, TWIN_SWEEP_LINES)
                    .lines()
                    .map(str::to_string)
                    .collect()
            } else {
                fitter.wrap_text(content, body_size, cell_width)
            }
        };
        let body_top = y + title_height;
        surface.clipped(x, body_top, cell_width, body_height, |surface| {
            surface.set_font(Weight::Regular, body_size);
            surface.set_xy(x, body_top);
            surface.multi_cell(cell_width, line_height, &lines, Align::Left, false);
        });
    }

    let divider = column.x() + cell_width + gutter / 2;
    surface.line(divider, top, divider, top + row_height * 2 - cm(RULE_GAP));
    row_height * 2
}

/// Coloured bar naming the engine a twin column belongs to.
pub fn engine_banner(surface: &mut PageSurface<'_>, column: Column, top: Pt, label: &str) -> Pt {
    surface.set_fill_color(TITLE_BLUE);
    surface.set_text_color(Color::WHITE);
    surface.set_font(Weight::Bold, size(11));
    surface.set_xy(column.x(), top);
    surface.cell(
        column.width_pt(),
        cm(HEADING_HEIGHT),
        &format!("{label} Engine"),
        Align::Center,
        true,
    );
    cm(HEADING_ADVANCE)
}

/// Centred copyright line; returns the offset below it.
pub fn footer(surface: &mut PageSurface<'_>, top: Pt, year: i32) -> Pt {
    let height = cm(0.3);
    surface.set_font(Weight::Regular, size(FOOTER_SIZE));
    surface.set_text_color(Color::BLACK);
    surface.set_xy(cm(PAGE_LEFT), top);
    surface.cell(
        cm(CONTENT_WIDTH),
        height,
        &copyright_line(year),
        Align::Center,
        false,
    );
    top + height
}
