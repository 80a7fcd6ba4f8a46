//! Turns an ordered list of records into pages.
//!
//! The assembler first builds a plan, one step per record (or per twin
//! pair), and then walks it against a [`PageSurface`]. Every page threads an
//! explicit running `top` offset through the section functions.

use crate::error::{ReportError, Result};
use crate::explanation::{additional_page, explanation_page};
use crate::layout::{
    Column, FOOTER_GAP, FontRange, HEADER_GAP, PRINTABLE_BOTTOM, RULE_GAP, TextBlock,
};
use crate::metrics::RECORD_ID_KEY;
use crate::record::{EnginePosition, FlightReportRecord, FunctionalArea};
use crate::sections::{
    area_heading, data_box_grid, data_box_stack, engine_banner, flatten, footer, header,
    header_sets, rule, section_heading, section_text, sweep_grid, sweep_row, title_block,
};
use crate::surface::PageSurface;
use crate::types::{Pt, cm};
use chrono::NaiveDate;
use std::collections::HashSet;

pub const SINGLE_KIND: &str = "report";
pub const TWIN_KIND: &str = "twin";

const NOT_AVAILABLE: &str = "N/A";
const TWIN_POSITION: &str = "Left / Right";
const TWIN_FOOTER_GAP: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    /// Record id that carried no content.
    Skip { record: u64 },
    RenderPage { index: usize },
    RenderTwinPage { left: usize, right: usize },
    RenderAdditionalPage { index: usize },
    Explanation,
}

/// Everything a page needs besides the record itself.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub logo: Option<&'a str>,
    pub report_date: NaiveDate,
    pub year: i32,
    pub fallback_label: &'a str,
    pub range: FontRange,
    /// Replaces the client comments of every record when present.
    pub ticket_body: Option<&'a str>,
}

fn is_sister(a: &FlightReportRecord, b: &FlightReportRecord) -> bool {
    a.sister_report == Some(b.id) || b.sister_report == Some(a.id)
}

/// Decides what each record turns into. Twin pairs are placed where the
/// first of the two appears, left engine first; the explanation page is
/// always the last step.
pub fn plan(records: &[FlightReportRecord]) -> Vec<PlanStep> {
    let mut steps = Vec::new();
    let mut consumed = vec![false; records.len()];

    for index in 0..records.len() {
        if consumed[index] {
            continue;
        }
        consumed[index] = true;
        let record = &records[index];

        let sister = (index + 1..records.len())
            .find(|&other| !consumed[other] && is_sister(record, &records[other]));
        match sister {
            Some(other) => {
                consumed[other] = true;
                let (left, right) = if records[other].engine == EnginePosition::Left
                    && record.engine != EnginePosition::Left
                {
                    (other, index)
                } else {
                    (index, other)
                };
                if records[left].is_empty() && records[right].is_empty() {
                    steps.push(PlanStep::Skip {
                        record: records[left].id,
                    });
                    steps.push(PlanStep::Skip {
                        record: records[right].id,
                    });
                    continue;
                }
                steps.push(PlanStep::RenderTwinPage { left, right });
                for side in [left, right] {
                    if records[side].has_additional() {
                        steps.push(PlanStep::RenderAdditionalPage { index: side });
                    }
                }
            }
            None => {
                if record.is_empty() {
                    steps.push(PlanStep::Skip { record: record.id });
                    continue;
                }
                steps.push(PlanStep::RenderPage { index });
                if record.has_additional() {
                    steps.push(PlanStep::RenderAdditionalPage { index });
                }
            }
        }
    }

    steps.push(PlanStep::Explanation);
    steps
}

/// Draws every planned page onto `surface` and returns the plan that was
/// executed.
pub fn assemble(
    surface: &mut PageSurface<'_>,
    records: &[FlightReportRecord],
    context: &ReportContext<'_>,
) -> Result<Vec<PlanStep>> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id) {
            return Err(ReportError::Render(format!(
                "record {} appears more than once",
                record.id
            )));
        }
    }

    let steps = plan(records);
    for step in &steps {
        match *step {
            PlanStep::Skip { record } => {
                tracing::debug!(record, "skipping empty record");
            }
            PlanStep::RenderPage { index } => {
                let record = &records[index];
                tracing::debug!(record = record.id, "rendering report page");
                render_single(surface, record, context);
            }
            PlanStep::RenderTwinPage { left, right } => {
                tracing::debug!(
                    left = records[left].id,
                    right = records[right].id,
                    "rendering twin page"
                );
                render_twin(surface, &records[left], &records[right], context);
            }
            PlanStep::RenderAdditionalPage { index } => {
                let record = &records[index];
                tracing::debug!(record = record.id, "rendering additional remarks");
                additional_page(surface, context.logo, &record.additional, context.range);
                surface.tag(RECORD_ID_KEY, record.id.to_string());
            }
            PlanStep::Explanation => {
                explanation_page(surface, context.logo, context.year);
            }
        }
    }
    Ok(steps)
}

fn comments_for(context: &ReportContext<'_>, records: &[&FlightReportRecord]) -> String {
    if let Some(body) = context.ticket_body {
        return flatten(body);
    }
    records
        .iter()
        .find_map(|record| record.client_comments.as_deref())
        .map(flatten)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Title, header and client comments shared by both page layouts; returns
/// the offset below the comments rule.
fn page_top(
    surface: &mut PageSurface<'_>,
    record: &FlightReportRecord,
    context: &ReportContext<'_>,
    engine_position: Option<&str>,
    comments: &str,
    block: TextBlock,
) -> Pt {
    let top = title_block(surface, context.logo);
    let sets = header_sets(
        record,
        context.report_date,
        context.fallback_label,
        engine_position,
    );
    let mut top = header(surface, top + cm(HEADER_GAP), &sets, context.range);
    rule(surface, Column::FULL, top);
    top += section_heading(surface, Column::FULL.x(), top, "Client Comments");
    top += section_text(surface, Column::FULL, top, comments, block, context.range);
    rule(surface, Column::FULL, top);
    top + cm(RULE_GAP)
}

/// One full-width page for a single record.
pub fn render_single(
    surface: &mut PageSurface<'_>,
    record: &FlightReportRecord,
    context: &ReportContext<'_>,
) {
    let column = Column::FULL;
    let block = TextBlock::FULL;
    let range = context.range;
    surface.add_page(SINGLE_KIND);
    surface.tag(RECORD_ID_KEY, record.id.to_string());

    // An orphaned twin record still says which engine it describes.
    let position = record.engine.is_twin().then(|| record.engine.label());
    let comments = comments_for(context, &[record]);
    let mut top = page_top(surface, record, context, position, &comments, block);

    top += section_heading(surface, column.x(), top, "Summary of Findings");
    top += section_text(surface, column, top, &flatten(&record.findings), block, range);
    rule(surface, column, top);
    top += cm(RULE_GAP);

    let gami = record.assessment(FunctionalArea::Gami);
    top += area_heading(
        surface,
        column.x(),
        column.right_pt(),
        top,
        FunctionalArea::Gami,
        gami,
    );
    top += sweep_row(surface, top, gami);
    rule(surface, column, top);
    top += cm(RULE_GAP);

    top = data_box_grid(surface, top, record, range);

    top += section_heading(surface, column.x(), top, "Recommendations:");
    top += section_text(
        surface,
        column,
        top,
        &flatten(&record.recommendations),
        block,
        range,
    );
    footer(surface, top + cm(FOOTER_GAP), context.year);
}

/// Both engines of a pair on one page: shared header and comments, then a
/// half-width column per engine.
pub fn render_twin(
    surface: &mut PageSurface<'_>,
    left: &FlightReportRecord,
    right: &FlightReportRecord,
    context: &ReportContext<'_>,
) {
    surface.add_page(TWIN_KIND);
    surface.tag(RECORD_ID_KEY, left.id.to_string());
    surface.tag(RECORD_ID_KEY, right.id.to_string());

    let comments = comments_for(context, &[left, right]);
    let top = page_top(
        surface,
        left,
        context,
        Some(TWIN_POSITION),
        &comments,
        TextBlock::TWIN,
    );

    let left_bottom = engine_column(surface, Column::TWIN_LEFT, top, left, "Left", context);
    let right_bottom = engine_column(surface, Column::TWIN_RIGHT, top, right, "Right", context);
    let bottom = left_bottom.max(right_bottom);

    let divider = cm(Column::TWIN_LEFT.right() + Column::TWIN_GUTTER / 2.0);
    surface.line(divider, top, divider, bottom);
    let end = footer(surface, bottom + cm(TWIN_FOOTER_GAP), context.year);
    if end > cm(PRINTABLE_BOTTOM) {
        tracing::warn!(bottom = end.to_cm(), "twin page runs past the printable area");
    }
}

fn engine_column(
    surface: &mut PageSurface<'_>,
    column: Column,
    top: Pt,
    record: &FlightReportRecord,
    fallback: &str,
    context: &ReportContext<'_>,
) -> Pt {
    let block = TextBlock::TWIN;
    let range = context.range;
    let label = match record.engine.label() {
        "" => fallback,
        label => label,
    };

    let mut top = top + engine_banner(surface, column, top, label);
    top += section_heading(surface, column.x(), top, "Summary of Findings");
    top += section_text(surface, column, top, &flatten(&record.findings), block, range);
    rule(surface, column, top);
    top += cm(RULE_GAP);

    let gami = record.assessment(FunctionalArea::Gami);
    top += area_heading(
        surface,
        column.x(),
        column.right_pt(),
        top,
        FunctionalArea::Gami,
        gami,
    );
    top += sweep_grid(surface, column, top, gami);
    rule(surface, column, top);
    top += cm(RULE_GAP);

    top = data_box_stack(surface, column, top, record, range);

    top += section_heading(surface, column.x(), top, "Recommendations:");
    top + section_text(
        surface,
        column,
        top,
        &flatten(&record.recommendations),
        block,
        range,
    )
}

/// `"<date> <first> <last> <registration>.pdf"` for the first record,
/// restricted to printable ASCII: quotes are dropped and anything else
/// outside the range becomes `X`.
pub fn attachment_filename(records: &[FlightReportRecord], date: NaiveDate) -> String {
    let date = date.format("%Y-%m-%d");
    let raw = match records.first() {
        Some(record) => {
            let aircraft = record.aircraft();
            format!(
                "{date} {} {} {}.pdf",
                aircraft.owner_first_name.trim(),
                aircraft.owner_last_name.trim(),
                aircraft.registration
            )
        }
        None => format!("{date} report.pdf"),
    };
    raw.chars()
        .filter(|ch| *ch != '"')
        .map(|ch| {
            if ch == '?' || !(' '..='~').contains(&ch) {
                'X'
            } else {
                ch
            }
        })
        .collect()
}
