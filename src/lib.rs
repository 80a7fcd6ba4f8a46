mod assembler;
mod assets;
mod canvas;
mod error;
mod explanation;
mod fit;
mod font;
mod inspect;
mod layout;
mod metrics;
mod pdf;
mod record;
mod sections;
mod surface;
mod types;

pub use assembler::{
    PlanStep, ReportContext, SINGLE_KIND, TWIN_KIND, assemble, attachment_filename, plan,
};
pub use assets::{Asset, AssetBundle, AssetKind};
pub use canvas::{Canvas, Command, Document, Page};
pub use error::{ReportError, Result};
pub use explanation::{ADDITIONAL_KIND, ADDITIONAL_TITLE, EXPLANATION_KIND};
pub use fit::{ELLIPSIS, TextFitter};
pub use font::{FontRegistry, HELVETICA, HELVETICA_BOLD, TextMeasure};
pub use inspect::{InspectError, InspectErrorCode, InspectReport, inspect_pdf_bytes, inspect_pdf_path};
pub use layout::FontRange;
pub use metrics::{DocumentMetrics, PageMetrics, RECORD_ID_KEY};
pub use pdf::{DEFAULT_TITLE, PdfOptions, document_to_pdf};
pub use record::{
    AircraftSummary, Assessment, ChipVariant, EnginePosition, FlightReportRecord, FlightSummary,
    FunctionalArea, ReportRenderRequest, Status, is_blank,
};
pub use surface::{Align, FontFaces, PAGE_KIND_KEY, PageSurface, Weight};
pub use types::{Color, Pt, Rect, Size, cm};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sections::LOGO_RESOURCE;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_CLIENT_LABEL: &str = "SavvyMx client";

/// Renders report requests into PDF bytes. Fonts and the logo are loaded
/// once when the renderer is built; each render starts from a fresh page
/// surface and shares nothing with other renders.
pub struct ReportRenderer {
    page_size: Size,
    font_registry: Arc<FontRegistry>,
    faces: FontFaces,
    assets: AssetBundle,
    has_logo: bool,
    range: FontRange,
    report_date: Option<NaiveDate>,
    fallback_label: String,
    pdf_options: PdfOptions,
}

/// The rendered document plus what an HTTP layer needs to serve it.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub page_count: usize,
    pub metrics: DocumentMetrics,
}

impl RenderedReport {
    pub fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    /// `attachment; filename="..."` when the request asked for a download.
    pub fn content_disposition(&self) -> Option<String> {
        self.filename
            .as_ref()
            .map(|name| format!("attachment; filename=\"{name}\""))
    }
}

impl ReportRenderer {
    pub fn builder() -> ReportRendererBuilder {
        ReportRendererBuilder::new()
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.font_registry
    }

    pub fn render(&self, request: &ReportRenderRequest) -> Result<RenderedReport> {
        let started = Instant::now();
        let report_date = self
            .report_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let context = ReportContext {
            logo: self.has_logo.then_some(LOGO_RESOURCE),
            report_date,
            year: report_date.year(),
            fallback_label: &self.fallback_label,
            range: self.range,
            ticket_body: request.ticket_body.as_deref(),
        };

        let mut surface = PageSurface::new(self.page_size, &self.font_registry, self.faces.clone());
        let steps = assemble(&mut surface, &request.records, &context)?;
        let document = surface.finish();

        let mut metrics = DocumentMetrics::default();
        let bytes = document_to_pdf(
            &document,
            &self.font_registry,
            &self.assets,
            &self.pdf_options,
            Some(&mut metrics),
        )?;
        metrics.total_render_ms = started.elapsed().as_secs_f64() * 1000.0;

        let filename = request
            .attachment
            .then(|| attachment_filename(&request.records, report_date));
        tracing::info!(
            records = request.records.len(),
            skipped = steps
                .iter()
                .filter(|step| matches!(step, PlanStep::Skip { .. }))
                .count(),
            pages = document.pages.len(),
            bytes = bytes.len(),
            render_ms = metrics.total_render_ms,
            "rendered report"
        );
        Ok(RenderedReport {
            page_count: document.pages.len(),
            bytes,
            filename,
            metrics,
        })
    }

    /// Convenience for callers that hand over the request as JSON.
    pub fn render_json(&self, json: &str) -> Result<RenderedReport> {
        self.render(&ReportRenderRequest::from_json(json)?)
    }
}

pub struct ReportRendererBuilder {
    page_size: Size,
    regular_font_file: Option<PathBuf>,
    bold_font_file: Option<PathBuf>,
    logo_file: Option<PathBuf>,
    logo_bytes: Option<Vec<u8>>,
    min_font_size: f32,
    max_font_size: f32,
    report_date: Option<NaiveDate>,
    fallback_label: String,
    pdf_options: PdfOptions,
}

impl Default for ReportRendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRendererBuilder {
    pub fn new() -> Self {
        let range = FontRange::default();
        Self {
            page_size: Size::letter(),
            regular_font_file: None,
            bold_font_file: None,
            logo_file: None,
            logo_bytes: None,
            min_font_size: range.min.to_f32(),
            max_font_size: range.max.to_f32(),
            report_date: None,
            fallback_label: DEFAULT_CLIENT_LABEL.to_string(),
            pdf_options: PdfOptions::default(),
        }
    }

    // The page grid is authored for US Letter.
    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    // TrueType face replacing Helvetica; embedded in the output.
    pub fn regular_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.regular_font_file = Some(path.into());
        self
    }

    pub fn bold_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.bold_font_file = Some(path.into());
        self
    }

    pub fn logo_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_file = Some(path.into());
        self.logo_bytes = None;
        self
    }

    // PNG or JPEG bytes; takes precedence over an earlier logo_file.
    pub fn logo_bytes(mut self, data: Vec<u8>) -> Self {
        self.logo_bytes = Some(data);
        self.logo_file = None;
        self
    }

    // Floor for every fitted value; text that still overflows is cropped.
    pub fn min_font_size(mut self, points: f32) -> Self {
        self.min_font_size = points;
        self
    }

    pub fn max_font_size(mut self, points: f32) -> Self {
        self.max_font_size = points;
        self
    }

    // Fixes the header date, filename date and copyright year.
    pub fn report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = Some(date);
        self
    }

    pub fn creation_date(mut self, created: DateTime<Utc>) -> Self {
        self.pdf_options.creation_date = Some(created);
        self
    }

    pub fn compress_streams(mut self, enabled: bool) -> Self {
        self.pdf_options.compress_streams = enabled;
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.pdf_options.document_title = Some(title.into());
        self
    }

    // Shown in the header when the aircraft has no subscription end date.
    pub fn client_fallback_label(mut self, label: impl Into<String>) -> Self {
        self.fallback_label = label.into();
        self
    }

    pub fn build(self) -> Result<ReportRenderer> {
        let (min, max) = (self.min_font_size, self.max_font_size);
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || max <= 0.0 {
            return Err(ReportError::InvalidConfiguration(format!(
                "font sizes must be positive (min {min}, max {max})"
            )));
        }
        if min > max {
            return Err(ReportError::InvalidConfiguration(format!(
                "min_font_size {min} is larger than max_font_size {max}"
            )));
        }
        if self.page_size.width <= Pt::ZERO || self.page_size.height <= Pt::ZERO {
            return Err(ReportError::InvalidConfiguration(
                "page size must be positive".to_string(),
            ));
        }

        let mut registry = FontRegistry::new();
        let mut faces = FontFaces::default();
        if let Some(path) = &self.regular_font_file {
            faces.regular = registry.register_file(path)?;
        }
        if let Some(path) = &self.bold_font_file {
            faces.bold = registry.register_file(path)?;
        }

        let logo = match (self.logo_bytes, &self.logo_file) {
            (Some(data), _) => Some(Asset::new(LOGO_RESOURCE, AssetKind::Image, data)),
            (None, Some(path)) => Some(Asset::from_file(LOGO_RESOURCE, AssetKind::Image, path)?),
            (None, None) => None,
        };
        let mut assets = AssetBundle::default();
        let has_logo = logo.is_some();
        if let Some(logo) = logo {
            // Decode once up front so a broken logo fails here, not mid-render.
            assets::decode_image(&logo)?;
            assets.add(logo);
        }

        Ok(ReportRenderer {
            page_size: self.page_size,
            font_registry: Arc::new(registry),
            faces,
            assets,
            has_logo,
            range: FontRange::new(Pt::from_f32(min), Pt::from_f32(max)),
            report_date: self.report_date,
            fallback_label: self.fallback_label,
            pdf_options: self.pdf_options,
        })
    }
}
