use lopdf::Document as LoDocument;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectErrorCode {
    ParseFailed,
    NoPages,
    Io,
}

impl InspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectErrorCode::ParseFailed => "PDF_PARSE_FAILED",
            InspectErrorCode::NoPages => "PDF_EMPTY_OR_NO_PAGES",
            InspectErrorCode::Io => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .code.as_str())]
pub struct InspectError {
    pub code: InspectErrorCode,
    pub message: String,
}

/// What a rendered report looks like to a PDF reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    pub title: Option<String>,
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<InspectReport, InspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| InspectError {
        code: InspectErrorCode::ParseFailed,
        message: err.to_string(),
    })?;

    let page_count = pdf.get_pages().len();
    if page_count == 0 {
        return Err(InspectError {
            code: InspectErrorCode::NoPages,
            message: "pdf has no pages".to_string(),
        });
    }

    Ok(InspectReport {
        pdf_version: pdf.version.clone(),
        page_count,
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        title: info_title(&pdf),
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<InspectReport, InspectError> {
    let data = std::fs::read(path).map_err(|err| InspectError {
        code: InspectErrorCode::Io,
        message: format!("{}: {err}", path.display()),
    })?;
    inspect_pdf_bytes(&data)
}

fn info_title(pdf: &LoDocument) -> Option<String> {
    let info = pdf.trailer.get(b"Info").ok()?;
    let dict = pdf.dereference(info).ok()?.1.as_dict().ok()?;
    let title = dict.get(b"Title").ok()?.as_str().ok()?;
    Some(String::from_utf8_lossy(title).into_owned())
}
