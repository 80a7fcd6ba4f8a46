use crate::canvas::{Command, Page};
use crate::surface::PAGE_KIND_KEY;

/// Meta key carrying the id of the record drawn on a page; twin pages carry
/// one entry per engine.
pub const RECORD_ID_KEY: &str = "record.id";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub kind: Option<String>,
    pub record_ids: Vec<String>,
    pub command_count: usize,
    pub content_bytes: usize,
}

impl PageMetrics {
    pub(crate) fn from_page(page_number: usize, page: &Page, content_bytes: usize) -> Self {
        let record_ids = page
            .commands
            .iter()
            .filter_map(|command| match command {
                Command::Meta { key, value } if key == RECORD_ID_KEY => Some(value.clone()),
                _ => None,
            })
            .collect();
        Self {
            page_number,
            kind: page.meta(PAGE_KIND_KEY).map(str::to_string),
            record_ids,
            command_count: page.commands.len(),
            content_bytes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_render_ms: f64,
    pub total_bytes: usize,
}

impl DocumentMetrics {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages of a given kind, in document order.
    pub fn pages_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a PageMetrics> {
        self.pages
            .iter()
            .filter(move |page| page.kind.as_deref() == Some(kind))
    }
}
