//! Page grid of the analysis report, authored in centimetres on US Letter.

use crate::types::{Pt, cm};

pub const PAGE_LEFT: f32 = 1.0;
pub const CONTENT_WIDTH: f32 = 19.59;
/// Bottom edge nothing may be drawn below.
pub const PRINTABLE_BOTTOM: f32 = 27.94 - 0.5;

pub const TITLE_RULE: f32 = 2.2;
pub const HEADER_GAP: f32 = 0.4;
pub const HEADER_COLUMN_WIDTH: f32 = 6.53;
pub const HEADER_ROW_HEIGHT: f32 = 0.5;
pub const HEADER_MARGIN: f32 = 0.5;
pub const HEADER_LABEL_GAP: f32 = 0.2;
pub const HEADER_LABEL_SIZE: i32 = 12;

pub const HEADING_HEIGHT: f32 = 0.5;
pub const HEADING_ADVANCE: f32 = 0.6;
pub const TEXT_LINE_HEIGHT: f32 = 0.38;
pub const RULE_GAP: f32 = 0.1;

pub const CHIP_HEIGHT: f32 = 0.5;
pub const CHIP_PADDING: f32 = 0.5;

/// Fixed height of the full-width GAMI row below its heading.
pub const SWEEP_ROW_HEIGHT: f32 = 4.0;
pub const SWEEP_RULE_HEIGHT: f32 = 3.5;
pub const SWEEP_MARGIN: f32 = 1.0;
pub const SWEEP_TITLE_HEIGHT: f32 = 0.3;
pub const SWEEP_LINE_HEIGHT: f32 = 0.4;
pub const OBSERVATION_LINES: usize = 9;

pub const DATA_BOX_WIDTH: f32 = (21.59 - 3.0) / 2.0;
pub const DATA_LABEL_SIZE: i32 = 8;
pub const FOOTER_GAP: f32 = 1.0;
pub const FOOTER_SIZE: i32 = 8;

pub fn sweep_box_width() -> Pt {
    cm((CONTENT_WIDTH - SWEEP_MARGIN * 3.0) / 4.0)
}

/// Inclusive font-size range used by every fit on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontRange {
    pub min: Pt,
    pub max: Pt,
}

impl FontRange {
    pub fn new(min: Pt, max: Pt) -> Self {
        Self { min, max }
    }

    /// Same floor, but never above `max`.
    pub fn capped(self, max: Pt) -> Self {
        let max = self.max.min(max);
        Self {
            min: self.min.min(max),
            max,
        }
    }
}

impl Default for FontRange {
    fn default() -> Self {
        Self::new(Pt::from_i32(8), Pt::from_i32(12))
    }
}

/// Vertical rhythm of one paired data box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataBoxMetrics {
    pub width: f32,
    pub height: f32,
    pub first_line: f32,
    pub line_pitch: f32,
    pub line_height: f32,
}

impl DataBoxMetrics {
    pub const FULL: DataBoxMetrics = DataBoxMetrics {
        width: DATA_BOX_WIDTH,
        height: 2.8,
        first_line: 0.7,
        line_pitch: 0.45,
        line_height: 0.4,
    };

    pub const TWIN: DataBoxMetrics = DataBoxMetrics {
        width: DATA_BOX_WIDTH,
        height: 2.2,
        first_line: 0.6,
        line_pitch: 0.38,
        line_height: 0.35,
    };
}

/// A vertical strip of the page that one engine's sections are drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub left: f32,
    pub width: f32,
}

impl Column {
    pub const FULL: Column = Column {
        left: PAGE_LEFT,
        width: CONTENT_WIDTH,
    };

    pub const TWIN_GUTTER: f32 = 1.0;

    pub const TWIN_LEFT: Column = Column {
        left: PAGE_LEFT,
        width: DATA_BOX_WIDTH,
    };

    pub const TWIN_RIGHT: Column = Column {
        left: PAGE_LEFT + DATA_BOX_WIDTH + Column::TWIN_GUTTER,
        width: DATA_BOX_WIDTH,
    };

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn x(&self) -> Pt {
        cm(self.left)
    }

    pub fn width_pt(&self) -> Pt {
        cm(self.width)
    }

    pub fn right_pt(&self) -> Pt {
        cm(self.right())
    }
}

/// How many lines of free text a section keeps, and how tall it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBlock {
    pub max_lines: usize,
    pub line_height: f32,
    pub advance: f32,
}

impl TextBlock {
    pub const FULL: TextBlock = TextBlock {
        max_lines: 5,
        line_height: TEXT_LINE_HEIGHT,
        advance: 2.0,
    };

    pub const TWIN: TextBlock = TextBlock {
        max_lines: 3,
        line_height: TEXT_LINE_HEIGHT,
        advance: 1.3,
    };
}
