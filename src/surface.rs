use crate::canvas::{Canvas, Document, Page};
use crate::fit::TextFitter;
use crate::font::{FontRegistry, HELVETICA, HELVETICA_BOLD, TextMeasure};
use crate::types::{Color, Pt, Size, cm};

pub const PAGE_KIND_KEY: &str = "page.kind";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// The regular/bold pair every section draws with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFaces {
    pub regular: String,
    pub bold: String,
}

impl FontFaces {
    pub fn name(&self, weight: Weight) -> &str {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

impl Default for FontFaces {
    fn default() -> Self {
        Self {
            regular: HELVETICA.to_string(),
            bold: HELVETICA_BOLD.to_string(),
        }
    }
}

/// Stateful page-drawing session: cursor, current font and colours over a
/// recording [`Canvas`]. There is no automatic page break; callers compute
/// offsets and call [`PageSurface::add_page`] themselves.
pub struct PageSurface<'a> {
    canvas: Canvas,
    fonts: &'a FontRegistry,
    faces: FontFaces,
    page_open: bool,
    x: Pt,
    y: Pt,
    left_margin: Pt,
    right_margin: Pt,
    bottom_margin: Pt,
    cell_margin: Pt,
    weight: Weight,
    font_size: Pt,
    text_color: Color,
    fill_color: Color,
    draw_color: Color,
    line_width: Pt,
}

impl<'a> PageSurface<'a> {
    pub fn new(page_size: Size, fonts: &'a FontRegistry, faces: FontFaces) -> Self {
        Self {
            canvas: Canvas::new(page_size),
            fonts,
            faces,
            page_open: false,
            x: cm(1.0),
            y: cm(1.0),
            left_margin: cm(1.0),
            right_margin: cm(1.0),
            bottom_margin: cm(1.0),
            cell_margin: cm(0.1),
            weight: Weight::Regular,
            font_size: Pt::from_i32(12),
            text_color: Color::BLACK,
            fill_color: Color::BLACK,
            draw_color: Color::BLACK,
            line_width: cm(0.02),
        }
    }

    pub fn page_size(&self) -> Size {
        self.canvas.page_size()
    }

    pub fn fonts(&self) -> &'a FontRegistry {
        self.fonts
    }

    pub fn faces(&self) -> &FontFaces {
        &self.faces
    }

    /// Closes the current page (if any) and starts a new one tagged `kind`.
    pub fn add_page(&mut self, kind: &str) {
        if self.page_open {
            self.canvas.show_page();
        }
        self.page_open = true;
        self.canvas.meta(PAGE_KIND_KEY, kind);
        self.x = self.left_margin;
        self.y = self.left_margin;
    }

    /// Attaches non-rendered metadata to the current page.
    pub fn tag(&mut self, key: &str, value: impl Into<String>) {
        self.canvas.meta(key, value);
    }

    pub fn page_count(&self) -> usize {
        self.canvas.page_count() + usize::from(self.page_open)
    }

    pub fn current_page(&self) -> &Page {
        self.canvas.current_page()
    }

    pub fn set_margins(&mut self, left: Pt, right: Pt, bottom: Pt) {
        self.left_margin = left;
        self.right_margin = right;
        self.bottom_margin = bottom;
    }

    pub fn left_margin(&self) -> Pt {
        self.left_margin
    }

    pub fn right_edge(&self) -> Pt {
        self.page_size().width - self.right_margin
    }

    /// Lowest y at which content may still start.
    pub fn printable_bottom(&self) -> Pt {
        self.page_size().height - self.bottom_margin
    }

    pub fn set_xy(&mut self, x: Pt, y: Pt) {
        self.x = x;
        self.y = y;
    }

    pub fn x(&self) -> Pt {
        self.x
    }

    pub fn y(&self) -> Pt {
        self.y
    }

    pub fn set_font(&mut self, weight: Weight, size: Pt) {
        self.weight = weight;
        self.font_size = size;
    }

    pub fn set_font_size(&mut self, size: Pt) {
        self.font_size = size;
    }

    pub fn font_size(&self) -> Pt {
        self.font_size
    }

    pub fn set_text_color(&mut self, color: Color) {
        self.text_color = color;
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.fill_color = color;
    }

    pub fn set_draw_color(&mut self, color: Color) {
        self.draw_color = color;
    }

    pub fn font_name(&self, weight: Weight) -> &str {
        self.faces.name(weight)
    }

    /// Width of `text` in the current font and size.
    pub fn string_width(&self, text: &str) -> Pt {
        self.fonts
            .text_width(self.faces.name(self.weight), self.font_size, text)
    }

    /// A fitter measuring with the face of the given weight.
    pub fn fitter(&self, weight: Weight) -> TextFitter<'_> {
        TextFitter::new(self.fonts, self.faces.name(weight))
    }

    /// Single-line text in a `width` x `height` box at the cursor, optionally
    /// filled with the fill colour. The cursor moves to the right of the box.
    pub fn cell(&mut self, width: Pt, height: Pt, text: &str, align: Align, fill: bool) {
        if fill {
            self.canvas.set_fill_color(self.fill_color);
            self.canvas.fill_rect(self.x, self.y, width, height);
        }
        if !text.is_empty() {
            let text_width = self.string_width(text);
            let text_x = match align {
                Align::Left => self.x + self.cell_margin,
                Align::Center => self.x + (width - text_width) / 2,
                Align::Right => self.x + width - self.cell_margin - text_width,
            };
            self.draw_text(text_x, self.y, height, text);
        }
        self.x += width;
    }

    /// Pre-wrapped lines stacked `line_height` apart in a `width` column.
    /// Returns the height used; the cursor moves to the left margin below it.
    pub fn multi_cell<S: AsRef<str>>(
        &mut self,
        width: Pt,
        line_height: Pt,
        lines: &[S],
        align: Align,
        border: bool,
    ) -> Pt {
        let left = self.x;
        let top = self.y;
        for line in lines {
            self.x = left;
            self.cell(width, line_height, line.as_ref(), align, false);
            self.y += line_height;
        }
        let used = line_height * (lines.len() as i32);
        if border {
            self.apply_stroke();
            self.canvas.stroke_rect(left, top, width, used);
        }
        self.x = self.left_margin;
        used
    }

    /// Flowing text starting at the cursor, wrapping at the right margin and
    /// continuing at the left margin, like a typewriter.
    pub fn write(&mut self, line_height: Pt, text: &str) {
        let right = self.right_edge();
        for (index, paragraph) in text.split('\n').enumerate() {
            if index > 0 {
                self.ln(line_height);
            }
            let mut segment = String::new();
            for word in paragraph.split(' ') {
                let piece = if segment.is_empty() {
                    word.to_string()
                } else {
                    format!(" {word}")
                };
                let candidate = format!("{segment}{piece}");
                let at_line_start = segment.is_empty() && self.x <= self.left_margin;
                if self.x + self.string_width(&candidate) > right && !at_line_start {
                    self.flush_segment(&segment, line_height);
                    self.ln(line_height);
                    segment = word.to_string();
                } else {
                    segment = candidate;
                }
            }
            self.flush_segment(&segment, line_height);
        }
    }

    fn flush_segment(&mut self, segment: &str, line_height: Pt) {
        if segment.is_empty() {
            return;
        }
        let width = self.string_width(segment);
        self.draw_text(self.x, self.y, line_height, segment);
        self.x += width;
    }

    /// Carriage return to the left margin and down by `height`.
    pub fn ln(&mut self, height: Pt) {
        self.x = self.left_margin;
        self.y += height;
    }

    pub fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.apply_stroke();
        self.canvas.move_to(x1, y1);
        self.canvas.line_to(x2, y2);
        self.canvas.stroke();
    }

    pub fn image(&mut self, resource_id: &str, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.canvas.draw_image(x, y, width, height, resource_id);
    }

    /// Runs `draw` with output clipped to the given rectangle.
    pub fn clipped<F>(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, draw: F)
    where
        F: FnOnce(&mut Self),
    {
        self.canvas.save_state();
        self.canvas.clip_rect(x, y, width, height);
        draw(self);
        self.canvas.restore_state();
    }

    pub fn finish(self) -> Document {
        self.canvas.finish()
    }

    fn apply_stroke(&mut self) {
        self.canvas.set_stroke_color(self.draw_color);
        self.canvas.set_line_width(self.line_width);
    }

    // Vertically centres one line of text in a box of `height` at `top`.
    fn draw_text(&mut self, x: Pt, top: Pt, height: Pt, text: &str) {
        let name = self.faces.name(self.weight).to_string();
        self.canvas.set_font_name(&name);
        self.canvas.set_font_size(self.font_size);
        self.canvas.set_fill_color(self.text_color);
        let baseline = top + height / 2 + self.font_size * 0.3;
        self.canvas.draw_string(x, baseline - self.font_size, text);
    }
}
