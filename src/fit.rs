//! Font-size search and wrap/crop of user-authored text into fixed boxes.
//!
//! Every box on the report has a fixed width and a fixed line budget while the
//! text typed into it is unbounded. [`TextFitter::fit_font_size`] finds the
//! largest legible size, and [`TextFitter::crop_text`] wraps at that size and
//! ellipsizes whatever still does not fit.

use crate::font::TextMeasure;
use crate::types::{Pt, cm};

pub const ELLIPSIS: &str = "...";

/// Sizes are searched in whole points.
const SIZE_STEP: i32 = 1;

pub struct TextFitter<'a> {
    measure: &'a dyn TextMeasure,
    font: &'a str,
    slack: Pt,
}

impl<'a> TextFitter<'a> {
    pub fn new(measure: &'a dyn TextMeasure, font: &'a str) -> Self {
        Self {
            measure,
            font,
            slack: cm(0.2),
        }
    }

    /// Breathing room kept free at the right edge of every wrapped line.
    pub fn with_slack(mut self, slack: Pt) -> Self {
        self.slack = slack.max(Pt::ZERO);
        self
    }

    pub fn font(&self) -> &str {
        self.font
    }

    pub fn width(&self, text: &str, size: Pt) -> Pt {
        self.measure.text_width(self.font, size, text)
    }

    /// Largest size in `min..=max` (whole-point steps, searched downward) at
    /// which `text` is no wider than `width`; `min` when nothing fits.
    pub fn fit_font_size(&self, text: &str, min: Pt, max: Pt, width: Pt) -> Pt {
        let max = max.max(min);
        if text.is_empty() {
            return max;
        }
        let step = Pt::from_i32(SIZE_STEP);
        let mut size = max;
        loop {
            if self.width(text, size) <= width {
                tracing::trace!(size = size.to_f32(), "font fit");
                return size;
            }
            if size <= min {
                return min;
            }
            size = (size - step).max(min);
        }
    }

    /// The size every item can share: the smallest of the per-item fits.
    pub fn uniform_font_size<'t>(
        &self,
        items: impl IntoIterator<Item = (&'t str, Pt)>,
        min: Pt,
        max: Pt,
    ) -> Pt {
        items
            .into_iter()
            .map(|(text, width)| self.fit_font_size(text, min, max, width))
            .fold(max.max(min), Pt::min)
    }

    /// Greedily packs whitespace-separated words into at most `max_lines`
    /// lines of `line_width`. Overflow is folded into the last line, which is
    /// then shortened and terminated with [`ELLIPSIS`] until it fits.
    pub fn crop_text(&self, text: &str, size: Pt, line_width: Pt, max_lines: usize) -> String {
        if max_lines == 0 {
            return String::new();
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        let budget = line_width - self.slack;
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut used = Pt::ZERO;
        let mut index = 0;

        while index < words.len() && lines.len() < max_lines {
            let word = words[index];
            let advance = self.width(&format!("{word} "), size);
            if used + advance <= budget {
                current.push_str(word);
                current.push(' ');
                used += advance;
                index += 1;
                continue;
            }
            if current.is_empty() {
                // A word wider than a whole line takes a line to itself.
                current = self.ellipsize(word, size, line_width, true);
                index += 1;
            }
            lines.push(current.trim_end().to_string());
            current.clear();
            used = Pt::ZERO;
        }
        if !current.is_empty() && lines.len() < max_lines {
            lines.push(current.trim_end().to_string());
        }

        if index < words.len() {
            if let Some(last) = lines.last_mut() {
                if !last.ends_with(ELLIPSIS) {
                    let candidate = format!("{last} {}", words[index]);
                    let more_follow = index + 1 < words.len();
                    *last = self.ellipsize(&candidate, size, line_width, more_follow);
                }
            }
            tracing::debug!(
                dropped_words = words.len() - index,
                max_lines,
                "cropped text with ellipsis"
            );
        }

        lines.join("\n").trim().to_string()
    }

    /// Wraps without a line budget; explicit newlines start new lines. A
    /// word wider than a whole line is broken across lines.
    pub fn wrap_text(&self, text: &str, size: Pt, line_width: Pt) -> Vec<String> {
        let budget = line_width - self.slack;
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut current = String::new();
            let mut used = Pt::ZERO;
            for word in paragraph.split_whitespace() {
                for piece in self.break_word(word, size, budget) {
                    let advance = self.width(&format!("{piece} "), size);
                    if used + advance > budget && !current.is_empty() {
                        lines.push(current.trim_end().to_string());
                        current.clear();
                        used = Pt::ZERO;
                    }
                    current.push_str(piece);
                    current.push(' ');
                    used += advance;
                }
            }
            lines.push(current.trim_end().to_string());
        }
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        lines
    }

    /// Splits `word` into the longest prefixes no wider than `budget`. Every
    /// piece keeps at least one character.
    fn break_word<'w>(&self, word: &'w str, size: Pt, budget: Pt) -> Vec<&'w str> {
        if self.width(word, size) <= budget {
            return vec![word];
        }
        let mut pieces = Vec::new();
        let mut start = 0;
        for (offset, ch) in word.char_indices() {
            let end = offset + ch.len_utf8();
            if offset > start && self.width(&word[start..end], size) > budget {
                pieces.push(&word[start..offset]);
                start = offset;
            }
        }
        pieces.push(&word[start..]);
        pieces
    }

    /// Drops trailing characters until `text` plus an ellipsis fits. Each
    /// pass removes one character, so the loop is bounded by the text length
    /// and ends at a bare ellipsis when even that is too wide.
    fn ellipsize(&self, text: &str, size: Pt, line_width: Pt, force: bool) -> String {
        let fits = |candidate: &str| self.width(candidate, size) + self.slack < line_width;
        let mut base = text.trim_end().to_string();
        if !force && fits(&base) {
            return base;
        }
        loop {
            let candidate = format!("{}{ELLIPSIS}", base.trim_end());
            if base.is_empty() || fits(&candidate) {
                return candidate;
            }
            base.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontRegistry, HELVETICA};

    /// Every character advances half the font size.
    struct HalfEm;

    impl TextMeasure for HalfEm {
        fn text_width(&self, _font: &str, size: Pt, text: &str) -> Pt {
            (size / 2) * (text.chars().count() as i32)
        }
    }

    fn pt(value: i32) -> Pt {
        Pt::from_i32(value)
    }

    fn exact(measure: &HalfEm) -> TextFitter<'_> {
        TextFitter::new(measure, "mono").with_slack(Pt::ZERO)
    }

    #[test]
    fn empty_text_takes_the_maximum_size() {
        let fitter = exact(&HalfEm);
        assert_eq!(fitter.fit_font_size("", pt(8), pt(12), Pt::ZERO), pt(12));
        assert_eq!(fitter.fit_font_size("", pt(8), pt(12), pt(500)), pt(12));
    }

    #[test]
    fn fit_keeps_the_maximum_when_text_fits() {
        let fitter = exact(&HalfEm);
        // 4 chars * 6pt = 24pt
        assert_eq!(fitter.fit_font_size("abcd", pt(8), pt(12), pt(30)), pt(12));
    }

    #[test]
    fn fit_steps_down_to_the_largest_fitting_size() {
        let fitter = exact(&HalfEm);
        // 10 chars * size/2 <= 50 holds first at size 10.
        assert_eq!(
            fitter.fit_font_size("abcdefghij", pt(8), pt(12), pt(50)),
            pt(10)
        );
    }

    #[test]
    fn fit_never_goes_below_the_floor() {
        let fitter = exact(&HalfEm);
        assert_eq!(
            fitter.fit_font_size("abcdefghij", pt(8), pt(12), pt(10)),
            pt(8)
        );
    }

    #[test]
    fn fit_is_monotonic_in_width() {
        let registry = FontRegistry::new();
        let fitter = TextFitter::new(&registry, HELVETICA);
        let text = "Magneto timing split 3 degrees on the left mag";
        let mut previous = Pt::ZERO;
        for width in (20..400).step_by(7) {
            let size = fitter.fit_font_size(text, pt(8), pt(12), pt(width));
            assert!(size >= previous, "width {width} shrank the size");
            previous = size;
        }
    }

    #[test]
    fn shorter_text_never_needs_a_smaller_size() {
        let registry = FontRegistry::new();
        let fitter = TextFitter::new(&registry, HELVETICA);
        let long = "EGT4 rises 80F above the others during the mixture sweep";
        let short = "EGT4 rises 80F";
        for width in [60, 120, 200, 300] {
            let long_size = fitter.fit_font_size(long, pt(8), pt(12), pt(width));
            let short_size = fitter.fit_font_size(short, pt(8), pt(12), pt(width));
            assert!(short_size >= long_size);
        }
    }

    #[test]
    fn uniform_size_is_the_smallest_individual_fit() {
        let fitter = exact(&HalfEm);
        let items = [("abcd", pt(30)), ("abcdefghij", pt(50)), ("", pt(1))];
        assert_eq!(fitter.uniform_font_size(items, pt(8), pt(12)), pt(10));
        assert_eq!(
            fitter.uniform_font_size(std::iter::empty::<(&str, Pt)>(), pt(8), pt(12)),
            pt(12)
        );
    }

    #[test]
    fn crop_packs_words_greedily() {
        let fitter = exact(&HalfEm);
        // size 2 => 1pt per char; "aa " = 3pt.
        let out = fitter.crop_text("aa bb cc dd ee", pt(2), Pt::from_f32(6.5), 3);
        assert_eq!(out, "aa bb\ncc dd\nee");
    }

    #[test]
    fn crop_ellipsizes_the_last_line_on_overflow() {
        let fitter = exact(&HalfEm);
        let out = fitter.crop_text("aa bb cc dd ee", pt(2), Pt::from_f32(6.5), 2);
        assert_eq!(out, "aa bb\ncc...");
    }

    #[test]
    fn crop_gives_an_oversized_word_its_own_line() {
        let fitter = exact(&HalfEm);
        let out = fitter.crop_text("abcdefghijkl ok", pt(2), Pt::from_f32(6.5), 2);
        assert_eq!(out, "abc...\nok");
    }

    #[test]
    fn crop_with_no_line_budget_is_empty() {
        let fitter = exact(&HalfEm);
        assert_eq!(fitter.crop_text("anything", pt(2), pt(100), 0), "");
    }

    #[test]
    fn crop_terminates_when_even_the_ellipsis_is_too_wide() {
        let fitter = exact(&HalfEm);
        let out = fitter.crop_text("abcdef ghijkl", pt(2), pt(1), 1);
        assert_eq!(out, ELLIPSIS);
    }

    #[test]
    fn cropped_lines_respect_the_width_and_mark_truncation() {
        let registry = FontRegistry::new();
        let fitter = TextFitter::new(&registry, HELVETICA);
        let vocabulary = [
            "CHT", "EGT", "mixture", "sweep", "magneto", "spark", "plug", "fouled", "timing",
            "rich", "lean", "of", "peak", "the", "cylinder", "#3", "runs", "hot", "during",
            "climb", "anomalous", "fuel-flow", "indication",
        ];
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        for round in 0..200 {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let count = 1 + (seed >> 33) as usize % 60;
            let text = (0..count)
                .map(|i| vocabulary[(seed as usize).wrapping_add(i * 7) % vocabulary.len()])
                .collect::<Vec<_>>()
                .join(" ");
            let width = cm(3.0 + (round % 12) as f32);
            let size = pt(8 + (round % 5) as i32);
            let max_lines = 1 + round % 5;
            let out = fitter.crop_text(&text, size, width, max_lines);
            let lines: Vec<&str> = out.lines().collect();
            assert!(lines.len() <= max_lines);
            for line in &lines {
                assert!(fitter.width(line, size) <= width, "{line:?} overflows");
            }
            let kept_words: usize = lines.iter().map(|l| l.split_whitespace().count()).sum();
            if kept_words < count || out.ends_with(ELLIPSIS) {
                assert!(out.ends_with(ELLIPSIS), "truncated without ellipsis: {out:?}");
            }
        }
    }

    #[test]
    fn wrap_breaks_words_wider_than_a_line() {
        let fitter = exact(&HalfEm);
        let lines = fitter.wrap_text("x abcdefghijklmn y", pt(2), Pt::from_f32(6.5));
        assert_eq!(lines, vec!["x", "abcdef", "ghijkl", "mn y"]);
    }

    #[test]
    fn wrap_honours_explicit_newlines() {
        let fitter = exact(&HalfEm);
        let lines = fitter.wrap_text("aa bb cc\n\ndd", pt(2), Pt::from_f32(6.5));
        assert_eq!(lines, vec!["aa bb", "cc", "", "dd"]);
    }
}
