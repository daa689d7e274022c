//! Fixed page geometry and text measurement.
//!
//! All functions here are pure and testable without producing a document.
//! Coordinates are PDF points with the origin at the bottom-left corner, so
//! the content cursor moves *down* the page by decreasing `y`.
//!
//! ## Page anatomy
//!
//! ```text
//! +--------------------------------------+  <- PAGE_HEIGHT
//! | header band (HEADER_BAR_HEIGHT)      |
//! +--------------------------------------+
//! |                                      |  <- content starts at
//! |  content area                        |     PAGE_HEIGHT - HEADER_CONTENT_OFFSET
//! |  (margin on both sides)              |
//! |                                      |  <- MIN_CONTENT_Y: sections will
//! |                                      |     not start below this line
//! +--------------------------------------+
//! | footer line (FOOTER_Y)               |
//! | page number (PAGE_NUMBER_Y)          |
//! +--------------------------------------+  <- 0
//! ```
//!
//! ## Text metrics
//!
//! Wrapping measures real Helvetica advance widths (the standard AFM table,
//! thousandths of the font size) for printable ASCII. Characters outside that
//! range measure at the average lowercase width; the report vocabulary is
//! ASCII so this only matters for stray symbols in free-text comments.

/// Points per millimetre.
pub const MM: f64 = 72.0 / 25.4;

/// A4 portrait, in points.
pub const PAGE_WIDTH: f64 = 595.276;
pub const PAGE_HEIGHT: f64 = 841.89;

/// Content margin on both sides of the page.
pub const MARGIN: f64 = 22.0 * MM;
/// Slightly wider margin used inside the header and footer bands.
pub const BAND_MARGIN: f64 = 20.0 * MM;

/// Vertical advance per rendered text line.
pub const LINE_HEIGHT: f64 = 6.0 * MM;

/// Height of the colored header band.
pub const HEADER_BAR_HEIGHT: f64 = 18.0 * MM;
/// Distance from the page top to the first content baseline.
pub const HEADER_CONTENT_OFFSET: f64 = 60.0 * MM;

/// Baseline of the footer text.
pub const FOOTER_Y: f64 = 14.0 * MM;
/// Baseline of the centered "i of N" page number.
pub const PAGE_NUMBER_Y: f64 = 8.0 * MM;

/// Sections will not start below this line; crossing it forces a page break.
pub const MIN_CONTENT_Y: f64 = 40.0 * MM;

/// Maximum width of a wrapped key/value row, label included.
pub const MAX_TEXT_WIDTH: f64 = 170.0 * MM;

/// Body and caption font sizes.
pub const BODY_FONT_SIZE: f64 = 9.0;
pub const CAPTION_FONT_SIZE: f64 = 8.0;
pub const FOOTER_FONT_SIZE: f64 = 8.0;
pub const TITLE_FONT_SIZE: f64 = 11.0;
pub const HEADER_FONT_SIZE: f64 = 12.0;

/// Caption character budgets (diagram block and photo pages).
pub const DIAGRAM_CAPTION_CHARS: usize = 120;
pub const PHOTO_CAPTION_CHARS: usize = 160;

/// Helvetica advance widths for ASCII 32..=126, in thousandths of the font
/// size (standard AFM metrics).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Width used for characters outside the table (average lowercase glyph).
const FALLBACK_WIDTH: u16 = 556;

/// Measured width of `text` at `font_size`, in points.
///
/// Labels render in Helvetica-Bold, whose advances differ by a few percent;
/// wrapping only ever measures the regular face, and labels are never
/// wrapped, so one table is enough.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                HELVETICA_WIDTHS[(code - 32) as usize] as u32
            } else {
                FALLBACK_WIDTH as u32
            }
        })
        .sum();
    units as f64 * font_size / 1000.0
}

/// Greedy word-boundary wrapping to a maximum line width.
///
/// Words longer than the full width are emitted on their own line rather
/// than split mid-word — the line overflows slightly instead of losing text.
/// Blank input produces no lines.
pub fn wrap_text(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if text_width(&candidate, font_size) <= max_width || line.is_empty() {
            line = candidate;
        } else {
            lines.push(line);
            line = word.to_string();
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Truncate to a caption budget on a char boundary.
pub fn truncate_caption(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}

/// Scale to fit a bounding box while preserving aspect ratio.
///
/// # Examples
/// ```
/// # use flowsite::report::geometry::fit_into_box;
/// // A 600x400 image in a 300x300 box scales by width
/// assert_eq!(fit_into_box((600, 400), 300.0, 300.0), (300.0, 200.0));
/// // A 400x600 image in the same box scales by height
/// assert_eq!(fit_into_box((400, 600), 300.0, 300.0), (200.0, 300.0));
/// ```
pub fn fit_into_box(intrinsic: (u32, u32), max_width: f64, max_height: f64) -> (f64, f64) {
    let (iw, ih) = intrinsic;
    if iw == 0 || ih == 0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / iw as f64).min(max_height / ih as f64);
    (iw as f64 * scale, ih as f64 * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // text_width
    // =========================================================================

    #[test]
    fn width_of_known_string() {
        // "Hi" = H(722) + i(222) = 944/1000 of the size
        let w = text_width("Hi", 10.0);
        assert!((w - 9.44).abs() < 1e-9);
    }

    #[test]
    fn width_scales_with_font_size() {
        let small = text_width("Flow meter", 9.0);
        let large = text_width("Flow meter", 18.0);
        assert!((large - small * 2.0).abs() < 1e-9);
    }

    #[test]
    fn width_grows_with_text() {
        assert!(text_width("ab", 9.0) > text_width("a", 9.0));
    }

    #[test]
    fn non_ascii_uses_fallback_width() {
        assert_eq!(text_width("é", 10.0), 5.56);
    }

    // =========================================================================
    // wrap_text
    // =========================================================================

    #[test]
    fn short_text_is_one_line() {
        let lines = wrap_text("Sensor in main flow path", 9.0, MAX_TEXT_WIDTH);
        assert_eq!(lines, vec!["Sensor in main flow path"]);
    }

    #[test]
    fn blank_text_produces_no_lines() {
        assert!(wrap_text("", 9.0, MAX_TEXT_WIDTH).is_empty());
        assert!(wrap_text("   ", 9.0, MAX_TEXT_WIDTH).is_empty());
    }

    #[test]
    fn long_text_wraps_at_word_boundaries() {
        let text = "The sensor was mounted on a stainless band immediately \
                    downstream of the manhole benching with no visible \
                    turbulence at the measurement point during commissioning";
        let lines = wrap_text(text, 9.0, 60.0 * MM);
        assert!(lines.len() > 1);
        for line in &lines {
            // No line exceeds the limit (words are never split)
            assert!(text_width(line, 9.0) <= 60.0 * MM + 1e-9);
        }
        // Re-joining loses nothing
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn oversized_word_gets_its_own_line() {
        let word = "x".repeat(300);
        let lines = wrap_text(&word, 9.0, 50.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], word);
    }

    // =========================================================================
    // truncate_caption / fit_into_box
    // =========================================================================

    #[test]
    fn caption_truncates_on_char_boundary() {
        assert_eq!(truncate_caption("abcdef", 4), "abcd");
        assert_eq!(truncate_caption("héllo", 2), "hé");
        assert_eq!(truncate_caption("short", 120), "short");
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let (w, h) = fit_into_box((600, 400), 300.0, 300.0);
        assert!((w / h - 1.5).abs() < 1e-9);
    }

    #[test]
    fn fit_never_exceeds_the_box() {
        let (w, h) = fit_into_box((123, 457), 200.0, 150.0);
        assert!(w <= 200.0 + 1e-9);
        assert!(h <= 150.0 + 1e-9);
    }

    #[test]
    fn fit_handles_degenerate_dimensions() {
        assert_eq!(fit_into_box((0, 100), 200.0, 150.0), (0.0, 0.0));
    }
}
