//! Buffered page snapshots and second-pass page numbering.
//!
//! Pages are emitted before the document's total page count is known, so the
//! footer's "i of N" cannot be drawn during content emission. The engine is
//! split accordingly:
//!
//! 1. **Pass one** appends [`DrawOp`]s to the current [`PageSnapshot`];
//!    [`PageBuffer::break_page`] seals it and starts the next. No snapshot
//!    carries a visible page number.
//! 2. **Finalization** ([`stamp_page_numbers`]) consumes the full ordered
//!    sequence, now knowing `N`, and appends the centered number op to every
//!    snapshot's footer.
//!
//! Only after both passes does [`super::pdf::write_pdf`] turn snapshots into
//! actual PDF pages. Page numbering is continuous across sites because all
//! sites share one buffer.

use super::geometry::{text_width, FOOTER_FONT_SIZE, PAGE_NUMBER_Y, PAGE_WIDTH};

/// One buffered drawing operation in page coordinates (points, bottom-left
/// origin). `x`/`y` are the text baseline start, line endpoints, or the
/// lower-left corner for rectangles and images.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        /// Fill gray, 0 = black, 1 = white.
        gray: f64,
        text: String,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        gray: f64,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        rgb: (f32, f32, f32),
    },
    /// An image already scaled to `w` x `h`; `data` holds the original
    /// encoded bytes (JPEG/PNG), embedded verbatim at assembly time.
    Image {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        data: Vec<u8>,
    },
}

/// An ordered list of draw ops making up one finished page.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub ops: Vec<DrawOp>,
}

impl PageSnapshot {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Accumulates pass-one output: sealed snapshots plus the page in progress.
#[derive(Debug, Default)]
pub struct PageBuffer {
    sealed: Vec<PageSnapshot>,
    current: PageSnapshot,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an op to the page in progress.
    pub fn push(&mut self, op: DrawOp) {
        self.current.ops.push(op);
    }

    /// Seal the page in progress and start a fresh one.
    ///
    /// Sealing an empty page is a no-op; a break at a site boundary never
    /// emits a blank page.
    pub fn break_page(&mut self) {
        if !self.current.is_empty() {
            let finished = std::mem::take(&mut self.current);
            self.sealed.push(finished);
        }
    }

    /// Number of pages sealed so far.
    pub fn page_count(&self) -> usize {
        self.sealed.len()
    }

    /// Finish pass one: seal any trailing page and hand over the sequence.
    pub fn into_pages(mut self) -> Vec<PageSnapshot> {
        self.break_page();
        self.sealed
    }
}

/// Pass two: stamp "i of N" centered in every page's footer area.
pub fn stamp_page_numbers(pages: &mut [PageSnapshot]) {
    let total = pages.len();
    for (index, page) in pages.iter_mut().enumerate() {
        let text = format!("{} of {}", index + 1, total);
        let x = (PAGE_WIDTH - text_width(&text, FOOTER_FONT_SIZE)) / 2.0;
        page.ops.push(DrawOp::Text {
            x,
            y: PAGE_NUMBER_Y,
            size: FOOTER_FONT_SIZE,
            bold: false,
            gray: 0.3,
            text,
        });
    }
}
