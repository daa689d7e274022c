//! Installation report rendering.
//!
//! Rendering runs in two passes over an intermediate page model:
//!
//! 1. **Layout** ([`sections`]): each site's [`SiteRenderer`] walks the
//!    section sequence with a cursor, emitting [`page::DrawOp`]s into a
//!    shared [`page::PageBuffer`] and sealing pages as the break policy
//!    fires. Pass one never knows the final page count.
//! 2. **Finalize** ([`pdf`]): with every page sealed, the total is known;
//!    [`page::stamp_page_numbers`] appends the centered `i of N` footer to
//!    each page and the snapshots become PDF bytes via `lopdf`.
//!
//! Geometry (A4 point space, margins, font metrics) lives in [`geometry`]
//! and is shared by both passes.

pub mod geometry;
pub mod page;
pub mod pdf;
pub mod sections;

use thiserror::Error;

use crate::config::ReportConfig;
use crate::types::SiteRecord;
pub use sections::{MapProvider, NoMap};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF generation failed: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Render the full multi-site report and return the PDF bytes.
///
/// Sites appear in input order, each starting on a fresh page. Page numbers
/// are continuous across the whole document.
pub fn render_report(
    sites: &[SiteRecord],
    maps: &dyn MapProvider,
    config: &ReportConfig,
) -> Result<Vec<u8>, ReportError> {
    let mut buffer = page::PageBuffer::new();
    for site in sites {
        sections::SiteRenderer::new(site, config, &mut buffer).render(maps);
    }

    let mut pages = buffer.into_pages();
    page::stamp_page_numbers(&mut pages);
    pdf::write_pdf(&pages)
}
