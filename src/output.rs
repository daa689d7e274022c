//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every stored report is its semantic identity — project, site and
//! install date — with the backing filename shown as secondary context via an
//! indented `Source:` line. The listing reads as a site inventory while still
//! letting users trace each entry back to its file.
//!
//! ```text
//! Stored reports
//! 001 Northside Expansion - MH-27 (2026-08-12)
//!     Source: Northside_Expansion_MH_27_20260812_141503.json
//! 002 Northside Expansion - MH-31 (2026-08-13)
//!     Source: Northside_Expansion_MH_31_20260813_090144.json
//!
//! 1 file could not be loaded:
//!     corrupt.json: expected value at line 1 column 1
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use std::path::Path;

use crate::bundle::SiteBundle;
use crate::storage::{StoredReport, WriteReceipt};
use crate::types::SiteRecord;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human size: KB above 1024 bytes, raw byte count below.
fn format_size(bytes: usize) -> String {
    if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

// ============================================================================
// render
// ============================================================================

/// Format the render summary: each included site, then the output line.
pub fn format_render_output(sites: &[SiteRecord], pdf_len: usize, path: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, site) in sites.iter().enumerate() {
        let mut detail = Vec::new();
        if !site.photos.is_empty() {
            detail.push(format!("{} photos", site.photos.len()));
        }
        if site.diagram.is_some() {
            detail.push("diagram".to_string());
        }
        let suffix = if detail.is_empty() {
            String::new()
        } else {
            format!(" ({})", detail.join(", "))
        };
        lines.push(format!(
            "{} {} - {}{}",
            format_index(i + 1),
            site.project_name,
            site.site_name,
            suffix
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Rendered {} site{} to {} ({})",
        sites.len(),
        if sites.len() == 1 { "" } else { "s" },
        path.display(),
        format_size(pdf_len)
    ));
    lines
}

pub fn print_render_output(sites: &[SiteRecord], pdf_len: usize, path: &Path) {
    for line in format_render_output(sites, pdf_len, path) {
        println!("{line}");
    }
}

// ============================================================================
// list
// ============================================================================

/// Format the stored-report inventory plus any load warnings.
pub fn format_list_output(reports: &[StoredReport], warnings: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    if reports.is_empty() {
        lines.push("No stored reports".to_string());
    } else {
        lines.push("Stored reports".to_string());
        for (i, report) in reports.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), report.summary()));
            lines.push(format!("    Source: {}", report.filename));
        }
    }

    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "{} file{} could not be loaded:",
            warnings.len(),
            if warnings.len() == 1 { "" } else { "s" }
        ));
        for warning in warnings {
            lines.push(format!("    {warning}"));
        }
    }
    lines
}

pub fn print_list_output(reports: &[StoredReport], warnings: &[String]) {
    for line in format_list_output(reports, warnings) {
        println!("{line}");
    }
}

// ============================================================================
// bundle
// ============================================================================

/// Format the bundle summary: identity, attachment inventory, payload size.
pub fn format_bundle_output(site: &SiteRecord, bundle: &SiteBundle, path: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "Bundle v{} for {} - {}",
        bundle.bundle_version, site.project_name, site.site_name
    ));
    lines.push(format!(
        "    Photos: {}, Diagram: {}",
        site.photos.len(),
        if site.diagram.is_some() { "yes" } else { "no" }
    ));
    lines.push(format!(
        "    PDF payload: {}",
        format_size(bundle.pdf_base64.len() / 4 * 3)
    ));
    lines.push(format!("    Written to: {}", path.display()));
    lines
}

pub fn print_bundle_output(site: &SiteRecord, bundle: &SiteBundle, path: &Path) {
    for line in format_bundle_output(site, bundle, path) {
        println!("{line}");
    }
}

// ============================================================================
// store
// ============================================================================

/// Format the result of saving a record into the report store.
pub fn format_store_output(site: &SiteRecord, filename: &str, root: &Path) -> Vec<String> {
    vec![
        format!("Stored {} - {}", site.project_name, site.site_name),
        format!("    Source: {}", root.join(filename).display()),
    ]
}

pub fn print_store_output(site: &SiteRecord, filename: &str, root: &Path) {
    for line in format_store_output(site, filename, root) {
        println!("{line}");
    }
}

// ============================================================================
// publish
// ============================================================================

/// Format a precondition-checked write receipt.
pub fn format_publish_output(receipt: &WriteReceipt) -> Vec<String> {
    let action = if receipt.created { "Created" } else { "Updated" };
    let token = &receipt.version_token[..receipt.version_token.len().min(12)];
    vec![
        format!("{} {}", action, receipt.path.display()),
        format!("    Version token: {token}"),
    ]
}

pub fn print_publish_output(receipt: &WriteReceipt) {
    for line in format_publish_output(receipt) {
        println!("{line}");
    }
}
