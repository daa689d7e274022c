//! # Flowsite
//!
//! Reporting engine for sewer flow-meter installations. A field crew's
//! submission for one monitoring site — manhole and pipe details,
//! commissioning readings, photos and a diagram — becomes a branded
//! multi-site PDF report, an archival JSON bundle, and a versioned record in
//! the report store.
//!
//! # Architecture: Record → Derive → Render → Persist
//!
//! The pipeline is a chain of pure derivations over [`types::SiteRecord`]:
//!
//! ```text
//! 1. Derive    readings  →  DerivedFlowMetrics   (averages, flows, diff)
//! 2. Render    records   →  report.pdf           (two-pass layout + lopdf)
//! 3. Bundle    record    →  bundle.json          (metadata + embedded PDF)
//! 4. Persist   record    →  store / repo path    (versioned JSON writes)
//! ```
//!
//! Core functions never mutate a record in place and never touch the
//! filesystem; the CLI composes them and owns all I/O. That keeps each stage
//! unit-testable with plain in-memory values.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared record types (`SiteRecord`, `Attachment`, `Reading`) and the base64 payload codec |
//! | [`hydraulics`] | Circular-segment wetted area, positive-only averaging, flow derivation |
//! | [`photos`] | Content-addressed photo merge: SHA-256 dedup, order-preserving, idempotent |
//! | [`bundle`] | Archival bundle assembly — metadata-only site JSON plus base64 PDF |
//! | [`storage`] | Report store, slug paths, and precondition-checked versioned writes |
//! | [`report`] | Two-pass PDF rendering: cursor layout, page snapshots, `i of N` stamping |
//! | [`config`] | `flowsite.toml` loading and validation: branding, layout, storage locations |
//! | [`output`] | CLI output formatting — information-first display of command results |
//!
//! # Design Decisions
//!
//! ## Two-Pass Rendering
//!
//! Footers need `i of N`, but N is unknown until layout finishes. Rather than
//! patching a live PDF, pass one lays out every page into plain
//! [`report::page::PageSnapshot`] values and pass two stamps the numbers and
//! writes the document. The intermediate model is inspectable in tests
//! without parsing PDF output.
//!
//! ## Forgiving Attachment Decoding
//!
//! A stored record with one corrupt base64 photo still loads: the payload
//! degrades to empty bytes, the attachment is kept as hash-less, and every
//! other field of the record survives. Reports are field data; losing a whole
//! site record over one damaged image is the worse failure.
//!
//! ## Content-Addressed Photo Identity
//!
//! Photos are deduplicated by SHA-256 of payload bytes, never by name. Two
//! uploads of the same image under different names merge to one; renaming a
//! photo updates the stored name in place. The same digests appear in bundle
//! metadata, so an archived bundle's inventory can be verified against the
//! files it described.

pub mod bundle;
pub mod config;
pub mod hydraulics;
pub mod output;
pub mod photos;
pub mod report;
pub mod storage;
pub mod types;
