//! Archival report bundles: site metadata plus the rendered PDF.
//!
//! A bundle is the tamper-evident, versioned form of a finished report. It
//! never carries raw attachment bytes — each photo and diagram is replaced by
//! a `{name, mime, sha256, size_bytes}` descriptor — which keeps bundle size
//! bounded and makes any later substitution of an image detectable. The
//! rendered PDF itself is embedded as base64 so the bundle is a single
//! self-contained JSON document.
//!
//! This transformation is one-way with respect to attachments: the original
//! photo bytes cannot be reconstructed from a bundle. Full round-trip
//! persistence of a record (payloads included) is the job of the stored
//! record format in [`crate::storage`], which serializes attachments through
//! the base64 codec on [`crate::types::Attachment`].
//!
//! Bundle JSON is written with sorted keys so stored bundles diff cleanly in
//! version control. The writer sorts explicitly rather than relying on
//! `serde_json`'s default map ordering, which flips if the `preserve_order`
//! feature is enabled anywhere in the dependency graph.

use crate::photos::content_hash;
use crate::types::{Attachment, SiteRecord};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Bump when the bundle schema changes shape.
pub const BUNDLE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("embedded PDF is not valid base64: {0}")]
    PdfDecode(#[from] base64::DecodeError),
}

/// Content fingerprint standing in for an attachment's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub name: String,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl AttachmentMetadata {
    /// Describe an attachment by its fingerprint. Hash-less attachments
    /// (payload lost or never normalized) keep their metadata with no digest.
    pub fn describe(photo: &Attachment) -> Self {
        let (sha256, size_bytes) = if photo.has_payload() {
            (
                Some(content_hash(&photo.data)),
                Some(photo.data.len() as u64),
            )
        } else {
            (None, None)
        };
        Self {
            name: photo.display_name().to_string(),
            mime: photo.mime.clone(),
            sha256,
            size_bytes,
        }
    }
}

/// The archival bundle: metadata-only site record plus the rendered PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteBundle {
    pub bundle_version: u32,
    pub site: Value,
    pub pdf_base64: String,
}

impl SiteBundle {
    /// Decode the embedded PDF back to its original bytes.
    pub fn pdf_bytes(&self) -> Result<Vec<u8>, BundleError> {
        Ok(STANDARD.decode(self.pdf_base64.as_bytes())?)
    }

    /// Serialize with stable, sorted keys for clean diffs in storage.
    pub fn to_stable_json(&self) -> Result<String, BundleError> {
        let value = serde_json::to_value(self)?;
        let sorted = sort_keys(value);
        Ok(serde_json::to_string_pretty(&sorted)?)
    }
}

/// Build the archival bundle for a site and its rendered document.
pub fn build_site_bundle(site: &SiteRecord, pdf_bytes: &[u8]) -> Result<SiteBundle, BundleError> {
    Ok(SiteBundle {
        bundle_version: BUNDLE_VERSION,
        site: site_metadata_json(site)?,
        pdf_base64: STANDARD.encode(pdf_bytes),
    })
}

/// Metadata-only JSON form of a site record.
///
/// All non-binary fields pass through unchanged (verification readings
/// included — they are small and part of the audit trail). The `photos` and
/// `diagram` collections are replaced by fingerprint descriptors, and a UTC
/// generation timestamp is appended.
pub fn site_metadata_json(site: &SiteRecord) -> Result<Value, BundleError> {
    let mut object: Map<String, Value> = match serde_json::to_value(site)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    object.remove("photos");
    object.remove("diagram");

    if !site.photos.is_empty() {
        let metas: Vec<AttachmentMetadata> =
            site.photos.iter().map(AttachmentMetadata::describe).collect();
        object.insert("photos_metadata".into(), serde_json::to_value(metas)?);
    }
    if let Some(diagram) = &site.diagram {
        object.insert(
            "diagram_metadata".into(),
            serde_json::to_value(AttachmentMetadata::describe(diagram))?,
        );
    }

    object.insert(
        "bundle_generated_at_utc".into(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    Ok(Value::Object(object))
}

/// Recursively rewrite every JSON object with sorted keys.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
