//! Shared record types serialized between every stage of the pipeline.
//!
//! A [`SiteRecord`] is the unit of work: one flow-meter installation, fully
//! described by the field crew's form submission. The core components never
//! mutate a record in place — they derive new values ([`DerivedFlowMetrics`],
//! merged photo lists, bundles) and the caller composes the final record.
//!
//! ## Binary payloads
//!
//! Attachment payloads travel as raw bytes in memory and as base64 text in
//! every persisted JSON form. Decoding is deliberately forgiving: a corrupt
//! base64 field degrades to empty bytes on load instead of failing the whole
//! record, so one damaged photo never takes down a report.

use serde::{Deserialize, Serialize};

/// Placeholder caption for attachments whose name is blank after trimming.
pub const DEFAULT_PHOTO_NAME: &str = "Site photo";

/// A photo or diagram attached to a site record.
///
/// Two attachments are the same logical image if and only if their payload
/// bytes hash equal — `name` and `mime` are display metadata and take no part
/// in identity. An empty `data` is the "payload could not be normalized"
/// case: such attachments are kept but treated as hash-less.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub mime: String,
    /// Raw image bytes; base64 text on the wire.
    #[serde(default, with = "b64_bytes")]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }

    /// Trimmed display name, falling back to [`DEFAULT_PHOTO_NAME`].
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            DEFAULT_PHOTO_NAME
        } else {
            trimmed
        }
    }

    /// Whether a payload is present (hash-less attachments have none).
    pub fn has_payload(&self) -> bool {
        !self.data.is_empty()
    }
}

/// One supplementary depth/velocity verification reading.
///
/// All numeric fields are zero-defaulted. A value contributes to its
/// channel's average only when strictly positive — zero means "not taken",
/// never "zero flow".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reading {
    pub depth_meas_mm: f64,
    pub depth_meter_mm: f64,
    pub vel_meas_ms: f64,
    pub vel_meter_ms: f64,
    pub comment: String,
}

/// Averages and flow estimates derived from the commissioning readings.
///
/// Computed, never user-edited: recomputed in full on every submission from
/// the primary commissioning pair plus all extra readings. Flattened into
/// [`SiteRecord`] on the wire so stored records read as one flat object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedFlowMetrics {
    pub avg_depth_meas_mm: f64,
    pub avg_depth_meter_mm: f64,
    pub avg_vel_meas_ms: f64,
    pub avg_vel_meter_ms: f64,
    pub flow_meas_lps: f64,
    pub flow_meter_lps: f64,
    pub flow_diff_lps: f64,
    pub flow_diff_percent: f64,
}

/// A complete flow-meter installation record.
///
/// Field names match the stored JSON produced by earlier versions of the
/// reporting tool, so existing report files load unchanged. Business identity
/// is `site_name` within a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteRecord {
    // Project identity
    pub project_name: String,
    pub client: String,
    pub catchment: String,
    pub site_id: String,
    pub site_name: String,
    pub client_asset_id: String,
    pub gis_id: String,
    pub install_date: String,
    pub install_time: String,
    pub gps_lat: String,
    pub gps_lon: String,
    pub site_address: String,

    // Manhole, location & safety
    pub manhole_location_desc: String,
    pub access_type: String,
    pub confined_space_required: bool,
    pub traffic_control_required: bool,
    pub access_safety_constraints: String,
    pub other_permits_required: String,

    // Pipe & hydraulic assessment
    pub pipe_diameter_mm: f64,
    pub pipe_material: String,
    pub pipe_shape: String,
    pub depth_to_invert_mm: f64,
    pub depth_to_soffit_mm: f64,
    pub upstream_config: String,
    pub downstream_config: String,
    pub hydro_turbulence_level: String,
    pub hydro_drops: bool,
    pub hydro_bends: bool,
    pub hydro_junctions: bool,
    pub hydro_surcharge_risk: bool,
    pub hydro_backwater_risk: bool,
    pub hydraulic_notes: String,

    // Meter, sensor & configuration
    pub meter_model: String,
    pub logger_serial: String,
    pub sensor_serial: String,
    pub sensor_distance_from_manhole_m: f64,
    pub sensor_orientation: String,
    pub sensor_mount_type: String,
    pub datum_reference_desc: String,
    pub level_range_min_mm: f64,
    pub level_range_max_mm: f64,
    pub velocity_range_min_ms: f64,
    pub velocity_range_max_ms: f64,
    pub output_scaling_desc: String,
    pub comms_method: String,
    pub telemetry_logger_id: String,
    pub telemetry_server: String,
    pub telemetry_notes: String,
    pub logging_interval_min: f64,
    pub timezone: String,

    // Commissioning checks (the primary reading)
    pub depth_check_meas_mm: f64,
    pub depth_check_meter_mm: f64,
    pub depth_check_diff_mm: f64,
    pub depth_check_tolerance_mm: f64,
    pub depth_check_within_tol: String,
    pub vel_check_meas_ms: f64,
    pub vel_check_meter_ms: f64,
    pub vel_check_diff_ms: f64,
    pub comms_verified: String,
    pub comms_verified_at: String,
    pub zero_depth_check_done: bool,
    pub zero_depth_check_notes: String,
    pub reference_device_type: String,
    pub reference_device_id: String,
    pub reference_reading_desc: String,

    // Calibration suitability & modelling
    pub calibration_rating: String,
    pub calibration_comment: String,
    pub modelling_notes: String,
    pub data_quality_risks: String,

    // Installer checklist
    pub chk_sensor_in_main_flow: bool,
    pub chk_no_immediate_drops: bool,
    pub chk_depth_range_ok: bool,
    pub chk_logging_started: bool,
    pub chk_comms_checked_platform: bool,

    // Sign-off
    pub prepared_by: String,
    pub prepared_position: String,
    pub prepared_date: String,
    pub reviewed_by: String,
    pub reviewed_position: String,
    pub reviewed_date: String,

    // Embedded collections
    pub verification_readings: Vec<Reading>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<Attachment>,

    /// Derived averages and flows, flat on the wire.
    #[serde(flatten)]
    pub metrics: DerivedFlowMetrics,
}

/// Base64 codec for attachment payloads.
///
/// Serializes bytes as standard base64 text. Deserialization degrades a
/// corrupt field to empty bytes: one damaged attachment must never abort the
/// load of the record that carries it.
pub(crate) mod b64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(STANDARD.decode(text.as_bytes()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_payload_roundtrips_through_json() {
        let a = Attachment::new("Invert", "image/jpeg", vec![0, 1, 2, 255]);
        let json = serde_json::to_string(&a).unwrap();
        let back: Attachment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn attachment_payload_serializes_as_base64_text() {
        let a = Attachment::new("x", "image/png", b"photo-bytes".to_vec());
        let value: serde_json::Value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["data"], "cGhvdG8tYnl0ZXM=");
    }

    #[test]
    fn corrupt_base64_degrades_to_empty_bytes() {
        let json = r#"{"name":"x","mime":"image/png","data":"%%% not base64 %%%"}"#;
        let a: Attachment = serde_json::from_str(json).unwrap();
        assert!(a.data.is_empty());
        assert_eq!(a.name, "x");
    }

    #[test]
    fn display_name_trims_and_defaults() {
        let blank = Attachment::new("   ", "", vec![1]);
        assert_eq!(blank.display_name(), DEFAULT_PHOTO_NAME);
        let named = Attachment::new("  Invert shot  ", "", vec![1]);
        assert_eq!(named.display_name(), "Invert shot");
    }

    #[test]
    fn site_record_defaults_are_empty() {
        let site = SiteRecord::default();
        assert!(site.photos.is_empty());
        assert!(site.diagram.is_none());
        assert_eq!(site.metrics.flow_meas_lps, 0.0);
    }

    #[test]
    fn metrics_flatten_onto_the_record() {
        let mut site = SiteRecord::default();
        site.metrics.flow_meas_lps = 12.5;
        let value = serde_json::to_value(&site).unwrap();
        assert_eq!(value["flow_meas_lps"], 12.5);
        assert!(value.get("metrics").is_none());
    }

    #[test]
    fn unknown_stored_fields_are_ignored() {
        // Old stored records may carry UI-only keys; loading must not fail.
        let json = r#"{"site_name":"MH-01","_filename":"x.json","legacy_field":true}"#;
        let site: SiteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(site.site_name, "MH-01");
    }
}
