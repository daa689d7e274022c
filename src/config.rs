//! Report configuration module.
//!
//! Handles loading and validating `flowsite.toml`. Configuration covers the
//! branding drawn on every page (header bar, footer contact line), layout
//! values that field teams occasionally tune (label column width), and the
//! storage locations for records and bundles. The page geometry itself is
//! fixed — see [`crate::report::geometry`].
//!
//! ## Configuration options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [branding]
//! header_color = "#3d9991"   # Header band fill (hex RGB)
//! footer_line = "Environmental Data Services - www.e-d-s.com.au | 1300 721 683"
//!
//! [layout]
//! label_width_mm = 35.0      # Key/value label column width
//!
//! [storage]
//! reports_dir = "data/reports"   # Stored record files
//! base_folder = "reports"        # Bundle path prefix
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Report configuration loaded from `flowsite.toml`.
///
/// All fields have sensible defaults; user files need only specify overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub branding: BrandingConfig,
    pub layout: LayoutConfig,
    pub storage: StorageConfig,
}

/// Branding drawn on every page of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrandingConfig {
    /// Header band fill color as `#rrggbb`.
    pub header_color: String,
    /// Left-hand footer text (company / contact line).
    pub footer_line: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            header_color: "#3d9991".to_string(),
            footer_line: "Environmental Data Services - www.e-d-s.com.au | 1300 721 683"
                .to_string(),
        }
    }
}

/// Layout values overridable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Label column width for key/value rows, in millimetres.
    pub label_width_mm: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_width_mm: 35.0,
        }
    }
}

/// Storage locations for records and bundles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding stored record JSON files.
    pub reports_dir: String,
    /// Path prefix for derived bundle locations.
    pub base_folder: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            reports_dir: "data/reports".to_string(),
            base_folder: crate::storage::DEFAULT_BASE_FOLDER.to_string(),
        }
    }
}

impl ReportConfig {
    /// Load from a TOML file, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_hex_color(&self.branding.header_color).ok_or_else(|| {
            ConfigError::Validation(format!(
                "branding.header_color '{}' must look like '#3d9991'",
                self.branding.header_color
            ))
        })?;
        if !(10.0..=80.0).contains(&self.layout.label_width_mm) {
            return Err(ConfigError::Validation(
                "layout.label_width_mm must be between 10 and 80".into(),
            ));
        }
        Ok(())
    }

    /// Header band color as RGB components in 0..=1, for the PDF writer.
    pub fn header_rgb(&self) -> (f32, f32, f32) {
        // Validated at load; the default covers hand-built configs.
        parse_hex_color(&self.branding.header_color).unwrap_or((0.24, 0.6, 0.57))
    }
}

/// Parse `#rrggbb` into unit-range RGB components.
fn parse_hex_color(text: &str) -> Option<(f32, f32, f32)> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
    ))
}

/// Stock `flowsite.toml` with every option documented, for `gen-config`.
pub fn stock_config_toml() -> String {
    r##"# flowsite configuration
# All options are optional - defaults shown below.

[branding]
# Header band fill color (hex RGB)
header_color = "#3d9991"
# Left-hand footer text on every page
footer_line = "Environmental Data Services - www.e-d-s.com.au | 1300 721 683"

[layout]
# Label column width for key/value rows, in millimetres
label_width_mm = 35.0

[storage]
# Directory holding stored record JSON files
reports_dir = "data/reports"
# Path prefix for derived bundle locations
base_folder = "reports"
"##
    .to_string()
}
