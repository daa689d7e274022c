//! Per-site section rendering: the cursor state machine of pass one.
//!
//! One [`SiteRenderer`] walks a site's sections top to bottom, tracking a
//! cursor `y` inside the fixed page coordinate space. Every titled section
//! (and every item of the unbounded reading and photo lists) first asks
//! [`SiteRenderer::ensure_space`] whether its bounded space estimate still
//! fits above the minimum content line; if not, the footer is emitted, a new
//! page starts, the header is redrawn and the cursor resets. An arbitrarily
//! long reading list therefore spans as many pages as needed without any
//! single item splitting across a boundary — only its own word-wrapped text
//! lines advance the cursor within an item.
//!
//! ## Collaborators
//!
//! The optional static location map is produced by a [`MapProvider`]. The
//! renderer never sees a map failure — the provider returns `None` and the
//! map section is simply omitted, the same way an undecodable diagram or
//! photo skips its own block.

use super::geometry::*;
use super::page::{DrawOp, PageBuffer};
use crate::config::ReportConfig;
use crate::types::{Attachment, SiteRecord};

/// Source of the static site-location map image (PNG/JPEG bytes).
///
/// Implementations live at the application boundary (tile fetchers, cached
/// files); the core only consumes the optional result.
pub trait MapProvider {
    fn site_map(&self, lat: &str, lon: &str) -> Option<Vec<u8>>;
}

/// Provider used when no map source is configured: every site renders
/// without a location map section.
pub struct NoMap;

impl MapProvider for NoMap {
    fn site_map(&self, _lat: &str, _lon: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Space estimates used by the page-break policy, in points.
mod space {
    use super::MM;
    pub const SECTION: f64 = 30.0 * MM;
    pub const READING: f64 = 25.0 * MM;
    pub const FLOW: f64 = 25.0 * MM;
    pub const CALIBRATION: f64 = 35.0 * MM;
    pub const CHECKLIST: f64 = 15.0 * MM;
    pub const MAP_HEIGHT: f64 = 60.0 * MM;
    pub const DIAGRAM_HEIGHT: f64 = 70.0 * MM;
    pub const PHOTO_HEIGHT: f64 = 55.0 * MM;
    pub const REPORTING: f64 = 60.0 * MM;
    pub const PHOTO_FLOOR: f64 = 25.0 * MM;
}

/// Renders one site's full page sequence into a shared [`PageBuffer`].
pub(crate) struct SiteRenderer<'a> {
    site: &'a SiteRecord,
    config: &'a ReportConfig,
    buffer: &'a mut PageBuffer,
    y: f64,
    label_width: f64,
}

impl<'a> SiteRenderer<'a> {
    pub fn new(site: &'a SiteRecord, config: &'a ReportConfig, buffer: &'a mut PageBuffer) -> Self {
        Self {
            site,
            config,
            buffer,
            y: PAGE_HEIGHT - HEADER_CONTENT_OFFSET,
            label_width: config.layout.label_width_mm * MM,
        }
    }

    /// Render every section of the site, sealing complete pages into the
    /// buffer as it goes.
    pub fn render(mut self, maps: &dyn MapProvider) {
        self.main_page();
        self.commissioning_pages();
        self.diagram_and_reporting_pages(maps);
        self.photo_pages();
    }

    // =========================================================================
    // Page chrome
    // =========================================================================

    fn start_page(&mut self) {
        let bar_bottom = PAGE_HEIGHT - HEADER_BAR_HEIGHT;
        self.buffer.push(DrawOp::Rect {
            x: 0.0,
            y: bar_bottom,
            w: PAGE_WIDTH,
            h: HEADER_BAR_HEIGHT,
            rgb: self.config.header_rgb(),
        });
        self.text_at(
            BAND_MARGIN,
            bar_bottom + 5.0 * MM,
            HEADER_FONT_SIZE,
            true,
            1.0,
            truncate_caption(&self.site.project_name, 80),
        );
        let right = format!("{} - {}", self.site.site_id, self.site.site_name);
        let right = right.trim_matches([' ', '-']).to_string();
        if !right.is_empty() {
            let x = PAGE_WIDTH - BAND_MARGIN - text_width(&right, 10.0);
            self.text_at(x, bar_bottom + 5.0 * MM, 10.0, false, 1.0, right);
        }
        self.y = PAGE_HEIGHT - HEADER_CONTENT_OFFSET;
    }

    fn finish_page(&mut self) {
        self.text_at(
            BAND_MARGIN,
            FOOTER_Y,
            FOOTER_FONT_SIZE,
            false,
            0.3,
            self.config.branding.footer_line.clone(),
        );
        let client = truncate_caption(&self.site.client, 40);
        let site = truncate_caption(&self.site.site_name, 40);
        let right = format!("Client: {client} | Site: {site}");
        let x = PAGE_WIDTH - BAND_MARGIN - text_width(&right, FOOTER_FONT_SIZE);
        self.text_at(x, FOOTER_Y, FOOTER_FONT_SIZE, false, 0.3, right);
        self.buffer.break_page();
    }

    /// The page-break policy: force a break when the estimated space for the
    /// upcoming block would push the cursor below the minimum content line.
    fn ensure_space(&mut self, needed: f64) {
        if self.y - needed < MIN_CONTENT_Y {
            self.finish_page();
            self.start_page();
        }
    }

    // =========================================================================
    // Drawing primitives
    // =========================================================================

    fn text_at(&mut self, x: f64, y: f64, size: f64, bold: bool, gray: f64, text: String) {
        if text.is_empty() {
            return;
        }
        self.buffer.push(DrawOp::Text {
            x,
            y,
            size,
            bold,
            gray,
            text,
        });
    }

    fn section_title(&mut self, title: &str) {
        self.text_at(
            MARGIN,
            self.y,
            TITLE_FONT_SIZE,
            true,
            0.1,
            title.to_string(),
        );
        self.buffer.push(DrawOp::Line {
            x1: MARGIN,
            y1: self.y - 2.0,
            x2: MARGIN + MAX_TEXT_WIDTH,
            y2: self.y - 2.0,
            width: 0.6,
            gray: 0.6,
        });
        self.y -= LINE_HEIGHT * 1.5;
    }

    /// A key/value row: bold label column, wrapped value text.
    fn kv(&mut self, label: &str, value: &str) {
        self.kv_at(label, value, MARGIN, self.label_width);
    }

    fn kv_at(&mut self, label: &str, value: &str, x: f64, label_width: f64) {
        let text_x = if label.is_empty() {
            x + 5.0 * MM
        } else {
            self.text_at(
                x,
                self.y,
                BODY_FONT_SIZE,
                true,
                0.1,
                format!("{label}:"),
            );
            x + label_width
        };

        let max_text_width = MAX_TEXT_WIDTH - (text_x - x);
        let lines = wrap_text(value, BODY_FONT_SIZE, max_text_width);
        if lines.is_empty() {
            self.y -= LINE_HEIGHT;
            return;
        }
        for line in lines {
            self.text_at(text_x, self.y, BODY_FONT_SIZE, false, 0.0, line);
            self.y -= LINE_HEIGHT;
        }
        self.y -= 0.3 * LINE_HEIGHT;
    }

    /// Scaled, centered image with a caption below. Returns false (drawing
    /// nothing) when the payload cannot be decoded.
    fn image_block(&mut self, data: &[u8], caption: Option<&str>, max_height: f64) -> bool {
        let Ok(decoded) = image::load_from_memory(data) else {
            return false;
        };
        let intrinsic = (decoded.width(), decoded.height());
        let max_w = PAGE_WIDTH - 2.0 * MARGIN;
        let (w, h) = fit_into_box(intrinsic, max_w, max_height);
        if w <= 0.0 || h <= 0.0 {
            return false;
        }
        let x = MARGIN + (max_w - w) / 2.0;
        self.buffer.push(DrawOp::Image {
            x,
            y: self.y - h,
            w,
            h,
            data: data.to_vec(),
        });
        if let Some(caption) = caption {
            let cx = x + w / 2.0 - text_width(caption, CAPTION_FONT_SIZE) / 2.0;
            self.text_at(
                cx,
                self.y - h - 3.0 * MM,
                CAPTION_FONT_SIZE,
                false,
                0.0,
                caption.to_string(),
            );
        }
        self.y -= h + 10.0 * MM;
        true
    }

    // =========================================================================
    // Sections 1-3: project, location, pipe
    // =========================================================================

    fn main_page(&mut self) {
        let s = self.site;
        self.start_page();

        self.section_title("1. Project");
        self.kv("Client", &s.client);
        self.kv("Catchment", &s.catchment);
        self.kv(
            "Install date/time",
            &format!("{} {}", s.install_date, s.install_time),
        );
        self.kv(
            "Asset IDs",
            &format!(
                "Client asset ID: {}  |  GIS ID: {}",
                s.client_asset_id, s.gis_id
            ),
        );
        self.kv("GPS", &format!("Lat {}  |  Lon {}", s.gps_lat, s.gps_lon));
        if !s.site_address.is_empty() {
            self.kv("Site address", &s.site_address);
        }
        self.y -= LINE_HEIGHT * 0.5;

        self.section_title("2. Manhole, Location & Safety");
        self.kv("Location description", &s.manhole_location_desc);
        self.kv(
            "Access / permits",
            &format!(
                "{} | Confined space: {}; Traffic control: {}",
                s.access_type,
                yes_no(s.confined_space_required),
                yes_no(s.traffic_control_required)
            ),
        );
        self.kv("Safety constraints", &s.access_safety_constraints);
        if !s.other_permits_required.is_empty() {
            self.kv("Other permits", &s.other_permits_required);
        }
        self.y -= LINE_HEIGHT * 0.5;

        self.section_title("3. Pipe & Hydraulic Assessment");
        self.kv(
            "Pipe",
            &format!(
                "{} mm, {}, {}",
                num(s.pipe_diameter_mm),
                s.pipe_material,
                s.pipe_shape
            ),
        );
        let mut depths = format!("Invert depth: {} mm", num(s.depth_to_invert_mm));
        if s.depth_to_soffit_mm > 0.0 {
            depths.push_str(&format!("; Soffit: {} mm", num(s.depth_to_soffit_mm)));
        }
        self.kv("Depths", &depths);
        self.kv("Upstream config", &s.upstream_config);
        self.kv("Downstream config", &s.downstream_config);
        self.kv(
            "Hydraulics (1)",
            &format!(
                "Turbulence: {} | Drops near meter: {}; Bends near meter: {}; Junctions within 5D: {}",
                s.hydro_turbulence_level,
                yes_no(s.hydro_drops),
                yes_no(s.hydro_bends),
                yes_no(s.hydro_junctions)
            ),
        );
        self.kv(
            "Hydraulics (2)",
            &format!(
                "Surcharge risk: {}; Backwater risk: {}",
                yes_no(s.hydro_surcharge_risk),
                yes_no(s.hydro_backwater_risk)
            ),
        );
        self.kv("Hydraulic comments", &s.hydraulic_notes);

        self.finish_page();
    }

    // =========================================================================
    // Sections 4-8: meter config, commissioning, flow, calibration
    // =========================================================================

    fn commissioning_pages(&mut self) {
        let s = self.site;
        self.start_page();

        self.section_title("4. Meter, Sensor & Configuration");
        self.kv("Meter model", &s.meter_model);
        self.kv("Logger serial", &s.logger_serial);
        self.kv("Sensor serial", &s.sensor_serial);
        self.kv(
            "Sensor position",
            &format!(
                "{} m from manhole; Orientation: {}; Mount: {}",
                num(s.sensor_distance_from_manhole_m),
                s.sensor_orientation,
                s.sensor_mount_type
            ),
        );
        self.kv("Datum reference", &s.datum_reference_desc);
        self.kv(
            "Ranges",
            &format!(
                "Level range: {}-{} mm; Velocity range: {}-{} m/s",
                num(s.level_range_min_mm),
                num(s.level_range_max_mm),
                num(s.velocity_range_min_ms),
                num(s.velocity_range_max_ms)
            ),
        );
        self.kv("Output scaling", &s.output_scaling_desc);
        self.kv(
            "Telemetry (1)",
            &format!(
                "Comms: {}; Logger ID: {}",
                s.comms_method, s.telemetry_logger_id
            ),
        );
        self.kv(
            "Telemetry (2)",
            &format!(
                "Platform: {}; Notes: {}",
                s.telemetry_server, s.telemetry_notes
            ),
        );
        self.kv(
            "Logging",
            &format!(
                "Logging interval: {} min; Time zone: {}",
                num(s.logging_interval_min),
                s.timezone
            ),
        );
        self.y -= LINE_HEIGHT * 0.5;

        self.ensure_space(space::SECTION);
        self.section_title("5. Commissioning Checks");
        self.kv(
            "Depth",
            &format!(
                "Measured: {} mm, Meter: {} mm, Diff: {} mm, Within tolerance: {}",
                num(s.depth_check_meas_mm),
                num(s.depth_check_meter_mm),
                num(s.depth_check_diff_mm),
                s.depth_check_within_tol
            ),
        );
        self.kv(
            "Velocity",
            &format!(
                "Measured: {} m/s, Meter: {} m/s, Diff: {} m/s",
                num(s.vel_check_meas_ms),
                num(s.vel_check_meter_ms),
                num(s.vel_check_diff_ms)
            ),
        );
        self.kv(
            "Comms",
            &format!("{} at {}", s.comms_verified, s.comms_verified_at),
        );
        self.kv(
            "Zero-depth check",
            &format!(
                "Zero-depth check performed: {}; Notes: {}",
                yes_no(s.zero_depth_check_done),
                s.zero_depth_check_notes
            ),
        );
        self.kv(
            "Reference check",
            &format!(
                "Reference device: {} ({}); Comparison: {}",
                s.reference_device_type, s.reference_device_id, s.reference_reading_desc
            ),
        );

        self.verification_readings();
        self.flow_section();
        self.calibration_section();

        self.finish_page();
    }

    /// The unbounded list: re-check the break policy before every reading so
    /// the list spans pages without splitting any single reading.
    fn verification_readings(&mut self) {
        let readings = &self.site.verification_readings;
        if readings.is_empty() {
            return;
        }
        self.y -= LINE_HEIGHT * 0.5;
        self.ensure_space(space::SECTION);
        self.section_title("6. Additional Verification Readings");

        let indent = MARGIN + 8.0 * MM;
        for (i, r) in readings.iter().enumerate() {
            self.ensure_space(space::READING);
            self.kv(&format!("Test {}", i + 1), "");
            self.kv_at(
                "Depth",
                &format!(
                    "Measured {} mm / Meter {} mm",
                    num(r.depth_meas_mm),
                    num(r.depth_meter_mm)
                ),
                indent,
                self.label_width,
            );
            self.kv_at(
                "Velocity",
                &format!(
                    "Measured {} m/s / Meter {} m/s",
                    num(r.vel_meas_ms),
                    num(r.vel_meter_ms)
                ),
                indent,
                self.label_width,
            );
            if !r.comment.is_empty() {
                self.kv_at("Notes", &r.comment, indent, self.label_width);
            }
            self.y -= LINE_HEIGHT * 0.4;
        }
    }

    fn flow_section(&mut self) {
        let m = &self.site.metrics;

        let flow_meas = if m.flow_meas_lps != 0.0 {
            format!(
                "{:.2} L/s (Avg depth {:.1} mm, Avg velocity {:.2} m/s)",
                m.flow_meas_lps, m.avg_depth_meas_mm, m.avg_vel_meas_ms
            )
        } else {
            "N/A".to_string()
        };
        let flow_meter = if m.flow_meter_lps != 0.0 {
            format!(
                "{:.2} L/s (Avg depth {:.1} mm, Avg velocity {:.2} m/s)",
                m.flow_meter_lps, m.avg_depth_meter_mm, m.avg_vel_meter_ms
            )
        } else {
            "N/A".to_string()
        };
        let flow_diff = if m.flow_meas_lps != 0.0 || m.flow_meter_lps != 0.0 {
            format!("{:.2} L/s ({:.1} %)", m.flow_diff_lps, m.flow_diff_percent)
        } else {
            "N/A".to_string()
        };

        self.y -= LINE_HEIGHT * 0.5;
        self.ensure_space(space::FLOW);
        self.section_title("7. Flow (for model calibration)");
        self.kv("Flow (manual)", &flow_meas);
        self.kv("Flow (meter)", &flow_meter);
        self.kv("Difference", &flow_diff);
        self.y -= LINE_HEIGHT * 0.5;
    }

    fn calibration_section(&mut self) {
        let s = self.site;
        self.ensure_space(space::CALIBRATION);
        self.section_title("8. Calibration Suitability & Modelling Notes");
        self.kv("Overall rating", &s.calibration_rating);
        self.kv("Suitability comment", &s.calibration_comment);
        self.kv("Modelling notes", &s.modelling_notes);
        self.kv("Data quality risks", &s.data_quality_risks);
        self.y -= LINE_HEIGHT * 0.5;

        let mut flags: Vec<&str> = Vec::new();
        if s.chk_sensor_in_main_flow {
            flags.push("Sensor in main flow path");
        }
        if s.chk_no_immediate_drops {
            flags.push("No immediate drops / turbulence at sensor");
        }
        if s.chk_depth_range_ok {
            flags.push("Depth/velocity ranges suitable");
        }
        if s.chk_logging_started {
            flags.push("Logging started and confirmed");
        }
        if s.chk_comms_checked_platform {
            flags.push("Comms/data visible on platform");
        }
        let checklist = if flags.is_empty() {
            "Not recorded".to_string()
        } else {
            flags.join("; ")
        };
        self.ensure_space(space::CHECKLIST);
        self.kv_at("Installer checklist", &checklist, MARGIN, 40.0 * MM);
        self.y -= LINE_HEIGHT * 0.5;
    }

    // =========================================================================
    // Sections 9+: diagram, map, reporting
    // =========================================================================

    fn diagram_and_reporting_pages(&mut self, maps: &dyn MapProvider) {
        let s = self.site;
        self.start_page();
        let mut section_idx = 9;

        if let Some(diagram) = &s.diagram {
            if diagram.has_payload() {
                self.section_title(&format!("{section_idx}. Manhole / Site Diagram"));
                section_idx += 1;
                let caption = truncate_caption(diagram.display_name(), DIAGRAM_CAPTION_CHARS);
                self.image_block(&diagram.data, Some(&caption), space::DIAGRAM_HEIGHT);
            }
        }

        if let Some(map_bytes) = maps.site_map(&s.gps_lat, &s.gps_lon) {
            self.ensure_space(space::MAP_HEIGHT);
            self.section_title(&format!("{section_idx}. Site location map"));
            section_idx += 1;
            self.image_block(&map_bytes, None, space::MAP_HEIGHT);
        }

        if self.y < space::REPORTING {
            self.finish_page();
            self.start_page();
        }
        self.section_title(&format!("{section_idx}. Reporting"));
        self.kv_at(
            "",
            &format!(
                "Prepared by: {} ({}) on {}",
                s.prepared_by, s.prepared_position, s.prepared_date
            ),
            MARGIN,
            5.0 * MM,
        );
        self.kv_at(
            "",
            &format!(
                "Reviewed by: {} ({}) on {}",
                s.reviewed_by, s.reviewed_position, s.reviewed_date
            ),
            MARGIN,
            5.0 * MM,
        );

        self.finish_page();
    }

    // =========================================================================
    // Photo pages
    // =========================================================================

    fn photo_pages(&mut self) {
        let photos: Vec<&Attachment> = self
            .site
            .photos
            .iter()
            .filter(|p| p.has_payload())
            .collect();
        if photos.is_empty() {
            return;
        }

        self.start_page();
        self.photo_heading(true);

        for photo in photos {
            if self.y - space::PHOTO_HEIGHT < space::PHOTO_FLOOR {
                self.finish_page();
                self.start_page();
                self.photo_heading(false);
            }
            let caption = truncate_caption(photo.display_name(), PHOTO_CAPTION_CHARS);
            self.image_block(&photo.data, Some(&caption), space::PHOTO_HEIGHT);
        }

        self.finish_page();
    }

    fn photo_heading(&mut self, first: bool) {
        let title = if first {
            "Site Photos"
        } else {
            "Site Photos (continued)"
        };
        self.text_at(
            MARGIN,
            self.y,
            TITLE_FONT_SIZE,
            true,
            0.0,
            title.to_string(),
        );
        self.y -= LINE_HEIGHT * 2.0;
    }
}

/// "Yes"/"No" for checklist booleans.
fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Display form of a numeric field: blank when unset, no trailing `.0` for
/// whole values.
fn num(value: f64) -> String {
    if value == 0.0 {
        String::new()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
