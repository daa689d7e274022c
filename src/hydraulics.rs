//! Pure hydraulic calculations for partially full circular pipes.
//!
//! All functions here are pure and testable without any I/O. Inputs arrive in
//! the units the field crew records them in — depths in millimetres,
//! velocities in metres per second, pipe diameter in millimetres — and flows
//! come out in litres per second.
//!
//! ## Degenerate inputs
//!
//! Nothing in this module returns an error. Zero or negative diameters and
//! depths resolve to a zero wetted area; an empty reading channel averages to
//! zero; a zero measured flow pins the percent difference at zero rather than
//! dividing by it. Missing field data degrades a report, it never aborts one.
//!
//! ## Known limitation
//!
//! The wetted-area formula assumes a circular pipe. Egg, oviform and box
//! sections are recorded in the pipe description but their flow estimates use
//! the circular model.

use crate::types::{DerivedFlowMetrics, Reading, SiteRecord};

/// Wetted cross-sectional area of a partially full circular pipe, in m².
///
/// Uses the circular-segment formula for partial fill; a depth at or above
/// the diameter clamps to the full-pipe area (surcharged pipes run full, they
/// do not grow).
///
/// # Examples
/// ```
/// # use flowsite::hydraulics::wetted_area_circular_m2;
/// // Full 300 mm pipe: exactly pi * r^2 with r in metres
/// let full = wetted_area_circular_m2(300.0, 300.0);
/// assert!((full - std::f64::consts::PI * 0.15 * 0.15).abs() < 1e-12);
///
/// // Half-full pipe is half the full area
/// let half = wetted_area_circular_m2(150.0, 300.0);
/// assert!((half - full / 2.0).abs() < 1e-12);
/// ```
pub fn wetted_area_circular_m2(depth_mm: f64, diameter_mm: f64) -> f64 {
    if diameter_mm <= 0.0 || depth_mm <= 0.0 {
        return 0.0;
    }

    let d = diameter_mm / 1000.0;
    let r = d / 2.0;
    let h = depth_mm / 1000.0;

    if h >= d {
        return std::f64::consts::PI * r * r;
    }

    // Circular segment: r^2*acos((r-h)/r) - (r-h)*sqrt(2rh - h^2)
    r * r * ((r - h) / r).acos() - (r - h) * (2.0 * r * h - h * h).max(0.0).sqrt()
}

/// Arithmetic mean of the collected values, or 0 when none were collected.
fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Collect the strictly positive values for one channel: the primary value
/// plus each extra reading's value selected by `pick`.
fn collect_channel(primary: f64, extras: &[Reading], pick: impl Fn(&Reading) -> f64) -> Vec<f64> {
    let mut values = Vec::with_capacity(1 + extras.len());
    if primary > 0.0 {
        values.push(primary);
    }
    values.extend(extras.iter().map(&pick).filter(|v| *v > 0.0));
    values
}

/// Average all depth/velocity readings and derive the two flow estimates.
///
/// Each of the four channels (measured depth, meter depth, measured velocity,
/// meter velocity) is averaged independently over its strictly positive
/// values, so a reading can contribute to depth averaging but not velocity
/// averaging. Flow is the wetted area at the averaged depth times the
/// averaged velocity, scaled to L/s.
///
/// The percent difference divides by the *measured* flow — an intentional
/// asymmetry: the manual reference reading is the yardstick the meter is
/// judged against. When the measured flow is zero the percent is reported as
/// zero.
pub fn flow_summary(
    pipe_diameter_mm: f64,
    depth_primary_meas: f64,
    depth_primary_meter: f64,
    vel_primary_meas: f64,
    vel_primary_meter: f64,
    extra_readings: &[Reading],
) -> DerivedFlowMetrics {
    let avg_depth_meas_mm = average(&collect_channel(depth_primary_meas, extra_readings, |r| {
        r.depth_meas_mm
    }));
    let avg_depth_meter_mm = average(&collect_channel(depth_primary_meter, extra_readings, |r| {
        r.depth_meter_mm
    }));
    let avg_vel_meas_ms = average(&collect_channel(vel_primary_meas, extra_readings, |r| {
        r.vel_meas_ms
    }));
    let avg_vel_meter_ms = average(&collect_channel(vel_primary_meter, extra_readings, |r| {
        r.vel_meter_ms
    }));

    let area_meas = wetted_area_circular_m2(avg_depth_meas_mm, pipe_diameter_mm);
    let area_meter = wetted_area_circular_m2(avg_depth_meter_mm, pipe_diameter_mm);

    let flow_meas_lps = area_meas * avg_vel_meas_ms * 1000.0;
    let flow_meter_lps = area_meter * avg_vel_meter_ms * 1000.0;
    let flow_diff_lps = flow_meter_lps - flow_meas_lps;
    let flow_diff_percent = if flow_meas_lps != 0.0 {
        flow_diff_lps / flow_meas_lps * 100.0
    } else {
        0.0
    };

    DerivedFlowMetrics {
        avg_depth_meas_mm,
        avg_depth_meter_mm,
        avg_vel_meas_ms,
        avg_vel_meter_ms,
        flow_meas_lps,
        flow_meter_lps,
        flow_diff_lps,
        flow_diff_percent,
    }
}

/// Derive metrics from a record's commissioning checks and extra readings.
///
/// The primary pair comes from the commissioning check fields; every entry in
/// `verification_readings` supplements it. Callers assign the result to
/// `site.metrics` — this function never mutates the record.
pub fn recompute_metrics(site: &SiteRecord) -> DerivedFlowMetrics {
    flow_summary(
        site.pipe_diameter_mm,
        site.depth_check_meas_mm,
        site.depth_check_meter_mm,
        site.vel_check_meas_ms,
        site.vel_check_meter_ms,
        &site.verification_readings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(d_meas: f64, d_meter: f64, v_meas: f64, v_meter: f64) -> Reading {
        Reading {
            depth_meas_mm: d_meas,
            depth_meter_mm: d_meter,
            vel_meas_ms: v_meas,
            vel_meter_ms: v_meter,
            comment: String::new(),
        }
    }

    // =========================================================================
    // wetted_area_circular_m2
    // =========================================================================

    #[test]
    fn full_pipe_is_exactly_pi_r_squared() {
        let area = wetted_area_circular_m2(300.0, 300.0);
        let r = 300.0 / 2000.0;
        assert_eq!(area, std::f64::consts::PI * r * r);
    }

    #[test]
    fn overfull_depth_clamps_to_full_area() {
        let full = wetted_area_circular_m2(300.0, 300.0);
        let surcharged = wetted_area_circular_m2(450.0, 300.0);
        assert_eq!(surcharged, full);
    }

    #[test]
    fn zero_diameter_gives_zero_area() {
        assert_eq!(wetted_area_circular_m2(100.0, 0.0), 0.0);
        assert_eq!(wetted_area_circular_m2(100.0, -300.0), 0.0);
    }

    #[test]
    fn zero_depth_gives_zero_area() {
        assert_eq!(wetted_area_circular_m2(0.0, 300.0), 0.0);
        assert_eq!(wetted_area_circular_m2(-5.0, 300.0), 0.0);
    }

    #[test]
    fn half_full_is_half_of_full() {
        let full = wetted_area_circular_m2(300.0, 300.0);
        let half = wetted_area_circular_m2(150.0, 300.0);
        assert!((half - full / 2.0).abs() < 1e-12);
    }

    #[test]
    fn partial_area_grows_with_depth() {
        let shallow = wetted_area_circular_m2(50.0, 300.0);
        let deeper = wetted_area_circular_m2(150.0, 300.0);
        assert!(shallow > 0.0);
        assert!(deeper > shallow);
    }

    // =========================================================================
    // flow_summary averaging
    // =========================================================================

    #[test]
    fn averages_exclude_non_positive_values_per_channel() {
        // Primary depth missing, one extra reading with depth 250:
        // the average is 250, not 125.
        let extras = vec![reading(250.0, 0.0, 0.0, 0.0)];
        let m = flow_summary(300.0, 0.0, 0.0, 0.0, 0.0, &extras);
        assert_eq!(m.avg_depth_meas_mm, 250.0);
    }

    #[test]
    fn channels_average_independently() {
        // The extra reading has a depth but no velocity, the primary has a
        // velocity but no depth. Both channels still resolve.
        let extras = vec![reading(200.0, 0.0, 0.0, 0.0)];
        let m = flow_summary(300.0, 0.0, 0.0, 1.0, 0.0, &extras);
        assert_eq!(m.avg_depth_meas_mm, 200.0);
        assert_eq!(m.avg_vel_meas_ms, 1.0);
    }

    #[test]
    fn primary_and_extras_average_together() {
        let extras = vec![reading(200.0, 0.0, 0.0, 0.0), reading(300.0, 0.0, 0.0, 0.0)];
        let m = flow_summary(400.0, 100.0, 0.0, 0.0, 0.0, &extras);
        assert_eq!(m.avg_depth_meas_mm, 200.0);
    }

    #[test]
    fn empty_channels_average_to_zero() {
        let m = flow_summary(300.0, 0.0, 0.0, 0.0, 0.0, &[]);
        assert_eq!(m.avg_depth_meas_mm, 0.0);
        assert_eq!(m.flow_meas_lps, 0.0);
        assert_eq!(m.flow_diff_percent, 0.0);
    }

    // =========================================================================
    // flow and difference
    // =========================================================================

    #[test]
    fn percent_difference_is_zero_when_measured_flow_is_zero() {
        // Meter-only readings: measured flow is 0, so the percent stays 0
        // regardless of the meter's flow.
        let m = flow_summary(300.0, 0.0, 245.0, 0.0, 1.15, &[]);
        assert!(m.flow_meter_lps > 0.0);
        assert_eq!(m.flow_meas_lps, 0.0);
        assert_eq!(m.flow_diff_percent, 0.0);
    }

    #[test]
    fn commissioning_scenario_produces_consistent_flows() {
        // D=300mm, measured 250mm @ 1.2 m/s, meter 245mm @ 1.15 m/s
        let m = flow_summary(300.0, 250.0, 245.0, 1.2, 1.15, &[]);
        assert!(m.flow_meas_lps > 0.0);
        assert!(m.flow_meter_lps > 0.0);
        assert!((m.flow_diff_lps - (m.flow_meter_lps - m.flow_meas_lps)).abs() < 1e-12);
        let expected_pct = m.flow_diff_lps / m.flow_meas_lps * 100.0;
        assert!((m.flow_diff_percent - expected_pct).abs() < 1e-12);
    }

    #[test]
    fn flow_matches_area_times_velocity() {
        let m = flow_summary(300.0, 150.0, 0.0, 2.0, 0.0, &[]);
        let area = wetted_area_circular_m2(150.0, 300.0);
        assert!((m.flow_meas_lps - area * 2.0 * 1000.0).abs() < 1e-12);
    }

    // =========================================================================
    // recompute_metrics
    // =========================================================================

    #[test]
    fn recompute_reads_commissioning_fields_and_extras() {
        let mut site = SiteRecord::default();
        site.pipe_diameter_mm = 300.0;
        site.depth_check_meas_mm = 250.0;
        site.depth_check_meter_mm = 245.0;
        site.vel_check_meas_ms = 1.2;
        site.vel_check_meter_ms = 1.15;
        site.verification_readings.push(reading(240.0, 250.0, 1.1, 1.2));

        let m = recompute_metrics(&site);
        assert_eq!(m.avg_depth_meas_mm, 245.0);
        assert_eq!(m.avg_depth_meter_mm, 247.5);
        assert!(m.flow_meas_lps > 0.0);
    }
}
