//! End-to-end pipeline tests: record → metrics → PDF → bundle → store.
//!
//! These exercise the public crate surface the way the CLI does, checking
//! the rendered document with lopdf instead of eyeballing bytes.

use std::io::Cursor;

use flowsite::bundle::build_site_bundle;
use flowsite::config::ReportConfig;
use flowsite::hydraulics::recompute_metrics;
use flowsite::photos::content_hash;
use flowsite::report::{render_report, NoMap};
use flowsite::storage::ReportStore;
use flowsite::types::{Attachment, Reading, SiteRecord};

/// A small valid PNG, generated rather than checked in.
fn tiny_png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([120, 160, 90]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn commissioned_site(extra_readings: usize, photos: usize) -> SiteRecord {
    let mut site = SiteRecord::default();
    site.project_name = "Northside Catchment Study".to_string();
    site.client = "City Water".to_string();
    site.site_id = "FM-07".to_string();
    site.site_name = "MH-27 River Road".to_string();
    site.install_date = "2026-08-12".to_string();
    site.pipe_diameter_mm = 300.0;
    site.depth_check_meas_mm = 250.0;
    site.depth_check_meter_mm = 245.0;
    site.vel_check_meas_ms = 1.2;
    site.vel_check_meter_ms = 1.15;
    for i in 0..extra_readings {
        site.verification_readings.push(Reading {
            depth_meas_mm: 240.0,
            depth_meter_mm: 238.0,
            vel_meas_ms: 1.1,
            vel_meter_ms: 1.12,
            comment: format!("Reading {}", i + 1),
        });
    }
    for i in 0..photos {
        site.photos.push(Attachment::new(
            format!("Photo {}", i + 1),
            "image/png",
            tiny_png(40 + i as u32, 30),
        ));
    }
    site.diagram = Some(Attachment::new("Invert sketch", "image/png", tiny_png(60, 40)));
    site.metrics = recompute_metrics(&site);
    site
}

fn page_count(pdf: &[u8]) -> usize {
    lopdf::Document::load_mem(pdf).unwrap().get_pages().len()
}

#[test]
fn renders_a_loadable_pdf_with_photos_and_diagram() {
    let config = ReportConfig::default();
    let site = commissioned_site(2, 3);
    let pdf = render_report(&[site], &NoMap, &config).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(page_count(&pdf) >= 4);
}

#[test]
fn longer_reading_lists_produce_more_pages() {
    let config = ReportConfig::default();
    let short = render_report(&[commissioned_site(0, 0)], &NoMap, &config).unwrap();
    let long = render_report(&[commissioned_site(10, 0)], &NoMap, &config).unwrap();
    assert!(page_count(&long) > page_count(&short));
}

#[test]
fn multi_site_reports_concatenate_in_order() {
    let config = ReportConfig::default();
    let one = page_count(&render_report(&[commissioned_site(0, 0)], &NoMap, &config).unwrap());
    let both = render_report(
        &[commissioned_site(0, 0), commissioned_site(0, 0)],
        &NoMap,
        &config,
    )
    .unwrap();
    assert_eq!(page_count(&both), one * 2);
}

#[test]
fn bundle_round_trips_the_pdf_and_fingerprints_photos() {
    let config = ReportConfig::default();
    let site = commissioned_site(1, 2);
    let pdf = render_report(&[site.clone()], &NoMap, &config).unwrap();
    let bundle = build_site_bundle(&site, &pdf).unwrap();

    assert_eq!(bundle.bundle_version, 1);
    assert_eq!(bundle.pdf_bytes().unwrap(), pdf);

    // The metadata inventory carries the exact content hashes of the photos,
    // and no raw payloads.
    let photos_meta = bundle.site["photos_metadata"].as_array().unwrap();
    assert_eq!(photos_meta.len(), 2);
    for (meta, photo) in photos_meta.iter().zip(&site.photos) {
        assert_eq!(meta["sha256"], content_hash(&photo.data));
        assert_eq!(meta["size_bytes"], photo.data.len() as u64);
    }
    assert!(bundle.site.get("photos").is_none());
    assert!(bundle.site.get("diagram").is_none());
}

#[test]
fn stored_records_survive_the_full_cycle() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = ReportStore::new(dir.path());
    let site = commissioned_site(1, 1);

    let filename = store.save(&site).unwrap();
    let (reports, warnings) = store.load_all().unwrap();
    assert!(warnings.is_empty());
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].filename, filename);

    // Binary payloads came back byte-identical through the base64 codec.
    let loaded = &reports[0].site;
    assert_eq!(loaded.photos[0].data, site.photos[0].data);
    assert_eq!(
        loaded.diagram.as_ref().unwrap().data,
        site.diagram.as_ref().unwrap().data
    );

    // And the reloaded record still renders.
    let config = ReportConfig::default();
    let pdf = render_report(&[loaded.clone()], &NoMap, &config).unwrap();
    assert!(page_count(&pdf) >= 4);
}
