//! Pass two: turn finalized page snapshots into PDF bytes with `lopdf`.
//!
//! Every page carries its own resource dictionary naming Helvetica regular
//! and bold (the base-14 fonts F1/F2, one shared font object each) and gets
//! its own content stream built operation by operation from the page's
//! [`DrawOp`]s. Images are attached after page creation through lopdf's
//! XObject embedding, which merges into the page's resources; a payload
//! lopdf cannot embed is dropped from the page rather than failing the
//! document.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::geometry::{PAGE_HEIGHT, PAGE_WIDTH};
use super::page::{DrawOp, PageSnapshot};
use super::ReportError;

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Assemble the finalized pages into a complete PDF document.
pub(crate) fn write_pdf(pages: &[PageSnapshot]) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let mut page_ids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        // Fonts go in page-level Resources, not the Pages node: insert_image
        // adds a page-level Resources dict for its XObject, and a page-level
        // dict fully shadows the inherited one. Starting each page with its
        // own Font entry lets the XObject merge in beside it.
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => regular_id,
                    "F2" => bold_id,
                },
            },
        });

        for op in &page.ops {
            if let DrawOp::Image { x, y, w, h, data } = op {
                // Unsupported or truncated image data: leave the slot blank.
                if let Ok(stream) = lopdf::xobject::image_from(data.clone()) {
                    let _ = doc.insert_image(
                        page_id,
                        stream,
                        (*x as f32, *y as f32),
                        (*w as f32, *h as f32),
                    );
                }
            }
        }

        page_ids.push(page_id.into());
    }

    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(lopdf::Error::IO)?;
    Ok(bytes)
}

/// Content stream for one page. Image ops are handled separately at the
/// document level, since embedding needs the page object to exist.
fn page_content(page: &PageSnapshot) -> Content {
    let mut ops: Vec<Operation> = Vec::new();
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                bold,
                gray,
                text,
            } => {
                let font = if *bold { "F2" } else { "F1" };
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![font.into(), real(*size)]));
                ops.push(Operation::new("g", vec![real(*gray)]));
                ops.push(Operation::new("Td", vec![real(*x), real(*y)]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(sanitize(text))],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                gray,
            } => {
                ops.push(Operation::new("w", vec![real(*width)]));
                ops.push(Operation::new("G", vec![real(*gray)]));
                ops.push(Operation::new("m", vec![real(*x1), real(*y1)]));
                ops.push(Operation::new("l", vec![real(*x2), real(*y2)]));
                ops.push(Operation::new("S", vec![]));
            }
            DrawOp::Rect { x, y, w, h, rgb } => {
                ops.push(Operation::new(
                    "rg",
                    vec![
                        Object::Real(rgb.0),
                        Object::Real(rgb.1),
                        Object::Real(rgb.2),
                    ],
                ));
                ops.push(Operation::new(
                    "re",
                    vec![real(*x), real(*y), real(*w), real(*h)],
                ));
                ops.push(Operation::new("f", vec![]));
            }
            DrawOp::Image { .. } => {}
        }
    }
    Content { operations: ops }
}

/// Restrict literal strings to the printable ASCII the embedded base-14
/// fonts cover; anything outside becomes `?`.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}
