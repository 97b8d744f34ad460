//! PDF serialisation of laid-out reports

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeSet;

use crate::document::ReportDocument;
use crate::error::{ReportError, Result};
use crate::layout::{Color, DrawItem, Page, Rect};
use crate::text::Font;

const STROKE_WIDTH: f64 = 0.75;

/// Write `report` as a PDF file in memory
pub fn write_pdf(report: &ReportDocument) -> Result<Vec<u8>> {
    let geometry = report.geometry();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in [Font::Regular, Font::Bold] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }

    let image_ids: Vec<ObjectId> = report
        .images()
        .iter()
        .map(|image| {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                image.rgb.clone(),
            );
            doc.add_object(stream)
        })
        .collect();

    let mut kids = Vec::with_capacity(report.page_count());
    for page in report.pages() {
        let used = images_on(page);
        let mut xobjects = Dictionary::new();
        for &index in &used {
            let id = image_ids
                .get(index)
                .copied()
                .ok_or(ReportError::MissingImage {
                    page: page.index,
                    index,
                })?;
            xobjects.set(image_name(index), id);
        }

        let content = Content {
            operations: page_operations(page, geometry.height),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => fonts.clone(),
                "XObject" => xobjects,
            },
        });
        kids.push(Object::from(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![0.into(), 0.into(), real(geometry.width), real(geometry.height)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(report.title()), StringFormat::Literal),
        "Producer" => Object::string_literal("SolarMatch"),
        "CreationDate" => Object::string_literal(
            report.created_at().format("D:%Y%m%d%H%M%SZ").to_string()
        ),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    tracing::debug!(
        id = %report.id(),
        pages = report.page_count(),
        images = report.images().len(),
        size = bytes.len(),
        "Serialised report"
    );
    Ok(bytes)
}

fn images_on(page: &Page) -> BTreeSet<usize> {
    page.blocks
        .iter()
        .flat_map(|block| block.items.iter())
        .filter_map(|item| match item {
            DrawItem::Image { image, .. } => Some(*image),
            _ => None,
        })
        .collect()
}

fn image_name(index: usize) -> String {
    format!("Im{}", index)
}

fn real(value: f64) -> Object {
    Object::from(value as f32)
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![color.r.into(), color.g.into(), color.b.into()]
}

fn page_operations(page: &Page, page_height: f64) -> Vec<Operation> {
    let mut ops = Vec::new();

    for item in page.blocks.iter().flat_map(|block| block.items.iter()) {
        match item {
            DrawItem::Text {
                x,
                baseline,
                size,
                font,
                color,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("rg", color_operands(*color)));
                ops.push(Operation::new("Tf", vec![name(font.resource_name()), real(*size)]));
                ops.push(Operation::new("Td", vec![real(*x), real(page_height - baseline)]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawItem::Image { rect, image } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        real(rect.width),
                        0.into(),
                        0.into(),
                        real(rect.height),
                        real(rect.x),
                        real(pdf_y(rect, page_height)),
                    ],
                ));
                ops.push(Operation::new("Do", vec![name(&image_name(*image))]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawItem::Box { rect, fill, stroke } => {
                let paint = match (fill, stroke) {
                    (Some(_), Some(_)) => "B",
                    (Some(_), None) => "f",
                    (None, Some(_)) => "S",
                    (None, None) => continue,
                };
                ops.push(Operation::new("q", vec![]));
                if let Some(fill) = fill {
                    ops.push(Operation::new("rg", color_operands(*fill)));
                }
                if let Some(stroke) = stroke {
                    ops.push(Operation::new("RG", color_operands(*stroke)));
                    ops.push(Operation::new("w", vec![real(STROKE_WIDTH)]));
                }
                ops.push(Operation::new(
                    "re",
                    vec![
                        real(rect.x),
                        real(pdf_y(rect, page_height)),
                        real(rect.width),
                        real(rect.height),
                    ],
                ));
                ops.push(Operation::new(paint, vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }

    ops
}

/// Lower-left y of `rect` in PDF user space
fn pdf_y(rect: &Rect, page_height: f64) -> f64 {
    page_height - rect.bottom()
}

/// Encode text for the standard fonts' WinAnsiEncoding
///
/// Characters outside the encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
