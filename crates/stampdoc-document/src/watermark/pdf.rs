// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF watermarks — a single page of exactly the target size carrying the
// three rows of text as real (vector) text in the bold face.
//
// The face is embedded as a simple TrueType font with WinAnsi encoding, so
// the watermark must be expressible in Latin-1; anything else is shown as
// '?'. Translucency comes from an ExtGState with a fill alpha.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use stampdoc_core::Canvas;
use stampdoc_core::error::{Result, StampdocError};
use tracing::{debug, instrument, warn};

use super::font::WatermarkFont;
use super::layout::WatermarkLayout;
use super::{WATERMARK_ALPHA, WATERMARK_GRAY};

/// Resource names inside the watermark page.
pub const FONT_RESOURCE: &str = "WmF1";
pub const GRAPHICS_STATE_RESOURCE: &str = "WmGS1";

const BASE_FONT: &str = "StampdocWatermarkBold";
const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;

/// Map a WinAnsi code to the character it shows, for the codes we emit.
fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7e | 0xa0..=0xff => Some(char::from(code)),
        _ => None,
    }
}

/// The text as it will actually appear: characters outside the encodable
/// range become '?'.
pub fn displayable(text: &str) -> String {
    text.chars()
        .map(|ch| match u8::try_from(u32::from(ch)) {
            Ok(code) if win_ansi_char(code).is_some() => ch,
            _ => '?',
        })
        .collect()
}

fn encode(text: &str) -> Vec<u8> {
    displayable(text)
        .chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

/// Add the font program, descriptor and font dictionary to `doc`.
fn embed_font(doc: &mut Document, font: &WatermarkFont) -> ObjectId {
    let mut program = Stream::new(
        dictionary! { "Length1" => font.data().len() as i64 },
        font.data().to_vec(),
    );
    if let Err(err) = program.compress() {
        warn!(%err, "Font program left uncompressed");
    }
    let program_id = doc.add_object(program);

    let (ascent, descent) = font.vertical_metrics_per_mille();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => BASE_FONT,
        "Flags" => 32,
        "FontBBox" => vec![
            Object::Integer(-600),
            Object::Integer(descent.round() as i64),
            Object::Integer(2000),
            Object::Integer(ascent.round() as i64),
        ],
        "ItalicAngle" => 0,
        "Ascent" => ascent.round() as i64,
        "Descent" => descent.round() as i64,
        "CapHeight" => ascent.round() as i64,
        "StemV" => 120,
        "FontFile2" => program_id,
    });

    let widths: Vec<Object> = (FIRST_CHAR..=LAST_CHAR)
        .map(|code| {
            let width = win_ansi_char(code)
                .map(|ch| font.advance_per_mille(ch))
                .unwrap_or(0.0);
            Object::Integer(width.round() as i64)
        })
        .collect();

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => BASE_FONT,
        "FirstChar" => FIRST_CHAR as i64,
        "LastChar" => LAST_CHAR as i64,
        "Widths" => widths,
        "Encoding" => "WinAnsiEncoding",
        "FontDescriptor" => descriptor_id,
    })
}

/// Content stream operations drawing the three rows.
fn text_operations(layout: &WatermarkLayout, text: &str, page_height: u32) -> Vec<Operation> {
    let gray = WATERMARK_GRAY as f32 / 255.0;
    let encoded = encode(text);

    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![GRAPHICS_STATE_RESOURCE.into()]),
        Operation::new("rg", vec![gray.into(), gray.into(), gray.into()]),
    ];
    for row in layout.rows {
        // PDF y grows upwards from the bottom edge.
        let baseline = page_height as f32 - layout.baseline_from_top(row);
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), (layout.font_size as i64).into()],
        ));
        ops.push(Operation::new(
            "Td",
            vec![(layout.x as f32).into(), baseline.into()],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encoded.clone(), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Build the watermark page in memory.
pub fn build_watermark_document(font: &WatermarkFont, text: &str, width: u32, height: u32) -> Result<Document> {
    let text = displayable(text);
    let layout = WatermarkLayout::compute(font, &text, Canvas::Points { width, height })?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = embed_font(&mut doc, font);
    let alpha = WATERMARK_ALPHA as f32 / 255.0;
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => alpha,
        "CA" => alpha,
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
        "ExtGState" => dictionary! { GRAPHICS_STATE_RESOURCE => gs_id },
    });

    let content = Content {
        operations: text_operations(&layout, &text, height),
    };
    let encoded = content
        .encode()
        .map_err(|err| StampdocError::RenderError(format!("cannot encode watermark content: {err}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    debug!(width, height, font_size = layout.font_size, "Watermark page built");
    Ok(doc)
}

/// Write a single-page watermark PDF of `width` x `height` points to `output`.
#[instrument(skip(font, text), fields(output = %output.display()))]
pub fn write_watermark_pdf(
    font: &WatermarkFont,
    text: &str,
    width: u32,
    height: u32,
    output: &Path,
) -> Result<()> {
    let mut doc = build_watermark_document(font, text, width, height)?;
    doc.save(output).map_err(|err| {
        StampdocError::RenderError(format!("cannot write watermark to {}: {}", output.display(), err))
    })?;
    Ok(())
}
