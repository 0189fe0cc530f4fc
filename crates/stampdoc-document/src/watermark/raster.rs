// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster watermarks — draw the text onto a transparent RGBA layer with
// `imageproc`, then alpha-composite the layer over a photo or scan.

use std::path::Path;

use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use stampdoc_core::Canvas;
use stampdoc_core::error::{Result, StampdocError};
use tracing::{debug, info, instrument};

use super::font::{KernedMetrics, WatermarkFont};
use super::layout::WatermarkLayout;
use super::{WATERMARK_ALPHA, WATERMARK_GRAY};

/// Fully transparent white, the starting colour of every layer.
const CLEAR: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Render the three-row watermark onto a transparent layer of the given size.
#[instrument(skip(font, text))]
pub fn render_layer(font: &WatermarkFont, text: &str, width: u32, height: u32) -> Result<RgbaImage> {
    let layout = WatermarkLayout::compute(&KernedMetrics(font), text, Canvas::Pixels { width, height })?;
    let mut layer = RgbaImage::from_pixel(width, height, CLEAR);

    let size = layout.font_size as f32;
    let scale = font.px_scale(size);
    let color = Rgba([WATERMARK_GRAY, WATERMARK_GRAY, WATERMARK_GRAY, WATERMARK_ALPHA]);
    let x = layout.x as i32;

    for row in layout.rows {
        // imageproc puts the baseline one font ascent below the y it is given.
        let y = (layout.baseline_from_top(row) - font.line_ascent(size)).round() as i32;
        draw_text_mut(&mut layer, color, x, y, scale, font.face(), text);
    }

    debug!(
        font_size = layout.font_size,
        x = layout.x,
        rows = ?layout.rows,
        "Raster watermark drawn"
    );
    Ok(layer)
}

/// Decode an image, applying its EXIF orientation so the watermark comes out
/// upright relative to what the user sees.
fn open_upright(path: &Path) -> Result<DynamicImage> {
    let image_err = |err: image::ImageError| {
        StampdocError::ImageError(format!("failed to open {}: {}", path.display(), err))
    };

    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(image_err)?;
    let orientation = decoder.orientation().map_err(image_err)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(image_err)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Watermark the image at `source` and save the result as JPEG at `output`.
#[instrument(skip(font, text), fields(source = %source.display()))]
pub fn watermark_image(font: &WatermarkFont, text: &str, source: &Path, output: &Path) -> Result<()> {
    let image = open_upright(source)?;
    info!(width = image.width(), height = image.height(), "Watermarking image");

    let mut base = image.to_rgba8();
    let layer = render_layer(font, text, base.width(), base.height())?;
    image::imageops::overlay(&mut base, &layer, 0, 0);

    // JPEG has no alpha channel.
    let flattened = DynamicImage::ImageRgba8(base).to_rgb8();
    flattened
        .save_with_format(output, ImageFormat::Jpeg)
        .map_err(|err| {
            StampdocError::ImageError(format!("failed to save {}: {}", output.display(), err))
        })?;
    Ok(())
}
