//! Raster backend: turns a [`CalendarLayout`] draw list into PNG bytes.
//!
//! Fonts are embedded so the output does not depend on what the host has
//! installed; identical layouts always produce byte-identical PNGs.

use super::layout::{CalendarLayout, Color, DrawOp};
use crate::error::{render_error, BotResult};
use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::io::Cursor;

static FONT_REGULAR: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static FONT_BOLD: &[u8] = include_bytes!("../../assets/DejaVuSans-Bold.ttf");

fn pixel(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 255])
}

/// Rasterize a draw list into an encoded PNG
pub fn rasterize(layout: &CalendarLayout) -> BotResult<Vec<u8>> {
    let regular = FontRef::try_from_slice(FONT_REGULAR)
        .map_err(|e| render_error(&format!("Failed to load embedded font: {}", e)))?;
    let bold = FontRef::try_from_slice(FONT_BOLD)
        .map_err(|e| render_error(&format!("Failed to load embedded bold font: {}", e)))?;

    let mut canvas = RgbaImage::from_pixel(layout.width, layout.height, Rgba([255, 255, 255, 255]));

    for op in &layout.ops {
        match op {
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                color,
            } => {
                if *width == 0 || *height == 0 {
                    continue;
                }
                draw_filled_rect_mut(
                    &mut canvas,
                    Rect::at(*x, *y).of_size(*width, *height),
                    pixel(*color),
                );
            }
            DrawOp::Border {
                x,
                y,
                width,
                height,
                color,
            } => {
                if *width == 0 || *height == 0 {
                    continue;
                }
                draw_hollow_rect_mut(
                    &mut canvas,
                    Rect::at(*x, *y).of_size(*width, *height),
                    pixel(*color),
                );
            }
            DrawOp::Text {
                x,
                y,
                size,
                color,
                bold: is_bold,
                content,
            } => {
                let font = if *is_bold { &bold } else { &regular };
                draw_text_mut(
                    &mut canvas,
                    pixel(*color),
                    *x,
                    *y,
                    PxScale::from(*size),
                    font,
                    content,
                );
            }
        }
    }

    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| render_error(&format!("Failed to encode PNG: {}", e)))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::layout::{CANVAS_HEIGHT, CANVAS_WIDTH, TEXT_COLOR, WHITE};

    #[test]
    fn rasterizes_to_png_at_canvas_size() {
        let layout = CalendarLayout {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            ops: vec![
                DrawOp::Rect {
                    x: 10,
                    y: 10,
                    width: 100,
                    height: 50,
                    color: WHITE,
                },
                DrawOp::Text {
                    x: 20,
                    y: 20,
                    size: 16.0,
                    color: TEXT_COLOR,
                    bold: false,
                    content: "Scrims".to_string(),
                },
            ],
        };

        let png = rasterize(&layout).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), CANVAS_WIDTH);
        assert_eq!(decoded.height(), CANVAS_HEIGHT);
    }
}
