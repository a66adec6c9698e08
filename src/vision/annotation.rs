// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draws detection boxes and labels onto frames

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size, Canvas};
use imageproc::rect::Rect;

use super::detection::Detection;
use super::frame::{Frame, PixelLayout};

/// Highlight color in BGR order (green)
pub const HIGHLIGHT_BGR: [u8; 3] = [0, 255, 0];

/// Intensity used when the frame is grayscale
pub const HIGHLIGHT_LUMA: u8 = 255;

/// Rectangle outline width in pixels
pub const BOX_THICKNESS: i32 = 2;

/// Gap between the label baseline and the top edge of its box
pub const LABEL_OFFSET: i32 = 10;

const LABEL_FONT_SIZE: f32 = 16.0;

static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Label text for a detection, e.g. `"dog 0.87"`
pub fn label_text(detection: &Detection) -> String {
    format!("{} {:.2}", detection.class_name, detection.confidence)
}

/// Renders detections with the bundled DejaVu Sans font
#[derive(Clone)]
pub struct Annotator {
    font: FontArc,
    scale: PxScale,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl Annotator {
    pub fn new() -> Result<Self, InvalidFont> {
        let font = FontArc::try_from_slice(FONT_DATA)?;
        Ok(Self {
            font,
            scale: PxScale::from(LABEL_FONT_SIZE),
        })
    }

    /// Return an annotated copy of `frame`; the input is left untouched
    pub fn annotate(&self, frame: &Frame, detections: &[Detection]) -> Frame {
        let mut out = frame.clone();
        if detections.is_empty() || frame.is_empty() {
            return out;
        }

        match frame.layout {
            PixelLayout::Bgr8 => {
                // Buffer keeps BGR byte order, so the color is given in BGR too
                if let Some(mut canvas) =
                    ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(frame.width, frame.height, out.data)
                {
                    self.draw(&mut canvas, Rgb(HIGHLIGHT_BGR), detections);
                    out.data = canvas.into_raw();
                } else {
                    return frame.clone();
                }
            }
            PixelLayout::Gray8 => {
                if let Some(mut canvas) = GrayImage::from_raw(frame.width, frame.height, out.data) {
                    self.draw(&mut canvas, Luma([HIGHLIGHT_LUMA]), detections);
                    out.data = canvas.into_raw();
                } else {
                    return frame.clone();
                }
            }
        }

        out
    }

    fn draw<C>(&self, canvas: &mut C, color: C::Pixel, detections: &[Detection])
    where
        C: Canvas,
        <C as Canvas>::Pixel: Pixel<Subpixel = u8>,
    {
        for detection in detections {
            let b = &detection.bbox;
            let x1 = b.x1 as i32;
            let y1 = b.y1 as i32;
            let x2 = b.x2 as i32;
            let y2 = b.y2 as i32;

            for inset in 0..BOX_THICKNESS {
                let w = x2 - x1 + 1 - 2 * inset;
                let h = y2 - y1 + 1 - 2 * inset;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(canvas, rect, color);
            }

            let label = label_text(detection);
            let (_, text_height) = text_size(self.scale, &self.font, &label);
            let text_y = y1 - LABEL_OFFSET - text_height as i32;
            draw_text_mut(canvas, color, x1, text_y, self.scale, &self.font, &label);
        }
    }
}
