// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pixel frames shared by the image and video pipelines
//!
//! Frames are stored in the channel order the rest of the vision stack expects:
//! color images as packed BGR8, grayscale images as single-channel luma.

use image::{DynamicImage, GrayImage, ImageBuffer, Rgb, RgbImage};

/// Channel layout of a [`Frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Packed 8-bit blue, green, red
    Bgr8,
    /// 8-bit luma
    Gray8,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Bgr8 => 3,
            PixelLayout::Gray8 => 1,
        }
    }
}

/// A decoded image or video frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw pixel buffer, returning `None` if the length does not match the dimensions
    pub fn from_raw(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Convert a decoded image into a frame
    ///
    /// Color images are reordered from RGB to BGR. Grayscale images keep their
    /// single channel. Alpha is dropped.
    pub fn from_dynamic_image(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray),
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
                Self::from_gray(image.to_luma8())
            }
            other => {
                let rgb = other.to_rgb8();
                let (width, height) = rgb.dimensions();
                let mut data = rgb.into_raw();
                swap_red_blue(&mut data);
                Self {
                    width,
                    height,
                    layout: PixelLayout::Bgr8,
                    data,
                }
            }
        }
    }

    fn from_gray(gray: GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        Self {
            width,
            height,
            layout: PixelLayout::Gray8,
            data: gray.into_raw(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGB view of the frame, used for model input and encoding
    pub fn to_rgb_image(&self) -> RgbImage {
        match self.layout {
            PixelLayout::Bgr8 => {
                let mut data = self.data.clone();
                swap_red_blue(&mut data);
                ImageBuffer::from_raw(self.width, self.height, data)
                    .unwrap_or_else(|| RgbImage::new(self.width, self.height))
            }
            PixelLayout::Gray8 => ImageBuffer::from_fn(self.width, self.height, |x, y| {
                let v = self.data[(y * self.width + x) as usize];
                Rgb([v, v, v])
            }),
        }
    }

    /// Image suitable for handing to an encoder (RGB for color, luma for gray)
    pub fn to_dynamic_image(&self) -> DynamicImage {
        match self.layout {
            PixelLayout::Bgr8 => DynamicImage::ImageRgb8(self.to_rgb_image()),
            PixelLayout::Gray8 => {
                let gray = GrayImage::from_raw(self.width, self.height, self.data.clone())
                    .unwrap_or_else(|| GrayImage::new(self.width, self.height));
                DynamicImage::ImageLuma8(gray)
            }
        }
    }
}

/// Swap the first and third byte of every 3-byte pixel in place
fn swap_red_blue(data: &mut [u8]) {
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}
