//! Frames and face regions

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    /// 3 bytes per pixel, R G B
    Rgb,
    /// 1 byte per pixel
    Gray,
}

impl ColorSpace {
    pub fn channels(&self) -> usize {
        match self {
            ColorSpace::Rgb => 3,
            ColorSpace::Gray => 1,
        }
    }
}

/// One captured frame
///
/// `index` is the capture sequence number assigned by the frame source.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: u64,
    width: u32,
    height: u32,
    color: ColorSpace,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a raw buffer, checking its length against the geometry
    pub fn new(index: u64, width: u32, height: u32, color: ColorSpace, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * color.channels();
        if pixels.len() != expected {
            return Err(Error::FrameSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            index,
            width,
            height,
            color,
            pixels,
        })
    }

    pub fn from_rgb(index: u64, image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            index,
            width,
            height,
            color: ColorSpace::Rgb,
            pixels: image.into_raw(),
        }
    }

    pub fn from_gray(index: u64, image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            index,
            width,
            height,
            color: ColorSpace::Gray,
            pixels: image.into_raw(),
        }
    }

    /// Uniform grayscale frame
    pub fn solid(index: u64, width: u32, height: u32, value: u8) -> Self {
        Self::from_gray(index, GrayImage::from_pixel(width, height, Luma([value])))
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color(&self) -> ColorSpace {
        self.color
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Luma view of the frame (BT.601 weights for color input)
    pub fn to_gray(&self) -> GrayImage {
        let width = self.width as usize;
        match self.color {
            ColorSpace::Gray => GrayImage::from_fn(self.width, self.height, |x, y| {
                Luma([self.pixels[y as usize * width + x as usize]])
            }),
            ColorSpace::Rgb => GrayImage::from_fn(self.width, self.height, |x, y| {
                let i = (y as usize * width + x as usize) * 3;
                let r = self.pixels[i] as f32;
                let g = self.pixels[i + 1] as f32;
                let b = self.pixels[i + 2] as f32;
                Luma([(0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8])
            }),
        }
    }

    /// Owned image for encoding
    pub fn to_dynamic(&self) -> DynamicImage {
        let width = self.width as usize;
        match self.color {
            ColorSpace::Gray => DynamicImage::ImageLuma8(self.to_gray()),
            ColorSpace::Rgb => DynamicImage::ImageRgb8(RgbImage::from_fn(self.width, self.height, |x, y| {
                let i = (y as usize * width + x as usize) * 3;
                image::Rgb([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
            })),
        }
    }
}

/// Axis-aligned face rectangle in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// Landmark coordinate in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}
