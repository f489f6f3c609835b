//! Shared test utilities: small encoded images with known pixel layouts.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let jpeg = encode_jpeg(400, 300);
//! let quads = quadrant_image(4, 4, [RED, GREEN, BLUE, WHITE]);
//! let png = encode_png_rgba(&quads);
//! ```

use image::{ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Encode a flat grey JPEG of the given size.
pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

pub fn encode_png_rgba(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Four solid quadrants, `[top-left, top-right, bottom-left, bottom-right]`.
///
/// Odd sizes put the extra row/column in the bottom/right quadrants.
pub fn quadrant_image(width: u32, height: u32, colors: [[u8; 4]; 4]) -> RgbaImage {
    let [tl, tr, bl, br] = colors;
    RgbaImage::from_fn(width, height, |x, y| {
        let left = x < width / 2;
        let top = y < height / 2;
        image::Rgba(match (top, left) {
            (true, true) => tl,
            (true, false) => tr,
            (false, true) => bl,
            (false, false) => br,
        })
    })
}
