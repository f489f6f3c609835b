//! Pixel implementations of the CSS filter functions.
//!
//! Each function follows the Filter Effects definition of the matching CSS
//! filter, applied to non-premultiplied sRGB values in `[0, 1]`:
//!
//! | Filter | Operation |
//! |---|---|
//! | grayscale, sepia, saturate | 3×3 colour matrix |
//! | brightness | `v × b` |
//! | contrast | `v × c + (0.5 − 0.5c)` |
//! | invert | `a + v × (1 − 2a)` |
//! | blur | Gaussian, σ = radius, over premultiplied RGBA |
//!
//! Colour passes run row-parallel on the rayon pool and never touch alpha.

use super::params::{Filter, FilterPass};
use image::RgbaImage;
use rayon::prelude::*;

type Matrix = [[f32; 3]; 3];

/// Apply one filter pass to `layer`, returning the filtered copy.
pub fn apply(layer: &RgbaImage, pass: FilterPass) -> RgbaImage {
    let amount = pass.amount as f32;
    match pass.filter {
        Filter::None => layer.clone(),
        Filter::Grayscale => color_matrix(layer, grayscale_matrix(amount)),
        Filter::Sepia => color_matrix(layer, sepia_matrix(amount)),
        Filter::Saturate => color_matrix(layer, saturate_matrix(amount)),
        Filter::Brightness => linear(layer, amount, 0.0),
        Filter::Contrast => linear(layer, amount, 0.5 - 0.5 * amount),
        Filter::Invert => {
            let a = amount.clamp(0.0, 1.0);
            linear(layer, 1.0 - 2.0 * a, a)
        }
        Filter::Blur => gaussian(layer, amount),
    }
}

fn grayscale_matrix(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
        [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
        [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
    ]
}

fn saturate_matrix(amount: f32) -> Matrix {
    let s = amount.max(0.0);
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn color_matrix(layer: &RgbaImage, m: Matrix) -> RgbaImage {
    let mut out = layer.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(4).for_each(|px| {
        let r = f32::from(px[0]) / 255.0;
        let g = f32::from(px[1]) / 255.0;
        let b = f32::from(px[2]) / 255.0;
        px[0] = to_u8(m[0][0] * r + m[0][1] * g + m[0][2] * b);
        px[1] = to_u8(m[1][0] * r + m[1][1] * g + m[1][2] * b);
        px[2] = to_u8(m[2][0] * r + m[2][1] * g + m[2][2] * b);
    });
    out
}

fn linear(layer: &RgbaImage, slope: f32, intercept: f32) -> RgbaImage {
    let mut out = layer.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(4).for_each(|px| {
        for c in &mut px[..3] {
            *c = to_u8(f32::from(*c) / 255.0 * slope + intercept);
        }
    });
    out
}

/// Gaussian blur with standard deviation `radius`.
///
/// The layer is padded with transparency before blurring so edges fade out
/// instead of smearing the border pixels. Blurs premultiplied colour so
/// transparent neighbours darken nothing, then unpremultiplies. A zero radius
/// is the identity.
fn gaussian(layer: &RgbaImage, radius: f32) -> RgbaImage {
    if radius <= 0.0 {
        return layer.clone();
    }

    let pad = (radius * 3.0).ceil() as u32;
    let mut premultiplied = RgbaImage::new(layer.width() + 2 * pad, layer.height() + 2 * pad);
    image::imageops::replace(&mut premultiplied, layer, i64::from(pad), i64::from(pad));
    {
        let buf: &mut [u8] = &mut premultiplied;
        buf.par_chunks_mut(4).for_each(|px| {
            let a = u16::from(px[3]);
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * a + 127) / 255) as u8;
            }
        });
    }

    let mut blurred = image::imageops::blur(&premultiplied, radius);
    {
        let buf: &mut [u8] = &mut blurred;
        buf.par_chunks_mut(4).for_each(|px| {
            let a = u32::from(px[3]);
            if a == 0 {
                px[..3].fill(0);
                return;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        });
    }
    image::imageops::crop_imm(&blurred, pad, pad, layer.width(), layer.height()).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(color))
    }

    fn pass(filter: Filter, amount: f64) -> FilterPass {
        FilterPass { filter, amount }
    }

    #[test]
    fn grayscale_full_equalizes_channels() {
        let out = apply(&solid([200, 40, 90, 255]), pass(Filter::Grayscale, 1.0));
        let [r, g, b, a] = out.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn grayscale_zero_is_identity() {
        let src = solid([200, 40, 90, 255]);
        assert_eq!(apply(&src, pass(Filter::Grayscale, 0.0)), src);
    }

    #[test]
    fn sepia_full_on_white_is_warm() {
        let out = apply(&solid([255, 255, 255, 255]), pass(Filter::Sepia, 1.0));
        let [r, g, b, _] = out.get_pixel(0, 0).0;
        // Row sums: 1.351, 1.203, 0.937
        assert_eq!(r, 255);
        assert_eq!(g, 255);
        assert_eq!(b, 239);
    }

    #[test]
    fn invert_full_negates() {
        let out = apply(&solid([0, 100, 255, 128]), pass(Filter::Invert, 1.0));
        assert_eq!(out.get_pixel(0, 0).0, [255, 155, 0, 128]);
    }

    #[test]
    fn invert_half_is_mid_grey() {
        let out = apply(&solid([0, 255, 30, 255]), pass(Filter::Invert, 0.5));
        let [r, g, b, _] = out.get_pixel(0, 0).0;
        assert_eq!((r, g, b), (128, 128, 128));
    }

    #[test]
    fn brightness_scales_channels() {
        let out = apply(&solid([100, 50, 200, 255]), pass(Filter::Brightness, 2.0));
        assert_eq!(out.get_pixel(0, 0).0, [200, 100, 255, 255]);
    }

    #[test]
    fn contrast_keeps_mid_grey_fixed() {
        let src = solid([128, 128, 128, 255]);
        let out = apply(&src, pass(Filter::Contrast, 2.0));
        let [r, _, _, _] = out.get_pixel(0, 0).0;
        assert!((i32::from(r) - 128).abs() <= 1);
    }

    #[test]
    fn contrast_stretches_away_from_middle() {
        let out = apply(&solid([60, 200, 128, 255]), pass(Filter::Contrast, 2.0));
        let [r, g, _, _] = out.get_pixel(0, 0).0;
        assert_eq!(r, 0);
        assert_eq!(g, 255);
    }

    #[test]
    fn saturate_zero_is_grey() {
        let out = apply(&solid([255, 0, 0, 255]), pass(Filter::Saturate, 0.0));
        let [r, g, b, _] = out.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn saturate_one_is_identity() {
        let src = solid([10, 200, 60, 255]);
        let out = apply(&src, pass(Filter::Saturate, 1.0));
        for (a, b) in src.pixels().zip(out.pixels()) {
            for c in 0..3 {
                assert!((i32::from(a[c]) - i32::from(b[c])).abs() <= 1);
            }
        }
    }

    #[test]
    fn blur_zero_radius_is_identity() {
        let src = solid([1, 2, 3, 4]);
        assert_eq!(apply(&src, pass(Filter::Blur, 0.0)), src);
    }

    #[test]
    fn blur_spreads_a_single_pixel() {
        let mut src = RgbaImage::new(9, 9);
        src.put_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let out = apply(&src, pass(Filter::Blur, 1.5));
        assert!(out.get_pixel(4, 4)[3] < 255);
        assert!(out.get_pixel(5, 4)[3] > 0);
        // Premultiplied blur keeps the colour white where it is visible
        assert_eq!(out.get_pixel(5, 4)[0], 255);
    }

    #[test]
    fn blur_fades_opaque_edges() {
        let src = solid([50, 60, 70, 255]);
        let out = apply(&src, pass(Filter::Blur, 1.0));
        assert_eq!(out.dimensions(), (4, 4));
        assert!(out.get_pixel(0, 0)[3] < 255);
    }

    #[test]
    fn colour_filters_preserve_alpha() {
        let src = solid([90, 90, 90, 77]);
        for filter in [
            Filter::Grayscale,
            Filter::Sepia,
            Filter::Brightness,
            Filter::Contrast,
            Filter::Saturate,
            Filter::Invert,
        ] {
            let out = apply(&src, pass(filter, 0.7));
            assert_eq!(out.get_pixel(2, 2)[3], 77, "{filter} changed alpha");
        }
    }
}
