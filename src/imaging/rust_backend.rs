//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, BMP, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Composite | inverse-mapped bilinear draw onto an `RgbaImage` canvas |
//! | Filter pass | [`filters`](super::filters), row-parallel via `rayon` |
//! | Encode → PNG | `image::ImageFormat::Png` |
//! | Downscale → JPEG | `resize_exact` with `Lanczos3` + `JpegEncoder` |
//!
//! ## Composite
//!
//! The canvas is drawn the way a 2D canvas context would: origin moved to the
//! canvas centre, rotated, scaled by ±1 for flips, and the source drawn
//! centred at its logical size. Each canvas pixel centre is mapped back
//! through that transform into source space and sampled bilinearly, so the
//! resize happens inside the draw. Canvas pixels outside the drawn rectangle
//! stay transparent.
//!
//! When a filter is set, the filtered copy of that draw is composited
//! source-over on top of the unfiltered one.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{fit_within, rotation_cos_sin};
use super::filters;
use super::image_ref::ImageRef;
use super::mask::{Mask, OVERLAY_TINT};
use super::params::{DownscaleParams, RenderParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Opacity of the tint painted over selected mask pixels.
const OVERLAY_OPACITY: f32 = 0.5;

/// Largest RGBA canvas `render` will allocate (1 GiB).
pub const MAX_CANVAS_BYTES: u64 = 1 << 30;

/// Formats whose decoders are compiled in.
const DECODABLE: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// MIME types of every format this backend can decode.
pub fn supported_media_types() -> Vec<&'static str> {
    DECODABLE
        .iter()
        .filter(|fmt| fmt.reading_enabled())
        .map(|fmt| fmt.to_mime_type())
        .collect()
}

/// Guess a MIME type from a file extension.
///
/// Unknown extensions map to `application/octet-stream`, which uploads then
/// reject as not being an image.
pub fn media_type_for_path(path: &Path) -> &'static str {
    ImageFormat::from_path(path)
        .map(|fmt| fmt.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the bytes behind an already-validated reference.
fn load_image(image: &ImageRef) -> Result<DynamicImage, BackendError> {
    image::load_from_memory_with_format(image.bytes(), image.format()).map_err(|e| {
        BackendError::Decode(format!("{} ({} bytes): {e}", image.media_type(), image.len()))
    })
}

fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    canvas
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Sample `src` at continuous coordinates where pixel `i` covers `[i, i + 1)`.
///
/// Interpolates premultiplied colour and clamps to the edge pixels.
fn sample_bilinear(src: &RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let max_x = f64::from(src.width() - 1);
    let max_y = f64::from(src.height() - 1);
    let fx = (x - 0.5).clamp(0.0, max_x);
    let fy = (y - 0.5).clamp(0.0, max_y);
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);

    let taps = [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x1, y0, tx * (1.0 - ty)),
        (x0, y1, (1.0 - tx) * ty),
        (x1, y1, tx * ty),
    ];

    let mut acc = [0.0f64; 4];
    for (sx, sy, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        let p = src.get_pixel(sx as u32, sy as u32).0;
        let a = f64::from(p[3]);
        acc[0] += f64::from(p[0]) * a * weight;
        acc[1] += f64::from(p[1]) * a * weight;
        acc[2] += f64::from(p[2]) * a * weight;
        acc[3] += a * weight;
    }

    if acc[3] <= 0.0 {
        return [0, 0, 0, 0];
    }
    [
        (acc[0] / acc[3]).round().clamp(0.0, 255.0) as u8,
        (acc[1] / acc[3]).round().clamp(0.0, 255.0) as u8,
        (acc[2] / acc[3]).round().clamp(0.0, 255.0) as u8,
        acc[3].round().clamp(0.0, 255.0) as u8,
    ]
}

/// Draw `source` onto a fresh canvas under the rotation/flip/scale transform.
fn draw_transformed(source: &RgbaImage, params: &RenderParams) -> RgbaImage {
    let mut canvas = RgbaImage::new(params.canvas_width, params.canvas_height);
    let (cos, sin) = rotation_cos_sin(params.rotation);
    let flip_x = if params.flip_horizontal { -1.0 } else { 1.0 };
    let flip_y = if params.flip_vertical { -1.0 } else { 1.0 };

    let half_cw = f64::from(params.canvas_width) / 2.0;
    let half_ch = f64::from(params.canvas_height) / 2.0;
    let w = f64::from(params.width);
    let h = f64::from(params.height);
    let scale_x = f64::from(source.width()) / w;
    let scale_y = f64::from(source.height()) / h;
    let row_len = params.canvas_width as usize * 4;

    let buf: &mut [u8] = &mut canvas;
    buf.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f64 + 0.5 - half_ch;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f64 + 0.5 - half_cw;
                // Undo rotate, then undo the ±1 scale (its own inverse)
                let u = (dx * cos + dy * sin) * flip_x;
                let v = (-dx * sin + dy * cos) * flip_y;
                let lx = u + w / 2.0;
                let ly = v + h / 2.0;
                if lx < 0.0 || ly < 0.0 || lx >= w || ly >= h {
                    continue;
                }
                px.copy_from_slice(&sample_bilinear(source, lx * scale_x, ly * scale_y));
            }
        });

    canvas
}

/// Composite `top` over `bottom` (source-over, non-premultiplied inputs).
fn source_over(top: &RgbaImage, mut bottom: RgbaImage) -> RgbaImage {
    let row_len = bottom.width() as usize * 4;
    let top_raw: &[u8] = top;
    let buf: &mut [u8] = &mut bottom;
    buf.par_chunks_mut(row_len)
        .zip(top_raw.par_chunks(row_len))
        .for_each(|(dst_row, src_row)| {
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                let sa = f32::from(s[3]) / 255.0;
                if sa == 0.0 {
                    continue;
                }
                let da = f32::from(d[3]) / 255.0;
                let out_a = sa + da * (1.0 - sa);
                for c in 0..3 {
                    let blended =
                        (f32::from(s[c]) * sa + f32::from(d[c]) * da * (1.0 - sa)) / out_a;
                    d[c] = blended.round().clamp(0.0, 255.0) as u8;
                }
                d[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        });
    bottom
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: Vec<u8>) -> Result<ImageRef, BackendError> {
        let (format, natural) = {
            let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?;
            let format = reader.format().ok_or(BackendError::UnknownFormat)?;
            let img = reader
                .decode()
                .map_err(|e| BackendError::Decode(e.to_string()))?;
            (format, Dimensions::new(img.width(), img.height()))
        };
        if natural.width == 0 || natural.height == 0 {
            return Err(BackendError::Decode("image has no pixels".to_string()));
        }
        tracing::debug!(?format, %natural, len = bytes.len(), "decoded image");
        Ok(ImageRef::new(bytes, format, natural))
    }

    #[tracing::instrument(
        skip_all,
        fields(
            canvas = %Dimensions::new(params.canvas_width, params.canvas_height),
            rotation = params.rotation,
        )
    )]
    fn render(&self, params: &RenderParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot draw at {}x{}",
                params.width, params.height
            )));
        }
        let canvas_bytes = u64::from(params.canvas_width)
            .checked_mul(u64::from(params.canvas_height))
            .and_then(|pixels| pixels.checked_mul(4))
            .filter(|&bytes| bytes <= MAX_CANVAS_BYTES);
        if canvas_bytes.is_none() {
            return Err(BackendError::ProcessingFailed(format!(
                "canvas {}x{} exceeds the {} MiB limit",
                params.canvas_width,
                params.canvas_height,
                MAX_CANVAS_BYTES >> 20
            )));
        }
        let source = load_image(&params.source)?.to_rgba8();
        let base = draw_transformed(&source, params);

        let canvas = match params.filter {
            Some(pass) => {
                tracing::debug!(filter = %pass.to_css(), "overlay pass");
                let filtered = filters::apply(&base, pass);
                source_over(&filtered, base)
            }
            None => base,
        };

        encode_png(&canvas)
    }

    fn downscale(&self, params: &DownscaleParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(&params.source)?;
        let natural = (img.width(), img.height());
        let (width, height) = fit_within(natural, (params.max_width, params.max_height));
        let fitted = if (width, height) == natural {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, params.quality.value() as u8);
        DynamicImage::ImageRgb8(fitted.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        Ok(buf.into_inner())
    }

    fn overlay_mask(&self, image: &ImageRef, mask: &Mask) -> Result<Vec<u8>, BackendError> {
        if image.natural() != mask.dimensions() {
            return Err(BackendError::ProcessingFailed(format!(
                "mask is {} but image is {}",
                mask.dimensions(),
                image.natural()
            )));
        }
        let mut rgba = load_image(image)?.to_rgba8();
        for (x, y, px) in rgba.enumerate_pixels_mut() {
            if !mask.is_selected(x, y) {
                continue;
            }
            for c in 0..3 {
                let base = f32::from(px[c]);
                let tint = f32::from(OVERLAY_TINT[c]);
                px[c] = (base * (1.0 - OVERLAY_OPACITY) + tint * OVERLAY_OPACITY).round() as u8;
            }
            px[3] = px[3].max(OVERLAY_TINT[3]);
        }
        encode_png(&rgba)
    }
}
