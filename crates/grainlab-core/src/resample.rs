//! Bilinear resampling used for `upscaleFactor` handling.
//!
//! Color channels are resampled through this module; alpha is handled
//! separately by the orchestrator (it bypasses the resample round-trip
//! entirely, passed straight through from the original buffer).

use crate::image::RasterImage;

/// Resample `image`'s RGB channels (alpha is carried through unchanged
/// per source pixel) to `new_width` x `new_height` using bilinear
/// interpolation with edge-clamped sampling.
pub fn resample_bilinear(image: &RasterImage, new_width: u32, new_height: u32) -> RasterImage {
    if new_width == image.width && new_height == image.height {
        return image.clone();
    }

    let mut pixels = Vec::with_capacity(new_width as usize * new_height as usize * 4);

    let scale_x = image.width as f64 / new_width as f64;
    let scale_y = image.height as f64 / new_height as f64;

    for y in 0..new_height {
        let src_y = (y as f64 + 0.5) * scale_y - 0.5;
        for x in 0..new_width {
            let src_x = (x as f64 + 0.5) * scale_x - 0.5;
            let [r, g, b, a] = sample_bilinear_rgba(image, src_x, src_y);
            pixels.extend_from_slice(&[r, g, b, a]);
        }
    }

    RasterImage {
        width: new_width,
        height: new_height,
        pixels,
    }
}

fn sample_bilinear_rgba(image: &RasterImage, x: f64, y: f64) -> [u8; 4] {
    let x0f = x.floor();
    let y0f = y.floor();
    let fx = x - x0f;
    let fy = y - y0f;

    let clamp_x = |v: i64| v.clamp(0, image.width as i64 - 1) as u32;
    let clamp_y = |v: i64| v.clamp(0, image.height as i64 - 1) as u32;

    let x0 = clamp_x(x0f as i64);
    let x1 = clamp_x(x0f as i64 + 1);
    let y0 = clamp_y(y0f as i64);
    let y1 = clamp_y(y0f as i64 + 1);

    let p00 = image.pixel_at(x0, y0);
    let p10 = image.pixel_at(x1, y0);
    let p01 = image.pixel_at(x0, y1);
    let p11 = image.pixel_at(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 + (p10[c] as f64 - p00[c] as f64) * fx;
        let bottom = p01[c] as f64 + (p11[c] as f64 - p01[c] as f64) * fx;
        let v = top + (bottom - top) * fy;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}
