//! Raster buffer type and the linear-light luminance field derived from it.

use crate::color::{linear_to_srgb_u8, luminance, srgb_u8_to_linear};
use crate::error::ProcessError;

/// An 8-bit RGBA raster image, row-major, top-to-bottom.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, RGBA interleaved.
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ProcessError> {
        if width == 0 || height == 0 {
            return Err(ProcessError::DegenerateImage);
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ProcessError::InvalidSettings(format!(
                "pixel buffer length {} does not match {}x{} RGBA ({})",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Construct a uniform image where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, ProcessError> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgba);
        }
        Self::new(width, height, pixels)
    }

    #[inline]
    pub fn pixel_at(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[idx..idx + 4].copy_from_slice(&rgba);
    }
}

/// A dense W*H field of linear-light luminance values in [0, 1], computed
/// once from the sRGB input and left immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct LinearField {
    pub width: u32,
    pub height: u32,
    values: Vec<f64>,
}

impl LinearField {
    pub fn from_raster(image: &RasterImage) -> Self {
        let mut values = Vec::with_capacity(image.width as usize * image.height as usize);
        for y in 0..image.height {
            for x in 0..image.width {
                let [r, g, b, _a] = image.pixel_at(x, y);
                let lr = srgb_u8_to_linear(r);
                let lg = srgb_u8_to_linear(g);
                let lb = srgb_u8_to_linear(b);
                values.push(luminance(lr, lg, lb));
            }
        }
        Self {
            width: image.width,
            height: image.height,
            values,
        }
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> f64 {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.values[cy * self.width as usize + cx]
    }

    /// Bilinear sample at continuous coordinates, edge-clamped.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let x0 = x0 as i64;
        let y0 = y0 as i64;

        let v00 = self.get(x0, y0);
        let v10 = self.get(x0 + 1, y0);
        let v01 = self.get(x0, y0 + 1);
        let v11 = self.get(x0 + 1, y0 + 1);

        let top = v00 + (v10 - v00) * fx;
        let bottom = v01 + (v11 - v01) * fx;
        top + (bottom - top) * fy
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let m = self.mean();
        let var = self
            .values
            .iter()
            .map(|v| (v - m) * (v - m))
            .sum::<f64>()
            / self.values.len() as f64;
        var.sqrt()
    }
}

/// Write a monochrome linear-light field back into an RGBA raster, with
/// `R == G == B == linearToSRGB(value)` and alpha passed through unchanged
/// from `alpha_source`.
pub fn field_to_monochrome_raster(
    field: &[f64],
    width: u32,
    height: u32,
    alpha_source: &RasterImage,
) -> RasterImage {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let idx = y as usize * width as usize + x as usize;
            let v = linear_to_srgb_u8(field[idx]);
            let a = alpha_source.pixel_at(x, y)[3];
            pixels.extend_from_slice(&[v, v, v, a]);
        }
    }
    RasterImage {
        width,
        height,
        pixels,
    }
}
