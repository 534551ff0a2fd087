//! sRGB <-> linear-light conversions and luminance.
//!
//! All simulation work happens in linear space; sRGB is only the
//! input/output wire format for the 8-bit raster buffers.

/// Convert an 8-bit sRGB channel value to linear light, in [0, 1].
pub fn srgb_u8_to_linear(v: u8) -> f64 {
    let c = v as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert a linear-light value in [0, 1] back to an 8-bit sRGB channel,
/// clamping before quantization.
pub fn linear_to_srgb_u8(v: f64) -> u8 {
    let c = v.clamp(0.0, 1.0);
    let s = if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (s.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// BT.709 relative luminance from linear R, G, B.
pub fn luminance(r: f64, g: f64, b: f64) -> f64 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}
