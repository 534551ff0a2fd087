//! Deterministic PNG encode/decode for the crate's own raster type.
//!
//! A convenience layer for callers working with files on disk rather than
//! raw buffers already in memory; `process` itself never touches this
//! module. Compression and filter settings are pinned so the same pixel
//! buffer always encodes to the same bytes.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use png::{BitDepth, ColorType, Compression, Decoder, Encoder, FilterType};

use crate::error::PngError;
use crate::image::RasterImage;

const PNG_COMPRESSION: Compression = Compression::Best;
const PNG_FILTER: FilterType = FilterType::Sub;

/// Load an RGBA8 PNG from disk into a [`RasterImage`].
pub fn load_png<P: AsRef<Path>>(path: P) -> Result<RasterImage, PngError> {
    let file = File::open(path)?;
    let decoder = Decoder::new(file);
    let mut reader = decoder.read_info()?;

    let info = reader.info();
    if info.color_type != ColorType::Rgba || info.bit_depth != BitDepth::Eight {
        return Err(PngError::UnsupportedFormat(info.color_type, info.bit_depth));
    }

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame_info = reader.next_frame(&mut buf)?;
    buf.truncate(frame_info.buffer_size());

    Ok(RasterImage {
        width: frame_info.width,
        height: frame_info.height,
        pixels: buf,
    })
}

/// Save a [`RasterImage`] to disk as an RGBA8 PNG with fixed
/// compression/filter settings.
pub fn save_png<P: AsRef<Path>>(image: &RasterImage, path: P) -> Result<(), PngError> {
    let bytes = encode_png_bytes(image)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    std::io::Write::write_all(&mut writer, &bytes)?;
    Ok(())
}

/// Encode a [`RasterImage`] to an in-memory PNG byte buffer.
pub fn encode_png_bytes(image: &RasterImage) -> Result<Vec<u8>, PngError> {
    let mut bytes: Vec<u8> = Vec::new();
    {
        let mut encoder = Encoder::new(&mut bytes, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_compression(PNG_COMPRESSION);
        encoder.set_filter(PNG_FILTER);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.pixels)?;
    }
    Ok(bytes)
}

/// BLAKE3 hash of an encoded PNG's bytes, for callers that want a cheap
/// content fingerprint without re-reading the file.
pub fn hash_png_bytes(bytes: &[u8]) -> blake3::Hash {
    blake3::hash(bytes)
}
