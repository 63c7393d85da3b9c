//! Encodes a payload as pixel data inside a valid, losslessly compressed
//! PNG image.
//!
//! This is the preferred wrapper: low overhead, decodable by every photo
//! host, and the pixels survive being re-served or re-encoded by hosts that
//! merely re-save the file (but not ones that re-compress lossily — that is
//! an explicit limitation of steganographic wrappers in general, not just
//! this one).
//!
//! # Pixel layout (interop appendix)
//!
//! The payload is laid out as the raw RGB8 buffer of a PNG whose dimensions
//! are chosen to be the smallest roughly-square rectangle that holds an
//! 8-byte little-endian length header followed by the payload itself. Any
//! trailing pixels past the payload are zero. Decode reads the 8-byte
//! header first, then takes exactly that many bytes from what follows; it
//! never trusts the image dimensions alone, since a corrupted or
//! re-compressed image could have drifted in size.

use image::{ImageBuffer, Rgb, RgbImage};

use super::{Result, WrapperError};

const HEADER_LEN: usize = 8;

fn dimensions_for(total_bytes: usize) -> (u32, u32) {
    let pixels_needed = (total_bytes + 2) / 3;
    let width = (pixels_needed as f64).sqrt().ceil() as u32;
    let width = width.max(1);
    let height = ((pixels_needed as u32) + width - 1) / width;
    let height = height.max(1);
    (width, height)
}

/// Wraps `data` into a PNG whose pixels carry the payload.
pub fn wrap(data: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(HEADER_LEN + data.len());
    buffer.extend_from_slice(&(data.len() as u64).to_le_bytes());
    buffer.extend_from_slice(data);

    let (width, height) = dimensions_for(buffer.len());
    let capacity = (width as usize) * (height as usize) * 3;
    buffer.resize(capacity, 0);

    let image: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        let pixel_index = (y as usize) * (width as usize) + x as usize;
        let byte_index = pixel_index * 3;
        Rgb([
            buffer[byte_index],
            buffer[byte_index + 1],
            buffer[byte_index + 2],
        ])
    });

    let mut out = Vec::new();
    image
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .map_err(|e| WrapperError::Png(e.to_string()))?;
    Ok(out)
}

/// Recovers the payload from a PNG produced by [`wrap`].
pub fn unwrap(container: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory_with_format(container, image::ImageFormat::Png)
        .map_err(|e| WrapperError::Png(e.to_string()))?
        .to_rgb8();
    let raw = image.into_raw();

    if raw.len() < HEADER_LEN {
        return Err(WrapperError::Malformed(
            "png wrapper: image too small to carry a length header".to_string(),
        ));
    }
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&raw[..HEADER_LEN]);
    let declared_len = u64::from_le_bytes(header);

    let available = (raw.len() - HEADER_LEN) as u64;
    if declared_len > available {
        return Err(WrapperError::LengthMismatch {
            declared: declared_len,
            actual: available,
        });
    }

    let start = HEADER_LEN;
    let end = start + declared_len as usize;
    Ok(raw[start..end].to_vec())
}
