//! Hex-encodes a payload into the text content of a minimal SVG document.
//!
//! Fallback wrapper for backends that reject PNG but will accept a vector
//! image format. At least 2x overhead (hex expansion), so `Png` is
//! preferred wherever the backend tolerates it.

use super::{Result, WrapperError};

const PREFIX: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" data-len=\"";
const MID: &str = "\"><text>";
const SUFFIX: &str = "</text></svg>";

/// Wraps `data` into an SVG document carrying its hex encoding.
pub fn wrap(data: &[u8]) -> Vec<u8> {
    let mut out = String::with_capacity(PREFIX.len() + MID.len() + SUFFIX.len() + data.len() * 2 + 8);
    out.push_str(PREFIX);
    out.push_str(&data.len().to_string());
    out.push_str(MID);
    for byte in data {
        out.push_str(&format!("{:02x}", byte));
    }
    out.push_str(SUFFIX);
    out.into_bytes()
}

/// Recovers the payload from an SVG document produced by [`wrap`].
pub fn unwrap(container: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(container)
        .map_err(|_| WrapperError::Malformed("svg wrapper: not valid utf-8".to_string()))?;

    let rest = text
        .strip_prefix(PREFIX)
        .ok_or_else(|| WrapperError::Malformed("svg wrapper: missing header".to_string()))?;
    let mid_pos = rest
        .find(MID)
        .ok_or_else(|| WrapperError::Malformed("svg wrapper: missing text node".to_string()))?;
    let declared_len: u64 = rest[..mid_pos]
        .parse()
        .map_err(|_| WrapperError::Malformed("svg wrapper: bad data-len attribute".to_string()))?;

    let hex_start = mid_pos + MID.len();
    let hex_and_rest = &rest[hex_start..];
    let hex = hex_and_rest
        .strip_suffix(SUFFIX)
        .ok_or_else(|| WrapperError::Malformed("svg wrapper: missing footer".to_string()))?;

    let mut data = Vec::with_capacity(hex.len() / 2);
    let bytes = hex.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(WrapperError::Malformed(
            "svg wrapper: odd-length hex payload".to_string(),
        ));
    }
    for chunk in bytes.chunks(2) {
        let s = std::str::from_utf8(chunk).unwrap();
        let byte = u8::from_str_radix(s, 16)
            .map_err(|_| WrapperError::Malformed("svg wrapper: invalid hex digit".to_string()))?;
        data.push(byte);
    }

    if data.len() as u64 != declared_len {
        return Err(WrapperError::LengthMismatch {
            declared: declared_len,
            actual: data.len() as u64,
        });
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let data: Vec<u8> = (0..=255u8).collect();
        let wrapped = wrap(&data);
        let unwrapped = unwrap(&wrapped).unwrap();
        assert_eq!(data, unwrapped);
    }

    #[test]
    fn round_trips_empty() {
        let data: Vec<u8> = Vec::new();
        let wrapped = wrap(&data);
        let unwrapped = unwrap(&wrapped).unwrap();
        assert_eq!(data, unwrapped);
    }

    #[test]
    fn rejects_tampered_length() {
        let data = b"hello world".to_vec();
        let wrapped = wrap(&data);
        let mut text = String::from_utf8(wrapped).unwrap();
        text = text.replacen("data-len=\"11\"", "data-len=\"999\"", 1);
        let result = unwrap(text.as_bytes());
        assert!(matches!(result, Err(WrapperError::LengthMismatch { .. })));
    }
}
