/*!
A `Wrapper` is a reversible transform that makes a resource's bytes
acceptable to a backend which only accepts a specific container format.

`unwrap(wrap(x)) == x` must hold for every wrapper and every `x`; decoders
additionally refuse to unwrap a container whose declared payload length
does not match what was actually recovered, surfacing
`WrapperError::LengthMismatch` (the caller maps this to `ResourceCorrupt`).
*/
pub mod identity;
pub mod png;
pub mod svg;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error describing things that can go wrong wrapping or unwrapping a
/// resource body.
#[derive(Error, Debug)]
pub enum WrapperError {
    #[error("wrapped container is malformed: {0}")]
    Malformed(String),
    #[error("container declared length {declared} but carried {actual} bytes")]
    LengthMismatch { declared: u64, actual: u64 },
    #[error("PNG codec error")]
    Png(String),
}

type Result<T> = std::result::Result<T, WrapperError>;

/// Marker for the container format a resource's bytes are wrapped in.
#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Wrapper {
    /// Pass-through, for backends that accept arbitrary binary data.
    Identity,
    /// Encodes the payload as pixel data inside a valid, losslessly
    /// compressed PNG.
    Png,
    /// Hex-encodes the payload into the text content of a minimal SVG
    /// document.
    Svg,
}

impl Wrapper {
    /// Wraps `data` so that it is acceptable to a backend constrained to
    /// this container format.
    pub fn wrap(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Wrapper::Identity => Ok(identity::wrap(data)),
            Wrapper::Png => png::wrap(data),
            Wrapper::Svg => Ok(svg::wrap(data)),
        }
    }

    /// Recovers the original bytes passed to `wrap`.
    pub fn unwrap(self, container: &[u8]) -> Result<Vec<u8>> {
        match self {
            Wrapper::Identity => Ok(identity::unwrap(container)),
            Wrapper::Png => png::unwrap(container),
            Wrapper::Svg => svg::unwrap(container),
        }
    }

    /// Short identifier used in the resource inner-format header.
    pub fn wire_tag(self) -> u8 {
        match self {
            Wrapper::Identity => 0,
            Wrapper::Png => 1,
            Wrapper::Svg => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut v = Vec::with_capacity(4096);
        for i in 0..4096u32 {
            v.push((i % 251) as u8);
        }
        v
    }

    #[test]
    fn identity_inverse() {
        let data = sample();
        let wrapped = Wrapper::Identity.wrap(&data).unwrap();
        let unwrapped = Wrapper::Identity.unwrap(&wrapped).unwrap();
        assert_eq!(data, unwrapped);
    }

    #[test]
    fn svg_inverse() {
        let data = sample();
        let wrapped = Wrapper::Svg.wrap(&data).unwrap();
        let unwrapped = Wrapper::Svg.unwrap(&wrapped).unwrap();
        assert_eq!(data, unwrapped);
    }

    #[cfg(feature = "image")]
    #[test]
    fn png_inverse() {
        let data = sample();
        let wrapped = Wrapper::Png.wrap(&data).unwrap();
        let unwrapped = Wrapper::Png.unwrap(&wrapped).unwrap();
        assert_eq!(data, unwrapped);
    }

    #[cfg(feature = "image")]
    #[test]
    fn png_empty_inverse() {
        let data: Vec<u8> = Vec::new();
        let wrapped = Wrapper::Png.wrap(&data).unwrap();
        let unwrapped = Wrapper::Png.unwrap(&wrapped).unwrap();
        assert_eq!(data, unwrapped);
    }
}
