/*!
This module contains the data structures and methods for interacting with
selectable compression algorithms.

A `Compression` value both names the algorithm used and carries whatever
parameters that algorithm needs, so a single value is enough to decompress
bytes produced under it later: the catalog stores the `Compression` used
for a fragment or a resource alongside the bytes it describes, and decode
is self-describing from that point on.
*/

use serde::{Deserialize, Serialize};
use std::io::copy;
use std::io::Cursor;
use thiserror::Error;

#[cfg(feature = "zstd")]
use std::io;

#[cfg(feature = "lz4")]
use lz4::{Decoder, EncoderBuilder};
#[cfg(feature = "xz2")]
use xz2::read::{XzDecoder, XzEncoder};

/// Error describing things that can go wrong compressing or decompressing a
/// fragment or resource body.
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("I/O error while (de)compressing")]
    IOError(#[from] std::io::Error),
    #[cfg(feature = "zstd")]
    #[error("zstd codec error")]
    ZstdError(String),
}

type Result<T> = std::result::Result<T, CompressionError>;

/// Marker for the compression algorithm used by a particular fragment or
/// resource body.
#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Compression {
    NoCompression,
    Zstd { level: i32 },
    Lz4 { level: u32 },
    Xz { level: u32 },
}

impl Compression {
    /// Compresses `data` with the algorithm indicated by this marker.
    pub fn compress(self, data: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            Compression::NoCompression => Ok(data),
            #[cfg(feature = "zstd")]
            Compression::Zstd { level } => {
                let mut output = Vec::<u8>::with_capacity(data.len());
                zstd::stream::copy_encode(data.as_slice(), &mut output, level)
                    .map_err(|e| CompressionError::ZstdError(e.to_string()))?;
                Ok(output)
            }
            #[cfg(not(feature = "zstd"))]
            Compression::Zstd { .. } => {
                unimplemented!("fragstore-core was not compiled with zstd support")
            }
            #[cfg(feature = "lz4")]
            Compression::Lz4 { level } => {
                let output = Vec::<u8>::with_capacity(data.len());
                let cursor = Cursor::new(output);
                let mut encoder = EncoderBuilder::new().level(level).build(cursor)?;
                let mut data = Cursor::new(data);
                copy(&mut data, &mut encoder)?;
                let (cursor, result) = encoder.finish();
                result?;
                Ok(cursor.into_inner())
            }
            #[cfg(not(feature = "lz4"))]
            Compression::Lz4 { .. } => {
                unimplemented!("fragstore-core was not compiled with lz4 support")
            }
            #[cfg(feature = "xz2")]
            Compression::Xz { level } => {
                let input = Cursor::new(data);
                let mut output = Cursor::new(Vec::new());
                let mut compressor = XzEncoder::new(input, level);
                copy(&mut compressor, &mut output)?;
                Ok(output.into_inner())
            }
            #[cfg(not(feature = "xz2"))]
            Compression::Xz { .. } => {
                unimplemented!("fragstore-core was not compiled with xz support")
            }
        }
    }

    /// Decompresses `data`, assuming it was compressed under this marker.
    pub fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            Compression::NoCompression => Ok(data),
            #[cfg(feature = "zstd")]
            Compression::Zstd { .. } => {
                let mut output = Vec::<u8>::new();
                zstd::stream::copy_decode(data.as_slice(), &mut output)
                    .map_err(|e: io::Error| CompressionError::ZstdError(e.to_string()))?;
                Ok(output)
            }
            #[cfg(not(feature = "zstd"))]
            Compression::Zstd { .. } => {
                unimplemented!("fragstore-core was not compiled with zstd support")
            }
            #[cfg(feature = "lz4")]
            Compression::Lz4 { .. } => {
                let mut output = Cursor::new(Vec::<u8>::new());
                let mut decoder = Decoder::new(Cursor::new(data))?;
                copy(&mut decoder, &mut output)?;
                let (_output, result) = decoder.finish();
                result?;
                Ok(output.into_inner())
            }
            #[cfg(not(feature = "lz4"))]
            Compression::Lz4 { .. } => {
                unimplemented!("fragstore-core was not compiled with lz4 support")
            }
            #[cfg(feature = "xz2")]
            Compression::Xz { .. } => {
                let input = Cursor::new(data);
                let mut output = Cursor::new(Vec::new());
                let mut decompressor = XzDecoder::new(input);
                copy(&mut decompressor, &mut output)?;
                Ok(output.into_inner())
            }
            #[cfg(not(feature = "xz2"))]
            Compression::Xz { .. } => {
                unimplemented!("fragstore-core was not compiled with xz support")
            }
        }
    }

    /// Short identifier used in the resource inner-format header (`format.rs`).
    pub fn wire_tag(self) -> u8 {
        match self {
            Compression::NoCompression => 0,
            Compression::Zstd { .. } => 1,
            Compression::Lz4 { .. } => 2,
            Compression::Xz { .. } => 3,
        }
    }
}
