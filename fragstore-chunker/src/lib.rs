//! API for describing types that can slice a byte stream into fixed-size
//! fragments in a repeatable manner.
//!
//! Content-defined chunking is deliberately not provided here: this system
//! only deduplicates fixed-size fragments, so two fragmenters that agree on
//! `fragment_size` always cut a given stream at the same offsets.

pub mod fixed_size;
pub use self::fixed_size::FixedSize;

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("Provider IO error")]
    IOError(#[from] io::Error),
    #[error("Internal Chunker Error")]
    InternalError(String),
}

use std::io::{Cursor, Read};

/// Describes something that can slice a byte stream into chunks in a
/// defined, repeatable manner.
///
/// Chunkers must meet three properties:
/// 1.) Data must be split into one or more chunks.
/// 2.) Data must be identical to the original after reconstruction by
///     concatenation.
/// 3.) The same data and settings must produce the same slices every time.
///
/// Chunkers should contain only a small number of settings for the
/// chunking algorithm, and should therefore be cheap to clone.
pub trait Chunker: Clone {
    type Chunks: Iterator<Item = Result<Vec<u8>, ChunkerError>>;
    /// Core function: takes a boxed owned `Read` and produces an iterator
    /// of `Vec<u8>` over it.
    fn chunk_boxed(&self, read: Box<dyn Read + Send + 'static>) -> Self::Chunks;
    /// Boxes a bare `Read` and passes it to `chunk_boxed`.
    fn chunk<R: Read + Send + 'static>(&self, read: R) -> Self::Chunks {
        let boxed: Box<dyn Read + Send + 'static> = Box::new(read);
        self.chunk_boxed(boxed)
    }
    /// Boxes an `AsRef<[u8]>` wrapped in a `Cursor` and passes it to
    /// `chunk_boxed`.
    fn chunk_slice<R: AsRef<[u8]> + Send + 'static>(&self, slice: R) -> Self::Chunks {
        let cursor = Cursor::new(slice);
        let boxed: Box<dyn Read + Send + 'static> = Box::new(cursor);
        self.chunk_boxed(boxed)
    }
}
