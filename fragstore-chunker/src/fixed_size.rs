use super::{Chunker, ChunkerError};

use std::io::{BufReader, Bytes, Read};

/// Settings for a fixed chunk length `Chunker`
///
/// This is a pretty simple chunker, it simply splits the contents into `len` sized
/// chunks. Has a comparatively poor reduplication ratio, due to the boundary shift
/// problem, but it has more performance than just about anything else out there.
#[derive(Clone, Copy)]
pub struct FixedSize {
    pub len: usize,
}

impl Chunker for FixedSize {
    type Chunks = FixedSizeChunker;
    fn chunk_boxed(&self, read: Box<dyn Read + Send + 'static>) -> Self::Chunks {
        FixedSizeChunker {
            settings: *self,
            internal: BufReader::new(read).bytes(),
            next: None,
        }
    }
}

impl Default for FixedSize {
    /// Provides default settings with a chunk size of 64kiB
    fn default() -> Self {
        FixedSize { len: 65_536 }
    }
}

pub struct FixedSizeChunker {
    /// Settings for this `Chunker`
    settings: FixedSize,
    /// `Read` this `Chunker` is slicing over
    internal: Bytes<BufReader<Box<dyn Read + Send + 'static>>>,
    next: Option<std::io::Result<u8>>,
}

impl Iterator for FixedSizeChunker {
    type Item = Result<Vec<u8>, ChunkerError>;
    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = Vec::new();
        let mut next = if self.next.is_some() {
            self.next.take()
        } else {
            self.internal.next()
        };
        while next.is_some() && buffer.len() < self.settings.len {
            // This unwrap is safe because we just verified that it is a Some(T)
            let byte = next.unwrap();
            let byte = match byte {
                Ok(byte) => byte,
                Err(err) => return Some(Err(err.into())),
            };
            buffer.push(byte);
            next = self.internal.next();
        }
        if buffer.is_empty() {
            None
        } else {
            self.next = next;
            Some(Ok(buffer))
        }
    }
}
