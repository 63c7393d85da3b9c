/*!
The resource inner format: the framed layout the assembler concatenates
fragment bodies into before the second-layer compressor and wrapper run.

```text
magic bytes   "FRAG"
version       u8
compressor id u8
wrapper id    u8
fragment count u32 (LE)
for each fragment:
    hash      32 bytes
    length    u64 (LE)
    body      `length` bytes
```

All multi-byte integers are little-endian. This framing is what makes a
resource self-describing: given only the inner payload bytes (already
decompressed and unwrapped), a reader can recover each fragment's hash,
length, and body without consulting the catalog.
*/
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use std::io::{Cursor, Read, Write};

use crate::fragment::FragmentHash;

pub const MAGIC: &[u8; 4] = b"FRAG";
pub const FORMAT_VERSION: u8 = 1;

/// Bytes of fixed header before any fragment entries: magic (4) + version
/// (1) + compressor id (1) + wrapper id (1) + fragment count (4).
pub const HEADER_LEN: u64 = 4 + 1 + 1 + 1 + 4;
/// Per-fragment framing overhead before the body: hash (32) + length (8).
pub const FRAGMENT_HEADER_LEN: u64 = 32 + 8;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("I/O error while framing resource payload")]
    IO(#[from] std::io::Error),
    #[error("bad magic bytes: resource payload is not a fragstore resource")]
    BadMagic,
    #[error("unsupported resource format version {0} (this build supports up to {FORMAT_VERSION})")]
    UnsupportedVersion(u8),
    #[error("truncated resource payload")]
    Truncated,
}

type Result<T> = std::result::Result<T, FormatError>;

/// One fragment as it appears framed inside a resource's inner payload.
pub struct FramedFragment {
    pub hash: FragmentHash,
    pub body: Vec<u8>,
}

/// Concatenates framed fragments into a resource's inner payload,
/// prefixed with the magic/version/codec-id header.
pub fn encode(
    compressor_id: u8,
    wrapper_id: u8,
    fragments: &[FramedFragment],
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.write_all(MAGIC)?;
    out.write_u8(FORMAT_VERSION)?;
    out.write_u8(compressor_id)?;
    out.write_u8(wrapper_id)?;
    out.write_u32::<LittleEndian>(fragments.len() as u32)?;
    for fragment in fragments {
        out.write_all(fragment.hash.as_bytes())?;
        out.write_u64::<LittleEndian>(fragment.body.len() as u64)?;
        out.write_all(&fragment.body)?;
    }
    Ok(out)
}

/// The parsed header of a resource's inner payload, without re-copying
/// every fragment body (callers slice bodies out of the original buffer
/// by offset/length instead).
pub struct DecodedHeader {
    pub compressor_id: u8,
    pub wrapper_id: u8,
    pub layout: Vec<(FragmentHash, u64, u64)>, // (hash, offset, length) — offsets are relative to the payload start, past the header.
}

/// Parses the header and fragment layout of a framed resource payload,
/// without copying fragment bodies.
pub fn decode_header(payload: &[u8]) -> Result<DecodedHeader> {
    let mut cursor = Cursor::new(payload);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic).map_err(|_| FormatError::Truncated)?;
    if &magic != MAGIC {
        return Err(FormatError::BadMagic);
    }
    let version = cursor.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    let compressor_id = cursor.read_u8()?;
    let wrapper_id = cursor.read_u8()?;
    let count = cursor.read_u32::<LittleEndian>()?;

    let mut layout = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut hash_bytes = [0u8; 32];
        cursor
            .read_exact(&mut hash_bytes)
            .map_err(|_| FormatError::Truncated)?;
        let hash = FragmentHash::from_bytes(&hash_bytes);
        let length = cursor.read_u64::<LittleEndian>()?;
        let offset = cursor.position();
        if offset + length > payload.len() as u64 {
            return Err(FormatError::Truncated);
        }
        layout.push((hash, offset, length));
        cursor.set_position(offset + length);
    }
    Ok(DecodedHeader {
        compressor_id,
        wrapper_id,
        layout,
    })
}

/// Fully decodes a framed resource payload back into its constituent
/// fragments, copying each body out.
pub fn decode(payload: &[u8]) -> Result<Vec<FramedFragment>> {
    let header = decode_header(payload)?;
    let mut out = Vec::with_capacity(header.layout.len());
    for (hash, offset, length) in header.layout {
        let start = offset as usize;
        let end = start + length as usize;
        out.push(FramedFragment {
            hash,
            body: payload[start..end].to_vec(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_multiple_fragments() {
        let fragments = vec![
            FramedFragment {
                hash: FragmentHash::of(b"one"),
                body: b"one".to_vec(),
            },
            FramedFragment {
                hash: FragmentHash::of(b"two-two"),
                body: b"two-two".to_vec(),
            },
            FramedFragment {
                hash: FragmentHash::of(b""),
                body: Vec::new(),
            },
        ];
        let encoded = encode(0, 0, &fragments).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.len(), fragments.len());
        for (a, b) in fragments.iter().zip(decoded.iter()) {
            assert_eq!(a.hash, b.hash);
            assert_eq!(a.body, b.body);
        }
    }

    #[test]
    fn rejects_bad_magic() {
        let payload = b"not a resource".to_vec();
        assert!(matches!(decode(&payload), Err(FormatError::BadMagic)));
    }

    #[test]
    fn rejects_truncated_payload() {
        let fragments = vec![FramedFragment {
            hash: FragmentHash::of(b"one"),
            body: b"one".to_vec(),
        }];
        let mut encoded = encode(0, 0, &fragments).unwrap();
        encoded.truncate(encoded.len() - 2);
        assert!(matches!(decode(&encoded), Err(FormatError::Truncated)));
    }
}
