/*!
Reversible byte transforms applied to fragment and resource bodies.

`compression` provides the generic compress/decompress pair applied at
both the fragment (first) layer and the resource (second) layer.
`wrapper` provides the container-format transform that makes a resource's
bytes acceptable to a backend that only takes specific formats.
*/
pub mod compression;
pub mod wrapper;

use compression::Compression;
use serde::{Deserialize, Serialize};
use wrapper::Wrapper;

/// One step of an encapsulation pipeline: either a compression pass or a
/// container wrap. An `EncapsulationSpec` is always applied compress-then-
/// wrap, per step, in order — never wrap-then-compress, since a wrapper's
/// output must remain a valid container and compressing it afterward would
/// both break that and throw away the wrapper's own structure.
#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Layer {
    Compress(Compression),
    Wrap(Wrapper),
}

/// An ordered list of codecs applied at one layer (first or second) of
/// encapsulation.
pub type EncapsulationSpec = Vec<Layer>;

/// Applies an `EncapsulationSpec` to `data` in order.
pub fn apply(spec: &EncapsulationSpec, mut data: Vec<u8>) -> Result<Vec<u8>, EncapsulationError> {
    for layer in spec {
        data = match layer {
            Layer::Compress(c) => c.compress(data)?,
            Layer::Wrap(w) => w.wrap(&data)?,
        };
    }
    Ok(data)
}

/// Reverses an `EncapsulationSpec` applied to `data`, in reverse order.
pub fn reverse(spec: &EncapsulationSpec, mut data: Vec<u8>) -> Result<Vec<u8>, EncapsulationError> {
    for layer in spec.iter().rev() {
        data = match layer {
            Layer::Compress(c) => c.decompress(data)?,
            Layer::Wrap(w) => w.unwrap(&data)?,
        };
    }
    Ok(data)
}

/// Error applying or reversing an `EncapsulationSpec`.
#[derive(thiserror::Error, Debug)]
pub enum EncapsulationError {
    #[error("compression error")]
    Compression(#[from] compression::CompressionError),
    #[error("wrapper error")]
    Wrapper(#[from] wrapper::WrapperError),
}
