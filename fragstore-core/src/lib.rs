/*!
This crate contains the data structures shared between every layer of a
fragstore installation: the content-addressed `Fragment`, the `Resource`
container that packs fragments together, the `Compound` that names an
ordered sequence of fragments, the codecs used to compress and wrap bytes,
and the on-the-wire framing of a resource's inner payload.

When a data structure in this crate derives `Serialize`/`Deserialize`, the
`bincode` encoding of that structure is the canonical on-disk representation
used by the catalog implementations in the `fragstore` crate.
*/
#![warn(clippy::all)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

pub mod codec;
pub mod compound;
pub mod format;
pub mod fragment;
pub mod resource;

pub use codec::compression::{Compression, CompressionError};
pub use codec::wrapper::{Wrapper, WrapperError};
pub use codec::{apply, reverse, EncapsulationError, EncapsulationSpec, Layer};
pub use compound::{Compound, StreamHash, StreamHasher};
pub use fragment::{Fragment, FragmentHash, FragmentRef};
pub use resource::{FragmentLayoutEntry, Resource, ResourceId};
