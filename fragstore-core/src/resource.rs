/*!
A `Resource` is a container of one or more fragment bodies, stored as a
single blob on the backend. This module defines the catalog-facing metadata
record; the actual byte layout of a resource's inner payload is defined in
`format.rs`.
*/
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::EncapsulationSpec;
use crate::format::{FRAGMENT_HEADER_LEN, HEADER_LEN};
use crate::fragment::FragmentHash;

/// Locally generated identifier for a `Resource`. Distinct from the
/// backend-assigned key, which is only known once the resource has
/// actually been uploaded.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn random() -> ResourceId {
        ResourceId(Uuid::new_v4())
    }

    /// Raw bytes of the underlying UUID, used as the catalog key suffix.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One fragment's position within a resource's inner (pre-wrap,
/// pre-compress) payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentLayoutEntry {
    pub hash: FragmentHash,
    pub offset: u64,
    pub length: u64,
}

/// Catalog record for an assembled, uploaded resource.
///
/// Invariant: the concatenation of the fragment bodies named in
/// `fragment_layout`, encapsulated per `wrapper_spec`, equals the bytes
/// stored under `backend_key`. Resources are immutable from the moment
/// they are sealed until they are deleted as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub backend_key: String,
    pub fragment_layout: Vec<FragmentLayoutEntry>,
    pub wrapper_spec: EncapsulationSpec,
    pub total_size: u64,
}

impl Resource {
    /// Number of fragments packed into this resource.
    pub fn fragment_count(&self) -> usize {
        self.fragment_layout.len()
    }

    /// Sum of the (pre-encapsulation) fragment lengths packed into this
    /// resource — the inner payload size before the second-layer codecs ran.
    pub fn inner_payload_size(&self) -> u64 {
        self.fragment_layout.iter().map(|e| e.length).sum()
    }

    /// Size of the framed inner payload `format::encode` would produce for
    /// this resource's fragments — header plus each fragment's hash/length
    /// prefix plus its body — computed straight from the catalog's layout,
    /// with no need to refetch and re-decode the resource's bytes.
    pub fn framed_inner_size(&self) -> u64 {
        HEADER_LEN
            + self
                .fragment_layout
                .iter()
                .map(|e| FRAGMENT_HEADER_LEN + e.length)
                .sum::<u64>()
    }

    /// Fraction of the resource's second-layer-decoded payload that is
    /// actual fragment data versus framing overhead. Used by `statistic`'s
    /// fill-efficiency report.
    pub fn fill_efficiency(&self, framed_inner_size: u64) -> f64 {
        if framed_inner_size == 0 {
            return 1.0;
        }
        self.inner_payload_size() as f64 / framed_inner_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_round_trips_through_debug() {
        let id = ResourceId::random();
        let id2 = id;
        assert_eq!(id, id2);
    }

    #[test]
    fn fill_efficiency_is_fraction() {
        let resource = Resource {
            id: ResourceId::random(),
            backend_key: "k".to_string(),
            fragment_layout: vec![
                FragmentLayoutEntry {
                    hash: FragmentHash::of(b"a"),
                    offset: 0,
                    length: 50,
                },
                FragmentLayoutEntry {
                    hash: FragmentHash::of(b"b"),
                    offset: 50,
                    length: 50,
                },
            ],
            wrapper_spec: vec![],
            total_size: 120,
        };
        assert_eq!(resource.inner_payload_size(), 100);
        assert!((resource.fill_efficiency(120) - (100.0 / 120.0)).abs() < 1e-9);
    }

    #[test]
    fn framed_inner_size_matches_format_encode() {
        let fragments = vec![
            FragmentLayoutEntry {
                hash: FragmentHash::of(b"a"),
                offset: 0,
                length: 50,
            },
            FragmentLayoutEntry {
                hash: FragmentHash::of(b"b"),
                offset: 50,
                length: 50,
            },
        ];
        let resource = Resource {
            id: ResourceId::random(),
            backend_key: "k".to_string(),
            fragment_layout: fragments,
            wrapper_spec: vec![],
            total_size: 120,
        };

        let framed = crate::format::encode(
            0,
            0,
            &[
                crate::format::FramedFragment {
                    hash: FragmentHash::of(b"a"),
                    body: vec![0u8; 50],
                },
                crate::format::FramedFragment {
                    hash: FragmentHash::of(b"b"),
                    body: vec![0u8; 50],
                },
            ],
        )
        .unwrap();

        assert_eq!(resource.framed_inner_size(), framed.len() as u64);
        let expected = resource.inner_payload_size() as f64 / framed.len() as f64;
        assert!((resource.fill_efficiency(resource.framed_inner_size()) - expected).abs() < 1e-9);
    }
}
