//! Bounded in-memory caches that amortize backend I/O: a resource-body
//! cache for downloads (C5) and a pending-fragment buffer for uploads (C7).

pub mod fragment_cache;
pub mod resource_cache;

pub use fragment_cache::FragmentCache;
pub use resource_cache::ResourceCache;
