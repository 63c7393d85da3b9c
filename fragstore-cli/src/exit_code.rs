//! Maps a failed command's error back to the exit codes §6 specifies.
//!
//! `structopt`/`clap` already call `std::process::exit(2)` themselves on a
//! bad command line, so this module only has to classify errors that
//! surface from inside a command once parsing succeeded.

use fragstore::{BackendError, CatalogError, CompoundManagerError, SessionError};

pub const SUCCESS: i32 = 0;
pub const GENERIC_FAILURE: i32 = 1;
pub const USAGE_ERROR: i32 = 2;
pub const BACKEND_UNAVAILABLE: i32 = 3;
pub const CATALOG_CORRUPT: i32 = 4;
pub const INTEGRITY_FAILED: i32 = 5;

/// Walks every link of an `anyhow::Error`'s cause chain looking for a typed
/// error this crate knows how to classify — `.context(...)` wraps the
/// original error rather than replacing it, so the type we actually care
/// about is rarely the outermost one.
pub fn classify(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<CompoundManagerError>() {
            return classify_compound_manager(e);
        }
        if let Some(e) = cause.downcast_ref::<SessionError>() {
            return match e {
                SessionError::Backend(b) => classify_backend(b),
                SessionError::Catalog(_) => CATALOG_CORRUPT,
                _ => GENERIC_FAILURE,
            };
        }
        if let Some(e) = cause.downcast_ref::<CatalogError>() {
            return classify_catalog(e);
        }
        if let Some(e) = cause.downcast_ref::<BackendError>() {
            return classify_backend(e);
        }
    }
    GENERIC_FAILURE
}

fn classify_compound_manager(err: &CompoundManagerError) -> i32 {
    match err {
        CompoundManagerError::Usage(_) | CompoundManagerError::CompoundExists(_) => USAGE_ERROR,
        CompoundManagerError::CompoundCorrupt { .. } | CompoundManagerError::ResourceCorrupt { .. } => {
            INTEGRITY_FAILED
        }
        CompoundManagerError::Catalog(e) => classify_catalog(e),
        CompoundManagerError::Backend(e) => classify_backend(e),
        _ => GENERIC_FAILURE,
    }
}

fn classify_catalog(err: &CatalogError) -> i32 {
    match err {
        CatalogError::Corrupt(_) => CATALOG_CORRUPT,
        _ => GENERIC_FAILURE,
    }
}

fn classify_backend(err: &BackendError) -> i32 {
    match err {
        BackendError::Unavailable(_) => BACKEND_UNAVAILABLE,
        _ => GENERIC_FAILURE,
    }
}
