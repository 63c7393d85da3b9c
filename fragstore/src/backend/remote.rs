//! SMB and cloud-service backends. Their credential/OAuth handshakes are
//! external collaborators out of scope for this crate. These variants
//! exist so `Backend::Smb` style selection is representable in
//! configuration; constructing one without a real session always fails
//! fast with `BackendError::Rejected`.

use async_trait::async_trait;

use super::{Backend, BackendError, Result};

/// Placeholder for an SMB share backend. A real implementation would hold
/// an open SMB session handle; this build has nothing to hold.
#[derive(Debug, Clone)]
pub struct Smb {
    share: String,
}

impl Smb {
    /// Always fails: SMB session negotiation is outside this crate's scope.
    pub fn connect(share: impl Into<String>) -> Result<Smb> {
        Err(BackendError::Rejected(format!(
            "SMB backend for share {:?} is not configured in this build",
            share.into()
        )))
    }
}

#[async_trait]
impl Backend for Smb {
    async fn put(&self, _bytes: Vec<u8>) -> Result<String> {
        Err(BackendError::Rejected(format!(
            "SMB backend ({}) not configured in this build",
            self.share
        )))
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Err(BackendError::Rejected(format!(
            "SMB backend ({}) not configured in this build",
            self.share
        )))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Err(BackendError::Rejected(format!(
            "SMB backend ({}) not configured in this build",
            self.share
        )))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(BackendError::Rejected(format!(
            "SMB backend ({}) not configured in this build",
            self.share
        )))
    }
}

/// Placeholder for the two cloud photo-host backends named in the
/// component contract. Both would need an OAuth handshake this crate does
/// not implement; `name` records which one was requested so the rejection
/// is actionable.
#[derive(Debug, Clone)]
pub struct StubCloud {
    name: String,
}

impl StubCloud {
    pub fn connect(name: impl Into<String>) -> Result<StubCloud> {
        let name = name.into();
        Err(BackendError::Rejected(format!(
            "cloud backend {:?} is not configured in this build",
            name
        )))
    }
}

#[async_trait]
impl Backend for StubCloud {
    async fn put(&self, _bytes: Vec<u8>) -> Result<String> {
        Err(BackendError::Rejected(format!(
            "cloud backend {:?} not configured in this build",
            self.name
        )))
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Err(BackendError::Rejected(format!(
            "cloud backend {:?} not configured in this build",
            self.name
        )))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Err(BackendError::Rejected(format!(
            "cloud backend {:?} not configured in this build",
            self.name
        )))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(BackendError::Rejected(format!(
            "cloud backend {:?} not configured in this build",
            self.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smb_connect_fails_fast() {
        assert!(matches!(Smb::connect("share"), Err(BackendError::Rejected(_))));
    }

    #[test]
    fn stub_cloud_connect_fails_fast() {
        assert!(matches!(
            StubCloud::connect("photohost"),
            Err(BackendError::Rejected(_))
        ));
    }
}
