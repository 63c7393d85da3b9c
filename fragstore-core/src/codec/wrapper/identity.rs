//! Pass-through wrapper for backends that accept arbitrary binary data.

/// Returns `data` unchanged.
pub fn wrap(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

/// Returns `container` unchanged.
pub fn unwrap(container: &[u8]) -> Vec<u8> {
    container.to_vec()
}
