//! Message digests

/// Lowercase hex MD5 digest of the raw bytes
pub fn md5_hex(body: &[u8]) -> String {
    format!("{:x}", md5::compute(body))
}
