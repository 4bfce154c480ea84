//! Content digests for chunk verification
//!
//! Chunks are content-addressed by the lowercase hex SHA-256 of their bytes.

use crate::error::{ArchiveError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the SHA-256 digest of bytes
pub fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 digest of a file
pub fn compute_file_digest(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify that chunk bytes match the digest recorded for them
pub fn verify_digest(chunk_id: u64, data: &[u8], expected: &str) -> Result<()> {
    let actual = compute_digest(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ArchiveError::ChecksumMismatch {
            chunk_id,
            expected: expected.to_string(),
            actual,
        })
    }
}
