//! Checksum utilities for payload integrity

use sha2::{Digest, Sha256};
use std::io::Read;

use crate::error::{RelayError, Result};

/// Compute the SHA-256 digest of a byte slice, hex-encoded
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 digest of any readable source, hex-encoded
pub fn sha256_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify that data matches an expected hex-encoded SHA-256 digest
pub fn verify_sha256(data: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(data);
    if actual == expected {
        Ok(())
    } else {
        Err(RelayError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
