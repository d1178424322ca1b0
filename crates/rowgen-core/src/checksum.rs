//! Digests used for cache keys and fetched-file verification.

use crate::error::{Result, RowgenError};
use sha2::{Digest, Sha224, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// SHA-224 of a string as lowercase hex. Used to disambiguate cache entries
/// whose URLs differ only in the query string.
pub fn sha224_hex(s: &str) -> String {
    hex::encode(Sha224::digest(s.as_bytes()))
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).map_err(|e| RowgenError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf).map_err(|e| RowgenError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
