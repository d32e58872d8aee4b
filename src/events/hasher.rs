//! AL-012: BLAKE3 fingerprints for path signatures and catalog files.

use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

const FINGERPRINT_LEN: usize = "blake3:".len() + 16;

/// Fingerprint a canonical path signature: `hash_string` cut to 16 hex digits.
pub fn signature_fingerprint(signature: &str) -> String {
    let mut full = hash_string(signature);
    full.truncate(FINGERPRINT_LEN);
    full
}

/// Hash a catalog file's contents. Returns `"blake3:{hex}"`.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; STREAM_BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| format!("read error {}: {}", path.display(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}
