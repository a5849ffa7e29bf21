//! BLAKE3 checksums for installed files

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher;

use crate::error::{Result, StartupError};

/// Hash prefix for BLAKE3 checksums
pub const HASH_PREFIX: &str = "blake3:";

/// Checksum of an in-memory buffer
pub fn checksum(bytes: &[u8]) -> String {
    format!("{}{}", HASH_PREFIX, blake3::hash(bytes).to_hex())
}

/// Checksum of a file, streamed in fixed-size chunks.
///
/// Returns the checksum together with the number of bytes read so callers
/// get size and hash from a single pass over the file.
pub fn hash_file(path: &Path) -> Result<(String, u64)> {
    let file = File::open(path).map_err(|e| StartupError::ChecksumIo {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];
    let mut total: u64 = 0;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| StartupError::ChecksumIo {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok((format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex()), total))
}

/// Verify a checksum matches the expected value
pub fn verify_hash(expected: &str, actual: &str) -> bool {
    // Normalize both hashes (ensure prefix)
    let normalize = |h: &str| {
        if h.starts_with(HASH_PREFIX) {
            h.to_string()
        } else {
            format!("{}{}", HASH_PREFIX, h)
        }
    };

    normalize(expected) == normalize(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checksum_is_prefixed_and_stable() {
        let a = checksum(b"test content");
        let b = checksum(b"test content");
        assert!(a.starts_with(HASH_PREFIX));
        assert_eq!(a, b);
        assert_ne!(a, checksum(b"other content"));
    }

    #[test]
    fn test_hash_file_matches_buffer_checksum() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, "test content").unwrap();

        let (hash, size) = hash_file(&file_path).unwrap();
        assert_eq!(hash, checksum(b"test content"));
        assert_eq!(size, 12);
    }

    #[test]
    fn test_hash_file_larger_than_buffer() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("big.bin");
        let content = vec![7u8; 20_000];
        std::fs::write(&file_path, &content).unwrap();

        let (hash, size) = hash_file(&file_path).unwrap();
        assert_eq!(hash, checksum(&content));
        assert_eq!(size, 20_000);
    }

    #[test]
    fn test_hash_file_not_found() {
        let result = hash_file(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(StartupError::ChecksumIo { .. })));
    }

    #[test]
    fn test_verify_hash() {
        let hash1 = format!("{}abc123", HASH_PREFIX);
        let hash2 = hash1.clone();
        assert!(verify_hash(&hash1, &hash2));

        // Test with and without prefix
        assert!(verify_hash(&hash1, "abc123"));

        let hash3 = format!("{}def456", HASH_PREFIX);
        assert!(!verify_hash(&hash1, &hash3));
    }
}
