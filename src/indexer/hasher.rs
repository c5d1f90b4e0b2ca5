use std::fs;
use std::path::Path;

use tracing::debug;
use xxhash_rust::xxh3::xxh3_128;

/// Hex digest of `bytes` (128-bit XXH3, 32 lowercase hex chars).
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    format!("{:032x}", xxh3_128(bytes))
}

/// Reads `path` and fingerprints its bytes.
///
/// Returns `None` when the file cannot be read; callers skip the file for
/// this pass.
pub fn read_fingerprinted(path: &Path) -> Option<(Vec<u8>, String)> {
    match fs::read(path) {
        Ok(bytes) => {
            let fingerprint = fingerprint_bytes(&bytes);
            Some((bytes, fingerprint))
        }
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint_bytes(b"def f(): pass\n");
        let b = fingerprint_bytes(b"def f(): pass\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_single_byte_mutation_changes_fingerprint() {
        let original = b"import os\nprint(os.getcwd())\n".to_vec();
        let base = fingerprint_bytes(&original);
        for i in 0..original.len() {
            let mut mutated = original.clone();
            mutated[i] ^= 0x01;
            assert_ne!(base, fingerprint_bytes(&mutated), "collision at byte {}", i);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(fingerprint_bytes(b"").len(), 32);
        assert_ne!(fingerprint_bytes(b""), fingerprint_bytes(b"\n"));
    }

    #[test]
    fn test_read_fingerprinted_matches_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let (bytes, fingerprint) = read_fingerprinted(&path).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(fingerprint, fingerprint_bytes(b"hello"));
    }

    #[test]
    fn test_unreadable_paths_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_fingerprinted(&temp_dir.path().join("missing.py")).is_none());
        assert!(read_fingerprinted(temp_dir.path()).is_none());
    }
}
