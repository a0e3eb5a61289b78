//! Whole-file content hashing
//!
//! SHA-256 over the full file contents, streamed in fixed-size chunks. Used
//! for restore verification and for the project-state fingerprint.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 64 * 1024;

/// Size and content hash of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub size: u64,
    pub hash: String,
}

/// Hash a file's full contents, returning the lowercase hex digest
pub fn hash_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Size plus content hash, following symlinks
pub fn file_digest(path: &Path) -> io::Result<FileDigest> {
    let size = std::fs::metadata(path)?.len();
    let hash = hash_file(path)?;
    Ok(FileDigest { size, hash })
}

/// Hash an in-memory string
pub fn hash_str(data: &str) -> String {
    format!("{:x}", Sha256::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_matches_known_digest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(
            hash_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_str("abc"), hash_file(&path).unwrap());
    }

    #[test]
    fn test_digest_differs_with_content() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("b.txt");
        std::fs::write(&a, "one").unwrap();
        std::fs::write(&b, "two").unwrap();

        let da = file_digest(&a).unwrap();
        let db = file_digest(&b).unwrap();
        assert_eq!(da.size, db.size);
        assert_ne!(da.hash, db.hash);
    }

    #[test]
    fn test_missing_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        assert!(hash_file(&temp_dir.path().join("missing")).is_err());
    }
}
