//! Free-space probing
//!
//! The backup manager asks a `SpaceProbe` how many bytes are available at the
//! backup location. The system probe asks the OS; tests inject a fixed value.

use std::io;
use std::path::Path;

/// Reports the bytes available to the current user at a path
pub trait SpaceProbe: Send + Sync {
    fn available_space(&self, path: &Path) -> io::Result<u64>;
}

/// Queries the filesystem holding the path
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpace;

impl SpaceProbe for SystemSpace {
    fn available_space(&self, path: &Path) -> io::Result<u64> {
        // The backup root may not exist yet; probe its nearest existing ancestor.
        let probe = path
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or_else(|| Path::new("."));
        fs2::available_space(probe)
    }
}

/// Always reports the same number of bytes
#[derive(Debug, Clone, Copy)]
pub struct FixedSpace(pub u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.0)
    }
}

/// Bytes needed to back up `total` bytes with the given safety factor
pub fn required_space(total: u64, safety_factor: f64) -> u64 {
    // Integer per-mille arithmetic keeps 1000 * 1.2 at exactly 1200.
    let permille = (safety_factor * 1000.0).round() as u128;
    let required = (total as u128 * permille).div_ceil(1000);
    u64::try_from(required).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_required_space_rounds_up() {
        assert_eq!(required_space(1000, 1.2), 1200);
        assert_eq!(required_space(1, 1.2), 2);
        assert_eq!(required_space(0, 1.2), 0);
    }

    #[test]
    fn test_system_space_probes_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("not").join("yet");
        assert!(SystemSpace.available_space(&missing).is_ok());
    }

    #[test]
    fn test_fixed_space() {
        assert_eq!(FixedSpace(42).available_space(Path::new("/")).unwrap(), 42);
    }
}
