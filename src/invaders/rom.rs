//! Program image loading for the arcade core.
//!
//! Grounded on `spaceinvaders_load_file`: the combined ROM dump (all four
//! 2 KiB chips concatenated) is a single file of at most 16 KiB, loaded
//! verbatim into the low end of the machine's address space.

use std::fs;
use std::path::Path;

use crate::error::EmuError;

/// Maximum size of an arcade program image (`0x4000` bytes, matching the
/// combined-ROM loader mandated by spec.md §9).
pub const MAX_IMAGE_LEN: usize = 0x4000;

/// Read and validate a raw program image from disk. Returns the bytes
/// unpadded; the caller copies them into the machine's memory array at
/// offset 0.
pub fn load_image(path: &Path) -> Result<Vec<u8>, EmuError> {
    let meta = fs::metadata(path).map_err(|e| EmuError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !meta.is_file() {
        return Err(EmuError::Load {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    let bytes = fs::read(path).map_err(|e| EmuError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if bytes.is_empty() {
        return Err(EmuError::Load {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }
    if bytes.len() > MAX_IMAGE_LEN {
        return Err(EmuError::Load {
            path: path.to_path_buf(),
            reason: format!(
                "file too large ({} bytes); input the invaders image combined (max {MAX_IMAGE_LEN})",
                bytes.len()
            ),
        });
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn rejects_oversized_image() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&vec![0u8; MAX_IMAGE_LEN + 1]).unwrap();
        let err = load_image(f.path()).unwrap_err();
        assert!(matches!(err, EmuError::Load { .. }));
    }

    #[test]
    fn rejects_empty_file() {
        let f = NamedTempFile::new().unwrap();
        let err = load_image(f.path()).unwrap_err();
        assert!(matches!(err, EmuError::Load { .. }));
    }

    #[test]
    fn accepts_image_at_the_boundary() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&vec![0xAAu8; MAX_IMAGE_LEN]).unwrap();
        let bytes = load_image(f.path()).unwrap();
        assert_eq!(bytes.len(), MAX_IMAGE_LEN);
    }
}
