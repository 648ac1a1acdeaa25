// SPDX-License-Identifier: MPL-2.0

//! Recording file locations

use crate::constants::recording::FILE_EXTENSION;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default directory for recordings: the user's documents directory
///
/// Falls back to the home directory, then the working directory.
pub fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Fresh `<uuid>.mov` path inside `dir`
///
/// Creates `dir` if needed. A file already at the generated path is removed
/// so the recording never appends to stale data.
pub fn recording_output_path(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir
        .join(uuid::Uuid::new_v4().to_string())
        .with_extension(FILE_EXTENSION);

    if path.exists() {
        debug!(path = %path.display(), "Removing stale file at recording path");
        std::fs::remove_file(&path)?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_is_uuid_mov() {
        let dir = tempfile::tempdir().unwrap();
        let path = recording_output_path(dir.path()).unwrap();

        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mov"));
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap();
        assert!(uuid::Uuid::parse_str(stem).is_ok());
        assert!(!path.exists());
    }

    #[test]
    fn test_output_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = recording_output_path(dir.path()).unwrap();
        let b = recording_output_path(dir.path()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos").join("camera");
        let path = recording_output_path(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(path.starts_with(&nested));
    }
}
