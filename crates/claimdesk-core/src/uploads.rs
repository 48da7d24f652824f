//! Photo upload storage on the local filesystem.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{DeskError, Result};

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// Path separators become spaces, whitespace runs collapse to `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped, and leading or trailing `.`/`_` are
/// trimmed. Returns `None` when nothing usable remains.
#[must_use]
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let spaced: String = raw
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Directory holding uploaded photos, addressed by sanitized filename.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a stored filename. Names that would not survive
    /// sanitizing are treated as missing.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::FileNotFound`] for names that are not flat and
    /// already sanitized.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        match sanitize_filename(filename) {
            Some(clean) if clean == filename => Ok(self.root.join(clean)),
            _ => Err(DeskError::FileNotFound(filename.to_string())),
        }
    }

    /// Write `bytes` under the sanitized form of `original_name`, replacing
    /// any file of the same name. Returns the stored name.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name sanitizes to nothing, or a
    /// file-write error if the directory or file cannot be written.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let filename = sanitize_filename(original_name)
            .ok_or_else(|| DeskError::validation("photos", "photo filename is not usable"))?;

        std::fs::create_dir_all(&self.root).map_err(|source| DeskError::FileWrite {
            path: self.root.clone(),
            source,
        })?;
        let path = self.root.join(&filename);
        std::fs::write(&path, bytes).map_err(|source| DeskError::FileWrite {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "stored upload");
        Ok(filename)
    }

    /// Read a stored photo.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::FileNotFound`] if the file is absent.
    pub fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.path_for(filename)?;
        std::fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                DeskError::FileNotFound(filename.to_string())
            } else {
                DeskError::FileWrite { path, source }
            }
        })
    }

    /// Delete a stored photo. A file that is already gone yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns a file error for I/O failures other than not-found.
    pub fn remove(&self, filename: &str) -> Result<bool> {
        let Ok(path) = self.path_for(filename) else {
            return Ok(false);
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DeskError::FileWrite { path, source }),
        }
    }
}
