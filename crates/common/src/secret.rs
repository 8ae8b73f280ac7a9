//! Secret wrapper for sensitive values
//!
//! Admin tokens and other credentials travel wrapped so they cannot leak
//! through Debug/Display formatting or tracing fields, and are zeroed on
//! drop. File-sourced secrets go through [`Secret::read_from_file`], which
//! owns the trim-and-reject-empty rule so callers never handle the raw
//! contents.

use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Sensitive value - redacted in Debug/Display/logs, zeroed on drop
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Load a secret from a file, trimming surrounding whitespace.
    ///
    /// An empty or whitespace-only file yields `Ok(None)`: the file exists
    /// but carries no secret, which callers treat as "not configured"
    /// rather than as an error.
    pub fn read_from_file(path: &Path) -> Result<Option<Self>> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read secret file {}: {e}",
                path.display()
            ))
        })?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(trimmed.to_owned())))
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_redacts_debug_and_display() {
        let secret = Secret::new(String::from("admin-token"));
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn secret_exposes_value() {
        let secret = Secret::new(String::from("admin-token"));
        assert_eq!(secret.expose(), "admin-token");
    }

    #[test]
    fn read_from_file_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  tok-123\n").unwrap();

        let secret = Secret::read_from_file(&path).unwrap().unwrap();
        assert_eq!(secret.expose(), "tok-123");
    }

    #[test]
    fn read_from_file_empty_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n  ").unwrap();

        assert!(Secret::read_from_file(&path).unwrap().is_none());
    }

    #[test]
    fn read_from_file_missing_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Secret::read_from_file(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got: {err}");
        assert!(err.to_string().contains("absent"));
    }
}
