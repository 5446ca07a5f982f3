//! Error types for the repin-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all repin operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Read failure on a caller-supplied byte stream (no path available)
    #[error("failed to read scan stream: {0}")]
    StreamRead(#[source] std::io::Error),

    /// Signature longer than the scanner's block size
    ///
    /// The sliding window can only catch occurrences that fit within two
    /// adjacent blocks, so oversized signatures are rejected up front
    /// rather than silently missed mid-scan.
    #[error("signature of {len} bytes exceeds scanner block size of {block_size} bytes")]
    SignatureTooLarge {
        /// Length of the offending signature
        len: usize,
        /// Configured block size
        block_size: usize,
    },

    /// Zero-length signature supplied
    #[error("signature must not be empty")]
    EmptySignature,

    /// Pin pattern does not have exactly one capture group
    #[error("pin pattern must have exactly one capture group, found {groups}")]
    PatternArity {
        /// Number of capture groups in the rejected pattern
        groups: usize,
    },

    /// Pin pattern failed to compile
    #[error("invalid pin pattern: {0}")]
    PatternSyntax(#[from] regex::Error),

    /// Target signature absent from content the scanner claimed matched
    #[error("target signature '{signature}' not found in file content")]
    TargetNotFound {
        /// Lossy-decoded target signature, for reporting
        signature: String,
    },

    /// Fewer than two pin pattern occurrences found
    #[error("found {found} pin occurrence(s), need at least 2 to select a candidate")]
    InsufficientMatches {
        /// Number of occurrences actually found
        found: usize,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new target-not-found error from the raw signature bytes
    pub fn target_not_found(signature: &[u8]) -> Self {
        Self::TargetNotFound {
            signature: String::from_utf8_lossy(signature).into_owned(),
        }
    }

    /// Returns true if this error is scoped to a single file
    ///
    /// Per-file errors are reported at the directory-walk boundary and the
    /// walk continues with the next candidate; configuration errors
    /// (oversized signature, bad pattern) abort the run before any file is
    /// touched.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::FileRead { .. }
                | Self::FileWrite { .. }
                | Self::StreamRead(_)
                | Self::TargetNotFound { .. }
                | Self::InsufficientMatches { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::target_not_found(b"cdn-1.example.com");
        assert!(err.to_string().contains("target signature"));
        assert!(err.to_string().contains("cdn-1.example.com"));
    }

    #[test]
    fn test_signature_too_large_display() {
        let err = Error::SignatureTooLarge {
            len: 100,
            block_size: 64,
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("64"));
    }

    #[test]
    fn test_is_per_file() {
        assert!(Error::target_not_found(b"x").is_per_file());
        assert!(Error::InsufficientMatches { found: 1 }.is_per_file());
        assert!(!Error::EmptySignature.is_per_file());
        assert!(!Error::SignatureTooLarge {
            len: 10,
            block_size: 4
        }
        .is_per_file());
    }
}
