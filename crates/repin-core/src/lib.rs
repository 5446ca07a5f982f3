//! # repin-core
//!
//! A library for locating and rewriting certificate pin hashes in disassembled binaries.
//!
//! This crate provides the core functionality for:
//! - Classifying files as patch candidates by scanning for two byte signatures
//!   in bounded memory (a two-block sliding window, so matches straddling a
//!   block boundary are never missed)
//! - Selecting, among all pin occurrences in a candidate file, the one nearest
//!   to (and preceding) the pinned domain, and substituting its literal value
//!   everywhere in the file
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Bounded block-wise signature scanning
//! - [`patcher`]: Pin occurrence selection and literal-value substitution
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use repin_core::{Patcher, PinPattern, Scanner};
//!
//! let anchor = b"Lokhttp3/CertificatePinner$Builder;->add";
//! let domain = b"cdn-1.example.com";
//!
//! let scanner = Scanner::new();
//! if scanner.is_candidate("classes/a.smali", anchor, domain)? {
//!     let patcher = Patcher::new(PinPattern::spki());
//!     let outcome = patcher.patch_file("classes/a.smali", domain, b"sha256/AAAA=")?;
//!     println!("replaced {}", String::from_utf8_lossy(&outcome.original));
//! }
//! # Ok::<(), repin_core::Error>(())
//! ```
//!
//! ## Scope
//!
//! The patcher treats files as opaque byte streams. It never parses the
//! surrounding instruction encoding; it is correct only under the caller's
//! assumption that the captured pin value is meaningful wherever those bytes
//! appear in the file.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod patcher;
pub mod scanner;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use patcher::{PatchOutcome, Patcher, PinPattern, SPKI_PATTERN};
pub use scanner::{Scanner, ScannerConfig, DEFAULT_BLOCK_SIZE};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
