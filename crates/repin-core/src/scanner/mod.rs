//! Bounded block-wise signature scanning.
//!
//! This module classifies files as patch candidates by testing for the
//! presence of fixed byte signatures without ever loading the whole file
//! into memory.
//!
//! ## Algorithm Overview
//!
//! 1. Read the file in fixed-size blocks
//! 2. Test each freshly read block alone for the signature
//! 3. Test the concatenation of the previous and current block, which
//!    catches occurrences straddling the block boundary
//! 4. Rotate the window and continue until EOF
//!
//! The window is two blocks wide, so memory use is O(block size) regardless
//! of file size. An occurrence can straddle at most one boundary as long as
//! the signature fits in a single block; longer signatures are rejected at
//! configuration time (see [`Scanner::check_signature`]).

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace};

/// Default scanner block size in bytes (64 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 16;

/// Configuration for the scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Size of each read block in bytes
    pub block_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block size
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }
}

/// Block-wise signature scanner with a two-block sliding window
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self {
            config: ScannerConfig::default(),
        }
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Validates a signature against the configured block size.
    ///
    /// Call this at configuration time: an oversized signature would be
    /// silently missed by the sliding window, so it is rejected up front
    /// rather than mid-scan.
    pub fn check_signature(&self, signature: &[u8]) -> Result<()> {
        if signature.is_empty() {
            return Err(Error::EmptySignature);
        }
        if signature.len() > self.config.block_size {
            return Err(Error::SignatureTooLarge {
                len: signature.len(),
                block_size: self.config.block_size,
            });
        }
        Ok(())
    }

    /// Returns true if the signature occurs anywhere in the stream.
    ///
    /// Reads the stream to the first match or EOF. An empty stream never
    /// matches.
    pub fn contains<R: Read>(&self, mut reader: R, signature: &[u8]) -> Result<bool> {
        self.check_signature(signature)?;

        let block_size = self.config.block_size;
        let mut previous: Vec<u8> = Vec::new();
        let mut window: Vec<u8> = Vec::with_capacity(block_size * 2);

        loop {
            let block = read_block(&mut reader, block_size).map_err(Error::StreamRead)?;
            if block.is_empty() {
                return Ok(false);
            }

            // Cheap first check: occurrence entirely within this block
            if find_subsequence(&block, signature).is_some() {
                return Ok(true);
            }

            // Boundary check: occurrence straddling the previous block
            if !previous.is_empty() {
                window.clear();
                window.extend_from_slice(&previous);
                window.extend_from_slice(&block);
                if find_subsequence(&window, signature).is_some() {
                    return Ok(true);
                }
            }

            previous = block;
        }
    }

    /// Returns true if the signature occurs anywhere in the file at `path`
    pub fn scan_path(&self, path: impl AsRef<Path>, signature: &[u8]) -> Result<bool> {
        let path = path.as_ref();
        trace!("scanning {} for {} byte signature", path.display(), signature.len());

        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        self.contains(file, signature).map_err(|e| match e {
            Error::StreamRead(source) => Error::file_read(path, source),
            other => other,
        })
    }

    /// Returns true if the file contains both the anchor and the target signature.
    ///
    /// The two scans are independent: each re-reads the file from the start
    /// and no state is shared between them.
    pub fn is_candidate(
        &self,
        path: impl AsRef<Path>,
        anchor: &[u8],
        target: &[u8],
    ) -> Result<bool> {
        let path = path.as_ref();

        if !self.scan_path(path, anchor)? {
            return Ok(false);
        }
        if !self.scan_path(path, target)? {
            return Ok(false);
        }

        debug!("candidate: {} contains both signatures", path.display());
        Ok(true)
    }
}

/// Reads up to `block_size` bytes, filling the block unless EOF intervenes.
///
/// A short `read()` return must not shrink the block, or a signature could
/// straddle an artificial boundary inside what should be one block.
fn read_block<R: Read>(reader: &mut R, block_size: usize) -> std::io::Result<Vec<u8>> {
    let mut block = vec![0u8; block_size];
    let mut filled = 0;

    while filled < block_size {
        match reader.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    block.truncate(filled);
    Ok(block)
}

/// Find a subsequence within a byte slice
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
