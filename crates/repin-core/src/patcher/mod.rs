//! Pin occurrence selection and literal-value substitution.
//!
//! This module rewrites the certificate pin in a candidate file. Pins are
//! registered before the domain they apply to, so among all pin occurrences
//! in the file the right one is the *nearest preceding* match relative to
//! the domain signature's position.
//!
//! ## Algorithm Overview
//!
//! 1. Locate the first offset of the target signature in the full content
//! 2. Enumerate every pin pattern occurrence and its captured-group offset
//! 3. Starting from the first occurrence as the lower bound, take each later
//!    occurrence whose captured offset is strictly greater than the current
//!    best and strictly less than the target offset
//! 4. Substitute every literal occurrence of the selected pin value in the
//!    whole content with the replacement
//!
//! The substitution in step 4 is by value, not by offset: the pin bytes are
//! referenced elsewhere in the binary by equality, so replacing only the
//! matched span would leave stale copies behind.

use crate::error::{Error, Result};
use crate::scanner::find_subsequence;
use regex::bytes::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Reference pin pattern: a quoted SPKI hash with the `sha256/` prefix.
///
/// The capture group spans the pin value without the surrounding quotes.
pub const SPKI_PATTERN: &str = r#""(sha256/[a-zA-Z0-9/+=]+)""#;

/// A compiled byte-level pin pattern with exactly one capture group.
///
/// Constructed once at startup and passed explicitly to each operation;
/// there is no shared mutable pattern state.
#[derive(Debug, Clone)]
pub struct PinPattern {
    regex: Regex,
}

impl PinPattern {
    /// Compiles a pattern, rejecting it unless it has exactly one capture group
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;

        // captures_len counts the implicit whole-match group 0
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(Error::PatternArity { groups });
        }

        Ok(Self { regex })
    }

    /// The built-in SPKI pin pattern ([`SPKI_PATTERN`])
    pub fn spki() -> Self {
        // The constant is a valid single-group pattern
        Self {
            regex: Regex::new(SPKI_PATTERN).unwrap(),
        }
    }

    /// Captured-group start offsets and spans of every occurrence, in file order
    fn occurrences<'a>(&self, content: &'a [u8]) -> Vec<(usize, &'a [u8])> {
        self.regex
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|group| (group.start(), group.as_bytes()))
            .collect()
    }
}

impl Default for PinPattern {
    fn default() -> Self {
        Self::spki()
    }
}

/// Result of patching one file's content
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// The pin value that was replaced
    pub original: Vec<u8>,
    /// Captured-group start offset of the selected occurrence
    pub offset: usize,
    /// The rewritten file content
    pub content: Vec<u8>,
}

/// Rewrites the selected pin value in candidate file content
#[derive(Debug, Clone)]
pub struct Patcher {
    pattern: PinPattern,
}

impl Default for Patcher {
    fn default() -> Self {
        Self::new(PinPattern::spki())
    }
}

impl Patcher {
    /// Creates a patcher using the given pin pattern
    pub fn new(pattern: PinPattern) -> Self {
        Self { pattern }
    }

    /// Selects the pin occurrence nearest to (and preceding) the target
    /// signature and replaces its value throughout the content.
    ///
    /// Fails with [`Error::TargetNotFound`] if the target signature is
    /// absent (the scanner should have guaranteed presence, so this is a
    /// caller logic error) and with [`Error::InsufficientMatches`] if fewer
    /// than two pattern occurrences exist: the first occurrence only
    /// establishes the lower bound for the search.
    ///
    /// Re-running on already-patched content is undefined when the
    /// replacement itself matches the pattern.
    pub fn patch(
        &self,
        content: &[u8],
        target_signature: &[u8],
        replacement: &[u8],
    ) -> Result<PatchOutcome> {
        if target_signature.is_empty() {
            return Err(Error::EmptySignature);
        }

        let target_offset = find_subsequence(content, target_signature)
            .ok_or_else(|| Error::target_not_found(target_signature))?;
        trace!("target signature at offset {}", target_offset);

        let occurrences = self.pattern.occurrences(content);
        if occurrences.len() < 2 {
            return Err(Error::InsufficientMatches {
                found: occurrences.len(),
            });
        }
        debug!(
            "{} pin occurrence(s), target at offset {}",
            occurrences.len(),
            target_offset
        );

        // The pin is registered before the domain it applies to: take the
        // occurrence with the largest captured offset still preceding the
        // target. Strict inequalities on both bounds; iteration is in file
        // order, so the first maximal qualifying occurrence wins.
        let (mut best_offset, mut best_value) = occurrences[0];
        for &(offset, value) in &occurrences[1..] {
            if offset > best_offset && offset < target_offset {
                best_offset = offset;
                best_value = value;
            }
        }
        trace!("selected pin occurrence at offset {}", best_offset);

        let original = best_value.to_vec();
        let content = replace_all(content, &original, replacement);

        Ok(PatchOutcome {
            original,
            offset: best_offset,
            content,
        })
    }

    /// Patches the file at `path` in place, overwriting it with the
    /// rewritten content.
    pub fn patch_file(
        &self,
        path: impl AsRef<Path>,
        target_signature: &[u8],
        replacement: &[u8],
    ) -> Result<PatchOutcome> {
        let path = path.as_ref();

        let content = fs::read(path).map_err(|e| Error::file_read(path, e))?;
        let outcome = self.patch(&content, target_signature, replacement)?;
        fs::write(path, &outcome.content).map_err(|e| Error::file_write(path, e))?;

        debug!(
            "patched {}: replaced {} byte value at offset {}",
            path.display(),
            outcome.original.len(),
            outcome.offset
        );
        Ok(outcome)
    }
}

/// Replaces every literal occurrence of `needle` in `haystack`
fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    if needle.is_empty() {
        return haystack.to_vec();
    }

    let mut result = Vec::with_capacity(haystack.len());
    let mut position = 0;

    while let Some(found) = find_subsequence(&haystack[position..], needle) {
        let start = position + found;
        result.extend_from_slice(&haystack[position..start]);
        result.extend_from_slice(replacement);
        position = start + needle.len();
    }
    result.extend_from_slice(&haystack[position..]);

    result
}
