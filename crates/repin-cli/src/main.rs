//! repin - Rewrite certificate pin hashes in disassembled Android binaries
//!
//! This tool walks a directory of disassembled (smali) files, classifies
//! each one as a pin-carrying candidate by scanning for two byte signatures,
//! and rewrites the pin value registered for the given domain.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use repin_core::{Patcher, PinPattern, Scanner, ScannerConfig, DEFAULT_BLOCK_SIZE};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Call-site marker for OkHttp certificate pin registration
const DEFAULT_ANCHOR: &str = "Lokhttp3/CertificatePinner$Builder;->add";

/// Rewrite certificate pin hashes in disassembled Android binaries
#[derive(Parser, Debug)]
#[command(name = "repin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Replacement pin value (e.g. sha256/AAAA...=)
    pin: String,

    /// Pinned domain to rewrite the pin for (the target signature)
    #[arg(short = 'D', long)]
    domain: String,

    /// Anchor signature identifying pin-registration call sites
    #[arg(long, default_value = DEFAULT_ANCHOR)]
    anchor: String,

    /// Pin pattern override (must have exactly one capture group)
    #[arg(long)]
    pattern: Option<String>,

    /// Scanner block size in bytes
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Dry run - report candidates without rewriting any file
    #[arg(long)]
    dry_run: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single file to patch
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory tree of disassembled files to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Per-run accounting, printed as a summary line at the end
#[derive(Default)]
struct PatchStats {
    files_walked: usize,
    candidates: usize,
    patched: usize,
    failed: usize,
}

impl PatchStats {
    fn print_summary(&self) {
        info!(
            "Summary: {} files walked, {} candidates, {} patched, {} failed",
            self.files_walked, self.candidates, self.patched, self.failed
        );
    }
}

/// Validated run configuration shared by both input modes
struct Engine {
    scanner: Scanner,
    patcher: Patcher,
    anchor: Vec<u8>,
    domain: Vec<u8>,
    pin: Vec<u8>,
    dry_run: bool,
}

impl Engine {
    /// Builds the engine, failing fast on configuration errors before any
    /// file is touched.
    fn from_cli(cli: &Cli) -> Result<Self> {
        let scanner = Scanner::with_config(ScannerConfig::new().block_size(cli.block_size));

        let anchor = cli.anchor.as_bytes().to_vec();
        let domain = cli.domain.as_bytes().to_vec();
        scanner
            .check_signature(&anchor)
            .context("invalid anchor signature")?;
        scanner
            .check_signature(&domain)
            .context("invalid domain signature")?;

        let pattern = match &cli.pattern {
            Some(pattern) => PinPattern::new(pattern).context("invalid pin pattern")?,
            None => PinPattern::spki(),
        };

        Ok(Self {
            scanner,
            patcher: Patcher::new(pattern),
            anchor,
            domain,
            pin: cli.pin.as_bytes().to_vec(),
            dry_run: cli.dry_run,
        })
    }

    /// Scan-then-patch pipeline for a single path.
    ///
    /// Returns true if the file was a candidate (patched, or would be
    /// patched under --dry-run).
    fn process_file(&self, path: &Path) -> repin_core::Result<bool> {
        if !self.scanner.is_candidate(path, &self.anchor, &self.domain)? {
            trace!("not a candidate: {}", path.display());
            return Ok(false);
        }

        info!(
            "file {} pins {}",
            path.display(),
            String::from_utf8_lossy(&self.domain)
        );

        if self.dry_run {
            println!("would patch {}", path.display());
            return Ok(true);
        }

        let outcome = self.patcher.patch_file(path, &self.domain, &self.pin)?;
        println!(
            "replaced {} with {} in {}",
            String::from_utf8_lossy(&outcome.original),
            String::from_utf8_lossy(&self.pin),
            path.display()
        );
        Ok(true)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let engine = Engine::from_cli(&cli)?;

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&engine, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&engine, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Process a single file
fn process_single_file(engine: &Engine, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let mut stats = PatchStats::default();
    stats.files_walked = 1;

    match engine.process_file(file) {
        Ok(true) => {
            stats.candidates += 1;
            if !engine.dry_run {
                stats.patched += 1;
            }
        }
        Ok(false) => {
            println!("no pin signatures found in {}", file.display());
        }
        Err(e) => {
            stats.failed += 1;
            warn!("Error processing {}: {}", file.display(), e);
        }
    }

    stats.print_summary();
    Ok(())
}

/// Process a directory of disassembled files recursively
///
/// Per-file errors are reported and the walk continues with the next
/// candidate; a single bad file never aborts the run.
fn process_directory(engine: &Engine, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut stats = PatchStats::default();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        stats.files_walked += 1;
        debug!("Processing: {}", path.display());

        match engine.process_file(path) {
            Ok(true) => {
                stats.candidates += 1;
                if !engine.dry_run {
                    stats.patched += 1;
                }
            }
            Ok(false) => {}
            Err(e) => {
                stats.failed += 1;
                warn!("Error processing {}: {}", path.display(), e);
            }
        }
    }

    stats.print_summary();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_engine(dry_run: bool) -> Engine {
        let cli = Cli::parse_from([
            "repin",
            "--directory",
            "/tmp",
            "--domain",
            "cdn-1.example.com",
            "sha256/newnewnew=",
        ]);
        let mut engine = Engine::from_cli(&cli).unwrap();
        engine.scanner = Scanner::with_config(ScannerConfig::new().block_size(64));
        engine.dry_run = dry_run;
        engine
    }

    fn write_candidate(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(
            &path,
            format!(
                r#"invoke {anchor} with "sha256/first+base=" then "sha256/second/pin=" for cdn-1.example.com"#,
                anchor = DEFAULT_ANCHOR
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_process_file_patches_candidate() {
        let dir = TempDir::new().unwrap();
        let path = write_candidate(dir.path(), "pinned.smali");

        let engine = test_engine(false);
        assert!(engine.process_file(&path).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("sha256/newnewnew="));
        assert!(!content.contains("sha256/second/pin="));
        assert!(content.contains("sha256/first+base="));
    }

    #[test]
    fn test_process_file_skips_non_candidate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.smali");
        fs::write(&path, "nothing pinned here").unwrap();

        let engine = test_engine(false);
        assert!(!engine.process_file(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "nothing pinned here");
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_candidate(dir.path(), "pinned.smali");
        let before = fs::read(&path).unwrap();

        let engine = test_engine(true);
        assert!(engine.process_file(&path).unwrap());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_directory_walk_continues_past_bad_file() {
        let dir = TempDir::new().unwrap();
        // Candidate with only one pin occurrence: per-file failure
        let bad = dir.path().join("bad.smali");
        fs::write(
            &bad,
            format!(
                r#"{anchor} "sha256/lonely+pin=" cdn-1.example.com"#,
                anchor = DEFAULT_ANCHOR
            ),
        )
        .unwrap();
        let good = write_candidate(dir.path(), "good.smali");

        let engine = test_engine(false);
        process_directory(&engine, dir.path()).unwrap();

        let content = fs::read_to_string(&good).unwrap();
        assert!(content.contains("sha256/newnewnew="));
    }

    #[test]
    fn test_oversized_signature_fails_at_startup() {
        let cli = Cli::parse_from([
            "repin",
            "--directory",
            "/tmp",
            "--domain",
            "cdn-1.example.com",
            "--block-size",
            "8",
            "sha256/newnewnew=",
        ]);
        assert!(Engine::from_cli(&cli).is_err());
    }

    #[test]
    fn test_bad_pattern_fails_at_startup() {
        let cli = Cli::parse_from([
            "repin",
            "--directory",
            "/tmp",
            "--domain",
            "cdn-1.example.com",
            "--pattern",
            r"no capture group",
            "sha256/newnewnew=",
        ]);
        assert!(Engine::from_cli(&cli).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
