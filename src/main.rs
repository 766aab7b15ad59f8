//! Packzip CLI - Command-line tool for ZIP-compatible packages.
//!
//! This is the main entry point for the packzip command-line application.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use glob::{MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::Mmap;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use packzip::{recognize_path, Archive, DosDateTime};

/// Packzip - list, extract and edit ZIP-compatible packages
#[derive(Parser)]
#[command(name = "packzip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of an archive
    List {
        /// Path to the archive
        #[arg(env = "PACKZIP_ARCHIVE")]
        archive: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,

        /// Print entries as JSON
        #[arg(long, conflicts_with = "detailed")]
        json: bool,
    },

    /// Extract files from an archive
    Extract {
        /// Path to the archive
        #[arg(env = "PACKZIP_ARCHIVE")]
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, env = "PACKZIP_OUTPUT")]
        output: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Add files to an archive, replacing entries with the same path
    Add {
        /// Path to the archive
        #[arg(env = "PACKZIP_ARCHIVE")]
        archive: PathBuf,

        /// Files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory prefix for the added entries
        #[arg(short, long)]
        prefix: Option<String>,

        /// Create the archive if it does not exist
        #[arg(short, long)]
        create: bool,
    },

    /// Remove entries from an archive
    Remove {
        /// Path to the archive
        #[arg(env = "PACKZIP_ARCHIVE")]
        archive: PathBuf,

        /// Entry paths to remove
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Rewrite an archive into a new file
    Repack {
        /// Input archive
        input: PathBuf,

        /// Output archive
        #[arg(short, long, env = "PACKZIP_OUTPUT")]
        output: PathBuf,

        /// Recompress every entry instead of copying payloads verbatim
        #[arg(long)]
        recompress: bool,
    },

    /// Check that files are recognized packages and that every entry decodes
    Check {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::List { archive, filter, detailed, json } => {
            cmd_list(&archive, filter.as_deref(), detailed, json)?;
        }
        Commands::Extract { archive, output, filter } => {
            cmd_extract(&archive, &output, filter.as_deref())?;
        }
        Commands::Add { archive, files, prefix, create } => {
            cmd_add(&archive, &files, prefix.as_deref(), create)?;
        }
        Commands::Remove { archive, paths } => {
            cmd_remove(&archive, &paths)?;
        }
        Commands::Repack { input, output, recompress } => {
            cmd_repack(&input, &output, recompress)?;
        }
        Commands::Check { files } => {
            cmd_check(&files)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_list(path: &Path, filter: Option<&str>, detailed: bool, json: bool) -> Result<()> {
    let mmap = map_archive(path)?;
    let archive = Archive::open(&mmap).context("Failed to open archive")?;
    let filter = EntryFilter::new(filter)?;

    if json {
        let entries: Vec<_> = archive
            .iter()
            .filter(|(name, _)| filter.matches(name))
            .map(|(name, status)| serde_json::json!({ "path": name, "status": status }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut count = 0;
    let mut total_size = 0;
    for (name, status) in archive.iter() {
        if !filter.matches(name) {
            continue;
        }

        if detailed {
            println!(
                "{:>12} {:>12} {:>8} {:08x} {} {}",
                status.size_in_archive,
                status.size,
                status.compression,
                status.crc32,
                status.modified,
                name
            );
        } else {
            println!("{name}");
        }

        count += 1;
        total_size += status.size;
    }

    if detailed {
        println!("\n{count} entries, {total_size} bytes uncompressed");
    }

    Ok(())
}

fn cmd_extract(path: &Path, output: &Path, filter: Option<&str>) -> Result<()> {
    println!("Opening archive: {}", path.display());

    let start = Instant::now();
    let mmap = map_archive(path)?;
    let archive = Archive::open(&mmap).context("Failed to open archive")?;

    println!("Loaded {} entries in {:?}", archive.len(), start.elapsed());

    let filter = EntryFilter::new(filter)?;
    let names: Vec<&str> = archive.paths().filter(|name| filter.matches(name)).collect();

    println!("Extracting {} entries...", names.len());

    let pb = ProgressBar::new(names.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let start = Instant::now();
    for name in &names {
        pb.inc(1);

        let Some(relative) = safe_relative_path(name) else {
            warn!(path = %name, "skipping entry with unsafe path");
            continue;
        };
        let output_path = output.join(relative);

        let status = archive.status(name)?;
        if status.is_dir() {
            fs::create_dir_all(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = archive
            .read(name)
            .with_context(|| format!("Failed to read {name}"))?;
        fs::write(&output_path, data)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    }

    pb.finish_with_message("Done");
    println!("Extraction completed in {:?}", start.elapsed());

    Ok(())
}

fn cmd_add(path: &Path, files: &[PathBuf], prefix: Option<&str>, create: bool) -> Result<()> {
    let mmap = if path.exists() {
        Some(map_archive(path)?)
    } else if create {
        info!(path = %path.display(), "creating new archive");
        None
    } else {
        bail!("Archive {} does not exist (use --create)", path.display());
    };

    let mut archive = match &mmap {
        Some(mmap) => Archive::open(mmap).context("Failed to open archive")?,
        None => Archive::new(),
    };

    for file in files {
        let metadata = fs::metadata(file)
            .with_context(|| format!("Failed to stat {}", file.display()))?;
        if metadata.is_dir() {
            bail!("{} is a directory", file.display());
        }

        let name = entry_name(file, prefix)?;
        let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
        let modified = metadata
            .modified()
            .map(DosDateTime::from_system_time)
            .unwrap_or_else(|_| DosDateTime::now());

        if archive.has(&name) {
            info!(entry = %name, "replacing entry");
        }
        println!("Adding {} ({} bytes)", name, data.len());
        archive.add_with_modified(name, data, modified);
    }

    let bytes = archive.write().context("Failed to write archive")?;
    drop(archive);
    drop(mmap);

    replace_file(path, &bytes)
}

fn cmd_remove(path: &Path, paths: &[String]) -> Result<()> {
    let mmap = map_archive(path)?;
    let mut archive = Archive::open(&mmap).context("Failed to open archive")?;

    for name in paths {
        archive
            .remove(name)
            .with_context(|| format!("Failed to remove {name}"))?;
        println!("Removed {name}");
    }

    let bytes = archive.write().context("Failed to write archive")?;
    drop(archive);
    drop(mmap);

    replace_file(path, &bytes)
}

fn cmd_repack(input: &Path, output: &Path, recompress: bool) -> Result<()> {
    let start = Instant::now();
    let mmap = map_archive(input)?;
    let input_size = mmap.len();
    let mut archive = Archive::open(&mmap).context("Failed to open archive")?;

    if recompress {
        let names: Vec<String> = archive.paths().map(str::to_owned).collect();
        for name in &names {
            archive
                .load(name)
                .with_context(|| format!("Failed to read {name}"))?;
        }
        debug!(entries = names.len(), "loaded entries for recompression");
    }

    let bytes = archive.write().context("Failed to write archive")?;
    let entries = archive.len();
    drop(archive);
    drop(mmap);

    replace_file(output, &bytes)?;
    println!(
        "Repacked {} entries ({} -> {} bytes) in {:?}",
        entries,
        input_size,
        bytes.len(),
        start.elapsed()
    );

    Ok(())
}

fn cmd_check(files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;

    for file in files {
        let recognized = recognize_path(file);
        match check_archive(file) {
            Ok(entries) => {
                let note = if recognized { "" } else { " (unrecognized extension)" };
                println!("{}: OK, {} entries{}", file.display(), entries, note);
            }
            Err(e) => {
                failed += 1;
                println!("{}: FAILED: {:#}", file.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} files failed the check", files.len());
    }

    Ok(())
}

fn check_archive(path: &Path) -> Result<usize> {
    let mmap = map_archive(path)?;
    let archive = Archive::open(&mmap)?;
    let names: Vec<&str> = archive.paths().collect();

    for (name, result) in names.iter().zip(archive.read_parallel(&names)) {
        result.with_context(|| format!("entry {name}"))?;
    }

    Ok(names.len())
}

/// Map an archive file into memory.
fn map_archive(path: &Path) -> Result<Mmap> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    // SAFETY: the map is read-only and dropped before the file is replaced.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map {}", path.display()))?;
    Ok(mmap)
}

/// Write `bytes` next to `path` and rename over it.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, bytes)
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    info!(path = %path.display(), bytes = bytes.len(), "archive saved");
    Ok(())
}

/// Entry name for a file added from disk.
fn entry_name(file: &Path, prefix: Option<&str>) -> Result<String> {
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", file.display()))?;

    Ok(match prefix.map(|p| p.trim_matches('/')) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}/{file_name}"),
        _ => file_name.to_owned(),
    })
}

/// Relative output path for an entry, or `None` if it would escape the
/// output directory.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(&name.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Glob-style filter over entry paths.
struct EntryFilter(Option<Pattern>);

impl EntryFilter {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    fn new(pattern: Option<&str>) -> Result<Self> {
        pattern
            .map(|p| Pattern::new(p).with_context(|| format!("Invalid filter pattern {p:?}")))
            .transpose()
            .map(Self)
    }

    fn matches(&self, name: &str) -> bool {
        self.0
            .as_ref()
            .map_or(true, |pattern| pattern.matches_with(name, Self::OPTIONS))
    }
}
