//! Main entry point for the `extract` CLI application.
//!
//! Extracts `.mpkg` packages from the local filesystem.
//! Per-entry failures are printed but do not change the exit status; only a
//! missing argument or an unreadable package exits with 1.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use mpkg_extract::cli::ExtractOptions;
use mpkg_extract::{Cli, LocalFileReader, Package, PackageExtractor, ReadAt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Usage errors exit with 1; --help and --version are not errors
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(&cli);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides `-v`/`-q`.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    let options = cli.options()?;
    let started = Instant::now();

    let reader = LocalFileReader::new(Path::new(&cli.file))
        .with_context(|| format!("failed to open package {}", cli.file))?;
    process_package(Arc::new(reader), cli, &options).await?;

    if !cli.is_quiet() {
        println!(
            "finished in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

/// Open the package, then either list it or extract it.
async fn process_package<R: ReadAt + 'static>(
    reader: Arc<R>,
    cli: &Cli,
    options: &ExtractOptions,
) -> Result<()> {
    let extractor = PackageExtractor::new(reader, options.expected_tag);
    let package = extractor
        .open(&options.dest_root)
        .await
        .with_context(|| format!("failed to read package {}", cli.file))?;

    if cli.list {
        list_entries(&package);
        return Ok(());
    }

    if !cli.is_quiet() {
        println!("file header: {}", package.tag);
        println!(
            "opened package {} ({})",
            cli.file,
            format_size(package.total_length)
        );
        println!(
            "{} entries, payload region starts at byte {} ({})",
            package.entries.len(),
            package.payload_start,
            format_size(package.payload_len())
        );
        println!("dumping to {}", options.dest_root.display());
    }

    let report = extractor.extract_all(&package, options.jobs).await;

    if !cli.is_very_quiet() {
        for failure in &report.directory_failures {
            println!(
                "failed to create directory for {}: {}",
                failure.name, failure.error
            );
        }
    }

    if !cli.is_quiet() {
        for entry in &report.extracted {
            println!("  extracted: {} ({} bytes)", entry.path.display(), entry.bytes);
        }
    }

    if !cli.is_very_quiet() {
        for failure in &report.failures {
            println!("failed to extract {}: {}", failure.name, failure.error);
        }
    }

    if !cli.is_quiet() {
        println!(
            "{} of {} entries extracted ({})",
            report.extracted.len(),
            package.entries.len(),
            format_size(report.bytes_written())
        );
    }

    Ok(())
}

/// Print the directory as a table of size, absolute offset and name.
fn list_entries(package: &Package) {
    println!("{:>10}  {:>10}  Name", "Length", "Offset");
    println!("{}", "-".repeat(50));

    let mut total = 0u64;
    for entry in &package.entries {
        println!(
            "{:>10}  {:>10}  {}",
            entry.payload_size,
            package.absolute_offset(entry),
            entry.name
        );
        total += entry.payload_size as u64;
    }

    println!("{}", "-".repeat(50));
    println!(
        "{:>10}  {:>10}  {} files",
        total,
        "",
        package.entries.len()
    );
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
