use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use upload_scan_rs::executor::HttpExecutor;
use upload_scan_rs::types::{ScanConfig, ScanResults, Target};
use upload_scan_rs::{paths, report, scanner, targets};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

/// upload-scan-rs: probe hosts for common file-upload endpoints and optionally test an upload.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "upload-scan-rs",
    version,
    about = "Probe hosts for common file-upload endpoints and optionally test an upload.",
    long_about = None,
    group(ArgGroup::new("input").required(true).multiple(true).args(["url", "file"]))
)]
struct Cli {
    /// Target host or URL (repeatable).
    #[arg(short, long)]
    url: Vec<String>,

    /// File with targets: .csv (first column) or one host per line (`#` comments).
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// File with candidate paths, one per line. Defaults to the built-in catalog.
    #[arg(long)]
    paths: Option<PathBuf>,

    /// Max concurrent tasks (probes and uploads).
    #[arg(short = 'w', long, default_value_t = 10)]
    concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Verify TLS certificates.
    #[arg(long = "verify-ssl", default_value_t = false)]
    verify_ssl: bool,

    /// Custom User-Agent header.
    #[arg(long = "user-agent")]
    user_agent: Option<String>,

    /// File to submit to every endpoint found.
    #[arg(long)]
    upload: Option<PathBuf>,

    /// Write results to this path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output file format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Hide the progress line.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.concurrency == 0 || cli.concurrency > scanner::MAX_CONCURRENCY {
        bail!(
            "--concurrency must be between 1 and {} (got {})",
            scanner::MAX_CONCURRENCY,
            cli.concurrency
        );
    }

    let mut raw: Vec<String> = cli.url.clone();
    if let Some(file) = cli.file.as_deref() {
        raw.extend(targets::load_raw_targets_from_path(file)?);
    }
    let targets: Vec<Target> = targets::normalize_targets(&raw);
    if targets.is_empty() {
        bail!("no targets to scan");
    }

    let catalog = match cli.paths.as_deref() {
        Some(p) => paths::load_paths_or_default(p),
        None => paths::default_paths(),
    };

    let config = ScanConfig {
        concurrency: cli.concurrency,
        timeout: Duration::from_secs(cli.timeout),
        verify_tls: cli.verify_ssl,
        user_agent: cli.user_agent.clone(),
        upload_file: cli.upload.clone(),
    };

    print_config(&cli, &config, targets.len(), catalog.len());
    if let Some(upload) = config.upload_file.as_deref() {
        if !upload.is_file() {
            tracing::warn!(file = %upload.display(), "upload file is not readable; uploads will fail");
        }
    }

    println!(
        "\nStarting scan of {} websites with {} concurrent connections...",
        targets.len(),
        config.concurrency
    );
    let progress = progress_bar(targets.len() as u64, cli.quiet)?;
    let executor = Arc::new(HttpExecutor::new(&config)?);
    let results = scanner::run_scan(&targets, &catalog, &config, executor, &progress).await?;
    progress.finish();
    println!("\nScan completed!");

    report::print_summary(&results);

    if let Some(path) = cli.output.as_deref() {
        export(path, cli.format, &results)?;
        println!("Results exported to {}", path.display());
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_config(cli: &Cli, config: &ScanConfig, target_count: usize, path_count: usize) {
    println!("upload-scan-rs configuration:");
    println!("  targets      : {target_count}");
    println!(
        "  paths        : {path_count} ({})",
        cli.paths
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<built-in>".to_string())
    );
    println!("  concurrency  : {}", config.concurrency);
    println!("  timeout      : {}s", config.timeout.as_secs());
    println!("  verify_ssl   : {}", config.verify_tls);
    println!("  user_agent   : {}", config.user_agent());
    println!(
        "  upload       : {}",
        config
            .upload_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!(
        "  output       : {}",
        cli.output
            .as_ref()
            .map(|p| format!("{} ({:?})", p.display(), cli.format))
            .unwrap_or_else(|| "<none>".to_string())
    );
}

fn progress_bar(total: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("Progress: [{pos}/{len}] {wide_msg}")
            .context("invalid progress template")?,
    );
    Ok(pb)
}

fn export(path: &std::path::Path, format: OutputFormat, results: &ScanResults) -> Result<()> {
    match format {
        OutputFormat::Csv => report::write_results_csv(path, results),
        OutputFormat::Json => report::write_results_json(path, results),
    }
    .context("error exporting results")
}
