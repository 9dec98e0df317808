use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sqldump_csv::config::ConvertConfig;
use sqldump_csv::scanner::{DumpScanner, ScanStats, SMALL_BUFFER_SIZE};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

use super::glob_util::{expand_all, MultiFileResult};

/// CLI values that override the config file.
pub struct Overrides {
    pub chunk_size: Option<u64>,
    pub compress: bool,
    pub allow: Option<String>,
    pub deny: Option<String>,
    pub strip_ip_suffix: bool,
}

impl Overrides {
    fn apply(self, config: &mut ConvertConfig) {
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if self.compress {
            config.compress = true;
        }
        if let Some(allow) = self.allow {
            config.allow = allow;
        }
        if let Some(deny) = self.deny {
            config.deny = deny;
        }
        if self.strip_ip_suffix {
            config.strip_ip_suffix = true;
        }
    }
}

#[derive(Serialize)]
struct ConvertJsonOutput {
    output_dir: String,
    total_inputs: usize,
    succeeded: usize,
    failed: usize,
    elapsed_secs: f64,
    statistics: ScanStats,
    results: Vec<InputResult>,
}

#[derive(Serialize)]
struct InputResult {
    input: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(
    files: Vec<PathBuf>,
    output: PathBuf,
    config_path: Option<PathBuf>,
    overrides: Overrides,
    progress: bool,
    keep_going: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => ConvertConfig::load(path)?,
        None => ConvertConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;

    let inputs = expand_all(&files)?;

    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;

    let start_time = Instant::now();
    let mut totals = ScanStats::default();
    let mut result = MultiFileResult::new();
    let mut json_results = Vec::new();

    if inputs.is_empty() {
        result.total_files = 1;
        let mut scanner = DumpScanner::from_config(output.clone(), &config)?;
        let stats = scanner
            .scan(std::io::stdin().lock(), SMALL_BUFFER_SIZE)
            .context("failed to convert <stdin>")?;
        result.record_success();
        json_results.push(success("<stdin>", &stats));
        totals.merge(stats);
    } else {
        result.total_files = inputs.len();
        for input in &inputs {
            match convert_file(input, &output, &config, progress && !json) {
                Ok(stats) => {
                    result.record_success();
                    json_results.push(success(&input.display().to_string(), &stats));
                    totals.merge(stats);
                }
                Err(e) if keep_going => {
                    error!("{}: {}", input.display(), e);
                    json_results.push(InputResult {
                        input: input.display().to_string(),
                        status: "failed".to_string(),
                        records: None,
                        chunks: None,
                        error: Some(e.to_string()),
                    });
                    result.record_failure(input.clone(), e.to_string());
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to convert {}", input.display()))
                }
            }
        }
    }

    let elapsed = start_time.elapsed();

    if json {
        let out = ConvertJsonOutput {
            output_dir: output.display().to_string(),
            total_inputs: result.total_files,
            succeeded: result.succeeded,
            failed: result.failed,
            elapsed_secs: elapsed.as_secs_f64(),
            statistics: totals,
            results: json_results,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Converted {} of {} inputs", result.succeeded, result.total_files);
        println!("\nStatistics:");
        println!("  Tables found: {}", totals.tables.len());
        println!("  Tables skipped: {}", totals.tables_skipped);
        println!("  Schema files written: {}", totals.schemas_written);
        if totals.unterminated_schemas > 0 {
            println!("  Unterminated CREATE TABLE blocks: {}", totals.unterminated_schemas);
        }
        println!("  INSERT statements: {}", totals.statements);
        println!("  Records written: {}", totals.records);
        println!("  Chunk files written: {}", totals.chunks_opened);
        println!(
            "  Bytes read: {:.2} MB",
            totals.bytes_read as f64 / (1024.0 * 1024.0)
        );
        println!("  Elapsed time: {:.3?}", elapsed);
        println!("\nOutput directory: {}", output.display());

        for (path, error) in &result.errors {
            println!("  ✗ {}: {}", path.display(), error);
        }
    }

    if result.has_failures() {
        anyhow::bail!("{} of {} inputs failed", result.failed, result.total_files);
    }
    Ok(())
}

fn convert_file(
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
    progress: bool,
) -> anyhow::Result<ScanStats> {
    info!("converting {}", input.display());
    let mut scanner = DumpScanner::from_config(output.to_path_buf(), config)?;

    if !progress {
        return Ok(scanner.scan_file(input)?);
    }

    let file_size = std::fs::metadata(input)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}",
        )?
        .progress_chars("█▓▒░  ")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let pb_clone = pb.clone();
    let mut scanner = scanner.with_progress(move |bytes| pb_clone.set_position(bytes));
    let stats = scanner.scan_file(input);
    match &stats {
        Ok(_) => pb.finish_with_message("done"),
        Err(_) => pb.abandon_with_message("failed"),
    }
    Ok(stats?)
}

fn success(input: &str, stats: &ScanStats) -> InputResult {
    InputResult {
        input: input.to_string(),
        status: "success".to_string(),
        records: Some(stats.records),
        chunks: Some(stats.chunks_opened),
        error: None,
    }
}
