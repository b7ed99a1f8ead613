//! Batch command - extract text from many documents.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use docsieve_core::{ExtractionResult, FormatVariant};
use docsieve_legacy::TrustedExtractor;

use super::extract::{OutputFormat, read_document, render};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input files
    #[arg(required = true)]
    input: String,

    /// Output directory (default: a JSON array on stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write summary.csv
    #[arg(long)]
    summary: bool,

    /// Stop at the first failed document
    #[arg(long)]
    fail_fast: bool,
}

/// Outcome for a single file.
#[derive(Debug, Serialize)]
pub struct FileResult {
    pub file: String,
    #[serde(flatten)]
    pub result: ExtractionResult,
    #[serde(skip)]
    pub processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::config::load(config_path)?;

    let files = matching_files(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No supported documents match pattern: {}", args.input);
    }
    eprintln!("{} Found {} files to process", style("ℹ").blue(), files.len());

    let mut names = Vec::new();
    if let Some(output_dir) = &args.output_dir {
        names = output_names(&files)?;
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let extractor = TrustedExtractor::with_config(&config);
    let mut results = Vec::with_capacity(files.len());

    for path in &files {
        let result = process_file(&extractor, path).await?;
        pb.inc(1);

        if !result.result.success {
            let message = result.result.error.as_deref().unwrap_or_default();
            warn!("Failed to extract {}: {}", path.display(), message);
            if args.fail_fast {
                pb.abandon();
                anyhow::bail!("Extraction failed for {}: {}", path.display(), message);
            }
        }
        results.push(result);
    }
    pb.finish_and_clear();

    match &args.output_dir {
        Some(output_dir) => {
            for (result, name) in results.iter().zip(&names) {
                let output_path = output_dir.join(format!("{}.{}", name, args.format.extension()));
                fs::write(&output_path, render(&result.result, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&results)?),
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    let failed: Vec<_> = results.iter().filter(|r| !r.result.success).collect();
    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.file,
                result.result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Files matching `pattern` whose suffix names a supported format.
pub fn matching_files(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob(pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            FormatVariant::from_file_name(name) != FormatVariant::Unsupported
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Output file stem for each input: its path below the deepest directory
/// shared by all inputs, with separators replaced by `__`.
pub fn output_names(files: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    let base = common_parent(files);
    let mut seen = HashSet::new();

    files
        .iter()
        .map(|path| {
            let relative = path.strip_prefix(&base).unwrap_or(path);
            let name = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("__");
            if !seen.insert(name.clone()) {
                anyhow::bail!("More than one input maps to output name {}", name);
            }
            Ok(name)
        })
        .collect()
}

fn common_parent(files: &[PathBuf]) -> PathBuf {
    let mut parents = files.iter().filter_map(|p| p.parent());
    let Some(first) = parents.next() else {
        return PathBuf::new();
    };

    let mut base = first.to_path_buf();
    for parent in parents {
        while !parent.starts_with(&base) {
            if !base.pop() {
                return PathBuf::new();
            }
        }
    }
    base
}

async fn process_file(extractor: &TrustedExtractor, path: &Path) -> anyhow::Result<FileResult> {
    let file_start = Instant::now();
    let document = read_document(path)?;
    let result = extractor.extract(&document).await;

    Ok(FileResult {
        file: document.file_name().to_string(),
        result,
        processing_time_ms: file_start.elapsed().as_millis() as u64,
    })
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "characters", "processing_time_ms", "error"])?;
    for result in results {
        let status = if result.result.success { "success" } else { "error" };
        wtr.write_record([
            result.file.as_str(),
            status,
            &result.result.content.chars().count().to_string(),
            &result.processing_time_ms.to_string(),
            result.result.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
