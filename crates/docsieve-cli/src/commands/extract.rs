//! Extract command - text from a single document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use docsieve_core::{ExtractionResult, SourceDocument};
use docsieve_legacy::TrustedExtractor;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input document (.txt, .docx, .pdf or .doc)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show processing time
    #[arg(long)]
    timings: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// The `{success, content, error}` envelope
    Json,
    /// Extracted text only
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::config::load(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting text from {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Reading document...");

    let extractor = TrustedExtractor::with_config(&config);
    let document = read_document(&args.input)?;

    pb.set_message("Extracting text...");
    let result = extractor.extract(&document).await;
    pb.finish_and_clear();

    let output = render(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if args.timings {
        println!("{} Processing time: {}ms", style("ℹ").blue(), start.elapsed().as_millis());
    }
    debug!("Total processing time: {:?}", start.elapsed());

    match result.error {
        Some(message) if !result.success => anyhow::bail!(message),
        _ => Ok(()),
    }
}

/// Load a file as a document named after its final path component.
pub fn read_document(path: &Path) -> anyhow::Result<SourceDocument> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceDocument::new(bytes, name))
}

/// Text for one envelope in the requested format.
///
/// Text output of a failure is empty; the message goes to stderr.
pub fn render(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => result.content.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_json_envelope() {
        let json = render(&ExtractionResult::success("hi"), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"success": true, "content": "hi"}));
    }

    #[test]
    fn test_render_text() {
        let text = render(&ExtractionResult::success("line 1\nline 2"), OutputFormat::Text).unwrap();
        assert_eq!(text, "line 1\nline 2");
    }

    #[test]
    fn test_read_document_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Notes.TXT");
        fs::write(&path, "body").unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc.file_name(), "Notes.TXT");
        assert_eq!(doc.bytes(), b"body");
    }

    #[tokio::test]
    async fn test_trusted_extractor_reads_legacy_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.doc");
        fs::write(&path, docsieve_legacy::fixtures::word_document("Quarterly memo\r", 0, true))
            .unwrap();

        let result = TrustedExtractor::default()
            .extract(&read_document(&path).unwrap())
            .await;
        assert_eq!(result, ExtractionResult::success("Quarterly memo"));
    }
}
