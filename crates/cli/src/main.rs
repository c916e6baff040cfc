use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tillscan_ocr::{BatchRunner, ExtractionFailure, OcrError, ReceiptConfig, ReceiptPipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tillscan", version)]
#[command(about = "Read the merchant name and total from receipt photos")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML file overriding stage defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Tesseract traineddata directory
    #[arg(long, global = true, value_name = "DIR")]
    tessdata: Option<PathBuf>,

    /// Tesseract language
    #[arg(long, global = true, default_value = "eng")]
    lang: String,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract one receipt and print it as JSON
    Extract {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Extract every image in a directory and write a JSON report
    Batch {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Report path [default: from config, else ocr_results.json]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Parallel workers, each with its own OCR engine
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

// ── OCR engine ────────────────────────────────────────────────────────────────

#[cfg(feature = "tesseract")]
type Engine = tillscan_ocr::TesseractRecognizer;

#[cfg(feature = "tesseract")]
fn engine(cli: &Cli) -> Result<Engine, OcrError> {
    let data_path = cli.tessdata.as_ref().map(|p| p.to_string_lossy().into_owned());
    tillscan_ocr::TesseractRecognizer::new(data_path.as_deref(), &cli.lang)
}

#[cfg(not(feature = "tesseract"))]
type Engine = tillscan_ocr::MockRecognizer;

#[cfg(not(feature = "tesseract"))]
fn engine(cli: &Cli) -> Result<Engine, OcrError> {
    tracing::debug!(lang = %cli.lang, tessdata = ?cli.tessdata, "built without the tesseract feature");
    Err(OcrError::NotAvailable)
}

fn pipeline(cli: &Cli, config: &ReceiptConfig) -> Result<ReceiptPipeline<Engine>, ExtractionFailure> {
    let recognizer = engine(cli)?;
    Ok(ReceiptPipeline::with_config(recognizer, config.clone()))
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<ReceiptConfig> {
    match path {
        Some(p) => ReceiptConfig::load(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(ReceiptConfig::default()),
    }
}

fn extract(cli: &Cli, config: &ReceiptConfig, image: &Path) -> Result<()> {
    let result = pipeline(cli, config)?.process(image)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn batch(
    cli: &Cli,
    config: &ReceiptConfig,
    dir: &Path,
    output: Option<&Path>,
    workers: Option<usize>,
) -> Result<()> {
    let workers = workers.unwrap_or(config.batch.workers).max(1);
    let pipelines = (0..workers)
        .map(|_| pipeline(cli, config))
        .collect::<Result<Vec<_>, _>>()?;

    let report = BatchRunner::with_workers(pipelines).run(dir).await?;
    let output = output.unwrap_or(&config.batch.report);
    report.save(output).await?;

    info!(report = %output.display(), "report written");
    println!(
        "Processed {} receipts ({} failed); results saved to {}",
        report.len(),
        report.failures(),
        output.display()
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Command::Extract { image } => extract(&cli, &config, image),
        Command::Batch { dir, output, workers } => {
            batch(&cli, &config, dir, output.as_deref(), *workers).await
        }
    }
}
