//! Batch background removal CLI
//!
//! With no flags the tool runs the operator workflow: activate the runtime
//! environment, show the two-choice menu, and on choice `1` prompt for the
//! quality level and processing options before walking the input folder.
//! `--yes` runs the same pipeline without the menu or prompts.

use super::config::CliConfigBuilder;
use super::menu;
use crate::{
    batch::{BatchRunner, BatchStats, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR},
    error::Result as LibResult,
    models::ModelKind,
    processor::RemovalProcessor,
    runtime_env::{RuntimeEnv, MODELS_SUBDIR},
    services::io::SUPPORTED_EXTENSIONS,
    services::{FileOutcome, ImageIOService, ProgressReporter},
    tracing_config::{TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Batch background removal tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-batch")]
pub struct Cli {
    /// Input folder with images to process
    #[arg(long, value_name = "DIR", default_value = DEFAULT_INPUT_DIR)]
    pub input_dir: PathBuf,

    /// Output folder for transparent PNGs
    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Runtime environment directory [default: .bgremove-env, or $BGREMOVE_BATCH_ENV_DIR]
    #[arg(long, value_name = "DIR")]
    pub env_dir: Option<PathBuf>,

    /// Model to use (skips the quality-level prompt)
    #[arg(short, long, value_enum)]
    pub model: Option<CliModel>,

    /// Disable alpha matting edge refinement
    #[arg(long)]
    pub no_alpha_matting: bool,

    /// Save the grayscale mask instead of the transparent composite
    #[arg(long)]
    pub mask_only: bool,

    /// Run non-interactively: skip the menu and all prompts
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Scan the input folder recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Print a line per file instead of the progress bar
    #[arg(long)]
    pub progress: bool,

    /// List supported models and whether they are installed, then exit
    #[arg(long)]
    pub list_models: bool,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Model selection on the command line
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliModel {
    U2net,
    U2netp,
    U2netHumanSeg,
    U2netClothSeg,
    IsnetGeneralUse,
}

impl From<CliModel> for ModelKind {
    fn from(model: CliModel) -> Self {
        match model {
            CliModel::U2net => ModelKind::U2Net,
            CliModel::U2netp => ModelKind::U2NetP,
            CliModel::U2netHumanSeg => ModelKind::U2NetHumanSeg,
            CliModel::U2netClothSeg => ModelKind::U2NetClothSeg,
            CliModel::IsnetGeneralUse => ModelKind::IsnetGeneralUse,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose).context("Failed to initialize tracing")?;

    if cli.list_models {
        return list_models(&cli);
    }

    // The one fatal precondition: a missing environment exits with status 1
    // before anything is prompted. The guard deactivates on every later path.
    let env_dir = RuntimeEnv::resolve_dir(cli.env_dir.as_deref());
    let env = RuntimeEnv::activate(&env_dir)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    info!(
        env = %env.root().display(),
        input = %cli.input_dir.display(),
        output = %cli.output_dir.display(),
        "Starting bgremove-batch"
    );

    if cli.yes {
        let mut empty: &[u8] = &[];
        let mut out = io::stdout();
        run_processing(&cli, &env, false, &mut empty, &mut out)?;
    } else {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        menu::dispatch(&mut input, &mut out, |input, out| {
            run_processing(&cli, &env, true, input, out)
        })?;
    }

    Ok(())
}

/// Scan the input folder, gather model and options, run the batch, and print
/// the closing summary
fn run_processing<R: BufRead, W: Write>(
    cli: &Cli,
    env: &RuntimeEnv,
    interactive: bool,
    input: &mut R,
    out: &mut W,
) -> LibResult<()> {
    ImageIOService::ensure_dir(&cli.input_dir)?;
    ImageIOService::ensure_dir(&cli.output_dir)?;

    let files = find_images(&cli.input_dir, cli.recursive)?;
    if files.is_empty() {
        print_no_images(out, &cli.input_dir)?;
        return Ok(());
    }
    writeln!(out, "\n📸 Found {} image(s) to process", files.len())?;

    let model = match CliConfigBuilder::model_from_cli(cli) {
        Some(model) => model,
        None if interactive => menu::select_model(input, out)?,
        None => ModelKind::default(),
    };

    let (alpha_matting, only_mask) =
        if interactive && !CliConfigBuilder::options_are_explicit(cli) {
            menu::select_options(input, out)?
        } else {
            CliConfigBuilder::options_from_cli(cli)
        };

    writeln!(out, "\n{}", "=".repeat(60))?;
    writeln!(out, "🚀 Processing with model: {model}")?;
    if alpha_matting {
        writeln!(out, "   ✓ Alpha matting enabled (smoother edges)")?;
    }
    if only_mask {
        writeln!(out, "   ✓ Saving mask only")?;
    }
    writeln!(out, "{}", "=".repeat(60))?;

    let config = CliConfigBuilder::build(env, model, alpha_matting, only_mask, cli.verbose >= 2)?;
    let mut runner = BatchRunner::new(RemovalProcessor::new(config));

    let reporter = make_reporter(cli, files.len());
    let stats = runner.run_files(&files, &cli.output_dir, reporter.as_ref())?;

    print_summary(out, &stats)?;
    Ok(())
}

/// List supported images, optionally walking subdirectories
fn find_images(dir: &Path, recursive: bool) -> LibResult<Vec<PathBuf>> {
    if !recursive {
        return ImageIOService::list_images(dir);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| ImageIOService::is_supported_format(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Pick the progress surface: indicatif bar for multi-file batches, per-file
/// lines for single files or when `--progress` asks for them
fn make_reporter(cli: &Cli, total: usize) -> Box<dyn ProgressReporter> {
    if !cli.progress && total > 1 {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        Box::new(IndicatifProgressReporter { bar })
    } else {
        Box::new(ConsoleProgressReporter)
    }
}

/// Per-file console lines in the original tool's style
struct ConsoleProgressReporter;

impl ProgressReporter for ConsoleProgressReporter {
    fn file_started(&self, index: usize, total: usize, path: &Path) {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        print!("\n[{}/{}] Processing: {}...", index + 1, total, name);
        let _ = io::stdout().flush();
    }

    fn file_completed(&self, _index: usize, _total: usize, _path: &Path, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Saved { elapsed_ms, .. } => {
                println!(" ✅ Done ({:.1}s)", *elapsed_ms as f64 / 1000.0);
            },
            FileOutcome::Failed { error, .. } => {
                println!(" ❌ Failed: {error}");
            },
        }
    }

    fn batch_completed(&self, _stats: &BatchStats) {}
}

/// Progress bar for multi-file batches
struct IndicatifProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter for IndicatifProgressReporter {
    fn file_started(&self, _index: usize, _total: usize, path: &Path) {
        self.bar.set_message(format!("Processing {}", path.display()));
    }

    fn file_completed(&self, _index: usize, _total: usize, path: &Path, outcome: &FileOutcome) {
        if let FileOutcome::Failed { error, .. } = outcome {
            self.bar.println(format!("❌ {}: {}", path.display(), error));
        }
        self.bar.inc(1);
    }

    fn batch_completed(&self, _stats: &BatchStats) {
        self.bar.finish_and_clear();
    }
}

/// Initialize tracing based on verbosity level
fn init_tracing(verbose_count: u8) -> Result<()> {
    TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(TracingFormat::Console)
        .init()
        .context("Failed to initialize tracing subscriber")?;
    Ok(())
}

/// List supported models and whether their assets are installed
fn list_models(cli: &Cli) -> Result<()> {
    let env_dir = RuntimeEnv::resolve_dir(cli.env_dir.as_deref());
    let models_dir = env_dir.join(MODELS_SUBDIR);

    println!("📦 Supported Models");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for kind in ModelKind::all() {
        let status = if models_dir.join(kind.file_name()).is_file() {
            "✅ installed"
        } else {
            "❌ missing"
        };
        println!(
            "{}) {:<18} {} - {}",
            kind.menu_key(),
            kind.name(),
            status,
            kind.description()
        );
    }

    println!("\n💡 Place missing model files in: {}", models_dir.display());
    Ok(())
}

/// Guidance printed when the input folder holds no supported images
fn print_no_images<W: Write>(out: &mut W, input_dir: &Path) -> LibResult<()> {
    let mut formats: Vec<String> = SUPPORTED_EXTENSIONS.iter().map(|e| format!(".{e}")).collect();
    formats.sort();

    writeln!(out, "\n⚠️  No images found in '{}' folder!", input_dir.display())?;
    writeln!(
        out,
        "\n📁 Place your images in the '{}' folder and run the tool again.",
        input_dir.display()
    )?;
    writeln!(out, "\nSupported formats: {}", formats.join(", "))?;
    Ok(())
}

/// Closing summary in the original tool's style
fn print_summary<W: Write>(out: &mut W, stats: &BatchStats) -> LibResult<()> {
    writeln!(out, "\n{}", "=".repeat(60))?;
    writeln!(out, "📊 PROCESSING COMPLETE")?;
    writeln!(out, "{}", "-".repeat(60))?;
    writeln!(out, "✅ Successful: {}", stats.processed)?;
    if stats.failed > 0 {
        writeln!(out, "❌ Failed: {}", stats.failed)?;
    }
    writeln!(out, "⏱️  Total time: {:.1}s", stats.elapsed_ms as f64 / 1000.0)?;

    if stats.processed > 0 {
        let output_dir = std::fs::canonicalize(&stats.output_dir)
            .unwrap_or_else(|_| stats.output_dir.clone());
        writeln!(out, "\n📂 Output files saved to: {}", output_dir.display())?;
        writeln!(out, "\n💡 Tip: Images are saved with full transparency.")?;
        writeln!(out, "   If backgrounds still appear, try:")?;
        writeln!(out, "   - A higher quality level (option 5 for best quality)")?;
        writeln!(out, "   - Enabling alpha matting if disabled")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_model_mapping() {
        assert_eq!(ModelKind::from(CliModel::U2net), ModelKind::U2Net);
        assert_eq!(
            ModelKind::from(CliModel::IsnetGeneralUse),
            ModelKind::IsnetGeneralUse
        );
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["bgremove-batch"]);
        assert_eq!(cli.input_dir, PathBuf::from("input"));
        assert_eq!(cli.output_dir, PathBuf::from("output"));
        assert!(cli.env_dir.is_none());
        assert!(cli.model.is_none());
        assert!(!cli.yes);
        assert!(!cli.mask_only);
    }

    #[test]
    fn test_cli_flag_parsing() {
        let cli = Cli::parse_from([
            "bgremove-batch",
            "--yes",
            "--mask-only",
            "--no-alpha-matting",
            "--model",
            "isnet-general-use",
            "-vv",
        ]);
        assert!(cli.yes);
        assert!(cli.mask_only);
        assert!(cli.no_alpha_matting);
        assert_eq!(cli.model, Some(CliModel::IsnetGeneralUse));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_print_no_images_lists_formats() {
        let mut out = Vec::new();
        print_no_images(&mut out, Path::new("input")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No images found"));
        assert!(text.contains(".jpg"));
        assert!(text.contains(".webp"));
    }

    #[test]
    fn test_print_summary_reports_failures_only_when_present() {
        let stats = BatchStats {
            found: 3,
            processed: 3,
            failed: 0,
            elapsed_ms: 2500,
            started_at: chrono::Utc::now(),
            output_dir: PathBuf::from("output"),
        };
        let mut out = Vec::new();
        print_summary(&mut out, &stats).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Successful: 3"));
        assert!(!text.contains("Failed:"));
        assert!(text.contains("Total time: 2.5s"));
    }
}
