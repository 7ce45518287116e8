//! Batch processing over an input folder
//!
//! Mirrors the operator workflow: make sure `input/` and `output/` exist,
//! process every supported image in name order, keep going when a single file
//! fails, and report totals at the end.

use crate::{
    error::Result,
    processor::RemovalProcessor,
    services::{FileOutcome, ImageIOService, ProgressReporter},
};
use chrono::{DateTime, Utc};
use instant::Instant;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default input folder, relative to the working directory
pub const DEFAULT_INPUT_DIR: &str = "input";

/// Default output folder, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Totals for one batch run
#[derive(Debug, Clone)]
pub struct BatchStats {
    /// Number of supported images discovered
    pub found: usize,
    /// Successfully processed images
    pub processed: usize,
    /// Images that failed to process
    pub failed: usize,
    /// Total wall-clock time in milliseconds
    pub elapsed_ms: u64,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// Where outputs were written
    pub output_dir: PathBuf,
}

impl BatchStats {
    /// Whether every discovered image processed successfully
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.processed == self.found
    }
}

/// Batch runner driving a processor over a folder of images
pub struct BatchRunner {
    processor: RemovalProcessor,
}

impl BatchRunner {
    /// Create a runner around a configured processor
    #[must_use]
    pub fn new(processor: RemovalProcessor) -> Self {
        Self { processor }
    }

    /// Process every supported image in `input_dir` into `output_dir`
    ///
    /// Both folders are created when missing. An empty input folder is not an
    /// error: the returned stats report zero files found.
    ///
    /// # Errors
    /// - Folder creation or listing failures
    /// - Processor initialization failures (a missing model is fatal; a
    ///   failing image is not)
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input_dir: P,
        output_dir: Q,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchStats> {
        let input_dir = input_dir.as_ref();
        let output_dir = output_dir.as_ref();

        ImageIOService::ensure_dir(input_dir)?;
        ImageIOService::ensure_dir(output_dir)?;

        let files = ImageIOService::list_images(input_dir)?;
        self.run_files(&files, output_dir, reporter)
    }

    /// Process an explicit list of files into `output_dir`
    ///
    /// # Errors
    /// - Folder creation failures
    /// - Processor initialization failures
    pub fn run_files(
        &mut self,
        files: &[PathBuf],
        output_dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchStats> {
        let started_at = Utc::now();
        let batch_start = Instant::now();

        ImageIOService::ensure_dir(output_dir)?;

        let mut stats = BatchStats {
            found: files.len(),
            processed: 0,
            failed: 0,
            elapsed_ms: 0,
            started_at,
            output_dir: output_dir.to_path_buf(),
        };

        if files.is_empty() {
            info!(input = "empty", "No images found to process");
            stats.elapsed_ms = batch_start.elapsed().as_millis() as u64;
            reporter.batch_completed(&stats);
            return Ok(stats);
        }

        // A missing or broken model should fail the batch up front, not once
        // per image
        self.processor.initialize()?;

        info!(count = files.len(), "Starting batch processing");

        for (index, file) in files.iter().enumerate() {
            reporter.file_started(index, files.len(), file);
            let file_start = Instant::now();

            let outcome = match self.process_one(file, output_dir) {
                Ok(output) => {
                    stats.processed += 1;
                    FileOutcome::Saved {
                        output,
                        elapsed_ms: file_start.elapsed().as_millis() as u64,
                    }
                },
                Err(e) => {
                    stats.failed += 1;
                    warn!(file = %file.display(), error = %e, "Image failed to process");
                    FileOutcome::Failed {
                        error: e.to_string(),
                        elapsed_ms: file_start.elapsed().as_millis() as u64,
                    }
                },
            };

            reporter.file_completed(index, files.len(), file, &outcome);
        }

        stats.elapsed_ms = batch_start.elapsed().as_millis() as u64;
        info!(
            processed = stats.processed,
            failed = stats.failed,
            elapsed_ms = stats.elapsed_ms,
            "Batch processing complete"
        );

        reporter.batch_completed(&stats);
        Ok(stats)
    }

    fn process_one(&mut self, file: &Path, output_dir: &Path) -> Result<PathBuf> {
        let result = self.processor.process_file(file)?;
        let output = ImageIOService::output_path_for(file, output_dir);
        result.save_png(&output)?;
        Ok(output)
    }
}
