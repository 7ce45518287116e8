//! Progress reporting for batch processing
//!
//! The batch runner reports through this trait so frontends can choose how to
//! surface progress: the CLI renders per-file lines or an indicatif bar, tests
//! and library callers use the no-op reporter.

use crate::batch::BatchStats;
use std::path::Path;

/// Outcome of processing a single file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// File processed and saved successfully
    Saved {
        /// Path the output was written to
        output: std::path::PathBuf,
        /// Wall-clock time for this file in milliseconds
        elapsed_ms: u64,
    },
    /// File failed to process; the batch continues
    Failed {
        /// Error message
        error: String,
        /// Wall-clock time spent before the failure in milliseconds
        elapsed_ms: u64,
    },
}

/// Trait for observing batch progress
pub trait ProgressReporter {
    /// Called before a file is processed (`index` is zero-based)
    fn file_started(&self, index: usize, total: usize, path: &Path);

    /// Called after a file finished, successfully or not
    fn file_completed(&self, index: usize, total: usize, path: &Path, outcome: &FileOutcome);

    /// Called once after the whole batch
    fn batch_completed(&self, stats: &BatchStats);
}

/// Reporter that does nothing; default for library and test callers
#[derive(Debug, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn file_started(&self, _index: usize, _total: usize, _path: &Path) {}

    fn file_completed(&self, _index: usize, _total: usize, _path: &Path, _outcome: &FileOutcome) {}

    fn batch_completed(&self, _stats: &BatchStats) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_reporter_is_callable() {
        let reporter = NoOpProgressReporter;
        reporter.file_started(0, 1, Path::new("a.png"));
        reporter.file_completed(
            0,
            1,
            Path::new("a.png"),
            &FileOutcome::Saved {
                output: "out.png".into(),
                elapsed_ms: 1,
            },
        );
    }
}
