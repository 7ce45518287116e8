//! I/O and progress reporting services

pub mod io;
pub mod progress;

pub use io::ImageIOService;
pub use progress::{FileOutcome, NoOpProgressReporter, ProgressReporter};
