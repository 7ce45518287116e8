#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Batch Background Removal
//!
//! A Rust library and CLI for removing backgrounds from every image in an
//! input folder. Inference runs through ONNX segmentation models (`u2net`
//! family and `isnet-general-use`) with a pure Rust Tract backend, and the
//! composited results are written as transparent PNGs.
//!
//! Model assets live in a scoped runtime environment directory (default
//! `.bgremove-env/`) that is activated before processing and deactivated
//! afterwards; a missing environment is the one fatal precondition.
//!
//! ## Features
//!
//! - **Five quality levels**: `u2net`, `u2netp`, `u2net_human_seg`,
//!   `u2net_cloth_seg`, `isnet-general-use`
//! - **Alpha matting**: threshold-and-erode edge refinement
//! - **Transparency cleanup**: near-white and low-alpha scrubbing
//! - **Mask-only mode**: emit the grayscale segmentation mask
//! - **Batch semantics**: sorted folder scan, continue on failure, summary
//! - **CLI Integration**: interactive menu and prompts (enable with `cli`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_batch::{remove_background_from_bytes, ModelKind, RemovalConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RemovalConfig::builder()
//!     .model(ModelKind::U2Net)
//!     .models_dir(".bgremove-env/models")
//!     .build()?;
//!
//! let input = std::fs::read("photo.jpg")?;
//! let result = remove_background_from_bytes(&input, &config).await?;
//! result.save_png("photo_no_bg.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Batch Usage
//!
//! ```rust,no_run
//! use bgremove_batch::{BatchRunner, NoOpProgressReporter, RemovalConfig, RemovalProcessor};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = RemovalConfig::builder()
//!     .models_dir(".bgremove-env/models")
//!     .build()?;
//! let mut runner = BatchRunner::new(RemovalProcessor::new(config));
//! let stats = runner.run("input", "output", &NoOpProgressReporter)?;
//! println!("{} processed, {} failed", stats.processed, stats.failed);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod matting;
pub mod models;
pub mod processor;
pub mod runtime_env;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use batch::{BatchRunner, BatchStats, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR};
pub use config::{MattingOptions, RemovalConfig, RemovalConfigBuilder};
pub use error::{RemovalError, Result};
pub use inference::{BackendFactory, DefaultBackendFactory, InferenceBackend};
pub use matting::{clean_transparency, refine_alpha};
pub use models::{ModelAsset, ModelInfo, ModelKind, PreprocessingConfig};
pub use processor::RemovalProcessor;
pub use runtime_env::{RuntimeEnv, DEFAULT_ENV_DIR, ENV_DIR_VAR};
pub use services::{
    FileOutcome, ImageIOService, NoOpProgressReporter, ProgressReporter,
};
pub use types::{ProcessingTimings, RemovalResult, SegmentationMask};
pub use utils::{ImagePreprocessor, PreprocessingOptions};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Remove background from an image provided as bytes
///
/// Stream-friendly API for callers that already hold encoded image data
/// (JPEG, PNG, WebP, BMP, TIFF).
///
/// # Arguments
///
/// * `image_bytes` - Raw encoded image data
/// * `config` - Configuration for the removal operation
///
/// # Returns
///
/// A [`RemovalResult`] containing the processed image, mask, and timings
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let image = image::load_from_memory(image_bytes).map_err(|e| {
        RemovalError::processing(format!("Failed to decode image from bytes: {}", e))
    })?;

    remove_background_from_image(image, config).await
}

/// Remove background from a `DynamicImage` directly
///
/// The most flexible API for in-memory processing: no file I/O happens, only
/// inference and compositing.
///
/// # Arguments
///
/// * `image` - A `DynamicImage` to process (from the image crate)
/// * `config` - Configuration for the removal operation
///
/// # Returns
///
/// A [`RemovalResult`] containing the processed image, mask, and timings
pub async fn remove_background_from_image(
    image: image::DynamicImage,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    let mut processor = RemovalProcessor::new(config.clone());
    processor.process_image(&image)
}
