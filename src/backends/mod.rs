//! Backend implementations for model inference
//!
//! - Tract backend (pure Rust ONNX inference, CPU)
//! - Mock backend (deterministic mask for tests and diagnostics)

#[cfg(feature = "tract")]
pub mod tract;

pub mod mock;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

pub use self::mock::{MockBackend, MockBackendFactory};
