//! Inference backend abstraction

use crate::{
    config::RemovalConfig,
    error::Result,
    models::{ModelInfo, PreprocessingConfig},
};
use ndarray::Array4;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for inference backends
pub trait InferenceBackend {
    /// Initialize the backend with the given configuration
    ///
    /// Returns the model load time, or `None` when the backend was already
    /// initialized.
    ///
    /// # Errors
    /// - Model loading or validation errors
    /// - Invalid configuration parameters
    fn initialize(&mut self, config: &RemovalConfig) -> Result<Option<Duration>>;

    /// Run inference on the input tensor (NCHW f32 in, NCHW f32 out)
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Tensor conversion or shape errors
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Get the expected input shape for this backend
    fn input_shape(&self) -> (usize, usize, usize, usize);

    /// Get the expected output shape for this backend
    fn output_shape(&self) -> (usize, usize, usize, usize);

    /// Get preprocessing configuration for this backend
    ///
    /// # Errors
    /// - Preprocessing configuration unavailable
    fn preprocessing_config(&self) -> Result<PreprocessingConfig>;

    /// Get model information for this backend
    ///
    /// # Errors
    /// - Model metadata unavailable
    fn model_info(&self) -> Result<ModelInfo>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}

/// Factory trait for creating inference backends
///
/// The factory resolves the configured model inside the environment's models
/// directory and hands back a ready-to-initialize backend. Tests inject a
/// factory producing the mock backend instead.
pub trait BackendFactory: Send + Sync {
    /// Create a backend for the given configuration
    ///
    /// # Errors
    /// - Model resolution failures (missing asset, malformed sidecar)
    /// - No backend compiled in
    fn create_backend(&self, config: &RemovalConfig) -> Result<Box<dyn InferenceBackend>>;
}

/// Default backend factory: pure Rust Tract inference
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    #[cfg(feature = "tract")]
    fn create_backend(&self, config: &RemovalConfig) -> Result<Box<dyn InferenceBackend>> {
        let asset = crate::models::ModelAsset::resolve(&config.models_dir, config.model)?;
        Ok(Box::new(crate::backends::TractBackend::with_asset(asset)))
    }

    #[cfg(not(feature = "tract"))]
    fn create_backend(&self, _config: &RemovalConfig) -> Result<Box<dyn InferenceBackend>> {
        Err(crate::error::RemovalError::invalid_config(
            "No inference backend compiled in. Rebuild with the 'tract' feature.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factory_requires_model_asset() {
        let dir = tempfile::tempdir().unwrap();
        let config = RemovalConfig::builder()
            .models_dir(dir.path())
            .build()
            .unwrap();

        // Empty models dir: the factory must fail to resolve the asset
        let result = DefaultBackendFactory.create_backend(&config);
        assert!(result.is_err());
    }

    #[cfg(feature = "tract")]
    #[test]
    fn test_default_factory_creates_uninitialized_backend() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("u2net.onnx"), b"placeholder").unwrap();

        let config = RemovalConfig::builder()
            .models_dir(dir.path())
            .build()
            .unwrap();

        let backend = DefaultBackendFactory.create_backend(&config).unwrap();
        assert!(!backend.is_initialized());
        // Shapes come from the registry before initialization
        assert_eq!(backend.input_shape(), (1, 3, 320, 320));
        assert_eq!(backend.output_shape(), (1, 1, 320, 320));
    }
}
