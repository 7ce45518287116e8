//! Mock backend for testing and diagnostics
//!
//! Produces a deterministic mask without requiring model files: everything
//! inside the centered half-size rectangle of the input tensor is foreground,
//! everything outside is background.

use crate::config::RemovalConfig;
use crate::error::Result;
use crate::inference::{BackendFactory, InferenceBackend};
use crate::models::{ModelInfo, PreprocessingConfig};
use ndarray::Array4;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Mock backend producing a centered rectangular foreground mask
#[derive(Debug)]
pub struct MockBackend {
    target_size: u32,
    initialized: bool,
}

impl MockBackend {
    /// Create a mock backend with the default 64x64 input size
    #[must_use]
    pub fn new() -> Self {
        Self::with_target_size(64)
    }

    /// Create a mock backend with a custom square input size
    #[must_use]
    pub fn with_target_size(target_size: u32) -> Self {
        Self {
            target_size,
            initialized: false,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, _config: &RemovalConfig) -> Result<Option<Duration>> {
        self.initialized = true;
        Ok(None)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let (n, _c, h, w) = input.dim();
        let mut output = Array4::<f32>::zeros((n, 1, h, w));

        // Foreground: the centered rectangle covering half of each dimension
        let (y0, y1) = (h / 4, h * 3 / 4);
        let (x0, x1) = (w / 4, w * 3 / 4);

        for batch in 0..n {
            for y in y0..y1 {
                for x in x0..x1 {
                    if let Some(elem) = output.get_mut([batch, 0, y, x]) {
                        *elem = 1.0;
                    }
                }
            }
        }

        Ok(output)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        let side = self.target_size as usize;
        (1, 3, side, side)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        let side = self.target_size as usize;
        (1, 1, side, side)
    }

    fn preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(PreprocessingConfig {
            target_size: [self.target_size, self.target_size],
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        })
    }

    fn model_info(&self) -> Result<ModelInfo> {
        Ok(ModelInfo {
            name: "mock".to_string(),
            size_bytes: 0,
            input_shape: self.input_shape(),
            output_shape: self.output_shape(),
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Factory producing mock backends, for pipeline tests without model assets
#[derive(Debug)]
pub struct MockBackendFactory {
    target_size: u32,
}

impl Default for MockBackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackendFactory {
    /// Create a factory with the default mock input size
    #[must_use]
    pub fn new() -> Self {
        Self { target_size: 64 }
    }

    /// Create a factory producing mocks with a custom input size
    #[must_use]
    pub fn with_target_size(target_size: u32) -> Self {
        Self { target_size }
    }
}

impl BackendFactory for MockBackendFactory {
    fn create_backend(&self, _config: &RemovalConfig) -> Result<Box<dyn InferenceBackend>> {
        Ok(Box::new(MockBackend::with_target_size(self.target_size)))
    }
}
