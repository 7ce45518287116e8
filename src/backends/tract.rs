//! Tract backend for running segmentation models with pure Rust inference
//!
//! Tract needs no external runtime libraries, which keeps the tool a single
//! static binary: the only assets it loads at runtime are the ONNX files
//! inside the activated environment.

use crate::config::RemovalConfig;
use crate::error::{RemovalError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelAsset, ModelInfo, PreprocessingConfig};
use log;
use ndarray::Array4;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

// Use instant crate for cross-platform time compatibility
use instant::{Duration, Instant};

/// Tract backend bound to one resolved model asset
#[derive(Debug)]
pub struct TractBackend {
    asset: ModelAsset,
    model: Option<TractModel>,
    initialized: bool,
}

impl TractBackend {
    /// Create an uninitialized backend for a resolved model asset
    #[must_use]
    pub fn with_asset(asset: ModelAsset) -> Self {
        Self {
            asset,
            model: None,
            initialized: false,
        }
    }

    /// Load and optimize the model with Tract
    fn load_model(&mut self) -> Result<Duration> {
        let model_load_start = Instant::now();

        let model_data = self.asset.load_bytes()?;
        let model_info = self.asset.info()?;

        log::info!("Initializing Tract backend");
        log::info!(
            "Model: {} ({:.2} MB)",
            model_info.name,
            model_info.size_bytes as f64 / (1024.0 * 1024.0)
        );

        let model = onnx()
            .model_for_read(&mut std::io::Cursor::new(model_data))
            .map_err(|e| RemovalError::model(format!("Failed to load ONNX model: {e}")))?
            .into_optimized()
            .map_err(|e| RemovalError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| RemovalError::model(format!("Failed to create runnable model: {e}")))?;

        self.model = Some(model);
        self.initialized = true;

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "Tract backend initialized in {:.2}ms",
            model_load_time.as_millis()
        );

        Ok(model_load_time)
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(&mut self, _config: &RemovalConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }

        let model_load_time = self.load_model()?;
        Ok(Some(model_load_time))
    }

    #[allow(clippy::get_first)]
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| RemovalError::inference("Tract model not initialized"))?;

        log::debug!("Running Tract inference, input tensor {:?}", input.shape());

        let inference_start = Instant::now();

        let input_tensor = Tensor::from(input.clone());

        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| RemovalError::inference(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| RemovalError::inference("No output tensor found"))?
            .into_arc_tensor();

        let output_data = output_tensor.to_array_view::<f32>().map_err(|e| {
            RemovalError::inference(format!("Failed to convert output tensor: {e}"))
        })?;

        let output_shape = output_data.shape();
        if output_shape.len() != 4 {
            return Err(RemovalError::inference(format!(
                "Expected 4D output tensor, got {}D",
                output_shape.len()
            )));
        }

        let output_array = Array4::from_shape_vec(
            (
                output_shape.get(0).copied().unwrap_or(1),
                output_shape.get(1).copied().unwrap_or(1),
                output_shape.get(2).copied().unwrap_or(320),
                output_shape.get(3).copied().unwrap_or(320),
            ),
            output_data.to_owned().into_raw_vec_and_offset().0,
        )
        .map_err(|e| RemovalError::inference(format!("Failed to reshape output tensor: {e}")))?;

        log::debug!(
            "Tract inference completed in {:.2}ms, output tensor {:?}",
            inference_start.elapsed().as_millis(),
            output_array.shape()
        );

        Ok(output_array)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        let side = self.asset.preprocessing.target_size[0] as usize;
        (1, 3, side, side)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        let side = self.asset.preprocessing.target_size[0] as usize;
        (1, 1, side, side)
    }

    fn preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.asset.preprocessing.clone())
    }

    fn model_info(&self) -> Result<ModelInfo> {
        self.asset.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;

    fn placeholder_asset(dir: &std::path::Path, kind: ModelKind) -> ModelAsset {
        std::fs::write(dir.join(kind.file_name()), b"not an onnx graph").unwrap();
        ModelAsset::resolve(dir, kind).unwrap()
    }

    #[test]
    fn test_backend_shapes_follow_the_asset() {
        let dir = tempfile::tempdir().unwrap();
        let backend = TractBackend::with_asset(placeholder_asset(dir.path(), ModelKind::U2Net));

        assert!(!backend.is_initialized());
        assert_eq!(backend.input_shape(), (1, 3, 320, 320));
        assert_eq!(backend.output_shape(), (1, 1, 320, 320));

        let config = backend.preprocessing_config().unwrap();
        assert_eq!(config.target_size, [320, 320]);
    }

    #[test]
    fn test_initialize_rejects_invalid_model_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend =
            TractBackend::with_asset(placeholder_asset(dir.path(), ModelKind::U2NetP));

        let config = RemovalConfig::builder()
            .model(ModelKind::U2NetP)
            .models_dir(dir.path())
            .build()
            .unwrap();

        // Placeholder bytes are not a valid ONNX graph
        let result = backend.initialize(&config);
        assert!(result.is_err());
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_infer_requires_initialization() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend =
            TractBackend::with_asset(placeholder_asset(dir.path(), ModelKind::U2Net));

        let input = Array4::<f32>::zeros((1, 3, 320, 320));
        let result = backend.infer(&input);
        assert!(result.is_err());
    }
}
