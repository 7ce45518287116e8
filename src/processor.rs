//! Unified background removal processor
//!
//! [`RemovalProcessor`] owns the configured backend and drives the per-image
//! pipeline: preprocess, infer, rebuild the mask at original resolution,
//! refine and composite (or emit the mask alone in mask-only mode).

use crate::{
    config::RemovalConfig,
    error::{RemovalError, Result},
    inference::{BackendFactory, DefaultBackendFactory, InferenceBackend},
    matting,
    types::{ProcessingTimings, RemovalResult, SegmentationMask},
    utils::{ImagePreprocessor, PreprocessingOptions},
};
use image::{DynamicImage, GenericImageView, ImageBuffer, RgbaImage};
use instant::Instant;
use log::debug;
use ndarray::Array4;
use std::path::Path;
use tracing::{info as trace_info, instrument, span, Level};

/// Coordinate transformation parameters for tensor-to-mask conversion
#[derive(Debug, Clone)]
struct CoordinateTransformation {
    /// Scale factor used during preprocessing
    scale: f32,
    /// X offset for centering
    offset_x: u32,
    /// Y offset for centering
    offset_y: u32,
    /// Mask width in tensor coordinates
    mask_width: u32,
    /// Mask height in tensor coordinates
    mask_height: u32,
}

/// Background removal processor driving the per-image pipeline
pub struct RemovalProcessor {
    config: RemovalConfig,
    backend_factory: Box<dyn BackendFactory>,
    backend: Option<Box<dyn InferenceBackend>>,
    initialized: bool,
}

impl RemovalProcessor {
    /// Create a processor with the default backend factory
    #[must_use]
    pub fn new(config: RemovalConfig) -> Self {
        Self::with_factory(config, Box::new(DefaultBackendFactory))
    }

    /// Create a processor with a custom backend factory
    #[must_use]
    pub fn with_factory(config: RemovalConfig, backend_factory: Box<dyn BackendFactory>) -> Self {
        Self {
            config,
            backend_factory,
            backend: None,
            initialized: false,
        }
    }

    /// Initialize the configured model and backend
    ///
    /// # Errors
    /// - Model resolution or loading failures
    /// - Backend initialization errors
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        debug!("Initializing removal processor, model: {}", self.config.model);

        let mut backend = self.backend_factory.create_backend(&self.config)?;
        let _model_load_time = backend.initialize(&self.config)?;

        self.backend = Some(backend);
        self.initialized = true;

        trace_info!(model = %self.config.model, "Removal processor initialized");
        Ok(())
    }

    /// Process an image file
    ///
    /// # Errors
    /// - File I/O errors when reading input
    /// - Image format parsing failures
    /// - Processing and inference errors
    pub fn process_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<RemovalResult> {
        let input_path_ref = input_path.as_ref();

        let decode_start = Instant::now();
        let image = crate::services::ImageIOService::load_image(input_path_ref)?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self.process_image(&image)?;
        result.timings.decode_ms = decode_ms;
        result.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Process a `DynamicImage` directly
    ///
    /// # Errors
    /// - Image preprocessing failures
    /// - Inference execution errors
    /// - Mask generation and compositing errors
    #[instrument(
        skip(self, image),
        fields(
            model = %self.config.model,
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        if !self.initialized {
            self.initialize()?;
        }

        let mut timings = ProcessingTimings::default();
        let total_start = Instant::now();
        let original_dimensions = image.dimensions();

        // Preprocess image for inference
        let input_tensor = {
            let _span = span!(
                Level::DEBUG,
                "preprocessing",
                original_width = %original_dimensions.0,
                original_height = %original_dimensions.1
            )
            .entered();
            self.preprocess(image, &mut timings)?
        };

        // Perform inference
        let output_tensor = {
            let _span = span!(Level::INFO, "inference", model = %self.config.model).entered();
            self.infer(&input_tensor, &mut timings)?
        };

        // Rebuild the mask, refine it and build the output image
        let postprocess_start = Instant::now();
        let mask = {
            let _span = span!(
                Level::DEBUG,
                "mask_reconstruction",
                width = %original_dimensions.0,
                height = %original_dimensions.1
            )
            .entered();
            let raw = Self::tensor_to_mask(&output_tensor, original_dimensions)?;
            if self.config.alpha_matting {
                matting::refine_alpha(&raw, &self.config.matting)
            } else {
                raw
            }
        };

        let output_image = if self.config.only_mask {
            DynamicImage::ImageLuma8(mask.to_image()?)
        } else {
            let mut composited = Self::apply_mask(image, &mask);
            matting::clean_transparency(&mut composited);
            DynamicImage::ImageRgba8(composited)
        };
        timings.postprocessing_ms = postprocess_start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        Ok(RemovalResult::new(
            output_image,
            mask,
            original_dimensions,
            timings,
        ))
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Check if the processor is initialized
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn preprocess(
        &mut self,
        image: &DynamicImage,
        timings: &mut ProcessingTimings,
    ) -> Result<Array4<f32>> {
        let preprocess_start = Instant::now();

        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| RemovalError::processing("Backend not initialized"))?;

        let preprocessing_config = backend.preprocessing_config()?;
        let input_tensor = ImagePreprocessor::preprocess_image(
            image,
            &preprocessing_config,
            &PreprocessingOptions::default(),
        )?;

        timings.preprocessing_ms = preprocess_start.elapsed().as_millis() as u64;
        Ok(input_tensor)
    }

    fn infer(
        &mut self,
        input_tensor: &Array4<f32>,
        timings: &mut ProcessingTimings,
    ) -> Result<Array4<f32>> {
        let inference_start = Instant::now();

        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| RemovalError::processing("Backend not initialized"))?;

        let output_tensor = backend.infer(input_tensor)?;
        timings.inference_ms = inference_start.elapsed().as_millis() as u64;

        Ok(output_tensor)
    }

    /// Convert output tensor to a mask at original resolution, undoing the
    /// aspect-preserving resize and centering from preprocessing
    fn tensor_to_mask(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> Result<SegmentationMask> {
        Self::validate_tensor_shape(tensor)?;
        let transformation = Self::inverse_transformation(tensor, original_dimensions);
        let mask_data = Self::extract_mask_values(tensor, original_dimensions, &transformation);
        Ok(SegmentationMask::new(mask_data, original_dimensions))
    }

    #[allow(clippy::get_first)]
    fn validate_tensor_shape(tensor: &Array4<f32>) -> Result<()> {
        let shape = tensor.shape();
        if shape.len() < 4
            || shape.get(0).copied().unwrap_or(0) != 1
            || shape.get(1).copied().unwrap_or(0) != 1
        {
            return Err(RemovalError::processing("Invalid output tensor shape"));
        }
        Ok(())
    }

    /// Reproduce the preprocessing math to get the inverse transformation
    fn inverse_transformation(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> CoordinateTransformation {
        let shape = tensor.shape();
        let mask_height = shape.get(2).copied().unwrap_or(0);
        let mask_width = shape.get(3).copied().unwrap_or(0);
        let (orig_width, orig_height) = original_dimensions;

        // Square tensors are assumed, as produced by all supported models
        let target_size = mask_width;
        let target_size_f32 = target_size as f32;
        let orig_width_f32 = orig_width as f32;
        let orig_height_f32 = orig_height as f32;

        let scale = target_size_f32
            .min((target_size_f32 / orig_width_f32).min(target_size_f32 / orig_height_f32));

        let scaled_width = (orig_width_f32 * scale).round() as u32;
        let scaled_height = (orig_height_f32 * scale).round() as u32;

        let offset_x = (target_size as u32 - scaled_width) / 2;
        let offset_y = (target_size as u32 - scaled_height) / 2;

        CoordinateTransformation {
            scale,
            offset_x,
            offset_y,
            mask_width: mask_width as u32,
            mask_height: mask_height as u32,
        }
    }

    fn extract_mask_values(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
        transformation: &CoordinateTransformation,
    ) -> Vec<u8> {
        let (orig_width, orig_height) = original_dimensions;
        let mut mask_data = Vec::with_capacity((orig_width * orig_height) as usize);

        for y in 0..orig_height {
            for x in 0..orig_width {
                let mask_value = Self::tensor_value_at(tensor, x, y, transformation);
                mask_data.push((mask_value.clamp(0.0, 1.0) * 255.0) as u8);
            }
        }

        mask_data
    }

    fn tensor_value_at(
        tensor: &Array4<f32>,
        x: u32,
        y: u32,
        transformation: &CoordinateTransformation,
    ) -> f32 {
        let scaled_x = (x as f32 * transformation.scale).round() as u32;
        let scaled_y = (y as f32 * transformation.scale).round() as u32;

        let tensor_x = scaled_x + transformation.offset_x;
        let tensor_y = scaled_y + transformation.offset_y;

        if tensor_x < transformation.mask_width && tensor_y < transformation.mask_height {
            tensor
                .get([0, 0, tensor_y as usize, tensor_x as usize])
                .copied()
                .unwrap_or(0.0)
        } else {
            0.0 // Outside the model's prediction area
        }
    }

    /// Multiply the mask into the alpha channel
    fn apply_mask(image: &DynamicImage, mask: &SegmentationMask) -> RgbaImage {
        let rgba_image = image.to_rgba8();
        let (width, height) = rgba_image.dimensions();
        let mut result = ImageBuffer::new(width, height);

        for (x, y, pixel) in rgba_image.enumerate_pixels() {
            let alpha = mask.value_at(x, y);
            if alpha > 0 {
                result.put_pixel(x, y, image::Rgba([pixel[0], pixel[1], pixel[2], alpha]));
            } else {
                result.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackendFactory;
    use image::Rgba;

    fn mock_processor(config: RemovalConfig) -> RemovalProcessor {
        RemovalProcessor::with_factory(config, Box::new(MockBackendFactory::with_target_size(64)))
    }

    fn dark_test_image(width: u32, height: u32) -> DynamicImage {
        // Dark pixels survive transparency cleanup untouched
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([40, 60, 80, 255])))
    }

    #[test]
    fn test_process_image_produces_original_dimensions() {
        let config = RemovalConfig::builder()
            .alpha_matting(false)
            .build()
            .unwrap();
        let mut processor = mock_processor(config);

        let result = processor.process_image(&dark_test_image(48, 96)).unwrap();
        assert_eq!(result.dimensions(), (48, 96));
        assert_eq!(result.mask.dimensions, (48, 96));
        assert!(processor.is_initialized());
    }

    #[test]
    fn test_process_image_center_is_foreground() {
        let config = RemovalConfig::builder()
            .alpha_matting(false)
            .build()
            .unwrap();
        let mut processor = mock_processor(config);

        let result = processor.process_image(&dark_test_image(64, 64)).unwrap();

        // Mock mask: centered half-size rectangle
        assert_eq!(result.mask.value_at(32, 32), 255);
        assert_eq!(result.mask.value_at(1, 1), 0);

        let rgba = result.image.to_rgba8();
        assert_eq!(rgba.get_pixel(32, 32).0, [40, 60, 80, 255]);
        assert_eq!(rgba.get_pixel(1, 1).0[3], 0);
    }

    #[test]
    fn test_process_image_mask_only() {
        let config = RemovalConfig::builder()
            .alpha_matting(false)
            .only_mask(true)
            .build()
            .unwrap();
        let mut processor = mock_processor(config);

        let result = processor.process_image(&dark_test_image(64, 64)).unwrap();
        let gray = result.image.to_luma8();
        assert_eq!(gray.get_pixel(32, 32)[0], 255);
        assert_eq!(gray.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn test_alpha_matting_erodes_mask_edges() {
        let plain = RemovalConfig::builder()
            .alpha_matting(false)
            .only_mask(true)
            .build()
            .unwrap();
        let matted = RemovalConfig::builder()
            .alpha_matting(true)
            .only_mask(true)
            .build()
            .unwrap();

        let image = dark_test_image(64, 64);
        let raw = mock_processor(plain).process_image(&image).unwrap();
        let refined = mock_processor(matted).process_image(&image).unwrap();

        // Erosion can only remove foreground, never add it
        assert!(refined.mask.foreground_ratio() < raw.mask.foreground_ratio());
        // The solid core survives
        assert_eq!(refined.mask.value_at(32, 32), 255);
    }

    #[test]
    fn test_timings_are_recorded() {
        let config = RemovalConfig::builder()
            .alpha_matting(false)
            .build()
            .unwrap();
        let mut processor = mock_processor(config);
        let result = processor.process_image(&dark_test_image(32, 32)).unwrap();
        assert!(result.timings.total_ms >= result.timings.inference_ms);
    }
}
