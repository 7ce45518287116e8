//! Image preprocessing for model inference

use crate::{
    error::{RemovalError, Result},
    models::PreprocessingConfig,
};
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color for aspect ratio preservation (RGB)
    pub padding_color: [u8; 3],
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255], // White padding
        }
    }
}

/// Image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an image for model inference
    ///
    /// Handles:
    /// - RGB conversion
    /// - Aspect ratio preserving resize
    /// - Center padding to the model's square target size
    /// - Normalization to tensor format (NCHW)
    ///
    /// # Errors
    /// - Calculated dimensions out of range
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<Array4<f32>> {
        let target_size = preprocessing_config.target_size[0];

        let rgb_image = image.to_rgb8();
        let (orig_width, orig_height) = rgb_image.dimensions();

        let target_size_f32 = target_size as f32;
        let orig_width_f32 = orig_width as f32;
        let orig_height_f32 = orig_height as f32;

        let scale = target_size_f32
            .min((target_size_f32 / orig_width_f32).min(target_size_f32 / orig_height_f32));

        let new_width_f32 = (orig_width_f32 * scale).round();
        let new_height_f32 = (orig_height_f32 * scale).round();

        if new_width_f32 < 0.0 || new_width_f32 > u32::MAX as f32 {
            return Err(RemovalError::processing(
                "Calculated new width out of valid range",
            ));
        }
        if new_height_f32 < 0.0 || new_height_f32 > u32::MAX as f32 {
            return Err(RemovalError::processing(
                "Calculated new height out of valid range",
            ));
        }

        let new_width = new_width_f32 as u32;
        let new_height = new_height_f32 as u32;

        let resized = image::imageops::resize(
            &rgb_image,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );

        let padding = options.padding_color;
        let mut canvas = ImageBuffer::from_pixel(
            target_size,
            target_size,
            image::Rgb([padding[0], padding[1], padding[2]]),
        );

        let offset_x = (target_size - new_width) / 2;
        let offset_y = (target_size - new_height) / 2;

        for (x, y, pixel) in resized.enumerate_pixels() {
            let canvas_x = x + offset_x;
            let canvas_y = y + offset_y;
            if canvas_x < target_size && canvas_y < target_size {
                canvas.put_pixel(canvas_x, canvas_y, *pixel);
            }
        }

        let target_size_usize = target_size.try_into().map_err(|_| {
            RemovalError::processing(
                "Target size too large for usize conversion in tensor allocation",
            )
        })?;

        Ok(Self::canvas_to_tensor(
            &canvas,
            preprocessing_config,
            target_size_usize,
        ))
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(
        canvas: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
        target_size: usize,
    ) -> Array4<f32> {
        let mut tensor = Array4::<f32>::zeros((1, 3, target_size, target_size));

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match canvas size
        for (y, row) in canvas.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                let normalized_r = (f32::from(pixel[0]) / 255.0
                    - preprocessing_config.normalization_mean[0])
                    / preprocessing_config.normalization_std[0];
                let normalized_g = (f32::from(pixel[1]) / 255.0
                    - preprocessing_config.normalization_mean[1])
                    / preprocessing_config.normalization_std[1];
                let normalized_b = (f32::from(pixel[2]) / 255.0
                    - preprocessing_config.normalization_mean[2])
                    / preprocessing_config.normalization_std[2];

                tensor[[0, 0, y, x]] = normalized_r;
                tensor[[0, 1, y, x]] = normalized_g;
                tensor[[0, 2, y, x]] = normalized_b;
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn test_config(size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: [size, size],
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }

    fn red_image(width: u32, height: u32) -> DynamicImage {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_preprocess_square_input() {
        let tensor = ImagePreprocessor::preprocess_image(
            &red_image(100, 100),
            &test_config(64),
            &PreprocessingOptions::default(),
        )
        .unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
    }

    #[test]
    fn test_preprocess_preserves_aspect_ratio() {
        let config = test_config(64);
        let tensor = ImagePreprocessor::preprocess_image(
            &red_image(200, 100),
            &config,
            &PreprocessingOptions::default(),
        )
        .unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);

        // A 2:1 image lands centered: rows above the content area hold padding.
        // White padding normalizes to (1.0 - mean) / std for every channel.
        let padded_r = (1.0 - config.normalization_mean[0]) / config.normalization_std[0];
        assert!((tensor[[0, 0, 0, 0]] - padded_r).abs() < 1e-4);

        // Center row holds the red content: full red channel, zero green
        let content_r = (1.0 - config.normalization_mean[0]) / config.normalization_std[0];
        let content_g = (0.0 - config.normalization_mean[1]) / config.normalization_std[1];
        assert!((tensor[[0, 0, 32, 32]] - content_r).abs() < 1e-4);
        assert!((tensor[[0, 1, 32, 32]] - content_g).abs() < 1e-4);
    }

    #[test]
    fn test_preprocess_custom_padding() {
        let config = test_config(64);
        let options = PreprocessingOptions {
            padding_color: [0, 0, 0],
        };
        let tensor =
            ImagePreprocessor::preprocess_image(&red_image(200, 100), &config, &options).unwrap();

        // Black padding normalizes to (0.0 - mean) / std
        let padded_r = (0.0 - config.normalization_mean[0]) / config.normalization_std[0];
        assert!((tensor[[0, 0, 0, 0]] - padded_r).abs() < 1e-4);
    }
}
