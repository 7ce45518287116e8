//! Configuration types for background removal

use crate::error::{RemovalError, Result};
use crate::models::ModelKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Alpha-matting refinement parameters
///
/// Mask values at or above `foreground_threshold` snap to fully opaque, values
/// at or below `background_threshold` snap to fully transparent, and the solid
/// foreground is then eroded by `erode_size` pixels so edges keep a soft band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MattingOptions {
    /// Mask value treated as certain foreground (0-255)
    pub foreground_threshold: u8,
    /// Mask value treated as certain background (0-255)
    pub background_threshold: u8,
    /// Erosion radius in pixels applied to the refined mask
    pub erode_size: u32,
}

impl Default for MattingOptions {
    fn default() -> Self {
        Self {
            foreground_threshold: 240,
            background_threshold: 10,
            erode_size: 10,
        }
    }
}

/// Configuration for a background removal run
#[derive(Debug, Clone)]
pub struct RemovalConfig {
    /// Which segmentation model to use
    pub model: ModelKind,
    /// Directory containing the model assets (the environment's `models/` dir)
    pub models_dir: PathBuf,
    /// Whether to refine mask edges with alpha matting
    pub alpha_matting: bool,
    /// Alpha-matting parameters
    pub matting: MattingOptions,
    /// Emit the grayscale mask instead of the transparent composite
    pub only_mask: bool,
    /// Enable debug diagnostics
    pub debug: bool,
}

impl RemovalConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::new()
    }
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            models_dir: PathBuf::from(".bgremove-env/models"),
            alpha_matting: true,
            matting: MattingOptions::default(),
            only_mask: false,
            debug: false,
        }
    }
}

/// Builder for [`RemovalConfig`]
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RemovalConfig::default(),
        }
    }

    #[must_use]
    pub fn model(mut self, model: ModelKind) -> Self {
        self.config.model = model;
        self
    }

    #[must_use]
    pub fn models_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.models_dir = dir.into();
        self
    }

    #[must_use]
    pub fn alpha_matting(mut self, enabled: bool) -> Self {
        self.config.alpha_matting = enabled;
        self
    }

    #[must_use]
    pub fn matting(mut self, matting: MattingOptions) -> Self {
        self.config.matting = matting;
        self
    }

    #[must_use]
    pub fn only_mask(mut self, only_mask: bool) -> Self {
        self.config.only_mask = only_mask;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `RemovalError` for:
    /// - Foreground threshold not strictly above the background threshold
    /// - Erosion radius large enough to swallow the smallest model input
    pub fn build(self) -> Result<RemovalConfig> {
        let matting = &self.config.matting;
        if matting.foreground_threshold <= matting.background_threshold {
            return Err(RemovalError::invalid_config(format!(
                "foreground threshold ({}) must be greater than background threshold ({})",
                matting.foreground_threshold, matting.background_threshold
            )));
        }
        if matting.erode_size > 64 {
            return Err(RemovalError::invalid_config(format!(
                "erode size {} is out of range (0-64)",
                matting.erode_size
            )));
        }

        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_original_defaults() {
        let config = RemovalConfig::default();
        assert_eq!(config.model, ModelKind::U2Net);
        assert!(config.alpha_matting);
        assert!(!config.only_mask);
        assert_eq!(config.matting.foreground_threshold, 240);
        assert_eq!(config.matting.background_threshold, 10);
        assert_eq!(config.matting.erode_size, 10);
    }

    #[test]
    fn test_builder_chain() {
        let config = RemovalConfig::builder()
            .model(ModelKind::IsnetGeneralUse)
            .models_dir("/tmp/models")
            .alpha_matting(false)
            .only_mask(true)
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(config.model, ModelKind::IsnetGeneralUse);
        assert_eq!(config.models_dir, PathBuf::from("/tmp/models"));
        assert!(!config.alpha_matting);
        assert!(config.only_mask);
        assert!(config.debug);
    }

    #[test]
    fn test_builder_rejects_inverted_thresholds() {
        let result = RemovalConfig::builder()
            .matting(MattingOptions {
                foreground_threshold: 10,
                background_threshold: 240,
                erode_size: 10,
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_oversized_erosion() {
        let result = RemovalConfig::builder()
            .matting(MattingOptions {
                foreground_threshold: 240,
                background_threshold: 10,
                erode_size: 100,
            })
            .build();
        assert!(result.is_err());
    }
}
