//! Model registry and asset resolution
//!
//! Maps the supported segmentation models to their asset file names inside the
//! runtime environment, their menu keys, and their preprocessing constants. An
//! optional JSON sidecar next to a model file (`u2net.json` beside
//! `u2net.onnx`) can override the preprocessing constants for custom exports.

use crate::error::{RemovalError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Supported segmentation models, ordered by menu key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Default model, good balance of speed and quality
    U2Net,
    /// Lightweight variant, faster but lower quality
    U2NetP,
    /// Optimized for human subjects
    U2NetHumanSeg,
    /// Optimized for fashion and clothing
    U2NetClothSeg,
    /// Highest overall quality, slower
    IsnetGeneralUse,
}

impl ModelKind {
    /// All models in menu order
    #[must_use]
    pub fn all() -> [ModelKind; 5] {
        [
            ModelKind::U2Net,
            ModelKind::U2NetP,
            ModelKind::U2NetHumanSeg,
            ModelKind::U2NetClothSeg,
            ModelKind::IsnetGeneralUse,
        ]
    }

    /// Interactive menu key (`'1'`..`'5'`)
    #[must_use]
    pub fn menu_key(self) -> char {
        match self {
            ModelKind::U2Net => '1',
            ModelKind::U2NetP => '2',
            ModelKind::U2NetHumanSeg => '3',
            ModelKind::U2NetClothSeg => '4',
            ModelKind::IsnetGeneralUse => '5',
        }
    }

    /// Resolve a model from its menu key
    #[must_use]
    pub fn from_menu_key(key: &str) -> Option<ModelKind> {
        match key.trim() {
            "1" => Some(ModelKind::U2Net),
            "2" => Some(ModelKind::U2NetP),
            "3" => Some(ModelKind::U2NetHumanSeg),
            "4" => Some(ModelKind::U2NetClothSeg),
            "5" => Some(ModelKind::IsnetGeneralUse),
            _ => None,
        }
    }

    /// Canonical model name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::U2Net => "u2net",
            ModelKind::U2NetP => "u2netp",
            ModelKind::U2NetHumanSeg => "u2net_human_seg",
            ModelKind::U2NetClothSeg => "u2net_cloth_seg",
            ModelKind::IsnetGeneralUse => "isnet-general-use",
        }
    }

    /// ONNX asset file name inside the environment's models directory
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::U2Net => "u2net.onnx",
            ModelKind::U2NetP => "u2netp.onnx",
            ModelKind::U2NetHumanSeg => "u2net_human_seg.onnx",
            ModelKind::U2NetClothSeg => "u2net_cloth_seg.onnx",
            ModelKind::IsnetGeneralUse => "isnet-general-use.onnx",
        }
    }

    /// Human-readable quality description for the selection menu
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ModelKind::U2Net => "Default - Good balance of speed and quality",
            ModelKind::U2NetP => "Lightweight - Faster but lower quality",
            ModelKind::U2NetHumanSeg => "People - Optimized for human subjects",
            ModelKind::U2NetClothSeg => "Clothing - Best for fashion/clothing",
            ModelKind::IsnetGeneralUse => "High Quality - Best overall quality (slower)",
        }
    }

    /// Built-in preprocessing constants for this model family
    #[must_use]
    pub fn preprocessing_defaults(self) -> PreprocessingConfig {
        match self {
            ModelKind::U2Net | ModelKind::U2NetP | ModelKind::U2NetHumanSeg => {
                PreprocessingConfig {
                    target_size: [320, 320],
                    normalization_mean: [0.485, 0.456, 0.406],
                    normalization_std: [0.229, 0.224, 0.225],
                }
            },
            ModelKind::U2NetClothSeg => PreprocessingConfig {
                target_size: [768, 768],
                normalization_mean: [0.485, 0.456, 0.406],
                normalization_std: [0.229, 0.224, 0.225],
            },
            ModelKind::IsnetGeneralUse => PreprocessingConfig {
                target_size: [1024, 1024],
                normalization_mean: [0.5, 0.5, 0.5],
                normalization_std: [1.0, 1.0, 1.0],
            },
        }
    }
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::U2Net
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Preprocessing configuration for a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Square input size expected by the model (width, height)
    pub target_size: [u32; 2],
    /// Per-channel normalization mean (RGB, 0-1 range)
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization standard deviation (RGB)
    pub normalization_std: [f32; 3],
}

/// Model information and metadata
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
    pub input_shape: (usize, usize, usize, usize), // NCHW format
    pub output_shape: (usize, usize, usize, usize),
}

/// Optional sidecar overrides, deserialized from `<model>.json`
#[derive(Debug, Default, Deserialize)]
struct SidecarConfig {
    target_size: Option<[u32; 2]>,
    normalization_mean: Option<[f32; 3]>,
    normalization_std: Option<[f32; 3]>,
}

/// A model resolved inside a runtime environment
#[derive(Debug, Clone)]
pub struct ModelAsset {
    /// Which model family this asset belongs to
    pub kind: ModelKind,
    /// Path to the ONNX file
    pub path: PathBuf,
    /// Effective preprocessing configuration (defaults plus sidecar overrides)
    pub preprocessing: PreprocessingConfig,
}

impl ModelAsset {
    /// Resolve a model inside a models directory
    ///
    /// # Errors
    /// - Model file does not exist
    /// - Sidecar JSON is present but malformed
    pub fn resolve<P: AsRef<Path>>(models_dir: P, kind: ModelKind) -> Result<Self> {
        let path = models_dir.as_ref().join(kind.file_name());
        if !path.is_file() {
            return Err(RemovalError::model_not_found(kind.file_name(), &path));
        }

        let mut preprocessing = kind.preprocessing_defaults();
        let sidecar_path = path.with_extension("json");
        if sidecar_path.is_file() {
            let raw = fs::read_to_string(&sidecar_path)
                .map_err(|e| RemovalError::file_io_error("read model sidecar", &sidecar_path, e))?;
            let sidecar: SidecarConfig = serde_json::from_str(&raw).map_err(|e| {
                RemovalError::model(format!(
                    "Invalid sidecar config '{}': {}",
                    sidecar_path.display(),
                    e
                ))
            })?;
            if let Some(size) = sidecar.target_size {
                preprocessing.target_size = size;
            }
            if let Some(mean) = sidecar.normalization_mean {
                preprocessing.normalization_mean = mean;
            }
            if let Some(std) = sidecar.normalization_std {
                preprocessing.normalization_std = std;
            }
            log::debug!(
                "Applied sidecar overrides from {} for model {}",
                sidecar_path.display(),
                kind
            );
        }

        Ok(Self {
            kind,
            path,
            preprocessing,
        })
    }

    /// Load the raw ONNX model bytes
    ///
    /// # Errors
    /// - File I/O errors when reading the model file
    pub fn load_bytes(&self) -> Result<Vec<u8>> {
        fs::read(&self.path)
            .map_err(|e| RemovalError::file_io_error("read model file", &self.path, e))
    }

    /// Model metadata for diagnostics
    ///
    /// # Errors
    /// - File metadata unavailable
    pub fn info(&self) -> Result<ModelInfo> {
        let size_bytes = fs::metadata(&self.path)
            .map_err(|e| RemovalError::file_io_error("stat model file", &self.path, e))?
            .len();
        let side = self.preprocessing.target_size[0] as usize;
        Ok(ModelInfo {
            name: self.kind.name().to_string(),
            size_bytes,
            input_shape: (1, 3, side, side),
            output_shape: (1, 1, side, side),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_menu_keys_cover_all_models() {
        for kind in ModelKind::all() {
            let key = kind.menu_key().to_string();
            assert_eq!(ModelKind::from_menu_key(&key), Some(kind));
        }
        assert_eq!(ModelKind::from_menu_key("9"), None);
        assert_eq!(ModelKind::from_menu_key(""), None);
        assert_eq!(ModelKind::from_menu_key(" 3 "), Some(ModelKind::U2NetHumanSeg));
    }

    #[test]
    fn test_default_model() {
        assert_eq!(ModelKind::default(), ModelKind::U2Net);
        assert_eq!(ModelKind::default().menu_key(), '1');
    }

    #[test]
    fn test_preprocessing_defaults() {
        let u2net = ModelKind::U2Net.preprocessing_defaults();
        assert_eq!(u2net.target_size, [320, 320]);

        let isnet = ModelKind::IsnetGeneralUse.preprocessing_defaults();
        assert_eq!(isnet.target_size, [1024, 1024]);
        assert_eq!(isnet.normalization_std, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_resolve_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelAsset::resolve(dir.path(), ModelKind::U2Net).unwrap_err();
        assert!(matches!(err, RemovalError::Model(_)));
        assert!(err.to_string().contains("u2net.onnx"));
    }

    #[test]
    fn test_resolve_with_sidecar_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("u2net.onnx"), b"not a real model").unwrap();

        let mut sidecar = std::fs::File::create(dir.path().join("u2net.json")).unwrap();
        sidecar
            .write_all(br#"{"target_size": [160, 160]}"#)
            .unwrap();

        let asset = ModelAsset::resolve(dir.path(), ModelKind::U2Net).unwrap();
        assert_eq!(asset.preprocessing.target_size, [160, 160]);
        // Untouched fields keep their defaults
        assert_eq!(asset.preprocessing.normalization_mean, [0.485, 0.456, 0.406]);

        let info = asset.info().unwrap();
        assert_eq!(info.name, "u2net");
        assert_eq!(info.input_shape, (1, 3, 160, 160));
        assert!(info.size_bytes > 0);
    }

    #[test]
    fn test_resolve_with_malformed_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("u2netp.onnx"), b"model").unwrap();
        std::fs::write(dir.path().join("u2netp.json"), b"{ not json").unwrap();

        let err = ModelAsset::resolve(dir.path(), ModelKind::U2NetP).unwrap_err();
        assert!(err.to_string().contains("sidecar"));
    }
}
