//! Image file input/output service
//!
//! Separates file I/O from the processing pipeline, keeping the batch runner
//! and processor testable against in-memory images.

use crate::error::{RemovalError, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// File extensions accepted by the batch scanner (lowercase)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Falls back to content-based format detection when the extension-based
    /// decode fails (mislabeled files are common in operator-curated folders).
    ///
    /// # Errors
    /// - File does not exist
    /// - Both extension-based and content-based decoding fail
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(RemovalError::file_io_error(
                "read image file",
                path_ref,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    RemovalError::file_io_error("read image data", path_ref, io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    RemovalError::processing_stage_error(
                        "image loading",
                        &format!(
                            "Failed to decode with both extension-based ({}) and content-based detection: {}",
                            e, content_err
                        ),
                        Some(&format!(
                            "path: {}, size: {} bytes",
                            path_ref.display(),
                            data.len()
                        )),
                    )
                })
            },
        }
    }

    /// Save an image as PNG, creating parent directories as needed
    ///
    /// # Errors
    /// - Directory creation or encoding failures
    pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RemovalError::file_io_error("create output directory", parent, e))?;
        }

        image
            .save_with_format(path_ref, image::ImageFormat::Png)
            .map_err(|e| {
                RemovalError::processing_stage_error(
                    "image save",
                    &format!("Failed to save as PNG: {}", e),
                    Some(&format!("path: {}", path_ref.display())),
                )
            })
    }

    /// Check if a file path has a supported image extension
    #[must_use]
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// List supported images directly inside a directory, sorted by name
    ///
    /// # Errors
    /// - Directory cannot be read
    pub fn list_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir_ref = dir.as_ref();
        let entries = std::fs::read_dir(dir_ref)
            .map_err(|e| RemovalError::file_io_error("read input directory", dir_ref, e))?;

        let mut images = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| RemovalError::file_io_error("read directory entry", dir_ref, e))?;
            let path = entry.path();
            if path.is_file() && Self::is_supported_format(&path) {
                images.push(path);
            }
        }

        images.sort();
        Ok(images)
    }

    /// Create a directory (and parents) if it does not exist yet
    ///
    /// # Errors
    /// - Directory creation failures
    pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
        let dir_ref = dir.as_ref();
        if !dir_ref.is_dir() {
            std::fs::create_dir_all(dir_ref)
                .map_err(|e| RemovalError::file_io_error("create directory", dir_ref, e))?;
        }
        Ok(())
    }

    /// Output file name for an input image: `<stem>_no_bg.png`
    #[must_use]
    pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map_or_else(|| "image".into(), |s| s.to_string_lossy().into_owned());
        output_dir.join(format!("{stem}_no_bg.png"))
    }
}
