use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{BlendboxError, BlendboxResult};

/// Subdirectory of the upload root that receives every output artifact.
pub const OUTPUT_SUBDIR: &str = "inferences";

/// Filesystem home for dataset inputs and produced artifacts.
///
/// Inputs are referenced relative to the upload root. Outputs land under
/// `<upload_root>/inferences/<user_id>/` with a fresh uuid token per file, so
/// repeated runs and identical input names can never collide. Construction
/// does no I/O; output directories are created idempotently at save time.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    upload_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Resolve a dataset-relative path against the upload root.
    ///
    /// The path is normalized first (see [`normalize_rel_path`]), so the result
    /// can never escape the root.
    pub fn resolve(&self, rel: &str) -> BlendboxResult<PathBuf> {
        let norm = normalize_rel_path(rel)?;
        Ok(self.upload_root.join(norm))
    }

    /// Read a dataset raster and decode it to RGB8.
    ///
    /// Every failure mode (missing file, unreadable bytes, unsupported format)
    /// comes back as [`BlendboxError::Decode`] naming the offending path, which
    /// callers treat as a per-item failure.
    pub fn read_image(&self, rel: &str) -> BlendboxResult<RgbImage> {
        let abs = self.resolve(rel)?;
        let bytes = std::fs::read(&abs)
            .map_err(|e| BlendboxError::decode(format!("could not load image '{rel}': {e}")))?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| BlendboxError::decode(format!("could not decode image '{rel}': {e}")))?;
        Ok(img.to_rgb8())
    }

    /// Persist a blended raster as PNG under the user's output directory.
    ///
    /// The stored name is `<uuid4>_<suggested_name>`. Returns the artifact path
    /// relative to the upload root.
    pub fn save_image(
        &self,
        image: &RgbImage,
        user_id: &str,
        suggested_name: &str,
    ) -> BlendboxResult<String> {
        validate_segment(suggested_name, "output file name")?;
        let dir = self.ensure_user_dir(user_id)?;
        let file_name = format!("{}_{}", uuid::Uuid::new_v4(), suggested_name);
        let abs = dir.join(&file_name);
        image
            .save_with_format(&abs, image::ImageFormat::Png)
            .map_err(|e| BlendboxError::io(format!("could not write '{}': {e}", abs.display())))?;
        Ok(format!("{OUTPUT_SUBDIR}/{user_id}/{file_name}"))
    }

    /// Reserve a collision-free output location for a reconstructed video.
    ///
    /// Returns the absolute encode target (named `<uuid4>_video_<video_id>.mp4`)
    /// and the matching root-relative artifact path. The user's output
    /// directory exists once this returns; the file itself is written by the
    /// encoder.
    pub fn video_output_path(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> BlendboxResult<(PathBuf, String)> {
        validate_segment(video_id, "video id")?;
        let dir = self.ensure_user_dir(user_id)?;
        let file_name = format!("{}_video_{}.mp4", uuid::Uuid::new_v4(), video_id);
        let abs = dir.join(&file_name);
        Ok((abs, format!("{OUTPUT_SUBDIR}/{user_id}/{file_name}")))
    }

    fn ensure_user_dir(&self, user_id: &str) -> BlendboxResult<PathBuf> {
        validate_segment(user_id, "user id")?;
        let dir = self.upload_root.join(OUTPUT_SUBDIR).join(user_id);
        std::fs::create_dir_all(&dir).map_err(|e| {
            BlendboxError::io(format!(
                "could not create output directory '{}': {e}",
                dir.display()
            ))
        })?;
        Ok(dir)
    }
}

/// Normalize and validate an upload-root-relative dataset path.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects
/// absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> BlendboxResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(BlendboxError::validation("dataset paths must be relative"));
    }
    if s.is_empty() {
        return Err(BlendboxError::validation("dataset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(BlendboxError::validation(
                "dataset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(BlendboxError::validation(
            "dataset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Values spliced into output paths must stay a single path segment.
fn validate_segment(value: &str, what: &str) -> BlendboxResult<()> {
    if value.is_empty() {
        return Err(BlendboxError::validation(format!("{what} must be non-empty")));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(BlendboxError::validation(format!(
            "{what} must be a single path segment, got '{value}'"
        )));
    }
    Ok(())
}
