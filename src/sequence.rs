use std::path::PathBuf;

use image::{RgbImage, imageops};

use crate::{
    blend::blend_pair,
    encode_ffmpeg::{EncodeConfig, FfmpegEncoder},
    error::{BlendboxError, BlendboxResult},
    model::FrameGroup,
    store::ArtifactStore,
};

/// Fixed playback rate for reconstructed sequences. Source frames were sampled
/// once per second, so one frame per second of output reproduces the original
/// timing.
pub const SEQUENCE_FPS: u32 = 1;

/// Rebuild one video from a frame group.
///
/// Frames are ordered by ascending frame index, blended against their masks,
/// staged as a numbered PNG sequence in a scratch directory, and encoded at
/// [`SEQUENCE_FPS`] into `<uuid4>_video_<uploadIndex>.mp4` under the user's
/// output directory. Returns the artifact path relative to the upload root.
///
/// Frames that fail to validate, decode, or blend are logged and skipped. The
/// sequence dimensions come from the first surviving frame (floored to even
/// for the encoder); later frames with other dimensions are resampled to
/// match. The whole group fails only when no frame survives
/// ([`BlendboxError::EmptySequence`]) or when encoding itself fails.
#[tracing::instrument(skip(store, group), fields(video = %group.key, frames = group.frames.len()))]
pub fn reconstruct(
    store: &ArtifactStore,
    group: &FrameGroup,
    user_id: &str,
) -> BlendboxResult<String> {
    let video_id = group.key.to_string();

    let mut ordered = group.clone();
    ordered.sort_frames();

    let scratch = tempfile::tempdir()
        .map_err(|e| BlendboxError::io(format!("could not create scratch directory: {e}")))?;

    let mut frame_paths = Vec::<PathBuf>::new();
    let mut target: Option<(u32, u32)> = None;

    for record in &ordered.frames {
        let blended = match record
            .paths()
            .and_then(|(image, mask)| blend_pair(store, image, mask))
        {
            Ok(img) => img,
            Err(err) => {
                tracing::warn!(error = %err, "skipping frame");
                continue;
            }
        };

        let dims = match target {
            Some(dims) => dims,
            None => {
                let dims = even_dimensions(blended.dimensions());
                if dims.0 == 0 || dims.1 == 0 {
                    tracing::warn!(
                        width = blended.width(),
                        height = blended.height(),
                        "skipping frame too small to encode"
                    );
                    continue;
                }
                target = Some(dims);
                dims
            }
        };

        let frame = conform_to(blended, dims);
        let path = scratch
            .path()
            .join(format!("frame_{:04}.png", frame_paths.len()));
        frame
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| {
                BlendboxError::io(format!(
                    "could not write scratch frame '{}': {e}",
                    path.display()
                ))
            })?;
        frame_paths.push(path);
    }

    let Some((width, height)) = target else {
        return Err(BlendboxError::empty_sequence(format!(
            "video group '{video_id}' produced no usable frames"
        )));
    };

    tracing::debug!(frames = frame_paths.len(), width, height, "encoding sequence");

    let (out_abs, out_rel) = store.video_output_path(user_id, &video_id)?;
    let cfg = EncodeConfig {
        width,
        height,
        fps: SEQUENCE_FPS,
        out_path: out_abs.clone(),
        overwrite: true,
    };

    if let Err(err) = encode_scratch_frames(cfg, &frame_paths) {
        // Do not leave a partially written container behind.
        let _ = std::fs::remove_file(&out_abs);
        return Err(err);
    }

    Ok(out_rel)
}

fn encode_scratch_frames(cfg: EncodeConfig, frame_paths: &[PathBuf]) -> BlendboxResult<()> {
    let mut encoder = FfmpegEncoder::new(cfg)?;
    for path in frame_paths {
        let frame = image::open(path)
            .map_err(|e| {
                BlendboxError::io(format!(
                    "could not reload scratch frame '{}': {e}",
                    path.display()
                ))
            })?
            .to_rgb8();
        encoder.encode_frame(&frame)?;
    }
    encoder.finish()
}

/// Resample `frame` to the sequence dimensions when it differs.
fn conform_to(frame: RgbImage, (width, height): (u32, u32)) -> RgbImage {
    if frame.dimensions() == (width, height) {
        frame
    } else {
        imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
    }
}

/// Largest even dimensions not exceeding the input; yuv420p needs even sizes.
fn even_dimensions((width, height): (u32, u32)) -> (u32, u32) {
    (width & !1, height & !1)
}
