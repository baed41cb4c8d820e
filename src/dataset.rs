use std::collections::HashMap;
use std::path::Path;

use crate::{
    blend::blend_pair,
    error::{BlendboxError, BlendboxResult},
    model::{
        BatchReport, DatasetBatch, FrameGroup, GroupKey, PairRecord, ProcessedImage,
        ProcessedVideo,
    },
    sequence::reconstruct,
    store::ArtifactStore,
};

/// What partitioning a batch yields: standalone records in submission order
/// and frame groups in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct PartitionedBatch {
    pub single_images: Vec<PairRecord>,
    pub video_groups: Vec<FrameGroup>,
}

/// Split records into standalone images and per-video frame groups.
///
/// A record carrying a `frameIndex` joins the group for its `uploadIndex`;
/// everything else is a standalone image. Groups keep first-seen order so
/// reports are reproducible. Frame records without a usable `uploadIndex`
/// cannot be grouped and are dropped here with a warning.
pub fn partition_pairs(pairs: &[PairRecord]) -> PartitionedBatch {
    let mut partitioned = PartitionedBatch::default();
    let mut group_slots = HashMap::<GroupKey, usize>::new();

    for record in pairs {
        if !record.is_frame() {
            partitioned.single_images.push(record.clone());
            continue;
        }

        let Some(key) = record.upload_index.clone() else {
            tracing::warn!(
                image = record.image_path.as_deref().unwrap_or("<missing>"),
                "dropping frame record without an uploadIndex"
            );
            continue;
        };

        match group_slots.get(&key) {
            Some(&slot) => partitioned.video_groups[slot].frames.push(record.clone()),
            None => {
                group_slots.insert(key.clone(), partitioned.video_groups.len());
                partitioned.video_groups.push(FrameGroup {
                    key,
                    frames: vec![record.clone()],
                });
            }
        }
    }

    partitioned
}

/// Runs whole dataset batches against one injected [`ArtifactStore`].
///
/// Items are processed sequentially; at most one decoded pair is held in
/// memory at a time.
#[derive(Clone, Debug)]
pub struct DatasetProcessor {
    store: ArtifactStore,
}

impl DatasetProcessor {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Process one batch for `user_id` and aggregate the report.
    ///
    /// Individual item failures are logged and excluded from the report; only
    /// a failure of the batch as a whole (such as an empty `pairs` list)
    /// produces a failed report.
    #[tracing::instrument(skip(self, batch), fields(pairs = batch.pairs.len()))]
    pub fn process_dataset(&self, user_id: &str, batch: &DatasetBatch) -> BatchReport {
        match self.run(user_id, batch) {
            Ok((images, videos)) => BatchReport::completed(images, videos),
            Err(err) => {
                tracing::error!(error = %err, "dataset processing failed");
                BatchReport::failed(err.to_string())
            }
        }
    }

    fn run(
        &self,
        user_id: &str,
        batch: &DatasetBatch,
    ) -> BlendboxResult<(Vec<ProcessedImage>, Vec<ProcessedVideo>)> {
        tracing::info!("starting dataset processing");

        if batch.pairs.is_empty() {
            return Err(BlendboxError::EmptyBatch);
        }

        let partitioned = partition_pairs(&batch.pairs);
        tracing::info!(
            singles = partitioned.single_images.len(),
            groups = partitioned.video_groups.len(),
            "partitioned batch"
        );

        let mut images = Vec::new();
        for record in &partitioned.single_images {
            match self.process_single_image(user_id, record) {
                Ok(result) => images.push(result),
                Err(err) => {
                    tracing::warn!(
                        image = record.image_path.as_deref().unwrap_or("<missing>"),
                        error = %err,
                        "skipping standalone image"
                    );
                }
            }
        }

        let mut videos = Vec::new();
        for group in &partitioned.video_groups {
            match reconstruct(&self.store, group, user_id) {
                Ok(output_path) => videos.push(ProcessedVideo {
                    original_video_id: group.key.to_string(),
                    output_path,
                }),
                Err(err) => {
                    tracing::warn!(video = %group.key, error = %err, "skipping video group");
                }
            }
        }

        tracing::info!(
            images = images.len(),
            videos = videos.len(),
            "dataset processing completed"
        );
        Ok((images, videos))
    }

    fn process_single_image(
        &self,
        user_id: &str,
        record: &PairRecord,
    ) -> BlendboxResult<ProcessedImage> {
        let (image_path, mask_path) = record.paths()?;
        let blended = blend_pair(&self.store, image_path, mask_path)?;
        let output_path = self
            .store
            .save_image(&blended, user_id, &suggested_name(image_path))?;
        Ok(ProcessedImage {
            original_path: image_path.to_string(),
            output_path,
        })
    }
}

/// Output filename suggestion for a standalone record: `processed_<stem>.png`.
fn suggested_name(image_path: &str) -> String {
    let stem = Path::new(image_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("processed_{stem}.png")
}
