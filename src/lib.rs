#![forbid(unsafe_code)]

pub mod blend;
pub mod dataset;
pub mod encode_ffmpeg;
pub mod error;
pub mod model;
pub mod sequence;
pub mod store;

pub use blend::{MASK_OPACITY, blend, blend_pair};
pub use dataset::{DatasetProcessor, PartitionedBatch, partition_pairs};
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder, is_ffmpeg_on_path};
pub use error::{BlendboxError, BlendboxResult};
pub use model::{
    BatchReport, DatasetBatch, FrameGroup, GroupKey, PairRecord, ProcessRequest, ProcessedImage,
    ProcessedVideo,
};
pub use sequence::{SEQUENCE_FPS, reconstruct};
pub use store::{ArtifactStore, OUTPUT_SUBDIR, normalize_rel_path};
