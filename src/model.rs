use std::fmt;

use crate::error::{BlendboxError, BlendboxResult};

/// One unit of work: an image and the mask to blend over it, both referenced
/// relative to the upload root. A record carrying `frameIndex` is one frame of
/// a video sequence keyed by `uploadIndex`; without it the record is a
/// standalone image.
///
/// All fields are optional on the wire so one malformed record never poisons
/// the batch; missing fields surface per record when the record is used.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_index: Option<GroupKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<i64>,
}

impl PairRecord {
    /// Image and mask paths, or `MalformedRecord` naming what is missing.
    pub fn paths(&self) -> BlendboxResult<(&str, &str)> {
        let image = self
            .image_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| BlendboxError::malformed("record is missing imagePath"))?;
        let mask = self
            .mask_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                BlendboxError::malformed(format!("record for '{image}' is missing maskPath"))
            })?;
        Ok((image, mask))
    }

    pub fn is_frame(&self) -> bool {
        self.frame_index.is_some()
    }
}

/// Grouping key for video frames, in either JSON form upstream datasets use
/// for `uploadIndex`: a numeric index or an opaque string id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Number(i64),
    Text(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(n) => write!(f, "{n}"),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

/// All frame records sharing one `uploadIndex`, in submission order until
/// [`FrameGroup::sort_frames`] orders them for reconstruction.
#[derive(Clone, Debug)]
pub struct FrameGroup {
    pub key: GroupKey,
    pub frames: Vec<PairRecord>,
}

impl FrameGroup {
    /// Stable sort by ascending frame index; ties keep submission order.
    /// A frame that lost its index sorts as frame 0.
    pub fn sort_frames(&mut self) {
        self.frames.sort_by_key(|r| r.frame_index.unwrap_or(0));
    }
}

/// The unit submitted per request. An empty `pairs` list is reportable, not a
/// deserialization failure.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct DatasetBatch {
    #[serde(default)]
    pub pairs: Vec<PairRecord>,
}

/// Request envelope: the user owning the produced artifacts plus the batch.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub user_id: String,
    pub data: DatasetBatch,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub original_path: String, // input image path as submitted
    pub output_path: String,   // artifact path relative to the upload root
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedVideo {
    pub original_video_id: String, // rendered uploadIndex of the group
    pub output_path: String,
}

/// Aggregated outcome of one dataset run.
///
/// `Failed` is reserved for total failure, such as an empty batch. Individual
/// item failures never flip a report to `Failed`; they only shrink the
/// `images` and `videos` lists.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum BatchReport {
    Failed { success: bool, error: String },
    Completed {
        success: bool,
        images: Vec<ProcessedImage>,
        videos: Vec<ProcessedVideo>,
    },
}

impl BatchReport {
    pub fn completed(images: Vec<ProcessedImage>, videos: Vec<ProcessedVideo>) -> Self {
        Self::Completed {
            success: true,
            images,
            videos,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Completed { success, .. } | Self::Failed { success, .. } => *success,
        }
    }
}
