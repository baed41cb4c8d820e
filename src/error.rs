pub type BlendboxResult<T> = Result<T, BlendboxError>;

#[derive(thiserror::Error, Debug)]
pub enum BlendboxError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("empty sequence: {0}")]
    EmptySequence(String),

    #[error("io error: {0}")]
    Io(String),

    /// The batch carried no pair records at all. The display string is part of
    /// the report payload and must not change.
    #[error("No data pairs found in dataset")]
    EmptyBatch,

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BlendboxError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn empty_sequence(msg: impl Into<String>) -> Self {
        Self::EmptySequence(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }
}
