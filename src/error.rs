pub type InklapseResult<T> = Result<T, InklapseError>;

#[derive(thiserror::Error, Debug)]
pub enum InklapseError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("consistency error: {0}")]
    Consistency(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InklapseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }
}
