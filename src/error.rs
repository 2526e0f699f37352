use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sample must carry exactly 3 channels, got {channels}")]
    MalformedSample { channels: usize },

    #[error("sample channels must be finite, got ({l}, {a}, {b})")]
    NonFiniteSample { l: f32, a: f32, b: f32 },

    #[error("unknown distance metric: {0:?}")]
    UnknownMetric(String),

    #[error("configuration cannot change while a pass holds {clusters} clusters")]
    PassInProgress { clusters: usize },

    #[error("tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),

    #[error("palette size must be at least 1")]
    InvalidPaletteSize,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
