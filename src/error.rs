use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Invalid pixel buffer for {width}x{height}: expected {expected} bytes, got {actual}")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(u32, u32),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object detector failed: {0}")]
    Detector(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No analysis record with id {0}")]
    RecordNotFound(Uuid),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, VisionError>;
