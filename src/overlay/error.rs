use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("cannot write image back as '{0}'")]
    UnsupportedFormat(String),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

impl OverlayError {
    pub fn is_decode(&self) -> bool {
        matches!(self, OverlayError::Decode(_) | OverlayError::EmptyImage { .. })
    }
}
