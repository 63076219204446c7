use std::path::PathBuf;

/// Errors produced by the drawing core.
///
/// Host-facing callbacks never surface these; they log and leave the canvas
/// unchanged. The lower layers return them so callers can decide.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    /// A render target could not be created with the requested size.
    #[error("cannot create {width}x{height} render target: {reason}")]
    RenderTarget {
        width: u32,
        height: u32,
        reason: String,
    },
    /// A tool pass could not be executed.
    #[error("tool pass failed: {0}")]
    Pass(String),
    /// Reading pixels back from a texture failed.
    #[error("readback failed: {0}")]
    Readback(String),
    /// An image file could not be decoded.
    #[error("cannot load image {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unknown procedure `{0}`")]
    UnknownProcedure(String),
    #[error("draw source `{0}` not found")]
    SourceNotFound(String),
    #[error("no default draw source")]
    NoDefaultSource,
}

impl DrawError {
    pub(crate) fn render_target(width: u32, height: u32, reason: impl Into<String>) -> Self {
        DrawError::RenderTarget {
            width,
            height,
            reason: reason.into(),
        }
    }
}

pub type DrawResult<T> = Result<T, DrawError>;
