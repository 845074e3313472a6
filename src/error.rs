/// Result type used by the rendering engine.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Error kinds surfaced by the engine.
///
/// Placeholders that cannot be resolved are not errors; they stay verbatim in the
/// rendered text (see [`crate::template::unresolved_placeholders`]).
#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
    /// Display or source dimensions unusable for mapping a crop.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The shared source image could not be read or decoded.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// Delimited table input could not be parsed.
    #[error("table error: {0}")]
    Table(String),

    /// Rasterizing a single frame failed.
    #[error("render error: {0}")]
    Render(String),

    /// Encoding a frame into file bytes failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Writing a frame to the output sink failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// Invalid style, naming or output configuration.
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComposeError {
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn table(msg: impl Into<String>) -> Self {
        Self::Table(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
