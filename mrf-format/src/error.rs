//! MRF codec error types

/// Errors produced while decoding, validating or encoding MRF data
#[derive(Debug, thiserror::Error)]
pub enum MrfError {
    /// First four bytes are not "Morf"
    #[error("Invalid MRF magic: expected \"Morf\", found {0:?}")]
    InvalidMagic([u8; 4]),

    /// Buffer ended before a field or chunk the header demands
    #[error("Unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: u64 },

    /// Texture path is not plain ASCII (or contains an embedded NUL)
    #[error("Invalid texture path encoding: {0}")]
    InvalidEncoding(String),

    /// Counts, indices or per-frame lengths disagree with each other
    #[error("Inconsistent geometry: {0}")]
    InconsistentGeometry(String),

    /// Offset table points outside the buffer, backwards, or off-alignment
    #[error("Invalid chunk layout: {0}")]
    InvalidLayout(String),

    /// Filesystem failure while reading or writing a model
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MrfError {
    pub(crate) fn geometry(msg: impl Into<String>) -> Self {
        MrfError::InconsistentGeometry(msg.into())
    }

    pub(crate) fn layout(msg: impl Into<String>) -> Self {
        MrfError::InvalidLayout(msg.into())
    }
}
