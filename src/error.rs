use alloc::string::String;
use enough::StopReason;

use crate::pixel::PixelFormatId;

/// Coarse error classes shared by every bitmap operation.
///
/// Callers that only care about the failure class (rather than the exact
/// variant) can match on [`BitmapError::kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed rect, insufficient stride or buffer, bad parameter.
    InvalidArgument,
    /// No conversion path, unregistered pixel format, no matching decoder.
    ComponentNotFound,
    /// Capability the source doesn't have (e.g. palette on a non-indexed source).
    NotImplemented,
    /// Internal, backend, or state failure.
    GenericFailure,
    /// Raw stream failure, passed through untouched.
    Io,
}

/// Errors from bitmap sources, conversion, and encode/decode.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BitmapError {
    #[error("rect {x},{y} {width}x{height} exceeds bitmap bounds {bounds_width}x{bounds_height}")]
    InvalidRect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bounds_width: u32,
        bounds_height: u32,
    },

    #[error("stride too small: need {needed} bytes per row, got {actual}")]
    StrideTooSmall { needed: usize, actual: usize },

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no conversion from {from:?} to {to:?}")]
    ComponentNotFound { from: PixelFormatId, to: PixelFormatId },

    #[error("{0:?} is not a registered pixel format")]
    UnknownPixelFormat(PixelFormatId),

    #[error("unrecognized container magic bytes")]
    UnrecognizedFormat,

    #[error("source has no palette")]
    PaletteUnavailable,

    #[error("wrong state: {0}")]
    WrongState(&'static str),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("unsupported format variant: {0}")]
    UnsupportedVariant(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("operation cancelled")]
    Cancelled(StopReason),

    #[cfg(feature = "std")]
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BitmapError {
    /// The taxonomy class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRect { .. }
            | Self::StrideTooSmall { .. }
            | Self::BufferTooSmall { .. }
            | Self::InvalidParameter(_) => ErrorKind::InvalidArgument,
            Self::ComponentNotFound { .. }
            | Self::UnknownPixelFormat(_)
            | Self::UnrecognizedFormat => ErrorKind::ComponentNotFound,
            Self::PaletteUnavailable => ErrorKind::NotImplemented,
            Self::WrongState(_)
            | Self::UnsupportedOperation(_)
            | Self::UnsupportedVariant(_)
            | Self::InvalidHeader(_)
            | Self::UnexpectedEof
            | Self::DimensionsTooLarge { .. }
            | Self::LimitExceeded(_)
            | Self::Cancelled(_) => ErrorKind::GenericFailure,
            #[cfg(feature = "std")]
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<StopReason> for BitmapError {
    fn from(r: StopReason) -> Self {
        BitmapError::Cancelled(r)
    }
}
