//! Encoder/decoder sessions over byte streams.
//!
//! An encode session moves one way through
//! `new -> initialize -> create_new_frame -> (frame) initialize ->
//! set_size / set_pixel_format -> write_source -> (frame) commit -> commit`.
//! Out-of-order calls fail with [`BitmapError::WrongState`].
//!
//! Container byte layouts belong to the backend modules (currently
//! [`crate::bmp`]); this module only moves frames between streams and
//! [`BitmapSource`](crate::BitmapSource)s.

mod decode;
mod encode;

pub use decode::{BitmapDecoder, FrameDecode, MetadataCacheOption};
pub use encode::{BitmapEncoder, EncoderCacheOption, FrameEncode};

use alloc::vec::Vec;
use enough::Stop;

use crate::bmp;
use crate::error::BitmapError;
use crate::limits::Limits;
use crate::palette::Palette;
use crate::pixel::PixelFormatId;

/// Supported container formats.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// Windows bitmap. Lossless, one frame per file.
    Bmp,
}

impl ContainerFormat {
    /// Detect the container from its leading bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if bmp::is_bmp(data) {
            return Some(Self::Bmp);
        }
        None
    }

    /// Whether one container can hold more than one frame.
    pub fn supports_multiple_frames(self) -> bool {
        match self {
            Self::Bmp => false,
        }
    }

    /// The format the backend will actually store for a `requested` one.
    pub fn negotiate_pixel_format(self, requested: PixelFormatId) -> PixelFormatId {
        match self {
            Self::Bmp => bmp::negotiate_pixel_format(requested),
        }
    }

    pub(crate) fn encode(self, frame: &FrameData, stop: &dyn Stop) -> Result<Vec<u8>, BitmapError> {
        match self {
            Self::Bmp => bmp::encode(frame, stop),
        }
    }

    pub(crate) fn decode(
        self,
        data: &[u8],
        limits: Option<&Limits>,
        stop: &dyn Stop,
    ) -> Result<Vec<FrameData>, BitmapError> {
        match self {
            Self::Bmp => Ok(alloc::vec![bmp::decode(data, limits, stop)?]),
        }
    }
}

/// One frame's worth of pixels in packed, top-down rows
/// (`ceil(bpp * width / 8)` bytes apart).
#[derive(Clone, Debug)]
pub(crate) struct FrameData {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormatId,
    pub dpi: (f64, f64),
    pub palette: Option<Palette>,
    pub pixels: Vec<u8>,
}

impl FrameData {
    pub(crate) fn row_bytes(&self) -> Result<usize, BitmapError> {
        self.format
            .info()
            .ok_or(BitmapError::UnknownPixelFormat(self.format))?
            .row_bytes(self.width)
            .ok_or(BitmapError::DimensionsTooLarge {
                width: self.width,
                height: self.height,
            })
    }
}
