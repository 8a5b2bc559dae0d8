use alloc::sync::Arc;
use alloc::vec::Vec;
use std::io::Read;

use enough::{Stop, Unstoppable};

use super::{ContainerFormat, FrameData};
use crate::bitmap::Bitmap;
use crate::error::BitmapError;
use crate::limits::Limits;
use crate::palette::Palette;
use crate::pixel::PixelFormatId;
use crate::source::{BitmapSource, Rect};

/// When container metadata is read. Frames are always decoded eagerly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MetadataCacheOption {
    #[default]
    OnDemand,
    OnLoad,
}

/// A decode session over one container.
#[derive(Debug, Default)]
pub struct BitmapDecoder {
    limits: Option<Limits>,
    cache: MetadataCacheOption,
    format: Option<ContainerFormat>,
    frames: Vec<Arc<FrameDecode>>,
}

impl BitmapDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject containers whose frames exceed `limits`.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Read the whole stream and decode its frames.
    ///
    /// The container is detected from its magic bytes; unknown data is
    /// [`BitmapError::UnrecognizedFormat`]. Stream errors pass through as
    /// [`BitmapError::Io`].
    pub fn initialize<R: Read>(
        &mut self,
        stream: R,
        cache: MetadataCacheOption,
    ) -> Result<(), BitmapError> {
        self.initialize_with_stop(stream, cache, &Unstoppable)
    }

    pub fn initialize_with_stop<R: Read>(
        &mut self,
        mut stream: R,
        cache: MetadataCacheOption,
        stop: &dyn Stop,
    ) -> Result<(), BitmapError> {
        if self.format.is_some() {
            return Err(BitmapError::WrongState("decoder already initialized"));
        }
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        stop.check()?;

        let format = ContainerFormat::detect(&data).ok_or(BitmapError::UnrecognizedFormat)?;
        let frames = format.decode(&data, self.limits.as_ref(), stop)?;
        log::debug!("{format:?} decoder read {} bytes, {} frame(s)", data.len(), frames.len());

        self.frames = frames
            .into_iter()
            .map(|f| FrameDecode::from_frame_data(f).map(Arc::new))
            .collect::<Result<_, _>>()?;
        self.cache = cache;
        self.format = Some(format);
        Ok(())
    }

    pub fn container_format(&self) -> Option<ContainerFormat> {
        self.format
    }

    pub fn cache_option(&self) -> MetadataCacheOption {
        self.cache
    }

    pub fn frame_count(&self) -> Result<usize, BitmapError> {
        if self.format.is_none() {
            return Err(BitmapError::WrongState("decoder not initialized"));
        }
        Ok(self.frames.len())
    }

    /// Frame `index`, shared. Out-of-range indices are an invalid argument.
    pub fn get_frame(&self, index: usize) -> Result<Arc<FrameDecode>, BitmapError> {
        if self.format.is_none() {
            return Err(BitmapError::WrongState("decoder not initialized"));
        }
        self.frames.get(index).cloned().ok_or_else(|| {
            BitmapError::InvalidParameter(alloc::format!(
                "frame index {index} out of range ({} frames)",
                self.frames.len()
            ))
        })
    }
}

/// A decoded frame. Readable as a [`BitmapSource`] like any other image.
#[derive(Clone, Debug)]
pub struct FrameDecode {
    bitmap: Bitmap,
}

impl FrameDecode {
    fn from_frame_data(frame: FrameData) -> Result<Self, BitmapError> {
        let stride = frame.row_bytes()?;
        let mut bitmap = Bitmap::from_pixels(
            frame.width,
            frame.height,
            frame.format,
            stride,
            frame.pixels,
        )?
        .with_resolution(frame.dpi.0, frame.dpi.1);
        if let Some(palette) = frame.palette {
            bitmap.set_palette(palette);
        }
        Ok(Self { bitmap })
    }

    /// The decoded pixels as an owned bitmap.
    pub fn to_bitmap(&self) -> Bitmap {
        self.bitmap.clone()
    }
}

impl BitmapSource for FrameDecode {
    fn size(&self) -> (u32, u32) {
        self.bitmap.size()
    }

    fn pixel_format(&self) -> PixelFormatId {
        self.bitmap.pixel_format()
    }

    fn resolution(&self) -> (f64, f64) {
        self.bitmap.resolution()
    }

    fn copy_palette(&self, palette: &mut Palette) -> Result<(), BitmapError> {
        self.bitmap.copy_palette(palette)
    }

    fn copy_pixels(
        &self,
        rect: Option<Rect>,
        stride: usize,
        buffer: &mut [u8],
    ) -> Result<(), BitmapError> {
        self.bitmap.copy_pixels(rect, stride, buffer)
    }
}
