use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use std::io::Write;

use enough::{Stop, Unstoppable};

use super::{ContainerFormat, FrameData};
use crate::bitmap::DEFAULT_DPI;
use crate::convert::convert_bitmap_source;
use crate::error::BitmapError;
use crate::palette::Palette;
use crate::pixel::PixelFormatId;
use crate::source::{BitmapSource, Rect};

/// How the encoder buffers data before commit. Accepted for API
/// compatibility; frames are always held in memory until [`BitmapEncoder::commit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EncoderCacheOption {
    InMemory,
    TempFile,
    #[default]
    NoCache,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EncoderState {
    Created,
    StreamBound,
    FrameOpen,
    Committed,
}

/// An encode session writing one container to a stream.
pub struct BitmapEncoder<W: Write> {
    format: ContainerFormat,
    stream: Option<W>,
    cache: EncoderCacheOption,
    state: EncoderState,
    frames: Vec<FrameData>,
}

impl<W: Write> BitmapEncoder<W> {
    pub fn new(format: ContainerFormat) -> Self {
        Self {
            format,
            stream: None,
            cache: EncoderCacheOption::default(),
            state: EncoderState::Created,
            frames: Vec::new(),
        }
    }

    pub fn container_format(&self) -> ContainerFormat {
        self.format
    }

    pub fn cache_option(&self) -> EncoderCacheOption {
        self.cache
    }

    /// Bind the output stream.
    pub fn initialize(&mut self, stream: W, cache: EncoderCacheOption) -> Result<(), BitmapError> {
        if self.state != EncoderState::Created {
            return Err(BitmapError::WrongState("encoder already initialized"));
        }
        self.stream = Some(stream);
        self.cache = cache;
        self.state = EncoderState::StreamBound;
        log::debug!("{:?} encoder bound to stream", self.format);
        Ok(())
    }

    /// Open the next frame. Only one frame may be open at a time.
    pub fn create_new_frame(&mut self) -> Result<FrameEncode<'_, W>, BitmapError> {
        match self.state {
            EncoderState::StreamBound => {}
            EncoderState::Created => return Err(BitmapError::WrongState("encoder not initialized")),
            EncoderState::FrameOpen => return Err(BitmapError::WrongState("a frame is still open")),
            EncoderState::Committed => return Err(BitmapError::WrongState("encoder already committed")),
        }
        if !self.format.supports_multiple_frames() && !self.frames.is_empty() {
            return Err(BitmapError::UnsupportedOperation(
                "container holds a single frame",
            ));
        }
        self.state = EncoderState::FrameOpen;
        log::debug!("{:?} encoder opened frame {}", self.format, self.frames.len());
        Ok(FrameEncode::new(self))
    }

    /// Serialize every committed frame and write the container to the stream.
    ///
    /// Stream errors are returned untouched as [`BitmapError::Io`].
    pub fn commit(&mut self) -> Result<(), BitmapError> {
        self.commit_with_stop(&Unstoppable)
    }

    pub fn commit_with_stop(&mut self, stop: &dyn Stop) -> Result<(), BitmapError> {
        match self.state {
            EncoderState::StreamBound => {}
            EncoderState::Created => return Err(BitmapError::WrongState("encoder not initialized")),
            EncoderState::FrameOpen => return Err(BitmapError::WrongState("a frame is still open")),
            EncoderState::Committed => return Err(BitmapError::WrongState("encoder already committed")),
        }
        let Some(frame) = self.frames.first() else {
            return Err(BitmapError::WrongState("no frames committed"));
        };
        let bytes = self.format.encode(frame, stop)?;
        let stream = self
            .stream
            .as_mut()
            .ok_or(BitmapError::WrongState("encoder not initialized"))?;
        stream.write_all(&bytes)?;
        stream.flush()?;
        self.state = EncoderState::Committed;
        log::debug!("{:?} encoder committed {} bytes", self.format, bytes.len());
        Ok(())
    }

    /// Give back the stream (after commit, it holds the container).
    pub fn into_inner(self) -> Option<W> {
        self.stream
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameState {
    Open,
    Initialized,
    Writing,
}

/// One frame being encoded. Borrowing the encoder keeps the container from
/// being committed while the frame is open.
///
/// Dropping a frame without a successful [`commit`](Self::commit) discards
/// it, and the encoder accepts a new frame.
pub struct FrameEncode<'a, W: Write> {
    encoder: &'a mut BitmapEncoder<W>,
    state: FrameState,
    size: Option<(u32, u32)>,
    format: Option<PixelFormatId>,
    dpi: Option<(f64, f64)>,
    palette: Option<Palette>,
    pixels: Vec<u8>,
    rows_written: u32,
}

impl<'a, W: Write> FrameEncode<'a, W> {
    fn new(encoder: &'a mut BitmapEncoder<W>) -> Self {
        Self {
            encoder,
            state: FrameState::Open,
            size: None,
            format: None,
            dpi: None,
            palette: None,
            pixels: Vec::new(),
            rows_written: 0,
        }
    }

    pub fn initialize(&mut self) -> Result<(), BitmapError> {
        if self.state != FrameState::Open {
            return Err(BitmapError::WrongState("frame already initialized"));
        }
        self.state = FrameState::Initialized;
        Ok(())
    }

    fn require_configurable(&self) -> Result<(), BitmapError> {
        match self.state {
            FrameState::Initialized => Ok(()),
            FrameState::Open => Err(BitmapError::WrongState("frame not initialized")),
            FrameState::Writing => Err(BitmapError::WrongState("frame already has pixels")),
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), BitmapError> {
        self.require_configurable()?;
        if width == 0 || height == 0 {
            return Err(BitmapError::InvalidParameter(alloc::format!(
                "frame size must be non-zero, got {width}x{height}"
            )));
        }
        self.size = Some((width, height));
        Ok(())
    }

    pub fn set_resolution(&mut self, dpi_x: f64, dpi_y: f64) -> Result<(), BitmapError> {
        self.require_configurable()?;
        let valid = |d: f64| d.is_finite() && d > 0.0;
        if !valid(dpi_x) || !valid(dpi_y) {
            return Err(BitmapError::InvalidParameter(alloc::format!(
                "resolution must be positive, got {dpi_x}x{dpi_y}"
            )));
        }
        self.dpi = Some((dpi_x, dpi_y));
        Ok(())
    }

    /// Ask for `requested`; returns the format the container will store.
    ///
    /// The backend may substitute. Always use the returned value (or
    /// [`pixel_format`](Self::pixel_format)) rather than `requested`.
    pub fn set_pixel_format(&mut self, requested: PixelFormatId) -> Result<PixelFormatId, BitmapError> {
        self.require_configurable()?;
        let actual = self.encoder.format.negotiate_pixel_format(requested);
        if actual != requested {
            log::warn!("{:?} frame stores {actual:?} instead of {requested:?}", self.encoder.format);
        }
        self.format = Some(actual);
        Ok(actual)
    }

    /// The negotiated pixel format, once set.
    pub fn pixel_format(&self) -> Option<PixelFormatId> {
        self.format
    }

    pub fn set_palette(&mut self, palette: &Palette) -> Result<(), BitmapError> {
        if self.state == FrameState::Open {
            return Err(BitmapError::WrongState("frame not initialized"));
        }
        self.palette = Some(palette.clone());
        Ok(())
    }

    fn geometry(&self) -> Result<((u32, u32), PixelFormatId, usize), BitmapError> {
        if self.state == FrameState::Open {
            return Err(BitmapError::WrongState("frame not initialized"));
        }
        let size = self
            .size
            .ok_or(BitmapError::WrongState("set_size must precede writing pixels"))?;
        let format = self
            .format
            .ok_or(BitmapError::WrongState("set_pixel_format must precede writing pixels"))?;
        let row_bytes = format
            .info()
            .ok_or(BitmapError::UnknownPixelFormat(format))?
            .row_bytes(size.0)
            .ok_or(BitmapError::DimensionsTooLarge {
                width: size.0,
                height: size.1,
            })?;
        Ok((size, format, row_bytes))
    }

    fn reserve_rows(&mut self, lines: u32, height: u32) -> Result<(), BitmapError> {
        if u64::from(self.rows_written) + u64::from(lines) > u64::from(height) {
            return Err(BitmapError::InvalidParameter(alloc::format!(
                "writing {lines} rows after {} would exceed frame height {height}",
                self.rows_written
            )));
        }
        Ok(())
    }

    /// Append `line_count` rows of raw pixels already in the negotiated format.
    pub fn write_pixels(
        &mut self,
        line_count: u32,
        stride: usize,
        buffer: &[u8],
    ) -> Result<(), BitmapError> {
        let ((_, height), _, row_bytes) = self.geometry()?;
        self.reserve_rows(line_count, height)?;
        if stride < row_bytes {
            return Err(BitmapError::StrideTooSmall {
                needed: row_bytes,
                actual: stride,
            });
        }
        let needed = stride
            .checked_mul(line_count as usize)
            .ok_or_else(|| {
                BitmapError::InvalidParameter(alloc::format!(
                    "{line_count} rows of stride {stride} overflow the address space"
                ))
            })?;
        if buffer.len() < needed {
            return Err(BitmapError::BufferTooSmall {
                needed,
                actual: buffer.len(),
            });
        }
        for row in buffer.chunks(stride).take(line_count as usize) {
            self.pixels.extend_from_slice(&row[..row_bytes]);
        }
        self.rows_written += line_count;
        self.state = FrameState::Writing;
        Ok(())
    }

    /// Pull `rect` (or the whole source) from `source`, converting to the
    /// negotiated format when they differ.
    ///
    /// Adopts the source's resolution when none was set, and for indexed
    /// frames its palette when none was set.
    pub fn write_source(
        &mut self,
        source: Arc<dyn BitmapSource>,
        rect: Option<Rect>,
    ) -> Result<(), BitmapError> {
        self.write_source_with_stop(source, rect, &Unstoppable)
    }

    pub fn write_source_with_stop(
        &mut self,
        source: Arc<dyn BitmapSource>,
        rect: Option<Rect>,
        stop: &dyn Stop,
    ) -> Result<(), BitmapError> {
        let ((width, height), format, row_bytes) = self.geometry()?;
        let (src_w, src_h) = source.size();
        let rect = rect.unwrap_or(Rect::full(src_w, src_h));
        if rect.width != width {
            return Err(BitmapError::InvalidParameter(alloc::format!(
                "source rect width {} does not match frame width {width}",
                rect.width
            )));
        }
        self.reserve_rows(rect.height, height)?;

        let dpi = self.dpi.unwrap_or_else(|| source.resolution());
        let indexed = format.info().is_some_and(|i| i.is_indexed);
        let mut adopted_palette = None;
        if indexed && self.palette.is_none() {
            let mut palette = Palette::default();
            match source.copy_palette(&mut palette) {
                Ok(()) => adopted_palette = Some(palette),
                Err(BitmapError::PaletteUnavailable) => {}
                Err(e) => return Err(e),
            }
        }

        let converted = convert_bitmap_source(format, source)?;

        // Pull 16 rows at a time so cancellation is checked between bands.
        // Nothing reaches the frame unless the whole rect converts.
        let total = row_bytes
            .checked_mul(rect.height as usize)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        let mut rows_out = vec![0u8; total];
        for (band, chunk) in rows_out.chunks_mut(row_bytes.saturating_mul(16)).enumerate() {
            stop.check()?;
            let rows = (chunk.len() / row_bytes) as u32;
            let band_rect = Rect::new(rect.x, rect.y + band as u32 * 16, rect.width, rows);
            converted.copy_pixels(Some(band_rect), row_bytes, chunk)?;
        }
        self.pixels.extend_from_slice(&rows_out);
        self.dpi = Some(dpi);
        if adopted_palette.is_some() {
            self.palette = adopted_palette;
        }
        self.rows_written += rect.height;
        self.state = FrameState::Writing;
        Ok(())
    }

    /// Finish the frame and hand it to the encoder.
    ///
    /// On failure the frame is discarded and the encoder is back to
    /// accepting a new frame.
    pub fn commit(mut self) -> Result<(), BitmapError> {
        let ((width, height), format, _) = self.geometry()?;
        if self.rows_written != height {
            return Err(BitmapError::WrongState("not all rows have been written"));
        }
        let indexed = format.info().is_some_and(|i| i.is_indexed);
        if indexed && self.palette.is_none() {
            return Err(BitmapError::WrongState("indexed frame has no palette"));
        }
        let frame = FrameData {
            width,
            height,
            format,
            dpi: self.dpi.unwrap_or((DEFAULT_DPI, DEFAULT_DPI)),
            palette: self.palette.take(),
            pixels: core::mem::take(&mut self.pixels),
        };
        log::debug!(
            "{:?} frame committed: {width}x{height} {format:?}",
            self.encoder.format
        );
        self.encoder.frames.push(frame);
        Ok(())
    }
}

impl<W: Write> Drop for FrameEncode<'_, W> {
    fn drop(&mut self) {
        if self.encoder.state == EncoderState::FrameOpen {
            self.encoder.state = EncoderState::StreamBound;
        }
    }
}
