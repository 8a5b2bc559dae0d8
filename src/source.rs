//! The [`BitmapSource`] capability and the copy rules every source shares.
//!
//! A copy writes `rect.height` rows top-down into the caller's buffer. Each
//! row holds exactly `ceil(bpp * rect.width / 8)` meaningful bytes, then
//! `stride - row_bytes` bytes of padding that are never written.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::BitmapError;
use crate::palette::Palette;
use crate::pixel::{PixelFormatId, PixelFormatInfo};

/// A rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rect covering a whole `width` x `height` bitmap.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the rect lies entirely inside a `width` x `height` bitmap.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

/// Anything that can report its geometry and format and hand out pixel rows.
///
/// Implementations are shared through [`Arc`]: a converter wraps a source,
/// an encoder frame reads it, and the caller still holds it. A single
/// instance is not required to support concurrent `copy_pixels` calls
/// beyond what `&self` already guarantees.
pub trait BitmapSource: Send + Sync {
    /// `(width, height)` in pixels.
    fn size(&self) -> (u32, u32);

    fn pixel_format(&self) -> PixelFormatId;

    /// `(dpi_x, dpi_y)`.
    fn resolution(&self) -> (f64, f64);

    /// Copy this source's colour table into `palette`.
    ///
    /// Fails with [`BitmapError::PaletteUnavailable`] when there is none.
    fn copy_palette(&self, palette: &mut Palette) -> Result<(), BitmapError>;

    /// Copy the pixels in `rect` (the whole bitmap when `None`) into `buffer`.
    ///
    /// Validation happens in this order: rect bounds, then `stride` against
    /// the minimal row size, then `buffer.len()` against
    /// `stride * rect.height`. All three fail with an invalid-argument class
    /// error. On any failure the buffer contents are unspecified.
    fn copy_pixels(
        &self,
        rect: Option<Rect>,
        stride: usize,
        buffer: &mut [u8],
    ) -> Result<(), BitmapError>;
}

impl<T: BitmapSource + ?Sized> BitmapSource for Arc<T> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn pixel_format(&self) -> PixelFormatId {
        (**self).pixel_format()
    }

    fn resolution(&self) -> (f64, f64) {
        (**self).resolution()
    }

    fn copy_palette(&self, palette: &mut Palette) -> Result<(), BitmapError> {
        (**self).copy_palette(palette)
    }

    fn copy_pixels(
        &self,
        rect: Option<Rect>,
        stride: usize,
        buffer: &mut [u8],
    ) -> Result<(), BitmapError> {
        (**self).copy_pixels(rect, stride, buffer)
    }
}

/// A validated copy request.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CopyPlan {
    pub rect: Rect,
    pub row_bytes: usize,
    pub bits_per_pixel: usize,
}

/// Apply the shared copy validation for a `size` bitmap in `format`.
pub(crate) fn validate_copy(
    size: (u32, u32),
    format: &PixelFormatInfo,
    rect: Option<Rect>,
    stride: usize,
    buffer_len: usize,
) -> Result<CopyPlan, BitmapError> {
    let (width, height) = size;
    let rect = rect.unwrap_or(Rect::full(width, height));
    if !rect.fits_within(width, height) {
        return Err(BitmapError::InvalidRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            bounds_width: width,
            bounds_height: height,
        });
    }

    let row_bytes = format
        .row_bytes(rect.width)
        .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
    if stride < row_bytes {
        return Err(BitmapError::StrideTooSmall {
            needed: row_bytes,
            actual: stride,
        });
    }

    let needed = stride
        .checked_mul(rect.height as usize)
        .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
    if buffer_len < needed {
        return Err(BitmapError::BufferTooSmall {
            needed,
            actual: buffer_len,
        });
    }

    Ok(CopyPlan {
        rect,
        row_bytes,
        bits_per_pixel: format.bits_per_pixel as usize,
    })
}

/// Copy a validated rect out of a packed, top-down pixel store.
///
/// Horizontal offsets that land mid-byte (sub-byte formats) are handled by
/// shifting bits; bits past the rect in the last row byte are zeroed.
pub(crate) fn copy_from_packed(
    data: &[u8],
    src_stride: usize,
    plan: &CopyPlan,
    stride: usize,
    buffer: &mut [u8],
) -> Result<(), BitmapError> {
    let bit_offset = plan.rect.x as usize * plan.bits_per_pixel;
    let bit_len = plan.rect.width as usize * plan.bits_per_pixel;
    let row_bytes = plan.row_bytes;
    if row_bytes == 0 {
        return Ok(());
    }

    for row in 0..plan.rect.height as usize {
        let start = (plan.rect.y as usize + row) * src_stride;
        let src_row = data.get(start..).ok_or(BitmapError::UnexpectedEof)?;
        let dst = &mut buffer[row * stride..row * stride + row_bytes];

        if bit_offset % 8 == 0 {
            let first = bit_offset / 8;
            let src = src_row
                .get(first..first + row_bytes)
                .ok_or(BitmapError::UnexpectedEof)?;
            dst.copy_from_slice(src);
        } else {
            shift_bits(src_row, bit_offset, dst);
        }

        let tail = bit_len % 8;
        if tail != 0 {
            dst[row_bytes - 1] &= 0xffu8 << (8 - tail);
        }
    }
    Ok(())
}

fn shift_bits(src: &[u8], bit_offset: usize, dst: &mut [u8]) {
    let first = bit_offset / 8;
    let shift = (bit_offset % 8) as u32;
    for (i, out) in dst.iter_mut().enumerate() {
        let hi = src.get(first + i).copied().unwrap_or(0);
        let lo = src.get(first + i + 1).copied().unwrap_or(0);
        *out = (hi << shift) | (lo >> (8 - shift));
    }
}

/// Copy `rect` (or the whole source) into a new, tightly packed buffer.
///
/// Rows are `ceil(bpp * width / 8)` bytes apart.
pub fn copy_pixels_to_vec(
    source: &dyn BitmapSource,
    rect: Option<Rect>,
) -> Result<Vec<u8>, BitmapError> {
    let format = source.pixel_format();
    let info = format
        .info()
        .ok_or(BitmapError::UnknownPixelFormat(format))?;
    let (width, height) = source.size();
    let rect = rect.unwrap_or(Rect::full(width, height));
    let stride = info
        .row_bytes(rect.width)
        .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
    let len = stride
        .checked_mul(rect.height as usize)
        .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
    let mut out = vec![0u8; len];
    source.copy_pixels(Some(rect), stride, &mut out)?;
    Ok(out)
}
