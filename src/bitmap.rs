//! In-memory bitmap source.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::BitmapError;
use crate::palette::Palette;
use crate::pixel::{PixelFormatId, PixelFormatInfo};
use crate::source::{BitmapSource, Rect, copy_from_packed, validate_copy};

/// Resolution reported when none was set.
pub const DEFAULT_DPI: f64 = 96.0;

/// A bitmap whose pixels live in an owned buffer.
///
/// Rows are stored top-down, `stride` bytes apart.
#[derive(Clone, Debug)]
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormatId,
    stride: usize,
    pixels: Vec<u8>,
    dpi: (f64, f64),
    palette: Option<Palette>,
}

impl Bitmap {
    /// A zero-filled bitmap with tightly packed rows.
    pub fn new(width: u32, height: u32, format: PixelFormatId) -> Result<Self, BitmapError> {
        let info = checked_info(width, height, format)?;
        let stride = info
            .row_bytes(width)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        Ok(Self {
            width,
            height,
            format,
            stride,
            pixels: vec![0; len],
            dpi: (DEFAULT_DPI, DEFAULT_DPI),
            palette: None,
        })
    }

    /// Wrap existing pixel rows, `stride` bytes apart.
    ///
    /// The last row only needs its meaningful bytes; trailing padding after
    /// it may be omitted.
    pub fn from_pixels(
        width: u32,
        height: u32,
        format: PixelFormatId,
        stride: usize,
        pixels: Vec<u8>,
    ) -> Result<Self, BitmapError> {
        let info = checked_info(width, height, format)?;
        let row_bytes = info
            .row_bytes(width)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        if stride < row_bytes {
            return Err(BitmapError::StrideTooSmall {
                needed: row_bytes,
                actual: stride,
            });
        }
        let needed = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        if pixels.len() < needed {
            return Err(BitmapError::BufferTooSmall {
                needed,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            stride,
            pixels,
            dpi: (DEFAULT_DPI, DEFAULT_DPI),
            palette: None,
        })
    }

    /// Snapshot another source: pixels, resolution, and palette if it has one.
    pub fn from_source(source: &dyn BitmapSource) -> Result<Self, BitmapError> {
        let (width, height) = source.size();
        let format = source.pixel_format();
        let info = checked_info(width, height, format)?;
        let stride = info
            .row_bytes(width)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        let mut pixels = vec![0u8; len];
        source.copy_pixels(None, stride, &mut pixels)?;

        let mut palette = Palette::default();
        let palette = match source.copy_palette(&mut palette) {
            Ok(()) => Some(palette),
            Err(BitmapError::PaletteUnavailable) => None,
            Err(e) => return Err(e),
        };

        Ok(Self {
            width,
            height,
            format,
            stride,
            pixels,
            dpi: source.resolution(),
            palette,
        })
    }

    pub fn with_resolution(mut self, dpi_x: f64, dpi_y: f64) -> Self {
        self.dpi = (dpi_x, dpi_y);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn set_resolution(&mut self, dpi_x: f64, dpi_y: f64) {
        self.dpi = (dpi_x, dpi_y);
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = Some(palette);
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to the pixel rows.
    ///
    /// Once shared behind an [`Arc`], this is only reachable through
    /// `Arc::get_mut`, i.e. while the caller is the sole owner.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Move into a shared, reference-counted source.
    pub fn into_shared(self) -> Arc<dyn BitmapSource> {
        Arc::new(self)
    }
}

fn checked_info(
    width: u32,
    height: u32,
    format: PixelFormatId,
) -> Result<&'static PixelFormatInfo, BitmapError> {
    if width == 0 || height == 0 {
        return Err(BitmapError::InvalidParameter(alloc::format!(
            "bitmap dimensions must be non-zero, got {width}x{height}"
        )));
    }
    format.info().ok_or(BitmapError::UnknownPixelFormat(format))
}

impl BitmapSource for Bitmap {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> PixelFormatId {
        self.format
    }

    fn resolution(&self) -> (f64, f64) {
        self.dpi
    }

    fn copy_palette(&self, palette: &mut Palette) -> Result<(), BitmapError> {
        match &self.palette {
            Some(own) => {
                palette.copy_from(own);
                Ok(())
            }
            None => Err(BitmapError::PaletteUnavailable),
        }
    }

    fn copy_pixels(
        &self,
        rect: Option<Rect>,
        stride: usize,
        buffer: &mut [u8],
    ) -> Result<(), BitmapError> {
        let info = checked_info(self.width, self.height, self.format)?;
        let plan = validate_copy(self.size(), info, rect, stride, buffer.len())?;
        copy_from_packed(&self.pixels, self.stride, &plan, stride, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::palette::PaletteType;
    use crate::source::copy_pixels_to_vec;

    #[test]
    fn rejects_zero_size_and_unknown_format() {
        assert!(matches!(
            Bitmap::new(0, 1, PixelFormatId::GRAY8),
            Err(BitmapError::InvalidParameter(_))
        ));
        let bogus = PixelFormatId::from_u128(7);
        assert_eq!(
            Bitmap::new(1, 1, bogus).unwrap_err().kind(),
            ErrorKind::ComponentNotFound
        );
    }

    #[test]
    fn from_pixels_checks_stride_and_length() {
        let err = Bitmap::from_pixels(2, 2, PixelFormatId::BGR24, 5, vec![0; 12]).unwrap_err();
        assert!(matches!(err, BitmapError::StrideTooSmall { needed: 6, actual: 5 }));
        // Last row may omit its padding: 8 + 6 bytes.
        assert!(Bitmap::from_pixels(2, 2, PixelFormatId::BGR24, 8, vec![0; 14]).is_ok());
        let err = Bitmap::from_pixels(2, 2, PixelFormatId::BGR24, 8, vec![0; 13]).unwrap_err();
        assert!(matches!(err, BitmapError::BufferTooSmall { needed: 14, actual: 13 }));
    }

    #[test]
    fn padded_stride_copies_out_packed() {
        let pixels = vec![1, 2, 3, 9, 4, 5, 6, 9];
        let bmp = Bitmap::from_pixels(1, 2, PixelFormatId::RGB24, 4, pixels).unwrap();
        assert_eq!(copy_pixels_to_vec(&bmp, None).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            copy_pixels_to_vec(&bmp, Some(Rect::new(0, 1, 1, 1))).unwrap(),
            vec![4, 5, 6]
        );
    }

    #[test]
    fn palette_only_when_attached() {
        let bmp = Bitmap::new(2, 2, PixelFormatId::INDEXED8).unwrap();
        let mut pal = Palette::default();
        let err = bmp.copy_palette(&mut pal).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);

        let bmp = bmp.with_palette(Palette::predefined(PaletteType::FixedGray4));
        bmp.copy_palette(&mut pal).unwrap();
        assert_eq!(pal.len(), 4);
    }

    #[test]
    fn snapshot_keeps_resolution_and_palette() {
        let src = Bitmap::from_pixels(4, 1, PixelFormatId::INDEXED2, 1, vec![0b0001_1011])
            .unwrap()
            .with_resolution(300.0, 150.0)
            .with_palette(Palette::predefined(PaletteType::FixedGray4));
        let copy = Bitmap::from_source(&src).unwrap();
        assert_eq!(copy.resolution(), (300.0, 150.0));
        assert_eq!(copy.pixels(), &[0b0001_1011]);
        let mut pal = Palette::default();
        copy.copy_palette(&mut pal).unwrap();
        assert_eq!(pal.kind(), PaletteType::FixedGray4);
    }

    #[test]
    fn sole_owner_can_mutate() {
        let mut shared = Arc::new(Bitmap::new(1, 1, PixelFormatId::GRAY8).unwrap());
        Arc::get_mut(&mut shared).unwrap().pixels_mut()[0] = 42;
        let other = Arc::clone(&shared);
        assert!(Arc::get_mut(&mut shared).is_none());
        assert_eq!(other.pixels(), &[42]);
    }
}
