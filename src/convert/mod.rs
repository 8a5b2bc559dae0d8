//! Pixel format conversion.
//!
//! [`can_convert`] answers whether a direct path exists. [`FormatConverter`]
//! binds a source to a destination format and converts lazily, row by row,
//! whenever pixels are copied out. [`convert_bitmap_source`] picks between
//! handing the source back unchanged and building a converter.

mod transform;

use alloc::sync::Arc;
use alloc::vec;

use crate::error::BitmapError;
use crate::palette::{Palette, PaletteType};
use crate::pixel::PixelFormatId;
use crate::source::{BitmapSource, Rect, validate_copy};

use transform::{RowTransform, find_path};

/// Whether a direct conversion from `src` to `dst` exists.
///
/// Always true for `src == dst` when the format is registered; always false
/// when either identifier is not a registered pixel format.
pub fn can_convert(src: PixelFormatId, dst: PixelFormatId) -> bool {
    find_path(src, dst).is_some()
}

/// Every `(src, dst)` pair with a direct, non-identity path.
pub fn conversion_paths() -> impl Iterator<Item = (PixelFormatId, PixelFormatId)> {
    transform::direct_paths()
}

/// Dithering applied when a conversion reduces colour depth.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DitherType {
    #[default]
    None,
    Ordered4x4,
    Ordered8x8,
    Ordered16x16,
    ErrorDiffusion,
}

/// Options for [`FormatConverter::initialize`].
///
/// Dither and palette settings only matter for conversions that produce
/// indexed pixels; for everything else the defaults give exact results.
#[derive(Clone, Debug, Default)]
pub struct ConverterOptions {
    pub dither: DitherType,
    pub palette: Option<Palette>,
    /// Alpha below this percentage counts as transparent (0.0..=100.0).
    pub alpha_threshold_percent: f64,
    pub palette_type: PaletteType,
}

impl ConverterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dither(mut self, dither: DitherType) -> Self {
        self.dither = dither;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_alpha_threshold(mut self, percent: f64) -> Self {
        self.alpha_threshold_percent = percent;
        self
    }

    pub fn with_palette_type(mut self, palette_type: PaletteType) -> Self {
        self.palette_type = palette_type;
        self
    }

    fn validate(&self) -> Result<(), BitmapError> {
        if !(0.0..=100.0).contains(&self.alpha_threshold_percent) {
            return Err(BitmapError::InvalidParameter(alloc::format!(
                "alpha threshold {} is outside 0..=100",
                self.alpha_threshold_percent
            )));
        }
        Ok(())
    }
}

/// A [`BitmapSource`] presenting another source's pixels in a different
/// pixel format.
///
/// Conversion happens at copy time: the requested region is pulled from the
/// wrapped source in its own format, then transformed row by row.
pub struct FormatConverter {
    source: Arc<dyn BitmapSource>,
    src_format: PixelFormatId,
    dst_format: PixelFormatId,
    transform: RowTransform,
    palette: Palette,
    options: ConverterOptions,
}

impl FormatConverter {
    /// Same as the free [`can_convert`].
    pub fn can_convert(src: PixelFormatId, dst: PixelFormatId) -> bool {
        can_convert(src, dst)
    }

    /// Bind `source` to `dst_format`.
    ///
    /// Fails with [`BitmapError::ComponentNotFound`] when `dst_format` isn't a
    /// registered pixel format or no direct path exists, so unsupported
    /// pairs never surface at copy time. Palette expansion also needs the
    /// source's palette; a source without one fails here.
    pub fn initialize(
        source: Arc<dyn BitmapSource>,
        dst_format: PixelFormatId,
        options: ConverterOptions,
    ) -> Result<Self, BitmapError> {
        options.validate()?;

        let src_format = source.pixel_format();
        let transform = find_path(src_format, dst_format).ok_or(
            BitmapError::ComponentNotFound {
                from: src_format,
                to: dst_format,
            },
        )?;

        let mut palette = Palette::default();
        if transform.needs_palette() {
            source.copy_palette(&mut palette)?;
        }

        log::debug!("format converter {src_format:?} -> {dst_format:?} via {transform:?}");

        Ok(Self {
            source,
            src_format,
            dst_format,
            transform,
            palette,
            options,
        })
    }

    /// The wrapped source.
    pub fn source(&self) -> &Arc<dyn BitmapSource> {
        &self.source
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }
}

impl BitmapSource for FormatConverter {
    fn size(&self) -> (u32, u32) {
        self.source.size()
    }

    fn pixel_format(&self) -> PixelFormatId {
        self.dst_format
    }

    fn resolution(&self) -> (f64, f64) {
        self.source.resolution()
    }

    fn copy_palette(&self, palette: &mut Palette) -> Result<(), BitmapError> {
        let indexed = self.dst_format.info().is_some_and(|i| i.is_indexed);
        if indexed && self.transform == RowTransform::Passthrough {
            return self.source.copy_palette(palette);
        }
        Err(BitmapError::PaletteUnavailable)
    }

    fn copy_pixels(
        &self,
        rect: Option<Rect>,
        stride: usize,
        buffer: &mut [u8],
    ) -> Result<(), BitmapError> {
        let dst_info = self
            .dst_format
            .info()
            .ok_or(BitmapError::UnknownPixelFormat(self.dst_format))?;
        let plan = validate_copy(self.size(), dst_info, rect, stride, buffer.len())?;

        if self.transform == RowTransform::Passthrough {
            return self.source.copy_pixels(Some(plan.rect), stride, buffer);
        }

        let src_info = self
            .src_format
            .info()
            .ok_or(BitmapError::UnknownPixelFormat(self.src_format))?;
        let (width, height) = self.size();
        let src_row = src_info
            .row_bytes(plan.rect.width)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        let scratch_len = src_row
            .checked_mul(plan.rect.height as usize)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        let mut scratch = vec![0u8; scratch_len];
        self.source
            .copy_pixels(Some(plan.rect), src_row, &mut scratch)?;

        let pixels = plan.rect.width as usize;
        for row in 0..plan.rect.height as usize {
            let src = &scratch[row * src_row..(row + 1) * src_row];
            let dst = &mut buffer[row * stride..row * stride + plan.row_bytes];
            self.transform.apply(src, dst, pixels, &self.palette);
        }
        Ok(())
    }
}

/// Present `source` in `dst_format`.
///
/// When the source already has that format the same `Arc` comes back, with
/// no new object. Otherwise a [`FormatConverter`] is built with default
/// options and any [`BitmapError::ComponentNotFound`] is returned as is.
pub fn convert_bitmap_source(
    dst_format: PixelFormatId,
    source: Arc<dyn BitmapSource>,
) -> Result<Arc<dyn BitmapSource>, BitmapError> {
    if source.pixel_format() == dst_format {
        return Ok(source);
    }
    let converter = FormatConverter::initialize(source, dst_format, ConverterOptions::default())?;
    Ok(Arc::new(converter))
}
