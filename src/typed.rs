//! Typed pixel access through the `rgb` (and optionally `imgref`) crates.

use alloc::vec::Vec;

use rgb::alt::{BGR, BGRA};
use rgb::{AsPixels as _, ComponentBytes as _};
use rgb::{Gray, Rgb, Rgba};

use crate::bitmap::Bitmap;
use crate::error::BitmapError;
use crate::pixel::PixelFormatId;
use crate::source::{BitmapSource, Rect, copy_pixels_to_vec};

/// A typed pixel with a fixed registered pixel format.
pub trait TypedPixel: Copy + 'static {
    const FORMAT: PixelFormatId;
}

impl TypedPixel for Rgb<u8> {
    const FORMAT: PixelFormatId = PixelFormatId::RGB24;
}

impl TypedPixel for Rgba<u8> {
    const FORMAT: PixelFormatId = PixelFormatId::RGBA32;
}

impl TypedPixel for BGR<u8> {
    const FORMAT: PixelFormatId = PixelFormatId::BGR24;
}

impl TypedPixel for BGRA<u8> {
    const FORMAT: PixelFormatId = PixelFormatId::BGRA32;
}

impl TypedPixel for Gray<u8> {
    const FORMAT: PixelFormatId = PixelFormatId::GRAY8;
}

impl Bitmap {
    /// Build a bitmap from a contiguous slice of typed pixels.
    pub fn from_typed<P: TypedPixel>(
        pixels: &[P],
        width: u32,
        height: u32,
    ) -> Result<Self, BitmapError>
    where
        [P]: rgb::ComponentBytes<u8>,
    {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or(BitmapError::DimensionsTooLarge { width, height })?;
        if pixels.len() != expected {
            return Err(BitmapError::InvalidParameter(alloc::format!(
                "{} pixels supplied for a {width}x{height} bitmap",
                pixels.len()
            )));
        }
        let bytes = pixels.as_bytes();
        let stride = bytes.len() / (height.max(1) as usize);
        Bitmap::from_pixels(width, height, P::FORMAT, stride, bytes.to_vec())
    }

    /// Build a bitmap from an [`imgref::ImgRef`], honoring its stride.
    #[cfg(feature = "imgref")]
    pub fn from_imgref<P: TypedPixel>(img: imgref::ImgRef<'_, P>) -> Result<Self, BitmapError>
    where
        [P]: rgb::ComponentBytes<u8>,
    {
        let (buf, width, height) = img.to_contiguous_buf();
        let too_large = || BitmapError::InvalidParameter(alloc::format!(
            "image of {width}x{height} does not fit 32-bit dimensions"
        ));
        let w = u32::try_from(width).map_err(|_| too_large())?;
        let h = u32::try_from(height).map_err(|_| too_large())?;
        Self::from_typed(&buf, w, h)
    }
}

/// Copy `rect` (or everything) out of `source` as typed pixels.
///
/// The source must already be in `P`'s format; wrap it with
/// [`crate::convert_bitmap_source`] first otherwise.
pub fn copy_typed<P: TypedPixel>(
    source: &dyn BitmapSource,
    rect: Option<Rect>,
) -> Result<Vec<P>, BitmapError>
where
    [u8]: rgb::AsPixels<P>,
{
    let actual = source.pixel_format();
    if actual != P::FORMAT {
        return Err(BitmapError::InvalidParameter(alloc::format!(
            "source is {actual:?}, requested pixels are {:?}",
            P::FORMAT
        )));
    }
    let bytes = copy_pixels_to_vec(source, rect)?;
    Ok(bytes.as_pixels().to_vec())
}

/// Copy the whole source into an [`imgref::ImgVec`].
#[cfg(feature = "imgref")]
pub fn copy_to_imgvec<P: TypedPixel>(
    source: &dyn BitmapSource,
) -> Result<imgref::ImgVec<P>, BitmapError>
where
    [u8]: rgb::AsPixels<P>,
{
    let (width, height) = source.size();
    let pixels = copy_typed::<P>(source, None)?;
    Ok(imgref::ImgVec::new(pixels, width as usize, height as usize))
}
