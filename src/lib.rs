//! # zenconvert
//!
//! Bitmap sources, exact pixel-format conversion, and lossless encode/decode
//! round trips.
//!
//! ## Model
//!
//! - A [`PixelFormatId`] is an opaque 128-bit identifier. The ones in the
//!   static registry ([`registered_formats`]) describe a pixel layout;
//!   anything else is rejected wherever a layout is needed.
//! - A [`BitmapSource`] is a read-only 2D pixel provider: size, format,
//!   resolution, optional palette, and rectangle copies into caller
//!   buffers. Sources are shared as `Arc<dyn BitmapSource>`.
//! - [`FormatConverter`] presents a source in another format, converting
//!   rows lazily on every copy. [`convert_bitmap_source`] hands the source
//!   back untouched when no conversion is needed.
//! - With the `std` feature, [`BitmapEncoder`] and [`BitmapDecoder`] move
//!   frames through BMP containers on any `Write` / `Read` stream.
//!
//! All conversions are direct (no chaining through intermediate formats)
//! and bit-exact: alpha is added as 255 and dropped by truncation.
//!
//! ## Usage
//!
//! ```
//! use zenconvert::{Bitmap, BitmapSource, PixelFormatId, convert_bitmap_source, copy_pixels_to_vec};
//!
//! let bgra = Bitmap::from_pixels(2, 1, PixelFormatId::BGRA32, 8, vec![1, 2, 3, 4, 5, 6, 7, 8])?
//!     .into_shared();
//! let bgr = convert_bitmap_source(PixelFormatId::BGR24, bgra)?;
//! assert_eq!(bgr.pixel_format(), PixelFormatId::BGR24);
//! assert_eq!(copy_pixels_to_vec(&*bgr, None)?, vec![1, 2, 3, 5, 6, 7]);
//! # Ok::<(), zenconvert::BitmapError>(())
//! ```
//!
//! ## Cancellation
//!
//! Long-running paths (`*_with_stop`) take an [`enough::Stop`] and check it
//! every 16 rows.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod bitmap;
mod convert;
mod error;
mod limits;
mod palette;
mod pixel;
mod source;

#[cfg(feature = "rgb")]
mod typed;

#[cfg(feature = "std")]
mod bmp;
#[cfg(feature = "std")]
mod codec;

pub use bitmap::{Bitmap, DEFAULT_DPI};
pub use convert::{
    ConverterOptions, DitherType, FormatConverter, can_convert, conversion_paths,
    convert_bitmap_source,
};
pub use enough::{Stop, StopReason, Unstoppable};
pub use error::{BitmapError, ErrorKind};
pub use limits::Limits;
pub use palette::{Palette, PaletteType};
pub use pixel::{
    Channel, ChannelRole, PixelFormatId, PixelFormatInfo, pixel_format_info, registered_formats,
};
pub use source::{BitmapSource, Rect, copy_pixels_to_vec};

#[cfg(feature = "rgb")]
pub use typed::{TypedPixel, copy_typed};

#[cfg(feature = "imgref")]
pub use typed::copy_to_imgvec;

#[cfg(feature = "std")]
pub use codec::{
    BitmapDecoder, BitmapEncoder, ContainerFormat, EncoderCacheOption, FrameDecode, FrameEncode,
    MetadataCacheOption,
};
