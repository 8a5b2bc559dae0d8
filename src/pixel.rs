//! Pixel format identifiers and the process-wide format registry.
//!
//! The registry is a `static` table: it exists before first use, is never
//! mutated, and lookups need no synchronization.

use core::fmt;

/// Opaque 128-bit pixel format identifier.
///
/// Any `u128` is a well-formed identifier; only the ones listed in the
/// registry describe a pixel layout. Conversions and encoders reject the
/// rest with a component-not-found error.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelFormatId(u128);

const ID_BASE: u128 = 0x7a656e63_6f6e_7631_8f3e_2d0b5c4a9e00;

const fn format_id(tag: u8) -> PixelFormatId {
    PixelFormatId(ID_BASE | tag as u128)
}

impl PixelFormatId {
    /// 8-bit grayscale.
    pub const GRAY8: Self = format_id(0x08);
    /// 3 bytes per pixel: blue, green, red.
    pub const BGR24: Self = format_id(0x0c);
    /// 3 bytes per pixel: red, green, blue.
    pub const RGB24: Self = format_id(0x0d);
    /// 4 bytes per pixel: blue, green, red, unused padding byte.
    pub const BGR32: Self = format_id(0x0e);
    /// 4 bytes per pixel: blue, green, red, straight alpha.
    pub const BGRA32: Self = format_id(0x0f);
    /// 4 bytes per pixel: red, green, blue, straight alpha.
    pub const RGBA32: Self = format_id(0x10);
    /// 1-bit palette indices, most significant bit first.
    pub const INDEXED1: Self = format_id(0x01);
    /// 2-bit palette indices, most significant bits first.
    pub const INDEXED2: Self = format_id(0x02);
    /// 4-bit palette indices, high nibble first.
    pub const INDEXED4: Self = format_id(0x03);
    /// 8-bit palette indices.
    pub const INDEXED8: Self = format_id(0x04);

    /// Wrap a raw identifier. The result need not be registered.
    pub const fn from_u128(raw: u128) -> Self {
        Self(raw)
    }

    /// The raw identifier value.
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Registry entry for this identifier, if it names a pixel format.
    pub fn info(self) -> Option<&'static PixelFormatInfo> {
        pixel_format_info(self)
    }

    /// Whether this identifier names a registered pixel format.
    pub fn is_registered(self) -> bool {
        self.info().is_some()
    }

    /// Look up a registered format by its short name (e.g. `"Bgra32"`).
    pub fn from_name(name: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .map(|info| info.id)
    }
}

impl fmt::Debug for PixelFormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info() {
            Some(info) => f.write_str(info.name),
            None => write!(f, "PixelFormatId({:032x})", self.0),
        }
    }
}

/// Meaning of one channel within a pixel.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Red,
    Green,
    Blue,
    Alpha,
    Gray,
    /// Palette index.
    Index,
    /// Present in memory but carries no information.
    Padding,
}

/// One channel of a pixel layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Channel {
    pub role: ChannelRole,
    /// Byte offset of the channel within the pixel (0 for sub-byte formats).
    pub byte_offset: u8,
    pub bit_width: u8,
}

const fn ch(role: ChannelRole, byte_offset: u8, bit_width: u8) -> Channel {
    Channel {
        role,
        byte_offset,
        bit_width,
    }
}

/// Registry entry describing a pixel layout.
#[derive(Debug, PartialEq, Eq)]
pub struct PixelFormatInfo {
    pub id: PixelFormatId,
    pub name: &'static str,
    pub bits_per_pixel: u32,
    /// Channels in memory order.
    pub channels: &'static [Channel],
    pub has_alpha: bool,
    pub is_indexed: bool,
}

impl PixelFormatInfo {
    /// Meaningful bytes in a row of `width` pixels: `ceil(bpp * width / 8)`.
    ///
    /// `None` on overflow.
    pub fn row_bytes(&self, width: u32) -> Option<usize> {
        (self.bits_per_pixel as usize)
            .checked_mul(width as usize)
            .and_then(|bits| bits.checked_add(7))
            .map(|bits| bits / 8)
    }

    /// Whole bytes per pixel, or `None` for sub-byte formats.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        (self.bits_per_pixel % 8 == 0).then_some(self.bits_per_pixel as usize / 8)
    }

    /// Number of palette entries addressable by an index of this format.
    pub fn palette_capacity(&self) -> Option<usize> {
        self.is_indexed.then(|| 1usize << self.bits_per_pixel)
    }
}

use ChannelRole::{Alpha, Blue, Gray, Green, Index, Padding, Red};

static REGISTRY: [PixelFormatInfo; 10] = [
    PixelFormatInfo {
        id: PixelFormatId::INDEXED1,
        name: "Indexed1",
        bits_per_pixel: 1,
        channels: &[ch(Index, 0, 1)],
        has_alpha: false,
        is_indexed: true,
    },
    PixelFormatInfo {
        id: PixelFormatId::INDEXED2,
        name: "Indexed2",
        bits_per_pixel: 2,
        channels: &[ch(Index, 0, 2)],
        has_alpha: false,
        is_indexed: true,
    },
    PixelFormatInfo {
        id: PixelFormatId::INDEXED4,
        name: "Indexed4",
        bits_per_pixel: 4,
        channels: &[ch(Index, 0, 4)],
        has_alpha: false,
        is_indexed: true,
    },
    PixelFormatInfo {
        id: PixelFormatId::INDEXED8,
        name: "Indexed8",
        bits_per_pixel: 8,
        channels: &[ch(Index, 0, 8)],
        has_alpha: false,
        is_indexed: true,
    },
    PixelFormatInfo {
        id: PixelFormatId::GRAY8,
        name: "Gray8",
        bits_per_pixel: 8,
        channels: &[ch(Gray, 0, 8)],
        has_alpha: false,
        is_indexed: false,
    },
    PixelFormatInfo {
        id: PixelFormatId::BGR24,
        name: "Bgr24",
        bits_per_pixel: 24,
        channels: &[ch(Blue, 0, 8), ch(Green, 1, 8), ch(Red, 2, 8)],
        has_alpha: false,
        is_indexed: false,
    },
    PixelFormatInfo {
        id: PixelFormatId::RGB24,
        name: "Rgb24",
        bits_per_pixel: 24,
        channels: &[ch(Red, 0, 8), ch(Green, 1, 8), ch(Blue, 2, 8)],
        has_alpha: false,
        is_indexed: false,
    },
    PixelFormatInfo {
        id: PixelFormatId::BGR32,
        name: "Bgr32",
        bits_per_pixel: 32,
        channels: &[
            ch(Blue, 0, 8),
            ch(Green, 1, 8),
            ch(Red, 2, 8),
            ch(Padding, 3, 8),
        ],
        has_alpha: false,
        is_indexed: false,
    },
    PixelFormatInfo {
        id: PixelFormatId::BGRA32,
        name: "Bgra32",
        bits_per_pixel: 32,
        channels: &[
            ch(Blue, 0, 8),
            ch(Green, 1, 8),
            ch(Red, 2, 8),
            ch(Alpha, 3, 8),
        ],
        has_alpha: true,
        is_indexed: false,
    },
    PixelFormatInfo {
        id: PixelFormatId::RGBA32,
        name: "Rgba32",
        bits_per_pixel: 32,
        channels: &[
            ch(Red, 0, 8),
            ch(Green, 1, 8),
            ch(Blue, 2, 8),
            ch(Alpha, 3, 8),
        ],
        has_alpha: true,
        is_indexed: false,
    },
];

/// Registry entry for `id`, or `None` if it isn't a pixel format.
pub fn pixel_format_info(id: PixelFormatId) -> Option<&'static PixelFormatInfo> {
    REGISTRY.iter().find(|info| info.id == id)
}

/// Every registered pixel format.
pub fn registered_formats() -> &'static [PixelFormatInfo] {
    &REGISTRY
}
