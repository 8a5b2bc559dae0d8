//! Direct conversion paths and the per-row transforms behind them.
//!
//! Only direct paths exist; nothing chains through an intermediate format.

use crate::palette::Palette;
use crate::pixel::PixelFormatId;

/// How one row of source pixels becomes one row of destination pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RowTransform {
    /// Byte-for-byte; source and destination share a bit depth.
    Passthrough,
    /// 4 bytes -> first 3 bytes.
    DropAlpha,
    /// 3 bytes -> same 3 bytes + 255.
    AddOpaqueAlpha,
    /// 4 bytes -> first 3 bytes + 255.
    ForceOpaque,
    /// 3 bytes, swap bytes 0 and 2.
    SwapRb3,
    /// 4 bytes, swap bytes 0 and 2.
    SwapRb4,
    /// 1 byte -> v, v, v.
    GrayToBgr,
    /// 1 byte -> v, v, v, 255.
    GrayToBgra,
    /// N-bit palette index -> palette entry (b, g, r, a).
    PaletteToBgra { bits: u8 },
}

struct ConversionPath {
    from: PixelFormatId,
    to: PixelFormatId,
    transform: RowTransform,
}

const fn path(from: PixelFormatId, to: PixelFormatId, transform: RowTransform) -> ConversionPath {
    ConversionPath {
        from,
        to,
        transform,
    }
}

use crate::pixel::PixelFormatId as F;
use self::RowTransform as T;

static PATHS: &[ConversionPath] = &[
    // alpha add / drop
    path(F::BGR24, F::BGRA32, T::AddOpaqueAlpha),
    path(F::BGRA32, F::BGR24, T::DropAlpha),
    path(F::RGB24, F::RGBA32, T::AddOpaqueAlpha),
    path(F::RGBA32, F::RGB24, T::DropAlpha),
    // padded 32-bit
    path(F::BGR24, F::BGR32, T::AddOpaqueAlpha),
    path(F::BGR32, F::BGR24, T::DropAlpha),
    path(F::BGR32, F::BGRA32, T::ForceOpaque),
    path(F::BGRA32, F::BGR32, T::Passthrough),
    // channel order
    path(F::RGB24, F::BGR24, T::SwapRb3),
    path(F::BGR24, F::RGB24, T::SwapRb3),
    path(F::RGBA32, F::BGRA32, T::SwapRb4),
    path(F::BGRA32, F::RGBA32, T::SwapRb4),
    // gray expansion
    path(F::GRAY8, F::BGR24, T::GrayToBgr),
    path(F::GRAY8, F::BGRA32, T::GrayToBgra),
    // palette expansion
    path(F::INDEXED1, F::BGRA32, T::PaletteToBgra { bits: 1 }),
    path(F::INDEXED2, F::BGRA32, T::PaletteToBgra { bits: 2 }),
    path(F::INDEXED4, F::BGRA32, T::PaletteToBgra { bits: 4 }),
    path(F::INDEXED8, F::BGRA32, T::PaletteToBgra { bits: 8 }),
];

/// Resolve the transform for `from -> to`.
///
/// Identity resolves to [`RowTransform::Passthrough`] for any registered format.
/// Unregistered identifiers on either side never resolve.
pub(crate) fn find_path(from: PixelFormatId, to: PixelFormatId) -> Option<RowTransform> {
    if !from.is_registered() || !to.is_registered() {
        return None;
    }
    if from == to {
        return Some(RowTransform::Passthrough);
    }
    PATHS
        .iter()
        .find(|p| p.from == from && p.to == to)
        .map(|p| p.transform)
}

/// Every registered `(from, to)` pair with a direct path, identity excluded.
pub(crate) fn direct_paths() -> impl Iterator<Item = (PixelFormatId, PixelFormatId)> {
    PATHS.iter().map(|p| (p.from, p.to))
}

impl RowTransform {
    pub(crate) fn needs_palette(self) -> bool {
        matches!(self, Self::PaletteToBgra { .. })
    }

    /// Transform `width` pixels from `src` into `dst`.
    ///
    /// `src` and `dst` hold at least one row of meaningful bytes in their
    /// respective formats.
    pub(crate) fn apply(self, src: &[u8], dst: &mut [u8], width: usize, palette: &Palette) {
        match self {
            Self::Passthrough => {
                let n = dst.len().min(src.len());
                dst[..n].copy_from_slice(&src[..n]);
            }
            Self::DropAlpha => drop_alpha(&src[..width * 4], &mut dst[..width * 3]),
            Self::AddOpaqueAlpha => add_opaque_alpha(&src[..width * 3], &mut dst[..width * 4]),
            Self::ForceOpaque => {
                for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)).take(width) {
                    d[..3].copy_from_slice(&s[..3]);
                    d[3] = 255;
                }
            }
            Self::SwapRb3 => swap_rb3(&src[..width * 3], &mut dst[..width * 3]),
            Self::SwapRb4 => swap_rb4(&src[..width * 4], &mut dst[..width * 4]),
            Self::GrayToBgr => {
                for (&v, d) in src.iter().zip(dst.chunks_exact_mut(3)).take(width) {
                    d.fill(v);
                }
            }
            Self::GrayToBgra => gray_to_bgra(&src[..width], &mut dst[..width * 4]),
            Self::PaletteToBgra { bits } => expand_palette(src, dst, width, bits, palette),
        }
    }
}

fn drop_alpha(src: &[u8], dst: &mut [u8]) {
    #[cfg(feature = "simd")]
    if garb::bytes::rgba_to_rgb(src, dst).is_ok() {
        return;
    }
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
        d.copy_from_slice(&s[..3]);
    }
}

fn add_opaque_alpha(src: &[u8], dst: &mut [u8]) {
    #[cfg(feature = "simd")]
    if garb::bytes::rgb_to_rgba(src, dst).is_ok() {
        return;
    }
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
        d[..3].copy_from_slice(s);
        d[3] = 255;
    }
}

fn swap_rb3(src: &[u8], dst: &mut [u8]) {
    #[cfg(feature = "simd")]
    if garb::bytes::rgb_to_bgr(src, dst).is_ok() {
        return;
    }
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(3)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
    }
}

fn swap_rb4(src: &[u8], dst: &mut [u8]) {
    #[cfg(feature = "simd")]
    if garb::bytes::rgba_to_bgra(src, dst).is_ok() {
        return;
    }
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
        d[3] = s[3];
    }
}

fn gray_to_bgra(src: &[u8], dst: &mut [u8]) {
    #[cfg(feature = "simd")]
    if garb::bytes::gray_to_rgba(src, dst).is_ok() {
        return;
    }
    for (&v, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
        d[..3].fill(v);
        d[3] = 255;
    }
}

fn expand_palette(src: &[u8], dst: &mut [u8], width: usize, bits: u8, palette: &Palette) {
    let bits = usize::from(bits);
    let mask = ((1u16 << bits) - 1) as u8;
    for (i, d) in dst.chunks_exact_mut(4).take(width).enumerate() {
        let bit = i * bits;
        let shift = 8 - bits - bit % 8;
        let index = (src[bit / 8] >> shift) & mask;
        d.copy_from_slice(&palette.lookup(index));
    }
}
