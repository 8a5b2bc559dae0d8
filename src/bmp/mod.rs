//! Windows bitmap container backend.
//!
//! Writes uncompressed bottom-up files: 24-bit and 32-bit `BI_RGB`, 32-bit
//! with alpha through a `BITMAPV4HEADER` with `BI_BITFIELDS` masks, and 1, 4
//! and 8-bit paletted. Reads the same set plus top-down files and
//! `BITMAPV5HEADER`.

mod decode;
mod encode;

pub(crate) use decode::decode;
pub(crate) use encode::encode;

use crate::pixel::PixelFormatId;

const FILE_HEADER_SIZE: usize = 14;
const INFO_HEADER_SIZE: u32 = 40;
const V4_HEADER_SIZE: u32 = 108;
const V5_HEADER_SIZE: u32 = 124;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;
const BI_ALPHABITFIELDS: u32 = 6;

const RED_MASK: u32 = 0x00ff_0000;
const GREEN_MASK: u32 = 0x0000_ff00;
const BLUE_MASK: u32 = 0x0000_00ff;
const ALPHA_MASK: u32 = 0xff00_0000;

/// `LCS_sRGB`
const CS_SRGB: u32 = 0x7352_4742;

const METRES_PER_INCH: f64 = 0.0254;

pub(crate) fn is_bmp(data: &[u8]) -> bool {
    data.starts_with(b"BM")
}

/// Formats this backend stores as-is; everything else maps to the nearest
/// one it can hold without losing channels.
pub(crate) fn negotiate_pixel_format(requested: PixelFormatId) -> PixelFormatId {
    match requested {
        PixelFormatId::BGR24
        | PixelFormatId::BGR32
        | PixelFormatId::BGRA32
        | PixelFormatId::INDEXED1
        | PixelFormatId::INDEXED4
        | PixelFormatId::INDEXED8 => requested,
        PixelFormatId::RGBA32 | PixelFormatId::INDEXED2 => PixelFormatId::BGRA32,
        _ => PixelFormatId::BGR24,
    }
}

/// Padded on-disk row size: rows start on 4-byte boundaries.
fn disk_stride(bits_per_pixel: u16, width: u32) -> Option<usize> {
    let bits = u64::from(bits_per_pixel).checked_mul(u64::from(width))?;
    usize::try_from(bits.checked_add(31)? / 32 * 4).ok()
}

fn dpi_to_ppm(dpi: f64) -> i32 {
    (dpi / METRES_PER_INCH).round().clamp(0.0, f64::from(i32::MAX)) as i32
}

fn ppm_to_dpi(ppm: i32) -> Option<f64> {
    (ppm > 0).then(|| f64::from(ppm) * METRES_PER_INCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiation_keeps_native_formats() {
        for id in [
            PixelFormatId::BGR24,
            PixelFormatId::BGR32,
            PixelFormatId::BGRA32,
            PixelFormatId::INDEXED8,
        ] {
            assert_eq!(negotiate_pixel_format(id), id);
        }
        assert_eq!(negotiate_pixel_format(PixelFormatId::RGB24), PixelFormatId::BGR24);
        assert_eq!(negotiate_pixel_format(PixelFormatId::GRAY8), PixelFormatId::BGR24);
        assert_eq!(negotiate_pixel_format(PixelFormatId::RGBA32), PixelFormatId::BGRA32);
        assert_eq!(negotiate_pixel_format(PixelFormatId::INDEXED2), PixelFormatId::BGRA32);
    }

    #[test]
    fn stride_is_dword_aligned() {
        assert_eq!(disk_stride(24, 1), Some(4));
        assert_eq!(disk_stride(24, 4), Some(12));
        assert_eq!(disk_stride(1, 33), Some(8));
        assert_eq!(disk_stride(4, 3), Some(4));
        assert_eq!(disk_stride(32, 3), Some(12));
    }

    #[test]
    fn resolution_survives_ppm() {
        assert_eq!(dpi_to_ppm(96.0), 3780);
        let back = ppm_to_dpi(3780).unwrap();
        assert!((back - 96.0).abs() < 0.02);
        assert_eq!(ppm_to_dpi(0), None);
    }
}
