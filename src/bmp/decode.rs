//! BMP decoder for uncompressed files.

use alloc::vec;
use alloc::vec::Vec;

use enough::Stop;

use super::*;
use crate::bitmap::DEFAULT_DPI;
use crate::codec::FrameData;
use crate::error::BitmapError;
use crate::limits::Limits;
use crate::palette::Palette;

struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn bytes<const N: usize>(&self, at: usize) -> Result<[u8; N], BitmapError> {
        let end = at.checked_add(N).ok_or(BitmapError::UnexpectedEof)?;
        let slice = self.data.get(at..end).ok_or(BitmapError::UnexpectedEof)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn u16_at(&self, at: usize) -> Result<u16, BitmapError> {
        self.bytes(at).map(u16::from_le_bytes)
    }

    fn u32_at(&self, at: usize) -> Result<u32, BitmapError> {
        self.bytes(at).map(u32::from_le_bytes)
    }

    fn i32_at(&self, at: usize) -> Result<i32, BitmapError> {
        self.bytes(at).map(i32::from_le_bytes)
    }
}

struct BmpHeader {
    data_offset: usize,
    width: u32,
    height: u32,
    top_down: bool,
    bits_per_pixel: u16,
    format: PixelFormatId,
    dpi: (f64, f64),
    palette: Option<Palette>,
}

fn parse_header(cur: &Cursor<'_>) -> Result<BmpHeader, BitmapError> {
    if !is_bmp(cur.data) {
        return Err(BitmapError::UnrecognizedFormat);
    }
    let data_offset = cur.u32_at(10)? as usize;
    let dib_size = cur.u32_at(14)?;
    if !matches!(dib_size, INFO_HEADER_SIZE | 52 | 56 | V4_HEADER_SIZE | V5_HEADER_SIZE) {
        return Err(BitmapError::UnsupportedVariant(alloc::format!(
            "BMP info header of {dib_size} bytes"
        )));
    }

    let raw_width = cur.i32_at(18)?;
    let raw_height = cur.i32_at(22)?;
    let planes = cur.u16_at(26)?;
    let bits_per_pixel = cur.u16_at(28)?;
    let compression = cur.u32_at(30)?;
    let ppm_x = cur.i32_at(38)?;
    let ppm_y = cur.i32_at(42)?;
    let colors_used = cur.u32_at(46)?;

    log::trace!(
        "BMP header: {raw_width}x{raw_height} bpp={bits_per_pixel} compression={compression} \
         info={dib_size} offset={data_offset}"
    );

    if raw_width <= 0 || raw_height == 0 {
        return Err(BitmapError::InvalidHeader(alloc::format!(
            "BMP dimensions {raw_width}x{raw_height}"
        )));
    }
    if planes != 1 {
        return Err(BitmapError::InvalidHeader(alloc::format!(
            "BMP planes must be 1, got {planes}"
        )));
    }
    let width = raw_width as u32;
    let height = raw_height.unsigned_abs();
    let top_down = raw_height < 0;

    let format = match (bits_per_pixel, compression) {
        (1, BI_RGB) => PixelFormatId::INDEXED1,
        (4, BI_RGB) => PixelFormatId::INDEXED4,
        (8, BI_RGB) => PixelFormatId::INDEXED8,
        (24, BI_RGB) => PixelFormatId::BGR24,
        (32, BI_RGB) => PixelFormatId::BGR32,
        (32, BI_BITFIELDS | BI_ALPHABITFIELDS) => {
            // Masks follow the 40-byte header directly, or live inside the
            // larger headers at the same offset.
            let masks = [cur.u32_at(54)?, cur.u32_at(58)?, cur.u32_at(62)?];
            if masks != [RED_MASK, GREEN_MASK, BLUE_MASK] {
                return Err(BitmapError::UnsupportedVariant(alloc::format!(
                    "BMP channel masks {masks:08x?}"
                )));
            }
            let has_alpha_mask = dib_size >= 56 || compression == BI_ALPHABITFIELDS;
            if has_alpha_mask && cur.u32_at(66)? == ALPHA_MASK {
                PixelFormatId::BGRA32
            } else {
                PixelFormatId::BGR32
            }
        }
        _ => {
            return Err(BitmapError::UnsupportedVariant(alloc::format!(
                "BMP {bits_per_pixel} bpp with compression {compression}"
            )));
        }
    };

    let palette = if bits_per_pixel <= 8 {
        let capacity = 1u32 << bits_per_pixel;
        let count = if colors_used == 0 { capacity } else { colors_used };
        if count > capacity {
            return Err(BitmapError::InvalidHeader(alloc::format!(
                "BMP palette has {count} entries for {bits_per_pixel} bpp"
            )));
        }
        let start = FILE_HEADER_SIZE + dib_size as usize;
        let colors = (0..count as usize)
            .map(|i| {
                let [b, g, r, _] = cur.bytes::<4>(start + i * 4)?;
                Ok([b, g, r, 255])
            })
            .collect::<Result<Vec<_>, BitmapError>>()?;
        Some(Palette::new(colors)?)
    } else {
        None
    };

    let dpi = (
        ppm_to_dpi(ppm_x).unwrap_or(DEFAULT_DPI),
        ppm_to_dpi(ppm_y).unwrap_or(DEFAULT_DPI),
    );

    Ok(BmpHeader {
        data_offset,
        width,
        height,
        top_down,
        bits_per_pixel,
        format,
        dpi,
        palette,
    })
}

/// Decode a complete BMP file into packed, top-down rows.
pub(crate) fn decode(
    data: &[u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<FrameData, BitmapError> {
    let cur = Cursor { data };
    let header = parse_header(&cur)?;
    let (width, height) = (header.width, header.height);
    let too_large = || BitmapError::DimensionsTooLarge { width, height };

    let row_bytes = header
        .format
        .info()
        .and_then(|info| info.row_bytes(width))
        .ok_or_else(too_large)?;
    let out_len = row_bytes.checked_mul(height as usize).ok_or_else(too_large)?;
    if let Some(limits) = limits {
        limits.check(width, height)?;
        limits.check_memory(out_len)?;
    }
    stop.check()?;

    let disk_row = disk_stride(header.bits_per_pixel, width).ok_or_else(too_large)?;
    let last_row_end = disk_row
        .checked_mul(height as usize - 1)
        .and_then(|n| n.checked_add(header.data_offset))
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or_else(too_large)?;
    if last_row_end > data.len() {
        return Err(BitmapError::UnexpectedEof);
    }

    let mut pixels = vec![0u8; out_len];
    for (y, out_row) in pixels.chunks_exact_mut(row_bytes).enumerate() {
        if y % 16 == 0 {
            stop.check()?;
        }
        let disk_y = if header.top_down { y } else { height as usize - 1 - y };
        let start = header.data_offset + disk_y * disk_row;
        out_row.copy_from_slice(&data[start..start + row_bytes]);
    }

    Ok(FrameData {
        width,
        height,
        format: header.format,
        dpi: header.dpi,
        palette: header.palette,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteType;
    use enough::Unstoppable;

    fn round_trip(frame: &FrameData) -> FrameData {
        let bytes = super::super::encode(frame, &Unstoppable).unwrap();
        decode(&bytes, None, &Unstoppable).unwrap()
    }

    #[test]
    fn bgr32_keeps_padding_bytes() {
        let frame = FrameData {
            width: 2,
            height: 2,
            format: PixelFormatId::BGR32,
            dpi: (72.0, 150.0),
            palette: None,
            pixels: vec![1, 2, 3, 80, 4, 5, 6, 80, 7, 8, 9, 80, 10, 11, 12, 80],
        };
        let back = round_trip(&frame);
        assert_eq!(back.format, PixelFormatId::BGR32);
        assert_eq!(back.pixels, frame.pixels);
        assert!((back.dpi.0 - 72.0).abs() < 0.02);
        assert!((back.dpi.1 - 150.0).abs() < 0.02);
    }

    #[test]
    fn indexed4_with_odd_width() {
        let frame = FrameData {
            width: 3,
            height: 2,
            format: PixelFormatId::INDEXED4,
            dpi: (96.0, 96.0),
            palette: Some(Palette::predefined(PaletteType::FixedGray16)),
            pixels: vec![0x12, 0x30, 0xfe, 0xd0],
        };
        let back = round_trip(&frame);
        assert_eq!(back.format, PixelFormatId::INDEXED4);
        assert_eq!(back.pixels, frame.pixels);
        assert_eq!(back.palette.unwrap().len(), 16);
    }

    #[test]
    fn top_down_rows_are_not_flipped() {
        let frame = FrameData {
            width: 1,
            height: 2,
            format: PixelFormatId::BGR24,
            dpi: (96.0, 96.0),
            palette: None,
            pixels: vec![1, 2, 3, 4, 5, 6],
        };
        let mut bytes = super::super::encode(&frame, &Unstoppable).unwrap();
        bytes[22..26].copy_from_slice(&(-2i32).to_le_bytes());
        let back = decode(&bytes, None, &Unstoppable).unwrap();
        // File rows are bottom-up as written, now read as top-down.
        assert_eq!(back.pixels, vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn truncated_and_unsupported() {
        let frame = FrameData {
            width: 4,
            height: 4,
            format: PixelFormatId::BGR24,
            dpi: (96.0, 96.0),
            palette: None,
            pixels: vec![0; 48],
        };
        let bytes = super::super::encode(&frame, &Unstoppable).unwrap();
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1], None, &Unstoppable),
            Err(BitmapError::UnexpectedEof)
        ));
        assert!(matches!(decode(&bytes[..20], None, &Unstoppable), Err(BitmapError::UnexpectedEof)));

        let mut rle = bytes.clone();
        rle[30..34].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(
            decode(&rle, None, &Unstoppable),
            Err(BitmapError::UnsupportedVariant(_))
        ));
    }

    #[test]
    fn limits_are_enforced() {
        let frame = FrameData {
            width: 4,
            height: 4,
            format: PixelFormatId::BGR24,
            dpi: (96.0, 96.0),
            palette: None,
            pixels: vec![0; 48],
        };
        let bytes = super::super::encode(&frame, &Unstoppable).unwrap();
        let limits = Limits {
            max_pixels: Some(15),
            ..Limits::default()
        };
        assert!(matches!(
            decode(&bytes, Some(&limits), &Unstoppable),
            Err(BitmapError::LimitExceeded(_))
        ));
    }
}
