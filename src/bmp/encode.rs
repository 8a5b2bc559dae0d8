//! BMP encoder: uncompressed bottom-up rows.

use alloc::vec::Vec;

use enough::Stop;

use super::*;
use crate::codec::FrameData;
use crate::error::BitmapError;

struct Layout {
    bits_per_pixel: u16,
    compression: u32,
    header_size: u32,
    palette_entries: usize,
}

fn layout_for(frame: &FrameData) -> Result<Layout, BitmapError> {
    let plain = |bits_per_pixel| Layout {
        bits_per_pixel,
        compression: BI_RGB,
        header_size: INFO_HEADER_SIZE,
        palette_entries: 0,
    };
    let indexed = |bits_per_pixel: u16| -> Result<Layout, BitmapError> {
        let palette = frame
            .palette
            .as_ref()
            .ok_or(BitmapError::WrongState("indexed frame has no palette"))?;
        Ok(Layout {
            palette_entries: palette.len().min(1 << bits_per_pixel),
            ..plain(bits_per_pixel)
        })
    };
    Ok(match frame.format {
        PixelFormatId::BGR24 => plain(24),
        PixelFormatId::BGR32 => plain(32),
        PixelFormatId::BGRA32 => Layout {
            bits_per_pixel: 32,
            compression: BI_BITFIELDS,
            header_size: V4_HEADER_SIZE,
            palette_entries: 0,
        },
        PixelFormatId::INDEXED1 => indexed(1)?,
        PixelFormatId::INDEXED4 => indexed(4)?,
        PixelFormatId::INDEXED8 => indexed(8)?,
        other => {
            return Err(BitmapError::UnsupportedVariant(alloc::format!(
                "BMP cannot store {other:?}"
            )));
        }
    })
}

/// Encode one frame as a complete BMP file.
pub(crate) fn encode(frame: &FrameData, stop: &dyn Stop) -> Result<Vec<u8>, BitmapError> {
    let (width, height) = (frame.width, frame.height);
    let too_large = || BitmapError::DimensionsTooLarge { width, height };
    let layout = layout_for(frame)?;
    let row_bytes = frame.row_bytes()?;
    let expected = row_bytes.checked_mul(height as usize).ok_or_else(too_large)?;
    if frame.pixels.len() < expected {
        return Err(BitmapError::BufferTooSmall {
            needed: expected,
            actual: frame.pixels.len(),
        });
    }

    let row_stride = disk_stride(layout.bits_per_pixel, width).ok_or_else(too_large)?;
    let pixel_data_size = row_stride.checked_mul(height as usize).ok_or_else(too_large)?;
    let data_offset = FILE_HEADER_SIZE + layout.header_size as usize + layout.palette_entries * 4;
    let file_size = pixel_data_size.checked_add(data_offset).ok_or_else(too_large)?;
    if u32::try_from(file_size).is_err() || i32::try_from(width).is_err() || i32::try_from(height).is_err() {
        return Err(too_large());
    }

    stop.check()?;

    let mut out = Vec::with_capacity(file_size);
    write_bmp_header(&mut out, frame, &layout, file_size, data_offset, pixel_data_size);
    if let Some(palette) = frame.palette.as_ref().filter(|_| layout.palette_entries > 0) {
        for &[b, g, r, _] in palette.colors().iter().take(layout.palette_entries) {
            out.extend_from_slice(&[b, g, r, 0]);
        }
    }

    let pad_bytes = row_stride - row_bytes;
    for (i, row) in frame.pixels[..expected].chunks_exact(row_bytes).rev().enumerate() {
        if i % 16 == 0 {
            stop.check()?;
        }
        out.extend_from_slice(row);
        out.extend(core::iter::repeat_n(0u8, pad_bytes));
    }

    log::trace!(
        "BMP encoded {width}x{height} at {} bpp, {} bytes",
        layout.bits_per_pixel,
        out.len()
    );
    Ok(out)
}

fn write_bmp_header(
    out: &mut Vec<u8>,
    frame: &FrameData,
    layout: &Layout,
    file_size: usize,
    data_offset: usize,
    pixel_data_size: usize,
) {
    // File header (14 bytes)
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 4]); // reserved
    out.extend_from_slice(&(data_offset as u32).to_le_bytes());

    // BITMAPINFOHEADER part (40 bytes)
    out.extend_from_slice(&layout.header_size.to_le_bytes());
    out.extend_from_slice(&(frame.width as i32).to_le_bytes());
    out.extend_from_slice(&(frame.height as i32).to_le_bytes()); // positive = bottom-up
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&layout.bits_per_pixel.to_le_bytes());
    out.extend_from_slice(&layout.compression.to_le_bytes());
    out.extend_from_slice(&(pixel_data_size as u32).to_le_bytes());
    out.extend_from_slice(&dpi_to_ppm(frame.dpi.0).to_le_bytes());
    out.extend_from_slice(&dpi_to_ppm(frame.dpi.1).to_le_bytes());
    out.extend_from_slice(&(layout.palette_entries as u32).to_le_bytes()); // colors used
    out.extend_from_slice(&0u32.to_le_bytes()); // important colors

    if layout.header_size == V4_HEADER_SIZE {
        for mask in [RED_MASK, GREEN_MASK, BLUE_MASK, ALPHA_MASK] {
            out.extend_from_slice(&mask.to_le_bytes());
        }
        out.extend_from_slice(&CS_SRGB.to_le_bytes());
        // endpoints (36) + gamma (12), unused for sRGB
        out.extend_from_slice(&[0u8; 48]);
    }
}
