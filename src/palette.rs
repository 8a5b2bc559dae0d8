//! Colour tables for indexed pixel formats.

use alloc::vec::Vec;

use crate::error::BitmapError;

/// Well-known palettes, plus `Custom` for caller-supplied tables.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaletteType {
    #[default]
    Custom,
    /// Black and white.
    FixedBw,
    /// 4 evenly spaced grays.
    FixedGray4,
    /// 16 evenly spaced grays.
    FixedGray16,
    /// 256 grays.
    FixedGray256,
}

/// An ordered colour table. Entries are stored as `[b, g, r, a]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 4]>,
    kind: PaletteType,
}

impl Palette {
    /// Custom palette from BGRA entries. At most 256 entries.
    pub fn new(colors: Vec<[u8; 4]>) -> Result<Self, BitmapError> {
        if colors.len() > 256 {
            return Err(BitmapError::InvalidParameter(alloc::format!(
                "palette has {} entries, maximum is 256",
                colors.len()
            )));
        }
        Ok(Self {
            colors,
            kind: PaletteType::Custom,
        })
    }

    /// Build one of the predefined palettes. `Custom` yields an empty table.
    pub fn predefined(kind: PaletteType) -> Self {
        let colors = match kind {
            PaletteType::Custom => Vec::new(),
            PaletteType::FixedBw => gray_ramp(2),
            PaletteType::FixedGray4 => gray_ramp(4),
            PaletteType::FixedGray16 => gray_ramp(16),
            PaletteType::FixedGray256 => gray_ramp(256),
        };
        Self { colors, kind }
    }

    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn kind(&self) -> PaletteType {
        self.kind
    }

    /// Whether any entry is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        self.colors.iter().any(|c| c[3] != 255)
    }

    /// Whether every entry is a gray (b == g == r).
    pub fn is_grayscale(&self) -> bool {
        self.colors.iter().all(|c| c[0] == c[1] && c[1] == c[2])
    }

    /// Entry at `index`, or opaque black when the index is past the table.
    #[inline]
    pub(crate) fn lookup(&self, index: u8) -> [u8; 4] {
        self.colors
            .get(usize::from(index))
            .copied()
            .unwrap_or([0, 0, 0, 255])
    }

    /// Replace this palette's contents with `other`'s.
    pub fn copy_from(&mut self, other: &Palette) {
        self.colors.clear();
        self.colors.extend_from_slice(&other.colors);
        self.kind = other.kind;
    }
}

fn gray_ramp(count: usize) -> Vec<[u8; 4]> {
    let step = 255 / (count - 1);
    (0..count)
        .map(|i| {
            let v = (i * step) as u8;
            [v, v, v, 255]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_ramps() {
        let bw = Palette::predefined(PaletteType::FixedBw);
        assert_eq!(bw.colors(), &[[0, 0, 0, 255], [255, 255, 255, 255]]);
        let g4 = Palette::predefined(PaletteType::FixedGray4);
        assert_eq!(g4.colors()[1], [85, 85, 85, 255]);
        assert_eq!(g4.colors()[3], [255, 255, 255, 255]);
        let g256 = Palette::predefined(PaletteType::FixedGray256);
        assert_eq!(g256.len(), 256);
        assert!(g256.is_grayscale());
        assert!(!g256.has_alpha());
        assert_eq!(g256.kind(), PaletteType::FixedGray256);
    }

    #[test]
    fn rejects_oversized_table() {
        let err = Palette::new(alloc::vec![[0; 4]; 257]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn lookup_past_end_is_opaque_black() {
        let pal = Palette::new(alloc::vec![[1, 2, 3, 4]]).unwrap();
        assert_eq!(pal.lookup(0), [1, 2, 3, 4]);
        assert_eq!(pal.lookup(9), [0, 0, 0, 255]);
        assert!(pal.has_alpha());
    }
}
