use crate::error::BitmapError;

/// Caps on the frames a [`BitmapDecoder`](crate::BitmapDecoder) will
/// materialize, checked against the container header before any pixel
/// buffer is allocated.
///
/// Unset fields impose no cap.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Cap on `width * height` of one frame.
    pub max_pixels: Option<u64>,
    /// Cap on the decoded frame's packed pixel bytes.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Reject a `width` x `height` frame that breaks any dimension cap.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), BitmapError> {
        let pixels = u64::from(width) * u64::from(height);
        within("frame width", u64::from(width), self.max_width)?;
        within("frame height", u64::from(height), self.max_height)?;
        within("frame pixel count", pixels, self.max_pixels)
    }

    /// Reject a pixel buffer of `bytes` above `max_memory_bytes`.
    pub(crate) fn check_memory(&self, bytes: usize) -> Result<(), BitmapError> {
        within("frame buffer bytes", bytes as u64, self.max_memory_bytes)
    }
}

fn within(what: &str, value: u64, cap: Option<u64>) -> Result<(), BitmapError> {
    match cap {
        Some(cap) if value > cap => Err(BitmapError::LimitExceeded(alloc::format!(
            "{what} {value} is over the cap of {cap}"
        ))),
        _ => Ok(()),
    }
}
