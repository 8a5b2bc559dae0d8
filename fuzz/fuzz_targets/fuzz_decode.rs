#![no_main]
use libfuzzer_sys::fuzz_target;
use zenconvert::*;

fuzz_target!(|data: &[u8]| {
    // Decode, then pull the frame through every conversion it supports.
    // Must never panic.
    let limits = Limits {
        max_pixels: Some(1 << 22),
        ..Limits::default()
    };
    let mut decoder = BitmapDecoder::new().with_limits(limits);
    if decoder.initialize(data, MetadataCacheOption::OnDemand).is_err() {
        return;
    }
    let Ok(frame) = decoder.get_frame(0) else {
        return;
    };
    let src_format = frame.pixel_format();
    for info in registered_formats() {
        if !can_convert(src_format, info.id) {
            continue;
        }
        if let Ok(converted) = convert_bitmap_source(info.id, frame.clone()) {
            let _ = copy_pixels_to_vec(&*converted, None);
        }
    }
});
