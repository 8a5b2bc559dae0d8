#![no_main]
use libfuzzer_sys::fuzz_target;
use zenconvert::*;

fuzz_target!(|data: &[u8]| {
    // If we can decode it, re-encoding and decoding again must produce identical pixels
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
    let (width, height) = frame.size();
    let format = frame.pixel_format();
    let Ok(pixels) = copy_pixels_to_vec(&*frame, None) else {
        return;
    };

    let mut encoder = BitmapEncoder::new(ContainerFormat::Bmp);
    encoder
        .initialize(Vec::new(), EncoderCacheOption::NoCache)
        .unwrap();
    let mut out = encoder.create_new_frame().unwrap();
    out.initialize().unwrap();
    out.set_size(width, height).unwrap();
    assert_eq!(out.set_pixel_format(format).unwrap(), format);
    let source: std::sync::Arc<dyn BitmapSource> = frame.clone();
    out.write_source(source, None).unwrap();
    out.commit().unwrap();
    encoder.commit().unwrap();
    let bytes = encoder.into_inner().unwrap();

    let mut decoder2 = BitmapDecoder::new();
    decoder2
        .initialize(&bytes[..], MetadataCacheOption::OnDemand)
        .expect("re-encoded data failed to decode");
    let frame2 = decoder2.get_frame(0).unwrap();

    assert_eq!(frame2.size(), (width, height));
    assert_eq!(frame2.pixel_format(), format);
    assert_eq!(copy_pixels_to_vec(&*frame2, None).unwrap(), pixels, "roundtrip pixel mismatch");
});
