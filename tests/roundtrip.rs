use std::sync::Arc;

use zenconvert::*;

const BGRA_4X2: [u8; 32] = [
    255, 0, 0, 255, // blue
    0, 255, 0, 255, // green
    0, 0, 255, 255, // red
    0, 0, 0, 255, // black
    0, 255, 255, 255, // yellow
    255, 0, 255, 255, // magenta
    255, 255, 0, 255, // cyan
    255, 255, 255, 255, // white
];

/// 32bppBGR with a non-zero padding byte; it must survive the container.
const BGR32_4X2: [u8; 32] = [
    255, 0, 0, 80, 0, 255, 0, 80, 0, 0, 255, 80, 0, 0, 0, 80, //
    0, 255, 255, 80, 255, 0, 255, 80, 255, 255, 0, 80, 255, 255, 255, 80,
];

fn source(format: PixelFormatId, pixels: &[u8]) -> Arc<dyn BitmapSource> {
    Bitmap::from_pixels(4, 2, format, 16, pixels.to_vec())
        .unwrap()
        .with_resolution(96.0, 96.0)
        .into_shared()
}

fn encode(src: Arc<dyn BitmapSource>, requested: PixelFormatId) -> (Vec<u8>, PixelFormatId) {
    let (width, height) = src.size();
    let mut encoder = BitmapEncoder::new(ContainerFormat::Bmp);
    encoder
        .initialize(Vec::new(), EncoderCacheOption::NoCache)
        .unwrap();
    let mut frame = encoder.create_new_frame().unwrap();
    frame.initialize().unwrap();
    frame.set_size(width, height).unwrap();
    let actual = frame.set_pixel_format(requested).unwrap();
    frame.write_source(src, None).unwrap();
    frame.commit().unwrap();
    encoder.commit().unwrap();
    (encoder.into_inner().unwrap(), actual)
}

fn decode(bytes: &[u8]) -> Arc<FrameDecode> {
    let mut decoder = BitmapDecoder::new();
    decoder
        .initialize(bytes, MetadataCacheOption::OnDemand)
        .unwrap();
    assert_eq!(decoder.container_format(), Some(ContainerFormat::Bmp));
    assert_eq!(decoder.frame_count().unwrap(), 1);
    decoder.get_frame(0).unwrap()
}

fn assert_dpi(frame: &dyn BitmapSource, expected: f64) {
    let (x, y) = frame.resolution();
    assert!((x - expected).abs() < 0.02, "dpi x {x}");
    assert!((y - expected).abs() < 0.02, "dpi y {y}");
}

#[test]
fn bmp_roundtrip_bgra32() {
    let (bytes, actual) = encode(source(PixelFormatId::BGRA32, &BGRA_4X2), PixelFormatId::BGRA32);
    assert_eq!(actual, PixelFormatId::BGRA32);

    let frame = decode(&bytes);
    assert_eq!(frame.size(), (4, 2));
    assert_eq!(frame.pixel_format(), PixelFormatId::BGRA32);
    assert_dpi(&*frame, 96.0);
    assert_eq!(copy_pixels_to_vec(&*frame, None).unwrap(), BGRA_4X2);
}

#[test]
fn bmp_roundtrip_bgr32_keeps_padding() {
    let (bytes, actual) = encode(source(PixelFormatId::BGR32, &BGR32_4X2), PixelFormatId::BGR32);
    assert_eq!(actual, PixelFormatId::BGR32);

    let frame = decode(&bytes);
    assert_eq!(frame.pixel_format(), PixelFormatId::BGR32);
    assert_dpi(&*frame, 96.0);
    assert_eq!(copy_pixels_to_vec(&*frame, None).unwrap(), BGR32_4X2);
}

#[test]
fn bmp_roundtrip_converts_on_write() {
    // BGRA source written into a BGR24 frame loses only the alpha channel.
    let (bytes, actual) = encode(source(PixelFormatId::BGRA32, &BGRA_4X2), PixelFormatId::BGR24);
    assert_eq!(actual, PixelFormatId::BGR24);

    let frame = decode(&bytes);
    assert_eq!(frame.pixel_format(), PixelFormatId::BGR24);
    let expected: Vec<u8> = BGRA_4X2
        .chunks_exact(4)
        .flat_map(|px| px[..3].to_vec())
        .collect();
    assert_eq!(copy_pixels_to_vec(&*frame, None).unwrap(), expected);

    // And back up to BGRA with opaque alpha.
    let back = convert_bitmap_source(PixelFormatId::BGRA32, frame).unwrap();
    assert_eq!(copy_pixels_to_vec(&*back, None).unwrap(), BGRA_4X2);
}

#[test]
fn bmp_substitutes_rgba_with_bgra() {
    let rgba: Vec<u8> = BGRA_4X2
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], px[3]])
        .collect();
    let (bytes, actual) = encode(source(PixelFormatId::RGBA32, &rgba), PixelFormatId::RGBA32);
    assert_eq!(actual, PixelFormatId::BGRA32);

    let frame = decode(&bytes);
    assert_eq!(frame.pixel_format(), PixelFormatId::BGRA32);
    let back = convert_bitmap_source(PixelFormatId::RGBA32, frame).unwrap();
    assert_eq!(copy_pixels_to_vec(&*back, None).unwrap(), rgba);
}

#[test]
fn bmp_roundtrip_indexed8_with_palette() {
    let palette = Palette::new(vec![
        [0, 0, 255, 255],
        [0, 255, 0, 255],
        [255, 0, 0, 255],
    ])
    .unwrap();
    let src = Bitmap::from_pixels(3, 2, PixelFormatId::INDEXED8, 3, vec![0, 1, 2, 2, 1, 0])
        .unwrap()
        .with_palette(palette.clone())
        .with_resolution(300.0, 300.0)
        .into_shared();
    let (bytes, actual) = encode(src, PixelFormatId::INDEXED8);
    assert_eq!(actual, PixelFormatId::INDEXED8);

    let frame = decode(&bytes);
    assert_eq!(frame.pixel_format(), PixelFormatId::INDEXED8);
    assert_dpi(&*frame, 300.0);
    let mut decoded_palette = Palette::default();
    frame.copy_palette(&mut decoded_palette).unwrap();
    assert_eq!(decoded_palette.colors(), palette.colors());
    assert_eq!(copy_pixels_to_vec(&*frame, None).unwrap(), vec![0, 1, 2, 2, 1, 0]);

    let bgra = convert_bitmap_source(PixelFormatId::BGRA32, frame).unwrap();
    let px = copy_pixels_to_vec(&*bgra, Some(Rect::new(2, 0, 1, 1))).unwrap();
    assert_eq!(px, vec![255, 0, 0, 255]);
}

#[test]
fn resolution_defaults_to_96_without_set_resolution() {
    let src = Bitmap::from_pixels(4, 2, PixelFormatId::BGRA32, 16, BGRA_4X2.to_vec())
        .unwrap()
        .into_shared();
    let (bytes, _) = encode(src, PixelFormatId::BGRA32);
    assert_dpi(&*decode(&bytes), 96.0);
}

#[test]
fn explicit_resolution_wins_over_source() {
    let mut encoder = BitmapEncoder::new(ContainerFormat::Bmp);
    encoder
        .initialize(Vec::new(), EncoderCacheOption::NoCache)
        .unwrap();
    let mut frame = encoder.create_new_frame().unwrap();
    frame.initialize().unwrap();
    frame.set_size(4, 2).unwrap();
    frame.set_pixel_format(PixelFormatId::BGRA32).unwrap();
    frame.set_resolution(72.0, 144.0).unwrap();
    frame
        .write_source(source(PixelFormatId::BGRA32, &BGRA_4X2), None)
        .unwrap();
    frame.commit().unwrap();
    encoder.commit().unwrap();

    let decoded = decode(&encoder.into_inner().unwrap());
    let (x, y) = decoded.resolution();
    assert!((x - 72.0).abs() < 0.02);
    assert!((y - 144.0).abs() < 0.02);
}

#[test]
fn write_source_in_bands() {
    let mut encoder = BitmapEncoder::new(ContainerFormat::Bmp);
    encoder
        .initialize(Vec::new(), EncoderCacheOption::NoCache)
        .unwrap();
    let mut frame = encoder.create_new_frame().unwrap();
    frame.initialize().unwrap();
    frame.set_size(4, 2).unwrap();
    frame.set_pixel_format(PixelFormatId::BGRA32).unwrap();
    let src = source(PixelFormatId::BGRA32, &BGRA_4X2);
    frame
        .write_source(src.clone(), Some(Rect::new(0, 0, 4, 1)))
        .unwrap();
    // Narrower than the frame is refused.
    assert!(frame
        .write_source(src.clone(), Some(Rect::new(0, 1, 2, 1)))
        .is_err());
    frame
        .write_source(src, Some(Rect::new(0, 1, 4, 1)))
        .unwrap();
    frame.commit().unwrap();
    encoder.commit().unwrap();

    let decoded = decode(&encoder.into_inner().unwrap());
    assert_eq!(copy_pixels_to_vec(&*decoded, None).unwrap(), BGRA_4X2);
}

#[test]
fn stream_write_errors_pass_through() {
    struct Full;
    impl std::io::Write for Full {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut encoder = BitmapEncoder::new(ContainerFormat::Bmp);
    encoder.initialize(Full, EncoderCacheOption::NoCache).unwrap();
    let mut frame = encoder.create_new_frame().unwrap();
    frame.initialize().unwrap();
    frame.set_size(4, 2).unwrap();
    frame.set_pixel_format(PixelFormatId::BGRA32).unwrap();
    frame
        .write_source(source(PixelFormatId::BGRA32, &BGRA_4X2), None)
        .unwrap();
    frame.commit().unwrap();

    let err = encoder.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    match err {
        BitmapError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::StorageFull),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn cancelled_write_source() {
    struct Cancelled;
    impl Stop for Cancelled {
        fn check(&self) -> Result<(), StopReason> {
            Err(StopReason::Cancelled)
        }
    }

    let mut encoder = BitmapEncoder::new(ContainerFormat::Bmp);
    encoder
        .initialize(Vec::new(), EncoderCacheOption::NoCache)
        .unwrap();
    let mut frame = encoder.create_new_frame().unwrap();
    frame.initialize().unwrap();
    frame.set_size(4, 2).unwrap();
    frame.set_pixel_format(PixelFormatId::BGRA32).unwrap();
    let err = frame
        .write_source_with_stop(source(PixelFormatId::BGRA32, &BGRA_4X2), None, &Cancelled)
        .unwrap_err();
    assert!(matches!(err, BitmapError::Cancelled(_)));
}

#[test]
fn decoder_rejects_out_of_range_frame() {
    let (bytes, _) = encode(source(PixelFormatId::BGRA32, &BGRA_4X2), PixelFormatId::BGRA32);
    let mut decoder = BitmapDecoder::new();
    decoder
        .initialize(&bytes[..], MetadataCacheOption::OnLoad)
        .unwrap();
    let err = decoder.get_frame(1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    // A second initialize on the same session is refused.
    assert!(decoder
        .initialize(&bytes[..], MetadataCacheOption::OnLoad)
        .is_err());
}

#[test]
fn decoder_limits() {
    let (bytes, _) = encode(source(PixelFormatId::BGRA32, &BGRA_4X2), PixelFormatId::BGRA32);
    let limits = Limits {
        max_width: Some(3),
        ..Limits::default()
    };
    let mut decoder = BitmapDecoder::new().with_limits(limits);
    let err = decoder
        .initialize(&bytes[..], MetadataCacheOption::OnDemand)
        .unwrap_err();
    assert!(matches!(err, BitmapError::LimitExceeded(_)));
}
