//! Integration test: decode an encoded image, render it, and encode the frame.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nightvis_pipeline::{ParameterSet, PipelineError, SourceImage, SourceSignal};

/// Encode a 16x16 RGB checkerboard of 4x4 tiles as PNG bytes.
fn checkerboard_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(16, 16, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            image::Rgb([30, 200, 90])
        } else {
            image::Rgb([220, 40, 160])
        }
    });
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[test]
fn decode_render_encode_round_trip() {
    let source = nightvis_pipeline::source::decode(&checkerboard_png()).expect("decode should succeed");
    assert_eq!(source.channels(), 3);

    let params = ParameterSet {
        blur_kernel_size: 5,
        contrast: 2.0,
        brightness: 64.0,
        ..ParameterSet::default()
    };
    let frame = nightvis_pipeline::render(&source, &params).expect("render should succeed");
    assert_eq!(frame.dimensions(), source.dimensions());
    assert!(frame.pixels().all(|p| p[0] == 0 && p[2] == 0));

    // Tile interiors away from edges keep only the brightness offset.
    assert_eq!(frame.pixel(0, 0)[1], 64);
    // Tile edges carry detail.
    assert_ne!(frame.pixel(3, 1)[1], 64);

    let png = nightvis_pipeline::encode_png(&frame).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
    assert_eq!(decoded.as_raw(), frame.as_raw());
}

#[test]
fn each_channel_selects_its_own_source_plane() {
    let source = nightvis_pipeline::source::decode(&checkerboard_png()).unwrap();
    let frames: Vec<_> = (0..3)
        .map(|channel| {
            let params = ParameterSet {
                contrast: 3.0,
                brightness: 128.0,
                channel,
                ..ParameterSet::default()
            };
            nightvis_pipeline::render(&source, &params).unwrap()
        })
        .collect();

    // Red rises across the first tile edge, green falls.
    let red = frames[0].pixel(4, 1)[0];
    let green = frames[1].pixel(4, 1)[1];
    assert!(red > 128, "red detail should be positive, got {red}");
    assert!(green < 128, "green detail should be negative, got {green}");
    assert_eq!(frames[2].pixel(4, 1)[0], 0);
}

#[test]
fn luma_signal_filters_the_grayscale_image() {
    let source = nightvis_pipeline::source::decode(&checkerboard_png()).unwrap();
    let params = ParameterSet {
        source_signal: SourceSignal::Luma,
        contrast: 2.0,
        brightness: 100.0,
        ..ParameterSet::default()
    };
    let frame = nightvis_pipeline::render(&source, &params).unwrap();
    assert!(frame.pixels().all(|p| p[0] == 0 && p[2] == 0));
    assert_eq!(frame.pixel(0, 0)[1], 100);
}

#[test]
fn ragged_rows_are_rejected_before_render() {
    let rows = vec![
        vec![vec![1, 2, 3], vec![4, 5, 6]],
        vec![vec![7, 8, 9]],
    ];
    let result = SourceImage::from_rows(&rows);
    assert!(matches!(result, Err(PipelineError::InvalidImage(_))));
}

#[test]
fn corrupt_input_surfaces_decode_error() {
    let result = nightvis_pipeline::source::decode(b"definitely not an image");
    assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
}

#[test]
fn diagnostics_agree_with_render() {
    let source = nightvis_pipeline::source::decode(&checkerboard_png()).unwrap();
    let params = ParameterSet {
        contrast: 5.0,
        brightness: 128.0,
        ..ParameterSet::default()
    };
    let (staged, diag) = nightvis_pipeline::render_with_diagnostics(&source, &params).unwrap();
    assert_eq!(staged.output, nightvis_pipeline::render(&source, &params).unwrap());
    assert_eq!(diag.summary.pixel_count, 256);
    eprintln!("{}", diag.report());
}
