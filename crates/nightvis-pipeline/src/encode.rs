//! PNG encoding of rendered frames.
//!
//! The library stays sans-IO: [`encode_png`] returns bytes and the
//! caller decides where they go.
//!
//! PNG has no plain two- or four-channel layout, so such frames are
//! written as gray+alpha and RGBA. Every channel is stored losslessly,
//! but image viewers treat the last channel as opacity: a four-channel
//! frame tinted into channel 0 has a zero last channel and displays as
//! fully transparent. Decode the PNG as RGBA to get the raw channels
//! back.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use image::ExtendedColorType;

use crate::types::{OutputImage, PipelineError};

/// PNG color type for an output frame with `channels` channels.
const fn color_type(channels: u8) -> ExtendedColorType {
    match channels {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        4 => ExtendedColorType::Rgba8,
        _ => ExtendedColorType::Rgb8,
    }
}

/// Encode an output frame as PNG bytes.
///
/// # Errors
///
/// Returns [`PipelineError::ImageEncode`] if the PNG encoder fails.
pub fn encode_png(image: &OutputImage) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            color_type(image.channels()),
        )
        .map_err(PipelineError::ImageEncode)?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        bytes = buf.len(),
        "encoded frame as PNG"
    );
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;
    use crate::types::SourceImage;

    #[test]
    fn encoded_frame_decodes_back() {
        let source = SourceImage::from_raw(3, 2, 3, vec![90; 18]).unwrap();
        let params = ParameterSet {
            brightness: 40.0,
            ..ParameterSet::default()
        };
        let frame = crate::render(&source, &params).unwrap();
        let png = encode_png(&frame).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.as_raw(), frame.as_raw());
    }

    #[test]
    fn four_channel_frame_keeps_every_channel() {
        let source = SourceImage::from_raw(2, 2, 4, vec![60; 16]).unwrap();
        for channel in 0..4 {
            let params = ParameterSet {
                channel,
                brightness: 50.0,
                ..ParameterSet::default()
            };
            let frame = crate::render(&source, &params).unwrap();
            let png = encode_png(&frame).unwrap();
            let decoded = image::load_from_memory(&png).unwrap();
            assert_eq!(decoded.color(), image::ColorType::Rgba8);
            assert_eq!(decoded.to_rgba8().as_raw(), frame.as_raw());
        }
    }

    #[test]
    fn two_channel_frame_keeps_both_channels() {
        let source = SourceImage::from_raw(2, 1, 2, vec![10, 20, 30, 40]).unwrap();
        let params = ParameterSet {
            channel: 1,
            brightness: 70.0,
            ..ParameterSet::default()
        };
        let frame = crate::render(&source, &params).unwrap();
        let decoded = image::load_from_memory(&encode_png(&frame).unwrap()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::La8);
        assert_eq!(decoded.to_luma_alpha8().as_raw(), frame.as_raw());
    }

    #[test]
    fn single_channel_frame_encodes_as_gray() {
        let source = SourceImage::from_raw(2, 2, 1, vec![10; 4]).unwrap();
        let frame = crate::render(&source, &ParameterSet::default()).unwrap();
        let png = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }
}
