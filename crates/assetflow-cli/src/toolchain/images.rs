// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Lossless-ish image recompression.
//!
//! PNG files are re-encoded with the strongest deflate setting and adaptive
//! filtering; JPEG files are re-encoded at the configured quality. The
//! format is sniffed from the content, not the file name. Anything else
//! (SVG, GIF, ICO, WebP...) is published as is, and so is any re-encode that
//! does not come out smaller.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageResult};

/// Returns the smallest publishable encoding of `bytes`.
pub fn optimize_image(bytes: Vec<u8>, jpeg_quality: u8) -> ImageResult<Vec<u8>> {
    let format = match image::guess_format(&bytes) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => format,
        _ => return Ok(bytes),
    };

    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let encoded = match format {
        ImageFormat::Png => encode_png(&decoded)?,
        _ => encode_jpeg(&decoded, jpeg_quality)?,
    };

    if encoded.len() < bytes.len() {
        Ok(encoded)
    } else {
        Ok(bytes)
    }
}

fn encode_png(image: &DynamicImage) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;
    Ok(out)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::{CompressionType, FilterType};
    use image::{ImageEncoder, Rgb, RgbImage};

    fn gradient() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
    }

    fn uncompressed_png() -> Vec<u8> {
        let image = gradient();
        let mut bytes = Vec::new();
        PngEncoder::new_with_quality(&mut bytes, CompressionType::Fast, FilterType::NoFilter)
            .write_image(image.as_raw(), image.width(), image.height(), image::ColorType::Rgb8)
            .unwrap();
        bytes
    }

    #[test]
    fn png_output_is_never_larger_and_still_decodes() {
        let input = uncompressed_png();
        let output = optimize_image(input.clone(), 85).unwrap();

        assert!(output.len() <= input.len());
        let decoded = image::load_from_memory(&output).unwrap().to_rgb8();
        assert_eq!(decoded, gradient());
    }

    #[test]
    fn jpeg_is_reencoded_at_the_requested_quality() {
        let mut input = Vec::new();
        JpegEncoder::new_with_quality(&mut input, 100)
            .encode_image(&DynamicImage::ImageRgb8(gradient()))
            .unwrap();

        let output = optimize_image(input.clone(), 40).unwrap();

        assert!(output.len() < input.len());
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn other_formats_pass_through() {
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec();
        assert_eq!(optimize_image(svg.clone(), 85).unwrap(), svg);

        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();
        assert_eq!(optimize_image(gif.clone(), 85).unwrap(), gif);
    }

    #[test]
    fn truncated_png_is_an_error() {
        let mut input = uncompressed_png();
        input.truncate(40);
        assert!(optimize_image(input, 85).is_err());
    }
}
