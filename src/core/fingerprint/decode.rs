//! Image decoding behind a narrow `decode(bytes) -> Option<Image>`
//! seam: zune-jpeg on the JPEG fast path (direct-to-luma, roughly
//! twice as fast as the general decoder), the `image` crate for
//! everything else it recognizes.

use image::{DynamicImage, GrayImage};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

use super::ImageType;

/// A decoded image: dimensions plus a full-resolution grayscale buffer.
/// The collector downsamples this to 256x256 before building the
/// pyramid.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub gray: GrayImage,
    pub image_type: ImageType,
}

/// Trait for pluggable decoders, so tests can substitute a fixture
/// decoder without touching real codecs.
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8], image_type: ImageType) -> Option<DecodedImage>;
}

impl<D: Decoder + ?Sized> Decoder for std::sync::Arc<D> {
    fn decode(&self, bytes: &[u8], image_type: ImageType) -> Option<DecodedImage> {
        (**self).decode(bytes, image_type)
    }
}

/// Default decoder: zune-jpeg for JPEG, the `image` crate for
/// everything else it recognizes.
#[derive(Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_jpeg(bytes: &[u8]) -> Option<DynamicImage> {
        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::Luma);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);
        let pixels = decoder.decode().ok()?;
        let info = decoder.info()?;
        let (width, height) = (info.width as u32, info.height as u32);
        let buffer = image::ImageBuffer::from_raw(width, height, pixels)?;
        Some(DynamicImage::ImageLuma8(buffer))
    }

    fn decode_fallback(bytes: &[u8]) -> Option<DynamicImage> {
        image::load_from_memory(bytes).ok()
    }
}

impl Decoder for ImageDecoder {
    fn decode(&self, bytes: &[u8], image_type: ImageType) -> Option<DecodedImage> {
        let decoded = match image_type {
            ImageType::Jpeg => Self::decode_jpeg(bytes).or_else(|| Self::decode_fallback(bytes)),
            _ => Self::decode_fallback(bytes),
        }?;

        if decoded.width() == 0 || decoded.height() == 0 {
            return None;
        }

        Some(DecodedImage {
            width: decoded.width(),
            height: decoded.height(),
            gray: decoded.to_luma8(),
            image_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pixel_png() -> Vec<u8> {
        use image::{ImageBuffer, Luma};
        let buf: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Luma([128]));
        let mut out = Vec::new();
        DynamicImage::ImageLuma8(buf)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn decodes_valid_png() {
        let decoder = ImageDecoder::new();
        let bytes = one_pixel_png();
        let decoded = decoder.decode(&bytes, ImageType::Png).unwrap();
        assert_eq!(decoded.width, 4);
        assert_eq!(decoded.height, 4);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let decoder = ImageDecoder::new();
        assert!(decoder.decode(&[0, 1, 2, 3], ImageType::Jpeg).is_none());
    }
}
