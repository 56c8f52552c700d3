// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg, with DCT pre-scale), PNG (zune-png),
// WebP (libwebp), GIF (image crate, first frame). Also the cheap header probe
// and EXIF orientation used by the validator.

use crate::engine::backend::{EngineError, Probe};
use crate::engine::common::{run_guarded, EngineResult};
use crate::engine::MAX_DIMENSION;
use crate::ops::{Format, Orientation};
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, Limits, RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::bytestream::ZCursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

/// Read format, stored dimensions and EXIF orientation without decoding pixels.
pub fn probe(data: &[u8]) -> EngineResult<Probe> {
    run_guarded("probe", || {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| EngineError::new(format!("probe: {e}")))?;
        let format = match reader.format() {
            Some(ImageFormat::Jpeg) => Format::Jpeg,
            Some(ImageFormat::Png) => Format::Png,
            Some(ImageFormat::Gif) => Format::Gif,
            Some(ImageFormat::WebP) => Format::Webp,
            Some(other) => {
                return Err(EngineError::new(format!(
                    "probe: unsupported container {other:?}"
                )))
            }
            None => return Err(EngineError::new("probe: unrecognized container")),
        };
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| EngineError::new(format!("probe: {e}")))?;
        let orientation = match format {
            Format::Gif => Orientation::Normal,
            _ => detect_exif_orientation(data),
        };
        Ok(Probe {
            width,
            height,
            format,
            orientation,
        })
    })
}

/// Decode `data` as `format`, pre-scaling JPEG by `1/shrink` in the DCT.
pub fn decode(data: &[u8], format: Format, shrink: u32) -> EngineResult<DynamicImage> {
    match format {
        Format::Jpeg => decode_jpeg_mozjpeg(data, shrink),
        Format::Png => decode_png_zune(data),
        Format::Webp => decode_webp_libwebp(data),
        Format::Gif => decode_gif(data),
        Format::Unknown => Err(EngineError::new("decode: unknown format")),
    }
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo).
///
/// `shrink` of 2, 4 or 8 makes libjpeg produce a 1/2, 1/4 or 1/8 scale
/// image directly, which is far cheaper than decoding at full size.
pub fn decode_jpeg_mozjpeg(data: &[u8], shrink: u32) -> EngineResult<DynamicImage> {
    run_guarded("decode:jpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(EngineError::new("jpeg: missing EOI marker"));
        }

        let mut decompress = Decompress::new_mem(data)
            .map_err(|e| EngineError::new(format!("jpeg: decompress init failed: {e:?}")))?;

        check_dimensions(decompress.width() as u32, decompress.height() as u32)?;

        let numerator = match shrink {
            8 => 1,
            4 => 2,
            2 => 4,
            _ => 8,
        };
        decompress.scale(numerator);

        let mut decompress = decompress
            .rgb()
            .map_err(|e| EngineError::new(format!("jpeg: rgb conversion failed: {e:?}")))?;

        let width = decompress.width() as u32;
        let height = decompress.height() as u32;
        check_dimensions(width, height)?;

        let pixels: Vec<[u8; 3]> = decompress
            .read_scanlines()
            .map_err(|e| EngineError::new(format!("jpeg: failed to read scanlines: {e:?}")))?;
        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        RgbImage::from_raw(width, height, flat_pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| EngineError::new("jpeg: scanlines do not fill the image"))
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped to 8-bit.
pub fn decode_png_zune(data: &[u8]) -> EngineResult<DynamicImage> {
    run_guarded("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);
        decoder
            .decode_headers()
            .map_err(|e| EngineError::new(format!("png: bad header: {e}")))?;

        let info = decoder
            .info()
            .ok_or_else(|| EngineError::new("png: missing header info"))?;
        let width = info.width as u32;
        let height = info.height as u32;
        check_dimensions(width, height)?;

        let pixels = decoder
            .decode()
            .map_err(|e| EngineError::new(format!("png: decode failed: {e}")))?;
        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => return Err(EngineError::new("png: unexpected non-U8 pixel buffer")),
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| EngineError::new("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8),
            ColorSpace::RGBA => {
                RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
            }
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8),
            ColorSpace::LumaA => {
                GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
            }
            other => {
                return Err(EngineError::new(format!(
                    "png: unsupported colorspace {other:?}"
                )))
            }
        };
        img.ok_or_else(|| EngineError::new(format!("png: buffer does not match {colorspace:?}")))
    })
}

/// Decode WebP using libwebp. Animated files fall back to the image crate,
/// which yields the first frame.
pub fn decode_webp_libwebp(data: &[u8]) -> EngineResult<DynamicImage> {
    run_guarded("decode:webp", || {
        // Parse the header first to avoid allocating huge buffers on malformed files
        let features = BitstreamFeatures::new(data)
            .ok_or_else(|| EngineError::new("webp: failed to read bitstream features"))?;
        check_dimensions(features.width(), features.height())?;

        if features.has_animation() {
            return decode_with_limits(data, ImageFormat::WebP);
        }

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| EngineError::new("webp: decode failed"))?;
        check_dimensions(decoded.width(), decoded.height())?;

        Ok(decoded.to_image())
    })
}

/// Decode the first GIF frame.
pub fn decode_gif(data: &[u8]) -> EngineResult<DynamicImage> {
    run_guarded("decode:gif", || decode_with_limits(data, ImageFormat::Gif))
}

fn decode_with_limits(data: &[u8], format: ImageFormat) -> EngineResult<DynamicImage> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);

    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    reader.limits(limits);
    reader
        .decode()
        .map_err(|e| EngineError::new(format!("{format:?}: decode failed: {e}")))
}

/// Reject decoded sizes outside the accepted range. Decoders re-check what
/// they actually produced, not only what the header claimed.
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width == 0 || height == 0 {
        return Err(EngineError::new(format!(
            "image dimensions {width}x{height} are empty"
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(EngineError::new(format!(
            "image dimensions {width}x{height} exceed max {MAX_DIMENSION}"
        )));
    }
    Ok(())
}

/// Extract the EXIF Orientation tag. Missing or invalid tags read as `Normal`.
pub fn detect_exif_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    exif::Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from_exif)
        .unwrap_or_default()
}

/// Rotate/flip `img` so it displays upright.
pub fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipH => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipV => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90 => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270 => img.rotate270(),
    }
}
