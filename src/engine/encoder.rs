// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (image + oxipng), WebP (libwebp),
// and ICC profile embedding via img-parts.

use crate::engine::backend::EngineError;
use crate::engine::common::{run_guarded, EngineResult};
use crate::engine::MAX_DIMENSION;
use crate::ops::Format;
use image::{DynamicImage, ImageFormat};
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, Bytes, ImageICC};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::borrow::Cow;
use std::io::Cursor;

/// Derives per-format encoder knobs from a 1-100 quality value.
/// - High (>=85): favour visual quality
/// - Balanced (70-84)
/// - Fast (<70): favour speed and size
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
}

impl QualitySettings {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: f32::from(quality.clamp(1, 100)),
        }
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 85.0 {
            QualityBand::High
        } else if self.quality >= 70.0 {
            QualityBand::Balanced
        } else {
            QualityBand::Fast
        }
    }

    pub fn jpeg_smoothing(&self) -> u8 {
        if self.quality >= 90.0 {
            0
        } else if self.quality >= 70.0 {
            5
        } else if self.quality >= 60.0 {
            10
        } else {
            18
        }
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 80.0 {
            20
        } else if self.quality >= 60.0 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            QualityBand::Balanced | QualityBand::Fast => 0,
        }
    }
}

/// Encode to progressive JPEG with optimized Huffman tables and scans.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> EngineResult<Vec<u8>> {
    run_guarded("encode:jpeg", || {
        // Avoid the conversion when already RGB8
        let rgb: Cow<'_, image::RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
            _ => Cow::Owned(img.to_rgb8()),
        };
        let (w, h) = rgb.dimensions();
        check_encodable(w, h)?;

        let pixels: &[u8] = rgb.as_raw();
        let settings = QualitySettings::new(quality);

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(settings.quality);
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
        comp.set_smoothing_factor(settings.jpeg_smoothing());

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);
        {
            let mut writer = comp
                .start_compress(&mut output)
                .map_err(|e| EngineError::new(format!("jpeg: failed to start compress: {e:?}")))?;
            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    EngineError::new(format!("jpeg: failed to write scanlines: {e:?}"))
                })?;
            }
            writer
                .finish()
                .map_err(|e| EngineError::new(format!("jpeg: failed to finish: {e:?}")))?;
        }
        Ok(output)
    })
}

/// Encode to PNG, then recompress losslessly with oxipng at `compression`
/// (1 = fastest, 9 = smallest).
pub fn encode_png(img: &DynamicImage, compression: u8) -> EngineResult<Vec<u8>> {
    run_guarded("encode:png", || {
        check_encodable(img.width(), img.height())?;

        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| EngineError::new(format!("png: encode failed: {e}")))?;

        let mut options = oxipng::Options::from_preset(2);
        options.deflater = oxipng::Deflater::Libdeflater {
            compression: compression.clamp(1, 9),
        };
        // The ICC profile, if any, is embedded afterwards.
        options.strip = oxipng::StripChunks::None;

        oxipng::optimize_from_memory(&buf, &options)
            .map_err(|e| EngineError::new(format!("png: oxipng optimization failed: {e}")))
    })
}

/// Encode to WebP.
///
/// With `lossless_max_bits_per_pixel > 0` a lossless encode is tried first
/// and kept when it costs at most that many bits per pixel; otherwise the
/// lossy encode at `quality` is used.
pub fn encode_webp(
    img: &DynamicImage,
    quality: u8,
    lossless_max_bits_per_pixel: u32,
) -> EngineResult<Vec<u8>> {
    run_guarded("encode:webp", || {
        let (w, h) = (img.width(), img.height());
        check_encodable(w, h)?;

        // Only carry an alpha channel when the source has one.
        let pixels: Cow<'_, [u8]> = match img {
            DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb.as_raw()),
            DynamicImage::ImageRgba8(rgba) => Cow::Borrowed(rgba.as_raw()),
            _ if img.color().has_alpha() => Cow::Owned(img.to_rgba8().into_raw()),
            _ => Cow::Owned(img.to_rgb8().into_raw()),
        };
        let encoder = if img.color().has_alpha() {
            webp::Encoder::from_rgba(&pixels, w, h)
        } else {
            webp::Encoder::from_rgb(&pixels, w, h)
        };

        if lossless_max_bits_per_pixel > 0 {
            let lossless = encoder.encode_lossless();
            let budget_bits =
                u64::from(w) * u64::from(h) * u64::from(lossless_max_bits_per_pixel);
            if (lossless.len() as u64).saturating_mul(8) <= budget_bits {
                tracing::trace!(bytes = lossless.len(), "webp: lossless within budget");
                return Ok(lossless.to_vec());
            }
        }

        let settings = QualitySettings::new(quality);
        let mut config = webp::WebPConfig::new()
            .map_err(|_| EngineError::new("webp: failed to create WebPConfig"))?;
        config.quality = settings.quality;
        config.method = 4;
        config.pass = 1;
        config.preprocessing = 0;
        config.sns_strength = settings.webp_sns_strength();
        config.autofilter = 1;
        config.filter_strength = settings.webp_filter_strength();
        config.filter_sharpness = settings.webp_filter_sharpness();

        let mem = encoder
            .encode_advanced(&config)
            .map_err(|e| EngineError::new(format!("webp: encode failed: {e:?}")))?;
        Ok(mem.to_vec())
    })
}

/// Embed `icc` into already-encoded `data` of the given format.
pub fn embed_icc(data: Vec<u8>, format: Format, icc: &[u8]) -> EngineResult<Vec<u8>> {
    run_guarded("encode:embed_icc", || {
        let bytes = Bytes::from(data);
        let profile = Some(Bytes::copy_from_slice(icc));
        let mut output = Vec::new();
        let written = match format {
            Format::Jpeg => {
                let mut jpeg = Jpeg::from_bytes(bytes)
                    .map_err(|e| EngineError::new(format!("jpeg: reparse for ICC failed: {e}")))?;
                jpeg.set_icc_profile(profile);
                jpeg.encoder().write_to(&mut output)
            }
            Format::Png => {
                let mut png = Png::from_bytes(bytes)
                    .map_err(|e| EngineError::new(format!("png: reparse for ICC failed: {e}")))?;
                png.set_icc_profile(profile);
                png.encoder().write_to(&mut output)
            }
            Format::Webp => {
                let mut webp = WebP::from_bytes(bytes)
                    .map_err(|e| EngineError::new(format!("webp: reparse for ICC failed: {e}")))?;
                webp.set_icc_profile(profile);
                webp.encoder().write_to(&mut output)
            }
            Format::Gif | Format::Unknown => {
                return Err(EngineError::new(format!("cannot embed ICC into {format}")))
            }
        };
        written.map_err(|e| EngineError::new(format!("{format}: failed to write ICC: {e}")))?;
        Ok(output)
    })
}

fn check_encodable(width: u32, height: u32) -> EngineResult<()> {
    if width == 0 || height == 0 {
        return Err(EngineError::new("cannot encode an empty image"));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(EngineError::new(format!(
            "cannot encode {width}x{height}: exceeds {MAX_DIMENSION}"
        )));
    }
    Ok(())
}
