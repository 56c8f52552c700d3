// src/engine/native.rs
//
// NativeEngine: the production ImageEngine, built from the decoder, encoder,
// resize and color modules. Handles own a decoded DynamicImage plus the
// colour profiles that travel with it.

use crate::engine::backend::{EncodeParams, EngineError, ImageEngine, Probe};
use crate::engine::color;
use crate::engine::common::run_guarded;
use crate::engine::decoder;
use crate::engine::detect::detect_formats;
use crate::engine::encoder::{embed_icc, encode_jpeg, encode_png, encode_webp};
use crate::engine::io::extract_icc_profile;
use crate::engine::resize::fast_resize_owned;
use crate::ops::{Format, Orientation, RenderingIntent};
use image::{DynamicImage, GenericImageView};

/// Unsharp 3x3 kernel; filter3x3 normalizes it by its sum (24).
const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 32.0, -1.0, -1.0, -1.0, -1.0];

/// Working image for one request.
#[derive(Debug)]
pub struct NativeHandle {
    image: DynamicImage,
    /// Embedded profile of the source, until imported into sRGB.
    embedded_icc: Option<Vec<u8>>,
    /// Profile the output is tagged with.
    output_icc: Option<Vec<u8>>,
}

impl NativeHandle {
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// `ImageEngine` backed by mozjpeg, zune-png, libwebp, the image crate,
/// fast_image_resize, oxipng and moxcms.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }

    fn map_image(
        handle: &mut NativeHandle,
        label: &'static str,
        f: impl FnOnce(DynamicImage) -> Result<DynamicImage, EngineError>,
    ) -> Result<(), EngineError> {
        // On failure the handle keeps an empty image and is only fit for release.
        let image = std::mem::replace(&mut handle.image, DynamicImage::new_rgb8(0, 0));
        handle.image = run_guarded(label, || f(image))?;
        Ok(())
    }
}

impl ImageEngine for NativeEngine {
    type Handle = NativeHandle;

    fn probe(&self, blob: &[u8]) -> Result<Probe, EngineError> {
        decoder::probe(blob)
    }

    fn decode(&self, blob: &[u8], shrink: u32) -> Result<NativeHandle, EngineError> {
        let format = detect_formats(blob).0;
        let image = decoder::decode(blob, format, shrink)?;
        Ok(NativeHandle {
            image,
            embedded_icc: extract_icc_profile(blob),
            output_icc: None,
        })
    }

    fn dimensions(&self, handle: &NativeHandle) -> (u32, u32) {
        handle.image.dimensions()
    }

    fn has_icc_profile(&self, handle: &NativeHandle) -> bool {
        handle.embedded_icc.is_some()
    }

    fn orient(&self, handle: &mut NativeHandle, orientation: Orientation) -> Result<(), EngineError> {
        Self::map_image(handle, "orient", |img| {
            Ok(decoder::apply_orientation(img, orientation))
        })
    }

    fn icc_import(&self, handle: &mut NativeHandle) -> Result<(), EngineError> {
        let Some(icc) = handle.embedded_icc.take() else {
            return Ok(());
        };
        // Profiles moxcms cannot model, and grey or CMYK profiles, are treated as sRGB.
        let Some(source) = color::parse_rgb_profile(&icc) else {
            tracing::debug!(bytes = icc.len(), "embedded ICC profile not usable, assuming sRGB");
            return Ok(());
        };
        let srgb = color::working_space();
        Self::map_image(handle, "icc_import", |img| {
            color::convert(img, &source, &srgb, RenderingIntent::Perceptual)
        })
    }

    fn icc_transform(
        &self,
        handle: &mut NativeHandle,
        profile: &[u8],
        intent: RenderingIntent,
    ) -> Result<(), EngineError> {
        let target = color::parse_rgb_profile(profile)
            .ok_or_else(|| EngineError::new("icc: output profile is not a usable RGB profile"))?;
        let source = handle
            .embedded_icc
            .take()
            .and_then(|icc| color::parse_rgb_profile(&icc))
            .unwrap_or_else(color::working_space);
        Self::map_image(handle, "icc_transform", |img| {
            color::convert(img, &source, &target, intent)
        })?;
        handle.output_icc = Some(profile.to_vec());
        Ok(())
    }

    fn resize(&self, handle: &mut NativeHandle, width: u32, height: u32) -> Result<(), EngineError> {
        Self::map_image(handle, "resize", |img| {
            fast_resize_owned(img, width, height).map_err(|e| EngineError::new(e.to_string()))
        })
    }

    fn crop(
        &self,
        handle: &mut NativeHandle,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError> {
        let (cur_w, cur_h) = handle.image.dimensions();
        let fits = width > 0
            && height > 0
            && left.checked_add(width).is_some_and(|r| r <= cur_w)
            && top.checked_add(height).is_some_and(|b| b <= cur_h);
        if !fits {
            return Err(EngineError::new(format!(
                "crop {width}x{height}+{left}+{top} outside {cur_w}x{cur_h}"
            )));
        }
        Self::map_image(handle, "crop", |img| Ok(img.crop_imm(left, top, width, height)))
    }

    fn sharpen(&self, handle: &mut NativeHandle) -> Result<(), EngineError> {
        Self::map_image(handle, "sharpen", |img| Ok(img.filter3x3(&SHARPEN_KERNEL)))
    }

    fn blur(&self, handle: &mut NativeHandle, sigma: f64) -> Result<(), EngineError> {
        Self::map_image(handle, "blur", |img| Ok(img.blur(sigma as f32)))
    }

    fn auto_contrast(&self, handle: &mut NativeHandle) -> Result<(), EngineError> {
        Self::map_image(handle, "auto_contrast", |img| Ok(stretch_contrast(img)))
    }

    fn encode(&self, handle: &NativeHandle, params: &EncodeParams) -> Result<Vec<u8>, EngineError> {
        let encoded = match params.format {
            Format::Jpeg => encode_jpeg(&handle.image, params.quality)?,
            Format::Png => encode_png(&handle.image, params.compression)?,
            Format::Webp => encode_webp(
                &handle.image,
                params.quality,
                params.lossless_max_bits_per_pixel,
            )?,
            Format::Gif | Format::Unknown => {
                return Err(EngineError::new(format!(
                    "cannot encode {} output",
                    params.format
                )))
            }
        };
        match &handle.output_icc {
            Some(icc) => embed_icc(encoded, params.format, icc),
            None => Ok(encoded),
        }
    }
}

/// Stretch the luminance range to 0..=255, applying the same linear map to
/// every colour channel. Alpha is left alone; flat images are unchanged.
fn stretch_contrast(img: DynamicImage) -> DynamicImage {
    let luma = img.to_luma8();
    let (lo, hi) = luma
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if hi <= lo || (lo == 0 && hi == u8::MAX) {
        return img;
    }

    let range = u32::from(hi - lo);
    let lut: Vec<u8> = (0..=255u32)
        .map(|v| {
            let shifted = v.saturating_sub(u32::from(lo));
            ((shifted * 255 + range / 2) / range).min(255) as u8
        })
        .collect();

    if img.color().has_alpha() {
        let mut rgba = img.into_rgba8();
        for p in rgba.pixels_mut() {
            for c in &mut p.0[..3] {
                *c = lut[usize::from(*c)];
            }
        }
        DynamicImage::ImageRgba8(rgba)
    } else {
        let mut rgb = img.into_rgb8();
        for p in rgb.pixels_mut() {
            for c in &mut p.0 {
                *c = lut[usize::from(*c)];
            }
        }
        DynamicImage::ImageRgb8(rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn handle(image: DynamicImage) -> NativeHandle {
        NativeHandle {
            image,
            embedded_icc: None,
            output_icc: None,
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 3) as u8, (y * 3) as u8, 60])
        }));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_decode_and_dimensions() {
        let engine = NativeEngine::new();
        let handle = engine.decode(&png(30, 20), 1).unwrap();
        assert_eq!(engine.dimensions(&handle), (30, 20));
        assert!(!engine.has_icc_profile(&handle));
        engine.release(handle);
    }

    #[test]
    fn test_decode_rejects_unknown_bytes() {
        assert!(NativeEngine.decode(b"plain text", 1).is_err());
    }

    #[test]
    fn test_crop_bounds_checked() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageRgb8(RgbImage::new(10, 10)));
        assert!(engine.crop(&mut h, 5, 5, 6, 5).is_err());
        assert!(engine.crop(&mut h, 0, 0, 0, 5).is_err());
        assert!(engine.crop(&mut h, u32::MAX, 0, 2, 2).is_err());
        engine.crop(&mut h, 2, 3, 8, 7).unwrap();
        assert_eq!(engine.dimensions(&h), (8, 7));
    }

    #[test]
    fn test_resize_and_orient() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageRgb8(RgbImage::new(40, 20)));
        engine.orient(&mut h, Orientation::Rotate90).unwrap();
        assert_eq!(engine.dimensions(&h), (20, 40));
        engine.resize(&mut h, 10, 20).unwrap();
        assert_eq!(engine.dimensions(&h), (10, 20));
    }

    #[test]
    fn test_sharpen_keeps_flat_image() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 6, Rgb([90, 90, 90]))));
        engine.sharpen(&mut h).unwrap();
        assert_eq!(h.image().to_rgb8().get_pixel(3, 3).0, [90, 90, 90]);
    }

    #[test]
    fn test_blur_softens_edges() {
        let engine = NativeEngine;
        let img = RgbImage::from_fn(16, 16, |x, _| if x < 8 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let mut h = handle(DynamicImage::ImageRgb8(img));
        engine.blur(&mut h, 2.0).unwrap();
        let edge = h.image().to_rgb8().get_pixel(8, 8).0[0];
        assert!(edge > 0 && edge < 255);
    }

    #[test]
    fn test_auto_contrast_stretches_range() {
        let img = RgbImage::from_fn(4, 1, |x, _| {
            let v = 100 + x as u8 * 10;
            Rgb([v, v, v])
        });
        let out = stretch_contrast(DynamicImage::ImageRgb8(img)).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(3, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_auto_contrast_leaves_flat_and_alpha() {
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([40, 40, 40])));
        assert_eq!(stretch_contrast(flat.clone()), flat);

        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([50, 50, 50, 10])
            } else {
                Rgba([150, 150, 150, 200])
            }
        });
        let out = stretch_contrast(DynamicImage::ImageRgba8(img)).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 10]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 255, 200]);
    }

    #[test]
    fn test_encode_each_format() {
        let engine = NativeEngine;
        let h = engine.decode(&png(12, 8), 1).unwrap();
        for format in [Format::Jpeg, Format::Png, Format::Webp] {
            let params = EncodeParams {
                format,
                quality: 80,
                compression: 6,
                lossless_max_bits_per_pixel: 0,
            };
            let bytes = engine.encode(&h, &params).unwrap();
            assert_eq!(detect_formats(&bytes).0, format);
        }
        let gif = EncodeParams {
            format: Format::Gif,
            quality: 80,
            compression: 6,
            lossless_max_bits_per_pixel: 0,
        };
        assert!(engine.encode(&h, &gif).is_err());
    }

    #[test]
    fn test_icc_import_without_profile_is_noop() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))));
        engine.icc_import(&mut h).unwrap();
        assert_eq!(h.image().to_rgb8().get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn test_unparseable_embedded_profile_is_skipped() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))));
        h.embedded_icc = Some(crate::engine::io::tests::minimal_icc(128));
        engine.icc_import(&mut h).unwrap();
        assert!(!engine.has_icc_profile(&h));
        assert_eq!(h.image().to_rgb8().get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn test_grey_embedded_profile_is_skipped() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            4,
            4,
            image::Luma([90]),
        )));
        h.embedded_icc = Some(moxcms::ColorProfile::new_gray_with_gamma(2.2).encode().unwrap());
        engine.icc_import(&mut h).unwrap();
        assert!(!engine.has_icc_profile(&h));
        assert_eq!(h.image().to_luma8().get_pixel(3, 3).0, [90]);
    }

    #[test]
    fn test_grey_embedded_profile_falls_back_to_srgb_source() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            4,
            4,
            image::Luma([90]),
        )));
        h.embedded_icc = Some(moxcms::ColorProfile::new_gray_with_gamma(2.2).encode().unwrap());
        let srgb = moxcms::ColorProfile::new_srgb().encode().unwrap();
        engine
            .icc_transform(&mut h, &srgb, RenderingIntent::Perceptual)
            .unwrap();
        let px = h.image().to_rgb8().get_pixel(0, 0).0;
        assert!(px.iter().all(|c| c.abs_diff(90) <= 2), "{px:?}");
    }

    #[test]
    fn test_icc_transform_rejects_grey_output_profile() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        let grey = moxcms::ColorProfile::new_gray_with_gamma(2.2).encode().unwrap();
        assert!(engine
            .icc_transform(&mut h, &grey, RenderingIntent::Perceptual)
            .is_err());
    }

    #[test]
    fn test_icc_transform_rejects_unparseable_profile() {
        let engine = NativeEngine;
        let mut h = handle(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        let bogus = crate::engine::io::tests::minimal_icc(128);
        assert!(engine
            .icc_transform(&mut h, &bogus, RenderingIntent::Perceptual)
            .is_err());
    }
}
