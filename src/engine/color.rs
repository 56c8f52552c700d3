// src/engine/color.rs
//
// ICC colour transforms (moxcms). Pixels are converted in place between an
// embedded/source profile and a destination profile, 8 bits per channel.

use crate::engine::backend::EngineError;
use crate::engine::common::{run_guarded, EngineResult};
use crate::ops::RenderingIntent;
use image::{DynamicImage, RgbImage, RgbaImage};
use moxcms::{ColorProfile, DataColorSpace, Layout, TransformOptions};

fn cms_intent(intent: RenderingIntent) -> moxcms::RenderingIntent {
    match intent {
        RenderingIntent::Perceptual => moxcms::RenderingIntent::Perceptual,
        RenderingIntent::RelativeColorimetric => moxcms::RenderingIntent::RelativeColorimetric,
        RenderingIntent::Saturation => moxcms::RenderingIntent::Saturation,
        RenderingIntent::AbsoluteColorimetric => moxcms::RenderingIntent::AbsoluteColorimetric,
    }
}

/// Parse an ICC profile. `None` when moxcms cannot interpret it.
pub fn parse_profile(icc: &[u8]) -> Option<ColorProfile> {
    ColorProfile::new_from_slice(icc).ok()
}

/// Parse a profile and keep it only if it describes RGB data, the only
/// layout `convert` drives.
pub fn parse_rgb_profile(icc: &[u8]) -> Option<ColorProfile> {
    parse_profile(icc).filter(|profile| profile.color_space == DataColorSpace::Rgb)
}

/// Convert `img` from `src` to `dst`. Grey and 16-bit images are widened to
/// 8-bit RGB(A) first; alpha is carried through untouched.
pub fn convert(
    img: DynamicImage,
    src: &ColorProfile,
    dst: &ColorProfile,
    intent: RenderingIntent,
) -> EngineResult<DynamicImage> {
    run_guarded("icc", || {
        let options = TransformOptions {
            rendering_intent: cms_intent(intent),
            ..TransformOptions::default()
        };
        let cms_err = |e: moxcms::CmsError| EngineError::new(format!("icc: {e:?}"));

        if img.color().has_alpha() {
            let rgba = img.into_rgba8();
            let (w, h) = rgba.dimensions();
            let transform = src
                .create_transform_8bit(Layout::Rgba, dst, Layout::Rgba, options)
                .map_err(cms_err)?;
            let mut out = vec![0u8; rgba.as_raw().len()];
            transform.transform(rgba.as_raw(), &mut out).map_err(cms_err)?;
            RgbaImage::from_raw(w, h, out)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(|| EngineError::new("icc: rgba buffer size mismatch"))
        } else {
            let rgb = img.into_rgb8();
            let (w, h) = rgb.dimensions();
            let transform = src
                .create_transform_8bit(Layout::Rgb, dst, Layout::Rgb, options)
                .map_err(cms_err)?;
            let mut out = vec![0u8; rgb.as_raw().len()];
            transform.transform(rgb.as_raw(), &mut out).map_err(cms_err)?;
            RgbImage::from_raw(w, h, out)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| EngineError::new("icc: rgb buffer size mismatch"))
        }
    })
}

/// sRGB working space used after import.
pub fn working_space() -> ColorProfile {
    ColorProfile::new_srgb()
}
