// src/engine/options.rs
//
// Option resolution: turns caller intent plus validated metadata into a
// fully-populated, range-checked request. Nothing here touches pixels.

use crate::engine::backend::EncodeParams;
use crate::engine::geometry::scale_aspect;
use crate::engine::io::validate_icc_profile;
use crate::engine::{
    DEFAULT_COMPRESSION, DEFAULT_QUALITY, MAX_BLUR_SIGMA, MAX_DIMENSION, MIN_DIMENSION,
};
use crate::error::{Result, ThumbgateError};
use crate::ops::{CropAnchor, Format, Metadata, Options, RenderingIntent};
use std::sync::Arc;

/// JPEG decoders can pre-scale by up to 1/8 in each direction.
const JPEG_MAX_SHRINK: u32 = 8;

/// Largest meaningful bits-per-pixel budget for lossless WebP (8-bit RGBA).
const MAX_LOSSLESS_BITS_PER_PIXEL: u32 = 32;

/// Options with every default applied and every range checked.
///
/// Only [`resolve`] builds these. `to_options` gives back the request form,
/// and resolving that again yields an identical value.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedOptions {
    source: Metadata,
    width: u32,
    height: u32,
    crop: bool,
    crop_anchor: CropAnchor,
    max_buffer_pixels: u64,
    sharpen: bool,
    blur_sigma: f64,
    auto_contrast: bool,
    format: Format,
    quality: u8,
    compression: u8,
    lossless_max_bits_per_pixel: u32,
    output_profile: Option<Arc<[u8]>>,
    rendering_intent: RenderingIntent,
    shrink: u32,
}

impl ResolvedOptions {
    /// Metadata of the source these options were resolved against.
    pub fn source(&self) -> &Metadata {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn crop(&self) -> bool {
        self.crop
    }

    pub fn crop_anchor(&self) -> CropAnchor {
        self.crop_anchor
    }

    pub fn max_buffer_pixels(&self) -> u64 {
        self.max_buffer_pixels
    }

    pub fn sharpen(&self) -> bool {
        self.sharpen
    }

    pub fn blur_sigma(&self) -> f64 {
        self.blur_sigma
    }

    pub fn auto_contrast(&self) -> bool {
        self.auto_contrast
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn compression(&self) -> u8 {
        self.compression
    }

    pub fn lossless_max_bits_per_pixel(&self) -> u32 {
        self.lossless_max_bits_per_pixel
    }

    pub fn output_profile(&self) -> Option<&[u8]> {
        self.output_profile.as_deref()
    }

    pub fn rendering_intent(&self) -> RenderingIntent {
        self.rendering_intent
    }

    /// Decode pre-scale factor: 1, 2, 4 or 8.
    pub fn shrink(&self) -> u32 {
        self.shrink
    }

    /// Size the image is resized to before any crop.
    pub fn resize_target(&self) -> (u32, u32) {
        scale_aspect(
            self.source.width,
            self.source.height,
            self.width,
            self.height,
            !self.crop,
        )
    }

    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            format: self.format,
            quality: self.quality,
            compression: self.compression,
            lossless_max_bits_per_pixel: self.lossless_max_bits_per_pixel,
        }
    }

    /// The request form of these options.
    pub fn to_options(&self) -> Options {
        Options {
            width: self.width,
            height: self.height,
            crop: self.crop,
            crop_anchor: self.crop_anchor,
            max_buffer_pixels: self.max_buffer_pixels,
            sharpen: self.sharpen,
            blur_sigma: self.blur_sigma,
            auto_contrast: self.auto_contrast,
            format: self.format,
            quality: self.quality,
            compression: self.compression,
            lossless_max_bits_per_pixel: self.lossless_max_bits_per_pixel,
            output_profile: self.output_profile.clone(),
            rendering_intent: self.rendering_intent,
        }
    }
}

/// Resolve `options` against validated `meta`.
///
/// Checks run in a fixed order and the first failure wins. `meta` is not
/// trusted: its format and dimensions are checked again here.
pub fn resolve(options: &Options, meta: &Metadata) -> Result<ResolvedOptions> {
    if meta.format == Format::Unknown {
        return Err(ThumbgateError::unknown_format("source format is unknown"));
    }
    check_source_dimensions(meta)?;

    let format = if options.format == Format::Unknown {
        meta.format.preferred_output()
    } else {
        options.format
    };
    if !format.can_save() {
        return Err(ThumbgateError::unknown_format(format!(
            "cannot encode {format} output"
        )));
    }

    let mut width = if options.width == 0 {
        meta.width
    } else {
        options.width
    };
    let mut height = if options.height == 0 {
        meta.height
    } else {
        options.height
    };
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ThumbgateError::too_big(format!(
            "requested {width}x{height} exceeds {MAX_DIMENSION}"
        )));
    }

    // Never upsample a crop: shrink the window to fit the source.
    if options.crop && (width > meta.width || height > meta.height) {
        (width, height) = scale_aspect(width, height, meta.width, meta.height, true);
    }

    check_buffer_budget(options.max_buffer_pixels, meta)?;

    let quality = match options.quality {
        0 => DEFAULT_QUALITY,
        q if q > 100 => {
            return Err(ThumbgateError::bad_option(
                "quality",
                q.to_string(),
                "must be within 1..=100",
            ))
        }
        q => q,
    };

    let compression = match options.compression {
        0 => DEFAULT_COMPRESSION,
        c if c > 9 => {
            return Err(ThumbgateError::bad_option(
                "compression",
                c.to_string(),
                "must be within 1..=9",
            ))
        }
        c => c,
    };

    let blur_sigma = options.blur_sigma;
    if !(0.0..=MAX_BLUR_SIGMA).contains(&blur_sigma) {
        return Err(ThumbgateError::bad_option(
            "blur_sigma",
            blur_sigma.to_string(),
            format!("must be within 0..={MAX_BLUR_SIGMA}"),
        ));
    }

    if options.lossless_max_bits_per_pixel > MAX_LOSSLESS_BITS_PER_PIXEL {
        return Err(ThumbgateError::bad_option(
            "lossless_max_bits_per_pixel",
            options.lossless_max_bits_per_pixel.to_string(),
            format!("must be within 0..={MAX_LOSSLESS_BITS_PER_PIXEL}"),
        ));
    }

    if let Some(profile) = &options.output_profile {
        validate_icc_profile(profile)
            .and_then(|()| {
                // Colour space signature; thumbnails are always RGB.
                if &profile[16..20] == b"RGB " {
                    Ok(())
                } else {
                    Err("profile colour space is not RGB")
                }
            })
            .map_err(|reason| {
                ThumbgateError::bad_option(
                    "output_profile",
                    format!("{} bytes", profile.len()),
                    reason,
                )
            })?;
    }

    let resize_target = scale_aspect(meta.width, meta.height, width, height, !options.crop);
    let shrink = decode_shrink(meta, resize_target, options.max_buffer_pixels);

    tracing::trace!(
        width,
        height,
        crop = options.crop,
        format = %format,
        shrink,
        "options resolved"
    );

    Ok(ResolvedOptions {
        source: *meta,
        width,
        height,
        crop: options.crop,
        crop_anchor: options.crop_anchor,
        max_buffer_pixels: options.max_buffer_pixels,
        sharpen: options.sharpen,
        blur_sigma,
        auto_contrast: options.auto_contrast,
        format,
        quality,
        compression,
        lossless_max_bits_per_pixel: options.lossless_max_bits_per_pixel,
        output_profile: options.output_profile.clone(),
        rendering_intent: options.rendering_intent,
        shrink,
    })
}

pub(crate) fn check_source_dimensions(meta: &Metadata) -> Result<()> {
    if meta.width < MIN_DIMENSION || meta.height < MIN_DIMENSION {
        return Err(ThumbgateError::too_small(format!(
            "{}x{} is below {MIN_DIMENSION}",
            meta.width, meta.height
        )));
    }
    if meta.width > MAX_DIMENSION || meta.height > MAX_DIMENSION {
        return Err(ThumbgateError::too_big(format!(
            "{}x{} exceeds {MAX_DIMENSION}",
            meta.width, meta.height
        )));
    }
    Ok(())
}

// The budget assumes JPEG sources can be decoded at 1/8 scale.
fn check_buffer_budget(max_buffer_pixels: u64, meta: &Metadata) -> Result<()> {
    if max_buffer_pixels == 0 {
        return Ok(());
    }
    let scale = if meta.format == Format::Jpeg {
        u64::from(JPEG_MAX_SHRINK)
    } else {
        1
    };
    let pixels = u64::from(meta.width) * u64::from(meta.height);
    let budget = max_buffer_pixels.saturating_mul(scale * scale);
    if pixels > budget {
        return Err(ThumbgateError::too_big(format!(
            "{}x{} ({pixels} pixels) exceeds decode budget of {budget} pixels",
            meta.width, meta.height
        )));
    }
    Ok(())
}

// The larger of the shrink that still covers the target and the shrink that
// fits the decoded raster inside the pixel budget.
fn decode_shrink(meta: &Metadata, target: (u32, u32), max_buffer_pixels: u64) -> u32 {
    if meta.format != Format::Jpeg {
        return 1;
    }
    let (need_w, need_h) = target;
    let target_shrink = [8, 4, 2]
        .into_iter()
        .find(|s| meta.width / s >= need_w && meta.height / s >= need_h)
        .unwrap_or(1);
    target_shrink.max(budget_shrink(meta, max_buffer_pixels))
}

// A scaled JPEG decode yields ceil(w/s) x ceil(h/s) pixels.
fn budget_shrink(meta: &Metadata, max_buffer_pixels: u64) -> u32 {
    if max_buffer_pixels == 0 {
        return 1;
    }
    [1, 2, 4]
        .into_iter()
        .find(|&s| {
            let pixels =
                u64::from(meta.width.div_ceil(s)) * u64::from(meta.height.div_ceil(s));
            pixels <= max_buffer_pixels
        })
        .unwrap_or(JPEG_MAX_SHRINK)
}
