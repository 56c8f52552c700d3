// src/ops.rs
//
// Request-side types: formats, orientation and caller options.
// These are plain values - the expensive work happens in the pipeline.

use std::fmt;
use std::sync::Arc;

/// Container formats the core recognizes.
///
/// `Unknown` is a legitimate detection outcome but never a valid
/// post-validation format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    #[default]
    Unknown,
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl Format {
    /// Whether the engine may be asked to encode this format.
    pub fn can_save(self) -> bool {
        matches!(self, Format::Jpeg | Format::Png | Format::Webp)
    }

    /// Output format to use when the caller did not pick one.
    /// GIF output is never produced; GIF sources become PNG.
    pub fn preferred_output(self) -> Format {
        match self {
            Format::Gif => Format::Png,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Unknown => "unknown",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::Webp => "webp",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EXIF orientation (tag 0x0112). Values outside 1..=8 are treated as `Normal`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Normal,
    FlipH,
    Rotate180,
    FlipV,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Orientation {
    pub fn from_exif(value: u32) -> Orientation {
        match value {
            2 => Orientation::FlipH,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipV,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270,
            _ => Orientation::Normal,
        }
    }

    /// Whether applying this orientation swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90
                | Orientation::Transverse
                | Orientation::Rotate270
        )
    }

    /// Dimensions as displayed once the orientation has been applied.
    pub fn display_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Where the crop window sits vertically; it is always centered horizontally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CropAnchor {
    #[default]
    Center,
    Top,
}

/// ICC rendering intent for output profile transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderingIntent {
    #[default]
    Perceptual,
    RelativeColorimetric,
    Saturation,
    AbsoluteColorimetric,
}

/// Validated description of a source image.
///
/// Only [`crate::engine::Thumbnailer::validate`] creates these from bytes; the
/// width and height are display dimensions (after EXIF orientation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub orientation: Orientation,
}

impl Metadata {
    pub fn new(width: u32, height: u32, format: Format) -> Self {
        Self {
            width,
            height,
            format,
            orientation: Orientation::Normal,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

/// Caller intent for one thumbnail request.
///
/// Every field is optional; zero values mean "use the default":
/// - `width`/`height` 0: source dimension
/// - `max_buffer_pixels` 0: no decode budget
/// - `format` `Unknown`: infer from the source
/// - `quality` 0: 85, `compression` 0: 6
/// - `lossless_max_bits_per_pixel` 0: never try lossless WebP
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options {
    pub width: u32,
    pub height: u32,
    pub crop: bool,
    pub crop_anchor: CropAnchor,
    pub max_buffer_pixels: u64,
    pub sharpen: bool,
    pub blur_sigma: f64,
    pub auto_contrast: bool,
    pub format: Format,
    pub quality: u8,
    pub compression: u8,
    pub lossless_max_bits_per_pixel: u32,
    /// ICC profile the output is transformed into (and tagged with).
    pub output_profile: Option<Arc<[u8]>>,
    pub rendering_intent: RenderingIntent,
}

impl Options {
    /// Fit inside `width`x`height`.
    pub fn fit(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Fill `width`x`height` exactly, cropping the overflow.
    pub fn crop(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            crop: true,
            ..Self::default()
        }
    }
}
