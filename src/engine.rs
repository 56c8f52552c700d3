// src/engine.rs
//
// The core of thumbgate. A guarded pipeline that:
// 1. Sniffs and cross-validates untrusted bytes before any pixel decode
// 2. Resolves caller options against validated metadata
// 3. Sequences the transform stages through an ImageEngine handle
//
// This file is a facade over the modules in engine/

use std::fmt;

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Smallest accepted width or height. 1-pixel images are rejected outright.
pub const MIN_DIMENSION: u32 = 2;

/// Largest accepted width or height, for sources and requested outputs alike.
/// Beyond this the engine's internal buffers risk overflowing their 16-bit
/// coordinate space.
pub const MAX_DIMENSION: u32 = 32766;

/// Output quality used when the request leaves it at 0.
pub const DEFAULT_QUALITY: u8 = 85;

/// PNG compression level used when the request leaves it at 0.
pub const DEFAULT_COMPRESSION: u8 = 6;

/// Upper bound for Gaussian blur sigma.
pub const MAX_BLUR_SIGMA: f64 = 8.0;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod backend;
mod color;
mod common;
mod decoder;
mod detect;
mod encoder;
mod firewall;
mod geometry;
mod io;
mod native;
mod options;
mod pipeline;
mod resize;
mod validate;

pub use api::Thumbnailer;
pub use backend::{EncodeParams, EngineError, ImageEngine, Probe};
pub use detect::detect_formats;
pub use firewall::{FirewallConfig, FirewallPolicy};
pub use geometry::scale_aspect;
pub use io::{extract_icc_profile, validate_icc_profile};
pub use native::{NativeEngine, NativeHandle};
pub use options::{resolve, ResolvedOptions};
pub use pipeline::{transform, ResultHandle, Thumbnail};
pub use validate::validate;

// =============================================================================
// STAGES
// =============================================================================

/// One step of the transform sequence. Carried by `StageFailed` errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Decode,
    Orient,
    IccImport,
    IccTransform,
    Resize,
    Crop,
    Sharpen,
    Blur,
    AutoContrast,
    Encode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Orient => "orient",
            Stage::IccImport => "icc_import",
            Stage::IccTransform => "icc_transform",
            Stage::Resize => "resize",
            Stage::Crop => "crop",
            Stage::Sharpen => "sharpen",
            Stage::Blur => "blur",
            Stage::AutoContrast => "auto_contrast",
            Stage::Encode => "encode",
        }
    }

    /// The flag recording this stage in [`Stages`].
    pub fn flag(&self) -> Stages {
        match self {
            Stage::Decode => Stages::DECODE,
            Stage::Orient => Stages::ORIENT,
            Stage::IccImport => Stages::ICC_IMPORT,
            Stage::IccTransform => Stages::ICC_TRANSFORM,
            Stage::Resize => Stages::RESIZE,
            Stage::Crop => Stages::CROP,
            Stage::Sharpen => Stages::SHARPEN,
            Stage::Blur => Stages::BLUR,
            Stage::AutoContrast => Stages::AUTO_CONTRAST,
            Stage::Encode => Stages::ENCODE,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of stages that actually ran for one thumbnail.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Stages: u16 {
        const DECODE = 1 << 0;
        const ORIENT = 1 << 1;
        const ICC_IMPORT = 1 << 2;
        const ICC_TRANSFORM = 1 << 3;
        const RESIZE = 1 << 4;
        const CROP = 1 << 5;
        const SHARPEN = 1 << 6;
        const BLUR = 1 << 7;
        const AUTO_CONTRAST = 1 << 8;
        const ENCODE = 1 << 9;
    }
}
