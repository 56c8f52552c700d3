// src/engine/backend.rs
//
// The ImageEngine capability trait: everything the pipeline needs from a
// pixel engine, and nothing more. The core never touches pixels itself.

use crate::ops::{Format, Orientation, RenderingIntent};
use std::borrow::Cow;
use thiserror::Error;

/// Opaque engine failure. The pipeline wraps it into `StageFailed`, the
/// validator into `UnknownFormat`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    message: Cow<'static, str>,
}

impl EngineError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn into_message(self) -> Cow<'static, str> {
        self.message
    }
}

/// Result of a cheap header parse. Dimensions are as stored in the
/// container, before any EXIF orientation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub orientation: Orientation,
}

/// Parameters for the final encode, fully resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: Format,
    pub quality: u8,
    pub compression: u8,
    pub lossless_max_bits_per_pixel: u32,
}

/// Pixel engine driven by the transform pipeline.
///
/// Every mutating primitive either succeeds or leaves the handle unusable
/// for further work; the pipeline stops at the first error. Handles are
/// request-scoped: one `decode` is always matched by exactly one `release`.
pub trait ImageEngine: Sync {
    /// Working image owned by one request.
    type Handle;

    /// Parse enough of `blob` to learn its format and dimensions.
    fn probe(&self, blob: &[u8]) -> Result<Probe, EngineError>;

    /// Fully decode `blob`, optionally pre-scaling by `shrink` (1, 2, 4 or 8).
    /// Engines that cannot pre-scale may ignore the hint.
    fn decode(&self, blob: &[u8], shrink: u32) -> Result<Self::Handle, EngineError>;

    fn dimensions(&self, handle: &Self::Handle) -> (u32, u32);

    fn has_icc_profile(&self, handle: &Self::Handle) -> bool;

    fn orient(&self, handle: &mut Self::Handle, orientation: Orientation)
        -> Result<(), EngineError>;

    /// Convert from the embedded profile into the sRGB working space.
    fn icc_import(&self, handle: &mut Self::Handle) -> Result<(), EngineError>;

    /// Convert into `profile` and tag the handle with it for encoding.
    fn icc_transform(
        &self,
        handle: &mut Self::Handle,
        profile: &[u8],
        intent: RenderingIntent,
    ) -> Result<(), EngineError>;

    fn resize(&self, handle: &mut Self::Handle, width: u32, height: u32)
        -> Result<(), EngineError>;

    fn crop(
        &self,
        handle: &mut Self::Handle,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError>;

    fn sharpen(&self, handle: &mut Self::Handle) -> Result<(), EngineError>;

    fn blur(&self, handle: &mut Self::Handle, sigma: f64) -> Result<(), EngineError>;

    fn auto_contrast(&self, handle: &mut Self::Handle) -> Result<(), EngineError>;

    fn encode(&self, handle: &Self::Handle, params: &EncodeParams)
        -> Result<Vec<u8>, EngineError>;

    /// Give the handle back to the engine. Called exactly once per handle.
    fn release(&self, handle: Self::Handle) {
        drop(handle);
    }
}
