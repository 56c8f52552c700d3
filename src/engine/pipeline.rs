// src/engine/pipeline.rs
//
// Transform pipeline: decode → orient → colour → resize → crop → sharpen →
// blur → auto-contrast → encode, one engine call per stage. The engine handle
// lives in a ResultHandle so it is released on every exit path.

use crate::engine::backend::{EngineError, ImageEngine};
use crate::engine::options::ResolvedOptions;
use crate::engine::{Stage, Stages};
use crate::error::{Result, ThumbgateError};
use crate::ops::{CropAnchor, Format, Orientation};
use tracing::{debug_span, trace};

/// Encoded output of one successful transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    /// Stages that actually ran.
    pub stages: Stages,
}

/// Owns the engine's working handle for one request.
///
/// The handle is released exactly once: when dropped, whether the pipeline
/// finished, failed at a stage, or unwound.
pub struct ResultHandle<'e, E: ImageEngine> {
    engine: &'e E,
    handle: Option<E::Handle>,
    encoded: Option<Vec<u8>>,
    stages: Stages,
}

impl<'e, E: ImageEngine> ResultHandle<'e, E> {
    /// Decode `blob` into a fresh handle.
    pub fn decode(engine: &'e E, blob: &[u8], shrink: u32) -> Result<Self> {
        let handle = engine
            .decode(blob, shrink)
            .map_err(|e| stage_error(Stage::Decode, e))?;
        Ok(Self {
            engine,
            handle: Some(handle),
            encoded: None,
            stages: Stages::DECODE,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.handle
            .as_ref()
            .map_or((0, 0), |h| self.engine.dimensions(h))
    }

    pub fn has_icc_profile(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| self.engine.has_icc_profile(h))
    }

    pub fn stages(&self) -> Stages {
        self.stages
    }

    /// Run one mutating stage against the handle.
    pub fn apply(
        &mut self,
        stage: Stage,
        op: impl FnOnce(&E, &mut E::Handle) -> std::result::Result<(), EngineError>,
    ) -> Result<()> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| ThumbgateError::stage_failed(stage, "handle already released"))?;
        op(self.engine, handle).map_err(|e| stage_error(stage, e))?;
        self.stages |= stage.flag();
        let (width, height) = self.engine.dimensions(handle);
        trace!(stage = %stage, width, height, "stage complete");
        Ok(())
    }

    /// Encode the handle and keep the bytes.
    pub fn encode(&mut self, resolved: &ResolvedOptions) -> Result<()> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| ThumbgateError::stage_failed(Stage::Encode, "handle already released"))?;
        let bytes = self
            .engine
            .encode(handle, &resolved.encode_params())
            .map_err(|e| stage_error(Stage::Encode, e))?;
        self.stages |= Stages::ENCODE;
        self.encoded = Some(bytes);
        Ok(())
    }

    /// Take the encoded result. The handle itself is released on drop.
    pub fn finish(mut self, format: Format) -> Result<Thumbnail> {
        let (width, height) = self.dimensions();
        let bytes = self
            .encoded
            .take()
            .ok_or_else(|| ThumbgateError::stage_failed(Stage::Encode, "nothing was encoded"))?;
        Ok(Thumbnail {
            bytes,
            width,
            height,
            format,
            stages: self.stages,
        })
    }
}

impl<E: ImageEngine> Drop for ResultHandle<'_, E> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.release(handle);
        }
    }
}

fn stage_error(stage: Stage, err: EngineError) -> ThumbgateError {
    ThumbgateError::stage_failed(stage, err.into_message())
}

/// Crop window of `crop_w`x`crop_h` inside `cur_w`x`cur_h`: centred
/// horizontally, centred or top-aligned vertically.
pub(crate) fn crop_window(
    (cur_w, cur_h): (u32, u32),
    (crop_w, crop_h): (u32, u32),
    anchor: CropAnchor,
) -> (u32, u32, u32, u32) {
    let width = crop_w.min(cur_w);
    let height = crop_h.min(cur_h);
    let left = (cur_w - width) / 2;
    let top = match anchor {
        CropAnchor::Center => (cur_h - height) / 2,
        CropAnchor::Top => 0,
    };
    (left, top, width, height)
}

/// Run every stage `resolved` calls for against `blob`.
///
/// `blob` must be the bytes `resolved` was validated from. On any failure
/// the engine handle is released and no output is returned.
pub fn transform<E: ImageEngine>(
    engine: &E,
    blob: &[u8],
    resolved: &ResolvedOptions,
) -> Result<Thumbnail> {
    let source = resolved.source();
    let _span = debug_span!(
        "transform",
        source = %source.format,
        output = %resolved.format(),
        width = resolved.width(),
        height = resolved.height()
    )
    .entered();

    let mut result = ResultHandle::decode(engine, blob, resolved.shrink())?;

    if source.orientation != Orientation::Normal {
        let orientation = source.orientation;
        result.apply(Stage::Orient, |e, h| e.orient(h, orientation))?;
    }

    if result.has_icc_profile() {
        result.apply(Stage::IccImport, |e, h| e.icc_import(h))?;
    }
    if let Some(profile) = resolved.output_profile() {
        let intent = resolved.rendering_intent();
        result.apply(Stage::IccTransform, |e, h| e.icc_transform(h, profile, intent))?;
    }

    let (target_w, target_h) = resolved.resize_target();
    let (cur_w, cur_h) = result.dimensions();
    if cur_w > target_w || cur_h > target_h {
        result.apply(Stage::Resize, |e, h| e.resize(h, target_w, target_h))?;
    }

    if resolved.crop() {
        let (left, top, width, height) = crop_window(
            result.dimensions(),
            (resolved.width(), resolved.height()),
            resolved.crop_anchor(),
        );
        if (width, height) != result.dimensions() {
            result.apply(Stage::Crop, |e, h| e.crop(h, left, top, width, height))?;
        }
    }

    if resolved.sharpen() {
        result.apply(Stage::Sharpen, |e, h| e.sharpen(h))?;
    }

    let sigma = resolved.blur_sigma();
    if sigma > 0.0 {
        result.apply(Stage::Blur, |e, h| e.blur(h, sigma))?;
    }

    if resolved.auto_contrast() {
        result.apply(Stage::AutoContrast, |e, h| e.auto_contrast(h))?;
    }

    result.encode(resolved)?;
    result.finish(resolved.format())
}
