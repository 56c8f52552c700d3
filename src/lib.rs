// lib.rs
//
// thumbgate: hardened thumbnailing for untrusted images
//
// Design goals:
// - Never hand unrecognized bytes to a decoder
// - Bound every allocation by validated dimensions before decoding
// - One engine primitive per pipeline stage, with guaranteed release
// - Safe to share one engine across threads

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{
    detect_formats, resolve, scale_aspect, transform, validate, EncodeParams, EngineError,
    FirewallConfig, FirewallPolicy, ImageEngine, NativeEngine, NativeHandle, Probe,
    ResolvedOptions, ResultHandle, Stage, Stages, Thumbnail, Thumbnailer, MAX_DIMENSION,
    MIN_DIMENSION,
};
pub use error::{ErrorCategory, Result, ThumbgateError};
pub use ops::{CropAnchor, Format, Metadata, Options, Orientation, RenderingIntent};
