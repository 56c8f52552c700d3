// src/error.rs
//
// Unified error handling for thumbgate
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UnknownFormat: undetectable input, parser disagreement, unsupported output
// - TooBig / TooSmall: dimension or decode-budget limits
// - BadOption: numeric option outside its legal range
// - StageFailed: opaque engine failure during a transform stage

use crate::engine::Stage;
use std::borrow::Cow;
use thiserror::Error;

/// Coarse classification used by callers to map errors onto responses
/// (e.g. 4xx vs 5xx in an HTTP front end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid request options, recoverable by the caller
    UserError,
    /// Format detection or engine codec failures
    CodecError,
    /// Dimension, byte or pixel-budget limits
    ResourceLimit,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
        }
    }

    /// Stable machine-readable code for this category
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "THUMBGATE_USER_ERROR",
            ErrorCategory::CodecError => "THUMBGATE_CODEC_ERROR",
            ErrorCategory::ResourceLimit => "THUMBGATE_RESOURCE_LIMIT",
        }
    }
}

/// thumbgate error types
///
/// The set is closed: every failure of the validate → resolve → transform
/// sequence is one of these variants. The payload is diagnostic text only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThumbgateError {
    #[error("Unknown image format: {reason}")]
    UnknownFormat { reason: Cow<'static, str> },

    #[error("Image is too wide or tall: {reason}")]
    TooBig { reason: Cow<'static, str> },

    #[error("Image is too small: {reason}")]
    TooSmall { reason: Cow<'static, str> },

    #[error("Bad option {name}={value}: {reason}")]
    BadOption {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("{stage} stage failed: {message}")]
    StageFailed {
        stage: Stage,
        message: Cow<'static, str>,
    },
}

// Constructor Helpers
impl ThumbgateError {
    pub fn unknown_format(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::UnknownFormat {
            reason: reason.into(),
        }
    }

    pub fn too_big(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::TooBig {
            reason: reason.into(),
        }
    }

    pub fn too_small(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::TooSmall {
            reason: reason.into(),
        }
    }

    pub fn bad_option(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::BadOption {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn stage_failed(stage: Stage, message: impl Into<Cow<'static, str>>) -> Self {
        Self::StageFailed {
            stage,
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (caller can change the request)
    ///
    /// Consistent with category(): only UserError is recoverable. Retrying
    /// the same bytes after a codec or limit failure cannot change the outcome.
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError => true,
            ErrorCategory::CodecError | ErrorCategory::ResourceLimit => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadOption { .. } => ErrorCategory::UserError,
            Self::UnknownFormat { .. } | Self::StageFailed { .. } => ErrorCategory::CodecError,
            Self::TooBig { .. } | Self::TooSmall { .. } => ErrorCategory::ResourceLimit,
        }
    }

    /// The failing stage, for transform-time errors
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, ThumbgateError>;
