// src/engine/common.rs
//
// Common utilities shared across the native codec modules.

use crate::engine::backend::EngineError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result type for native codec calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Run a codec call, turning a panic inside it into an `EngineError`.
///
/// The C codecs reached through mozjpeg and libwebp report some corrupt-stream
/// conditions by unwinding; those must surface as ordinary stage failures.
pub fn run_guarded<T>(label: &'static str, f: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(EngineError::new(format!("{label}: codec panicked: {detail}")))
        }
    }
}
