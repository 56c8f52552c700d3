// src/engine/validate.rs
//
// Validator: the only producer of Metadata. Sniffs the signature, applies the
// firewall, then cross-checks the engine's own header parse.

use crate::engine::backend::ImageEngine;
use crate::engine::detect::detect_formats;
use crate::engine::firewall::FirewallConfig;
use crate::engine::options::check_source_dimensions;
use crate::error::{Result, ThumbgateError};
use crate::ops::{Format, Metadata};
use tracing::debug;

/// Validate `blob` and describe it.
///
/// The engine is never consulted for data whose signature is unknown, and a
/// probe that disagrees with the signature is rejected as `UnknownFormat`.
/// Returned dimensions are display dimensions (EXIF orientation applied).
pub fn validate<E: ImageEngine>(
    engine: &E,
    firewall: &FirewallConfig,
    blob: &[u8],
) -> Result<Metadata> {
    firewall.enforce_source_len(blob.len())?;

    let (detected, _) = detect_formats(blob);
    if detected == Format::Unknown {
        debug!(len = blob.len(), "rejected: no known signature");
        return Err(ThumbgateError::unknown_format("no recognized signature"));
    }

    firewall.scan_metadata(blob)?;

    let probe = engine.probe(blob).map_err(|e| {
        debug!(format = %detected, error = %e, "rejected: engine probe failed");
        ThumbgateError::unknown_format(format!("{detected} header could not be parsed"))
    })?;

    if probe.format != detected {
        debug!(detected = %detected, probed = %probe.format, "rejected: format mismatch");
        return Err(ThumbgateError::unknown_format(format!(
            "signature says {detected}, engine parsed {}",
            probe.format
        )));
    }

    let (width, height) = probe
        .orientation
        .display_dimensions(probe.width, probe.height);
    let meta = Metadata {
        width,
        height,
        format: detected,
        orientation: probe.orientation,
    };
    check_source_dimensions(&meta)?;

    debug!(format = %detected, width, height, "validated");
    Ok(meta)
}
