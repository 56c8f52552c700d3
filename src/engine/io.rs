// src/engine/io.rs
//
// Container-level I/O: ICC profile extraction and structural validation.
// Only headers and chunk tables are walked here; no pixel data is decoded.

use crate::engine::detect::detect_formats;
use crate::ops::Format;
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, Bytes, ImageICC};

/// Size of the fixed ICC profile header.
const ICC_HEADER_LEN: usize = 128;

/// Extract the embedded ICC profile from JPEG (APP2), PNG (iCCP) or WebP
/// (ICCP) data. Profiles that fail [`validate_icc_profile`] are skipped.
pub fn extract_icc_profile(data: &[u8]) -> Option<Vec<u8>> {
    let icc = embedded_icc_profile(data)?;
    validate_icc_profile(&icc).ok()?;
    Some(icc)
}

/// Raw embedded profile bytes, unvalidated. Used by the firewall to measure
/// the profile before anything interprets it.
pub(crate) fn embedded_icc_profile(data: &[u8]) -> Option<Vec<u8>> {
    let bytes = Bytes::copy_from_slice(data);
    let icc = match detect_formats(data).0 {
        Format::Jpeg => Jpeg::from_bytes(bytes).ok()?.icc_profile(),
        Format::Png => Png::from_bytes(bytes).ok()?.icc_profile(),
        Format::Webp => WebP::from_bytes(bytes).ok()?.icc_profile(),
        Format::Gif | Format::Unknown => None,
    }?;
    Some(icc.to_vec())
}

/// Check the 128-byte ICC header: declared size matches the data, the
/// version is plausible and the signature fields are ASCII.
pub fn validate_icc_profile(icc: &[u8]) -> Result<(), &'static str> {
    if icc.len() < ICC_HEADER_LEN {
        return Err("profile shorter than the 128-byte ICC header");
    }

    let declared = u32::from_be_bytes([icc[0], icc[1], icc[2], icc[3]]) as usize;
    if declared != icc.len() {
        return Err("declared profile size does not match its length");
    }

    // Major version is 2, 4 or 5 in practice.
    if icc[8] > 10 {
        return Err("unsupported profile version");
    }

    // CMM type, device class, colour space and PCS signatures.
    let signatures = [&icc[4..8], &icc[12..16], &icc[16..20], &icc[20..24]];
    if signatures
        .iter()
        .any(|sig| sig.iter().any(|&b| b != 0 && !(32..=126).contains(&b)))
    {
        return Err("profile signature fields are not ASCII");
    }

    Ok(())
}
