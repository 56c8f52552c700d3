// src/engine/detect.rs
//
// Signature sniffing. This is the first gate: nothing reaches the engine
// unless its leading bytes name one of the four accepted containers.

use crate::ops::Format;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Guess the container format of `blob` from its magic bytes.
///
/// Returns `(input, preferred_output)`. The preferred output is the input
/// format, except that GIF maps to PNG. Unrecognized data yields
/// `(Unknown, Unknown)`. Never reads past the first 16 bytes.
pub fn detect_formats(blob: &[u8]) -> (Format, Format) {
    let input = sniff(blob);
    (input, input.preferred_output())
}

fn sniff(blob: &[u8]) -> Format {
    if blob.starts_with(&JPEG_SIGNATURE) {
        Format::Jpeg
    } else if blob.starts_with(&PNG_SIGNATURE) {
        Format::Png
    } else if blob.starts_with(b"GIF87a") || blob.starts_with(b"GIF89a") {
        Format::Gif
    } else if is_webp(blob) {
        Format::Webp
    } else {
        Format::Unknown
    }
}

// RIFF <size:4> WEBP followed by the first chunk tag.
fn is_webp(blob: &[u8]) -> bool {
    if blob.len() < 16 || &blob[0..4] != b"RIFF" || &blob[8..12] != b"WEBP" {
        return false;
    }
    matches!(&blob[12..16], b"VP8 " | b"VP8L" | b"VP8X")
}
