#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use thumbgate::{resolve, CropAnchor, Format, Metadata, Options, MAX_DIMENSION};

#[derive(Arbitrary, Debug)]
struct Input {
    source_width: u32,
    source_height: u32,
    source_format: u8,
    width: u32,
    height: u32,
    crop: bool,
    top: bool,
    max_buffer_pixels: u64,
    blur_sigma: f64,
    format: u8,
    quality: u8,
    compression: u8,
    lossless_max_bits_per_pixel: u32,
}

fn format(tag: u8) -> Format {
    match tag % 5 {
        0 => Format::Unknown,
        1 => Format::Jpeg,
        2 => Format::Png,
        3 => Format::Gif,
        _ => Format::Webp,
    }
}

fuzz_target!(|input: Input| {
    let meta = Metadata::new(
        input.source_width,
        input.source_height,
        format(input.source_format),
    );
    let options = Options {
        width: input.width,
        height: input.height,
        crop: input.crop,
        crop_anchor: if input.top { CropAnchor::Top } else { CropAnchor::Center },
        max_buffer_pixels: input.max_buffer_pixels,
        blur_sigma: input.blur_sigma,
        format: format(input.format),
        quality: input.quality,
        compression: input.compression,
        lossless_max_bits_per_pixel: input.lossless_max_bits_per_pixel,
        ..Options::default()
    };

    if let Ok(resolved) = resolve(&options, &meta) {
        assert!(resolved.width() >= 1 && resolved.width() <= MAX_DIMENSION);
        assert!(resolved.height() >= 1 && resolved.height() <= MAX_DIMENSION);
        assert!(resolved.format().can_save());
        let again = resolve(&resolved.to_options(), &meta).expect("resolved options re-resolve");
        assert_eq!(resolved, again);
    }
});
