#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use thumbgate::{FirewallConfig, Options, Thumbnailer};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    width: u16,
    height: u16,
    crop: bool,
    sharpen: bool,
    data: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    let thumbnailer = Thumbnailer::default().with_firewall(FirewallConfig::strict());
    let options = Options {
        width: u32::from(input.width % 512),
        height: u32::from(input.height % 512),
        crop: input.crop,
        sharpen: input.sharpen,
        // Keeps decode memory bounded for hostile headers.
        max_buffer_pixels: 4_000_000,
        ..Options::default()
    };
    let _ = thumbnailer.thumbnail(input.data, &options);
});
