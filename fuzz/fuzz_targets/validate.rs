#![no_main]

use libfuzzer_sys::fuzz_target;
use thumbgate::{detect_formats, FirewallConfig, Format, ThumbgateError, Thumbnailer};

fuzz_target!(|data: &[u8]| {
    let thumbnailer = Thumbnailer::default().with_firewall(FirewallConfig::strict());
    match thumbnailer.validate(data) {
        Ok(meta) => {
            assert_eq!(meta.format, detect_formats(data).0);
            assert!(meta.width >= thumbgate::MIN_DIMENSION);
            assert!(meta.height >= thumbgate::MIN_DIMENSION);
        }
        Err(ThumbgateError::UnknownFormat { .. }) => {}
        Err(ThumbgateError::TooBig { .. }) => {
            let over_cap = thumbnailer
                .firewall()
                .max_bytes
                .is_some_and(|limit| data.len() as u64 > limit);
            assert!(over_cap || detect_formats(data).0 != Format::Unknown);
        }
        Err(ThumbgateError::TooSmall { .. }) => {
            assert_ne!(detect_formats(data).0, Format::Unknown);
        }
        Err(err) => panic!("unexpected validation error: {err}"),
    }
});
