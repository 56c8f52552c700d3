#![no_main]

use libfuzzer_sys::fuzz_target;
use thumbgate::detect_formats;

fuzz_target!(|data: &[u8]| {
    let (input, output) = detect_formats(data);
    assert_eq!(output, input.preferred_output());
});
