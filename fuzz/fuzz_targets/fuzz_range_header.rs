//! Fuzzes HTTP Range header parsing against arbitrary package sizes.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_range_header
#![no_main]
use libfuzzer_sys::fuzz_target;
use zonal_ota_update::ByteRange;

fuzz_target!(|input: (&str, u64)| {
    let (header, size) = input;
    if let Ok(range) = ByteRange::parse_header(header, size) {
        assert!(range.start <= range.end);
        assert!(range.end < size);
    }
});
