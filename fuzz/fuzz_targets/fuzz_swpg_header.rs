//! Fuzzes the 64-byte single-firmware header decoder and package inspector.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_swpg_header
#![no_main]
use libfuzzer_sys::fuzz_target;
use zonal_ota_package_format::{SoftwarePackageHeader, inspect_single_package};

fuzz_target!(|data: &[u8]| {
    // Errors are expected on arbitrary bytes, panics are not.
    if let Ok(header) = SoftwarePackageHeader::decode(data) {
        // A decoded header must encode back to the bytes it came from.
        if let (Ok(encoded), Some(head)) = (header.encode(), data.get(..64)) {
            assert_eq!(&encoded[..], head);
        }
    }
    let _ = inspect_single_package(data);
});
