//! Fuzzes the zonal (OTAP) container parser and digest verifier.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_zonal_package
#![no_main]
use libfuzzer_sys::fuzz_target;
use zonal_ota_package_format::{NoCompression, parse_zonal_package};
use zonal_ota_update::package_manager::verify_zonal_package;

fuzz_target!(|data: &[u8]| {
    if let Ok(package) = parse_zonal_package(data) {
        assert_eq!(usize::from(package.header.ecu_count), package.members.len());
    }
    let _ = verify_zonal_package(data, &NoCompression);
});
