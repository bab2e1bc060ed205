//! Fuzzes strict MAJOR.MINOR.PATCH parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_version_parse
#![no_main]
use libfuzzer_sys::fuzz_target;
use zonal_ota_update::SemanticVersion;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(version) = SemanticVersion::parse(text) {
        let canonical = version.to_string();
        assert_eq!(SemanticVersion::parse(&canonical).ok(), Some(version));
    }
});
