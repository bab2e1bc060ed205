//! Zonal OTA package byte formats.
//!
//! This crate is I/O-free: pure encoders and decoders for
//!
//! - the fixed 64-byte single-firmware header ([`header`]),
//! - the zonal container carrying several ECU images behind one gateway ([`zonal`]),
//! - CRC-32 payload integrity ([`crc`]),
//! - the payload compression capability ([`compression`]).
//!
//! Everything here can be tested and fuzzed without a filesystem.

#![deny(static_mut_refs)]

pub mod compression;
pub mod crc;
pub mod cursor;
pub mod header;
pub mod single;
pub mod zonal;

pub use compression::{
    CompressedPayload, CompressionAlgorithm, GzipCompressor, NoCompression, PayloadCompressor,
    ZlibCompressor, compressor_for,
};
pub use crc::{payload_crc32, verify_crc32};
pub use cursor::ByteReader;
pub use header::{CompressionFlag, HEADER_LEN, MAGIC, SoftwarePackageHeader, SoftwareType};
pub use single::{SinglePackage, build_single_package, inspect_single_package};
pub use zonal::{
    DIGEST_LEN, FirmwareMetadataRecord, ZONAL_FORMAT_VERSION, ZONAL_MAGIC, ZONAL_RESERVED_LEN,
    ZonalMember, ZonalPackage, ZonalPackageHeader, ZonalPackageWriter, parse_zonal_package,
};
pub use zonal_ota_errors::CodecError;
