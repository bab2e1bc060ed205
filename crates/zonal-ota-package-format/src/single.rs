//! Single-firmware package: the 64-byte header followed by one payload.

use tracing::debug;
use zonal_ota_errors::CodecError;

use crate::compression::PayloadCompressor;
use crate::crc::{payload_crc32, verify_crc32};
use crate::header::{CompressionFlag, HEADER_LEN, SoftwarePackageHeader};

/// Build `header ++ payload`.
///
/// `template` supplies addressing, version and routing fields; size, CRC and
/// compression flag are computed here from `firmware` and `compressor`.
pub fn build_single_package(
    template: &SoftwarePackageHeader,
    firmware: &[u8],
    compressor: &dyn PayloadCompressor,
) -> Result<Vec<u8>, CodecError> {
    let compressed = compressor.compress(firmware)?;

    let mut header = template.clone();
    header.compression = if compressor.is_compressing() {
        CompressionFlag::Compressed
    } else {
        CompressionFlag::None
    };
    header.payload_size = compressed.compressed_size;
    header.uncompressed_size = compressed.original_size;
    header.payload_crc32 = payload_crc32(&compressed.bytes);

    let encoded = header.encode()?;
    let mut out = Vec::with_capacity(HEADER_LEN + compressed.bytes.len());
    out.extend_from_slice(&encoded);
    out.extend_from_slice(&compressed.bytes);

    debug!(
        target_ecu = header.target_ecu_id,
        software_type = header.software_type.as_str(),
        payload_size = header.payload_size,
        crc32 = format_args!("{:#010x}", header.payload_crc32),
        "Built single-firmware package"
    );
    Ok(out)
}

/// A decoded single-firmware package borrowing its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePackage<'a> {
    pub header: SoftwarePackageHeader,
    pub payload: &'a [u8],
}

impl SinglePackage<'_> {
    /// Undo payload compression and check the result against `uncompressed_size`.
    pub fn firmware(&self, compressor: &dyn PayloadCompressor) -> Result<Vec<u8>, CodecError> {
        let firmware = match self.header.compression {
            CompressionFlag::None => self.payload.to_vec(),
            CompressionFlag::Compressed => compressor.decompress(self.payload)?,
        };
        if firmware.len() as u64 != self.header.uncompressed_size {
            return Err(CodecError::PayloadSizeMismatch {
                declared: self.header.uncompressed_size,
                actual: firmware.len() as u64,
            });
        }
        Ok(firmware)
    }
}

/// Decode the header of `bytes` and verify payload size and CRC-32.
pub fn inspect_single_package(bytes: &[u8]) -> Result<SinglePackage<'_>, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::bad_length(HEADER_LEN, bytes.len()));
    }
    let (head, payload) = bytes.split_at(HEADER_LEN);
    let header = SoftwarePackageHeader::decode(head)?;

    if payload.len() as u64 != header.payload_size {
        return Err(CodecError::PayloadSizeMismatch {
            declared: header.payload_size,
            actual: payload.len() as u64,
        });
    }
    verify_crc32(payload, header.payload_crc32)?;

    Ok(SinglePackage { header, payload })
}
