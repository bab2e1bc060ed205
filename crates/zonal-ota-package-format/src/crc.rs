//! CRC-32 (IEEE 802.3 polynomial) over package payload bytes.

use zonal_ota_errors::CodecError;

/// CRC-32 of `payload`, as stored in the header's `payload_crc32` field.
pub fn payload_crc32(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Recompute the CRC of `payload` and compare against `expected`.
pub fn verify_crc32(payload: &[u8], expected: u32) -> Result<(), CodecError> {
    let actual = payload_crc32(payload);
    if actual != expected {
        return Err(CodecError::CrcMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // Standard check value for CRC-32/ISO-HDLC.
        assert_eq!(payload_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(payload_crc32(&[]), 0);
        assert_eq!(verify_crc32(&[], 0), Ok(()));
    }

    #[test]
    fn test_mismatch_reports_both_values() {
        let err = verify_crc32(b"firmware", 1);
        assert_eq!(
            err,
            Err(CodecError::CrcMismatch {
                expected: 1,
                actual: payload_crc32(b"firmware"),
            })
        );
    }
}
