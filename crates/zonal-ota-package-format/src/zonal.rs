//! Zonal container: one package per zonal gateway carrying several ECU images.
//!
//! Byte layout (all integers big-endian):
//!
//! ```text
//! "OTAP" | format_version u16 = 1 | ecu_count u16 | zone_len u8 | zone_id | 16 x 0x00
//! then ecu_count times:
//!   ecu_len u8 | ecu_id | cur_len u8 | current_version | tgt_len u8 | target_version
//!   | payload_size u32 | sha256 [32] | payload [payload_size]
//! ```

use zonal_ota_errors::CodecError;

use crate::cursor::ByteReader;

/// Container magic.
pub const ZONAL_MAGIC: [u8; 4] = *b"OTAP";

/// The only container version this crate writes or reads.
pub const ZONAL_FORMAT_VERSION: u16 = 1;

/// Zero bytes after the zone id.
pub const ZONAL_RESERVED_LEN: usize = 16;

/// Length of the raw SHA-256 digest in each record.
pub const DIGEST_LEN: usize = 32;

/// Container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonalPackageHeader {
    pub format_version: u16,
    pub ecu_count: u16,
    pub zone_id: String,
}

impl ZonalPackageHeader {
    pub fn new(zone_id: impl Into<String>, ecu_count: u16) -> Self {
        Self {
            format_version: ZONAL_FORMAT_VERSION,
            ecu_count,
            zone_id: zone_id.into(),
        }
    }

    /// Append the encoded header to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.extend_from_slice(&ZONAL_MAGIC);
        out.extend_from_slice(&self.format_version.to_be_bytes());
        out.extend_from_slice(&self.ecu_count.to_be_bytes());
        put_short_string(out, "zone_id", &self.zone_id)?;
        out.extend_from_slice(&[0u8; ZONAL_RESERVED_LEN]);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let magic = r.array::<4>("zonal magic")?;
        if magic != ZONAL_MAGIC {
            return Err(CodecError::BadMagic {
                expected: u32::from_be_bytes(ZONAL_MAGIC),
                actual: u32::from_be_bytes(magic),
            });
        }
        let format_version = r.u16_be("format_version")?;
        if format_version != ZONAL_FORMAT_VERSION {
            return Err(CodecError::UnsupportedFormatVersion(format_version));
        }
        let ecu_count = r.u16_be("ecu_count")?;
        let zone_id = r.short_string("zone_id")?;
        r.bytes(ZONAL_RESERVED_LEN, "zonal reserved")?;
        Ok(Self {
            format_version,
            ecu_count,
            zone_id,
        })
    }
}

/// Per-firmware metadata record preceding each payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareMetadataRecord {
    pub ecu_id: String,
    pub current_version: String,
    pub target_version: String,
    /// Length of the payload bytes that follow this record.
    pub payload_size: u32,
    /// SHA-256 of the uncompressed firmware image.
    pub sha256: [u8; DIGEST_LEN],
}

impl FirmwareMetadataRecord {
    /// Record describing `payload`; fails if the payload exceeds `u32::MAX` bytes.
    pub fn for_payload(
        ecu_id: impl Into<String>,
        current_version: impl Into<String>,
        target_version: impl Into<String>,
        sha256: [u8; DIGEST_LEN],
        payload: &[u8],
    ) -> Result<Self, CodecError> {
        let payload_size = u32::try_from(payload.len()).ok().ok_or_else(|| {
            CodecError::overflow("payload_size", payload.len() as u64, u64::from(u32::MAX))
        })?;
        Ok(Self {
            ecu_id: ecu_id.into(),
            current_version: current_version.into(),
            target_version: target_version.into(),
            payload_size,
            sha256,
        })
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        put_short_string(out, "ecu_id", &self.ecu_id)?;
        put_short_string(out, "current_version", &self.current_version)?;
        put_short_string(out, "target_version", &self.target_version)?;
        out.extend_from_slice(&self.payload_size.to_be_bytes());
        out.extend_from_slice(&self.sha256);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ecu_id: r.short_string("ecu_id")?,
            current_version: r.short_string("current_version")?,
            target_version: r.short_string("target_version")?,
            payload_size: r.u32_be("payload_size")?,
            sha256: r.array("sha256")?,
        })
    }
}

/// Incremental builder for a zonal container held in memory.
///
/// The member count is fixed up front because it is written into the header;
/// [`finish`](Self::finish) fails if a different number of members was pushed.
#[derive(Debug)]
pub struct ZonalPackageWriter {
    buf: Vec<u8>,
    declared: u16,
    written: u16,
}

impl ZonalPackageWriter {
    pub fn new(zone_id: &str, ecu_count: u16) -> Result<Self, CodecError> {
        let mut buf = Vec::new();
        ZonalPackageHeader::new(zone_id, ecu_count).encode_into(&mut buf)?;
        Ok(Self {
            buf,
            declared: ecu_count,
            written: 0,
        })
    }

    /// Append one member's record and payload.
    pub fn push_member(
        &mut self,
        record: &FirmwareMetadataRecord,
        payload: &[u8],
    ) -> Result<(), CodecError> {
        if u64::from(record.payload_size) != payload.len() as u64 {
            return Err(CodecError::PayloadSizeMismatch {
                declared: u64::from(record.payload_size),
                actual: payload.len() as u64,
            });
        }
        if self.written >= self.declared {
            return Err(CodecError::overflow(
                "ecu_count",
                u64::from(self.written) + 1,
                u64::from(self.declared),
            ));
        }
        record.encode_into(&mut self.buf)?;
        self.buf.extend_from_slice(payload);
        self.written += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>, CodecError> {
        if self.written != self.declared {
            return Err(CodecError::truncated(format!(
                "zonal package members ({} of {})",
                self.written, self.declared
            )));
        }
        Ok(self.buf)
    }
}

/// One member of a parsed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonalMember<'a> {
    pub record: FirmwareMetadataRecord,
    pub payload: &'a [u8],
}

/// Parsed container borrowing its payloads from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonalPackage<'a> {
    pub header: ZonalPackageHeader,
    pub members: Vec<ZonalMember<'a>>,
}

/// Decode a complete zonal container.
///
/// Trailing bytes after the last member are rejected as
/// [`CodecError::BadLength`].
pub fn parse_zonal_package(bytes: &[u8]) -> Result<ZonalPackage<'_>, CodecError> {
    let mut r = ByteReader::new(bytes);
    let header = ZonalPackageHeader::decode(&mut r)?;

    let mut members = Vec::with_capacity(usize::from(header.ecu_count));
    for _ in 0..header.ecu_count {
        let record = FirmwareMetadataRecord::decode(&mut r)?;
        let payload = r.bytes(record.payload_size as usize, "payload")?;
        members.push(ZonalMember { record, payload });
    }

    if r.remaining() != 0 {
        return Err(CodecError::bad_length(r.consumed(), bytes.len()));
    }

    Ok(ZonalPackage { header, members })
}

fn put_short_string(out: &mut Vec<u8>, field: &'static str, value: &str) -> Result<(), CodecError> {
    let len = u8::try_from(value.len())
        .ok()
        .ok_or_else(|| CodecError::overflow(field, value.len() as u64, u64::from(u8::MAX)))?;
    out.push(len);
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ecu: &str, payload: &[u8]) -> Result<FirmwareMetadataRecord, CodecError> {
        FirmwareMetadataRecord::for_payload(ecu, "1.0.0", "1.1.0", [0xAB; DIGEST_LEN], payload)
    }

    #[test]
    fn test_header_bytes() -> Result<(), CodecError> {
        let mut out = Vec::new();
        ZonalPackageHeader::new("ZF", 3).encode_into(&mut out)?;
        let mut expected = b"OTAP".to_vec();
        expected.extend_from_slice(&[0, 1, 0, 3, 2, b'Z', b'F']);
        expected.extend_from_slice(&[0u8; 16]);
        assert_eq!(out, expected);
        Ok(())
    }

    #[test]
    fn test_write_then_parse() -> Result<(), CodecError> {
        let mut w = ZonalPackageWriter::new("ZONE_FRONT", 2)?;
        w.push_member(&record("ECU_001", b"alpha")?, b"alpha")?;
        w.push_member(&record("ECU_002", b"beta!!")?, b"beta!!")?;
        let bytes = w.finish()?;

        let pkg = parse_zonal_package(&bytes)?;
        assert_eq!(pkg.header.zone_id, "ZONE_FRONT");
        assert_eq!(pkg.members.len(), 2);
        assert_eq!(pkg.members[0].record.ecu_id, "ECU_001");
        assert_eq!(pkg.members[1].payload, b"beta!!");
        assert_eq!(pkg.members[1].record.payload_size, 6);
        Ok(())
    }

    #[test]
    fn test_member_count_enforced() -> Result<(), CodecError> {
        let mut w = ZonalPackageWriter::new("Z", 1)?;
        w.push_member(&record("ECU_001", b"x")?, b"x")?;
        assert!(matches!(
            w.push_member(&record("ECU_002", b"y")?, b"y"),
            Err(CodecError::FieldOverflow { field: "ecu_count", .. })
        ));

        let short = ZonalPackageWriter::new("Z", 2)?;
        assert!(matches!(short.finish(), Err(CodecError::Truncated { .. })));
        Ok(())
    }

    #[test]
    fn test_record_payload_mismatch() -> Result<(), CodecError> {
        let mut w = ZonalPackageWriter::new("Z", 1)?;
        let rec = record("ECU_001", b"four")?;
        assert_eq!(
            w.push_member(&rec, b"five!"),
            Err(CodecError::PayloadSizeMismatch {
                declared: 4,
                actual: 5
            })
        );
        Ok(())
    }

    #[test]
    fn test_parse_rejects_bad_magic_and_version() -> Result<(), CodecError> {
        let mut bytes = ZonalPackageWriter::new("Z", 0)?.finish()?;
        bytes[5] = 2;
        assert_eq!(
            parse_zonal_package(&bytes),
            Err(CodecError::UnsupportedFormatVersion(2))
        );
        bytes[0] = b'X';
        assert!(matches!(
            parse_zonal_package(&bytes),
            Err(CodecError::BadMagic { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_parse_rejects_truncated_and_trailing() -> Result<(), CodecError> {
        let mut w = ZonalPackageWriter::new("Z", 1)?;
        w.push_member(&record("ECU_001", b"payload")?, b"payload")?;
        let mut bytes = w.finish()?;

        let cut = &bytes[..bytes.len() - 1];
        assert!(matches!(
            parse_zonal_package(cut),
            Err(CodecError::Truncated { .. })
        ));

        bytes.push(0);
        assert!(matches!(
            parse_zonal_package(&bytes),
            Err(CodecError::BadLength { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_zone_id_too_long() {
        let long = "Z".repeat(256);
        assert!(matches!(
            ZonalPackageWriter::new(&long, 0),
            Err(CodecError::FieldOverflow { field: "zone_id", .. })
        ));
    }
}
