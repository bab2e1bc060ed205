//! Fixed 64-byte single-firmware package header.
//!
//! Little-endian layout, offsets in bytes:
//!
//! | Offset | Width | Field                     |
//! |--------|-------|---------------------------|
//! | 0      | 4     | magic (`0x53575047`)      |
//! | 4      | 2     | target ECU numeric id     |
//! | 6      | 1     | software type             |
//! | 7      | 1     | compression flag          |
//! | 8      | 4     | payload size              |
//! | 12     | 4     | uncompressed size         |
//! | 16     | 1     | version major             |
//! | 17     | 1     | version minor             |
//! | 18     | 1     | version patch             |
//! | 19     | 1     | version build             |
//! | 20     | 4     | version timestamp         |
//! | 24     | 4     | version serial            |
//! | 28     | 4     | CRC-32 of payload         |
//! | 32     | 12    | signature reserved (3×u32)|
//! | 44     | 2     | source ECU id             |
//! | 46     | 2     | hop count                 |
//! | 48     | 4     | sequence number           |
//! | 52     | 12    | reserved                  |

use zonal_ota_errors::CodecError;

use crate::cursor::ByteReader;

/// Encoded header length in bytes.
pub const HEADER_LEN: usize = 64;

/// Header magic, `"SWPG"` read as a big-endian word.
pub const MAGIC: u32 = 0x5357_5047;

/// Kind of software carried by a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SoftwareType {
    /// Application image
    App = 1,
    /// Bootloader
    Boot = 2,
    /// Calibration data
    Cal = 3,
    /// Configuration data
    Cfg = 4,
}

impl SoftwareType {
    /// All variants in wire order.
    pub const ALL: [SoftwareType; 4] = [
        SoftwareType::App,
        SoftwareType::Boot,
        SoftwareType::Cal,
        SoftwareType::Cfg,
    ];

    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            SoftwareType::App => "app",
            SoftwareType::Boot => "boot",
            SoftwareType::Cal => "cal",
            SoftwareType::Cfg => "cfg",
        }
    }
}

impl TryFrom<u8> for SoftwareType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SoftwareType::App),
            2 => Ok(SoftwareType::Boot),
            3 => Ok(SoftwareType::Cal),
            4 => Ok(SoftwareType::Cfg),
            other => Err(CodecError::UnknownSoftwareType(other)),
        }
    }
}

impl std::str::FromStr for SoftwareType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "app" => Ok(SoftwareType::App),
            "boot" => Ok(SoftwareType::Boot),
            "cal" => Ok(SoftwareType::Cal),
            "cfg" => Ok(SoftwareType::Cfg),
            other => Err(format!("unknown software type '{other}'")),
        }
    }
}

/// Whether the payload following the header is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompressionFlag {
    /// Raw payload
    #[default]
    None = 0,
    /// Compressed payload
    Compressed = 1,
}

impl TryFrom<u8> for CompressionFlag {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompressionFlag::None),
            1 => Ok(CompressionFlag::Compressed),
            other => Err(CodecError::UnknownCompressionFlag(other)),
        }
    }
}

/// Decoded single-firmware package header.
///
/// Numeric fields are held in types wider than their on-wire width so that
/// callers can assemble a header from host values; [`encode`](Self::encode)
/// rejects anything that does not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwarePackageHeader {
    pub target_ecu_id: u32,
    pub software_type: SoftwareType,
    pub compression: CompressionFlag,
    pub payload_size: u64,
    pub uncompressed_size: u64,
    pub version_major: u32,
    pub version_minor: u32,
    pub version_patch: u32,
    pub version_build: u32,
    pub version_timestamp: u32,
    pub version_serial: u32,
    pub payload_crc32: u32,
    pub signature_reserved: [u32; 3],
    pub source_ecu_id: u32,
    pub hop_count: u32,
    pub sequence_number: u32,
    pub reserved: [u8; 12],
}

impl SoftwarePackageHeader {
    /// Header for `software_type` addressed to `target_ecu_id`, all other fields zero.
    pub fn new(target_ecu_id: u16, software_type: SoftwareType) -> Self {
        Self {
            target_ecu_id: u32::from(target_ecu_id),
            software_type,
            compression: CompressionFlag::None,
            payload_size: 0,
            uncompressed_size: 0,
            version_major: 0,
            version_minor: 0,
            version_patch: 0,
            version_build: 0,
            version_timestamp: 0,
            version_serial: 0,
            payload_crc32: 0,
            signature_reserved: [0; 3],
            source_ecu_id: 0,
            hop_count: 0,
            sequence_number: 0,
            reserved: [0; 12],
        }
    }

    /// Set the four version bytes.
    pub fn with_version(mut self, major: u32, minor: u32, patch: u32, build: u32) -> Self {
        self.version_major = major;
        self.version_minor = minor;
        self.version_patch = patch;
        self.version_build = build;
        self
    }

    /// Encode to the 64-byte wire form.
    pub fn encode(&self) -> Result<[u8; HEADER_LEN], CodecError> {
        let mut out = Vec::with_capacity(HEADER_LEN);

        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&narrow_u16("target_ecu_id", self.target_ecu_id)?.to_le_bytes());
        out.push(self.software_type as u8);
        out.push(self.compression as u8);
        out.extend_from_slice(&narrow_u32("payload_size", self.payload_size)?.to_le_bytes());
        out.extend_from_slice(
            &narrow_u32("uncompressed_size", self.uncompressed_size)?.to_le_bytes(),
        );
        out.push(narrow_u8("version_major", self.version_major)?);
        out.push(narrow_u8("version_minor", self.version_minor)?);
        out.push(narrow_u8("version_patch", self.version_patch)?);
        out.push(narrow_u8("version_build", self.version_build)?);
        out.extend_from_slice(&self.version_timestamp.to_le_bytes());
        out.extend_from_slice(&self.version_serial.to_le_bytes());
        out.extend_from_slice(&self.payload_crc32.to_le_bytes());
        for word in self.signature_reserved {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&narrow_u16("source_ecu_id", self.source_ecu_id)?.to_le_bytes());
        out.extend_from_slice(&narrow_u16("hop_count", self.hop_count)?.to_le_bytes());
        out.extend_from_slice(&self.sequence_number.to_le_bytes());
        out.extend_from_slice(&self.reserved);

        out.try_into()
            .map_err(|v: Vec<u8>| CodecError::bad_length(HEADER_LEN, v.len()))
    }

    /// Decode from exactly 64 bytes.
    ///
    /// Length is checked before magic, so a short buffer always reports
    /// [`CodecError::BadLength`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != HEADER_LEN {
            return Err(CodecError::bad_length(HEADER_LEN, bytes.len()));
        }
        let mut r = ByteReader::new(bytes);

        let magic = r.u32_le("magic")?;
        if magic != MAGIC {
            return Err(CodecError::BadMagic {
                expected: MAGIC,
                actual: magic,
            });
        }

        Ok(Self {
            target_ecu_id: u32::from(r.u16_le("target_ecu_id")?),
            software_type: SoftwareType::try_from(r.u8("software_type")?)?,
            compression: CompressionFlag::try_from(r.u8("compression_flag")?)?,
            payload_size: u64::from(r.u32_le("payload_size")?),
            uncompressed_size: u64::from(r.u32_le("uncompressed_size")?),
            version_major: u32::from(r.u8("version_major")?),
            version_minor: u32::from(r.u8("version_minor")?),
            version_patch: u32::from(r.u8("version_patch")?),
            version_build: u32::from(r.u8("version_build")?),
            version_timestamp: r.u32_le("version_timestamp")?,
            version_serial: r.u32_le("version_serial")?,
            payload_crc32: r.u32_le("payload_crc32")?,
            signature_reserved: [
                r.u32_le("signature_reserved")?,
                r.u32_le("signature_reserved")?,
                r.u32_le("signature_reserved")?,
            ],
            source_ecu_id: u32::from(r.u16_le("source_ecu_id")?),
            hop_count: u32::from(r.u16_le("hop_count")?),
            sequence_number: r.u32_le("sequence_number")?,
            reserved: r.array("reserved")?,
        })
    }

    /// Dotted `major.minor.patch.build` string.
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.version_major, self.version_minor, self.version_patch, self.version_build
        )
    }
}

fn narrow_u8(field: &'static str, value: u32) -> Result<u8, CodecError> {
    u8::try_from(value)
        .ok()
        .ok_or_else(|| CodecError::overflow(field, u64::from(value), u64::from(u8::MAX)))
}

fn narrow_u16(field: &'static str, value: u32) -> Result<u16, CodecError> {
    u16::try_from(value)
        .ok()
        .ok_or_else(|| CodecError::overflow(field, u64::from(value), u64::from(u16::MAX)))
}

fn narrow_u32(field: &'static str, value: u64) -> Result<u32, CodecError> {
    u32::try_from(value)
        .ok()
        .ok_or_else(|| CodecError::overflow(field, value, u64::from(u32::MAX)))
}
