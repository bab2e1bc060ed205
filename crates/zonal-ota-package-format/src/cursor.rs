//! Bounds-checked byte reader shared by the decoders.

use zonal_ota_errors::CodecError;

/// Sequential reader over a borrowed byte slice.
///
/// Every read reports [`CodecError::Truncated`] naming the structure being
/// read instead of panicking on short input.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    rest: &'a [u8],
    consumed: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            rest: buf,
            consumed: 0,
        }
    }

    /// Bytes read so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    pub fn array<const N: usize>(&mut self, context: &str) -> Result<[u8; N], CodecError> {
        let (head, tail) = self
            .rest
            .split_first_chunk::<N>()
            .ok_or_else(|| CodecError::truncated(context))?;
        self.rest = tail;
        self.consumed += N;
        Ok(*head)
    }

    pub fn bytes(&mut self, len: usize, context: &str) -> Result<&'a [u8], CodecError> {
        if self.rest.len() < len {
            return Err(CodecError::truncated(context));
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        self.consumed += len;
        Ok(head)
    }

    pub fn u8(&mut self, context: &str) -> Result<u8, CodecError> {
        let [b] = self.array::<1>(context)?;
        Ok(b)
    }

    pub fn u16_le(&mut self, context: &str) -> Result<u16, CodecError> {
        self.array(context).map(u16::from_le_bytes)
    }

    pub fn u32_le(&mut self, context: &str) -> Result<u32, CodecError> {
        self.array(context).map(u32::from_le_bytes)
    }

    pub fn u16_be(&mut self, context: &str) -> Result<u16, CodecError> {
        self.array(context).map(u16::from_be_bytes)
    }

    pub fn u32_be(&mut self, context: &str) -> Result<u32, CodecError> {
        self.array(context).map(u32::from_be_bytes)
    }

    /// One-byte length prefix followed by that many UTF-8 bytes.
    pub fn short_string(&mut self, context: &str) -> Result<String, CodecError> {
        let len = self.u8(context)?;
        let raw = self.bytes(usize::from(len), context)?;
        String::from_utf8(raw.to_vec()).map_err(|e| {
            CodecError::InvalidText(format!("{context} at byte {}", e.utf8_error().valid_up_to()))
        })
    }
}
