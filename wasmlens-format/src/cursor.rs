//! Owned read position over a module buffer.
//!
//! [`ByteCursor`] owns the bytes being inspected and a position into them.
//! Every read either returns exactly what was asked for and advances, or
//! fails with an error carrying the offset of the faulty byte and leaves the
//! position where the failed read started.

use wasmlens_error::{Error, Result};

use crate::leb128;

/// Byte buffer plus read position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteCursor {
    bytes: Vec<u8>,
    pos: usize,
}

impl ByteCursor {
    /// Create a cursor at position 0
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the read position. Positions past the end are clamped to it.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the buffer holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes left between the position and the end
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// True once every byte has been read
    pub fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// The backing buffer
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the backing buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    /// Swap in a new backing buffer and rewind
    pub fn replace(&mut self, bytes: Vec<u8>) -> Vec<u8> {
        self.pos = 0;
        core::mem::replace(&mut self.bytes, bytes)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Result<u8> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::out_of_data("Attempted to read byte past end of stream").with_offset(self.pos))
    }

    /// Read a fixed-width little-endian u32
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read the 4-byte IEEE 754 immediate of `f32.const`
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array::<4>()?))
    }

    /// Read the 8-byte IEEE 754 immediate of `f64.const`
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array::<8>()?))
    }

    /// Read an unsigned LEB128 value
    pub fn read_var_u32(&mut self) -> Result<u32> {
        let (value, len) = leb128::read_leb128_u32(&self.bytes, self.pos)?;
        self.pos += len;
        Ok(value)
    }

    /// Read a signed LEB128 value
    pub fn read_var_i32(&mut self) -> Result<i32> {
        let (value, len) = leb128::read_leb128_i32(&self.bytes, self.pos)?;
        self.pos += len;
        Ok(value)
    }

    /// Read a signed 64-bit LEB128 value
    pub fn read_var_i64(&mut self) -> Result<i64> {
        let (value, len) = leb128::read_leb128_i64(&self.bytes, self.pos)?;
        self.pos += len;
        Ok(value)
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.read_slice(n)?.to_vec())
    }

    /// Read exactly `n` bytes without copying
    pub fn read_slice(&mut self, n: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                Error::out_of_data("Attempted to read byte array past end of stream")
                    .with_offset(self.bytes.len())
            })?;
        let start = self.pos;
        self.pos = end;
        Ok(&self.bytes[start..end])
    }

    /// Read a VarUInt length followed by that many bytes
    pub fn read_byte_vec(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        let len = self.read_var_u32()? as usize;
        self.read_bytes(len).inspect_err(|_| self.pos = start)
    }

    /// Read a length-prefixed name, one character per byte (Latin-1)
    pub fn read_name(&mut self) -> Result<String> {
        Ok(self.read_byte_vec()?.into_iter().map(char::from).collect())
    }

    /// Insert `bytes` at `at`, shifting everything after it.
    ///
    /// The read position is left untouched. Fails when `at` lies past the
    /// end of the buffer.
    pub fn splice(&mut self, bytes: &[u8], at: usize) -> Result<()> {
        if at > self.bytes.len() {
            return Err(Error::out_of_data("Splice position past end of stream").with_offset(at));
        }
        log::trace!("splicing {} bytes at offset {at:#x}", bytes.len());
        self.bytes.splice(at..at, bytes.iter().copied());
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }
}

impl From<Vec<u8>> for ByteCursor {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for ByteCursor {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmlens_error::codes;

    #[test]
    fn test_read_primitives() {
        let mut cursor = ByteCursor::new(vec![0x00, 0x61, 0x73, 0x6D, 0xE5, 0x8E, 0x26, 0x7F]);
        assert_eq!(cursor.read_u32_le().unwrap(), 0x6D73_6100);
        assert_eq!(cursor.read_var_u32().unwrap(), 624_485);
        assert_eq!(cursor.read_var_i32().unwrap(), -1);
        assert!(cursor.is_eof());
        let err = cursor.read_u8().unwrap_err();
        assert_eq!(err.code, codes::OUT_OF_DATA);
        assert_eq!(err.offset, Some(8));
    }

    #[test]
    fn test_read_bytes_is_exact() {
        let mut cursor = ByteCursor::new(vec![1, 2, 3]);
        assert_eq!(cursor.read_bytes(2).unwrap(), vec![1, 2]);
        assert_eq!(cursor.read_bytes(2).unwrap_err().code, codes::OUT_OF_DATA);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.read_bytes(usize::MAX).unwrap_err().code, codes::OUT_OF_DATA);
    }

    #[test]
    fn test_read_name_is_latin1() {
        let mut cursor = ByteCursor::new(vec![0x03, b'e', 0xE9, b'v']);
        assert_eq!(cursor.read_name().unwrap(), "e\u{e9}v");
    }

    #[test]
    fn test_failed_byte_vec_restores_position() {
        let mut cursor = ByteCursor::new(vec![0x05, b'a']);
        assert!(cursor.read_byte_vec().is_err());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_splice_shifts_tail() {
        let mut cursor = ByteCursor::new(vec![1, 2, 5]);
        cursor.splice(&[3, 4], 2).unwrap();
        assert_eq!(cursor.bytes(), &[1, 2, 3, 4, 5]);
        cursor.splice(&[6], 5).unwrap();
        assert_eq!(cursor.bytes(), &[1, 2, 3, 4, 5, 6]);
        assert!(cursor.splice(&[0], 7).is_err());
    }

    #[test]
    fn test_replace_rewinds() {
        let mut cursor = ByteCursor::new(vec![1, 2]);
        cursor.read_u8().unwrap();
        let old = cursor.replace(vec![9]);
        assert_eq!(old, vec![1, 2]);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u8().unwrap(), 9);
    }
}
