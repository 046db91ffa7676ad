//! Growable output buffer, the encoding counterpart of [`ByteCursor`].
//!
//! [`ByteCursor`]: crate::ByteCursor

use crate::leb128;

/// Append-only byte sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when nothing has been written
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// View the written bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the written bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    /// Append one byte
    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Append a little-endian `u32`
    pub fn write_u32_le(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append an `f32` in little-endian IEEE 754 form
    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append an `f64` in little-endian IEEE 754 form
    pub fn write_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append an unsigned LEB128 value in minimal form
    pub fn write_var_u32(&mut self, value: u32) {
        leb128::write_leb128_u32(value, &mut self.bytes);
    }

    /// Append a signed LEB128 `i32`
    pub fn write_var_i32(&mut self, value: i32) {
        leb128::write_leb128_i32(value, &mut self.bytes);
    }

    /// Append a signed LEB128 `i64`
    pub fn write_var_i64(&mut self, value: i64) {
        leb128::write_leb128_i64(value, &mut self.bytes);
    }

    /// Write raw bytes with no prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Write a VarUInt length followed by the bytes
    pub fn write_byte_vec(&mut self, bytes: &[u8]) {
        self.write_var_u32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    /// Write a name one byte per character. Characters above U+00FF do not
    /// survive; names are read as Latin-1 so decoded names always fit.
    pub fn write_name(&mut self, name: &str) {
        let count = name.chars().count();
        self.write_var_u32(count as u32);
        self.bytes.extend(name.chars().map(|c| c as u8));
    }

    /// Build a nested payload with `body` and write it length-prefixed.
    ///
    /// Used for section payloads and function bodies, whose size prefixes
    /// are always recomputed from the encoded content.
    pub fn write_length_prefixed<F>(&mut self, body: F)
    where
        F: FnOnce(&mut ByteWriter),
    {
        self.write_length_prefixed_padded(None, body);
    }

    /// Like [`write_length_prefixed`](Self::write_length_prefixed), but the
    /// length is written `width` bytes wide when it still fits.
    pub fn write_length_prefixed_padded<F>(&mut self, width: Option<usize>, body: F)
    where
        F: FnOnce(&mut ByteWriter),
    {
        let mut inner = ByteWriter::new();
        body(&mut inner);
        let len = inner.bytes.len() as u32;
        match width {
            Some(width) => leb128::write_leb128_u32_padded(len, width, &mut self.bytes),
            None => leb128::write_leb128_u32(len, &mut self.bytes),
        }
        self.bytes.extend_from_slice(&inner.bytes);
    }
}

impl From<ByteWriter> for Vec<u8> {
    fn from(writer: ByteWriter) -> Self {
        writer.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_one_byte_per_char() {
        let mut writer = ByteWriter::new();
        writer.write_name("e\u{e9}v");
        assert_eq!(writer.as_slice(), &[0x03, b'e', 0xE9, b'v']);
    }

    #[test]
    fn test_length_prefix_is_recomputed() {
        let mut writer = ByteWriter::new();
        writer.write_u8(0x01);
        writer.write_length_prefixed(|w| {
            w.write_var_u32(1);
            w.write_u8(0x60);
            w.write_byte_vec(&[0x7F]);
            w.write_var_u32(0);
        });
        assert_eq!(writer.into_inner(), vec![0x01, 0x05, 0x01, 0x60, 0x01, 0x7F, 0x00]);
    }

    #[test]
    fn test_padded_length_prefix() {
        let mut writer = ByteWriter::new();
        writer.write_length_prefixed_padded(Some(5), |w| w.write_bytes(&[0xAA, 0xBB]));
        assert_eq!(writer.as_slice(), &[0x82, 0x80, 0x80, 0x80, 0x00, 0xAA, 0xBB]);

        let mut writer = ByteWriter::new();
        writer.write_length_prefixed_padded(Some(1), |w| w.write_bytes(&[0u8; 200]));
        assert_eq!(&writer.as_slice()[..2], &[0xC8, 0x01]);
    }

    #[test]
    fn test_float_immediates_are_little_endian() {
        let mut writer = ByteWriter::new();
        writer.write_f32(1.0);
        writer.write_u32_le(1);
        assert_eq!(writer.as_slice(), &[0x00, 0x00, 0x80, 0x3F, 0x01, 0x00, 0x00, 0x00]);
    }
}
