//! LEB128 (Little Endian Base 128) encoding and decoding utilities
//!
//! Each byte carries 7 payload bits from the low end; the high bit signals
//! that another byte follows. Readers take `(data, offset)` and return the
//! decoded value with the number of bytes consumed.

use wasmlens_error::{Error, Result};

/// Read a LEB128 encoded unsigned 32-bit integer
pub fn read_leb128_u32(data: &[u8], mut offset: usize) -> Result<(u32, usize)> {
    let mut result = 0u32;
    let mut shift = 0;
    let start_offset = offset;

    loop {
        let Some(&byte) = data.get(offset) else {
            return Err(Error::out_of_data("Unexpected end of data while reading LEB128")
                .with_offset(offset));
        };

        if shift >= 32 || (shift == 28 && byte & 0x70 != 0) {
            return Err(Error::integer_too_large("LEB128 value too large for u32")
                .with_offset(start_offset));
        }

        offset += 1;
        result |= u32::from(byte & 0x7F) << shift;

        if (byte & 0x80) == 0 {
            break;
        }

        shift += 7;
    }

    Ok((result, offset - start_offset))
}

/// Read a LEB128 encoded signed 32-bit integer
pub fn read_leb128_i32(data: &[u8], mut offset: usize) -> Result<(i32, usize)> {
    let mut result = 0i32;
    let mut shift = 0;
    let start_offset = offset;
    let mut byte;

    loop {
        let Some(&next) = data.get(offset) else {
            return Err(Error::out_of_data("Unexpected end of data while reading LEB128")
                .with_offset(offset));
        };
        byte = next;

        if shift >= 32 {
            return Err(Error::integer_too_large("LEB128 value too large for i32")
                .with_offset(start_offset));
        }

        offset += 1;
        result |= i32::from(byte & 0x7F) << shift;
        shift += 7;

        if (byte & 0x80) == 0 {
            break;
        }
    }

    // Sign extend from the last partial group
    if shift < 32 && (byte & 0x40) != 0 {
        result |= !0 << shift;
    }

    Ok((result, offset - start_offset))
}

/// Read a LEB128 encoded signed 64-bit integer (the `i64.const` immediate)
pub fn read_leb128_i64(data: &[u8], mut offset: usize) -> Result<(i64, usize)> {
    let mut result = 0i64;
    let mut shift = 0;
    let start_offset = offset;
    let mut byte;

    loop {
        let Some(&next) = data.get(offset) else {
            return Err(Error::out_of_data("Unexpected end of data while reading LEB128")
                .with_offset(offset));
        };
        byte = next;

        if shift >= 64 {
            return Err(Error::integer_too_large("LEB128 value too large for i64")
                .with_offset(start_offset));
        }

        offset += 1;
        result |= i64::from(byte & 0x7F) << shift;
        shift += 7;

        if (byte & 0x80) == 0 {
            break;
        }
    }

    if shift < 64 && (byte & 0x40) != 0 {
        result |= !0 << shift;
    }

    Ok((result, offset - start_offset))
}

/// Write a LEB128 encoded unsigned 32-bit integer
///
/// Zero encodes to the single byte `0x00`.
pub fn write_leb128_u32(value: u32, out: &mut Vec<u8>) {
    let mut value = value;

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }

        out.push(byte);

        if value == 0 {
            break;
        }
    }
}

/// Write a LEB128 encoded signed 32-bit integer
pub fn write_leb128_i32(value: i32, out: &mut Vec<u8>) {
    write_leb128_i64(i64::from(value), out);
}

/// Write a LEB128 encoded signed 64-bit integer
pub fn write_leb128_i64(value: i64, out: &mut Vec<u8>) {
    let mut value = value;
    let mut more = true;

    while more {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        let sign_bit_set = (byte & 0x40) != 0;
        more = !((value == 0 && !sign_bit_set) || (value == -1 && sign_bit_set));

        if more {
            byte |= 0x80;
        }

        out.push(byte);
    }
}

/// Longest LEB128 encoding of a `u32`
pub const MAX_LEB128_U32_LEN: usize = 5;

/// Write `value` using exactly `width` bytes, padding with continuation
/// bytes when the minimal encoding is shorter.
///
/// Falls back to the minimal encoding when `value` does not fit in `width`
/// bytes or `width` exceeds [`MAX_LEB128_U32_LEN`].
pub fn write_leb128_u32_padded(value: u32, width: usize, out: &mut Vec<u8>) {
    if width < leb128_u32_len(value) || width > MAX_LEB128_U32_LEN {
        write_leb128_u32(value, out);
        return;
    }
    let mut value = value;
    for _ in 1..width {
        out.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    out.push((value & 0x7F) as u8);
}

/// Number of bytes `write_leb128_u32` emits for `value`
pub fn leb128_u32_len(value: u32) -> usize {
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}
