//! Little-endian cursor and writer used by the metadata and record codecs.
//!
//! `ByteReader` tracks its absolute offset in the stream so that truncation
//! and malformed-string errors can point at the offending byte.
use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::DbnError;
use crate::result::Result;

/// Bounds-checked little-endian reader over a byte slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

#[allow(missing_docs)]
impl<'a> ByteReader<'a> {
    /// Reader whose offsets start at zero.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_base(buf, 0)
    }

    /// Reader whose reported offsets start at `base`, the position of
    /// `buf[0]` in the enclosing stream.
    pub fn with_base(buf: &'a [u8], base: usize) -> Self {
        ByteReader { buf, pos: 0, base }
    }

    /// Absolute offset of the next byte to be read.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes left in the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Takes the next `n` bytes.
    pub fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(DbnError::Truncated {
                context,
                offset: self.offset(),
                expected: n,
                got: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Skips `n` reserved or ignored bytes.
    pub fn skip(&mut self, n: usize, context: &'static str) -> Result<()> {
        self.take(n, context).map(|_| ())
    }

    /// Reads a fixed-size array.
    pub fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }

    pub fn u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.take(1, context)?[0])
    }

    pub fn i8(&mut self, context: &'static str) -> Result<i8> {
        Ok(self.u8(context)? as i8)
    }

    pub fn u16(&mut self, context: &'static str) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2, context)?))
    }

    pub fn i16(&mut self, context: &'static str) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2, context)?))
    }

    pub fn u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, context)?))
    }

    pub fn i32(&mut self, context: &'static str) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4, context)?))
    }

    pub fn u64(&mut self, context: &'static str) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8, context)?))
    }

    pub fn i64(&mut self, context: &'static str) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take(8, context)?))
    }

    /// Reads a NUL-padded string occupying exactly `width` bytes.
    pub fn c_str(&mut self, width: usize, field: &'static str) -> Result<String> {
        let offset = self.offset();
        let bytes = self.take(width, field)?;
        decode_c_str(bytes, field, offset)
    }
}

/// Decodes a fixed-width C string starting at stream offset `offset`.
///
/// The value ends at the first NUL; everything after it must be NUL too.
pub fn decode_c_str(bytes: &[u8], field: &'static str, offset: usize) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if let Some(bad) = bytes[end..].iter().position(|&b| b != 0) {
        return Err(DbnError::InvalidCString {
            field,
            offset: offset + end + bad,
        });
    }
    std::str::from_utf8(&bytes[..end])
        .map(str::to_owned)
        .map_err(|_| DbnError::InvalidUtf8 { field, offset })
}

/// Reads until `buf` is full or the source reports EOF. Returns the number of
/// bytes read, so callers can tell a clean EOF (0) from a short read.
pub fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Fills `buf` completely or fails with `Truncated`.
pub fn read_exact_or_truncated<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
    offset: usize,
) -> Result<()> {
    let got = read_up_to(reader, buf)?;
    if got < buf.len() {
        return Err(DbnError::Truncated {
            context,
            offset,
            expected: buf.len(),
            got,
        });
    }
    Ok(())
}

/// Growable little-endian writer, the inverse of `ByteReader`.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

#[allow(missing_docs)]
impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes `n` zero bytes.
    pub fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn i16(&mut self, v: i16) {
        let mut b = [0u8; 2];
        LittleEndian::write_i16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn i32(&mut self, v: i32) {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn u64(&mut self, v: u64) {
        let mut b = [0u8; 8];
        LittleEndian::write_u64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn i64(&mut self, v: i64) {
        let mut b = [0u8; 8];
        LittleEndian::write_i64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    /// Writes `value` NUL-padded to `width` bytes. The value must leave room
    /// for at least one terminator.
    pub fn c_str(&mut self, value: &str, width: usize, field: &'static str) -> Result<()> {
        if value.len() >= width {
            return Err(DbnError::StringTooLong {
                field,
                len: value.len(),
                width,
            });
        }
        self.buf.extend_from_slice(value.as_bytes());
        self.zeros(width - value.len());
        Ok(())
    }

    /// Overwrites a `u32` at an earlier position, used for length prefixes.
    pub fn patch_u32(&mut self, at: usize, v: u32) {
        LittleEndian::write_u32(&mut self.buf[at..at + 4], v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_and_tracks_offset() {
        let bytes = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xff];
        let mut reader = ByteReader::with_base(&bytes, 100);
        assert_eq!(reader.u16("a").ok(), Some(0x1234));
        assert_eq!(reader.u32("b").ok(), Some(0x1234_5678));
        assert_eq!(reader.offset(), 106);
        match reader.u16("tail") {
            Err(DbnError::Truncated {
                context,
                offset,
                expected,
                got,
            }) => {
                assert_eq!(context, "tail");
                assert_eq!(offset, 106);
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn c_str_trims_padding() {
        let mut reader = ByteReader::new(b"ESH1\0\0\0\0");
        assert_eq!(reader.c_str(8, "symbol").ok().as_deref(), Some("ESH1"));
    }

    #[test]
    fn c_str_rejects_bytes_after_terminator() {
        let err = decode_c_str(b"ES\0\0X\0", "symbol", 40);
        match err {
            Err(DbnError::InvalidCString { field, offset }) => {
                assert_eq!(field, "symbol");
                assert_eq!(offset, 44);
            }
            other => panic!("expected invalid C string, got {:?}", other),
        }
    }

    #[test]
    fn writer_pads_and_checks_width() {
        let mut writer = ByteWriter::new();
        writer.c_str("ESH1", 6, "symbol").unwrap();
        writer.u16(0xBEEF);
        assert_eq!(writer.into_inner(), b"ESH1\0\0\xEF\xBE".to_vec());

        let mut writer = ByteWriter::new();
        assert!(matches!(
            writer.c_str("TOOLONG", 7, "symbol"),
            Err(DbnError::StringTooLong { width: 7, .. })
        ));
    }
}
