//! Little-endian primitive I/O: fixed-width integers/floats, the two
//! UTF-16LE string shapes, and header padding (`spec.md` §4.1).
//!
//! Integer/float reads use `zerocopy` the way `litchi::common::binary`
//! does (`U16::<LE>::read_from_bytes`, …); UTF-16LE decoding goes through
//! `encoding_rs`, the same crate `litchi::ooxml::xlsb::records::wide_str`
//! uses to turn a length-prefixed UTF-16LE blob into a `String`.

use crate::error::CtFormatError;
use encoding_rs::UTF_16LE;
use zerocopy::{FromBytes, IntoBytes, F32, I16, I32, LE, U16, U32, U64};

/// Sequential little-endian reader over an in-memory CT byte buffer.
pub struct CtReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CtReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], CtFormatError> {
        if self.pos + len > self.data.len() {
            return Err(CtFormatError::UnexpectedEof {
                field,
                needed: self.pos + len - self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, CtFormatError> {
        Ok(self.take(field, 1)?[0])
    }

    pub fn read_i16(&mut self, field: &'static str) -> Result<i16, CtFormatError> {
        let bytes = self.take(field, 2)?;
        Ok(I16::<LE>::read_from_bytes(bytes)
            .map_err(|_| CtFormatError::UnexpectedEof { field, needed: 2 })?
            .get())
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, CtFormatError> {
        let bytes = self.take(field, 2)?;
        Ok(U16::<LE>::read_from_bytes(bytes)
            .map_err(|_| CtFormatError::UnexpectedEof { field, needed: 2 })?
            .get())
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, CtFormatError> {
        let bytes = self.take(field, 4)?;
        Ok(I32::<LE>::read_from_bytes(bytes)
            .map_err(|_| CtFormatError::UnexpectedEof { field, needed: 4 })?
            .get())
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, CtFormatError> {
        let bytes = self.take(field, 4)?;
        Ok(U32::<LE>::read_from_bytes(bytes)
            .map_err(|_| CtFormatError::UnexpectedEof { field, needed: 4 })?
            .get())
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, CtFormatError> {
        let bytes = self.take(field, 8)?;
        Ok(U64::<LE>::read_from_bytes(bytes)
            .map_err(|_| CtFormatError::UnexpectedEof { field, needed: 8 })?
            .get())
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, CtFormatError> {
        let bytes = self.take(field, 4)?;
        Ok(F32::<LE>::read_from_bytes(bytes)
            .map_err(|_| CtFormatError::UnexpectedEof { field, needed: 4 })?
            .get())
    }

    /// Body string: 4-byte LE code-unit count `L`, then `2*L` bytes of
    /// UTF-16LE, no terminator (`spec.md` §4.1).
    pub fn read_body_string(&mut self, field: &'static str) -> Result<String, CtFormatError> {
        let len = self.read_u32(field)? as usize;
        let bytes = self.take(field, len * 2)?;
        Ok(UTF_16LE.decode(bytes).0.into_owned())
    }

    /// Header string: UTF-16LE code units up to and including a single
    /// `0x0000` terminator, no length prefix (`spec.md` §4.1). Used only
    /// inside the 64-byte header for the magic and the timestamp.
    pub fn read_header_string(&mut self, field: &'static str) -> Result<String, CtFormatError> {
        let mut units: Vec<u16> = Vec::new();
        loop {
            let unit = self.read_u16(field)?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        let mut bytes = Vec::with_capacity(units.len() * 2);
        for unit in units {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        Ok(UTF_16LE.decode(&bytes).0.into_owned())
    }

    /// Skip zero-padding bytes until the cursor reaches `target`. Fails
    /// with `HeaderOverflow` if the cursor has already passed `target`.
    pub fn skip_padding_to(&mut self, target: usize) -> Result<(), CtFormatError> {
        if self.pos > target {
            return Err(CtFormatError::HeaderOverflow);
        }
        self.pos = target;
        Ok(())
    }
}

/// Sequential little-endian writer building a CT byte buffer.
#[derive(Default)]
pub struct CtWriter {
    buf: Vec<u8>,
}

impl CtWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(I16::<LE>::new(v).as_bytes());
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(U16::<LE>::new(v).as_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(I32::<LE>::new(v).as_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(U32::<LE>::new(v).as_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(U64::<LE>::new(v).as_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(F32::<LE>::new(v).as_bytes());
    }

    /// Encode as a body string (4-byte LE code-unit count + payload, no
    /// terminator). Fails if the UTF-16 code-unit count overflows `u32`.
    pub fn write_body_string(&mut self, s: &str) -> Result<(), CtFormatError> {
        let units: Vec<u16> = s.encode_utf16().collect();
        if units.len() > u32::MAX as usize {
            return Err(CtFormatError::StringTooLong(units.len()));
        }
        self.write_u32(units.len() as u32);
        for unit in units {
            self.write_u16(unit);
        }
        Ok(())
    }

    /// Encode as a NUL-terminated header string with no length prefix.
    pub fn write_header_string(&mut self, s: &str) {
        for unit in s.encode_utf16() {
            self.write_u16(unit);
        }
        self.write_u16(0);
    }

    /// Pad with `0x00` bytes until the cursor reaches `target`. Fails
    /// with `TimestampTooLong` if the cursor already reached or passed it.
    pub fn pad_to(&mut self, target: usize) -> Result<(), CtFormatError> {
        if self.buf.len() >= target {
            return Err(CtFormatError::TimestampTooLong);
        }
        self.buf.resize(target, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trip() {
        let mut w = CtWriter::new();
        w.write_u32(0xDEADBEEF);
        let bytes = w.into_bytes();
        let mut r = CtReader::new(&bytes);
        assert_eq!(r.read_u32("x").unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn body_string_empty() {
        let mut w = CtWriter::new();
        w.write_body_string("").unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 4);
        let mut r = CtReader::new(&bytes);
        assert_eq!(r.read_body_string("s").unwrap(), "");
    }

    #[test]
    fn body_string_round_trip_cjk() {
        let mut w = CtWriter::new();
        w.write_body_string("你好").unwrap();
        let bytes = w.into_bytes();
        let mut r = CtReader::new(&bytes);
        assert_eq!(r.read_body_string("s").unwrap(), "你好");
    }

    #[test]
    fn header_string_terminated() {
        let mut w = CtWriter::new();
        w.write_header_string("RO2SEC!");
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 16);
        let mut r = CtReader::new(&bytes);
        assert_eq!(r.read_header_string("magic").unwrap(), "RO2SEC!");
        assert_eq!(r.position(), 16);
    }

    #[test]
    fn padding_reaches_target() {
        let mut w = CtWriter::new();
        w.write_u16(1);
        w.pad_to(0x40).unwrap();
        assert_eq!(w.position(), 0x40);
    }

    #[test]
    fn padding_overflow_errs() {
        let mut w = CtWriter::new();
        w.buf.resize(0x41, 0);
        assert!(w.pad_to(0x40).is_err());
    }

    #[test]
    fn read_overflow_is_eof_not_panic() {
        let bytes = [0u8; 2];
        let mut r = CtReader::new(&bytes);
        assert!(r.read_u32("x").is_err());
    }
}
