//! Byte-order aware wire primitives
//!
//! Every connection negotiates MSB or LSB integers in the setup handshake;
//! [`WireReader`] and [`WireWriter`] carry that choice so the codec above
//! them never branches on endianness.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::core::errors::{HandlerResult, X11Error};

/// Negotiated integer byte order for one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireOrder {
    Lsb,
    Msb,
}

impl WireOrder {
    /// Parse the first handshake byte: 0x42 'B' selects MSB, 0x6C 'l' LSB
    pub fn from_setup_byte(byte: u8) -> Option<Self> {
        match byte {
            0x42 => Some(WireOrder::Msb),
            0x6C => Some(WireOrder::Lsb),
            _ => None,
        }
    }

    /// Image byte order value for the setup response (0 = LSB first)
    pub fn image_byte_order(self) -> u8 {
        match self {
            WireOrder::Lsb => 0,
            WireOrder::Msb => 1,
        }
    }

    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            WireOrder::Lsb => LittleEndian::read_u16(buf),
            WireOrder::Msb => BigEndian::read_u16(buf),
        }
    }

    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            WireOrder::Lsb => LittleEndian::read_u32(buf),
            WireOrder::Msb => BigEndian::read_u32(buf),
        }
    }

    pub fn write_u16(self, buf: &mut [u8], value: u16) {
        match self {
            WireOrder::Lsb => LittleEndian::write_u16(buf, value),
            WireOrder::Msb => BigEndian::write_u16(buf, value),
        }
    }

    pub fn write_u32(self, buf: &mut [u8], value: u32) {
        match self {
            WireOrder::Lsb => LittleEndian::write_u32(buf, value),
            WireOrder::Msb => BigEndian::write_u32(buf, value),
        }
    }
}

/// Padding needed to bring `len` up to a 4-byte multiple
pub fn pad4(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// Cursor over a request body; underruns surface as `Length` errors
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    order: WireOrder,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8], order: WireOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    pub fn order(&self) -> WireOrder {
        self.order
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> HandlerResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(X11Error::length());
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> HandlerResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn i8(&mut self) -> HandlerResult<i8> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> HandlerResult<u16> {
        let slice = self.take(2)?;
        Ok(self.order.read_u16(slice))
    }

    pub fn i16(&mut self) -> HandlerResult<i16> {
        Ok(self.u16()? as i16)
    }

    pub fn u32(&mut self) -> HandlerResult<u32> {
        let slice = self.take(4)?;
        Ok(self.order.read_u32(slice))
    }

    pub fn i32(&mut self) -> HandlerResult<i32> {
        Ok(self.u32()? as i32)
    }

    pub fn bytes(&mut self, n: usize) -> HandlerResult<&'a [u8]> {
        self.take(n)
    }

    pub fn skip(&mut self, n: usize) -> HandlerResult<()> {
        self.take(n).map(|_| ())
    }

    /// Skip to the next 4-byte boundary relative to the body start
    pub fn skip_pad(&mut self) -> HandlerResult<()> {
        self.skip(pad4(self.pos))
    }

    /// A length-prefixed Latin-1 string of exactly `n` bytes
    pub fn string8(&mut self, n: usize) -> HandlerResult<String> {
        let raw = self.take(n)?;
        Ok(raw.iter().map(|&b| b as char).collect())
    }

    /// Remaining bytes without consuming them
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

/// Growable output buffer with the connection's byte order
#[derive(Debug)]
pub struct WireWriter {
    buf: Vec<u8>,
    order: WireOrder,
}

impl WireWriter {
    pub fn new(order: WireOrder) -> Self {
        Self {
            buf: Vec::with_capacity(32),
            order,
        }
    }

    pub fn order(&self) -> WireOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn i8(&mut self, value: i8) -> &mut Self {
        self.u8(value as u8)
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        let mut tmp = [0u8; 2];
        self.order.write_u16(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.u16(value as u16)
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        let mut tmp = [0u8; 4];
        self.order.write_u32(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.u32(value as u32)
    }

    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(value);
        self
    }

    pub fn zeros(&mut self, n: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + n, 0);
        self
    }

    /// A string padded with NUL to the next 4-byte boundary
    pub fn string8_padded(&mut self, value: &str) -> &mut Self {
        let raw: Vec<u8> = value.chars().map(|c| c as u8).collect();
        let pad = pad4(raw.len());
        self.bytes(&raw);
        self.zeros(pad)
    }

    /// Pad the buffer itself to a 4-byte multiple
    pub fn pad_to_4(&mut self) -> &mut Self {
        let pad = pad4(self.buf.len());
        self.zeros(pad)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order_negotiation() {
        assert_eq!(WireOrder::from_setup_byte(0x42), Some(WireOrder::Msb));
        assert_eq!(WireOrder::from_setup_byte(0x6C), Some(WireOrder::Lsb));
        assert_eq!(WireOrder::from_setup_byte(0x00), None);
    }

    #[test]
    fn test_reader_round_trip_lsb() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u8(7).u16(0x1234).u32(0xDEADBEEF).i16(-2);
        let buf = w.into_vec();
        let mut r = WireReader::new(&buf, WireOrder::Lsb);
        assert_eq!(r.u8().unwrap(), 7);
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u32().unwrap(), 0xDEADBEEF);
        assert_eq!(r.i16().unwrap(), -2);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_reader_underrun_is_length_error() {
        let buf = [1u8, 2];
        let mut r = WireReader::new(&buf, WireOrder::Lsb);
        assert!(r.u32().is_err());
    }

    #[test]
    fn test_msb_layout() {
        let mut w = WireWriter::new(WireOrder::Msb);
        w.u16(0x0102).u32(0x03040506);
        assert_eq!(w.as_slice(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_string_padding() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.string8_padded("abcde");
        assert_eq!(w.len(), 8);
        assert_eq!(&w.as_slice()[5..], &[0, 0, 0]);
    }
}
