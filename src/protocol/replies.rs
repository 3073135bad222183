//! Reply and error frame encoding
//!
//! Every reply is `{1, data-byte, sequence, length, payload}` where length
//! counts 4-byte units beyond the fixed 32-byte header. Every error is a
//! fixed 32-byte frame.

use crate::core::errors::X11Error;
use crate::protocol::wire::{WireOrder, WireWriter, pad4};

/// A reply body waiting for its sequence number
///
/// `tail` holds the bytes from offset 8 onward; [`Reply::encode`] pads it to
/// the 24-byte minimum and computes the length word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    data: u8,
    tail: Vec<u8>,
}

impl Reply {
    /// A reply whose payload is all zeros
    pub fn empty(data: u8) -> Self {
        Self {
            data,
            tail: Vec::new(),
        }
    }

    /// Build the payload (bytes from offset 8) with a writer
    pub fn build(data: u8, order: WireOrder, f: impl FnOnce(&mut WireWriter)) -> Self {
        let mut w = WireWriter::new(order);
        f(&mut w);
        Self {
            data,
            tail: w.into_vec(),
        }
    }

    /// Encode the full frame for the wire
    pub fn encode(&self, seq: u16, order: WireOrder) -> Vec<u8> {
        let mut tail = self.tail.clone();
        if tail.len() < 24 {
            tail.resize(24, 0);
        }
        tail.resize(tail.len() + pad4(tail.len()), 0);
        let extra_words = ((tail.len() - 24) / 4) as u32;

        let mut w = WireWriter::new(order);
        w.u8(1).u8(self.data).u16(seq).u32(extra_words);
        w.bytes(&tail);
        w.into_vec()
    }
}

/// Encode a protocol error frame
pub fn encode_error(
    err: &X11Error,
    seq: u16,
    major_opcode: u8,
    minor_opcode: u16,
    order: WireOrder,
) -> Vec<u8> {
    let mut w = WireWriter::new(order);
    w.u8(0).u8(err.code as u8).u16(seq);
    w.u32(err.bad_value);
    w.u16(minor_opcode).u8(major_opcode);
    w.zeros(21);
    w.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorCode;

    #[test]
    fn test_empty_reply_is_32_bytes() {
        let buf = Reply::empty(0).encode(3, WireOrder::Lsb);
        assert_eq!(buf.len(), 32);
        assert_eq!(buf[0], 1);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 3);
        assert_eq!(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]), 0);
    }

    #[test]
    fn test_long_reply_length_accounting() {
        let reply = Reply::build(0, WireOrder::Lsb, |w| {
            w.zeros(24); // fixed part
            w.bytes(&[0xAA; 10]); // 10 bytes of list data, padded to 12
        });
        let buf = reply.encode(1, WireOrder::Lsb);
        assert_eq!(buf.len(), 32 + 12);
        assert_eq!(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]), 3);
    }

    #[test]
    fn test_error_frame() {
        let err = X11Error::new(ErrorCode::Window, 0x0020_0001);
        let buf = encode_error(&err, 9, 8, 0, WireOrder::Lsb);
        assert_eq!(buf.len(), 32);
        assert_eq!(buf[0], 0);
        assert_eq!(buf[1], 3);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 9);
        assert_eq!(
            u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            0x0020_0001
        );
        assert_eq!(buf[10], 8); // major opcode
    }
}
