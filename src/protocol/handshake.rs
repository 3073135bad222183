//! Connection setup handshake
//!
//! The client opens with a 12-byte setup request (plus authorization data the
//! server accepts unconditionally); the server answers with the setup
//! response describing the single screen. A malformed handshake drops the
//! connection without a reply.

use crate::core::ids::{
    ClientId, DEFAULT_COLORMAP, MAX_KEYCODE, MIN_KEYCODE, RESOURCE_ID_MASK, ROOT_VISUAL,
    ROOT_WINDOW, id_base,
};
use crate::protocol::wire::{WireOrder, WireReader, WireWriter, pad4};

/// Parsed setup request
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub byte_order: WireOrder,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub auth_protocol_name: String,
    pub auth_protocol_data: Vec<u8>,
}

impl SetupRequest {
    /// Bytes of auth data that follow the fixed 12-byte prefix
    pub fn trailing_len(name_len: u16, data_len: u16) -> usize {
        let name = name_len as usize;
        let data = data_len as usize;
        name + pad4(name) + data + pad4(data)
    }

    /// Parse the fixed prefix; `None` when the byte-order byte is invalid
    pub fn parse_prefix(buf: &[u8; 12]) -> Option<(WireOrder, u16, u16, u16, u16)> {
        let order = WireOrder::from_setup_byte(buf[0])?;
        let major = order.read_u16(&buf[2..4]);
        let minor = order.read_u16(&buf[4..6]);
        let name_len = order.read_u16(&buf[6..8]);
        let data_len = order.read_u16(&buf[8..10]);
        Some((order, major, minor, name_len, data_len))
    }

    /// Assemble the full request once the trailing bytes are available
    pub fn parse(
        order: WireOrder,
        major: u16,
        minor: u16,
        name_len: u16,
        data_len: u16,
        trailing: &[u8],
    ) -> Option<Self> {
        let mut r = WireReader::new(trailing, order);
        let name = r.string8(name_len as usize).ok()?;
        r.skip(pad4(name_len as usize)).ok()?;
        let data = r.bytes(data_len as usize).ok()?.to_vec();
        Some(SetupRequest {
            byte_order: order,
            protocol_major_version: major,
            protocol_minor_version: minor,
            auth_protocol_name: name,
            auth_protocol_data: data,
        })
    }
}

/// Screen parameters baked into the setup response
#[derive(Debug, Clone)]
pub struct ScreenDescription {
    pub width: u16,
    pub height: u16,
    pub vendor: String,
}

/// Encode the setup success response for a newly assigned client index
pub fn encode_setup_success(
    client: ClientId,
    screen: &ScreenDescription,
    order: WireOrder,
) -> Vec<u8> {
    // Everything after the 8-byte response prefix
    let mut w = WireWriter::new(order);
    w.u32(11_000_000); // release number
    w.u32(id_base(client));
    w.u32(RESOURCE_ID_MASK);
    w.u32(0); // motion buffer size
    w.u16(screen.vendor.len() as u16);
    w.u16(0xFFFF); // maximum request length in 4-byte units
    w.u8(1); // one screen
    w.u8(1); // one pixmap format
    w.u8(order.image_byte_order());
    w.u8(0); // bitmap bit order: least significant first
    w.u8(32); // bitmap scanline unit
    w.u8(32); // bitmap scanline pad
    w.u8(MIN_KEYCODE);
    w.u8(MAX_KEYCODE);
    w.u32(0);
    w.string8_padded(&screen.vendor);

    // Pixmap format: depth 24, 32 bpp
    w.u8(24).u8(32).u8(32);
    w.zeros(5);

    // Screen
    w.u32(ROOT_WINDOW);
    w.u32(DEFAULT_COLORMAP);
    w.u32(0x00FF_FFFF); // white pixel
    w.u32(0x0000_0000); // black pixel
    w.u32(0); // current input masks
    w.u16(screen.width);
    w.u16(screen.height);
    w.u16(px_to_mm(screen.width));
    w.u16(px_to_mm(screen.height));
    w.u16(1).u16(1); // installed colormaps min/max
    w.u32(ROOT_VISUAL);
    w.u8(0); // backing stores: never
    w.u8(0); // save unders
    w.u8(24); // root depth
    w.u8(1); // one allowed depth

    // Depth 24 with a single TrueColor visual
    w.u8(24).u8(0);
    w.u16(1);
    w.u32(0);
    w.u32(ROOT_VISUAL);
    w.u8(4); // TrueColor
    w.u8(8); // bits per rgb value
    w.u16(256); // colormap entries
    w.u32(0x00FF_0000);
    w.u32(0x0000_FF00);
    w.u32(0x0000_00FF);
    w.u32(0);

    let body = w.into_vec();
    debug_assert_eq!(body.len() % 4, 0);

    let mut out = WireWriter::new(order);
    out.u8(1).u8(0); // success
    out.u16(11).u16(0); // protocol version
    out.u16((body.len() / 4) as u16);
    out.bytes(&body);
    out.into_vec()
}

/// Rough physical size at 96 dpi for the setup response
fn px_to_mm(px: u16) -> u16 {
    ((px as f64) / 96.0 * 25.4) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_rejects_bad_byte_order() {
        let mut buf = [0u8; 12];
        buf[0] = 0x55;
        assert!(SetupRequest::parse_prefix(&buf).is_none());
    }

    #[test]
    fn test_prefix_parses_lsb() {
        let mut buf = [0u8; 12];
        buf[0] = 0x6C;
        buf[2] = 11; // major, little-endian
        let (order, major, minor, name_len, data_len) =
            SetupRequest::parse_prefix(&buf).unwrap();
        assert_eq!(order, WireOrder::Lsb);
        assert_eq!(major, 11);
        assert_eq!(minor, 0);
        assert_eq!(name_len, 0);
        assert_eq!(data_len, 0);
    }

    #[test]
    fn test_setup_success_shape() {
        let screen = ScreenDescription {
            width: 1024,
            height: 768,
            vendor: "sshterm".into(),
        };
        let buf = encode_setup_success(1, &screen, WireOrder::Lsb);
        assert_eq!(buf[0], 1);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 11);
        // additional length covers the rest of the buffer exactly
        let words = u16::from_le_bytes([buf[6], buf[7]]) as usize;
        assert_eq!(buf.len(), 8 + words * 4);
        // resource id base for client 1
        assert_eq!(
            u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            1 << 21
        );
        assert_eq!(
            u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            RESOURCE_ID_MASK
        );
    }
}
