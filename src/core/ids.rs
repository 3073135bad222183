//! Resource id types and arithmetic
//!
//! X11 resource ids are 29-bit values carved into a per-client range: the
//! client index occupies the bits above [`RESOURCE_ID_MASK`], so ownership of
//! any id can be recovered without a table lookup.

pub type Xid = u32;
pub type WindowId = u32;
pub type PixmapId = u32;
pub type DrawableId = u32;
pub type GContextId = u32;
pub type FontId = u32;
pub type CursorId = u32;
pub type ColormapId = u32;
pub type VisualId = u32;
pub type Atom = u32;
pub type Timestamp = u32;
pub type KeyCode = u8;

/// Stable per-connection client index, also the top byte of the id range
pub type ClientId = u8;

/// Low bits of an id available to each client
pub const RESOURCE_ID_MASK: u32 = 0x001F_FFFF;

/// `None` for most resource classes
pub const NONE: u32 = 0;

/// Focus sentinel: the window under the pointer
pub const POINTER_ROOT: u32 = 1;

/// `CurrentTime` in requests; replaced with server time on accept
pub const CURRENT_TIME: Timestamp = 0;

/// Server-owned root window id (outside every client range)
pub const ROOT_WINDOW: WindowId = 0x2;

/// Default colormap id for the single screen
pub const DEFAULT_COLORMAP: ColormapId = 0x1;

/// The single TrueColor visual
pub const ROOT_VISUAL: VisualId = 0x1;

/// Pseudo-client index that holds resources retained across disconnect
pub const RETAINED_CLIENT: ClientId = 0;

/// Keycode range advertised in the setup response
pub const MIN_KEYCODE: KeyCode = 8;
pub const MAX_KEYCODE: KeyCode = 255;

/// Resource id base for a client index
pub fn id_base(client: ClientId) -> u32 {
    (client as u32) << 21
}

/// Client index owning an id (by range; the root window maps to 0)
pub fn id_owner(xid: Xid) -> ClientId {
    (xid >> 21) as ClientId
}

/// True when `xid` falls inside the id range assigned to `client`
pub fn id_in_range(xid: Xid, client: ClientId) -> bool {
    id_owner(xid) == client
}

/// Timestamp comparison with 32-bit wraparound: is `a` strictly before `b`?
pub fn time_before(a: Timestamp, b: Timestamp) -> bool {
    a != b && b.wrapping_sub(a) < 0x8000_0000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_base_round_trip() {
        for client in [1u8, 2, 17, 255] {
            let base = id_base(client);
            assert_eq!(id_owner(base | 5), client);
            assert_eq!(base & RESOURCE_ID_MASK, 0);
        }
    }

    #[test]
    fn test_time_before_wraps() {
        assert!(time_before(10, 20));
        assert!(!time_before(20, 10));
        assert!(!time_before(5, 5));
        assert!(time_before(0xFFFF_FFF0, 4));
    }
}
