//! Window records
//!
//! A window owns its tree links (parent id, ordered child list), geometry,
//! attributes, the property map, and any passive grabs registered on it.
//! Tree-wide operations live on [`crate::resources::ResourceTable`] because
//! they touch several windows at once.

use std::collections::HashMap;

use crate::core::ids::{Atom, ClientId, ColormapId, CursorId, WindowId};
use crate::input::grabs::PassiveGrab;
use crate::protocol::events::EventMask;
use crate::protocol::requests::WindowAttrValues;

/// Map state as reported by GetWindowAttributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MapState {
    Unmapped = 0,
    Unviewable = 1,
    Viewable = 2,
}

/// Mutable per-window attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowAttributes {
    pub background_pixmap: u32,
    pub background_pixel: Option<u32>,
    pub border_pixmap: u32,
    pub border_pixel: Option<u32>,
    pub bit_gravity: u8,
    pub win_gravity: u8,
    pub backing_store: u8,
    pub backing_planes: u32,
    pub backing_pixel: u32,
    pub override_redirect: bool,
    pub save_under: bool,
    pub event_mask: EventMask,
    pub do_not_propagate_mask: EventMask,
    pub colormap: ColormapId,
    pub cursor: CursorId,
}

impl Default for WindowAttributes {
    fn default() -> Self {
        Self {
            background_pixmap: 0,
            background_pixel: None,
            border_pixmap: 0,
            border_pixel: None,
            bit_gravity: 0,
            win_gravity: 1, // NorthWest
            backing_store: 0,
            backing_planes: !0,
            backing_pixel: 0,
            override_redirect: false,
            save_under: false,
            event_mask: EventMask::empty(),
            do_not_propagate_mask: EventMask::empty(),
            colormap: 0,
            cursor: 0,
        }
    }
}

/// One property row: `(window, atom) -> {type, format, data}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub type_atom: Atom,
    pub format: u8,
    pub data: Vec<u8>,
}

/// A window in the tree
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub owner: ClientId,
    /// Parent id; zero only for the root itself
    pub parent: WindowId,
    /// Bottom-to-top stacking order
    pub children: Vec<WindowId>,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub depth: u8,
    pub class: u16,
    pub visual: u32,
    pub mapped: bool,
    pub map_state: MapState,
    pub attributes: WindowAttributes,
    /// Client whose ChangeWindowAttributes last set the event mask; events
    /// selected on this window are delivered there
    pub event_client: Option<ClientId>,
    pub properties: HashMap<Atom, Property>,
    pub passive_grabs: Vec<PassiveGrab>,
}

impl Window {
    pub fn new(id: WindowId, owner: ClientId, parent: WindowId) -> Self {
        Self {
            id,
            owner,
            parent,
            children: Vec::new(),
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            border_width: 0,
            depth: 24,
            class: 1,
            visual: crate::core::ids::ROOT_VISUAL,
            mapped: false,
            map_state: MapState::Unmapped,
            attributes: WindowAttributes::default(),
            event_client: None,
            properties: HashMap::new(),
            passive_grabs: Vec::new(),
        }
    }

    /// Apply a value list, only touching attributes present in the mask
    pub fn apply_attributes(&mut self, values: &WindowAttrValues, from: ClientId) {
        let a = &mut self.attributes;
        if let Some(v) = values.background_pixmap {
            a.background_pixmap = v;
        }
        if let Some(v) = values.background_pixel {
            a.background_pixel = Some(v);
        }
        if let Some(v) = values.border_pixmap {
            a.border_pixmap = v;
        }
        if let Some(v) = values.border_pixel {
            a.border_pixel = Some(v);
        }
        if let Some(v) = values.bit_gravity {
            a.bit_gravity = v;
        }
        if let Some(v) = values.win_gravity {
            a.win_gravity = v;
        }
        if let Some(v) = values.backing_store {
            a.backing_store = v;
        }
        if let Some(v) = values.backing_planes {
            a.backing_planes = v;
        }
        if let Some(v) = values.backing_pixel {
            a.backing_pixel = v;
        }
        if let Some(v) = values.override_redirect {
            a.override_redirect = v;
        }
        if let Some(v) = values.save_under {
            a.save_under = v;
        }
        if let Some(v) = values.event_mask {
            a.event_mask = EventMask::from_bits_truncate(v);
            self.event_client = Some(from);
        }
        if let Some(v) = values.do_not_propagate_mask {
            a.do_not_propagate_mask = EventMask::from_bits_truncate(v);
        }
        if let Some(v) = values.colormap {
            a.colormap = v;
        }
        if let Some(v) = values.cursor {
            a.cursor = v;
        }
    }

    /// Does this window select any of `mask`?
    pub fn selects(&self, mask: EventMask) -> bool {
        self.attributes.event_mask.intersects(mask)
    }

    /// Does the do-not-propagate mask stop `mask` from bubbling past here?
    pub fn blocks_propagation(&self, mask: EventMask) -> bool {
        self.attributes.do_not_propagate_mask.intersects(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_attributes_is_selective() {
        let mut win = Window::new(0x0020_0001, 1, 0x2);
        let values = WindowAttrValues {
            background_pixel: Some(0xFF0000),
            event_mask: Some(EventMask::BUTTON_PRESS.bits()),
            ..Default::default()
        };
        win.apply_attributes(&values, 1);
        assert_eq!(win.attributes.background_pixel, Some(0xFF0000));
        assert_eq!(win.attributes.event_mask, EventMask::BUTTON_PRESS);
        assert_eq!(win.event_client, Some(1));
        // untouched fields keep their defaults
        assert_eq!(win.attributes.win_gravity, 1);
        assert!(!win.attributes.override_redirect);
    }

    #[test]
    fn test_propagation_block() {
        let mut win = Window::new(0x0020_0001, 1, 0x2);
        win.attributes.do_not_propagate_mask = EventMask::POINTER_MOTION;
        assert!(win.blocks_propagation(EventMask::POINTER_MOTION));
        assert!(!win.blocks_propagation(EventMask::BUTTON_PRESS));
    }
}
