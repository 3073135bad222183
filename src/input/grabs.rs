//! Grab state
//!
//! One state value per domain (pointer, keyboard, server, per-device), with
//! transitions driven by grab requests and input primitives. Passive grabs
//! are plain data on the window record; the router scans them on each press
//! and installs the equivalent active grab on a match.

use std::collections::HashMap;

use crate::core::ids::{ClientId, CursorId, Timestamp, WindowId};
use crate::protocol::events::EventMask;

/// GrabPointer / GrabKeyboard reply status values
pub mod grab_status {
    pub const SUCCESS: u8 = 0;
    pub const ALREADY_GRABBED: u8 = 1;
    pub const INVALID_TIME: u8 = 2;
    pub const NOT_VIEWABLE: u8 = 3;
    pub const FROZEN: u8 = 4;
}

/// AnyModifier in grab requests
pub const ANY_MODIFIER: u16 = 0x8000;

/// AnyButton / AnyKey detail
pub const ANY_DETAIL: u8 = 0;

/// What a passive grab is armed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassiveGrabKind {
    Button,
    Key,
}

/// A passive grab registered on a window
#[derive(Debug, Clone, PartialEq)]
pub struct PassiveGrab {
    pub kind: PassiveGrabKind,
    /// Button number or keycode; [`ANY_DETAIL`] matches all
    pub detail: u8,
    /// Modifier state to match; [`ANY_MODIFIER`] matches all
    pub modifiers: u16,
    pub owner_events: bool,
    pub event_mask: EventMask,
    pub pointer_mode: u8,
    pub keyboard_mode: u8,
    pub confine_to: WindowId,
    pub cursor: CursorId,
    /// Device id for XInput device grabs; None for core grabs
    pub device: Option<u8>,
    /// XInput event classes armed with the grab
    pub classes: Vec<u32>,
    pub grabbing_client: ClientId,
}

impl PassiveGrab {
    /// Does this grab fire for `detail` under `modifiers`?
    pub fn matches(&self, detail: u8, modifiers: u16) -> bool {
        (self.detail == ANY_DETAIL || self.detail == detail)
            && (self.modifiers == ANY_MODIFIER || self.modifiers == modifiers)
    }
}

/// An engaged pointer grab
#[derive(Debug, Clone, PartialEq)]
pub struct PointerGrab {
    pub window: WindowId,
    pub client: ClientId,
    pub owner_events: bool,
    pub event_mask: EventMask,
    pub confine_to: WindowId,
    pub cursor: CursorId,
    pub pointer_mode: u8,
    pub keyboard_mode: u8,
    pub time: Timestamp,
    /// Installed by a passive grab; released when all buttons go up
    pub from_passive: bool,
}

/// An engaged keyboard grab
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardGrab {
    pub window: WindowId,
    pub client: ClientId,
    pub owner_events: bool,
    pub pointer_mode: u8,
    pub keyboard_mode: u8,
    pub time: Timestamp,
    pub from_passive: bool,
}

/// An engaged XInput device grab
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceGrab {
    pub device: u8,
    pub window: WindowId,
    pub client: ClientId,
    pub owner_events: bool,
    pub classes: Vec<u32>,
    pub time: Timestamp,
    pub from_passive: bool,
}

/// The grab engine's whole mutable state
#[derive(Debug, Default)]
pub struct GrabState {
    pub pointer: Option<PointerGrab>,
    pub keyboard: Option<KeyboardGrab>,
    /// Client holding GrabServer, if any
    pub server: Option<ClientId>,
    /// Engaged device grabs, keyed by device id
    pub device: HashMap<u8, DeviceGrab>,
}

impl GrabState {
    /// Release every grab held by a disconnecting client
    pub fn release_client(&mut self, client: ClientId) {
        if self.pointer.as_ref().is_some_and(|g| g.client == client) {
            self.pointer = None;
        }
        if self.keyboard.as_ref().is_some_and(|g| g.client == client) {
            self.keyboard = None;
        }
        if self.server == Some(client) {
            self.server = None;
        }
        self.device.retain(|_, g| g.client != client);
    }

    /// Is a device grab engaged for `device`?
    pub fn device_grab(&self, device: u8) -> Option<&DeviceGrab> {
        self.device.get(&device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button_grab(detail: u8, modifiers: u16) -> PassiveGrab {
        PassiveGrab {
            kind: PassiveGrabKind::Button,
            detail,
            modifiers,
            owner_events: false,
            event_mask: EventMask::BUTTON_PRESS,
            pointer_mode: 0,
            keyboard_mode: 0,
            confine_to: 0,
            cursor: 0,
            device: None,
            classes: Vec::new(),
            grabbing_client: 1,
        }
    }

    #[test]
    fn test_passive_grab_matching() {
        let exact = button_grab(1, 0x4);
        assert!(exact.matches(1, 0x4));
        assert!(!exact.matches(1, 0));
        assert!(!exact.matches(2, 0x4));

        let any = button_grab(ANY_DETAIL, ANY_MODIFIER);
        assert!(any.matches(3, 0x19));
    }

    #[test]
    fn test_release_client_clears_grabs() {
        let mut grabs = GrabState::default();
        grabs.server = Some(2);
        grabs.device.insert(
            2,
            DeviceGrab {
                device: 2,
                window: 5,
                client: 2,
                owner_events: false,
                classes: vec![],
                time: 1,
                from_passive: false,
            },
        );
        grabs.release_client(2);
        assert!(grabs.server.is_none());
        assert!(grabs.device.is_empty());
    }
}
