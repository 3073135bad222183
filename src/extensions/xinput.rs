//! XInputExtension requests and constants
//!
//! Versions 1 and 2 share the major opcode and dispatch by minor. The server
//! exposes two fixed devices: the virtual core pointer (2) and the virtual
//! core keyboard (3).

use crate::core::errors::{HandlerResult, X11Error};
use crate::protocol::wire::WireReader;

/// Extension name for QueryExtension
pub const NAME: &str = "XInputExtension";

/// Device ids
pub const DEVICE_POINTER: u8 = 2;
pub const DEVICE_KEYBOARD: u8 = 3;

/// XISelectEvents device sentinels
pub const XI_ALL_DEVICES: u16 = 0;
pub const XI_ALL_MASTER_DEVICES: u16 = 1;

// XInput1 minor opcodes
pub const GET_EXTENSION_VERSION: u8 = 1;
pub const LIST_INPUT_DEVICES: u8 = 2;
pub const OPEN_DEVICE: u8 = 3;
pub const CLOSE_DEVICE: u8 = 4;
pub const SELECT_EXTENSION_EVENT: u8 = 6;
pub const GET_SELECTED_EXTENSION_EVENTS: u8 = 7;
pub const GRAB_DEVICE: u8 = 13;
pub const UNGRAB_DEVICE: u8 = 14;
pub const GRAB_DEVICE_KEY: u8 = 15;
pub const UNGRAB_DEVICE_KEY: u8 = 16;
pub const GRAB_DEVICE_BUTTON: u8 = 17;
pub const UNGRAB_DEVICE_BUTTON: u8 = 18;
pub const ALLOW_DEVICE_EVENTS: u8 = 19;
pub const GET_DEVICE_BUTTON_MAPPING: u8 = 28;
pub const QUERY_DEVICE_STATE: u8 = 30;
pub const DEVICE_BELL: u8 = 32;

// XInput2 minor opcodes
pub const XI_QUERY_POINTER: u8 = 40;
pub const XI_SELECT_EVENTS: u8 = 46;
pub const XI_QUERY_VERSION: u8 = 47;
pub const XI_QUERY_DEVICE: u8 = 48;
pub const XI_GRAB_DEVICE: u8 = 51;
pub const XI_UNGRAB_DEVICE: u8 = 52;
pub const XI_GET_SELECTED_EVENTS: u8 = 60;

/// XInput1 event-class masks; a class on the wire is `mask << 8 | device`
pub mod class_mask {
    pub const DEVICE_KEY_PRESS: u32 = 1 << 0;
    pub const DEVICE_KEY_RELEASE: u32 = 1 << 1;
    pub const DEVICE_BUTTON_PRESS: u32 = 1 << 2;
    pub const DEVICE_BUTTON_RELEASE: u32 = 1 << 3;
    pub const DEVICE_MOTION: u32 = 1 << 4;
}

/// Split an XInput1 event class into `(mask, device)`
pub fn split_class(class: u32) -> (u32, u8) {
    (class >> 8, (class & 0xFF) as u8)
}

/// XInput2 event types
pub mod xi2_event {
    pub const KEY_PRESS: u16 = 2;
    pub const KEY_RELEASE: u16 = 3;
    pub const BUTTON_PRESS: u16 = 4;
    pub const BUTTON_RELEASE: u16 = 5;
    pub const MOTION: u16 = 6;
    pub const RAW_MOTION: u16 = 17;
}

/// One XISelectEvents entry: a device and its event-type mask bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xi2MaskEntry {
    pub device: u16,
    pub mask: u32,
}

/// Decoded XInputExtension requests
#[derive(Debug, Clone, PartialEq)]
pub enum XiRequest {
    GetExtensionVersion {
        name: String,
    },
    ListInputDevices,
    OpenDevice {
        device: u8,
    },
    CloseDevice {
        device: u8,
    },
    SelectExtensionEvent {
        window: u32,
        classes: Vec<u32>,
    },
    GetSelectedExtensionEvents {
        window: u32,
    },
    GrabDevice {
        window: u32,
        time: u32,
        this_device_mode: u8,
        other_device_mode: u8,
        owner_events: bool,
        device: u8,
        classes: Vec<u32>,
    },
    UngrabDevice {
        time: u32,
        device: u8,
    },
    GrabDeviceButton {
        window: u32,
        grabbed_device: u8,
        modifier_device: u8,
        modifiers: u16,
        this_device_mode: u8,
        other_device_mode: u8,
        button: u8,
        owner_events: bool,
        classes: Vec<u32>,
    },
    UngrabDeviceButton {
        window: u32,
        modifiers: u16,
        button: u8,
        grabbed_device: u8,
    },
    GrabDeviceKey {
        window: u32,
        grabbed_device: u8,
        modifier_device: u8,
        modifiers: u16,
        this_device_mode: u8,
        other_device_mode: u8,
        key: u8,
        owner_events: bool,
        classes: Vec<u32>,
    },
    UngrabDeviceKey {
        window: u32,
        modifiers: u16,
        key: u8,
        grabbed_device: u8,
    },
    AllowDeviceEvents {
        time: u32,
        mode: u8,
        device: u8,
    },
    GetDeviceButtonMapping {
        device: u8,
    },
    QueryDeviceState {
        device: u8,
    },
    DeviceBell {
        device: u8,
        feedback_id: u8,
        feedback_class: u8,
        percent: i8,
    },
    XiQueryVersion {
        major: u16,
        minor: u16,
    },
    XiQueryDevice {
        device: u16,
    },
    XiSelectEvents {
        window: u32,
        masks: Vec<Xi2MaskEntry>,
    },
    XiGetSelectedEvents {
        window: u32,
    },
    XiQueryPointer {
        window: u32,
        device: u16,
    },
    XiGrabDevice {
        window: u32,
        time: u32,
        cursor: u32,
        device: u16,
        grab_mode: u8,
        paired_device_mode: u8,
        owner_events: bool,
        mask: u32,
    },
    XiUngrabDevice {
        time: u32,
        device: u16,
    },
}

impl XiRequest {
    pub fn decode(minor: u8, r: &mut WireReader) -> HandlerResult<XiRequest> {
        let req = match minor {
            GET_EXTENSION_VERSION => {
                let len = r.u16()? as usize;
                r.skip(2)?;
                XiRequest::GetExtensionVersion {
                    name: r.string8(len)?,
                }
            }
            LIST_INPUT_DEVICES => XiRequest::ListInputDevices,
            OPEN_DEVICE => XiRequest::OpenDevice { device: r.u8()? },
            CLOSE_DEVICE => XiRequest::CloseDevice { device: r.u8()? },
            SELECT_EXTENSION_EVENT => {
                let window = r.u32()?;
                let count = r.u16()? as usize;
                r.skip(2)?;
                let mut classes = Vec::with_capacity(count);
                for _ in 0..count {
                    classes.push(r.u32()?);
                }
                XiRequest::SelectExtensionEvent { window, classes }
            }
            GET_SELECTED_EXTENSION_EVENTS => {
                XiRequest::GetSelectedExtensionEvents { window: r.u32()? }
            }
            GRAB_DEVICE => {
                let window = r.u32()?;
                let time = r.u32()?;
                let count = r.u16()? as usize;
                let this_device_mode = r.u8()?;
                let other_device_mode = r.u8()?;
                let owner_events = r.u8()? != 0;
                let device = r.u8()?;
                r.skip(2)?;
                let mut classes = Vec::with_capacity(count);
                for _ in 0..count {
                    classes.push(r.u32()?);
                }
                XiRequest::GrabDevice {
                    window,
                    time,
                    this_device_mode,
                    other_device_mode,
                    owner_events,
                    device,
                    classes,
                }
            }
            UNGRAB_DEVICE => {
                let time = r.u32()?;
                let device = r.u8()?;
                XiRequest::UngrabDevice { time, device }
            }
            GRAB_DEVICE_BUTTON => {
                let window = r.u32()?;
                let grabbed_device = r.u8()?;
                let modifier_device = r.u8()?;
                let count = r.u16()? as usize;
                let modifiers = r.u16()?;
                let this_device_mode = r.u8()?;
                let other_device_mode = r.u8()?;
                let button = r.u8()?;
                let owner_events = r.u8()? != 0;
                r.skip(2)?;
                let mut classes = Vec::with_capacity(count);
                for _ in 0..count {
                    classes.push(r.u32()?);
                }
                XiRequest::GrabDeviceButton {
                    window,
                    grabbed_device,
                    modifier_device,
                    modifiers,
                    this_device_mode,
                    other_device_mode,
                    button,
                    owner_events,
                    classes,
                }
            }
            UNGRAB_DEVICE_BUTTON => {
                let window = r.u32()?;
                let modifiers = r.u16()?;
                let _modifier_device = r.u8()?;
                let button = r.u8()?;
                let grabbed_device = r.u8()?;
                XiRequest::UngrabDeviceButton {
                    window,
                    modifiers,
                    button,
                    grabbed_device,
                }
            }
            GRAB_DEVICE_KEY => {
                let window = r.u32()?;
                let grabbed_device = r.u8()?;
                let modifier_device = r.u8()?;
                let count = r.u16()? as usize;
                let modifiers = r.u16()?;
                let this_device_mode = r.u8()?;
                let other_device_mode = r.u8()?;
                let key = r.u8()?;
                let owner_events = r.u8()? != 0;
                r.skip(2)?;
                let mut classes = Vec::with_capacity(count);
                for _ in 0..count {
                    classes.push(r.u32()?);
                }
                XiRequest::GrabDeviceKey {
                    window,
                    grabbed_device,
                    modifier_device,
                    modifiers,
                    this_device_mode,
                    other_device_mode,
                    key,
                    owner_events,
                    classes,
                }
            }
            UNGRAB_DEVICE_KEY => {
                let window = r.u32()?;
                let modifiers = r.u16()?;
                let _modifier_device = r.u8()?;
                let key = r.u8()?;
                let grabbed_device = r.u8()?;
                XiRequest::UngrabDeviceKey {
                    window,
                    modifiers,
                    key,
                    grabbed_device,
                }
            }
            ALLOW_DEVICE_EVENTS => XiRequest::AllowDeviceEvents {
                time: r.u32()?,
                mode: r.u8()?,
                device: r.u8()?,
            },
            GET_DEVICE_BUTTON_MAPPING => {
                XiRequest::GetDeviceButtonMapping { device: r.u8()? }
            }
            QUERY_DEVICE_STATE => XiRequest::QueryDeviceState { device: r.u8()? },
            DEVICE_BELL => XiRequest::DeviceBell {
                device: r.u8()?,
                feedback_id: r.u8()?,
                feedback_class: r.u8()?,
                percent: r.i8()?,
            },
            XI_QUERY_VERSION => XiRequest::XiQueryVersion {
                major: r.u16()?,
                minor: r.u16()?,
            },
            XI_QUERY_DEVICE => XiRequest::XiQueryDevice { device: r.u16()? },
            XI_SELECT_EVENTS => {
                let window = r.u32()?;
                let num_masks = r.u16()? as usize;
                r.skip(2)?;
                let mut masks = Vec::with_capacity(num_masks);
                for _ in 0..num_masks {
                    let device = r.u16()?;
                    let mask_len = r.u16()? as usize;
                    let mut mask = 0u32;
                    for word in 0..mask_len {
                        let bits = r.u32()?;
                        // events beyond 31 are outside the supported set
                        if word == 0 {
                            mask = bits;
                        }
                    }
                    masks.push(Xi2MaskEntry { device, mask });
                }
                XiRequest::XiSelectEvents { window, masks }
            }
            XI_GET_SELECTED_EVENTS => XiRequest::XiGetSelectedEvents { window: r.u32()? },
            XI_QUERY_POINTER => XiRequest::XiQueryPointer {
                window: r.u32()?,
                device: r.u16()?,
            },
            XI_GRAB_DEVICE => {
                let window = r.u32()?;
                let time = r.u32()?;
                let cursor = r.u32()?;
                let device = r.u16()?;
                let grab_mode = r.u8()?;
                let paired_device_mode = r.u8()?;
                let owner_events = r.u8()? != 0;
                r.skip(1)?;
                let mask_len = r.u16()? as usize;
                let mut mask = 0u32;
                for word in 0..mask_len {
                    let bits = r.u32()?;
                    if word == 0 {
                        mask = bits;
                    }
                }
                XiRequest::XiGrabDevice {
                    window,
                    time,
                    cursor,
                    device,
                    grab_mode,
                    paired_device_mode,
                    owner_events,
                    mask,
                }
            }
            XI_UNGRAB_DEVICE => XiRequest::XiUngrabDevice {
                time: r.u32()?,
                device: r.u16()?,
            },
            _ => return Err(X11Error::request()),
        };
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::{WireOrder, WireWriter};

    #[test]
    fn test_split_class() {
        let class = (class_mask::DEVICE_BUTTON_PRESS << 8) | DEVICE_POINTER as u32;
        assert_eq!(split_class(class), (class_mask::DEVICE_BUTTON_PRESS, 2));
    }

    #[test]
    fn test_decode_select_extension_event() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(0x0020_0001).u16(1).u16(0);
        w.u32((class_mask::DEVICE_BUTTON_PRESS << 8) | 2);
        let mut r = WireReader::new(w.as_slice(), WireOrder::Lsb);
        let req = XiRequest::decode(SELECT_EXTENSION_EVENT, &mut r).unwrap();
        match req {
            XiRequest::SelectExtensionEvent { window, classes } => {
                assert_eq!(window, 0x0020_0001);
                assert_eq!(classes.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_xi_select_events_raw_motion() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(0x2).u16(1).u16(0);
        w.u16(XI_ALL_MASTER_DEVICES).u16(1);
        w.u32(1 << xi2_event::RAW_MOTION);
        let mut r = WireReader::new(w.as_slice(), WireOrder::Lsb);
        let req = XiRequest::decode(XI_SELECT_EVENTS, &mut r).unwrap();
        match req {
            XiRequest::XiSelectEvents { window, masks } => {
                assert_eq!(window, 0x2);
                assert_eq!(masks[0].device, XI_ALL_MASTER_DEVICES);
                assert_eq!(masks[0].mask, 0x0002_0000);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_minor_is_request_error() {
        let mut r = WireReader::new(&[], WireOrder::Lsb);
        let err = XiRequest::decode(99, &mut r).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Request);
    }
}
