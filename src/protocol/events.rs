//! Event encoding
//!
//! Server-to-client events. Core events are exactly 32 bytes; `GenericEvent`
//! carries a length word counting additional 4-byte units. The sequence
//! number is stamped at send time, so encoders take it as an argument.

use bitflags::bitflags;

use crate::core::ids::{Atom, Timestamp, WindowId};
use crate::protocol::opcodes::*;
use crate::protocol::wire::{WireOrder, WireWriter};

bitflags! {
    /// Core event selection mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventMask: u32 {
        const KEY_PRESS = 1 << 0;
        const KEY_RELEASE = 1 << 1;
        const BUTTON_PRESS = 1 << 2;
        const BUTTON_RELEASE = 1 << 3;
        const ENTER_WINDOW = 1 << 4;
        const LEAVE_WINDOW = 1 << 5;
        const POINTER_MOTION = 1 << 6;
        const POINTER_MOTION_HINT = 1 << 7;
        const BUTTON1_MOTION = 1 << 8;
        const BUTTON2_MOTION = 1 << 9;
        const BUTTON3_MOTION = 1 << 10;
        const BUTTON4_MOTION = 1 << 11;
        const BUTTON5_MOTION = 1 << 12;
        const BUTTON_MOTION = 1 << 13;
        const KEYMAP_STATE = 1 << 14;
        const EXPOSURE = 1 << 15;
        const VISIBILITY_CHANGE = 1 << 16;
        const STRUCTURE_NOTIFY = 1 << 17;
        const RESIZE_REDIRECT = 1 << 18;
        const SUBSTRUCTURE_NOTIFY = 1 << 19;
        const SUBSTRUCTURE_REDIRECT = 1 << 20;
        const FOCUS_CHANGE = 1 << 21;
        const PROPERTY_CHANGE = 1 << 22;
        const COLORMAP_CHANGE = 1 << 23;
        const OWNER_GRAB_BUTTON = 1 << 24;
    }
}

/// Common fields of the five pointer/key device events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEventBody {
    pub detail: u8,
    pub time: Timestamp,
    pub root: WindowId,
    pub event: WindowId,
    pub child: WindowId,
    pub root_x: i16,
    pub root_y: i16,
    pub event_x: i16,
    pub event_y: i16,
    pub state: u16,
    pub same_screen: bool,
}

/// PropertyNotify state values
pub const PROPERTY_NEW_VALUE: u8 = 0;
pub const PROPERTY_DELETED: u8 = 1;

/// Events the server synthesizes
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    KeyPress(DeviceEventBody),
    KeyRelease(DeviceEventBody),
    ButtonPress(DeviceEventBody),
    ButtonRelease(DeviceEventBody),
    MotionNotify(DeviceEventBody),
    EnterNotify {
        body: DeviceEventBody,
        mode: u8,
        focus: bool,
    },
    LeaveNotify {
        body: DeviceEventBody,
        mode: u8,
        focus: bool,
    },
    FocusIn {
        detail: u8,
        event: WindowId,
        mode: u8,
    },
    FocusOut {
        detail: u8,
        event: WindowId,
        mode: u8,
    },
    Expose {
        window: WindowId,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        count: u16,
    },
    GraphicsExposure {
        drawable: u32,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        minor_opcode: u16,
        count: u16,
        major_opcode: u8,
    },
    NoExposure {
        drawable: u32,
        minor_opcode: u16,
        major_opcode: u8,
    },
    CreateNotify {
        parent: WindowId,
        window: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
        override_redirect: bool,
    },
    DestroyNotify {
        event: WindowId,
        window: WindowId,
    },
    UnmapNotify {
        event: WindowId,
        window: WindowId,
        from_configure: bool,
    },
    MapNotify {
        event: WindowId,
        window: WindowId,
        override_redirect: bool,
    },
    ReparentNotify {
        event: WindowId,
        window: WindowId,
        parent: WindowId,
        x: i16,
        y: i16,
        override_redirect: bool,
    },
    ConfigureNotify {
        event: WindowId,
        window: WindowId,
        above_sibling: WindowId,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
        override_redirect: bool,
    },
    GravityNotify {
        event: WindowId,
        window: WindowId,
        x: i16,
        y: i16,
    },
    CirculateNotify {
        event: WindowId,
        window: WindowId,
        place: u8,
    },
    PropertyNotify {
        window: WindowId,
        atom: Atom,
        time: Timestamp,
        state: u8,
    },
    SelectionClear {
        time: Timestamp,
        owner: WindowId,
        selection: Atom,
    },
    SelectionRequest {
        time: Timestamp,
        owner: WindowId,
        requestor: WindowId,
        selection: Atom,
        target: Atom,
        property: Atom,
    },
    SelectionNotify {
        time: Timestamp,
        requestor: WindowId,
        selection: Atom,
        target: Atom,
        property: Atom,
    },
    ColormapNotify {
        window: WindowId,
        colormap: u32,
        new: bool,
        installed: bool,
    },
    MappingNotify {
        request: u8,
        first_keycode: u8,
        count: u8,
    },
    /// XInput1 device event: the core 32-byte layout with the event code
    /// offset to the extension base and the device id in the final byte
    XiDevice {
        kind: XiDeviceEventKind,
        body: DeviceEventBody,
        device: u8,
    },
    /// XInput2 device event carried in a GenericEvent frame
    XiDevice2 {
        evtype: u16,
        device: u16,
        time: Timestamp,
        detail: u32,
        root: WindowId,
        event: WindowId,
        child: WindowId,
        root_x: f64,
        root_y: f64,
        event_x: f64,
        event_y: f64,
        state: u32,
    },
    /// XInput2 raw event: valuator deltas for X and Y
    XiRaw {
        evtype: u16,
        device: u16,
        time: Timestamp,
        dx: i32,
        dy: i32,
    },
    /// A 32-byte event forwarded verbatim by SendEvent; bytes 2-3 are
    /// restamped with the receiver's sequence number
    Forwarded([u8; 32]),
}

/// XInput1 device event kinds, in extension event-code order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum XiDeviceEventKind {
    KeyPress = 0,
    KeyRelease = 1,
    ButtonPress = 2,
    ButtonRelease = 3,
    Motion = 4,
}

/// Fixed-point 16.16 conversion for XInput2 coordinates
fn fp1616(value: f64) -> i32 {
    (value * 65536.0) as i32
}

impl Event {
    /// Encode for one receiver. `seq` is the receiver's last committed
    /// sequence number in the sense of the output-ordering invariant.
    pub fn encode(&self, seq: u16, order: WireOrder) -> Vec<u8> {
        let mut w = WireWriter::new(order);
        match self {
            Event::KeyPress(body) => encode_input(&mut w, EV_KEY_PRESS, seq, body),
            Event::KeyRelease(body) => encode_input(&mut w, EV_KEY_RELEASE, seq, body),
            Event::ButtonPress(body) => encode_input(&mut w, EV_BUTTON_PRESS, seq, body),
            Event::ButtonRelease(body) => encode_input(&mut w, EV_BUTTON_RELEASE, seq, body),
            Event::MotionNotify(body) => encode_input(&mut w, EV_MOTION_NOTIFY, seq, body),
            Event::EnterNotify { body, mode, focus } => {
                encode_crossing(&mut w, EV_ENTER_NOTIFY, seq, body, *mode, *focus)
            }
            Event::LeaveNotify { body, mode, focus } => {
                encode_crossing(&mut w, EV_LEAVE_NOTIFY, seq, body, *mode, *focus)
            }
            Event::FocusIn {
                detail,
                event,
                mode,
            } => {
                w.u8(EV_FOCUS_IN).u8(*detail).u16(seq).u32(*event).u8(*mode);
                w.zeros(23);
            }
            Event::FocusOut {
                detail,
                event,
                mode,
            } => {
                w.u8(EV_FOCUS_OUT).u8(*detail).u16(seq).u32(*event).u8(*mode);
                w.zeros(23);
            }
            Event::Expose {
                window,
                x,
                y,
                width,
                height,
                count,
            } => {
                w.u8(EV_EXPOSE).u8(0).u16(seq).u32(*window);
                w.u16(*x).u16(*y).u16(*width).u16(*height).u16(*count);
                w.zeros(14);
            }
            Event::GraphicsExposure {
                drawable,
                x,
                y,
                width,
                height,
                minor_opcode,
                count,
                major_opcode,
            } => {
                w.u8(EV_GRAPHICS_EXPOSURE).u8(0).u16(seq).u32(*drawable);
                w.u16(*x).u16(*y).u16(*width).u16(*height);
                w.u16(*minor_opcode).u16(*count).u8(*major_opcode);
                w.zeros(11);
            }
            Event::NoExposure {
                drawable,
                minor_opcode,
                major_opcode,
            } => {
                w.u8(EV_NO_EXPOSURE).u8(0).u16(seq).u32(*drawable);
                w.u16(*minor_opcode).u8(*major_opcode);
                w.zeros(21);
            }
            Event::CreateNotify {
                parent,
                window,
                x,
                y,
                width,
                height,
                border_width,
                override_redirect,
            } => {
                w.u8(EV_CREATE_NOTIFY).u8(0).u16(seq).u32(*parent).u32(*window);
                w.i16(*x).i16(*y).u16(*width).u16(*height).u16(*border_width);
                w.u8(*override_redirect as u8);
                w.zeros(9);
            }
            Event::DestroyNotify { event, window } => {
                w.u8(EV_DESTROY_NOTIFY).u8(0).u16(seq).u32(*event).u32(*window);
                w.zeros(20);
            }
            Event::UnmapNotify {
                event,
                window,
                from_configure,
            } => {
                w.u8(EV_UNMAP_NOTIFY).u8(0).u16(seq).u32(*event).u32(*window);
                w.u8(*from_configure as u8);
                w.zeros(19);
            }
            Event::MapNotify {
                event,
                window,
                override_redirect,
            } => {
                w.u8(EV_MAP_NOTIFY).u8(0).u16(seq).u32(*event).u32(*window);
                w.u8(*override_redirect as u8);
                w.zeros(19);
            }
            Event::ReparentNotify {
                event,
                window,
                parent,
                x,
                y,
                override_redirect,
            } => {
                w.u8(EV_REPARENT_NOTIFY).u8(0).u16(seq);
                w.u32(*event).u32(*window).u32(*parent);
                w.i16(*x).i16(*y).u8(*override_redirect as u8);
                w.zeros(11);
            }
            Event::ConfigureNotify {
                event,
                window,
                above_sibling,
                x,
                y,
                width,
                height,
                border_width,
                override_redirect,
            } => {
                w.u8(EV_CONFIGURE_NOTIFY).u8(0).u16(seq);
                w.u32(*event).u32(*window).u32(*above_sibling);
                w.i16(*x).i16(*y).u16(*width).u16(*height).u16(*border_width);
                w.u8(*override_redirect as u8);
                w.zeros(5);
            }
            Event::GravityNotify { event, window, x, y } => {
                w.u8(EV_GRAVITY_NOTIFY).u8(0).u16(seq).u32(*event).u32(*window);
                w.i16(*x).i16(*y);
                w.zeros(16);
            }
            Event::CirculateNotify {
                event,
                window,
                place,
            } => {
                w.u8(EV_CIRCULATE_NOTIFY).u8(0).u16(seq).u32(*event).u32(*window);
                w.u32(0).u8(*place);
                w.zeros(15);
            }
            Event::PropertyNotify {
                window,
                atom,
                time,
                state,
            } => {
                w.u8(EV_PROPERTY_NOTIFY).u8(0).u16(seq).u32(*window);
                w.u32(*atom).u32(*time).u8(*state);
                w.zeros(15);
            }
            Event::SelectionClear {
                time,
                owner,
                selection,
            } => {
                w.u8(EV_SELECTION_CLEAR).u8(0).u16(seq);
                w.u32(*time).u32(*owner).u32(*selection);
                w.zeros(16);
            }
            Event::SelectionRequest {
                time,
                owner,
                requestor,
                selection,
                target,
                property,
            } => {
                w.u8(EV_SELECTION_REQUEST).u8(0).u16(seq);
                w.u32(*time).u32(*owner).u32(*requestor);
                w.u32(*selection).u32(*target).u32(*property);
                w.zeros(4);
            }
            Event::SelectionNotify {
                time,
                requestor,
                selection,
                target,
                property,
            } => {
                w.u8(EV_SELECTION_NOTIFY).u8(0).u16(seq);
                w.u32(*time).u32(*requestor).u32(*selection).u32(*target).u32(*property);
                w.zeros(8);
            }
            Event::ColormapNotify {
                window,
                colormap,
                new,
                installed,
            } => {
                w.u8(EV_COLORMAP_NOTIFY).u8(0).u16(seq).u32(*window).u32(*colormap);
                w.u8(*new as u8).u8(*installed as u8);
                w.zeros(18);
            }
            Event::MappingNotify {
                request,
                first_keycode,
                count,
            } => {
                w.u8(EV_MAPPING_NOTIFY).u8(0).u16(seq);
                w.u8(*request).u8(*first_keycode).u8(*count);
                w.zeros(25);
            }
            Event::XiDevice { kind, body, device } => {
                let code = XINPUT_FIRST_EVENT + *kind as u8;
                encode_input(&mut w, code, seq, body);
                // deviceid rides in the trailing pad byte
                let mut buf = w.into_vec();
                buf[31] = *device;
                return buf;
            }
            Event::XiDevice2 {
                evtype,
                device,
                time,
                detail,
                root,
                event,
                child,
                root_x,
                root_y,
                event_x,
                event_y,
                state,
            } => {
                // xXIDeviceEvent with no buttons or valuators: 80 bytes
                w.u8(EV_GENERIC).u8(XINPUT_MAJOR).u16(seq).u32(12);
                w.u16(*evtype).u16(*device).u32(*time).u32(*detail);
                w.u32(*root).u32(*event).u32(*child);
                w.i32(fp1616(*root_x)).i32(fp1616(*root_y));
                w.i32(fp1616(*event_x)).i32(fp1616(*event_y));
                w.u16(0).u16(0).u16(*device).u16(0);
                w.u32(0); // flags
                w.u32(*state).u32(0).u32(0).u32(*state); // modifier state
                w.u32(0); // group state
            }
            Event::XiRaw {
                evtype,
                device,
                time,
                dx,
                dy,
            } => {
                // 32-byte header + one mask word + two FP3232 values
                w.u8(EV_GENERIC).u8(XINPUT_MAJOR).u16(seq).u32(4);
                w.u16(*evtype).u16(*device).u32(*time);
                w.u32(0); // detail
                w.u16(*device).u16(1); // sourceid, valuators_len
                w.u32(0); // flags
                w.u32(0x0000_0003); // valuator mask: X and Y
                w.i32(*dx).i32(0);
                w.i32(*dy).i32(0);
            }
            Event::Forwarded(raw) => {
                let mut buf = raw.to_vec();
                order.write_u16(&mut buf[2..4], seq);
                return buf;
            }
        }
        w.into_vec()
    }

    /// Core event code carried on the wire (GenericEvent for XI2)
    pub fn code(&self) -> u8 {
        match self {
            Event::KeyPress(_) => EV_KEY_PRESS,
            Event::KeyRelease(_) => EV_KEY_RELEASE,
            Event::ButtonPress(_) => EV_BUTTON_PRESS,
            Event::ButtonRelease(_) => EV_BUTTON_RELEASE,
            Event::MotionNotify(_) => EV_MOTION_NOTIFY,
            Event::EnterNotify { .. } => EV_ENTER_NOTIFY,
            Event::LeaveNotify { .. } => EV_LEAVE_NOTIFY,
            Event::FocusIn { .. } => EV_FOCUS_IN,
            Event::FocusOut { .. } => EV_FOCUS_OUT,
            Event::Expose { .. } => EV_EXPOSE,
            Event::GraphicsExposure { .. } => EV_GRAPHICS_EXPOSURE,
            Event::NoExposure { .. } => EV_NO_EXPOSURE,
            Event::CreateNotify { .. } => EV_CREATE_NOTIFY,
            Event::DestroyNotify { .. } => EV_DESTROY_NOTIFY,
            Event::UnmapNotify { .. } => EV_UNMAP_NOTIFY,
            Event::MapNotify { .. } => EV_MAP_NOTIFY,
            Event::ReparentNotify { .. } => EV_REPARENT_NOTIFY,
            Event::ConfigureNotify { .. } => EV_CONFIGURE_NOTIFY,
            Event::GravityNotify { .. } => EV_GRAVITY_NOTIFY,
            Event::CirculateNotify { .. } => EV_CIRCULATE_NOTIFY,
            Event::PropertyNotify { .. } => EV_PROPERTY_NOTIFY,
            Event::SelectionClear { .. } => EV_SELECTION_CLEAR,
            Event::SelectionRequest { .. } => EV_SELECTION_REQUEST,
            Event::SelectionNotify { .. } => EV_SELECTION_NOTIFY,
            Event::ColormapNotify { .. } => EV_COLORMAP_NOTIFY,
            Event::MappingNotify { .. } => EV_MAPPING_NOTIFY,
            Event::XiDevice { kind, .. } => XINPUT_FIRST_EVENT + *kind as u8,
            Event::XiDevice2 { .. } | Event::XiRaw { .. } => EV_GENERIC,
            Event::Forwarded(raw) => raw[0],
        }
    }
}

fn encode_input(w: &mut WireWriter, code: u8, seq: u16, body: &DeviceEventBody) {
    w.u8(code).u8(body.detail).u16(seq);
    w.u32(body.time).u32(body.root).u32(body.event).u32(body.child);
    w.i16(body.root_x).i16(body.root_y).i16(body.event_x).i16(body.event_y);
    w.u16(body.state).u8(body.same_screen as u8).u8(0);
}

fn encode_crossing(
    w: &mut WireWriter,
    code: u8,
    seq: u16,
    body: &DeviceEventBody,
    mode: u8,
    focus: bool,
) {
    w.u8(code).u8(body.detail).u16(seq);
    w.u32(body.time).u32(body.root).u32(body.event).u32(body.child);
    w.i16(body.root_x).i16(body.root_y).i16(body.event_x).i16(body.event_y);
    w.u16(body.state).u8(mode);
    // same-screen (0x02) | focus (0x01)
    w.u8(0x02 | focus as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> DeviceEventBody {
        DeviceEventBody {
            detail: 1,
            time: 1000,
            root: 0x2,
            event: 0x0020_0001,
            child: 0,
            root_x: 50,
            root_y: 60,
            event_x: 10,
            event_y: 20,
            state: 0,
            same_screen: true,
        }
    }

    #[test]
    fn test_core_events_are_32_bytes() {
        let events = [
            Event::ButtonPress(body()),
            Event::MotionNotify(body()),
            Event::Expose {
                window: 1,
                x: 0,
                y: 0,
                width: 10,
                height: 10,
                count: 0,
            },
            Event::DestroyNotify { event: 1, window: 1 },
            Event::SelectionNotify {
                time: 1,
                requestor: 1,
                selection: 1,
                target: 31,
                property: 100,
            },
            Event::MappingNotify {
                request: 0,
                first_keycode: 8,
                count: 248,
            },
        ];
        for ev in &events {
            assert_eq!(ev.encode(7, WireOrder::Lsb).len(), 32, "{ev:?}");
            assert_eq!(ev.encode(7, WireOrder::Msb).len(), 32, "{ev:?}");
        }
    }

    #[test]
    fn test_button_press_layout() {
        let buf = Event::ButtonPress(body()).encode(0x1234, WireOrder::Lsb);
        assert_eq!(buf[0], EV_BUTTON_PRESS);
        assert_eq!(buf[1], 1); // detail = button
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 0x1234);
        assert_eq!(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]), 1000);
        assert_eq!(i16::from_le_bytes([buf[20], buf[21]]), 50); // root_x
        assert_eq!(i16::from_le_bytes([buf[24], buf[25]]), 10); // event_x
        assert_eq!(buf[30], 1); // same_screen
    }

    #[test]
    fn test_xi_device_event_carries_device_id() {
        let buf = Event::XiDevice {
            kind: XiDeviceEventKind::ButtonPress,
            body: body(),
            device: 2,
        }
        .encode(5, WireOrder::Lsb);
        assert_eq!(buf.len(), 32);
        assert_eq!(buf[0], XINPUT_FIRST_EVENT + 2);
        assert_eq!(buf[31], 2);
    }

    #[test]
    fn test_raw_motion_layout() {
        let buf = Event::XiRaw {
            evtype: 17,
            device: 2,
            time: 99,
            dx: 0,
            dy: 0,
        }
        .encode(1, WireOrder::Lsb);
        assert_eq!(buf.len(), 48);
        assert_eq!(buf[0], EV_GENERIC);
        assert_eq!(buf[1], XINPUT_MAJOR);
        assert_eq!(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]), 4);
        assert_eq!(u16::from_le_bytes([buf[8], buf[9]]), 17);
        assert_eq!(u16::from_le_bytes([buf[22], buf[23]]), 1);
        assert_eq!(
            u32::from_le_bytes([buf[28], buf[29], buf[30], buf[31]]),
            3
        );
        assert_eq!(u32::from_le_bytes([buf[32], buf[33], buf[34], buf[35]]), 0);
        assert_eq!(u32::from_le_bytes([buf[40], buf[41], buf[42], buf[43]]), 0);
    }

    #[test]
    fn test_forwarded_event_restamps_sequence() {
        let mut raw = [0u8; 32];
        raw[0] = EV_CLIENT_MESSAGE | 0x80;
        let buf = Event::Forwarded(raw).encode(0xBEEF, WireOrder::Lsb);
        assert_eq!(u16::from_le_bytes([buf[2], buf[3]]), 0xBEEF);
        assert_eq!(buf[0], EV_CLIENT_MESSAGE | 0x80);
    }
}
