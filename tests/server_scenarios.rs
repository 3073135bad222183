//! Wire-level scenarios driving the whole core: setup, request decode,
//! dispatch, event routing, and the clipboard bridge, with a headless
//! frontend standing in for the host document.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use wxserver::config::DisplaySettings;
use wxserver::core::atoms::predefined;
use wxserver::core::ids::{ROOT_WINDOW, id_base};
use wxserver::extensions::xinput;
use wxserver::frontend::{HeadlessFrontend, InputPrimitive};
use wxserver::protocol::opcodes as op;
use wxserver::protocol::wire::{WireOrder, WireWriter};
use wxserver::server::context::ServerContext;
use wxserver::server::event_loop::{ServerMessage, handle_message};

struct Harness {
    ctx: ServerContext,
    loop_rx: mpsc::UnboundedReceiver<ServerMessage>,
    frontend: Arc<HeadlessFrontend>,
}

impl Harness {
    fn new(frontend: HeadlessFrontend) -> Self {
        let frontend = Arc::new(frontend);
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let ctx = ServerContext::new(&DisplaySettings::default(), frontend.clone(), loop_tx);
        Self {
            ctx,
            loop_rx,
            frontend,
        }
    }

    /// Connect one client; returns its output stream. The first frame is the
    /// setup response, which is consumed and sanity-checked here.
    fn connect(&mut self) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (ready_tx, mut ready_rx) = oneshot::channel();
        handle_message(
            &mut self.ctx,
            ServerMessage::Connect {
                order: WireOrder::Lsb,
                big_requests: Arc::new(AtomicBool::new(false)),
                outbound: out_tx,
                ready: ready_tx,
            },
        );
        assert!(ready_rx.try_recv().unwrap().is_some());
        let setup = out_rx.try_recv().expect("setup response");
        assert_eq!(setup[0], 1);
        out_rx
    }

    fn request(&mut self, client: u8, major: u8, data: u8, body: &[u8]) {
        handle_message(
            &mut self.ctx,
            ServerMessage::Request {
                client,
                major,
                data,
                body: Bytes::copy_from_slice(body),
            },
        );
    }

    fn input(&mut self, primitive: InputPrimitive) {
        handle_message(&mut self.ctx, ServerMessage::Input(primitive));
    }

    fn create_window(&mut self, client: u8, wid: u32, event_mask: u32) {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(wid).u32(ROOT_WINDOW);
        w.i16(0).i16(0).u16(100).u16(100).u16(0);
        w.u16(1); // InputOutput
        w.u32(0x1);
        if event_mask != 0 {
            w.u32(1 << 11); // event-mask bit
            w.u32(event_mask);
        } else {
            w.u32(0);
        }
        self.request(client, op::CREATE_WINDOW, 24, w.as_slice());
    }
}

fn recv(out: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Vec<u8> {
    out.try_recv().expect("expected a frame")
}

fn u16_at(frame: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([frame[at], frame[at + 1]])
}

fn u32_at(frame: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]])
}

/// XInput raw motion on a zero-delta move: a single 48-byte GenericEvent
/// with both valuators set and zero integer parts.
#[test]
fn raw_motion_fires_on_zero_delta_move() {
    let mut h = Harness::new(HeadlessFrontend::default());
    let mut out = h.connect();
    let wid = id_base(1) | 1;
    h.create_window(1, wid, 0);

    // XISelectEvents(root, AllMasterDevices, mask = 1 << XI_RawMotion)
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(ROOT_WINDOW).u16(1).u16(0);
    w.u16(xinput::XI_ALL_MASTER_DEVICES).u16(1);
    w.u32(0x0002_0000);
    h.request(1, op::XINPUT_MAJOR, xinput::XI_SELECT_EVENTS, w.as_slice());

    // pointer parked at (50,50), then a move to the same spot
    h.input(InputPrimitive::PointerPosition {
        window: ROOT_WINDOW,
        root_x: 50,
        root_y: 50,
    });
    h.input(InputPrimitive::Motion {
        window: ROOT_WINDOW,
        x: 50,
        y: 50,
        root_x: 50,
        root_y: 50,
        state: 0,
    });

    let frame = recv(&mut out);
    assert_eq!(frame.len(), 48);
    assert_eq!(frame[0], 35);
    assert_eq!(frame[1], op::XINPUT_MAJOR);
    assert_eq!(u16_at(&frame, 8), 17);
    assert_eq!(u16_at(&frame, 22), 1);
    assert_eq!(u32_at(&frame, 28), 0x0000_0003);
    assert_eq!(u32_at(&frame, 32), 0);
    assert_eq!(u32_at(&frame, 40), 0);
    assert!(out.try_recv().is_err(), "no other event for the move");
}

/// An engaged device grab delivers the XInput device event and suppresses
/// the core button press entirely.
#[test]
fn device_grab_suppresses_core_button_press() {
    let mut h = Harness::new(HeadlessFrontend::default());
    let mut out = h.connect();
    let wid = id_base(1) | 1;
    h.create_window(1, wid, 1 << 2); // ButtonPressMask

    // OpenDevice(2)
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u8(2).zeros(3);
    h.request(1, op::XINPUT_MAJOR, xinput::OPEN_DEVICE, w.as_slice());
    recv(&mut out); // OpenDevice reply

    let class = (xinput::class_mask::DEVICE_BUTTON_PRESS << 8) | 2;
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(wid).u16(1).u16(0).u32(class);
    h.request(1, op::XINPUT_MAJOR, xinput::SELECT_EXTENSION_EVENT, w.as_slice());

    // GrabDevice(W, device=2, classes=[class])
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(wid).u32(0).u16(1).u8(0).u8(0).u8(0).u8(2).u16(0);
    w.u32(class);
    h.request(1, op::XINPUT_MAJOR, xinput::GRAB_DEVICE, w.as_slice());
    let reply = recv(&mut out);
    assert_eq!(reply[8], 0, "GrabDevice succeeds");

    h.input(InputPrimitive::Button {
        window: wid,
        button: 1,
        pressed: true,
        x: 10,
        y: 10,
        root_x: 10,
        root_y: 10,
        state: 0,
    });

    let frame = recv(&mut out);
    assert_eq!(frame[0], op::XINPUT_FIRST_EVENT + 2); // DeviceButtonPress
    assert_eq!(frame[1], 1); // detail
    assert_eq!(u32_at(&frame, 12), wid); // event window
    assert_eq!(frame[31], 2); // device id
    assert!(out.try_recv().is_err(), "core ButtonPress is suppressed");
}

/// A passive device-button grab activates on the press and likewise
/// suppresses the core event.
#[test]
fn passive_device_button_grab_activates() {
    let mut h = Harness::new(HeadlessFrontend::default());
    let mut out = h.connect();
    let wid = id_base(1) | 1;
    h.create_window(1, wid, 1 << 2);

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u8(2).zeros(3);
    h.request(1, op::XINPUT_MAJOR, xinput::OPEN_DEVICE, w.as_slice());
    recv(&mut out);

    let class = (xinput::class_mask::DEVICE_BUTTON_PRESS << 8) | 2;
    // GrabDeviceButton(W, device 2, button 1, AnyModifier)
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(wid).u8(2).u8(2).u16(1);
    w.u16(0x8000).u8(0).u8(0).u8(1).u8(0).u16(0);
    w.u32(class);
    h.request(1, op::XINPUT_MAJOR, xinput::GRAB_DEVICE_BUTTON, w.as_slice());

    h.input(InputPrimitive::Button {
        window: wid,
        button: 1,
        pressed: true,
        x: 10,
        y: 10,
        root_x: 10,
        root_y: 10,
        state: 0,
    });

    let frame = recv(&mut out);
    assert_eq!(frame[0], op::XINPUT_FIRST_EVENT + 2);
    assert_eq!(frame[31], 2);
    assert!(out.try_recv().is_err(), "only the device event is delivered");
}

/// InternAtom is idempotent and GetAtomName round-trips the name.
#[test]
fn intern_atom_idempotent_with_name_round_trip() {
    let mut h = Harness::new(HeadlessFrontend::default());
    let mut out = h.connect();

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u16(7).u16(0).string8_padded("FOO_BAR");
    h.request(1, op::INTERN_ATOM, 0, w.as_slice());
    let first = recv(&mut out);
    let atom = u32_at(&first, 8);
    assert!(atom >= predefined::FIRST_DYNAMIC);

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u16(7).u16(0).string8_padded("FOO_BAR");
    h.request(1, op::INTERN_ATOM, 0, w.as_slice());
    let second = recv(&mut out);
    assert_eq!(u32_at(&second, 8), atom);

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(atom);
    h.request(1, op::GET_ATOM_NAME, 0, w.as_slice());
    let name_reply = recv(&mut out);
    let len = u16_at(&name_reply, 8) as usize;
    assert_eq!(&name_reply[32..32 + len], b"FOO_BAR");
}

/// GetProperty returns the requested slice with correct accounting.
#[test]
fn property_slice_and_bytes_after() {
    let mut h = Harness::new(HeadlessFrontend::default());
    let mut out = h.connect();
    let wid = id_base(1) | 1;
    h.create_window(1, wid, 0);

    let data: Vec<u8> = (0u8..100).collect();
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(wid).u32(predefined::WM_NAME).u32(predefined::STRING);
    w.u8(8).zeros(3);
    w.u32(100);
    w.bytes(&data);
    h.request(1, op::CHANGE_PROPERTY, 0, w.as_slice());

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(wid).u32(predefined::WM_NAME).u32(0); // AnyPropertyType
    w.u32(5).u32(10);
    h.request(1, op::GET_PROPERTY, 0, w.as_slice());

    let reply = recv(&mut out);
    assert_eq!(reply[1], 8); // format
    assert_eq!(u32_at(&reply, 8), predefined::STRING);
    assert_eq!(u32_at(&reply, 12), 40); // bytes after 20 + 40
    assert_eq!(u32_at(&reply, 16), 40); // value length in format units
    assert_eq!(&reply[32..72], &data[20..60]);
}

/// CLIPBOARD conversion with no owner bridges to the host clipboard: the
/// requestor sees a PropertyNotify for the written STRING property, then a
/// SelectionNotify naming it.
#[tokio::test]
async fn clipboard_conversion_without_owner() {
    let mut h = Harness::new(HeadlessFrontend::with_clipboard("hello"));
    let mut out = h.connect();
    let wid = id_base(1) | 1;
    h.create_window(1, wid, 1 << 22); // PropertyChangeMask

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u16(9).u16(0).string8_padded("CLIPBOARD");
    h.request(1, op::INTERN_ATOM, 0, w.as_slice());
    let clipboard = u32_at(&recv(&mut out), 8);

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u16(4).u16(0).string8_padded("PROP");
    h.request(1, op::INTERN_ATOM, 0, w.as_slice());
    let prop = u32_at(&recv(&mut out), 8);

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(wid).u32(clipboard).u32(predefined::STRING).u32(prop).u32(0);
    h.request(1, op::CONVERT_SELECTION, 0, w.as_slice());

    // the bridge task completes through the event loop
    let completion = h.loop_rx.recv().await.expect("clipboard completion");
    handle_message(&mut h.ctx, completion);

    let property_notify = recv(&mut out);
    assert_eq!(property_notify[0], op::EV_PROPERTY_NOTIFY);
    assert_eq!(u32_at(&property_notify, 4), wid);
    assert_eq!(u32_at(&property_notify, 8), prop);
    assert_eq!(property_notify[16], 0); // NewValue

    let selection_notify = recv(&mut out);
    assert_eq!(selection_notify[0], op::EV_SELECTION_NOTIFY);
    assert_eq!(u32_at(&selection_notify, 8), wid); // requestor
    assert_eq!(u32_at(&selection_notify, 12), clipboard);
    assert_eq!(u32_at(&selection_notify, 16), predefined::STRING);
    assert_eq!(u32_at(&selection_notify, 20), prop);

    // the property holds the clipboard text
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(wid).u32(prop).u32(0).u32(0).u32(16);
    h.request(1, op::GET_PROPERTY, 0, w.as_slice());
    let reply = recv(&mut out);
    let len = u32_at(&reply, 16) as usize;
    assert_eq!(&reply[32..32 + len], b"hello");

    // the frontend recorded the conversion chain, proving the call order
    assert!(!h.frontend.calls().is_empty());
}

/// Two clients: selection transfer clears the previous owner, and a stale
/// timestamp is a no-op.
#[test]
fn selection_transfer_and_stale_timestamp() {
    let mut h = Harness::new(HeadlessFrontend::default());
    let mut out1 = h.connect();
    let mut out2 = h.connect();
    let w1 = id_base(1) | 1;
    let w2 = id_base(2) | 1;
    h.create_window(1, w1, 0);
    h.create_window(2, w2, 0);

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(w1).u32(predefined::PRIMARY).u32(0);
    h.request(1, op::SET_SELECTION_OWNER, 0, w.as_slice());

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(w2).u32(predefined::PRIMARY).u32(0);
    h.request(2, op::SET_SELECTION_OWNER, 0, w.as_slice());

    // old owner hears SelectionClear
    let clear = recv(&mut out1);
    assert_eq!(clear[0], op::EV_SELECTION_CLEAR);
    assert_eq!(u32_at(&clear, 8), w1);
    assert_eq!(u32_at(&clear, 12), predefined::PRIMARY);

    // a stale timestamp loses the race: owner stays w2
    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(w1).u32(predefined::PRIMARY).u32(1);
    h.request(1, op::SET_SELECTION_OWNER, 0, w.as_slice());

    let mut w = WireWriter::new(WireOrder::Lsb);
    w.u32(predefined::PRIMARY);
    h.request(2, op::GET_SELECTION_OWNER, 0, w.as_slice());
    let reply = recv(&mut out2);
    assert_eq!(u32_at(&reply, 8), w2);
}

/// Disconnect with the default close-down destroys the client's windows and
/// releases its client index for reuse.
#[test]
fn disconnect_drains_resources() {
    let mut h = Harness::new(HeadlessFrontend::default());
    let _out = h.connect();
    let wid = id_base(1) | 1;
    h.create_window(1, wid, 0);
    assert!(h.ctx.resources.has_window(wid));

    handle_message(&mut h.ctx, ServerMessage::Disconnect { client: 1 });
    assert!(!h.ctx.resources.has_window(wid));

    // a new connection takes index 1 again
    let _out2 = h.connect();
    assert!(h.ctx.clients.contains_key(&1));
}
