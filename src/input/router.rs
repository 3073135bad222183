//! Event router
//!
//! Destination selection for input primitives: server-grab buffering happens
//! at the send layer; this module decides who sees what. For each primitive
//! the fan-out order is fixed: core event, then XInput1 device event, then
//! XInput2 events. A device grab engaged for a primitive suppresses the core
//! event for that primitive.

use tracing::trace;

use crate::core::ids::{ClientId, NONE, POINTER_ROOT, ROOT_WINDOW, Timestamp, WindowId};
use crate::extensions::xinput::{
    DEVICE_KEYBOARD, DEVICE_POINTER, class_mask, split_class, xi2_event,
};
use crate::frontend::InputPrimitive;
use crate::input::grabs::{DeviceGrab, KeyboardGrab, PassiveGrabKind, PointerGrab};
use crate::protocol::events::{DeviceEventBody, Event, EventMask, XiDeviceEventKind};
use crate::server::context::ServerContext;

/// Route one input primitive from the frontend
pub fn handle_primitive(ctx: &mut ServerContext, primitive: InputPrimitive) {
    let time = ctx.tick();
    match primitive {
        InputPrimitive::Button {
            window,
            button,
            pressed,
            x: _,
            y: _,
            root_x,
            root_y,
            state,
        } => route_button(ctx, window, button, pressed, root_x, root_y, state, time),
        InputPrimitive::Motion {
            window,
            x: _,
            y: _,
            root_x,
            root_y,
            state,
        } => route_motion(ctx, window, root_x, root_y, state, time),
        InputPrimitive::Crossing {
            window,
            entered,
            detail,
            mode,
            x: _,
            y: _,
            root_x,
            root_y,
            state,
        } => route_crossing(
            ctx, window, entered, detail, mode, root_x, root_y, state, time,
        ),
        InputPrimitive::Key {
            keycode,
            pressed,
            state,
        } => route_key(ctx, keycode, pressed, state, time),
        InputPrimitive::Focus { window, focused } => route_focus(ctx, window, focused),
        InputPrimitive::PointerPosition {
            window,
            root_x,
            root_y,
        } => {
            ctx.pointer.root_x = root_x;
            ctx.pointer.root_y = root_y;
            if ctx.resources.has_window(window) {
                ctx.pointer.window = window;
            }
        }
        InputPrimitive::RootResize { width, height } => root_resized(ctx, width, height),
    }
}

/// Event body with coordinates translated into `event_window` space
fn body_for(
    ctx: &ServerContext,
    event_window: WindowId,
    origin: WindowId,
    detail: u8,
    root_x: i16,
    root_y: i16,
    state: u16,
    time: Timestamp,
) -> DeviceEventBody {
    let (abs_x, abs_y) = ctx.window_abs_pos(event_window);
    DeviceEventBody {
        detail,
        time,
        root: ROOT_WINDOW,
        event: event_window,
        child: ctx.child_toward(event_window, origin),
        root_x,
        root_y,
        event_x: root_x - abs_x,
        event_y: root_y - abs_y,
        state,
        same_screen: true,
    }
}

/// Modifier portion of the device state, for passive grab matching
fn modifiers(state: u16) -> u16 {
    state & 0x00FF
}

/// First window in the bubble walk whose event target is `client` and which
/// selects `mask` (owner-events delivery for grabs)
fn find_interested_for_client(
    ctx: &ServerContext,
    origin: WindowId,
    mask: EventMask,
    client: ClientId,
) -> Option<WindowId> {
    for window in ctx.resources.ancestor_chain(origin) {
        let win = ctx.resources.window(window).ok()?;
        if win.selects(mask) && ctx.window_event_target(window) == Some(client) {
            return Some(window);
        }
        if win.blocks_propagation(mask) {
            return None;
        }
    }
    None
}

/// Core pointer-family delivery honoring the active pointer grab
#[allow(clippy::too_many_arguments)]
fn deliver_core_pointer(
    ctx: &mut ServerContext,
    origin: WindowId,
    mask: EventMask,
    detail: u8,
    root_x: i16,
    root_y: i16,
    state: u16,
    time: Timestamp,
    make: impl Fn(DeviceEventBody) -> Event,
) {
    if let Some(grab) = ctx.grabs.pointer.clone() {
        if grab.owner_events {
            if let Some(window) = find_interested_for_client(ctx, origin, mask, grab.client) {
                let body = body_for(ctx, window, origin, detail, root_x, root_y, state, time);
                ctx.send_event(grab.client, &make(body));
                return;
            }
        }
        if grab.event_mask.intersects(mask) {
            let body = body_for(ctx, grab.window, origin, detail, root_x, root_y, state, time);
            ctx.send_event(grab.client, &make(body));
        }
        return;
    }
    if let Some((client, window)) = ctx.find_interested(origin, mask) {
        let body = body_for(ctx, window, origin, detail, root_x, root_y, state, time);
        ctx.send_event(client, &make(body));
    }
}

/// Scan passive core button/key grabs, root-most ancestor first
fn scan_passive_core(
    ctx: &ServerContext,
    origin: WindowId,
    kind: PassiveGrabKind,
    detail: u8,
    state: u16,
) -> Option<(WindowId, crate::input::grabs::PassiveGrab)> {
    let mut chain = ctx.resources.ancestor_chain(origin);
    chain.reverse();
    for window in chain {
        let win = ctx.resources.window(window).ok()?;
        for grab in &win.passive_grabs {
            if grab.kind == kind
                && grab.device.is_none()
                && grab.matches(detail, modifiers(state))
            {
                return Some((window, grab.clone()));
            }
        }
    }
    None
}

/// Scan passive device grabs for `device`, root-most ancestor first
fn scan_passive_device(
    ctx: &ServerContext,
    origin: WindowId,
    kind: PassiveGrabKind,
    device: u8,
    detail: u8,
    state: u16,
) -> Option<(WindowId, crate::input::grabs::PassiveGrab)> {
    let mut chain = ctx.resources.ancestor_chain(origin);
    chain.reverse();
    for window in chain {
        let win = ctx.resources.window(window).ok()?;
        for grab in &win.passive_grabs {
            if grab.kind == kind
                && grab.device == Some(device)
                && grab.matches(detail, modifiers(state))
            {
                return Some((window, grab.clone()));
            }
        }
    }
    None
}

/// Does an XInput1 class list select `mask_bit` for `device`?
fn classes_select(classes: &[u32], mask_bit: u32, device: u8) -> bool {
    classes.iter().any(|&class| {
        let (mask, dev) = split_class(class);
        dev == device && mask & mask_bit != 0
    })
}

/// XInput1 delivery to clients with matching SelectExtensionEvent classes;
/// each client sees the event once, at its nearest selecting ancestor
#[allow(clippy::too_many_arguments)]
fn deliver_xi1(
    ctx: &mut ServerContext,
    origin: WindowId,
    kind: XiDeviceEventKind,
    mask_bit: u32,
    device: u8,
    detail: u8,
    root_x: i16,
    root_y: i16,
    state: u16,
    time: Timestamp,
) {
    let chain = ctx.resources.ancestor_chain(origin);
    let client_ids: Vec<ClientId> = ctx.clients.keys().copied().collect();
    for client_id in client_ids {
        let selected = chain.iter().find(|&&window| {
            ctx.clients
                .get(&client_id)
                .and_then(|c| c.xi1_selections.get(&window))
                .map(|classes| classes_select(classes, mask_bit, device))
                .unwrap_or(false)
        });
        if let Some(&window) = selected {
            let body = body_for(ctx, window, origin, detail, root_x, root_y, state, time);
            ctx.send_event(
                client_id,
                &Event::XiDevice {
                    kind,
                    body,
                    device,
                },
            );
        }
    }
}

/// XInput2 device-event delivery per the per-window per-device masks
#[allow(clippy::too_many_arguments)]
fn deliver_xi2(
    ctx: &mut ServerContext,
    origin: WindowId,
    evtype: u16,
    device: u16,
    detail: u32,
    root_x: i16,
    root_y: i16,
    state: u16,
    time: Timestamp,
) {
    let chain = ctx.resources.ancestor_chain(origin);
    let client_ids: Vec<ClientId> = ctx.clients.keys().copied().collect();
    for client_id in client_ids {
        let selected = chain.iter().find(|&&window| {
            ctx.clients
                .get(&client_id)
                .map(|c| c.xi2_mask_for(window, device) & (1 << evtype) != 0)
                .unwrap_or(false)
        });
        if let Some(&window) = selected {
            let (abs_x, abs_y) = ctx.window_abs_pos(window);
            let child = ctx.child_toward(window, origin);
            ctx.send_event(
                client_id,
                &Event::XiDevice2 {
                    evtype,
                    device,
                    time,
                    detail,
                    root: ROOT_WINDOW,
                    event: window,
                    child,
                    root_x: root_x as f64,
                    root_y: root_y as f64,
                    event_x: (root_x - abs_x) as f64,
                    event_y: (root_y - abs_y) as f64,
                    state: state as u32,
                },
            );
        }
    }
}

/// Raw motion to every client that selected it on the root window; fires
/// for every motion primitive, including zero-delta ones
fn deliver_raw_motion(ctx: &mut ServerContext, dx: i32, dy: i32, time: Timestamp) {
    let client_ids: Vec<ClientId> = ctx.clients.keys().copied().collect();
    for client_id in client_ids {
        let selected = ctx
            .clients
            .get(&client_id)
            .map(|c| {
                c.xi2_mask_for(ROOT_WINDOW, DEVICE_POINTER as u16)
                    & (1 << xi2_event::RAW_MOTION)
                    != 0
            })
            .unwrap_or(false);
        if selected {
            ctx.send_event(
                client_id,
                &Event::XiRaw {
                    evtype: xi2_event::RAW_MOTION,
                    device: DEVICE_POINTER as u16,
                    time,
                    dx,
                    dy,
                },
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn route_button(
    ctx: &mut ServerContext,
    window: WindowId,
    button: u8,
    pressed: bool,
    root_x: i16,
    root_y: i16,
    state: u16,
    time: Timestamp,
) {
    ctx.pointer.root_x = root_x;
    ctx.pointer.root_y = root_y;
    ctx.pointer.state = state;
    if ctx.resources.has_window(window) {
        ctx.pointer.window = window;
    }
    let bit = 1u8 << (button.saturating_sub(1).min(7));
    if pressed {
        ctx.pointer.buttons |= bit;
    } else {
        ctx.pointer.buttons &= !bit;
    }

    let (xi_kind, xi_mask) = if pressed {
        (XiDeviceEventKind::ButtonPress, class_mask::DEVICE_BUTTON_PRESS)
    } else {
        (
            XiDeviceEventKind::ButtonRelease,
            class_mask::DEVICE_BUTTON_RELEASE,
        )
    };

    // a press may arm a passive device grab before anything is delivered
    if pressed && ctx.grabs.device_grab(DEVICE_POINTER).is_none() {
        if let Some((grab_window, grab)) =
            scan_passive_device(ctx, window, PassiveGrabKind::Button, DEVICE_POINTER, button, state)
        {
            trace!(window = format_args!("{grab_window:#x}"), "passive device grab armed");
            ctx.grabs.device.insert(
                DEVICE_POINTER,
                DeviceGrab {
                    device: DEVICE_POINTER,
                    window: grab_window,
                    client: grab.grabbing_client,
                    owner_events: grab.owner_events,
                    classes: grab.classes.clone(),
                    time,
                    from_passive: true,
                },
            );
        }
    }

    let device_engaged = if let Some(grab) = ctx.grabs.device_grab(DEVICE_POINTER).cloned() {
        if classes_select(&grab.classes, xi_mask, DEVICE_POINTER) {
            let body = body_for(ctx, grab.window, window, button, root_x, root_y, state, time);
            ctx.send_event(
                grab.client,
                &Event::XiDevice {
                    kind: xi_kind,
                    body,
                    device: DEVICE_POINTER,
                },
            );
        }
        true
    } else {
        false
    };

    // core delivery is suppressed while a device grab is engaged
    if !device_engaged {
        let mask = if pressed {
            EventMask::BUTTON_PRESS
        } else {
            EventMask::BUTTON_RELEASE
        };
        if pressed && ctx.grabs.pointer.is_none() {
            if let Some((grab_window, grab)) =
                scan_passive_core(ctx, window, PassiveGrabKind::Button, button, state)
            {
                trace!(window = format_args!("{grab_window:#x}"), "passive pointer grab armed");
                ctx.grabs.pointer = Some(PointerGrab {
                    window: grab_window,
                    client: grab.grabbing_client,
                    owner_events: grab.owner_events,
                    event_mask: grab.event_mask,
                    confine_to: grab.confine_to,
                    cursor: grab.cursor,
                    pointer_mode: grab.pointer_mode,
                    keyboard_mode: grab.keyboard_mode,
                    time,
                    from_passive: true,
                });
            }
        }
        let make = if pressed {
            Event::ButtonPress as fn(DeviceEventBody) -> Event
        } else {
            Event::ButtonRelease as fn(DeviceEventBody) -> Event
        };
        deliver_core_pointer(ctx, window, mask, button, root_x, root_y, state, time, make);

        deliver_xi1(
            ctx, window, xi_kind, xi_mask, DEVICE_POINTER, button, root_x, root_y, state, time,
        );
    }

    let evtype = if pressed {
        xi2_event::BUTTON_PRESS
    } else {
        xi2_event::BUTTON_RELEASE
    };
    deliver_xi2(
        ctx,
        window,
        evtype,
        DEVICE_POINTER as u16,
        button as u32,
        root_x,
        root_y,
        state,
        time,
    );

    // a passive grab ends when the last button goes up
    if !pressed && ctx.pointer.buttons == 0 {
        if ctx.grabs.pointer.as_ref().is_some_and(|g| g.from_passive) {
            ctx.grabs.pointer = None;
        }
        if ctx
            .grabs
            .device_grab(DEVICE_POINTER)
            .is_some_and(|g| g.from_passive)
        {
            ctx.grabs.device.remove(&DEVICE_POINTER);
        }
    }
}

fn route_motion(
    ctx: &mut ServerContext,
    window: WindowId,
    root_x: i16,
    root_y: i16,
    state: u16,
    time: Timestamp,
) {
    let dx = (root_x - ctx.pointer.root_x) as i32;
    let dy = (root_y - ctx.pointer.root_y) as i32;
    ctx.pointer.root_x = root_x;
    ctx.pointer.root_y = root_y;
    ctx.pointer.state = state;
    if ctx.resources.has_window(window) {
        ctx.pointer.window = window;
    }

    let device_engaged = if let Some(grab) = ctx.grabs.device_grab(DEVICE_POINTER).cloned() {
        if classes_select(&grab.classes, class_mask::DEVICE_MOTION, DEVICE_POINTER) {
            let body = body_for(ctx, grab.window, window, 0, root_x, root_y, state, time);
            ctx.send_event(
                grab.client,
                &Event::XiDevice {
                    kind: XiDeviceEventKind::Motion,
                    body,
                    device: DEVICE_POINTER,
                },
            );
        }
        true
    } else {
        false
    };

    if !device_engaged {
        let mut mask = EventMask::POINTER_MOTION;
        if ctx.pointer.buttons != 0 {
            mask |= EventMask::BUTTON_MOTION;
            for button in 0..5u8 {
                if ctx.pointer.buttons & (1 << button) != 0 {
                    mask |= EventMask::from_bits_truncate(
                        EventMask::BUTTON1_MOTION.bits() << button,
                    );
                }
            }
        }
        deliver_core_pointer(
            ctx,
            window,
            mask,
            0,
            root_x,
            root_y,
            state,
            time,
            Event::MotionNotify,
        );
        deliver_xi1(
            ctx,
            window,
            XiDeviceEventKind::Motion,
            class_mask::DEVICE_MOTION,
            DEVICE_POINTER,
            0,
            root_x,
            root_y,
            state,
            time,
        );
    }

    deliver_xi2(
        ctx,
        window,
        xi2_event::MOTION,
        DEVICE_POINTER as u16,
        0,
        root_x,
        root_y,
        state,
        time,
    );
    deliver_raw_motion(ctx, dx, dy, time);
}

#[allow(clippy::too_many_arguments)]
fn route_crossing(
    ctx: &mut ServerContext,
    window: WindowId,
    entered: bool,
    detail: u8,
    mode: u8,
    root_x: i16,
    root_y: i16,
    state: u16,
    time: Timestamp,
) {
    ctx.pointer.root_x = root_x;
    ctx.pointer.root_y = root_y;
    if entered && ctx.resources.has_window(window) {
        ctx.pointer.window = window;
    }
    let mask = if entered {
        EventMask::ENTER_WINDOW
    } else {
        EventMask::LEAVE_WINDOW
    };
    let make = move |body: DeviceEventBody| {
        if entered {
            Event::EnterNotify {
                body,
                mode,
                focus: false,
            }
        } else {
            Event::LeaveNotify {
                body,
                mode,
                focus: false,
            }
        }
    };
    // crossing events do not bubble; the window either selects them or not
    if let Some(grab) = ctx.grabs.pointer.clone() {
        if grab.event_mask.intersects(mask) {
            let body = body_for(ctx, grab.window, window, detail, root_x, root_y, state, time);
            ctx.send_event(grab.client, &make(body));
        }
        return;
    }
    if let Ok(win) = ctx.resources.window(window) {
        if win.selects(mask) {
            if let Some(client) = ctx.window_event_target(window) {
                let body = body_for(ctx, window, window, detail, root_x, root_y, state, time);
                ctx.send_event(client, &make(body));
            }
        }
    }
}

fn route_key(ctx: &mut ServerContext, keycode: u8, pressed: bool, state: u16, time: Timestamp) {
    let dest = match ctx.focus.window {
        NONE => return,
        POINTER_ROOT => ctx.pointer.window,
        w => w,
    };
    if !ctx.resources.has_window(dest) {
        return;
    }
    let root_x = ctx.pointer.root_x;
    let root_y = ctx.pointer.root_y;

    let (xi_kind, xi_mask) = if pressed {
        (XiDeviceEventKind::KeyPress, class_mask::DEVICE_KEY_PRESS)
    } else {
        (XiDeviceEventKind::KeyRelease, class_mask::DEVICE_KEY_RELEASE)
    };

    if pressed && ctx.grabs.device_grab(DEVICE_KEYBOARD).is_none() {
        if let Some((grab_window, grab)) =
            scan_passive_device(ctx, dest, PassiveGrabKind::Key, DEVICE_KEYBOARD, keycode, state)
        {
            ctx.grabs.device.insert(
                DEVICE_KEYBOARD,
                DeviceGrab {
                    device: DEVICE_KEYBOARD,
                    window: grab_window,
                    client: grab.grabbing_client,
                    owner_events: grab.owner_events,
                    classes: grab.classes.clone(),
                    time,
                    from_passive: true,
                },
            );
        }
    }

    let device_engaged = if let Some(grab) = ctx.grabs.device_grab(DEVICE_KEYBOARD).cloned() {
        if classes_select(&grab.classes, xi_mask, DEVICE_KEYBOARD) {
            let body = body_for(ctx, grab.window, dest, keycode, root_x, root_y, state, time);
            ctx.send_event(
                grab.client,
                &Event::XiDevice {
                    kind: xi_kind,
                    body,
                    device: DEVICE_KEYBOARD,
                },
            );
        }
        true
    } else {
        false
    };

    if !device_engaged {
        let mask = if pressed {
            EventMask::KEY_PRESS
        } else {
            EventMask::KEY_RELEASE
        };
        if pressed && ctx.grabs.keyboard.is_none() {
            if let Some((grab_window, grab)) =
                scan_passive_core(ctx, dest, PassiveGrabKind::Key, keycode, state)
            {
                ctx.grabs.keyboard = Some(KeyboardGrab {
                    window: grab_window,
                    client: grab.grabbing_client,
                    owner_events: grab.owner_events,
                    pointer_mode: grab.pointer_mode,
                    keyboard_mode: grab.keyboard_mode,
                    time,
                    from_passive: true,
                });
            }
        }
        let make = if pressed {
            Event::KeyPress as fn(DeviceEventBody) -> Event
        } else {
            Event::KeyRelease as fn(DeviceEventBody) -> Event
        };
        if let Some(grab) = ctx.grabs.keyboard.clone() {
            let delivered_at_origin = grab.owner_events
                && find_interested_for_client(ctx, dest, mask, grab.client)
                    .map(|window| {
                        let body =
                            body_for(ctx, window, dest, keycode, root_x, root_y, state, time);
                        ctx.send_event(grab.client, &make(body));
                    })
                    .is_some();
            if !delivered_at_origin {
                let body =
                    body_for(ctx, grab.window, dest, keycode, root_x, root_y, state, time);
                ctx.send_event(grab.client, &make(body));
            }
        } else if let Some((client, window)) = ctx.find_interested(dest, mask) {
            let body = body_for(ctx, window, dest, keycode, root_x, root_y, state, time);
            ctx.send_event(client, &make(body));
        }
        deliver_xi1(
            ctx,
            dest,
            xi_kind,
            xi_mask,
            DEVICE_KEYBOARD,
            keycode,
            root_x,
            root_y,
            state,
            time,
        );
    }

    let evtype = if pressed {
        xi2_event::KEY_PRESS
    } else {
        xi2_event::KEY_RELEASE
    };
    deliver_xi2(
        ctx,
        dest,
        evtype,
        DEVICE_KEYBOARD as u16,
        keycode as u32,
        root_x,
        root_y,
        state,
        time,
    );

    if !pressed && ctx.grabs.keyboard.as_ref().is_some_and(|g| g.from_passive) {
        ctx.grabs.keyboard = None;
    }
    if !pressed
        && ctx
            .grabs
            .device_grab(DEVICE_KEYBOARD)
            .is_some_and(|g| g.from_passive)
    {
        ctx.grabs.device.remove(&DEVICE_KEYBOARD);
    }
}

fn route_focus(ctx: &mut ServerContext, window: WindowId, focused: bool) {
    if !ctx.resources.has_window(window) {
        return;
    }
    if focused {
        ctx.focus.window = window;
    }
    let selected = ctx
        .resources
        .window(window)
        .map(|w| w.selects(EventMask::FOCUS_CHANGE))
        .unwrap_or(false);
    if selected {
        if let Some(client) = ctx.window_event_target(window) {
            // NotifyNonlinear, mode Normal
            let event = if focused {
                Event::FocusIn {
                    detail: 3,
                    event: window,
                    mode: 0,
                }
            } else {
                Event::FocusOut {
                    detail: 3,
                    event: window,
                    mode: 0,
                }
            };
            ctx.send_event(client, &event);
        }
    }
}

/// Host resized the root surface: update geometry, then ConfigureNotify and
/// Expose the root and its viewable children
fn root_resized(ctx: &mut ServerContext, width: u16, height: u16) {
    ctx.screen.width = width;
    ctx.screen.height = height;
    let children = {
        let Ok(root) = ctx.resources.window_mut(ROOT_WINDOW) else {
            return;
        };
        root.width = width;
        root.height = height;
        root.children.clone()
    };
    ctx.deliver_structure(ROOT_WINDOW, |event| Event::ConfigureNotify {
        event,
        window: ROOT_WINDOW,
        above_sibling: 0,
        x: 0,
        y: 0,
        width,
        height,
        border_width: 0,
        override_redirect: false,
    });
    expose_window(ctx, ROOT_WINDOW);
    for child in children {
        let viewable = ctx
            .resources
            .window(child)
            .map(|w| w.map_state == crate::resources::window::MapState::Viewable)
            .unwrap_or(false);
        if viewable {
            expose_window(ctx, child);
        }
    }
}

/// Expose covering the entire window, to whoever selected exposure on it
pub fn expose_window(ctx: &mut ServerContext, window: WindowId) {
    let Ok(win) = ctx.resources.window(window) else {
        return;
    };
    let (w, h) = (win.width, win.height);
    if !win.selects(EventMask::EXPOSURE) {
        return;
    }
    if let Some(client) = ctx.window_event_target(window) {
        ctx.send_event(
            client,
            &Event::Expose {
                window,
                x: 0,
                y: 0,
                width: w,
                height: h,
                count: 0,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::id_base;
    use crate::input::grabs::{ANY_MODIFIER, PassiveGrab};
    use crate::protocol::opcodes::{
        EV_BUTTON_PRESS, EV_GENERIC, EV_MOTION_NOTIFY, XINPUT_FIRST_EVENT,
    };
    use crate::resources::window::Window;
    use crate::server::context::tests::{add_client, test_context};

    fn make_window(ctx: &mut ServerContext, id: WindowId, owner: ClientId, mask: EventMask) {
        let mut win = Window::new(id, owner, ROOT_WINDOW);
        win.attributes.event_mask = mask;
        win.event_client = Some(owner);
        win.mapped = true;
        ctx.resources.insert_window(win);
        ctx.resources.add_child(ROOT_WINDOW, id);
        ctx.resources.refresh_map_state(id);
    }

    fn press(ctx: &mut ServerContext, window: WindowId, button: u8) {
        handle_primitive(
            ctx,
            InputPrimitive::Button {
                window,
                button,
                pressed: true,
                x: 10,
                y: 10,
                root_x: 10,
                root_y: 10,
                state: 0,
            },
        );
    }

    #[test]
    fn test_button_press_delivers_to_selector() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        make_window(&mut ctx, w, 1, EventMask::BUTTON_PRESS);

        press(&mut ctx, w, 1);
        let frame = rx.try_recv().expect("core press");
        assert_eq!(frame[0], EV_BUTTON_PRESS);
        assert_eq!(frame[1], 1);
        assert!(rx.try_recv().is_err(), "exactly one event");
    }

    #[test]
    fn test_press_bubbles_to_ancestor() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let parent = id_base(1) | 1;
        let child = id_base(1) | 2;
        make_window(&mut ctx, parent, 1, EventMask::BUTTON_PRESS);
        let mut cwin = Window::new(child, 1, parent);
        cwin.mapped = true;
        ctx.resources.insert_window(cwin);
        ctx.resources.add_child(parent, child);

        press(&mut ctx, child, 1);
        let frame = rx.try_recv().expect("bubbled press");
        assert_eq!(frame[0], EV_BUTTON_PRESS);
        // event window is the parent, child field points down the chain
        assert_eq!(
            u32::from_le_bytes([frame[12], frame[13], frame[14], frame[15]]),
            parent
        );
        assert_eq!(
            u32::from_le_bytes([frame[16], frame[17], frame[18], frame[19]]),
            child
        );
    }

    #[test]
    fn test_do_not_propagate_stops_bubble() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let parent = id_base(1) | 1;
        let child = id_base(1) | 2;
        make_window(&mut ctx, parent, 1, EventMask::BUTTON_PRESS);
        let mut cwin = Window::new(child, 1, parent);
        cwin.mapped = true;
        cwin.attributes.do_not_propagate_mask = EventMask::BUTTON_PRESS;
        ctx.resources.insert_window(cwin);
        ctx.resources.add_child(parent, child);

        press(&mut ctx, child, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_device_grab_suppresses_core() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        make_window(&mut ctx, w, 1, EventMask::BUTTON_PRESS);
        let classes = vec![(class_mask::DEVICE_BUTTON_PRESS << 8) | DEVICE_POINTER as u32];
        ctx.clients
            .get_mut(&1)
            .unwrap()
            .open_devices
            .insert(DEVICE_POINTER);
        ctx.grabs.device.insert(
            DEVICE_POINTER,
            DeviceGrab {
                device: DEVICE_POINTER,
                window: w,
                client: 1,
                owner_events: false,
                classes,
                time: 1,
                from_passive: false,
            },
        );

        press(&mut ctx, w, 1);
        let frame = rx.try_recv().expect("device event");
        assert_eq!(frame[0], XINPUT_FIRST_EVENT + XiDeviceEventKind::ButtonPress as u8);
        assert_eq!(frame[31], DEVICE_POINTER);
        assert!(rx.try_recv().is_err(), "no core press");
    }

    #[test]
    fn test_passive_device_grab_activates_and_suppresses_core() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        make_window(&mut ctx, w, 1, EventMask::BUTTON_PRESS);
        let classes = vec![(class_mask::DEVICE_BUTTON_PRESS << 8) | DEVICE_POINTER as u32];
        ctx.resources
            .window_mut(w)
            .unwrap()
            .passive_grabs
            .push(PassiveGrab {
                kind: PassiveGrabKind::Button,
                detail: 1,
                modifiers: ANY_MODIFIER,
                owner_events: false,
                event_mask: EventMask::empty(),
                pointer_mode: 0,
                keyboard_mode: 0,
                confine_to: 0,
                cursor: 0,
                device: Some(DEVICE_POINTER),
                classes,
                grabbing_client: 1,
            });

        press(&mut ctx, w, 1);
        let frame = rx.try_recv().expect("device event only");
        assert_eq!(frame[0], XINPUT_FIRST_EVENT + XiDeviceEventKind::ButtonPress as u8);
        assert!(rx.try_recv().is_err());
        assert!(ctx.grabs.device_grab(DEVICE_POINTER).is_some());

        // release of the last button drops the passive grab
        handle_primitive(
            &mut ctx,
            InputPrimitive::Button {
                window: w,
                button: 1,
                pressed: false,
                x: 10,
                y: 10,
                root_x: 10,
                root_y: 10,
                state: 0x100,
            },
        );
        assert!(ctx.grabs.device_grab(DEVICE_POINTER).is_none());
    }

    #[test]
    fn test_raw_motion_fires_on_zero_delta() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        ctx.pointer.root_x = 50;
        ctx.pointer.root_y = 50;
        ctx.clients.get_mut(&1).unwrap().xi2_masks.insert(
            (ROOT_WINDOW, crate::extensions::xinput::XI_ALL_MASTER_DEVICES),
            1 << xi2_event::RAW_MOTION,
        );

        handle_primitive(
            &mut ctx,
            InputPrimitive::Motion {
                window: ROOT_WINDOW,
                x: 50,
                y: 50,
                root_x: 50,
                root_y: 50,
                state: 0,
            },
        );
        let frame = rx.try_recv().expect("raw motion");
        assert_eq!(frame.len(), 48);
        assert_eq!(frame[0], EV_GENERIC);
        assert_eq!(u16::from_le_bytes([frame[8], frame[9]]), 17);
        assert_eq!(
            u32::from_le_bytes([frame[32], frame[33], frame[34], frame[35]]),
            0
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_motion_respects_event_mask() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        make_window(&mut ctx, w, 1, EventMask::POINTER_MOTION);

        handle_primitive(
            &mut ctx,
            InputPrimitive::Motion {
                window: w,
                x: 5,
                y: 5,
                root_x: 5,
                root_y: 5,
                state: 0,
            },
        );
        let frame = rx.try_recv().expect("motion");
        assert_eq!(frame[0], EV_MOTION_NOTIFY);
    }

    #[test]
    fn test_key_goes_to_focus_window() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        make_window(&mut ctx, w, 1, EventMask::KEY_PRESS);
        ctx.focus.window = w;

        handle_primitive(
            &mut ctx,
            InputPrimitive::Key {
                keycode: 38,
                pressed: true,
                state: 0,
            },
        );
        let frame = rx.try_recv().expect("key press");
        assert_eq!(frame[0], crate::protocol::opcodes::EV_KEY_PRESS);
        assert_eq!(frame[1], 38);
    }

    #[test]
    fn test_key_pointer_root_follows_pointer() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        make_window(&mut ctx, w, 1, EventMask::KEY_PRESS);
        ctx.focus.window = POINTER_ROOT;
        ctx.pointer.window = w;

        handle_primitive(
            &mut ctx,
            InputPrimitive::Key {
                keycode: 24,
                pressed: true,
                state: 0,
            },
        );
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_active_pointer_grab_routes_to_grabber() {
        let mut ctx = test_context();
        let mut rx1 = add_client(&mut ctx, 1);
        let mut rx2 = add_client(&mut ctx, 2);
        let w1 = id_base(1) | 1;
        let w2 = id_base(2) | 1;
        make_window(&mut ctx, w1, 1, EventMask::BUTTON_PRESS);
        make_window(&mut ctx, w2, 2, EventMask::BUTTON_PRESS);
        ctx.grabs.pointer = Some(PointerGrab {
            window: w2,
            client: 2,
            owner_events: false,
            event_mask: EventMask::BUTTON_PRESS,
            confine_to: 0,
            cursor: 0,
            pointer_mode: 0,
            keyboard_mode: 0,
            time: 1,
            from_passive: false,
        });

        press(&mut ctx, w1, 1);
        assert!(rx1.try_recv().is_err(), "non-grabbing client sees nothing");
        let frame = rx2.try_recv().expect("grabbing client");
        // delivery window is the grab window
        assert_eq!(
            u32::from_le_bytes([frame[12], frame[13], frame[14], frame[15]]),
            w2
        );
    }
}
