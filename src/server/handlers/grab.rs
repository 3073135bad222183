//! Core grab requests

use crate::core::errors::X11Error;
use crate::core::ids::{ClientId, Timestamp, WindowId, time_before};
use crate::input::grabs::{
    ANY_MODIFIER, KeyboardGrab, PassiveGrab, PassiveGrabKind, PointerGrab, grab_status,
};
use crate::protocol::events::EventMask;
use crate::protocol::replies::Reply;
use crate::resources::window::MapState;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

fn status_reply(status: u8) -> Outcome {
    Ok(Some(Reply::empty(status)))
}

#[allow(clippy::too_many_arguments)]
pub fn grab_pointer(
    ctx: &mut ServerContext,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    event_mask: u16,
    pointer_mode: u8,
    keyboard_mode: u8,
    confine_to: WindowId,
    cursor: u32,
    time: Timestamp,
) -> Outcome {
    let win = ctx.resources.window(grab_window)?;
    if win.map_state != MapState::Viewable {
        return status_reply(grab_status::NOT_VIEWABLE);
    }
    if confine_to != 0 {
        ctx.resources.window(confine_to)?;
    }
    if cursor != 0 {
        ctx.resources.cursor(cursor)?;
    }
    let time = ctx.resolve_time(time);
    if time_before(ctx.time, time) {
        return status_reply(grab_status::INVALID_TIME);
    }
    if let Some(existing) = &ctx.grabs.pointer {
        if existing.client != client {
            return status_reply(grab_status::ALREADY_GRABBED);
        }
        if time_before(time, existing.time) {
            return status_reply(grab_status::INVALID_TIME);
        }
    }
    ctx.grabs.pointer = Some(PointerGrab {
        window: grab_window,
        client,
        owner_events,
        event_mask: EventMask::from_bits_truncate(event_mask as u32),
        confine_to,
        cursor,
        pointer_mode,
        keyboard_mode,
        time,
        from_passive: false,
    });
    status_reply(grab_status::SUCCESS)
}

pub fn ungrab_pointer(ctx: &mut ServerContext, client: ClientId, time: Timestamp) -> Outcome {
    let time = ctx.resolve_time(time);
    if let Some(grab) = &ctx.grabs.pointer {
        if grab.client == client && !time_before(time, grab.time) {
            ctx.grabs.pointer = None;
        }
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn grab_button(
    ctx: &mut ServerContext,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    event_mask: u16,
    pointer_mode: u8,
    keyboard_mode: u8,
    confine_to: WindowId,
    cursor: u32,
    button: u8,
    modifiers: u16,
) -> Outcome {
    ctx.resources.window(grab_window)?;
    if modifiers != ANY_MODIFIER && modifiers & !0x00FF != 0 {
        return Err(X11Error::value(modifiers as u32));
    }
    let grab = PassiveGrab {
        kind: PassiveGrabKind::Button,
        detail: button,
        modifiers,
        owner_events,
        event_mask: EventMask::from_bits_truncate(event_mask as u32),
        pointer_mode,
        keyboard_mode,
        confine_to,
        cursor,
        device: None,
        classes: Vec::new(),
        grabbing_client: client,
    };
    let win = ctx.resources.window_mut(grab_window)?;
    win.passive_grabs.retain(|g| {
        !(g.kind == PassiveGrabKind::Button
            && g.device.is_none()
            && g.detail == button
            && g.modifiers == modifiers)
    });
    win.passive_grabs.push(grab);
    Ok(None)
}

pub fn ungrab_button(
    ctx: &mut ServerContext,
    button: u8,
    grab_window: WindowId,
    modifiers: u16,
) -> Outcome {
    let win = ctx.resources.window_mut(grab_window)?;
    win.passive_grabs.retain(|g| {
        !(g.kind == PassiveGrabKind::Button
            && g.device.is_none()
            && (button == 0 || g.detail == button)
            && (modifiers == ANY_MODIFIER || g.modifiers == modifiers))
    });
    Ok(None)
}

pub fn change_active_pointer_grab(
    ctx: &mut ServerContext,
    client: ClientId,
    cursor: u32,
    time: Timestamp,
    event_mask: u16,
) -> Outcome {
    let time = ctx.resolve_time(time);
    if let Some(grab) = &mut ctx.grabs.pointer {
        if grab.client == client && !time_before(time, grab.time) {
            grab.cursor = cursor;
            grab.event_mask = EventMask::from_bits_truncate(event_mask as u32);
        }
    }
    Ok(None)
}

pub fn grab_keyboard(
    ctx: &mut ServerContext,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    time: Timestamp,
    pointer_mode: u8,
    keyboard_mode: u8,
) -> Outcome {
    let win = ctx.resources.window(grab_window)?;
    if win.map_state != MapState::Viewable {
        return status_reply(grab_status::NOT_VIEWABLE);
    }
    let time = ctx.resolve_time(time);
    if time_before(ctx.time, time) {
        return status_reply(grab_status::INVALID_TIME);
    }
    if let Some(existing) = &ctx.grabs.keyboard {
        if existing.client != client {
            return status_reply(grab_status::ALREADY_GRABBED);
        }
        if time_before(time, existing.time) {
            return status_reply(grab_status::INVALID_TIME);
        }
    }
    ctx.grabs.keyboard = Some(KeyboardGrab {
        window: grab_window,
        client,
        owner_events,
        pointer_mode,
        keyboard_mode,
        time,
        from_passive: false,
    });
    status_reply(grab_status::SUCCESS)
}

pub fn ungrab_keyboard(ctx: &mut ServerContext, client: ClientId, time: Timestamp) -> Outcome {
    let time = ctx.resolve_time(time);
    if let Some(grab) = &ctx.grabs.keyboard {
        if grab.client == client && !time_before(time, grab.time) {
            ctx.grabs.keyboard = None;
        }
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn grab_key(
    ctx: &mut ServerContext,
    client: ClientId,
    owner_events: bool,
    grab_window: WindowId,
    modifiers: u16,
    key: u8,
    pointer_mode: u8,
    keyboard_mode: u8,
) -> Outcome {
    ctx.resources.window(grab_window)?;
    let grab = PassiveGrab {
        kind: PassiveGrabKind::Key,
        detail: key,
        modifiers,
        owner_events,
        event_mask: EventMask::KEY_PRESS | EventMask::KEY_RELEASE,
        pointer_mode,
        keyboard_mode,
        confine_to: 0,
        cursor: 0,
        device: None,
        classes: Vec::new(),
        grabbing_client: client,
    };
    let win = ctx.resources.window_mut(grab_window)?;
    win.passive_grabs.retain(|g| {
        !(g.kind == PassiveGrabKind::Key
            && g.device.is_none()
            && g.detail == key
            && g.modifiers == modifiers)
    });
    win.passive_grabs.push(grab);
    Ok(None)
}

pub fn ungrab_key(
    ctx: &mut ServerContext,
    key: u8,
    grab_window: WindowId,
    modifiers: u16,
) -> Outcome {
    let win = ctx.resources.window_mut(grab_window)?;
    win.passive_grabs.retain(|g| {
        !(g.kind == PassiveGrabKind::Key
            && g.device.is_none()
            && (key == 0 || g.detail == key)
            && (modifiers == ANY_MODIFIER || g.modifiers == modifiers))
    });
    Ok(None)
}

pub fn allow_events(ctx: &mut ServerContext, mode: u8, time: Timestamp) -> Outcome {
    // no freeze queue: devices are never frozen, so replay modes are no-ops
    if mode > 7 {
        return Err(X11Error::value(mode as u32));
    }
    let _ = ctx.resolve_time(time);
    Ok(None)
}

pub fn grab_server(ctx: &mut ServerContext, client: ClientId) -> Outcome {
    if ctx.grabs.server.is_none() {
        ctx.grabs.server = Some(client);
    }
    Ok(None)
}

pub fn ungrab_server(ctx: &mut ServerContext, client: ClientId) -> Outcome {
    if ctx.grabs.server == Some(client) {
        ctx.grabs.server = None;
        ctx.release_held_events();
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{ROOT_WINDOW, id_base};
    use crate::protocol::wire::WireOrder;
    use crate::resources::window::Window;
    use crate::server::context::tests::{add_client, test_context};

    fn viewable_window(ctx: &mut ServerContext, id: WindowId) {
        let mut win = Window::new(id, 1, ROOT_WINDOW);
        win.mapped = true;
        win.map_state = MapState::Viewable;
        ctx.resources.insert_window(win);
        ctx.resources.add_child(ROOT_WINDOW, id);
    }

    fn status_of(outcome: Outcome) -> u8 {
        outcome.unwrap().unwrap().encode(1, WireOrder::Lsb)[1]
    }

    #[test]
    fn test_grab_then_ungrab_returns_to_free_state() {
        let mut ctx = test_context();
        let _rx1 = add_client(&mut ctx, 1);
        let _rx2 = add_client(&mut ctx, 2);
        let w = id_base(1) | 1;
        viewable_window(&mut ctx, w);

        let s = status_of(grab_pointer(&mut ctx, 1, false, w, 0x4, 1, 1, 0, 0, 0));
        assert_eq!(s, grab_status::SUCCESS);
        // second client is refused
        let s = status_of(grab_pointer(&mut ctx, 2, false, w, 0x4, 1, 1, 0, 0, 0));
        assert_eq!(s, grab_status::ALREADY_GRABBED);

        ungrab_pointer(&mut ctx, 1, 0).unwrap();
        assert!(ctx.grabs.pointer.is_none());
        let s = status_of(grab_pointer(&mut ctx, 2, false, w, 0x4, 1, 1, 0, 0, 0));
        assert_eq!(s, grab_status::SUCCESS);
    }

    #[test]
    fn test_stale_ungrab_is_ignored() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        viewable_window(&mut ctx, w);
        ctx.time = 100;
        status_of(grab_pointer(&mut ctx, 1, false, w, 0, 1, 1, 0, 0, 100));
        // explicit time before the grab time: no-op
        ungrab_pointer(&mut ctx, 1, 50).unwrap();
        assert!(ctx.grabs.pointer.is_some());
        ungrab_pointer(&mut ctx, 1, 100).unwrap();
        assert!(ctx.grabs.pointer.is_none());
    }

    #[test]
    fn test_grab_on_unviewable_window() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        ctx.resources.insert_window(Window::new(w, 1, ROOT_WINDOW));
        ctx.resources.add_child(ROOT_WINDOW, w);
        let s = status_of(grab_pointer(&mut ctx, 1, false, w, 0, 1, 1, 0, 0, 0));
        assert_eq!(s, grab_status::NOT_VIEWABLE);
    }

    #[test]
    fn test_grab_button_registers_passive_grab() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        viewable_window(&mut ctx, w);
        grab_button(&mut ctx, 1, true, w, 0x4, 1, 1, 0, 0, 1, ANY_MODIFIER).unwrap();
        assert_eq!(ctx.resources.window(w).unwrap().passive_grabs.len(), 1);
        // re-registering the same button replaces the entry
        grab_button(&mut ctx, 1, false, w, 0x4, 1, 1, 0, 0, 1, ANY_MODIFIER).unwrap();
        assert_eq!(ctx.resources.window(w).unwrap().passive_grabs.len(), 1);
        ungrab_button(&mut ctx, 1, w, ANY_MODIFIER).unwrap();
        assert!(ctx.resources.window(w).unwrap().passive_grabs.is_empty());
    }

    #[test]
    fn test_server_grab_cycle() {
        let mut ctx = test_context();
        let _rx1 = add_client(&mut ctx, 1);
        grab_server(&mut ctx, 1).unwrap();
        assert_eq!(ctx.grabs.server, Some(1));
        ungrab_server(&mut ctx, 1).unwrap();
        assert_eq!(ctx.grabs.server, None);
    }
}
