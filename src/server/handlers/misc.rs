//! Pointer, focus, keyboard, extension, and server-control requests

use tracing::debug;

use crate::core::errors::X11Error;
use crate::core::ids::{
    ClientId, MAX_KEYCODE, MIN_KEYCODE, NONE, POINTER_ROOT, ROOT_WINDOW, Timestamp, WindowId,
    id_owner,
};
use crate::protocol::events::Event;
use crate::protocol::replies::Reply;
use crate::server::client::CloseDownMode;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

pub fn query_pointer(ctx: &ServerContext, client: ClientId, window: WindowId) -> Outcome {
    ctx.resources.window(window)?;
    let order = ctx.clients[&client].order;
    let p = ctx.pointer;
    let (abs_x, abs_y) = ctx.window_abs_pos(window);
    let child = ctx.child_toward(window, p.window);
    Ok(Some(Reply::build(1, order, |w| {
        w.u32(ROOT_WINDOW);
        w.u32(child);
        w.i16(p.root_x).i16(p.root_y);
        w.i16(p.root_x - abs_x).i16(p.root_y - abs_y);
        w.u16(p.state);
    })))
}

pub fn get_motion_events(
    ctx: &ServerContext,
    client: ClientId,
    window: WindowId,
    _start: Timestamp,
    _stop: Timestamp,
) -> Outcome {
    ctx.resources.window(window)?;
    let order = ctx.clients[&client].order;
    // the motion buffer is advertised as zero-length
    Ok(Some(Reply::build(0, order, |w| {
        w.u32(0);
    })))
}

pub fn translate_coordinates(
    ctx: &ServerContext,
    client: ClientId,
    src_window: WindowId,
    dst_window: WindowId,
    src_x: i16,
    src_y: i16,
) -> Outcome {
    ctx.resources.window(src_window)?;
    ctx.resources.window(dst_window)?;
    let order = ctx.clients[&client].order;
    let (src_abs_x, src_abs_y) = ctx.window_abs_pos(src_window);
    let (dst_abs_x, dst_abs_y) = ctx.window_abs_pos(dst_window);
    let dst_x = src_abs_x + src_x - dst_abs_x;
    let dst_y = src_abs_y + src_y - dst_abs_y;
    // report the mapped child containing the point, if any
    let child = ctx
        .resources
        .window(dst_window)?
        .children
        .iter()
        .rev()
        .copied()
        .find(|&c| {
            ctx.resources
                .window(c)
                .map(|w| {
                    w.mapped
                        && dst_x >= w.x
                        && dst_y >= w.y
                        && dst_x < w.x + w.width as i16
                        && dst_y < w.y + w.height as i16
                })
                .unwrap_or(false)
        })
        .unwrap_or(0);
    Ok(Some(Reply::build(1, order, |w| {
        w.u32(child);
        w.i16(dst_x).i16(dst_y);
    })))
}

#[allow(clippy::too_many_arguments)]
pub fn warp_pointer(
    ctx: &mut ServerContext,
    src_window: WindowId,
    dst_window: WindowId,
    _src_x: i16,
    _src_y: i16,
    dst_x: i16,
    dst_y: i16,
) -> Outcome {
    if src_window != 0 {
        ctx.resources.window(src_window)?;
    }
    if dst_window != 0 {
        ctx.resources.window(dst_window)?;
        let (abs_x, abs_y) = ctx.window_abs_pos(dst_window);
        ctx.pointer.root_x = abs_x + dst_x;
        ctx.pointer.root_y = abs_y + dst_y;
    } else {
        // relative move
        ctx.pointer.root_x += dst_x;
        ctx.pointer.root_y += dst_y;
    }
    Ok(None)
}

pub fn set_input_focus(
    ctx: &mut ServerContext,
    revert_to: u8,
    focus: u32,
    time: Timestamp,
) -> Outcome {
    if revert_to > 2 {
        return Err(X11Error::value(revert_to as u32));
    }
    if focus != NONE && focus != POINTER_ROOT {
        ctx.resources.window(focus)?;
    }
    let _ = ctx.resolve_time(time);
    let old = ctx.focus.window;
    ctx.focus.window = focus;
    ctx.focus.revert_to = revert_to;

    // NotifyNonlinear to the windows that lost and gained focus
    if old != focus && old != NONE && old != POINTER_ROOT {
        let selected = ctx
            .resources
            .window(old)
            .map(|w| w.selects(crate::protocol::events::EventMask::FOCUS_CHANGE))
            .unwrap_or(false);
        if selected {
            if let Some(target) = ctx.window_event_target(old) {
                ctx.send_event(
                    target,
                    &Event::FocusOut {
                        detail: 3,
                        event: old,
                        mode: 0,
                    },
                );
            }
        }
    }
    if old != focus && focus != NONE && focus != POINTER_ROOT {
        let selected = ctx
            .resources
            .window(focus)
            .map(|w| w.selects(crate::protocol::events::EventMask::FOCUS_CHANGE))
            .unwrap_or(false);
        if selected {
            if let Some(target) = ctx.window_event_target(focus) {
                ctx.send_event(
                    target,
                    &Event::FocusIn {
                        detail: 3,
                        event: focus,
                        mode: 0,
                    },
                );
            }
        }
    }
    Ok(None)
}

pub fn get_input_focus(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let focus = ctx.focus;
    Ok(Some(Reply::build(focus.revert_to, order, |w| {
        w.u32(focus.window);
    })))
}

pub fn query_keymap(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    // no held keys are tracked
    Ok(Some(Reply::build(0, order, |w| {
        w.zeros(32);
    })))
}

pub fn query_extension(ctx: &ServerContext, client: ClientId, name: &str) -> Outcome {
    let order = ctx.clients[&client].order;
    let found = crate::extensions::find(name);
    debug!(name, present = found.is_some(), "QueryExtension");
    Ok(Some(Reply::build(0, order, |w| {
        match found {
            Some(ext) => {
                w.u8(1)
                    .u8(ext.major_opcode)
                    .u8(ext.first_event)
                    .u8(ext.first_error);
            }
            None => {
                w.zeros(4);
            }
        };
    })))
}

pub fn list_extensions(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let names: Vec<&str> = crate::extensions::EXTENSIONS.iter().map(|e| e.name).collect();
    Ok(Some(Reply::build(names.len() as u8, order, |w| {
        w.zeros(24);
        for name in &names {
            w.u8(name.len() as u8);
            for ch in name.chars() {
                w.u8(ch as u8);
            }
        }
        w.pad_to_4();
    })))
}

pub fn change_keyboard_mapping(
    ctx: &mut ServerContext,
    keycode_count: u8,
    first_keycode: u8,
    keysyms_per_keycode: u8,
    keysyms: &[u32],
) -> Outcome {
    if first_keycode < MIN_KEYCODE {
        return Err(X11Error::value(first_keycode as u32));
    }
    if keysyms_per_keycode == 0 {
        return Err(X11Error::value(0));
    }
    for i in 0..keycode_count {
        let start = i as usize * keysyms_per_keycode as usize;
        let row = keysyms[start..start + keysyms_per_keycode as usize].to_vec();
        ctx.settings.keyboard_map.insert(first_keycode + i, row);
    }
    ctx.settings.keysyms_per_keycode = keysyms_per_keycode;
    broadcast_mapping_notify(ctx, 1, first_keycode, keycode_count);
    Ok(None)
}

pub fn get_keyboard_mapping(
    ctx: &ServerContext,
    client: ClientId,
    first_keycode: u8,
    count: u8,
) -> Outcome {
    if first_keycode < MIN_KEYCODE || first_keycode.checked_add(count.saturating_sub(1)).is_none()
    {
        return Err(X11Error::value(first_keycode as u32));
    }
    let order = ctx.clients[&client].order;
    let per = ctx.settings.keysyms_per_keycode;
    let map = ctx.settings.keyboard_map.clone();
    Ok(Some(Reply::build(per, order, |w| {
        w.zeros(24);
        for keycode in first_keycode..first_keycode.saturating_add(count) {
            match map.get(&keycode) {
                Some(row) => {
                    for i in 0..per as usize {
                        w.u32(row.get(i).copied().unwrap_or(0));
                    }
                }
                None => {
                    for _ in 0..per {
                        w.u32(0); // NoSymbol
                    }
                }
            }
        }
    })))
}

pub fn change_keyboard_control(
    ctx: &mut ServerContext,
    value_mask: u32,
    values: &[u32],
) -> Outcome {
    ctx.frontend.change_keyboard_control(value_mask, values);
    Ok(None)
}

pub fn get_keyboard_control(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let bell = ctx.settings.bell_percent as u8;
    Ok(Some(Reply::build(1, order, |w| {
        w.u32(0); // led mask
        w.u8(50); // key click percent
        w.u8(bell);
        w.u16(400); // bell pitch
        w.u16(100); // bell duration
        w.u16(0);
        w.bytes(&[1; 32]); // auto repeats: everything repeats
    })))
}

pub fn bell(ctx: &mut ServerContext, percent: i8) -> Outcome {
    if !(-100..=100).contains(&percent) {
        return Err(X11Error::value(percent as u32));
    }
    ctx.settings.bell_percent = percent;
    ctx.frontend.bell(percent);
    Ok(None)
}

pub fn change_pointer_control(
    ctx: &mut ServerContext,
    accel_numerator: i16,
    accel_denominator: i16,
    threshold: i16,
    do_accel: bool,
    do_threshold: bool,
) -> Outcome {
    if do_accel {
        if accel_denominator == 0 {
            return Err(X11Error::value(0));
        }
        ctx.settings.pointer_accel_numerator = accel_numerator;
        ctx.settings.pointer_accel_denominator = accel_denominator;
    }
    if do_threshold {
        ctx.settings.pointer_threshold = threshold;
    }
    ctx.frontend
        .change_pointer_control(accel_numerator, accel_denominator, threshold);
    Ok(None)
}

pub fn get_pointer_control(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let s = &ctx.settings;
    let (num, den, thresh) = (
        s.pointer_accel_numerator,
        s.pointer_accel_denominator,
        s.pointer_threshold,
    );
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(num as u16).u16(den as u16).u16(thresh as u16);
    })))
}

pub fn set_screen_saver(
    ctx: &mut ServerContext,
    timeout: i16,
    interval: i16,
    prefer_blanking: u8,
    allow_exposures: u8,
) -> Outcome {
    if prefer_blanking > 2 || allow_exposures > 2 {
        return Err(X11Error::value(prefer_blanking as u32));
    }
    ctx.settings.screen_saver_timeout = timeout;
    ctx.settings.screen_saver_interval = interval;
    ctx.settings.screen_saver_prefer_blanking = prefer_blanking;
    ctx.settings.screen_saver_allow_exposures = allow_exposures;
    ctx.frontend.set_screen_saver(timeout, interval);
    Ok(None)
}

pub fn get_screen_saver(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let s = &ctx.settings;
    let (timeout, interval, blank, expose) = (
        s.screen_saver_timeout,
        s.screen_saver_interval,
        s.screen_saver_prefer_blanking,
        s.screen_saver_allow_exposures,
    );
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(timeout as u16).u16(interval as u16);
        w.u8(blank).u8(expose);
    })))
}

pub fn change_hosts(ctx: &mut ServerContext, mode: u8, family: u8, address: &[u8]) -> Outcome {
    if mode > 1 {
        return Err(X11Error::value(mode as u32));
    }
    ctx.frontend.change_hosts(mode, family, address);
    Ok(None)
}

pub fn list_hosts(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let enabled = ctx.settings.access_control;
    Ok(Some(Reply::build(enabled as u8, order, |w| {
        w.u16(0); // no hosts recorded
    })))
}

pub fn set_access_control(ctx: &mut ServerContext, mode: u8) -> Outcome {
    if mode > 1 {
        return Err(X11Error::value(mode as u32));
    }
    ctx.settings.access_control = mode != 0;
    ctx.frontend.set_access_control(mode != 0);
    Ok(None)
}

pub fn set_close_down_mode(ctx: &mut ServerContext, client: ClientId, mode: u8) -> Outcome {
    let parsed = CloseDownMode::from_wire(mode).ok_or_else(|| X11Error::value(mode as u32))?;
    if let Some(c) = ctx.clients.get_mut(&client) {
        c.close_down = parsed;
    }
    ctx.frontend.set_close_down_mode(client, mode);
    Ok(None)
}

pub fn kill_client(ctx: &mut ServerContext, resource: u32) -> Outcome {
    if resource == 0 {
        // AllTemporary
        ctx.kill_temporary_resources();
        return Ok(None);
    }
    let target = id_owner(resource);
    if !ctx.clients.contains_key(&target) {
        return Err(X11Error::value(resource));
    }
    debug!(target, "KillClient");
    ctx.frontend.kill_client(target);
    ctx.disconnect_client(target);
    Ok(None)
}

pub fn force_screen_saver(ctx: &mut ServerContext, mode: u8) -> Outcome {
    if mode > 1 {
        return Err(X11Error::value(mode as u32));
    }
    ctx.frontend
        .set_screen_saver(ctx.settings.screen_saver_timeout, ctx.settings.screen_saver_interval);
    Ok(None)
}

pub fn set_pointer_mapping(ctx: &mut ServerContext, map: &[u8]) -> Outcome {
    ctx.frontend.set_pointer_mapping(map);
    broadcast_mapping_notify(ctx, 2, 0, 0);
    Ok(Some(Reply::empty(0)))
}

pub fn get_pointer_mapping(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let map = ctx.frontend.get_pointer_mapping();
    Ok(Some(Reply::build(map.len() as u8, order, |w| {
        w.zeros(24);
        w.bytes(&map);
        w.pad_to_4();
    })))
}

pub fn set_modifier_mapping(
    ctx: &mut ServerContext,
    keycodes_per_modifier: u8,
    keycodes: &[u8],
) -> Outcome {
    ctx.frontend
        .set_modifier_mapping(keycodes_per_modifier, keycodes);
    broadcast_mapping_notify(ctx, 0, 0, 0);
    Ok(Some(Reply::empty(0)))
}

pub fn get_modifier_mapping(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let map = ctx.frontend.get_modifier_mapping();
    let per = (map.len() / 8).max(1) as u8;
    Ok(Some(Reply::build(per, order, |w| {
        w.zeros(24);
        w.bytes(&map);
        w.pad_to_4();
    })))
}

/// MappingNotify goes to every connected client
fn broadcast_mapping_notify(ctx: &mut ServerContext, request: u8, first_keycode: u8, count: u8) {
    let first_keycode = if request == 1 { first_keycode } else { 0 };
    let count = if request == 1 {
        count
    } else {
        MAX_KEYCODE - MIN_KEYCODE + 1
    };
    let ids: Vec<ClientId> = ctx.clients.keys().copied().collect();
    for id in ids {
        ctx.send_event(
            id,
            &Event::MappingNotify {
                request,
                first_keycode,
                count,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::WireOrder;
    use crate::server::context::tests::{add_client, test_context};

    #[test]
    fn test_query_extension_known_and_unknown() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = query_extension(&ctx, 1, "XInputExtension").unwrap().unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        assert_eq!(bytes[8], 1); // present
        assert_eq!(bytes[9], crate::protocol::opcodes::XINPUT_MAJOR);
        assert_eq!(bytes[10], crate::protocol::opcodes::XINPUT_FIRST_EVENT);

        let reply = query_extension(&ctx, 1, "GLX").unwrap().unwrap();
        let bytes = reply.encode(2, WireOrder::Lsb);
        assert_eq!(bytes[8], 0);
    }

    #[test]
    fn test_list_extensions_names() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = list_extensions(&ctx, 1).unwrap().unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        assert_eq!(bytes[1], 2); // two extensions
        let len = bytes[32] as usize;
        assert_eq!(&bytes[33..33 + len], b"BIG-REQUESTS");
    }

    #[test]
    fn test_keyboard_mapping_round_trip() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        change_keyboard_mapping(&mut ctx, 1, 38, 2, &[0x61, 0x41]).unwrap();
        // mapping change fans out MappingNotify
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame[0], crate::protocol::opcodes::EV_MAPPING_NOTIFY);
        assert_eq!(frame[4], 1); // Keyboard

        let reply = get_keyboard_mapping(&ctx, 1, 38, 1).unwrap().unwrap();
        let bytes = reply.encode(2, WireOrder::Lsb);
        assert_eq!(bytes[1], 2); // keysyms per keycode
        assert_eq!(
            u32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]),
            0x61
        );
    }

    #[test]
    fn test_get_input_focus_defaults_to_pointer_root() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = get_input_focus(&ctx, 1).unwrap().unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        assert_eq!(
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            POINTER_ROOT
        );
    }

    #[test]
    fn test_set_close_down_mode() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        set_close_down_mode(&mut ctx, 1, 1).unwrap();
        assert_eq!(
            ctx.clients[&1].close_down,
            CloseDownMode::RetainPermanent
        );
        let err = set_close_down_mode(&mut ctx, 1, 9).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Value);
    }
}
