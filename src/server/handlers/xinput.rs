//! XInputExtension handlers
//!
//! Two fixed virtual devices back both protocol versions: the core pointer
//! as device 2 and the core keyboard as device 3.

use crate::core::errors::X11Error;
use crate::core::ids::{ClientId, Timestamp, WindowId, time_before};
use crate::extensions::xinput::{
    DEVICE_KEYBOARD, DEVICE_POINTER, XI_ALL_DEVICES, XI_ALL_MASTER_DEVICES, Xi2MaskEntry,
    XiRequest,
};
use crate::input::grabs::{DeviceGrab, PassiveGrab, PassiveGrabKind, grab_status};
use crate::protocol::events::EventMask;
use crate::protocol::replies::Reply;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

fn valid_device(device: u8) -> crate::core::errors::HandlerResult<u8> {
    match device {
        DEVICE_POINTER | DEVICE_KEYBOARD => Ok(device),
        other => Err(X11Error::value(other as u32)),
    }
}

fn valid_device16(device: u16) -> crate::core::errors::HandlerResult<u8> {
    match device {
        XI_ALL_DEVICES | XI_ALL_MASTER_DEVICES => Ok(DEVICE_POINTER),
        d if d == DEVICE_POINTER as u16 || d == DEVICE_KEYBOARD as u16 => Ok(d as u8),
        other => Err(X11Error::value(other as u32)),
    }
}

pub fn dispatch(ctx: &mut ServerContext, client: ClientId, req: XiRequest) -> Outcome {
    let order = ctx.clients[&client].order;
    match req {
        XiRequest::GetExtensionVersion { .. } => Ok(Some(Reply::build(1, order, |w| {
            w.u16(2).u16(2);
            w.u8(1); // present
        }))),
        XiRequest::ListInputDevices => {
            let names = ["Virtual core pointer", "Virtual core keyboard"];
            Ok(Some(Reply::build(2, order, |w| {
                w.zeros(24);
                // xDeviceInfo pair: no classes, use = pointer / keyboard
                w.u32(0).u8(DEVICE_POINTER).u8(0).u8(1).u8(0);
                w.u32(0).u8(DEVICE_KEYBOARD).u8(0).u8(2).u8(0);
                for name in names {
                    w.u8(name.len() as u8);
                    for ch in name.chars() {
                        w.u8(ch as u8);
                    }
                }
                w.pad_to_4();
            })))
        }
        XiRequest::OpenDevice { device } => {
            let device = valid_device(device)?;
            if let Some(c) = ctx.clients.get_mut(&client) {
                c.open_devices.insert(device);
            }
            Ok(Some(Reply::build(3, order, |w| {
                w.u8(0); // no input classes
            })))
        }
        XiRequest::CloseDevice { device } => {
            let device = valid_device(device)?;
            if let Some(c) = ctx.clients.get_mut(&client) {
                c.open_devices.remove(&device);
            }
            Ok(None)
        }
        XiRequest::SelectExtensionEvent { window, classes } => {
            ctx.resources.window(window)?;
            let open = &ctx.clients[&client].open_devices;
            for &class in &classes {
                let (_, device) = crate::extensions::xinput::split_class(class);
                if !open.contains(&device) {
                    return Err(X11Error::value(class));
                }
            }
            if let Some(c) = ctx.clients.get_mut(&client) {
                c.xi1_selections.insert(window, classes);
            }
            Ok(None)
        }
        XiRequest::GetSelectedExtensionEvents { window } => {
            ctx.resources.window(window)?;
            let classes = ctx.clients[&client]
                .xi1_selections
                .get(&window)
                .cloned()
                .unwrap_or_default();
            Ok(Some(Reply::build(7, order, |w| {
                w.u16(classes.len() as u16);
                w.u16(0); // no all-clients classes reported
                w.zeros(20);
                for class in &classes {
                    w.u32(*class);
                }
            })))
        }
        XiRequest::GrabDevice {
            window,
            time,
            this_device_mode: _,
            other_device_mode: _,
            owner_events,
            device,
            classes,
        } => {
            let device = valid_device(device)?;
            ctx.resources.window(window)?;
            let time = ctx.resolve_time(time);
            let status = grab_device(ctx, client, device, window, owner_events, classes, time);
            Ok(Some(Reply::build(13, order, |w| {
                w.u8(status);
            })))
        }
        XiRequest::UngrabDevice { time, device } => {
            let device = valid_device(device)?;
            let time = ctx.resolve_time(time);
            if let Some(grab) = ctx.grabs.device_grab(device) {
                if grab.client == client && !time_before(time, grab.time) {
                    ctx.grabs.device.remove(&device);
                }
            }
            Ok(None)
        }
        XiRequest::GrabDeviceButton {
            window,
            grabbed_device,
            modifier_device: _,
            modifiers,
            this_device_mode,
            other_device_mode,
            button,
            owner_events,
            classes,
        } => {
            let device = valid_device(grabbed_device)?;
            register_passive_device_grab(
                ctx,
                client,
                window,
                PassiveGrabKind::Button,
                device,
                button,
                modifiers,
                owner_events,
                this_device_mode,
                other_device_mode,
                classes,
            )
        }
        XiRequest::UngrabDeviceButton {
            window,
            modifiers,
            button,
            grabbed_device,
        } => {
            let device = valid_device(grabbed_device)?;
            remove_passive_device_grab(ctx, window, PassiveGrabKind::Button, device, button, modifiers)
        }
        XiRequest::GrabDeviceKey {
            window,
            grabbed_device,
            modifier_device: _,
            modifiers,
            this_device_mode,
            other_device_mode,
            key,
            owner_events,
            classes,
        } => {
            let device = valid_device(grabbed_device)?;
            register_passive_device_grab(
                ctx,
                client,
                window,
                PassiveGrabKind::Key,
                device,
                key,
                modifiers,
                owner_events,
                this_device_mode,
                other_device_mode,
                classes,
            )
        }
        XiRequest::UngrabDeviceKey {
            window,
            modifiers,
            key,
            grabbed_device,
        } => {
            let device = valid_device(grabbed_device)?;
            remove_passive_device_grab(ctx, window, PassiveGrabKind::Key, device, key, modifiers)
        }
        XiRequest::AllowDeviceEvents { time, mode, device } => {
            valid_device(device)?;
            if mode > 7 {
                return Err(X11Error::value(mode as u32));
            }
            let _ = ctx.resolve_time(time);
            Ok(None)
        }
        XiRequest::GetDeviceButtonMapping { device } => {
            valid_device(device)?;
            Ok(Some(Reply::build(28, order, |w| {
                w.u8(3);
                w.zeros(23);
                w.bytes(&[1, 2, 3]);
                w.pad_to_4();
            })))
        }
        XiRequest::QueryDeviceState { device } => {
            valid_device(device)?;
            Ok(Some(Reply::build(30, order, |w| {
                w.u8(0); // no state classes
            })))
        }
        XiRequest::DeviceBell { device, percent, .. } => {
            valid_device(device)?;
            ctx.frontend.bell(percent);
            Ok(None)
        }
        XiRequest::XiQueryVersion { .. } => Ok(Some(Reply::build(47, order, |w| {
            w.u16(2).u16(2);
        }))),
        XiRequest::XiQueryDevice { device } => {
            if device != XI_ALL_DEVICES && device != XI_ALL_MASTER_DEVICES {
                valid_device16(device)?;
            }
            let devices: Vec<(u16, u16, u16, &str)> = match device {
                d if d == DEVICE_POINTER as u16 => {
                    vec![(DEVICE_POINTER as u16, 1, DEVICE_KEYBOARD as u16, "Virtual core pointer")]
                }
                d if d == DEVICE_KEYBOARD as u16 => vec![(
                    DEVICE_KEYBOARD as u16,
                    2,
                    DEVICE_POINTER as u16,
                    "Virtual core keyboard",
                )],
                _ => vec![
                    (DEVICE_POINTER as u16, 1, DEVICE_KEYBOARD as u16, "Virtual core pointer"),
                    (DEVICE_KEYBOARD as u16, 2, DEVICE_POINTER as u16, "Virtual core keyboard"),
                ],
            };
            Ok(Some(Reply::build(48, order, |w| {
                w.u16(devices.len() as u16);
                w.zeros(22);
                for (id, device_use, attachment, name) in &devices {
                    w.u16(*id).u16(*device_use).u16(*attachment);
                    w.u16(0); // no classes
                    w.u16(name.len() as u16);
                    w.u8(1); // enabled
                    w.u8(0);
                    w.string8_padded(name);
                }
            })))
        }
        XiRequest::XiSelectEvents { window, masks } => {
            ctx.resources.window(window)?;
            xi_select_events(ctx, client, window, &masks);
            Ok(None)
        }
        XiRequest::XiGetSelectedEvents { window } => {
            ctx.resources.window(window)?;
            let entries: Vec<(u16, u32)> = ctx.clients[&client]
                .xi2_masks
                .iter()
                .filter(|((w, _), mask)| *w == window && **mask != 0)
                .map(|((_, device), mask)| (*device, *mask))
                .collect();
            Ok(Some(Reply::build(60, order, |w| {
                w.u16(entries.len() as u16);
                w.zeros(22);
                for (device, mask) in &entries {
                    w.u16(*device).u16(1);
                    w.u32(*mask);
                }
            })))
        }
        XiRequest::XiQueryPointer { window, device } => {
            valid_device16(device)?;
            ctx.resources.window(window)?;
            let p = ctx.pointer;
            let (abs_x, abs_y) = ctx.window_abs_pos(window);
            let child = ctx.child_toward(window, p.window);
            Ok(Some(Reply::build(40, order, |w| {
                w.u32(crate::core::ids::ROOT_WINDOW);
                w.u32(child);
                w.i32((p.root_x as i32) << 16).i32((p.root_y as i32) << 16);
                w.i32(((p.root_x - abs_x) as i32) << 16);
                w.i32(((p.root_y - abs_y) as i32) << 16);
                w.u8(1); // same screen
                w.u8(0);
                w.u16(0); // buttons len
                w.u32(p.state as u32).u32(0).u32(0).u32(p.state as u32);
                w.u32(0); // group
            })))
        }
        XiRequest::XiGrabDevice {
            window,
            time,
            cursor: _,
            device,
            grab_mode: _,
            paired_device_mode: _,
            owner_events,
            mask,
        } => {
            let device = valid_device16(device)?;
            ctx.resources.window(window)?;
            let time = ctx.resolve_time(time);
            // XI2 grabs reuse the device grab engine with an XI2 mask: the
            // class list is synthesized so the XI1 delivery path stays quiet
            let classes = xi2_mask_to_classes(mask, device);
            let status = grab_device(ctx, client, device, window, owner_events, classes, time);
            Ok(Some(Reply::build(51, order, |w| {
                w.u8(status);
            })))
        }
        XiRequest::XiUngrabDevice { time, device } => {
            let device = valid_device16(device)?;
            let time = ctx.resolve_time(time);
            if let Some(grab) = ctx.grabs.device_grab(device) {
                if grab.client == client && !time_before(time, grab.time) {
                    ctx.grabs.device.remove(&device);
                }
            }
            Ok(None)
        }
    }
}

fn grab_device(
    ctx: &mut ServerContext,
    client: ClientId,
    device: u8,
    window: WindowId,
    owner_events: bool,
    classes: Vec<u32>,
    time: Timestamp,
) -> u8 {
    if let Some(existing) = ctx.grabs.device_grab(device) {
        if existing.client != client {
            return grab_status::ALREADY_GRABBED;
        }
        if time_before(time, existing.time) {
            return grab_status::INVALID_TIME;
        }
    }
    ctx.grabs.device.insert(
        device,
        DeviceGrab {
            device,
            window,
            client,
            owner_events,
            classes,
            time,
            from_passive: false,
        },
    );
    grab_status::SUCCESS
}

#[allow(clippy::too_many_arguments)]
fn register_passive_device_grab(
    ctx: &mut ServerContext,
    client: ClientId,
    window: WindowId,
    kind: PassiveGrabKind,
    device: u8,
    detail: u8,
    modifiers: u16,
    owner_events: bool,
    pointer_mode: u8,
    keyboard_mode: u8,
    classes: Vec<u32>,
) -> Outcome {
    ctx.resources.window(window)?;
    let grab = PassiveGrab {
        kind,
        detail,
        modifiers,
        owner_events,
        event_mask: EventMask::empty(),
        pointer_mode,
        keyboard_mode,
        confine_to: 0,
        cursor: 0,
        device: Some(device),
        classes,
        grabbing_client: client,
    };
    let win = ctx.resources.window_mut(window)?;
    win.passive_grabs.retain(|g| {
        !(g.kind == kind
            && g.device == Some(device)
            && g.detail == detail
            && g.modifiers == modifiers)
    });
    win.passive_grabs.push(grab);
    Ok(None)
}

fn remove_passive_device_grab(
    ctx: &mut ServerContext,
    window: WindowId,
    kind: PassiveGrabKind,
    device: u8,
    detail: u8,
    modifiers: u16,
) -> Outcome {
    let win = ctx.resources.window_mut(window)?;
    win.passive_grabs.retain(|g| {
        !(g.kind == kind
            && g.device == Some(device)
            && (detail == 0 || g.detail == detail)
            && (modifiers == crate::input::grabs::ANY_MODIFIER || g.modifiers == modifiers))
    });
    Ok(None)
}

fn xi_select_events(
    ctx: &mut ServerContext,
    client: ClientId,
    window: WindowId,
    masks: &[Xi2MaskEntry],
) {
    let Some(c) = ctx.clients.get_mut(&client) else {
        return;
    };
    for entry in masks {
        if entry.mask == 0 {
            c.xi2_masks.remove(&(window, entry.device));
        } else {
            c.xi2_masks.insert((window, entry.device), entry.mask);
        }
    }
}

/// Translate XI2 device-event mask bits into XI1 class-list form so one grab
/// representation drives delivery for both versions
fn xi2_mask_to_classes(mask: u32, device: u8) -> Vec<u32> {
    use crate::extensions::xinput::{class_mask, xi2_event};
    let mut classes = Vec::new();
    let pairs = [
        (xi2_event::KEY_PRESS, class_mask::DEVICE_KEY_PRESS),
        (xi2_event::KEY_RELEASE, class_mask::DEVICE_KEY_RELEASE),
        (xi2_event::BUTTON_PRESS, class_mask::DEVICE_BUTTON_PRESS),
        (xi2_event::BUTTON_RELEASE, class_mask::DEVICE_BUTTON_RELEASE),
        (xi2_event::MOTION, class_mask::DEVICE_MOTION),
    ];
    for (evtype, class) in pairs {
        if mask & (1 << evtype) != 0 {
            classes.push((class << 8) | device as u32);
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{ROOT_WINDOW, id_base};
    use crate::extensions::xinput::class_mask;
    use crate::protocol::wire::WireOrder;
    use crate::resources::window::Window;
    use crate::server::context::tests::{add_client, test_context};

    #[test]
    fn test_xi_query_version_is_2_2() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = dispatch(&mut ctx, 1, XiRequest::XiQueryVersion { major: 2, minor: 4 })
            .unwrap()
            .unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 2);
        assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), 2);
    }

    #[test]
    fn test_open_device_validates_id() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        assert!(dispatch(&mut ctx, 1, XiRequest::OpenDevice { device: 2 }).is_ok());
        assert!(ctx.clients[&1].open_devices.contains(&2));
        let err = dispatch(&mut ctx, 1, XiRequest::OpenDevice { device: 9 }).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Value);
    }

    #[test]
    fn test_select_extension_event_requires_open_device() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        ctx.resources.insert_window(Window::new(w, 1, ROOT_WINDOW));
        let class = (class_mask::DEVICE_BUTTON_PRESS << 8) | 2;
        let err = dispatch(
            &mut ctx,
            1,
            XiRequest::SelectExtensionEvent {
                window: w,
                classes: vec![class],
            },
        )
        .unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Value);

        dispatch(&mut ctx, 1, XiRequest::OpenDevice { device: 2 }).unwrap();
        dispatch(
            &mut ctx,
            1,
            XiRequest::SelectExtensionEvent {
                window: w,
                classes: vec![class],
            },
        )
        .unwrap();
        assert_eq!(ctx.clients[&1].xi1_selections[&w], vec![class]);
    }

    #[test]
    fn test_xi_select_events_stores_and_clears_masks() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        dispatch(
            &mut ctx,
            1,
            XiRequest::XiSelectEvents {
                window: ROOT_WINDOW,
                masks: vec![Xi2MaskEntry {
                    device: XI_ALL_MASTER_DEVICES,
                    mask: 0x0002_0000,
                }],
            },
        )
        .unwrap();
        assert_eq!(
            ctx.clients[&1].xi2_mask_for(ROOT_WINDOW, 2),
            0x0002_0000
        );
        dispatch(
            &mut ctx,
            1,
            XiRequest::XiSelectEvents {
                window: ROOT_WINDOW,
                masks: vec![Xi2MaskEntry {
                    device: XI_ALL_MASTER_DEVICES,
                    mask: 0,
                }],
            },
        )
        .unwrap();
        assert_eq!(ctx.clients[&1].xi2_mask_for(ROOT_WINDOW, 2), 0);
    }

    #[test]
    fn test_grab_device_conflict() {
        let mut ctx = test_context();
        let _rx1 = add_client(&mut ctx, 1);
        let _rx2 = add_client(&mut ctx, 2);
        let w = id_base(1) | 1;
        ctx.resources.insert_window(Window::new(w, 1, ROOT_WINDOW));
        let ok = dispatch(
            &mut ctx,
            1,
            XiRequest::GrabDevice {
                window: w,
                time: 0,
                this_device_mode: 0,
                other_device_mode: 0,
                owner_events: false,
                device: 2,
                classes: vec![],
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(ok.encode(1, WireOrder::Lsb)[8], grab_status::SUCCESS);
        let refused = dispatch(
            &mut ctx,
            2,
            XiRequest::GrabDevice {
                window: w,
                time: 0,
                this_device_mode: 0,
                other_device_mode: 0,
                owner_events: false,
                device: 2,
                classes: vec![],
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(refused.encode(1, WireOrder::Lsb)[8], grab_status::ALREADY_GRABBED);
    }
}
