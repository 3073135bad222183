//! Window tree requests

use tracing::debug;

use crate::core::errors::X11Error;
use crate::core::ids::{ClientId, ROOT_WINDOW, WindowId};
use crate::input::router::expose_window;
use crate::protocol::events::Event;
use crate::protocol::replies::Reply;
use crate::protocol::requests::{ConfigValues, WindowAttrValues};
use crate::resources::registry::DrawableInfo;
use crate::resources::window::{MapState, Window};
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

#[allow(clippy::too_many_arguments)]
pub fn create_window(
    ctx: &mut ServerContext,
    client: ClientId,
    depth: u8,
    wid: WindowId,
    parent: WindowId,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    border_width: u16,
    class: u16,
    visual: u32,
    values: &WindowAttrValues,
) -> Outcome {
    ctx.resources.check_new_id(wid, client)?;
    let parent_depth = ctx.resources.window(parent)?.depth;
    if width == 0 || height == 0 {
        return Err(X11Error::value(0));
    }
    let depth = if depth == 0 { parent_depth } else { depth };
    if class > 2 {
        return Err(X11Error::value(class as u32));
    }
    if depth != 24 && class != 2 {
        return Err(X11Error::match_error());
    }

    let mut win = Window::new(wid, client, parent);
    win.x = x;
    win.y = y;
    win.width = width;
    win.height = height;
    win.border_width = border_width;
    win.depth = depth;
    win.class = if class == 0 { 1 } else { class };
    win.visual = if visual == 0 {
        crate::core::ids::ROOT_VISUAL
    } else {
        visual
    };
    win.apply_attributes(values, client);
    let cursor = win.attributes.cursor;
    ctx.resources.insert_window(win);
    ctx.resources.add_child(parent, wid);

    ctx.frontend.create_window(wid, parent, x, y, width, height);
    if values.background_pixel.is_some() {
        ctx.frontend
            .change_window_attributes(wid, values.background_pixel);
    }
    if cursor != 0 {
        ctx.frontend.set_window_cursor(wid, cursor);
    }

    let or = values.override_redirect.unwrap_or(false);
    let parent_selects = ctx
        .resources
        .window(parent)
        .map(|p| p.selects(crate::protocol::events::EventMask::SUBSTRUCTURE_NOTIFY))
        .unwrap_or(false);
    if parent_selects {
        if let Some(target) = ctx.window_event_target(parent) {
            ctx.send_event(
                target,
                &Event::CreateNotify {
                    parent,
                    window: wid,
                    x,
                    y,
                    width,
                    height,
                    border_width,
                    override_redirect: or,
                },
            );
        }
    }
    debug!(window = format_args!("{wid:#x}"), parent = format_args!("{parent:#x}"), "created window");
    Ok(None)
}

pub fn change_window_attributes(
    ctx: &mut ServerContext,
    client: ClientId,
    window: WindowId,
    values: &WindowAttrValues,
) -> Outcome {
    let win = ctx.resources.window_mut(window)?;
    win.apply_attributes(values, client);
    ctx.frontend
        .change_window_attributes(window, values.background_pixel);
    if let Some(cursor) = values.cursor {
        ctx.frontend.set_window_cursor(window, cursor);
    }
    Ok(None)
}

pub fn get_window_attributes(ctx: &ServerContext, client: ClientId, window: WindowId) -> Outcome {
    let win = ctx.resources.window(window)?;
    let order = ctx.clients[&client].order;
    let attrs = &win.attributes;
    let reply = Reply::build(attrs.backing_store, order, |w| {
        w.u32(win.visual);
        w.u16(win.class);
        w.u8(attrs.bit_gravity).u8(attrs.win_gravity);
        w.u32(attrs.backing_planes).u32(attrs.backing_pixel);
        w.u8(attrs.save_under as u8);
        w.u8(1); // map is installed
        w.u8(win.map_state as u8);
        w.u8(attrs.override_redirect as u8);
        w.u32(attrs.colormap);
        w.u32(attrs.event_mask.bits());
        w.u32(attrs.event_mask.bits());
        w.u16(attrs.do_not_propagate_mask.bits() as u16);
        w.u16(0);
    });
    Ok(Some(reply))
}

pub fn destroy_window(ctx: &mut ServerContext, window: WindowId) -> Outcome {
    ctx.resources.window(window)?;
    if window != ROOT_WINDOW {
        ctx.destroy_window_tree(window);
    }
    Ok(None)
}

pub fn destroy_subwindows(ctx: &mut ServerContext, window: WindowId) -> Outcome {
    ctx.resources.window(window)?;
    ctx.destroy_subwindows(window);
    ctx.frontend.destroy_subwindows(window);
    Ok(None)
}

pub fn change_save_set(
    ctx: &mut ServerContext,
    client: ClientId,
    mode: u8,
    window: WindowId,
) -> Outcome {
    let win = ctx.resources.window(window)?;
    if win.owner == client {
        // save-set entries track other clients' windows
        return Err(X11Error::match_error());
    }
    let set = &mut ctx
        .clients
        .get_mut(&client)
        .ok_or_else(X11Error::implementation)?
        .save_set;
    match mode {
        0 => {
            set.insert(window);
        }
        1 => {
            set.remove(&window);
        }
        _ => return Err(X11Error::value(mode as u32)),
    }
    Ok(None)
}

pub fn reparent_window(
    ctx: &mut ServerContext,
    window: WindowId,
    parent: WindowId,
    x: i16,
    y: i16,
) -> Outcome {
    ctx.resources.window(window)?;
    ctx.resources.window(parent)?;
    if window == ROOT_WINDOW
        || window == parent
        || ctx.resources.is_ancestor_or_self(window, parent)
    {
        return Err(X11Error::match_error());
    }
    let old_parent = ctx.resources.window(window)?.parent;

    ctx.resources.unlink_child(window);
    {
        let win = ctx.resources.window_mut(window)?;
        win.parent = parent;
        win.x = x;
        win.y = y;
    }
    ctx.resources.add_child(parent, window);
    ctx.resources.refresh_map_state(window);
    ctx.frontend.reparent_window(window, parent, x, y);

    let or = ctx
        .resources
        .window(window)
        .map(|w| w.attributes.override_redirect)
        .unwrap_or(false);
    // the window, the old parent, and the new parent may each be interested
    ctx.deliver_structure(window, |event| Event::ReparentNotify {
        event,
        window,
        parent,
        x,
        y,
        override_redirect: or,
    });
    if old_parent != parent {
        let selects = ctx
            .resources
            .window(old_parent)
            .map(|p| p.selects(crate::protocol::events::EventMask::SUBSTRUCTURE_NOTIFY))
            .unwrap_or(false);
        if selects {
            if let Some(target) = ctx.window_event_target(old_parent) {
                ctx.send_event(
                    target,
                    &Event::ReparentNotify {
                        event: old_parent,
                        window,
                        parent,
                        x,
                        y,
                        override_redirect: or,
                    },
                );
            }
        }
    }
    Ok(None)
}

pub fn map_window(ctx: &mut ServerContext, window: WindowId) -> Outcome {
    ctx.resources.window(window)?;
    map_one(ctx, window);
    Ok(None)
}

pub fn map_subwindows(ctx: &mut ServerContext, window: WindowId) -> Outcome {
    let children = ctx.resources.window(window)?.children.clone();
    for child in children {
        map_one(ctx, child);
    }
    Ok(None)
}

fn map_one(ctx: &mut ServerContext, window: WindowId) {
    let already = match ctx.resources.window_mut(window) {
        Ok(w) => {
            let already = w.mapped;
            w.mapped = true;
            already
        }
        Err(_) => return,
    };
    if already {
        return;
    }
    ctx.resources.refresh_map_state(window);
    ctx.frontend.map_window(window);
    let or = ctx
        .resources
        .window(window)
        .map(|w| w.attributes.override_redirect)
        .unwrap_or(false);
    ctx.deliver_structure(window, |event| Event::MapNotify {
        event,
        window,
        override_redirect: or,
    });
    let viewable = ctx
        .resources
        .window(window)
        .map(|w| w.map_state == MapState::Viewable)
        .unwrap_or(false);
    if viewable {
        expose_window(ctx, window);
    }
}

pub fn unmap_window(ctx: &mut ServerContext, window: WindowId) -> Outcome {
    ctx.resources.window(window)?;
    unmap_one(ctx, window);
    Ok(None)
}

pub fn unmap_subwindows(ctx: &mut ServerContext, window: WindowId) -> Outcome {
    let children = ctx.resources.window(window)?.children.clone();
    for child in children {
        unmap_one(ctx, child);
    }
    Ok(None)
}

fn unmap_one(ctx: &mut ServerContext, window: WindowId) {
    let was_mapped = match ctx.resources.window_mut(window) {
        Ok(w) => {
            let was = w.mapped;
            w.mapped = false;
            was
        }
        Err(_) => return,
    };
    if !was_mapped {
        return;
    }
    ctx.resources.refresh_map_state(window);
    ctx.frontend.unmap_window(window);
    ctx.deliver_structure(window, |event| Event::UnmapNotify {
        event,
        window,
        from_configure: false,
    });
}

pub fn configure_window(
    ctx: &mut ServerContext,
    window: WindowId,
    values: &ConfigValues,
) -> Outcome {
    ctx.resources.window(window)?;
    if window == ROOT_WINDOW {
        return Err(X11Error::match_error());
    }
    if let Some(sibling) = values.sibling {
        if values.stack_mode.is_none() {
            return Err(X11Error::match_error());
        }
        ctx.resources.window(sibling)?;
    }

    let (old_width, old_height) = {
        let win = ctx.resources.window(window)?;
        (win.width, win.height)
    };
    let (x, y, width, height, border_width, parent) = {
        let win = ctx.resources.window_mut(window)?;
        if let Some(v) = values.x {
            win.x = v;
        }
        if let Some(v) = values.y {
            win.y = v;
        }
        if let Some(v) = values.width {
            if v == 0 {
                return Err(X11Error::value(0));
            }
            win.width = v;
        }
        if let Some(v) = values.height {
            if v == 0 {
                return Err(X11Error::value(0));
            }
            win.height = v;
        }
        if let Some(v) = values.border_width {
            win.border_width = v;
        }
        (win.x, win.y, win.width, win.height, win.border_width, win.parent)
    };

    if let Some(stack_mode) = values.stack_mode {
        restack(ctx, parent, window, values.sibling, stack_mode);
    }

    ctx.frontend.configure_window(window, x, y, width, height);
    let above = ctx
        .resources
        .window(parent)
        .ok()
        .and_then(|p| {
            let idx = p.children.iter().position(|&c| c == window)?;
            idx.checked_sub(1).map(|i| p.children[i])
        })
        .unwrap_or(0);
    let or = ctx
        .resources
        .window(window)
        .map(|w| w.attributes.override_redirect)
        .unwrap_or(false);
    ctx.deliver_structure(window, |event| Event::ConfigureNotify {
        event,
        window,
        above_sibling: above,
        x,
        y,
        width,
        height,
        border_width,
        override_redirect: or,
    });
    if width > old_width || height > old_height {
        expose_window(ctx, window);
    }
    Ok(None)
}

fn restack(
    ctx: &mut ServerContext,
    parent: WindowId,
    window: WindowId,
    sibling: Option<WindowId>,
    stack_mode: u8,
) {
    let Ok(pwin) = ctx.resources.window_mut(parent) else {
        return;
    };
    pwin.children.retain(|&c| c != window);
    let position = match (stack_mode, sibling) {
        // Above / TopIf / Opposite land on top
        (0 | 2 | 4, None) => pwin.children.len(),
        (1 | 3, None) => 0,
        (0 | 2 | 4, Some(s)) => pwin
            .children
            .iter()
            .position(|&c| c == s)
            .map(|i| i + 1)
            .unwrap_or(pwin.children.len()),
        (1 | 3, Some(s)) => pwin.children.iter().position(|&c| c == s).unwrap_or(0),
        _ => pwin.children.len(),
    };
    pwin.children.insert(position, window);
}

pub fn circulate_window(ctx: &mut ServerContext, direction: u8, window: WindowId) -> Outcome {
    let children = ctx.resources.window(window)?.children.clone();
    if children.is_empty() {
        return Ok(None);
    }
    let (moved, place) = match direction {
        // RaiseLowest: bottom child goes on top
        0 => {
            let moved = children[0];
            let pwin = ctx.resources.window_mut(window)?;
            pwin.children.remove(0);
            pwin.children.push(moved);
            (moved, 0u8)
        }
        // LowerHighest: top child goes to the bottom
        1 => {
            let moved = *children.last().unwrap();
            let pwin = ctx.resources.window_mut(window)?;
            pwin.children.pop();
            pwin.children.insert(0, moved);
            (moved, 1u8)
        }
        _ => return Err(X11Error::value(direction as u32)),
    };
    ctx.frontend.circulate_window(moved, direction == 0);
    let selects = ctx
        .resources
        .window(window)
        .map(|w| w.selects(crate::protocol::events::EventMask::SUBSTRUCTURE_NOTIFY))
        .unwrap_or(false);
    if selects {
        if let Some(target) = ctx.window_event_target(window) {
            ctx.send_event(
                target,
                &Event::CirculateNotify {
                    event: window,
                    window: moved,
                    place,
                },
            );
        }
    }
    Ok(None)
}

pub fn get_geometry(ctx: &ServerContext, client: ClientId, drawable: u32) -> Outcome {
    let info = ctx.resources.drawable(drawable)?;
    let order = ctx.clients[&client].order;
    let reply = match info {
        DrawableInfo::Window { id, width, height, depth } => {
            let win = ctx.resources.window(id)?;
            let (x, y, border) = (win.x, win.y, win.border_width);
            Reply::build(depth, order, |w| {
                w.u32(ROOT_WINDOW);
                w.i16(x).i16(y);
                w.u16(width).u16(height).u16(border);
            })
        }
        DrawableInfo::Pixmap { width, height, depth, .. } => Reply::build(depth, order, |w| {
            w.u32(ROOT_WINDOW);
            w.i16(0).i16(0);
            w.u16(width).u16(height).u16(0);
        }),
    };
    Ok(Some(reply))
}

pub fn query_tree(ctx: &ServerContext, client: ClientId, window: WindowId) -> Outcome {
    let win = ctx.resources.window(window)?;
    let order = ctx.clients[&client].order;
    let parent = win.parent;
    let children = win.children.clone();
    let reply = Reply::build(0, order, |w| {
        w.u32(ROOT_WINDOW);
        w.u32(parent);
        w.u16(children.len() as u16);
        w.zeros(14);
        for child in &children {
            w.u32(*child);
        }
    });
    Ok(Some(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::id_base;
    use crate::protocol::events::EventMask;
    use crate::server::context::tests::{add_client, test_context};

    fn create(ctx: &mut ServerContext, id: WindowId, parent: WindowId) {
        create_window(
            ctx,
            1,
            24,
            id,
            parent,
            0,
            0,
            100,
            100,
            0,
            1,
            0x1,
            &WindowAttrValues::default(),
        )
        .unwrap();
    }

    #[test]
    fn test_create_then_destroy_frees_the_id() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let id = id_base(1) | 1;
        create(&mut ctx, id, ROOT_WINDOW);
        assert!(ctx.resources.has_window(id));
        destroy_window(&mut ctx, id).unwrap();
        assert!(!ctx.resources.has_window(id));
        // the id is free for reuse
        assert!(ctx.resources.check_new_id(id, 1).is_ok());
    }

    #[test]
    fn test_create_under_missing_parent_is_window_error() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let err = create_window(
            &mut ctx,
            1,
            24,
            id_base(1) | 1,
            id_base(1) | 99,
            0,
            0,
            10,
            10,
            0,
            1,
            0x1,
            &WindowAttrValues::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Window);
    }

    #[test]
    fn test_map_emits_notify_and_expose() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let id = id_base(1) | 1;
        create(&mut ctx, id, ROOT_WINDOW);
        change_window_attributes(
            &mut ctx,
            1,
            id,
            &WindowAttrValues {
                event_mask: Some(
                    (EventMask::STRUCTURE_NOTIFY | EventMask::EXPOSURE).bits(),
                ),
                ..Default::default()
            },
        )
        .unwrap();

        map_window(&mut ctx, id).unwrap();
        let first = rx.try_recv().expect("MapNotify");
        assert_eq!(first[0], crate::protocol::opcodes::EV_MAP_NOTIFY);
        let second = rx.try_recv().expect("Expose");
        assert_eq!(second[0], crate::protocol::opcodes::EV_EXPOSE);
        // expose covers the whole window
        assert_eq!(u16::from_le_bytes([second[12], second[13]]), 100);
    }

    #[test]
    fn test_reparent_into_own_subtree_is_match_error() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let a = id_base(1) | 1;
        let b = id_base(1) | 2;
        create(&mut ctx, a, ROOT_WINDOW);
        create(&mut ctx, b, a);
        let err = reparent_window(&mut ctx, a, b, 0, 0).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Match);
    }

    #[test]
    fn test_configure_restacks_children() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let a = id_base(1) | 1;
        let b = id_base(1) | 2;
        create(&mut ctx, a, ROOT_WINDOW);
        create(&mut ctx, b, ROOT_WINDOW);
        // b was created last and sits on top; lower it
        configure_window(
            &mut ctx,
            b,
            &ConfigValues {
                stack_mode: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        let root = ctx.resources.window(ROOT_WINDOW).unwrap();
        assert_eq!(root.children, vec![b, a]);
    }

    #[test]
    fn test_circulate_rotates_stack() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let a = id_base(1) | 1;
        let b = id_base(1) | 2;
        create(&mut ctx, a, ROOT_WINDOW);
        create(&mut ctx, b, ROOT_WINDOW);
        circulate_window(&mut ctx, 0, ROOT_WINDOW).unwrap();
        let root = ctx.resources.window(ROOT_WINDOW).unwrap();
        assert_eq!(root.children, vec![b, a]);
    }

    #[test]
    fn test_query_tree_reports_children() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let a = id_base(1) | 1;
        create(&mut ctx, a, ROOT_WINDOW);
        let reply = query_tree(&ctx, 1, ROOT_WINDOW).unwrap().unwrap();
        let bytes = reply.encode(1, crate::protocol::wire::WireOrder::Lsb);
        let count = u16::from_le_bytes([bytes[16], bytes[17]]);
        assert_eq!(count, 1);
        assert_eq!(
            u32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]),
            a
        );
    }
}
