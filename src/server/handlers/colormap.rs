//! Colormap and color requests
//!
//! The single visual is static TrueColor: reads are pure pixel arithmetic,
//! writes are refused, and the dynamic-allocation requests fail with Alloc.

use crate::core::errors::X11Error;
use crate::core::ids::{ClientId, DEFAULT_COLORMAP, ROOT_VISUAL};
use crate::protocol::events::{Event, EventMask};
use crate::protocol::replies::Reply;
use crate::resources::colormap::Colormap;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

pub fn create_colormap(
    ctx: &mut ServerContext,
    client: ClientId,
    alloc: u8,
    mid: u32,
    window: u32,
    visual: u32,
) -> Outcome {
    ctx.resources.check_new_id(mid, client)?;
    ctx.resources.window(window)?;
    if visual != ROOT_VISUAL {
        return Err(X11Error::value(visual));
    }
    // AllocAll on a static visual cannot work
    if alloc == 1 {
        return Err(X11Error::match_error());
    }
    if alloc > 1 {
        return Err(X11Error::value(alloc as u32));
    }
    ctx.resources
        .insert_colormap(Colormap::new(mid, client, window, visual));
    Ok(None)
}

fn colormap_notify(ctx: &mut ServerContext, cmap: u32, new: bool, installed: bool) {
    // windows using this colormap hear about install state changes
    let interested: Vec<(u32, ClientId)> = ctx
        .clients
        .keys()
        .copied()
        .collect::<Vec<_>>()
        .into_iter()
        .filter_map(|client| {
            let window = ctx
                .resources
                .colormap(cmap)
                .ok()
                .map(|c| c.window)
                .unwrap_or(0);
            let selects = ctx
                .resources
                .window(window)
                .map(|w| w.selects(EventMask::COLORMAP_CHANGE))
                .unwrap_or(false);
            if selects && ctx.window_event_target(window) == Some(client) {
                Some((window, client))
            } else {
                None
            }
        })
        .collect();
    for (window, client) in interested {
        ctx.send_event(
            client,
            &Event::ColormapNotify {
                window,
                colormap: cmap,
                new,
                installed,
            },
        );
    }
}

pub fn free_colormap(ctx: &mut ServerContext, cmap: u32) -> Outcome {
    ctx.resources.colormap(cmap)?;
    if cmap != DEFAULT_COLORMAP {
        ctx.resources.remove_colormap(cmap);
    }
    Ok(None)
}

pub fn copy_colormap_and_free(
    ctx: &mut ServerContext,
    client: ClientId,
    mid: u32,
    src_cmap: u32,
) -> Outcome {
    ctx.resources.check_new_id(mid, client)?;
    let src = ctx.resources.colormap(src_cmap)?.clone();
    let mut copy = Colormap::new(mid, client, src.window, src.visual);
    copy.cells = src.cells.clone();
    ctx.resources.insert_colormap(copy);
    if src_cmap != DEFAULT_COLORMAP {
        ctx.resources.remove_colormap(src_cmap);
    }
    Ok(None)
}

pub fn install_colormap(ctx: &mut ServerContext, cmap: u32) -> Outcome {
    ctx.resources.colormap_mut(cmap)?.installed = true;
    colormap_notify(ctx, cmap, false, true);
    Ok(None)
}

pub fn uninstall_colormap(ctx: &mut ServerContext, cmap: u32) -> Outcome {
    if cmap == DEFAULT_COLORMAP {
        // the default map stays installed
        ctx.resources.colormap(cmap)?;
        return Ok(None);
    }
    ctx.resources.colormap_mut(cmap)?.installed = false;
    colormap_notify(ctx, cmap, false, false);
    Ok(None)
}

pub fn list_installed_colormaps(ctx: &ServerContext, client: ClientId, window: u32) -> Outcome {
    ctx.resources.window(window)?;
    let order = ctx.clients[&client].order;
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(1);
        w.zeros(22);
        w.u32(DEFAULT_COLORMAP);
    })))
}

pub fn alloc_color(
    ctx: &mut ServerContext,
    client: ClientId,
    cmap: u32,
    red: u16,
    green: u16,
    blue: u16,
) -> Outcome {
    let order = ctx.clients[&client].order;
    let pixel = ctx.resources.colormap_mut(cmap)?.alloc(red, green, blue, client);
    // the closest TrueColor value is the truncated 8-bit channel
    let (r, g, b) = Colormap::pixel_rgb(pixel);
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(r).u16(g).u16(b);
        w.u16(0);
        w.u32(pixel);
    })))
}

pub fn alloc_named_color(
    ctx: &mut ServerContext,
    client: ClientId,
    cmap: u32,
    name: &str,
) -> Outcome {
    let order = ctx.clients[&client].order;
    ctx.resources.colormap(cmap)?;
    let (red, green, blue) = ctx.frontend.lookup_color(name).ok_or_else(X11Error::name)?;
    let pixel = ctx.resources.colormap_mut(cmap)?.alloc(red, green, blue, client);
    let (vr, vg, vb) = Colormap::pixel_rgb(pixel);
    Ok(Some(Reply::build(0, order, |w| {
        w.u32(pixel);
        w.u16(red).u16(green).u16(blue);
        w.u16(vr).u16(vg).u16(vb);
    })))
}

pub fn alloc_color_cells(ctx: &ServerContext, cmap: u32) -> Outcome {
    ctx.resources.colormap(cmap)?;
    // read-only visual: no writable cells exist
    Err(X11Error::alloc())
}

pub fn alloc_color_planes(ctx: &ServerContext, cmap: u32) -> Outcome {
    ctx.resources.colormap(cmap)?;
    Err(X11Error::alloc())
}

pub fn free_colors(ctx: &mut ServerContext, cmap: u32, pixels: &[u32]) -> Outcome {
    let map = ctx.resources.colormap_mut(cmap)?;
    for pixel in pixels {
        map.cells.remove(pixel);
    }
    Ok(None)
}

pub fn store_colors(ctx: &ServerContext, cmap: u32) -> Outcome {
    ctx.resources.colormap(cmap)?;
    // TrueColor cells are immutable
    Err(X11Error::access())
}

pub fn query_colors(ctx: &ServerContext, client: ClientId, cmap: u32, pixels: &[u32]) -> Outcome {
    let map = ctx.resources.colormap(cmap)?;
    let order = ctx.clients[&client].order;
    let colors: Vec<(u16, u16, u16)> = pixels.iter().map(|&p| map.resolve(p)).collect();
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(colors.len() as u16);
        w.zeros(22);
        for (r, g, b) in &colors {
            w.u16(*r).u16(*g).u16(*b);
            w.u16(0);
        }
    })))
}

pub fn lookup_color(ctx: &ServerContext, client: ClientId, cmap: u32, name: &str) -> Outcome {
    ctx.resources.colormap(cmap)?;
    let order = ctx.clients[&client].order;
    let (red, green, blue) = ctx.frontend.lookup_color(name).ok_or_else(X11Error::name)?;
    let pixel = Colormap::truecolor_pixel(red, green, blue);
    let (vr, vg, vb) = Colormap::pixel_rgb(pixel);
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(red).u16(green).u16(blue);
        w.u16(vr).u16(vg).u16(vb);
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::id_base;
    use crate::protocol::wire::WireOrder;
    use crate::server::context::tests::{add_client, test_context};

    #[test]
    fn test_alloc_color_truecolor_pixel() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = alloc_color(&mut ctx, 1, DEFAULT_COLORMAP, 0xFFFF, 0, 0)
            .unwrap()
            .unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        let pixel = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        assert_eq!(pixel, 0xFF0000);
    }

    #[test]
    fn test_named_color_unknown_is_name_error() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let err = alloc_named_color(&mut ctx, 1, DEFAULT_COLORMAP, "no-such-color").unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Name);
    }

    #[test]
    fn test_dynamic_allocation_is_refused() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        assert_eq!(
            alloc_color_cells(&ctx, DEFAULT_COLORMAP).unwrap_err().code,
            crate::core::errors::ErrorCode::Alloc
        );
        assert_eq!(
            store_colors(&ctx, DEFAULT_COLORMAP).unwrap_err().code,
            crate::core::errors::ErrorCode::Access
        );
    }

    #[test]
    fn test_create_colormap_alloc_all_is_match() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let err = create_colormap(
            &mut ctx,
            1,
            1,
            id_base(1) | 1,
            crate::core::ids::ROOT_WINDOW,
            ROOT_VISUAL,
        )
        .unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Match);
    }
}
