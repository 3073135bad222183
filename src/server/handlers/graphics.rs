//! Drawing relay
//!
//! Validates the drawable/GC tuple, keeps the persistent GC state current,
//! and forwards every graphics request to the frontend. The core holds no
//! pixel data; GetImage returns whatever buffer the frontend produces.

use crate::core::errors::X11Error;
use crate::core::ids::ClientId;
use crate::protocol::replies::Reply;
use crate::protocol::requests::{GcMask, GcValues};
use crate::protocol::{Arc, Point, Rectangle, Segment};
use crate::resources::Pixmap;
use crate::resources::gcontext::Gc;
use crate::resources::registry::DrawableInfo;
use crate::protocol::events::Event;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

/// Issue the post-paint redraw hint when the drawable is a window
fn compose(ctx: &ServerContext, drawable: u32) {
    if ctx.resources.has_window(drawable) {
        ctx.frontend.compose_window(drawable);
    }
}

pub fn create_pixmap(
    ctx: &mut ServerContext,
    client: ClientId,
    depth: u8,
    pid: u32,
    drawable: u32,
    width: u16,
    height: u16,
) -> Outcome {
    ctx.resources.check_new_id(pid, client)?;
    let base = ctx.resources.drawable(drawable)?;
    if depth != 1 && depth != base.depth() && depth != 24 {
        return Err(X11Error::value(depth as u32));
    }
    ctx.resources.insert_pixmap(Pixmap {
        id: pid,
        owner: client,
        width,
        height,
        depth,
    });
    ctx.frontend.create_pixmap(pid, width, height, depth);
    Ok(None)
}

pub fn free_pixmap(ctx: &mut ServerContext, pixmap: u32) -> Outcome {
    ctx.resources.pixmap(pixmap)?;
    ctx.resources.remove_pixmap(pixmap);
    ctx.frontend.free_pixmap(pixmap);
    Ok(None)
}

pub fn create_gc(
    ctx: &mut ServerContext,
    client: ClientId,
    cid: u32,
    drawable: u32,
    values: &GcValues,
) -> Outcome {
    ctx.resources.check_new_id(cid, client)?;
    ctx.resources.drawable(drawable)?;
    if let Some(font) = values.font {
        ctx.resources.font(font)?;
    }
    let mut gc = Gc::new(cid, client, drawable);
    gc.apply(values);
    ctx.resources.insert_gcontext(gc);
    ctx.frontend.create_gc(cid, drawable, values);
    Ok(None)
}

pub fn change_gc(ctx: &mut ServerContext, gc: u32, values: &GcValues) -> Outcome {
    if let Some(font) = values.font {
        ctx.resources.font(font)?;
    }
    ctx.resources.gcontext_mut(gc)?.apply(values);
    ctx.frontend.change_gc(gc, values);
    Ok(None)
}

pub fn copy_gc(ctx: &mut ServerContext, src_gc: u32, dst_gc: u32, mask: u32) -> Outcome {
    let mask = GcMask::from_bits(mask).ok_or_else(|| X11Error::value(mask))?;
    let src = ctx.resources.gcontext(src_gc)?.clone();
    let dst = ctx.resources.gcontext_mut(dst_gc)?;
    dst.copy_from(&src, mask);
    ctx.frontend.copy_gc(src_gc, dst_gc);
    Ok(None)
}

pub fn set_dashes(
    ctx: &mut ServerContext,
    gc: u32,
    dash_offset: u16,
    dashes: &[u8],
) -> Outcome {
    let record = ctx.resources.gcontext_mut(gc)?;
    record.dash_offset = dash_offset;
    if let Some(&first) = dashes.first() {
        record.dashes = first;
    }
    ctx.frontend.set_dashes(gc, dash_offset, dashes);
    Ok(None)
}

pub fn set_clip_rectangles(
    ctx: &mut ServerContext,
    gc: u32,
    clip_x: i16,
    clip_y: i16,
    rects: &[Rectangle],
) -> Outcome {
    let record = ctx.resources.gcontext_mut(gc)?;
    record.clip_x = clip_x;
    record.clip_y = clip_y;
    ctx.frontend.set_clip_rectangles(gc, clip_x, clip_y, rects);
    Ok(None)
}

pub fn free_gc(ctx: &mut ServerContext, gc: u32) -> Outcome {
    ctx.resources.gcontext(gc)?;
    ctx.resources.remove_gcontext(gc);
    ctx.frontend.free_gc(gc);
    Ok(None)
}

pub fn clear_area(
    ctx: &mut ServerContext,
    exposures: bool,
    window: u32,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
) -> Outcome {
    let win = ctx.resources.window(window)?;
    let (full_w, full_h) = (win.width, win.height);
    let w = if width == 0 { full_w } else { width };
    let h = if height == 0 { full_h } else { height };
    ctx.frontend.clear_area(window, x, y, w, h);
    compose(ctx, window);
    if exposures {
        let selected = win.selects(crate::protocol::events::EventMask::EXPOSURE);
        if selected {
            if let Some(target) = ctx.window_event_target(window) {
                ctx.send_event(
                    target,
                    &Event::Expose {
                        window,
                        x: x as u16,
                        y: y as u16,
                        width: w,
                        height: h,
                        count: 0,
                    },
                );
            }
        }
    }
    Ok(None)
}

/// GraphicsExposure bookkeeping for the copy requests: with no backing-store
/// tracking nothing is ever lost, so a GC that asks for exposures gets
/// NoExposure
fn copy_exposures(ctx: &mut ServerContext, client: ClientId, gc: u32, dst: u32, major: u8) {
    let wants = ctx
        .resources
        .gcontext(gc)
        .map(|g| g.graphics_exposures)
        .unwrap_or(false);
    if wants {
        ctx.send_event(
            client,
            &Event::NoExposure {
                drawable: dst,
                minor_opcode: 0,
                major_opcode: major,
            },
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub fn copy_area(
    ctx: &mut ServerContext,
    client: ClientId,
    src_drawable: u32,
    dst_drawable: u32,
    gc: u32,
    src_x: i16,
    src_y: i16,
    dst_x: i16,
    dst_y: i16,
    width: u16,
    height: u16,
) -> Outcome {
    ctx.resources.drawable(src_drawable)?;
    ctx.resources.drawable(dst_drawable)?;
    ctx.resources.gcontext(gc)?;
    ctx.frontend.copy_area(
        src_drawable,
        dst_drawable,
        gc,
        src_x,
        src_y,
        dst_x,
        dst_y,
        width,
        height,
    );
    compose(ctx, dst_drawable);
    copy_exposures(ctx, client, gc, dst_drawable, crate::protocol::opcodes::COPY_AREA);
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn copy_plane(
    ctx: &mut ServerContext,
    client: ClientId,
    src_drawable: u32,
    dst_drawable: u32,
    gc: u32,
    src_x: i16,
    src_y: i16,
    dst_x: i16,
    dst_y: i16,
    width: u16,
    height: u16,
    bit_plane: u32,
) -> Outcome {
    ctx.resources.drawable(src_drawable)?;
    ctx.resources.drawable(dst_drawable)?;
    ctx.resources.gcontext(gc)?;
    if bit_plane == 0 || bit_plane.count_ones() != 1 {
        return Err(X11Error::value(bit_plane));
    }
    ctx.frontend.copy_plane(
        src_drawable,
        dst_drawable,
        gc,
        src_x,
        src_y,
        dst_x,
        dst_y,
        width,
        height,
        bit_plane,
    );
    compose(ctx, dst_drawable);
    copy_exposures(ctx, client, gc, dst_drawable, crate::protocol::opcodes::COPY_PLANE);
    Ok(None)
}

fn validate_pair(ctx: &ServerContext, drawable: u32, gc: u32) -> crate::core::errors::HandlerResult<()> {
    ctx.resources.drawable(drawable)?;
    ctx.resources.gcontext(gc)?;
    Ok(())
}

pub fn poly_point(
    ctx: &mut ServerContext,
    coordinate_mode: u8,
    drawable: u32,
    gc: u32,
    points: &[Point],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend
        .poly_point(drawable, gc, coordinate_mode == 1, points);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_line(
    ctx: &mut ServerContext,
    coordinate_mode: u8,
    drawable: u32,
    gc: u32,
    points: &[Point],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend
        .poly_line(drawable, gc, coordinate_mode == 1, points);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_segment(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    segments: &[Segment],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.poly_segment(drawable, gc, segments);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_rectangle(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    rects: &[Rectangle],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.poly_rectangle(drawable, gc, rects);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_arc(ctx: &mut ServerContext, drawable: u32, gc: u32, arcs: &[Arc]) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.poly_arc(drawable, gc, arcs);
    compose(ctx, drawable);
    Ok(None)
}

pub fn fill_poly(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    shape: u8,
    coordinate_mode: u8,
    points: &[Point],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend
        .fill_poly(drawable, gc, shape, coordinate_mode == 1, points);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_fill_rectangle(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    rects: &[Rectangle],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.poly_fill_rectangle(drawable, gc, rects);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_fill_arc(ctx: &mut ServerContext, drawable: u32, gc: u32, arcs: &[Arc]) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.poly_fill_arc(drawable, gc, arcs);
    compose(ctx, drawable);
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn put_image(
    ctx: &mut ServerContext,
    format: u8,
    drawable: u32,
    gc: u32,
    width: u16,
    height: u16,
    dst_x: i16,
    dst_y: i16,
    left_pad: u8,
    depth: u8,
    data: &[u8],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    if format > 2 {
        return Err(X11Error::value(format as u32));
    }
    ctx.frontend.put_image(
        drawable, gc, width, height, dst_x, dst_y, left_pad, depth, format, data,
    );
    compose(ctx, drawable);
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn get_image(
    ctx: &mut ServerContext,
    client: ClientId,
    format: u8,
    drawable: u32,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    _plane_mask: u32,
) -> Outcome {
    let info = ctx.resources.drawable(drawable)?;
    if format != 1 && format != 2 {
        return Err(X11Error::value(format as u32));
    }
    let order = ctx.clients[&client].order;
    let depth = info.depth();
    let data = ctx.frontend.get_image(drawable, x, y, width, height, format);
    let visual = match info {
        DrawableInfo::Window { .. } => crate::core::ids::ROOT_VISUAL,
        DrawableInfo::Pixmap { .. } => 0,
    };
    Ok(Some(Reply::build(depth, order, |w| {
        w.u32(visual);
        w.zeros(20);
        w.bytes(&data);
        w.pad_to_4();
    })))
}

pub fn image_text8(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    x: i16,
    y: i16,
    text: &[u8],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.image_text8(drawable, gc, x, y, text);
    compose(ctx, drawable);
    Ok(None)
}

pub fn image_text16(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    x: i16,
    y: i16,
    text: &[u16],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.image_text16(drawable, gc, x, y, text);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_text8(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    x: i16,
    y: i16,
    items: &[u8],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.poly_text8(drawable, gc, x, y, items);
    compose(ctx, drawable);
    Ok(None)
}

pub fn poly_text16(
    ctx: &mut ServerContext,
    drawable: u32,
    gc: u32,
    x: i16,
    y: i16,
    items: &[u8],
) -> Outcome {
    validate_pair(ctx, drawable, gc)?;
    ctx.frontend.poly_text16(drawable, gc, x, y, items);
    compose(ctx, drawable);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{ROOT_WINDOW, id_base};
    use crate::server::context::tests::{add_client, test_context};

    #[test]
    fn test_create_gc_and_change_updates_state() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let gc = id_base(1) | 1;
        create_gc(
            &mut ctx,
            1,
            gc,
            ROOT_WINDOW,
            &GcValues {
                foreground: Some(0xFF0000),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(ctx.resources.gcontext(gc).unwrap().foreground, 0xFF0000);

        change_gc(
            &mut ctx,
            gc,
            &GcValues {
                line_width: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        let record = ctx.resources.gcontext(gc).unwrap();
        assert_eq!(record.line_width, 2);
        assert_eq!(record.foreground, 0xFF0000);
    }

    #[test]
    fn test_draw_with_bad_gc_is_gcontext_error() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let err = poly_point(&mut ctx, 0, ROOT_WINDOW, id_base(1) | 9, &[]).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::GContext);
    }

    #[test]
    fn test_copy_area_emits_no_exposure() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let gc = id_base(1) | 1;
        create_gc(&mut ctx, 1, gc, ROOT_WINDOW, &GcValues::default()).unwrap();
        copy_area(&mut ctx, 1, ROOT_WINDOW, ROOT_WINDOW, gc, 0, 0, 10, 10, 4, 4).unwrap();
        let frame = rx.try_recv().expect("NoExposure");
        assert_eq!(frame[0], crate::protocol::opcodes::EV_NO_EXPOSURE);
    }

    #[test]
    fn test_get_image_returns_frontend_buffer() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = get_image(&mut ctx, 1, 2, ROOT_WINDOW, 0, 0, 2, 2, !0)
            .unwrap()
            .unwrap();
        let bytes = reply.encode(1, crate::protocol::wire::WireOrder::Lsb);
        assert_eq!(bytes[1], 24); // depth
        assert_eq!(bytes.len(), 32 + 16); // 2x2 @ 32bpp
    }
}
