//! Font requests
//!
//! Fonts are opaque ids; metrics come from the frontend's font tables.

use crate::core::errors::X11Error;
use crate::core::ids::ClientId;
use crate::frontend::CharMetrics;
use crate::protocol::replies::Reply;
use crate::protocol::wire::WireWriter;
use crate::resources::Font;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

fn put_char_metrics(w: &mut WireWriter, m: &CharMetrics) {
    w.i16(m.left_bearing)
        .i16(m.right_bearing)
        .i16(m.width)
        .i16(m.ascent)
        .i16(m.descent)
        .u16(m.attributes);
}

pub fn open_font(ctx: &mut ServerContext, client: ClientId, fid: u32, name: &str) -> Outcome {
    ctx.resources.check_new_id(fid, client)?;
    if name.is_empty() {
        return Err(X11Error::name());
    }
    ctx.resources.insert_font(Font {
        id: fid,
        owner: client,
        name: name.to_string(),
    });
    ctx.frontend.open_font(fid, name);
    Ok(None)
}

pub fn close_font(ctx: &mut ServerContext, font: u32) -> Outcome {
    ctx.resources.font(font)?;
    ctx.resources.remove_font(font);
    ctx.frontend.close_font(font);
    Ok(None)
}

pub fn query_font(ctx: &ServerContext, client: ClientId, font: u32) -> Outcome {
    // a fontable is a font or a GC carrying one
    let font_id = if ctx.resources.font(font).is_ok() {
        font
    } else if let Ok(gc) = ctx.resources.gcontext(font) {
        gc.font
    } else {
        return Err(X11Error::font(font));
    };
    let metrics = ctx.frontend.query_font(font_id);
    let order = ctx.clients[&client].order;
    Ok(Some(Reply::build(0, order, |w| {
        put_char_metrics(w, &metrics.min_bounds);
        w.zeros(4);
        put_char_metrics(w, &metrics.max_bounds);
        w.zeros(4);
        w.u16(metrics.min_char_or_byte2);
        w.u16(metrics.max_char_or_byte2);
        w.u16(metrics.default_char);
        w.u16(0); // no font properties
        w.u8(metrics.draw_direction);
        w.u8(metrics.min_byte1);
        w.u8(metrics.max_byte1);
        w.u8(metrics.all_chars_exist as u8);
        w.i16(metrics.font_ascent);
        w.i16(metrics.font_descent);
        w.u32(0); // no per-char infos: min_bounds == max_bounds
    })))
}

pub fn query_text_extents(
    ctx: &ServerContext,
    client: ClientId,
    font: u32,
    text: &[u16],
) -> Outcome {
    let font_id = if ctx.resources.font(font).is_ok() {
        font
    } else if let Ok(gc) = ctx.resources.gcontext(font) {
        gc.font
    } else {
        return Err(X11Error::font(font));
    };
    let extents = ctx.frontend.query_text_extents(font_id, text);
    let order = ctx.clients[&client].order;
    Ok(Some(Reply::build(0, order, |w| {
        w.i16(extents.font_ascent);
        w.i16(extents.font_descent);
        w.i16(extents.overall_ascent);
        w.i16(extents.overall_descent);
        w.i32(extents.overall_width);
        w.i32(extents.overall_left);
        w.i32(extents.overall_right);
    })))
}

pub fn list_fonts(
    ctx: &ServerContext,
    client: ClientId,
    max_names: u16,
    pattern: &str,
) -> Outcome {
    let names = ctx.frontend.list_fonts(pattern, max_names);
    let order = ctx.clients[&client].order;
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(names.len() as u16);
        w.zeros(22);
        for name in &names {
            w.u8(name.len() as u8);
            for ch in name.chars() {
                w.u8(ch as u8);
            }
        }
        w.pad_to_4();
    })))
}

/// One reply per font plus a terminator; the extra replies are written
/// directly, the terminator is returned through the normal path
pub fn list_fonts_with_info(
    ctx: &mut ServerContext,
    client: ClientId,
    seq: u16,
    max_names: u16,
    pattern: &str,
) -> Outcome {
    let names = ctx.frontend.list_fonts(pattern, max_names);
    let order = ctx.clients[&client].order;
    let remaining = names.len();
    for (i, name) in names.iter().enumerate() {
        let metrics = ctx.frontend.query_font(0);
        let reply = Reply::build(name.len() as u8, order, |w| {
            put_char_metrics(w, &metrics.min_bounds);
            w.zeros(4);
            put_char_metrics(w, &metrics.max_bounds);
            w.zeros(4);
            w.u16(metrics.min_char_or_byte2);
            w.u16(metrics.max_char_or_byte2);
            w.u16(metrics.default_char);
            w.u16(0);
            w.u8(metrics.draw_direction);
            w.u8(metrics.min_byte1);
            w.u8(metrics.max_byte1);
            w.u8(metrics.all_chars_exist as u8);
            w.i16(metrics.font_ascent);
            w.i16(metrics.font_descent);
            w.u32((remaining - i - 1) as u32 + 1);
            w.string8_padded(name);
        });
        let frame = reply.encode(seq, order);
        ctx.send_frame(client, frame);
    }
    // terminating reply: name length zero
    Ok(Some(Reply::build(0, order, |w| {
        w.zeros(52);
    })))
}

pub fn set_font_path(ctx: &mut ServerContext, paths: &[String]) -> Outcome {
    ctx.font_path = paths.to_vec();
    Ok(None)
}

pub fn get_font_path(ctx: &ServerContext, client: ClientId) -> Outcome {
    let order = ctx.clients[&client].order;
    let paths = ctx.font_path.clone();
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(paths.len() as u16);
        w.zeros(22);
        for path in &paths {
            w.u8(path.len() as u8);
            for ch in path.chars() {
                w.u8(ch as u8);
            }
        }
        w.pad_to_4();
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::id_base;
    use crate::protocol::wire::WireOrder;
    use crate::server::context::tests::{add_client, test_context};

    #[test]
    fn test_open_query_close() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let fid = id_base(1) | 1;
        open_font(&mut ctx, 1, fid, "fixed").unwrap();
        let reply = query_font(&ctx, 1, fid).unwrap().unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        // font ascent sits after the bounds blocks and char range
        let ascent = i16::from_le_bytes([bytes[52], bytes[53]]);
        assert_eq!(ascent, 12);
        close_font(&mut ctx, fid).unwrap();
        assert!(ctx.resources.font(fid).is_err());
    }

    #[test]
    fn test_query_font_through_gc() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let fid = id_base(1) | 1;
        let gc = id_base(1) | 2;
        open_font(&mut ctx, 1, fid, "fixed").unwrap();
        crate::server::handlers::graphics::create_gc(
            &mut ctx,
            1,
            gc,
            crate::core::ids::ROOT_WINDOW,
            &crate::protocol::requests::GcValues {
                font: Some(fid),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(query_font(&ctx, 1, gc).is_ok());
    }

    #[test]
    fn test_list_fonts_reply_counts() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = list_fonts(&ctx, 1, 10, "*").unwrap().unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        let count = u16::from_le_bytes([bytes[8], bytes[9]]);
        assert_eq!(count, 2);
    }
}
