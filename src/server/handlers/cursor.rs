//! Cursor requests

use crate::core::errors::X11Error;
use crate::core::ids::ClientId;
use crate::protocol::replies::Reply;
use crate::resources::Cursor;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

#[allow(clippy::too_many_arguments)]
pub fn create_cursor(
    ctx: &mut ServerContext,
    client: ClientId,
    cid: u32,
    source: u32,
    mask: u32,
    fore: (u16, u16, u16),
    back: (u16, u16, u16),
    x: u16,
    y: u16,
) -> Outcome {
    ctx.resources.check_new_id(cid, client)?;
    let src = ctx.resources.pixmap(source)?;
    if src.depth != 1 {
        return Err(X11Error::match_error());
    }
    if mask != 0 {
        let m = ctx.resources.pixmap(mask)?;
        if m.depth != 1 {
            return Err(X11Error::match_error());
        }
    }
    ctx.resources.insert_cursor(Cursor { id: cid, owner: client });
    ctx.frontend.create_cursor(cid, source, mask, x, y);
    ctx.frontend.recolor_cursor(cid, fore, back);
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn create_glyph_cursor(
    ctx: &mut ServerContext,
    client: ClientId,
    cid: u32,
    source_font: u32,
    mask_font: u32,
    source_char: u16,
    fore: (u16, u16, u16),
    back: (u16, u16, u16),
) -> Outcome {
    ctx.resources.check_new_id(cid, client)?;
    ctx.resources.font(source_font)?;
    if mask_font != 0 {
        ctx.resources.font(mask_font)?;
    }
    ctx.resources.insert_cursor(Cursor { id: cid, owner: client });
    ctx.frontend
        .create_cursor_from_glyph(cid, source_font, source_char);
    ctx.frontend.recolor_cursor(cid, fore, back);
    Ok(None)
}

pub fn free_cursor(ctx: &mut ServerContext, cursor: u32) -> Outcome {
    ctx.resources.cursor(cursor)?;
    ctx.resources.remove_cursor(cursor);
    ctx.frontend.free_cursor(cursor);
    Ok(None)
}

pub fn recolor_cursor(
    ctx: &mut ServerContext,
    cursor: u32,
    fore: (u16, u16, u16),
    back: (u16, u16, u16),
) -> Outcome {
    ctx.resources.cursor(cursor)?;
    ctx.frontend.recolor_cursor(cursor, fore, back);
    Ok(None)
}

pub fn query_best_size(
    ctx: &ServerContext,
    client: ClientId,
    class: u8,
    drawable: u32,
    width: u16,
    height: u16,
) -> Outcome {
    if class > 2 {
        return Err(X11Error::value(class as u32));
    }
    ctx.resources.drawable(drawable)?;
    let order = ctx.clients[&client].order;
    // every size renders equally well on a canvas
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(width).u16(height);
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{ROOT_WINDOW, id_base};
    use crate::resources::Pixmap;
    use crate::server::context::tests::{add_client, test_context};

    #[test]
    fn test_cursor_requires_depth_one_source() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let pix = id_base(1) | 1;
        ctx.resources.insert_pixmap(Pixmap {
            id: pix,
            owner: 1,
            width: 16,
            height: 16,
            depth: 24,
        });
        let err = create_cursor(
            &mut ctx,
            1,
            id_base(1) | 2,
            pix,
            0,
            (0, 0, 0),
            (0xFFFF, 0xFFFF, 0xFFFF),
            0,
            0,
        )
        .unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Match);
    }

    #[test]
    fn test_glyph_cursor_lifecycle() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let font = id_base(1) | 1;
        let cur = id_base(1) | 2;
        crate::server::handlers::font::open_font(&mut ctx, 1, font, "cursor").unwrap();
        create_glyph_cursor(
            &mut ctx,
            1,
            cur,
            font,
            font,
            68,
            (0, 0, 0),
            (0xFFFF, 0xFFFF, 0xFFFF),
        )
        .unwrap();
        assert!(ctx.resources.cursor(cur).is_ok());
        free_cursor(&mut ctx, cur).unwrap();
        assert!(ctx.resources.cursor(cur).is_err());
    }

    #[test]
    fn test_query_best_size_echoes() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = query_best_size(&ctx, 1, 0, ROOT_WINDOW, 64, 48).unwrap().unwrap();
        let bytes = reply.encode(1, crate::protocol::wire::WireOrder::Lsb);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 64);
        assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), 48);
    }
}
