//! Request dispatch
//!
//! Assigns the sequence number, decodes the request, routes it to its
//! handler, and writes the reply or error frame. Protocol errors never close
//! the connection; only the framing layer does that.

use bytes::Bytes;
use tracing::trace;

use crate::core::errors::X11Error;
use crate::core::ids::ClientId;
use crate::protocol::replies::encode_error;
use crate::protocol::requests::Request;
use crate::server::context::ServerContext;
use crate::server::handlers;
use crate::server::handlers::Outcome;

/// Process one framed request end to end
pub fn process_request(ctx: &mut ServerContext, client: ClientId, major: u8, data: u8, body: &Bytes) {
    let Some(c) = ctx.clients.get_mut(&client) else {
        return;
    };
    let order = c.order;
    let seq = c.next_sequence();
    // events generated while this request executes carry its sequence
    c.last_sequence = seq;
    ctx.tick();

    let minor = if major > 127 { data as u16 } else { 0 };
    let outcome = match Request::decode(major, data, body, order) {
        Ok(request) => {
            trace!(client, major, seq, "dispatching {request:?}");
            dispatch(ctx, client, seq, request)
        }
        Err(err) => Err(err),
    };
    match outcome {
        Ok(Some(reply)) => ctx.send_frame(client, reply.encode(seq, order)),
        Ok(None) => {}
        Err(err) => {
            trace!(client, major, seq, ?err, "request failed");
            ctx.send_frame(client, encode_error(&err, seq, major, minor, order));
        }
    }
}

/// Route a decoded request to its handler
fn dispatch(ctx: &mut ServerContext, client: ClientId, seq: u16, request: Request) -> Outcome {
    use handlers::*;
    match request {
        Request::CreateWindow {
            depth,
            wid,
            parent,
            x,
            y,
            width,
            height,
            border_width,
            class,
            visual,
            values,
        } => window::create_window(
            ctx,
            client,
            depth,
            wid,
            parent,
            x,
            y,
            width,
            height,
            border_width,
            class,
            visual,
            &values,
        ),
        Request::ChangeWindowAttributes { window, values } => {
            window::change_window_attributes(ctx, client, window, &values)
        }
        Request::GetWindowAttributes { window } => {
            window::get_window_attributes(ctx, client, window)
        }
        Request::DestroyWindow { window } => window::destroy_window(ctx, window),
        Request::DestroySubwindows { window } => window::destroy_subwindows(ctx, window),
        Request::ChangeSaveSet { mode, window } => {
            window::change_save_set(ctx, client, mode, window)
        }
        Request::ReparentWindow {
            window,
            parent,
            x,
            y,
        } => window::reparent_window(ctx, window, parent, x, y),
        Request::MapWindow { window } => window::map_window(ctx, window),
        Request::MapSubwindows { window } => window::map_subwindows(ctx, window),
        Request::UnmapWindow { window } => window::unmap_window(ctx, window),
        Request::UnmapSubwindows { window } => window::unmap_subwindows(ctx, window),
        Request::ConfigureWindow { window, values } => {
            window::configure_window(ctx, window, &values)
        }
        Request::CirculateWindow { direction, window } => {
            window::circulate_window(ctx, direction, window)
        }
        Request::GetGeometry { drawable } => window::get_geometry(ctx, client, drawable),
        Request::QueryTree { window } => window::query_tree(ctx, client, window),
        Request::InternAtom {
            only_if_exists,
            name,
        } => atom::intern_atom(ctx, client, only_if_exists, &name),
        Request::GetAtomName { atom } => atom::get_atom_name(ctx, client, atom),
        Request::ChangeProperty {
            mode,
            window,
            property: prop,
            property_type,
            format,
            data,
        } => property::change_property(ctx, mode, window, prop, property_type, format, &data),
        Request::DeleteProperty { window, property: prop } => {
            property::delete_property(ctx, window, prop)
        }
        Request::GetProperty {
            delete,
            window,
            property: prop,
            property_type,
            long_offset,
            long_length,
        } => property::get_property(
            ctx,
            client,
            delete,
            window,
            prop,
            property_type,
            long_offset,
            long_length,
        ),
        Request::ListProperties { window } => property::list_properties(ctx, client, window),
        Request::RotateProperties {
            window,
            delta,
            properties,
        } => property::rotate_properties(ctx, window, delta, &properties),
        Request::SetSelectionOwner {
            owner,
            selection,
            time,
        } => property::set_selection_owner(ctx, client, owner, selection, time),
        Request::GetSelectionOwner { selection } => {
            property::get_selection_owner(ctx, client, selection)
        }
        Request::ConvertSelection {
            requestor,
            selection,
            target,
            property: prop,
            time,
        } => property::convert_selection(ctx, client, requestor, selection, target, prop, time),
        Request::SendEvent {
            propagate,
            destination,
            event_mask,
            event,
        } => property::send_event(ctx, propagate, destination, event_mask, event),
        Request::GrabPointer {
            owner_events,
            grab_window,
            event_mask,
            pointer_mode,
            keyboard_mode,
            confine_to,
            cursor,
            time,
        } => grab::grab_pointer(
            ctx,
            client,
            owner_events,
            grab_window,
            event_mask,
            pointer_mode,
            keyboard_mode,
            confine_to,
            cursor,
            time,
        ),
        Request::UngrabPointer { time } => grab::ungrab_pointer(ctx, client, time),
        Request::GrabButton {
            owner_events,
            grab_window,
            event_mask,
            pointer_mode,
            keyboard_mode,
            confine_to,
            cursor,
            button,
            modifiers,
        } => grab::grab_button(
            ctx,
            client,
            owner_events,
            grab_window,
            event_mask,
            pointer_mode,
            keyboard_mode,
            confine_to,
            cursor,
            button,
            modifiers,
        ),
        Request::UngrabButton {
            button,
            grab_window,
            modifiers,
        } => grab::ungrab_button(ctx, button, grab_window, modifiers),
        Request::ChangeActivePointerGrab {
            cursor,
            time,
            event_mask,
        } => grab::change_active_pointer_grab(ctx, client, cursor, time, event_mask),
        Request::GrabKeyboard {
            owner_events,
            grab_window,
            time,
            pointer_mode,
            keyboard_mode,
        } => grab::grab_keyboard(
            ctx,
            client,
            owner_events,
            grab_window,
            time,
            pointer_mode,
            keyboard_mode,
        ),
        Request::UngrabKeyboard { time } => grab::ungrab_keyboard(ctx, client, time),
        Request::GrabKey {
            owner_events,
            grab_window,
            modifiers,
            key,
            pointer_mode,
            keyboard_mode,
        } => grab::grab_key(
            ctx,
            client,
            owner_events,
            grab_window,
            modifiers,
            key,
            pointer_mode,
            keyboard_mode,
        ),
        Request::UngrabKey {
            key,
            grab_window,
            modifiers,
        } => grab::ungrab_key(ctx, key, grab_window, modifiers),
        Request::AllowEvents { mode, time } => grab::allow_events(ctx, mode, time),
        Request::GrabServer => grab::grab_server(ctx, client),
        Request::UngrabServer => grab::ungrab_server(ctx, client),
        Request::QueryPointer { window } => misc::query_pointer(ctx, client, window),
        Request::GetMotionEvents {
            window,
            start,
            stop,
        } => misc::get_motion_events(ctx, client, window, start, stop),
        Request::TranslateCoordinates {
            src_window,
            dst_window,
            src_x,
            src_y,
        } => misc::translate_coordinates(ctx, client, src_window, dst_window, src_x, src_y),
        Request::WarpPointer {
            src_window,
            dst_window,
            src_x,
            src_y,
            src_width: _,
            src_height: _,
            dst_x,
            dst_y,
        } => misc::warp_pointer(ctx, src_window, dst_window, src_x, src_y, dst_x, dst_y),
        Request::SetInputFocus {
            revert_to,
            focus,
            time,
        } => misc::set_input_focus(ctx, revert_to, focus, time),
        Request::GetInputFocus => misc::get_input_focus(ctx, client),
        Request::QueryKeymap => misc::query_keymap(ctx, client),
        Request::OpenFont { fid, name } => font::open_font(ctx, client, fid, &name),
        Request::CloseFont { font: fid } => font::close_font(ctx, fid),
        Request::QueryFont { font: fid } => font::query_font(ctx, client, fid),
        Request::QueryTextExtents { font: fid, text } => {
            font::query_text_extents(ctx, client, fid, &text)
        }
        Request::ListFonts { max_names, pattern } => {
            font::list_fonts(ctx, client, max_names, &pattern)
        }
        Request::ListFontsWithInfo { max_names, pattern } => {
            font::list_fonts_with_info(ctx, client, seq, max_names, &pattern)
        }
        Request::SetFontPath { paths } => font::set_font_path(ctx, &paths),
        Request::GetFontPath => font::get_font_path(ctx, client),
        Request::CreatePixmap {
            depth,
            pid,
            drawable,
            width,
            height,
        } => graphics::create_pixmap(ctx, client, depth, pid, drawable, width, height),
        Request::FreePixmap { pixmap } => graphics::free_pixmap(ctx, pixmap),
        Request::CreateGC {
            cid,
            drawable,
            values,
        } => graphics::create_gc(ctx, client, cid, drawable, &values),
        Request::ChangeGC { gc, values } => graphics::change_gc(ctx, gc, &values),
        Request::CopyGC {
            src_gc,
            dst_gc,
            mask,
        } => graphics::copy_gc(ctx, src_gc, dst_gc, mask),
        Request::SetDashes {
            gc,
            dash_offset,
            dashes,
        } => graphics::set_dashes(ctx, gc, dash_offset, &dashes),
        Request::SetClipRectangles {
            ordering: _,
            gc,
            clip_x,
            clip_y,
            rectangles,
        } => graphics::set_clip_rectangles(ctx, gc, clip_x, clip_y, &rectangles),
        Request::FreeGC { gc } => graphics::free_gc(ctx, gc),
        Request::ClearArea {
            exposures,
            window,
            x,
            y,
            width,
            height,
        } => graphics::clear_area(ctx, exposures, window, x, y, width, height),
        Request::CopyArea {
            src_drawable,
            dst_drawable,
            gc,
            src_x,
            src_y,
            dst_x,
            dst_y,
            width,
            height,
        } => graphics::copy_area(
            ctx,
            client,
            src_drawable,
            dst_drawable,
            gc,
            src_x,
            src_y,
            dst_x,
            dst_y,
            width,
            height,
        ),
        Request::CopyPlane {
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
        } => graphics::copy_plane(
            ctx,
            client,
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
        ),
        Request::PolyPoint {
            coordinate_mode,
            drawable,
            gc,
            points,
        } => graphics::poly_point(ctx, coordinate_mode, drawable, gc, &points),
        Request::PolyLine {
            coordinate_mode,
            drawable,
            gc,
            points,
        } => graphics::poly_line(ctx, coordinate_mode, drawable, gc, &points),
        Request::PolySegment {
            drawable,
            gc,
            segments,
        } => graphics::poly_segment(ctx, drawable, gc, &segments),
        Request::PolyRectangle {
            drawable,
            gc,
            rectangles,
        } => graphics::poly_rectangle(ctx, drawable, gc, &rectangles),
        Request::PolyArc { drawable, gc, arcs } => graphics::poly_arc(ctx, drawable, gc, &arcs),
        Request::FillPoly {
            drawable,
            gc,
            shape,
            coordinate_mode,
            points,
        } => graphics::fill_poly(ctx, drawable, gc, shape, coordinate_mode, &points),
        Request::PolyFillRectangle {
            drawable,
            gc,
            rectangles,
        } => graphics::poly_fill_rectangle(ctx, drawable, gc, &rectangles),
        Request::PolyFillArc { drawable, gc, arcs } => {
            graphics::poly_fill_arc(ctx, drawable, gc, &arcs)
        }
        Request::PutImage {
            format,
            drawable,
            gc,
            width,
            height,
            dst_x,
            dst_y,
            left_pad,
            depth,
            data,
        } => graphics::put_image(
            ctx, format, drawable, gc, width, height, dst_x, dst_y, left_pad, depth, &data,
        ),
        Request::GetImage {
            format,
            drawable,
            x,
            y,
            width,
            height,
            plane_mask,
        } => graphics::get_image(ctx, client, format, drawable, x, y, width, height, plane_mask),
        Request::PolyText8 {
            drawable,
            gc,
            x,
            y,
            items,
        } => graphics::poly_text8(ctx, drawable, gc, x, y, &items),
        Request::PolyText16 {
            drawable,
            gc,
            x,
            y,
            items,
        } => graphics::poly_text16(ctx, drawable, gc, x, y, &items),
        Request::ImageText8 {
            drawable,
            gc,
            x,
            y,
            text,
        } => graphics::image_text8(ctx, drawable, gc, x, y, &text),
        Request::ImageText16 {
            drawable,
            gc,
            x,
            y,
            text,
        } => graphics::image_text16(ctx, drawable, gc, x, y, &text),
        Request::CreateColormap {
            alloc,
            mid,
            window,
            visual,
        } => colormap::create_colormap(ctx, client, alloc, mid, window, visual),
        Request::FreeColormap { cmap } => colormap::free_colormap(ctx, cmap),
        Request::CopyColormapAndFree { mid, src_cmap } => {
            colormap::copy_colormap_and_free(ctx, client, mid, src_cmap)
        }
        Request::InstallColormap { cmap } => colormap::install_colormap(ctx, cmap),
        Request::UninstallColormap { cmap } => colormap::uninstall_colormap(ctx, cmap),
        Request::ListInstalledColormaps { window } => {
            colormap::list_installed_colormaps(ctx, client, window)
        }
        Request::AllocColor {
            cmap,
            red,
            green,
            blue,
        } => colormap::alloc_color(ctx, client, cmap, red, green, blue),
        Request::AllocNamedColor { cmap, name } => {
            colormap::alloc_named_color(ctx, client, cmap, &name)
        }
        Request::AllocColorCells { cmap, .. } => colormap::alloc_color_cells(ctx, cmap),
        Request::AllocColorPlanes { cmap, .. } => colormap::alloc_color_planes(ctx, cmap),
        Request::FreeColors { cmap, pixels, .. } => colormap::free_colors(ctx, cmap, &pixels),
        Request::StoreColors { cmap, .. } => colormap::store_colors(ctx, cmap),
        Request::StoreNamedColor { cmap, .. } => colormap::store_colors(ctx, cmap),
        Request::QueryColors { cmap, pixels } => {
            colormap::query_colors(ctx, client, cmap, &pixels)
        }
        Request::LookupColor { cmap, name } => colormap::lookup_color(ctx, client, cmap, &name),
        Request::CreateCursor {
            cid,
            source,
            mask,
            fore_red,
            fore_green,
            fore_blue,
            back_red,
            back_green,
            back_blue,
            x,
            y,
        } => cursor::create_cursor(
            ctx,
            client,
            cid,
            source,
            mask,
            (fore_red, fore_green, fore_blue),
            (back_red, back_green, back_blue),
            x,
            y,
        ),
        Request::CreateGlyphCursor {
            cid,
            source_font,
            mask_font,
            source_char,
            mask_char: _,
            fore_red,
            fore_green,
            fore_blue,
            back_red,
            back_green,
            back_blue,
        } => cursor::create_glyph_cursor(
            ctx,
            client,
            cid,
            source_font,
            mask_font,
            source_char,
            (fore_red, fore_green, fore_blue),
            (back_red, back_green, back_blue),
        ),
        Request::FreeCursor { cursor: cid } => cursor::free_cursor(ctx, cid),
        Request::RecolorCursor {
            cursor: cid,
            fore_red,
            fore_green,
            fore_blue,
            back_red,
            back_green,
            back_blue,
        } => cursor::recolor_cursor(
            ctx,
            cid,
            (fore_red, fore_green, fore_blue),
            (back_red, back_green, back_blue),
        ),
        Request::QueryBestSize {
            class,
            drawable,
            width,
            height,
        } => cursor::query_best_size(ctx, client, class, drawable, width, height),
        Request::QueryExtension { name } => misc::query_extension(ctx, client, &name),
        Request::ListExtensions => misc::list_extensions(ctx, client),
        Request::ChangeKeyboardMapping {
            keycode_count,
            first_keycode,
            keysyms_per_keycode,
            keysyms,
        } => misc::change_keyboard_mapping(
            ctx,
            keycode_count,
            first_keycode,
            keysyms_per_keycode,
            &keysyms,
        ),
        Request::GetKeyboardMapping {
            first_keycode,
            count,
        } => misc::get_keyboard_mapping(ctx, client, first_keycode, count),
        Request::ChangeKeyboardControl { value_mask, values } => {
            misc::change_keyboard_control(ctx, value_mask, &values)
        }
        Request::GetKeyboardControl => misc::get_keyboard_control(ctx, client),
        Request::Bell { percent } => misc::bell(ctx, percent),
        Request::ChangePointerControl {
            accel_numerator,
            accel_denominator,
            threshold,
            do_accel,
            do_threshold,
        } => misc::change_pointer_control(
            ctx,
            accel_numerator,
            accel_denominator,
            threshold,
            do_accel,
            do_threshold,
        ),
        Request::GetPointerControl => misc::get_pointer_control(ctx, client),
        Request::SetScreenSaver {
            timeout,
            interval,
            prefer_blanking,
            allow_exposures,
        } => misc::set_screen_saver(ctx, timeout, interval, prefer_blanking, allow_exposures),
        Request::GetScreenSaver => misc::get_screen_saver(ctx, client),
        Request::ChangeHosts {
            mode,
            family,
            address,
        } => misc::change_hosts(ctx, mode, family, &address),
        Request::ListHosts => misc::list_hosts(ctx, client),
        Request::SetAccessControl { mode } => misc::set_access_control(ctx, mode),
        Request::SetCloseDownMode { mode } => misc::set_close_down_mode(ctx, client, mode),
        Request::KillClient { resource } => misc::kill_client(ctx, resource),
        Request::ForceScreenSaver { mode } => misc::force_screen_saver(ctx, mode),
        Request::SetPointerMapping { map } => misc::set_pointer_mapping(ctx, &map),
        Request::GetPointerMapping => misc::get_pointer_mapping(ctx, client),
        Request::SetModifierMapping {
            keycodes_per_modifier,
            keycodes,
        } => misc::set_modifier_mapping(ctx, keycodes_per_modifier, &keycodes),
        Request::GetModifierMapping => misc::get_modifier_mapping(ctx, client),
        Request::NoOperation => Ok(None),
        Request::BigReqEnable => big_req_enable(ctx, client),
        Request::Xi(xi_request) => xinput::dispatch(ctx, client, xi_request),
    }
}

/// BIG-REQUESTS Enable: flip the reader's framing mode and grant the cap
fn big_req_enable(ctx: &mut ServerContext, client: ClientId) -> Outcome {
    let c = ctx
        .clients
        .get(&client)
        .ok_or_else(X11Error::implementation)?;
    let order = c.order;
    c.big_requests
        .store(true, std::sync::atomic::Ordering::Relaxed);
    Ok(Some(crate::protocol::replies::Reply::build(0, order, |w| {
        w.u32(crate::extensions::big_requests::MAX_REQUEST_LENGTH);
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::opcodes as op;
    use crate::protocol::wire::{WireOrder, WireWriter};
    use crate::server::context::tests::{add_client, test_context};

    fn run(ctx: &mut ServerContext, client: u8, major: u8, data: u8, body: &[u8]) {
        process_request(ctx, client, major, data, &Bytes::copy_from_slice(body));
    }

    #[test]
    fn test_sequence_numbers_are_monotone() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        // GetInputFocus twice: replies carry 1 then 2
        run(&mut ctx, 1, op::GET_INPUT_FOCUS, 0, &[]);
        run(&mut ctx, 1, op::GET_INPUT_FOCUS, 0, &[]);
        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(u16::from_le_bytes([first[2], first[3]]), 1);
        assert_eq!(u16::from_le_bytes([second[2], second[3]]), 2);
    }

    #[test]
    fn test_error_carries_opcode_and_sequence() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(0x0020_0099); // no such window
        run(&mut ctx, 1, op::MAP_WINDOW, 0, w.as_slice());
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame[0], 0);
        assert_eq!(frame[1], 3); // Window error
        assert_eq!(u16::from_le_bytes([frame[2], frame[3]]), 1);
        assert_eq!(frame[10], op::MAP_WINDOW);
        // connection still serves requests
        run(&mut ctx, 1, op::GET_INPUT_FOCUS, 0, &[]);
        let reply = rx.try_recv().unwrap();
        assert_eq!(reply[0], 1);
        assert_eq!(u16::from_le_bytes([reply[2], reply[3]]), 2);
    }

    #[test]
    fn test_big_req_enable_flips_flag_and_reports_cap() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        assert!(
            !ctx.clients[&1]
                .big_requests
                .load(std::sync::atomic::Ordering::Relaxed)
        );
        run(&mut ctx, 1, op::BIG_REQUESTS_MAJOR, 0, &[]);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame[0], 1);
        assert_eq!(
            u32::from_le_bytes([frame[8], frame[9], frame[10], frame[11]]),
            0x0010_0000
        );
        assert!(
            ctx.clients[&1]
                .big_requests
                .load(std::sync::atomic::Ordering::Relaxed)
        );
    }

    #[test]
    fn test_unknown_extension_minor_is_request_error() {
        let mut ctx = test_context();
        let mut rx = add_client(&mut ctx, 1);
        run(&mut ctx, 1, op::XINPUT_MAJOR, 99, &[]);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame[0], 0);
        assert_eq!(frame[1], 1); // Request error
        assert_eq!(u16::from_le_bytes([frame[8], frame[9]]), 99); // minor
        assert_eq!(frame[10], op::XINPUT_MAJOR);
    }
}
