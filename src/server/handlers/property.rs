//! Property and selection requests

use crate::core::errors::X11Error;
use crate::core::ids::{Atom, ClientId, Timestamp, WindowId};
use crate::protocol::events::{Event, PROPERTY_DELETED, PROPERTY_NEW_VALUE};
use crate::protocol::replies::Reply;
use crate::resources::window::Property;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;
use crate::server::selection::{convert_selection as do_convert, notify_property_change};

/// AnyPropertyType in GetProperty
const ANY_PROPERTY_TYPE: Atom = 0;

#[allow(clippy::too_many_arguments)]
pub fn change_property(
    ctx: &mut ServerContext,
    mode: u8,
    window: WindowId,
    property: Atom,
    property_type: Atom,
    format: u8,
    data: &[u8],
) -> Outcome {
    if !ctx.atoms.is_valid(property) {
        return Err(X11Error::atom(property));
    }
    if property_type != 0 && !ctx.atoms.is_valid(property_type) {
        return Err(X11Error::atom(property_type));
    }
    if mode > 2 {
        return Err(X11Error::value(mode as u32));
    }
    debug_assert_eq!(data.len() % (format as usize / 8), 0);

    let win = ctx.resources.window_mut(window)?;
    match win.properties.get_mut(&property) {
        Some(existing) if mode != 0 => {
            // Prepend (1) and Append (2) must match type and format
            if existing.type_atom != property_type || existing.format != format {
                return Err(X11Error::match_error());
            }
            if mode == 1 {
                let mut merged = data.to_vec();
                merged.extend_from_slice(&existing.data);
                existing.data = merged;
            } else {
                existing.data.extend_from_slice(data);
            }
        }
        _ => {
            win.properties.insert(
                property,
                Property {
                    type_atom: property_type,
                    format,
                    data: data.to_vec(),
                },
            );
        }
    }
    notify_property_change(ctx, window, property, PROPERTY_NEW_VALUE);
    Ok(None)
}

pub fn delete_property(ctx: &mut ServerContext, window: WindowId, property: Atom) -> Outcome {
    if !ctx.atoms.is_valid(property) {
        return Err(X11Error::atom(property));
    }
    let win = ctx.resources.window_mut(window)?;
    if win.properties.remove(&property).is_some() {
        notify_property_change(ctx, window, property, PROPERTY_DELETED);
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
pub fn get_property(
    ctx: &mut ServerContext,
    client: ClientId,
    delete: bool,
    window: WindowId,
    property: Atom,
    property_type: Atom,
    long_offset: u32,
    long_length: u32,
) -> Outcome {
    let order = ctx.clients[&client].order;
    if !ctx.atoms.is_valid(property) {
        return Err(X11Error::atom(property));
    }
    let win = ctx.resources.window(window)?;

    let Some(prop) = win.properties.get(&property) else {
        return Ok(Some(Reply::build(0, order, |w| {
            w.u32(0); // type None
            w.u32(0); // bytes-after
            w.u32(0); // value length
        })));
    };

    // type mismatch: report metadata, return no data
    if property_type != ANY_PROPERTY_TYPE && prop.type_atom != property_type {
        let (type_atom, format, total) = (prop.type_atom, prop.format, prop.data.len() as u32);
        return Ok(Some(Reply::build(format, order, |w| {
            w.u32(type_atom);
            w.u32(total);
            w.u32(0);
        })));
    }

    let total = prop.data.len();
    let start = (long_offset as usize) * 4;
    if start > total {
        return Err(X11Error::value(long_offset));
    }
    let take = ((long_length as usize) * 4).min(total - start);
    let value = prop.data[start..start + take].to_vec();
    let bytes_after = (total - (start + take)) as u32;
    let (type_atom, format) = (prop.type_atom, prop.format);
    let units = match format {
        0 => 0,
        f => take / (f as usize / 8),
    } as u32;

    let should_delete = delete && bytes_after == 0;
    if should_delete {
        ctx.resources
            .window_mut(window)?
            .properties
            .remove(&property);
        notify_property_change(ctx, window, property, PROPERTY_DELETED);
    }

    Ok(Some(Reply::build(format, order, |w| {
        w.u32(type_atom);
        w.u32(bytes_after);
        w.u32(units);
        w.zeros(12);
        w.bytes(&value);
        w.pad_to_4();
    })))
}

pub fn list_properties(ctx: &ServerContext, client: ClientId, window: WindowId) -> Outcome {
    let order = ctx.clients[&client].order;
    let win = ctx.resources.window(window)?;
    let mut atoms: Vec<Atom> = win.properties.keys().copied().collect();
    atoms.sort_unstable();
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(atoms.len() as u16);
        w.zeros(22);
        for atom in &atoms {
            w.u32(*atom);
        }
    })))
}

pub fn rotate_properties(
    ctx: &mut ServerContext,
    window: WindowId,
    delta: i16,
    properties: &[Atom],
) -> Outcome {
    ctx.resources.window(window)?;
    if properties.is_empty() {
        return Ok(None);
    }
    for &atom in properties {
        if !ctx.atoms.is_valid(atom) {
            return Err(X11Error::atom(atom));
        }
        if !ctx
            .resources
            .window(window)?
            .properties
            .contains_key(&atom)
        {
            return Err(X11Error::match_error());
        }
    }
    let n = properties.len() as i16;
    let shift = delta.rem_euclid(n);
    if shift == 0 {
        return Ok(None);
    }
    let values: Vec<Property> = {
        let win = ctx.resources.window(window)?;
        properties
            .iter()
            .map(|a| win.properties[a].clone())
            .collect()
    };
    {
        let win = ctx.resources.window_mut(window)?;
        for (i, &atom) in properties.iter().enumerate() {
            let from = (i as i16 + shift).rem_euclid(n) as usize;
            win.properties.insert(atom, values[from].clone());
        }
    }
    for &atom in properties {
        notify_property_change(ctx, window, atom, PROPERTY_NEW_VALUE);
    }
    Ok(None)
}

pub fn set_selection_owner(
    ctx: &mut ServerContext,
    client: ClientId,
    owner: WindowId,
    selection: Atom,
    time: Timestamp,
) -> Outcome {
    if !ctx.atoms.is_valid(selection) {
        return Err(X11Error::atom(selection));
    }
    if owner != 0 {
        ctx.resources.window(owner)?;
    }
    ctx.set_selection_owner(selection, owner, client, time);
    Ok(None)
}

pub fn get_selection_owner(ctx: &ServerContext, client: ClientId, selection: Atom) -> Outcome {
    if !ctx.atoms.is_valid(selection) {
        return Err(X11Error::atom(selection));
    }
    let order = ctx.clients[&client].order;
    let owner = ctx
        .selections
        .get(&selection)
        .map(|o| o.window)
        .unwrap_or(0);
    Ok(Some(Reply::build(0, order, |w| {
        w.u32(owner);
    })))
}

#[allow(clippy::too_many_arguments)]
pub fn convert_selection(
    ctx: &mut ServerContext,
    client: ClientId,
    requestor: WindowId,
    selection: Atom,
    target: Atom,
    property: Atom,
    time: Timestamp,
) -> Outcome {
    if !ctx.atoms.is_valid(selection) || !ctx.atoms.is_valid(target) {
        return Err(X11Error::atom(selection));
    }
    ctx.resources.window(requestor)?;
    do_convert(ctx, client, requestor, selection, target, property, time);
    Ok(None)
}

/// SendEvent: forward a caller-built event to the destination's listeners
pub fn send_event(
    ctx: &mut ServerContext,
    propagate: bool,
    destination: u32,
    event_mask: u32,
    raw: [u8; 32],
) -> Outcome {
    use crate::core::ids::POINTER_ROOT;
    let window = match destination {
        0 => ctx.pointer.window,
        POINTER_ROOT => match ctx.focus.window {
            0 => return Ok(None),
            POINTER_ROOT => ctx.pointer.window,
            w => w,
        },
        w => w,
    };
    ctx.resources.window(window)?;

    let mut forwarded = raw;
    forwarded[0] |= 0x80; // mark as synthetic

    let mask = crate::protocol::events::EventMask::from_bits_truncate(event_mask);
    if mask.is_empty() {
        let target = ctx
            .window_event_target(window)
            .or_else(|| {
                ctx.resources
                    .window(window)
                    .ok()
                    .map(|w| w.owner)
                    .filter(|&o| o != 0)
            });
        if let Some(target) = target {
            ctx.send_event(target, &Event::Forwarded(forwarded));
        }
        return Ok(None);
    }

    let hit = if propagate {
        ctx.find_interested(window, mask)
    } else {
        let selected = ctx
            .resources
            .window(window)
            .map(|w| w.selects(mask))
            .unwrap_or(false);
        if selected {
            ctx.window_event_target(window).map(|c| (c, window))
        } else {
            None
        }
    };
    if let Some((target, _)) = hit {
        ctx.send_event(target, &Event::Forwarded(forwarded));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::atoms::predefined;
    use crate::core::ids::{ROOT_WINDOW, id_base};
    use crate::protocol::wire::WireOrder;
    use crate::resources::window::Window;
    use crate::server::context::tests::{add_client, test_context};

    fn setup() -> (ServerContext, WindowId) {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let w = id_base(1) | 1;
        ctx.resources.insert_window(Window::new(w, 1, ROOT_WINDOW));
        ctx.resources.add_child(ROOT_WINDOW, w);
        (ctx, w)
    }

    #[test]
    fn test_replace_then_get_round_trips() {
        let (mut ctx, w) = setup();
        let data: Vec<u8> = (0u8..100).collect();
        change_property(&mut ctx, 0, w, predefined::WM_NAME, predefined::STRING, 8, &data)
            .unwrap();
        let reply = get_property(&mut ctx, 1, false, w, predefined::WM_NAME, 0, 0, 25)
            .unwrap()
            .unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        let bytes_after = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        assert_eq!(bytes_after, 0);
        assert_eq!(&bytes[32..132], &data[..]);
    }

    #[test]
    fn test_get_property_slice_and_bytes_after() {
        let (mut ctx, w) = setup();
        let data: Vec<u8> = (0u8..100).collect();
        change_property(&mut ctx, 0, w, predefined::WM_NAME, predefined::STRING, 8, &data)
            .unwrap();
        // offset 5 longs = byte 20, length 10 longs = 40 bytes
        let reply = get_property(&mut ctx, 1, false, w, predefined::WM_NAME, 0, 5, 10)
            .unwrap()
            .unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        assert_eq!(bytes[1], 8); // format
        let type_atom = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        assert_eq!(type_atom, predefined::STRING);
        let bytes_after = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        assert_eq!(bytes_after, 40);
        assert_eq!(&bytes[32..72], &data[20..60]);
    }

    #[test]
    fn test_append_requires_matching_format() {
        let (mut ctx, w) = setup();
        change_property(&mut ctx, 0, w, predefined::WM_NAME, predefined::STRING, 8, b"ab")
            .unwrap();
        let err = change_property(
            &mut ctx,
            2,
            w,
            predefined::WM_NAME,
            predefined::CARDINAL,
            32,
            &[0; 4],
        )
        .unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Match);
    }

    #[test]
    fn test_get_with_delete_removes_at_end() {
        let (mut ctx, w) = setup();
        change_property(&mut ctx, 0, w, predefined::WM_NAME, predefined::STRING, 8, b"abcd")
            .unwrap();
        get_property(&mut ctx, 1, true, w, predefined::WM_NAME, 0, 0, 1)
            .unwrap()
            .unwrap();
        assert!(
            !ctx.resources
                .window(w)
                .unwrap()
                .properties
                .contains_key(&predefined::WM_NAME)
        );
    }

    #[test]
    fn test_rotate_properties() {
        let (mut ctx, w) = setup();
        let a1 = ctx.atoms.intern("A1", false);
        let a2 = ctx.atoms.intern("A2", false);
        change_property(&mut ctx, 0, w, a1, predefined::STRING, 8, b"one").unwrap();
        change_property(&mut ctx, 0, w, a2, predefined::STRING, 8, b"two").unwrap();
        rotate_properties(&mut ctx, w, 1, &[a1, a2]).unwrap();
        let win = ctx.resources.window(w).unwrap();
        assert_eq!(win.properties[&a1].data, b"two");
        assert_eq!(win.properties[&a2].data, b"one");
    }
}
