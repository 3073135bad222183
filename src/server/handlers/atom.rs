//! Atom requests

use crate::core::errors::X11Error;
use crate::core::ids::{Atom, ClientId};
use crate::protocol::replies::Reply;
use crate::server::context::ServerContext;
use crate::server::handlers::Outcome;

pub fn intern_atom(
    ctx: &mut ServerContext,
    client: ClientId,
    only_if_exists: bool,
    name: &str,
) -> Outcome {
    let order = ctx.clients[&client].order;
    if name.is_empty() && !only_if_exists {
        return Err(X11Error::value(0));
    }
    let atom = ctx.atoms.intern(name, only_if_exists);
    Ok(Some(Reply::build(0, order, |w| {
        w.u32(atom);
    })))
}

pub fn get_atom_name(ctx: &ServerContext, client: ClientId, atom: Atom) -> Outcome {
    let order = ctx.clients[&client].order;
    let name = ctx
        .atoms
        .name(atom)
        .ok_or_else(|| X11Error::atom(atom))?
        .to_string();
    Ok(Some(Reply::build(0, order, |w| {
        w.u16(name.len() as u16);
        w.zeros(22);
        w.string8_padded(&name);
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::WireOrder;
    use crate::server::context::tests::{add_client, test_context};

    #[test]
    fn test_intern_and_name_round_trip() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let reply = intern_atom(&mut ctx, 1, false, "FOO_BAR").unwrap().unwrap();
        let bytes = reply.encode(1, WireOrder::Lsb);
        let atom = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        assert!(atom >= crate::core::atoms::predefined::FIRST_DYNAMIC);

        // idempotent
        let again = intern_atom(&mut ctx, 1, false, "FOO_BAR").unwrap().unwrap();
        let bytes2 = again.encode(2, WireOrder::Lsb);
        assert_eq!(&bytes[8..12], &bytes2[8..12]);

        let name = get_atom_name(&ctx, 1, atom).unwrap().unwrap();
        let bytes3 = name.encode(3, WireOrder::Lsb);
        let len = u16::from_le_bytes([bytes3[8], bytes3[9]]) as usize;
        assert_eq!(&bytes3[32..32 + len], b"FOO_BAR");
    }

    #[test]
    fn test_get_atom_name_out_of_range() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let err = get_atom_name(&ctx, 1, 0xDEAD).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Atom);
    }
}
