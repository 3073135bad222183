//! Selection conversion and the clipboard bridge
//!
//! Owned selections forward SelectionRequest to the owner and let it answer.
//! A CLIPBOARD conversion with no owner is bridged to the host clipboard:
//! the read runs as a detached task and re-enters the event loop as a
//! [`ServerMessage::ClipboardText`], keeping the single-mutator rule intact.

use tracing::debug;

use crate::core::atoms::predefined;
use crate::core::ids::{Atom, ClientId, Timestamp, WindowId};
use crate::protocol::events::{Event, PROPERTY_NEW_VALUE};
use crate::resources::window::Property;
use crate::server::context::ServerContext;
use crate::server::event_loop::ServerMessage;

/// Handle ConvertSelection once arguments are validated
pub fn convert_selection(
    ctx: &mut ServerContext,
    client: ClientId,
    requestor: WindowId,
    selection: Atom,
    target: Atom,
    property: Atom,
    time: Timestamp,
) {
    let time = ctx.resolve_time(time);
    if let Some(owner) = ctx.selections.get(&selection).copied() {
        debug!(selection, owner = format_args!("{:#x}", owner.window), "forwarding SelectionRequest");
        ctx.send_event(
            owner.client,
            &Event::SelectionRequest {
                time,
                owner: owner.window,
                requestor,
                selection,
                target,
                property,
            },
        );
        return;
    }

    let clipboard = ctx.atoms.lookup("CLIPBOARD");
    if Some(selection) == clipboard {
        // fire-and-forget host clipboard read; completion re-enters the loop
        let frontend = ctx.frontend.clone();
        let loop_tx = ctx.loop_tx.clone();
        tokio::spawn(async move {
            let text = frontend.read_clipboard().await;
            let _ = loop_tx.send(ServerMessage::ClipboardText {
                requestor,
                selection,
                target,
                property,
                time,
                text,
            });
        });
        return;
    }

    // no owner and nothing to bridge
    ctx.send_event(
        client,
        &Event::SelectionNotify {
            time,
            requestor,
            selection,
            target,
            property: 0,
        },
    );
}

/// Clipboard bridge completion: write the text as a STRING property on the
/// requestor, then answer with SelectionNotify
pub fn complete_clipboard(
    ctx: &mut ServerContext,
    requestor: WindowId,
    selection: Atom,
    target: Atom,
    property: Atom,
    time: Timestamp,
    text: Option<String>,
) {
    let Some(owner_client) = ctx.window_event_target(requestor).or_else(|| {
        ctx.resources
            .window(requestor)
            .ok()
            .map(|w| w.owner)
            .filter(|&o| o != 0)
    }) else {
        return;
    };

    let property = match text {
        Some(text) => {
            let bytes: Vec<u8> = text.chars().map(|c| c as u8).collect();
            if let Ok(win) = ctx.resources.window_mut(requestor) {
                win.properties.insert(
                    property,
                    Property {
                        type_atom: predefined::STRING,
                        format: 8,
                        data: bytes,
                    },
                );
            }
            notify_property_change(ctx, requestor, property, PROPERTY_NEW_VALUE);
            property
        }
        None => 0,
    };

    ctx.send_event(
        owner_client,
        &Event::SelectionNotify {
            time,
            requestor,
            selection,
            target,
            property,
        },
    );
}

/// PropertyNotify to whoever selected PropertyChange on the window
pub fn notify_property_change(ctx: &mut ServerContext, window: WindowId, atom: Atom, state: u8) {
    let selected = ctx
        .resources
        .window(window)
        .map(|w| w.selects(crate::protocol::events::EventMask::PROPERTY_CHANGE))
        .unwrap_or(false);
    let time = ctx.time;
    if selected {
        if let Some(client) = ctx.window_event_target(window) {
            ctx.send_event(
                client,
                &Event::PropertyNotify {
                    window,
                    atom,
                    time,
                    state,
                },
            );
        }
    }
}
