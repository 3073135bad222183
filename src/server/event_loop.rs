//! The server event loop
//!
//! One task owns the [`ServerContext`]; everything else talks to it through
//! [`ServerMessage`]s. Each loop iteration drains one message and fully
//! processes it, so request handling never interleaves and per-client order
//! is preserved by the channel.

use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::core::ids::{Atom, ClientId, Timestamp, WindowId};
use crate::frontend::InputPrimitive;
use crate::input::router;
use crate::protocol::handshake::encode_setup_success;
use crate::protocol::wire::WireOrder;
use crate::server::client::Client;
use crate::server::context::ServerContext;
use crate::server::{dispatch, selection};

/// Messages processed by the event-loop task
#[derive(Debug)]
pub enum ServerMessage {
    /// A connection finished its setup handshake
    Connect {
        order: WireOrder,
        big_requests: Arc<AtomicBool>,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        ready: oneshot::Sender<Option<ClientId>>,
    },
    /// One framed request from a connected client
    Request {
        client: ClientId,
        major: u8,
        data: u8,
        body: Bytes,
    },
    /// The connection reader saw EOF or a framing violation
    Disconnect { client: ClientId },
    /// An input primitive from the frontend
    Input(InputPrimitive),
    /// Clipboard bridge completion for a CLIPBOARD conversion
    ClipboardText {
        requestor: WindowId,
        selection: Atom,
        target: Atom,
        property: Atom,
        time: Timestamp,
        text: Option<String>,
    },
}

/// Run the loop until every message sender is gone
pub async fn run(mut ctx: ServerContext, mut rx: mpsc::UnboundedReceiver<ServerMessage>) {
    info!("event loop running");
    while let Some(msg) = rx.recv().await {
        handle_message(&mut ctx, msg);
    }
    info!("event loop finished");
}

/// Process one message; separated out so tests can drive the loop directly
pub fn handle_message(ctx: &mut ServerContext, msg: ServerMessage) {
    match msg {
        ServerMessage::Connect {
            order,
            big_requests,
            outbound,
            ready,
        } => {
            let assigned = ctx.allocate_client_index();
            if let Some(id) = assigned {
                let client = Client::new(id, order, big_requests, outbound);
                client.send_raw(encode_setup_success(id, &ctx.screen, order));
                ctx.clients.insert(id, client);
                debug!(client = id, ?order, "client connected");
            }
            let _ = ready.send(assigned);
        }
        ServerMessage::Request {
            client,
            major,
            data,
            body,
        } => dispatch::process_request(ctx, client, major, data, &body),
        ServerMessage::Disconnect { client } => ctx.disconnect_client(client),
        ServerMessage::Input(primitive) => router::handle_primitive(ctx, primitive),
        ServerMessage::ClipboardText {
            requestor,
            selection: sel,
            target,
            property,
            time,
            text,
        } => selection::complete_clipboard(ctx, requestor, sel, target, property, time, text),
    }
}
