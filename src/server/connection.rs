//! Per-connection transport tasks
//!
//! Each accepted stream gets a reader here and a writer task; the reader
//! performs the setup handshake, then reassembles framed requests and feeds
//! them to the event loop. A malformed handshake or a framing violation
//! closes the connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::protocol::handshake::SetupRequest;
use crate::server::event_loop::ServerMessage;
use crate::{Error, Result};

/// Maximum request body the reader will reassemble (BIG-REQUESTS cap)
const MAX_BODY_BYTES: usize =
    (crate::extensions::big_requests::MAX_REQUEST_LENGTH as usize) * 4;

/// Serve one client connection to completion
pub async fn serve(stream: TcpStream, loop_tx: mpsc::UnboundedSender<ServerMessage>) -> Result<()> {
    stream.set_nodelay(true).ok();
    let peer = stream.peer_addr().ok();
    let (mut reader, mut writer) = stream.into_split();

    // 12-byte setup prefix; an unknown byte-order byte drops the connection
    // without a reply
    let mut prefix = [0u8; 12];
    reader.read_exact(&mut prefix).await?;
    let Some((order, major, minor, name_len, data_len)) = SetupRequest::parse_prefix(&prefix)
    else {
        warn!(?peer, "malformed setup handshake, dropping connection");
        return Ok(());
    };
    let trailing_len = SetupRequest::trailing_len(name_len, data_len);
    let mut trailing = vec![0u8; trailing_len];
    reader.read_exact(&mut trailing).await?;
    // authorization is accepted unconditionally; parse only to validate
    if SetupRequest::parse(order, major, minor, name_len, data_len, &trailing).is_none() {
        warn!(?peer, "malformed setup trailing data, dropping connection");
        return Ok(());
    }

    let big_requests = Arc::new(AtomicBool::new(false));
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (ready_tx, ready_rx) = oneshot::channel();
    loop_tx
        .send(ServerMessage::Connect {
            order,
            big_requests: big_requests.clone(),
            outbound: out_tx,
            ready: ready_tx,
        })
        .map_err(|_| Error::Server("event loop is gone".into()))?;
    let Ok(Some(client)) = ready_rx.await else {
        warn!(?peer, "server refused connection (client table full)");
        return Ok(());
    };
    debug!(client, ?peer, "connection established");

    // writer drains the outbound queue until the client is dropped
    let write_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if writer.write_all(&frame).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let result = read_requests(&mut reader, client, order, &big_requests, &loop_tx).await;
    let _ = loop_tx.send(ServerMessage::Disconnect { client });
    write_task.abort();
    debug!(client, "connection closed");
    result
}

async fn read_requests(
    reader: &mut (impl AsyncReadExt + Unpin),
    client: u8,
    order: crate::protocol::wire::WireOrder,
    big_requests: &AtomicBool,
    loop_tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Result<()> {
    loop {
        let mut header = [0u8; 4];
        match reader.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        let major = header[0];
        let data = header[1];
        let length = order.read_u16(&header[2..4]) as usize;

        let body_len = if length == 0 {
            // zero core length is only legal in BIG-REQUESTS framing
            if !big_requests.load(Ordering::Relaxed) {
                warn!(client, major, "zero-length request without BIG-REQUESTS");
                return Err(Error::Protocol("bad request length".into()));
            }
            let mut ext = [0u8; 4];
            reader.read_exact(&mut ext).await?;
            let words = order.read_u32(&ext) as usize;
            // the extended length covers the header and the length word
            words.saturating_sub(2) * 4
        } else {
            (length - 1) * 4
        };
        if body_len > MAX_BODY_BYTES {
            warn!(client, major, body_len, "oversized request");
            return Err(Error::Protocol("request exceeds maximum length".into()));
        }

        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body).await?;
        trace!(client, major, body_len, "request framed");
        if loop_tx
            .send(ServerMessage::Request {
                client,
                major,
                data,
                body: body.into(),
            })
            .is_err()
        {
            return Ok(());
        }
    }
}
