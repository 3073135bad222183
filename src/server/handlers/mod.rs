//! Request handlers, grouped by concern
//!
//! Every handler takes the server context and the requesting client, returns
//! `Ok(Some(reply))` for round-trip requests, `Ok(None)` for one-way
//! requests, or a protocol error the dispatcher turns into an error frame.

pub mod atom;
pub mod colormap;
pub mod cursor;
pub mod font;
pub mod grab;
pub mod graphics;
pub mod misc;
pub mod property;
pub mod window;
pub mod xinput;

use crate::core::errors::HandlerResult;
use crate::protocol::replies::Reply;

/// What a handler hands back to the dispatcher
pub type Outcome = HandlerResult<Option<Reply>>;
