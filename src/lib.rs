//! # WX - X Window System server for the web terminal
//!
//! WX terminates the X11 wire protocol inside a sandboxed host page and
//! renders client windows onto 2D canvases owned by the host document. The
//! crate is the protocol core: connection setup, request dispatch, the
//! resource table, the window tree, event routing with grabs, selections,
//! properties, atoms, and the bit-exact wire codec. Rendering and input
//! capture live behind the [`frontend::Frontend`] capability.
//!
//! ## Architecture
//!
//! - [`protocol`] - wire codec: setup handshake, request decoding, reply,
//!   event, and error encoding
//! - [`core`] - atoms, X11 error codes, resource id arithmetic
//! - [`resources`] - the typed resource table, window tree, GCs, colormaps
//! - [`input`] - event routing, grab state, XInput 1/2 delivery
//! - [`server`] - connections, client state, the event loop, request handlers
//! - [`extensions`] - BIG-REQUESTS and XInputExtension plumbing
//! - [`frontend`] - the capability consumed for drawing and input
//! - [`config`] / [`logging`] - configuration and tracing setup
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wxserver::{config::ServerConfig, frontend::HeadlessFrontend, server::XServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let server = XServer::new(config, Arc::new(HeadlessFrontend::default()));
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod extensions;
pub mod frontend;
pub mod input;
pub mod logging;
pub mod protocol;
pub mod resources;
pub mod server;

// Re-export commonly used types
pub use config::ServerConfig;
pub use server::XServer;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the WX library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),
}
