//! Server assembly
//!
//! [`XServer`] wires the pieces together: the TCP listener, one reader and
//! writer task per connection, and the single event-loop task that owns all
//! protocol state.

pub mod client;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod event_loop;
pub mod handlers;
pub mod selection;

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::frontend::{Frontend, InputPrimitive};
use crate::server::context::ServerContext;
use crate::server::event_loop::ServerMessage;
use crate::Result;

/// Handle the frontend uses to feed input primitives into the event loop
#[derive(Debug, Clone)]
pub struct InputInjector {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl InputInjector {
    pub fn send_mouse_event(
        &self,
        window: u32,
        button: u8,
        pressed: bool,
        x: i16,
        y: i16,
        root_x: i16,
        root_y: i16,
        state: u16,
    ) {
        let primitive = if button == 0 {
            InputPrimitive::Motion {
                window,
                x,
                y,
                root_x,
                root_y,
                state,
            }
        } else {
            InputPrimitive::Button {
                window,
                button,
                pressed,
                x,
                y,
                root_x,
                root_y,
                state,
            }
        };
        let _ = self.tx.send(ServerMessage::Input(primitive));
    }

    pub fn send_keyboard_event(&self, keycode: u8, pressed: bool, state: u16) {
        let _ = self.tx.send(ServerMessage::Input(InputPrimitive::Key {
            keycode,
            pressed,
            state,
        }));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn send_pointer_crossing_event(
        &self,
        window: u32,
        entered: bool,
        x: i16,
        y: i16,
        root_x: i16,
        root_y: i16,
        state: u16,
    ) {
        let _ = self.tx.send(ServerMessage::Input(InputPrimitive::Crossing {
            window,
            entered,
            detail: 0,
            mode: 0,
            x,
            y,
            root_x,
            root_y,
            state,
        }));
    }

    pub fn update_pointer_position(&self, window: u32, root_x: i16, root_y: i16) {
        let _ = self
            .tx
            .send(ServerMessage::Input(InputPrimitive::PointerPosition {
                window,
                root_x,
                root_y,
            }));
    }

    pub fn set_root_window_size(&self, width: u16, height: u16) {
        let _ = self
            .tx
            .send(ServerMessage::Input(InputPrimitive::RootResize {
                width,
                height,
            }));
    }
}

/// The X server: configuration, frontend, and the event-loop channel
pub struct XServer {
    config: ServerConfig,
    frontend: Arc<dyn Frontend>,
    loop_tx: mpsc::UnboundedSender<ServerMessage>,
    loop_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl XServer {
    pub fn new(config: ServerConfig, frontend: Arc<dyn Frontend>) -> Self {
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        Self {
            config,
            frontend,
            loop_tx,
            loop_rx,
        }
    }

    /// Input handle for the frontend; clones are cheap
    pub fn input_injector(&self) -> InputInjector {
        InputInjector {
            tx: self.loop_tx.clone(),
        }
    }

    /// Bind the listener and serve until ctrl-c
    pub async fn run(self) -> Result<()> {
        let XServer {
            config,
            frontend,
            loop_tx,
            loop_rx,
        } = self;
        let ctx = ServerContext::new(&config.display, frontend, loop_tx.clone());
        let loop_task = tokio::spawn(event_loop::run(ctx, loop_rx));

        let listener = TcpListener::bind(&config.server.listen).await?;
        info!(
            listen = %config.server.listen,
            screen = format_args!("{}x{}", config.display.width, config.display.height),
            "wxserver accepting X11 connections"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            info!(%addr, "new client connection");
                            let tx = loop_tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = connection::serve(stream, tx).await {
                                    warn!(%addr, error = %e, "client connection error");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "failed to accept connection"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }
        drop(loop_tx);
        loop_task.abort();
        Ok(())
    }
}
