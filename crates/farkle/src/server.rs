//! `FarkleServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → registry → session.

use std::net::SocketAddr;
use std::sync::Arc;

use farkle_game::{random_roller_factory, RollerFactory};
use farkle_protocol::{Codec, JsonCodec};
use farkle_registry::Registry;
use farkle_transport::{Incoming, Transport, WebSocketTransport};
use tokio::sync::mpsc;

use crate::handler::{handle_connection, ServerState};
use crate::hub::{run_hub, Fanout};
use crate::{FarkleError, ServerConfig};

/// Builder for configuring and starting a Farkle server.
///
/// # Example
///
/// ```rust,no_run
/// use farkle::{FarkleServer, ServerConfig};
///
/// # async fn start() -> Result<(), farkle::FarkleError> {
/// let server = FarkleServer::builder()
///     .config(ServerConfig::from_env()?)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct FarkleServerBuilder {
    config: ServerConfig,
    bind_addr: Option<String>,
    rollers: RollerFactory,
}

impl FarkleServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            bind_addr: None,
            rollers: random_roller_factory(),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the configured host and port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Replaces the dice source for every session. Tests use this to
    /// script rolls.
    pub fn roller_factory(mut self, rollers: RollerFactory) -> Self {
        self.rollers = rollers;
        self
    }

    /// Validates the configuration and binds the listener.
    pub async fn build(self) -> Result<FarkleServer<JsonCodec>, FarkleError> {
        self.config.validate()?;
        let addr = self.bind_addr.unwrap_or_else(|| self.config.bind_addr());
        let transport = WebSocketTransport::bind(&addr).await?;
        let registry = Arc::new(Registry::new(
            self.config.registry.clone(),
            self.config.game.clone(),
            self.rollers,
        ));

        Ok(FarkleServer {
            transport,
            registry,
            codec: JsonCodec,
            send_buffer_size: self.config.send_buffer_size,
        })
    }
}

impl Default for FarkleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Farkle server. Call [`run()`](Self::run) to start serving.
pub struct FarkleServer<C: Codec> {
    transport: WebSocketTransport,
    registry: Arc<Registry>,
    codec: C,
    send_buffer_size: usize,
}

impl FarkleServer<JsonCodec> {
    pub fn builder() -> FarkleServerBuilder {
        FarkleServerBuilder::new()
    }
}

impl<C: Codec> FarkleServer<C> {
    pub fn local_addr(&self) -> Result<SocketAddr, FarkleError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Starts the hub and reaper, then accepts connections until the
    /// listener fails.
    pub async fn run(self) -> Result<(), FarkleError> {
        let Self {
            mut transport,
            registry,
            codec,
            send_buffer_size,
        } = self;

        let (hub_tx, hub_rx) = mpsc::unbounded_channel();
        let fanout = Arc::new(Fanout::new(codec));
        let hub = tokio::spawn(run_hub(hub_rx, Arc::clone(&registry), Arc::clone(&fanout)));
        let reaper = registry.spawn_reaper();

        let state = Arc::new(ServerState {
            registry,
            fanout,
            hub: hub_tx,
            send_buffer_size,
        });

        let addr = transport.local_addr()?;
        tracing::info!(%addr, "Farkle server running");

        let result = loop {
            match transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&state);
                    // The handshake runs here so a stalled peer only holds up its own task.
                    tokio::spawn(async move {
                        let conn = match incoming.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::warn!(error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) if e.is_per_connection() => {
                    tracing::warn!(error = %e, "accept failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "listener failed");
                    break Err(e.into());
                }
            }
        };

        reaper.abort();
        hub.abort();
        result
    }
}
