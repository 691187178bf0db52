//! `TyperaceServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → hub → race registry.

use std::sync::Arc;
use std::time::Duration;

use typerace_protocol::{Codec, JsonCodec};
use typerace_race::{FixedPassage, PassageSource, RaceConfig, RaceRegistry};
use typerace_transport::{Incoming, Transport, WebSocketTransport};

use crate::TyperaceError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::hub::{HubHandle, HubStats, spawn_hub};

/// Shared state handed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) hub: HubHandle,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Typerace server.
///
/// # Example
///
/// ```rust,no_run
/// use typerace::prelude::*;
///
/// # async fn run() -> Result<(), TyperaceError> {
/// let server = TyperaceServer::builder()
///     .bind("0.0.0.0:3000")
///     .race_config(RaceConfig::default())
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TyperaceServerBuilder<S: PassageSource = FixedPassage> {
    config: ServerConfig,
    race: RaceConfig,
    passages: S,
}

impl TyperaceServerBuilder<FixedPassage> {
    /// Creates a builder with default settings and the built-in passage.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            race: RaceConfig::default(),
            passages: FixedPassage::default(),
        }
    }
}

impl Default for TyperaceServerBuilder<FixedPassage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: PassageSource> TyperaceServerBuilder<S> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Drops connections silent for longer than `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn race_config(mut self, race: RaceConfig) -> Self {
        self.race = race;
        self
    }

    /// Replaces where race text comes from.
    pub fn passages<T: PassageSource>(self, passages: T) -> TyperaceServerBuilder<T> {
        TyperaceServerBuilder {
            config: self.config,
            race: self.race,
            passages,
        }
    }

    /// Validates the race settings, binds the listener, and starts the
    /// dispatcher.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<TyperaceServer<JsonCodec>, TyperaceError> {
        self.race.validate()?;

        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout);
        let registry = RaceRegistry::with_passages(self.race, self.passages);
        let hub = spawn_hub(registry, self.config.hub_channel_size);

        let state = Arc::new(ServerState {
            hub,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(TyperaceServer { transport, state })
    }
}

/// A bound Typerace server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TyperaceServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl TyperaceServer<JsonCodec> {
    pub fn builder() -> TyperaceServerBuilder {
        TyperaceServerBuilder::new()
    }
}

impl<C> TyperaceServer<C>
where
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle for querying the dispatcher while the server runs.
    pub fn stats_handle(&self) -> StatsHandle {
        StatsHandle {
            hub: self.state.hub.clone(),
        }
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), TyperaceError> {
        tracing::info!(addr = %self.state.config.bind_addr, "Typerace server running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer = incoming.peer_addr();
                        let result = match incoming.upgrade().await {
                            Ok(conn) => handle_connection(conn, state).await,
                            Err(e) => Err(e.into()),
                        };
                        if let Err(e) = result {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Read-only access to live room and connection counts.
#[derive(Clone)]
pub struct StatsHandle {
    hub: HubHandle,
}

impl StatsHandle {
    pub async fn stats(&self) -> Result<HubStats, TyperaceError> {
        self.hub.stats().await
    }
}
