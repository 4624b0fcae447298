//! `ItoServer` builder and server loop.
//!
//! This is the entry point for running an ito party server. It ties
//! together all the layers: transport → protocol → coordinator.

use std::sync::Arc;

use ito_protocol::{Codec, JsonCodec, Locale};
use ito_room::RoomConfig;
use ito_transport::{Transport, WebSocketTransport};

use crate::ItoError;
use crate::coordinator::Coordinator;
use crate::handler::handle_connection;

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting an ito server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), ito::ItoError> {
/// use ito::ItoServer;
///
/// let server = ItoServer::builder().bind("0.0.0.0:3001").build().await?;
/// server.run().await
/// # }
/// ```
pub struct ItoServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    locale: Locale,
}

impl ItoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            room_config: RoomConfig::default(),
            locale: Locale::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets player limits, grace windows and the countdown length.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the language of rejection messages.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`, the pair browsers speak.
    pub async fn build(self) -> Result<ItoServer, ItoError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let state = Arc::new(ServerState {
            coordinator: Coordinator::new(self.room_config, self.locale),
            codec: JsonCodec,
        });
        Ok(ItoServer { transport, state })
    }
}

impl Default for ItoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound ito server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ItoServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<JsonCodec>>,
}

impl ItoServer {
    /// Creates a new builder.
    pub fn builder() -> ItoServerBuilder {
        ItoServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The coordinator shared by every connection.
    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.state.coordinator)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ItoError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "ito server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
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
