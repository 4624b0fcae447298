//! Per-connection handler: handshake, outbound writer, and request routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version → send HandshakeAck
//!   2. Register an outbound channel with the coordinator and spawn the
//!      writer task that drains it onto the socket
//!   3. Loop: receive envelopes → answer heartbeats, route requests
//!
//! A `HealthCheck` in place of the handshake gets a `Health` reply and the
//! socket is closed; monitors use this to probe the server.
//!
//! After the handshake every outgoing frame (acks, broadcasts, heartbeat
//! replies, protocol errors) travels through the one outbound channel, so
//! a single writer assigns `seq` and a client sees every event its request
//! caused before the request's ack.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ito_protocol::{AckFrame, Codec, Envelope, Payload, ProtocolError, Request};
use ito_session::Outbound;
use ito_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ItoError;
use crate::coordinator::Coordinator;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// How long a client may stay silent before it is dropped. Clients
/// heartbeat well inside this.
const IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// How long a fresh socket has to send its handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drop guard that tells the coordinator a connection went away.
///
/// Runs even if the handler panics. Since `Drop` is synchronous, we spawn
/// a fire-and-forget task for the async lock.
struct SessionGuard {
    connection_id: ConnectionId,
    coordinator: Arc<Coordinator>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let connection_id = self.connection_id;
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            coordinator.disconnect(connection_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ItoError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let start = Instant::now();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Handshake ---
    if let Opening::HealthCheck = perform_handshake(&conn, &state, &start).await? {
        tracing::debug!(%conn_id, "answered health check");
        if let Err(e) = conn.close().await {
            tracing::debug!(%conn_id, error = %e, "close after health check failed");
        }
        return Ok(());
    }
    tracing::info!(%conn_id, "client connected");

    // --- Step 2: Outbound channel ---
    let (tx, rx) = mpsc::unbounded_channel();
    state.coordinator.connect(conn_id, tx.clone()).await?;
    let _guard = SessionGuard {
        connection_id: conn_id,
        coordinator: Arc::clone(&state.coordinator),
    };
    let writer = tokio::spawn(write_outbound(
        Arc::clone(&conn),
        Arc::clone(&state),
        rx,
        start,
    ));

    // --- Step 3: Message loop ---
    loop {
        let data = match tokio::time::timeout(IDLE_TIMEOUT, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let reply = match state.codec.decode::<Envelope>(&data) {
            Ok(envelope) => match envelope.payload {
                Payload::Heartbeat { client_time } => Outbound::Frame(Payload::HeartbeatAck {
                    client_time,
                    server_time: elapsed_ms(&start),
                }),
                Payload::HealthCheck => Outbound::Frame(health(&state.coordinator).await),
                Payload::Request(Request { ack_id, call }) => {
                    tracing::debug!(%conn_id, ack_id, request = call.name(), "request received");
                    let ack = state.coordinator.handle(conn_id, call).await;
                    Outbound::Ack { ack_id, ack }
                }
                _ => {
                    tracing::debug!(%conn_id, "ignoring unexpected payload");
                    error_frame(400, "unexpected payload")
                }
            },
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                error_frame(400, &format!("invalid frame: {e}"))
            }
        };

        if tx.send(reply).is_err() {
            tracing::debug!(%conn_id, "writer gone, closing");
            break;
        }
    }

    writer.abort();
    // _guard drops here → coordinator disconnect fires.
    Ok(())
}

/// What the first frame of a connection asked for.
enum Opening {
    /// A game client: handshake accepted.
    Handshake,
    /// A monitor: health reported, nothing more to do.
    HealthCheck,
}

/// Performs the initial handshake: receive Handshake, validate, send Ack.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    start: &Instant,
) -> Result<Opening, ItoError> {
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before handshake".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;
    if let Payload::HealthCheck = envelope.payload {
        let report = Envelope {
            seq: 0,
            timestamp: elapsed_ms(start),
            payload: health(&state.coordinator).await,
        };
        conn.send(&state.codec.encode(&report)?).await?;
        return Ok(Opening::HealthCheck);
    }
    let Payload::Handshake { version } = envelope.payload else {
        send_error(conn, &state.codec, 400, "expected Handshake", start).await?;
        return Err(ProtocolError::InvalidMessage("first message must be Handshake".into()).into());
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let ack = Envelope {
        seq: 0,
        timestamp: elapsed_ms(start),
        payload: Payload::HandshakeAck {
            connection_id: conn.id().into_inner(),
            server_time: elapsed_ms(start),
        },
    };
    let ack_bytes = state.codec.encode(&ack)?;
    conn.send(&ack_bytes).await?;
    Ok(Opening::Handshake)
}

/// Drains the connection's outbound channel onto the socket.
async fn write_outbound<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    start: Instant,
) {
    let conn_id = conn.id();
    // The HandshakeAck went out as seq 0.
    let mut seq = 1;
    while let Some(msg) = rx.recv().await {
        let payload = match msg {
            Outbound::Event(event) => Payload::Event(event),
            Outbound::Ack { ack_id, ack } => Payload::Ack(AckFrame { ack_id, ack }),
            Outbound::Frame(payload) => payload,
        };
        let envelope = Envelope {
            seq,
            timestamp: elapsed_ms(&start),
            payload,
        };
        seq += 1;
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound frame");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Sends a protocol-level `Error` envelope before the writer task exists.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
    start: &Instant,
) -> Result<(), ItoError> {
    let envelope = Envelope {
        seq: 0,
        timestamp: elapsed_ms(start),
        payload: Payload::Error {
            code,
            message: message.to_string(),
        },
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn error_frame(code: u16, message: &str) -> Outbound {
    Outbound::Frame(Payload::Error {
        code,
        message: message.to_string(),
    })
}

/// The server's liveness report.
async fn health(coordinator: &Coordinator) -> Payload {
    Payload::Health {
        status: "ok".to_string(),
        rooms: coordinator.room_count().await,
    }
}

fn elapsed_ms(start: &Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
