//! ito server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on 0.0.0.0:3001 with Portuguese messages
//! ito-server
//!
//! # Custom address and English messages
//! ITO_BIND=127.0.0.1:9000 ITO_LOCALE=en RUST_LOG=debug ito-server
//! ```

use ito::{ItoError, ItoServer};
use ito_protocol::Locale;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ItoError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let bind = bind_addr();
    let locale = locale();
    tracing::info!(%bind, ?locale, "ito server starting");

    let server = ItoServer::builder().bind(&bind).locale(locale).build().await?;
    tracing::info!("listening on {}", server.local_addr().map_err(ito_transport::TransportError::AcceptFailed)?);
    server.run().await
}

fn bind_addr() -> String {
    if let Ok(addr) = std::env::var("ITO_BIND") {
        return addr;
    }
    let port: u16 = std::env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(3001);
    format!("0.0.0.0:{port}")
}

fn locale() -> Locale {
    match std::env::var("ITO_LOCALE") {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!(value = %raw, error = %e, "unknown ITO_LOCALE, using default");
            Locale::default()
        }),
        Err(_) => Locale::default(),
    }
}
