//! # ito
//!
//! Real-time room coordinator for the ito party game.
//!
//! Players gather in a room under a four-character code, draw and vote on
//! a theme, receive secret cards from 0 to 100, and reveal them. The
//! server owns every room and every decision; browsers only send
//! requests and render the per-player views pushed back to them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ito::prelude::*;
//!
//! # async fn run() -> Result<(), ItoError> {
//! let server = ItoServer::builder()
//!     .bind("0.0.0.0:3001")
//!     .locale(Locale::En)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod coordinator;
mod error;
mod handler;
mod server;

pub use coordinator::Coordinator;
pub use error::ItoError;
pub use server::{ItoServer, ItoServerBuilder, PROTOCOL_VERSION};

/// Common imports for running a server or driving a coordinator.
pub mod prelude {
    pub use crate::{Coordinator, ItoError, ItoServer, ItoServerBuilder};
    pub use ito_protocol::{Ack, ClientRequest, Locale, PlayerId, RoomCode, RoomStatus, ServerEvent};
    pub use ito_room::RoomConfig;
    pub use ito_session::Outbound;
}
