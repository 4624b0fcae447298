//! Connection session tracking for the ito party server.
//!
//! This crate handles the server side of every live socket:
//!
//! 1. **Outbound delivery** ([`Outbound`], [`OutboundSender`]): one
//!    unbounded channel per connection, drained by its writer task
//! 2. **Session tracking** ([`SessionManager`]): who is connected
//!
//! Player identity is NOT tracked here. Players carry a stable
//! client-generated id that the room store maps to whatever connection
//! currently represents them.
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← pushes room broadcasts through sessions
//!     ↕
//! Session Layer (this crate)  ← connection id → outbound channel
//!     ↕
//! Protocol Layer (below)  ← provides ServerEvent, Ack, RoomCode
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Outbound, OutboundSender, Session};
