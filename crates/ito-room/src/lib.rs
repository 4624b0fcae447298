//! Room state for the ito party server.
//!
//! The authoritative data layer: every live room, its roster, its phase,
//! and the rules that act on them.
//!
//! # Key types
//!
//! - [`RoomStore`]: owns all rooms; the only way to mutate one
//! - [`Room`] / [`Player`]: read-only records handed out by the store
//! - [`rules`]: card dealing, reveal ordering, vote counting and the
//!   per-observer view projections
//! - [`ThemeCatalog`]: the static theme table and its windowed lookup
//! - [`RoomConfig`]: player limits, grace windows, countdown length
//! - [`RoomError`]: classified, localized rejections

mod config;
mod error;
mod room;
pub mod rules;
mod store;
mod themes;

pub use config::RoomConfig;
pub use error::RoomError;
pub use room::{Player, Room};
pub use store::{
    CODE_ALPHABET, CODE_LEN, Departure, Disconnection, JoinKind, Reconnection, Reveal,
    RoomStore, VoteTally,
};
pub use themes::ThemeCatalog;
