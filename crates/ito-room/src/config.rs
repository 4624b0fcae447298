//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every room on a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Minimum players required to start a round.
    pub min_players: usize,

    /// Maximum players allowed in a room.
    pub max_players: usize,

    /// How long a disconnected player keeps their seat. The same window
    /// applies to a room whose members are all disconnected.
    pub reconnect_grace: Duration,

    /// Delay before a vote backed by a majority resolves on its own.
    pub majority_countdown: Duration,

    /// Themes offered on each side of the drawn number.
    pub theme_radius: u32,

    /// Longest accepted display name, in characters.
    pub max_name_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 8,
            reconnect_grace: Duration::from_secs(30 * 60),
            majority_countdown: Duration::from_secs(30),
            theme_radius: 2,
            max_name_len: 20,
        }
    }
}

impl RoomConfig {
    /// Trims `raw` and checks it against `max_name_len`.
    pub fn validate_name(&self, raw: &str) -> Option<String> {
        let name = raw.trim();
        let chars = name.chars().count();
        (chars > 0 && chars <= self.max_name_len).then(|| name.to_owned())
    }
}
