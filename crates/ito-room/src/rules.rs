//! Game rules: pure functions over a roster or a room snapshot.
//!
//! Nothing here touches the store or the clock directly; callers pass in
//! the random source and the current instant, so every rule is
//! deterministic under test.

use std::collections::{HashMap, HashSet};

use ito_protocol::{
    Card, GamePlayer, GameView, OrderedCard, PublicPlayer, PublicRoomView, Theme,
    ThemeId, VoteCount, VotingPlayer, VotingView,
};
use ito_timer::seconds_until;
use ito_transport::ConnectionId;
use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::time::Instant;

use crate::{Player, Room, RoomError};

/// Highest card value; cards are dealt from `0..=MAX_CARD`.
pub const MAX_CARD: Card = 100;

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Gives every player a distinct card from `0..=100` and hides it.
///
/// # Errors
/// Returns [`RoomError::DeckExhausted`] if there are more players than
/// card values.
pub fn deal_cards(players: &mut [Player], rng: &mut impl Rng) -> Result<(), RoomError> {
    if players.len() > usize::from(MAX_CARD) + 1 {
        return Err(RoomError::DeckExhausted(players.len()));
    }
    let mut used = HashSet::with_capacity(players.len());
    for player in players.iter_mut() {
        let card = loop {
            let candidate = rng.random_range(0..=MAX_CARD);
            if used.insert(candidate) {
                break candidate;
            }
        };
        player.card = Some(card);
        player.revealed = false;
    }
    Ok(())
}

/// Returns `true` if every player has revealed.
pub fn all_revealed(players: &[Player]) -> bool {
    players.iter().all(|p| p.revealed)
}

/// Marks the card held by `connection_id` as revealed.
pub fn reveal_card(players: &mut [Player], connection_id: ConnectionId) -> Option<&Player> {
    let player = players
        .iter_mut()
        .find(|p| p.connection_id == connection_id)?;
    player.revealed = true;
    Some(player)
}

/// Dealt cards in ascending order.
pub fn ordered_reveal(players: &[Player]) -> Vec<OrderedCard> {
    let mut cards: Vec<OrderedCard> = players
        .iter()
        .filter_map(|p| {
            p.card.map(|card| OrderedCard {
                name: p.name.clone(),
                card,
            })
        })
        .collect();
    cards.sort_by_key(|c| c.card);
    cards
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

/// Ballots per offered theme, in offer order. Votes for themes no longer
/// on offer are ignored.
pub fn vote_counts(themes: &[Theme], votes: &HashMap<ConnectionId, ThemeId>) -> Vec<VoteCount> {
    themes
        .iter()
        .map(|theme| VoteCount {
            theme_id: theme.id,
            votes: votes.values().filter(|&&id| id == theme.id).count(),
        })
        .collect()
}

/// The most-voted theme, picking uniformly among ties. `None` when no
/// ballot counts.
pub fn vote_winner(
    themes: &[Theme],
    votes: &HashMap<ConnectionId, ThemeId>,
    rng: &mut impl Rng,
) -> Option<Theme> {
    let counts = vote_counts(themes, votes);
    let best = counts.iter().map(|c| c.votes).max().filter(|&n| n > 0)?;
    let leaders: Vec<&Theme> = themes
        .iter()
        .zip(&counts)
        .filter(|(_, c)| c.votes == best)
        .map(|(t, _)| t)
        .collect();
    leaders.choose(rng).map(|t| (*t).clone())
}

/// A uniformly random theme from `themes`.
pub fn random_theme(themes: &[Theme], rng: &mut impl Rng) -> Option<Theme> {
    themes.choose(rng).cloned()
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// The lobby view for `observer`.
pub fn public_view(room: &Room, observer: ConnectionId) -> PublicRoomView {
    PublicRoomView {
        code: room.code.clone(),
        status: room.status,
        is_host: room.is_host(observer),
        players: room
            .players
            .iter()
            .map(|p| PublicPlayer {
                player_id: p.player_id.clone(),
                name: p.name.clone(),
                is_host: p.player_id == room.host_player_id,
                is_you: p.connection_id == observer,
                disconnected: !p.is_connected(),
            })
            .collect(),
    }
}

/// The voting view for `observer`, with the countdown measured at `now`.
pub fn voting_view(room: &Room, observer: ConnectionId, now: Instant) -> VotingView {
    let themes = room.voting_themes.clone().unwrap_or_default();
    VotingView {
        code: room.code.clone(),
        status: room.status,
        is_host: room.is_host(observer),
        drawn_number: room.drawn_number,
        vote_counts: vote_counts(&themes, &room.votes),
        themes,
        has_voted: room.votes.contains_key(&observer),
        my_vote: room.votes.get(&observer).copied(),
        selected_theme: room.selected_theme.clone(),
        countdown_seconds: room
            .majority_countdown_end
            .map(|end| seconds_until(end, now)),
        players: room
            .players
            .iter()
            .map(|p| VotingPlayer {
                player_id: p.player_id.clone(),
                name: p.name.clone(),
                is_host: p.player_id == room.host_player_id,
                is_you: p.connection_id == observer,
                has_voted: room.votes.contains_key(&p.connection_id),
                disconnected: !p.is_connected(),
            })
            .collect(),
    }
}

/// The in-round view for `observer`: their own card plus every revealed
/// card; all other cards are hidden.
pub fn game_view(room: &Room, observer: ConnectionId) -> GameView {
    GameView {
        code: room.code.clone(),
        status: room.status,
        is_host: room.is_host(observer),
        selected_theme: room.selected_theme.clone(),
        drawn_number: room.drawn_number,
        players: room
            .players
            .iter()
            .map(|p| {
                let is_you = p.connection_id == observer;
                GamePlayer {
                    player_id: p.player_id.clone(),
                    name: p.name.clone(),
                    is_host: p.player_id == room.host_player_id,
                    is_you,
                    card: if is_you || p.revealed { p.card } else { None },
                    revealed: p.revealed,
                    disconnected: !p.is_connected(),
                }
            })
            .collect(),
    }
}
