//! Integration tests for the coordinator: request handling, broadcasts,
//! disconnect grace and the majority countdown, driven through in-memory
//! outbound channels.

use std::sync::Arc;
use std::time::Duration;

use ito::Coordinator;
use ito_protocol::{
    Ack, ClientRequest, ErrorKind, Locale, PlayerId, RejoinPhase, RoomCode, RoomStatus,
    ServerEvent,
};
use ito_room::{RoomConfig, ThemeCatalog};
use ito_session::Outbound;
use ito_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn coordinator() -> Arc<Coordinator> {
    Coordinator::with_parts(
        RoomConfig::default(),
        ThemeCatalog::builtin(),
        Locale::En,
        StdRng::seed_from_u64(7),
    )
}

/// One fake connection: its id and the receiving end of its outbound
/// channel.
struct Client {
    conn: ConnectionId,
    player_id: PlayerId,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl Client {
    async fn connect(coord: &Arc<Coordinator>, conn: u64, player: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ConnectionId::new(conn);
        coord.connect(conn, tx).await.unwrap();
        Self {
            conn,
            player_id: PlayerId::from(player),
            rx,
        }
    }

    async fn send(&self, coord: &Arc<Coordinator>, request: ClientRequest) -> Ack {
        coord.handle(self.conn, request).await
    }

    /// Every event queued so far.
    fn events(&mut self) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let Outbound::Event(event) = msg {
                out.push(event);
            }
        }
        out
    }

    fn name(&self) -> String {
        self.player_id.as_str().to_uppercase()
    }
}

fn create(client: &Client) -> ClientRequest {
    ClientRequest::CreateRoom {
        player_name: client.name(),
        player_id: client.player_id.clone(),
    }
}

fn join(client: &Client, code: &RoomCode) -> ClientRequest {
    ClientRequest::JoinRoom {
        code: code.clone(),
        player_name: client.name(),
        player_id: client.player_id.clone(),
    }
}

fn rejoin(client: &Client, code: &RoomCode) -> ClientRequest {
    ClientRequest::RejoinRoom {
        code: code.clone(),
        player_name: client.name(),
        player_id: client.player_id.clone(),
    }
}

/// A lobby of `n` clients on connections `1..=n` with player ids
/// `p1..pn`. Client 0 is host. Event queues are drained.
async fn lobby(coord: &Arc<Coordinator>, n: u64) -> (Vec<Client>, RoomCode) {
    let host = Client::connect(coord, 1, "p1").await;
    let ack = host.send(coord, create(&host)).await;
    let code = ack.room.expect("create returns room").code;
    let mut clients = vec![host];
    for i in 2..=n {
        let c = Client::connect(coord, i, &format!("p{i}")).await;
        let ack = c.send(coord, join(&c, &code)).await;
        assert!(ack.success, "join failed: {:?}", ack.error);
        clients.push(c);
    }
    for c in &mut clients {
        c.events();
    }
    (clients, code)
}

/// A room of `n` clients in the voting phase. Event queues are drained.
async fn voting(coord: &Arc<Coordinator>, n: u64) -> (Vec<Client>, RoomCode) {
    let (mut clients, code) = lobby(coord, n).await;
    assert!(clients[0].send(coord, ClientRequest::StartGame(code.clone())).await.success);
    assert!(
        clients[0]
            .send(coord, ClientRequest::DrawAnimationComplete(code.clone()))
            .await
            .success
    );
    for c in &mut clients {
        c.events();
    }
    (clients, code)
}

/// A room of `n` clients with cards dealt. Event queues are drained.
async fn playing(coord: &Arc<Coordinator>, n: u64) -> (Vec<Client>, RoomCode) {
    let (mut clients, code) = voting(coord, n).await;
    let ack = clients[0]
        .send(coord, ClientRequest::SkipVoting(code.clone()))
        .await;
    assert!(ack.success);
    for c in &mut clients {
        c.events();
    }
    (clients, code)
}

async fn status(coord: &Arc<Coordinator>, code: &RoomCode) -> RoomStatus {
    coord.room(code).await.expect("room exists").status()
}

/// Lets spawned timer tasks run after the clock moved.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn first_voting_theme(events: &[ServerEvent]) -> u32 {
    events
        .iter()
        .find_map(|e| match e {
            ServerEvent::VotingStarted(v) => v.themes.first().map(|t| t.id),
            _ => None,
        })
        .expect("voting-started")
}

// =========================================================================
// Membership
// =========================================================================

#[tokio::test]
async fn test_create_room_acks_lobby_view_with_host_flag() {
    let coord = coordinator();
    let host = Client::connect(&coord, 1, "p1").await;

    let ack = host.send(&coord, create(&host)).await;

    assert!(ack.success);
    let room = ack.room.unwrap();
    assert_eq!(room.code.as_str().len(), 4);
    assert_eq!(room.status, RoomStatus::Lobby);
    assert!(room.is_host);
    assert_eq!(room.players.len(), 1);
    assert!(room.players[0].is_you);
}

#[tokio::test]
async fn test_join_broadcasts_to_others_only() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 1).await;
    let mut guest = Client::connect(&coord, 2, "p2").await;

    let ack = guest.send(&coord, join(&guest, &code)).await;

    assert!(ack.success);
    assert!(!ack.room.unwrap().is_host);
    let host_events = clients[0].events();
    assert!(matches!(
        &host_events[..],
        [ServerEvent::PlayerJoined { player, room }]
            if player.player_id == guest.player_id && room.players.len() == 2 && room.is_host
    ));
    assert!(guest.events().is_empty());
}

#[tokio::test]
async fn test_join_unknown_room_is_rejected_with_localized_message() {
    let coord = coordinator();
    let guest = Client::connect(&coord, 1, "p1").await;

    let ack = guest.send(&coord, join(&guest, &RoomCode::from("ZZZZ"))).await;

    assert!(!ack.success);
    assert_eq!(ack.kind, Some(ErrorKind::NotFound));
    assert_eq!(ack.error.as_deref(), Some("Room not found"));
}

#[tokio::test]
async fn test_portuguese_locale_messages() {
    let coord = Coordinator::with_parts(
        RoomConfig::default(),
        ThemeCatalog::builtin(),
        Locale::Pt,
        StdRng::seed_from_u64(1),
    );
    let guest = Client::connect(&coord, 1, "p1").await;

    let ack = guest.send(&coord, join(&guest, &RoomCode::from("ZZZZ"))).await;

    assert_eq!(ack.error.as_deref(), Some("Sala não encontrada"));
}

#[tokio::test]
async fn test_creating_again_leaves_previous_room() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 2).await;

    let ack = clients[1].send(&coord, create(&clients[1])).await;

    assert!(ack.success);
    assert_ne!(ack.room.unwrap().code, code);
    assert_eq!(coord.room(&code).await.unwrap().players().len(), 1);
    assert!(matches!(&clients[0].events()[..], [ServerEvent::PlayerLeft { .. }]));
}

#[tokio::test]
async fn test_failed_join_keeps_current_seat() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 2).await;

    let ack = clients[1]
        .send(&coord, join(&clients[1], &RoomCode::from("ZZZZ")))
        .await;

    assert!(!ack.success);
    assert_eq!(coord.room(&code).await.unwrap().players().len(), 2);
    assert!(clients[0].events().is_empty());
}

#[tokio::test]
async fn test_kick_notifies_target_and_room() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 3).await;
    let target = clients[2].player_id.clone();

    let ack = clients[0]
        .send(
            &coord,
            ClientRequest::KickPlayer {
                code: code.clone(),
                target_player_id: target.clone(),
            },
        )
        .await;

    assert!(ack.success);
    assert_eq!(ack.room.unwrap().players.len(), 2);
    assert!(matches!(
        &clients[2].events()[..],
        [ServerEvent::KickedFromRoom { message, .. }]
            if message == "You were removed from the room by the host"
    ));
    assert!(matches!(
        &clients[1].events()[..],
        [ServerEvent::PlayerLeft { player, .. }] if player.player_id == target
    ));
}

#[tokio::test]
async fn test_kick_by_guest_is_unauthorized() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 2).await;

    let ack = clients[1]
        .send(
            &coord,
            ClientRequest::KickPlayer {
                code,
                target_player_id: clients[0].player_id.clone(),
            },
        )
        .await;

    assert_eq!(ack.kind, Some(ErrorKind::Unauthorized));
}

#[tokio::test]
async fn test_leave_last_player_deletes_room() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 1).await;

    let ack = clients[0].send(&coord, ClientRequest::LeaveRoom(code.clone())).await;

    assert!(ack.success);
    assert!(coord.room(&code).await.is_none());
    assert_eq!(coord.room_count().await, 0);
}

#[tokio::test]
async fn test_leave_by_non_member_is_not_found() {
    let coord = coordinator();
    let (_clients, code) = lobby(&coord, 1).await;
    let stranger = Client::connect(&coord, 9, "p9").await;

    let ack = stranger.send(&coord, ClientRequest::LeaveRoom(code)).await;

    assert_eq!(ack.kind, Some(ErrorKind::NotFound));
}

// =========================================================================
// Theme selection
// =========================================================================

#[tokio::test]
async fn test_start_requires_host_and_enough_players() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 1).await;
    let ack = clients[0].send(&coord, ClientRequest::StartGame(code.clone())).await;
    assert_eq!(ack.kind, Some(ErrorKind::Capacity));
    assert_eq!(ack.error.as_deref(), Some("At least 2 players required"));

    let mut guest = Client::connect(&coord, 2, "p2").await;
    guest.send(&coord, join(&guest, &code)).await;
    let ack = guest.send(&coord, ClientRequest::StartGame(code.clone())).await;
    assert_eq!(ack.kind, Some(ErrorKind::Unauthorized));
    assert!(guest.events().is_empty());
    assert_eq!(status(&coord, &code).await, RoomStatus::Lobby);
}

#[tokio::test]
async fn test_start_broadcasts_draw_number() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 2).await;

    let ack = clients[0].send(&coord, ClientRequest::StartGame(code.clone())).await;

    assert!(ack.success);
    assert_eq!(status(&coord, &code).await, RoomStatus::Drawing);
    for c in &mut clients {
        assert!(matches!(
            &c.events()[..],
            [ServerEvent::DrawNumber { drawn_number, .. }] if (1..=120).contains(drawn_number)
        ));
    }
}

#[tokio::test]
async fn test_start_twice_is_wrong_phase() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 2).await;
    clients[0].send(&coord, ClientRequest::StartGame(code.clone())).await;

    let ack = clients[0].send(&coord, ClientRequest::StartGame(code)).await;

    assert_eq!(ack.kind, Some(ErrorKind::InvalidPhase));
}

#[tokio::test]
async fn test_draw_complete_from_guest_is_ignored() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 2).await;
    clients[0].send(&coord, ClientRequest::StartGame(code.clone())).await;
    clients[1].events();

    let ack = clients[1]
        .send(&coord, ClientRequest::DrawAnimationComplete(code.clone()))
        .await;

    assert!(ack.success);
    assert_eq!(status(&coord, &code).await, RoomStatus::Drawing);
    assert!(clients[1].events().is_empty());
}

#[tokio::test]
async fn test_draw_complete_from_host_opens_voting_window() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 2).await;
    clients[0].send(&coord, ClientRequest::StartGame(code.clone())).await;
    clients[1].events();

    clients[0]
        .send(&coord, ClientRequest::DrawAnimationComplete(code.clone()))
        .await;

    assert_eq!(status(&coord, &code).await, RoomStatus::Voting);
    let events = clients[1].events();
    let [ServerEvent::VotingStarted(view)] = &events[..] else {
        panic!("expected voting-started, got {events:?}");
    };
    assert_eq!(view.themes.len(), 5);
    assert!(!view.is_host);
    assert_eq!(view.countdown_seconds, None);
    let drawn = view.drawn_number.unwrap();
    assert!(view.themes.iter().any(|t| t.id == drawn));
}

#[tokio::test]
async fn test_change_theme_number_validates_range() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 2).await;

    let ack = clients[0]
        .send(
            &coord,
            ClientRequest::ChangeThemeNumber {
                code: code.clone(),
                new_number: Some(121),
            },
        )
        .await;

    assert_eq!(ack.kind, Some(ErrorKind::Validation));
    assert_eq!(ack.error.as_deref(), Some("Number must be between 1 and 120"));
}

#[tokio::test]
async fn test_change_theme_number_offers_new_window_and_clears_votes() {
    let coord = coordinator();
    let (mut clients, code) = voting(&coord, 3).await;
    let events_before = {
        clients[0]
            .send(
                &coord,
                ClientRequest::ChangeThemeNumber {
                    code: code.clone(),
                    new_number: Some(50),
                },
            )
            .await;
        clients[1].events()
    };
    let theme = first_voting_theme(&events_before);
    clients[1]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
        .await;
    clients[1].events();

    let ack = clients[0]
        .send(
            &coord,
            ClientRequest::ChangeThemeNumber {
                code: code.clone(),
                new_number: Some(1),
            },
        )
        .await;

    assert_eq!(ack.drawn_number, Some(1));
    let events = clients[1].events();
    let [ServerEvent::VotingStarted(view)] = &events[..] else {
        panic!("expected voting-started, got {events:?}");
    };
    assert_eq!(view.themes.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert!(!view.has_voted);
    assert!(view.vote_counts.iter().all(|c| c.votes == 0));
}

#[tokio::test]
async fn test_change_theme_number_without_number_draws_randomly() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 2).await;

    let ack = clients[0]
        .send(
            &coord,
            ClientRequest::ChangeThemeNumber {
                code: code.clone(),
                new_number: None,
            },
        )
        .await;

    assert!(ack.success);
    let n = ack.drawn_number.unwrap();
    assert!((1..=120).contains(&n));
    assert_eq!(coord.room(&code).await.unwrap().drawn_number(), Some(n));
}

#[tokio::test]
async fn test_votes_from_everyone_start_the_game() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 2).await;
    clients[0].send(&coord, ClientRequest::StartGame(code.clone())).await;
    clients[0]
        .send(&coord, ClientRequest::DrawAnimationComplete(code.clone()))
        .await;
    let theme = first_voting_theme(&clients[0].events());
    clients[1].events();

    let ack = clients[0]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
        .await;
    assert!(ack.success);
    clients[0].events();
    assert!(matches!(
        &clients[1].events()[..],
        [ServerEvent::VoteUpdate(view)] if view.countdown_seconds.is_none()
            && view.vote_counts.iter().any(|c| c.theme_id == theme && c.votes == 1)
    ));

    clients[1]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
        .await;

    assert_eq!(status(&coord, &code).await, RoomStatus::Playing);
    for c in &mut clients {
        let events = c.events();
        let [ServerEvent::GameStarted(view)] = &events[..] else {
            panic!("expected game-started, got {events:?}");
        };
        assert_eq!(view.selected_theme.as_ref().map(|t| t.id), Some(theme));
        let me = view.players.iter().find(|p| p.is_you).unwrap();
        assert!(me.card.is_some());
        assert!(view.players.iter().filter(|p| !p.is_you).all(|p| p.card.is_none()));
    }
}

#[tokio::test]
async fn test_vote_outside_voting_is_wrong_phase() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 2).await;

    let ack = clients[1]
        .send(&coord, ClientRequest::VoteTheme { code, theme_id: 1 })
        .await;

    assert_eq!(ack.kind, Some(ErrorKind::InvalidPhase));
}

#[tokio::test]
async fn test_vote_for_theme_not_offered_is_not_found() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 2).await;
    let room = coord.room(&code).await.unwrap();
    let offered: Vec<u32> = room.voting_themes().unwrap().iter().map(|t| t.id).collect();
    let outside = (1..=120).find(|id| !offered.contains(id)).unwrap();

    let ack = clients[1]
        .send(&coord, ClientRequest::VoteTheme { code, theme_id: outside })
        .await;

    assert_eq!(ack.kind, Some(ErrorKind::NotFound));
}

#[tokio::test(start_paused = true)]
async fn test_majority_countdown_resolves_vote() {
    let coord = coordinator();
    let (mut clients, code) = voting(&coord, 3).await;
    let theme = coord.room(&code).await.unwrap().voting_themes().unwrap()[1].id;

    clients[0]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
        .await;
    clients[1]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
        .await;

    let events = clients[2].events();
    assert!(matches!(
        events.last(),
        Some(ServerEvent::VoteUpdate(view)) if view.countdown_seconds == Some(30)
    ));
    assert!(coord.room(&code).await.unwrap().majority_countdown_end().is_some());

    tokio::time::sleep(Duration::from_secs(29)).await;
    settle().await;
    assert_eq!(status(&coord, &code).await, RoomStatus::Voting);

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(status(&coord, &code).await, RoomStatus::Playing);
    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.selected_theme().map(|t| t.id), Some(theme));
    assert!(clients[2].events().iter().any(|e| matches!(e, ServerEvent::GameStarted(_))));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_does_not_restart_on_later_votes() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 5).await;
    let theme = coord.room(&code).await.unwrap().voting_themes().unwrap()[0].id;

    for c in &clients[..3] {
        c.send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
            .await;
    }
    let first_deadline = coord.room(&code).await.unwrap().majority_countdown_end();

    tokio::time::sleep(Duration::from_secs(10)).await;
    clients[3]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
        .await;

    assert_eq!(coord.room(&code).await.unwrap().majority_countdown_end(), first_deadline);
}

#[tokio::test(start_paused = true)]
async fn test_changing_number_cancels_countdown() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 3).await;
    let theme = coord.room(&code).await.unwrap().voting_themes().unwrap()[0].id;
    for c in &clients[..2] {
        c.send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
            .await;
    }

    clients[0]
        .send(
            &coord,
            ClientRequest::ChangeThemeNumber {
                code: code.clone(),
                new_number: Some(60),
            },
        )
        .await;
    tokio::time::sleep(Duration::from_secs(31)).await;
    settle().await;

    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.status(), RoomStatus::Voting);
    assert_eq!(room.majority_countdown_end(), None);
}

#[tokio::test]
async fn test_skip_voting_picks_theme_from_window() {
    let coord = coordinator();
    let (mut clients, code) = voting(&coord, 2).await;
    let offered: Vec<u32> = coord
        .room(&code)
        .await
        .unwrap()
        .voting_themes()
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();

    let ack = clients[1].send(&coord, ClientRequest::SkipVoting(code.clone())).await;
    assert_eq!(ack.kind, Some(ErrorKind::Unauthorized));

    let ack = clients[0].send(&coord, ClientRequest::SkipVoting(code.clone())).await;
    assert!(ack.success);
    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.status(), RoomStatus::Playing);
    assert!(offered.contains(&room.selected_theme().unwrap().id));
    assert!(matches!(&clients[1].events()[..], [ServerEvent::GameStarted(_)]));
}

#[tokio::test]
async fn test_force_start_with_offered_theme_uses_it() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 2).await;
    let theme = coord.room(&code).await.unwrap().voting_themes().unwrap()[4].id;

    let ack = clients[0]
        .send(
            &coord,
            ClientRequest::ForceStartGame {
                code: code.clone(),
                theme_id: Some(theme),
            },
        )
        .await;

    assert!(ack.success);
    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.selected_theme().unwrap().id, theme);
}

#[tokio::test]
async fn test_force_start_with_theme_outside_window_falls_back_to_leader() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 3).await;
    let offered: Vec<u32> = coord
        .room(&code)
        .await
        .unwrap()
        .voting_themes()
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    let outside = (1..=120).find(|id| !offered.contains(id)).unwrap();
    clients[1]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: offered[2] })
        .await;

    let ack = clients[0]
        .send(
            &coord,
            ClientRequest::ForceStartGame {
                code: code.clone(),
                theme_id: Some(outside),
            },
        )
        .await;

    assert!(ack.success);
    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.selected_theme().unwrap().id, offered[2]);
}

#[tokio::test]
async fn test_force_start_without_theme_uses_vote_leader() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 3).await;
    let theme = coord.room(&code).await.unwrap().voting_themes().unwrap()[3].id;
    clients[1]
        .send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
        .await;

    clients[0]
        .send(
            &coord,
            ClientRequest::ForceStartGame {
                code: code.clone(),
                theme_id: None,
            },
        )
        .await;

    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.selected_theme().unwrap().id, theme);
}

// =========================================================================
// Round
// =========================================================================

#[tokio::test]
async fn test_reveals_finish_round_in_card_order() {
    let coord = coordinator();
    let (mut clients, code) = playing(&coord, 3).await;

    for c in &clients[..2] {
        assert!(c.send(&coord, ClientRequest::RevealCard(code.clone())).await.success);
    }
    let events = clients[2].events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(e, ServerEvent::CardRevealed { .. })));

    clients[2].send(&coord, ClientRequest::RevealCard(code.clone())).await;

    assert_eq!(status(&coord, &code).await, RoomStatus::Reveal);
    let events = clients[0].events();
    let Some(ServerEvent::AllRevealed { ordered_cards }) = events.last() else {
        panic!("expected all-revealed, got {events:?}");
    };
    assert_eq!(ordered_cards.len(), 3);
    assert!(ordered_cards.windows(2).all(|w| w[0].card <= w[1].card));
}

#[tokio::test]
async fn test_revealed_card_is_visible_to_everyone() {
    let coord = coordinator();
    let (mut clients, code) = playing(&coord, 2).await;
    let card = coord
        .room(&code)
        .await
        .unwrap()
        .player_by_id(&clients[1].player_id)
        .unwrap()
        .card();

    clients[1].send(&coord, ClientRequest::RevealCard(code.clone())).await;

    let events = clients[0].events();
    let [ServerEvent::CardRevealed { player, game_state }] = &events[..] else {
        panic!("expected card-revealed, got {events:?}");
    };
    assert_eq!(Some(player.card), card);
    let other = game_state
        .players
        .iter()
        .find(|p| p.player_id == clients[1].player_id)
        .unwrap();
    assert!(other.revealed);
    assert_eq!(other.card, card);
}

#[tokio::test]
async fn test_reveal_outside_round_is_wrong_phase() {
    let coord = coordinator();
    let (clients, code) = voting(&coord, 2).await;

    let ack = clients[1].send(&coord, ClientRequest::RevealCard(code)).await;

    assert_eq!(ack.kind, Some(ErrorKind::InvalidPhase));
}

#[tokio::test]
async fn test_reveal_all_is_host_only_and_orders_cards() {
    let coord = coordinator();
    let (mut clients, code) = playing(&coord, 3).await;

    let ack = clients[1].send(&coord, ClientRequest::RevealAllCards(code.clone())).await;
    assert_eq!(ack.kind, Some(ErrorKind::Unauthorized));

    let ack = clients[0].send(&coord, ClientRequest::RevealAllCards(code.clone())).await;
    assert!(ack.success);
    assert_eq!(status(&coord, &code).await, RoomStatus::Reveal);
    let events = clients[2].events();
    let [ServerEvent::AllCardsRevealed { game_state, ordered_cards }] = &events[..] else {
        panic!("expected all-cards-revealed, got {events:?}");
    };
    assert!(game_state.players.iter().all(|p| p.revealed && p.card.is_some()));
    assert!(ordered_cards.windows(2).all(|w| w[0].card <= w[1].card));
}

#[tokio::test]
async fn test_reset_returns_to_lobby() {
    let coord = coordinator();
    let (mut clients, code) = playing(&coord, 2).await;

    let ack = clients[0].send(&coord, ClientRequest::ResetGame(code.clone())).await;

    assert!(ack.success);
    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.status(), RoomStatus::Lobby);
    assert!(room.players().iter().all(|p| p.card().is_none() && !p.is_revealed()));
    assert!(matches!(
        &clients[1].events()[..],
        [ServerEvent::GameReset(view)] if view.status == RoomStatus::Lobby && view.players.len() == 2
    ));

    let ack = clients[0].send(&coord, ClientRequest::ResetGame(code)).await;
    assert_eq!(ack.kind, Some(ErrorKind::InvalidPhase));
}

// =========================================================================
// Disconnect and reconnect
// =========================================================================

#[tokio::test]
async fn test_host_disconnect_passes_authority_and_rejoin_restores_it() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 3).await;

    coord.disconnect(clients[0].conn).await;

    let events = clients[1].events();
    assert!(matches!(
        &events[..],
        [ServerEvent::PlayerDisconnected { player, new_host: Some(host), room }]
            if player.player_id.as_str() == "p1"
                && host.as_str() == "p2"
                && room.is_host
                && room.players.iter().any(|p| p.player_id.as_str() == "p1" && p.disconnected)
    ));
    assert_eq!(coord.room(&code).await.unwrap().host_player_id().as_str(), "p2");
    clients[2].events();

    let back = Client::connect(&coord, 10, "p1").await;
    let ack = back.send(&coord, rejoin(&back, &code)).await;

    assert!(ack.success);
    assert_eq!(ack.state, Some(RejoinPhase::Lobby));
    assert!(ack.room.unwrap().is_host);
    assert!(matches!(
        &clients[2].events()[..],
        [ServerEvent::PlayerReconnected { player, .. }] if player.player_id.as_str() == "p1"
    ));
}

#[tokio::test]
async fn test_rejoin_mid_round_restores_card() {
    let coord = coordinator();
    let (clients, code) = playing(&coord, 2).await;
    let card = coord
        .room(&code)
        .await
        .unwrap()
        .player_by_id(&clients[1].player_id)
        .unwrap()
        .card();

    coord.disconnect(clients[1].conn).await;
    let back = Client::connect(&coord, 20, "p2").await;
    let ack = back.send(&coord, rejoin(&back, &code)).await;

    assert_eq!(ack.state, Some(RejoinPhase::Playing));
    let view = ack.game_state.unwrap();
    let me = view.players.iter().find(|p| p.is_you).unwrap();
    assert_eq!(me.card, card);
    assert!(!me.disconnected);

    // The new connection acts for the seat.
    let ack = back.send(&coord, ClientRequest::RevealCard(code)).await;
    assert!(ack.success);
}

#[tokio::test]
async fn test_rejoin_during_draw_reports_drawn_number() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 2).await;
    clients[0].send(&coord, ClientRequest::StartGame(code.clone())).await;
    let drawn = coord.room(&code).await.unwrap().drawn_number();

    coord.disconnect(clients[1].conn).await;
    let back = Client::connect(&coord, 20, "p2").await;
    let ack = back.send(&coord, rejoin(&back, &code)).await;

    assert_eq!(ack.state, Some(RejoinPhase::Drawing));
    assert_eq!(ack.drawn_number, drawn);
    assert!(ack.room.is_some());
}

#[tokio::test]
async fn test_rejoin_unknown_player_mid_round_is_rejected() {
    let coord = coordinator();
    let (_clients, code) = playing(&coord, 2).await;
    let stranger = Client::connect(&coord, 30, "p30").await;

    let ack = stranger.send(&coord, rejoin(&stranger, &code)).await;

    assert_eq!(ack.kind, Some(ErrorKind::InvalidPhase));
}

#[tokio::test(start_paused = true)]
async fn test_ghost_expires_after_grace() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 3).await;

    coord.disconnect(clients[2].conn).await;
    clients[0].events();

    tokio::time::sleep(Duration::from_secs(30 * 60 - 1)).await;
    settle().await;
    assert_eq!(coord.room(&code).await.unwrap().players().len(), 3);

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(coord.room(&code).await.unwrap().players().len(), 2);
    assert!(matches!(
        &clients[0].events()[..],
        [ServerEvent::PlayerLeft { player, .. }] if player.player_id.as_str() == "p3"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_cancels_expiry() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 2).await;

    coord.disconnect(clients[1].conn).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    let back = Client::connect(&coord, 20, "p2").await;
    assert!(back.send(&coord, rejoin(&back, &code)).await.success);

    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    settle().await;
    assert_eq!(coord.room(&code).await.unwrap().players().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_room_is_destroyed_after_grace() {
    let coord = coordinator();
    let (clients, code) = lobby(&coord, 2).await;

    for c in &clients {
        coord.disconnect(c.conn).await;
    }
    assert!(coord.room(&code).await.unwrap().all_disconnected());

    tokio::time::sleep(Duration::from_secs(30 * 60 + 1)).await;
    settle().await;
    assert!(coord.room(&code).await.is_none());
}

#[tokio::test]
async fn test_departure_completes_pending_vote() {
    let coord = coordinator();
    let (mut clients, code) = voting(&coord, 3).await;
    let theme = coord.room(&code).await.unwrap().voting_themes().unwrap()[2].id;
    for c in &clients[..2] {
        c.send(&coord, ClientRequest::VoteTheme { code: code.clone(), theme_id: theme })
            .await;
    }
    clients[0].events();

    clients[2].send(&coord, ClientRequest::LeaveRoom(code.clone())).await;

    let room = coord.room(&code).await.unwrap();
    assert_eq!(room.status(), RoomStatus::Playing);
    assert_eq!(room.selected_theme().unwrap().id, theme);
    let events = clients[0].events();
    assert!(matches!(
        &events[..],
        [ServerEvent::PlayerLeft { .. }, ServerEvent::GameStarted(_)]
    ));
}

#[tokio::test]
async fn test_departure_completes_pending_reveal() {
    let coord = coordinator();
    let (mut clients, code) = playing(&coord, 3).await;
    for c in &clients[..2] {
        c.send(&coord, ClientRequest::RevealCard(code.clone())).await;
    }
    clients[0].events();

    clients[2].send(&coord, ClientRequest::LeaveRoom(code.clone())).await;

    assert_eq!(status(&coord, &code).await, RoomStatus::Reveal);
    assert!(matches!(
        &clients[0].events()[..],
        [ServerEvent::PlayerLeft { .. }, ServerEvent::AllRevealed { ordered_cards }]
            if ordered_cards.len() == 2
    ));
}

#[tokio::test]
async fn test_disconnected_player_receives_nothing() {
    let coord = coordinator();
    let (mut clients, code) = lobby(&coord, 3).await;

    coord.disconnect(clients[2].conn).await;
    clients[0].send(&coord, ClientRequest::StartGame(code)).await;

    assert!(clients[2].events().is_empty());
    assert_eq!(clients[1].events().len(), 2);
}
