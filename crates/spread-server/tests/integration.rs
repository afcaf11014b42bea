//! Integration tests for the lobby directory and match actors.
//!
//! Drives the actors in-process with capture-channel sessions instead of
//! sockets: every broadcast a client would receive lands in its channel as
//! the JSON payload the transport would have written.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use spread_protocol::{FieldSnapshot, Lobby, LobbyOptions, LobbyStatus, Move, PlayerId};
use spread_server::{LobbyHandle, ServerConfig, ServerError, ServerEvent, Session};

struct TestClient {
    player_id: PlayerId,
    session: Arc<Session>,
    rx: mpsc::Receiver<String>,
}

async fn connect(lobby: &LobbyHandle) -> TestClient {
    let (tx, rx) = mpsc::channel(64);
    let session = Session::new(tx);
    let player_id = lobby.connect(session.clone()).await;
    TestClient {
        player_id,
        session,
        rx,
    }
}

impl TestClient {
    async fn next_event(&mut self) -> ServerEvent {
        let payload = timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("session channel closed");
        serde_json::from_str(&payload).expect("well-formed event")
    }

    /// Skip ahead to the next `game_state` broadcast.
    async fn next_game_state(&mut self) -> (FieldSnapshot, Vec<PlayerId>, Option<PlayerId>, Vec<Move>) {
        loop {
            if let ServerEvent::GameState {
                field,
                alive_players,
                current_player,
                move_history,
                ..
            } = self.next_event().await
            {
                return (field, alive_players, current_player, move_history);
            }
        }
    }

    /// Skip ahead to the next `lobby_update` broadcast.
    async fn next_lobby_update(&mut self) -> Lobby {
        loop {
            if let ServerEvent::LobbyUpdate { lobby } = self.next_event().await {
                return lobby;
            }
        }
    }
}

fn options(name: &str, max_players: u8, width: u8, height: u8) -> LobbyOptions {
    LobbyOptions {
        name: name.into(),
        max_players,
        width,
        height,
    }
}

#[tokio::test]
async fn lobby_ids_are_monotonic_and_creator_is_sole_host() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let mut a = connect(&lobby).await;
    assert_eq!(a.player_id, "p1");

    let first = lobby
        .create_lobby(a.player_id.clone(), options("first", 4, 8, 8))
        .await
        .unwrap();
    match a.next_event().await {
        ServerEvent::LobbyCreated { lobby } => {
            assert_eq!(lobby.id, first);
            assert_eq!(lobby.host_player_id, a.player_id);
            assert_eq!(lobby.players, vec![a.player_id.clone()]);
            assert_eq!(lobby.status, LobbyStatus::Open);
        }
        other => panic!("expected lobby_created, got {other:?}"),
    }

    // Creating while already a member is rejected.
    let err = lobby
        .create_lobby(a.player_id.clone(), options("second", 4, 8, 8))
        .await
        .unwrap_err();
    assert_eq!(err, ServerError::PlayerAlreadyInLobby);

    lobby.leave_lobby(a.player_id.clone()).await.unwrap();
    let second = lobby
        .create_lobby(a.player_id.clone(), options("second", 4, 8, 8))
        .await
        .unwrap();
    assert_eq!(first, "l1");
    assert_eq!(second, "l2");
}

#[tokio::test]
async fn join_rejects_full_unknown_and_double_membership() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let a = connect(&lobby).await;
    let b = connect(&lobby).await;
    let c = connect(&lobby).await;

    let id = lobby
        .create_lobby(a.player_id.clone(), options("duel", 2, 8, 8))
        .await
        .unwrap();

    assert_eq!(
        lobby.join_lobby("l99".into(), b.player_id.clone()).await,
        Err(ServerError::LobbyNotFound)
    );

    lobby.join_lobby(id.clone(), b.player_id.clone()).await.unwrap();
    assert_eq!(
        lobby.join_lobby(id.clone(), b.player_id.clone()).await,
        Err(ServerError::PlayerAlreadyInLobby)
    );

    // Capacity is never exceeded.
    assert_eq!(
        lobby.join_lobby(id.clone(), c.player_id.clone()).await,
        Err(ServerError::LobbyFull)
    );
    let listed = lobby.list_lobbies().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].players.len(), 2);
}

#[tokio::test]
async fn leaving_last_member_deletes_lobby_with_one_gone_event() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let a = connect(&lobby).await;
    let mut observer = connect(&lobby).await;

    let id = lobby
        .create_lobby(a.player_id.clone(), options("brief", 4, 8, 8))
        .await
        .unwrap();
    lobby.leave_lobby(a.player_id.clone()).await.unwrap();
    assert_eq!(
        lobby.leave_lobby(a.player_id.clone()).await,
        Err(ServerError::PlayerNotInLobby)
    );
    assert!(lobby.list_lobbies().await.is_empty());

    // The observer saw the lobby appear and disappear exactly once.
    let mut gone_events = 0;
    match observer.next_event().await {
        ServerEvent::LobbyCreated { lobby } => assert_eq!(lobby.id, id),
        other => panic!("expected lobby_created, got {other:?}"),
    }
    match observer.next_event().await {
        ServerEvent::LobbyGone { lobby_id } => {
            assert_eq!(lobby_id, id);
            gone_events += 1;
        }
        other => panic!("expected lobby_gone, got {other:?}"),
    }
    assert!(observer.rx.try_recv().is_err());
    assert_eq!(gone_events, 1);
}

#[tokio::test]
async fn host_departure_promotes_earliest_remaining_member() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let a = connect(&lobby).await;
    let mut b = connect(&lobby).await;
    let c = connect(&lobby).await;

    let id = lobby
        .create_lobby(a.player_id.clone(), options("trio", 4, 8, 8))
        .await
        .unwrap();
    lobby.join_lobby(id.clone(), b.player_id.clone()).await.unwrap();
    lobby.join_lobby(id.clone(), c.player_id.clone()).await.unwrap();

    lobby.leave_lobby(a.player_id.clone()).await.unwrap();

    let updated = loop {
        let lobby = b.next_lobby_update().await;
        if !lobby.players.contains(&a.player_id) {
            break lobby;
        }
    };
    assert_eq!(updated.host_player_id, b.player_id);
    assert_eq!(updated.players, vec![b.player_id.clone(), c.player_id.clone()]);
}

#[tokio::test]
async fn start_game_preconditions_and_status_transition() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let a = connect(&lobby).await;
    let b = connect(&lobby).await;
    let c = connect(&lobby).await;

    assert_eq!(
        lobby.start_game(a.player_id.clone()).await,
        Err(ServerError::PlayerNotInLobby)
    );

    let id = lobby
        .create_lobby(a.player_id.clone(), options("match", 4, 8, 8))
        .await
        .unwrap();
    assert_eq!(
        lobby.start_game(a.player_id.clone()).await,
        Err(ServerError::NotEnoughPlayers)
    );

    lobby.join_lobby(id.clone(), b.player_id.clone()).await.unwrap();
    assert_eq!(
        lobby.start_game(b.player_id.clone()).await,
        Err(ServerError::NotLobbyHost)
    );

    lobby.start_game(a.player_id.clone()).await.unwrap();
    let listed = lobby.list_lobbies().await;
    assert_eq!(listed[0].status, LobbyStatus::InProgress);

    // Joining or restarting a running match is rejected.
    assert_eq!(
        lobby.join_lobby(id.clone(), c.player_id.clone()).await,
        Err(ServerError::GameAlreadyStarted)
    );
    assert_eq!(
        lobby.start_game(a.player_id.clone()).await,
        Err(ServerError::GameAlreadyStarted)
    );
}

#[tokio::test]
async fn full_match_on_a_tiny_board_runs_to_the_finished_lobby() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let mut a = connect(&lobby).await;
    let mut b = connect(&lobby).await;

    let id = lobby
        .create_lobby(a.player_id.clone(), options("blitz", 2, 2, 2))
        .await
        .unwrap();
    lobby.join_lobby(id.clone(), b.player_id.clone()).await.unwrap();
    lobby.start_game(a.player_id.clone()).await.unwrap();

    let game = a.session.current_game().expect("match attached on start");

    // Initial broadcast: empty history, both players alive, host to move.
    let (field, alive, current, history) = a.next_game_state().await;
    assert_eq!(field.cells.len(), 4);
    assert_eq!(alive, vec![a.player_id.clone(), b.player_id.clone()]);
    assert_eq!(current, Some(a.player_id.clone()));
    assert!(history.is_empty());

    // Out-of-turn and unknown players are rejected up front.
    assert_eq!(
        game.make_move(b.player_id.clone(), 0).await,
        Err(ServerError::InvalidMove)
    );
    assert_eq!(
        game.make_move("p99".into(), 0).await,
        Err(ServerError::PlayerNotInGame)
    );

    game.make_move(a.player_id.clone(), 0).await.unwrap();
    game.make_move(b.player_id.clone(), 3).await.unwrap();
    game.make_move(a.player_id.clone(), 0).await.unwrap();
    // Cell 1 now belongs to a, so b cannot place there.
    assert_eq!(
        game.make_move(b.player_id.clone(), 1).await,
        Err(ServerError::InvalidMove)
    );
    // b's second dot on their own corner conquers the board.
    game.make_move(b.player_id.clone(), 3).await.unwrap();

    let (final_field, final_alive, final_current, final_history) = loop {
        let state = b.next_game_state().await;
        if state.1.len() == 1 {
            break state;
        }
    };
    assert_eq!(final_alive, vec![b.player_id.clone()]);
    assert_eq!(final_current, Some(b.player_id.clone()));
    assert_eq!(final_history.len(), 4);
    assert_eq!(final_field.scores[1], 0);

    // The directory marks the lobby finished once the match actor reports in.
    let finished = loop {
        let lobby = a.next_lobby_update().await;
        if lobby.status == LobbyStatus::Finished {
            break lobby;
        }
    };
    assert_eq!(finished.id, id);

    // Match teardown clears the attached handle and closes the mailbox.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(a.session.current_game().is_none());
    assert!(b.session.current_game().is_none());
    assert_eq!(
        game.make_move(b.player_id.clone(), 1).await,
        Err(ServerError::GameAlreadyOver)
    );
}

#[tokio::test]
async fn leaving_a_running_match_eliminates_the_player() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let a = connect(&lobby).await;
    let b = connect(&lobby).await;
    let mut c = connect(&lobby).await;

    let id = lobby
        .create_lobby(a.player_id.clone(), options("attrition", 4, 8, 8))
        .await
        .unwrap();
    lobby.join_lobby(id.clone(), b.player_id.clone()).await.unwrap();
    lobby.join_lobby(id.clone(), c.player_id.clone()).await.unwrap();
    lobby.start_game(a.player_id.clone()).await.unwrap();

    let game = c.session.current_game().expect("match attached on start");
    game.make_move(a.player_id.clone(), 0).await.unwrap();

    // b never acts and walks out mid-match; the turn passes over them to c.
    lobby.leave_lobby(b.player_id.clone()).await.unwrap();

    let (_, alive, current, _) = loop {
        let state = c.next_game_state().await;
        if state.1.len() == 2 {
            break state;
        }
    };
    assert_eq!(alive, vec![a.player_id.clone(), c.player_id.clone()]);
    assert_eq!(current, Some(c.player_id.clone()));

    game.make_move(c.player_id.clone(), 63).await.unwrap();

    // The last opponent leaving decides the match.
    lobby.leave_lobby(c.player_id.clone()).await.unwrap();
    let finished = loop {
        let lobby = c.next_lobby_update().await;
        if lobby.status == LobbyStatus::Finished {
            break lobby;
        }
    };
    assert_eq!(finished.players, vec![a.player_id.clone()]);
}

#[tokio::test]
async fn disconnect_cleans_up_membership_without_errors() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let a = connect(&lobby).await;
    let mut b = connect(&lobby).await;

    // Disconnecting someone who never joined a lobby is quietly absorbed.
    let stray = connect(&lobby).await;
    lobby.disconnect(stray.player_id.clone()).await;

    let id = lobby
        .create_lobby(a.player_id.clone(), options("fragile", 4, 8, 8))
        .await
        .unwrap();
    lobby.join_lobby(id.clone(), b.player_id.clone()).await.unwrap();

    lobby.disconnect(a.player_id.clone()).await;

    let updated = loop {
        let lobby = b.next_lobby_update().await;
        if !lobby.players.contains(&a.player_id) {
            break lobby;
        }
    };
    assert_eq!(updated.host_player_id, b.player_id);

    // The freed identity is not reused.
    let d = connect(&lobby).await;
    assert_ne!(d.player_id, a.player_id);
}

#[tokio::test]
async fn stale_sessions_are_skipped_on_broadcast() {
    let lobby = LobbyHandle::spawn(ServerConfig::default());
    let a = connect(&lobby).await;
    let mut b = connect(&lobby).await;

    // a's transport vanishes without a disconnect; broadcasts keep flowing
    // to everyone else.
    drop(a.session);
    drop(a.rx);

    lobby
        .create_lobby(b.player_id.clone(), options("lonely", 4, 8, 8))
        .await
        .unwrap();
    match b.next_event().await {
        ServerEvent::LobbyCreated { lobby } => assert_eq!(lobby.host_player_id, b.player_id),
        other => panic!("expected lobby_created, got {other:?}"),
    }
}
