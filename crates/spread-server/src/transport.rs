//! WebSocket transport: the only code that touches sockets.
//!
//! Each accepted connection runs two tasks. The writer drains the session's
//! bounded outbound queue into the socket, decoupling slow clients from the
//! actors. The reader registers with the directory, parses one JSON command
//! per text frame and routes it; any failure is reported back to this
//! session only and the connection stays open.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use spread_protocol::{LobbyOptions, PlayerId};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lobby::LobbyHandle;
use crate::protocol::{deserialize_command, serialize_event, ClientCommand, ServerEvent};
use crate::session::Session;

/// Accept loop; runs for the lifetime of the process.
pub async fn run(listener: TcpListener, lobby: LobbyHandle, config: ServerConfig) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("Accepted connection from {}", peer);
                tokio::spawn(handle_connection(stream, lobby.clone(), config.outbound_queue));
            }
            Err(err) => warn!("Accept error: {}", err),
        }
    }
}

async fn handle_connection(stream: TcpStream, lobby: LobbyHandle, outbound_queue: usize) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!("WebSocket accept failed: {}", err);
            return;
        }
    };
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (out_tx, mut out_rx) = mpsc::channel::<String>(outbound_queue);
    let session = Session::new(out_tx);

    let writer = tokio::spawn(async move {
        while let Some(payload) = out_rx.recv().await {
            if ws_tx.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    let player_id = lobby.connect(session.clone()).await;
    send_event(
        &session,
        &ServerEvent::ServerReady {
            player_id: player_id.clone(),
            message: "Welcome to the Spread server".into(),
        },
    );

    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                info!("Player {} connection error: {}", player_id, err);
                break;
            }
        };
        match message {
            Message::Text(text) => handle_frame(&text, &session, &player_id, &lobby).await,
            Message::Close(_) => break,
            // Pings are answered by the protocol layer; binary is not part
            // of the protocol.
            _ => {}
        }
    }

    lobby.disconnect(player_id).await;
    // Dropping the session closes the outbound queue and stops the writer.
    drop(session);
    let _ = writer.await;
}

async fn handle_frame(text: &str, session: &Arc<Session>, player_id: &PlayerId, lobby: &LobbyHandle) {
    let command = match deserialize_command(text) {
        Ok(command) => command,
        Err(err) => {
            warn!("Malformed command from {}: {}", player_id, err);
            send_event(
                session,
                &ServerEvent::Error {
                    message: format!("Malformed command: {err}"),
                },
            );
            return;
        }
    };

    debug!("{} -> {:?}", player_id, command);
    if let Err(err) = route_command(command, session, player_id, lobby).await {
        send_event(
            session,
            &ServerEvent::Error {
                message: err.to_string(),
            },
        );
    }
}

async fn route_command(
    command: ClientCommand,
    session: &Arc<Session>,
    player_id: &PlayerId,
    lobby: &LobbyHandle,
) -> Result<(), ServerError> {
    match command {
        ClientCommand::Ping => send_event(session, &ServerEvent::Pong),
        ClientCommand::ListLobbies => {
            let lobbies = lobby.list_lobbies().await;
            send_event(session, &ServerEvent::LobbyList { lobbies });
        }
        ClientCommand::CreateLobby {
            name,
            max_players,
            board_size,
        } => {
            let options = LobbyOptions {
                name,
                max_players,
                width: board_size[0],
                height: board_size[1],
            };
            let lobby_id = lobby.create_lobby(player_id.clone(), options).await?;
            send_event(session, &ServerEvent::Joined { lobby_id });
        }
        ClientCommand::JoinLobby { lobby_id } => {
            lobby.join_lobby(lobby_id.clone(), player_id.clone()).await?;
            send_event(session, &ServerEvent::Joined { lobby_id });
        }
        ClientCommand::LeaveLobby => {
            lobby.leave_lobby(player_id.clone()).await?;
            send_event(session, &ServerEvent::Left);
        }
        ClientCommand::StartGame => {
            lobby.start_game(player_id.clone()).await?;
        }
        ClientCommand::MakeMove { cell_id } => {
            let game = session
                .current_game()
                .ok_or(ServerError::PlayerNotInGame)?;
            game.make_move(player_id.clone(), cell_id).await?;
        }
    }
    Ok(())
}

fn send_event(session: &Session, event: &ServerEvent) {
    if let Ok(payload) = serialize_event(event) {
        session.deliver(payload);
    }
}
