//! Per-client connection handling for the line based TCP protocol

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info, warn};
use shared::protocol::{ClientCommand, ServerMessage};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::registry::{JoinError, SessionRegistry};
use crate::session::{DisconnectOutcome, GameSession};

/// Room membership of a connection, established by a successful MAPSELECT.
struct Assignment {
    session: Arc<GameSession>,
    player_id: String,
}

/// Drives one client socket from accept to disconnect.
///
/// Reading and writing are decoupled: outbound lines go through an unbounded
/// channel to a writer task, so a client that stops draining its socket can
/// never stall the simulation.
pub async fn handle_connection(socket: TcpStream, addr: SocketAddr, registry: Arc<SessionRegistry>) {
    let (read_half, write_half) = socket.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(write_half, rx));

    let mut handler = ConnectionHandler {
        addr,
        registry,
        tx,
        assignment: None,
    };

    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match ClientCommand::parse(trimmed) {
                    Ok(command) => handler.dispatch(command).await,
                    Err(e) => warn!("{}: ignoring line {:?}: {}", addr, trimmed, e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("{}: read error: {}", addr, e);
                break;
            }
        }
    }

    handler.detach().await;
    // Dropping the handler closes its sender, which lets the writer task
    // drain any queued lines and exit.
    drop(handler);
    let _ = writer.await;
}

/// Forwards queued protocol lines onto the socket until the channel closes
/// or the peer stops accepting writes.
pub async fn write_lines<W>(mut writer: W, mut rx: UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("write failed: {}", e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}

struct ConnectionHandler {
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    tx: UnboundedSender<String>,
    assignment: Option<Assignment>,
}

impl ConnectionHandler {
    async fn dispatch(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::MapSelect { room } => self.handle_map_select(&room).await,
            ClientCommand::Ready => match &self.assignment {
                Some(assignment) => assignment.session.mark_ready(&assignment.player_id).await,
                None => debug!("{}: READY before MAPSELECT", self.addr),
            },
            ClientCommand::Move { x, y } => match &self.assignment {
                Some(assignment) => {
                    assignment
                        .session
                        .set_position(&assignment.player_id, x, y)
                        .await
                }
                None => debug!("{}: MOVE before MAPSELECT", self.addr),
            },
            ClientCommand::Missile { x, y } => match &self.assignment {
                Some(assignment) => {
                    assignment
                        .session
                        .spawn_missile(&assignment.player_id, x, y)
                        .await
                }
                None => debug!("{}: MISSILE before MAPSELECT", self.addr),
            },
        }
    }

    async fn handle_map_select(&mut self, room: &str) {
        if let Some(assignment) = &self.assignment {
            // Room switching is only allowed once the current match is over.
            if !assignment.session.is_terminated().await {
                debug!(
                    "{}: MAPSELECT ignored, {} is still in room {}",
                    self.addr,
                    assignment.player_id,
                    assignment.session.room()
                );
                return;
            }
            self.detach().await;
        }

        match self.registry.join(room, self.tx.clone()).await {
            Ok((session, joined)) => {
                info!(
                    "{}: joined room {} as {}",
                    self.addr, room, joined.player_id
                );
                self.send(ServerMessage::Settings(session.settings().clone()));
                self.send(ServerMessage::Connected {
                    player_id: joined.player_id.clone(),
                    room: room.to_string(),
                });
                if joined.alone {
                    self.send(ServerMessage::Waiting);
                }
                self.assignment = Some(Assignment {
                    session,
                    player_id: joined.player_id,
                });
            }
            Err(JoinError::RoomFull(_)) => {
                info!("{}: room {} is full", self.addr, room);
                self.send(ServerMessage::MapFull);
            }
        }
    }

    /// Removes this connection's player from its session and sweeps the room
    /// if the departure ended or emptied it.
    async fn detach(&mut self) {
        let Some(assignment) = self.assignment.take() else {
            return;
        };
        info!(
            "{}: {} left room {}",
            self.addr,
            assignment.player_id,
            assignment.session.room()
        );
        match assignment
            .session
            .handle_disconnect(&assignment.player_id)
            .await
        {
            DisconnectOutcome::MatchEnded | DisconnectOutcome::SessionEmpty => {
                self.registry.remove_session(&assignment.session).await;
            }
            DisconnectOutcome::Detached => {}
        }
    }

    fn send(&self, message: ServerMessage) {
        if self.tx.send(message.encode()).is_err() {
            debug!("{}: writer task gone", self.addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_write_lines_appends_newlines() {
        let (stream, mut peer) = tokio::io::duplex(256);
        let (tx, rx) = unbounded_channel();
        let task = tokio::spawn(write_lines(stream, rx));

        tx.send("WAITING".to_string()).unwrap();
        tx.send("GAMESTART".to_string()).unwrap();
        drop(tx);
        task.await.unwrap();

        let mut received = String::new();
        peer.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "WAITING\nGAMESTART\n");
    }

    #[tokio::test]
    async fn test_map_select_replies_with_settings_connected_waiting() {
        let (mut handler, mut rx) = test_handler();
        handler
            .dispatch(ClientCommand::MapSelect {
                room: "Arena1".to_string(),
            })
            .await;

        let settings = rx.try_recv().unwrap();
        assert!(settings.starts_with("SETTINGS "));
        assert_eq!(rx.try_recv().unwrap(), "CONNECTED Player1 Arena1");
        assert_eq!(rx.try_recv().unwrap(), "WAITING");
        assert!(rx.try_recv().is_err());
        assert!(handler.assignment.is_some());
    }

    #[tokio::test]
    async fn test_map_select_on_full_room_replies_mapfull() {
        let (mut handler, mut rx) = test_handler();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        handler.registry.join("Arena1", tx1).await.unwrap();
        handler.registry.join("Arena1", tx2).await.unwrap();

        handler
            .dispatch(ClientCommand::MapSelect {
                room: "Arena1".to_string(),
            })
            .await;

        assert_eq!(rx.try_recv().unwrap(), "MAPFULL");
        assert!(rx.try_recv().is_err());
        assert!(handler.assignment.is_none());
    }

    #[tokio::test]
    async fn test_map_select_while_assigned_is_ignored() {
        let (mut handler, mut rx) = test_handler();
        handler
            .dispatch(ClientCommand::MapSelect {
                room: "Arena1".to_string(),
            })
            .await;
        while rx.try_recv().is_ok() {}

        handler
            .dispatch(ClientCommand::MapSelect {
                room: "Arena2".to_string(),
            })
            .await;

        assert!(rx.try_recv().is_err());
        let assignment = handler.assignment.as_ref().unwrap();
        assert_eq!(assignment.session.room(), "Arena1");
        assert_eq!(handler.registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_input_before_map_select_is_dropped() {
        let (mut handler, mut rx) = test_handler();
        handler.dispatch(ClientCommand::Ready).await;
        handler.dispatch(ClientCommand::Move { x: 10, y: 20 }).await;
        handler
            .dispatch(ClientCommand::Missile { x: 10, y: 20 })
            .await;

        assert!(rx.try_recv().is_err());
        assert_eq!(handler.registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_detach_removes_empty_session() {
        let (mut handler, _rx) = test_handler();
        handler
            .dispatch(ClientCommand::MapSelect {
                room: "Arena1".to_string(),
            })
            .await;
        assert_eq!(handler.registry.session_count().await, 1);

        handler.detach().await;
        assert!(handler.assignment.is_none());
        assert_eq!(handler.registry.session_count().await, 0);
    }

    fn test_handler() -> (ConnectionHandler, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let handler = ConnectionHandler {
            addr: "127.0.0.1:40000".parse().unwrap(),
            registry: Arc::new(SessionRegistry::new(10)),
            tx,
            assignment: None,
        };
        (handler, rx)
    }
}
