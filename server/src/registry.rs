//! Room directory. Maps room ids to live sessions and recycles ids once a
//! match is over, so a finished room name can host a fresh game.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

use crate::session::{GameSession, JoinRejection, JoinedPlayer};

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("room {0} already has two players")]
    RoomFull(String),
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<GameSession>>>,
    max_obstacles: usize,
}

impl SessionRegistry {
    pub fn new(max_obstacles: usize) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            max_obstacles,
        }
    }

    /// Returns the session registered under `room`, opening one if the id is
    /// unknown.
    pub async fn create_or_get(&self, room: &str) -> Arc<GameSession> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(room.to_string())
            .or_insert_with(|| {
                info!("opening room {}", room);
                Arc::new(GameSession::new(room, self.max_obstacles))
            })
            .clone()
    }

    /// Puts a player into `room`. A session that already finished its match
    /// is dropped from the map and the join retries against a fresh one, so
    /// returning players never land in a dead room.
    pub async fn join(
        &self,
        room: &str,
        tx: UnboundedSender<String>,
    ) -> Result<(Arc<GameSession>, JoinedPlayer), JoinError> {
        loop {
            let session = self.create_or_get(room).await;
            match session.try_join(tx.clone()).await {
                Ok(joined) => return Ok((session, joined)),
                Err(JoinRejection::Full) => return Err(JoinError::RoomFull(room.to_string())),
                Err(JoinRejection::Finished) => {
                    self.remove_session(&session).await;
                }
            }
        }
    }

    /// Unregisters `session`. The pointer comparison keeps a late removal
    /// from evicting a newer session that reclaimed the same room id.
    pub async fn remove_session(&self, session: &Arc<GameSession>) {
        let mut sessions = self.sessions.lock().await;
        if let Some(current) = sessions.get(session.room()) {
            if Arc::ptr_eq(current, session) {
                sessions.remove(session.room());
                debug!("closed room {}", session.room());
            }
        }
    }

    /// Snapshot of every live session, for the tick sweep.
    pub async fn sessions(&self) -> Vec<Arc<GameSession>> {
        self.sessions.lock().await.values().cloned().collect()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
