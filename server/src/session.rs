//! Match state and the per-tick simulation pipeline
//!
//! A [`GameSession`] owns everything belonging to one room: the two player
//! slots, the missiles in flight, and the obstacle/item simulators. The
//! scheduler drives it through [`GameSession::tick`], which advances
//! missiles, resolves collisions, and broadcasts a freshly mirrored
//! `GAMESTATE` frame to each player.
//!
//! Coordinates are stored exactly as each owner reported them. The two
//! players' views of the field point in opposite directions, so every hit
//! test against "the other side" reflects the target player's box with
//! [`shared::mirrored_player_bounds`], and every broadcast reflects all
//! entities the recipient does not own. One convention, used everywhere,
//! keeps what a player sees consistent with what the server decides.

use crate::items::ItemField;
use crate::obstacles::ObstacleField;
use log::{debug, info};
use shared::protocol::{ServerMessage, SessionSettings, StateFrame};
use shared::{
    mirrored_player_bounds, overlaps, Bounds, ItemKind, Missile, PlayerSnapshot, COLLISION_DAMAGE,
    DOUBLE_MISSILE_OFFSET, DOUBLE_MISSILE_SHOTS, INITIAL_HEALTH, MAX_HEALTH, MISSILE_SPEED,
    SPAWN_X, SPAWN_Y,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

/// Slot identifiers; the first player to join a room is always `Player1`.
pub const PLAYER_ONE: &str = "Player1";
pub const PLAYER_TWO: &str = "Player2";

/// Lifecycle of a session. Terminated is final; a finished room is removed
/// from the registry rather than recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Zero or one players present.
    Waiting,
    /// Both slots filled, waiting for both READY signals.
    ReadyCheck,
    InProgress,
    Terminated,
}

/// One connected player's server-side state.
#[derive(Debug)]
pub struct Player {
    /// Slot identifier, unique within the session.
    pub id: String,
    /// Identifier of the room this player belongs to. Routing goes back
    /// through the registry; the player never owns its session.
    pub room: String,
    /// Top-left corner of the 90x90 ship, in this player's own view.
    pub x: i32,
    pub y: i32,
    /// Remaining health, kept within 0..=100.
    pub health: i32,
    pub ready: bool,
    /// Doubled shots remaining from a DOUBLE_MISSILE pickup.
    pub double_shots: u32,
    tx: UnboundedSender<String>,
}

impl Player {
    fn new(id: &str, room: &str, tx: UnboundedSender<String>) -> Self {
        Self {
            id: id.to_string(),
            room: room.to_string(),
            x: SPAWN_X,
            y: SPAWN_Y,
            health: INITIAL_HEALTH,
            ready: false,
            double_shots: 0,
            tx,
        }
    }

    /// Queues a message on this player's connection. Delivery is best
    /// effort; a closed connection only costs a debug line.
    fn send(&self, message: &ServerMessage) {
        if self.tx.send(message.encode()).is_err() {
            debug!("room {}: dropped message to {}, connection gone", self.room, self.id);
        }
    }

    fn apply_damage(&mut self, damage: i32) {
        self.health = (self.health - damage).clamp(0, MAX_HEALTH);
    }

    fn mirrored_bounds(&self) -> Bounds {
        mirrored_player_bounds(self.x, self.y)
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id.clone(),
            x: self.x,
            y: self.y,
            health: self.health,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    phase: MatchPhase,
    players: HashMap<String, Player>,
    missiles: Vec<Missile>,
}

/// Why a join attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    /// Both slots are taken.
    Full,
    /// The session already ended; the caller should retry against a fresh
    /// session under the same room id.
    Finished,
}

/// A successful join: the assigned slot and whether the player is alone.
#[derive(Debug)]
pub struct JoinedPlayer {
    pub player_id: String,
    pub alone: bool,
}

/// What a tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// This tick ended the match; the room should leave the registry.
    Ended,
}

/// What removing a player did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The session keeps going (or was already over).
    Detached,
    /// The disconnect ended a running match; the opponent won.
    MatchEnded,
    /// Nobody is left; the room should leave the registry.
    SessionEmpty,
}

/// All state for one room, shared behind an `Arc` between the connections
/// that feed it commands and the scheduler that ticks it.
#[derive(Debug)]
pub struct GameSession {
    room: String,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    obstacles: Arc<ObstacleField>,
    items: Arc<ItemField>,
}

impl GameSession {
    pub fn new(room: &str, max_obstacles: usize) -> Self {
        Self {
            room: room.to_string(),
            settings: SessionSettings::default(),
            state: Mutex::new(SessionState {
                phase: MatchPhase::Waiting,
                players: HashMap::new(),
                missiles: Vec::new(),
            }),
            obstacles: Arc::new(ObstacleField::new(max_obstacles)),
            items: Arc::new(ItemField::new()),
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub async fn phase(&self) -> MatchPhase {
        self.state.lock().await.phase
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.players.len()
    }

    pub async fn is_terminated(&self) -> bool {
        self.state.lock().await.phase == MatchPhase::Terminated
    }

    /// Claims a free slot for a new player. The lock makes the capacity
    /// check and the insert one step, so two racing joins cannot both take
    /// the last slot.
    pub async fn try_join(
        &self,
        tx: UnboundedSender<String>,
    ) -> Result<JoinedPlayer, JoinRejection> {
        let mut state = self.state.lock().await;
        match state.phase {
            MatchPhase::Terminated => return Err(JoinRejection::Finished),
            MatchPhase::InProgress => return Err(JoinRejection::Full),
            MatchPhase::Waiting | MatchPhase::ReadyCheck => {}
        }
        if state.players.len() >= 2 {
            return Err(JoinRejection::Full);
        }

        let id = if state.players.contains_key(PLAYER_ONE) {
            PLAYER_TWO
        } else {
            PLAYER_ONE
        };
        state.players.insert(id.to_string(), Player::new(id, &self.room, tx));
        if state.players.len() == 2 {
            state.phase = MatchPhase::ReadyCheck;
        }
        info!("{} joined room {}", id, self.room);

        Ok(JoinedPlayer {
            player_id: id.to_string(),
            alone: state.players.len() == 1,
        })
    }

    /// Records a READY signal. When the second one arrives the match
    /// starts; an early READY is answered with WAITING.
    pub async fn mark_ready(&self, player_id: &str) {
        let mut state = self.state.lock().await;
        let all_ready = {
            let Some(player) = state.players.get_mut(player_id) else {
                return;
            };
            player.ready = true;
            state.players.len() == 2 && state.players.values().all(|p| p.ready)
        };
        match state.phase {
            MatchPhase::ReadyCheck if all_ready => self.start_match(&mut state).await,
            MatchPhase::Waiting | MatchPhase::ReadyCheck => {
                if let Some(player) = state.players.get(player_id) {
                    player.send(&ServerMessage::Waiting);
                }
            }
            MatchPhase::InProgress | MatchPhase::Terminated => {}
        }
    }

    async fn start_match(&self, state: &mut SessionState) {
        state.phase = MatchPhase::InProgress;
        state.missiles.clear();
        self.obstacles.reset().await;
        self.items.reset().await;
        self.obstacles.start();
        self.items.start();
        info!("match started in room {}", self.room);
        for player in state.players.values() {
            player.send(&ServerMessage::GameStart);
        }
    }

    /// Stores a player's reported position verbatim. The position is in
    /// the sender's own view and is never clamped server-side.
    pub async fn set_position(&self, player_id: &str, x: i32, y: i32) {
        let mut state = self.state.lock().await;
        if state.phase == MatchPhase::Terminated {
            return;
        }
        if let Some(player) = state.players.get_mut(player_id) {
            player.x = x;
            player.y = y;
        }
    }

    /// Appends a missile at the requested launch position, or a pair with
    /// a lateral spread while the shooter has doubled shots left.
    pub async fn spawn_missile(&self, player_id: &str, x: i32, y: i32) {
        let mut state = self.state.lock().await;
        if state.phase == MatchPhase::Terminated {
            return;
        }
        let SessionState {
            players, missiles, ..
        } = &mut *state;
        let Some(player) = players.get_mut(player_id) else {
            return;
        };
        if player.double_shots > 0 {
            player.double_shots -= 1;
            missiles.push(Missile {
                owner: player.id.clone(),
                x: x - DOUBLE_MISSILE_OFFSET,
                y,
            });
            missiles.push(Missile {
                owner: player.id.clone(),
                x: x + DOUBLE_MISSILE_OFFSET,
                y,
            });
            debug!(
                "room {}: {} fired a doubled shot, {} left",
                self.room, player.id, player.double_shots
            );
        } else {
            missiles.push(Missile {
                owner: player.id.clone(),
                x,
                y,
            });
        }
    }

    /// One simulation step: advance missiles, resolve every collision,
    /// then broadcast. A tick that ends the match skips its own broadcast,
    /// so DEFEAT and VICTORY are the last things the players hear.
    pub async fn tick(&self) -> TickOutcome {
        let mut state = self.state.lock().await;
        if state.phase != MatchPhase::InProgress {
            return TickOutcome::Continue;
        }
        advance_missiles(&mut state.missiles);
        if let Some(loser) = self.resolve_collisions(&mut state).await {
            self.finish_match(&mut state, &loser);
            return TickOutcome::Ended;
        }
        self.broadcast_state(&state).await;
        TickOutcome::Continue
    }

    /// Applies missile, obstacle, and item contacts in a fixed order.
    /// Damage lands one hit at a time, and the first hit that empties a
    /// health bar settles the match; remaining contacts are left as they
    /// are because nothing after the terminal transition is observable.
    async fn resolve_collisions(&self, state: &mut SessionState) -> Option<String> {
        let SessionState {
            players, missiles, ..
        } = &mut *state;

        let mut loser: Option<String> = None;
        let mut kept = Vec::with_capacity(missiles.len());
        for missile in missiles.drain(..) {
            if loser.is_some() {
                kept.push(missile);
                continue;
            }
            let target = players.values_mut().find(|p| {
                p.id != missile.owner && overlaps(missile.bounds(), p.mirrored_bounds())
            });
            match target {
                Some(player) => {
                    player.apply_damage(COLLISION_DAMAGE);
                    debug!(
                        "room {}: missile from {} hit {}, health now {}",
                        self.room, missile.owner, player.id, player.health
                    );
                    if player.health == 0 {
                        loser = Some(player.id.clone());
                    }
                }
                None => kept.push(missile),
            }
        }
        *missiles = kept;
        if loser.is_some() {
            return loser;
        }

        let targets = mirrored_target_boxes(players);
        for id in self.obstacles.remove_colliding(&targets).await {
            if loser.is_some() {
                break;
            }
            if let Some(player) = players.get_mut(&id) {
                player.apply_damage(COLLISION_DAMAGE);
                debug!(
                    "room {}: obstacle hit {}, health now {}",
                    self.room, player.id, player.health
                );
                if player.health == 0 {
                    loser = Some(id);
                }
            }
        }
        if loser.is_some() {
            return loser;
        }

        for (id, kind) in self.items.collect_overlapping(&targets).await {
            if let Some(player) = players.get_mut(&id) {
                match kind {
                    ItemKind::DoubleMissile => {
                        player.double_shots = DOUBLE_MISSILE_SHOTS;
                        info!("room {}: {} picked up {}", self.room, player.id, kind.as_str());
                    }
                }
            }
        }
        None
    }

    fn finish_match(&self, state: &mut SessionState, loser_id: &str) {
        state.phase = MatchPhase::Terminated;
        self.obstacles.stop();
        self.items.stop();
        for player in state.players.values() {
            if player.id == loser_id {
                player.send(&ServerMessage::Defeat);
            } else {
                player.send(&ServerMessage::Victory);
            }
        }
        info!("room {}: {} was defeated", self.room, loser_id);
    }

    /// Sends each player a frame with their own entities verbatim and
    /// everything else reflected into their view.
    async fn broadcast_state(&self, state: &SessionState) {
        let obstacles = self.obstacles.snapshot().await;
        let items = self.items.snapshot().await;

        let mut ids: Vec<&String> = state.players.keys().collect();
        ids.sort();

        for recipient_id in &ids {
            let Some(recipient) = state.players.get(*recipient_id) else {
                continue;
            };
            let frame = StateFrame {
                players: ids
                    .iter()
                    .filter_map(|id| state.players.get(*id))
                    .map(|p| {
                        if p.id == recipient.id {
                            p.snapshot()
                        } else {
                            p.snapshot().mirrored()
                        }
                    })
                    .collect(),
                missiles: state
                    .missiles
                    .iter()
                    .map(|m| {
                        if m.owner == recipient.id {
                            m.clone()
                        } else {
                            m.mirrored()
                        }
                    })
                    .collect(),
                obstacles: obstacles.iter().map(|o| o.mirrored()).collect(),
                items: items.iter().map(|i| i.mirrored()).collect(),
            };
            recipient.send(&ServerMessage::GameState(frame));
        }
    }

    /// Removes a player after their connection went away. Mid-match this
    /// hands the win to the opponent; before the match it just frees the
    /// slot.
    pub async fn handle_disconnect(&self, player_id: &str) -> DisconnectOutcome {
        let mut state = self.state.lock().await;
        if state.players.remove(player_id).is_none() {
            return DisconnectOutcome::Detached;
        }
        state.missiles.retain(|m| m.owner != player_id);
        match state.phase {
            MatchPhase::InProgress => {
                state.phase = MatchPhase::Terminated;
                self.obstacles.stop();
                self.items.stop();
                for player in state.players.values() {
                    player.send(&ServerMessage::Victory);
                }
                info!("room {}: {} disconnected mid-match", self.room, player_id);
                DisconnectOutcome::MatchEnded
            }
            MatchPhase::Waiting | MatchPhase::ReadyCheck => {
                info!("room {}: {} left before the match", self.room, player_id);
                if state.players.is_empty() {
                    DisconnectOutcome::SessionEmpty
                } else {
                    // The pairing changed, so any READY given for it no
                    // longer counts.
                    state.phase = MatchPhase::Waiting;
                    for player in state.players.values_mut() {
                        player.ready = false;
                    }
                    DisconnectOutcome::Detached
                }
            }
            MatchPhase::Terminated => {
                if state.players.is_empty() {
                    DisconnectOutcome::SessionEmpty
                } else {
                    DisconnectOutcome::Detached
                }
            }
        }
    }
}

/// Climbs every missile one step and drops the ones past the top edge.
fn advance_missiles(missiles: &mut Vec<Missile>) {
    for missile in missiles.iter_mut() {
        missile.y -= MISSILE_SPEED;
    }
    missiles.retain(|m| m.y >= 0);
}

/// Each player's box reflected into the shared hit-test frame, in id
/// order so simultaneous contacts resolve the same way every tick.
fn mirrored_target_boxes(players: &HashMap<String, Player>) -> Vec<(String, Bounds)> {
    let mut boxes: Vec<(String, Bounds)> = players
        .values()
        .map(|p| (p.id.clone(), p.mirrored_bounds()))
        .collect();
    boxes.sort_by(|a, b| a.0.cmp(&b.0));
    boxes
}
