//! Line-oriented wire protocol spoken between clients and the game server
//!
//! Every message is a single newline-terminated ASCII line of
//! space-separated tokens. Clients send commands (`MAPSELECT`, `READY`,
//! `MOVE`, `MISSILE`); the server answers with session control messages and
//! a repeated `GAMESTATE` frame whose entity groups all have fixed arity:
//!
//! ```text
//! GAMESTATE PLAYER <id> <x> <y> <health>
//!           MISSILE <owner> <x> <y>
//!           OBSTACLE <x> <y> <w> <h> <movingRight>
//!           ITEM <kind> <x> <y> <w> <h> <movingRight>
//! ```
//!
//! Sprite identifiers never appear in `GAMESTATE`; they are sent once per
//! session in the `SETTINGS` message.

use crate::{
    Item, ItemKind, Missile, Obstacle, PlayerSnapshot, FIELD_HEIGHT, FIELD_WIDTH, MISSILE_HEIGHT,
    MISSILE_WIDTH, PLAYER_HEIGHT, PLAYER_WIDTH,
};
use std::str::SplitWhitespace;
use thiserror::Error;

/// Reasons a received line could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty line")]
    EmptyLine,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("unknown message {0:?}")]
    UnknownMessage(String),
    #[error("unknown entity group {0:?}")]
    UnknownGroup(String),
    #[error("unknown item kind {0:?}")]
    UnknownItemKind(String),
    #[error("truncated {0} entry")]
    Truncated(&'static str),
    #[error("bad integer {token:?} in {context}")]
    BadNumber { context: &'static str, token: String },
    #[error("bad flag {token:?} in {context}")]
    BadFlag { context: &'static str, token: String },
}

/// Walks the tokens of one line, attaching context to missing or
/// malformed fields. Extra trailing tokens are tolerated.
struct TokenCursor<'a> {
    tokens: SplitWhitespace<'a>,
}

impl<'a> TokenCursor<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            tokens: line.split_whitespace(),
        }
    }

    fn next_opt(&mut self) -> Option<&'a str> {
        self.tokens.next()
    }

    fn next(&mut self, context: &'static str) -> Result<&'a str, ProtocolError> {
        self.tokens.next().ok_or(ProtocolError::Truncated(context))
    }

    fn next_i32(&mut self, context: &'static str) -> Result<i32, ProtocolError> {
        let token = self.next(context)?;
        token.parse().map_err(|_| ProtocolError::BadNumber {
            context,
            token: token.to_string(),
        })
    }

    fn next_flag(&mut self, context: &'static str) -> Result<bool, ProtocolError> {
        match self.next(context)? {
            "true" => Ok(true),
            "false" => Ok(false),
            token => Err(ProtocolError::BadFlag {
                context,
                token: token.to_string(),
            }),
        }
    }
}

/// Commands a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Join (or create) the room with the given identifier.
    MapSelect { room: String },
    /// Signal readiness for the match to begin.
    Ready,
    /// Report the player's own position, in their own view.
    Move { x: i32, y: i32 },
    /// Fire a missile from the given position, in the player's own view.
    Missile { x: i32, y: i32 },
}

impl ClientCommand {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut cursor = TokenCursor::new(line);
        let keyword = cursor.next_opt().ok_or(ProtocolError::EmptyLine)?;
        match keyword {
            "MAPSELECT" => Ok(ClientCommand::MapSelect {
                room: cursor.next("MAPSELECT")?.to_string(),
            }),
            "READY" => Ok(ClientCommand::Ready),
            "MOVE" => Ok(ClientCommand::Move {
                x: cursor.next_i32("MOVE")?,
                y: cursor.next_i32("MOVE")?,
            }),
            "MISSILE" => Ok(ClientCommand::Missile {
                x: cursor.next_i32("MISSILE")?,
                y: cursor.next_i32("MISSILE")?,
            }),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ClientCommand::MapSelect { room } => format!("MAPSELECT {}", room),
            ClientCommand::Ready => "READY".to_string(),
            ClientCommand::Move { x, y } => format!("MOVE {} {}", x, y),
            ClientCommand::Missile { x, y } => format!("MISSILE {} {}", x, y),
        }
    }
}

/// Per-session configuration sent once after a successful join. Keys may
/// arrive in any order; unknown keys are skipped so older clients keep
/// working when new settings appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub field_width: i32,
    pub field_height: i32,
    pub player_width: i32,
    pub player_height: i32,
    pub missile_width: i32,
    pub missile_height: i32,
    pub background_image: String,
    pub player1_image: String,
    pub player2_image: String,
    pub missile_image: String,
    pub obstacle_image: String,
    pub item_image: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            player_width: PLAYER_WIDTH,
            player_height: PLAYER_HEIGHT,
            missile_width: MISSILE_WIDTH,
            missile_height: MISSILE_HEIGHT,
            background_image: "images/back2.png".to_string(),
            player1_image: "images/spaceship5.png".to_string(),
            player2_image: "images/spaceship6.png".to_string(),
            missile_image: "images/missile.png".to_string(),
            obstacle_image: "images/obstacle.png".to_string(),
            item_image: "images/double_missile_item.png".to_string(),
        }
    }
}

/// One broadcast frame: everything a client needs to draw the field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateFrame {
    pub players: Vec<PlayerSnapshot>,
    pub missiles: Vec<Missile>,
    pub obstacles: Vec<Obstacle>,
    pub items: Vec<Item>,
}

/// Messages the server may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Join accepted; carries the assigned player id and the room id.
    Connected { player_id: String, room: String },
    /// Session configuration, sent before `Connected`.
    Settings(SessionSettings),
    /// Both players are ready; the match begins.
    GameStart,
    /// Still waiting on the opponent.
    Waiting,
    /// The requested room already has two players.
    MapFull,
    /// Periodic snapshot, already mirrored for the receiving player.
    GameState(StateFrame),
    /// The receiving player lost.
    Defeat,
    /// The receiving player won.
    Victory,
}

impl ServerMessage {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut cursor = TokenCursor::new(line);
        let keyword = cursor.next_opt().ok_or(ProtocolError::EmptyLine)?;
        match keyword {
            "CONNECTED" => Ok(ServerMessage::Connected {
                player_id: cursor.next("CONNECTED")?.to_string(),
                room: cursor.next("CONNECTED")?.to_string(),
            }),
            "SETTINGS" => parse_settings(&mut cursor),
            "GAMESTART" => Ok(ServerMessage::GameStart),
            "WAITING" => Ok(ServerMessage::Waiting),
            "MAPFULL" => Ok(ServerMessage::MapFull),
            "GAMESTATE" => parse_state_frame(&mut cursor),
            "DEFEAT" => Ok(ServerMessage::Defeat),
            "VICTORY" => Ok(ServerMessage::Victory),
            other => Err(ProtocolError::UnknownMessage(other.to_string())),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ServerMessage::Connected { player_id, room } => {
                format!("CONNECTED {} {}", player_id, room)
            }
            ServerMessage::Settings(settings) => encode_settings(settings),
            ServerMessage::GameStart => "GAMESTART".to_string(),
            ServerMessage::Waiting => "WAITING".to_string(),
            ServerMessage::MapFull => "MAPFULL".to_string(),
            ServerMessage::GameState(frame) => encode_state_frame(frame),
            ServerMessage::Defeat => "DEFEAT".to_string(),
            ServerMessage::Victory => "VICTORY".to_string(),
        }
    }
}

fn parse_settings(cursor: &mut TokenCursor) -> Result<ServerMessage, ProtocolError> {
    let mut settings = SessionSettings::default();
    while let Some(key) = cursor.next_opt() {
        match key {
            "FIELD_WIDTH" => settings.field_width = cursor.next_i32("SETTINGS")?,
            "FIELD_HEIGHT" => settings.field_height = cursor.next_i32("SETTINGS")?,
            "PLAYER_WIDTH" => settings.player_width = cursor.next_i32("SETTINGS")?,
            "PLAYER_HEIGHT" => settings.player_height = cursor.next_i32("SETTINGS")?,
            "MISSILE_WIDTH" => settings.missile_width = cursor.next_i32("SETTINGS")?,
            "MISSILE_HEIGHT" => settings.missile_height = cursor.next_i32("SETTINGS")?,
            "BACKGROUND_IMAGE" => settings.background_image = cursor.next("SETTINGS")?.to_string(),
            "PLAYER1_IMAGE" => settings.player1_image = cursor.next("SETTINGS")?.to_string(),
            "PLAYER2_IMAGE" => settings.player2_image = cursor.next("SETTINGS")?.to_string(),
            "MISSILE_IMAGE" => settings.missile_image = cursor.next("SETTINGS")?.to_string(),
            "OBSTACLE_IMAGE" => settings.obstacle_image = cursor.next("SETTINGS")?.to_string(),
            "ITEM_IMAGE" => settings.item_image = cursor.next("SETTINGS")?.to_string(),
            _ => {
                cursor.next("SETTINGS")?;
            }
        }
    }
    Ok(ServerMessage::Settings(settings))
}

fn encode_settings(settings: &SessionSettings) -> String {
    format!(
        "SETTINGS FIELD_WIDTH {} FIELD_HEIGHT {} PLAYER_WIDTH {} PLAYER_HEIGHT {} \
         MISSILE_WIDTH {} MISSILE_HEIGHT {} BACKGROUND_IMAGE {} PLAYER1_IMAGE {} \
         PLAYER2_IMAGE {} MISSILE_IMAGE {} OBSTACLE_IMAGE {} ITEM_IMAGE {}",
        settings.field_width,
        settings.field_height,
        settings.player_width,
        settings.player_height,
        settings.missile_width,
        settings.missile_height,
        settings.background_image,
        settings.player1_image,
        settings.player2_image,
        settings.missile_image,
        settings.obstacle_image,
        settings.item_image,
    )
}

fn parse_state_frame(cursor: &mut TokenCursor) -> Result<ServerMessage, ProtocolError> {
    let mut frame = StateFrame::default();
    while let Some(group) = cursor.next_opt() {
        match group {
            "PLAYER" => frame.players.push(PlayerSnapshot {
                id: cursor.next("PLAYER")?.to_string(),
                x: cursor.next_i32("PLAYER")?,
                y: cursor.next_i32("PLAYER")?,
                health: cursor.next_i32("PLAYER")?,
            }),
            "MISSILE" => frame.missiles.push(Missile {
                owner: cursor.next("MISSILE")?.to_string(),
                x: cursor.next_i32("MISSILE")?,
                y: cursor.next_i32("MISSILE")?,
            }),
            "OBSTACLE" => frame.obstacles.push(Obstacle {
                x: cursor.next_i32("OBSTACLE")?,
                y: cursor.next_i32("OBSTACLE")?,
                width: cursor.next_i32("OBSTACLE")?,
                height: cursor.next_i32("OBSTACLE")?,
                moving_right: cursor.next_flag("OBSTACLE")?,
            }),
            "ITEM" => {
                let kind_token = cursor.next("ITEM")?;
                let kind = ItemKind::parse(kind_token)
                    .ok_or_else(|| ProtocolError::UnknownItemKind(kind_token.to_string()))?;
                frame.items.push(Item {
                    kind,
                    x: cursor.next_i32("ITEM")?,
                    y: cursor.next_i32("ITEM")?,
                    width: cursor.next_i32("ITEM")?,
                    height: cursor.next_i32("ITEM")?,
                    moving_right: cursor.next_flag("ITEM")?,
                });
            }
            other => return Err(ProtocolError::UnknownGroup(other.to_string())),
        }
    }
    Ok(ServerMessage::GameState(frame))
}

fn encode_state_frame(frame: &StateFrame) -> String {
    let mut line = String::from("GAMESTATE");
    for player in &frame.players {
        line.push_str(&format!(
            " PLAYER {} {} {} {}",
            player.id, player.x, player.y, player.health
        ));
    }
    for missile in &frame.missiles {
        line.push_str(&format!(
            " MISSILE {} {} {}",
            missile.owner, missile.x, missile.y
        ));
    }
    for obstacle in &frame.obstacles {
        line.push_str(&format!(
            " OBSTACLE {} {} {} {} {}",
            obstacle.x, obstacle.y, obstacle.width, obstacle.height, obstacle.moving_right
        ));
    }
    for item in &frame.items {
        line.push_str(&format!(
            " ITEM {} {} {} {} {} {}",
            item.kind.as_str(),
            item.x,
            item.y,
            item.width,
            item.height,
            item.moving_right
        ));
    }
    line
}
