//! Shared game model for the two-player shooting game
//!
//! This crate holds everything both the server and protocol consumers agree
//! on: the playing field and entity dimensions, the wire-visible entity
//! records, the coordinate mirroring used to present each player with a
//! bottom-of-screen view of themselves, and the axis-aligned overlap test
//! used for all hit detection.

pub mod protocol;

/// Playing field width in pixels.
pub const FIELD_WIDTH: i32 = 500;
/// Playing field height in pixels.
pub const FIELD_HEIGHT: i32 = 770;

pub const PLAYER_WIDTH: i32 = 90;
pub const PLAYER_HEIGHT: i32 = 90;
pub const MISSILE_WIDTH: i32 = 10;
pub const MISSILE_HEIGHT: i32 = 30;
pub const OBSTACLE_WIDTH: i32 = 50;
pub const OBSTACLE_HEIGHT: i32 = 50;
pub const ITEM_WIDTH: i32 = 40;
pub const ITEM_HEIGHT: i32 = 40;

/// Where a freshly joined player is placed, in their own view of the field.
pub const SPAWN_X: i32 = 180;
pub const SPAWN_Y: i32 = 600;

pub const INITIAL_HEALTH: i32 = 100;
pub const MAX_HEALTH: i32 = 100;
/// Health lost per missile or obstacle hit.
pub const COLLISION_DAMAGE: i32 = 10;

/// Pixels a missile climbs per simulation tick.
pub const MISSILE_SPEED: i32 = 7;
/// Pixels an obstacle or item drifts sideways per movement step.
pub const DRIFT_SPEED: i32 = 5;

/// Simulation tick period in milliseconds.
pub const TICK_MILLIS: u64 = 50;
pub const OBSTACLE_SPAWN_MILLIS: u64 = 2_000;
pub const ITEM_SPAWN_MILLIS: u64 = 10_000;
pub const DEFAULT_MAX_OBSTACLES: usize = 10;

pub const DEFAULT_PORT: u16 = 12345;

/// Shots granted by a DOUBLE_MISSILE pickup.
pub const DOUBLE_MISSILE_SHOTS: u32 = 5;
/// Lateral offset of each missile in a doubled pair.
pub const DOUBLE_MISSILE_OFFSET: i32 = 15;

/// Reflects a horizontal coordinate across the field center.
///
/// Applied together with [`mirror_y`] this maps an entity's bounding box
/// into the opposing player's view of the field. The transform is its own
/// inverse for a fixed entity size.
pub fn mirror_x(x: i32, entity_width: i32) -> i32 {
    FIELD_WIDTH - x - entity_width
}

/// Reflects a vertical coordinate across the field center.
pub fn mirror_y(y: i32, entity_height: i32) -> i32 {
    FIELD_HEIGHT - y - entity_height
}

/// An axis-aligned box as (x, y, width, height).
pub type Bounds = (i32, i32, i32, i32);

/// Strict AABB overlap: boxes that only touch along an edge do not overlap.
pub fn overlaps(a: Bounds, b: Bounds) -> bool {
    let (ax, ay, aw, ah) = a;
    let (bx, by, bw, bh) = b;
    ax < bx + bw && bx < ax + aw && ay < by + bh && by < ay + ah
}

/// The 90x90 box occupied by a player at the given position.
pub fn player_bounds(x: i32, y: i32) -> Bounds {
    (x, y, PLAYER_WIDTH, PLAYER_HEIGHT)
}

/// A player's box reflected into the opposing view. All cross-view hit
/// tests compare an entity at its stored coordinates against this box.
pub fn mirrored_player_bounds(x: i32, y: i32) -> Bounds {
    (
        mirror_x(x, PLAYER_WIDTH),
        mirror_y(y, PLAYER_HEIGHT),
        PLAYER_WIDTH,
        PLAYER_HEIGHT,
    )
}

/// Wire-visible view of a player inside a GAMESTATE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub health: i32,
}

impl PlayerSnapshot {
    pub fn bounds(&self) -> Bounds {
        player_bounds(self.x, self.y)
    }

    /// The same player as seen from the opposing side.
    pub fn mirrored(&self) -> Self {
        Self {
            id: self.id.clone(),
            x: mirror_x(self.x, PLAYER_WIDTH),
            y: mirror_y(self.y, PLAYER_HEIGHT),
            health: self.health,
        }
    }
}

/// A missile in flight. Coordinates are in the owner's view of the field;
/// missiles climb toward y = 0 and expire past the top edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Missile {
    pub owner: String,
    pub x: i32,
    pub y: i32,
}

impl Missile {
    pub fn bounds(&self) -> Bounds {
        (self.x, self.y, MISSILE_WIDTH, MISSILE_HEIGHT)
    }

    pub fn mirrored(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            x: mirror_x(self.x, MISSILE_WIDTH),
            y: mirror_y(self.y, MISSILE_HEIGHT),
        }
    }
}

/// A drifting obstacle. Spawned at one side edge, moves toward the other,
/// and damages whichever player it runs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub moving_right: bool,
}

impl Obstacle {
    pub fn bounds(&self) -> Bounds {
        (self.x, self.y, self.width, self.height)
    }

    /// Position flipped into the opposing view; the drift flag is part of
    /// the entity's identity and passes through unchanged.
    pub fn mirrored(&self) -> Self {
        Self {
            x: mirror_x(self.x, self.width),
            y: mirror_y(self.y, self.height),
            ..*self
        }
    }
}

/// Collectible powerup kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    DoubleMissile,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::DoubleMissile => "DOUBLE_MISSILE",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "DOUBLE_MISSILE" => Some(ItemKind::DoubleMissile),
            _ => None,
        }
    }
}

/// A collectible item. Drifts like an obstacle but grants an effect on
/// contact instead of dealing damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub moving_right: bool,
}

impl Item {
    pub fn bounds(&self) -> Bounds {
        (self.x, self.y, self.width, self.height)
    }

    pub fn mirrored(&self) -> Self {
        Self {
            x: mirror_x(self.x, self.width),
            y: mirror_y(self.y, self.height),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_known_position() {
        // A player at the default spawn appears near the top of the
        // opponent's screen.
        assert_eq!(mirror_x(SPAWN_X, PLAYER_WIDTH), 230);
        assert_eq!(mirror_y(SPAWN_Y, PLAYER_HEIGHT), 80);
    }

    #[test]
    fn test_mirror_is_involution() {
        for (x, y) in [(0, 0), (180, 600), (410, 740), (123, 456)] {
            let mx = mirror_x(x, PLAYER_WIDTH);
            let my = mirror_y(y, PLAYER_HEIGHT);
            assert_eq!(mirror_x(mx, PLAYER_WIDTH), x);
            assert_eq!(mirror_y(my, PLAYER_HEIGHT), y);
        }
    }

    #[test]
    fn test_mirrored_entities_round_trip() {
        let player = PlayerSnapshot {
            id: "Player1".to_string(),
            x: 75,
            y: 320,
            health: 60,
        };
        assert_eq!(player.mirrored().mirrored(), player);

        let missile = Missile {
            owner: "Player2".to_string(),
            x: 140,
            y: 480,
        };
        assert_eq!(missile.mirrored().mirrored(), missile);

        let obstacle = Obstacle {
            x: 0,
            y: 333,
            width: OBSTACLE_WIDTH,
            height: OBSTACLE_HEIGHT,
            moving_right: true,
        };
        assert_eq!(obstacle.mirrored().mirrored(), obstacle);
        assert!(obstacle.mirrored().moving_right);

        let item = Item {
            kind: ItemKind::DoubleMissile,
            x: 450,
            y: 12,
            width: ITEM_WIDTH,
            height: ITEM_HEIGHT,
            moving_right: false,
        };
        assert_eq!(item.mirrored().mirrored(), item);
    }

    #[test]
    fn test_overlap_detection() {
        let a = (100, 100, 50, 50);
        assert!(overlaps(a, (120, 120, 50, 50)));
        assert!(overlaps(a, (100, 100, 50, 50)));
        assert!(!overlaps(a, (200, 200, 50, 50)));
    }

    #[test]
    fn test_overlap_edge_touch_is_not_a_hit() {
        let a = (100, 100, 50, 50);
        assert!(!overlaps(a, (150, 100, 50, 50)));
        assert!(!overlaps(a, (100, 150, 50, 50)));
        assert!(!overlaps(a, (50, 100, 50, 50)));
    }

    #[test]
    fn test_missile_against_mirrored_player() {
        // A missile fired straight at the opponent's mirrored spawn box
        // registers as a hit; one just outside does not.
        let target = mirrored_player_bounds(SPAWN_X, SPAWN_Y);
        let missile = Missile {
            owner: "Player1".to_string(),
            x: 230,
            y: 80,
        };
        assert!(overlaps(missile.bounds(), target));

        let wide = Missile {
            owner: "Player1".to_string(),
            x: 320,
            y: 80,
        };
        assert!(!overlaps(wide.bounds(), target));
    }

    #[test]
    fn test_item_kind_tokens() {
        assert_eq!(ItemKind::DoubleMissile.as_str(), "DOUBLE_MISSILE");
        assert_eq!(
            ItemKind::parse("DOUBLE_MISSILE"),
            Some(ItemKind::DoubleMissile)
        );
        assert_eq!(ItemKind::parse("TRIPLE_MISSILE"), None);
    }
}
