//! Item spawning and pickup for one game session
//!
//! Items drift across the field exactly like obstacles, on a much slower
//! spawn timer, and are collected rather than collided with: contact
//! grants the touching player the item's effect and deals no damage.

use log::debug;
use rand::Rng;
use shared::{
    overlaps, Bounds, Item, ItemKind, DRIFT_SPEED, FIELD_HEIGHT, FIELD_WIDTH, ITEM_HEIGHT,
    ITEM_SPAWN_MILLIS, ITEM_WIDTH, TICK_MILLIS,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};

/// The collectible items currently crossing a session's field.
#[derive(Debug)]
pub struct ItemField {
    items: Mutex<Vec<Item>>,
    running: AtomicBool,
}

impl ItemField {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Starts the spawn and drift tasks, mirroring the obstacle timers
    /// with the item cadence.
    pub fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);

        let field = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = interval(Duration::from_millis(ITEM_SPAWN_MILLIS));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            while field.running.load(Ordering::SeqCst) {
                timer.tick().await;
                if !field.running.load(Ordering::SeqCst) {
                    break;
                }
                field.spawn_one().await;
            }
        });

        let field = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = interval(Duration::from_millis(TICK_MILLIS));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            while field.running.load(Ordering::SeqCst) {
                timer.tick().await;
                if !field.running.load(Ordering::SeqCst) {
                    break;
                }
                field.advance().await;
            }
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn reset(&self) {
        self.items.lock().await.clear();
    }

    /// Drops a DOUBLE_MISSILE item in from a random side edge.
    pub async fn spawn_one(&self) {
        let mut items = self.items.lock().await;
        let item = {
            let mut rng = rand::thread_rng();
            let from_left = rng.gen_bool(0.5);
            Item {
                kind: ItemKind::DoubleMissile,
                x: if from_left { 0 } else { FIELD_WIDTH - ITEM_WIDTH },
                y: rng.gen_range(0..FIELD_HEIGHT),
                width: ITEM_WIDTH,
                height: ITEM_HEIGHT,
                moving_right: from_left,
            }
        };
        debug!("spawned {} item at ({}, {})", item.kind.as_str(), item.x, item.y);
        items.push(item);
    }

    /// One drift step plus the full-exit discard rule.
    pub async fn advance(&self) {
        let mut items = self.items.lock().await;
        for item in items.iter_mut() {
            if item.moving_right {
                item.x += DRIFT_SPEED;
            } else {
                item.x -= DRIFT_SPEED;
            }
        }
        items.retain(|i| {
            if i.moving_right {
                i.x < FIELD_WIDTH
            } else {
                i.x + i.width > 0
            }
        });
    }

    /// Removes every item overlapping one of the target boxes and returns
    /// who picked up what.
    pub async fn collect_overlapping(&self, targets: &[(String, Bounds)]) -> Vec<(String, ItemKind)> {
        let mut items = self.items.lock().await;
        let mut pickups = Vec::new();
        items.retain(|item| {
            match targets
                .iter()
                .find(|(_, bounds)| overlaps(item.bounds(), *bounds))
            {
                Some((id, _)) => {
                    pickups.push((id.clone(), item.kind));
                    false
                }
                None => true,
            }
        });
        pickups
    }

    pub async fn snapshot(&self) -> Vec<Item> {
        self.items.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.items.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn insert(&self, item: Item) {
        self.items.lock().await.push(item);
    }
}

impl Default for ItemField {
    fn default() -> Self {
        Self::new()
    }
}
