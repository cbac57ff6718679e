//! Obstacle simulation for one game session
//!
//! Obstacles live on their own timers, independent of the match tick: a
//! spawn task drops a new obstacle in from a side edge every couple of
//! seconds, and a drift task slides every obstacle toward the far side.
//! The session's collision pass pulls hits out of the set between steps.

use log::debug;
use rand::Rng;
use shared::{
    overlaps, Bounds, Obstacle, DRIFT_SPEED, FIELD_HEIGHT, FIELD_WIDTH, OBSTACLE_HEIGHT,
    OBSTACLE_SPAWN_MILLIS, OBSTACLE_WIDTH, TICK_MILLIS,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};

/// The set of obstacles threatening both players of one session.
///
/// `start` spawns the timer tasks and `stop` lets them run down; the set
/// itself stays usable for collision queries throughout.
#[derive(Debug)]
pub struct ObstacleField {
    obstacles: Mutex<Vec<Obstacle>>,
    running: AtomicBool,
    max_obstacles: usize,
}

impl ObstacleField {
    pub fn new(max_obstacles: usize) -> Self {
        Self {
            obstacles: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            max_obstacles,
        }
    }

    /// Starts the spawn and drift tasks. Both run until [`stop`] clears
    /// the running flag.
    ///
    /// [`stop`]: ObstacleField::stop
    pub fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);

        let field = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = interval(Duration::from_millis(OBSTACLE_SPAWN_MILLIS));
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

    /// Signals both timer tasks to exit after their current sleep.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clears the set, giving a starting match an empty field.
    pub async fn reset(&self) {
        self.obstacles.lock().await.clear();
    }

    /// Adds one obstacle at a random height on a random side edge,
    /// drifting toward the opposite side. Skipped while the set is at the
    /// configured cap.
    pub async fn spawn_one(&self) {
        let mut obstacles = self.obstacles.lock().await;
        if obstacles.len() >= self.max_obstacles {
            debug!("obstacle cap ({}) reached, skipping spawn", self.max_obstacles);
            return;
        }
        let obstacle = {
            let mut rng = rand::thread_rng();
            let from_left = rng.gen_bool(0.5);
            Obstacle {
                x: if from_left { 0 } else { FIELD_WIDTH - OBSTACLE_WIDTH },
                y: rng.gen_range(0..FIELD_HEIGHT),
                width: OBSTACLE_WIDTH,
                height: OBSTACLE_HEIGHT,
                moving_right: from_left,
            }
        };
        obstacles.push(obstacle);
    }

    /// Moves every obstacle one drift step and drops the ones that have
    /// fully left the field on their far side.
    pub async fn advance(&self) {
        let mut obstacles = self.obstacles.lock().await;
        for obstacle in obstacles.iter_mut() {
            if obstacle.moving_right {
                obstacle.x += DRIFT_SPEED;
            } else {
                obstacle.x -= DRIFT_SPEED;
            }
        }
        obstacles.retain(|o| {
            if o.moving_right {
                o.x < FIELD_WIDTH
            } else {
                o.x + o.width > 0
            }
        });
    }

    /// Removes every obstacle overlapping one of the target boxes and
    /// returns the id paired with each removed obstacle's first hit.
    pub async fn remove_colliding(&self, targets: &[(String, Bounds)]) -> Vec<String> {
        let mut obstacles = self.obstacles.lock().await;
        let mut hits = Vec::new();
        obstacles.retain(|obstacle| {
            match targets
                .iter()
                .find(|(_, bounds)| overlaps(obstacle.bounds(), *bounds))
            {
                Some((id, _)) => {
                    hits.push(id.clone());
                    false
                }
                None => true,
            }
        });
        hits
    }

    pub async fn snapshot(&self) -> Vec<Obstacle> {
        self.obstacles.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.obstacles.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn insert(&self, obstacle: Obstacle) {
        self.obstacles.lock().await.push(obstacle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obstacle_at(x: i32, moving_right: bool) -> Obstacle {
        Obstacle {
            x,
            y: 200,
            width: OBSTACLE_WIDTH,
            height: OBSTACLE_HEIGHT,
            moving_right,
        }
    }

    #[tokio::test]
    async fn test_spawn_places_obstacle_on_an_edge() {
        let field = ObstacleField::new(10);
        for _ in 0..20 {
            field.spawn_one().await;
        }
        for obstacle in field.snapshot().await {
            if obstacle.moving_right {
                assert_eq!(obstacle.x, 0);
            } else {
                assert_eq!(obstacle.x, FIELD_WIDTH - OBSTACLE_WIDTH);
            }
            assert!((0..FIELD_HEIGHT).contains(&obstacle.y));
        }
    }

    #[tokio::test]
    async fn test_spawn_respects_cap() {
        let field = ObstacleField::new(3);
        for _ in 0..10 {
            field.spawn_one().await;
        }
        assert_eq!(field.count().await, 3);
    }

    #[tokio::test]
    async fn test_advance_moves_both_directions() {
        let field = ObstacleField::new(10);
        field.insert(obstacle_at(100, true)).await;
        field.insert(obstacle_at(300, false)).await;

        field.advance().await;

        let obstacles = field.snapshot().await;
        assert_eq!(obstacles[0].x, 100 + DRIFT_SPEED);
        assert_eq!(obstacles[1].x, 300 - DRIFT_SPEED);
    }

    #[tokio::test]
    async fn test_advance_discards_after_full_exit() {
        let field = ObstacleField::new(10);
        // One step from fully leaving on each side.
        field.insert(obstacle_at(FIELD_WIDTH - DRIFT_SPEED, true)).await;
        field.insert(obstacle_at(DRIFT_SPEED - OBSTACLE_WIDTH, false)).await;
        // Still well inside.
        field.insert(obstacle_at(250, true)).await;

        field.advance().await;

        let obstacles = field.snapshot().await;
        assert_eq!(obstacles.len(), 1);
        assert_eq!(obstacles[0].x, 250 + DRIFT_SPEED);
    }

    #[tokio::test]
    async fn test_obstacle_touching_far_edge_survives() {
        let field = ObstacleField::new(10);
        // After this step the right edge touches the boundary; the
        // obstacle is still partly visible and must stay.
        field
            .insert(obstacle_at(FIELD_WIDTH - OBSTACLE_WIDTH - DRIFT_SPEED, true))
            .await;

        field.advance().await;
        assert_eq!(field.count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_colliding_reports_hits() {
        let field = ObstacleField::new(10);
        field.insert(obstacle_at(100, true)).await;
        field.insert(obstacle_at(400, false)).await;

        let targets: Vec<(String, Bounds)> = vec![("Player1".to_string(), (90, 180, 90, 90))];
        let hits = field.remove_colliding(&targets).await;

        assert_eq!(hits, vec!["Player1".to_string()]);
        assert_eq!(field.count().await, 1);
        assert_eq!(field.snapshot().await[0].x, 400);
    }

    #[tokio::test]
    async fn test_reset_and_stop() {
        let field = Arc::new(ObstacleField::new(10));
        field.spawn_one().await;
        assert_eq!(field.count().await, 1);

        field.reset().await;
        assert_eq!(field.count().await, 0);

        field.start();
        assert!(field.is_running());
        field.stop();
        assert!(!field.is_running());
    }
}
