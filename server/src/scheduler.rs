//! Fixed rate simulation driver shared by every room.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::{interval, MissedTickBehavior};

use crate::registry::SessionRegistry;
use crate::session::TickOutcome;

/// Advances every registered session on one shared cadence.
pub struct Scheduler {
    registry: Arc<SessionRegistry>,
    period: Duration,
}

impl Scheduler {
    pub fn new(registry: Arc<SessionRegistry>, period: Duration) -> Self {
        Scheduler { registry, period }
    }

    /// Runs forever. A session whose match ends on a tick is dropped from
    /// the registry, so its room id frees up immediately.
    pub async fn run(self) {
        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        loop {
            timer.tick().await;
            ticks += 1;

            for session in self.registry.sessions().await {
                if session.tick().await == TickOutcome::Ended {
                    info!("room {}: match finished", session.room());
                    self.registry.remove_session(&session).await;
                }
            }

            if ticks % 200 == 0 {
                debug!(
                    "tick {}: {} live rooms",
                    ticks,
                    self.registry.session_count().await
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{PLAYER_ONE, PLAYER_TWO};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    #[tokio::test]
    async fn test_scheduler_drives_sessions_and_sweeps_finished_rooms() {
        let registry = Arc::new(SessionRegistry::new(10));
        let scheduler = Scheduler::new(Arc::clone(&registry), Duration::from_millis(10));
        tokio::spawn(scheduler.run());

        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        let (session, _) = registry.join("Arena1", tx1).await.unwrap();
        registry.join("Arena1", tx2).await.unwrap();
        session.mark_ready(PLAYER_ONE).await;
        session.mark_ready(PLAYER_TWO).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        let lines = drain(&mut rx1);
        assert!(lines.iter().any(|l| l.starts_with("GAMESTATE ")));

        // Ten hits on Player2's mirrored box end the match.
        for _ in 0..10 {
            session.spawn_missile(PLAYER_ONE, 230, 117).await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        let lines = drain(&mut rx1);
        assert!(lines.iter().any(|l| l == "VICTORY"));
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_scheduler_leaves_waiting_rooms_alone() {
        let registry = Arc::new(SessionRegistry::new(10));
        let scheduler = Scheduler::new(Arc::clone(&registry), Duration::from_millis(10));
        tokio::spawn(scheduler.run());

        let (tx1, mut rx1) = unbounded_channel();
        registry.join("Arena1", tx1).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(registry.session_count().await, 1);
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }
}
