//! Fixed-period simulation tick
//!
//! Each firing measures the real time since the previous one, converts it to
//! logical time units, steps every player and produces the snapshot that is
//! broadcast to all spawned sessions.

use crate::world::World;
use shared::config::LOGICAL_STEP;
use shared::{PlayerUpdate, ServerMessage};
use std::time::{Duration, Instant};

/// Longest gap, in tick periods, that is simulated in one step.
pub const MAX_DT_PERIODS: f32 = 2.0;

/// Ticks between periodic stats lines (about ten seconds at 67 ms).
pub const STATS_INTERVAL_TICKS: u64 = 150;

/// Converts a measured interval into logical time units.
///
/// A full `period` maps to [`LOGICAL_STEP`]; longer gaps are capped at
/// [`MAX_DT_PERIODS`] periods.
pub fn logical_dt(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return LOGICAL_STEP;
    }
    let periods = elapsed.as_secs_f32() / period.as_secs_f32();
    LOGICAL_STEP * periods.min(MAX_DT_PERIODS)
}

/// Steps the world by `dt` and returns the snapshot of every live player.
pub fn advance(world: &mut World, dt: f32) -> ServerMessage {
    world.advance(dt);
    snapshot(world)
}

pub fn snapshot(world: &World) -> ServerMessage {
    ServerMessage::UpdatePlayers(world.all_players().iter().map(PlayerUpdate::from).collect())
}

/// Tracks when the last tick fired.
#[derive(Debug, Clone)]
pub struct TickClock {
    period: Duration,
    last: Instant,
    ticks: u64,
}

impl TickClock {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            last: now,
            ticks: 0,
        }
    }

    /// Records a firing at `now` and returns the logical dt to simulate.
    pub fn fire(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        self.ticks += 1;
        logical_dt(elapsed, self.period)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats_due(&self) -> bool {
        self.ticks % STATS_INTERVAL_TICKS == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{GameConfig, Player, Vec2};

    const PERIOD: Duration = Duration::from_millis(67);

    #[test]
    fn test_nominal_period_is_one_logical_step() {
        assert_approx_eq!(logical_dt(PERIOD, PERIOD), LOGICAL_STEP);
        assert_approx_eq!(
            logical_dt(Duration::from_micros(33_500), PERIOD),
            LOGICAL_STEP / 2.0,
            1e-3
        );
    }

    #[test]
    fn test_long_gaps_are_capped() {
        assert_approx_eq!(
            logical_dt(Duration::from_secs(5), PERIOD),
            LOGICAL_STEP * MAX_DT_PERIODS
        );
        assert_approx_eq!(logical_dt(Duration::ZERO, PERIOD), 0.0);
        assert_approx_eq!(logical_dt(PERIOD, Duration::ZERO), LOGICAL_STEP);
    }

    #[test]
    fn test_tick_clock() {
        let start = Instant::now();
        let mut clock = TickClock::new(PERIOD, start);

        assert_approx_eq!(clock.fire(start + PERIOD), LOGICAL_STEP);
        assert_approx_eq!(clock.fire(start + PERIOD * 2), LOGICAL_STEP);
        assert_eq!(clock.ticks(), 2);

        // an earlier instant never produces a negative step
        assert_approx_eq!(clock.fire(start), 0.0);
    }

    #[test]
    fn test_stats_due() {
        let start = Instant::now();
        let mut clock = TickClock::new(PERIOD, start);
        let mut due = 0;
        for _ in 0..STATS_INTERVAL_TICKS * 2 {
            clock.fire(start);
            if clock.stats_due() {
                due += 1;
            }
        }
        assert_eq!(due, 2);
    }

    #[test]
    fn test_advance_snapshots_every_player() {
        let config = GameConfig {
            xp_blob_count: 0,
            ..GameConfig::default()
        };
        let mut world = World::new(config, &mut StdRng::seed_from_u64(8));
        for connection in 0..3 {
            let id = world.allocate_id().unwrap();
            let mut player = Player::new(
                id,
                format!("p{}", id),
                "#123456".to_string(),
                Vec2::new(1000.0, 1000.0),
                0.0,
            );
            player.set_movement(Some(0.0), 1.0);
            world.add_player(connection, player);
        }

        let snapshot = advance(&mut world, LOGICAL_STEP);

        match snapshot {
            ServerMessage::UpdatePlayers(updates) => {
                assert_eq!(updates.len(), 3);
                for (update, player) in updates.iter().zip(world.all_players()) {
                    assert_eq!(update.id, player.id);
                    assert!(update.x > 1000.0);
                    assert_eq!(update.x, player.position.x);
                    assert_eq!(update.blobs.len(), 1);
                    assert_eq!(update.blobs[0].x, player.blobs[0].position.x);
                    assert_approx_eq!(update.blobs[0].scale, 35.0);
                }
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_empty_world_snapshot() {
        let config = GameConfig {
            xp_blob_count: 0,
            ..GameConfig::default()
        };
        let mut world = World::new(config, &mut StdRng::seed_from_u64(8));

        assert_eq!(
            advance(&mut world, LOGICAL_STEP),
            ServerMessage::UpdatePlayers(Vec::new())
        );
    }
}
