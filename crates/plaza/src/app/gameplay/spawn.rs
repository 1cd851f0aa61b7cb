use std::time::Duration;

use engine::{Rect, TaskOwner, TimerId, TimerQueue, Vec2};
use rand::Rng;
use tracing::info;

use super::config::SpawnConfig;
use super::orchestrator::WorldTask;
use super::wander::CritterVariant;

/// Schedules staggered critter spawns and samples where and what they are.
#[derive(Debug, Clone)]
pub(crate) struct SpawnDirector {
    stagger: Duration,
    margin: f32,
}

impl SpawnDirector {
    pub(crate) fn new(config: &SpawnConfig) -> Self {
        Self {
            stagger: Duration::from_millis(config.stagger_ms),
            margin: config.margin,
        }
    }

    /// Spawn `index` fires `index * stagger` after the call.
    pub(crate) fn spawn_batch(
        &self,
        count: u32,
        timers: &mut TimerQueue<WorldTask>,
    ) -> Vec<TimerId> {
        let ids = (0..count)
            .map(|index| {
                timers.after(
                    TaskOwner::Scene,
                    self.stagger.saturating_mul(index),
                    WorldTask::Spawn { index },
                )
            })
            .collect::<Vec<_>>();
        info!(
            count,
            stagger_ms = self.stagger.as_millis() as u64,
            "spawn_batch_scheduled"
        );
        ids
    }

    pub(crate) fn spawn_area(&self, world_bounds: Rect) -> Rect {
        world_bounds.inset(self.margin)
    }

    /// Bounds for a critter body of `radius` whose center must stay inside
    /// [`Self::spawn_area`]. Physics keeps the whole circle inside body bounds.
    pub(crate) fn body_bounds(&self, world_bounds: Rect, radius: f32) -> Rect {
        world_bounds.inset((self.margin - radius).max(0.0))
    }

    pub(crate) fn sample_position<R: Rng>(&self, rng: &mut R, world_bounds: Rect) -> Vec2 {
        let area = self.spawn_area(world_bounds);
        Vec2::new(
            rng.gen_range(area.min.x..=area.max.x),
            rng.gen_range(area.min.y..=area.max.y),
        )
    }

    pub(crate) fn sample_variant<R: Rng>(&self, rng: &mut R) -> CritterVariant {
        CritterVariant::ALL[rng.gen_range(0..CritterVariant::ALL.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn batch_is_staggered_from_now() {
        let director = SpawnDirector::new(&SpawnConfig::default());
        let mut timers = TimerQueue::default();
        let ids = director.spawn_batch(15, &mut timers);
        assert_eq!(ids.len(), 15);

        timers.advance(Duration::from_secs(10));
        let mut fired = Vec::new();
        while let Some(task) = timers.pop_due() {
            fired.push((task.payload, task.fired_at));
        }
        assert_eq!(fired.len(), 15);
        for (index, (payload, fired_at)) in fired.into_iter().enumerate() {
            assert_eq!(payload, WorldTask::Spawn { index: index as u32 });
            assert_eq!(fired_at, Duration::from_millis(500 * index as u64));
        }
    }

    #[test]
    fn sampled_positions_stay_inside_margin() {
        let director = SpawnDirector::new(&SpawnConfig::default());
        let mut rng = XorShiftRng::seed_from_u64(5);
        let world = Rect::from_size(800.0, 640.0);
        for _ in 0..500 {
            let position = director.sample_position(&mut rng, world);
            assert!((100.0..=700.0).contains(&position.x), "{position:?}");
            assert!((100.0..=540.0).contains(&position.y), "{position:?}");
        }
    }

    #[test]
    fn tiny_world_collapses_spawn_area_to_center() {
        let director = SpawnDirector::new(&SpawnConfig::default());
        let mut rng = XorShiftRng::seed_from_u64(9);
        let position = director.sample_position(&mut rng, Rect::from_size(120.0, 80.0));
        assert_eq!(position, Vec2::new(60.0, 40.0));
    }

    #[test]
    fn body_bounds_keep_centers_on_the_spawn_area() {
        let director = SpawnDirector::new(&SpawnConfig::default());
        let world = Rect::from_size(800.0, 640.0);
        let centers = director.body_bounds(world, 32.0).inset(32.0);
        assert_eq!(centers, director.spawn_area(world));

        // A margin thinner than the body falls back to the world edge.
        let thin = SpawnDirector::new(&SpawnConfig {
            margin: 10.0,
            ..SpawnConfig::default()
        });
        assert_eq!(thin.body_bounds(world, 32.0), world);
    }

    #[test]
    fn every_variant_is_reachable() {
        let director = SpawnDirector::new(&SpawnConfig::default());
        let mut rng = XorShiftRng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(director.sample_variant(&mut rng));
        }
        assert_eq!(seen.len(), CritterVariant::ALL.len());
    }
}
