//! Explosion scheduling and resolution
//!
//! A finished projectile (or a water dunk) schedules exactly one resolution.
//! The resolver waits a settle period so debris and bodies stop moving, then
//! carves terrain and applies distance-falloff damage in a single step, then
//! waits a short completion delay before signalling the turn coordinator.

use glam::Vec2;

use crate::consts::*;
use crate::physics::PhysicsWorld;

use super::state::Timer;
use super::team::{DamageOutcome, Registry};
use super::terrain::Terrain;

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Settling {
        timer: Timer,
        point: Vec2,
        damage: f32,
        radius: f32,
    },
    Delay {
        timer: Timer,
    },
}

/// What a resolution step produced, reported back to the coordinator.
#[derive(Debug, Clone, Default)]
pub struct Detonation {
    pub point: Vec2,
    pub effective_radius: f32,
    pub terrain_removed: usize,
    pub casualties: Vec<DamageOutcome>,
}

/// Damage at distance `d` from the blast center: peaks at twice the nominal
/// damage at the center and falls off linearly to zero at the edge.
pub fn falloff_damage(base_damage: f32, effective_radius: f32, distance: f32) -> f32 {
    if distance >= effective_radius {
        return 0.0;
    }
    base_damage * EXPLOSION_AMPLIFICATION * (1.0 - distance / effective_radius)
}

#[derive(Debug)]
pub struct Resolver {
    phase: Phase,
    /// One resolution per turn; reset when the next turn starts.
    scheduled: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            scheduled: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Clear the once-per-turn latch at turn start.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.scheduled = false;
    }

    /// Queue a resolution at `point`. Returns false if one was already
    /// scheduled this turn (e.g. a dunk racing the rest detector).
    pub fn schedule(&mut self, point: Vec2, base_damage: f32, base_radius: f32) -> bool {
        if self.scheduled {
            log::debug!("resolution already scheduled, ignoring duplicate at {point:?}");
            return false;
        }
        self.scheduled = true;
        self.phase = Phase::Settling {
            timer: Timer::one_shot(EXPLOSION_SETTLE),
            point,
            damage: base_damage,
            radius: base_radius,
        };
        log::info!(
            "explosion scheduled at ({:.1}, {:.1}) damage {base_damage} radius {base_radius}",
            point.x,
            point.y
        );
        true
    }

    /// Advance the resolver.
    ///
    /// Returns `(detonation, completed)`: the detonation when the settle
    /// period just expired, and `completed` when the post-resolution delay
    /// elapsed and the next turn may begin.
    pub fn tick(
        &mut self,
        physics: &mut PhysicsWorld,
        terrain: &mut Terrain,
        registry: &mut Registry,
        dt: f32,
    ) -> (Option<Detonation>, bool) {
        match &mut self.phase {
            Phase::Idle => (None, false),
            Phase::Settling {
                timer,
                point,
                damage,
                radius,
            } => {
                if timer.tick(dt) == 0 {
                    return (None, false);
                }
                let (point, damage, radius) = (*point, *damage, *radius);
                let detonation = Self::detonate(physics, terrain, registry, point, damage, radius);
                self.phase = Phase::Delay {
                    timer: Timer::one_shot(EXPLOSION_COMPLETE_DELAY),
                };
                (Some(detonation), false)
            }
            Phase::Delay { timer } => {
                if timer.tick(dt) == 0 {
                    return (None, false);
                }
                self.phase = Phase::Idle;
                (None, true)
            }
        }
    }

    fn detonate(
        physics: &mut PhysicsWorld,
        terrain: &mut Terrain,
        registry: &mut Registry,
        point: Vec2,
        base_damage: f32,
        base_radius: f32,
    ) -> Detonation {
        let effective_radius = base_radius * EXPLOSION_AMPLIFICATION;
        let terrain_removed = terrain.remove_within_radius(physics, point, effective_radius);

        // Collect targets first so damage application can mutate the world.
        let mut in_range = Vec::new();
        for team in registry.teams() {
            for combatant in team.roster.iter() {
                if let Some(pos) = physics.position(combatant.body) {
                    let distance = pos.distance(point);
                    if distance < effective_radius {
                        in_range.push((combatant.body, distance));
                    }
                }
            }
        }
        let mut casualties = Vec::new();
        for (body, distance) in in_range {
            let amount = falloff_damage(base_damage, effective_radius, distance);
            let outcome = registry.apply_damage(physics, body, amount);
            if !matches!(outcome, DamageOutcome::Ignored) {
                casualties.push(outcome);
            }
        }
        log::info!(
            "detonation at ({:.1}, {:.1}): radius {effective_radius:.0}, {terrain_removed} terrain bodies removed, {} combatants hit",
            point.x,
            point.y,
            casualties.len()
        );
        Detonation {
            point,
            effective_radius,
            terrain_removed,
            casualties,
        }
    }
}
