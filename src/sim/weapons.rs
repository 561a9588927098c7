//! Weapons, charging, and the projectile lifecycle
//!
//! Three weapons: two charged lobs (apple, banana) and one instant flat shot
//! (carrot). At most one projectile exists at a time; its rest/exit detection
//! runs on a fixed polling cadence and hands the finish position to the
//! explosion resolver.

use glam::Vec2;
use rapier2d::prelude::{InteractionGroups, InteractionTestMode, RigidBodyHandle};

use crate::consts::*;
use crate::physics::{
    BodyDef, BodyTag, PhysicsWorld, ShapeDef, GROUP_PROJECTILE, GROUP_SENSOR, GROUP_WORLD,
};
use crate::aim_vector;

use super::state::Timer;

/// The weapon roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeaponKind {
    #[default]
    Apple,
    Banana,
    Carrot,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 3] = [WeaponKind::Apple, WeaponKind::Banana, WeaponKind::Carrot];

    pub fn glyph(&self) -> &'static str {
        match self {
            WeaponKind::Apple => "🍎",
            WeaponKind::Banana => "🍌",
            WeaponKind::Carrot => "🥕",
        }
    }

    pub fn damage(&self) -> f32 {
        match self {
            WeaponKind::Apple => 15.0,
            WeaponKind::Banana => 25.0,
            WeaponKind::Carrot => 10.0,
        }
    }

    /// Nominal explosion radius (the resolver amplifies it further).
    pub fn explosion_radius(&self) -> f32 {
        match self {
            WeaponKind::Apple | WeaponKind::Carrot => WORM_RADIUS * 3.0,
            // Banana: widest destruction zone.
            WeaponKind::Banana => WORM_RADIUS * 3.0 * 3.5,
        }
    }

    /// Charged weapons build force while held; the carrot fires on tap.
    pub fn is_charged(&self) -> bool {
        !matches!(self, WeaponKind::Carrot)
    }

    /// Lobbed projectiles follow gravity; the carrot flies flat.
    pub fn is_lobbed(&self) -> bool {
        !matches!(self, WeaponKind::Carrot)
    }

    /// Launch speed for a charge force (charged) or the fixed speed (instant).
    pub fn launch_speed(&self, force: f32) -> f32 {
        match self {
            WeaponKind::Apple => force * 0.46875,
            WeaponKind::Banana => force * 0.3125,
            WeaponKind::Carrot => 23.4375,
        }
    }

    pub fn next(&self) -> WeaponKind {
        match self {
            WeaponKind::Apple => WeaponKind::Banana,
            WeaponKind::Banana => WeaponKind::Carrot,
            WeaponKind::Carrot => WeaponKind::Apple,
        }
    }
}

/// Charge accumulation while the fire input is held.
#[derive(Debug, Clone)]
pub struct Charge {
    pub force: f32,
    timer: Timer,
}

impl Charge {
    fn new() -> Self {
        Self {
            force: 0.0,
            timer: Timer::repeating(CHARGE_INTERVAL),
        }
    }

    /// Advance charge; returns true once the cap is hit (auto-fire).
    fn tick(&mut self, dt: f32) -> bool {
        for _ in 0..self.timer.tick(dt) {
            self.force += CHARGE_STEP;
            if self.force >= CHARGE_MAX {
                self.force = CHARGE_MAX;
                return true;
            }
        }
        false
    }

    pub fn percent(&self) -> f32 {
        self.force / CHARGE_MAX * 100.0
    }
}

/// The single in-flight projectile.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub body: RigidBodyHandle,
    pub weapon: WeaponKind,
    pub damage: f32,
    pub explosion_radius: f32,
    /// Last position seen while the body still existed.
    pub last_pos: Vec2,
    poll: Timer,
}

/// How a projectile's flight ended.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileFinished {
    pub at: Vec2,
    pub damage: f32,
    pub explosion_radius: f32,
}

/// Weapon selection, charging, and projectile tracking for the active turn.
#[derive(Default)]
pub struct WeaponSystem {
    pub selected: WeaponKind,
    charge: Option<Charge>,
    projectile: Option<Projectile>,
}

impl WeaponSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projectile_in_flight(&self) -> bool {
        self.projectile.is_some()
    }

    pub fn is_charging(&self) -> bool {
        self.charge.is_some()
    }

    /// Charge-bar percentage for the UI (0-100).
    pub fn charge_percent(&self) -> f32 {
        self.charge.as_ref().map(|c| c.percent()).unwrap_or(0.0)
    }

    pub fn change_weapon(&mut self) {
        self.selected = self.selected.next();
        log::debug!("weapon changed to {:?}", self.selected);
    }

    /// Begin charging a charged weapon. Instant weapons ignore this and are
    /// fired directly by the caller.
    pub fn start_charging(&mut self) {
        if self.selected.is_charged() && self.charge.is_none() {
            self.charge = Some(Charge::new());
        }
    }

    /// Release the fire input; returns the accumulated force if charging.
    pub fn release_charge(&mut self) -> Option<f32> {
        self.charge.take().map(|c| c.force)
    }

    pub fn cancel_charge(&mut self) {
        self.charge = None;
    }

    /// Advance charge accumulation; returns the force to auto-fire with if
    /// the cap was reached while still holding.
    pub fn tick_charge(&mut self, dt: f32) -> Option<f32> {
        let capped = self.charge.as_mut().map(|c| c.tick(dt)).unwrap_or(false);
        if capped {
            self.charge.take().map(|c| c.force)
        } else {
            None
        }
    }

    /// Spawn the projectile for the selected weapon.
    ///
    /// The muzzle sits [`MUZZLE_LENGTH`] from the combatant center along the
    /// aim direction, which also keeps the shot clear of the shooter.
    pub fn fire(
        &mut self,
        physics: &mut PhysicsWorld,
        shooter_pos: Vec2,
        aim_angle: f32,
        force: f32,
    ) -> bool {
        if self.projectile.is_some() {
            log::warn!("fire rejected: projectile already in flight");
            return false;
        }
        let weapon = self.selected;
        let dir = aim_vector(aim_angle);
        let muzzle = shooter_pos + dir * MUZZLE_LENGTH;
        let speed = weapon.launch_speed(force);

        let mut def = BodyDef::dynamic(
            muzzle,
            ShapeDef::Circle {
                radius: WORM_RADIUS,
            },
            BodyTag::Projectile,
        )
        .with_material(0.3, 0.5, 0.001)
        .with_groups(InteractionGroups::new(
            GROUP_PROJECTILE,
            GROUP_WORLD | GROUP_SENSOR,
            InteractionTestMode::And,
        ));
        if !weapon.is_lobbed() {
            def = def.without_gravity();
        }
        let body = physics.spawn(def);
        physics.set_velocity(body, dir * speed);

        self.projectile = Some(Projectile {
            body,
            weapon,
            damage: weapon.damage(),
            explosion_radius: weapon.explosion_radius(),
            last_pos: muzzle,
            poll: Timer::repeating(REST_POLL_INTERVAL),
        });
        log::info!(
            "{} fired at angle {:.2} with speed {:.2}",
            weapon.glyph(),
            aim_angle,
            speed
        );
        true
    }

    /// True if `body` is the tracked projectile.
    pub fn is_projectile(&self, body: RigidBodyHandle) -> bool {
        self.projectile.as_ref().map(|p| p.body) == Some(body)
    }

    /// Immediate finish via a collision-driven removal notification.
    pub fn finish_now(&mut self, physics: &mut PhysicsWorld) -> Option<ProjectileFinished> {
        let projectile = self.projectile.take()?;
        let at = physics.position(projectile.body).unwrap_or(projectile.last_pos);
        physics.remove(projectile.body);
        Some(ProjectileFinished {
            at,
            damage: projectile.damage,
            explosion_radius: projectile.explosion_radius,
        })
    }

    /// Rest/exit polling, run every tick.
    ///
    /// On the polling cadence the projectile is finished when its speed drops
    /// below the rest threshold or the physics world reports it dormant.
    /// Horizontal bounds exits are checked every tick.
    pub fn poll_projectile(
        &mut self,
        physics: &mut PhysicsWorld,
        dt: f32,
    ) -> Option<ProjectileFinished> {
        let projectile = self.projectile.as_mut()?;
        if let Some(pos) = physics.position(projectile.body) {
            projectile.last_pos = pos;
        }

        let exited = projectile.last_pos.x < 0.0 || projectile.last_pos.x > CANVAS_WIDTH;
        let mut resting = false;
        for _ in 0..projectile.poll.tick(dt) {
            let speed = physics
                .velocity(projectile.body)
                .map(|v| v.length())
                .unwrap_or(0.0);
            if speed < REST_SPEED_THRESHOLD || physics.is_sleeping(projectile.body) {
                resting = true;
            }
        }
        if exited || resting {
            return self.finish_now(physics);
        }
        None
    }

    /// Drop any in-flight projectile and charge state (teardown).
    pub fn clear(&mut self, physics: &mut PhysicsWorld) {
        if let Some(projectile) = self.projectile.take() {
            physics.remove(projectile.body);
        }
        self.charge = None;
        self.selected = WeaponKind::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weapon_table() {
        assert_eq!(WeaponKind::Apple.damage(), 15.0);
        assert_eq!(WeaponKind::Banana.damage(), 25.0);
        assert_eq!(WeaponKind::Carrot.damage(), 10.0);
        assert_eq!(WeaponKind::Apple.explosion_radius(), WORM_RADIUS * 3.0);
        assert_eq!(
            WeaponKind::Banana.explosion_radius(),
            WORM_RADIUS * 3.0 * 3.5
        );
        assert!((WeaponKind::Apple.launch_speed(50.0) - 23.4375).abs() < 1e-4);
        assert!((WeaponKind::Banana.launch_speed(50.0) - 15.625).abs() < 1e-4);
        assert!((WeaponKind::Carrot.launch_speed(0.0) - 23.4375).abs() < 1e-4);
        assert!(!WeaponKind::Carrot.is_charged());
        assert!(!WeaponKind::Carrot.is_lobbed());
    }

    #[test]
    fn test_weapon_cycling_wraps() {
        let mut system = WeaponSystem::new();
        assert_eq!(system.selected, WeaponKind::Apple);
        system.change_weapon();
        assert_eq!(system.selected, WeaponKind::Banana);
        system.change_weapon();
        assert_eq!(system.selected, WeaponKind::Carrot);
        system.change_weapon();
        assert_eq!(system.selected, WeaponKind::Apple);
    }

    #[test]
    fn test_charge_reaches_cap_after_five_seconds() {
        let mut system = WeaponSystem::new();
        system.start_charging();
        assert!(system.is_charging());

        // 0.5 force per 50 ms tick: 100 increments to reach 50.
        let mut auto_fire = None;
        let mut elapsed = 0.0;
        while auto_fire.is_none() && elapsed < 10.0 {
            auto_fire = system.tick_charge(SIM_DT);
            elapsed += SIM_DT;
        }
        let force = auto_fire.expect("charge must cap and auto-fire");
        assert_eq!(force, CHARGE_MAX);
        assert!((elapsed - 5.0).abs() < 0.1, "capped after {elapsed:.2}s");
        assert!(!system.is_charging());
    }

    #[test]
    fn test_release_early_fires_with_partial_force() {
        let mut system = WeaponSystem::new();
        system.start_charging();
        for _ in 0..60 {
            assert!(system.tick_charge(SIM_DT).is_none());
        }
        let force = system.release_charge().expect("was charging");
        // One second of charging: 20 increments of 0.5.
        assert!((force - 10.0).abs() < 0.6);
    }

    #[test]
    fn test_instant_weapon_never_charges() {
        let mut system = WeaponSystem::new();
        system.selected = WeaponKind::Carrot;
        system.start_charging();
        assert!(!system.is_charging());
        assert_eq!(system.charge_percent(), 0.0);
    }

    #[test]
    fn test_single_projectile_in_flight() {
        let mut physics = PhysicsWorld::new();
        let mut system = WeaponSystem::new();
        assert!(system.fire(&mut physics, Vec2::new(100.0, 100.0), 0.5, 25.0));
        assert!(system.projectile_in_flight());
        assert!(!system.fire(&mut physics, Vec2::new(100.0, 100.0), 0.5, 25.0));
    }

    #[test]
    fn test_finish_only_once_for_both_triggers() {
        let mut physics = PhysicsWorld::new();
        let mut system = WeaponSystem::new();
        system.fire(&mut physics, Vec2::new(100.0, 100.0), 0.2, 50.0);

        let first = system.finish_now(&mut physics);
        assert!(first.is_some());
        // The polling path in the same tick must not produce a second finish.
        assert!(system.poll_projectile(&mut physics, SIM_DT).is_none());
        assert!(system.finish_now(&mut physics).is_none());
        assert!(!system.projectile_in_flight());
    }

    #[test]
    fn test_bounds_exit_finishes_projectile() {
        let mut physics = PhysicsWorld::new();
        let mut system = WeaponSystem::new();
        system.selected = WeaponKind::Carrot;
        // Fire straight left from near the edge.
        system.fire(&mut physics, Vec2::new(20.0, 100.0), std::f32::consts::PI, 0.0);
        let mut finished = None;
        for _ in 0..120 {
            physics.step();
            finished = system.poll_projectile(&mut physics, SIM_DT);
            if finished.is_some() {
                break;
            }
        }
        let finished = finished.expect("projectile should exit the playfield");
        assert!(finished.at.x < 0.0);
        assert_eq!(finished.damage, 10.0);
    }

    #[test]
    fn test_carrot_fires_flat() {
        let mut physics = PhysicsWorld::new();
        let mut system = WeaponSystem::new();
        system.selected = WeaponKind::Carrot;
        system.fire(&mut physics, Vec2::new(100.0, 300.0), 0.0, 0.0);
        for _ in 0..20 {
            physics.step();
        }
        let projectile = system.projectile.as_ref().unwrap();
        let pos = physics.position(projectile.body).unwrap();
        assert!((pos.y - 300.0).abs() < 1e-2, "flat shot drifted to y={}", pos.y);
    }
}
