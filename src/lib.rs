//! Emoji Siege - a turn-based artillery game
//!
//! Core modules:
//! - `sim`: Turn coordination, terrain destruction, combat (the game rules)
//! - `physics`: Rapier-backed rigid-body world the rules talk to
//! - `input`: Device-agnostic action mapping
//! - `settings`: Persisted match configuration

pub mod input;
pub mod physics;
pub mod settings;
pub mod sim;

pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one physics frame per tick)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Playfield dimensions (canvas coordinates, y grows downward)
    pub const CANVAS_WIDTH: f32 = 1280.0;
    pub const CANVAS_HEIGHT: f32 = 720.0;
    /// Top of the water band; everything below is the drink
    pub const WATER_LEVEL: f32 = CANVAS_HEIGHT * 0.9;

    /// Downward gravity, in playfield units per frame squared
    pub const GRAVITY_Y: f32 = 0.5;

    /// Terrain defaults (overridable via [`crate::Settings`])
    pub const TERRAIN_SMOOTHNESS: f32 = 10.0;
    pub const TERRAIN_MIN_HEIGHT: f32 = CANVAS_HEIGHT / 2.0 + 50.0;
    pub const TERRAIN_MAX_HEIGHT: f32 = CANVAS_HEIGHT / 2.0 + 150.0;
    /// Side length of one destructible subsurface cell
    pub const CELL_SIZE: f32 = 5.0;
    /// Terrain sample stride between decoration placement attempts
    pub const DECORATION_STRIDE: usize = 50;
    pub const DECORATION_CHANCE: f64 = 0.5;
    pub const DECORATION_SIZE: f32 = 30.0;

    /// Combatant defaults
    pub const WORM_RADIUS: f32 = 10.0;
    pub const WORM_MAX_HEALTH: i32 = 25;
    pub const TEAM_SIZE: usize = 4;
    pub const SPAWN_SPACING: f32 = 50.0;
    pub const SPAWN_Y: f32 = CANVAS_HEIGHT / 4.0;
    /// Per-team health readout is clamped to this aggregate
    pub const TEAM_HEALTH_DISPLAY_CAP: i32 = 100;

    /// Movement
    pub const WALK_SPEED: f32 = 2.0;
    /// Two-stage jump: main kick, then a smaller boost shortly after
    pub const JUMP_SPEED: f32 = 6.0;
    pub const JUMP_BOOST_SPEED: f32 = 3.6;
    pub const JUMP_BOOST_DELAY: f32 = 0.15;
    /// Aim angle change per aim action (radians)
    pub const AIM_STEP: f32 = 0.1;
    /// Muzzle offset from the combatant center along the aim direction
    pub const MUZZLE_LENGTH: f32 = 35.0;

    /// Charged weapons
    pub const CHARGE_STEP: f32 = 0.5;
    pub const CHARGE_INTERVAL: f32 = 0.05;
    pub const CHARGE_MAX: f32 = 50.0;

    /// Projectile rest detection
    pub const REST_POLL_INTERVAL: f32 = 0.1;
    pub const REST_SPEED_THRESHOLD: f32 = 0.5;

    /// Explosion sequencing
    pub const EXPLOSION_SETTLE: f32 = 1.0;
    pub const EXPLOSION_COMPLETE_DELAY: f32 = 0.5;
    /// Destruction/damage radius amplification over a weapon's nominal radius
    pub const EXPLOSION_AMPLIFICATION: f32 = 2.0;

    /// Hazard penalties
    pub const OUT_OF_BOUNDS_DAMAGE: f32 = 10.0;
    pub const OUT_OF_BOUNDS_WINDOW: f32 = 1.0;
    pub const WATER_DAMAGE: f32 = 25.0;

    /// Per-turn countdown default (seconds)
    pub const DEFAULT_TURN_SECONDS: u32 = 10;
}

/// Unit vector for an aim angle.
///
/// Angle 0 points right; positive angles aim upward, which is negative y in
/// canvas coordinates.
#[inline]
pub fn aim_vector(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), -angle.sin())
}

/// True if a point lies inside the playfield rectangle.
#[inline]
pub fn in_bounds(pos: Vec2) -> bool {
    pos.x >= 0.0 && pos.x <= consts::CANVAS_WIDTH && pos.y >= 0.0 && pos.y <= consts::CANVAS_HEIGHT
}
