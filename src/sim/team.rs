//! Teams and combatants
//!
//! Thin registry over per-team rosters. Health lives here; positions live in
//! the physics world and are reached through each combatant's body handle.

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::physics::{BodyDef, BodyTag, PhysicsWorld, ShapeDef};
use crate::in_bounds;

/// Fixed set of team colors; declaration order is the round-robin order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Yellow,
    Blue,
    Green,
    Violet,
}

impl TeamColor {
    pub const ALL: [TeamColor; 4] = [
        TeamColor::Yellow,
        TeamColor::Blue,
        TeamColor::Green,
        TeamColor::Violet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamColor::Yellow => "yellow",
            TeamColor::Blue => "blue",
            TeamColor::Green => "green",
            TeamColor::Violet => "violet",
        }
    }

    pub fn default_name(&self) -> String {
        match self {
            TeamColor::Yellow => "Yellow Team".to_string(),
            TeamColor::Blue => "Blue Team".to_string(),
            TeamColor::Green => "Green Team".to_string(),
            TeamColor::Violet => "Violet Team".to_string(),
        }
    }

    pub fn default_emoji(&self) -> &'static str {
        match self {
            TeamColor::Yellow => "😀",
            TeamColor::Blue => "😎",
            TeamColor::Green => "😂",
            TeamColor::Violet => "😍",
        }
    }
}

/// One emoji soldier.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub body: RigidBodyHandle,
    pub slot: usize,
    pub health: i32,
    /// Tick of the last out-of-bounds penalty, for the 1-second rate limit.
    pub last_oob_tick: Option<u64>,
    /// Water damage applies once per combatant.
    pub dunked: bool,
}

/// A team: display data plus its roster in firing order.
#[derive(Debug, Clone)]
pub struct Team {
    pub color: TeamColor,
    pub name: String,
    pub emoji: String,
    pub roster: Vec<Combatant>,
}

impl Team {
    /// A team is alive while it has at least one living combatant.
    pub fn is_alive(&self) -> bool {
        self.roster.iter().any(|c| c.health > 0)
    }

    /// Aggregate health for display, clamped per the UI contract.
    pub fn display_health(&self) -> i32 {
        let total: i32 = self.roster.iter().map(|c| c.health.max(0)).sum();
        total.min(TEAM_HEALTH_DISPLAY_CAP)
    }

    /// First living combatant in roster order - the next to fire.
    pub fn first_living(&self) -> Option<&Combatant> {
        self.roster.iter().find(|c| c.health > 0)
    }
}

/// Outcome of a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Ignored,
    Survived { health: i32 },
    Died { team: TeamColor, slot: usize },
}

/// Result of the game-over check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Continue,
    Winner(TeamColor),
    Draw,
}

/// Owns every team roster for the current match.
#[derive(Default)]
pub struct Registry {
    teams: Vec<Team>,
}

impl Registry {
    pub fn new() -> Self {
        Self { teams: Vec::new() }
    }

    /// Spawn a full roster for one team in a horizontal line from `start_x`.
    ///
    /// Freshly spawned combatants are bounds-checked and take the
    /// out-of-bounds penalty if somehow off-screen (spawn safety check;
    /// spawn positions are always on-screen in practice).
    pub fn create_team(
        &mut self,
        physics: &mut PhysicsWorld,
        color: TeamColor,
        name: String,
        emoji: String,
        start_x: f32,
    ) {
        let mut roster = Vec::with_capacity(TEAM_SIZE);
        for slot in 0..TEAM_SIZE {
            let pos = Vec2::new(start_x + slot as f32 * SPAWN_SPACING, SPAWN_Y);
            let body = physics.spawn(
                BodyDef::dynamic(
                    pos,
                    ShapeDef::Circle {
                        radius: WORM_RADIUS,
                    },
                    BodyTag::Combatant,
                )
                .with_material(0.6, 0.1, 0.001),
            );
            roster.push(Combatant {
                body,
                slot,
                health: WORM_MAX_HEALTH,
                last_oob_tick: None,
                dunked: false,
            });
        }
        self.teams.push(Team {
            color,
            name,
            emoji,
            roster,
        });
        // Spawn safety check.
        let spawned: Vec<RigidBodyHandle> = self
            .team(color)
            .map(|t| t.roster.iter().map(|c| c.body).collect())
            .unwrap_or_default();
        for body in spawned {
            if let Some(pos) = physics.position(body) {
                if !in_bounds(pos) {
                    self.apply_damage(physics, body, OUT_OF_BOUNDS_DAMAGE);
                }
            }
        }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, color: TeamColor) -> Option<&Team> {
        self.teams.iter().find(|t| t.color == color)
    }

    pub fn combatant(&self, body: RigidBodyHandle) -> Option<(&Team, &Combatant)> {
        self.teams.iter().find_map(|team| {
            team.roster
                .iter()
                .find(|c| c.body == body)
                .map(|c| (team, c))
        })
    }

    fn combatant_mut(&mut self, body: RigidBodyHandle) -> Option<(TeamColor, &mut Combatant)> {
        self.teams.iter_mut().find_map(|team| {
            let color = team.color;
            team.roster
                .iter_mut()
                .find(|c| c.body == body)
                .map(move |c| (color, c))
        })
    }

    /// Apply damage to a combatant identified by its body handle.
    ///
    /// Silently ignored for unknown or already-dead combatants. Damage is
    /// rounded to the nearest integer; health is clamped at zero. Reaching
    /// zero removes the combatant from its roster and the physics world.
    pub fn apply_damage(
        &mut self,
        physics: &mut PhysicsWorld,
        body: RigidBodyHandle,
        amount: f32,
    ) -> DamageOutcome {
        let Some((color, combatant)) = self.combatant_mut(body) else {
            log::debug!("damage to unknown combatant ignored");
            return DamageOutcome::Ignored;
        };
        if combatant.health <= 0 {
            log::debug!("damage to dead combatant ignored");
            return DamageOutcome::Ignored;
        }
        let amount = amount.round() as i32;
        combatant.health = (combatant.health - amount).max(0);
        if combatant.health > 0 {
            return DamageOutcome::Survived {
                health: combatant.health,
            };
        }
        let slot = combatant.slot;
        self.remove_combatant(physics, body);
        log::info!("combatant {slot} of team {} died", color.as_str());
        DamageOutcome::Died { team: color, slot }
    }

    fn remove_combatant(&mut self, physics: &mut PhysicsWorld, body: RigidBodyHandle) {
        for team in &mut self.teams {
            team.roster.retain(|c| c.body != body);
        }
        physics.remove(body);
    }

    /// Survivor count decides the match: one team left wins, zero is a draw.
    pub fn check_game_over(&self) -> GameOutcome {
        let mut survivors = self.teams.iter().filter(|t| !t.roster.is_empty());
        match (survivors.next(), survivors.next()) {
            (Some(team), None) => GameOutcome::Winner(team.color),
            (None, _) => GameOutcome::Draw,
            _ => GameOutcome::Continue,
        }
    }

    /// Out-of-bounds penalty sweep, run once per physics step.
    ///
    /// Applies fixed damage to any combatant outside the playfield, at most
    /// once per rolling window. Returns the bodies actually penalized.
    pub fn poll_out_of_bounds(
        &mut self,
        physics: &mut PhysicsWorld,
        now_tick: u64,
    ) -> Vec<(RigidBodyHandle, DamageOutcome)> {
        let window_ticks = (OUT_OF_BOUNDS_WINDOW / SIM_DT) as u64;
        let mut due = Vec::new();
        for team in &self.teams {
            for combatant in &team.roster {
                let Some(pos) = physics.position(combatant.body) else {
                    continue;
                };
                if in_bounds(pos) {
                    continue;
                }
                let elapsed_ok = combatant
                    .last_oob_tick
                    .map(|t| now_tick.saturating_sub(t) > window_ticks)
                    .unwrap_or(true);
                if elapsed_ok {
                    due.push(combatant.body);
                }
            }
        }
        let mut outcomes = Vec::with_capacity(due.len());
        for body in due {
            if let Some((_, combatant)) = self.combatant_mut(body) {
                combatant.last_oob_tick = Some(now_tick);
            }
            let outcome = self.apply_damage(physics, body, OUT_OF_BOUNDS_DAMAGE);
            outcomes.push((body, outcome));
        }
        outcomes
    }

    /// Mark a combatant as dunked; returns false if already marked (water
    /// damage applies once).
    pub fn mark_dunked(&mut self, body: RigidBodyHandle) -> bool {
        match self.combatant_mut(body) {
            Some((_, combatant)) if !combatant.dunked => {
                combatant.dunked = true;
                true
            }
            _ => false,
        }
    }

    /// Remove every combatant body (match restart).
    pub fn clear(&mut self, physics: &mut PhysicsWorld) {
        for team in &mut self.teams {
            for combatant in team.roster.drain(..) {
                physics.remove(combatant.body);
            }
        }
        self.teams.clear();
    }
}
