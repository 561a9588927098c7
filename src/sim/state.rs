//! Match state and the turn coordinator
//!
//! [`MatchState`] owns the physics world and every gameplay component; the
//! per-frame driver lives in [`super::tick`]. Turn flow is a small state
//! machine: a turn is announced and waits for an acknowledgement, runs under
//! a countdown, resolves its explosion, then hands off to the next team.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use rapier2d::prelude::{Group, InteractionGroups, InteractionTestMode, RigidBodyHandle};

use crate::consts::*;
use crate::physics::{BodyDef, BodyTag, PhysicsWorld, ShapeDef, GROUP_SENSOR};
use crate::settings::Settings;

use super::explosion::Resolver;
use super::team::{GameOutcome, Registry, TeamColor};
use super::terrain::Terrain;
use super::weapons::{WeaponKind, WeaponSystem};

/// Countdown/cadence timer. One-shot timers fire once and go dormant;
/// repeating timers fire every period and report how many periods elapsed.
#[derive(Debug, Clone)]
pub struct Timer {
    remaining: f32,
    period: Option<f32>,
}

impl Timer {
    pub fn one_shot(duration: f32) -> Self {
        Self {
            remaining: duration,
            period: None,
        }
    }

    pub fn repeating(period: f32) -> Self {
        Self {
            remaining: period,
            period: Some(period),
        }
    }

    /// Advance by `dt`; returns how many times the timer fired.
    pub fn tick(&mut self, dt: f32) -> u32 {
        if self.remaining.is_infinite() {
            return 0;
        }
        self.remaining -= dt;
        let mut fires = 0;
        while self.remaining <= 0.0 {
            fires += 1;
            match self.period {
                Some(period) => self.remaining += period,
                None => {
                    self.remaining = f32::INFINITY;
                    break;
                }
            }
        }
        fires
    }
}

/// Turn coordinator states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnPhase {
    /// No match running (before start, after teardown).
    Idle,
    /// Turn announced; waiting for the active player's acknowledgement.
    AwaitingAck,
    /// The active combatant may move, aim, and fire under the countdown.
    ActiveTurn,
    /// A shot is in flight or an explosion is settling/resolving.
    Resolving,
    /// Match finished.
    GameOver(GameOutcome),
}

/// Things that happened this frame, drained by the frontend for display.
#[derive(Debug, Clone)]
pub enum GameEvent {
    MatchStarted,
    TurnReady { team: TeamColor },
    TurnBegan { team: TeamColor },
    WeaponSelected { weapon: WeaponKind },
    Fired { weapon: WeaponKind },
    Countdown { seconds_left: u32 },
    Detonated { point: Vec2, radius: f32 },
    Damaged { team: TeamColor, health: i32 },
    Died { team: TeamColor },
    Dunked { team: TeamColor },
    MatchOver { outcome: GameOutcome },
}

/// A pending second-stage jump impulse.
#[derive(Debug, Clone)]
pub struct JumpBoost {
    pub timer: Timer,
    pub body: RigidBodyHandle,
}

/// Complete match state. All simulation data lives here.
pub struct MatchState {
    pub physics: PhysicsWorld,
    pub terrain: Terrain,
    pub registry: Registry,
    pub resolver: Resolver,
    pub weapons: WeaponSystem,
    pub rng: Pcg32,

    pub phase: TurnPhase,
    /// Round-robin order; dead teams are skipped, never removed.
    pub turn_order: [TeamColor; 4],
    current: usize,
    /// The combatant whose turn it is.
    pub active: Option<(TeamColor, RigidBodyHandle)>,
    /// Aim angle in radians; 0 points right, positive angles aim upward.
    pub aim_angle: f32,

    pub turn_time_limit: u32,
    pub seconds_left: u32,
    pub countdown: Option<Timer>,
    pub jump_boost: Option<JumpBoost>,

    water: Option<RigidBodyHandle>,
    /// Monotonic tick counter, used for the out-of-bounds damage window.
    pub ticks: u64,
    pub events: Vec<GameEvent>,

    settings: Settings,
}

impl MatchState {
    pub fn new(settings: &Settings, seed: u64) -> Self {
        log::info!("match state created with seed {seed}");
        Self {
            physics: PhysicsWorld::new(),
            terrain: Terrain::default(),
            registry: Registry::new(),
            resolver: Resolver::new(),
            weapons: WeaponSystem::new(),
            rng: Pcg32::seed_from_u64(seed),
            phase: TurnPhase::Idle,
            turn_order: TeamColor::ALL,
            current: 0,
            active: None,
            aim_angle: 0.0,
            turn_time_limit: settings.turn_time_limit,
            seconds_left: settings.turn_time_limit,
            countdown: None,
            jump_boost: None,
            water: None,
            ticks: 0,
            events: Vec::new(),
            settings: settings.clone(),
        }
    }

    /// Build the battlefield and rosters, then announce the first turn.
    pub fn start_match(&mut self) {
        self.teardown();
        self.terrain = Terrain::build(
            &mut self.rng,
            &mut self.physics,
            self.settings.terrain_smoothness,
            self.settings.terrain_min_height,
            self.settings.terrain_max_height,
        );
        self.water = Some(self.spawn_water());

        let team_count = self.turn_order.len();
        let team_span = (TEAM_SIZE - 1) as f32 * SPAWN_SPACING;
        for (i, color) in self.turn_order.iter().enumerate() {
            let center = CANVAS_WIDTH / (team_count + 1) as f32 * (i + 1) as f32;
            self.registry.create_team(
                &mut self.physics,
                *color,
                self.settings.team_name(*color),
                self.settings.team_emoji(*color).to_string(),
                center - team_span / 2.0,
            );
        }
        self.events.push(GameEvent::MatchStarted);
        log::info!(
            "match started: {} teams, {} bodies",
            team_count,
            self.physics.body_count()
        );

        // next_turn advances past the current slot first.
        self.current = team_count - 1;
        self.next_turn();
    }

    /// Sensor covering the water band at the bottom of the playfield.
    fn spawn_water(&mut self) -> RigidBodyHandle {
        let depth = CANVAS_HEIGHT - WATER_LEVEL + 200.0;
        self.physics.spawn(
            BodyDef::fixed(
                Vec2::new(CANVAS_WIDTH / 2.0, WATER_LEVEL + depth / 2.0),
                ShapeDef::Rect {
                    width: CANVAS_WIDTH * 2.0,
                    height: depth,
                    angle: 0.0,
                },
                BodyTag::Water,
            )
            .sensor()
            .with_groups(InteractionGroups::new(
                GROUP_SENSOR,
                Group::ALL,
                InteractionTestMode::And,
            )),
        )
    }

    /// Advance to the next living team, or finish the match.
    ///
    /// Must be called once per completed turn; it also clears the
    /// once-per-turn explosion latch and any leftover charge state.
    pub fn next_turn(&mut self) {
        if self.evaluate_game_over() {
            return;
        }

        self.resolver.reset();
        self.weapons.cancel_charge();
        self.jump_boost = None;
        self.countdown = None;

        let team_count = self.turn_order.len();
        for _ in 0..team_count {
            self.current = (self.current + 1) % team_count;
            let color = self.turn_order[self.current];
            let Some(team) = self.registry.team(color) else {
                continue;
            };
            if let Some(combatant) = team.first_living() {
                self.active = Some((color, combatant.body));
                self.aim_angle = 0.0;
                self.seconds_left = self.turn_time_limit;
                self.phase = TurnPhase::AwaitingAck;
                self.events.push(GameEvent::TurnReady { team: color });
                log::info!("turn ready: {} (slot {})", color.as_str(), combatant.slot);
                return;
            }
        }
        // Every slot was skipped; no one can act, so end in a draw rather
        // than leaving the countdown chain stuck.
        self.finish(GameOutcome::Draw);
    }

    /// Acknowledge the announced turn and start the countdown.
    pub fn begin_active_turn(&mut self) {
        if self.phase != TurnPhase::AwaitingAck {
            return;
        }
        self.phase = TurnPhase::ActiveTurn;
        self.countdown = Some(Timer::repeating(1.0));
        if let Some((team, _)) = self.active {
            self.events.push(GameEvent::TurnBegan { team });
        }
    }

    /// End the match on the spot if at most one team is left standing.
    ///
    /// Runs after every death so a knockout ends the match immediately
    /// instead of waiting for the next turn handoff. Returns whether the
    /// match is over.
    pub fn evaluate_game_over(&mut self) -> bool {
        if self.is_over() {
            return true;
        }
        let outcome = self.registry.check_game_over();
        if outcome != GameOutcome::Continue {
            self.finish(outcome);
            return true;
        }
        false
    }

    fn finish(&mut self, outcome: GameOutcome) {
        self.phase = TurnPhase::GameOver(outcome);
        self.countdown = None;
        self.jump_boost = None;
        self.active = None;
        self.events.push(GameEvent::MatchOver { outcome });
        match outcome {
            GameOutcome::Winner(color) => log::info!("match over: {} wins", color.as_str()),
            GameOutcome::Draw => log::info!("match over: draw"),
            GameOutcome::Continue => {}
        }
    }

    /// Tear the match down to a clean slate.
    ///
    /// Every timer is invalidated before world state is cleared so nothing
    /// scheduled can fire into the dismantled world.
    pub fn teardown(&mut self) {
        self.countdown = None;
        self.jump_boost = None;
        self.resolver.reset();
        self.weapons.clear(&mut self.physics);
        self.registry.clear(&mut self.physics);
        self.terrain.clear(&mut self.physics);
        if let Some(water) = self.water.take() {
            self.physics.remove(water);
        }
        self.active = None;
        self.phase = TurnPhase::Idle;
    }

    /// Abandon the current match and start over on fresh terrain.
    pub fn restart(&mut self) {
        log::info!("restarting match");
        self.start_match();
    }

    // === Frontend accessors ===

    pub fn active_team(&self) -> Option<TeamColor> {
        self.active.map(|(team, _)| team)
    }

    pub fn active_position(&self) -> Option<Vec2> {
        self.active.and_then(|(_, body)| self.physics.position(body))
    }

    pub fn winner(&self) -> Option<TeamColor> {
        match self.phase {
            TurnPhase::GameOver(GameOutcome::Winner(color)) => Some(color),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, TurnPhase::GameOver(_))
    }

    /// Clamped per-team health bars, in turn order.
    pub fn team_healths(&self) -> Vec<(TeamColor, i32)> {
        self.turn_order
            .iter()
            .map(|color| {
                let health = self
                    .registry
                    .team(*color)
                    .map(|t| t.display_health())
                    .unwrap_or(0);
                (*color, health)
            })
            .collect()
    }

    /// Per-combatant overlay data: team, roster slot, position, health.
    pub fn combatant_overlays(&self) -> Vec<(TeamColor, usize, Vec2, i32)> {
        let mut overlays = Vec::new();
        for team in self.registry.teams() {
            for combatant in &team.roster {
                if let Some(pos) = self.physics.position(combatant.body) {
                    overlays.push((team.color, combatant.slot, pos, combatant.health));
                }
            }
        }
        overlays
    }

    pub fn charge_percent(&self) -> f32 {
        self.weapons.charge_percent()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_timer_fires_once() {
        let mut timer = Timer::one_shot(0.5);
        let mut fires = 0;
        for _ in 0..120 {
            fires += timer.tick(SIM_DT);
        }
        assert_eq!(fires, 1);
    }

    #[test]
    fn test_repeating_timer_cadence() {
        let mut timer = Timer::repeating(0.05);
        let mut fires = 0;
        for _ in 0..60 {
            fires += timer.tick(SIM_DT);
        }
        // 50 ms cadence over one second.
        assert_eq!(fires, 20);
    }

    #[test]
    fn test_repeating_timer_catches_up_on_large_dt() {
        let mut timer = Timer::repeating(0.1);
        assert_eq!(timer.tick(0.35), 3);
    }

    #[test]
    fn test_start_match_announces_first_turn() {
        let settings = Settings::default();
        let mut state = MatchState::new(&settings, 42);
        state.start_match();
        assert_eq!(state.phase, TurnPhase::AwaitingAck);
        assert_eq!(state.active_team(), Some(TeamColor::Yellow));
        assert_eq!(state.registry.teams().len(), 4);
        let healths = state.team_healths();
        assert!(healths.iter().all(|(_, h)| *h == 100));
    }

    #[test]
    fn test_turns_round_robin_through_teams() {
        let settings = Settings::default();
        let mut state = MatchState::new(&settings, 42);
        state.start_match();
        assert_eq!(state.active_team(), Some(TeamColor::Yellow));
        state.next_turn();
        assert_eq!(state.active_team(), Some(TeamColor::Blue));
        state.next_turn();
        assert_eq!(state.active_team(), Some(TeamColor::Green));
        state.next_turn();
        assert_eq!(state.active_team(), Some(TeamColor::Violet));
        state.next_turn();
        assert_eq!(state.active_team(), Some(TeamColor::Yellow));
    }

    #[test]
    fn test_ack_starts_countdown() {
        let settings = Settings::default();
        let mut state = MatchState::new(&settings, 7);
        state.start_match();
        assert!(state.countdown.is_none());
        state.begin_active_turn();
        assert_eq!(state.phase, TurnPhase::ActiveTurn);
        assert!(state.countdown.is_some());
        assert_eq!(state.seconds_left, settings.turn_time_limit);
    }

    #[test]
    fn test_teardown_clears_world_and_timers() {
        let settings = Settings::default();
        let mut state = MatchState::new(&settings, 7);
        state.start_match();
        state.begin_active_turn();
        assert!(state.physics.body_count() > 0);
        state.teardown();
        assert_eq!(state.phase, TurnPhase::Idle);
        assert!(state.countdown.is_none());
        assert!(state.active.is_none());
        assert_eq!(state.physics.body_count(), 0);
        assert_eq!(state.registry.teams().len(), 0);
    }

    #[test]
    fn test_dead_teams_are_skipped_not_removed() {
        let settings = Settings::default();
        let mut state = MatchState::new(&settings, 42);
        state.start_match();

        // Wipe out Blue entirely.
        let blue_bodies: Vec<_> = state
            .registry
            .team(TeamColor::Blue)
            .unwrap()
            .roster
            .iter()
            .map(|c| c.body)
            .collect();
        for body in blue_bodies {
            state
                .registry
                .apply_damage(&mut state.physics, body, 1000.0);
        }

        assert_eq!(state.active_team(), Some(TeamColor::Yellow));
        state.next_turn();
        // Blue is skipped; the order array itself is untouched.
        assert_eq!(state.active_team(), Some(TeamColor::Green));
        assert_eq!(state.turn_order, TeamColor::ALL);
    }

    #[test]
    fn test_last_team_standing_wins() {
        let settings = Settings::default();
        let mut state = MatchState::new(&settings, 42);
        state.start_match();

        for color in [TeamColor::Blue, TeamColor::Green, TeamColor::Violet] {
            let bodies: Vec<_> = state
                .registry
                .team(color)
                .unwrap()
                .roster
                .iter()
                .map(|c| c.body)
                .collect();
            for body in bodies {
                state
                    .registry
                    .apply_damage(&mut state.physics, body, 1000.0);
            }
        }
        state.next_turn();
        assert_eq!(
            state.phase,
            TurnPhase::GameOver(GameOutcome::Winner(TeamColor::Yellow))
        );
        assert_eq!(state.winner(), Some(TeamColor::Yellow));
    }
}
