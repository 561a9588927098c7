//! Emoji Siege entry point
//!
//! Runs a headless demo match: a simple driver plays every team, logging
//! events as the match unfolds. Useful for exercising the full simulation
//! end to end; a graphical frontend drives `sim::tick` the same way.

use rand::Rng;

use emoji_siege::consts::*;
use emoji_siege::input::InputAction;
use emoji_siege::sim::{tick, GameEvent, MatchState, TurnPhase};
use emoji_siege::Settings;

/// Scripted player for demo matches: acknowledges turns, walks a little,
/// picks a weapon, aims, and fires a charged shot.
struct DemoDriver {
    rng: rand_pcg::Pcg32,
    /// Frames of charging left for the current shot.
    charge_frames: u32,
    charging: bool,
}

impl DemoDriver {
    fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            rng: rand_pcg::Pcg32::seed_from_u64(seed),
            charge_frames: 0,
            charging: false,
        }
    }

    fn actions(&mut self, state: &MatchState) -> Vec<InputAction> {
        match state.phase {
            TurnPhase::AwaitingAck => {
                self.charging = false;
                vec![InputAction::Confirm]
            }
            TurnPhase::ActiveTurn => self.play_turn(state),
            _ => Vec::new(),
        }
    }

    fn play_turn(&mut self, state: &MatchState) -> Vec<InputAction> {
        if self.charging {
            if self.charge_frames > 0 {
                self.charge_frames -= 1;
                return Vec::new();
            }
            self.charging = false;
            return vec![InputAction::FireEnd];
        }

        let mut actions = Vec::new();
        // Face roughly toward the middle of the field and lob.
        let toward_center = state
            .active_position()
            .map(|p| p.x < CANVAS_WIDTH / 2.0)
            .unwrap_or(true);
        actions.push(if toward_center {
            InputAction::MoveRight
        } else {
            InputAction::MoveLeft
        });
        for _ in 0..self.rng.random_range(3..=8) {
            actions.push(InputAction::AimUp);
        }
        if self.rng.random_bool(0.3) {
            actions.push(InputAction::ChangeWeapon);
        }
        actions.push(InputAction::FireStart);
        if state.weapons.selected.is_charged() {
            self.charging = true;
            // Between a gentle toss and a near-max shot.
            self.charge_frames = self.rng.random_range(30..=240);
        }
        actions
    }
}

fn describe(event: &GameEvent) {
    match event {
        GameEvent::MatchStarted => log::info!("match started"),
        GameEvent::TurnReady { team } => log::info!("turn ready: {}", team.as_str()),
        GameEvent::TurnBegan { team } => log::info!("turn began: {}", team.as_str()),
        GameEvent::WeaponSelected { weapon } => {
            log::info!("weapon selected: {}", weapon.glyph())
        }
        GameEvent::Fired { weapon } => log::info!("fired {}", weapon.glyph()),
        GameEvent::Countdown { seconds_left } => log::debug!("countdown: {seconds_left}"),
        GameEvent::Detonated { point, radius } => {
            log::info!("boom at ({:.0}, {:.0}), radius {:.0}", point.x, point.y, radius)
        }
        GameEvent::Damaged { team, health } => {
            log::info!("{} combatant down to {health}", team.as_str())
        }
        GameEvent::Died { team } => log::info!("{} combatant eliminated", team.as_str()),
        GameEvent::Dunked { team } => log::info!("{} combatant in the water", team.as_str()),
        GameEvent::MatchOver { outcome } => log::info!("match over: {outcome:?}"),
    }
}

fn main() {
    env_logger::init();
    log::info!("Emoji Siege starting...");

    let mut settings = Settings::load();
    let seed: u64 = rand::rng().random();
    let mut state = MatchState::new(&settings, seed);
    let mut driver = DemoDriver::new(seed ^ 0x5EED);
    state.start_match();
    settings.match_in_progress = true;
    settings.save();

    // Hard cap so a pathological match cannot run forever.
    let max_frames = 60 * 60 * 30;
    for _ in 0..max_frames {
        let actions = driver.actions(&state);
        tick(&mut state, &actions, SIM_DT);
        for event in state.drain_events() {
            describe(&event);
        }
        if state.is_over() {
            break;
        }
    }

    settings.match_in_progress = false;
    settings.save();

    match state.winner() {
        Some(color) => println!("{} wins!", settings.team_name(color)),
        None if state.is_over() => println!("Nobody survived. It's a draw."),
        None => println!("Match hit the frame cap without finishing."),
    }
    let healths = state.team_healths();
    for (color, health) in healths {
        println!(
            "  {} {}: {health}",
            settings.team_emoji(color),
            settings.team_name(color)
        );
    }
    for (color, slot, pos, health) in state.combatant_overlays() {
        log::debug!(
            "survivor {} slot {slot} at ({:.0}, {:.0}) with {health} hp",
            color.as_str(),
            pos.x,
            pos.y
        );
    }
}
