//! Fixed-timestep frame driver
//!
//! [`tick`] advances one simulation frame: player actions, charge and turn
//! countdowns, one physics step with contact handling, projectile rest
//! detection, out-of-bounds penalties, and explosion resolution. Frontends
//! call it at a fixed cadence with the actions gathered since last frame.

use glam::Vec2;
use rapier2d::prelude::{Group, InteractionGroups, InteractionTestMode, RigidBodyHandle};

use crate::consts::*;
use crate::input::InputAction;
use crate::physics::{BodyTag, ContactBegan, GROUP_WORLD};

use super::state::{GameEvent, JumpBoost, MatchState, Timer, TurnPhase};
use super::team::DamageOutcome;

/// Advance the simulation by one frame.
pub fn tick(state: &mut MatchState, actions: &[InputAction], dt: f32) {
    if matches!(state.phase, TurnPhase::Idle | TurnPhase::GameOver(_)) {
        return;
    }
    state.ticks += 1;

    for action in actions {
        apply_action(state, *action);
    }

    if state.phase == TurnPhase::ActiveTurn {
        if let Some(force) = state.weapons.tick_charge(dt) {
            log::info!("charge capped, auto-firing");
            fire(state, force);
        }
    }

    tick_countdown(state, dt);

    let contacts = state.physics.step();
    for contact in contacts {
        handle_contact(state, &contact);
    }

    tick_jump_boost(state, dt);

    if let Some(finished) = state.weapons.poll_projectile(&mut state.physics, dt) {
        schedule_resolution(state, finished.at, finished.damage, finished.explosion_radius);
    }

    apply_out_of_bounds(state);
    check_active_still_present(state);
    if state.is_over() {
        return;
    }

    let (detonation, completed) = state.resolver.tick(
        &mut state.physics,
        &mut state.terrain,
        &mut state.registry,
        dt,
    );
    if let Some(detonation) = detonation {
        state.events.push(GameEvent::Detonated {
            point: detonation.point,
            radius: detonation.effective_radius,
        });
        let mut any_died = false;
        for outcome in &detonation.casualties {
            if let DamageOutcome::Died { team, .. } = outcome {
                state.events.push(GameEvent::Died { team: *team });
                any_died = true;
            }
        }
        if any_died {
            state.evaluate_game_over();
        }
    }
    if completed && !state.is_over() {
        state.next_turn();
    }
}

fn apply_action(state: &mut MatchState, action: InputAction) {
    match state.phase {
        TurnPhase::AwaitingAck => {
            if action == InputAction::Confirm {
                state.begin_active_turn();
            }
        }
        TurnPhase::ActiveTurn => apply_turn_action(state, action),
        _ => {}
    }
}

fn apply_turn_action(state: &mut MatchState, action: InputAction) {
    let Some((_, body)) = state.active else {
        return;
    };
    match action {
        InputAction::MoveLeft => walk(state, body, -WALK_SPEED),
        InputAction::MoveRight => walk(state, body, WALK_SPEED),
        InputAction::AimUp => {
            state.aim_angle =
                (state.aim_angle + AIM_STEP).min(std::f32::consts::FRAC_PI_2);
        }
        InputAction::AimDown => {
            state.aim_angle =
                (state.aim_angle - AIM_STEP).max(-std::f32::consts::FRAC_PI_2);
        }
        InputAction::Jump => jump(state, body),
        InputAction::FireStart => {
            if state.weapons.selected.is_charged() {
                state.weapons.start_charging();
            } else {
                fire(state, 0.0);
            }
        }
        InputAction::FireEnd => {
            if let Some(force) = state.weapons.release_charge() {
                fire(state, force);
            }
        }
        InputAction::ChangeWeapon => {
            if !state.weapons.is_charging() {
                state.weapons.change_weapon();
                state.events.push(GameEvent::WeaponSelected {
                    weapon: state.weapons.selected,
                });
            }
        }
        InputAction::Confirm => {}
    }
}

/// Horizontal walk: steer x, leave the vertical component to gravity.
fn walk(state: &mut MatchState, body: RigidBodyHandle, speed: f32) {
    let vy = state.physics.velocity(body).map(|v| v.y).unwrap_or(0.0);
    state.physics.set_velocity(body, Vec2::new(speed, vy));
}

/// Two-stage jump: an immediate kick plus a delayed boost, which gives the
/// arc a longer hang than a single larger impulse would.
fn jump(state: &mut MatchState, body: RigidBodyHandle) {
    if let Some(pos) = state.physics.position(body) {
        let feet = pos + Vec2::new(0.0, WORM_RADIUS + 0.1);
        let grounded = state
            .physics
            .cast_ray(
                feet,
                Vec2::new(0.0, 1.0),
                2.0,
                InteractionGroups::new(Group::ALL, GROUP_WORLD, InteractionTestMode::And),
            )
            .is_some();
        log::debug!("jump from ({:.0}, {:.0}), grounded: {grounded}", pos.x, pos.y);
    }
    state.physics.boost_velocity(body, Vec2::new(0.0, -JUMP_SPEED));
    state.jump_boost = Some(JumpBoost {
        timer: Timer::one_shot(JUMP_BOOST_DELAY),
        body,
    });
}

fn fire(state: &mut MatchState, force: f32) {
    let Some((_, body)) = state.active else {
        return;
    };
    let Some(pos) = state.physics.position(body) else {
        return;
    };
    let weapon = state.weapons.selected;
    if state
        .weapons
        .fire(&mut state.physics, pos, state.aim_angle, force)
    {
        state.events.push(GameEvent::Fired { weapon });
        state.phase = TurnPhase::Resolving;
        state.countdown = None;
    }
}

fn tick_countdown(state: &mut MatchState, dt: f32) {
    if state.phase != TurnPhase::ActiveTurn {
        return;
    }
    let Some(countdown) = state.countdown.as_mut() else {
        return;
    };
    let fires = countdown.tick(dt);
    let mut expired = false;
    for _ in 0..fires {
        state.seconds_left = state.seconds_left.saturating_sub(1);
        state.events.push(GameEvent::Countdown {
            seconds_left: state.seconds_left,
        });
        if state.seconds_left == 0 {
            expired = true;
            break;
        }
    }
    if expired {
        log::info!("turn timed out");
        state.weapons.cancel_charge();
        state.countdown = None;
        if state.resolver.is_idle() && !state.weapons.projectile_in_flight() {
            state.next_turn();
        } else {
            state.phase = TurnPhase::Resolving;
        }
    }
}

fn tick_jump_boost(state: &mut MatchState, dt: f32) {
    let Some(boost) = state.jump_boost.as_mut() else {
        return;
    };
    if boost.timer.tick(dt) == 0 {
        return;
    }
    let body = boost.body;
    state.jump_boost = None;
    if state.physics.contains(body) {
        state
            .physics
            .boost_velocity(body, Vec2::new(0.0, -JUMP_BOOST_SPEED));
    }
}

fn handle_contact(state: &mut MatchState, contact: &ContactBegan) {
    // Projectile impacts.
    if let Some((projectile, other)) = contact.split(BodyTag::Projectile) {
        if !state.weapons.is_projectile(projectile.handle) {
            return;
        }
        match other.tag {
            BodyTag::Water => {
                // The shot splashes down; resolve at the splash point.
                if let Some(finished) = state.weapons.finish_now(&mut state.physics) {
                    schedule_resolution(
                        state,
                        finished.at,
                        finished.damage,
                        finished.explosion_radius,
                    );
                }
            }
            BodyTag::Terrain | BodyTag::DestructibleCell | BodyTag::Decoration => {
                // Every shot detonates on first terrain impact and takes the
                // struck obstacle with it.
                state
                    .terrain
                    .remove_obstacle(&mut state.physics, other.handle);
                if let Some(finished) = state.weapons.finish_now(&mut state.physics) {
                    schedule_resolution(
                        state,
                        finished.at,
                        finished.damage,
                        finished.explosion_radius,
                    );
                }
            }
            BodyTag::Combatant => {
                // Direct hit: contact damage, then the blast resolves on top.
                if let Some(finished) = state.weapons.finish_now(&mut state.physics) {
                    apply_and_report(state, other.handle, finished.damage);
                    schedule_resolution(
                        state,
                        finished.at,
                        finished.damage,
                        finished.explosion_radius,
                    );
                }
            }
            BodyTag::Projectile => {}
        }
        return;
    }

    // Combatant hits the water.
    if let Some((water, other)) = contact.split(BodyTag::Water) {
        debug_assert_eq!(water.tag, BodyTag::Water);
        if other.tag != BodyTag::Combatant {
            return;
        }
        if !state.registry.mark_dunked(other.handle) {
            return;
        }
        let team = state
            .registry
            .combatant(other.handle)
            .map(|(team, _)| team.color);
        if let Some(team) = team {
            state.events.push(GameEvent::Dunked { team });
            log::info!("{} combatant went into the water", team.as_str());
        }
        let splash = state.physics.position(other.handle);
        apply_and_report(state, other.handle, WATER_DAMAGE);
        // A dampened underwater blast, unless this turn already has one.
        if let Some(splash) = splash {
            state
                .resolver
                .schedule(splash, WATER_DAMAGE, WORM_RADIUS);
        }
    }
}

fn schedule_resolution(state: &mut MatchState, point: Vec2, damage: f32, radius: f32) {
    state.resolver.schedule(point, damage, radius);
    if !state.is_over() {
        state.phase = TurnPhase::Resolving;
        state.countdown = None;
    }
}

fn apply_and_report(state: &mut MatchState, body: RigidBodyHandle, amount: f32) {
    let team = state.registry.combatant(body).map(|(team, _)| team.color);
    match state.registry.apply_damage(&mut state.physics, body, amount) {
        DamageOutcome::Survived { health } => {
            if let Some(team) = team {
                state.events.push(GameEvent::Damaged { team, health });
            }
        }
        DamageOutcome::Died { team, .. } => {
            state.events.push(GameEvent::Died { team });
            state.evaluate_game_over();
        }
        DamageOutcome::Ignored => {}
    }
}

/// Per-second penalty for combatants that drifted off the playfield.
fn apply_out_of_bounds(state: &mut MatchState) {
    let ticks = state.ticks;
    let penalized = state
        .registry
        .poll_out_of_bounds(&mut state.physics, ticks);
    for (_, outcome) in penalized {
        match outcome {
            DamageOutcome::Survived { .. } | DamageOutcome::Ignored => {}
            DamageOutcome::Died { team, .. } => {
                state.events.push(GameEvent::Died { team });
                state.evaluate_game_over();
            }
        }
    }
}

/// If the active combatant died mid-turn (fell off, drowned), the turn
/// cannot continue; hand off unless a resolution is already pending.
fn check_active_still_present(state: &mut MatchState) {
    if !matches!(state.phase, TurnPhase::AwaitingAck | TurnPhase::ActiveTurn) {
        return;
    }
    let Some((_, body)) = state.active else {
        return;
    };
    if state.physics.contains(body) {
        return;
    }
    state.weapons.cancel_charge();
    state.countdown = None;
    if state.resolver.is_idle() && !state.weapons.projectile_in_flight() {
        state.next_turn();
    } else {
        state.phase = TurnPhase::Resolving;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::team::{GameOutcome, TeamColor};
    use crate::sim::weapons::WeaponKind;

    fn started() -> MatchState {
        let mut state = MatchState::new(&Settings::default(), 42);
        state.start_match();
        state
    }

    fn run(state: &mut MatchState, frames: u32, actions: &[InputAction]) {
        tick(state, actions, SIM_DT);
        for _ in 1..frames {
            tick(state, &[], SIM_DT);
        }
    }

    #[test]
    fn test_confirm_is_the_only_ack_action() {
        let mut state = started();
        tick(&mut state, &[InputAction::Jump, InputAction::FireStart], SIM_DT);
        assert_eq!(state.phase, TurnPhase::AwaitingAck);
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        assert_eq!(state.phase, TurnPhase::ActiveTurn);
    }

    #[test]
    fn test_walk_moves_active_combatant() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        let start = state.active_position().unwrap();
        run(&mut state, 1, &[InputAction::MoveRight]);
        let after = state.active_position().unwrap();
        assert!(after.x > start.x, "{} !> {}", after.x, start.x);
    }

    #[test]
    fn test_aim_clamps_to_vertical() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        for _ in 0..100 {
            tick(&mut state, &[InputAction::AimUp], SIM_DT);
        }
        assert!((state.aim_angle - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
        for _ in 0..200 {
            tick(&mut state, &[InputAction::AimDown], SIM_DT);
        }
        assert!((state.aim_angle + std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_jump_has_two_stages() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        let (_, body) = state.active.unwrap();
        tick(&mut state, &[InputAction::Jump], SIM_DT);
        assert!(state.jump_boost.is_some());
        let v_initial = state.physics.velocity(body).unwrap().y;
        assert!(v_initial < 0.0, "jump kick should point up (negative y)");
        // Boost lands after the delay.
        run(&mut state, 12, &[]);
        assert!(state.jump_boost.is_none());
    }

    #[test]
    fn test_countdown_expiry_passes_the_turn() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        assert_eq!(state.active_team(), Some(TeamColor::Yellow));
        // Default limit is 10 seconds.
        run(&mut state, 10 * 60 + 5, &[]);
        assert_eq!(state.active_team(), Some(TeamColor::Blue));
        assert_eq!(state.phase, TurnPhase::AwaitingAck);
    }

    #[test]
    fn test_firing_enters_resolving_and_eventually_advances() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        // Lob an apple nearly straight up with a short charge.
        for _ in 0..20 {
            tick(&mut state, &[InputAction::AimUp], SIM_DT);
        }
        tick(&mut state, &[InputAction::FireStart], SIM_DT);
        run(&mut state, 30, &[]);
        tick(&mut state, &[InputAction::FireEnd], SIM_DT);
        assert_eq!(state.phase, TurnPhase::Resolving);
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::Fired { .. }))
        );
        // Flight + settle + delay all fit well inside 30 seconds.
        let mut advanced = false;
        for _ in 0..(30 * 60) {
            tick(&mut state, &[], SIM_DT);
            if state.phase == TurnPhase::AwaitingAck {
                advanced = true;
                break;
            }
        }
        assert!(advanced, "turn should hand off after resolution");
        assert_eq!(state.active_team(), Some(TeamColor::Blue));
    }

    #[test]
    fn test_lobbed_shot_detonates_on_terrain_contact() {
        // Any projectile that touches terrain detonates there and takes the
        // struck obstacle with it; bouncing to rest is only for shots that
        // never hit anything solid.
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        run(&mut state, 120, &[]); // let the worm settle on the ground
        for _ in 0..20 {
            tick(&mut state, &[InputAction::AimDown], SIM_DT);
        }
        assert!(state.weapons.selected.is_lobbed());
        tick(&mut state, &[InputAction::FireStart], SIM_DT);
        run(&mut state, 30, &[]);
        let obstacles_before = state.terrain.segment_count()
            + state.terrain.cell_count()
            + state.terrain.decoration_count();
        tick(&mut state, &[InputAction::FireEnd], SIM_DT);
        // Fired straight down, the shot meets the ground within a few frames.
        let mut impacted = false;
        for _ in 0..60 {
            tick(&mut state, &[], SIM_DT);
            if !state.weapons.projectile_in_flight() {
                impacted = true;
                break;
            }
        }
        assert!(impacted, "shot should land within a second");
        let obstacles_after = state.terrain.segment_count()
            + state.terrain.cell_count()
            + state.terrain.decoration_count();
        assert!(
            obstacles_after < obstacles_before,
            "impact should carve out the struck obstacle"
        );
        assert_eq!(state.phase, TurnPhase::Resolving);
        assert!(!state.resolver.is_idle());
    }

    #[test]
    fn test_charge_cap_auto_fires() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        tick(&mut state, &[InputAction::FireStart], SIM_DT);
        // Never release; the cap fires for us at 5 s. The 10 s turn countdown
        // would otherwise expire first and discard the charge.
        let mut fired = false;
        for _ in 0..(6 * 60) {
            tick(&mut state, &[], SIM_DT);
            if state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::Fired { .. }))
            {
                fired = true;
                break;
            }
        }
        assert!(fired, "cap must auto-fire before the turn expires");
    }

    #[test]
    fn test_change_weapon_cycles_and_is_blocked_while_charging() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        tick(&mut state, &[InputAction::ChangeWeapon], SIM_DT);
        assert_eq!(state.weapons.selected, WeaponKind::Banana);
        tick(&mut state, &[InputAction::FireStart], SIM_DT);
        tick(&mut state, &[InputAction::ChangeWeapon], SIM_DT);
        assert_eq!(state.weapons.selected, WeaponKind::Banana);
    }

    #[test]
    fn test_actions_ignored_while_resolving() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        tick(&mut state, &[InputAction::FireStart], SIM_DT);
        run(&mut state, 10, &[]);
        tick(&mut state, &[InputAction::FireEnd], SIM_DT);
        assert_eq!(state.phase, TurnPhase::Resolving);
        let aim_before = state.aim_angle;
        tick(
            &mut state,
            &[InputAction::AimUp, InputAction::ChangeWeapon],
            SIM_DT,
        );
        assert_eq!(state.aim_angle, aim_before);
        assert_eq!(state.weapons.selected, WeaponKind::Apple);
    }

    #[test]
    fn test_last_death_ends_the_match_in_the_same_tick() {
        let mut state = started();
        tick(&mut state, &[InputAction::Confirm], SIM_DT);
        // Wipe every non-yellow team except one blue combatant, weakened so
        // the out-of-bounds penalty is lethal.
        let mut doomed = None;
        for color in [TeamColor::Blue, TeamColor::Green, TeamColor::Violet] {
            let bodies: Vec<_> = state
                .registry
                .team(color)
                .unwrap()
                .roster
                .iter()
                .map(|c| c.body)
                .collect();
            for (i, body) in bodies.into_iter().enumerate() {
                if color == TeamColor::Blue && i == 0 {
                    state.registry.apply_damage(&mut state.physics, body, 20.0);
                    doomed = Some(body);
                } else {
                    state.registry.apply_damage(&mut state.physics, body, 100.0);
                }
            }
        }
        assert!(!state.is_over());
        // Fling the survivor off the playfield; the penalty sweep in the very
        // next frame kills it and the match must end right there, not at the
        // next turn handoff.
        state
            .physics
            .set_velocity(doomed.unwrap(), Vec2::new(-100_000.0, 0.0));
        tick(&mut state, &[], SIM_DT);
        assert!(state.is_over(), "knockout must end the match immediately");
        assert_eq!(state.winner(), Some(TeamColor::Yellow));
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::MatchOver { .. }))
        );
    }

    #[test]
    fn test_full_match_reaches_game_over() {
        // Every team shoots straight down at its own feet until only one
        // team (or nobody) is left.
        let mut state = started();
        let mut frames = 0u32;
        let limit = 60 * 60 * 30; // 30 simulated minutes, far more than needed
        while !state.is_over() && frames < limit {
            let actions: Vec<InputAction> = match state.phase {
                TurnPhase::AwaitingAck => vec![InputAction::Confirm],
                TurnPhase::ActiveTurn => {
                    if state.weapons.is_charging() {
                        vec![InputAction::FireEnd]
                    } else {
                        vec![InputAction::AimDown, InputAction::FireStart]
                    }
                }
                _ => Vec::new(),
            };
            tick(&mut state, &actions, SIM_DT);
            frames += 1;
        }
        assert!(state.is_over(), "match should finish");
        assert!(matches!(
            state.phase,
            TurnPhase::GameOver(GameOutcome::Winner(_)) | TurnPhase::GameOver(GameOutcome::Draw)
        ));
    }
}
