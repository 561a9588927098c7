//! Input abstraction
//!
//! Frontends translate raw keyboard/gamepad state into [`InputAction`]
//! values; the simulation only ever sees actions. Keyboards map through
//! [`KeyMap`] on key transitions, gamepads through [`GamepadMapper`] which
//! edge-detects buttons against the previous polled snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Axis deflection below this is treated as centered.
const AXIS_DEADZONE: f32 = 0.5;

/// Everything a player can ask the simulation to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    AimUp,
    AimDown,
    Jump,
    /// Begin charging (or fire an instant weapon).
    FireStart,
    /// Release the charge and fire.
    FireEnd,
    ChangeWeapon,
    /// Acknowledge the announced turn.
    Confirm,
}

/// Keyboard bindings: actions emitted on key press and on key release.
#[derive(Debug, Clone)]
pub struct KeyMap {
    press: HashMap<String, InputAction>,
    release: HashMap<String, InputAction>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut press = HashMap::new();
        press.insert("ArrowLeft".to_string(), InputAction::MoveLeft);
        press.insert("ArrowRight".to_string(), InputAction::MoveRight);
        press.insert("ArrowUp".to_string(), InputAction::AimUp);
        press.insert("ArrowDown".to_string(), InputAction::AimDown);
        press.insert(" ".to_string(), InputAction::Jump);
        press.insert("Enter".to_string(), InputAction::FireStart);
        press.insert("Tab".to_string(), InputAction::ChangeWeapon);

        let mut release = HashMap::new();
        release.insert("Enter".to_string(), InputAction::FireEnd);

        Self { press, release }
    }
}

impl KeyMap {
    pub fn on_key_down(&self, key: &str) -> Option<InputAction> {
        self.press.get(key).copied()
    }

    pub fn on_key_up(&self, key: &str) -> Option<InputAction> {
        self.release.get(key).copied()
    }
}

/// On-screen control bindings: UI element tags to actions, with separate
/// down/up tables so the fire button can charge while held.
#[derive(Debug, Clone)]
pub struct PointerMap {
    down: HashMap<String, InputAction>,
    up: HashMap<String, InputAction>,
}

impl Default for PointerMap {
    fn default() -> Self {
        let mut down = HashMap::new();
        down.insert("btn-left".to_string(), InputAction::MoveLeft);
        down.insert("btn-right".to_string(), InputAction::MoveRight);
        down.insert("btn-aim-up".to_string(), InputAction::AimUp);
        down.insert("btn-aim-down".to_string(), InputAction::AimDown);
        down.insert("btn-jump".to_string(), InputAction::Jump);
        down.insert("btn-fire".to_string(), InputAction::FireStart);
        down.insert("btn-weapon".to_string(), InputAction::ChangeWeapon);
        down.insert("btn-confirm".to_string(), InputAction::Confirm);

        let mut up = HashMap::new();
        up.insert("btn-fire".to_string(), InputAction::FireEnd);

        Self { down, up }
    }
}

impl PointerMap {
    pub fn on_pointer_down(&self, tag: &str) -> Option<InputAction> {
        self.down.get(tag).copied()
    }

    pub fn on_pointer_up(&self, tag: &str) -> Option<InputAction> {
        self.up.get(tag).copied()
    }
}

/// Button indices for one gamepad model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamepadLayout {
    pub fire: usize,
    pub jump: usize,
    pub change_weapon: usize,
    pub confirm: usize,
}

impl GamepadLayout {
    pub fn dual_sense() -> Self {
        Self {
            change_weapon: 0,
            fire: 1,
            jump: 2,
            confirm: 3,
        }
    }

    pub fn xbox() -> Self {
        Self {
            fire: 0,
            jump: 1,
            change_weapon: 2,
            confirm: 3,
        }
    }

    /// Pick a layout from the reported device id string.
    pub fn for_id(id: &str) -> Self {
        let id = id.to_lowercase();
        if id.contains("dualsense") || id.contains("dualshock") {
            Self::dual_sense()
        } else {
            Self::xbox()
        }
    }
}

/// Raw gamepad state captured once per frame by the frontend.
#[derive(Debug, Clone, Default)]
pub struct GamepadSnapshot {
    pub buttons: Vec<bool>,
    pub axes: Vec<f32>,
}

impl GamepadSnapshot {
    fn pressed(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }
}

/// Turns polled gamepad snapshots into actions.
///
/// Buttons are edge-detected against the previous snapshot so a held button
/// emits a single action. The fire button is special: press emits
/// [`InputAction::FireStart`], release emits [`InputAction::FireEnd`]. Stick
/// axes repeat every poll while deflected, matching key auto-repeat.
#[derive(Debug, Clone)]
pub struct GamepadMapper {
    layout: GamepadLayout,
    prev: GamepadSnapshot,
}

impl GamepadMapper {
    pub fn new(layout: GamepadLayout) -> Self {
        Self {
            layout,
            prev: GamepadSnapshot::default(),
        }
    }

    /// Map one snapshot to actions. While a turn announcement is pending
    /// (`ack_pending`), only the confirm button does anything.
    pub fn poll(&mut self, snapshot: &GamepadSnapshot, ack_pending: bool) -> Vec<InputAction> {
        let mut actions = Vec::new();
        let rising = |index: usize| snapshot.pressed(index) && !self.prev.pressed(index);
        let falling = |index: usize| !snapshot.pressed(index) && self.prev.pressed(index);

        if ack_pending {
            if rising(self.layout.confirm) {
                actions.push(InputAction::Confirm);
            }
            self.prev = snapshot.clone();
            return actions;
        }

        if rising(self.layout.fire) {
            actions.push(InputAction::FireStart);
        }
        if falling(self.layout.fire) {
            actions.push(InputAction::FireEnd);
        }
        if rising(self.layout.jump) {
            actions.push(InputAction::Jump);
        }
        if rising(self.layout.change_weapon) {
            actions.push(InputAction::ChangeWeapon);
        }
        if rising(self.layout.confirm) {
            actions.push(InputAction::Confirm);
        }

        let horizontal = snapshot.axis(0);
        if horizontal < -AXIS_DEADZONE {
            actions.push(InputAction::MoveLeft);
        } else if horizontal > AXIS_DEADZONE {
            actions.push(InputAction::MoveRight);
        }
        let vertical = snapshot.axis(1);
        if vertical < -AXIS_DEADZONE {
            actions.push(InputAction::AimUp);
        } else if vertical > AXIS_DEADZONE {
            actions.push(InputAction::AimDown);
        }

        self.prev = snapshot.clone();
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(buttons: &[bool], axes: &[f32]) -> GamepadSnapshot {
        GamepadSnapshot {
            buttons: buttons.to_vec(),
            axes: axes.to_vec(),
        }
    }

    #[test]
    fn test_keymap_fire_press_release() {
        let map = KeyMap::default();
        assert_eq!(map.on_key_down("Enter"), Some(InputAction::FireStart));
        assert_eq!(map.on_key_up("Enter"), Some(InputAction::FireEnd));
        assert_eq!(map.on_key_up("ArrowLeft"), None);
        assert_eq!(map.on_key_down("q"), None);
    }

    #[test]
    fn test_pointer_map_fire_edges() {
        let map = PointerMap::default();
        assert_eq!(map.on_pointer_down("btn-fire"), Some(InputAction::FireStart));
        assert_eq!(map.on_pointer_up("btn-fire"), Some(InputAction::FireEnd));
        assert_eq!(map.on_pointer_up("btn-jump"), None);
        // Unknown tags are skipped, not an error.
        assert_eq!(map.on_pointer_down("menu-settings"), None);
    }

    #[test]
    fn test_held_button_emits_once() {
        let mut mapper = GamepadMapper::new(GamepadLayout::xbox());
        let held = snapshot(&[false, true, false, false], &[]);
        let actions = mapper.poll(&held, false);
        assert_eq!(actions, vec![InputAction::Jump]);
        // Still held: no repeat.
        assert!(mapper.poll(&held, false).is_empty());
    }

    #[test]
    fn test_fire_button_edges() {
        let mut mapper = GamepadMapper::new(GamepadLayout::xbox());
        let down = snapshot(&[true], &[]);
        let up = snapshot(&[false], &[]);
        assert_eq!(mapper.poll(&down, false), vec![InputAction::FireStart]);
        assert_eq!(mapper.poll(&up, false), vec![InputAction::FireEnd]);
        assert!(mapper.poll(&up, false).is_empty());
    }

    #[test]
    fn test_axes_repeat_every_poll() {
        let mut mapper = GamepadMapper::new(GamepadLayout::xbox());
        let left_up = snapshot(&[], &[-0.9, -0.9]);
        for _ in 0..3 {
            assert_eq!(
                mapper.poll(&left_up, false),
                vec![InputAction::MoveLeft, InputAction::AimUp]
            );
        }
        // Inside the deadzone nothing moves.
        let centered = snapshot(&[], &[0.3, -0.4]);
        assert!(mapper.poll(&centered, false).is_empty());
    }

    #[test]
    fn test_ack_pending_gates_everything_but_confirm() {
        let mut mapper = GamepadMapper::new(GamepadLayout::dual_sense());
        let everything = snapshot(&[true, true, true, true], &[-1.0, 1.0]);
        let actions = mapper.poll(&everything, true);
        assert_eq!(actions, vec![InputAction::Confirm]);
    }

    #[test]
    fn test_layout_selection_by_id() {
        let ds = GamepadLayout::for_id("Sony DualSense Wireless Controller");
        assert_eq!(ds.fire, 1);
        let xb = GamepadLayout::for_id("Xbox Series Controller");
        assert_eq!(xb.fire, 0);
        let unknown = GamepadLayout::for_id("Generic Pad");
        assert_eq!(unknown.fire, 0);
    }
}
