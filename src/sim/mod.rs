//! The simulation: terrain, teams, weapons, explosions, and the turn
//! coordinator, advanced one fixed step at a time by [`tick::tick`].

pub mod explosion;
pub mod state;
pub mod team;
pub mod terrain;
pub mod tick;
pub mod weapons;

pub use state::{GameEvent, MatchState, TurnPhase};
pub use team::{GameOutcome, TeamColor};
pub use tick::tick;
pub use weapons::WeaponKind;
