//! Discrete player actions.
//!
//! Actions are expressed in the acting agent's local frame: [`Action::Up`]
//! always moves towards the opponent goal. Diagonal moves keep the same speed
//! as straight ones.

use std::f64::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};

use crate::consts::PLAYER_SPEED;
use crate::physics::Vec2;
use crate::SoccerError;

/// One of the nine moves available to a player each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
    NoOp = 8,
}

impl Action {
    /// Every action, ordered by code.
    pub const ALL: [Action; 9] = [
        Action::Up,
        Action::UpRight,
        Action::Right,
        Action::DownRight,
        Action::Down,
        Action::DownLeft,
        Action::Left,
        Action::UpLeft,
        Action::NoOp,
    ];

    /// Numeric code in `0..=8`.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Velocity command in the acting agent's local frame.
    pub fn local_velocity(self) -> Vec2 {
        let s = PLAYER_SPEED;
        let d = PLAYER_SPEED * FRAC_1_SQRT_2;
        match self {
            Action::Up => Vec2::new(0.0, s),
            Action::UpRight => Vec2::new(d, d),
            Action::Right => Vec2::new(s, 0.0),
            Action::DownRight => Vec2::new(d, -d),
            Action::Down => Vec2::new(0.0, -s),
            Action::DownLeft => Vec2::new(-d, -d),
            Action::Left => Vec2::new(-s, 0.0),
            Action::UpLeft => Vec2::new(-d, d),
            Action::NoOp => Vec2::ZERO,
        }
    }
}

impl TryFrom<i64> for Action {
    type Error = SoccerError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Action::ALL.get(i).copied())
            .ok_or(SoccerError::InvalidAction(code))
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> u8 {
        action.code()
    }
}

/// Convert raw codes for every agent, failing on the first out-of-range one.
pub fn actions_from_codes<const N: usize>(codes: [i64; N]) -> Result<[Action; N], SoccerError> {
    let mut actions = [Action::NoOp; N];
    for (slot, code) in actions.iter_mut().zip(codes) {
        *slot = Action::try_from(code)?;
    }
    Ok(actions)
}
