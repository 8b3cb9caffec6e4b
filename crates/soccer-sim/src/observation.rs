//! Per-agent observation vectors.
//!
//! Each agent's row holds 20 values, every pair expressed in that agent's
//! normalized local frame (see [`crate::frame`]):
//!
//! | slots  | content                         |
//! |--------|---------------------------------|
//! | 0..4   | own position, own velocity      |
//! | 4..8   | teammate position, velocity     |
//! | 8..16  | both opponents, by agent id     |
//! | 16..20 | ball position, ball velocity    |
//!
//! Positions are in `[0, 1]` while inside the field; velocities are nominally
//! in `[-1, 1]` but are not clamped.

use crate::consts::{team_of, MAXIMUM_VELOCITY, NUM_AGENTS, OBSERVATION_SIZE, TEAM_SIZE};
use crate::frame::{local_position, local_velocity};
use crate::physics::BodyState;

/// One agent's observation row.
pub type AgentObservation = [f32; OBSERVATION_SIZE];

/// Observations for all agents, indexed by agent id.
pub type Observations = [AgentObservation; NUM_AGENTS];

/// Teammates of `agent`, by increasing agent id.
pub fn teammates(agent: usize) -> impl Iterator<Item = usize> {
    let start = team_of(agent) * TEAM_SIZE;
    (start..start + TEAM_SIZE).filter(move |&other| other != agent)
}

/// Opponents of `agent`, by increasing agent id.
pub fn opponents(agent: usize) -> impl Iterator<Item = usize> {
    let team = team_of(agent);
    (0..NUM_AGENTS).filter(move |&other| team_of(other) != team)
}

/// Build the observation row for `agent`.
pub fn observe(agent: usize, players: &[BodyState; NUM_AGENTS], ball: &BodyState) -> AgentObservation {
    let mut row = [0.0f32; OBSERVATION_SIZE];
    let mut slot = 0;
    let mut push = |body: &BodyState| {
        let p = local_position(body.position, agent, true);
        let v = local_velocity(body.velocity, agent, true);
        row[slot..slot + 4].copy_from_slice(&[p.x as f32, p.y as f32, v.x as f32, v.y as f32]);
        slot += 4;
    };

    push(&players[agent]);
    for mate in teammates(agent) {
        push(&players[mate]);
    }
    for opponent in opponents(agent) {
        push(&players[opponent]);
    }
    push(ball);

    row
}

/// Advertised `(low, high)` bounds of one observation row, for declaring an
/// observation space: `[0, 1]` for position slots and
/// `[-MAXIMUM_VELOCITY, MAXIMUM_VELOCITY]` for velocity slots.
pub fn observation_bounds() -> (AgentObservation, AgentObservation) {
    let mut low = [0.0f32; OBSERVATION_SIZE];
    let mut high = [1.0f32; OBSERVATION_SIZE];
    for slot in (0..OBSERVATION_SIZE).filter(|i| i % 4 >= 2) {
        low[slot] = -MAXIMUM_VELOCITY as f32;
        high[slot] = MAXIMUM_VELOCITY as f32;
    }
    (low, high)
}

/// Build observation rows for every agent.
pub fn observe_all(players: &[BodyState; NUM_AGENTS], ball: &BodyState) -> Observations {
    std::array::from_fn(|agent| observe(agent, players, ball))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Vec2;

    fn body(x: f64, y: f64, vx: f64, vy: f64) -> BodyState {
        BodyState {
            position: Vec2::new(x, y),
            velocity: Vec2::new(vx, vy),
        }
    }

    fn scene() -> ([BodyState; NUM_AGENTS], BodyState) {
        (
            [
                body(6.0, 8.0, 2.0, 4.0),
                body(24.0, 8.0, -2.0, 0.0),
                body(6.0, 32.0, 0.0, -4.0),
                body(21.0, 30.0, 10.0, 0.0),
            ],
            body(15.0, 20.0, 0.0, 20.0),
        )
    }

    #[test]
    fn neighbours_are_ordered_by_id() {
        assert_eq!(teammates(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(teammates(3).collect::<Vec<_>>(), vec![2]);
        assert_eq!(opponents(1).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(opponents(2).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn agent_zero_row_layout() {
        let (players, ball) = scene();
        let row = observe(0, &players, &ball);
        let expected = [
            0.2, 0.2, 0.1, 0.2, // own
            0.8, 0.2, -0.1, 0.0, // teammate 1
            0.2, 0.8, 0.0, -0.2, // opponent 2
            0.7, 0.75, 0.5, 0.0, // opponent 3
            0.5, 0.5, 0.0, 1.0, // ball
        ];
        for (i, (got, want)) in row.iter().zip(expected.iter()).enumerate() {
            assert!((got - want).abs() < 1e-6, "slot {i}: expected {want}, got {got}");
        }
    }

    #[test]
    fn agent_three_sees_mirrored_field() {
        let (players, ball) = scene();
        let row = observe(3, &players, &ball);
        // Own position (21, 30) -> (9, 10) -> (0.3, 0.25).
        assert!((row[0] - 0.3).abs() < 1e-6);
        assert!((row[1] - 0.25).abs() < 1e-6);
        // Own velocity (10, 0) -> (-10, 0) -> (-0.5, 0).
        assert!((row[2] + 0.5).abs() < 1e-6);
        // Teammate is agent 2 at (6, 32) -> (24, 8) -> (0.8, 0.2).
        assert!((row[4] - 0.8).abs() < 1e-6);
        assert!((row[5] - 0.2).abs() < 1e-6);
        // Ball moving towards y = H (agent 3's own goal) reads as backwards.
        assert!((row[19] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn bounds_separate_positions_from_velocities() {
        let (low, high) = observation_bounds();
        for slot in 0..OBSERVATION_SIZE {
            if slot % 4 < 2 {
                assert_eq!((low[slot], high[slot]), (0.0, 1.0), "position slot {slot}");
            } else {
                assert_eq!((low[slot], high[slot]), (-50.0, 50.0), "velocity slot {slot}");
            }
        }
        let (players, ball) = scene();
        for row in observe_all(&players, &ball) {
            for (slot, v) in row.iter().enumerate() {
                assert!(low[slot] <= *v && *v <= high[slot], "slot {slot}: {v}");
            }
        }
    }

    #[test]
    fn observe_all_has_fixed_shape() {
        let (players, ball) = scene();
        let obs = observe_all(&players, &ball);
        assert_eq!(obs.len() * obs[0].len(), 80);
        assert_eq!(obs[2], observe(2, &players, &ball));
    }
}
