//! Per-agent local coordinate frames.
//!
//! Each agent sees the field reflected so that "forward" (+y) points at the
//! opponent goal and "right" (+x) points away from its own touchline:
//!
//! | agent | team | x        | y        |
//! |-------|------|----------|----------|
//! | 0     | 0    | kept     | kept     |
//! | 1     | 0    | mirrored | kept     |
//! | 2     | 1    | kept     | mirrored |
//! | 3     | 1    | mirrored | mirrored |
//!
//! Every transform is a reflection and therefore its own inverse: applying
//! it twice returns the original value. Use [`global_velocity`] (which is
//! [`local_velocity`]) to map local commands back to the field.

use crate::consts::{GAME_HEIGHT, GAME_WIDTH, REALISTIC_MAXIMUM_VELOCITY, TEAM_SIZE};
use crate::physics::Vec2;

/// Whether `agent`'s frame mirrors the x-axis (right-side players).
#[inline]
pub fn mirrors_x(agent: usize) -> bool {
    agent % TEAM_SIZE == 1
}

/// Whether `agent`'s frame mirrors the y-axis (team 1 attacks towards y = 0).
#[inline]
pub fn mirrors_y(agent: usize) -> bool {
    agent / TEAM_SIZE == 1
}

/// Map a field position into `agent`'s frame.
///
/// With `normalize`, components are divided by the field width and height so
/// in-field positions land in `[0, 1]`.
pub fn local_position(global: Vec2, agent: usize, normalize: bool) -> Vec2 {
    let x = if mirrors_x(agent) {
        GAME_WIDTH - global.x
    } else {
        global.x
    };
    let y = if mirrors_y(agent) {
        GAME_HEIGHT - global.y
    } else {
        global.y
    };
    if normalize {
        Vec2::new(x / GAME_WIDTH, y / GAME_HEIGHT)
    } else {
        Vec2::new(x, y)
    }
}

/// Map a field velocity into `agent`'s frame.
///
/// With `normalize`, components are divided by
/// [`REALISTIC_MAXIMUM_VELOCITY`].
pub fn local_velocity(global: Vec2, agent: usize, normalize: bool) -> Vec2 {
    let x = if mirrors_x(agent) { -global.x } else { global.x };
    let y = if mirrors_y(agent) { -global.y } else { global.y };
    if normalize {
        Vec2::new(x / REALISTIC_MAXIMUM_VELOCITY, y / REALISTIC_MAXIMUM_VELOCITY)
    } else {
        Vec2::new(x, y)
    }
}

/// Map a velocity expressed in `agent`'s frame back to the field.
#[inline]
pub fn global_velocity(local: Vec2, agent: usize) -> Vec2 {
    local_velocity(local, agent, false)
}

/// Map a position expressed in `agent`'s frame back to the field.
#[inline]
pub fn global_position(local: Vec2, agent: usize) -> Vec2 {
    local_position(local, agent, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::NUM_AGENTS;

    #[test]
    fn agent_zero_frame_is_identity() {
        let p = Vec2::new(3.0, 7.0);
        assert_eq!(local_position(p, 0, false), p);
        assert_eq!(local_velocity(p, 0, false), p);
    }

    #[test]
    fn reflections_per_agent() {
        let p = Vec2::new(3.0, 7.0);
        assert_eq!(local_position(p, 1, false), Vec2::new(27.0, 7.0));
        assert_eq!(local_position(p, 2, false), Vec2::new(3.0, 33.0));
        assert_eq!(local_position(p, 3, false), Vec2::new(27.0, 33.0));

        let v = Vec2::new(1.5, -2.0);
        assert_eq!(local_velocity(v, 1, false), Vec2::new(-1.5, -2.0));
        assert_eq!(local_velocity(v, 2, false), Vec2::new(1.5, 2.0));
        assert_eq!(local_velocity(v, 3, false), Vec2::new(-1.5, 2.0));
    }

    #[test]
    fn transforms_are_involutions() {
        let p = Vec2::new(12.25, 31.5);
        let v = Vec2::new(-4.0, 9.5);
        for agent in 0..NUM_AGENTS {
            assert_eq!(global_position(local_position(p, agent, false), agent), p);
            assert_eq!(global_velocity(local_velocity(v, agent, false), agent), v);
        }
    }

    #[test]
    fn forward_points_at_opponent_goal() {
        // Team 0 attacks y = GAME_HEIGHT, team 1 attacks y = 0; both see the
        // opponent goal at local y = GAME_HEIGHT.
        let top_goal = Vec2::new(GAME_WIDTH / 2.0, GAME_HEIGHT);
        let bottom_goal = Vec2::new(GAME_WIDTH / 2.0, 0.0);
        assert_eq!(local_position(top_goal, 0, true).y, 1.0);
        assert_eq!(local_position(top_goal, 1, true).y, 1.0);
        assert_eq!(local_position(bottom_goal, 2, true).y, 1.0);
        assert_eq!(local_position(bottom_goal, 3, true).y, 1.0);
    }

    #[test]
    fn normalization_scales() {
        let p = local_position(Vec2::new(15.0, 10.0), 0, true);
        assert!((p.x - 0.5).abs() < 1e-12);
        assert!((p.y - 0.25).abs() < 1e-12);

        let v = local_velocity(Vec2::new(20.0, -10.0), 0, true);
        assert!((v.x - 1.0).abs() < 1e-12);
        assert!((v.y + 0.5).abs() < 1e-12);
    }
}
