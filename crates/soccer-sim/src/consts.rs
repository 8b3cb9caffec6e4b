//! Field geometry, physics materials, and reward tuning constants.
//!
//! All lengths are in metres, all velocities in metres per second. The field
//! spans `[0, GAME_WIDTH] x [0, GAME_HEIGHT]`; team 0 defends the goal line at
//! `y = 0`, team 1 the goal line at `y = GAME_HEIGHT`.

// ---------------------------------------------------------------------------
// Teams and agents
// ---------------------------------------------------------------------------

/// Number of controllable players.
pub const NUM_AGENTS: usize = 4;

/// Players per team.
pub const TEAM_SIZE: usize = 2;

/// Number of teams.
pub const NUM_TEAMS: usize = NUM_AGENTS / TEAM_SIZE;

/// Values per agent observation row.
pub const OBSERVATION_SIZE: usize = 20;

/// Number of discrete actions per agent.
pub const NUM_ACTIONS: usize = 9;

/// Team an agent belongs to.
#[inline]
pub fn team_of(agent: usize) -> usize {
    agent / TEAM_SIZE
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

pub const GAME_WIDTH: f64 = 30.0;
pub const GAME_HEIGHT: f64 = 40.0;
pub const WALL_THICKNESS: f64 = 1.0;
pub const GOAL_WIDTH: f64 = 24.0;

/// Simulation ticks per second.
pub const FPS: u32 = 20;

/// Hard cap on ticks per episode before truncation.
pub const MAX_STEPS: u32 = 600;

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Side length of a player's square collider.
pub const PLAYER_SIZE: f64 = 1.5;
pub const BALL_RADIUS: f64 = 2.0;
pub const PLAYER_SPEED: f64 = 12.0;

/// Velocity bound advertised for the observation space.
pub const MAXIMUM_VELOCITY: f64 = 50.0;

/// Velocity used to normalize observations and velocity-based rewards.
pub const REALISTIC_MAXIMUM_VELOCITY: f64 = 20.0;

/// Maximum per-axis jitter applied to default spawn points.
pub const SPAWNING_RADIUS: f64 = 3.0;

pub const PLAYER_DENSITY: f64 = 2.0;
pub const PLAYER_FRICTION: f64 = 0.3;
pub const BALL_DENSITY: f64 = 0.1;
pub const BALL_FRICTION: f64 = 0.3;
pub const BALL_RESTITUTION: f64 = 0.8;

/// Linear and angular damping of the ball.
pub const BALL_DAMPING: f64 = 0.3;

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

pub const PASSING_QUADRATIC_THRESHOLD: f64 = 6.0;
pub const PASSING_THRESHOLD: f64 = 10.0;
pub const PLAYER_DISTANCE_THRESHOLD: f64 = 8.0;

/// Displacement a player covers over the smoothness window when moving at a
/// modest pace.
pub const SMOOTHNESS_EXPECTED_DISTANCE: f64 = PLAYER_SIZE / FPS as f64 * 3.0;

/// Length of every rolling history buffer.
pub const HISTORY_LEN: usize = 3;
