//! Episode controller: the reset/step state machine.
//!
//! [`SoccerEnv`] owns the physics world, touch tracking, rolling histories,
//! score and counters. Each [`step`](SoccerEnv::step):
//!
//! 1. Appends the action vector to the action history.
//! 2. Converts each agent's local action into a global velocity command.
//! 3. Commits last tick's touch and clears the per-tick touch fields.
//! 4. Steps physics; ball/player contacts land in the [`TouchState`].
//! 5. Appends this tick's toucher and local player positions to the histories.
//! 6. Detects a goal from the ball's position and updates the score.
//! 7. Builds observations, then computes rewards.
//! 8. Advances the step counter and evaluates termination and truncation.
//! 9. On a goal, re-spots the ball at the centre and forgets all touches.
//!
//! # Determinism
//!
//! Spawn jitter is the only random input. Every episode draws it from a
//! `Pcg64` seeded with the episode seed, either passed to
//! [`reset`](SoccerEnv::reset) or drawn from a seed stream seeded by
//! [`EnvConfig::seed`]. The same episode seed and the same action sequence
//! reproduce the same trajectory.

use std::path::Path;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::consts::*;
use crate::contact::TouchState;
use crate::frame::{global_velocity, local_position};
use crate::history::History;
use crate::observation::{observe_all, Observations};
use crate::physics::{BodyKind, BodyState, ColliderShape, Material, PhysicsWorld, StepParams, Vec2};
use crate::reward::{PassShapingFn, RewardBreakdown, RewardContext, RewardEngine, RewardSpec};
use crate::SoccerError;

// ---------------------------------------------------------------------------
// EnvConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SoccerEnv`].
///
/// Every field is optional when deserialized; missing fields take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Seed of the stream that provides episode seeds for `reset(None)`.
    pub seed: u64,
    /// Ticks per episode before truncation. Must be at least 1.
    pub max_steps: u32,
    /// Reward term weights.
    pub rewards: RewardSpec,
    /// Physics integration parameters.
    pub step: StepParams,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            max_steps: MAX_STEPS,
            rewards: RewardSpec::default(),
            step: StepParams::default(),
        }
    }
}

impl EnvConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, SoccerError> {
        let config: EnvConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SoccerError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SoccerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), SoccerError> {
        if self.max_steps == 0 {
            return Err(SoccerError::InvalidMaxSteps);
        }
        if !(self.step.dt > 0.0 && self.step.dt.is_finite()) {
            return Err(SoccerError::InvalidTimestep(self.step.dt));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Extra data returned by [`SoccerEnv::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetInfo {
    /// Episode counter after this reset.
    pub episode: u64,
    /// Seed that produced this episode's spawn jitter.
    pub seed: u64,
}

/// Extra data returned by [`SoccerEnv::step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Rewards of agents 1, 2 and 3.
    pub other_reward: [f64; NUM_AGENTS - 1],
    /// Team that scored this tick.
    pub goal_scored: Option<usize>,
    /// Goals per team after this tick.
    pub score: [u32; NUM_TEAMS],
    pub breakdown: RewardBreakdown,
}

/// Everything one [`SoccerEnv::step`] produces.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observations: Observations,
    /// Reward of agent 0.
    pub reward: f64,
    /// A goal was scored this tick.
    pub terminated: bool,
    /// The episode reached `max_steps`.
    pub truncated: bool,
    pub info: StepInfo,
}

impl StepResult {
    /// Reward of every agent, indexed by agent id.
    pub fn agent_rewards(&self) -> [f64; NUM_AGENTS] {
        let [a1, a2, a3] = self.info.other_reward;
        [self.reward, a1, a2, a3]
    }
}

// ---------------------------------------------------------------------------
// Field layout
// ---------------------------------------------------------------------------

/// Un-jittered spawn point of every agent.
pub const SPAWN_POINTS: [Vec2; NUM_AGENTS] = [
    Vec2::new(GAME_WIDTH / 4.0, GAME_HEIGHT / 6.0),
    Vec2::new(GAME_WIDTH * 3.0 / 4.0, GAME_HEIGHT / 6.0),
    Vec2::new(GAME_WIDTH / 4.0, GAME_HEIGHT * 5.0 / 6.0),
    Vec2::new(GAME_WIDTH * 3.0 / 4.0, GAME_HEIGHT * 5.0 / 6.0),
];

/// Where the ball is placed at kick-off and after every goal.
pub const CENTER_SPOT: Vec2 = Vec2::new(GAME_WIDTH / 2.0, GAME_HEIGHT / 2.0);

/// Side walls plus the four goal-line segments flanking both goals.
fn wall_layout() -> Vec<(Vec2, ColliderShape)> {
    let segment = (GAME_WIDTH - GOAL_WIDTH) / 2.0;
    let side = ColliderShape::Box {
        half_width: WALL_THICKNESS,
        half_height: GAME_HEIGHT / 2.0,
    };
    let corner = ColliderShape::Box {
        half_width: segment / 2.0,
        half_height: WALL_THICKNESS,
    };
    let mut walls = vec![
        (Vec2::new(0.0, GAME_HEIGHT / 2.0), side.clone()),
        (Vec2::new(GAME_WIDTH, GAME_HEIGHT / 2.0), side),
    ];
    for y in [0.0, GAME_HEIGHT] {
        walls.push((Vec2::new(segment / 2.0, y), corner.clone()));
        walls.push((Vec2::new(GAME_WIDTH - segment / 2.0, y), corner.clone()));
    }
    walls
}

/// Jitter `spot` by up to [`SPAWNING_RADIUS`] per axis, keeping the player
/// inside the field.
fn jittered_spawn(spot: Vec2, rng: &mut Pcg64) -> Vec2 {
    let dx = rng.gen_range(-SPAWNING_RADIUS..=SPAWNING_RADIUS);
    let dy = rng.gen_range(-SPAWNING_RADIUS..=SPAWNING_RADIUS);
    Vec2::new(
        (spot.x + dx).clamp(PLAYER_SIZE, GAME_WIDTH - PLAYER_SIZE),
        (spot.y + dy).clamp(PLAYER_SIZE, GAME_HEIGHT - PLAYER_SIZE),
    )
}

/// Team scoring with the ball at `ball`: past `y = 0` is a goal for team 1,
/// past `y = GAME_HEIGHT` a goal for team 0.
pub fn goal_scored_by(ball: Vec2) -> Option<usize> {
    if ball.y < 0.0 {
        Some(1)
    } else if ball.y > GAME_HEIGHT {
        Some(0)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// SoccerEnv
// ---------------------------------------------------------------------------

/// The two-versus-two soccer environment.
pub struct SoccerEnv {
    config: EnvConfig,
    physics: PhysicsWorld,
    players: [RigidBodyHandle; NUM_AGENTS],
    ball: RigidBodyHandle,
    touch: TouchState,
    rewards: RewardEngine,
    seed_stream: Pcg64,
    episode_seed: u64,
    score: [u32; NUM_TEAMS],
    step_count: u32,
    episode_count: u64,
    position_history: History<[Vec2; NUM_AGENTS], HISTORY_LEN>,
    action_history: History<[Action; NUM_AGENTS], HISTORY_LEN>,
}

impl SoccerEnv {
    /// Create an environment and run the first reset.
    ///
    /// Fails if the configuration is invalid or if `distance_based_passing`
    /// is weighted, which needs [`with_pass_shaping`](Self::with_pass_shaping).
    pub fn new(config: EnvConfig) -> Result<Self, SoccerError> {
        Self::build(config, None)
    }

    /// Like [`new`](Self::new), with the shaping function used by
    /// `distance_based_passing`. The closure may capture state.
    pub fn with_pass_shaping(
        config: EnvConfig,
        shaping: impl Fn(f64, f64, f64) -> f64 + Send + Sync + 'static,
    ) -> Result<Self, SoccerError> {
        let shaping: PassShapingFn = Arc::new(shaping);
        Self::build(config, Some(shaping))
    }

    fn build(config: EnvConfig, shaping: Option<PassShapingFn>) -> Result<Self, SoccerError> {
        config.validate()?;
        let rewards = RewardEngine::new(config.rewards.clone(), shaping)?;
        let mut env = Self {
            seed_stream: Pcg64::seed_from_u64(config.seed),
            config,
            physics: PhysicsWorld::new(),
            players: [RigidBodyHandle::invalid(); NUM_AGENTS],
            ball: RigidBodyHandle::invalid(),
            touch: TouchState::new(),
            rewards,
            episode_seed: 0,
            score: [0; NUM_TEAMS],
            step_count: 0,
            episode_count: 0,
            position_history: History::new(),
            action_history: History::new(),
        };
        env.reset(None);
        Ok(env)
    }

    /// Rebuild the field and start a new episode.
    ///
    /// Clears every history, the touch state and the score, and increments
    /// the episode counter. With `None`, the episode seed is drawn from the
    /// configured seed stream.
    pub fn reset(&mut self, seed: Option<u64>) -> (Observations, ResetInfo) {
        let seed = seed.unwrap_or_else(|| self.seed_stream.gen());
        let mut rng = Pcg64::seed_from_u64(seed);

        self.physics.destroy_all_bodies();
        for (position, shape) in wall_layout() {
            self.physics
                .create_body(BodyKind::Wall, position, &shape, &Material::wall());
        }

        let player_shape = ColliderShape::Box {
            half_width: PLAYER_SIZE / 2.0,
            half_height: PLAYER_SIZE / 2.0,
        };
        for (agent, spot) in SPAWN_POINTS.iter().enumerate() {
            let position = jittered_spawn(*spot, &mut rng);
            self.players[agent] = self.physics.create_body(
                BodyKind::player(agent),
                position,
                &player_shape,
                &Material::player(),
            );
        }
        self.ball = self.physics.create_body(
            BodyKind::Ball,
            CENTER_SPOT,
            &ColliderShape::Circle {
                radius: BALL_RADIUS,
            },
            &Material::ball(),
        );

        self.touch.reset();
        self.rewards.reset_episode();
        self.position_history.clear();
        self.action_history.clear();
        self.score = [0; NUM_TEAMS];
        self.step_count = 0;
        self.episode_count += 1;
        self.episode_seed = seed;

        tracing::info!(episode = self.episode_count, seed, "episode reset");

        let info = ResetInfo {
            episode: self.episode_count,
            seed,
        };
        (self.observations(), info)
    }

    /// Advance the match by one tick.
    pub fn step(&mut self, actions: [Action; NUM_AGENTS]) -> StepResult {
        self.action_history.push(actions);

        for (agent, action) in actions.iter().enumerate() {
            let velocity = global_velocity(action.local_velocity(), agent);
            self.physics.set_velocity(self.players[agent], velocity);
        }

        self.touch.begin_step();
        self.physics.step(&self.config.step, &mut self.touch);
        self.touch.end_step();

        let players = self.player_states();
        let local_positions: [Vec2; NUM_AGENTS] =
            std::array::from_fn(|agent| local_position(players[agent].position, agent, false));
        self.position_history.push(local_positions);

        let ball = self.ball_state();
        let goal_scored = goal_scored_by(ball.position);
        if let Some(team) = goal_scored {
            self.score[team] += 1;
            tracing::debug!(
                team,
                score = ?self.score,
                step = self.step_count + 1,
                "goal scored"
            );
        }

        let observations = observe_all(&players, &ball);
        let breakdown = self.rewards.compute(&RewardContext {
            players: &players,
            ball: &ball,
            touch: &self.touch,
            position_history: &self.position_history,
            goal_scored,
        });

        self.step_count += 1;
        let terminated = goal_scored.is_some();
        let truncated = self.step_count >= self.config.max_steps;
        if truncated {
            tracing::debug!(
                episode = self.episode_count,
                steps = self.step_count,
                "episode truncated"
            );
        }

        if terminated {
            self.physics.set_body_state(
                self.ball,
                BodyState {
                    position: CENTER_SPOT,
                    velocity: Vec2::ZERO,
                },
            );
            self.touch.reset();
        }

        let [reward, a1, a2, a3] = breakdown.agent_rewards();
        tracing::trace!(
            step = self.step_count,
            ?actions,
            reward,
            toucher = ?self.touch.ball_toucher,
            "tick"
        );

        StepResult {
            observations,
            reward,
            terminated,
            truncated,
            info: StepInfo {
                other_reward: [a1, a2, a3],
                goal_scored,
                score: self.score,
                breakdown,
            },
        }
    }

    // -- Scenario setup -----------------------------------------------------

    /// Teleport the ball.
    pub fn set_ball_state(&mut self, state: BodyState) {
        self.physics.set_body_state(self.ball, state);
    }

    /// Teleport the player controlled by `agent`.
    pub fn set_player_state(&mut self, agent: usize, state: BodyState) -> Result<(), SoccerError> {
        let handle = *self
            .players
            .get(agent)
            .ok_or(SoccerError::InvalidAgent(agent))?;
        self.physics.set_body_state(handle, state);
        Ok(())
    }

    // -- Queries ------------------------------------------------------------

    fn body(&self, handle: RigidBodyHandle) -> BodyState {
        self.physics
            .body_state(handle)
            .expect("player and ball bodies live for the whole episode")
    }

    /// Global state of every player, indexed by agent id.
    pub fn player_states(&self) -> [BodyState; NUM_AGENTS] {
        std::array::from_fn(|agent| self.body(self.players[agent]))
    }

    pub fn ball_state(&self) -> BodyState {
        self.body(self.ball)
    }

    /// Observations of the current state.
    pub fn observations(&self) -> Observations {
        observe_all(&self.player_states(), &self.ball_state())
    }

    /// Goals per team since the last reset.
    pub fn score(&self) -> [u32; NUM_TEAMS] {
        self.score
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Number of resets so far, including the one run by the constructor.
    pub fn episode_count(&self) -> u64 {
        self.episode_count
    }

    /// Seed of the current episode.
    pub fn episode_seed(&self) -> u64 {
        self.episode_seed
    }

    pub fn touch_state(&self) -> &TouchState {
        &self.touch
    }

    pub fn position_history(&self) -> &History<[Vec2; NUM_AGENTS], HISTORY_LEN> {
        &self.position_history
    }

    pub fn action_history(&self) -> &History<[Action; NUM_AGENTS], HISTORY_LEN> {
        &self.action_history
    }

    pub fn reward_engine(&self) -> &RewardEngine {
        &self.rewards
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Number of bodies in the physics world.
    pub fn body_count(&self) -> usize {
        self.physics.body_count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
