//! Weighted multi-term team rewards.
//!
//! A [`RewardSpec`] assigns an optional weight to each [`RewardTerm`]. Every
//! tick the [`RewardEngine`] evaluates only the terms that carry a weight,
//! sums their weighted contributions into one value per team, and hands every
//! agent its team's value. Teammates always receive identical rewards.
//!
//! Terms come in three scopes (see [`TermScope`]):
//!
//! - **team** terms produce one value per team directly;
//! - **agent-average** terms score each player and add `weight / TEAM_SIZE`
//!   times each score to its team;
//! - **team-best** terms score each player and add `weight` times the best
//!   score in the team.
//!
//! All term functions are pure functions of a [`RewardContext`], except
//! `first_touch`, which the engine latches once per episode.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::contact::TouchState;
use crate::history::History;
use crate::physics::{BodyState, Vec2};
use crate::SoccerError;

/// One value per team.
pub type TeamValues = [f64; NUM_TEAMS];

/// Shaping applied to the distance of a pass:
/// `(distance, quadratic_threshold, linear_threshold) -> reward`.
///
/// Shared so that a shaping closure can carry its own state (a Python
/// callable, a tuned curve) into every clone of the engine.
pub type PassShapingFn = Arc<dyn Fn(f64, f64, f64) -> f64 + Send + Sync>;

// ---------------------------------------------------------------------------
// RewardTerm
// ---------------------------------------------------------------------------

/// How a term's per-player scores are folded into team values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermScope {
    Team,
    AgentAverage,
    TeamBest,
}

/// Every reward term the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTerm {
    BaseNegative,
    Goal,
    WinningTheBallAndPassing,
    DistanceBasedPassing,
    PlayerDistance,
    VelocityToGoal,
    DistToGoal,
    FirstTouch,
    Shooting,
    StayInField,
    Smoothness,
    VelocityToBall,
    DistToBall,
    StayOwnHalf,
}

impl RewardTerm {
    /// Every term, in evaluation order.
    pub const ALL: [RewardTerm; 14] = [
        RewardTerm::BaseNegative,
        RewardTerm::Goal,
        RewardTerm::WinningTheBallAndPassing,
        RewardTerm::DistanceBasedPassing,
        RewardTerm::PlayerDistance,
        RewardTerm::VelocityToGoal,
        RewardTerm::DistToGoal,
        RewardTerm::FirstTouch,
        RewardTerm::Shooting,
        RewardTerm::StayInField,
        RewardTerm::Smoothness,
        RewardTerm::VelocityToBall,
        RewardTerm::DistToBall,
        RewardTerm::StayOwnHalf,
    ];

    /// Configuration key of the term.
    pub fn name(self) -> &'static str {
        match self {
            RewardTerm::BaseNegative => "base_negative",
            RewardTerm::Goal => "goal",
            RewardTerm::WinningTheBallAndPassing => "winning_the_ball_and_passing",
            RewardTerm::DistanceBasedPassing => "distance_based_passing",
            RewardTerm::PlayerDistance => "player_distance",
            RewardTerm::VelocityToGoal => "velocity_to_goal",
            RewardTerm::DistToGoal => "dist_to_goal",
            RewardTerm::FirstTouch => "first_touch",
            RewardTerm::Shooting => "shooting",
            RewardTerm::StayInField => "stay_in_field",
            RewardTerm::Smoothness => "smoothness",
            RewardTerm::VelocityToBall => "velocity_to_ball",
            RewardTerm::DistToBall => "dist_to_ball",
            RewardTerm::StayOwnHalf => "stay_own_half",
        }
    }

    pub fn scope(self) -> TermScope {
        match self {
            RewardTerm::StayInField | RewardTerm::Smoothness | RewardTerm::VelocityToBall => {
                TermScope::AgentAverage
            }
            RewardTerm::DistToBall | RewardTerm::StayOwnHalf => TermScope::TeamBest,
            _ => TermScope::Team,
        }
    }
}

// ---------------------------------------------------------------------------
// RewardSpec
// ---------------------------------------------------------------------------

/// Optional weight per reward term.
///
/// A term whose weight is `None` is skipped entirely. When deserialized, keys
/// that are missing leave their term absent and unknown keys are ignored;
/// [`RewardSpec::default`] is the stock training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_negative: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_the_ball_and_passing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_based_passing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_to_goal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_to_goal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_touch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shooting: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay_in_field: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_to_ball: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_to_ball: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay_own_half: Option<f64>,
    /// `dist_to_ball` scores zero unless this is set, even when weighted.
    #[serde(default)]
    pub dist_to_ball_enabled: bool,
}

impl RewardSpec {
    /// A specification with every term absent.
    pub fn empty() -> Self {
        Self {
            base_negative: None,
            goal: None,
            winning_the_ball_and_passing: None,
            distance_based_passing: None,
            player_distance: None,
            velocity_to_goal: None,
            dist_to_goal: None,
            first_touch: None,
            shooting: None,
            stay_in_field: None,
            smoothness: None,
            velocity_to_ball: None,
            dist_to_ball: None,
            stay_own_half: None,
            dist_to_ball_enabled: false,
        }
    }

    fn slot(&mut self, term: RewardTerm) -> &mut Option<f64> {
        match term {
            RewardTerm::BaseNegative => &mut self.base_negative,
            RewardTerm::Goal => &mut self.goal,
            RewardTerm::WinningTheBallAndPassing => &mut self.winning_the_ball_and_passing,
            RewardTerm::DistanceBasedPassing => &mut self.distance_based_passing,
            RewardTerm::PlayerDistance => &mut self.player_distance,
            RewardTerm::VelocityToGoal => &mut self.velocity_to_goal,
            RewardTerm::DistToGoal => &mut self.dist_to_goal,
            RewardTerm::FirstTouch => &mut self.first_touch,
            RewardTerm::Shooting => &mut self.shooting,
            RewardTerm::StayInField => &mut self.stay_in_field,
            RewardTerm::Smoothness => &mut self.smoothness,
            RewardTerm::VelocityToBall => &mut self.velocity_to_ball,
            RewardTerm::DistToBall => &mut self.dist_to_ball,
            RewardTerm::StayOwnHalf => &mut self.stay_own_half,
        }
    }

    /// Weight of `term`, or `None` if the term is absent.
    pub fn weight(&self, term: RewardTerm) -> Option<f64> {
        match term {
            RewardTerm::BaseNegative => self.base_negative,
            RewardTerm::Goal => self.goal,
            RewardTerm::WinningTheBallAndPassing => self.winning_the_ball_and_passing,
            RewardTerm::DistanceBasedPassing => self.distance_based_passing,
            RewardTerm::PlayerDistance => self.player_distance,
            RewardTerm::VelocityToGoal => self.velocity_to_goal,
            RewardTerm::DistToGoal => self.dist_to_goal,
            RewardTerm::FirstTouch => self.first_touch,
            RewardTerm::Shooting => self.shooting,
            RewardTerm::StayInField => self.stay_in_field,
            RewardTerm::Smoothness => self.smoothness,
            RewardTerm::VelocityToBall => self.velocity_to_ball,
            RewardTerm::DistToBall => self.dist_to_ball,
            RewardTerm::StayOwnHalf => self.stay_own_half,
        }
    }

    /// Set or clear the weight of `term`.
    pub fn set_weight(&mut self, term: RewardTerm, weight: Option<f64>) {
        *self.slot(term) = weight;
    }

    /// Builder form of [`set_weight`](Self::set_weight).
    pub fn with_weight(mut self, term: RewardTerm, weight: f64) -> Self {
        self.set_weight(term, Some(weight));
        self
    }

    /// Weighted terms, in evaluation order.
    pub fn active_terms(&self) -> impl Iterator<Item = (RewardTerm, f64)> + '_ {
        RewardTerm::ALL
            .into_iter()
            .filter_map(|term| self.weight(term).map(|w| (term, w)))
    }
}

impl Default for RewardSpec {
    fn default() -> Self {
        Self::empty()
            .with_weight(RewardTerm::Goal, 100.0)
            .with_weight(RewardTerm::WinningTheBallAndPassing, 2.0)
            .with_weight(RewardTerm::Smoothness, 0.05)
            .with_weight(RewardTerm::StayInField, 0.05)
            .with_weight(RewardTerm::StayOwnHalf, 0.05)
            .with_weight(RewardTerm::BaseNegative, -0.15)
    }
}

// ---------------------------------------------------------------------------
// Context and breakdown
// ---------------------------------------------------------------------------

/// Everything a term may look at for one tick.
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    pub players: &'a [BodyState; NUM_AGENTS],
    pub ball: &'a BodyState,
    pub touch: &'a TouchState,
    /// Un-normalized local positions of every agent, oldest first.
    pub position_history: &'a History<[Vec2; NUM_AGENTS], HISTORY_LEN>,
    /// Team that scored this tick.
    pub goal_scored: Option<usize>,
}

/// Per-tick rewards with each active term's weighted contribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    /// Summed reward per team.
    pub team: TeamValues,
    /// Weighted contribution of every evaluated term, in evaluation order.
    pub terms: Vec<(RewardTerm, TeamValues)>,
}

impl RewardBreakdown {
    /// Reward of every agent: its team's value.
    pub fn agent_rewards(&self) -> [f64; NUM_AGENTS] {
        std::array::from_fn(|agent| self.team[team_of(agent)])
    }

    /// Weighted contribution of `term`, if it was evaluated.
    pub fn term(&self, term: RewardTerm) -> Option<TeamValues> {
        self.terms.iter().find(|(t, _)| *t == term).map(|(_, v)| *v)
    }
}

// ---------------------------------------------------------------------------
// RewardEngine
// ---------------------------------------------------------------------------

/// Evaluates a [`RewardSpec`] against the match state each tick.
#[derive(Clone)]
pub struct RewardEngine {
    spec: RewardSpec,
    pass_shaping: Option<PassShapingFn>,
    first_touch_happened: bool,
}

impl fmt::Debug for RewardEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewardEngine")
            .field("spec", &self.spec)
            .field("pass_shaping", &self.pass_shaping.is_some())
            .field("first_touch_happened", &self.first_touch_happened)
            .finish()
    }
}

impl RewardEngine {
    /// Fails with [`SoccerError::MissingPassShaping`] when
    /// `distance_based_passing` is weighted but no shaping function is given.
    pub fn new(spec: RewardSpec, pass_shaping: Option<PassShapingFn>) -> Result<Self, SoccerError> {
        if spec.distance_based_passing.is_some() && pass_shaping.is_none() {
            return Err(SoccerError::MissingPassShaping);
        }
        Ok(Self {
            spec,
            pass_shaping,
            first_touch_happened: false,
        })
    }

    pub fn spec(&self) -> &RewardSpec {
        &self.spec
    }

    /// Whether `first_touch` already paid out this episode.
    pub fn first_touch_happened(&self) -> bool {
        self.first_touch_happened
    }

    /// Re-arm the once-per-episode terms.
    pub fn reset_episode(&mut self) {
        self.first_touch_happened = false;
    }

    /// Evaluate every weighted term for this tick.
    pub fn compute(&mut self, ctx: &RewardContext<'_>) -> RewardBreakdown {
        let mut breakdown = RewardBreakdown::default();
        for term in RewardTerm::ALL {
            let Some(weight) = self.spec.weight(term) else {
                continue;
            };
            let values = self.weighted(term, weight, ctx);
            for (total, v) in breakdown.team.iter_mut().zip(values) {
                *total += v;
            }
            breakdown.terms.push((term, values));
        }
        breakdown
    }

    fn weighted(&mut self, term: RewardTerm, weight: f64, ctx: &RewardContext<'_>) -> TeamValues {
        match term.scope() {
            TermScope::Team => {
                let raw = self.team_term(term, ctx);
                raw.map(|v| weight * v)
            }
            TermScope::AgentAverage => {
                let mut values = [0.0; NUM_TEAMS];
                for agent in 0..NUM_AGENTS {
                    values[team_of(agent)] +=
                        1.0 / TEAM_SIZE as f64 * weight * self.agent_term(term, agent, ctx);
                }
                values
            }
            TermScope::TeamBest => std::array::from_fn(|team| {
                let best = (team * TEAM_SIZE..(team + 1) * TEAM_SIZE)
                    .map(|agent| self.agent_term(term, agent, ctx))
                    .fold(f64::NEG_INFINITY, f64::max);
                weight * best
            }),
        }
    }

    fn team_term(&mut self, term: RewardTerm, ctx: &RewardContext<'_>) -> TeamValues {
        match term {
            RewardTerm::BaseNegative => base_negative_reward(),
            RewardTerm::Goal => goal_reward(ctx.goal_scored),
            RewardTerm::WinningTheBallAndPassing => winning_the_ball_and_passing_reward(ctx.touch),
            RewardTerm::DistanceBasedPassing => match &self.pass_shaping {
                Some(shaping) => distance_based_passing_reward(ctx.touch, shaping.as_ref()),
                None => [0.0; NUM_TEAMS],
            },
            RewardTerm::PlayerDistance => player_distance_reward(ctx.players),
            RewardTerm::VelocityToGoal => velocity_to_goal_reward(ctx.ball),
            RewardTerm::DistToGoal => dist_to_goal_reward(ctx.ball),
            RewardTerm::FirstTouch => self.first_touch_reward(ctx.touch),
            RewardTerm::Shooting => shooting_reward(ctx.touch, ctx.ball),
            _ => [0.0; NUM_TEAMS],
        }
    }

    fn agent_term(&self, term: RewardTerm, agent: usize, ctx: &RewardContext<'_>) -> f64 {
        let player = &ctx.players[agent];
        match term {
            RewardTerm::StayInField => stay_in_field_reward(player),
            RewardTerm::Smoothness => smoothness_reward(ctx.position_history, agent),
            RewardTerm::VelocityToBall => velocity_to_ball_reward(player, ctx.ball),
            RewardTerm::DistToBall => {
                dist_to_ball_reward(player, ctx.ball, self.spec.dist_to_ball_enabled)
            }
            RewardTerm::StayOwnHalf => stay_own_half_reward(agent, player, ctx.ball),
            _ => 0.0,
        }
    }

    /// +1 to the team of the first toucher of the episode, -0.5 to the other.
    ///
    /// Pays out once the touch is committed to `last_ball_toucher`, one tick
    /// after the contact.
    fn first_touch_reward(&mut self, touch: &TouchState) -> TeamValues {
        let mut values = [0.0; NUM_TEAMS];
        if self.first_touch_happened {
            return values;
        }
        let Some(toucher) = touch.last_ball_toucher else {
            return values;
        };
        let team = team_of(toucher);
        values[team] = 1.0;
        values[1 - team] = -0.5;
        self.first_touch_happened = true;
        values
    }
}

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// Default scale for [`normalized_distance`].
pub const FIELD_DIAGONAL_BOUND: f64 = GAME_WIDTH + GAME_HEIGHT;

/// `|a - b| / max_distance`.
pub fn normalized_distance(a: Vec2, b: Vec2, max_distance: f64) -> f64 {
    a.distance(b) / max_distance
}

/// Projection of `v` onto the direction of `d`, divided by `max_value`.
pub fn normalized_dot(v: Vec2, d: Vec2, max_value: f64) -> f64 {
    v.dot(d) / (d.length() + 1e-6) / max_value
}

/// Centre of the goal `team` defends.
pub fn own_goal(team: usize) -> Vec2 {
    let y = if team == 0 { 0.0 } else { GAME_HEIGHT };
    Vec2::new(GAME_WIDTH / 2.0, y)
}

/// Centre of the goal `team` attacks.
pub fn opponent_goal(team: usize) -> Vec2 {
    own_goal(1 - team)
}

// ---------------------------------------------------------------------------
// Team terms
// ---------------------------------------------------------------------------

/// Constant per-tick value; the weight carries the sign.
pub fn base_negative_reward() -> TeamValues {
    [1.0; NUM_TEAMS]
}

/// +1 for the scoring team, -0.5 for the conceding team.
pub fn goal_reward(goal_scored: Option<usize>) -> TeamValues {
    let mut values = [0.0; NUM_TEAMS];
    if let Some(scorer) = goal_scored {
        for (team, v) in values.iter_mut().enumerate() {
            *v = if team == scorer { 1.0 } else { -0.5 };
        }
    }
    values
}

/// Rewards a touch that follows exactly two touchless ticks and changes the
/// toucher: +1 to the toucher's team, -1 to the other.
pub fn winning_the_ball_and_passing_reward(touch: &TouchState) -> TeamValues {
    let mut values = [0.0; NUM_TEAMS];
    let Some(toucher) = touch.ball_toucher else {
        return values;
    };
    let history = &touch.ball_toucher_history;
    if history.len() < HISTORY_LEN {
        return values;
    }
    let quiet_before = history.from_newest(2) == Some(&None) && history.from_newest(1) == Some(&None);
    if !quiet_before || touch.last_ball_toucher == Some(toucher) {
        return values;
    }
    let team = team_of(toucher);
    for (t, v) in values.iter_mut().enumerate() {
        *v = if t == team { 1.0 } else { -1.0 };
    }
    values
}

/// Rewards the toucher's team for a change of possession, shaped by the
/// distance between the two touch points. The first touch of a ball scores a
/// flat +1; a repeated touch by the same agent scores nothing.
pub fn distance_based_passing_reward(
    touch: &TouchState,
    shaping: &dyn Fn(f64, f64, f64) -> f64,
) -> TeamValues {
    let mut values = [0.0; NUM_TEAMS];
    let (Some(coordinate), Some(toucher)) = (touch.ball_touch_coordinate, touch.ball_toucher) else {
        return values;
    };
    let team = team_of(toucher);
    match touch.last_ball_touch_coordinate {
        None => values[team] += 1.0,
        Some(_) if touch.last_ball_toucher == Some(toucher) => {}
        Some(last) => {
            let distance = normalized_distance(coordinate, last, 1.0);
            values[team] += shaping(distance, PASSING_QUADRATIC_THRESHOLD, PASSING_THRESHOLD);
        }
    }
    values
}

/// For every teammate pair closer than [`PLAYER_DISTANCE_THRESHOLD`] metres,
/// `(threshold - d)^2 / threshold^2`.
pub fn player_distance_reward(players: &[BodyState; NUM_AGENTS]) -> TeamValues {
    let mut values = [0.0; NUM_TEAMS];
    for (team, v) in values.iter_mut().enumerate() {
        let start = team * TEAM_SIZE;
        for i in start..start + TEAM_SIZE {
            for j in i + 1..start + TEAM_SIZE {
                let d = normalized_distance(players[i].position, players[j].position, 1.0);
                if d >= PLAYER_DISTANCE_THRESHOLD {
                    continue;
                }
                *v += (PLAYER_DISTANCE_THRESHOLD - d).powi(2) / PLAYER_DISTANCE_THRESHOLD.powi(2);
            }
        }
    }
    values
}

/// Ball velocity projected on the direction to each team's target goal.
pub fn velocity_to_goal_reward(ball: &BodyState) -> TeamValues {
    std::array::from_fn(|team| {
        normalized_dot(
            ball.velocity,
            opponent_goal(team) - ball.position,
            REALISTIC_MAXIMUM_VELOCITY,
        )
    })
}

/// `1 - normalized distance` from the ball to each team's target goal.
pub fn dist_to_goal_reward(ball: &BodyState) -> TeamValues {
    std::array::from_fn(|team| {
        1.0 - normalized_distance(ball.position, opponent_goal(team), FIELD_DIAGONAL_BOUND)
    })
}

/// Ball speed credited to the team of the last committed toucher.
///
/// A contact registered this tick has not moved the ball yet, so the speed
/// still belongs to the previous toucher's kick.
pub fn shooting_reward(touch: &TouchState, ball: &BodyState) -> TeamValues {
    let mut values = [0.0; NUM_TEAMS];
    if let Some(toucher) = touch.last_ball_toucher {
        values[team_of(toucher)] = ball.velocity.length() / REALISTIC_MAXIMUM_VELOCITY;
    }
    values
}

// ---------------------------------------------------------------------------
// Per-agent terms
// ---------------------------------------------------------------------------

/// +1 strictly inside the field, -1 otherwise.
pub fn stay_in_field_reward(player: &BodyState) -> f64 {
    let p = player.position;
    if p.x > 0.0 && p.x < GAME_WIDTH && p.y > 0.0 && p.y < GAME_HEIGHT {
        1.0
    } else {
        -1.0
    }
}

/// +1 if the agent covered at least half the expected distance across the
/// position history, -1 if not, 0 until two positions are recorded.
pub fn smoothness_reward(
    history: &History<[Vec2; NUM_AGENTS], HISTORY_LEN>,
    agent: usize,
) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let (Some(oldest), Some(newest)) = (history.oldest(), history.newest()) else {
        return 0.0;
    };
    let moved = newest[agent].distance(oldest[agent]);
    if moved >= SMOOTHNESS_EXPECTED_DISTANCE / 2.0 {
        1.0
    } else {
        -1.0
    }
}

/// Player velocity projected on the direction to the ball.
pub fn velocity_to_ball_reward(player: &BodyState, ball: &BodyState) -> f64 {
    normalized_dot(
        player.velocity,
        ball.position - player.position,
        REALISTIC_MAXIMUM_VELOCITY,
    )
}

/// `1 - normalized distance` from player to ball; 0 unless `enabled`.
pub fn dist_to_ball_reward(player: &BodyState, ball: &BodyState, enabled: bool) -> f64 {
    if !enabled {
        return 0.0;
    }
    1.0 - normalized_distance(player.position, ball.position, FIELD_DIAGONAL_BOUND)
}

/// +1 if the player is closer to its own goal than the ball is.
pub fn stay_own_half_reward(agent: usize, player: &BodyState, ball: &BodyState) -> f64 {
    let goal = own_goal(team_of(agent));
    let radius = normalized_distance(goal, ball.position, 1.0);
    let distance = normalized_distance(player.position, goal, 1.0);
    if distance < radius {
        1.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
