//! Soccer Sim -- deterministic two-versus-two soccer simulation with
//! multi-term team rewards.
//!
//! Four velocity-controlled players and a ball share a gravity-free rapier2d
//! field. [`SoccerEnv`](env::SoccerEnv) drives one fixed-timestep tick per
//! [`step`](env::SoccerEnv::step) call, tracks ball touches, builds per-agent
//! observations in each agent's own reflected frame, and scores both teams
//! with a configurable [`RewardSpec`](reward::RewardSpec).
//!
//! # Quick Start
//!
//! ```
//! use soccer_sim::prelude::*;
//!
//! let mut env = SoccerEnv::new(EnvConfig::default()).unwrap();
//! let (obs, _info) = env.reset(Some(7));
//! assert_eq!(obs.len() * obs[0].len(), 80);
//!
//! let result = env.step([Action::Up, Action::Up, Action::NoOp, Action::NoOp]);
//! assert_eq!(env.step_count(), 1);
//! assert!(!result.truncated);
//! ```

#![deny(unsafe_code)]

use std::path::PathBuf;

pub mod action;
pub mod consts;
pub mod contact;
pub mod env;
pub mod frame;
pub mod history;
pub mod observation;
pub mod physics;
pub mod replay;
pub mod reward;
pub mod snapshot;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while configuring or replaying a match.
#[derive(Debug, thiserror::Error)]
pub enum SoccerError {
    /// A raw action code outside `0..=8`.
    #[error("action code {0} is out of range, expected 0..=8")]
    InvalidAction(i64),

    /// An agent id outside `0..NUM_AGENTS`.
    #[error("agent {0} does not exist, expected 0..4")]
    InvalidAgent(usize),

    /// An episode cap of zero ticks.
    #[error("max_steps must be at least 1")]
    InvalidMaxSteps,

    /// A tick duration that is zero, negative, or not finite.
    #[error("step dt {0} must be positive and finite")]
    InvalidTimestep(f64),

    /// `distance_based_passing` is weighted but no shaping function was given.
    #[error("reward term 'distance_based_passing' is weighted but no pass shaping function was provided")]
    MissingPassShaping,

    /// Malformed JSON configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A replay log that cannot be replayed.
    #[error("malformed episode log: {0}")]
    MalformedLog(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::action::{actions_from_codes, Action};
    pub use crate::consts::{team_of, NUM_AGENTS, NUM_TEAMS, OBSERVATION_SIZE, TEAM_SIZE};
    pub use crate::contact::TouchState;
    pub use crate::env::{EnvConfig, ResetInfo, SoccerEnv, StepInfo, StepResult};
    pub use crate::history::History;
    pub use crate::observation::{observation_bounds, AgentObservation, Observations};
    pub use crate::physics::{BodyKind, BodyState, StepParams, Vec2};
    pub use crate::replay::{
        replay, EpisodeEntry, EpisodeLog, EpisodeRecorder, ReplayDivergence, ReplayResult,
    };
    pub use crate::reward::{
        PassShapingFn, RewardBreakdown, RewardEngine, RewardSpec, RewardTerm, TeamValues,
    };
    pub use crate::snapshot::{MatchSnapshot, PlayerSnapshot};
    pub use crate::SoccerError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn error_messages_name_the_problem() {
        assert_eq!(
            SoccerError::InvalidAction(12).to_string(),
            "action code 12 is out of range, expected 0..=8"
        );
        assert!(SoccerError::MissingPassShaping
            .to_string()
            .contains("distance_based_passing"));
    }

    #[test]
    fn json_errors_convert() {
        let err: SoccerError = serde_json::from_str::<RewardSpec>("{").unwrap_err().into();
        assert!(matches!(err, SoccerError::Config(_)));
    }

    #[test]
    fn prelude_covers_a_full_episode() {
        let mut env = SoccerEnv::new(EnvConfig::default()).unwrap();
        env.reset(Some(3));
        let actions = actions_from_codes([0, 2, 4, 8]).unwrap();
        for _ in 0..5 {
            let result = env.step(actions);
            assert_eq!(result.observations.len(), NUM_AGENTS);
        }
        assert_eq!(env.step_count(), 5);
    }
}
