//! Serializable match snapshots with BLAKE3 state hashing.
//!
//! [`MatchSnapshot`] is what a renderer consumes every tick: counters, score,
//! every player's tag and state, the ball, and the touch bookkeeping.
//! [`SoccerEnv::state_hash`] digests the simulation part of it so two runs can
//! be compared tick by tick.
//!
//! ```
//! use soccer_sim::prelude::*;
//!
//! let mut a = SoccerEnv::new(EnvConfig::default()).unwrap();
//! let mut b = SoccerEnv::new(EnvConfig::default()).unwrap();
//! a.reset(Some(11));
//! b.reset(Some(11));
//! for _ in 0..20 {
//!     a.step([Action::Up; 4]);
//!     b.step([Action::Up; 4]);
//! }
//! assert_eq!(a.state_hash(), b.state_hash());
//! assert_eq!(a.state_hash().len(), 64);
//! ```
//!
//! The episode counter is part of the snapshot but not of the hash, so an
//! episode replayed on a fresh environment hashes like the recorded one.

use serde::{Deserialize, Serialize};

use crate::consts::{team_of, NUM_AGENTS, NUM_TEAMS};
use crate::contact::TouchState;
use crate::env::SoccerEnv;
use crate::physics::BodyState;

/// One player as seen by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub agent: usize,
    pub team: usize,
    pub state: BodyState,
}

/// Full observable state of a match at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub episode: u64,
    pub step: u32,
    pub score: [u32; NUM_TEAMS],
    pub players: [PlayerSnapshot; NUM_AGENTS],
    pub ball: BodyState,
    pub touch: TouchState,
}

impl MatchSnapshot {
    /// BLAKE3 hex digest of everything except the episode counter.
    pub fn state_hash(&self) -> String {
        #[derive(Serialize)]
        struct HashableState<'a> {
            step: u32,
            score: &'a [u32; NUM_TEAMS],
            players: &'a [PlayerSnapshot; NUM_AGENTS],
            ball: &'a BodyState,
            touch: &'a TouchState,
        }

        let hashable = HashableState {
            step: self.step,
            score: &self.score,
            players: &self.players,
            ball: &self.ball,
            touch: &self.touch,
        };
        let json_bytes = serde_json::to_vec(&hashable)
            .expect("MatchSnapshot state should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }
}

impl SoccerEnv {
    /// Capture the current match state.
    pub fn snapshot(&self) -> MatchSnapshot {
        let states = self.player_states();
        MatchSnapshot {
            episode: self.episode_count(),
            step: self.step_count(),
            score: self.score(),
            players: std::array::from_fn(|agent| PlayerSnapshot {
                agent,
                team: team_of(agent),
                state: states[agent],
            }),
            ball: self.ball_state(),
            touch: self.touch_state().clone(),
        }
    }

    /// BLAKE3 hex digest of the current match state.
    pub fn state_hash(&self) -> String {
        self.snapshot().state_hash()
    }
}
