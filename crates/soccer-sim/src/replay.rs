//! Episode recording and deterministic replay verification.
//!
//! An [`EpisodeRecorder`] captures the episode seed, every tick's action
//! vector, and periodic state-hash checkpoints into an [`EpisodeLog`].
//! [`replay`] resets an environment with the recorded seed, feeds the actions
//! back tick by tick, and compares state hashes at each checkpoint.
//!
//! ```
//! use soccer_sim::prelude::*;
//!
//! let mut env = SoccerEnv::new(EnvConfig::default()).unwrap();
//! let (_, info) = env.reset(Some(21));
//! let mut recorder = EpisodeRecorder::new(info.seed, 5);
//!
//! for tick in 0..30 {
//!     let actions = [Action::Up, Action::Left, Action::Down, Action::NoOp];
//!     recorder.record_tick(tick, &actions, Some(env.state_hash()));
//!     env.step(actions);
//! }
//! let log = recorder.finish();
//!
//! let mut fresh = SoccerEnv::new(EnvConfig::default()).unwrap();
//! let result = replay(&mut fresh, &log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! ```
//!
//! The log does not carry the [`EnvConfig`](crate::env::EnvConfig): replay on
//! an environment configured like the recording one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::consts::NUM_AGENTS;
use crate::env::SoccerEnv;
use crate::SoccerError;

const IDLE: [Action; NUM_AGENTS] = [Action::NoOp; NUM_AGENTS];

// ---------------------------------------------------------------------------
// EpisodeLog
// ---------------------------------------------------------------------------

/// A recorded episode: seed plus ordered actions and checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeLog {
    /// Seed passed to `reset` at the start of the episode.
    pub seed: u64,
    /// Number of ticks recorded. Replay runs exactly this many.
    pub total_ticks: u32,
    pub entries: Vec<EpisodeEntry>,
}

/// One entry of an [`EpisodeLog`].
///
/// Ticks on which every agent idles are not stored; replay fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EpisodeEntry {
    Actions {
        tick: u32,
        actions: [Action; NUM_AGENTS],
    },
    /// State hash taken before the tick executed.
    Checkpoint { tick: u32, state_hash: String },
}

/// Outcome of [`replay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Every recorded tick was replayed without divergence.
    pub completed: bool,
    pub ticks_replayed: u32,
    /// First checkpoint whose hash did not match.
    pub first_divergence: Option<ReplayDivergence>,
}

/// A checkpoint mismatch found during replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub tick: u32,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// EpisodeRecorder
// ---------------------------------------------------------------------------

/// Builds an [`EpisodeLog`] while an episode runs.
///
/// Call [`record_tick`](Self::record_tick) before each `step`, with strictly
/// increasing ticks, then [`finish`](Self::finish).
pub struct EpisodeRecorder {
    log: EpisodeLog,
    /// Checkpoint every this many ticks; 0 checkpoints whenever a hash is given.
    checkpoint_interval: u32,
    ticks_recorded: u32,
    last_tick: Option<u32>,
}

impl EpisodeRecorder {
    pub fn new(seed: u64, checkpoint_interval: u32) -> Self {
        Self {
            log: EpisodeLog {
                seed,
                total_ticks: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            ticks_recorded: 0,
            last_tick: None,
        }
    }

    /// Record the actions about to be stepped at `tick`, and a checkpoint if
    /// `state_hash` is given and `tick` falls on the interval.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not strictly greater than the previous one.
    pub fn record_tick(
        &mut self,
        tick: u32,
        actions: &[Action; NUM_AGENTS],
        state_hash: Option<String>,
    ) {
        if let Some(prev) = self.last_tick {
            assert!(
                tick > prev,
                "EpisodeRecorder::record_tick: tick {tick} does not follow previous tick {prev}"
            );
        }
        self.last_tick = Some(tick);
        self.ticks_recorded += 1;

        if let Some(hash) = state_hash {
            let due = self.checkpoint_interval == 0 || tick % self.checkpoint_interval == 0;
            if due {
                self.log.entries.push(EpisodeEntry::Checkpoint {
                    tick,
                    state_hash: hash,
                });
            }
        }

        if *actions != IDLE {
            self.log.entries.push(EpisodeEntry::Actions {
                tick,
                actions: *actions,
            });
        }
    }

    pub fn finish(mut self) -> EpisodeLog {
        self.log.total_ticks = self.ticks_recorded;
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `env`, stopping at the first checkpoint mismatch.
///
/// The log is validated before `env` is touched; a log with two entries of
/// the same kind on one tick is rejected with
/// [`SoccerError::MalformedLog`].
pub fn replay(env: &mut SoccerEnv, log: &EpisodeLog) -> Result<ReplayResult, SoccerError> {
    let mut actions_at: BTreeMap<u32, [Action; NUM_AGENTS]> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u32, &str> = BTreeMap::new();

    for entry in &log.entries {
        match entry {
            EpisodeEntry::Actions { tick, actions } => {
                if actions_at.insert(*tick, *actions).is_some() {
                    return Err(SoccerError::MalformedLog(format!(
                        "duplicate actions at tick {tick}"
                    )));
                }
            }
            EpisodeEntry::Checkpoint { tick, state_hash } => {
                if checkpoints.insert(*tick, state_hash.as_str()).is_some() {
                    return Err(SoccerError::MalformedLog(format!(
                        "duplicate checkpoint at tick {tick}"
                    )));
                }
            }
        }
    }

    env.reset(Some(log.seed));

    let mut ticks_replayed = 0;
    for tick in 0..log.total_ticks {
        if let Some(expected) = checkpoints.get(&tick) {
            let actual = env.state_hash();
            if actual != *expected {
                tracing::debug!(tick, expected = %expected, actual = %actual, "replay diverged");
                return Ok(ReplayResult {
                    completed: false,
                    ticks_replayed,
                    first_divergence: Some(ReplayDivergence {
                        tick,
                        expected_hash: expected.to_string(),
                        actual_hash: actual,
                    }),
                });
            }
        }

        env.step(actions_at.get(&tick).copied().unwrap_or(IDLE));
        ticks_replayed += 1;
    }

    Ok(ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    })
}
