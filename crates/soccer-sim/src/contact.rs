//! Ball touch tracking.
//!
//! [`TouchState`] records which agent touched the ball during the current
//! tick, remembers the most recent toucher across ticks without contact, and
//! keeps a three-tick rolling history of per-tick touchers. The episode
//! controller drives it in three phases per tick:
//!
//! 1. [`TouchState::begin_step`] commits the previous tick's touch into the
//!    `last_*` fields and clears the per-tick fields.
//! 2. The physics step delivers contacts through [`ContactListener`].
//! 3. [`TouchState::end_step`] appends this tick's toucher (possibly `None`)
//!    to the history.

use serde::{Deserialize, Serialize};

use crate::consts::{HISTORY_LEN, NUM_TEAMS};
use crate::history::History;
use crate::physics::{BodyKind, ContactBegin, ContactListener, Vec2};

/// Touch bookkeeping for the ball, reset whenever the ball is re-spotted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TouchState {
    /// Which teams touched the ball during the current tick.
    pub ball_touched_by_team: [bool; NUM_TEAMS],
    /// Agent that touched the ball during the current tick.
    pub ball_toucher: Option<usize>,
    /// Most recent toucher committed from an earlier tick.
    pub last_ball_toucher: Option<usize>,
    /// Ball position at the current tick's touch.
    pub ball_touch_coordinate: Option<Vec2>,
    /// Ball position at the most recent committed touch.
    pub last_ball_touch_coordinate: Option<Vec2>,
    /// Per-tick touchers, oldest first.
    pub ball_toucher_history: History<Option<usize>, HISTORY_LEN>,
}

impl TouchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every touch, including the history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Commit the previous tick's touch and clear the per-tick fields.
    pub fn begin_step(&mut self) {
        if let Some(toucher) = self.ball_toucher.take() {
            self.last_ball_toucher = Some(toucher);
        }
        if let Some(coordinate) = self.ball_touch_coordinate.take() {
            self.last_ball_touch_coordinate = Some(coordinate);
        }
        self.ball_touched_by_team = [false; NUM_TEAMS];
    }

    /// Record a ball touch by `agent` with the ball at `ball_position`.
    ///
    /// Later touches within the same tick overwrite earlier ones.
    pub fn record_touch(&mut self, team: usize, agent: usize, ball_position: Vec2) {
        if let Some(touched) = self.ball_touched_by_team.get_mut(team) {
            *touched = true;
        }
        self.ball_toucher = Some(agent);
        self.ball_touch_coordinate = Some(ball_position);
    }

    /// Append this tick's toucher to the rolling history.
    pub fn end_step(&mut self) {
        self.ball_toucher_history.push(self.ball_toucher);
    }

    /// The agent that touched the ball most recently, counting this tick.
    pub fn latest_toucher(&self) -> Option<usize> {
        self.ball_toucher.or(self.last_ball_toucher)
    }
}

impl ContactListener for TouchState {
    fn begin_contact(&mut self, contact: &ContactBegin) {
        let (Some(a), Some(b)) = (contact.a, contact.b) else {
            tracing::trace!(?contact, "ignoring contact with an untagged body");
            return;
        };
        match (a.kind, b.kind) {
            (BodyKind::Ball, BodyKind::Player { team, agent }) => {
                self.record_touch(team, agent, a.state.position);
            }
            (BodyKind::Player { team, agent }, BodyKind::Ball) => {
                self.record_touch(team, agent, b.state.position);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyState, TaggedBody};

    fn ball_at(x: f64, y: f64) -> TaggedBody {
        TaggedBody {
            kind: BodyKind::Ball,
            state: BodyState {
                position: Vec2::new(x, y),
                velocity: Vec2::ZERO,
            },
        }
    }

    fn player(agent: usize) -> TaggedBody {
        TaggedBody {
            kind: BodyKind::player(agent),
            state: BodyState::default(),
        }
    }

    fn wall() -> TaggedBody {
        TaggedBody {
            kind: BodyKind::Wall,
            state: BodyState::default(),
        }
    }

    #[test]
    fn ball_player_contact_records_touch() {
        let mut touch = TouchState::new();
        touch.begin_contact(&ContactBegin {
            a: Some(ball_at(4.0, 5.0)),
            b: Some(player(3)),
        });
        assert_eq!(touch.ball_toucher, Some(3));
        assert_eq!(touch.ball_touched_by_team, [false, true]);
        assert_eq!(touch.ball_touch_coordinate, Some(Vec2::new(4.0, 5.0)));
    }

    #[test]
    fn contact_order_within_pair_does_not_matter() {
        let mut touch = TouchState::new();
        touch.begin_contact(&ContactBegin {
            a: Some(player(1)),
            b: Some(ball_at(1.0, 2.0)),
        });
        assert_eq!(touch.ball_toucher, Some(1));
        assert_eq!(touch.ball_touch_coordinate, Some(Vec2::new(1.0, 2.0)));
    }

    #[test]
    fn last_contact_in_tick_wins() {
        let mut touch = TouchState::new();
        touch.begin_contact(&ContactBegin {
            a: Some(ball_at(1.0, 1.0)),
            b: Some(player(0)),
        });
        touch.begin_contact(&ContactBegin {
            a: Some(ball_at(2.0, 2.0)),
            b: Some(player(2)),
        });
        assert_eq!(touch.ball_toucher, Some(2));
        assert_eq!(touch.ball_touched_by_team, [true, true]);
        assert_eq!(touch.ball_touch_coordinate, Some(Vec2::new(2.0, 2.0)));
    }

    #[test]
    fn untagged_or_irrelevant_contacts_are_ignored() {
        let mut touch = TouchState::new();
        touch.begin_contact(&ContactBegin {
            a: None,
            b: Some(player(0)),
        });
        touch.begin_contact(&ContactBegin {
            a: Some(ball_at(0.0, 0.0)),
            b: None,
        });
        touch.begin_contact(&ContactBegin {
            a: Some(ball_at(0.0, 0.0)),
            b: Some(wall()),
        });
        touch.begin_contact(&ContactBegin {
            a: Some(player(0)),
            b: Some(player(2)),
        });
        assert_eq!(touch, TouchState::new());
    }

    #[test]
    fn begin_step_commits_previous_touch() {
        let mut touch = TouchState::new();
        touch.record_touch(0, 1, Vec2::new(3.0, 3.0));
        touch.end_step();

        touch.begin_step();
        assert_eq!(touch.ball_toucher, None);
        assert_eq!(touch.ball_touch_coordinate, None);
        assert_eq!(touch.last_ball_toucher, Some(1));
        assert_eq!(touch.last_ball_touch_coordinate, Some(Vec2::new(3.0, 3.0)));
        assert_eq!(touch.ball_touched_by_team, [false, false]);
    }

    #[test]
    fn last_toucher_persists_through_quiet_ticks() {
        let mut touch = TouchState::new();
        touch.record_touch(1, 2, Vec2::new(1.0, 1.0));
        touch.end_step();
        for _ in 0..5 {
            touch.begin_step();
            touch.end_step();
        }
        assert_eq!(touch.last_ball_toucher, Some(2));
        assert_eq!(touch.latest_toucher(), Some(2));
        assert_eq!(
            touch.ball_toucher_history.iter().copied().collect::<Vec<_>>(),
            vec![None, None, None]
        );
    }

    #[test]
    fn latest_toucher_prefers_current_tick() {
        let mut touch = TouchState::new();
        touch.last_ball_toucher = Some(0);
        touch.ball_toucher = Some(3);
        assert_eq!(touch.latest_toucher(), Some(3));
    }

    #[test]
    fn history_never_exceeds_three() {
        let mut touch = TouchState::new();
        for i in 0..10 {
            touch.begin_step();
            if i % 2 == 0 {
                touch.record_touch(0, 0, Vec2::ZERO);
            }
            touch.end_step();
            assert!(touch.ball_toucher_history.len() <= 3);
        }
    }

    #[test]
    fn reset_forgets_everything() {
        let mut touch = TouchState::new();
        touch.record_touch(0, 1, Vec2::new(1.0, 1.0));
        touch.end_step();
        touch.begin_step();
        touch.reset();
        assert_eq!(touch, TouchState::new());
    }
}
