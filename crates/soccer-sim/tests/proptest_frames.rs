//! Property tests for frames, histories, actions and observations.

use proptest::prelude::*;
use soccer_sim::consts::{GAME_HEIGHT, GAME_WIDTH, NUM_ACTIONS};
use soccer_sim::frame::{global_position, global_velocity, local_position, local_velocity};
use soccer_sim::prelude::*;

/// Finite coordinates well beyond the field on every side.
fn coord() -> impl Strategy<Value = f64> {
    (-100_000i32..100_000i32).prop_map(|v| v as f64 * 0.001)
}

fn agent() -> impl Strategy<Value = usize> {
    0..NUM_AGENTS
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn position_transform_is_an_involution(x in coord(), y in coord(), agent in agent()) {
        let p = Vec2::new(x, y);
        let back = global_position(local_position(p, agent, false), agent);
        prop_assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9, "{p:?} -> {back:?}");
    }

    #[test]
    fn velocity_transform_is_an_involution(x in coord(), y in coord(), agent in agent()) {
        let v = Vec2::new(x, y);
        prop_assert_eq!(global_velocity(local_velocity(v, agent, false), agent), v);
    }

    #[test]
    fn in_field_positions_normalize_into_unit_square(
        fx in 0.0f64..=1.0,
        fy in 0.0f64..=1.0,
        agent in agent(),
    ) {
        let p = Vec2::new(fx * GAME_WIDTH, fy * GAME_HEIGHT);
        let local = local_position(p, agent, true);
        prop_assert!((-1e-12..=1.0 + 1e-12).contains(&local.x), "{local:?}");
        prop_assert!((-1e-12..=1.0 + 1e-12).contains(&local.y), "{local:?}");
    }

    #[test]
    fn history_keeps_the_last_three(values in prop::collection::vec(any::<u32>(), 0..40)) {
        let mut history: History<u32, 3> = History::new();
        for (i, v) in values.iter().enumerate() {
            history.push(*v);
            prop_assert!(history.len() <= 3);
            prop_assert_eq!(history.len(), (i + 1).min(3));
            prop_assert_eq!(history.newest(), Some(v));
        }
        let tail: Vec<u32> = values.iter().rev().take(3).rev().copied().collect();
        prop_assert_eq!(history.iter().copied().collect::<Vec<_>>(), tail);
    }

    #[test]
    fn action_codes_convert_only_in_range(code in -20i64..30) {
        let parsed = Action::try_from(code);
        prop_assert_eq!(parsed.is_ok(), (0..NUM_ACTIONS as i64).contains(&code));
        if let Ok(action) = parsed {
            prop_assert_eq!(action.code() as i64, code);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_episodes_keep_invariants(
        seed in any::<u64>(),
        codes in prop::collection::vec(prop::array::uniform4(0i64..9), 1..60),
    ) {
        let mut env = SoccerEnv::new(EnvConfig::default()).unwrap();
        env.reset(Some(seed));
        for tick_codes in codes {
            let actions = actions_from_codes(tick_codes).unwrap();
            let result = env.step(actions);

            prop_assert_eq!(result.observations.iter().map(|r| r.len()).sum::<usize>(), 80);
            prop_assert!(result.observations.iter().flatten().all(|v| v.is_finite()));

            let rewards = result.agent_rewards();
            prop_assert_eq!(rewards[0], rewards[1]);
            prop_assert_eq!(rewards[2], rewards[3]);

            prop_assert!(env.position_history().len() <= 3);
            prop_assert!(env.action_history().len() <= 3);
            prop_assert!(env.touch_state().ball_toucher_history.len() <= 3);
            prop_assert_eq!(result.terminated, result.info.goal_scored.is_some());
        }
    }
}
