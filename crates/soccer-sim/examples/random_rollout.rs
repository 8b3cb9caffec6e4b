//! Headless rollout with a seeded uniform-random policy.
//!
//! Usage: `cargo run --example random_rollout [config.json] [episodes]`
//!
//! Set `RUST_LOG=soccer_sim=debug` to see goals and truncations.

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use soccer_sim::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EnvConfig::from_path(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => EnvConfig::default(),
    };
    let episodes: u32 = match args.next() {
        Some(n) => n.parse().context("episodes must be a positive integer")?,
        None => 3,
    };

    let mut env = SoccerEnv::new(config)?;
    let mut policy = Pcg64::seed_from_u64(env.config().seed);

    for _ in 0..episodes {
        let (_, info) = env.reset(None);
        let mut returns = [0.0f64; NUM_AGENTS];
        let mut goals = 0u32;
        loop {
            let actions: [Action; NUM_AGENTS] =
                std::array::from_fn(|_| Action::ALL[policy.gen_range(0..Action::ALL.len())]);
            let result = env.step(actions);
            for (total, r) in returns.iter_mut().zip(result.agent_rewards()) {
                *total += r;
            }
            if result.terminated {
                goals += 1;
            }
            if result.truncated {
                break;
            }
        }
        tracing::info!(
            episode = info.episode,
            seed = info.seed,
            steps = env.step_count(),
            goals,
            score = ?env.score(),
            team0_return = returns[0],
            team1_return = returns[2],
            hash = %env.state_hash(),
            "episode finished"
        );
    }

    Ok(())
}
