//! PyO3 Python bindings for the soccer simulation.
//!
//! Exposes [`SoccerEnv`](soccer_sim::env::SoccerEnv) with the gym-style
//! `reset`/`step` tuple interface. Reward specifications and info dicts cross
//! the FFI boundary as Python dicts via a JSON round-trip.

#![deny(unsafe_code)]

use pyo3::prelude::*;

mod engine;

/// The `soccer._soccer` native module.
#[pymodule]
fn _soccer(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<engine::PySoccerEnv>()?;
    m.add("NUM_AGENTS", soccer_sim::consts::NUM_AGENTS)?;
    m.add("OBSERVATION_SIZE", soccer_sim::consts::OBSERVATION_SIZE)?;
    m.add("NUM_ACTIONS", soccer_sim::consts::NUM_ACTIONS)?;
    m.add("MAXIMUM_VELOCITY", soccer_sim::consts::MAXIMUM_VELOCITY)?;
    Ok(())
}
