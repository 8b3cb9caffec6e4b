//! Python-facing environment wrapper.
//!
//! [`PySoccerEnv`] is a `#[pyclass]` around the Rust [`SoccerEnv`]. Rust
//! values that Python sees as dicts (`info`, snapshots) go through
//! `serde_json::to_string` -> `json.loads`; the reward specification dict
//! goes the other way through `json.dumps` -> `serde_json`.

use std::sync::{Arc, Mutex};

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use serde::Serialize;
use soccer_sim::action::actions_from_codes;
use soccer_sim::consts::NUM_AGENTS;
use soccer_sim::env::{EnvConfig, SoccerEnv};
use soccer_sim::observation::{observation_bounds as row_bounds, Observations};
use soccer_sim::replay::{replay, EpisodeLog};
use soccer_sim::reward::RewardSpec;
use soccer_sim::SoccerError;

/// Python-side observation: one list of 20 floats per agent.
type PyObservations = Vec<Vec<f32>>;

fn to_py_err(err: SoccerError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn observations_to_lists(obs: &Observations) -> PyObservations {
    obs.iter().map(|row| row.to_vec()).collect()
}

/// Converts any serializable value to a Python object via JSON round-trip.
fn to_pyobject<T: Serialize>(py: Python<'_>, value: &T, what: &str) -> PyResult<PyObject> {
    let json_str = serde_json::to_string(value).map_err(|e| {
        PyRuntimeError::new_err(format!("failed to serialize {what} to JSON: {e}"))
    })?;
    let json_mod = py.import("json")?;
    let obj = json_mod.call_method1("loads", (json_str,))?;
    Ok(obj.unbind())
}

/// Error raised by the Python shaping callable during the last step.
type ShapingError = Arc<Mutex<Option<PyErr>>>;

/// Wrap a Python callable `(distance, quadratic_threshold, linear_threshold)
/// -> float` as a Rust shaping closure.
///
/// The closure cannot raise, so a Python exception is parked in `error` and
/// the term contributes 0 for that call; [`PySoccerEnv::step`] re-raises it.
fn python_shaping(
    callable: PyObject,
    error: ShapingError,
) -> impl Fn(f64, f64, f64) -> f64 + Send + Sync + 'static {
    move |distance, quadratic, linear| {
        Python::with_gil(|py| {
            let result = callable
                .bind(py)
                .call1((distance, quadratic, linear))
                .and_then(|value| value.extract::<f64>());
            match result {
                Ok(value) => value,
                Err(err) => {
                    if let Ok(mut slot) = error.lock() {
                        if slot.is_none() {
                            *slot = Some(err);
                        }
                    }
                    0.0
                }
            }
        })
    }
}

/// Parse a Python reward specification dict via `json.dumps`.
fn reward_spec_from_dict(dict: &Bound<'_, PyDict>, py: Python<'_>) -> PyResult<RewardSpec> {
    let json_mod = py.import("json")?;
    let json_str: String = json_mod.call_method1("dumps", (dict,))?.extract()?;
    serde_json::from_str(&json_str).map_err(|e| {
        PyValueError::new_err(format!("invalid reward specification: {e}"))
    })
}

/// The two-versus-two soccer environment exposed to Python.
///
/// Usage from Python:
/// ```python
/// from soccer._soccer import SoccerEnv
/// env = SoccerEnv({"goal": 100.0, "base_negative": -0.15})
/// obs, info = env.reset(seed=3)
/// obs, reward, terminated, truncated, info = env.step([0, 0, 8, 8])
/// print(env.score, info["other_reward"])
/// ```
#[pyclass(name = "SoccerEnv", unsendable)]
pub struct PySoccerEnv {
    env: SoccerEnv,
    shaping_error: ShapingError,
}

#[pymethods]
impl PySoccerEnv {
    /// Create an environment.
    ///
    /// Args:
    ///     reward_specification: Dict of reward term weights. Terms that are
    ///         missing are not computed. Defaults to the stock training setup.
    ///     seed: Seed of the episode seed stream (default 1).
    ///     max_steps: Ticks before truncation (default 600).
    ///     pass_shaping: Callable ``(distance, quadratic_threshold,
    ///         linear_threshold) -> float``. Required when
    ///         ``distance_based_passing`` is weighted.
    #[new]
    #[pyo3(signature = (reward_specification=None, seed=1, max_steps=600, pass_shaping=None))]
    fn new(
        reward_specification: Option<&Bound<'_, PyDict>>,
        seed: u64,
        max_steps: u32,
        pass_shaping: Option<PyObject>,
        py: Python<'_>,
    ) -> PyResult<Self> {
        let rewards = match reward_specification {
            Some(dict) => reward_spec_from_dict(dict, py)?,
            None => RewardSpec::default(),
        };
        let config = EnvConfig {
            seed,
            max_steps,
            rewards,
            ..Default::default()
        };
        let shaping_error = ShapingError::default();
        let env = match pass_shaping {
            Some(callable) => {
                if !callable.bind(py).is_callable() {
                    return Err(PyValueError::new_err("pass_shaping must be callable"));
                }
                let shaping = python_shaping(callable, Arc::clone(&shaping_error));
                SoccerEnv::with_pass_shaping(config, shaping)
            }
            None => SoccerEnv::new(config),
        }
        .map_err(to_py_err)?;
        tracing::debug!(seed, max_steps, "python environment created");
        Ok(Self { env, shaping_error })
    }

    /// Advertised ``(low, high)`` bounds of one observation row: ``[0, 1]``
    /// for positions and ``[-MAXIMUM_VELOCITY, MAXIMUM_VELOCITY]`` for
    /// velocities.
    #[staticmethod]
    fn observation_bounds() -> (Vec<f32>, Vec<f32>) {
        let (low, high) = row_bounds();
        (low.to_vec(), high.to_vec())
    }

    /// Start a new episode.
    ///
    /// Returns ``(observations, info)``. Beyond the usual empty info dict,
    /// ``info`` carries ``episode`` (the episode counter) and ``seed`` (the
    /// seed that produced this episode's spawns, for reproducing it with
    /// ``reset(seed=...)``).
    #[pyo3(signature = (seed=None))]
    fn reset(&mut self, py: Python<'_>, seed: Option<u64>) -> PyResult<(PyObservations, PyObject)> {
        let (obs, info) = self.env.reset(seed);
        Ok((observations_to_lists(&obs), to_pyobject(py, &info, "ResetInfo")?))
    }

    /// Advance one tick with one action code in ``0..=8`` per agent.
    ///
    /// Returns ``(observations, reward, terminated, truncated, info)``;
    /// ``reward`` is agent 0's and ``info["other_reward"]`` holds the rest.
    fn step(
        &mut self,
        py: Python<'_>,
        actions: Vec<i64>,
    ) -> PyResult<(PyObservations, f64, bool, bool, PyObject)> {
        let codes: [i64; NUM_AGENTS] = actions.try_into().map_err(|v: Vec<i64>| {
            PyValueError::new_err(format!(
                "expected {NUM_AGENTS} actions, got {}",
                v.len()
            ))
        })?;
        let actions = actions_from_codes(codes).map_err(to_py_err)?;
        let result = self.env.step(actions);
        let shaping_error = self
            .shaping_error
            .lock()
            .map_err(|_| PyRuntimeError::new_err("pass_shaping error slot poisoned"))?
            .take();
        if let Some(err) = shaping_error {
            return Err(err);
        }
        Ok((
            observations_to_lists(&result.observations),
            result.reward,
            result.terminated,
            result.truncated,
            to_pyobject(py, &result.info, "StepInfo")?,
        ))
    }

    /// Goals per team since the last reset.
    #[getter]
    fn score(&self) -> Vec<u32> {
        self.env.score().to_vec()
    }

    #[getter]
    fn step_count(&self) -> u32 {
        self.env.step_count()
    }

    #[getter]
    fn episode_count(&self) -> u64 {
        self.env.episode_count()
    }

    /// Current match state as a dict, for renderers.
    fn snapshot(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_pyobject(py, &self.env.snapshot(), "MatchSnapshot")
    }

    /// BLAKE3 hex digest of the current match state.
    fn state_hash(&self) -> String {
        self.env.state_hash()
    }

    /// Replay a recorded episode log (JSON string) and return the result as
    /// JSON.
    fn replay_log(&mut self, episode_log_json: &str) -> PyResult<String> {
        let log: EpisodeLog = serde_json::from_str(episode_log_json).map_err(|e| {
            PyValueError::new_err(format!("invalid episode log JSON: {e}"))
        })?;
        let result = replay(&mut self.env, &log).map_err(to_py_err)?;
        serde_json::to_string(&result).map_err(|e| {
            PyRuntimeError::new_err(format!("failed to serialize ReplayResult to JSON: {e}"))
        })
    }
}
