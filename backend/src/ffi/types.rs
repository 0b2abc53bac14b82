//! Conversions between Python values and simulator types

use pyo3::exceptions::{PyIndexError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::models::event::{Action, ContextId};
use crate::scheduler::SchedulerKind;
use crate::{SimulatorConfig, SimulatorError};
use tracing::warn;

/// Build a `SimulatorConfig` from a Python dict
///
/// Missing keys fall back to their defaults.
pub fn parse_simulator_config(dict: &Bound<'_, PyDict>) -> PyResult<SimulatorConfig> {
    let mut config = SimulatorConfig::default();

    if let Some(value) = dict.get_item("scheduler")? {
        let name: String = value.extract()?;
        config.scheduler = serde_json::from_value::<SchedulerKind>(serde_json::Value::String(name))
            .map_err(|e| PyValueError::new_err(format!("invalid scheduler: {}", e)))?;
    }
    if let Some(value) = dict.get_item("system_id")? {
        config.system_id = value.extract()?;
    }
    if let Some(value) = dict.get_item("main_context")? {
        config.main_context = ContextId::new(value.extract()?);
    }

    config.validate().map_err(sim_error_to_py)?;
    Ok(config)
}

/// Map simulator errors onto the closest Python exception
pub fn sim_error_to_py(err: SimulatorError) -> PyErr {
    match err {
        SimulatorError::NotFound(_) => PyKeyError::new_err(err.to_string()),
        SimulatorError::EmptyQueue => PyIndexError::new_err(err.to_string()),
        SimulatorError::CausalityViolation { .. }
        | SimulatorError::ReservedContext(_)
        | SimulatorError::TimeOverflow { .. }
        | SimulatorError::InvalidConfig(_) => PyValueError::new_err(err.to_string()),
        SimulatorError::InvalidState { .. } | SimulatorError::SerializationError(_) => {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

/// Wrap a Python callable as an event action
///
/// Exceptions raised by the callable are logged and swallowed; one failing
/// callback must not abort the driver loop.
pub fn callback_action(callback: PyObject) -> Action {
    Box::new(move |_sim| {
        Python::with_gil(|py| {
            if let Err(e) = callback.call0(py) {
                warn!(error = %e, "python event callback raised");
            }
        })
    })
}
