//! PyO3 wrapper for Simulator
//!
//! # Example (from Python)
//!
//! ```python
//! from cosim_simulator_core_rs import Simulator
//!
//! sim = Simulator({"scheduler": "heap"})
//! bridge = sim.sender()
//! bridge.schedule_at(1, 5, lambda: print("injected"))
//!
//! while not sim.is_finished():
//!     sim.run_until(sim.next_ts())
//! ```
//!
//! Python callbacks cannot borrow the simulator while it is running, so
//! follow-up events scheduled from inside a callback go through the
//! `ContextSender` returned by `sender()`.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{callback_action, parse_simulator_config, sim_error_to_py};
use crate::{ContextId, ContextSender, EventId, SimTime, Simulator, SimulatorConfig};

/// Python view of an event handle
#[pyclass(name = "EventId")]
#[derive(Clone)]
pub struct PyEventId {
    inner: EventId,
}

#[pymethods]
impl PyEventId {
    #[getter]
    fn uid(&self) -> u64 {
        self.inner.uid()
    }

    #[getter]
    fn timestamp(&self) -> u64 {
        self.inner.timestamp().ticks()
    }

    #[getter]
    fn context(&self) -> u32 {
        self.inner.context().raw()
    }

    fn __repr__(&self) -> String {
        format!("EventId({})", self.inner)
    }
}

/// Thread-safe injector for cross-context events
#[pyclass(name = "ContextSender")]
#[derive(Clone)]
pub struct PyContextSender {
    inner: ContextSender,
}

#[pymethods]
impl PyContextSender {
    /// Inject `callback` at absolute time `at` in `context`
    fn schedule_at(&self, context: u32, at: u64, callback: PyObject) -> PyResult<()> {
        let action = callback_action(callback);
        self.inner
            .schedule_at(ContextId::new(context), SimTime::new(at), action)
            .map_err(sim_error_to_py)
    }

    /// Inject `callback` `delay` ticks after the simulator's published time
    fn schedule_with_context(&self, context: u32, delay: u64, callback: PyObject) -> PyResult<u64> {
        let action = callback_action(callback);
        self.inner
            .schedule_with_context(ContextId::new(context), delay, action)
            .map(SimTime::ticks)
            .map_err(sim_error_to_py)
    }

    fn pending(&self) -> usize {
        self.inner.pending()
    }
}

/// Python wrapper for the Rust simulator
#[pyclass(name = "Simulator")]
pub struct PySimulator {
    inner: Simulator,
}

#[pymethods]
impl PySimulator {
    /// Create a simulator; `config` keys: scheduler, system_id, main_context
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let config = match config {
            Some(dict) => parse_simulator_config(dict)?,
            None => SimulatorConfig::default(),
        };
        let inner = Simulator::new(config).map_err(sim_error_to_py)?;
        Ok(PySimulator { inner })
    }

    fn sender(&self) -> PyContextSender {
        PyContextSender {
            inner: self.inner.context_sender(),
        }
    }

    fn schedule(&mut self, delay: u64, callback: PyObject) -> PyResult<PyEventId> {
        self.inner
            .schedule(delay, callback_action(callback))
            .map(|inner| PyEventId { inner })
            .map_err(sim_error_to_py)
    }

    fn schedule_at(&mut self, at: u64, callback: PyObject) -> PyResult<PyEventId> {
        self.inner
            .schedule_at(SimTime::new(at), callback_action(callback))
            .map(|inner| PyEventId { inner })
            .map_err(sim_error_to_py)
    }

    fn schedule_with_context(&mut self, context: u32, delay: u64, callback: PyObject) -> PyResult<()> {
        self.inner
            .schedule_with_context(ContextId::new(context), delay, callback_action(callback))
            .map_err(sim_error_to_py)
    }

    fn schedule_destroy(&mut self, callback: PyObject) -> PyResult<PyEventId> {
        self.inner
            .schedule_destroy(callback_action(callback))
            .map(|inner| PyEventId { inner })
            .map_err(sim_error_to_py)
    }

    fn cancel(&mut self, id: &PyEventId) -> PyResult<()> {
        self.inner.cancel(&id.inner).map_err(sim_error_to_py)
    }

    fn is_expired(&self, id: &PyEventId) -> bool {
        self.inner.is_expired(&id.inner)
    }

    fn delay_left(&self, id: &PyEventId) -> u64 {
        self.inner.delay_left(&id.inner)
    }

    fn run(&mut self) -> PyResult<()> {
        self.inner.run().map_err(sim_error_to_py)
    }

    /// Execute every event with timestamp <= `checkpoint`
    fn run_until(&mut self, checkpoint: u64) -> PyResult<()> {
        self.inner
            .run_until(SimTime::new(checkpoint))
            .map_err(sim_error_to_py)
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn now(&self) -> u64 {
        self.inner.now().ticks()
    }

    /// Next pending timestamp; `2**64 - 1` when nothing is pending
    fn next_ts(&self) -> u64 {
        self.inner.next_timestamp()
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    fn event_count(&self) -> u64 {
        self.inner.event_count()
    }

    fn context(&self) -> u32 {
        self.inner.context().raw()
    }

    fn destroy(&mut self) -> PyResult<()> {
        self.inner.destroy().map_err(sim_error_to_py)
    }

    /// Snapshot as a JSON string
    fn snapshot(&self) -> PyResult<String> {
        self.inner
            .snapshot()
            .and_then(|s| s.to_json())
            .map_err(sim_error_to_py)
    }
}
