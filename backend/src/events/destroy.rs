//! Destroy-phase list
//!
//! Actions registered here are not part of the timeline. They run exactly
//! once, in registration order, when the simulator is destroyed.

use crate::error::{SimResult, SimulatorError};
use crate::models::event::{Action, EventId};
use crate::orchestrator::RunState;
use std::collections::VecDeque;

#[derive(Default)]
pub struct DestroyList {
    entries: VecDeque<(u64, Action)>,
    draining: bool,
}

impl DestroyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under `uid`
    ///
    /// Fails with `InvalidState` once draining has begun.
    pub fn push(&mut self, uid: u64, action: Action) -> SimResult<EventId> {
        if self.draining {
            return Err(SimulatorError::InvalidState {
                operation: "schedule_destroy",
                state: RunState::Destroying,
            });
        }
        self.entries.push_back((uid, action));
        Ok(EventId::destroy(uid))
    }

    pub fn contains(&self, id: &EventId) -> bool {
        id.is_destroy() && self.entries.iter().any(|(uid, _)| *uid == id.uid())
    }

    /// Drop a registered action without running it
    pub fn remove(&mut self, id: &EventId) -> SimResult<()> {
        let pos = self
            .entries
            .iter()
            .position(|(uid, _)| id.is_destroy() && *uid == id.uid())
            .ok_or(SimulatorError::NotFound(*id))?;
        self.entries.remove(pos);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Close the list and hand over its actions in registration order
    pub fn begin_drain(&mut self) -> Vec<Action> {
        self.draining = true;
        self.entries.drain(..).map(|(_, action)| action).collect()
    }
}

impl std::fmt::Debug for DestroyList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestroyList")
            .field("len", &self.entries.len())
            .field("draining", &self.draining)
            .finish()
    }
}
