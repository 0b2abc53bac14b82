//! Checkpoint - simulator snapshots for an external orchestrator
//!
//! A co-simulation orchestrator steps this simulator with `run_until` and
//! needs to observe it between steps. [`SimulatorSnapshot`] is that
//! observation: a plain serializable record of the clock, the queue sizes
//! and the next pending timestamp.
//!
//! # Critical Invariants
//!
//! - **Config Matching**: the config hash is stable across processes, so two
//!   snapshots from identically configured simulators carry the same hash

use crate::core::time::SimTime;
use crate::error::{SimResult, SimulatorError};
use crate::models::event::ContextId;
use crate::orchestrator::{RunState, SimulatorConfig};
use crate::scheduler::SchedulerKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Point-in-time view of a simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorSnapshot {
    pub instance_id: Uuid,
    pub system_id: u32,
    pub state: RunState,
    pub now: SimTime,
    pub context: ContextId,
    /// Events executed so far
    pub event_count: u64,
    /// Events in the main queue
    pub queued_events: usize,
    /// Events buffered in the cross-context inbox
    pub inbox_events: usize,
    pub destroy_events: usize,
    /// Earliest pending timestamp (`SimTime::MAX` if none)
    pub next_timestamp: SimTime,
    pub scheduler: SchedulerKind,
    /// SHA256 hash of the simulator config
    pub config_hash: String,
}

impl SimulatorSnapshot {
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self)
            .map_err(|e| SimulatorError::SerializationError(format!("Snapshot serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SimulatorError::SerializationError(format!("Snapshot parse failed: {}", e)))
    }

    /// Check that this snapshot was taken from a simulator built with `config`
    pub fn verify_config(&self, config: &SimulatorConfig) -> SimResult<()> {
        let expected = compute_config_hash(config)?;
        if expected != self.config_hash {
            return Err(SimulatorError::InvalidConfig(format!(
                "Config hash mismatch: snapshot has {}, config hashes to {}",
                self.config_hash, expected
            )));
        }
        Ok(())
    }
}

/// Compute deterministic SHA256 hash of a config
///
/// Hashes the config's `serde_json::Value` form. `Value` objects are
/// key-sorted maps (the workspace does not enable serde_json's
/// `preserve_order`), so the hash is independent of struct field order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> SimResult<String> {
    let canonical = serde_json::to_value(config)
        .map_err(|e| {
            SimulatorError::SerializationError(format!("Config serialization failed: {}", e))
        })?
        .to_string();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
