//! Simulator configuration

use crate::error::{SimResult, SimulatorError};
use crate::models::event::ContextId;
use crate::scheduler::SchedulerKind;
use serde::{Deserialize, Serialize};

/// Construction-time settings of a [`Simulator`](crate::Simulator)
///
/// Every field has a default, so `{}` is a valid JSON config.
///
/// # Example
/// ```
/// use cosim_simulator_core_rs::{SchedulerKind, SimulatorConfig};
///
/// let config = SimulatorConfig::from_json(r#"{ "scheduler": "heap", "system_id": 3 }"#).unwrap();
/// assert_eq!(config.scheduler, SchedulerKind::Heap);
/// assert_eq!(config.system_id, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Ordering index backend of the event queue
    pub scheduler: SchedulerKind,

    /// Identifier reported by `system_id()`; 0 for a single process
    pub system_id: u32,

    /// Context whose `schedule_with_context` calls bypass the inbox
    pub main_context: ContextId,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            system_id: 0,
            main_context: ContextId::MAIN,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.main_context == ContextId::DESTROY {
            return Err(SimulatorError::InvalidConfig(format!(
                "main_context {} is reserved for destroy-phase events",
                self.main_context.raw()
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SimulatorConfig = serde_json::from_str(json)
            .map_err(|e| SimulatorError::InvalidConfig(format!("config parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(SimulatorConfig::from_json("{}").unwrap(), SimulatorConfig::default());
    }

    #[test]
    fn test_reserved_main_context_rejected() {
        let config = SimulatorConfig {
            main_context: ContextId::DESTROY,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimulatorError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SimulatorConfig::from_json(r#"{ "schedular": "map" }"#).unwrap_err();
        assert!(err.to_string().contains("config parse failed"));
    }
}
