//! Co-simulation stepping CLI
//!
//! Plays the role of an external orchestrator: loads a JSON scenario,
//! injects its events (cross-context ones from a separate bridge thread),
//! then advances the simulator checkpoint by checkpoint with `run_until`,
//! printing one JSON line per step.
//!
//! # Example
//!
//! ```bash
//! cosim-step --scenario scenario.json
//! cosim-step --scenario scenario.json --scheduler heap --follow-next
//! ```
//!
//! Scenario format:
//!
//! ```json
//! {
//!   "config": { "scheduler": "map" },
//!   "events": [
//!     { "at": 5, "label": "meter-read" },
//!     { "at": 5, "context": 2, "label": "grid-update" }
//!   ],
//!   "checkpoints": [10, 20]
//! }
//! ```

use clap::{Parser, ValueEnum};
use cosim_simulator_core_rs::{
    ContextId, SchedulerKind, SimTime, Simulator, SimulatorConfig, SimulatorSnapshot,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Step a co-simulation scenario through successive checkpoints
#[derive(Parser, Debug)]
#[command(name = "cosim-step")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON scenario
    #[arg(short, long)]
    scenario: PathBuf,

    /// Override the scenario's scheduler backend
    #[arg(long, value_enum)]
    scheduler: Option<SchedulerArg>,

    /// Ignore the checkpoint list and step to each next pending timestamp
    #[arg(long)]
    follow_next: bool,

    /// Register a destroy action that reports the final event count
    #[arg(long)]
    report_on_destroy: bool,
}

/// Scheduler backend as named on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchedulerArg {
    /// Ordered tree
    Map,
    /// Binary heap with lazy deletion
    Heap,
}

impl From<SchedulerArg> for SchedulerKind {
    fn from(arg: SchedulerArg) -> Self {
        match arg {
            SchedulerArg::Map => SchedulerKind::Map,
            SchedulerArg::Heap => SchedulerKind::Heap,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Scenario {
    #[serde(default)]
    config: SimulatorConfig,
    #[serde(default)]
    events: Vec<ScenarioEvent>,
    #[serde(default)]
    checkpoints: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioEvent {
    at: u64,
    #[serde(default)]
    context: Option<u32>,
    label: String,
}

/// One line of output per checkpoint
#[derive(Debug, Serialize)]
struct StepReport {
    checkpoint: SimTime,
    executed: Vec<String>,
    snapshot: SimulatorSnapshot,
}

type Executed = Arc<Mutex<Vec<String>>>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,cosim_simulator_core_rs=info,cosim_step=info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let raw = std::fs::read_to_string(&args.scenario)
        .map_err(|e| format!("cannot read {}: {}", args.scenario.display(), e))?;
    let mut scenario: Scenario =
        serde_json::from_str(&raw).map_err(|e| format!("invalid scenario: {}", e))?;

    if let Some(scheduler) = args.scheduler {
        scenario.config.scheduler = scheduler.into();
    }

    let mut sim = Simulator::new(scenario.config.clone()).map_err(|e| e.to_string())?;
    info!(instance_id = %sim.instance_id(), events = scenario.events.len(), "scenario loaded");

    let executed: Executed = Arc::default();
    load_events(&mut sim, &scenario, &executed)?;

    if args.report_on_destroy {
        sim.schedule_destroy(|sim| {
            info!(events = sim.event_count(), now = %sim.now(), "simulation torn down");
        })
        .map_err(|e| e.to_string())?;
    }

    if args.follow_next || scenario.checkpoints.is_empty() {
        while !sim.is_finished() {
            let checkpoint = sim.next();
            step(&mut sim, checkpoint, &executed)?;
        }
    } else {
        let mut checkpoints = scenario.checkpoints.clone();
        checkpoints.sort_unstable();
        for checkpoint in checkpoints {
            step(&mut sim, SimTime::new(checkpoint), &executed)?;
        }
    }

    sim.destroy().map_err(|e| e.to_string())
}

/// Main-context events are scheduled directly; the rest are injected from a
/// bridge thread through the simulator's context sender.
fn load_events(sim: &mut Simulator, scenario: &Scenario, executed: &Executed) -> Result<(), String> {
    let main = scenario.config.main_context;
    let (local, remote): (Vec<_>, Vec<_>) = scenario
        .events
        .iter()
        .cloned()
        .partition(|e| e.context.map_or(true, |c| ContextId::new(c) == main));

    for event in local {
        let executed = executed.clone();
        sim.schedule_at(SimTime::new(event.at), move |sim| record(sim, &executed, event.label))
            .map_err(|e| e.to_string())?;
    }

    let sender = sim.context_sender();
    let executed = executed.clone();
    let bridge = thread::spawn(move || -> Result<(), String> {
        for event in remote {
            let context = ContextId::new(event.context.unwrap_or_default());
            let executed = executed.clone();
            sender
                .schedule_at(context, SimTime::new(event.at), move |sim| {
                    record(sim, &executed, event.label)
                })
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    });
    bridge
        .join()
        .map_err(|_| "bridge thread panicked".to_string())?
}

fn record(sim: &mut Simulator, executed: &Executed, label: String) {
    info!(label = %label, now = %sim.now(), context = %sim.context(), "event");
    if let Ok(mut log) = executed.lock() {
        log.push(label);
    }
}

fn step(sim: &mut Simulator, checkpoint: SimTime, executed: &Executed) -> Result<(), String> {
    sim.run_until(checkpoint).map_err(|e| e.to_string())?;

    let executed = match executed.lock() {
        Ok(mut log) => std::mem::take(&mut *log),
        Err(_) => return Err("executed-event log poisoned".to_string()),
    };
    let report = StepReport {
        checkpoint,
        executed,
        snapshot: sim.snapshot().map_err(|e| e.to_string())?,
    };
    let line = serde_json::to_string(&report).map_err(|e| e.to_string())?;
    println!("{}", line);
    Ok(())
}
