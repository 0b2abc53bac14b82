//! Simulator Run Tests
//!
//! Unbounded `run()`: timing, ordering, cancellation, stop requests and the
//! causality check.

use cosim_simulator_core_rs::{
    ContextId, RunState, SchedulerKind, SimTime, Simulator, SimulatorConfig, SimulatorError,
};
use std::sync::{Arc, Mutex};

// ============================================================================
// Test Helpers
// ============================================================================

/// Shared log of (label, time) pairs written by event actions
#[derive(Clone, Default)]
struct Trace(Arc<Mutex<Vec<(&'static str, u64)>>>);

impl Trace {
    fn record(&self, label: &'static str) -> impl FnOnce(&mut Simulator) + Send + 'static {
        let log = self.0.clone();
        move |sim: &mut Simulator| log.lock().unwrap().push((label, sim.now().ticks()))
    }

    fn entries(&self) -> Vec<(&'static str, u64)> {
        self.0.lock().unwrap().clone()
    }

    fn labels(&self) -> Vec<&'static str> {
        self.entries().into_iter().map(|(l, _)| l).collect()
    }
}

fn simulator_with(kind: SchedulerKind) -> Simulator {
    Simulator::new(SimulatorConfig {
        scheduler: kind,
        ..Default::default()
    })
    .expect("default config is valid")
}

// ============================================================================
// Timing and ordering
// ============================================================================

#[test]
fn test_events_fire_at_now_plus_delay() {
    for kind in [SchedulerKind::Map, SchedulerKind::Heap] {
        let mut sim = simulator_with(kind);
        let trace = Trace::default();
        sim.schedule(15, trace.record("c")).unwrap();
        sim.schedule(5, trace.record("a")).unwrap();
        sim.schedule(10, trace.record("b")).unwrap();

        sim.run().unwrap();

        assert_eq!(trace.entries(), vec![("a", 5), ("b", 10), ("c", 15)]);
        assert_eq!(sim.now(), SimTime::new(15));
        assert_eq!(sim.event_count(), 3);
        assert!(sim.is_finished());
        assert_eq!(sim.state(), RunState::Stopped);
    }
}

#[test]
fn test_delays_are_relative_to_scheduling_time() {
    let mut sim = Simulator::default();
    let trace = Trace::default();
    let inner = trace.clone();
    sim.schedule(10, move |sim| {
        sim.schedule(5, inner.record("child")).unwrap();
    })
    .unwrap();

    sim.run().unwrap();
    assert_eq!(trace.entries(), vec![("child", 15)]);
}

#[test]
fn test_same_time_events_run_in_insertion_order() {
    let mut sim = Simulator::default();
    let trace = Trace::default();
    sim.schedule(3, trace.record("first")).unwrap();
    sim.schedule(3, trace.record("second")).unwrap();
    sim.schedule_at(SimTime::new(3), trace.record("third")).unwrap();

    sim.run().unwrap();
    assert_eq!(trace.labels(), vec!["first", "second", "third"]);
}

#[test]
fn test_action_observes_advanced_clock_and_uid() {
    let mut sim = Simulator::default();
    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    let id = sim
        .schedule(8, move |sim| {
            *slot.lock().unwrap() = Some((sim.now(), sim.current_uid(), sim.event_count()));
        })
        .unwrap();

    sim.run().unwrap();
    assert_eq!(*seen.lock().unwrap(), Some((SimTime::new(8), id.uid(), 1)));
}

// ============================================================================
// Causality
// ============================================================================

#[test]
fn test_scheduling_in_the_past_is_causality_violation() {
    let mut sim = Simulator::default();
    sim.schedule(10, |_| {}).unwrap();
    sim.run().unwrap();
    assert_eq!(sim.now(), SimTime::new(10));

    let err = sim.schedule_at(SimTime::new(3), |_| {}).unwrap_err();
    assert_eq!(
        err,
        SimulatorError::CausalityViolation {
            requested: SimTime::new(3),
            current: SimTime::new(10),
        }
    );
    // Nothing was queued by the failed call.
    assert_eq!(sim.pending_count(), 0);
    assert!(sim.is_finished());
}

#[test]
fn test_scheduling_at_now_is_allowed() {
    let mut sim = Simulator::default();
    sim.schedule(10, |_| {}).unwrap();
    sim.run().unwrap();
    sim.schedule_at(SimTime::new(10), |_| {}).unwrap();
    sim.run().unwrap();
    assert_eq!(sim.event_count(), 2);
    assert_eq!(sim.now(), SimTime::new(10));
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancelled_event_never_executes() {
    let mut sim = Simulator::default();
    let trace = Trace::default();
    sim.schedule(1, trace.record("kept")).unwrap();
    let doomed = sim.schedule(2, trace.record("cancelled")).unwrap();

    assert!(!sim.is_expired(&doomed));
    sim.cancel(&doomed).unwrap();
    assert!(sim.is_expired(&doomed));

    sim.run().unwrap();
    assert_eq!(trace.labels(), vec!["kept"]);
    assert_eq!(sim.now(), SimTime::new(1));
}

#[test]
fn test_cancel_after_execution_is_not_found() {
    let mut sim = Simulator::default();
    let id = sim.schedule(1, |_| {}).unwrap();
    sim.run().unwrap();

    assert!(sim.is_expired(&id));
    assert_eq!(sim.cancel(&id), Err(SimulatorError::NotFound(id)));
    assert_eq!(sim.remove(&id), Err(SimulatorError::NotFound(id)));
    assert_eq!(sim.event_count(), 1);
}

#[test]
fn test_event_can_cancel_a_later_event() {
    let mut sim = Simulator::default();
    let trace = Trace::default();
    let victim = sim.schedule(20, trace.record("victim")).unwrap();
    sim.schedule(10, move |sim| sim.cancel(&victim).unwrap())
        .unwrap();

    sim.run().unwrap();
    assert!(trace.labels().is_empty());
    assert_eq!(sim.now(), SimTime::new(10));
}

#[test]
fn test_delay_left() {
    let mut sim = Simulator::default();
    let id = sim.schedule(30, |_| {}).unwrap();
    sim.schedule(12, |_| {}).unwrap();
    assert_eq!(sim.delay_left(&id), 30);

    sim.run_until(SimTime::new(12)).unwrap();
    assert_eq!(sim.delay_left(&id), 18);

    sim.run().unwrap();
    assert_eq!(sim.delay_left(&id), 0);
}

// ============================================================================
// Stop
// ============================================================================

#[test]
fn test_stop_after_delay() {
    let mut sim = Simulator::default();
    let trace = Trace::default();
    sim.schedule(5, trace.record("before")).unwrap();
    sim.stop_after(7).unwrap();
    sim.schedule(9, trace.record("after")).unwrap();

    sim.run().unwrap();
    assert_eq!(trace.labels(), vec!["before"]);
    assert_eq!(sim.now(), SimTime::new(7));
    assert!(!sim.is_finished());
    assert_eq!(sim.next(), SimTime::new(9));
}

#[test]
fn test_stop_before_run_is_cleared_by_run() {
    let mut sim = Simulator::default();
    let trace = Trace::default();
    sim.schedule(1, trace.record("x")).unwrap();
    sim.stop();
    sim.run().unwrap();
    assert_eq!(trace.labels(), vec!["x"]);
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_next_and_next_timestamp() {
    let mut sim = Simulator::default();
    assert_eq!(sim.next(), SimTime::MAX);
    assert_eq!(sim.next_timestamp(), u64::MAX);
    assert_eq!(sim.peek_next(), Err(SimulatorError::EmptyQueue));

    sim.schedule(42, |_| {}).unwrap();
    sim.schedule(17, |_| {}).unwrap();
    assert_eq!(sim.next(), SimTime::new(17));
    assert_eq!(sim.next_timestamp(), 17);
    assert_eq!(sim.peek_next(), Ok(SimTime::new(17)));
}

#[test]
fn test_system_id_and_max_time() {
    let sim = Simulator::new(SimulatorConfig {
        system_id: 4,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(sim.system_id(), 4);
    assert_eq!(sim.max_simulation_time(), SimTime::MAX);
    assert_eq!(sim.context(), ContextId::MAIN);
}

#[test]
fn test_invalid_config_rejected() {
    let result = Simulator::new(SimulatorConfig {
        main_context: ContextId::DESTROY,
        ..Default::default()
    });
    assert!(matches!(result, Err(SimulatorError::InvalidConfig(_))));
}
