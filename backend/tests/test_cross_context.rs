//! Cross-Context Injection Tests
//!
//! Events produced on other threads go through the inbox and are drained by
//! the driver. These tests cover ordering, the causality floor and the
//! finished/next queries in the presence of undrained events.

use cosim_simulator_core_rs::{ContextId, SimTime, Simulator, SimulatorConfig, SimulatorError};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

// ============================================================================
// Test Helpers
// ============================================================================

type Log = Arc<Mutex<Vec<(u32, u64)>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn mark(log: &Log) -> impl FnOnce(&mut Simulator) + Send + 'static {
    let log = log.clone();
    move |sim: &mut Simulator| log.lock().unwrap().push((sim.context().raw(), sim.now().ticks()))
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_main_context_bypasses_inbox() {
    let mut sim = Simulator::default();
    let sender = sim.context_sender();
    sim.schedule_with_context(ContextId::MAIN, 3, |_| {}).unwrap();
    assert_eq!(sender.pending(), 0);
    assert_eq!(sim.pending_count(), 1);

    sim.schedule_with_context(ContextId::new(1), 3, |_| {}).unwrap();
    assert_eq!(sender.pending(), 1);
    assert_eq!(sim.pending_count(), 2);
}

#[test]
fn test_configured_main_context() {
    let mut sim = Simulator::new(SimulatorConfig {
        main_context: ContextId::new(8),
        ..Default::default()
    })
    .unwrap();
    let sender = sim.context_sender();

    assert_eq!(sim.context(), ContextId::new(8));
    sim.schedule_with_context(ContextId::new(8), 1, |_| {}).unwrap();
    sim.schedule_with_context(ContextId::MAIN, 1, |_| {}).unwrap();
    assert_eq!(sender.pending(), 1);
}

#[test]
fn test_cross_context_event_runs_in_its_context() {
    let mut sim = Simulator::default();
    let log = new_log();
    sim.schedule_with_context(ContextId::new(5), 4, mark(&log)).unwrap();
    sim.schedule(2, mark(&log)).unwrap();

    sim.run().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![(0, 2), (5, 4)]);
}

// ============================================================================
// Threads
// ============================================================================

#[test]
fn test_injection_from_other_threads() {
    let mut sim = Simulator::default();
    let log = new_log();
    let barrier = Arc::new(Barrier::new(4));

    let producers: Vec<_> = (1..=4u32)
        .map(|ctx| {
            let sender = sim.context_sender();
            let log = log.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..25u64 {
                    sender
                        .schedule_at(ContextId::new(ctx), SimTime::new(i * 2), mark(&log))
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(sim.pending_count(), 100);
    sim.run().unwrap();

    let entries = log.lock().unwrap().clone();
    assert_eq!(entries.len(), 100);
    assert!(entries.windows(2).all(|w| w[0].1 <= w[1].1));
    assert_eq!(sim.now(), SimTime::new(48));
    assert!(sim.is_finished());
}

#[test]
fn test_concurrent_producer_while_driver_runs() {
    let mut sim = Simulator::default();
    let log = new_log();
    let sender = sim.context_sender();

    // The first event hands control to a producer thread and waits for it,
    // so the injection lands while the driver loop is live.
    let producer_log = log.clone();
    sim.schedule(10, move |_| {
        let handle = thread::spawn(move || {
            sender
                .schedule_with_context(ContextId::new(3), 5, mark(&producer_log))
                .unwrap()
        });
        let at = handle.join().unwrap();
        assert_eq!(at, SimTime::new(15));
    })
    .unwrap();
    sim.schedule(20, mark(&log)).unwrap();

    sim.run().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![(3, 15), (0, 20)]);
}

// ============================================================================
// Causality floor
// ============================================================================

#[test]
fn test_push_behind_the_clock_is_rejected() {
    let mut sim = Simulator::default();
    let sender = sim.context_sender();
    sim.schedule(10, |_| {}).unwrap();
    sim.run().unwrap();

    let err = sender
        .schedule_at(ContextId::new(1), SimTime::new(3), |_| {})
        .unwrap_err();
    assert_eq!(
        err,
        SimulatorError::CausalityViolation {
            requested: SimTime::new(3),
            current: SimTime::new(10),
        }
    );
    assert_eq!(sender.pending(), 0);
    assert_eq!(sender.floor(), SimTime::new(10));
}

#[test]
fn test_injection_between_steps_runs_next_step() {
    let mut sim = Simulator::default();
    let log = new_log();
    let sender = sim.context_sender();
    sim.schedule(5, mark(&log)).unwrap();
    sim.schedule(50, mark(&log)).unwrap();

    sim.run_until(SimTime::new(20)).unwrap();
    // Between checkpoints an external context injects at t=20.
    sender
        .schedule_at(ContextId::new(9), SimTime::new(20), mark(&log))
        .unwrap();
    assert_eq!(sim.next(), SimTime::new(20));

    sim.run_until(SimTime::new(40)).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![(0, 5), (9, 20)]);
    assert_eq!(sim.now(), SimTime::new(20));
}

// ============================================================================
// Reserved destroy context
// ============================================================================

#[test]
fn test_destroy_context_cannot_tag_timeline_events() {
    let mut sim = Simulator::default();
    let sender = sim.context_sender();

    assert_eq!(
        sender
            .schedule_at(ContextId::DESTROY, SimTime::new(5), |_| {})
            .unwrap_err(),
        SimulatorError::ReservedContext(ContextId::DESTROY)
    );
    assert!(matches!(
        sender.schedule_with_context(ContextId::DESTROY, 5, |_| {}),
        Err(SimulatorError::ReservedContext(_))
    ));
    assert!(matches!(
        sim.schedule_with_context(ContextId::DESTROY, 5, |_| {}),
        Err(SimulatorError::ReservedContext(_))
    ));

    // Nothing was buffered or queued by the rejected calls.
    assert_eq!(sender.pending(), 0);
    assert_eq!(sim.pending_count(), 0);
}

#[test]
fn test_follow_up_of_cross_context_event_is_cancellable() {
    let mut sim = Simulator::default();
    let sender = sim.context_sender();
    let log = new_log();
    let outcome = Arc::new(Mutex::new(None));

    let slot = outcome.clone();
    let follow_up_log = log.clone();
    sender
        .schedule_at(ContextId::new(6), SimTime::new(5), move |sim| {
            let id = sim.schedule(10, mark(&follow_up_log)).unwrap();
            let expired = sim.is_expired(&id);
            let cancelled = sim.cancel(&id);
            *slot.lock().unwrap() = Some((id, expired, cancelled));
        })
        .unwrap();
    sim.run().unwrap();

    let (id, expired, cancelled) = outcome.lock().unwrap().clone().unwrap();
    assert!(!id.is_destroy());
    assert_eq!(id.context(), ContextId::new(6));
    assert!(!expired);
    assert_eq!(cancelled, Ok(()));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(sim.now(), SimTime::new(5));
}

// ============================================================================
// Finished / next with undrained events
// ============================================================================

#[test]
fn test_undrained_inbox_means_not_finished() {
    let mut sim = Simulator::default();
    let sender = sim.context_sender();
    sim.run().unwrap();
    assert!(sim.is_finished());

    sender
        .schedule_at(ContextId::new(2), SimTime::new(7), |_| {})
        .unwrap();
    assert!(!sim.is_finished());
    assert_eq!(sim.next(), SimTime::new(7));
    assert_eq!(sim.peek_next(), Ok(SimTime::new(7)));

    sim.run().unwrap();
    assert!(sim.is_finished());
    assert_eq!(sim.event_count(), 1);
}

#[test]
fn test_next_takes_minimum_of_queue_and_inbox() {
    let mut sim = Simulator::default();
    let sender = sim.context_sender();
    sim.schedule(30, |_| {}).unwrap();
    sender
        .schedule_at(ContextId::new(1), SimTime::new(12), |_| {})
        .unwrap();
    assert_eq!(sim.next(), SimTime::new(12));

    sender
        .schedule_at(ContextId::new(1), SimTime::new(40), |_| {})
        .unwrap();
    assert_eq!(sim.next_timestamp(), 12);
}
