//! Domain types shared by the queue, the inbox and the driver

pub mod event;

pub use event::{Action, ContextId, Event, EventId, EventKey, EventWithContext};
