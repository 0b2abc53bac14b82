//! Event sources outside the main timeline
//!
//! - **inbox**: cross-context buffer fed by other threads
//! - **destroy**: one-shot actions run at teardown

pub mod destroy;
pub mod inbox;

pub use destroy::DestroyList;
pub use inbox::{ContextSender, CrossContextInbox};
