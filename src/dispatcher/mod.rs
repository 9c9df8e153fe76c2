//! Turns mirror events into typed domain callbacks.
//!
//! Two listener values are attached to mirrors by the store:
//! - [`InputChangeDispatcher`] on a cluster's subtree: input configs (with
//!   global template merge) and log level filters
//! - [`OutputChangeDispatcher`] on `/output`: sink property updates
//!
//! A malformed document fails its event with `MalformedConfig`. The mirror
//! logs it and moves on; no callback fires for that event.

mod input;
mod merge;
mod monitor;
mod output;
pub use input::*;
pub use merge::*;
pub use monitor::*;
pub use output::*;
