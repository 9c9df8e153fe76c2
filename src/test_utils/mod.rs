//! Helpers shared by the unit tests of every module
mod common;
mod monitors;

pub use common::*;
pub use monitors::*;
