//! Distributed configuration store for log shippers and their coordinator.
//!
//! Documents are kept in a hierarchical coordination service:
//!
//! ```text
//! <root>/output/<destination>/<sinkType>
//! <root>/<cluster>/global
//! <root>/<cluster>/input/<service>
//! <root>/<cluster>/loglevelfilter/<logId>
//! ```
//!
//! A [`ConfigStore`] publishes documents, serves reads from a local mirror of
//! the tree and turns tree changes into monitor callbacks.

mod acl;
mod config;
pub mod constants;
mod coordination;
mod dispatcher;
mod errors;
pub mod layout;
mod mirror;
mod model;
mod session;
mod store;
pub(crate) mod utils;

pub use acl::*;
pub use config::*;
pub use coordination::*;
pub use dispatcher::*;
pub use errors::*;
pub use mirror::*;
pub use model::*;
pub use session::*;
pub use store::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
