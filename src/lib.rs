//! Back up the root filesystem, ship the archive to a remote destination,
//! then grow root onto newly attached disk space.

pub mod backup;
pub mod command;
pub mod config;
pub mod error;
pub mod extend;
pub mod inputs;
pub mod logging;
pub mod output;
pub mod privilege;
pub mod prompt;
pub mod transfer;
pub mod workflow;

pub use error::{Result, RootfsError};
pub use workflow::{Outcome, Workflow};
