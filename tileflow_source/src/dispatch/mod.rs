//! Sending decode work to a worker and routing its replies back to the callers.

mod dispatcher;
mod pending;
mod protocol;
mod worker;

pub use dispatcher::*;
pub use pending::*;
pub use protocol::*;
pub use worker::*;
