//! Poolclaw Core - Pool data model, limits, protocol, and error handling

pub mod error;
pub mod limits;
pub mod protocol;
pub mod types;

pub use error::{Error, Result};
pub use limits::*;
pub use protocol::*;
pub use types::*;
