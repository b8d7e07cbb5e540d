pub mod config;
pub mod constants;
#[cfg(feature = "db")]
pub mod db;
pub mod environment;
pub mod error;
pub mod format;
pub mod logging;
pub mod server;
pub mod session;

pub use environment::Environment;
pub use error::{PortalError, Result};
