//! Logging utilities.
//!
//! Compilers and replay backends log through the `log` facade; this module
//! only owns the `env_logger` setup used by tools and tests.

mod init;

pub use init::{init_logging, LoggingConfig};
