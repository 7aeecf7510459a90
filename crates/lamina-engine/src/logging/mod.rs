//! Logging bootstrap.
//!
//! The engine logs through the `log` facade only; this module wires up an
//! `env_logger` backend for embeddings that do not bring their own.

mod init;

pub use init::{LoggingConfig, init_logging};
