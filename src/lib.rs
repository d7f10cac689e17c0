//! A client for beanstalkd-compatible work queues.
//!
//! A [Connection] speaks the beanstalkd text protocol over one TCP socket:
//! producers `put` jobs into a tube, workers `watch` tubes and `reserve` jobs
//! from them, then `delete`, `release` or `bury` each [Job] once done with it.
//!
//! Failures fall into the kinds of [Error]. Only a socket error closes the
//! connection; a command failing or an unexpected reply leaves it usable.
//! Nothing is retried automatically.

pub mod config;
pub mod connection;
pub mod error;
pub mod line_reader;
pub mod parser;
pub mod types;
pub mod util;
pub mod yaml;

pub use config::{
    Config, ConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_PRIORITY, DEFAULT_TTR,
};
pub use connection::Connection;
pub use error::{Error, Result};
pub use types::job::Job;
pub use types::states::JobState;
pub use yaml::{Dict, Value};
