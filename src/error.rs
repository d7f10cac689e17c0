use std::io;

use thiserror::Error;

/// Every way a broker interaction can fail.
///
/// Only [Error::Socket] tears the connection down; the other kinds leave it
/// usable for further commands.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed: connect refused or timed out, a read or write
    /// failed, the peer hung up mid-reply, or the connection was already
    /// closed. The connection is closed once this is returned.
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    /// The broker answered with a failure status that is documented for the
    /// command, e.g. `NOT_FOUND` for `delete`.
    #[error("{command} failed with {status}{}", fmt_args(.args))]
    CommandFailed {
        command: String,
        status: String,
        args: Vec<String>,
    },

    /// The broker answered with a status, or arguments, this client does not
    /// expect for the command. Usually means client and broker are out of sync.
    #[error("unexpected response to {command}: {status}{}", fmt_args(.args))]
    UnexpectedResponse {
        command: String,
        status: String,
        args: Vec<String>,
    },

    /// `reserve` was refused because a job held by this client is about to
    /// exceed its time to run.
    #[error("deadline soon{}", fmt_args(.args))]
    DeadlineSoon { args: Vec<String> },
}

impl Error {
    pub(crate) fn not_connected() -> Self {
        Self::Socket(io::Error::new(
            io::ErrorKind::NotConnected,
            "connection is closed",
        ))
    }

    pub fn is_socket(&self) -> bool {
        matches!(self, Self::Socket(_))
    }

    /// True for a `CommandFailed` carrying `NOT_FOUND`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CommandFailed { status, .. } if status == "NOT_FOUND"
        )
    }
}

fn fmt_args(args: &[String]) -> String {
    args.iter().map(|a| format!(" {a}")).collect()
}

pub type Result<T> = std::result::Result<T, Error>;
