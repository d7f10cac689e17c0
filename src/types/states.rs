use std::fmt;

use serde::Serialize;

/// Whether this client holds the reservation on a job it has a handle to.
///
/// Only `Reserved` permits delete, release, bury and touch. `Released` is
/// terminal: a later reservation of the same job yields a fresh handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    /// Obtained by a reservation, which this client still holds.
    Reserved,
    /// Obtained by a peek; never held by this client.
    Unowned,
    /// Deleted, released or buried by this client.
    Released,
}

impl JobState {
    fn as_str(&self) -> &'static str {
        use JobState::*;

        match self {
            Reserved => "reserved",
            Unowned => "unowned",
            Released => "released",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// This impl is used to allow job summaries to be printed as YAML.
impl Serialize for JobState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
