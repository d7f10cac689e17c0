use bytes::Bytes;
use tracing::debug;

use super::states::JobState;
use crate::connection::Connection;
use crate::error::Result;
use crate::yaml::Dict;

/// A job handed out by the broker, as seen from this client.
///
/// Operations go through the [Connection] that produced the handle, which must
/// be passed back in. The handle never owns the connection.
#[derive(Debug)]
pub struct Job {
    id: u64,
    body: Bytes,
    state: JobState,
}

impl Job {
    pub(crate) fn new(id: u64, body: Bytes, state: JobState) -> Self {
        Self { id, body, state }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_reserved(&self) -> bool {
        self.state == JobState::Reserved
    }

    /// Deletes the job. Does nothing unless this client holds the job.
    ///
    /// On error the handle keeps its state.
    pub async fn delete(&mut self, conn: &mut Connection) -> Result<()> {
        if !self.is_reserved() {
            debug!(id = self.id, state = %self.state, "skipping delete");
            return Ok(());
        }

        conn.delete(self.id).await?;
        self.state = JobState::Released;

        Ok(())
    }

    /// Releases the job back to the ready queue after `delay` seconds. Does
    /// nothing unless this client holds the job.
    ///
    /// Without a `priority`, the job's current priority is looked up first.
    pub async fn release(
        &mut self,
        conn: &mut Connection,
        priority: Option<u32>,
        delay: u32,
    ) -> Result<()> {
        if !self.is_reserved() {
            debug!(id = self.id, state = %self.state, "skipping release");
            return Ok(());
        }

        let pri = match priority {
            Some(pri) => pri,
            None => self.priority(conn).await?,
        };

        // The broker may answer BURIED instead of RELEASED; either way the
        // reservation is gone.
        conn.release(self.id, pri, delay).await?;
        self.state = JobState::Released;

        Ok(())
    }

    /// Buries the job. Does nothing unless this client holds the job.
    ///
    /// Without a `priority`, the job's current priority is looked up first.
    pub async fn bury(
        &mut self,
        conn: &mut Connection,
        priority: Option<u32>,
    ) -> Result<()> {
        if !self.is_reserved() {
            debug!(id = self.id, state = %self.state, "skipping bury");
            return Ok(());
        }

        let pri = match priority {
            Some(pri) => pri,
            None => self.priority(conn).await?,
        };

        conn.bury(self.id, pri).await?;
        self.state = JobState::Released;

        Ok(())
    }

    /// Asks for more time to work on the job. Does nothing unless this client
    /// holds the job.
    pub async fn touch(&mut self, conn: &mut Connection) -> Result<()> {
        if !self.is_reserved() {
            debug!(id = self.id, state = %self.state, "skipping touch");
            return Ok(());
        }

        conn.touch(self.id).await
    }

    /// Fetches the broker's statistics for this job, whatever its state.
    pub async fn stats(&self, conn: &mut Connection) -> Result<Dict> {
        conn.stats_job(self.id).await
    }

    /// The job's current priority according to the broker, or the
    /// connection's default priority if the stats carry no usable `pri`.
    pub async fn priority(&self, conn: &mut Connection) -> Result<u32> {
        let stats = self.stats(conn).await?;

        Ok(stats
            .get("pri")
            .and_then(|pri| pri.as_i64())
            .and_then(|pri| u32::try_from(pri).ok())
            .unwrap_or(conn.config().default_priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let body = Bytes::from_static(b"payload");
        let job = Job::new(7, body, JobState::Reserved);

        assert_eq!(job.id(), 7);
        assert_eq!(job.body(), "payload");
        assert!(job.is_reserved());
        assert_eq!(job.into_body(), "payload");

        let job = Job::new(8, Bytes::new(), JobState::Unowned);
        assert!(!job.is_reserved());
        assert_eq!(job.state().to_string(), "unowned");
    }
}
