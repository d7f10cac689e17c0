use std::io;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::line_reader::LineReader;
use crate::parser::ResponseLine;
use crate::types::job::Job;
use crate::types::protocol::Command;
use crate::types::serialisable::BeanstalkSerialisable;
use crate::types::states::JobState;
use crate::util::bytes_to_human_str;
use crate::yaml::{self, Dict};

/// Commands are logged up to this many bytes, which covers any command line
/// the broker accepts.
const MAX_LOGGED_COMMAND: usize = 224;

/// beanstalkd refuses to hold a job larger than 1 GiB, and no listing or
/// statistics reply comes close, so a longer body means a broken reply.
const MAX_BODY_LEN: usize = 1 << 30;

/// A single connection to a beanstalkd broker.
///
/// Each method sends one command and waits for its reply; nothing is pipelined
/// and nothing happens in the background. A socket error closes the
/// connection, and every later call fails with a socket error until
/// [connect](Self::connect) is called again.
///
/// ```no_run
/// use beanstalk_client::Connection;
///
/// # async fn example() -> beanstalk_client::Result<()> {
/// let mut conn = Connection::open("localhost", 11300).await?;
///
/// conn.use_tube("emails").await?;
/// conn.put(b"hello").await?;
///
/// conn.watch("emails").await?;
/// if let Some(mut job) = conn.reserve_with_timeout(5).await? {
///     println!("got job {}", job.id());
///     job.delete(&mut conn).await?;
/// }
///
/// conn.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    config: Config,
    stream: Option<Stream>,
}

struct Stream {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// A reply whose status was one of the command's success statuses.
struct Reply {
    command: &'static str,
    line: ResponseLine,
    body: Option<Bytes>,
}

impl Reply {
    /// The error for a success status whose arguments don't make sense.
    fn malformed(&self) -> Error {
        Error::UnexpectedResponse {
            command: self.command.to_owned(),
            status: self.line.status.clone(),
            args: self.line.args.clone(),
        }
    }

    fn arg(&self, idx: usize) -> Result<String> {
        self.line
            .arg(idx)
            .map(str::to_owned)
            .map_err(|_| self.malformed())
    }

    fn arg_u64(&self, idx: usize) -> Result<u64> {
        self.line.arg_u64(idx).map_err(|_| self.malformed())
    }

    fn arg_u32(&self, idx: usize) -> Result<u32> {
        self.line.arg_u32(idx).map_err(|_| self.malformed())
    }

    fn body_str(&self) -> String {
        self.body
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default()
            .into_owned()
    }
}

impl Connection {
    /// Connects to the broker described by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        let mut conn = Self {
            config,
            stream: None,
        };

        conn.connect().await?;

        Ok(conn)
    }

    /// Connects to `host:port` with default settings otherwise.
    pub async fn open(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::new(Config::builder().host(host).port(port).build()).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Opens the TCP connection, unless it's already open.
    ///
    /// Only the handshake is bounded by the connect timeout; later commands,
    /// reserves in particular, may wait indefinitely.
    #[instrument(
        skip_all,
        err,
        fields(host = %self.config.host, port = self.config.port)
    )]
    pub async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let addr = (self.config.host.as_str(), self.config.port);
        let limit = self.config.connect_timeout;
        let conn = match timeout(limit, TcpStream::connect(addr)).await {
            Ok(conn) => conn?,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {limit:?}"),
                )
                .into())
            },
        };

        conn.set_nodelay(true)?;

        let (r, w) = conn.into_split();
        self.stream = Some(Stream {
            reader: r.into(),
            writer: w,
        });

        debug!("connected");

        Ok(())
    }

    /// Closes the connection, if open, after politely sending `quit`. The
    /// socket is released even if that fails.
    pub async fn close(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        let quit = Command::Quit.serialise_beanstalk();
        if let Err(error) = stream.writer.write_all(&quit).await {
            debug!(%error, "failed to send quit");
        }
        if let Err(error) = stream.writer.shutdown().await {
            debug!(%error, "failed to shut down socket");
        }

        debug!("closed connection");
    }

    /// Sends `cmd` and classifies the reply, closing the connection on any
    /// socket error.
    async fn interact(&mut self, cmd: &Command) -> Result<Reply> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::not_connected());
        };

        let result = Self::exchange(stream, cmd).await;

        if let Err(Error::Socket(error)) = &result {
            warn!(
                %error,
                command = cmd.keyword(),
                "closing connection after socket error"
            );
            self.close().await;
        }

        result
    }

    async fn exchange(stream: &mut Stream, cmd: &Command) -> Result<Reply> {
        let command = cmd.keyword();
        let expect = cmd.expectation();

        let wire = cmd.serialise_beanstalk();
        let logged = &wire[..wire.len().min(MAX_LOGGED_COMMAND)];
        trace!(command = bytes_to_human_str(logged), "sending command");

        stream.writer.write_all(&wire).await?;
        stream.writer.flush().await?;

        let line = stream.reader.read_line().await?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no data read")
        })?;

        trace!(line = bytes_to_human_str(&line), "received reply");

        let line = match ResponseLine::try_from(&line[..]) {
            Ok(line) => line,
            Err(_) => {
                return Err(Error::UnexpectedResponse {
                    command: command.to_owned(),
                    status: String::new(),
                    args: vec![],
                })
            },
        };

        if expect.ok.contains(&line.status.as_str()) {
            let mut reply = Reply {
                command,
                line,
                body: None,
            };

            if let Some(idx) = expect.size_field {
                let len = match reply.line.arg_usize(idx) {
                    Ok(len) if len <= MAX_BODY_LEN => len,
                    _ => return Err(reply.malformed()),
                };
                reply.body = Some(stream.reader.read_body(len).await?);
            }

            debug!(command, status = %reply.line.status, "command succeeded");

            Ok(reply)
        } else if expect.err.contains(&line.status.as_str()) {
            debug!(command, status = %line.status, "command failed");

            Err(Error::CommandFailed {
                command: command.to_owned(),
                status: line.status,
                args: line.args,
            })
        } else {
            Err(Error::UnexpectedResponse {
                command: command.to_owned(),
                status: line.status,
                args: line.args,
            })
        }
    }

    async fn interact_value(&mut self, cmd: &Command) -> Result<String> {
        self.interact(cmd).await?.arg(0)
    }

    async fn interact_job(
        &mut self,
        cmd: &Command,
        state: JobState,
    ) -> Result<Job> {
        let reply = self.interact(cmd).await?;
        let id = reply.arg_u64(0)?;

        Ok(Job::new(id, reply.body.unwrap_or_default(), state))
    }

    async fn interact_dict(&mut self, cmd: &Command) -> Result<Dict> {
        Ok(yaml::parse_dict(&self.interact(cmd).await?.body_str()))
    }

    async fn interact_list(&mut self, cmd: &Command) -> Result<Vec<String>> {
        Ok(yaml::parse_list(&self.interact(cmd).await?.body_str()))
    }

    /// A missing job is a normal outcome for a peek.
    async fn interact_peek(&mut self, cmd: &Command) -> Result<Option<Job>> {
        match self.interact_job(cmd, JobState::Unowned).await {
            Ok(job) => Ok(Some(job)),
            Err(Error::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn interact_reserve(&mut self, cmd: &Command) -> Result<Option<Job>> {
        match self.interact_job(cmd, JobState::Reserved).await {
            Ok(job) => Ok(Some(job)),
            Err(Error::CommandFailed { status, .. })
                if status == "TIMED_OUT" =>
            {
                Ok(None)
            },
            Err(Error::CommandFailed { status, args, .. })
                if status == "DEADLINE_SOON" =>
            {
                Err(Error::DeadlineSoon { args })
            },
            Err(e) => Err(e),
        }
    }

    // -- public interface --

    /// Puts a job into the currently used tube with the configured default
    /// priority and time to run, and no delay. Returns the new job's ID.
    pub async fn put(&mut self, body: impl AsRef<[u8]>) -> Result<u64> {
        let pri = self.config.default_priority;
        let ttr = self.config.default_ttr;
        self.put_with(body, pri, 0, ttr).await
    }

    /// Puts a job into the currently used tube. Returns the new job's ID, even
    /// if the broker buried it straight away.
    pub async fn put_with(
        &mut self,
        body: impl AsRef<[u8]>,
        pri: u32,
        delay: u32,
        ttr: u32,
    ) -> Result<u64> {
        let cmd = Command::Put {
            pri,
            delay,
            ttr,
            data: Bytes::copy_from_slice(body.as_ref()),
        };

        self.interact(&cmd).await?.arg_u64(0)
    }

    /// Reserves a job from the watched tubes, waiting as long as it takes.
    pub async fn reserve(&mut self) -> Result<Option<Job>> {
        self.interact_reserve(&Command::Reserve).await
    }

    /// Reserves a job from the watched tubes, or returns `None` if none is
    /// available within `timeout` seconds.
    pub async fn reserve_with_timeout(
        &mut self,
        timeout: u32,
    ) -> Result<Option<Job>> {
        self.interact_reserve(&Command::ReserveWithTimeout { timeout })
            .await
    }

    /// Reserves a specific ready, delayed or buried job.
    pub async fn reserve_job(&mut self, id: u64) -> Result<Job> {
        self.interact_job(&Command::ReserveJob { id }, JobState::Reserved)
            .await
    }

    /// Kicks at most `bound` jobs into the ready queue, returning how many
    /// were kicked.
    pub async fn kick(&mut self, bound: u64) -> Result<u64> {
        self.interact(&Command::Kick { bound }).await?.arg_u64(0)
    }

    /// Kicks a single buried or delayed job.
    pub async fn kick_job(&mut self, id: u64) -> Result<()> {
        self.interact(&Command::KickJob { id }).await.map(|_| ())
    }

    pub async fn peek(&mut self, id: u64) -> Result<Option<Job>> {
        self.interact_peek(&Command::Peek { id }).await
    }

    pub async fn peek_ready(&mut self) -> Result<Option<Job>> {
        self.interact_peek(&Command::PeekReady).await
    }

    pub async fn peek_delayed(&mut self) -> Result<Option<Job>> {
        self.interact_peek(&Command::PeekDelayed).await
    }

    pub async fn peek_buried(&mut self) -> Result<Option<Job>> {
        self.interact_peek(&Command::PeekBuried).await
    }

    /// Lists every tube on the broker.
    pub async fn tubes(&mut self) -> Result<Vec<String>> {
        self.interact_list(&Command::ListTubes).await
    }

    /// The tube `put` and the peek family currently operate on.
    pub async fn using(&mut self) -> Result<String> {
        self.interact_value(&Command::ListTubeUsed).await
    }

    /// Switches to `name` for `put` and the peek family. Returns the tube name
    /// the broker reports.
    pub async fn use_tube(&mut self, name: &str) -> Result<String> {
        self.interact_value(&Command::Use {
            tube: name.as_bytes().to_vec(),
        })
        .await
    }

    /// Lists the tubes `reserve` draws from.
    pub async fn watching(&mut self) -> Result<Vec<String>> {
        self.interact_list(&Command::ListTubesWatched).await
    }

    /// Adds `name` to the watched tubes, returning how many are now watched.
    pub async fn watch(&mut self, name: &str) -> Result<u32> {
        let cmd = Command::Watch {
            tube: name.as_bytes().to_vec(),
        };

        self.interact(&cmd).await?.arg_u32(0)
    }

    /// Removes `name` from the watched tubes, returning how many are still
    /// watched. Refusing to ignore the last watched tube counts as 1.
    pub async fn ignore(&mut self, name: &str) -> Result<u32> {
        let cmd = Command::Ignore {
            tube: name.as_bytes().to_vec(),
        };

        match self.interact(&cmd).await {
            Ok(reply) => reply.arg_u32(0),
            Err(Error::CommandFailed { .. }) => Ok(1),
            Err(e) => Err(e),
        }
    }

    /// Broker-wide statistics.
    pub async fn stats(&mut self) -> Result<Dict> {
        self.interact_dict(&Command::StatsServer).await
    }

    pub async fn stats_tube(&mut self, name: &str) -> Result<Dict> {
        self.interact_dict(&Command::StatsTube {
            tube: name.as_bytes().to_vec(),
        })
        .await
    }

    pub async fn stats_job(&mut self, id: u64) -> Result<Dict> {
        self.interact_dict(&Command::StatsJob { id }).await
    }

    /// Stops jobs being reserved from `name` for `delay` seconds.
    pub async fn pause_tube(&mut self, name: &str, delay: u32) -> Result<()> {
        let cmd = Command::PauseTube {
            tube: name.as_bytes().to_vec(),
            delay,
        };

        self.interact(&cmd).await.map(|_| ())
    }

    // -- job interactors --

    pub async fn delete(&mut self, id: u64) -> Result<()> {
        self.interact(&Command::Delete { id }).await.map(|_| ())
    }

    /// Releases a reserved job back to the ready queue after `delay` seconds.
    pub async fn release(
        &mut self,
        id: u64,
        pri: u32,
        delay: u32,
    ) -> Result<()> {
        self.interact(&Command::Release { id, pri, delay })
            .await
            .map(|_| ())
    }

    pub async fn bury(&mut self, id: u64, pri: u32) -> Result<()> {
        self.interact(&Command::Bury { id, pri }).await.map(|_| ())
    }

    /// Asks for more time to work on a reserved job before its TTR expires.
    pub async fn touch(&mut self, id: u64) -> Result<()> {
        self.interact(&Command::Touch { id }).await.map(|_| ())
    }
}
