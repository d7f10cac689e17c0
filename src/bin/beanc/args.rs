use clap::{Parser, Subcommand};

use beanstalk_client::{DEFAULT_HOST, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Broker host to connect to.
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    pub(crate) host: String,
    /// Broker (TCP) port to connect to.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
    /// Milliseconds to wait for the connection to be established.
    #[arg(short, long, default_value_t = 1000)]
    pub(crate) timeout_ms: u64,
    /// Tube to use (for put, peek and kick) or watch (for reserve).
    #[arg(long)]
    pub(crate) tube: Option<String>,
    /// Enables human-friendly logging.
    #[arg(short, long, default_value_t)]
    pub(crate) debug: bool,
    #[command(subcommand)]
    pub(crate) cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Cmd {
    /// Puts a job and prints its ID.
    Put {
        /// Job body.
        body: String,
        /// Priority; defaults to 2^31.
        #[arg(long)]
        pri: Option<u32>,
        /// Seconds before the job becomes ready.
        #[arg(long, default_value_t = 0)]
        delay: u32,
        /// Seconds a worker may hold the job; defaults to 120.
        #[arg(long)]
        ttr: Option<u32>,
    },
    /// Reserves a job and prints it.
    Reserve {
        /// Seconds to wait for a job; waits indefinitely if absent.
        #[arg(long)]
        timeout: Option<u32>,
        /// Deletes the job once printed, rather than releasing it.
        #[arg(long)]
        delete: bool,
    },
    /// Prints a job by ID without reserving it.
    Peek { id: u64 },
    /// Prints the next ready job on the used tube.
    PeekReady,
    /// Prints the next delayed job on the used tube.
    PeekDelayed,
    /// Prints the next buried job on the used tube.
    PeekBuried,
    /// Kicks up to `bound` buried or delayed jobs on the used tube.
    Kick { bound: u64 },
    /// Kicks one buried or delayed job.
    KickJob { id: u64 },
    /// Deletes a job.
    Delete { id: u64 },
    /// Reserves a job by ID, then buries it.
    Bury {
        id: u64,
        /// Priority; defaults to the job's current priority.
        #[arg(long)]
        pri: Option<u32>,
    },
    /// Lists all tubes.
    Tubes,
    /// Lists watched tubes.
    Watching,
    /// Prints the used tube.
    Using,
    /// Prints broker statistics.
    Stats,
    /// Prints statistics for a tube.
    StatsTube { name: String },
    /// Prints statistics for a job.
    StatsJob { id: u64 },
    /// Pauses a tube for `delay` seconds.
    PauseTube { name: String, delay: u32 },
}
