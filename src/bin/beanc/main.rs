mod args;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use beanstalk_client::util::bytes_to_human_str;
use beanstalk_client::{Config, Connection, Job, JobState};
use clap::Parser;
use serde::Serialize;
use tokio::{select, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn, Level};

use crate::args::{Args, Cmd};

/// How a job is printed.
#[derive(Serialize)]
struct JobSummary {
    id: u64,
    state: JobState,
    body: String,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id(),
            state: job.state(),
            body: bytes_to_human_str(job.body()),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging goes to stderr, leaving stdout for command output.
    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt().json().with_writer(io::stderr).init();
    }

    // A pending reserve can wait forever, so Ctrl-C abandons the command.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(error) = signal::ctrl_c().await {
                warn!(%error, "something strange with ctrl-c handling!");
            };
            cancel.cancel();
        });
    }

    select! {
        result = begin(args) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                error!(error = format!("{error:#}"), "command failed");
                ExitCode::FAILURE
            },
        },
        _ = cancel.cancelled() => {
            warn!("interrupted");
            ExitCode::from(130)
        },
    }
}

async fn begin(args: Args) -> Result<()> {
    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .connect_timeout_ms(args.timeout_ms)
        .build();

    let mut conn = Connection::new(config)
        .await
        .with_context(|| format!("connecting to {}:{}", args.host, args.port))?;

    if let Some(tube) = &args.tube {
        select_tube(&mut conn, tube, &args.cmd).await?;
    }

    let ret = handle_cmd(&mut conn, args.cmd).await;

    conn.close().await;

    ret
}

/// Watches only `tube` for a reserve, and uses it for anything else.
async fn select_tube(
    conn: &mut Connection,
    tube: &str,
    cmd: &Cmd,
) -> Result<()> {
    if let Cmd::Reserve { .. } = cmd {
        conn.watch(tube).await.context("watching tube")?;
        if tube != "default" {
            conn.ignore("default").await.context("ignoring default tube")?;
        }
    } else {
        conn.use_tube(tube).await.context("using tube")?;
    }

    Ok(())
}

#[instrument(skip(conn))]
async fn handle_cmd(conn: &mut Connection, cmd: Cmd) -> Result<()> {
    match cmd {
        Cmd::Put {
            body,
            pri,
            delay,
            ttr,
        } => {
            let pri = pri.unwrap_or(conn.config().default_priority);
            let ttr = ttr.unwrap_or(conn.config().default_ttr);
            let id = conn.put_with(body, pri, delay, ttr).await?;
            println!("{id}");
        },
        Cmd::Reserve { timeout, delete } => {
            let job = match timeout {
                Some(secs) => conn.reserve_with_timeout(secs).await?,
                None => conn.reserve().await?,
            };

            let Some(mut job) = job else {
                println!("no job available");
                return Ok(());
            };

            print_yaml(&JobSummary::from(&job))?;

            if delete {
                job.delete(conn).await.context("deleting job")?;
            } else {
                job.release(conn, None, 0).await.context("releasing job")?;
            }
            debug!(id = job.id(), state = %job.state(), "done with job");
        },
        Cmd::Peek { id } => print_peeked(conn.peek(id).await?)?,
        Cmd::PeekReady => print_peeked(conn.peek_ready().await?)?,
        Cmd::PeekDelayed => print_peeked(conn.peek_delayed().await?)?,
        Cmd::PeekBuried => print_peeked(conn.peek_buried().await?)?,
        Cmd::Kick { bound } => println!("{}", conn.kick(bound).await?),
        Cmd::KickJob { id } => {
            conn.kick_job(id).await?;
            println!("kicked {id}");
        },
        Cmd::Delete { id } => {
            conn.delete(id).await?;
            println!("deleted {id}");
        },
        Cmd::Bury { id, pri } => {
            let mut job = conn.reserve_job(id).await.context("reserving job")?;
            job.bury(conn, pri).await?;
            println!("buried {id}");
        },
        Cmd::Tubes => print_yaml(&conn.tubes().await?)?,
        Cmd::Watching => print_yaml(&conn.watching().await?)?,
        Cmd::Using => println!("{}", conn.using().await?),
        Cmd::Stats => print_yaml(&conn.stats().await?)?,
        Cmd::StatsTube { name } => print_yaml(&conn.stats_tube(&name).await?)?,
        Cmd::StatsJob { id } => print_yaml(&conn.stats_job(id).await?)?,
        Cmd::PauseTube { name, delay } => {
            conn.pause_tube(&name, delay).await?;
            println!("paused {name} for {delay}s");
        },
    };

    Ok(())
}

fn print_peeked(job: Option<Job>) -> Result<()> {
    match job {
        Some(job) => print_yaml(&JobSummary::from(&job)),
        None => {
            println!("no job found");
            Ok(())
        },
    }
}

fn print_yaml(value: &impl Serialize) -> Result<()> {
    let out = serde_yaml::to_string(value).context("serialising output")?;
    print!("{out}");
    Ok(())
}
