use bytes::Bytes;

use super::serialisable::BeanstalkSerialisable;

/// A command sent by the client to the server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Places a job onto the currently `use`d tube. Replies `INSERTED <id>`,
    /// `BURIED <id>` if the server ran short of memory, or `JOB_TOO_BIG`.
    ///
    /// On the wire: `put <pri> <delay> <ttr> <n_bytes>` then the data.
    Put {
        pri: u32,
        delay: u32,
        ttr: u32,
        data: Bytes,
    },
    /// Awaits a job from all the `watch`ed tubes, blocking until one appears.
    ///
    /// On the wire: `reserve`
    Reserve,
    /// As `reserve`, but after `timeout` seconds pass, a `TIMED_OUT` response
    /// is sent instead.
    ///
    /// On the wire: `reserve-with-timeout <seconds>`
    ReserveWithTimeout { timeout: u32 },
    /// Reserves a job with a given ID if it exists and is not already reserved,
    /// otherwise returning `NOT_FOUND`.
    ///
    /// On the wire: `reserve-job <id>`
    ReserveJob { id: u64 },
    /// Releases a job reserved by this client, returning it to the ready
    /// queue. Returns `RELEASED` or `NOT_FOUND` in most cases, but can also
    /// return `BURIED` if the server was unable to expand the priority queue
    /// data structure.
    ///
    /// On the wire: `release <id> <pri> <delay>`
    Release { id: u64, pri: u32, delay: u32 },
    /// Deletes a job reserved by this client, or in the ready, buried, or
    /// delayed states. Returns `DELETED` or `NOT_FOUND`.
    ///
    /// On the wire: `delete <id>`
    Delete { id: u64 },
    /// Buries a job reserved by this client. Returns `BURIED` or `NOT_FOUND`.
    ///
    /// On the wire: `bury <id> <pri>`
    Bury { id: u64, pri: u32 },
    /// Refreshes the Time To Run (TTR) of a job reserved by this client.
    /// Returns `TOUCHED` or `NOT_FOUND`.
    ///
    /// On the wire: `touch <id>`
    Touch { id: u64 },
    /// Adds a tube to the watchlist for this client. Always replies with
    /// `WATCHING <number of watched tubes>`.
    ///
    /// On the wire: `watch <tube>`
    Watch { tube: Vec<u8> },
    /// Reverses the effect of `watch` on this client. Returns `WATCHING <n>` or
    /// `NOT_IGNORED` if this would remove the last tube in the watchlist.
    ///
    /// On the wire: `ignore <tube>`
    Ignore { tube: Vec<u8> },
    /// Returns the data for the job with this ID, regardless of its state.
    /// Response is either `FOUND <id> <bytes>` or `NOT_FOUND`, in common with
    /// all requests in the `peek` family.
    ///
    /// On the wire: `peek <id>`
    Peek { id: u64 },
    /// Returns the data for the next ready job on the currently-used tube.
    ///
    /// On the wire: `peek-ready`
    PeekReady,
    /// Returns the data for the next delayed job that will become ready on the
    /// currently-used tube.
    ///
    /// On the wire: `peek-delayed`
    PeekDelayed,
    /// Returns the data for the first available buried job on the currently-
    /// used tube.
    ///
    /// On the wire: `peek-buried`
    PeekBuried,
    /// Promotes up to `bound` jobs on the currently-used tube from buried to
    /// the ready states, returning `KICKED <count>` with the actual number of
    /// jobs kicked. If no buried jobs exist, it promotes delayed jobs instead.
    ///
    /// On the wire: `kick <bound>`
    Kick { bound: u64 },
    /// Promotes a single job from buried or delayed to ready by its ID.
    /// Returns `KICKED` if successful, otherwise `NOT_FOUND` if the job ID
    /// doesn't exist or the job is not kickable.
    ///
    /// On the wire: `kick-job <id>`
    KickJob { id: u64 },
    /// Requests information about the job with the given ID. Like the rest of
    /// the `stats` family, a success is `OK <n_bytes>` followed by a YAML
    /// dictionary.
    ///
    /// On the wire: `stats-job <id>`
    StatsJob { id: u64 },
    /// Requests information about a tube, or `NOT_FOUND` if it doesn't exist.
    ///
    /// On the wire: `stats-tube <tube>`
    StatsTube { tube: Vec<u8> },
    /// Requests information about the server as a whole.
    ///
    /// On the wire: `stats`
    StatsServer,
    /// Lists the tubes that currently exist. Like `list-tubes-watched`, a
    /// success is `OK <n_bytes>` followed by a YAML list.
    ///
    /// On the wire: `list-tubes`
    ListTubes,
    /// Returns the tube name this client is currently using as `USING <tube>`.
    ///
    /// On the wire: `list-tube-used`
    ListTubeUsed,
    /// Lists the tubes this client is currently watching.
    ///
    /// On the wire: `list-tubes-watched`
    ListTubesWatched,
    /// Requests that the server close this connection. Has no reply.
    ///
    /// On the wire: `quit`
    Quit,
    /// Pause a tube for a given period, preventing new jobs being reserved for
    /// `delay` seconds. Returns `PAUSED` or `NOT_FOUND`.
    ///
    /// On the wire: `pause-tube <tube> <delay>`
    PauseTube { tube: Vec<u8>, delay: u32 },
    /// Selects the tube `put` and the `peek` family operate on. Replies
    /// `USING <tube>`.
    ///
    /// On the wire: `use <tube>`
    Use { tube: Vec<u8> },
}

/// How a reply to a given command is to be classified and framed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Expectation {
    /// Statuses meaning the command succeeded.
    pub ok: &'static [&'static str],
    /// Statuses meaning the command failed in a documented way.
    pub err: &'static [&'static str],
    /// Index of the reply argument holding the length of a trailing body, for
    /// replies that carry one.
    pub size_field: Option<usize>,
}

impl Expectation {
    const fn new(
        ok: &'static [&'static str],
        err: &'static [&'static str],
        size_field: Option<usize>,
    ) -> Self {
        Self {
            ok,
            err,
            size_field,
        }
    }
}

impl Command {
    /// The command word, as sent on the wire.
    pub fn keyword(&self) -> &'static str {
        use Command::*;

        match self {
            Put { .. } => "put",
            Reserve => "reserve",
            ReserveWithTimeout { .. } => "reserve-with-timeout",
            ReserveJob { .. } => "reserve-job",
            Release { .. } => "release",
            Delete { .. } => "delete",
            Bury { .. } => "bury",
            Touch { .. } => "touch",
            Watch { .. } => "watch",
            Ignore { .. } => "ignore",
            Peek { .. } => "peek",
            PeekReady => "peek-ready",
            PeekDelayed => "peek-delayed",
            PeekBuried => "peek-buried",
            Kick { .. } => "kick",
            KickJob { .. } => "kick-job",
            StatsJob { .. } => "stats-job",
            StatsTube { .. } => "stats-tube",
            StatsServer => "stats",
            ListTubes => "list-tubes",
            ListTubeUsed => "list-tube-used",
            ListTubesWatched => "list-tubes-watched",
            Quit => "quit",
            PauseTube { .. } => "pause-tube",
            Use { .. } => "use",
        }
    }

    /// The reply statuses and framing this command can legitimately produce.
    /// Note the same status can mean success for one command and failure for
    /// another.
    pub fn expectation(&self) -> Expectation {
        use Command::*;

        const JOB_BODY: Option<usize> = Some(1);
        const YAML_BODY: Option<usize> = Some(0);

        match self {
            Put { .. } => {
                Expectation::new(
                    &["INSERTED", "BURIED"],
                    &["JOB_TOO_BIG"],
                    None,
                )
            },
            Reserve | ReserveWithTimeout { .. } => Expectation::new(
                &["RESERVED"],
                &["DEADLINE_SOON", "TIMED_OUT"],
                JOB_BODY,
            ),
            ReserveJob { .. } => {
                Expectation::new(&["RESERVED"], &["NOT_FOUND"], JOB_BODY)
            },
            Release { .. } => Expectation::new(
                &["RELEASED", "BURIED"],
                &["NOT_FOUND"],
                None,
            ),
            Delete { .. } => {
                Expectation::new(&["DELETED"], &["NOT_FOUND"], None)
            },
            Bury { .. } => Expectation::new(&["BURIED"], &["NOT_FOUND"], None),
            Touch { .. } => {
                Expectation::new(&["TOUCHED"], &["NOT_FOUND"], None)
            },
            Watch { .. } => Expectation::new(&["WATCHING"], &[], None),
            Ignore { .. } => {
                Expectation::new(&["WATCHING"], &["NOT_IGNORED"], None)
            },
            Peek { .. } | PeekReady | PeekDelayed | PeekBuried => {
                Expectation::new(&["FOUND"], &["NOT_FOUND"], JOB_BODY)
            },
            Kick { .. } => Expectation::new(&["KICKED"], &[], None),
            KickJob { .. } => {
                Expectation::new(&["KICKED"], &["NOT_FOUND"], None)
            },
            StatsJob { .. } | StatsTube { .. } => {
                Expectation::new(&["OK"], &["NOT_FOUND"], YAML_BODY)
            },
            StatsServer | ListTubes | ListTubesWatched => {
                Expectation::new(&["OK"], &[], YAML_BODY)
            },
            ListTubeUsed | Use { .. } => {
                Expectation::new(&["USING"], &[], None)
            },
            PauseTube { .. } => {
                Expectation::new(&["PAUSED"], &["NOT_FOUND"], None)
            },
            Quit => Expectation::new(&[], &[], None),
        }
    }
}

impl BeanstalkSerialisable for Command {
    fn serialise_beanstalk(&self) -> Vec<u8> {
        use Command::*;

        let kw = self.keyword();

        match self {
            Put {
                pri,
                delay,
                ttr,
                data,
            } => {
                let n_bytes = data.len();
                let header = format!("{kw} {pri} {delay} {ttr} {n_bytes}\r\n");
                [
                    header.into_bytes(),
                    data.to_vec(),
                    b"\r\n".to_vec(),
                ]
                .concat()
            },

            Reserve | PeekReady | PeekDelayed | PeekBuried | StatsServer
            | ListTubes | ListTubeUsed | ListTubesWatched | Quit => {
                format!("{kw}\r\n").into_bytes()
            },

            ReserveWithTimeout { timeout } => {
                format!("{kw} {timeout}\r\n").into_bytes()
            },
            Kick { bound } => format!("{kw} {bound}\r\n").into_bytes(),
            ReserveJob { id } | Delete { id } | Touch { id } | Peek { id }
            | KickJob { id } | StatsJob { id } => {
                format!("{kw} {id}\r\n").into_bytes()
            },

            Bury { id, pri } => format!("{kw} {id} {pri}\r\n").into_bytes(),
            Release { id, pri, delay } => {
                format!("{kw} {id} {pri} {delay}\r\n").into_bytes()
            },

            Watch { tube }
            | Ignore { tube }
            | StatsTube { tube }
            | Use { tube } => with_tube(kw, tube, ""),
            PauseTube { tube, delay } => {
                with_tube(kw, tube, &format!(" {delay}"))
            },
        }
    }
}

/// Builds `"{kw} {tube}{tail}\r\n"`, keeping the tube name byte-for-byte.
fn with_tube(kw: &str, tube: &[u8], tail: &str) -> Vec<u8> {
    let mut line =
        Vec::with_capacity(kw.len() + 1 + tube.len() + tail.len() + 2);

    line.extend_from_slice(kw.as_bytes());
    line.push(b' ');
    line.extend_from_slice(tube);
    line.extend_from_slice(tail.as_bytes());
    line.extend_from_slice(b"\r\n");

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialise_command() {
        use Command::*;

        // Asserts the command serialises to exactly these bytes.
        #[track_caller]
        fn wire(cmd: Command, expect: &[u8]) {
            assert_eq!(cmd.serialise_beanstalk(), expect);
        }

        wire(
            Put {
                pri: 987,
                delay: 654,
                ttr: 321,
                data: Bytes::from_static(b"ab\r\ncd"),
            },
            b"put 987 654 321 6\r\nab\r\ncd\r\n",
        );
        wire(
            Put {
                pri: 0,
                delay: 0,
                ttr: 1,
                data: Bytes::new(),
            },
            b"put 0 0 1 0\r\n\r\n",
        );

        wire(Reserve, b"reserve\r\n");
        wire(
            ReserveWithTimeout { timeout: 0 },
            b"reserve-with-timeout 0\r\n",
        );
        wire(ReserveJob { id: 987 }, b"reserve-job 987\r\n");
        wire(Delete { id: u64::MAX }, b"delete 18446744073709551615\r\n");
        wire(
            Release {
                id: 987,
                pri: 654,
                delay: 321,
            },
            b"release 987 654 321\r\n",
        );
        wire(Bury { id: 543, pri: 987 }, b"bury 543 987\r\n");
        wire(Touch { id: 123 }, b"touch 123\r\n");

        wire(
            Watch {
                tube: b"hello_world".to_vec(),
            },
            b"watch hello_world\r\n",
        );
        wire(
            Ignore {
                tube: b"hello_world".to_vec(),
            },
            b"ignore hello_world\r\n",
        );
        wire(
            Use {
                tube: b"tube_name_here-098+/;.()-".to_vec(),
            },
            b"use tube_name_here-098+/;.()-\r\n",
        );

        wire(Peek { id: 987 }, b"peek 987\r\n");
        wire(PeekReady, b"peek-ready\r\n");
        wire(PeekDelayed, b"peek-delayed\r\n");
        wire(PeekBuried, b"peek-buried\r\n");

        wire(Kick { bound: 999 }, b"kick 999\r\n");
        wire(KickJob { id: 432 }, b"kick-job 432\r\n");

        wire(StatsJob { id: 432 }, b"stats-job 432\r\n");
        wire(
            StatsTube {
                tube: b"hello_world".to_vec(),
            },
            b"stats-tube hello_world\r\n",
        );
        wire(StatsServer, b"stats\r\n");

        wire(ListTubes, b"list-tubes\r\n");
        wire(ListTubeUsed, b"list-tube-used\r\n");
        wire(ListTubesWatched, b"list-tubes-watched\r\n");

        wire(Quit, b"quit\r\n");

        wire(
            PauseTube {
                tube: b"hello_world".to_vec(),
                delay: 62,
            },
            b"pause-tube hello_world 62\r\n",
        );
    }

    #[test]
    fn test_expectations() {
        use Command::*;

        let put = Put {
            pri: 0,
            delay: 0,
            ttr: 0,
            data: Bytes::new(),
        };
        // BURIED is a success for put and release, but not for delete.
        assert!(put.expectation().ok.contains(&"BURIED"));
        assert!(Release {
            id: 1,
            pri: 0,
            delay: 0
        }
        .expectation()
        .ok
        .contains(&"BURIED"));
        assert!(!Delete { id: 1 }.expectation().ok.contains(&"BURIED"));

        assert_eq!(Reserve.expectation().size_field, Some(1));
        assert_eq!(PeekBuried.expectation().size_field, Some(1));
        assert_eq!(ListTubes.expectation().size_field, Some(0));
        assert_eq!(StatsJob { id: 1 }.expectation().size_field, Some(0));
        assert_eq!(Touch { id: 1 }.expectation().size_field, None);

        assert_eq!(
            Ignore { tube: vec![] }.expectation().err,
            &["NOT_IGNORED"]
        );
        assert!(Watch { tube: vec![] }.expectation().err.is_empty());
    }
}
