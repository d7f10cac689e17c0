use std::io;

use bytes::{Buf, Bytes, BytesMut};
use itertools::Itertools;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads CRLF-terminated reply lines, and the length-prefixed bodies that
/// follow some of them, from a stream.
///
/// Lines and bodies share one buffer, so a body that arrives in the same read
/// as its header line is never lost.
pub struct LineReader<T: AsyncRead + Unpin> {
    /// Stores data that's been read in but not yet handed out.
    buf: BytesMut,
    /// Index in buf from which a valid CRLF pair may appear (and before which
    /// a CRLF sequence hasn't been seen).
    maybe_crlf_from: usize,
    /// Data source
    reader: T,
    /// On a reading error, this field is set and its value returned once the
    /// buffer is drained of pending lines.
    pending_error: Option<io::Error>,
}

impl<T: AsyncRead + Unpin> LineReader<T> {
    /// Reads a line from the internal buffer and/or reader, without its CRLF.
    /// On an end-of-stream condition, returns a None result, discarding any
    /// partly-read line in the internal buffer.
    ///
    /// On a read error, the error value is returned after processing all
    /// pending lines in the internal buffer.
    pub async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            // Scan from one byte before the newest data in case a \r arrived
            // at the end of the previous read and its \n in this one.
            if let Some(eol) = self
                .buf
                .iter()
                .skip(self.maybe_crlf_from)
                .tuple_windows::<(_, _)>()
                .position(|x| x == (&b'\r', &b'\n'))
            {
                let line =
                    self.buf.split_to(self.maybe_crlf_from + eol + 2).freeze();

                // Drop trailing b"\r\n".
                let line = line.slice(0..line.len() - 2);

                self.maybe_crlf_from = 0;

                return Ok(Some(line));
            }

            let n_bytes_read = self.fill().await;

            // Set maybe_crlf_from to the byte before the first byte returned
            // by this read (and 0 if buf is empty).
            self.maybe_crlf_from =
                self.buf.len().checked_sub(n_bytes_read + 1).unwrap_or(0);

            // Zero bytes read means end-of-stream: we can't parse out another
            // line, so surface any pending error or report the end.
            if n_bytes_read == 0 {
                return match self.pending_error.take() {
                    Some(e) => Err(e),
                    None => Ok(None),
                };
            }
        }
    }

    /// Reads a body of exactly `len` bytes followed by a two-byte terminator,
    /// which is discarded unchecked.
    ///
    /// Reaching end-of-stream before all `len + 2` bytes arrive is an
    /// [UnexpectedEof](io::ErrorKind::UnexpectedEof) error, and a `len` with
    /// no room for the terminator is [InvalidData](io::ErrorKind::InvalidData).
    pub async fn read_body(&mut self, len: usize) -> io::Result<Bytes> {
        let Some(want) = len.checked_add(2) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("body length {len} out of range"),
            ));
        };

        while self.buf.len() < want {
            if self.fill().await == 0 {
                return Err(self.pending_error.take().unwrap_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "stream ended {} bytes into a {len} byte body",
                            self.buf.len()
                        ),
                    )
                }));
            }
        }

        let body = self.buf.split_to(len).freeze();
        self.buf.advance(2);

        // Everything before here has been consumed.
        self.maybe_crlf_from = 0;

        Ok(body)
    }

    /// Reads once from the underlying reader into the buffer, returning the
    /// number of bytes read. A read error is parked in `pending_error` and
    /// reported as a zero-length read.
    async fn fill(&mut self) -> usize {
        match self.reader.read_buf(&mut self.buf).await {
            Ok(n) => n,
            Err(e) => {
                self.pending_error = Some(e);
                0
            },
        }
    }
}

impl<T: AsyncRead + Unpin> From<T> for LineReader<T> {
    fn from(value: T) -> Self {
        Self {
            buf: BytesMut::new(),
            maybe_crlf_from: 0,
            reader: value,
            pending_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{self, AsyncWriteExt};
    use tokio::task::yield_now;

    /// Writes each chunk separately so reads are fragmented at the chunk
    /// boundaries, then closes the stream.
    fn feed(chunks: &[&[u8]]) -> LineReader<io::DuplexStream> {
        let chunks: Vec<Vec<u8>> = chunks.iter().map(|c| c.to_vec()).collect();
        let (mut broker, client) = io::duplex(4096);

        tokio::spawn(async move {
            for buf in chunks {
                broker.write_all(&buf).await.unwrap();
                yield_now().await;
            }
        });

        client.into()
    }

    #[tokio::test]
    async fn test_lines() {
        // When properly read, each nth line should read b"test:{n}".
        let chunks: &[&[u8]] = &[
            // Simple reassembly
            b"test:",
            b"1\r\n",
            // Split LF
            b"test:",
            b"2\r",
            b"\n",
            // Split CRLF
            b"test:",
            b"3",
            b"\r",
            b"\n",
            // Pipelined replies
            b"test:4\r\ntest:5\r\n",
            b"test:6\r",
            b"\ntest:7\r\n",
            b"test:8",
            b"\r\ntest:9\r\n",
        ];
        let mut lr = feed(chunks);

        for n in 1..=9 {
            assert_eq!(
                lr.read_line().await.unwrap().unwrap(),
                format!("test:{n}")
            );
        }

        assert!(lr.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bodies() {
        let chunks: &[&[u8]] = &[
            // Body in the same read as its header
            b"RESERVED 1 5\r\nhello\r\n",
            // Body split across reads, containing a CRLF of its own
            b"FOUND 2 6\r\n",
            b"ab\r",
            b"\ncd\r",
            b"\n",
            // Empty body
            b"OK 0\r\n\r\nUSING default\r\n",
        ];
        let mut lr = feed(chunks);

        assert_eq!(lr.read_line().await.unwrap().unwrap(), "RESERVED 1 5");
        assert_eq!(lr.read_body(5).await.unwrap(), "hello");

        assert_eq!(lr.read_line().await.unwrap().unwrap(), "FOUND 2 6");
        assert_eq!(lr.read_body(6).await.unwrap(), "ab\r\ncd");

        assert_eq!(lr.read_line().await.unwrap().unwrap(), "OK 0");
        assert_eq!(lr.read_body(0).await.unwrap(), "");

        assert_eq!(lr.read_line().await.unwrap().unwrap(), "USING default");
        assert!(lr.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let chunks: &[&[u8]] = &[b"RESERVED 1 10\r\n", b"short"];
        let mut lr = feed(chunks);

        assert_eq!(lr.read_line().await.unwrap().unwrap(), "RESERVED 1 10");

        let err = lr.read_body(10).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_body_length_overflow() {
        let mut lr = feed(&[b"RESERVED 1 18446744073709551615\r\n" as &[u8]]);

        assert!(lr.read_line().await.unwrap().is_some());

        let err = lr.read_body(usize::MAX).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_partial_line_at_eos() {
        let mut lr = feed(&[b"INSERTED 1\r\nINSERT" as &[u8]]);

        assert_eq!(lr.read_line().await.unwrap().unwrap(), "INSERTED 1");
        assert!(lr.read_line().await.unwrap().is_none());
    }
}
