//! Implements a parser for beanstalkd reply lines.
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParsingError {
    /// The reply line held no tokens at all.
    EmptyLine,
    /// The argument at this index was absent.
    MissingArgument(usize),
    /// The argument at this index was not a decimal number in range.
    BadNumber(usize),
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::EmptyLine => f.write_str("empty reply line"),
            Self::MissingArgument(idx) => write!(f, "missing argument {idx}"),
            Self::BadNumber(idx) => write!(f, "argument {idx} is not a number"),
        }
    }
}

impl std::error::Error for ParsingError {}

/// Provides a custom, minimal, zero-copy tokenizer of byte slices.
struct ParseState<'a> {
    from: &'a [u8],
}

impl<'a> ParseState<'a> {
    /// Consumes leading whitespace, then everything up to the next whitespace
    /// byte or the end of the input. Returns None once only whitespace is left.
    fn next_token(&mut self) -> Option<&'a [u8]> {
        let start = self
            .from
            .iter()
            .position(|c| !c.is_ascii_whitespace())?;
        let rest = &self.from[start..];

        let len = rest
            .iter()
            .position(|c| c.is_ascii_whitespace())
            .unwrap_or(rest.len());

        self.from = &rest[len..];

        Some(&rest[..len])
    }
}

impl<'a> From<&'a [u8]> for ParseState<'a> {
    fn from(from: &'a [u8]) -> Self {
        ParseState { from }
    }
}

impl<'a> Iterator for ParseState<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// A reply line split into its status word and argument tokens.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseLine {
    pub status: String,
    pub args: Vec<String>,
}

impl ResponseLine {
    /// The argument at `idx`, verbatim.
    pub fn arg(&self, idx: usize) -> Result<&str, ParsingError> {
        self.args
            .get(idx)
            .map(String::as_str)
            .ok_or(ParsingError::MissingArgument(idx))
    }

    /// The argument at `idx` as an unsigned decimal. Signs, blanks and values
    /// that overflow are rejected.
    pub fn arg_u64(&self, idx: usize) -> Result<u64, ParsingError> {
        let token = self.arg(idx)?;

        let mut r = 0u64;
        for v in token.bytes() {
            match v {
                b'0'..=b'9' => {
                    r = r
                        .checked_mul(10)
                        .ok_or(ParsingError::BadNumber(idx))?
                        .checked_add((v - b'0') as u64)
                        .ok_or(ParsingError::BadNumber(idx))?
                },
                _ => return Err(ParsingError::BadNumber(idx)),
            };
        }

        Ok(r)
    }

    pub fn arg_u32(&self, idx: usize) -> Result<u32, ParsingError> {
        u32::try_from(self.arg_u64(idx)?)
            .map_err(|_| ParsingError::BadNumber(idx))
    }

    pub fn arg_usize(&self, idx: usize) -> Result<usize, ParsingError> {
        usize::try_from(self.arg_u64(idx)?)
            .map_err(|_| ParsingError::BadNumber(idx))
    }
}

// Parsing is implemented to fulfil the TryFrom trait.
impl TryFrom<&[u8]> for ResponseLine {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let mut ps: ParseState = value.into();

        let status = ps.next_token().ok_or(ParsingError::EmptyLine)?;

        Ok(ResponseLine {
            status: String::from_utf8_lossy(status).into_owned(),
            args: ps
                .map(|t| String::from_utf8_lossy(t).into_owned())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        // Asserts the line parses into the given status and arguments.
        #[track_caller]
        fn ok(line: &[u8], status: &str, args: &[&str]) {
            assert_eq!(
                ResponseLine::try_from(line),
                Ok(ResponseLine {
                    status: status.into(),
                    args: args.iter().map(|a| a.to_string()).collect(),
                })
            );
        }

        ok(b"DELETED", "DELETED", &[]);
        ok(b"INSERTED 42", "INSERTED", &["42"]);
        ok(b"RESERVED 7 1024", "RESERVED", &["7", "1024"]);
        ok(b"USING tube_name-098+/;.()", "USING", &["tube_name-098+/;.()"]);
        // Runs of whitespace separate tokens like a single space does.
        ok(b"  FOUND \t 3   12 ", "FOUND", &["3", "12"]);

        assert_eq!(
            ResponseLine::try_from(&b""[..]),
            Err(ParsingError::EmptyLine)
        );
        assert_eq!(
            ResponseLine::try_from(&b"   "[..]),
            Err(ParsingError::EmptyLine)
        );
    }

    #[test]
    fn test_numeric_arguments() {
        let line: &[u8] =
            b"X 18446744073709551615 18446744073709551616 -1 12a 4294967296";
        let line = ResponseLine::try_from(line).unwrap();

        assert_eq!(line.arg_u64(0), Ok(u64::MAX));
        assert_eq!(line.arg_u64(1), Err(ParsingError::BadNumber(1)));
        assert_eq!(line.arg_u64(2), Err(ParsingError::BadNumber(2)));
        assert_eq!(line.arg_u64(3), Err(ParsingError::BadNumber(3)));
        assert_eq!(line.arg_u32(4), Err(ParsingError::BadNumber(4)));
        assert_eq!(line.arg_u64(4), Ok(4_294_967_296));
        assert_eq!(line.arg_usize(5), Err(ParsingError::MissingArgument(5)));
        assert_eq!(line.arg(5), Err(ParsingError::MissingArgument(5)));
    }
}
