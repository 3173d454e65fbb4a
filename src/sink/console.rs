//! Console output

use std::io::{self, Write};
use std::str::FromStr;

use super::Sink;
use crate::error::LogError;
use crate::record::Record;

/// Standard stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stream {
    #[default]
    Stdout,
    Stderr,
}

impl FromStr for Stream {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" | "ext://sys.stdout" => Ok(Stream::Stdout),
            "stderr" | "ext://sys.stderr" => Ok(Stream::Stderr),
            other => Err(LogError::invalid_param(
                "console",
                "stream",
                format!("expected stdout or stderr, got {:?}", other),
            )),
        }
    }
}

/// Writes each record as a line on stdout or stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    stream: Stream,
}

impl ConsoleSink {
    pub fn new(stream: Stream) -> Self {
        Self { stream }
    }

    pub fn stdout() -> Self {
        Self::new(Stream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(Stream::Stderr)
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }
}

impl Sink for ConsoleSink {
    fn write_line(&self, _record: &Record, line: &str) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => writeln!(io::stdout().lock(), "{}", line),
            Stream::Stderr => writeln!(io::stderr().lock(), "{}", line),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => io::stdout().flush(),
            Stream::Stderr => io::stderr().flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream() {
        assert_eq!("stdout".parse::<Stream>().unwrap(), Stream::Stdout);
        assert_eq!("STDERR".parse::<Stream>().unwrap(), Stream::Stderr);
        assert_eq!("ext://sys.stdout".parse::<Stream>().unwrap(), Stream::Stdout);
        assert!("stdin".parse::<Stream>().is_err());
    }

    #[test]
    fn test_default_is_stdout() {
        assert_eq!(ConsoleSink::default().stream(), Stream::Stdout);
    }
}
