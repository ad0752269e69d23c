use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Usage,
    OpenFailure,
    IndexBuildFailure,
    OutOfRange,
    InvalidLength,
    SeekMismatch,
    ShortRead,
    DecodeFailure,
    NotOpen,
    ReopenFailure,
    WriteFailure,
    Busy,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    path: Option<PathBuf>,
    line: Option<u64>,
    offset: Option<u64>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            path: None,
            line: None,
            offset: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Zero-based line number the error refers to, if any.
    pub fn line(&self) -> Option<u64> {
        self.line
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(line) = self.line {
            write!(f, " (line: {line})")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " (offset: {offset})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Usage => 2,
        ErrorKind::OpenFailure => 3,
        ErrorKind::IndexBuildFailure => 4,
        ErrorKind::OutOfRange => 5,
        ErrorKind::InvalidLength => 6,
        ErrorKind::SeekMismatch => 7,
        ErrorKind::ShortRead => 8,
        ErrorKind::DecodeFailure => 9,
        ErrorKind::NotOpen => 10,
        ErrorKind::ReopenFailure => 11,
        ErrorKind::WriteFailure => 12,
        ErrorKind::Busy => 13,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::collections::HashSet;
    use std::error::Error as _;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Usage, 2),
            (ErrorKind::OpenFailure, 3),
            (ErrorKind::IndexBuildFailure, 4),
            (ErrorKind::OutOfRange, 5),
            (ErrorKind::InvalidLength, 6),
            (ErrorKind::SeekMismatch, 7),
            (ErrorKind::ShortRead, 8),
            (ErrorKind::DecodeFailure, 9),
            (ErrorKind::NotOpen, 10),
            (ErrorKind::ReopenFailure, 11),
            (ErrorKind::WriteFailure, 12),
            (ErrorKind::Busy, 13),
        ];

        let mut seen = HashSet::new();
        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
            assert!(seen.insert(code), "duplicate exit code {code}");
        }
    }

    #[test]
    fn display_includes_context() {
        let err = Error::new(ErrorKind::ShortRead)
            .with_message("expected 12 bytes, got 4")
            .with_path("/tmp/data.csv")
            .with_line(3)
            .with_offset(40);
        assert_eq!(
            err.to_string(),
            "ShortRead: expected 12 bytes, got 4 (path: /tmp/data.csv) (line: 3) (offset: 40)"
        );
    }

    #[test]
    fn source_chain_is_exposed() {
        let io_err = std::io::Error::other("disk gone");
        let err = Error::new(ErrorKind::WriteFailure).with_source(io_err);
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "disk gone");
    }
}
