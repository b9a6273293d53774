use std::{fmt, io, num::{ParseFloatError, ParseIntError}, str::Utf8Error};
use quick_xml::events::attributes::AttrError;

use crate::data::osm::OsmId;

/// Broad class of a run-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Config,
    Cache,
    WriterFailure,
    AlreadyFlushed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "io",
            ErrorKind::Parse => "parse",
            ErrorKind::Config => "config",
            ErrorKind::Cache => "cache",
            ErrorKind::WriterFailure => "writer failure",
            ErrorKind::AlreadyFlushed => "already flushed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config, message)
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Cache, message)
    }

    pub fn already_flushed() -> Self {
        Error::new(ErrorKind::AlreadyFlushed, "Feature aggregator has already been flushed")
    }

    /// Re-labels any error raised while persisting features as a writer failure.
    pub fn into_writer_failure(self, destination: &str) -> Self {
        Error {
            kind: ErrorKind::WriterFailure,
            message: format!("Writing '{}' failed: {}", destination, self.message),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            message: value.to_string()
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            message: value.to_string()
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        let kind = if value.is_io() { ErrorKind::Io } else { ErrorKind::Parse };
        Error {
            kind,
            message: value.to_string()
        }
    }
}

impl From<ParseFloatError> for Error {
    fn from(value: ParseFloatError) -> Self {
        Error {
            kind: ErrorKind::Parse,
            message: value.to_string()
        }
    }
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        Error {
            kind: ErrorKind::Parse,
            message: value.to_string()
        }
    }
}

impl From<AttrError> for Error {
    fn from(value: AttrError) -> Self {
        Error {
            kind: ErrorKind::Parse,
            message: value.to_string()
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            message: value.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to turn a single way into a feature. The way is skipped, the run goes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WayError {
    MalformedWay { way_id: OsmId, reason: String },
    MissingNodeReference { way_id: OsmId, node_id: OsmId },
}

impl WayError {
    pub fn way_id(&self) -> OsmId {
        match self {
            WayError::MalformedWay { way_id, .. } => *way_id,
            WayError::MissingNodeReference { way_id, .. } => *way_id,
        }
    }
}

impl fmt::Display for WayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WayError::MalformedWay { way_id, reason } => {
                write!(f, "way {} is malformed: {}", way_id, reason)
            },
            WayError::MissingNodeReference { way_id, node_id } => {
                write!(f, "way {} references missing node {}", way_id, node_id)
            },
        }
    }
}

impl std::error::Error for WayError {}
