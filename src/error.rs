use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Config,
    Load,
    Resolve,
    Synthesize,
    Render,
    Write,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Config => "config",
            Phase::Load => "load",
            Phase::Resolve => "resolve",
            Phase::Synthesize => "synthesize",
            Phase::Render => "render",
            Phase::Write => "write",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StubError {
    /// The input package could not be read, parsed or type-resolved.
    #[error("cannot load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("interface {name} not found in {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    #[error("found duplicate interface {name} in package {first} and {second}")]
    Duplicate {
        name: String,
        first: String,
        second: String,
    },

    #[error("unsupported type {what} in {context}")]
    UnsupportedType { what: String, context: String },

    /// The synthesized syntax tree is malformed.
    #[error("cannot render generated code: {0}")]
    Render(String),

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl StubError {
    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        StubError::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(what: impl Into<String>, context: impl Into<String>) -> Self {
        StubError::UnsupportedType {
            what: what.into(),
            context: context.into(),
        }
    }

    /// Tags the error with the phase it was raised in.
    #[inline]
    pub fn at(self, phase: Phase) -> Error {
        Error {
            phase,
            source: self,
        }
    }
}

/// Phase-tagged generator error.
#[derive(Debug, Error)]
#[error("{phase}: {source}")]
pub struct Error {
    pub phase: Phase,
    #[source]
    pub source: StubError,
}

impl Error {
    pub fn kind(&self) -> &StubError {
        &self.source
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
