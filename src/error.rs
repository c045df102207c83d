//! Error types.
//!
//! Request validation never produces these: parameter problems are collected
//! as [`crate::Issues`]. Only the engine boundary, the disambiguator process
//! and startup configuration fail with typed errors.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a morphological engine or its dictionary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot read dictionary {path}: {source}")]
    DictionaryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dictionary {origin}, line {line}: {reason}")]
    DictionaryFormat { origin: String, line: usize, reason: String },

    #[error("engine option {key} has an unexpected value")]
    InvalidOption { key: &'static str },
}

/// Failures of the auxiliary disambiguation process.
#[derive(Debug, Error)]
pub enum DisambError {
    #[error("cannot start disambiguator {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("disambiguator i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("disambiguator is not running")]
    NotRunning,

    #[error("disambiguator exited unexpectedly")]
    Exited,

    #[error("disambiguator did not answer within {0:?}")]
    Timeout(Duration),

    #[error("disambiguator protocol violation: {0}")]
    Protocol(String),
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {value:?} in {var}")]
    InvalidBind { var: &'static str, value: String },

    #[error("invalid timeout {value:?} in {var} (expected whole seconds > 0)")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Anything that can go wrong once a request has passed validation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Disambiguation(#[from] DisambError),

    #[error("request did not complete within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Panic(String),

    #[error("{0}")]
    Body(String),
}

impl ServiceError {
    /// Short failure-kind name reported in front of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Engine(_) => "EngineError",
            ServiceError::Disambiguation(_) => "DisambiguationError",
            ServiceError::Timeout(_) => "Timeout",
            ServiceError::Panic(_) => "Panic",
            ServiceError::Body(_) => "BodyError",
        }
    }

    /// The single `errors` entry describing this failure.
    pub fn report(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
