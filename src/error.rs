// src/error.rs
//
// Error types shared by the host interface and the node layer.

use thiserror::Error;

use crate::context::{ParamId, UnitId};

/// Errors reported by routing, scheduling and node construction.
///
/// None of these are fatal. Fluent node methods log them and carry on with
/// the rest of a batch; the `try_*` variants hand them back instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("cannot connect to node `{0}` with no inputs")]
    NoInputs(&'static str),

    #[error("node `{0}` has no outputs")]
    NoOutputs(&'static str),

    #[error("envelope `{0}` can only connect to parameters")]
    EnvelopeDestination(&'static str),

    #[error("invalid algorithm index {index} (expected 0..{count})")]
    InvalidAlgorithm { index: usize, count: usize },

    #[error("unknown unit {0:?}")]
    UnknownUnit(UnitId),

    #[error("unknown parameter {0:?}")]
    UnknownParam(ParamId),

    #[error("unit {unit:?} has no parameter named `{name}`")]
    NoSuchParam { unit: UnitId, name: String },

    #[error("{from:?} is not connected to {to}")]
    NotConnected { from: UnitId, to: String },

    #[error("{kind} does not support {setting}")]
    UnsupportedSetting {
        kind: &'static str,
        setting: &'static str,
    },

    #[error("{kind} has no {direction} port {index}")]
    PortOutOfRange {
        kind: &'static str,
        direction: &'static str,
        index: usize,
    },

    #[error("invalid note `{0}`")]
    InvalidNote(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure collected while routing one connect/disconnect call.
///
/// A batch destination keeps going after a failed branch, so a single call
/// can produce several of these.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} routing failure(s): {}", .failures.len(), summarize(.failures))]
pub struct RouteError {
    pub failures: Vec<Error>,
}

impl RouteError {
    /// `Ok(())` when nothing failed.
    pub fn check(failures: Vec<Error>) -> std::result::Result<(), RouteError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(RouteError { failures })
        }
    }
}

impl From<Error> for RouteError {
    fn from(err: Error) -> Self {
        RouteError {
            failures: vec![err],
        }
    }
}

fn summarize(failures: &[Error]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
