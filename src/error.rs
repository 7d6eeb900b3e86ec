//! Error taxonomy for the harness.
//!
//! Every variant is fatal: the library propagates it and the binary exits
//! with a nonzero status. Nothing is retried or downgraded to a warning.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Malformed directive, bad scope token, illegal legacy scope, action on
    /// an output slot, unsupported `slot` value, bad run options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The resolved slot table is inconsistent with itself or with the
    /// supplied file bindings.
    #[error("validation error: {0}")]
    Validation(String),

    /// An action callback could not be resolved from the scoring module.
    #[error("callback error: slot {slot} callback '{name}' {problem}")]
    Callback { slot: usize, name: String, problem: CallbackProblem },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    #[error("decode error: slot {slot} line {line}: {source}")]
    Decode {
        slot: usize,
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode error: slot {slot}: {source}")]
    Encode {
        slot: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A user callback reported a failure while processing a record.
    #[error("action failed: slot {slot} record {seq}: {message}")]
    ActionFailed { slot: usize, seq: u64, message: String },

    /// The scoring module misused a slot capability.
    #[error("capability error: {0}")]
    Capability(String),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a named callback was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackProblem {
    NotFound,
    NotCallable,
    Arity(usize),
}

impl fmt::Display for CallbackProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackProblem::NotFound => f.write_str("not found"),
            CallbackProblem::NotCallable => f.write_str("must be a function"),
            CallbackProblem::Arity(n) => write!(f, "must have arity 1, 2, or 3 (not {n})"),
        }
    }
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_messages_name_slot_and_function() {
        let err = HarnessError::Callback { slot: 2, name: "score".into(), problem: CallbackProblem::Arity(4) };
        assert_eq!(err.to_string(), "callback error: slot 2 callback 'score' must have arity 1, 2, or 3 (not 4)");
    }
}
