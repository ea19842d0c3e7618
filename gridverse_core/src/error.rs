use crate::{layout::LayoutError, map::GridError, object::ObjectKind};

/// Failures while evaluating a transition, reward or terminating function.
///
/// These indicate a malformed environment (e.g. a reward that needs a unique
/// Exit on a grid without one) and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("expected exactly one {kind} in the grid, found {count}")]
    ObjectNotUnique { kind: ObjectKind, count: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Failures while building functions from their names and parameters.
///
/// Raised eagerly, before any simulation step runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown {family} function `{name}`")]
    UnknownFunction { family: &'static str, name: String },
    #[error("{family} function `{name}` is already registered")]
    DuplicateFunction { family: &'static str, name: String },
    #[error("missing parameter `{key}` for function `{function}`")]
    MissingParameter { function: String, key: String },
    #[error("unrecognized parameters for function `{function}`: {}", .keys.join(", "))]
    UnrecognizedParameter { function: String, keys: Vec<String> },
    #[error("invalid parameter `{key}` for function `{function}`: {reason}")]
    InvalidParameter {
        function: String,
        key: String,
        reason: String,
    },
    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),
}

/// Failures surfaced by the environment driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    #[error("the environment has no state; was it reset?")]
    NotReset,
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
