//! Grid-world state transitions and rewards.
//!
//! An agent moves on a grid of typed objects. Each step applies a
//! [`TransitionFunction`] to the [`State`], then scores the transition with a
//! [`RewardFunction`] and checks a [`TerminatingFunction`]. All three are
//! built by name from a [`FunctionRegistry`].

pub mod action;
pub mod agent;
pub mod config;
pub mod distance;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod map;
pub mod object;
pub mod registry;
pub mod reward;
pub mod state;
pub mod terminating;
pub mod transition;

pub use action::Action;
pub use agent::Agent;
pub use config::{EnvironmentConfig, Registries};
pub use environment::{Environment, StepOutcome};
pub use error::{ConfigError, EnvError, EvalError};
pub use geometry::{Orientation, Position};
pub use map::Grid;
pub use object::{Color, DoorState, GridObject, ObjectKind};
pub use registry::{FunctionRegistry, FunctionSpec};
pub use reward::RewardFunction;
pub use state::State;
pub use terminating::TerminatingFunction;
pub use transition::TransitionFunction;
