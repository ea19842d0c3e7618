//! JSON environment configuration.
//!
//! ```json
//! {
//!   "layout": ["WL WL WL", "WL AE E-", "WL WL WL"],
//!   "seed": 7,
//!   "transition_functions": [{"name": "update_agent"}, {"name": "actuate_door"}],
//!   "reward_function": {"name": "reach_exit"},
//!   "terminating_function": {"name": "reach_exit"}
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    environment::{Environment, FixedLayout},
    error::ConfigError,
    registry::FunctionSpec,
    reward::RewardRegistry,
    terminating::TerminatingRegistry,
    transition::{Chain, TransitionFunction, TransitionRegistry},
};

/// The three function registries an environment is built from.
///
/// Custom functions are registered here before calling
/// [`EnvironmentConfig::build`].
pub struct Registries {
    pub transitions: TransitionRegistry,
    pub rewards: RewardRegistry,
    pub terminating: TerminatingRegistry,
}

impl Default for Registries {
    fn default() -> Self {
        Registries {
            transitions: TransitionRegistry::with_builtins(),
            rewards: RewardRegistry::with_builtins(),
            terminating: TerminatingRegistry::with_builtins(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Layout rows, see [`crate::layout`].
    #[serde(default)]
    pub layout: Vec<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Applied in order on every step.
    pub transition_functions: Vec<FunctionSpec>,
    pub reward_function: FunctionSpec,
    pub terminating_function: FunctionSpec,
}

impl EnvironmentConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Replaces the layout with the rows of a text layout.
    pub fn set_layout(&mut self, layout: &str) {
        self.layout = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Validates every function and the layout, then builds the environment.
    ///
    /// Nothing is evaluated here: all configuration errors surface before
    /// the first step.
    pub fn build(&self, registries: &Registries) -> Result<Environment, ConfigError> {
        let reset = FixedLayout::parse(&self.layout.join("\n"))?;

        let mut transitions = registries.transitions.build_all(&self.transition_functions)?;
        let transition: Box<dyn TransitionFunction> = if transitions.len() == 1 {
            transitions.remove(0)
        } else {
            Box::new(Chain::new(transitions))
        };
        let reward = registries.rewards.build_spec(&self.reward_function)?;
        let terminating = registries.terminating.build_spec(&self.terminating_function)?;

        info!(
            transitions = self.transition_functions.len(),
            reward = %self.reward_function.name,
            terminating = %self.terminating_function.name,
            "built environment"
        );
        let mut env = Environment::new(Box::new(reset), transition, reward, terminating);
        if let Some(seed) = self.seed {
            env.set_seed(seed);
        }
        Ok(env)
    }
}
