use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, info};

use crate::{
    action::Action,
    error::{EnvError, EvalError},
    layout::{LayoutError, parse_layout},
    reward::RewardFunction,
    state::State,
    terminating::TerminatingFunction,
    transition::TransitionFunction,
};

/// Produces the initial state of an episode.
pub trait ResetFunction {
    fn reset(&self, rng: &mut StdRng) -> Result<State, EnvError>;
}

impl<F> ResetFunction for F
where
    F: Fn(&mut StdRng) -> Result<State, EnvError>,
{
    fn reset(&self, rng: &mut StdRng) -> Result<State, EnvError> {
        self(rng)
    }
}

/// Starts every episode from the same state.
#[derive(Debug, Clone)]
pub struct FixedLayout {
    state: State,
}

impl FixedLayout {
    pub fn new(state: State) -> Self {
        FixedLayout { state }
    }

    /// Parses a text layout, see [`crate::layout`].
    pub fn parse(layout: &str) -> Result<Self, LayoutError> {
        parse_layout(layout).map(FixedLayout::new)
    }
}

impl ResetFunction for FixedLayout {
    fn reset(&self, _rng: &mut StdRng) -> Result<State, EnvError> {
        Ok(self.state.clone())
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub reward: f64,
    pub terminal: bool,
}

struct Dynamics {
    transition: Box<dyn TransitionFunction>,
    reward: Box<dyn RewardFunction>,
    terminating: Box<dyn TerminatingFunction>,
}

impl Dynamics {
    fn step(&self, state: &State, action: Action, rng: &mut StdRng) -> Result<(State, StepOutcome), EnvError> {
        let mut next_state = state.clone();
        self.transition.apply(&mut next_state, action, rng)?;
        // a transition must never commit the agent outside the grid
        next_state
            .grid
            .get(next_state.agent.position)
            .map_err(EvalError::from)?;

        let reward = self.reward.reward(state, action, &next_state)?;
        let terminal = self.terminating.is_terminal(state, action, &next_state)?;
        Ok((next_state, StepOutcome { reward, terminal }))
    }
}

/// Drives episodes: owns the current state and the random generator, and
/// sequences transition, reward and termination once per step.
pub struct Environment {
    reset_function: Box<dyn ResetFunction>,
    dynamics: Dynamics,
    rng: StdRng,
    state: Option<State>,
}

impl Environment {
    /// Creates an environment seeded from the OS; call [`Environment::set_seed`]
    /// for reproducible episodes.
    pub fn new(
        reset_function: Box<dyn ResetFunction>,
        transition: Box<dyn TransitionFunction>,
        reward: Box<dyn RewardFunction>,
        terminating: Box<dyn TerminatingFunction>,
    ) -> Self {
        Environment {
            reset_function,
            dynamics: Dynamics {
                transition,
                reward,
                terminating,
            },
            rng: StdRng::from_os_rng(),
            state: None,
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        info!(seed, "seeding environment");
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Starts a new episode.
    pub fn reset(&mut self) -> Result<&State, EnvError> {
        let state = self.reset_function.reset(&mut self.rng)?;
        info!(
            height = state.grid.height(),
            width = state.grid.width(),
            agent = %state.agent.position,
            "reset environment"
        );
        Ok(self.state.insert(state))
    }

    /// Advances the current episode by one action.
    ///
    /// On error the current state is left untouched.
    pub fn step(&mut self, action: Action) -> Result<StepOutcome, EnvError> {
        let state = self.state.as_ref().ok_or(EnvError::NotReset)?;
        let (next_state, outcome) = self.dynamics.step(state, action, &mut self.rng)?;
        debug!(
            ?action,
            agent = %next_state.agent.position,
            reward = outcome.reward,
            terminal = outcome.terminal,
            "step"
        );
        self.state = Some(next_state);
        Ok(outcome)
    }

    /// Computes the step from an arbitrary state without touching the
    /// current episode. Still draws from the environment's generator.
    pub fn functional_step(&mut self, state: &State, action: Action) -> Result<(State, StepOutcome), EnvError> {
        self.dynamics.step(state, action, &mut self.rng)
    }

    /// Current state, if the environment has been reset.
    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::Position,
        registry::FunctionSpec,
        reward::RewardRegistry,
        terminating::TerminatingRegistry,
        transition::{Chain, StepMovingObstacles, UpdateAgent},
    };

    const LAYOUT: &str = "
        WL WL WL WL WL
        WL AE .. .. WL
        WL .. MO .. WL
        WL .. .. E- WL
        WL WL WL WL WL
    ";

    fn environment() -> Environment {
        let transition = Chain::new(vec![Box::new(UpdateAgent), Box::new(StepMovingObstacles)]);
        let reward = RewardRegistry::with_builtins()
            .build_spec(&FunctionSpec::new("reach_exit"))
            .unwrap();
        let terminating = TerminatingRegistry::with_builtins()
            .build_spec(&FunctionSpec::new("reach_exit"))
            .unwrap();
        Environment::new(
            Box::new(FixedLayout::parse(LAYOUT).unwrap()),
            Box::new(transition),
            reward,
            terminating,
        )
    }

    #[test]
    fn step_before_reset_fails() {
        let mut env = environment();
        assert_eq!(env.step(Action::MoveForward), Err(EnvError::NotReset));
        assert!(env.state().is_none());
    }

    #[test]
    fn reaching_the_exit_terminates() {
        let mut env = environment();
        env.set_seed(3);
        env.reset().unwrap();

        let actions = [
            Action::MoveForward,
            Action::MoveForward,
            Action::TurnRight,
            Action::MoveForward,
            Action::MoveForward,
        ];
        let outcomes: Vec<StepOutcome> = actions.iter().map(|a| env.step(*a).unwrap()).collect();
        let last = outcomes.last().unwrap();
        assert_eq!(env.state().unwrap().agent.position, Position::new(3, 3));
        assert!(last.terminal);
        assert_eq!(last.reward, 1.0);
        assert!(outcomes[..4].iter().all(|o| !o.terminal && o.reward == 0.0));
    }

    #[test]
    fn same_seed_same_episode() {
        let actions = [
            Action::TurnLeft,
            Action::Actuate,
            Action::MoveRight,
            Action::TurnRight,
            Action::MoveBackward,
            Action::PickNDrop,
        ];
        let run = |seed| {
            let mut env = environment();
            env.set_seed(seed);
            env.reset().unwrap();
            actions
                .iter()
                .map(|a| {
                    let outcome = env.step(*a).unwrap();
                    (outcome, env.state().unwrap().clone())
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn functional_step_leaves_episode_untouched() {
        let mut env = environment();
        env.set_seed(0);
        let start = env.reset().unwrap().clone();

        let (next, _) = env.functional_step(&start, Action::MoveForward).unwrap();
        assert_eq!(next.agent.position, Position::new(1, 2));
        assert_eq!(env.state(), Some(&start));
    }

    #[test]
    fn reset_function_can_be_a_closure() {
        let mut env = Environment::new(
            Box::new(|_: &mut StdRng| -> Result<State, EnvError> { Ok(parse_layout("AN E-")?) }),
            Box::new(UpdateAgent),
            RewardRegistry::with_builtins()
                .build_spec(&FunctionSpec::new("living_reward"))
                .unwrap(),
            TerminatingRegistry::with_builtins()
                .build_spec(&FunctionSpec::new("reach_exit"))
                .unwrap(),
        );
        assert_eq!(env.reset().unwrap().agent.position, Position::new(0, 0));
        assert_eq!(
            env.step(Action::MoveRight).unwrap(),
            StepOutcome {
                reward: -1.0,
                terminal: true
            }
        );
    }
}
