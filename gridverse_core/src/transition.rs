//! State dynamics.
//!
//! A transition function mutates a [`State`] in place given the agent's
//! action. Actions that have no effect in context (turning into nothing,
//! actuating a wall, walking into a closed door) leave the state untouched
//! rather than failing.

use rand::{rngs::StdRng, seq::IndexedRandom};
use tracing::trace;

use crate::{
    action::{Action, intended_position},
    error::{ConfigError, EvalError},
    geometry::{Position, manhattan_boundary},
    object::{DoorState, GridObject, ObjectKind},
    registry::{FunctionRegistry, Signature},
    state::State,
};

pub trait TransitionFunction {
    /// Applies the effect of `action` to `state`.
    ///
    /// Stochastic dynamics draw from `rng` only, so that a seeded generator
    /// reproduces the same sequence of states.
    fn apply(&self, state: &mut State, action: Action, rng: &mut StdRng) -> Result<(), EvalError>;
}

impl<F> TransitionFunction for F
where
    F: Fn(&mut State, Action, &mut StdRng) -> Result<(), EvalError>,
{
    fn apply(&self, state: &mut State, action: Action, rng: &mut StdRng) -> Result<(), EvalError> {
        self(state, action, rng)
    }
}

pub type TransitionRegistry = FunctionRegistry<dyn TransitionFunction>;

/// Runs several transition functions in order.
pub struct Chain {
    functions: Vec<Box<dyn TransitionFunction>>,
}

impl Chain {
    pub fn new(functions: Vec<Box<dyn TransitionFunction>>) -> Self {
        Chain { functions }
    }
}

impl TransitionFunction for Chain {
    fn apply(&self, state: &mut State, action: Action, rng: &mut StdRng) -> Result<(), EvalError> {
        for function in &self.functions {
            function.apply(state, action, rng)?;
        }
        Ok(())
    }
}

/// Turns the agent on rotation actions and moves it on move actions.
///
/// A move is committed only if the intended cell is inside the grid and does
/// not block movement.
pub struct UpdateAgent;

impl TransitionFunction for UpdateAgent {
    fn apply(&self, state: &mut State, action: Action, _rng: &mut StdRng) -> Result<(), EvalError> {
        let agent = &mut state.agent;
        match action {
            Action::TurnLeft => agent.orientation = agent.orientation.rotate_left(),
            Action::TurnRight => agent.orientation = agent.orientation.rotate_right(),
            _ if action.is_move() => {
                let next = intended_position(agent.position, agent.orientation, action);
                if state.grid.get(next).is_ok_and(|obj| !obj.blocks_movement()) {
                    agent.position = next;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Picks up and drops objects in front of the agent.
///
/// - a portable object in front is picked up; if the agent already holds
///   something, the two are swapped;
/// - otherwise, a held object is dropped onto a Floor cell in front;
/// - anything else is a no-op.
pub struct PickupMechanics;

impl TransitionFunction for PickupMechanics {
    fn apply(&self, state: &mut State, action: Action, _rng: &mut StdRng) -> Result<(), EvalError> {
        if action != Action::PickNDrop {
            return Ok(());
        }

        let front = state.agent.front_position();
        let Ok(&in_front) = state.grid.get(front) else {
            return Ok(());
        };

        let can_pickup = in_front.can_be_picked_up();
        let can_drop = can_pickup || in_front == GridObject::Floor;
        if !can_pickup && !can_drop {
            return Ok(());
        }

        let left_behind = match state.agent.held {
            Some(held) if can_drop => held,
            _ => GridObject::Floor,
        };
        state.grid.set(front, left_behind)?;
        state.agent.held = can_pickup.then_some(in_front);
        Ok(())
    }
}

/// Moves every MovingObstacle one step at random.
///
/// Each obstacle moves at most once per step, onto a uniformly chosen
/// adjacent Floor cell, and stays put if there is none.
pub struct StepMovingObstacles;

impl TransitionFunction for StepMovingObstacles {
    fn apply(&self, state: &mut State, _action: Action, rng: &mut StdRng) -> Result<(), EvalError> {
        // obstacles only swap with Floor, so collected positions stay valid
        let obstacles: Vec<Position> = state.grid.positions_of(ObjectKind::MovingObstacle).collect();

        for position in obstacles {
            let candidates: Vec<Position> = manhattan_boundary(position, 1)
                .into_iter()
                .filter(|p| matches!(state.grid.get(*p), Ok(GridObject::Floor)))
                .collect();

            if let Some(&next) = candidates.choose(rng) {
                trace!(from = %position, to = %next, "moving obstacle");
                state.grid.swap(position, next)?;
            }
        }
        Ok(())
    }
}

/// Opens and closes the door in front of the agent.
///
/// Closed doors open and open doors close. Locked doors open only while the
/// agent holds a key of the door's color; the key is used up when
/// `consume_key` is set.
pub struct ActuateDoor {
    pub consume_key: bool,
}

impl TransitionFunction for ActuateDoor {
    fn apply(&self, state: &mut State, action: Action, _rng: &mut StdRng) -> Result<(), EvalError> {
        if action != Action::Actuate {
            return Ok(());
        }

        let front = state.agent.front_position();
        let Ok(&GridObject::Door {
            state: door_state,
            color,
        }) = state.grid.get(front)
        else {
            return Ok(());
        };

        let next_state = match door_state {
            DoorState::Open => DoorState::Closed,
            DoorState::Closed => DoorState::Open,
            DoorState::Locked => match state.agent.held {
                Some(GridObject::Key { color: key_color }) if key_color == color => {
                    if self.consume_key {
                        state.agent.held = None;
                    }
                    DoorState::Open
                }
                _ => return Ok(()),
            },
        };

        trace!(at = %front, from = ?door_state, to = ?next_state, "actuating door");
        state.grid.set(
            front,
            GridObject::Door {
                state: next_state,
                color,
            },
        )?;
        Ok(())
    }
}

/// Teleports the agent when it stands on a Telepod.
///
/// The destination is a uniformly chosen other Telepod of the same color; with
/// no such Telepod the agent stays.
pub struct StepTelepod;

impl TransitionFunction for StepTelepod {
    fn apply(&self, state: &mut State, _action: Action, rng: &mut StdRng) -> Result<(), EvalError> {
        let here = state.agent.position;
        let telepod = *state.grid.get(here)?;
        if !telepod.is(ObjectKind::Telepod) {
            return Ok(());
        }

        let destinations: Vec<Position> = state
            .grid
            .enumerate()
            .filter(|(position, obj)| *position != here && **obj == telepod)
            .map(|(position, _)| position)
            .collect();

        if let Some(&destination) = destinations.choose(rng) {
            trace!(from = %here, to = %destination, "teleporting agent");
            state.agent.position = destination;
        }
        Ok(())
    }
}

fn boxed<T: TransitionFunction + 'static>(function: T) -> Result<Box<dyn TransitionFunction>, ConfigError> {
    Ok(Box::new(function))
}

impl FunctionRegistry<dyn TransitionFunction> {
    /// Registry holding every built-in transition function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new("transition");
        registry
            .register_builtins()
            .expect("built-in transition names are unique");
        registry
    }

    fn register_builtins(&mut self) -> Result<(), ConfigError> {
        self.register(
            "chain",
            Signature::new(&["transition_functions"], &[]),
            |args, registry| {
                let functions = registry.build_all(args.functions("transition_functions")?)?;
                boxed(Chain::new(functions))
            },
        )?;
        self.register("update_agent", Signature::NONE, |_, _| boxed(UpdateAgent))?;
        self.register("pickup_mechanics", Signature::NONE, |_, _| boxed(PickupMechanics))?;
        self.register("step_moving_obstacles", Signature::NONE, |_, _| {
            boxed(StepMovingObstacles)
        })?;
        self.register(
            "actuate_door",
            Signature::new(&[], &["consume_key"]),
            |args, _| {
                boxed(ActuateDoor {
                    consume_key: args.flag("consume_key", false)?,
                })
            },
        )?;
        self.register("step_telepod", Signature::NONE, |_, _| boxed(StepTelepod))?;
        Ok(())
    }
}
