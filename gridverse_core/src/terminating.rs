//! Terminating functions decide whether a transition ends the episode.

use std::str::FromStr;

use crate::{
    action::{Action, intended_position},
    error::{ConfigError, EvalError},
    object::{GridObject, ObjectKind},
    registry::{FunctionRegistry, Signature},
    state::State,
};

pub trait TerminatingFunction {
    fn is_terminal(&self, state: &State, action: Action, next_state: &State) -> Result<bool, EvalError>;
}

impl<F> TerminatingFunction for F
where
    F: Fn(&State, Action, &State) -> Result<bool, EvalError>,
{
    fn is_terminal(&self, state: &State, action: Action, next_state: &State) -> Result<bool, EvalError> {
        self(state, action, next_state)
    }
}

pub type TerminatingRegistry = FunctionRegistry<dyn TerminatingFunction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolReduction {
    Any,
    All,
}

impl BoolReduction {
    /// Short-circuits: `Any` stops at the first `true`, `All` at the first
    /// `false`. Empty input gives `false` for `Any` and `true` for `All`.
    pub fn reduce<I>(self, values: I) -> Result<bool, EvalError>
    where
        I: IntoIterator<Item = Result<bool, EvalError>>,
    {
        let stop_on = self == BoolReduction::Any;
        for value in values {
            if value? == stop_on {
                return Ok(stop_on);
            }
        }
        Ok(!stop_on)
    }
}

impl FromStr for BoolReduction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(BoolReduction::Any),
            "all" => Ok(BoolReduction::All),
            other => Err(format!("unknown reduction '{other}', expected 'any' or 'all'")),
        }
    }
}

pub struct Reduce {
    functions: Vec<Box<dyn TerminatingFunction>>,
    reduction: BoolReduction,
}

impl Reduce {
    pub fn new(functions: Vec<Box<dyn TerminatingFunction>>, reduction: BoolReduction) -> Self {
        Reduce {
            functions,
            reduction,
        }
    }
}

impl TerminatingFunction for Reduce {
    fn is_terminal(&self, state: &State, action: Action, next_state: &State) -> Result<bool, EvalError> {
        self.reduction.reduce(
            self.functions
                .iter()
                .map(|function| function.is_terminal(state, action, next_state)),
        )
    }
}

/// Terminal once the agent stands on an object of `kind`.
pub struct Overlap {
    pub kind: ObjectKind,
}

impl TerminatingFunction for Overlap {
    fn is_terminal(&self, _state: &State, _action: Action, next_state: &State) -> Result<bool, EvalError> {
        Ok(next_state.object_under_agent()?.is(self.kind))
    }
}

/// Terminal when the attempted move targets a Wall.
pub struct BumpIntoWall;

impl TerminatingFunction for BumpIntoWall {
    fn is_terminal(&self, state: &State, action: Action, _next_state: &State) -> Result<bool, EvalError> {
        let attempted = intended_position(state.agent.position, state.agent.orientation, action);
        Ok(matches!(state.grid.get(attempted), Ok(GridObject::Wall)))
    }
}

fn boxed<T: TerminatingFunction + 'static>(
    function: T,
) -> Result<Box<dyn TerminatingFunction>, ConfigError> {
    Ok(Box::new(function))
}

impl FunctionRegistry<dyn TerminatingFunction> {
    /// Registry holding every built-in terminating function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new("terminating");
        registry
            .register_builtins()
            .expect("built-in terminating names are unique");
        registry
    }

    fn register_builtins(&mut self) -> Result<(), ConfigError> {
        self.register(
            "reduce",
            Signature::new(&["terminating_functions", "reduction"], &[]),
            |args, registry| {
                let functions = registry.build_all(args.functions("terminating_functions")?)?;
                boxed(Reduce::new(functions, args.parse("reduction")?))
            },
        )?;
        self.register(
            "reduce_any",
            Signature::new(&["terminating_functions"], &[]),
            |args, registry| {
                let functions = registry.build_all(args.functions("terminating_functions")?)?;
                boxed(Reduce::new(functions, BoolReduction::Any))
            },
        )?;
        self.register(
            "reduce_all",
            Signature::new(&["terminating_functions"], &[]),
            |args, registry| {
                let functions = registry.build_all(args.functions("terminating_functions")?)?;
                boxed(Reduce::new(functions, BoolReduction::All))
            },
        )?;
        self.register("overlap", Signature::new(&["object_type"], &[]), |args, _| {
            boxed(Overlap {
                kind: args.parse("object_type")?,
            })
        })?;
        self.register("reach_exit", Signature::NONE, |_, _| {
            boxed(Overlap {
                kind: ObjectKind::Exit,
            })
        })?;
        self.register("bump_moving_obstacle", Signature::NONE, |_, _| {
            boxed(Overlap {
                kind: ObjectKind::MovingObstacle,
            })
        })?;
        self.register("bump_into_wall", Signature::NONE, |_, _| boxed(BumpIntoWall))?;
        Ok(())
    }
}
