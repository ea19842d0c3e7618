//! Reward functions.
//!
//! A reward function scores a transition `(state, action, next_state)`. It
//! never mutates either state.

use std::{cell::RefCell, str::FromStr};

use crate::{
    action::{Action, intended_position},
    distance::DistanceCache,
    error::{ConfigError, EvalError},
    geometry::DistanceFunction,
    object::{GridObject, ObjectKind},
    registry::{FunctionRegistry, Signature},
    state::State,
};

pub trait RewardFunction {
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f64, EvalError>;
}

impl<F> RewardFunction for F
where
    F: Fn(&State, Action, &State) -> Result<f64, EvalError>,
{
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f64, EvalError> {
        self(state, action, next_state)
    }
}

pub type RewardRegistry = FunctionRegistry<dyn RewardFunction>;

/// How several reward values are combined into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Product,
    Max,
    Min,
}

impl Reduction {
    /// Reduces the values in order, stopping at the first error.
    ///
    /// An empty sequence yields the identity of the reduction.
    pub fn reduce<I>(self, values: I) -> Result<f64, EvalError>
    where
        I: IntoIterator<Item = Result<f64, EvalError>>,
    {
        let mut values = values.into_iter();
        match self {
            Reduction::Sum => values.sum(),
            Reduction::Product => values.product(),
            Reduction::Max => values.try_fold(f64::NEG_INFINITY, |acc, value| value.map(|v| acc.max(v))),
            Reduction::Min => values.try_fold(f64::INFINITY, |acc, value| value.map(|v| acc.min(v))),
        }
    }
}

impl FromStr for Reduction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Reduction::Sum),
            "product" => Ok(Reduction::Product),
            "max" => Ok(Reduction::Max),
            "min" => Ok(Reduction::Min),
            other => Err(format!("unknown reduction '{other}'")),
        }
    }
}

/// Combines sub-rewards, evaluated lazily in order.
pub struct Reduce {
    functions: Vec<Box<dyn RewardFunction>>,
    reduction: Reduction,
}

impl Reduce {
    pub fn new(functions: Vec<Box<dyn RewardFunction>>, reduction: Reduction) -> Self {
        Reduce {
            functions,
            reduction,
        }
    }

    pub fn sum(functions: Vec<Box<dyn RewardFunction>>) -> Self {
        Reduce::new(functions, Reduction::Sum)
    }
}

impl RewardFunction for Reduce {
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f64, EvalError> {
        self.reduction.reduce(
            self.functions
                .iter()
                .map(|function| function.reward(state, action, next_state)),
        )
    }
}

/// Sum of sub-rewards, each scaled by its weight.
pub struct WeightedSum {
    terms: Vec<(f64, Box<dyn RewardFunction>)>,
}

impl WeightedSum {
    pub fn new(terms: Vec<(f64, Box<dyn RewardFunction>)>) -> Self {
        WeightedSum { terms }
    }
}

impl RewardFunction for WeightedSum {
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f64, EvalError> {
        self.terms
            .iter()
            .map(|(weight, function)| Ok(weight * function.reward(state, action, next_state)?))
            .sum()
    }
}

/// `reward_on` while the agent stands on an object of `kind`, else `reward_off`.
pub struct Overlap {
    pub kind: ObjectKind,
    pub reward_on: f64,
    pub reward_off: f64,
}

impl RewardFunction for Overlap {
    fn reward(&self, _state: &State, _action: Action, next_state: &State) -> Result<f64, EvalError> {
        let under_agent = next_state.object_under_agent()?;
        Ok(if under_agent.is(self.kind) {
            self.reward_on
        } else {
            self.reward_off
        })
    }
}

/// Constant reward, whatever happens.
pub struct LivingReward {
    pub reward: f64,
}

impl RewardFunction for LivingReward {
    fn reward(&self, _state: &State, _action: Action, _next_state: &State) -> Result<f64, EvalError> {
        Ok(self.reward)
    }
}

/// Reward proportional to the metric distance between the agent and the
/// unique object of `kind`, after the transition.
pub struct ProportionalToDistance {
    pub kind: ObjectKind,
    pub distance_function: DistanceFunction,
    pub reward_per_unit_distance: f64,
}

impl RewardFunction for ProportionalToDistance {
    fn reward(&self, _state: &State, _action: Action, next_state: &State) -> Result<f64, EvalError> {
        let target = next_state.grid.unique_position_of(self.kind)?;
        let distance = self
            .distance_function
            .distance(next_state.agent.position, target);
        Ok(self.reward_per_unit_distance * distance)
    }
}

fn compare_distances(before: f64, after: f64, reward_closer: f64, reward_further: f64) -> f64 {
    if after < before {
        reward_closer
    } else if after > before {
        reward_further
    } else {
        0.0
    }
}

/// Rewards reducing the metric distance to the unique object of `kind`.
pub struct GettingCloser {
    pub kind: ObjectKind,
    pub distance_function: DistanceFunction,
    pub reward_closer: f64,
    pub reward_further: f64,
}

impl GettingCloser {
    fn distance(&self, state: &State) -> Result<f64, EvalError> {
        let target = state.grid.unique_position_of(self.kind)?;
        Ok(self.distance_function.distance(state.agent.position, target))
    }
}

impl RewardFunction for GettingCloser {
    fn reward(&self, state: &State, _action: Action, next_state: &State) -> Result<f64, EvalError> {
        Ok(compare_distances(
            self.distance(state)?,
            self.distance(next_state)?,
            self.reward_closer,
            self.reward_further,
        ))
    }
}

/// Rewards reducing the navigation distance (shortest path around blocking
/// objects) to the unique object of `kind`.
///
/// Each instance keeps its own distance cache.
pub struct GettingCloserShortestPath {
    kind: ObjectKind,
    reward_closer: f64,
    reward_further: f64,
    cache: RefCell<DistanceCache>,
}

impl GettingCloserShortestPath {
    pub fn new(kind: ObjectKind, reward_closer: f64, reward_further: f64) -> Self {
        GettingCloserShortestPath {
            kind,
            reward_closer,
            reward_further,
            cache: RefCell::new(DistanceCache::default()),
        }
    }

    fn distance(&self, state: &State) -> Result<f64, EvalError> {
        let target = state.grid.unique_position_of(self.kind)?;
        let layout = state.grid.passability();
        let distances = self.cache.borrow_mut().distances(&layout, target);
        Ok(distances.distance(state.agent.position))
    }
}

impl RewardFunction for GettingCloserShortestPath {
    fn reward(&self, state: &State, _action: Action, next_state: &State) -> Result<f64, EvalError> {
        Ok(compare_distances(
            self.distance(state)?,
            self.distance(next_state)?,
            self.reward_closer,
            self.reward_further,
        ))
    }
}

/// `reward` when the attempted move targets a Wall, whether or not the agent
/// actually moved.
pub struct BumpIntoWall {
    pub reward: f64,
}

impl RewardFunction for BumpIntoWall {
    fn reward(&self, state: &State, action: Action, _next_state: &State) -> Result<f64, EvalError> {
        let attempted = intended_position(state.agent.position, state.agent.orientation, action);
        Ok(match state.grid.get(attempted) {
            Ok(GridObject::Wall) => self.reward,
            _ => 0.0,
        })
    }
}

/// Rewards opening and penalizes closing the door in front of the agent.
pub struct ActuateDoor {
    pub reward_open: f64,
    pub reward_close: f64,
}

impl RewardFunction for ActuateDoor {
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f64, EvalError> {
        if action != Action::Actuate {
            return Ok(0.0);
        }

        let front = state.agent.front_position();
        let (Ok(door), Ok(next_door)) = (state.grid.get(front), next_state.grid.get(front)) else {
            return Ok(0.0);
        };
        if !door.is(ObjectKind::Door) || !next_door.is(ObjectKind::Door) {
            return Ok(0.0);
        }

        Ok(match (door.is_open_door(), next_door.is_open_door()) {
            (false, true) => self.reward_open,
            (true, false) => self.reward_close,
            _ => 0.0,
        })
    }
}

/// Rewards picking up, and penalizes dropping, an object of `kind`.
///
/// Only the held object is compared; the action is irrelevant.
pub struct PickNDrop {
    pub kind: ObjectKind,
    pub reward_pick: f64,
    pub reward_drop: f64,
}

impl RewardFunction for PickNDrop {
    fn reward(&self, state: &State, _action: Action, next_state: &State) -> Result<f64, EvalError> {
        let holds = |s: &State| s.agent.held.is_some_and(|obj| obj.is(self.kind));
        Ok(match (holds(state), holds(next_state)) {
            (false, true) => self.reward_pick,
            (true, false) => self.reward_drop,
            _ => 0.0,
        })
    }
}

/// On an Exit, `reward_good` if its color matches the unique Beacon's color,
/// `reward_bad` otherwise; 0 off exits.
pub struct ReachExitMemory {
    pub reward_good: f64,
    pub reward_bad: f64,
}

impl RewardFunction for ReachExitMemory {
    fn reward(&self, _state: &State, _action: Action, next_state: &State) -> Result<f64, EvalError> {
        let beacon = next_state.grid.unique_position_of(ObjectKind::Beacon)?;
        let beacon_color = next_state.grid[beacon].color();

        Ok(match next_state.object_under_agent()? {
            GridObject::Exit { color } if *color == beacon_color => self.reward_good,
            GridObject::Exit { .. } => self.reward_bad,
            _ => 0.0,
        })
    }
}

fn boxed<T: RewardFunction + 'static>(function: T) -> Result<Box<dyn RewardFunction>, ConfigError> {
    Ok(Box::new(function))
}

impl FunctionRegistry<dyn RewardFunction> {
    /// Registry holding every built-in reward function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new("reward");
        registry
            .register_builtins()
            .expect("built-in reward names are unique");
        registry
    }

    fn register_builtins(&mut self) -> Result<(), ConfigError> {
        self.register(
            "reduce",
            Signature::new(&["reward_functions", "reduction"], &[]),
            |args, registry| {
                let functions = registry.build_all(args.functions("reward_functions")?)?;
                boxed(Reduce::new(functions, args.parse("reduction")?))
            },
        )?;
        self.register(
            "reduce_sum",
            Signature::new(&["reward_functions"], &[]),
            |args, registry| {
                let functions = registry.build_all(args.functions("reward_functions")?)?;
                boxed(Reduce::sum(functions))
            },
        )?;
        self.register(
            "reduce_weighted_sum",
            Signature::new(&["reward_functions", "weights"], &[]),
            |args, registry| {
                let specs = args.functions("reward_functions")?;
                let weights = args.numbers("weights")?;
                if weights.len() != specs.len() {
                    return Err(ConfigError::InvalidParameter {
                        function: args.function().to_string(),
                        key: "weights".to_string(),
                        reason: format!("expected {} weights, found {}", specs.len(), weights.len()),
                    });
                }
                let functions = registry.build_all(specs)?;
                boxed(WeightedSum::new(weights.iter().copied().zip(functions).collect()))
            },
        )?;
        self.register(
            "overlap",
            Signature::new(&["object_type"], &["reward_on", "reward_off"]),
            |args, _| {
                boxed(Overlap {
                    kind: args.parse("object_type")?,
                    reward_on: args.number("reward_on", 1.0)?,
                    reward_off: args.number("reward_off", 0.0)?,
                })
            },
        )?;
        self.register("living_reward", Signature::new(&[], &["reward"]), |args, _| {
            boxed(LivingReward {
                reward: args.number("reward", -1.0)?,
            })
        })?;
        self.register(
            "reach_exit",
            Signature::new(&[], &["reward_on", "reward_off"]),
            |args, _| {
                boxed(Overlap {
                    kind: ObjectKind::Exit,
                    reward_on: args.number("reward_on", 1.0)?,
                    reward_off: args.number("reward_off", 0.0)?,
                })
            },
        )?;
        self.register(
            "bump_moving_obstacle",
            Signature::new(&[], &["reward"]),
            |args, _| {
                boxed(Overlap {
                    kind: ObjectKind::MovingObstacle,
                    reward_on: args.number("reward", -1.0)?,
                    reward_off: 0.0,
                })
            },
        )?;
        self.register(
            "proportional_to_distance",
            Signature::new(
                &["object_type"],
                &["distance_function", "reward_per_unit_distance"],
            ),
            |args, _| {
                boxed(ProportionalToDistance {
                    kind: args.parse("object_type")?,
                    distance_function: args.parse_or("distance_function", DistanceFunction::Manhattan)?,
                    reward_per_unit_distance: args.number("reward_per_unit_distance", -1.0)?,
                })
            },
        )?;
        self.register(
            "getting_closer",
            Signature::new(
                &["object_type"],
                &["distance_function", "reward_closer", "reward_further"],
            ),
            |args, _| {
                boxed(GettingCloser {
                    kind: args.parse("object_type")?,
                    distance_function: args.parse_or("distance_function", DistanceFunction::Manhattan)?,
                    reward_closer: args.number("reward_closer", 1.0)?,
                    reward_further: args.number("reward_further", -1.0)?,
                })
            },
        )?;
        self.register(
            "getting_closer_shortest_path",
            Signature::new(&["object_type"], &["reward_closer", "reward_further"]),
            |args, _| {
                boxed(GettingCloserShortestPath::new(
                    args.parse("object_type")?,
                    args.number("reward_closer", 1.0)?,
                    args.number("reward_further", -1.0)?,
                ))
            },
        )?;
        self.register("bump_into_wall", Signature::new(&[], &["reward"]), |args, _| {
            boxed(BumpIntoWall {
                reward: args.number("reward", -1.0)?,
            })
        })?;
        self.register(
            "actuate_door",
            Signature::new(&[], &["reward_open", "reward_close"]),
            |args, _| {
                boxed(ActuateDoor {
                    reward_open: args.number("reward_open", 1.0)?,
                    reward_close: args.number("reward_close", -1.0)?,
                })
            },
        )?;
        self.register(
            "pickndrop",
            Signature::new(&["object_type"], &["reward_pick", "reward_drop"]),
            |args, _| {
                boxed(PickNDrop {
                    kind: args.parse("object_type")?,
                    reward_pick: args.number("reward_pick", 1.0)?,
                    reward_drop: args.number("reward_drop", -1.0)?,
                })
            },
        )?;
        self.register(
            "reach_exit_memory",
            Signature::new(&[], &["reward_good", "reward_bad"]),
            |args, _| {
                boxed(ReachExitMemory {
                    reward_good: args.number("reward_good", 1.0)?,
                    reward_bad: args.number("reward_bad", -1.0)?,
                })
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        geometry::{Orientation, Position},
        layout::parse_layout,
        object::{Color, DoorState},
        registry::FunctionSpec,
        transition::{self, TransitionFunction, UpdateAgent},
    };

    const EXIT_5X5: &str = "
        .. .. .. .. E-
        .. .. .. .. ..
        .. .. AN .. ..
        .. .. .. .. ..
        .. .. .. .. ..
    ";

    fn moved(state: &State, position: Position) -> State {
        let mut next = state.clone();
        next.agent.position = position;
        next
    }

    fn build(spec: FunctionSpec) -> Box<dyn RewardFunction> {
        RewardRegistry::with_builtins().build_spec(&spec).unwrap()
    }

    #[test]
    fn overlap_rewards_standing_on_exit() {
        let state = parse_layout(EXIT_5X5).unwrap();
        let reward = build(
            FunctionSpec::new("overlap")
                .with("object_type", "Exit")
                .with("reward_on", 1.0)
                .with("reward_off", -0.5),
        );

        let on_exit = moved(&state, Position::new(0, 4));
        assert_eq!(reward.reward(&state, Action::MoveRight, &on_exit).unwrap(), 1.0);
        for position in [Position::new(0, 3), Position::new(1, 4), Position::new(2, 2)] {
            let next = moved(&state, position);
            assert_eq!(reward.reward(&state, Action::MoveForward, &next).unwrap(), -0.5);
        }
    }

    #[test]
    fn reach_exit_and_living_reward() {
        let state = parse_layout(EXIT_5X5).unwrap();
        let reach_exit = build(FunctionSpec::new("reach_exit"));
        let living = build(FunctionSpec::new("living_reward").with("reward", -0.1));

        let on_exit = moved(&state, Position::new(0, 4));
        assert_eq!(reach_exit.reward(&state, Action::MoveForward, &on_exit).unwrap(), 1.0);
        assert_eq!(reach_exit.reward(&state, Action::MoveForward, &state).unwrap(), 0.0);
        assert_eq!(living.reward(&state, Action::Actuate, &on_exit).unwrap(), -0.1);
    }

    #[test]
    fn bump_moving_obstacle_is_zero_elsewhere() {
        let mut state = parse_layout("AE .. ..").unwrap();
        state.grid[Position::new(0, 1)] = GridObject::MovingObstacle;
        let reward = build(FunctionSpec::new("bump_moving_obstacle").with("reward", -5.0));

        let bumped = moved(&state, Position::new(0, 1));
        assert_eq!(reward.reward(&state, Action::MoveForward, &bumped).unwrap(), -5.0);
        let missed = moved(&state, Position::new(0, 2));
        assert_eq!(reward.reward(&state, Action::MoveForward, &missed).unwrap(), 0.0);
    }

    #[test]
    fn proportional_to_distance_uses_next_state() {
        let state = parse_layout(EXIT_5X5).unwrap();
        let manhattan = build(
            FunctionSpec::new("proportional_to_distance")
                .with("object_type", "Exit")
                .with("reward_per_unit_distance", -0.5),
        );
        let chebyshev = build(
            FunctionSpec::new("proportional_to_distance")
                .with("object_type", "Exit")
                .with("distance_function", "chebyshev"),
        );

        let next = moved(&state, Position::new(2, 3));
        assert_eq!(manhattan.reward(&state, Action::MoveRight, &next).unwrap(), -1.5);
        assert_eq!(chebyshev.reward(&state, Action::MoveRight, &next).unwrap(), -2.0);
    }

    #[test]
    fn distance_rewards_require_a_unique_target() {
        let state = parse_layout("AN .. ..").unwrap();
        for name in ["proportional_to_distance", "getting_closer", "getting_closer_shortest_path"] {
            let reward = build(FunctionSpec::new(name).with("object_type", "Exit"));
            assert_eq!(
                reward.reward(&state, Action::MoveForward, &state),
                Err(EvalError::ObjectNotUnique {
                    kind: ObjectKind::Exit,
                    count: 0
                })
            );
        }

        let state = parse_layout("AN E- E-").unwrap();
        let reward = build(FunctionSpec::new("getting_closer").with("object_type", "Exit"));
        assert!(reward.reward(&state, Action::MoveForward, &state).is_err());
    }

    #[test]
    fn getting_closer_sign_convention() {
        let state = parse_layout(EXIT_5X5).unwrap();
        let reward = build(
            FunctionSpec::new("getting_closer")
                .with("object_type", "Exit")
                .with("reward_closer", 2.0)
                .with("reward_further", -3.0),
        );

        // the exit is 3 steps from (1, 2)
        let start = moved(&state, Position::new(1, 2));
        let closer = moved(&state, Position::new(0, 2));
        let further = moved(&state, Position::new(2, 2));
        let lateral = moved(&state, Position::new(1, 3));
        let lateral_back = moved(&state, Position::new(0, 2));

        assert_eq!(reward.reward(&start, Action::MoveForward, &closer).unwrap(), 2.0);
        assert_eq!(reward.reward(&start, Action::MoveBackward, &further).unwrap(), -3.0);
        assert_eq!(reward.reward(&lateral, Action::MoveLeft, &lateral_back).unwrap(), 0.0);
    }

    #[test]
    fn shortest_path_follows_walls() {
        // the exit is right of the agent but behind a wall
        let state = parse_layout(
            "
            .. .. .. ..
            AN WL E- ..
            .. WL WL ..
            ",
        )
        .unwrap();
        let metric = build(FunctionSpec::new("getting_closer").with("object_type", "Exit"));
        let shortest = build(FunctionSpec::new("getting_closer_shortest_path").with("object_type", "Exit"));

        // moving down is metrically further but not a shortcut either
        let down = moved(&state, Position::new(2, 0));
        assert_eq!(metric.reward(&state, Action::MoveBackward, &down).unwrap(), -1.0);
        assert_eq!(shortest.reward(&state, Action::MoveBackward, &down).unwrap(), -1.0);

        // moving up is metrically further but shortens the path around the wall
        let up = moved(&state, Position::new(0, 0));
        assert_eq!(metric.reward(&state, Action::MoveForward, &up).unwrap(), -1.0);
        assert_eq!(shortest.reward(&state, Action::MoveForward, &up).unwrap(), 1.0);
    }

    #[test]
    fn shortest_path_sees_doors_open() {
        let state = parse_layout("AE D- E-").unwrap();
        let shortest = build(FunctionSpec::new("getting_closer_shortest_path").with("object_type", "Exit"));

        // unreachable before and after: no change
        assert_eq!(shortest.reward(&state, Action::Actuate, &state).unwrap(), 0.0);

        let mut opened = state.clone();
        opened.grid[Position::new(0, 1)] = GridObject::Door {
            state: DoorState::Open,
            color: Color::None,
        };
        assert_eq!(shortest.reward(&state, Action::Actuate, &opened).unwrap(), 1.0);
        assert_eq!(shortest.reward(&opened, Action::Actuate, &state).unwrap(), -1.0);
    }

    #[test]
    fn bump_into_wall_checks_the_attempted_move() {
        let state = parse_layout("WL AE WL").unwrap();
        let reward = build(FunctionSpec::new("bump_into_wall").with("reward", -2.0));

        // the agent does not move, but it tried to walk into a wall
        assert_eq!(reward.reward(&state, Action::MoveForward, &state).unwrap(), -2.0);
        assert_eq!(reward.reward(&state, Action::MoveBackward, &state).unwrap(), -2.0);
        // off the grid is not a wall
        assert_eq!(reward.reward(&state, Action::MoveLeft, &state).unwrap(), 0.0);
        assert_eq!(reward.reward(&state, Action::TurnLeft, &state).unwrap(), 0.0);
    }

    #[test]
    fn actuate_door_reward_tracks_toggles() {
        let mut state = parse_layout("AE D- ..").unwrap();
        let door = transition::ActuateDoor { consume_key: false };
        let reward = build(FunctionSpec::new("actuate_door"));
        let mut rng = StdRng::seed_from_u64(0);

        let mut opened = state.clone();
        door.apply(&mut opened, Action::Actuate, &mut rng).unwrap();
        assert!(opened.grid[Position::new(0, 1)].is_open_door());
        assert_eq!(reward.reward(&state, Action::Actuate, &opened).unwrap(), 1.0);

        let mut closed = opened.clone();
        door.apply(&mut closed, Action::Actuate, &mut rng).unwrap();
        assert!(!closed.grid[Position::new(0, 1)].is_open_door());
        assert_eq!(reward.reward(&opened, Action::Actuate, &closed).unwrap(), -1.0);

        // not actuating, or nothing changed
        assert_eq!(reward.reward(&state, Action::MoveForward, &opened).unwrap(), 0.0);
        assert_eq!(reward.reward(&state, Action::Actuate, &state).unwrap(), 0.0);

        // facing away from the door
        state.agent.orientation = Orientation::W;
        assert_eq!(reward.reward(&state, Action::Actuate, &opened).unwrap(), 0.0);
    }

    #[test]
    fn pickndrop_compares_held_objects() {
        let state = parse_layout("AE KR").unwrap();
        let reward = build(
            FunctionSpec::new("pickndrop")
                .with("object_type", "Key")
                .with("reward_pick", 0.5)
                .with("reward_drop", -0.25),
        );
        let mut holding = state.clone();
        holding.agent.held = Some(GridObject::Key { color: Color::Red });

        assert_eq!(reward.reward(&state, Action::PickNDrop, &holding).unwrap(), 0.5);
        assert_eq!(reward.reward(&holding, Action::PickNDrop, &state).unwrap(), -0.25);
        // action is irrelevant
        assert_eq!(reward.reward(&holding, Action::TurnLeft, &state).unwrap(), -0.25);
        assert_eq!(reward.reward(&holding, Action::PickNDrop, &holding).unwrap(), 0.0);
    }

    #[test]
    fn reach_exit_memory_matches_beacon_color() {
        let state = parse_layout("BR AN ER EB").unwrap();
        let reward = build(FunctionSpec::new("reach_exit_memory"));

        assert_eq!(reward.reward(&state, Action::TurnLeft, &state).unwrap(), 0.0);
        let good = moved(&state, Position::new(0, 2));
        assert_eq!(reward.reward(&state, Action::MoveRight, &good).unwrap(), 1.0);
        let bad = moved(&state, Position::new(0, 3));
        assert_eq!(reward.reward(&state, Action::MoveRight, &bad).unwrap(), -1.0);

        let no_beacon = parse_layout(".. AN ER EB").unwrap();
        assert!(reward.reward(&no_beacon, Action::TurnLeft, &no_beacon).is_err());
    }

    #[test]
    fn reductions_combine_sub_rewards() {
        let state = parse_layout(EXIT_5X5).unwrap();
        let on_exit = moved(&state, Position::new(0, 4));
        let parts = || {
            vec![
                FunctionSpec::new("living_reward").with("reward", -0.5),
                FunctionSpec::new("reach_exit").with("reward_on", 4.0),
            ]
        };

        let sum = build(FunctionSpec::new("reduce_sum").with("reward_functions", parts()));
        assert_eq!(sum.reward(&state, Action::MoveForward, &on_exit).unwrap(), 3.5);

        let expected = [("sum", 3.5), ("product", -2.0), ("max", 4.0), ("min", -0.5)];
        for (reduction, value) in expected {
            let reward = build(
                FunctionSpec::new("reduce")
                    .with("reward_functions", parts())
                    .with("reduction", reduction),
            );
            assert_eq!(reward.reward(&state, Action::MoveForward, &on_exit).unwrap(), value);
        }
    }

    #[test]
    fn weighted_sum_scales_each_term() {
        let state = parse_layout(EXIT_5X5).unwrap();
        let on_exit = moved(&state, Position::new(0, 4));
        let parts = vec![
            FunctionSpec::new("living_reward").with("reward", -1.0),
            FunctionSpec::new("reach_exit"),
        ];

        let reward = build(
            FunctionSpec::new("reduce_weighted_sum")
                .with("reward_functions", parts.clone())
                .with("weights", vec![0.5, 10.0]),
        );
        assert_eq!(reward.reward(&state, Action::MoveForward, &on_exit).unwrap(), 9.5);
        assert_eq!(reward.reward(&state, Action::MoveForward, &state).unwrap(), -0.5);

        let mismatched = RewardRegistry::with_builtins().build_spec(
            &FunctionSpec::new("reduce_weighted_sum")
                .with("reward_functions", parts)
                .with("weights", vec![1.0]),
        );
        assert!(matches!(
            mismatched,
            Err(ConfigError::InvalidParameter { key, .. }) if key == "weights"
        ));
    }

    #[test]
    fn empty_reductions_yield_identity() {
        assert_eq!(Reduction::Sum.reduce([]), Ok(0.0));
        assert_eq!(Reduction::Product.reduce([]), Ok(1.0));
        assert_eq!(Reduction::Max.reduce([]), Ok(f64::NEG_INFINITY));
        assert_eq!(Reduction::Min.reduce([]), Ok(f64::INFINITY));
    }

    #[test]
    fn reduction_stops_at_first_error() {
        let err = EvalError::ObjectNotUnique {
            kind: ObjectKind::Beacon,
            count: 0,
        };
        let values = vec![Ok(1.0), Err(err.clone()), Ok(2.0)];
        assert_eq!(Reduction::Sum.reduce(values), Err(err));
    }

    #[test]
    fn factory_validates_parameters() {
        let registry = RewardRegistry::with_builtins();
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("overlap")),
            Err(ConfigError::MissingParameter { key, .. }) if key == "object_type"
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("overlap").with("object_type", "Exit").with("foo", 1.0)),
            Err(ConfigError::UnrecognizedParameter { keys, .. }) if keys == vec!["foo".to_string()]
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("overlap").with("object_type", "Box")),
            Err(ConfigError::InvalidParameter { .. })
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("reduce").with("reward_functions", Vec::<FunctionSpec>::new())),
            Err(ConfigError::MissingParameter { key, .. }) if key == "reduction"
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("reduce_sum").with(
                "reward_functions",
                vec![FunctionSpec::new("living_reward").with("bonus", 1.0)]
            )),
            Err(ConfigError::UnrecognizedParameter { .. })
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("static_reward")),
            Err(ConfigError::UnknownFunction { family: "reward", .. })
        ));
    }

    #[test]
    fn custom_rewards_resolve_like_builtins() {
        let mut registry = RewardRegistry::with_builtins();
        registry
            .register("turn_penalty", Signature::new(&[], &["reward"]), |args, _| {
                let penalty = args.number("reward", -1.0)?;
                boxed(move |_: &State, action: Action, _: &State| -> Result<f64, EvalError> {
                    Ok(if action.is_rotation() { penalty } else { 0.0 })
                })
            })
            .unwrap();
        assert!(matches!(
            registry.register("overlap", Signature::NONE, |_, _| boxed(LivingReward { reward: 0.0 })),
            Err(ConfigError::DuplicateFunction { .. })
        ));

        let reward = registry
            .build_spec(&FunctionSpec::new("reduce_sum").with(
                "reward_functions",
                vec![
                    FunctionSpec::new("turn_penalty").with("reward", -0.25),
                    FunctionSpec::new("living_reward").with("reward", -1.0),
                ],
            ))
            .unwrap();
        let state = parse_layout("AN").unwrap();
        let mut next = state.clone();
        UpdateAgent
            .apply(&mut next, Action::TurnLeft, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(reward.reward(&state, Action::TurnLeft, &next).unwrap(), -1.25);
        assert_eq!(reward.reward(&state, Action::MoveForward, &state).unwrap(), -1.0);
    }
}
