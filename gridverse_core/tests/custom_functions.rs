use gridverse_core::{
    Action, EnvironmentConfig, EvalError, FunctionSpec, Position, Registries, RewardFunction,
    State, TransitionFunction,
    registry::Signature,
    transition::UpdateAgent,
};
use rand::rngs::StdRng;

/// Registers an agent update repeated `n` times, and a reward alternating on
/// a checkerboard pattern.
fn registries() -> Registries {
    let mut registries = Registries::default();
    registries
        .transitions
        .register("multi_update_agent", Signature::new(&["n"], &[]), |args, _| {
            let n = args.number("n", 1.0)? as usize;
            let update = move |state: &mut State, action: Action, rng: &mut StdRng| -> Result<(), EvalError> {
                for _ in 0..n {
                    UpdateAgent.apply(state, action, rng)?;
                }
                Ok(())
            };
            Ok(Box::new(update) as Box<dyn TransitionFunction>)
        })
        .unwrap();
    registries
        .rewards
        .register(
            "checkerboard",
            Signature::new(&["reward_even", "reward_odd"], &[]),
            |args, _| {
                let even = args.number("reward_even", 0.0)?;
                let odd = args.number("reward_odd", 0.0)?;
                let checkerboard = move |_: &State, _: Action, next_state: &State| -> Result<f64, EvalError> {
                    let Position { y, x } = next_state.agent.position;
                    Ok(if (y + x) % 2 == 0 { even } else { odd })
                };
                Ok(Box::new(checkerboard) as Box<dyn RewardFunction>)
            },
        )
        .unwrap();
    registries
}

fn config() -> EnvironmentConfig {
    let mut config = EnvironmentConfig::from_json(
        r#"{
            "transition_functions": [{"name": "multi_update_agent", "params": {"n": 2}}],
            "reward_function": {"name": "checkerboard", "params": {"reward_even": 1, "reward_odd": -1}},
            "terminating_function": {"name": "reach_exit"}
        }"#,
    )
    .unwrap();
    config.set_layout(
        "
        AE .. .. .. .. E-
        ",
    );
    config
}

#[test]
fn custom_functions_drive_an_episode() {
    let mut env = config().build(&registries()).unwrap();
    env.reset().unwrap();

    let outcome = env.step(Action::MoveForward).unwrap();
    assert_eq!(env.state().unwrap().agent.position, Position::new(0, 2));
    assert_eq!(outcome.reward, 1.0);

    env.step(Action::MoveForward).unwrap();
    let outcome = env.step(Action::MoveForward).unwrap();
    // the second repeat is stopped by the grid edge
    assert_eq!(env.state().unwrap().agent.position, Position::new(0, 5));
    assert_eq!(outcome.reward, -1.0);
    assert!(outcome.terminal);
}

#[test]
fn custom_functions_compose_with_builtins() {
    let mut config = config();
    config.reward_function = FunctionSpec::new("reduce_sum").with(
        "reward_functions",
        vec![
            FunctionSpec::new("checkerboard")
                .with("reward_even", 1.0)
                .with("reward_odd", 0.0),
            FunctionSpec::new("reach_exit").with("reward_on", 10.0),
        ],
    );
    let mut env = config.build(&registries()).unwrap();
    env.reset().unwrap();

    let rewards: Vec<f64> = (0..3)
        .map(|_| env.step(Action::MoveForward).unwrap().reward)
        .collect();
    assert_eq!(rewards, vec![1.0, 1.0, 10.0]);
}

#[test]
fn custom_functions_are_validated_like_builtins() {
    let mut missing_n = config();
    missing_n.transition_functions = vec![FunctionSpec::new("multi_update_agent")];
    assert!(missing_n.build(&registries()).is_err());
    // unknown without registration
    assert!(config().build(&Registries::default()).is_err());
}
