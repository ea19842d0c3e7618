use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{Orientation, Position};

/// Discrete actions available to the agent.
///
/// Moves are relative to the agent's orientation; turns change the
/// orientation only. The effect of `Actuate` and `PickNDrop` depends on the
/// object in front of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    TurnLeft,
    TurnRight,
    Actuate,
    PickNDrop,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::MoveForward,
        Action::MoveBackward,
        Action::MoveLeft,
        Action::MoveRight,
        Action::TurnLeft,
        Action::TurnRight,
        Action::Actuate,
        Action::PickNDrop,
    ];

    pub fn is_move(self) -> bool {
        matches!(
            self,
            Action::MoveForward | Action::MoveBackward | Action::MoveLeft | Action::MoveRight
        )
    }

    pub fn is_rotation(self) -> bool {
        matches!(self, Action::TurnLeft | Action::TurnRight)
    }

    /// Absolute direction of a move action for an agent facing `orientation`.
    pub fn move_direction(self, orientation: Orientation) -> Option<Orientation> {
        match self {
            Action::MoveForward => Some(orientation),
            Action::MoveLeft => Some(orientation.rotate_left()),
            Action::MoveRight => Some(orientation.rotate_right()),
            Action::MoveBackward => Some(orientation.rotate_back()),
            _ => None,
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move_forward" => Ok(Action::MoveForward),
            "move_backward" => Ok(Action::MoveBackward),
            "move_left" => Ok(Action::MoveLeft),
            "move_right" => Ok(Action::MoveRight),
            "turn_left" => Ok(Action::TurnLeft),
            "turn_right" => Ok(Action::TurnRight),
            "actuate" => Ok(Action::Actuate),
            "pick_n_drop" => Ok(Action::PickNDrop),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// Position the agent would reach by taking `action`, ignoring obstacles and
/// grid bounds. Non-move actions leave the position unchanged.
pub fn intended_position(position: Position, orientation: Orientation, action: Action) -> Position {
    match action.move_direction(orientation) {
        Some(direction) => position + direction.as_delta_position(),
        None => position,
    }
}
