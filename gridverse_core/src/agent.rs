use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Area, DeltaPosition, Orientation, Pose, Position},
    object::GridObject,
};

/// The agent part of the state: where it stands, where it faces, and what it
/// carries (`None` when empty-handed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    pub position: Position,
    pub orientation: Orientation,
    pub held: Option<GridObject>,
}

impl Agent {
    pub fn new(position: Position, orientation: Orientation) -> Self {
        Agent {
            position,
            orientation,
            held: None,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            orientation: self.orientation,
        }
    }

    /// Absolute position of an offset given in the agent's frame of reference.
    pub fn position_relative(&self, delta: DeltaPosition) -> Position {
        self.pose().absolute_position(delta)
    }

    pub fn front_position(&self) -> Position {
        self.pose().front_position()
    }

    /// Absolute area corresponding to an area relative to the agent's point
    /// of view, where `(0, 0)` is the agent and `(-1, 0)` the cell in front.
    pub fn pov_area(&self, relative: &Area) -> Area {
        self.pose().absolute_area(relative)
    }
}
