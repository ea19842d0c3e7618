use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Color attribute carried by doors, keys, exits, beacons and telepods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[default]
    None,
    Red,
    Green,
    Blue,
    Yellow,
}

/// Status of a door. Only `Open` doors can be walked through or seen through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    Open,
    Closed,
    Locked,
}

/// Content of a single grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridObject {
    #[default]
    Floor,
    Wall,
    /// Placeholder for cells the agent cannot observe.
    Hidden,
    Exit {
        color: Color,
    },
    Door {
        state: DoorState,
        color: Color,
    },
    Key {
        color: Color,
    },
    MovingObstacle,
    Beacon {
        color: Color,
    },
    Telepod {
        color: Color,
    },
}

/// Variant tag of a [`GridObject`], used to select objects by kind
/// (e.g. "the unique Exit in the grid").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Floor,
    Wall,
    Hidden,
    Exit,
    Door,
    Key,
    MovingObstacle,
    Beacon,
    Telepod,
}

/// What an object allows the agent to do with the cell it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub blocks_movement: bool,
    pub blocks_visibility: bool,
    pub can_be_picked_up: bool,
}

impl Capabilities {
    const PASSABLE: Capabilities = Capabilities {
        blocks_movement: false,
        blocks_visibility: false,
        can_be_picked_up: false,
    };
    const SOLID: Capabilities = Capabilities {
        blocks_movement: true,
        blocks_visibility: true,
        can_be_picked_up: false,
    };
    const PORTABLE: Capabilities = Capabilities {
        blocks_movement: false,
        blocks_visibility: false,
        can_be_picked_up: true,
    };
}

impl GridObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GridObject::Floor => ObjectKind::Floor,
            GridObject::Wall => ObjectKind::Wall,
            GridObject::Hidden => ObjectKind::Hidden,
            GridObject::Exit { .. } => ObjectKind::Exit,
            GridObject::Door { .. } => ObjectKind::Door,
            GridObject::Key { .. } => ObjectKind::Key,
            GridObject::MovingObstacle => ObjectKind::MovingObstacle,
            GridObject::Beacon { .. } => ObjectKind::Beacon,
            GridObject::Telepod { .. } => ObjectKind::Telepod,
        }
    }

    pub fn is(&self, kind: ObjectKind) -> bool {
        self.kind() == kind
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            GridObject::Wall | GridObject::Hidden => Capabilities::SOLID,
            GridObject::Door {
                state: DoorState::Open,
                ..
            } => Capabilities::PASSABLE,
            GridObject::Door { .. } => Capabilities::SOLID,
            GridObject::Key { .. } => Capabilities::PORTABLE,
            GridObject::Floor
            | GridObject::Exit { .. }
            | GridObject::MovingObstacle
            | GridObject::Beacon { .. }
            | GridObject::Telepod { .. } => Capabilities::PASSABLE,
        }
    }

    #[inline]
    pub fn blocks_movement(&self) -> bool {
        self.capabilities().blocks_movement
    }

    #[inline]
    pub fn blocks_visibility(&self) -> bool {
        self.capabilities().blocks_visibility
    }

    #[inline]
    pub fn can_be_picked_up(&self) -> bool {
        self.capabilities().can_be_picked_up
    }

    /// Color of the object; uncolored kinds report `Color::None`.
    pub fn color(&self) -> Color {
        match *self {
            GridObject::Exit { color }
            | GridObject::Door { color, .. }
            | GridObject::Key { color }
            | GridObject::Beacon { color }
            | GridObject::Telepod { color } => color,
            GridObject::Floor | GridObject::Wall | GridObject::Hidden | GridObject::MovingObstacle => {
                Color::None
            }
        }
    }

    pub fn is_open_door(&self) -> bool {
        matches!(
            self,
            GridObject::Door {
                state: DoorState::Open,
                ..
            }
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    /// Accepts both `MovingObstacle` and `moving_obstacle` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "floor" => Ok(ObjectKind::Floor),
            "wall" => Ok(ObjectKind::Wall),
            "hidden" => Ok(ObjectKind::Hidden),
            "exit" => Ok(ObjectKind::Exit),
            "door" => Ok(ObjectKind::Door),
            "key" => Ok(ObjectKind::Key),
            "movingobstacle" => Ok(ObjectKind::MovingObstacle),
            "beacon" => Ok(ObjectKind::Beacon),
            "telepod" => Ok(ObjectKind::Telepod),
            _ => Err(format!("unknown object kind '{s}'")),
        }
    }
}
