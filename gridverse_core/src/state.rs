use serde::{Deserialize, Serialize};

use crate::{
    agent::Agent,
    map::{Grid, GridError},
    object::GridObject,
};

/// A full simulation state: the grid of objects plus the agent.
///
/// Transition functions mutate a state in place; reward and terminating
/// functions only read pairs of states.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub grid: Grid<GridObject>,
    pub agent: Agent,
}

impl State {
    pub fn new(grid: Grid<GridObject>, agent: Agent) -> Self {
        State { grid, agent }
    }

    /// The object the agent is standing on.
    pub fn object_under_agent(&self) -> Result<&GridObject, GridError> {
        self.grid.get(self.agent.position)
    }
}
