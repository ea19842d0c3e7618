//! Plain-text grid layouts.
//!
//! A layout is a block of whitespace-separated two-character tokens, one line
//! per grid row:
//!
//! | token | object |
//! |-------|--------|
//! | `..` | floor |
//! | `WL` | wall |
//! | `HD` | hidden |
//! | `MO` | moving obstacle |
//! | `E?` | exit |
//! | `K?` | key |
//! | `B?` | beacon |
//! | `T?` | telepod |
//! | `D?` | closed door |
//! | `O?` | open door |
//! | `L?` | locked door |
//! | `AN` `AS` `AE` `AW` | agent on floor, facing N/S/E/W |
//!
//! `?` is a color: `R`, `G`, `B`, `Y`, or `-` for none.

use crate::{
    agent::Agent,
    geometry::{Orientation, Position},
    map::Grid,
    object::{Color, DoorState, GridObject},
    state::State,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout is empty")]
    Empty,
    #[error("inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown layout token '{token}' at {position}")]
    UnknownToken { token: String, position: Position },
    #[error("no agent ('A?') found in layout")]
    MissingAgent,
    #[error("multiple agents found in layout, second at {0}")]
    MultipleAgents(Position),
}

fn parse_color(c: char) -> Option<Color> {
    match c {
        '-' => Some(Color::None),
        'R' => Some(Color::Red),
        'G' => Some(Color::Green),
        'B' => Some(Color::Blue),
        'Y' => Some(Color::Yellow),
        _ => None,
    }
}

fn parse_orientation(c: char) -> Option<Orientation> {
    match c {
        'N' => Some(Orientation::N),
        'S' => Some(Orientation::S),
        'E' => Some(Orientation::E),
        'W' => Some(Orientation::W),
        _ => None,
    }
}

enum Token {
    Object(GridObject),
    Agent(Orientation),
}

fn parse_token(token: &str) -> Option<Token> {
    match token {
        ".." => return Some(Token::Object(GridObject::Floor)),
        "WL" => return Some(Token::Object(GridObject::Wall)),
        "HD" => return Some(Token::Object(GridObject::Hidden)),
        "MO" => return Some(Token::Object(GridObject::MovingObstacle)),
        _ => {}
    }

    let mut chars = token.chars();
    let (kind, attribute) = match (chars.next(), chars.next(), chars.next()) {
        (Some(kind), Some(attribute), None) => (kind, attribute),
        _ => return None,
    };

    if kind == 'A' {
        return parse_orientation(attribute).map(Token::Agent);
    }

    let color = parse_color(attribute)?;
    let obj = match kind {
        'E' => GridObject::Exit { color },
        'K' => GridObject::Key { color },
        'B' => GridObject::Beacon { color },
        'T' => GridObject::Telepod { color },
        'D' => GridObject::Door {
            state: DoorState::Closed,
            color,
        },
        'O' => GridObject::Door {
            state: DoorState::Open,
            color,
        },
        'L' => GridObject::Door {
            state: DoorState::Locked,
            color,
        },
        _ => return None,
    };
    Some(Token::Object(obj))
}

/// Parses a layout into an initial state.
pub fn parse_layout(layout: &str) -> Result<State, LayoutError> {
    let lines: Vec<&str> = layout
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(LayoutError::Empty);
    }

    let mut rows: Vec<Vec<GridObject>> = Vec::with_capacity(lines.len());
    let mut agent: Option<Agent> = None;

    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(first) = rows.first() {
            if tokens.len() != first.len() {
                return Err(LayoutError::InconsistentWidth {
                    row: y,
                    expected: first.len(),
                    found: tokens.len(),
                });
            }
        }

        let mut row = Vec::with_capacity(tokens.len());
        for (x, token) in tokens.iter().enumerate() {
            let position = Position::new(y as i32, x as i32);
            match parse_token(token) {
                Some(Token::Object(obj)) => row.push(obj),
                Some(Token::Agent(orientation)) => {
                    if agent.is_some() {
                        return Err(LayoutError::MultipleAgents(position));
                    }
                    agent = Some(Agent::new(position, orientation));
                    row.push(GridObject::Floor);
                }
                None => {
                    return Err(LayoutError::UnknownToken {
                        token: token.to_string(),
                        position,
                    });
                }
            }
        }
        rows.push(row);
    }

    let agent = agent.ok_or(LayoutError::MissingAgent)?;
    // widths were checked row by row above
    let grid = Grid::from_rows(rows).ok_or(LayoutError::Empty)?;
    Ok(State::new(grid, agent))
}
