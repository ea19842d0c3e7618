use std::{
    fmt,
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// A cell coordinate in matrix notation: `y` indexes rows from the top, `x`
/// indexes columns from the left.
///
/// Coordinates are signed so that positions just outside the grid (e.g. the
/// cell in front of an agent standing on the border) can be represented and
/// then rejected by bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub y: i32,
    pub x: i32,
}

impl Position {
    pub const fn new(y: i32, x: i32) -> Self {
        Position { y, x }
    }

    /// Manhattan (L1) distance between two positions.
    pub fn manhattan_distance(self, other: Position) -> i32 {
        (self.y - other.y).abs() + (self.x - other.x).abs()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.y, self.x)
    }
}

/// An offset between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeltaPosition {
    pub y: i32,
    pub x: i32,
}

impl DeltaPosition {
    pub const fn new(y: i32, x: i32) -> Self {
        DeltaPosition { y, x }
    }

    /// Rotates the offset as seen by someone facing `orientation`.
    ///
    /// `N` is the identity; `E`, `S` and `W` rotate clockwise by 90, 180 and
    /// 270 degrees respectively, so that "front" (`N.as_delta_position()`)
    /// maps onto the absolute heading.
    pub fn rotate(self, orientation: Orientation) -> DeltaPosition {
        let DeltaPosition { y, x } = self;
        match orientation {
            Orientation::N => DeltaPosition::new(y, x),
            Orientation::E => DeltaPosition::new(x, -y),
            Orientation::S => DeltaPosition::new(-y, -x),
            Orientation::W => DeltaPosition::new(-x, y),
        }
    }
}

impl Neg for DeltaPosition {
    type Output = DeltaPosition;

    fn neg(self) -> Self::Output {
        DeltaPosition::new(-self.y, -self.x)
    }
}

impl Add<DeltaPosition> for Position {
    type Output = Position;

    fn add(self, delta: DeltaPosition) -> Self::Output {
        Position::new(self.y + delta.y, self.x + delta.x)
    }
}

impl Sub<DeltaPosition> for Position {
    type Output = Position;

    fn sub(self, delta: DeltaPosition) -> Self::Output {
        self + (-delta)
    }
}

impl Sub for Position {
    type Output = DeltaPosition;

    fn sub(self, other: Position) -> Self::Output {
        DeltaPosition::new(self.y - other.y, self.x - other.x)
    }
}

/// Absolute heading of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    N,
    S,
    E,
    W,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [Orientation::N, Orientation::S, Orientation::E, Orientation::W];

    /// Unit offset pointing in this direction.
    pub fn as_delta_position(self) -> DeltaPosition {
        match self {
            Orientation::N => DeltaPosition::new(-1, 0),
            Orientation::S => DeltaPosition::new(1, 0),
            Orientation::E => DeltaPosition::new(0, 1),
            Orientation::W => DeltaPosition::new(0, -1),
        }
    }

    pub fn rotate_left(self) -> Orientation {
        match self {
            Orientation::N => Orientation::W,
            Orientation::W => Orientation::S,
            Orientation::S => Orientation::E,
            Orientation::E => Orientation::N,
        }
    }

    pub fn rotate_right(self) -> Orientation {
        match self {
            Orientation::N => Orientation::E,
            Orientation::E => Orientation::S,
            Orientation::S => Orientation::W,
            Orientation::W => Orientation::N,
        }
    }

    pub fn rotate_back(self) -> Orientation {
        self.rotate_right().rotate_right()
    }
}

/// Axis-aligned rectangle with inclusive bounds.
///
/// Every constructor and transform keeps `y0 <= y1` and `x0 <= x1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    pub y0: i32,
    pub x0: i32,
    pub y1: i32,
    pub x1: i32,
}

impl Area {
    /// Creates the area spanned by the two corners, in any order.
    pub fn new(a: Position, b: Position) -> Self {
        Area {
            y0: a.y.min(b.y),
            x0: a.x.min(b.x),
            y1: a.y.max(b.y),
            x1: a.x.max(b.x),
        }
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0 + 1
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0 + 1
    }

    pub fn top_left(&self) -> Position {
        Position::new(self.y0, self.x0)
    }

    pub fn bottom_right(&self) -> Position {
        Position::new(self.y1, self.x1)
    }

    pub fn contains(&self, position: Position) -> bool {
        self.y0 <= position.y && position.y <= self.y1 && self.x0 <= position.x && position.x <= self.x1
    }

    pub fn translate(&self, delta: DeltaPosition) -> Area {
        Area::new(self.top_left() + delta, self.bottom_right() + delta)
    }

    /// Rotates the area around the origin; which corner ends up top-left
    /// depends on the orientation.
    pub fn rotate(&self, orientation: Orientation) -> Area {
        let origin = Position::new(0, 0);
        let a = origin + (self.top_left() - origin).rotate(orientation);
        let b = origin + (self.bottom_right() - origin).rotate(orientation);
        Area::new(a, b)
    }

    /// Positions of the area in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let Area { y0, x0, y1, x1 } = *self;
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| Position::new(y, x)))
    }
}

/// Position and orientation of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
}

impl Pose {
    /// Converts a position relative to this pose (front is `(-1, 0)`) into an
    /// absolute position.
    pub fn absolute_position(&self, relative: DeltaPosition) -> Position {
        self.position + relative.rotate(self.orientation)
    }

    pub fn front_position(&self) -> Position {
        self.absolute_position(Orientation::N.as_delta_position())
    }

    pub fn absolute_area(&self, relative: &Area) -> Area {
        relative
            .rotate(self.orientation)
            .translate(self.position - Position::new(0, 0))
    }
}

/// Closed-form metrics between two positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFunction {
    #[default]
    Manhattan,
    Euclidean,
    Chebyshev,
}

impl DistanceFunction {
    pub fn distance(self, a: Position, b: Position) -> f64 {
        let dy = f64::from((a.y - b.y).abs());
        let dx = f64::from((a.x - b.x).abs());
        match self {
            DistanceFunction::Manhattan => dy + dx,
            DistanceFunction::Euclidean => dy.hypot(dx),
            DistanceFunction::Chebyshev => dy.max(dx),
        }
    }
}

impl FromStr for DistanceFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manhattan" => Ok(DistanceFunction::Manhattan),
            "euclidean" => Ok(DistanceFunction::Euclidean),
            "chebyshev" => Ok(DistanceFunction::Chebyshev),
            other => Err(format!("unknown distance function '{other}'")),
        }
    }
}

/// Cells at exactly `distance` Manhattan steps from `center`, clockwise from
/// the top-most cell.
///
/// For `distance == 1` this yields the north, east, south and west
/// neighbours in that order. Returns nothing for `distance == 0`.
pub fn manhattan_boundary(center: Position, distance: i32) -> Vec<Position> {
    let mut boundary = Vec::with_capacity(4 * distance.max(0) as usize);
    for i in 0..distance {
        boundary.push(Position::new(center.y - distance + i, center.x + i));
    }
    for i in 0..distance {
        boundary.push(Position::new(center.y + i, center.x + distance - i));
    }
    for i in 0..distance {
        boundary.push(Position::new(center.y + distance - i, center.x - i));
    }
    for i in 0..distance {
        boundary.push(Position::new(center.y - i, center.x - distance + i));
    }
    boundary
}
