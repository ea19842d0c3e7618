use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{
    error::EvalError,
    geometry::{Area, Position},
    object::{GridObject, ObjectKind},
};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position {position} is out of bounds for grid size ({height}, {width})")]
    OutOfBounds {
        position: Position,
        height: usize,
        width: usize,
    },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Cells are addressed by [`Position`] in matrix notation `(y, x)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid<T> {
    height: usize,
    width: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` overflows `usize`.
    pub fn new(height: usize, width: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = height.checked_mul(width).expect("Grid size overflow");
        Grid {
            height,
            width,
            cells: vec![T::default(); size],
        }
    }

    /// Creates a new grid with the specified dimensions, filled by a generator function.
    ///
    /// The generator receives every position in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` overflows `usize`.
    pub fn from_generator<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let size = height.checked_mul(width).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(Position::new(y as i32, x as i32)));
            }
        }
        Grid {
            height,
            width,
            cells,
        }
    }

    /// Builds a grid from rows of equal length.
    ///
    /// Returns `None` if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        Some(Grid {
            height,
            width,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The area covered by the grid, from `(0, 0)` to `(height - 1, width - 1)`.
    pub fn area(&self) -> Area {
        Area::new(
            Position::new(0, 0),
            Position::new(self.height as i32 - 1, self.width as i32 - 1),
        )
    }

    /// Converts a position to a flat vector index.
    ///
    /// Returns `None` if the position is out of bounds.
    #[inline]
    pub fn position_to_index(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some(position.y as usize * self.width + position.x as usize)
        } else {
            None
        }
    }

    /// Converts a flat vector index back to a position.
    #[inline]
    pub fn index_to_position(&self, index: usize) -> Option<Position> {
        if index < self.cells.len() {
            Some(Position::new((index / self.width) as i32, (index % self.width) as i32))
        } else {
            None
        }
    }

    /// Checks if the position lies within the grid boundaries.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.y >= 0
            && position.x >= 0
            && (position.y as usize) < self.height
            && (position.x as usize) < self.width
    }

    fn out_of_bounds(&self, position: Position) -> GridError {
        GridError::OutOfBounds {
            position,
            height: self.height,
            width: self.width,
        }
    }

    fn checked_index(&self, position: Position) -> Result<usize, GridError> {
        self.position_to_index(position)
            .ok_or_else(|| self.out_of_bounds(position))
    }

    /// Gets an immutable reference to the cell at the given position.
    pub fn get(&self, position: Position) -> Result<&T, GridError> {
        let index = self.checked_index(position)?;
        Ok(&self.cells[index])
    }

    /// Gets a mutable reference to the cell at the given position.
    pub fn get_mut(&mut self, position: Position) -> Result<&mut T, GridError> {
        let index = self.checked_index(position)?;
        Ok(&mut self.cells[index])
    }

    /// Replaces the value of the cell at the given position.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        *self.get_mut(position)? = value;
        Ok(())
    }

    /// Swaps the contents of two cells.
    pub fn swap(&mut self, p: Position, q: Position) -> Result<(), GridError> {
        let i = self.checked_index(p)?;
        let j = self.checked_index(q)?;
        self.cells.swap(i, j);
        Ok(())
    }

    /// Returns an iterator over all positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<T> {
        let (height, width) = (self.height as i32, self.width as i32);
        (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(y, x)))
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position::new((index / width) as i32, (index % width) as i32),
                cell,
            )
        })
    }
}

impl Grid<GridObject> {
    /// Positions of every object of the given kind, in row-major order.
    pub fn positions_of(&self, kind: ObjectKind) -> impl Iterator<Item = Position> + '_ {
        self.enumerate()
            .filter(move |(_, obj)| obj.is(kind))
            .map(|(position, _)| position)
    }

    /// Position of the single object of the given kind.
    ///
    /// Fails if the grid holds no such object, or more than one.
    pub fn unique_position_of(&self, kind: ObjectKind) -> Result<Position, EvalError> {
        let mut positions = self.positions_of(kind);
        match (positions.next(), positions.next()) {
            (Some(position), None) => Ok(position),
            (None, _) => Err(EvalError::ObjectNotUnique { kind, count: 0 }),
            (Some(_), Some(_)) => Err(EvalError::ObjectNotUnique {
                kind,
                count: 2 + positions.count(),
            }),
        }
    }

    /// Passability of every cell: `true` where the object does not block movement.
    pub fn passability(&self) -> Grid<bool> {
        Grid {
            height: self.height,
            width: self.width,
            cells: self.cells.iter().map(|obj| !obj.blocks_movement()).collect(),
        }
    }
}

/// Indexing using Position coordinates for access.
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.position_to_index(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.height, self.width
            ),
        }
    }
}

/// Indexing using Position coordinates for mutable access.
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let height = self.height;
        let width = self.width;
        match self.position_to_index(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, height, width
            ),
        }
    }
}
