//! Navigation distances over the grid.
//!
//! Distances are computed by breadth-first flood fill over passable cells and
//! memoized per `(layout, source)` in a small LRU cache, since layouts rarely
//! change within an episode.

use std::{collections::VecDeque, rc::Rc};

use crate::{
    geometry::{Position, manhattan_boundary},
    map::Grid,
};

/// Passability of every cell: `true` where the agent may walk.
pub type Layout = Grid<bool>;

/// Step distances from a single source cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMap {
    steps: Grid<Option<u32>>,
}

impl DistanceMap {
    /// Number of steps from the source, or `None` if unreachable or outside
    /// the grid.
    pub fn steps(&self, position: Position) -> Option<u32> {
        self.steps.get(position).ok().copied().flatten()
    }

    /// Steps from the source as a float; unreachable cells are infinitely far.
    pub fn distance(&self, position: Position) -> f64 {
        self.steps(position).map_or(f64::INFINITY, f64::from)
    }
}

/// Breadth-first flood fill from `source` over the 4-connected passable cells
/// of `layout`.
///
/// The source itself is at distance 0 whether or not it is passable.
pub fn shortest_path_distances(layout: &Layout, source: Position) -> DistanceMap {
    let mut steps: Grid<Option<u32>> = Grid::new(layout.height(), layout.width());

    if let Ok(cell) = steps.get_mut(source) {
        *cell = Some(0);
        let mut frontier = VecDeque::from([(source, 0u32)]);
        while let Some((position, distance)) = frontier.pop_front() {
            for neighbor in manhattan_boundary(position, 1) {
                let passable = layout.get(neighbor).is_ok_and(|passable| *passable);
                if passable && steps[neighbor].is_none() {
                    steps[neighbor] = Some(distance + 1);
                    frontier.push_back((neighbor, distance + 1));
                }
            }
        }
    }

    DistanceMap { steps }
}

struct CacheEntry {
    layout: Layout,
    source: Position,
    distances: Rc<DistanceMap>,
}

/// Bounded least-recently-used cache of [`shortest_path_distances`] results.
///
/// Entries are keyed by the full layout, so any change to passability (a door
/// opening, a wall appearing) is a cache miss rather than a stale hit.
pub struct DistanceCache {
    capacity: usize,
    // most recently used first
    entries: VecDeque<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl DistanceCache {
    pub const DEFAULT_CAPACITY: usize = 10;

    /// Creates a cache holding at most `capacity` results; `0` disables caching.
    pub fn new(capacity: usize) -> Self {
        DistanceCache {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Distances from `source` over `layout`, computed on a miss.
    pub fn distances(&mut self, layout: &Layout, source: Position) -> Rc<DistanceMap> {
        let found = self
            .entries
            .iter()
            .position(|entry| entry.source == source && entry.layout == *layout);

        if let Some(index) = found {
            self.hits += 1;
            if let Some(entry) = self.entries.remove(index) {
                let distances = Rc::clone(&entry.distances);
                self.entries.push_front(entry);
                return distances;
            }
        }

        self.misses += 1;
        let distances = Rc::new(shortest_path_distances(layout, source));
        if self.capacity > 0 {
            if self.entries.len() == self.capacity {
                self.entries.pop_back();
            }
            self.entries.push_front(CacheEntry {
                layout: layout.clone(),
                source,
                distances: Rc::clone(&distances),
            });
        }
        distances
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for DistanceCache {
    fn default() -> Self {
        DistanceCache::new(DistanceCache::DEFAULT_CAPACITY)
    }
}
