use std::fmt;

use serde::{Deserialize, Serialize};

/// Column/row coordinates on a square tile grid. `y` grows downwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const DIRECTIONS: [Position; 4] = [
        Position { x: 0, y: -1 }, // North
        Position { x: 1, y: 0 },  // East
        Position { x: 0, y: 1 },  // South
        Position { x: -1, y: 0 }, // West
    ];

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        Self::DIRECTIONS.into_iter().map(move |d| self + d)
    }

    /// Manhattan distance, the range metric used by attacks and fog limits.
    #[inline]
    pub fn distance(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    #[inline]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.distance(other) == 1
    }
}

impl std::ops::Add for Position {
    type Output = Position;

    fn add(self, other: Position) -> Position {
        Position {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_are_orthogonal_and_adjacent() {
        let origin = Position::new(3, 3);
        let neighbors: Vec<_> = origin.neighbors().collect();
        assert_eq!(neighbors.len(), 4);
        assert!(neighbors.iter().all(|n| origin.is_adjacent(*n)));
        assert!(!neighbors.contains(&Position::new(4, 4)));
    }

    #[test]
    fn distance_is_manhattan() {
        assert_eq!(Position::new(0, 0).distance(Position::new(2, -3)), 5);
        assert_eq!(Position::new(1, 1).distance(Position::new(1, 1)), 0);
    }
}
