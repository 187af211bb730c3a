//! Grid coordinate space and direction vocabulary.
//!
//! Cells are 1-indexed `(x, y, z)` triples. The x axis runs west to east
//! (width), y runs below to above (height) and z runs south to north (depth).
//! Every cell also has a flat index used by the search state arrays.

use std::fmt;

use crate::error::Error;

/// A relative offset between two cells.
pub type Coord = (i32, i32, i32);

/// A grid cell, 1-indexed on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the cell shifted by `offset`, which may lie outside any grid.
    #[inline]
    pub const fn offset(self, (dx, dy, dz): Coord) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// One of the six face directions of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Above,
    Below,
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Above,
        Direction::Below,
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit offset for one step in this direction.
    pub const fn offset(self) -> Coord {
        match self {
            Direction::Above => (0, 1, 0),
            Direction::Below => (0, -1, 0),
            Direction::North => (0, 0, 1),
            Direction::South => (0, 0, -1),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
        }
    }

    /// Inverse of [`Direction::offset`]; `None` unless `offset` is a unit axis step.
    pub fn from_offset(offset: Coord) -> Option<Self> {
        Self::ALL.into_iter().find(|dir| dir.offset() == offset)
    }

    pub const fn opposite(self) -> Self {
        match self {
            Direction::Above => Direction::Below,
            Direction::Below => Direction::Above,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Single-letter code used by the facts format.
    pub const fn letter(self) -> char {
        match self {
            Direction::Above => 'a',
            Direction::Below => 'b',
            Direction::North => 'n',
            Direction::South => 's',
            Direction::East => 'e',
            Direction::West => 'w',
        }
    }

    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "a" => Some(Direction::Above),
            "b" => Some(Direction::Below),
            "n" => Some(Direction::North),
            "s" => Some(Direction::South),
            "e" => Some(Direction::East),
            "w" => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Above => "above",
            Direction::Below => "below",
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}

/// A rectangular box of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    width: i32,
    height: i32,
    depth: i32,
}

impl Grid {
    /// Creates a grid, rejecting any non-positive dimension.
    ///
    /// The cell count must also fit in an `i32`, which keeps every flat index
    /// computation in range.
    pub fn new(width: i32, height: i32, depth: i32) -> Result<Self, Error> {
        let cell_count = width
            .checked_mul(height)
            .and_then(|area| area.checked_mul(depth));
        if width < 1 || height < 1 || depth < 1 || cell_count.is_none() {
            return Err(Error::InvalidDimensions {
                width,
                height,
                depth,
            });
        }
        Ok(Self {
            width,
            height,
            depth,
        })
    }

    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    pub const fn depth(&self) -> i32 {
        self.depth
    }

    /// Total number of cells.
    pub const fn cell_count(&self) -> usize {
        (self.width * self.height * self.depth) as usize
    }

    #[inline]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x >= 1
            && cell.x <= self.width
            && cell.y >= 1
            && cell.y <= self.height
            && cell.z >= 1
            && cell.z <= self.depth
    }

    /// Converts a cell to its flat index, x-major.
    ///
    /// The cell must lie inside the grid.
    #[inline(always)]
    pub const fn index_of(&self, cell: Cell) -> usize {
        (((cell.x - 1) * self.height + (cell.y - 1)) * self.depth + (cell.z - 1)) as usize
    }

    /// Converts a flat index back to its cell.
    #[inline(always)]
    pub const fn cell_at(&self, index: usize) -> Cell {
        let index = index as i32;
        Cell::new(
            index / (self.height * self.depth) + 1,
            (index / self.depth) % self.height + 1,
            index % self.depth + 1,
        )
    }

    /// Enumerates every cell in flat index order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.cell_count()).map(|index| self.cell_at(index))
    }

    /// The adjacent cell in `direction`, or `None` when it would leave the grid.
    #[inline]
    pub fn neighbor(&self, cell: Cell, direction: Direction) -> Option<Cell> {
        let next = cell.offset(direction.offset());
        self.contains(next).then_some(next)
    }

    /// True when stepping from `cell` in `direction` leaves the grid.
    #[inline]
    pub fn is_border_adjacent(&self, cell: Cell, direction: Direction) -> bool {
        self.contains(cell) && self.neighbor(cell, direction).is_none()
    }

    /// All `(cell, direction)` pairs that may anchor a pipe end.
    pub fn border_anchors(&self) -> Vec<(Cell, Direction)> {
        self.cells()
            .flat_map(|cell| Direction::ALL.into_iter().map(move |dir| (cell, dir)))
            .filter(|&(cell, dir)| self.is_border_adjacent(cell, dir))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_dimensions() {
        assert!(matches!(
            Grid::new(0, 3, 3),
            Err(Error::InvalidDimensions { width: 0, .. })
        ));
        assert!(Grid::new(3, -1, 3).is_err());
        assert!(Grid::new(1, 1, 1).is_ok());
    }

    #[test]
    fn test_rejects_overflowing_cell_count() {
        assert_eq!(
            Grid::new(2000, 2000, 2000),
            Err(Error::InvalidDimensions {
                width: 2000,
                height: 2000,
                depth: 2000,
            })
        );
        assert!(Grid::new(i32::MAX, 1, 1).is_ok());
        assert!(Grid::new(i32::MAX, 2, 1).is_err());
    }

    #[test]
    fn test_index_conversion_roundtrip() {
        let grid = Grid::new(2, 3, 4).unwrap();
        for index in 0..grid.cell_count() {
            let cell = grid.cell_at(index);
            assert!(grid.contains(cell), "cell_at({index}) left the grid: {cell}");
            assert_eq!(grid.index_of(cell), index, "Roundtrip failed for index {index}");
        }
    }

    #[test]
    fn test_cells_enumerates_every_cell_once() {
        let grid = Grid::new(3, 2, 2).unwrap();
        let mut cells: Vec<Cell> = grid.cells().collect();
        assert_eq!(cells.len(), 12);
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), 12);
    }

    #[test]
    fn test_neighbor_stays_inside() {
        let grid = Grid::new(2, 2, 2).unwrap();
        let corner = Cell::new(1, 1, 1);
        assert_eq!(
            grid.neighbor(corner, Direction::East),
            Some(Cell::new(2, 1, 1))
        );
        assert_eq!(
            grid.neighbor(corner, Direction::Above),
            Some(Cell::new(1, 2, 1))
        );
        assert_eq!(
            grid.neighbor(corner, Direction::North),
            Some(Cell::new(1, 1, 2))
        );
        assert_eq!(grid.neighbor(corner, Direction::West), None);
        assert_eq!(grid.neighbor(corner, Direction::Below), None);
        assert_eq!(grid.neighbor(corner, Direction::South), None);
    }

    #[test]
    fn test_opposite_is_involution() {
        for dir in Direction::ALL {
            assert_ne!(dir, dir.opposite());
            assert_eq!(dir, dir.opposite().opposite());
            let (x, y, z) = dir.offset();
            assert_eq!(dir.opposite().offset(), (-x, -y, -z));
        }
    }

    #[test]
    fn test_border_anchors_of_column() {
        // a 1x1x3 column: the middle cell has four open faces, the ends five
        let grid = Grid::new(1, 1, 3).unwrap();
        let anchors = grid.border_anchors();
        assert_eq!(anchors.len(), 5 + 4 + 5);
        assert!(anchors.contains(&(Cell::new(1, 1, 1), Direction::South)));
        assert!(!anchors.contains(&(Cell::new(1, 1, 1), Direction::North)));
        assert!(grid.is_border_adjacent(Cell::new(1, 1, 3), Direction::North));
        assert!(!grid.is_border_adjacent(Cell::new(1, 1, 4), Direction::North));
    }

    #[test]
    fn test_letter_codes_roundtrip() {
        for dir in Direction::ALL {
            let letter = dir.letter().to_string();
            assert_eq!(Direction::from_letter(&letter), Some(dir));
        }
        assert_eq!(Direction::from_letter("x"), None);
    }
}
