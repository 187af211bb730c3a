//! Puzzle instance data model.
//!
//! A block stores its solution placement (global cells) together with the
//! presented shape: local adjacency edges and attached pipe segments, both
//! expressed in the block's rotated frame. The pipe itself is kept in the
//! solution frame so the two can be checked against each other.

use std::collections::VecDeque;
use std::ops::RangeInclusive;

use crate::geometry::Rotation;
use crate::grid::{Cell, Coord, Direction, Grid};

/// Adjacency between two units of a block, in the block's rotated frame.
///
/// `to` lies one step from `from` in `direction`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalEdge {
    pub from: usize,
    pub to: usize,
    pub direction: Direction,
}

/// A pipe segment as carried by a block, in the block's rotated frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttachedSegment {
    /// Unit (1-based) of the block holding this segment.
    pub unit: usize,
    /// Index of the segment within [`Pipe::segments`].
    pub position: usize,
    pub entry: Direction,
    pub exit: Direction,
}

/// A rigid piece of the puzzle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// 1-based block id.
    pub id: usize,
    /// Solution cell of each unit; unit `u` lives at `cells[u - 1]`.
    pub cells: Vec<Cell>,
    pub edges: Vec<LocalEdge>,
    pub rotation: Rotation,
    pub segments: Vec<AttachedSegment>,
}

impl Block {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Valid unit indices, 1-based.
    pub fn units(&self) -> RangeInclusive<usize> {
        1..=self.size()
    }

    pub fn cell(&self, unit: usize) -> Option<Cell> {
        unit.checked_sub(1).and_then(|i| self.cells.get(i).copied())
    }

    /// Unit offsets relative to unit 1 in the rotated frame.
    ///
    /// Walks the adjacency edges from unit 1. Returns `None` when an edge names
    /// an unknown unit, two walks disagree, or some unit is unreachable.
    pub fn shape(&self) -> Option<Vec<Coord>> {
        let size = self.size();
        if size == 0 {
            return None;
        }
        let mut offsets: Vec<Option<Coord>> = vec![None; size];
        offsets[0] = Some((0, 0, 0));

        let mut queue = VecDeque::from([1usize]);
        while let Some(unit) = queue.pop_front() {
            let (ux, uy, uz) = offsets[unit - 1]?;
            for edge in &self.edges {
                if !self.units().contains(&edge.from) || !self.units().contains(&edge.to) {
                    return None;
                }
                let (other, direction) = if edge.from == unit {
                    (edge.to, edge.direction)
                } else if edge.to == unit {
                    (edge.from, edge.direction.opposite())
                } else {
                    continue;
                };
                let (dx, dy, dz) = direction.offset();
                let expected = (ux + dx, uy + dy, uz + dz);
                match offsets[other - 1] {
                    Some(existing) if existing != expected => return None,
                    Some(_) => {}
                    None => {
                        offsets[other - 1] = Some(expected);
                        queue.push_back(other);
                    }
                }
            }
        }

        offsets.into_iter().collect()
    }

    /// Solution cells derived by undoing the rotation on the shape and
    /// translating it so unit 1 lands on `anchor`.
    pub fn place_from(&self, anchor: Cell) -> Option<Vec<Cell>> {
        let shape = self.shape()?;
        Some(
            shape
                .into_iter()
                .map(|offset| anchor.offset(self.rotation.invert_offset(offset)))
                .collect(),
        )
    }
}

/// One cell of the pipe, in the solution frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipeSegment {
    pub cell: Cell,
    pub entry: Direction,
    pub exit: Direction,
}

impl PipeSegment {
    /// True when the segment joins `a` and `b`, in either order.
    pub fn connects(&self, a: Direction, b: Direction) -> bool {
        (self.entry == a && self.exit == b) || (self.entry == b && self.exit == a)
    }
}

/// A pipe end: a border cell and the direction pointing out of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub cell: Cell,
    pub direction: Direction,
}

/// The single path threading through the puzzle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pipe {
    pub segments: Vec<PipeSegment>,
    pub pipe_in: Endpoint,
    pub pipe_out: Endpoint,
}

impl Pipe {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A complete puzzle: grid, rotated blocks and the pipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleInstance {
    pub grid: Grid,
    pub blocks: Vec<Block>,
    pub pipe: Pipe,
}

impl PuzzleInstance {
    /// The block whose placement holds `cell`, if any.
    pub fn block_at(&self, cell: Cell) -> Option<&Block> {
        self.blocks.iter().find(|block| block.cells.contains(&cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Angle;

    /// An L tromino lying in the x-z plane, unrotated.
    fn l_block() -> Block {
        Block {
            id: 1,
            cells: vec![Cell::new(1, 1, 1), Cell::new(2, 1, 1), Cell::new(2, 1, 2)],
            edges: vec![
                LocalEdge {
                    from: 1,
                    to: 2,
                    direction: Direction::East,
                },
                LocalEdge {
                    from: 3,
                    to: 2,
                    direction: Direction::South,
                },
            ],
            rotation: Rotation::IDENTITY,
            segments: Vec::new(),
        }
    }

    #[test]
    fn test_shape_walks_edges_both_ways() {
        let shape = l_block().shape().unwrap();
        assert_eq!(shape, vec![(0, 0, 0), (1, 0, 0), (1, 0, 1)]);
    }

    #[test]
    fn test_place_from_recovers_cells() {
        let block = l_block();
        assert_eq!(block.place_from(block.cells[0]).unwrap(), block.cells);
    }

    #[test]
    fn test_place_from_undoes_rotation() {
        let mut block = l_block();
        block.rotation = Rotation::new(Angle::Deg90, Angle::Deg180, Angle::Deg270);
        for edge in &mut block.edges {
            edge.direction = block.rotation.apply(edge.direction);
        }
        assert_eq!(block.place_from(block.cells[0]).unwrap(), block.cells);
    }

    #[test]
    fn test_shape_rejects_disconnected_units() {
        let mut block = l_block();
        block.edges.pop();
        assert_eq!(block.shape(), None);
    }

    #[test]
    fn test_shape_rejects_unknown_unit() {
        let mut block = l_block();
        block.edges[0].to = 7;
        assert_eq!(block.shape(), None);
    }

    #[test]
    fn test_segment_connects_is_unordered() {
        let segment = PipeSegment {
            cell: Cell::new(1, 1, 1),
            entry: Direction::South,
            exit: Direction::North,
        };
        assert!(segment.connects(Direction::North, Direction::South));
        assert!(segment.connects(Direction::South, Direction::North));
        assert!(!segment.connects(Direction::South, Direction::East));
    }
}
