//! Structural validity check for a fully assembled puzzle instance.
//!
//! Checks run in a fixed order and stop at the first violation:
//! block coverage, block connectivity, pipe path shape, pipe endpoints, and
//! finally pipe attachment (every block piped, rotations in sync).

use std::fmt;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::grid::Cell;
use crate::puzzle::PuzzleInstance;

/// Which invariant a violation breaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// A block places a unit outside the grid.
    OutOfBounds,
    /// Two block units claim the same cell.
    Overlap,
    /// A grid cell belongs to no block.
    Gap,
    /// A shape edge does not join the cells it names, once unrotated.
    ShapeMismatch,
    /// A block's units are not all linked by its shape edges.
    Disconnected,
    EmptyPipe,
    /// A pipe segment enters and exits through the same face.
    DegenerateSegment,
    /// The pipe visits a cell twice.
    Revisit,
    /// Consecutive pipe segments do not join.
    Discontinuity,
    /// A pipe end does not match its declared anchor.
    EndpointMismatch,
    /// A block carries no pipe segment.
    UnpipedBlock,
    /// A pipe segment is not carried by the block owning its cell.
    UnattachedSegment,
    /// A carried segment disagrees with the pipe once unrotated.
    RotationDesync,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::OutOfBounds => "out_of_bounds",
            ViolationKind::Overlap => "overlap",
            ViolationKind::Gap => "gap",
            ViolationKind::ShapeMismatch => "shape_mismatch",
            ViolationKind::Disconnected => "disconnected",
            ViolationKind::EmptyPipe => "empty_pipe",
            ViolationKind::DegenerateSegment => "degenerate_segment",
            ViolationKind::Revisit => "revisit",
            ViolationKind::Discontinuity => "discontinuity",
            ViolationKind::EndpointMismatch => "endpoint_mismatch",
            ViolationKind::UnpipedBlock => "unpiped_block",
            ViolationKind::UnattachedSegment => "unattached_segment",
            ViolationKind::RotationDesync => "rotation_desync",
        };
        f.write_str(name)
    }
}

/// Where a violation was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    Cell(Cell),
    Block(usize),
    Pipe,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Cell(cell) => write!(f, "{cell}"),
            Location::Block(id) => write!(f, "block {id}"),
            Location::Pipe => f.write_str("pipe"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
#[error("ConstraintViolation({kind}, {location})")]
pub struct Violation {
    pub kind: ViolationKind,
    pub location: Location,
}

impl Violation {
    fn at_cell(kind: ViolationKind, cell: Cell) -> Self {
        Self {
            kind,
            location: Location::Cell(cell),
        }
    }

    fn at_block(kind: ViolationKind, id: usize) -> Self {
        Self {
            kind,
            location: Location::Block(id),
        }
    }
}

/// Decides whether `instance` is a valid puzzle.
///
/// Pure: the result depends only on the instance, however it was produced.
pub fn verify(instance: &PuzzleInstance) -> Result<(), Violation> {
    check_coverage(instance)?;
    check_connectivity(instance)?;
    check_path(instance)?;
    check_endpoints(instance)?;
    check_attachment(instance)
}

/// Block placements tile the grid exactly.
fn check_coverage(instance: &PuzzleInstance) -> Result<(), Violation> {
    let grid = &instance.grid;
    let mut claimed = vec![false; grid.cell_count()];

    for block in &instance.blocks {
        for &cell in &block.cells {
            if !grid.contains(cell) {
                return Err(Violation::at_cell(ViolationKind::OutOfBounds, cell));
            }
            let index = grid.index_of(cell);
            if claimed[index] {
                return Err(Violation::at_cell(ViolationKind::Overlap, cell));
            }
            claimed[index] = true;
        }
    }

    match claimed.iter().position(|&taken| !taken) {
        Some(index) => Err(Violation::at_cell(ViolationKind::Gap, grid.cell_at(index))),
        None => Ok(()),
    }
}

/// Every edge, unrotated, joins its two cells, and the edges link all units.
fn check_connectivity(instance: &PuzzleInstance) -> Result<(), Violation> {
    for block in &instance.blocks {
        for edge in &block.edges {
            let (Some(from), Some(to)) = (block.cell(edge.from), block.cell(edge.to)) else {
                return Err(Violation::at_block(ViolationKind::ShapeMismatch, block.id));
            };
            let direction = block.rotation.invert(edge.direction);
            if instance.grid.neighbor(from, direction) != Some(to) {
                return Err(Violation::at_cell(ViolationKind::ShapeMismatch, from));
            }
        }

        let Some(anchor) = block.cell(1) else {
            return Err(Violation::at_block(ViolationKind::Disconnected, block.id));
        };
        if block.place_from(anchor).as_deref() != Some(block.cells.as_slice()) {
            return Err(Violation::at_block(ViolationKind::Disconnected, block.id));
        }
    }
    Ok(())
}

/// Distinct cells, joined segments.
fn check_path(instance: &PuzzleInstance) -> Result<(), Violation> {
    let grid = &instance.grid;
    let segments = &instance.pipe.segments;
    if segments.is_empty() {
        return Err(Violation {
            kind: ViolationKind::EmptyPipe,
            location: Location::Pipe,
        });
    }

    let mut seen = FxHashSet::default();
    for segment in segments {
        if !grid.contains(segment.cell) {
            return Err(Violation::at_cell(ViolationKind::OutOfBounds, segment.cell));
        }
        if segment.entry == segment.exit {
            return Err(Violation::at_cell(
                ViolationKind::DegenerateSegment,
                segment.cell,
            ));
        }
        if !seen.insert(segment.cell) {
            return Err(Violation::at_cell(ViolationKind::Revisit, segment.cell));
        }
    }

    for pair in segments.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let expected = grid.neighbor(current.cell, current.exit);
        if expected != Some(next.cell) || current.exit.opposite() != next.entry {
            let location = expected.unwrap_or(current.cell);
            return Err(Violation::at_cell(ViolationKind::Discontinuity, location));
        }
    }
    Ok(())
}

/// Both pipe ends sit on their declared border anchors.
fn check_endpoints(instance: &PuzzleInstance) -> Result<(), Violation> {
    let grid = &instance.grid;
    let pipe = &instance.pipe;
    let (Some(first), Some(last)) = (pipe.segments.first(), pipe.segments.last()) else {
        return Err(Violation {
            kind: ViolationKind::EmptyPipe,
            location: Location::Pipe,
        });
    };

    let ends = [
        (first.cell, first.entry, pipe.pipe_in),
        (last.cell, last.exit, pipe.pipe_out),
    ];
    for (cell, direction, anchor) in ends {
        if cell != anchor.cell
            || direction != anchor.direction
            || !grid.is_border_adjacent(anchor.cell, anchor.direction)
        {
            return Err(Violation::at_cell(ViolationKind::EndpointMismatch, cell));
        }
    }
    Ok(())
}

/// Every block carries a segment and every pipe segment is carried by the
/// block owning its cell, with directions matching the pipe once unrotated.
fn check_attachment(instance: &PuzzleInstance) -> Result<(), Violation> {
    let segments = &instance.pipe.segments;

    if let Some(block) = instance.blocks.iter().find(|b| b.segments.is_empty()) {
        return Err(Violation::at_block(ViolationKind::UnpipedBlock, block.id));
    }

    let mut carried = vec![false; segments.len()];
    for block in &instance.blocks {
        for attached in &block.segments {
            let Some(cell) = block.cell(attached.unit) else {
                return Err(Violation::at_block(ViolationKind::UnattachedSegment, block.id));
            };
            let Some(segment) = segments.get(attached.position) else {
                return Err(Violation::at_cell(ViolationKind::UnattachedSegment, cell));
            };
            if segment.cell != cell || carried[attached.position] {
                return Err(Violation::at_cell(ViolationKind::UnattachedSegment, cell));
            }
            carried[attached.position] = true;

            let entry = block.rotation.invert(attached.entry);
            let exit = block.rotation.invert(attached.exit);
            if !segment.connects(entry, exit) {
                return Err(Violation::at_cell(ViolationKind::RotationDesync, cell));
            }
        }
    }

    match segments.iter().zip(carried).find(|(_, carried)| !carried) {
        Some((segment, _)) => Err(Violation::at_cell(
            ViolationKind::UnattachedSegment,
            segment.cell,
        )),
        None => Ok(()),
    }
}
