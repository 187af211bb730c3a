//! Construction of the pipe: a simple path between two border anchors that
//! passes through every block at least once.
//!
//! The search extends the path one cell at a time from the entry anchor,
//! trying exit directions in random order and backtracking on dead ends.
//! A branch is cut as soon as the exit anchor's cell, or some block the path
//! has not touched yet, becomes unreachable through unvisited cells.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::error::Error;
use crate::grid::{Cell, Direction, Grid};
use crate::partition::Region;
use crate::puzzle::{AttachedSegment, Endpoint, Pipe, PipeSegment};

/// Builds a pipe touching every block.
///
/// `owner` maps each flat cell index to its 1-based block id. Each attempt
/// draws fresh anchors and may spend at most `steps` extensions.
pub fn build_pipe<R: Rng + ?Sized>(
    grid: &Grid,
    owner: &[usize],
    block_count: usize,
    attempts: usize,
    steps: usize,
    rng: &mut R,
) -> Result<Pipe, Error> {
    let anchors = grid.border_anchors();

    for attempt in 0..attempts {
        let Some(&(in_cell, in_dir)) = anchors.choose(rng) else {
            break;
        };
        let exits: Vec<(Cell, Direction)> = anchors
            .iter()
            .copied()
            .filter(|&(cell, _)| cell != in_cell)
            .collect();
        let Some(&(out_cell, out_dir)) = exits.choose(rng) else {
            break;
        };

        let pipe_in = Endpoint {
            cell: in_cell,
            direction: in_dir,
        };
        let pipe_out = Endpoint {
            cell: out_cell,
            direction: out_dir,
        };

        let mut search = PathSearch::new(grid, owner, block_count, pipe_out, steps);
        if let Some(segments) = search.run(pipe_in, rng) {
            return Ok(Pipe {
                segments,
                pipe_in,
                pipe_out,
            });
        }
        trace!(attempt, "pipe search exhausted, redrawing anchors");
    }

    Err(Error::PipeIncomplete { attempts })
}

/// Groups pipe segments by the region owning their cell.
///
/// Returned segments are still in the solution frame; entry `i` belongs to
/// `regions[i]`.
pub fn attach(grid: &Grid, regions: &[Region], pipe: &Pipe) -> Vec<Vec<AttachedSegment>> {
    let mut unit_of: Vec<Option<(usize, usize)>> = vec![None; grid.cell_count()];
    for (block_index, region) in regions.iter().enumerate() {
        for (i, &cell) in region.cells.iter().enumerate() {
            unit_of[grid.index_of(cell)] = Some((block_index, i + 1));
        }
    }

    let mut attached = vec![Vec::new(); regions.len()];
    for (position, segment) in pipe.segments.iter().enumerate() {
        if let Some((block_index, unit)) = unit_of[grid.index_of(segment.cell)] {
            attached[block_index].push(AttachedSegment {
                unit,
                position,
                entry: segment.entry,
                exit: segment.exit,
            });
        }
    }
    attached
}

/// Mutable state of one path search attempt.
struct PathSearch<'a> {
    grid: &'a Grid,
    owner: &'a [usize],
    block_count: usize,
    pipe_out: Endpoint,
    visited: Vec<bool>,
    /// Path cells per block id.
    hits: Vec<u32>,
    covered: usize,
    /// Cells on the path with their entry direction.
    path: Vec<(Cell, Direction)>,
    /// Exit direction of every path cell but the last.
    exits: Vec<Direction>,
    steps_left: usize,
}

impl<'a> PathSearch<'a> {
    fn new(
        grid: &'a Grid,
        owner: &'a [usize],
        block_count: usize,
        pipe_out: Endpoint,
        steps: usize,
    ) -> Self {
        Self {
            grid,
            owner,
            block_count,
            pipe_out,
            visited: vec![false; grid.cell_count()],
            hits: vec![0; block_count + 1],
            covered: 0,
            path: Vec::new(),
            exits: Vec::new(),
            steps_left: steps,
        }
    }

    fn enter(&mut self, cell: Cell, entry: Direction) {
        let index = self.grid.index_of(cell);
        self.visited[index] = true;
        let block = self.owner[index];
        if self.hits[block] == 0 {
            self.covered += 1;
        }
        self.hits[block] += 1;
        self.path.push((cell, entry));
    }

    /// Undoes the most recent [`PathSearch::enter`] and the exit leading to it.
    fn leave(&mut self) {
        let Some((cell, _)) = self.path.pop() else {
            return;
        };
        self.exits.pop();
        let index = self.grid.index_of(cell);
        self.visited[index] = false;
        let block = self.owner[index];
        self.hits[block] -= 1;
        if self.hits[block] == 0 {
            self.covered -= 1;
        }
    }

    /// Depth-first search from `pipe_in`, with `frames[k]` holding the untried
    /// exit directions of `path[k]`.
    fn run<R: Rng + ?Sized>(&mut self, pipe_in: Endpoint, rng: &mut R) -> Option<Vec<PipeSegment>> {
        self.enter(pipe_in.cell, pipe_in.direction);
        let mut frames: Vec<Vec<Direction>> = Vec::new();

        loop {
            let &(cell, entry) = self.path.last()?;
            if cell == self.pipe_out.cell {
                // the exit cell always terminates the path
                if self.covered == self.block_count && entry != self.pipe_out.direction {
                    return Some(self.segments());
                }
                if frames.is_empty() {
                    return None;
                }
                self.leave();
            } else {
                let mut directions: Vec<Direction> = Direction::ALL
                    .into_iter()
                    .filter(|&dir| dir != entry)
                    .collect();
                directions.shuffle(rng);
                frames.push(directions);
            }

            loop {
                let frame = frames.last_mut()?;
                let Some(exit) = frame.pop() else {
                    frames.pop();
                    if frames.is_empty() {
                        return None;
                    }
                    self.leave();
                    continue;
                };

                let &(from, _) = self.path.last()?;
                let Some(next) = self.grid.neighbor(from, exit) else {
                    continue;
                };
                if self.visited[self.grid.index_of(next)] || !self.is_viable(next) {
                    continue;
                }

                self.steps_left = self.steps_left.checked_sub(1)?;
                self.exits.push(exit);
                self.enter(next, exit.opposite());
                break;
            }
        }
    }

    /// True when, through unvisited cells from `start`, both the exit cell and
    /// every block the path has not yet touched are still reachable.
    fn is_viable(&self, start: Cell) -> bool {
        let target = self.pipe_out.cell;
        let mut seen = self.visited.clone();
        let mut reached = vec![false; self.block_count + 1];
        let mut found_exit = false;

        seen[self.grid.index_of(start)] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(cell) = queue.pop_front() {
            reached[self.owner[self.grid.index_of(cell)]] = true;
            if cell == target {
                // the exit cell ends the path, so nothing is reached through it
                found_exit = true;
                continue;
            }
            for direction in Direction::ALL {
                if let Some(next) = self.grid.neighbor(cell, direction) {
                    let index = self.grid.index_of(next);
                    if !seen[index] {
                        seen[index] = true;
                        queue.push_back(next);
                    }
                }
            }
        }

        found_exit
            && (1..=self.block_count).all(|block| self.hits[block] > 0 || reached[block])
    }

    fn segments(&self) -> Vec<PipeSegment> {
        self.path
            .iter()
            .zip(self.exits.iter().copied().chain([self.pipe_out.direction]))
            .map(|(&(cell, entry), exit)| PipeSegment { cell, entry, exit })
            .collect()
    }
}
