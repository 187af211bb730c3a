//! Randomized partition of the grid into connected blocks.
//!
//! Block sizes are drawn first, then each block is grown from a random seed
//! cell by repeatedly claiming a random free neighbor. Growth backtracks
//! inside a block through an undo log; when a block cannot be completed the
//! whole partition restarts from an empty grid.

use std::collections::VecDeque;

use rand::seq::{index, SliceRandom};
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::error::Error;
use crate::grid::{Cell, Direction, Grid};
use crate::puzzle::LocalEdge;

/// Smallest allowed block.
pub const MIN_BLOCK_SIZE: usize = 2;

/// Grids above this many cells get the size-diversity filter.
const DIVERSITY_THRESHOLD: usize = 12;

/// A connected group of cells in the solution frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    /// Cell of each unit; unit `u` lives at `cells[u - 1]`.
    pub cells: Vec<Cell>,
    /// Growth edges in discovery order.
    pub edges: Vec<LocalEdge>,
}

/// Allowed block counts for a grid of `cell_count` cells.
pub fn block_count_range(cell_count: usize) -> (usize, usize) {
    let min_count = usize::max(2, cell_count.div_ceil(6));
    (min_count, 2 * min_count)
}

/// Draws a multiset of block sizes summing to `cell_count`.
///
/// The block count is uniform over [`block_count_range`]; sizes are uniform
/// over the compositions of `cell_count` into parts of at least
/// [`MIN_BLOCK_SIZE`]. Draws rejected by the diversity filter are retried up
/// to `max_draws` times.
pub fn choose_block_sizes<R: Rng + ?Sized>(
    cell_count: usize,
    max_draws: usize,
    rng: &mut R,
) -> Result<Vec<usize>, Error> {
    let (min_count, max_count) = block_count_range(cell_count);

    for _ in 0..max_draws {
        let block_count = rng.gen_range(min_count..=max_count);
        if block_count * MIN_BLOCK_SIZE > cell_count {
            continue;
        }

        // stars and bars: place block_count - 1 bars among the spare cells
        let spare = cell_count - block_count * MIN_BLOCK_SIZE;
        let slots = spare + block_count - 1;
        let mut bars = index::sample(rng, slots, block_count - 1).into_vec();
        bars.sort_unstable();
        bars.push(slots);

        let mut sizes = Vec::with_capacity(block_count);
        let mut previous = None;
        for bar in bars {
            let stars = match previous {
                None => bar,
                Some(prev) => bar - prev - 1,
            };
            sizes.push(MIN_BLOCK_SIZE + stars);
            previous = Some(bar);
        }

        if sizes_acceptable(&sizes, cell_count) {
            return Ok(sizes);
        }
    }

    Err(Error::GenerationInfeasible {
        attempts: max_draws,
    })
}

/// Diversity filter for larger grids.
///
/// Rejects multisets where a repeated size covers more than 30% of the
/// blocks, or where the size spread exceeds the block count.
fn sizes_acceptable(sizes: &[usize], cell_count: usize) -> bool {
    if cell_count <= DIVERSITY_THRESHOLD {
        return true;
    }
    let block_count = sizes.len();

    let mut multiplicity: FxHashMap<usize, usize> = FxHashMap::default();
    for &size in sizes {
        *multiplicity.entry(size).or_default() += 1;
    }
    if multiplicity
        .values()
        .any(|&count| count >= 2 && count * 10 > block_count * 3)
    {
        return false;
    }

    let (Some(min), Some(max)) = (sizes.iter().min(), sizes.iter().max()) else {
        return false;
    };
    max - min <= block_count
}

/// Partitions the grid into connected regions with the given sizes, in order.
///
/// Each restart begins from an empty grid and may spend at most
/// `growth_steps` growth steps. Sizes that cannot tile the grid at all are
/// reported as [`Error::GenerationInfeasible`] without searching.
pub fn partition<R: Rng + ?Sized>(
    grid: &Grid,
    sizes: &[usize],
    restarts: usize,
    growth_steps: usize,
    rng: &mut R,
) -> Result<Vec<Region>, Error> {
    if sizes.iter().sum::<usize>() != grid.cell_count() || sizes.contains(&0) {
        return Err(Error::GenerationInfeasible { attempts: 0 });
    }

    for restart in 0..restarts {
        let mut state = PartitionState::new(grid, growth_steps);
        if let Some(regions) = state.fill(sizes, rng) {
            return Ok(regions);
        }
        trace!(restart, "partition exhausted, restarting");
    }

    Err(Error::PartitionStuck { restarts })
}

/// Block id (1-based) owning each flat cell index.
pub fn owners(grid: &Grid, regions: &[Region]) -> Vec<usize> {
    let mut owner = vec![0; grid.cell_count()];
    for (block_index, region) in regions.iter().enumerate() {
        for &cell in &region.cells {
            owner[grid.index_of(cell)] = block_index + 1;
        }
    }
    owner
}

/// A free cell reachable from a block unit.
#[derive(Clone, Copy)]
struct Candidate {
    cell: Cell,
    from: usize,
    direction: Direction,
}

/// Cell assignment for one partition attempt.
struct PartitionState<'a> {
    grid: &'a Grid,
    /// Block index owning each flat cell.
    owner: Vec<Option<usize>>,
    /// Flat indices in assignment order, popped on backtrack.
    undo: Vec<usize>,
    steps_left: usize,
}

impl<'a> PartitionState<'a> {
    fn new(grid: &'a Grid, growth_steps: usize) -> Self {
        Self {
            grid,
            owner: vec![None; grid.cell_count()],
            undo: Vec::with_capacity(grid.cell_count()),
            steps_left: growth_steps,
        }
    }

    #[inline]
    fn is_free(&self, cell: Cell) -> bool {
        self.owner[self.grid.index_of(cell)].is_none()
    }

    fn assign(&mut self, cell: Cell, block: usize) {
        let index = self.grid.index_of(cell);
        self.owner[index] = Some(block);
        self.undo.push(index);
    }

    fn unassign_last(&mut self) {
        if let Some(index) = self.undo.pop() {
            self.owner[index] = None;
        }
    }

    /// Grows every block in order. `None` means this attempt is exhausted.
    fn fill<R: Rng + ?Sized>(&mut self, sizes: &[usize], rng: &mut R) -> Option<Vec<Region>> {
        let mut regions = Vec::with_capacity(sizes.len());
        for (block, &size) in sizes.iter().enumerate() {
            let region = self.grow(block, size, &sizes[block + 1..], rng)?;
            regions.push(region);
        }
        Some(regions)
    }

    /// Grows one block to `target` cells with depth-first backtracking.
    ///
    /// Uses an explicit frame stack: `frames[k]` holds the untried candidates
    /// for the state with `k + 1` cells.
    fn grow<R: Rng + ?Sized>(
        &mut self,
        block: usize,
        target: usize,
        remaining: &[usize],
        rng: &mut R,
    ) -> Option<Region> {
        let free: Vec<Cell> = self.grid.cells().filter(|&c| self.is_free(c)).collect();
        let &seed = free.choose(rng)?;
        self.assign(seed, block);

        let mut cells = vec![seed];
        let mut edges: Vec<LocalEdge> = Vec::with_capacity(target.saturating_sub(1));
        let mut frames: Vec<Vec<Candidate>> = Vec::with_capacity(target);

        loop {
            if cells.len() == target {
                if self.leaves_feasible_remainder(remaining) {
                    return Some(Region { cells, edges });
                }
                if frames.is_empty() {
                    return None;
                }
                self.retract(&mut cells, &mut edges);
            } else {
                frames.push(self.candidates(&cells, rng));
            }

            // take the next untried candidate, unwinding exhausted frames
            loop {
                let frame = frames.last_mut()?;
                if let Some(candidate) = frame.pop() {
                    self.steps_left = self.steps_left.checked_sub(1)?;
                    self.assign(candidate.cell, block);
                    cells.push(candidate.cell);
                    edges.push(LocalEdge {
                        from: candidate.from,
                        to: cells.len(),
                        direction: candidate.direction,
                    });
                    break;
                }
                frames.pop();
                if frames.is_empty() {
                    return None;
                }
                self.retract(&mut cells, &mut edges);
            }
        }
    }

    fn retract(&mut self, cells: &mut Vec<Cell>, edges: &mut Vec<LocalEdge>) {
        cells.pop();
        edges.pop();
        self.unassign_last();
    }

    /// Distinct free neighbors of the block in random order, each with one
    /// randomly chosen connecting unit.
    fn candidates<R: Rng + ?Sized>(&self, cells: &[Cell], rng: &mut R) -> Vec<Candidate> {
        let mut links = Vec::new();
        for (i, &cell) in cells.iter().enumerate() {
            for direction in Direction::ALL {
                if let Some(next) = self.grid.neighbor(cell, direction) {
                    if self.is_free(next) {
                        links.push(Candidate {
                            cell: next,
                            from: i + 1,
                            direction,
                        });
                    }
                }
            }
        }
        links.shuffle(rng);

        let mut seen = FxHashSet::default();
        links.retain(|link| seen.insert(link.cell));
        links
    }

    /// Prunes completions that strand free cells no remaining block can fill.
    fn leaves_feasible_remainder(&self, remaining: &[usize]) -> bool {
        let Some(&smallest) = remaining.iter().min() else {
            return true;
        };
        let components = self.free_components();
        if remaining.len() == 1 {
            return components.len() == 1;
        }
        components.iter().all(|&size| size >= smallest)
    }

    /// Sizes of the connected components of free cells.
    fn free_components(&self) -> Vec<usize> {
        let mut visited = vec![false; self.grid.cell_count()];
        let mut sizes = Vec::new();

        for start in self.grid.cells() {
            let start_index = self.grid.index_of(start);
            if visited[start_index] || !self.is_free(start) {
                continue;
            }
            visited[start_index] = true;
            let mut size = 0;
            let mut queue = VecDeque::from([start]);
            while let Some(cell) = queue.pop_front() {
                size += 1;
                for direction in Direction::ALL {
                    if let Some(next) = self.grid.neighbor(cell, direction) {
                        let next_index = self.grid.index_of(next);
                        if !visited[next_index] && self.is_free(next) {
                            visited[next_index] = true;
                            queue.push_back(next);
                        }
                    }
                }
            }
            sizes.push(size);
        }

        sizes
    }
}
