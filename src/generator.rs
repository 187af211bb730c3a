//! Puzzle generation: partition, pipe, rotation and verification inside one
//! bounded retry loop.
//!
//! Every attempt starts from scratch and draws all of its random choices from
//! the caller's generator, so a fixed seed reproduces the same instance.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::error::Error;
use crate::geometry::Rotation;
use crate::grid::Grid;
use crate::partition::{choose_block_sizes, owners, partition, Region};
use crate::pipe::{attach, build_pipe};
use crate::puzzle::{AttachedSegment, Block, LocalEdge, Pipe, PuzzleInstance};
use crate::verify::verify;

/// Search budgets for [`Generator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Full generation attempts before giving up.
    pub max_attempts: usize,
    /// Size-multiset draws per attempt.
    pub size_draws: usize,
    /// Partition restarts per attempt.
    pub partition_restarts: usize,
    /// Growth steps per partition restart.
    pub growth_steps: usize,
    /// Anchor draws per attempt.
    pub pipe_attempts: usize,
    /// Path extensions per anchor draw.
    pub pipe_steps: usize,
    /// Wall-clock limit, checked before each attempt.
    pub time_limit: Option<Duration>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            size_draws: 1_000,
            partition_restarts: 200,
            growth_steps: 20_000,
            pipe_attempts: 50,
            pipe_steps: 200_000,
            time_limit: None,
        }
    }
}

/// Generates puzzle instances.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates a verified instance for `grid`.
    ///
    /// Any failing component restarts the whole attempt; running out of
    /// attempts or time yields [`Error::GenerationInfeasible`].
    pub fn generate<R: Rng + ?Sized>(
        &self,
        grid: Grid,
        rng: &mut R,
    ) -> Result<PuzzleInstance, Error> {
        let started = Instant::now();

        for attempt in 1..=self.config.max_attempts {
            if let Some(limit) = self.config.time_limit {
                if started.elapsed() >= limit {
                    debug!(attempt, ?limit, "time limit reached");
                    return Err(Error::GenerationInfeasible {
                        attempts: attempt - 1,
                    });
                }
            }

            match self.attempt(grid, rng) {
                Ok(instance) => {
                    info!(
                        attempt,
                        blocks = instance.blocks.len(),
                        pipe_length = instance.pipe.len(),
                        "generated puzzle"
                    );
                    return Ok(instance);
                }
                Err(error) => debug!(attempt, %error, "generation attempt failed"),
            }
        }

        Err(Error::GenerationInfeasible {
            attempts: self.config.max_attempts,
        })
    }

    /// One generation attempt, with no state carried over from earlier ones.
    fn attempt<R: Rng + ?Sized>(&self, grid: Grid, rng: &mut R) -> Result<PuzzleInstance, Error> {
        let config = &self.config;
        let sizes = choose_block_sizes(grid.cell_count(), config.size_draws, rng)?;
        let regions = partition(
            &grid,
            &sizes,
            config.partition_restarts,
            config.growth_steps,
            rng,
        )?;
        let owner = owners(&grid, &regions);
        let pipe = build_pipe(
            &grid,
            &owner,
            regions.len(),
            config.pipe_attempts,
            config.pipe_steps,
            rng,
        )?;

        let instance = assemble(grid, &regions, pipe, rng);
        verify(&instance)?;
        Ok(instance)
    }
}

/// Rotates each region with its pipe segments into a presented block.
fn assemble<R: Rng + ?Sized>(
    grid: Grid,
    regions: &[Region],
    pipe: Pipe,
    rng: &mut R,
) -> PuzzleInstance {
    let attached = attach(&grid, regions, &pipe);
    let mut blocks = Vec::with_capacity(regions.len());
    for (i, (region, segments)) in regions.iter().zip(attached).enumerate() {
        let rotation = Rotation::random(rng);
        blocks.push(rotate_block(i + 1, region, segments, rotation));
    }

    PuzzleInstance { grid, blocks, pipe }
}

/// Applies one rotation to a region's edges and its attached segments alike.
pub fn rotate_block(
    id: usize,
    region: &Region,
    segments: Vec<AttachedSegment>,
    rotation: Rotation,
) -> Block {
    let edges = region
        .edges
        .iter()
        .map(|edge| LocalEdge {
            direction: rotation.apply(edge.direction),
            ..*edge
        })
        .collect();
    let segments = segments
        .into_iter()
        .map(|segment| AttachedSegment {
            entry: rotation.apply(segment.entry),
            exit: rotation.apply(segment.exit),
            ..segment
        })
        .collect();

    Block {
        id,
        cells: region.cells.clone(),
        edges,
        rotation,
        segments,
    }
}

/// Generates an instance with default budgets.
pub fn generate<R: Rng + ?Sized>(grid: Grid, rng: &mut R) -> Result<PuzzleInstance, Error> {
    Generator::default().generate(grid, rng)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::geometry::Angle;
    use crate::grid::{Cell, Direction};

    fn cube(size: i32) -> Grid {
        Grid::new(size, size, size).unwrap()
    }

    #[test]
    fn test_single_cell_grid_is_infeasible() {
        let grid = Grid::new(1, 1, 1).unwrap();
        let generator = Generator::new(GeneratorConfig {
            max_attempts: 3,
            size_draws: 10,
            ..GeneratorConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            generator.generate(grid, &mut rng),
            Err(Error::GenerationInfeasible { attempts: 3 })
        );
    }

    #[test]
    fn test_two_cube_instances_verify() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..10 {
            let instance = generate(cube(2), &mut rng).unwrap();
            assert!((2..=4).contains(&instance.blocks.len()));
            assert_eq!(
                instance.blocks.iter().map(Block::size).sum::<usize>(),
                8
            );
            assert_eq!(verify(&instance), Ok(()));
        }
    }

    #[test]
    fn test_three_cube_instance_invariants() {
        let grid = cube(3);
        let instance = generate(grid, &mut StdRng::seed_from_u64(22)).unwrap();

        let mut cells: Vec<Cell> = instance
            .blocks
            .iter()
            .flat_map(|block| block.cells.iter().copied())
            .collect();
        cells.sort();
        let mut expected: Vec<Cell> = grid.cells().collect();
        expected.sort();
        assert_eq!(cells, expected);

        for block in &instance.blocks {
            assert!(block.shape().is_some(), "block {} is disconnected", block.id);
            assert!(!block.segments.is_empty(), "block {} has no pipe", block.id);
        }
        assert!(instance.pipe.len() <= grid.cell_count());

        for (position, segment) in instance.pipe.segments.iter().enumerate() {
            let block = instance.block_at(segment.cell).unwrap();
            assert!(
                block.segments.iter().any(|s| s.position == position),
                "segment {position} not carried by block {}",
                block.id
            );
        }
    }

    #[test]
    fn test_fixed_seed_reproduces_instance() {
        let grid = Grid::new(3, 2, 3).unwrap();
        let first = generate(grid, &mut StdRng::seed_from_u64(23)).unwrap();
        let second = generate(grid, &mut StdRng::seed_from_u64(23)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_component_failure_restarts_attempt() {
        let generator = Generator::new(GeneratorConfig {
            max_attempts: 4,
            partition_restarts: 0,
            ..GeneratorConfig::default()
        });
        assert_eq!(generator.config().partition_restarts, 0);
        let mut rng = StdRng::seed_from_u64(25);
        assert_eq!(
            generator.generate(cube(2), &mut rng),
            Err(Error::GenerationInfeasible { attempts: 4 })
        );
    }

    #[test]
    fn test_zero_time_limit_stops_before_first_attempt() {
        let generator = Generator::new(GeneratorConfig {
            time_limit: Some(Duration::ZERO),
            ..GeneratorConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(24);
        assert_eq!(
            generator.generate(cube(2), &mut rng),
            Err(Error::GenerationInfeasible { attempts: 0 })
        );
    }

    #[test]
    fn test_rotate_block_keeps_shape_and_pipe_in_sync() {
        let region = Region {
            cells: vec![Cell::new(1, 1, 1), Cell::new(1, 1, 2)],
            edges: vec![LocalEdge {
                from: 1,
                to: 2,
                direction: Direction::North,
            }],
        };
        let segments = vec![AttachedSegment {
            unit: 2,
            position: 0,
            entry: Direction::South,
            exit: Direction::East,
        }];
        let rotation = Rotation::new(Angle::Deg0, Angle::Deg90, Angle::Deg0);
        let block = rotate_block(1, &region, segments, rotation);

        assert_eq!(block.edges[0].direction, Direction::East);
        assert_eq!(block.segments[0].entry, Direction::West);
        assert_eq!(block.segments[0].exit, Direction::South);
        assert_eq!(rotation.invert(block.edges[0].direction), Direction::North);
        assert_eq!(block.place_from(block.cells[0]).unwrap(), region.cells);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn generated_instances_verify_twice(seed in any::<u64>(), w in 2i32..=3, h in 1i32..=3, d in 2i32..=3) {
            let grid = Grid::new(w, h, d).unwrap();
            let instance = generate(grid, &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert_eq!(verify(&instance), Ok(()));
            prop_assert_eq!(verify(&instance), verify(&instance));
        }
    }
}
