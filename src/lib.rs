//! Pipe Block Puzzle Generator Library
//!
//! Generates and verifies 3D puzzles where a box of cells is cut into
//! connected blocks, a single pipe threads through every block between two
//! border openings, and each block is rotated to hide its orientation.

pub mod error;
pub mod facts;
pub mod generator;
pub mod geometry;
pub mod grid;
pub mod partition;
pub mod pipe;
pub mod puzzle;
pub mod verify;

pub use error::Error;
pub use generator::{generate, Generator, GeneratorConfig};
pub use grid::{Cell, Direction, Grid};
pub use puzzle::PuzzleInstance;
pub use verify::{verify, Location, Violation, ViolationKind};
