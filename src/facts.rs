//! Text interchange format for puzzle instances.
//!
//! An instance is a list of whitespace-separated atoms, each terminated by a
//! period. Directions are single letters (`a b n s e w`), angles are degrees,
//! and `%` starts a comment running to the end of the line:
//!
//! ```text
//! width(W). height(H). depth(D).
//! pipe_in(X,Y,Z,Dir). pipe_out(X,Y,Z,Dir).
//! block_pos(X,Y,Z,Block,Unit).
//! rotation(Block,RX,RY,RZ).
//! link(Block,FromUnit,ToUnit,Dir).     % rotated frame
//! block_pipe(Block,Unit,Seq,In,Out).   % rotated frame
//! pipe(Seq,X,Y,Z,In,Out).              % solution frame
//! ```
//!
//! Sequence numbers are 1-based. Unknown atoms are skipped. Parsing only
//! checks the format; use [`crate::verify()`] to check the puzzle itself.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::geometry::{Angle, Rotation};
use crate::grid::{Cell, Direction, Grid};
use crate::puzzle::{AttachedSegment, Block, Endpoint, LocalEdge, Pipe, PipeSegment, PuzzleInstance};

#[derive(Debug, Error)]
pub enum FactsError {
    #[error("malformed atom `{0}`")]
    MalformedAtom(String),
    #[error("unknown direction `{0}`")]
    UnknownDirection(String),
    #[error("unsupported angle `{0}`")]
    UnsupportedAngle(String),
    #[error("missing `{0}` fact")]
    MissingFact(&'static str),
    #[error("block {block} has no unit {unit}")]
    MissingUnit { block: usize, unit: usize },
    #[error("pipe has no segment {0}")]
    MissingSegment(usize),
    #[error(transparent)]
    InvalidGrid(#[from] crate::error::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Renders an instance as facts, one atom per line.
pub fn render(instance: &PuzzleInstance) -> String {
    let grid = &instance.grid;
    let pipe = &instance.pipe;
    let mut output = String::new();

    output.push_str(&format!("width({}).\n", grid.width()));
    output.push_str(&format!("height({}).\n", grid.height()));
    output.push_str(&format!("depth({}).\n", grid.depth()));
    output.push_str(&format!("pipe_in({}).\n", endpoint_args(&pipe.pipe_in)));
    output.push_str(&format!("pipe_out({}).\n", endpoint_args(&pipe.pipe_out)));

    for block in &instance.blocks {
        for (i, cell) in block.cells.iter().enumerate() {
            output.push_str(&format!(
                "block_pos({},{},{},{},{}).\n",
                cell.x,
                cell.y,
                cell.z,
                block.id,
                i + 1
            ));
        }
        let rotation = block.rotation;
        output.push_str(&format!(
            "rotation({},{},{},{}).\n",
            block.id,
            rotation.x.degrees(),
            rotation.y.degrees(),
            rotation.z.degrees()
        ));
        for edge in &block.edges {
            output.push_str(&format!(
                "link({},{},{},{}).\n",
                block.id,
                edge.from,
                edge.to,
                edge.direction.letter()
            ));
        }
        for segment in &block.segments {
            output.push_str(&format!(
                "block_pipe({},{},{},{},{}).\n",
                block.id,
                segment.unit,
                segment.position + 1,
                segment.entry.letter(),
                segment.exit.letter()
            ));
        }
    }

    for (i, segment) in pipe.segments.iter().enumerate() {
        let cell = segment.cell;
        output.push_str(&format!(
            "pipe({},{},{},{},{},{}).\n",
            i + 1,
            cell.x,
            cell.y,
            cell.z,
            segment.entry.letter(),
            segment.exit.letter()
        ));
    }

    output
}

fn endpoint_args(endpoint: &Endpoint) -> String {
    let cell = endpoint.cell;
    format!(
        "{},{},{},{}",
        cell.x,
        cell.y,
        cell.z,
        endpoint.direction.letter()
    )
}

/// Facts collected while scanning, keyed by block id and sequence number.
#[derive(Default)]
struct Collected {
    width: Option<i32>,
    height: Option<i32>,
    depth: Option<i32>,
    pipe_in: Option<Endpoint>,
    pipe_out: Option<Endpoint>,
    cells: BTreeMap<usize, BTreeMap<usize, Cell>>,
    rotations: BTreeMap<usize, Rotation>,
    edges: BTreeMap<usize, Vec<LocalEdge>>,
    carried: BTreeMap<usize, Vec<AttachedSegment>>,
    segments: BTreeMap<usize, PipeSegment>,
}

/// Parses facts into an instance.
pub fn parse(text: &str) -> Result<PuzzleInstance, FactsError> {
    let mut collected = Collected::default();

    let tokens = text
        .lines()
        .map(|line| line.split('%').next().unwrap_or_default())
        .flat_map(str::split_whitespace);
    for token in tokens {
        let atom = token.trim_end_matches('.');
        if atom.is_empty() {
            continue;
        }
        collected.add(atom)?;
    }

    collected.build()
}

impl Collected {
    fn add(&mut self, atom: &str) -> Result<(), FactsError> {
        let malformed = || FactsError::MalformedAtom(atom.to_string());
        let Some((name, rest)) = atom.split_once('(') else {
            // bare propositional atoms carry nothing we read
            return Ok(());
        };
        let args: Vec<&str> = rest
            .strip_suffix(')')
            .ok_or_else(malformed)?
            .split(',')
            .map(str::trim)
            .collect();
        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(malformed())
            }
        };

        match name {
            "width" | "height" | "depth" => {
                arity(1)?;
                let value = Some(number(args[0], atom)?);
                match name {
                    "width" => self.width = value,
                    "height" => self.height = value,
                    _ => self.depth = value,
                }
            }
            "pipe_in" | "pipe_out" => {
                arity(4)?;
                let endpoint = Endpoint {
                    cell: cell(&args[0..3], atom)?,
                    direction: direction(args[3])?,
                };
                if name == "pipe_in" {
                    self.pipe_in = Some(endpoint);
                } else {
                    self.pipe_out = Some(endpoint);
                }
            }
            "block_pos" => {
                arity(5)?;
                let position = cell(&args[0..3], atom)?;
                let block = number(args[3], atom)?;
                let unit = number(args[4], atom)?;
                self.cells.entry(block).or_default().insert(unit, position);
            }
            "rotation" => {
                arity(4)?;
                let block = number(args[0], atom)?;
                let rotation = Rotation::new(angle(args[1])?, angle(args[2])?, angle(args[3])?);
                self.rotations.insert(block, rotation);
            }
            "link" => {
                arity(4)?;
                let block = number(args[0], atom)?;
                self.edges.entry(block).or_default().push(LocalEdge {
                    from: number(args[1], atom)?,
                    to: number(args[2], atom)?,
                    direction: direction(args[3])?,
                });
            }
            "block_pipe" => {
                arity(5)?;
                let block = number(args[0], atom)?;
                let sequence: usize = number(args[2], atom)?;
                self.carried.entry(block).or_default().push(AttachedSegment {
                    unit: number(args[1], atom)?,
                    position: sequence.checked_sub(1).ok_or_else(malformed)?,
                    entry: direction(args[3])?,
                    exit: direction(args[4])?,
                });
            }
            "pipe" => {
                arity(6)?;
                let sequence: usize = number(args[0], atom)?;
                if sequence == 0 {
                    return Err(malformed());
                }
                self.segments.insert(
                    sequence,
                    PipeSegment {
                        cell: cell(&args[1..4], atom)?,
                        entry: direction(args[4])?,
                        exit: direction(args[5])?,
                    },
                );
            }
            _ => {}
        }
        Ok(())
    }

    fn build(mut self) -> Result<PuzzleInstance, FactsError> {
        let grid = Grid::new(
            self.width.ok_or(FactsError::MissingFact("width"))?,
            self.height.ok_or(FactsError::MissingFact("height"))?,
            self.depth.ok_or(FactsError::MissingFact("depth"))?,
        )?;
        let pipe_in = self.pipe_in.ok_or(FactsError::MissingFact("pipe_in"))?;
        let pipe_out = self.pipe_out.ok_or(FactsError::MissingFact("pipe_out"))?;

        let mut ids: Vec<usize> = self
            .cells
            .keys()
            .chain(self.edges.keys())
            .chain(self.carried.keys())
            .chain(self.rotations.keys())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let mut blocks = Vec::with_capacity(ids.len());
        for id in ids {
            let units = self.cells.remove(&id).unwrap_or_default();
            let mut cells = Vec::with_capacity(units.len());
            for (i, (unit, cell)) in units.into_iter().enumerate() {
                if unit != i + 1 {
                    return Err(FactsError::MissingUnit {
                        block: id,
                        unit: i + 1,
                    });
                }
                cells.push(cell);
            }

            blocks.push(Block {
                id,
                cells,
                edges: self.edges.remove(&id).unwrap_or_default(),
                rotation: self.rotations.get(&id).copied().unwrap_or_default(),
                segments: self.carried.remove(&id).unwrap_or_default(),
            });
        }

        let mut segments = Vec::with_capacity(self.segments.len());
        for (i, (sequence, segment)) in self.segments.into_iter().enumerate() {
            if sequence != i + 1 {
                return Err(FactsError::MissingSegment(i + 1));
            }
            segments.push(segment);
        }

        Ok(PuzzleInstance {
            grid,
            blocks,
            pipe: Pipe {
                segments,
                pipe_in,
                pipe_out,
            },
        })
    }
}

fn number<T: FromStr>(arg: &str, atom: &str) -> Result<T, FactsError> {
    arg.parse()
        .map_err(|_| FactsError::MalformedAtom(atom.to_string()))
}

fn cell(args: &[&str], atom: &str) -> Result<Cell, FactsError> {
    Ok(Cell::new(
        number(args[0], atom)?,
        number(args[1], atom)?,
        number(args[2], atom)?,
    ))
}

fn direction(arg: &str) -> Result<Direction, FactsError> {
    Direction::from_letter(arg).ok_or_else(|| FactsError::UnknownDirection(arg.to_string()))
}

fn angle(arg: &str) -> Result<Angle, FactsError> {
    arg.parse()
        .ok()
        .and_then(Angle::from_degrees)
        .ok_or_else(|| FactsError::UnsupportedAngle(arg.to_string()))
}

/// Writes an instance to `path`.
pub fn save(path: impl AsRef<Path>, instance: &PuzzleInstance) -> std::io::Result<()> {
    std::fs::write(path, render(instance))
}

/// Reads an instance from `path`.
pub fn load(path: impl AsRef<Path>) -> Result<PuzzleInstance, FactsError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::Error;
    use crate::generator::generate;
    use crate::verify::{verify, Location, Violation, ViolationKind};

    /// A 1x1x3 column held by one block, piped south to north.
    const COLUMN: &str = "
        width(1). height(1). depth(3).
        pipe_in(1,1,1,s). pipe_out(1,1,3,n).
        block_pos(1,1,1,1,1). block_pos(1,1,2,1,2). block_pos(1,1,3,1,3).
        link(1,1,2,n). link(1,2,3,n).
        block_pipe(1,1,1,s,n). block_pipe(1,2,2,s,n). block_pipe(1,3,3,s,n).
        pipe(1,1,1,1,s,n). pipe(2,1,1,2,s,n). pipe(3,1,1,3,s,n).
    ";

    #[test]
    fn test_column_renders_canonically() {
        let instance = parse(COLUMN).unwrap();
        assert_eq!(verify(&instance), Ok(()));
        insta::assert_snapshot!(render(&instance), @r"
        width(1).
        height(1).
        depth(3).
        pipe_in(1,1,1,s).
        pipe_out(1,1,3,n).
        block_pos(1,1,1,1,1).
        block_pos(1,1,2,1,2).
        block_pos(1,1,3,1,3).
        rotation(1,0,0,0).
        link(1,1,2,n).
        link(1,2,3,n).
        block_pipe(1,1,1,s,n).
        block_pipe(1,2,2,s,n).
        block_pipe(1,3,3,s,n).
        pipe(1,1,1,1,s,n).
        pipe(2,1,1,2,s,n).
        pipe(3,1,1,3,s,n).
        ");
    }

    #[test]
    fn test_overlapping_blocks_from_text() {
        let text = "
            width(1). height(1). depth(3).
            pipe_in(1,1,1,s). pipe_out(1,1,3,n).
            block_pos(1,1,1,1,1). block_pos(1,1,2,1,2).
            block_pos(1,1,2,2,1). block_pos(1,1,3,2,2).
            link(1,1,2,n). link(2,1,2,n).
            block_pipe(1,1,1,s,n). block_pipe(2,2,3,s,n).
            pipe(1,1,1,1,s,n). pipe(2,1,1,2,s,n). pipe(3,1,1,3,s,n).
        ";
        let instance = parse(text).unwrap();
        assert_eq!(
            verify(&instance),
            Err(Violation {
                kind: ViolationKind::Overlap,
                location: Location::Cell(Cell::new(1, 1, 2)),
            })
        );
    }

    #[test]
    fn test_generated_instance_survives_text() {
        let grid = Grid::new(3, 3, 3).unwrap();
        let instance = generate(grid, &mut StdRng::seed_from_u64(31)).unwrap();
        let parsed = parse(&render(&instance)).unwrap();
        assert_eq!(parsed, instance);
        assert_eq!(verify(&parsed), Ok(()));
    }

    #[test]
    fn test_unknown_atoms_and_comments_are_skipped() {
        let text = format!("{COLUMN}\nsolved. cell_value(1,2,3). % trailing remark(1)\n");
        let instance = parse(&text).unwrap();
        assert_eq!(instance.blocks.len(), 1);
        assert_eq!(instance.pipe.len(), 3);
    }

    #[test]
    fn test_missing_dimension() {
        let text = COLUMN.replace("depth(3).", "");
        assert!(matches!(
            parse(&text),
            Err(FactsError::MissingFact("depth"))
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse(&COLUMN.replace("link(1,1,2,n)", "link(1,1,2,q)")),
            Err(FactsError::UnknownDirection(letter)) if letter == "q"
        ));
        assert!(matches!(
            parse(&format!("{COLUMN} rotation(1,45,0,0).")),
            Err(FactsError::UnsupportedAngle(angle)) if angle == "45"
        ));
        assert!(matches!(
            parse(&COLUMN.replace("pipe_in(1,1,1,s)", "pipe_in(1,1,s)")),
            Err(FactsError::MalformedAtom(_))
        ));
        assert!(matches!(
            parse(&COLUMN.replace("width(1)", "width(0)")),
            Err(FactsError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let text = "width(2000). height(2000). depth(2000). pipe_in(1,1,1,s). pipe_out(1,1,2,n).";
        assert!(matches!(
            parse(text),
            Err(FactsError::InvalidGrid(Error::InvalidDimensions { .. }))
        ));
    }

    #[test]
    fn test_sequence_gaps_are_rejected() {
        assert!(matches!(
            parse(&COLUMN.replace("block_pos(1,1,2,1,2).", "")),
            Err(FactsError::MissingUnit { block: 1, unit: 2 })
        ));
        assert!(matches!(
            parse(&COLUMN.replace("pipe(2,1,1,2,s,n).", "")),
            Err(FactsError::MissingSegment(2))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("pipeblock-{}.lp", std::process::id()));
        let instance = parse(COLUMN).unwrap();
        save(&path, &instance).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, instance);
    }
}
