//! Pipe Block Puzzle Generator
//!
//! Generates a box-shaped puzzle of rotated blocks threaded by a single pipe,
//! or checks an existing puzzle file for structural validity. Puzzles are
//! read and written as facts (see `pipeblock::facts`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use pipeblock::{facts, verify, Generator, GeneratorConfig, Grid};

/// Generates and verifies pipe block puzzles.
#[derive(Parser)]
#[command(name = "pipeblock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a puzzle and print its facts.
    Generate(GenerateArgs),
    /// Check a puzzle file for structural validity.
    Verify {
        /// Facts file to check.
        file: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Box width (east-west).
    #[arg(long, default_value_t = 3)]
    width: i32,
    /// Box height (above-below).
    #[arg(long, default_value_t = 3)]
    height: i32,
    /// Box depth (north-south).
    #[arg(long, default_value_t = 3)]
    depth: i32,
    /// Seed for the random generator; drawn at random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Generation attempts before giving up.
    #[arg(long, default_value_t = GeneratorConfig::default().max_attempts)]
    max_attempts: usize,
    /// Wall-clock limit in milliseconds.
    #[arg(long)]
    time_limit_ms: Option<u64>,
    /// Write the facts here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Default for GenerateArgs {
    fn default() -> Self {
        Self {
            width: 3,
            height: 3,
            depth: 3,
            seed: None,
            max_attempts: GeneratorConfig::default().max_attempts,
            time_limit_ms: None,
            output: None,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Generate(args)) => run_generate(args),
        Some(Command::Verify { file }) => run_verify(&file),
        // default: generate a 3x3x3 puzzle
        None => run_generate(GenerateArgs::default()),
    }
}

/// Generates a puzzle and prints or saves its facts.
fn run_generate(args: GenerateArgs) -> ExitCode {
    let grid = match Grid::new(args.width, args.height, args.depth) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, "seeding generator");
    let mut rng = StdRng::seed_from_u64(seed);

    let generator = Generator::new(GeneratorConfig {
        max_attempts: args.max_attempts,
        time_limit: args.time_limit_ms.map(Duration::from_millis),
        ..GeneratorConfig::default()
    });

    let instance = match generator.generate(grid, &mut rng) {
        Ok(instance) => instance,
        Err(e) => {
            error!(seed, "generation failed");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.output {
        Some(path) => {
            if let Err(e) = facts::save(&path, &instance) {
                eprintln!("Failed to write {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            println!("Wrote {}", path.display());
        }
        None => print!("{}", facts::render(&instance)),
    }
    ExitCode::SUCCESS
}

/// Loads a puzzle file and reports whether it is valid.
fn run_verify(file: &Path) -> ExitCode {
    let instance = match facts::load(file) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Failed to read {}: {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match verify(&instance) {
        Ok(()) => {
            println!("valid");
            ExitCode::SUCCESS
        }
        Err(violation) => {
            println!("invalid: {}", violation);
            ExitCode::FAILURE
        }
    }
}
