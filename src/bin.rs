use clap::Parser;
use crossgen::backtracking_search::{solve_with_options, SolveFailure, SolveOptions};
use crossgen::grid::{generate_puzzle_config, render_grid, Structure};
use crossgen::word_list::WordList;
use std::fmt::{Debug, Formatter};
use std::fs;
use unicode_normalization::UnicodeNormalization;

/// crossgen: Command-line crossword generation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the structure file, as ASCII with # representing blocks and . or _ representing
    /// fillable squares
    structure_path: String,

    /// Path to a wordlist file with one candidate word per line
    words_path: String,

    /// Re-establish arc consistency after each trial placement instead of relying on
    /// preprocessing alone
    #[arg(long)]
    inference: bool,

    /// Print solver statistics to stderr after a successful solve
    #[arg(long)]
    stats: bool,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let args = Args::parse();

    let raw_structure = fs::read_to_string(&args.structure_path)
        .map_err(|_| Error(format!("Couldn't read file '{}'", args.structure_path)))?
        .trim()
        .lines()
        .map(|line| line.trim().nfc().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let structure = Structure::parse(&raw_structure).map_err(|err| Error(err.to_string()))?;
    let max_side = structure.width.max(structure.height);

    let word_list = WordList::from_word_file(&args.words_path, Some(max_side))
        .map_err(|err| Error(err.to_string()))?;

    let config = generate_puzzle_config(word_list, &structure)
        .map_err(|err| Error(err.to_string()))?;

    let options = SolveOptions {
        maintain_arc_consistency: args.inference,
    };

    match solve_with_options(&config.to_config_ref(), options) {
        Ok(success) => {
            println!(
                "{}",
                render_grid(
                    &structure,
                    &config.slot_configs,
                    &config.word_list,
                    &success.choices,
                )
            );
            if args.stats {
                eprintln!("{:?}", success.statistics);
            }
            Ok(())
        }
        Err(SolveFailure::Unsatisfiable) => {
            println!("No solution.");
            Ok(())
        }
        Err(SolveFailure::Aborted) => Err(Error("Solve was aborted".into())),
    }
}
