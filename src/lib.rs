//! crossgen fills crossword grids by treating them as constraint satisfaction problems. Each run
//! of fillable cells ("slot") is a variable whose domain is drawn from a word list; crossing slots
//! constrain each other's shared letter. Solving is a two-stage process: domains are pruned with
//! node consistency and the AC-3 algorithm (`arc_consistency`), and then a backtracking search
//! with MRV/degree and least-constraining-value heuristics assigns one word per slot
//! (`backtracking_search`).

pub mod arc_consistency;
pub mod backtracking_search;
pub mod domain;
pub mod grid;
pub mod types;
pub mod util;
pub mod word_list;

pub const CHECK_INVARIANTS: bool = cfg!(feature = "check_invariants");

/// The expected maximum number of distinct characters appearing in a grid.
pub const MAX_GLYPH_COUNT: usize = 256;

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;
