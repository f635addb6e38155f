//! This module implements the static description of a puzzle: the grid structure (which cells are
//! fillable), the slots derived from it, and the crossings between slots. Everything here is
//! computed once before solving and never mutated by the solver.

use log::debug;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{GridCoord, SlotId, WordId};
use crate::word_list::WordList;
use crate::MAX_SLOT_LENGTH;

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the intersection within the other slot.
#[derive(Debug, Clone)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
}

/// A struct representing the aspects of a slot that are static during solving.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub id: SlotId,
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,

    /// For each cell of this slot, the crossing slot sharing that cell, if any. In a 2D grid an
    /// across slot and a down slot can share at most one cell, so each entry here identifies a
    /// distinct neighbor.
    pub crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>,
}

impl SlotConfig {
    /// Generate the coords for each cell of this slot.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (self.start_cell.0 + cell_idx, self.start_cell.1),
                Direction::Down => (self.start_cell.0, self.start_cell.1 + cell_idx),
            })
            .collect()
    }

    /// The number of other slots this slot shares a cell with.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.crossings.iter().flatten().count()
    }

    /// Generate a `SlotSpec` identifying this slot.
    #[must_use]
    pub fn slot_spec(&self) -> SlotSpec {
        SlotSpec {
            start_cell: self.start_cell,
            direction: self.direction,
            length: self.length,
        }
    }
}

/// A struct identifying a specific slot in the grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SlotSpec {
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,
}

impl SlotSpec {
    /// Parse a string like "1,2,down,5" into a `SlotSpec` struct.
    pub fn from_key(key: &str) -> Result<SlotSpec, String> {
        let key_parts: Vec<&str> = key.split(',').collect();
        if key_parts.len() != 4 {
            return Err(format!("invalid slot key: {key}"));
        }

        let x: Result<usize, _> = key_parts[0].parse();
        let y: Result<usize, _> = key_parts[1].parse();
        let direction: Option<Direction> = match key_parts[2] {
            "across" => Some(Direction::Across),
            "down" => Some(Direction::Down),
            _ => None,
        };
        let length: Result<usize, _> = key_parts[3].parse();

        if let (Ok(x), Ok(y), Some(direction), Ok(length)) = (x, y, direction, length) {
            Ok(SlotSpec {
                start_cell: (x, y),
                direction,
                length,
            })
        } else {
            Err(format!("invalid slot key: {key:?}"))
        }
    }

    /// Represent this slot as a string like "1,2,down,5".
    #[must_use]
    pub fn to_key(&self) -> String {
        let direction = match self.direction {
            Direction::Across => "across",
            Direction::Down => "down",
        };
        format!(
            "{},{},{},{}",
            self.start_cell.0, self.start_cell.1, direction, self.length,
        )
    }

    /// Generate the coords for each cell of this slot.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (self.start_cell.0 + cell_idx, self.start_cell.1),
                Direction::Down => (self.start_cell.0, self.start_cell.1 + cell_idx),
            })
            .collect()
    }
}

/// Serialize a `SlotSpec` into a string key.
#[cfg(feature = "serde")]
impl Serialize for SlotSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_key())
    }
}

/// Deserialize a `SlotSpec` from a string key.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for SlotSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw_string = String::deserialize(deserializer)?;
        SlotSpec::from_key(&raw_string).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    EmptyTemplate,
    UnevenRows,
    InvalidCell(char),
    NoSlots,
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            StructureError::EmptyTemplate => "Structure template is empty".into(),
            StructureError::UnevenRows => "Rows in structure must all be the same length".into(),
            StructureError::InvalidCell(ch) => {
                format!("Structure contains invalid cell character: {ch:?}")
            }
            StructureError::NoSlots => "Structure contains no slots of length 2 or more".into(),
        };
        write!(f, "{string}")
    }
}

impl std::error::Error for StructureError {}

/// The grid structure of a puzzle: its dimensions and which cells are fillable. This is the
/// immutable input from which slots and crossings are derived.
#[derive(Debug, Clone)]
pub struct Structure {
    pub width: usize,
    pub height: usize,
    fillable: Vec<bool>,
}

impl Structure {
    /// Parse a template string with `#` representing blocked cells and `.` (or `_`) representing
    /// fillable cells. Leading/trailing blank lines are ignored; rows must all be the same width.
    pub fn parse(template: &str) -> Result<Structure, StructureError> {
        let rows: Vec<&str> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if rows.is_empty() {
            return Err(StructureError::EmptyTemplate);
        }

        let width = rows[0].chars().count();
        let height = rows.len();
        let mut fillable = Vec::with_capacity(width * height);

        for row in &rows {
            if row.chars().count() != width {
                return Err(StructureError::UnevenRows);
            }
            for ch in row.chars() {
                match ch {
                    '.' | '_' => fillable.push(true),
                    '#' => fillable.push(false),
                    other => return Err(StructureError::InvalidCell(other)),
                }
            }
        }

        Ok(Structure {
            width,
            height,
            fillable,
        })
    }

    /// Is the given cell fillable? Out-of-range coords are not.
    #[must_use]
    pub fn is_fillable(&self, (x, y): GridCoord) -> bool {
        x < self.width && y < self.height && self.fillable[y * self.width + x]
    }

    /// Derive the slots of this structure: maximal horizontal then vertical runs of fillable
    /// cells of length >= 2, in row-major scan order. Runs of length 1 belong to no slot.
    #[must_use]
    pub fn slot_specs(&self) -> Vec<SlotSpec> {
        let mut specs: Vec<SlotSpec> = vec![];

        for y in 0..self.height {
            let mut run_start: Option<usize> = None;
            for x in 0..=self.width {
                if x < self.width && self.is_fillable((x, y)) {
                    run_start.get_or_insert(x);
                } else if let Some(start) = run_start.take() {
                    if x - start > 1 {
                        specs.push(SlotSpec {
                            start_cell: (start, y),
                            direction: Direction::Across,
                            length: x - start,
                        });
                    }
                }
            }
        }

        for x in 0..self.width {
            let mut run_start: Option<usize> = None;
            for y in 0..=self.height {
                if y < self.height && self.is_fillable((x, y)) {
                    run_start.get_or_insert(y);
                } else if let Some(start) = run_start.take() {
                    if y - start > 1 {
                        specs.push(SlotSpec {
                            start_cell: (x, start),
                            direction: Direction::Down,
                            length: y - start,
                        });
                    }
                }
            }
        }

        specs
    }
}

/// Given `SlotSpec`s for every slot in a grid, generate `SlotConfig`s containing the derived
/// crossing information.
///
/// # Panics
///
/// Panics if three or more slots share a cell, which can't happen for slots derived from a 2D
/// grid and indicates a bug in slot derivation.
#[must_use]
pub fn generate_slot_configs(entries: &[SlotSpec]) -> Vec<SlotConfig> {
    // Build a map from cell location to the slots covering it, which we can then use to calculate
    // crossings.
    let mut entries_by_loc: HashMap<GridCoord, Vec<(usize, usize)>> = HashMap::new();

    for (entry_idx, entry) in entries.iter().enumerate() {
        for (cell_idx, &loc) in entry.cell_coords().iter().enumerate() {
            entries_by_loc.entry(loc).or_default().push((entry_idx, cell_idx));
        }
    }

    let slot_configs: Vec<SlotConfig> = entries
        .iter()
        .enumerate()
        .map(|(entry_idx, entry)| {
            let crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]> = entry
                .cell_coords()
                .iter()
                .map(|loc| {
                    let crossing_idxs: Vec<_> = entries_by_loc[loc]
                        .iter()
                        .filter(|&&(e, _)| e != entry_idx)
                        .collect();

                    match crossing_idxs.as_slice() {
                        [] => None,
                        [&(other_slot_id, other_slot_cell)] => Some(Crossing {
                            other_slot_id,
                            other_slot_cell,
                        }),
                        _ => panic!("more than two slots crossing in cell {loc:?}"),
                    }
                })
                .collect();

            SlotConfig {
                id: entry_idx,
                start_cell: entry.start_cell,
                direction: entry.direction,
                length: entry.length,
                crossings,
            }
        })
        .collect();

    debug!(
        "derived {} slots with {} crossings",
        slot_configs.len(),
        slot_configs.iter().map(SlotConfig::degree).sum::<usize>() / 2
    );

    slot_configs
}

/// A struct holding references to all of the information needed as input to a solve.
#[derive(Clone)]
pub struct PuzzleConfig<'a> {
    /// The word list supplying candidate values; see `word_list.rs`.
    pub word_list: &'a WordList,

    /// Config representing all of the slots in the grid and their crossings.
    pub slot_configs: &'a [SlotConfig],

    /// The width and height of the grid.
    pub width: usize,
    pub height: usize,

    /// An optional atomic flag that can be set to signal that the solve should be canceled.
    pub abort: Option<&'a AtomicBool>,
}

/// A struct that owns a copy of each piece of information needed by `PuzzleConfig`.
pub struct OwnedPuzzleConfig {
    pub word_list: WordList,
    pub slot_configs: Vec<SlotConfig>,
    pub width: usize,
    pub height: usize,
    pub abort: Option<Arc<AtomicBool>>,
}

impl OwnedPuzzleConfig {
    #[must_use]
    pub fn to_config_ref(&self) -> PuzzleConfig {
        PuzzleConfig {
            word_list: &self.word_list,
            slot_configs: &self.slot_configs,
            width: self.width,
            height: self.height,
            abort: self.abort.as_deref(),
        }
    }
}

/// Generate an `OwnedPuzzleConfig` from a parsed structure and a word list, rejecting structures
/// whose geometry yields no slots.
pub fn generate_puzzle_config(
    word_list: WordList,
    structure: &Structure,
) -> Result<OwnedPuzzleConfig, StructureError> {
    let slot_specs = structure.slot_specs();
    if slot_specs.is_empty() {
        return Err(StructureError::NoSlots);
    }

    let slot_configs = generate_slot_configs(&slot_specs);

    Ok(OwnedPuzzleConfig {
        word_list,
        slot_configs,
        width: structure.width,
        height: structure.height,
        abort: None,
    })
}

/// A struct recording a slot assignment made during solving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// Turn the given structure and choices into a rendered string: `#` for blocked cells, letters
/// for cells covered by a chosen word, `.` for fillable cells left unfilled.
#[must_use]
pub fn render_grid(
    structure: &Structure,
    slot_configs: &[SlotConfig],
    word_list: &WordList,
    choices: &[Choice],
) -> String {
    let mut grid: Vec<Option<char>> = vec![None; structure.width * structure.height];

    for &Choice { slot_id, word_id } in choices {
        let slot_config = &slot_configs[slot_id];
        let word = &word_list.words[word_id];

        for (&glyph, (x, y)) in word.glyphs.iter().zip(slot_config.cell_coords()) {
            grid[y * structure.width + x] = Some(word_list.glyphs[glyph]);
        }
    }

    (0..structure.height)
        .map(|y| {
            (0..structure.width)
                .map(|x| {
                    if structure.is_fillable((x, y)) {
                        grid[y * structure.width + x].unwrap_or('.')
                    } else {
                        '#'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{
        generate_puzzle_config, generate_slot_configs, render_grid, Choice, Direction, SlotSpec,
        Structure, StructureError,
    };
    use crate::word_list::WordList;

    #[test]
    fn test_parse_rejects_malformed_templates() {
        assert_eq!(
            Structure::parse("").unwrap_err(),
            StructureError::EmptyTemplate
        );
        assert_eq!(
            Structure::parse("..\n...").unwrap_err(),
            StructureError::UnevenRows
        );
        assert_eq!(
            Structure::parse("..\n.x").unwrap_err(),
            StructureError::InvalidCell('x')
        );
    }

    #[test]
    fn test_slot_derivation() {
        let structure = Structure::parse(
            "
            ...#
            .#..
            ",
        )
        .unwrap();

        let specs = structure.slot_specs();

        // Across runs: (0,0)-(2,0) and (2,1)-(3,1); down runs: columns 0 and 2. The single
        // fillable cells in column 1 and column 3 are not slots.
        assert_eq!(
            specs,
            vec![
                SlotSpec {
                    start_cell: (0, 0),
                    direction: Direction::Across,
                    length: 3,
                },
                SlotSpec {
                    start_cell: (2, 1),
                    direction: Direction::Across,
                    length: 2,
                },
                SlotSpec {
                    start_cell: (0, 0),
                    direction: Direction::Down,
                    length: 2,
                },
                SlotSpec {
                    start_cell: (2, 0),
                    direction: Direction::Down,
                    length: 2,
                },
            ]
        );
    }

    #[test]
    fn test_crossings_are_symmetric() {
        let structure = Structure::parse(
            "
            #.#
            ...
            #.#
            ",
        )
        .unwrap();

        let slot_configs = generate_slot_configs(&structure.slot_specs());
        assert_eq!(slot_configs.len(), 2);

        let across = &slot_configs[0];
        let down = &slot_configs[1];
        assert_eq!(across.direction, Direction::Across);
        assert_eq!(down.direction, Direction::Down);

        // They share the center cell: cell 1 of each.
        let crossing = across.crossings[1].as_ref().unwrap();
        assert_eq!(crossing.other_slot_id, down.id);
        assert_eq!(crossing.other_slot_cell, 1);

        let crossing = down.crossings[1].as_ref().unwrap();
        assert_eq!(crossing.other_slot_id, across.id);
        assert_eq!(crossing.other_slot_cell, 1);

        assert!(across.crossings[0].is_none());
        assert!(across.crossings[2].is_none());
        assert_eq!(across.degree(), 1);
    }

    #[test]
    fn test_generate_puzzle_config_rejects_slotless_structures() {
        let structure = Structure::parse("#.\n.#").unwrap();
        let word_list = WordList::from_words(["cat"], None);

        let result = generate_puzzle_config(word_list, &structure);
        assert!(matches!(result, Err(StructureError::NoSlots)));
    }

    #[test]
    fn test_slot_spec_keys() {
        let spec = SlotSpec {
            start_cell: (1, 2),
            direction: Direction::Down,
            length: 5,
        };

        assert_eq!(spec.to_key(), "1,2,down,5");
        assert_eq!(SlotSpec::from_key("1,2,down,5").unwrap(), spec);
        assert!(SlotSpec::from_key("1,2,sideways,5").is_err());
        assert!(SlotSpec::from_key("1,2,down").is_err());
    }

    #[test]
    fn test_render_grid() {
        let structure = Structure::parse(
            "
            #.#
            ...
            #.#
            ",
        )
        .unwrap();
        let word_list = WordList::from_words(["cab", "cat"], None);
        let config = generate_puzzle_config(word_list, &structure).unwrap();

        let rendered = render_grid(
            &structure,
            &config.slot_configs,
            &config.word_list,
            &[
                Choice {
                    slot_id: 0,
                    word_id: 0,
                },
                Choice {
                    slot_id: 1,
                    word_id: 1,
                },
            ],
        );

        assert_eq!(rendered, "#c#\ncab\n#t#");
    }

    #[test]
    fn test_render_grid_leaves_unassigned_cells_empty() {
        let structure = Structure::parse("...").unwrap();
        let word_list = WordList::from_words(["cat"], None);
        let config = generate_puzzle_config(word_list, &structure).unwrap();

        let rendered = render_grid(&structure, &config.slot_configs, &config.word_list, &[]);
        assert_eq!(rendered, "...");
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::{Direction, SlotSpec};

    #[test]
    fn test_slot_spec_serialization() {
        let slot_spec = SlotSpec {
            start_cell: (1, 2),
            direction: Direction::Across,
            length: 5,
        };

        let slot_key = serde_json::to_string(&slot_spec).unwrap();

        assert_eq!(slot_key, "\"1,2,across,5\"");
    }

    #[test]
    fn test_slot_spec_deserialization() {
        let slot_spec: SlotSpec = serde_json::from_str("\"3,4,down,12\"").unwrap();

        assert_eq!(
            slot_spec,
            SlotSpec {
                start_cell: (3, 4),
                direction: Direction::Down,
                length: 12,
            }
        );
    }
}
