//! This module implements solving as backtracking search over partial assignments. Variables are
//! chosen with the minimum-remaining-values heuristic (ties broken by degree, then declaration
//! order) and values with the least-constraining-value heuristic (ties broken lexicographically),
//! so a given puzzle and word list always search in the same order. The baseline search performs
//! no inference beyond the preprocessing done by `arc_consistency`; setting
//! `SolveOptions::maintain_arc_consistency` re-propagates after every trial placement, using the
//! domain store's trail to unwind abandoned branches.

use log::debug;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::arc_consistency::{enforce_arc_consistency, enforce_node_consistency};
use crate::domain::DomainStore;
use crate::grid::{Choice, PuzzleConfig};
use crate::types::{SlotId, WordId};
use crate::CHECK_INVARIANTS;

/// A struct tracking stats about the solving process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Trial placements attempted.
    pub states: usize,

    /// Levels that exhausted every candidate and reported failure upward.
    pub backtracks: usize,

    /// Time spent in arc-consistency propagation (preprocessing plus in-search inference).
    pub propagation_time: Duration,

    pub total_time: Duration,
}

/// Knobs for `solve_with_options`. The default matches the baseline design: no inference during
/// search.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions {
    /// After each consistent trial placement, narrow the slot to the chosen word and re-establish
    /// arc consistency before recursing, abandoning the branch early on a wipeout.
    pub maintain_arc_consistency: bool,
}

/// A struct representing the results of a successful solve.
#[derive(Debug)]
pub struct SolveSuccess {
    pub choices: Vec<Choice>,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveFailure {
    /// No assignment satisfies the puzzle. This is a normal outcome, not an error: propagation
    /// wipeouts and exhausted searches both surface here.
    Unsatisfiable,

    /// The abort flag on `PuzzleConfig` was set.
    Aborted,
}

/// A partial mapping from slot to word, grown by one entry per search level.
#[derive(Debug, Clone)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Assignment {
    #[must_use]
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            words: vec![None; slot_count],
            assigned_count: 0,
        }
    }

    /// The word assigned to the given slot, if any.
    #[must_use]
    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.words[slot_id]
    }

    /// Record a trial placement.
    pub fn assign(&mut self, slot_id: SlotId, word_id: WordId) {
        if CHECK_INVARIANTS && self.words[slot_id].is_some() {
            panic!("assigning a word to an already-assigned slot?");
        }

        if self.words[slot_id].replace(word_id).is_none() {
            self.assigned_count += 1;
        }
    }

    /// Remove a trial placement.
    pub fn unassign(&mut self, slot_id: SlotId) {
        if CHECK_INVARIANTS && self.words[slot_id].is_none() {
            panic!("unassigning a slot that has no word?");
        }

        if self.words[slot_id].take().is_some() {
            self.assigned_count -= 1;
        }
    }

    /// True iff every slot has an entry.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.assigned_count == self.words.len()
    }

    /// Iterate over the assigned (slot, word) pairs in slot order.
    pub fn assigned(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word)| word.map(|word_id| (slot_id, word_id)))
    }

    /// Render the assignment as `Choice` records, in slot order.
    #[must_use]
    pub fn choices(&self) -> Vec<Choice> {
        self.assigned()
            .map(|(slot_id, word_id)| Choice { slot_id, word_id })
            .collect()
    }
}

/// Check a partial assignment against all constraints from scratch: assigned words are pairwise
/// distinct, each fits its slot's length, and crossing slots agree on their shared letter. Cheap
/// at crossword scale, so no incremental bookkeeping is attempted.
#[must_use]
pub fn is_consistent(config: &PuzzleConfig, assignment: &Assignment) -> bool {
    // Word ids are unique per normalized string, so id equality is word equality.
    let mut used: HashSet<WordId> = HashSet::new();
    for (_, word_id) in assignment.assigned() {
        if !used.insert(word_id) {
            return false;
        }
    }

    for (slot_id, word_id) in assignment.assigned() {
        if config.word_list.words[word_id].len() != config.slot_configs[slot_id].length {
            return false;
        }
    }

    for (slot_id, word_id) in assignment.assigned() {
        let word = &config.word_list.words[word_id];
        for (cell_idx, crossing) in config.slot_configs[slot_id].crossings.iter().enumerate() {
            let Some(crossing) = crossing else {
                continue;
            };
            let Some(other_word_id) = assignment.get(crossing.other_slot_id) else {
                continue;
            };

            let other_word = &config.word_list.words[other_word_id];
            if word.glyphs[cell_idx] != other_word.glyphs[crossing.other_slot_cell] {
                return false;
            }
        }
    }

    true
}

/// Choose the next slot to fill: fewest live candidates, ties broken by most crossings, then by
/// declaration order.
///
/// # Panics
///
/// Panics if every slot is already assigned.
#[must_use]
pub fn select_unassigned_slot(
    config: &PuzzleConfig,
    domains: &DomainStore,
    assignment: &Assignment,
) -> SlotId {
    config
        .slot_configs
        .iter()
        .filter(|slot_config| assignment.get(slot_config.id).is_none())
        .min_by_key(|slot_config| {
            (
                domains.len(slot_config.id),
                Reverse(slot_config.degree()),
                slot_config.id,
            )
        })
        .map(|slot_config| slot_config.id)
        .expect("selecting a slot from a complete assignment")
}

/// Order a slot's live candidates by how little they constrain its unassigned crossing slots:
/// ascending by the total number of crossing candidates each word would rule out, with ties
/// broken lexicographically. The rule-out count for one crossing is its live candidate count
/// minus the number carrying the required glyph in the shared cell.
#[must_use]
pub fn order_domain_values(
    config: &PuzzleConfig,
    domains: &DomainStore,
    assignment: &Assignment,
    slot_id: SlotId,
) -> Vec<WordId> {
    let slot_config = &config.slot_configs[slot_id];

    let mut candidates: Vec<WordId> = domains.words(slot_id).collect();

    candidates.sort_by_cached_key(|&word_id| {
        let word = &config.word_list.words[word_id];

        let ruled_out: usize = slot_config
            .crossings
            .iter()
            .enumerate()
            .filter_map(|(cell_idx, crossing)| {
                crossing.as_ref().map(|crossing| (cell_idx, crossing))
            })
            .filter(|(_, crossing)| assignment.get(crossing.other_slot_id).is_none())
            .map(|(cell_idx, crossing)| {
                let compatible = domains.glyph_count(
                    crossing.other_slot_id,
                    crossing.other_slot_cell,
                    word.glyphs[cell_idx],
                ) as usize;

                domains.len(crossing.other_slot_id) - compatible
            })
            .sum();

        (ruled_out, word.normalized_string.clone())
    });

    candidates
}

/// Narrow a slot's domain to its chosen word and propagate the implications to its crossings.
/// Returns whether the grid is still viable; eliminations stay on the trail either way, so the
/// caller's checkpoint covers them.
fn propagate_choice(
    config: &PuzzleConfig,
    domains: &mut DomainStore,
    slot_id: SlotId,
    word_id: WordId,
    statistics: &mut Statistics,
) -> bool {
    let discarded: Vec<WordId> = domains
        .words(slot_id)
        .filter(|&other| other != word_id)
        .collect();
    for other in discarded {
        domains.eliminate(config.word_list, slot_id, other);
    }

    let arcs: Vec<(SlotId, SlotId)> = config.slot_configs[slot_id]
        .crossings
        .iter()
        .flatten()
        .map(|crossing| (crossing.other_slot_id, slot_id))
        .collect();

    let start = Instant::now();
    let viable = enforce_arc_consistency(config, domains, Some(arcs)).is_ok();
    statistics.propagation_time += start.elapsed();

    viable
}

/// Recursive depth-first search. Returns `Ok(true)` when `assignment` has been completed in
/// place, `Ok(false)` when every candidate at this level failed. The trial entry and any domain
/// pruning are undone on every exit path except final success, where the assignment is the
/// answer.
fn backtrack(
    config: &PuzzleConfig,
    domains: &mut DomainStore,
    assignment: &mut Assignment,
    options: &SolveOptions,
    statistics: &mut Statistics,
) -> Result<bool, SolveFailure> {
    if let Some(abort) = config.abort {
        if abort.load(Ordering::Relaxed) {
            return Err(SolveFailure::Aborted);
        }
    }

    if assignment.is_complete() {
        return Ok(true);
    }

    let slot_id = select_unassigned_slot(config, domains, assignment);

    for word_id in order_domain_values(config, domains, assignment, slot_id) {
        statistics.states += 1;
        assignment.assign(slot_id, word_id);

        let checkpoint = domains.checkpoint();
        let mut viable = is_consistent(config, assignment);
        if viable && options.maintain_arc_consistency {
            viable = propagate_choice(config, domains, slot_id, word_id, statistics);
        }

        if viable {
            match backtrack(config, domains, assignment, options, statistics) {
                // Keep the trial entry: it's part of the completed assignment.
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(failure) => {
                    domains.rollback_to(config.word_list, checkpoint);
                    assignment.unassign(slot_id);
                    return Err(failure);
                }
            }
        }

        domains.rollback_to(config.word_list, checkpoint);
        assignment.unassign(slot_id);
    }

    statistics.backtracks += 1;
    Ok(false)
}

/// Solve with the baseline configuration: consistency preprocessing, then pure backtracking.
pub fn solve(config: &PuzzleConfig) -> Result<SolveSuccess, SolveFailure> {
    solve_with_options(config, SolveOptions::default())
}

/// Enforce node consistency and arc consistency, then search. The only failures a caller sees
/// are `Unsatisfiable` and (if an abort flag was supplied) `Aborted`.
pub fn solve_with_options(
    config: &PuzzleConfig,
    options: SolveOptions,
) -> Result<SolveSuccess, SolveFailure> {
    let start = Instant::now();
    let mut statistics = Statistics::default();

    let mut domains = DomainStore::new(config.word_list, config.slot_configs);
    enforce_node_consistency(config, &mut domains);

    let propagation_start = Instant::now();
    let preprocessed = enforce_arc_consistency(config, &mut domains, None);
    statistics.propagation_time += propagation_start.elapsed();

    if let Err(failure) = preprocessed {
        debug!("unsatisfiable in preprocessing: slot {} wiped out", failure.slot_id);
        return Err(SolveFailure::Unsatisfiable);
    }

    let mut assignment = Assignment::new(config.slot_configs.len());
    let solved = backtrack(config, &mut domains, &mut assignment, &options, &mut statistics)?;

    statistics.total_time = start.elapsed();

    if solved {
        debug!(
            "solved after {} states and {} backtracks",
            statistics.states, statistics.backtracks
        );
        Ok(SolveSuccess {
            choices: assignment.choices(),
            statistics,
        })
    } else {
        debug!(
            "exhausted search after {} states and {} backtracks",
            statistics.states, statistics.backtracks
        );
        Err(SolveFailure::Unsatisfiable)
    }
}
