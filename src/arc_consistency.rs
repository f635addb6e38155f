//! This module contains the consistency engine: the node-consistency filter (a word must be as
//! long as its slot) and a crossword-specific implementation of the AC-3 algorithm. A grid is
//! arc-consistent when every live candidate for a slot has at least one live candidate in each
//! crossing slot that agrees with it on the shared letter. AC-3 keeps revising arcs until no more
//! eliminations are possible, or until some slot's domain is wiped out, which proves the puzzle
//! unsatisfiable without any search.

use log::debug;
use smallvec::SmallVec;
use std::collections::VecDeque;

use crate::domain::DomainStore;
use crate::grid::PuzzleConfig;
use crate::types::{SlotId, WordId};
use crate::MAX_SLOT_LENGTH;

/// Result from a failed attempt to establish arc consistency: the slot whose domain was wiped
/// out. Observationally this is the same "no solution" outcome as a failed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub slot_id: SlotId,
}

/// Remove from each slot's domain every word whose length differs from the slot's length. This is
/// a pure per-slot filter and is idempotent.
pub fn enforce_node_consistency(config: &PuzzleConfig, domains: &mut DomainStore) {
    for slot_config in config.slot_configs {
        let mismatched: Vec<WordId> = domains
            .words(slot_config.id)
            .filter(|&word_id| config.word_list.words[word_id].len() != slot_config.length)
            .collect();

        for word_id in mismatched {
            domains.eliminate(config.word_list, slot_config.id, word_id);
        }

        debug!(
            "slot {}: {} node-consistent candidates",
            slot_config.id,
            domains.len(slot_config.id)
        );
    }
}

/// Make slot `x` arc-consistent with slot `y` by removing every candidate of `x` that has no
/// compatible candidate in `y` at the overlap alignment. Returns whether anything was removed.
/// If the slots don't overlap the arc is trivially consistent and nothing is removed.
///
/// # Panics
///
/// Panics if `x == y`: a slot never overlaps itself, and asking means slot derivation went wrong.
pub fn revise(config: &PuzzleConfig, domains: &mut DomainStore, x: SlotId, y: SlotId) -> bool {
    assert!(x != y, "revising slot {x} against itself");

    let x_config = &config.slot_configs[x];

    let Some((cell_idx, other_cell)) = x_config
        .crossings
        .iter()
        .enumerate()
        .find_map(|(cell_idx, crossing)| match crossing {
            Some(crossing) if crossing.other_slot_id == y => {
                Some((cell_idx, crossing.other_slot_cell))
            }
            _ => None,
        })
    else {
        return false;
    };

    // A candidate is supported iff y still has a live, length-matched word carrying the same
    // glyph in the shared cell, which the domain store's glyph counts answer in O(1).
    let unsupported: SmallVec<[WordId; 16]> = domains
        .words(x)
        .filter(|&word_id| {
            let word = &config.word_list.words[word_id];
            if word.glyphs.len() != x_config.length {
                // Length-mismatched candidates are node consistency's job, not ours.
                return false;
            }
            domains.glyph_count(y, other_cell, word.glyphs[cell_idx]) == 0
        })
        .collect();

    let revised = !unsupported.is_empty();
    for word_id in unsupported {
        domains.eliminate(config.word_list, x, word_id);
    }

    revised
}

/// Enforce arc consistency across the whole grid with the AC-3 worklist algorithm. If
/// `initial_arcs` is given, only the implications of those arcs are propagated (the caller
/// asserts the rest of the grid is already consistent); otherwise the worklist is seeded with
/// every ordered pair of overlapping slots. Returns the wiped-out slot on failure.
pub fn enforce_arc_consistency(
    config: &PuzzleConfig,
    domains: &mut DomainStore,
    initial_arcs: Option<Vec<(SlotId, SlotId)>>,
) -> Result<(), ArcConsistencyFailure> {
    let mut worklist: VecDeque<(SlotId, SlotId)> = match initial_arcs {
        Some(arcs) => arcs.into(),
        None => config
            .slot_configs
            .iter()
            .flat_map(|slot_config| {
                slot_config
                    .crossings
                    .iter()
                    .flatten()
                    .map(|crossing| (slot_config.id, crossing.other_slot_id))
            })
            .collect(),
    };

    while let Some((x, y)) = worklist.pop_front() {
        if !revise(config, domains, x, y) {
            continue;
        }

        if domains.is_empty(x) {
            debug!("arc consistency wiped out slot {x}");
            return Err(ArcConsistencyFailure { slot_id: x });
        }

        // Slot x's domain shrank, so any neighbor whose support lived in it must be re-checked.
        let neighbors: SmallVec<[SlotId; MAX_SLOT_LENGTH]> = config.slot_configs[x]
            .crossings
            .iter()
            .flatten()
            .map(|crossing| crossing.other_slot_id)
            .filter(|&z| z != y)
            .collect();

        for z in neighbors {
            worklist.push_back((z, x));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{enforce_arc_consistency, enforce_node_consistency, revise, ArcConsistencyFailure};
    use crate::domain::DomainStore;
    use crate::grid::{generate_puzzle_config, OwnedPuzzleConfig, Structure};
    use crate::word_list::WordList;

    fn generate_config(template: &str, words: &[&str]) -> OwnedPuzzleConfig {
        let structure = Structure::parse(template).unwrap();
        let word_list = WordList::from_words(words.iter().copied(), None);
        generate_puzzle_config(word_list, &structure).unwrap()
    }

    fn live_strings(config: &OwnedPuzzleConfig, domains: &DomainStore, slot_id: usize) -> Vec<String> {
        domains
            .words(slot_id)
            .map(|word_id| config.word_list.words[word_id].normalized_string.clone())
            .collect()
    }

    #[test]
    fn test_node_consistency_filters_by_length() {
        let config = generate_config("...", &["cat", "dog", "ab", "horse"]);
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);

        enforce_node_consistency(&config_ref, &mut domains);

        assert_eq!(live_strings(&config, &domains, 0), vec!["cat", "dog"]);
    }

    #[test]
    fn test_node_consistency_is_idempotent() {
        let config = generate_config("...", &["cat", "dog", "ab"]);
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);

        enforce_node_consistency(&config_ref, &mut domains);
        let after_once = live_strings(&config, &domains, 0);
        let trail_after_once = domains.checkpoint();

        enforce_node_consistency(&config_ref, &mut domains);

        assert_eq!(live_strings(&config, &domains, 0), after_once);
        assert_eq!(domains.checkpoint(), trail_after_once);
    }

    #[test]
    fn test_revise_is_a_noop_for_non_overlapping_slots() {
        // Two across slots separated by a block: no shared cell.
        let config = generate_config("..#..", &["ab", "cd"]);
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);
        enforce_node_consistency(&config_ref, &mut domains);

        assert!(!revise(&config_ref, &mut domains, 0, 1));
        assert_eq!(domains.len(0), 2);
    }

    #[test]
    #[should_panic(expected = "against itself")]
    fn test_revise_panics_on_self_arc() {
        let config = generate_config("...", &["cat"]);
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);

        revise(&config_ref, &mut domains, 0, 0);
    }

    #[test]
    fn test_revise_removes_unsupported_words() {
        // A length-3 across slot whose first cell starts a length-4 down slot.
        let config = generate_config(
            "
            ...#
            .###
            .###
            .###
            ",
            &["cat", "dog", "tree", "drum"],
        );
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);
        enforce_node_consistency(&config_ref, &mut domains);

        // "cat" requires a down word starting with 'c'; only "tree" and "drum" are available.
        assert!(revise(&config_ref, &mut domains, 0, 1));
        assert_eq!(live_strings(&config, &domains, 0), vec!["dog"]);
    }

    #[test]
    fn test_arc_consistency_support_property() {
        let config = generate_config(
            "
            ...#
            .###
            .###
            .###
            ",
            &["cat", "dog", "tree", "drum"],
        );
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);
        enforce_node_consistency(&config_ref, &mut domains);

        let sizes_before: Vec<usize> =
            (0..domains.slot_count()).map(|slot_id| domains.len(slot_id)).collect();

        enforce_arc_consistency(&config_ref, &mut domains, None).unwrap();

        assert_eq!(live_strings(&config, &domains, 0), vec!["dog"]);
        assert_eq!(live_strings(&config, &domains, 1), vec!["drum"]);

        // Domains never grow during propagation.
        for slot_id in 0..domains.slot_count() {
            assert!(domains.len(slot_id) <= sizes_before[slot_id]);
        }

        // Every remaining word has a compatible partner in every crossing slot.
        for slot_config in config_ref.slot_configs {
            for word_id in domains.words(slot_config.id).collect::<Vec<_>>() {
                let word = &config_ref.word_list.words[word_id];
                for (cell_idx, crossing) in slot_config.crossings.iter().enumerate() {
                    if let Some(crossing) = crossing {
                        assert!(
                            domains.glyph_count(
                                crossing.other_slot_id,
                                crossing.other_slot_cell,
                                word.glyphs[cell_idx],
                            ) > 0,
                            "word {word_id} in slot {} lost its support",
                            slot_config.id
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_arc_consistency_reports_wipeout() {
        let config = generate_config(
            "
            ...#
            .###
            .###
            .###
            ",
            &["cat", "tree"],
        );
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);
        enforce_node_consistency(&config_ref, &mut domains);

        // "cat" needs a down word starting with 'c' and "tree" needs an across word starting
        // with 't': whichever arc is revised first empties its slot.
        let result = enforce_arc_consistency(&config_ref, &mut domains, None);
        assert!(matches!(result, Err(ArcConsistencyFailure { .. })));
    }

    #[test]
    fn test_arc_consistency_with_explicit_arcs() {
        let config = generate_config(
            "
            ...#
            .###
            .###
            .###
            ",
            &["cat", "dog", "tree", "drum"],
        );
        let config_ref = config.to_config_ref();
        let mut domains = DomainStore::new(config_ref.word_list, config_ref.slot_configs);
        enforce_node_consistency(&config_ref, &mut domains);

        // Seeding only the (down, across) arc still prunes "tree", whose first letter has no
        // support among the across candidates.
        enforce_arc_consistency(&config_ref, &mut domains, Some(vec![(1, 0)])).unwrap();

        assert_eq!(live_strings(&config, &domains, 1), vec!["drum"]);
    }
}
