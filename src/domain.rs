//! The mutable half of the solver state: each slot's live candidate set. Candidates are stored as
//! a fixed initial option list plus an elimination mask, a live count, and incrementally
//! maintained per-cell glyph counts. Every elimination is recorded on a trail so that a search
//! branch can be unwound exactly, no matter how much propagation happened inside it.

use crate::grid::SlotConfig;
use crate::types::{GlyphId, SlotId, WordId};
use crate::util::{build_glyph_counts_by_cell, GlyphCountsByCell};
use crate::word_list::WordList;
use crate::CHECK_INVARIANTS;

/// A mark returned by `DomainStore::checkpoint`, identifying a point on the trail to roll back to.
pub type Checkpoint = usize;

/// Per-slot candidate sets. Domains only ever shrink through `eliminate` and only ever grow back
/// through `rollback_to`, so observers between those calls see a monotonically narrowing space.
pub struct DomainStore {
    /// For each slot, the initial candidate list: every word id, in word list order. This is
    /// fixed at construction; liveness is tracked by `eliminated`.
    options: Vec<Vec<WordId>>,

    /// For each slot, whether each word (indexed by `WordId`) has been eliminated.
    eliminated: Vec<Vec<bool>>,

    /// For each slot, the count of words not yet eliminated.
    remaining: Vec<usize>,

    /// For each slot, occurrence counts of each glyph in each cell across its live, length-matched
    /// options; see `util.rs`.
    glyph_counts_by_cell: Vec<GlyphCountsByCell>,

    /// For each slot, its length, used to keep glyph counts in sync on eliminate/restore.
    slot_lengths: Vec<usize>,

    /// Every elimination ever made, in order. `rollback_to` pops and reverses these.
    trail: Vec<(SlotId, WordId)>,
}

impl DomainStore {
    /// Build the initial domains: every slot starts with the full word list. Node consistency is
    /// applied separately by the consistency engine.
    #[must_use]
    pub fn new(word_list: &WordList, slot_configs: &[SlotConfig]) -> DomainStore {
        let word_count = word_list.words.len();

        let options: Vec<Vec<WordId>> = slot_configs
            .iter()
            .map(|_| (0..word_count).collect())
            .collect();

        let glyph_counts_by_cell: Vec<GlyphCountsByCell> = slot_configs
            .iter()
            .map(|slot_config| {
                build_glyph_counts_by_cell(word_list, slot_config.length, 0..word_count)
            })
            .collect();

        DomainStore {
            options,
            eliminated: slot_configs.iter().map(|_| vec![false; word_count]).collect(),
            remaining: slot_configs.iter().map(|_| word_count).collect(),
            glyph_counts_by_cell,
            slot_lengths: slot_configs.iter().map(|slot| slot.length).collect(),
            trail: vec![],
        }
    }

    /// The number of slots tracked by this store.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.options.len()
    }

    /// The number of live candidates for the given slot.
    #[must_use]
    pub fn len(&self, slot_id: SlotId) -> usize {
        self.remaining[slot_id]
    }

    /// Whether the given slot's domain has been wiped out.
    #[must_use]
    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.remaining[slot_id] == 0
    }

    /// Whether the given word is still live for the given slot.
    #[must_use]
    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        !self.eliminated[slot_id][word_id]
    }

    /// Iterate over the live candidates for the given slot, in word list order.
    pub fn words(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        let eliminated = &self.eliminated[slot_id];
        self.options[slot_id]
            .iter()
            .copied()
            .filter(move |&word_id| !eliminated[word_id])
    }

    /// The number of live, length-matched candidates for `slot_id` containing `glyph` at
    /// `cell_idx`. Nonzero means a crossing word relying on that glyph still has support.
    #[must_use]
    pub fn glyph_count(&self, slot_id: SlotId, cell_idx: usize, glyph: GlyphId) -> u32 {
        self.glyph_counts_by_cell[slot_id][cell_idx][glyph]
    }

    /// Remove a word from a slot's domain, recording the removal on the trail.
    ///
    /// # Panics
    ///
    /// Panics if the word was already eliminated, which would mean a propagation bug: nothing may
    /// be removed twice without being reinstated in between.
    pub fn eliminate(&mut self, word_list: &WordList, slot_id: SlotId, word_id: WordId) {
        assert!(
            !self.eliminated[slot_id][word_id],
            "eliminating an already-eliminated word ({slot_id}, {word_id})"
        );

        self.eliminated[slot_id][word_id] = true;
        self.remaining[slot_id] -= 1;
        self.trail.push((slot_id, word_id));

        let word = &word_list.words[word_id];
        if word.glyphs.len() == self.slot_lengths[slot_id] {
            for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
                self.glyph_counts_by_cell[slot_id][cell_idx][glyph] -= 1;
            }
        }
    }

    /// A mark for the current trail position. Eliminations made after this call can be undone
    /// with `rollback_to`.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        self.trail.len()
    }

    /// Reinstate every elimination made since the given checkpoint, most recent first.
    pub fn rollback_to(&mut self, word_list: &WordList, checkpoint: Checkpoint) {
        if CHECK_INVARIANTS && checkpoint > self.trail.len() {
            panic!("rolling back to a checkpoint from an abandoned frame?");
        }

        while self.trail.len() > checkpoint {
            let (slot_id, word_id) = self.trail.pop().unwrap();

            self.eliminated[slot_id][word_id] = false;
            self.remaining[slot_id] += 1;

            let word = &word_list.words[word_id];
            if word.glyphs.len() == self.slot_lengths[slot_id] {
                for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
                    self.glyph_counts_by_cell[slot_id][cell_idx][glyph] += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DomainStore;
    use crate::grid::{generate_slot_configs, Structure};
    use crate::word_list::WordList;

    fn build_store(template: &str, words: &[&str]) -> (WordList, DomainStore) {
        let structure = Structure::parse(template).unwrap();
        let slot_configs = generate_slot_configs(&structure.slot_specs());
        let word_list = WordList::from_words(words.iter().copied(), None);
        let store = DomainStore::new(&word_list, &slot_configs);
        (word_list, store)
    }

    #[test]
    fn test_initial_domains_hold_every_word() {
        let (_, store) = build_store("...", &["cat", "dog", "ab"]);

        assert_eq!(store.slot_count(), 1);
        assert_eq!(store.len(0), 3);
        assert_eq!(store.words(0).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_eliminate_updates_counts() {
        let (word_list, mut store) = build_store("...", &["cat", "cab", "dog"]);
        let c = word_list.glyph_id_by_char[&'c'];

        assert_eq!(store.glyph_count(0, 0, c), 2);

        store.eliminate(&word_list, 0, 0);

        assert_eq!(store.len(0), 2);
        assert!(!store.contains(0, 0));
        assert_eq!(store.glyph_count(0, 0, c), 1);
        assert_eq!(store.words(0).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_rollback_reinstates_in_reverse() {
        let (word_list, mut store) = build_store("...", &["cat", "cab", "dog"]);
        let c = word_list.glyph_id_by_char[&'c'];

        let before = store.checkpoint();
        store.eliminate(&word_list, 0, 0);
        store.eliminate(&word_list, 0, 2);
        let nested = store.checkpoint();
        store.eliminate(&word_list, 0, 1);

        assert_eq!(store.len(0), 0);
        assert!(store.is_empty(0));

        store.rollback_to(&word_list, nested);
        assert_eq!(store.words(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(store.glyph_count(0, 0, c), 1);

        store.rollback_to(&word_list, before);
        assert_eq!(store.words(0).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(store.glyph_count(0, 0, c), 2);
    }

    #[test]
    #[should_panic(expected = "already-eliminated")]
    fn test_double_elimination_panics() {
        let (word_list, mut store) = build_store("...", &["cat"]);
        store.eliminate(&word_list, 0, 0);
        store.eliminate(&word_list, 0, 0);
    }
}
