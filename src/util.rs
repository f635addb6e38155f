use smallvec::SmallVec;

use crate::types::WordId;
use crate::word_list::WordList;
use crate::MAX_GLYPH_COUNT;

/// Structure tracking, for each cell of a slot, the number of occurrences of each glyph across the
/// slot's live options. A word has a compatible partner in a crossing slot iff the crossing slot's
/// count for the shared glyph at the shared cell is nonzero, which gives O(1) support tests during
/// propagation and value ordering.
pub type GlyphCountsByCell = Vec<SmallVec<[u32; MAX_GLYPH_COUNT]>>;

/// Initialize the `glyph_counts_by_cell` structure for a slot. Options whose length doesn't match
/// the slot are skipped: they can never participate in a crossing check and are removed outright
/// by node consistency.
pub fn build_glyph_counts_by_cell<I>(
    word_list: &WordList,
    slot_length: usize,
    options: I,
) -> GlyphCountsByCell
where
    I: IntoIterator<Item = WordId>,
{
    let mut result: GlyphCountsByCell = (0..slot_length)
        .map(|_| (0..word_list.glyphs.len()).map(|_| 0).collect())
        .collect();

    for word_id in options {
        let word = &word_list.words[word_id];
        if word.glyphs.len() != slot_length {
            continue;
        }
        for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
            result[cell_idx][glyph] += 1;
        }
    }

    result
}
