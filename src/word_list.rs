//! Loading and indexing of candidate words. A `WordList` interns every distinct character as a
//! `GlyphId` and every distinct normalized word as a `WordId`, so that the solver can compare
//! letters and words by index instead of by string.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use crate::types::{GlyphId, WordId};
use crate::{MAX_GLYPH_COUNT, MAX_SLOT_LENGTH};

/// A struct representing a word in the word list.
#[derive(Debug, Clone)]
pub struct Word {
    /// The word as it would appear in a grid: normalized, with only meaningful characters.
    pub normalized_string: String,

    /// The glyph ids making up `normalized_string`.
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,
}

impl Word {
    /// The number of cells this word would occupy.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Given a word string from a dictionary file, turn it into the normalized form used by the
/// solver.
#[must_use]
pub fn normalize_word(canonical: &str) -> String {
    canonical
        .to_lowercase()
        .nfc() // Normalize Unicode combining forms
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[derive(Debug, Clone)]
pub enum WordListError {
    InvalidPath(String),
    InvalidWord(String),
    EmptyList,
}

impl fmt::Display for WordListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            WordListError::InvalidPath(path) => format!("Can’t read file: “{path}”"),
            WordListError::InvalidWord(word) => {
                format!("Word list contains invalid word: “{word}”")
            }
            WordListError::EmptyList => "Word list contains no usable words".into(),
        };
        write!(f, "{string}")
    }
}

impl std::error::Error for WordListError {}

/// A struct representing the loaded word list. This is static for the lifetime of a solve; the
/// solver never adds or removes words, it only narrows per-slot domains.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    /// A list of all characters that occur in any (normalized) word. `GlyphId`s used everywhere
    /// else are indices into this list.
    pub glyphs: SmallVec<[char; MAX_GLYPH_COUNT]>,

    /// The inverse of `glyphs`: a map from a character to the `GlyphId` representing it.
    pub glyph_id_by_char: HashMap<char, GlyphId>,

    /// A list of all loaded words. `WordId`s are indices into this list.
    pub words: Vec<Word>,

    /// A map from a normalized string to the id of the `Word` representing it.
    pub word_id_by_string: HashMap<String, WordId>,
}

impl WordList {
    /// Construct a `WordList` from in-memory word strings, skipping duplicates and (if
    /// `max_length` is given) words too long for any slot.
    #[must_use]
    pub fn from_words<I, S>(words: I, max_length: Option<usize>) -> WordList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut instance = WordList::default();

        for word in words {
            let normalized = normalize_word(word.as_ref());
            if normalized.is_empty() {
                continue;
            }
            if max_length.map_or(false, |max| normalized.chars().count() > max) {
                continue;
            }
            instance.add_word(&normalized);
        }

        instance
    }

    /// Construct a `WordList` from a flat file containing one word per line. Blank lines are
    /// skipped; a line that normalizes to nothing (e.g. punctuation only) is an error.
    pub fn from_word_file<P: AsRef<Path>>(
        path: P,
        max_length: Option<usize>,
    ) -> Result<WordList, WordListError> {
        let contents = fs::read_to_string(&path).map_err(|_| {
            WordListError::InvalidPath(path.as_ref().to_string_lossy().into_owned())
        })?;

        let mut instance = WordList::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let normalized = normalize_word(line);
            if normalized.is_empty() {
                return Err(WordListError::InvalidWord(line.into()));
            }
            if max_length.map_or(false, |max| normalized.chars().count() > max) {
                continue;
            }
            instance.add_word(&normalized);
        }

        if instance.words.is_empty() {
            return Err(WordListError::EmptyList);
        }

        Ok(instance)
    }

    /// Return the id of the glyph representing the given char, interning it if needed.
    pub fn glyph_id_for_char(&mut self, ch: char) -> GlyphId {
        self.glyph_id_by_char.get(&ch).copied().unwrap_or_else(|| {
            let glyph_id = self.glyphs.len();
            self.glyphs.push(ch);
            self.glyph_id_by_char.insert(ch, glyph_id);
            glyph_id
        })
    }

    /// Add the given normalized word to the list if it isn't already present, and return its id
    /// either way.
    pub fn add_word(&mut self, normalized_word: &str) -> WordId {
        if let Some(&word_id) = self.word_id_by_string.get(normalized_word) {
            return word_id;
        }

        let glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]> = normalized_word
            .chars()
            .map(|c| self.glyph_id_for_char(c))
            .collect();

        let word_id = self.words.len();
        self.words.push(Word {
            normalized_string: normalized_word.into(),
            glyphs,
        });
        self.word_id_by_string
            .insert(normalized_word.into(), word_id);

        word_id
    }

    /// Borrow an existing word by id.
    #[must_use]
    pub fn get_word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }
}
