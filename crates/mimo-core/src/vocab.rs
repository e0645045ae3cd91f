//! Vocabulary and special-token ids.
//!
//! A [`Vocabulary`] is immutable once built. It always contains the four
//! special words plus one marker per relation target; everything else is
//! admitted by a [`VocabBuilder`] according to corpus frequency.

use crate::error::{MimoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Padding token id.
pub const PAD: u32 = 0;
/// Unknown-word token id.
pub const UNK: u32 = 1;
/// Beginning-of-sequence token id.
pub const BOS: u32 = 2;
/// End-of-sequence token id.
pub const EOS: u32 = 3;

/// Padding word.
pub const PAD_WORD: &str = "<blank>";
/// Unknown word.
pub const UNK_WORD: &str = "<unk>";
/// Beginning-of-sequence word.
pub const BOS_WORD: &str = "<s>";
/// End-of-sequence word.
pub const EOS_WORD: &str = "</s>";

/// Special token ids shared between preprocessing and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Beginning of sequence.
    pub bos: u32,
    /// End of sequence.
    pub eos: u32,
    /// Padding.
    pub pad: u32,
    /// Unknown word.
    pub unk: u32,
}

impl SpecialTokens {
    /// Special ids paired with their surface words.
    fn entries(&self) -> [(&'static str, u32); 4] {
        [
            (BOS_WORD, self.bos),
            (EOS_WORD, self.eos),
            (PAD_WORD, self.pad),
            (UNK_WORD, self.unk),
        ]
    }

    /// Check if a token is one of the special tokens.
    pub fn is_special(&self, id: u32) -> bool {
        id == self.bos || id == self.eos || id == self.pad || id == self.unk
    }
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            bos: BOS,
            eos: EOS,
            pad: PAD,
            unk: UNK,
        }
    }
}

/// Word-to-id mapping with dense ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    word2idx: HashMap<String, u32>,
    idx2word: Vec<String>,
    specials: SpecialTokens,
}

impl Vocabulary {
    /// Create a vocabulary holding only the special words.
    ///
    /// The special ids must be exactly `0..4` in some order so that every
    /// later id stays dense.
    pub fn new(specials: SpecialTokens) -> Result<Self> {
        let mut idx2word = vec![String::new(); 4];
        let mut word2idx = HashMap::with_capacity(4);

        for (word, id) in specials.entries() {
            let slot = idx2word.get_mut(id as usize).ok_or_else(|| {
                MimoError::InvalidConfig(format!("special id {} for {} is not in 0..4", id, word))
            })?;
            if !slot.is_empty() {
                return Err(MimoError::InvalidConfig(format!(
                    "special id {} assigned to both {} and {}",
                    id, slot, word
                )));
            }
            *slot = word.to_string();
            word2idx.insert(word.to_string(), id);
        }

        Ok(Self {
            word2idx,
            idx2word,
            specials,
        })
    }

    /// Append a word if absent and return its id.
    fn insert(&mut self, word: &str) -> u32 {
        if let Some(&id) = self.word2idx.get(word) {
            return id;
        }
        let id = self.idx2word.len() as u32;
        self.idx2word.push(word.to_string());
        self.word2idx.insert(word.to_string(), id);
        id
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.idx2word.len()
    }

    /// Always false: the special words are always present.
    pub fn is_empty(&self) -> bool {
        self.idx2word.is_empty()
    }

    /// Special token ids.
    pub fn specials(&self) -> SpecialTokens {
        self.specials
    }

    /// Word to id.
    pub fn id(&self, word: &str) -> Option<u32> {
        self.word2idx.get(word).copied()
    }

    /// Id to word.
    pub fn word(&self, id: u32) -> Option<&str> {
        self.idx2word.get(id as usize).map(String::as_str)
    }

    /// Map words to ids, substituting UNK for out-of-vocabulary words.
    pub fn encode<S: AsRef<str>>(&self, words: &[S]) -> Vec<u32> {
        words
            .iter()
            .map(|w| self.id(w.as_ref()).unwrap_or(self.specials.unk))
            .collect()
    }

    /// Map ids back to words, substituting the UNK word for unknown ids.
    pub fn decode(&self, ids: &[u32]) -> Vec<&str> {
        ids.iter()
            .map(|&id| self.word(id).unwrap_or(UNK_WORD))
            .collect()
    }
}

/// Builds a [`Vocabulary`] from word counts.
///
/// Special words come first, then relation markers in the order given,
/// then corpus words in first-seen order.
#[derive(Debug, Clone)]
pub struct VocabBuilder {
    specials: SpecialTokens,
    markers: Vec<String>,
    min_word_count: usize,
    counts: HashMap<String, usize>,
    first_seen: Vec<String>,
}

impl VocabBuilder {
    /// Create a builder with the given special ids.
    pub fn new(specials: SpecialTokens) -> Self {
        Self {
            specials,
            markers: Vec::new(),
            min_word_count: 0,
            counts: HashMap::new(),
            first_seen: Vec::new(),
        }
    }

    /// Reserve ids for relation-target markers.
    pub fn relation_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers.extend(markers.into_iter().map(Into::into));
        self
    }

    /// Words must occur strictly more than this many times to be admitted.
    pub fn min_word_count(mut self, count: usize) -> Self {
        self.min_word_count = count;
        self
    }

    /// Count every word of one sequence.
    pub fn add_sequence<S: AsRef<str>>(&mut self, words: &[S]) {
        for word in words {
            let word = word.as_ref();
            match self.counts.get_mut(word) {
                Some(count) => *count += 1,
                None => {
                    self.counts.insert(word.to_string(), 1);
                    self.first_seen.push(word.to_string());
                }
            }
        }
    }

    /// Count every word of many sequences.
    pub fn extend<S: AsRef<str>>(mut self, sequences: &[Vec<S>]) -> Self {
        for seq in sequences {
            self.add_sequence(seq);
        }
        self
    }

    /// Number of distinct words seen so far.
    pub fn distinct_words(&self) -> usize {
        self.first_seen.len()
    }

    /// Build the vocabulary.
    pub fn build(self) -> Result<Vocabulary> {
        let mut vocab = Vocabulary::new(self.specials)?;
        for marker in &self.markers {
            vocab.insert(marker);
        }

        let mut ignored = 0usize;
        for word in &self.first_seen {
            if vocab.id(word).is_some() {
                continue;
            }
            if self.counts[word] > self.min_word_count {
                vocab.insert(word);
            } else {
                ignored += 1;
            }
        }

        tracing::info!(
            original = self.distinct_words(),
            trimmed = vocab.len(),
            min_word_count = self.min_word_count,
            ignored,
            "built vocabulary"
        );
        Ok(vocab)
    }
}
