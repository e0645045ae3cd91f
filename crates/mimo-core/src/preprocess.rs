//! Relation targets and instance encoding.
//!
//! Turns one raw instance (a mention-annotated summary plus its relation
//! values) into source/target word sequences. Instances without a summary,
//! without mentions, or without any relation in the target table are
//! skipped by returning no pairs.

use crate::vocab::{Vocabulary, BOS_WORD, EOS_WORD};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator placed around the mention span in the source sequence.
pub const SPAN_SEPARATOR: &str = "|";

/// One relation target and its maximum token length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Relation name, e.g. `"date of birth"`.
    pub name: String,
    /// Target values are truncated to this many tokens.
    pub max_len: usize,
}

impl TargetSpec {
    /// Create a target spec.
    pub fn new(name: impl Into<String>, max_len: usize) -> Self {
        Self {
            name: name.into(),
            max_len,
        }
    }

    /// Marker token for this relation.
    pub fn marker(&self) -> String {
        normalize_relation_name(&self.name)
    }
}

/// The default relation targets.
pub fn default_targets() -> Vec<TargetSpec> {
    [
        ("given name", 3),
        ("family name", 3),
        ("sex or gender", 1),
        ("date of birth", 4),
        ("occupation", 3),
        ("country of citizenship", 4),
        ("date of death", 4),
        ("place of birth", 5),
        ("educated at", 7),
        ("member of sports team", 9),
        ("place of death", 5),
        ("position held", 9),
        ("participant of", 8),
        ("member of political party", 6),
        ("award received", 10),
        ("sport", 2),
    ]
    .into_iter()
    .map(|(name, max_len)| TargetSpec::new(name, max_len))
    .collect()
}

/// `"date of birth"` becomes `"<date_of_birth>"`.
pub fn normalize_relation_name(name: &str) -> String {
    format!("<{}>", name.replace(' ', "_"))
}

/// Relation targets keyed by marker, in table order.
#[derive(Debug, Clone)]
pub struct TargetTable {
    specs: Vec<(String, TargetSpec)>,
}

impl TargetTable {
    /// Build a table from target specs.
    pub fn new(specs: Vec<TargetSpec>) -> Self {
        let specs = specs.into_iter().map(|s| (s.marker(), s)).collect();
        Self { specs }
    }

    /// Look up a target by marker.
    pub fn get(&self, marker: &str) -> Option<&TargetSpec> {
        self.specs
            .iter()
            .find(|(m, _)| m == marker)
            .map(|(_, spec)| spec)
    }

    /// Markers in table order.
    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|(m, _)| m.as_str())
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if the table has no targets.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for TargetTable {
    fn default() -> Self {
        Self::new(default_targets())
    }
}

/// A mention: left context, span, right context.
pub type Mention = (Vec<String>, Vec<String>, Vec<String>);

/// A raw instance as read from the corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Instance identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Summary text; instances without one are skipped.
    #[serde(default)]
    pub summary: Option<String>,
    /// Mentions of the subject in the summary.
    #[serde(default)]
    pub mentions: Vec<Mention>,
    /// Relation name to tokenized value.
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<String>>,
}

/// One source sequence with its per-target sequences, as words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPair {
    /// Instance identifier.
    pub id: String,
    /// BOS + source + EOS.
    pub source: Vec<String>,
    /// Marker to BOS + value + EOS.
    pub targets: BTreeMap<String, Vec<String>>,
}

/// [`EncodedPair`] mapped through a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPair {
    /// Instance identifier.
    pub id: String,
    /// Source token ids.
    pub source: Vec<u32>,
    /// Marker to target token ids.
    pub targets: BTreeMap<String, Vec<u32>>,
}

impl EncodedPair {
    /// Map words to ids.
    pub fn to_indices(&self, src_vocab: &Vocabulary, tgt_vocab: &Vocabulary) -> IndexedPair {
        IndexedPair {
            id: self.id.clone(),
            source: src_vocab.encode(&self.source),
            targets: self
                .targets
                .iter()
                .map(|(marker, words)| (marker.clone(), tgt_vocab.encode(words)))
                .collect(),
        }
    }
}

/// Encode one instance into source/target pairs.
///
/// One mention is sampled with `rng`. The source is
/// `left | span | right` truncated to `max_src_len` and wrapped with
/// BOS/EOS; each qualifying relation value is truncated to its target's
/// `max_len` and wrapped the same way.
pub fn encode_instance<R: Rng + ?Sized>(
    instance: &Instance,
    table: &TargetTable,
    max_src_len: usize,
    rng: &mut R,
) -> Vec<EncodedPair> {
    if instance.summary.as_deref().map_or(true, str::is_empty) {
        return Vec::new();
    }
    if instance.mentions.is_empty() {
        return Vec::new();
    }

    let targets: BTreeMap<String, Vec<String>> = instance
        .relations
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .filter_map(|(name, value)| {
            let marker = normalize_relation_name(name);
            let spec = table.get(&marker)?;
            Some((marker, wrap(&value[..value.len().min(spec.max_len)])))
        })
        .collect();

    if targets.is_empty() {
        return Vec::new();
    }

    let Some((left, span, right)) = instance.mentions.choose(rng) else {
        return Vec::new();
    };

    let separator = SPAN_SEPARATOR.to_string();
    let source: Vec<String> = left
        .iter()
        .chain(std::iter::once(&separator))
        .chain(span.iter())
        .chain(std::iter::once(&separator))
        .chain(right.iter())
        .take(max_src_len)
        .cloned()
        .collect();

    vec![EncodedPair {
        id: instance.id.clone(),
        source: wrap(&source),
        targets,
    }]
}

fn wrap(words: &[String]) -> Vec<String> {
    let mut seq = Vec::with_capacity(words.len() + 2);
    seq.push(BOS_WORD.to_string());
    seq.extend(words.iter().cloned());
    seq.push(EOS_WORD.to_string());
    seq
}
