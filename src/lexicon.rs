//! Closed-set lookup tables and the external lexical resource seam.
//!
//! Every word list the classifier consults lives here as injectable
//! configuration data with built-in defaults, so the traversal and
//! state-machine logic can be tested against alternative tables.

use crate::classify::Relation;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Keyword set partitioned by initial position on the relation line.
#[derive(Debug, Clone, Default)]
pub struct PolarityTable {
    pub conflict: BTreeSet<String>,
    pub neutral: BTreeSet<String>,
    pub dependent: BTreeSet<String>,
}

impl PolarityTable {
    fn from_words(
        conflict: &[&str],
        neutral: &[&str],
        dependent: &[&str],
    ) -> Self {
        Self {
            conflict: to_set(conflict),
            neutral: to_set(neutral),
            dependent: to_set(dependent),
        }
    }

    /// Initial position of `word`, if the table knows it.
    pub fn position_of(&self, word: &str) -> Option<Relation> {
        if self.conflict.contains(word) {
            Some(Relation::Conflict)
        } else if self.neutral.contains(word) {
            Some(Relation::Neutral)
        } else if self.dependent.contains(word) {
            Some(Relation::Dependent)
        } else {
            None
        }
    }
}

/// All closed-set policy data the traverser and classifier consult.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    /// Negative-polarity lemmas counted toward negation parity.
    pub negative_words: BTreeSet<String>,
    /// Restrictive ("only"-class) lemmas.
    pub restrictive_words: BTreeSet<String>,
    /// Deontic modals that trigger forward transfer (includes the "to"
    /// merged forms recorded by the traverser).
    pub deontic_modals: BTreeSet<String>,
    /// Subordinate-clause markers that open a condition clause.
    pub condition_markers: BTreeSet<String>,
    /// Keywords biased toward conflict, by initial position.
    pub conflict_keywords: PolarityTable,
    /// Keywords biased toward dependency, by initial position.
    pub dependent_keywords: PolarityTable,
    /// Fixed table of mutually antonymous prepositions/particles.
    pub antonym_prepositions: BTreeMap<String, String>,
    /// Equal-scored sides resolve to the object side.
    pub prefer_object_on_tie: bool,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            negative_words: to_set(&[
                "not", "no", "never", "none", "neither", "nor", "n't", "without",
            ]),
            restrictive_words: to_set(&["only", "just", "merely", "solely", "exclusively"]),
            deontic_modals: to_set(&[
                "must", "should", "shall", "ought to", "have to", "need to",
            ]),
            condition_markers: to_set(&[
                "if", "when", "unless", "while", "after", "only", "just", "even",
            ]),
            conflict_keywords: PolarityTable::from_words(
                &[
                    "conflict",
                    "incompatible",
                    "exclusive",
                    "mutually",
                    "override",
                    "overrule",
                    "supersede",
                    "cancel",
                    "negate",
                    "exclude",
                    "contradict",
                    "clash",
                ],
                &[
                    "ignore", "disable", "suppress", "discard", "omit", "skip", "unset",
                    "forbid",
                ],
                &[],
            ),
            dependent_keywords: PolarityTable::from_words(
                &[],
                &[
                    "use",
                    "enable",
                    "set",
                    "specify",
                    "give",
                    "apply",
                    "work",
                    "affect",
                    "matter",
                    "combine",
                    "available",
                    "effective",
                    "useful",
                    "meaningful",
                    "relevant",
                    "valid",
                    "sense",
                    "make sense",
                    "have effect",
                ],
                &[
                    "require", "depend", "need", "imply", "rely", "presume", "assume",
                    "expect", "necessitate",
                ],
            ),
            antonym_prepositions: antonym_pairs(&[
                ("on", "off"),
                ("up", "down"),
                ("in", "out"),
                ("with", "without"),
                ("before", "after"),
                ("above", "below"),
            ]),
            prefer_object_on_tie: true,
        }
    }
}

impl RulePolicy {
    /// Category and initial position of a side keyword. A keyword absent from
    /// both tables (or an absent keyword) is neutral at a neutral position.
    pub fn keyword_polarity(&self, keyword: Option<&str>) -> (Relation, Relation) {
        let Some(keyword) = keyword else {
            return (Relation::Neutral, Relation::Neutral);
        };
        if let Some(init) = self.conflict_keywords.position_of(keyword) {
            (Relation::Conflict, init)
        } else if let Some(init) = self.dependent_keywords.position_of(keyword) {
            (Relation::Dependent, init)
        } else {
            (Relation::Neutral, Relation::Neutral)
        }
    }

    pub fn is_negative(&self, lemma: &str) -> bool {
        self.negative_words.contains(lemma)
    }

    pub fn is_restrictive(&self, lemma: &str) -> bool {
        self.restrictive_words.contains(lemma)
    }

    pub fn is_deontic_modal(&self, aux: &str) -> bool {
        self.deontic_modals.contains(aux)
    }

    pub fn is_condition_marker(&self, word: &str) -> bool {
        self.condition_markers.contains(word)
    }

    /// Particle comparison, word by word. Antonymy requires both particles in
    /// the fixed table, mapped at each other.
    pub fn particles_are_antonyms(&self, left: &str, right: &str) -> bool {
        let left_words: Vec<&str> = left.split_whitespace().collect();
        let right_words: Vec<&str> = right.split_whitespace().collect();
        if left_words.len() != right_words.len() || left_words.is_empty() {
            return false;
        }
        left_words.iter().zip(&right_words).any(|(a, b)| {
            a != b
                && self.antonym_prepositions.get(*a).map(String::as_str) == Some(*b)
                && self.antonym_prepositions.get(*b).map(String::as_str) == Some(*a)
        })
    }
}

/// External synonym/antonym resource for single words.
pub trait Lexicon {
    fn synonyms(&self, word: &str) -> BTreeSet<String>;
    fn antonyms(&self, word: &str) -> BTreeSet<String>;
}

/// Lexicon backed by serde-loadable tables, carried in the input records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableLexicon {
    #[serde(default)]
    synonyms: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    antonyms: BTreeMap<String, BTreeSet<String>>,
}

impl TableLexicon {
    pub fn with_synonyms(mut self, word: &str, words: &[&str]) -> Self {
        self.synonyms.insert(word.to_string(), to_set(words));
        self
    }

    pub fn with_antonyms(mut self, word: &str, words: &[&str]) -> Self {
        self.antonyms.insert(word.to_string(), to_set(words));
        self
    }
}

impl Lexicon for TableLexicon {
    fn synonyms(&self, word: &str) -> BTreeSet<String> {
        self.synonyms.get(word).cloned().unwrap_or_default()
    }

    fn antonyms(&self, word: &str) -> BTreeSet<String> {
        self.antonyms.get(word).cloned().unwrap_or_default()
    }
}

/// Relation between two predicate words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordRelation {
    Synonym,
    Antonym,
    Unrelated,
}

/// Compare two (possibly multi-word) predicates word by word. A length
/// mismatch yields no relation at all. The `non_` prefix marks an
/// annotator-negated predicate and counts as antonymy with its base form.
pub fn compare_predicates(lexicon: &dyn Lexicon, left: &str, right: &str) -> Vec<WordRelation> {
    let left_words: Vec<&str> = left.split_whitespace().collect();
    let right_words: Vec<&str> = right.split_whitespace().collect();
    if left_words.len() != right_words.len() || left_words.is_empty() {
        return Vec::new();
    }
    left_words
        .iter()
        .zip(&right_words)
        .map(|(a, b)| {
            if a == b || lexicon.synonyms(b).contains(*a) || lexicon.synonyms(a).contains(*b) {
                WordRelation::Synonym
            } else if lexicon.antonyms(b).contains(*a)
                || lexicon.antonyms(a).contains(*b)
                || format!("non_{a}") == **b
                || format!("non_{b}") == **a
            {
                WordRelation::Antonym
            } else {
                WordRelation::Unrelated
            }
        })
        .collect()
}

/// Collapse per-word relations into a single verdict: any unrelated word (or
/// an empty comparison) means no relation, any antonym wins over synonymy.
pub fn overall_relation(relations: &[WordRelation]) -> Option<WordRelation> {
    if relations.is_empty() || relations.contains(&WordRelation::Unrelated) {
        return None;
    }
    if relations.contains(&WordRelation::Antonym) {
        Some(WordRelation::Antonym)
    } else {
        Some(WordRelation::Synonym)
    }
}

fn to_set(words: &[&str]) -> BTreeSet<String> {
    words.iter().map(|word| (*word).to_string()).collect()
}

fn antonym_pairs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (a, b) in pairs {
        out.insert((*a).to_string(), (*b).to_string());
        out.insert((*b).to_string(), (*a).to_string());
    }
    out
}
