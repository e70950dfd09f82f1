//! Implicit conflict detection from per-option topic sentences.
//!
//! Some manuals never say "conflicts with"; instead two options each claim
//! the same output slot ("sort by size" vs "sort by time"). Pairing the
//! topic sentences and comparing their predicates surfaces those conflicts.

use crate::aggregate::ConflictPair;
use crate::annotate::ConstTree;
use crate::lexicon::{compare_predicates, overall_relation, Lexicon, RulePolicy, WordRelation};
use serde::Deserialize;

/// The distilled first sentence of one option's description.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicSentence {
    pub option: String,
    pub sent: String,
    /// Main predicate lemma(s), empty when none was found.
    #[serde(default)]
    pub predicate: String,
    /// Direct object lemma(s) of the predicate.
    #[serde(default)]
    pub object: String,
    /// Verb particle, if the predicate is phrasal ("turn on").
    #[serde(default)]
    pub particle: String,
    /// Constituency tree of the sentence, for structural comparison.
    #[serde(default)]
    pub tree: Option<ConstTree>,
}

const COPULAR: [&str; 4] = ["be", "become", "seem", "look like"];
const REPORTING: [&str; 3] = ["print", "display", "show"];
// Objects too generic to be a contested slot.
const GENERIC_OBJECTS: [&str; 2] = ["value", "values"];

/// Pair up topic sentences and emit a conflict for each pair that contests
/// the same specific object with opposed (or structurally parallel) claims.
pub fn find_implicit_conflicts(
    topics: &[TopicSentence],
    lexicon: &dyn Lexicon,
    policy: &RulePolicy,
) -> Vec<ConflictPair> {
    let mut out = Vec::new();
    for (i, left) in topics.iter().enumerate() {
        for right in &topics[i + 1..] {
            if left.option == right.option {
                continue;
            }
            if topics_conflict(left, right, lexicon, policy) {
                out.push(ConflictPair::new(
                    left.option.clone(),
                    right.option.clone(),
                ));
            }
        }
    }
    out
}

fn topics_conflict(
    left: &TopicSentence,
    right: &TopicSentence,
    lexicon: &dyn Lexicon,
    policy: &RulePolicy,
) -> bool {
    if left.predicate.is_empty() || right.predicate.is_empty() {
        return false;
    }
    if left.object.is_empty()
        || left.object != right.object
        || GENERIC_OBJECTS.contains(&left.object.as_str())
    {
        return false;
    }

    let left_copular = COPULAR.contains(&left.predicate.as_str());
    let right_copular = COPULAR.contains(&right.predicate.as_str());
    if left_copular && right_copular {
        // Two copular claims on the same slot ("the default is X" / "the
        // default is Y") cannot both hold.
        return true;
    }
    if REPORTING.contains(&left.predicate.as_str()) && REPORTING.contains(&right.predicate.as_str())
    {
        // Reporting verbs only describe output; no contention.
        return false;
    }

    if left.predicate == right.predicate {
        if left.particle.is_empty() && right.particle.is_empty() {
            return false;
        }
        return policy.particles_are_antonyms(&left.particle, &right.particle);
    }

    let relations = compare_predicates(lexicon, &left.predicate, &right.predicate);
    match overall_relation(&relations) {
        Some(WordRelation::Antonym) => true,
        Some(WordRelation::Synonym) => is_parallel_structure(left.tree.as_ref(), right.tree.as_ref()),
        _ => false,
    }
}

/// Synonymous predicates conflict only when the two sentences share their
/// constituency skeleton, diverging at most in the final production.
pub fn is_parallel_structure(left: Option<&ConstTree>, right: Option<&ConstTree>) -> bool {
    let (Some(left), Some(right)) = (left, right) else {
        return false;
    };
    let a = left.production_sequence();
    let b = right.production_sequence();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let n = short.len();
    short[..n - 1] == long[..n - 1] && long[n - 1].contains(&short[n - 1])
}
