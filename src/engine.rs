//! The inference pipeline: from candidate sentences to a relation report.
//!
//! Per-sentence failures are never fatal. A sentence the annotator cannot
//! cover, or whose structure defeats the traversal, is logged and skipped;
//! the rest of the manual still produces relations.

use crate::aggregate::{ConflictPair, ProgramRelationSet, SentenceRelations};
use crate::annotate::Annotator;
use crate::classify::{
    classify_condition_clause, classify_main_clause, combine_clause_verdicts, Relation,
};
use crate::clauses::{
    add_subject, condition_clause, main_clause, rewrite_self_references, split_sub_sentences,
    strip_preamble,
};
use crate::implicit::find_implicit_conflicts;
use crate::input::{ProgramRecords, SentenceRecord};
use crate::lexicon::{Lexicon, RulePolicy};
use crate::output::RelationReport;
use crate::resolver::{
    expand_wildcard, resolve_options, strip_value_field, AliasTable, SubstitutionMap,
};
use crate::traverse::{traverse_clause, Connective, TraverseResult};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum classifier score for a sentence without an explicit
    /// relationship flag.
    pub threshold: f64,
    pub policy: RulePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            policy: RulePolicy::default(),
        }
    }
}

pub struct Engine<'a> {
    annotator: &'a dyn Annotator,
    lexicon: &'a dyn Lexicon,
    config: EngineConfig,
}

impl<'a> Engine<'a> {
    pub fn new(annotator: &'a dyn Annotator, lexicon: &'a dyn Lexicon, config: EngineConfig) -> Self {
        Self {
            annotator,
            lexicon,
            config,
        }
    }

    /// Run the full pipeline over one program's records.
    pub fn infer(&self, records: &ProgramRecords) -> RelationReport {
        let vocabulary: Vec<String> = records
            .options
            .iter()
            .map(|option| strip_value_field(option).to_string())
            .collect();
        let aliases = AliasTable::new(records.aliases.clone());

        // Alias surfaces count as program options during resolution even
        // though the report only lists canonical ones.
        let mut resolve_vocabulary = vocabulary.clone();
        for alias_list in records.aliases.values() {
            resolve_vocabulary.extend(
                alias_list
                    .iter()
                    .map(|alias| strip_value_field(alias).to_string()),
            );
        }

        let mut relations = ProgramRelationSet::default();
        for record in &records.sentences {
            if !self.is_relationship_sentence(record) {
                continue;
            }
            let found = self.relations_for_sentence(record, &resolve_vocabulary, &aliases);
            relations.absorb(found);
        }

        for pair in find_implicit_conflicts(&records.topics, self.lexicon, &self.config.policy) {
            relations.add_conflict(ConflictPair {
                a: aliases.canonical(strip_value_field(&pair.a)).to_string(),
                b: aliases.canonical(strip_value_field(&pair.b)).to_string(),
                negated: false,
            });
        }

        relations.resolve_precedence();
        info!(
            program = records.program.as_str(),
            conflicts = relations.conflicts.len(),
            dependents = relations.dependents.len(),
            "inference complete"
        );

        // The report lists canonical surfaces only, in manual order.
        let mut total_options: Vec<String> = Vec::with_capacity(vocabulary.len());
        for option in &vocabulary {
            let canonical = aliases.canonical(option).to_string();
            if !total_options.contains(&canonical) {
                total_options.push(canonical);
            }
        }
        RelationReport::new(total_options, &relations)
    }

    /// An explicit flag overrides the classifier score; an unscored,
    /// unflagged sentence is taken at face value.
    fn is_relationship_sentence(&self, record: &SentenceRecord) -> bool {
        if let Some(flag) = record.relationship {
            return flag;
        }
        match record.score {
            Some(score) => score >= self.config.threshold,
            None => true,
        }
    }

    fn relations_for_sentence(
        &self,
        record: &SentenceRecord,
        vocabulary: &[String],
        aliases: &AliasTable,
    ) -> SentenceRelations {
        let current = strip_value_field(&record.option);
        let current_canonical = aliases.canonical(current).to_string();

        let normalized = normalize_sentence(&record.sent);
        let repaired = repair_broken_options(&normalized, vocabulary);
        let current_surfaces = aliases.surfaces_of(current);
        let outcome = resolve_options(&repaired, &current_surfaces, Some(vocabulary));
        if outcome.map.is_empty() {
            debug!(sentence = record.sent.as_str(), "no option mentions; skipping");
            return SentenceRelations::default();
        }

        let parse = match self.annotator.dependencies(&outcome.sentence) {
            Ok(parse) => parse,
            Err(err) => {
                warn!(
                    sentence = outcome.sentence.as_str(),
                    error = %err,
                    "sentence not annotated; skipping"
                );
                return SentenceRelations::default();
            }
        };

        let mut out = SentenceRelations::default();
        for sub in split_sub_sentences(&parse) {
            let mut map = outcome.map.restricted_to(&sub);
            if map.is_empty() {
                continue;
            }
            let sub = strip_preamble(&sub);
            let sub = match add_subject(self.annotator, &sub) {
                Ok(sub) => sub,
                Err(err) => {
                    warn!(sub = sub.as_str(), error = %err, "subject insertion failed; skipping");
                    continue;
                }
            };
            map.ensure_current(&current_canonical);
            let sub = match rewrite_self_references(&sub, &map.current_token()) {
                Ok(sub) => sub,
                Err(err) => {
                    warn!(sub = sub.as_str(), error = %err, "self-reference rewrite failed; skipping");
                    continue;
                }
            };
            if let Some(found) = self.relations_for_sub_sentence(&sub, &map, vocabulary, aliases) {
                out.conflicts.extend(found.conflicts);
                out.dependents.extend(found.dependents);
            }
        }
        out
    }

    fn relations_for_sub_sentence(
        &self,
        sub: &str,
        map: &SubstitutionMap,
        vocabulary: &[String],
        aliases: &AliasTable,
    ) -> Option<SentenceRelations> {
        let policy = &self.config.policy;
        let tree = match self.annotator.constituency(sub) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(sub, error = %err, "no constituency annotation; skipping");
                return None;
            }
        };
        let condition = condition_clause(&tree, policy);
        let main = main_clause(sub, condition.as_deref());
        let main_parse = match self.annotator.dependencies(&main) {
            Ok(parse) => parse,
            Err(err) => {
                warn!(main = main.as_str(), error = %err, "main clause not annotated; skipping");
                return None;
            }
        };
        let mut main_traverse = traverse_clause(&main_parse, policy);

        if let Some(condition) = condition {
            let cond_parse = match self.annotator.dependencies(&condition) {
                Ok(parse) => parse,
                Err(err) => {
                    warn!(
                        condition = condition.as_str(),
                        error = %err,
                        "condition clause not annotated; skipping"
                    );
                    return None;
                }
            };
            let cond_traverse = traverse_clause(&cond_parse, policy);

            // Two self-contained relations in one sentence is structure the
            // combination table cannot interpret.
            if clause_is_complete(&cond_traverse) && clause_is_complete(&main_traverse) {
                warn!(sub, "both clauses carry complete option pairs; skipping");
                return None;
            }

            // Restrictive markers in the condition scope the main clause.
            main_traverse.restrictive_count += cond_traverse.restrictive_count;

            insert_default_subject(&mut main_traverse, map);

            let cond_verdict = classify_condition_clause(&cond_traverse, policy);
            let main_verdict = classify_main_clause(&main_traverse, policy);
            let combination = combine_clause_verdicts(cond_verdict, main_verdict)?;

            let main_group = representative_group(&main_traverse);
            let cond_group = representative_group(&cond_traverse);
            let (subject_group, object_group) = if combination.subject_from_main {
                (main_group, cond_group)
            } else {
                (cond_group, main_group)
            };
            return self.format_relations(
                combination.relation,
                combination.negated,
                subject_group,
                object_group,
                map,
                vocabulary,
                aliases,
            );
        }

        insert_default_subject(&mut main_traverse, map);

        let verdict = classify_main_clause(&main_traverse, policy);
        self.format_relations(
            verdict,
            false,
            (main_traverse.subject.clone(), main_traverse.subject_cc),
            (main_traverse.object.clone(), main_traverse.object_cc),
            map,
            vocabulary,
            aliases,
        )
    }

    /// Map placeholder tokens back to canonical option identifiers and emit
    /// the relation records for one sub-sentence.
    #[allow(clippy::too_many_arguments)]
    fn format_relations(
        &self,
        relation: Relation,
        negated: bool,
        subject_group: (Vec<String>, Connective),
        object_group: (Vec<String>, Connective),
        map: &SubstitutionMap,
        vocabulary: &[String],
        aliases: &AliasTable,
    ) -> Option<SentenceRelations> {
        let subject_ids = canonical_ids(&subject_group.0, map, vocabulary, aliases);
        let object_ids = canonical_ids(&object_group.0, map, vocabulary, aliases);

        let mut out = SentenceRelations::default();
        match relation {
            Relation::Neutral => return None,
            Relation::Conflict => {
                if subject_ids.is_empty() {
                    pairwise_conflicts(&object_ids, negated, &mut out);
                } else if object_ids.is_empty() {
                    // "X and Y must not be used together" puts both options
                    // in the subject group.
                    pairwise_conflicts(&subject_ids, negated, &mut out);
                } else {
                    for subject in &subject_ids {
                        for object in &object_ids {
                            if subject != object {
                                out.conflicts.push(ConflictPair {
                                    a: subject.clone(),
                                    b: object.clone(),
                                    negated,
                                });
                            }
                        }
                    }
                }
            }
            Relation::Dependent => {
                if subject_ids.is_empty() {
                    warn!("dependent relation without a subject; skipping");
                    return None;
                }
                if object_ids.is_empty() {
                    return None;
                }
                let joiner = match object_group.1 {
                    Connective::And => "&&",
                    Connective::Or => "||",
                };
                for subject in &subject_ids {
                    let targets: Vec<&str> = object_ids
                        .iter()
                        .filter(|id| *id != subject)
                        .map(String::as_str)
                        .collect();
                    if targets.is_empty() {
                        continue;
                    }
                    out.dependents
                        .insert(subject.clone(), targets.join(joiner));
                }
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

/// The group a clause contributes to a cross-clause relation: its object
/// group when one exists, its subject group otherwise.
fn representative_group(traverse: &TraverseResult) -> (Vec<String>, Connective) {
    if traverse.object.is_empty() {
        (traverse.subject.clone(), traverse.subject_cc)
    } else {
        (traverse.object.clone(), traverse.object_cc)
    }
}

fn clause_is_complete(traverse: &TraverseResult) -> bool {
    !traverse.subject.is_empty() && !traverse.object.is_empty()
}

/// A main clause with no option subject is about the described option
/// itself; it becomes the subject unless it already sits in the objects.
fn insert_default_subject(traverse: &mut TraverseResult, map: &SubstitutionMap) {
    let current = map.current_token();
    if traverse.subject.is_empty() && !traverse.object.contains(&current) {
        traverse.subject.push(current);
    }
}

fn pairwise_conflicts(ids: &BTreeSet<String>, negated: bool, out: &mut SentenceRelations) {
    let ids: Vec<&String> = ids.iter().collect();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            out.conflicts.push(ConflictPair {
                a: (*a).clone(),
                b: (*b).clone(),
                negated,
            });
        }
    }
}

/// Tokens back to surfaces, wildcards expanded, aliases folded to canonical.
fn canonical_ids(
    tokens: &[String],
    map: &SubstitutionMap,
    vocabulary: &[String],
    aliases: &AliasTable,
) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for token in tokens {
        let Some(surface) = map.surface_for(token) else {
            warn!(token = token.as_str(), "placeholder has no surface form; dropping");
            continue;
        };
        for expanded in expand_wildcard(surface, vocabulary) {
            out.insert(aliases.canonical(&expanded).to_string());
        }
    }
    out
}

/// Manual text normalization applied before option resolution: value-field
/// separators become spaces so surfaces match the vocabulary.
fn normalize_sentence(sentence: &str) -> String {
    sentence.replace(['=', '`'], " ")
}

/// Repair option surfaces whose dashes were lost upstream: a bare `-`/`--`
/// word rejoined with its successor, and bare names after a "following
/// options:" enumeration re-prefixed, whenever the repaired form is a known
/// option.
fn repair_broken_options(sentence: &str, vocabulary: &[String]) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut enumerating = false;
    let mut idx = 0;
    while idx < words.len() {
        let word = words[idx];
        if matches!(word, "-" | "--") && idx + 1 < words.len() {
            let joined = format!("{word}{}", words[idx + 1]);
            if vocabulary.contains(&joined) {
                out.push(joined);
                idx += 2;
                continue;
            }
        }
        if enumerating && !word.starts_with('-') {
            let bare = word.trim_end_matches([',', '.', ';']);
            if let Some(option) = [format!("--{bare}"), format!("-{bare}")]
                .into_iter()
                .find(|candidate| vocabulary.contains(candidate))
            {
                let suffix = &word[bare.len()..];
                out.push(format!("{option}{suffix}"));
                idx += 1;
                continue;
            }
        }
        if word.eq_ignore_ascii_case("options:")
            && idx >= 1
            && words[idx - 1].eq_ignore_ascii_case("following")
        {
            enumerating = true;
        }
        out.push(word.to_string());
        idx += 1;
    }
    out.join(" ")
}
