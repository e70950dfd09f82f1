//! Backward traversal of a clause's dependency graph.
//!
//! Starting from the placeholder tokens, the traverser recovers the subject
//! and object option groups, their governing verbs and auxiliaries, negation
//! and restrictive markers, and the shared-object evidence the classifier
//! feeds on. The parse itself is never mutated; everything accumulates in a
//! `TraverseResult`.

use crate::annotate::DepParse;
use crate::lexicon::RulePolicy;
use crate::resolver::is_option_token;
use tracing::warn;

/// Connective joining the members of an option group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connective {
    And,
    #[default]
    Or,
}

/// Everything the classifier needs to know about one clause. At most the two
/// sides (subject, object) are ever populated.
#[derive(Debug, Clone, Default)]
pub struct TraverseResult {
    pub subject: Vec<String>,
    pub subject_cc: Connective,
    pub object: Vec<String>,
    pub object_cc: Connective,
    /// Side keywords: `[subject, object]`.
    pub keywords: [Option<String>; 2],
    /// Side auxiliaries, "to"-merged where infinitival: `[subject, object]`.
    pub auxiliaries: [Option<String>; 2],
    pub negation_count: usize,
    pub restrictive_count: usize,
    pub shared_object: bool,
}

const SUBJECT: usize = 0;
const OBJECT: usize = 1;

/// Per-side working state before it is flattened into the result.
#[derive(Debug, Clone, Copy, Default)]
struct SideState {
    verb: Option<usize>,
    aux: Option<usize>,
    with_to: bool,
    representative: Option<usize>,
}

pub fn traverse_clause(parse: &DepParse, policy: &RulePolicy) -> TraverseResult {
    let mut result = TraverseResult::default();

    let mut option_tokens = Vec::new();
    let mut negations = Vec::new();
    let mut restrictives = 0usize;
    for (idx, token) in parse.tokens().iter().enumerate() {
        if is_option_token(&token.text) {
            option_tokens.push(idx);
        } else if policy.is_negative(&token.lemma) {
            negations.push(idx);
        } else if policy.is_restrictive(&token.lemma) {
            restrictives += 1;
        }
    }
    result.restrictive_count = restrictives;

    let mut sides = [SideState::default(), SideState::default()];
    let mut groups: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    let mut connectives: [Option<Connective>; 2] = [None, None];

    if let Some(&first) = option_tokens.first() {
        let mut group = vec![first];
        let mut cc = None;
        collect_conjunct_options(parse, first, &mut group, &mut cc);

        // A modifier placeholder stands for its governing noun head.
        let representative = skip_modifier(parse, first);
        if representative != first {
            collect_conjunct_options(parse, representative, &mut group, &mut cc);
        }
        let (aux, verb, with_to) = verb_and_aux(parse, representative);

        let mut remaining: Vec<usize> = option_tokens
            .iter()
            .copied()
            .filter(|idx| !group.contains(idx))
            .collect();

        if remaining.is_empty() {
            let side = if parse.token(representative).dep.contains("subj") {
                SUBJECT
            } else {
                OBJECT
            };
            groups[side] = group;
            connectives[side] = cc;
            sides[side] = SideState {
                verb,
                aux,
                with_to,
                representative: Some(representative),
            };
        } else {
            groups[SUBJECT] = group;
            connectives[SUBJECT] = cc;
            sides[SUBJECT] = SideState {
                verb,
                aux,
                with_to,
                representative: Some(representative),
            };

            let obj_first = remaining[0];
            let mut obj_group = vec![obj_first];
            let mut obj_cc = None;
            collect_conjunct_options(parse, obj_first, &mut obj_group, &mut obj_cc);

            let obj_representative = skip_modifier(parse, obj_first);
            if obj_representative != obj_first {
                collect_conjunct_options(parse, obj_representative, &mut obj_group, &mut obj_cc);
            }
            let (obj_aux, obj_verb, obj_with_to) = verb_and_aux(parse, obj_representative);
            sides[OBJECT] = SideState {
                verb: obj_verb,
                aux: obj_aux,
                with_to: obj_with_to,
                representative: Some(obj_representative),
            };

            // Options coordinated with either side's verb or auxiliary also
            // belong to the object group.
            for anchor in [sides[SUBJECT].verb, sides[SUBJECT].aux, obj_verb, obj_aux]
                .into_iter()
                .flatten()
            {
                collect_conjunct_options(parse, anchor, &mut obj_group, &mut obj_cc);
            }
            obj_group.retain(|idx| !groups[SUBJECT].contains(idx));
            groups[OBJECT] = obj_group;
            connectives[OBJECT] = obj_cc;

            remaining.retain(|idx| !groups[OBJECT].contains(idx) && !groups[SUBJECT].contains(idx));
            if !remaining.is_empty() {
                let leftover: Vec<&str> = remaining
                    .iter()
                    .map(|&idx| parse.token(idx).text.as_str())
                    .collect();
                warn!(?leftover, "option tokens left unclaimed after traversal");
            }

            if let (Some(subj_verb), Some(obj_verb)) = (sides[SUBJECT].verb, sides[OBJECT].verb) {
                let path = parse.shortest_path(subj_verb, obj_verb);
                result.shared_object = !path.is_empty()
                    && path.iter().any(|&idx| parse.token(idx).dep == "dobj");
            }
        }
    }

    result.keywords = [
        side_keyword(parse, &sides[SUBJECT]),
        side_keyword(parse, &sides[OBJECT]),
    ];
    result.auxiliaries = [
        side_auxiliary(parse, &sides[SUBJECT]),
        side_auxiliary(parse, &sides[OBJECT]),
    ];

    result.negation_count = negations
        .iter()
        .filter(|&&neg| negation_in_scope(parse, neg, &sides))
        .count();

    result.subject = texts(parse, &groups[SUBJECT]);
    result.subject_cc = connectives[SUBJECT].unwrap_or_default();
    result.object = texts(parse, &groups[OBJECT]);
    result.object_cc = connectives[OBJECT].unwrap_or_default();
    result
}

/// Pull every option token coordinated with `idx` into `group`, looking into
/// each conjunct's subtree for nested placeholders, and remember the
/// connective word when one directly precedes a conjunct.
fn collect_conjunct_options(
    parse: &DepParse,
    idx: usize,
    group: &mut Vec<usize>,
    cc: &mut Option<Connective>,
) {
    for conj in parse.conjuncts(idx) {
        if is_option_token(&parse.token(conj).text) {
            push_unique(group, conj);
            note_connective(parse, conj, cc);
        } else {
            for child in parse.subtree(conj) {
                if is_option_token(&parse.token(child).text) {
                    push_unique(group, child);
                    note_connective(parse, child, cc);
                }
            }
        }
    }
}

fn note_connective(parse: &DepParse, idx: usize, cc: &mut Option<Connective>) {
    if idx == 0 {
        return;
    }
    let before = parse.token(idx - 1);
    if before.dep == "cc" {
        *cc = Some(if before.lemma == "and" {
            Connective::And
        } else {
            Connective::Or
        });
    }
}

fn push_unique(group: &mut Vec<usize>, idx: usize) {
    if !group.contains(&idx) {
        group.push(idx);
    }
}

/// A placeholder sitting in a modifier slot stands for the first governing
/// noun ancestor that is not itself a modifier.
fn skip_modifier(parse: &DepParse, idx: usize) -> usize {
    const MODIFIER_DEPS: [&str; 4] = ["nmod", "appos", "compound", "amod"];
    if !MODIFIER_DEPS.contains(&parse.token(idx).dep.as_str()) {
        return idx;
    }
    for ancestor in parse.ancestors(idx) {
        let token = parse.token(ancestor);
        if token.pos == "NOUN" && !MODIFIER_DEPS.contains(&token.dep.as_str()) {
            return ancestor;
        }
    }
    idx
}

/// Find the governing verb and auxiliary of a token by climbing its head
/// chain. "have/need to" and the non-conjugating "ought" are auxiliary-like;
/// a copular "be" contributes itself as the auxiliary of its head.
fn verb_and_aux(parse: &DepParse, idx: usize) -> (Option<usize>, Option<usize>, bool) {
    let mut first_verbal = None;
    let mut root = None;
    let mut cur = idx;
    loop {
        let token = parse.token(cur);
        if first_verbal.is_none() && (token.pos == "AUX" || token.pos == "VERB") {
            first_verbal = Some(cur);
        }
        if token.dep == "ROOT" {
            root = Some(cur);
        }
        if parse.token(cur).head == cur {
            break;
        }
        cur = parse.token(cur).head;
    }

    let Some(verbal) = first_verbal else {
        // No verb on the chain; a verbal-tagged root may have been misjudged.
        let verb = root.filter(|&idx| parse.token(idx).tag.starts_with('V'));
        return (None, verb, false);
    };

    let token = parse.token(verbal);
    if token.pos == "AUX" {
        if token.text == "ought" {
            // "ought to <verb>": the verb is the head of the following "to".
            let verb = parse
                .tokens()
                .get(verbal + 1)
                .map(|to| to.head)
                .filter(|&head| head != verbal);
            return (Some(verbal), verb, true);
        }
        if token.lemma == "be" {
            let head = parse.token(verbal).head;
            return (Some(verbal), Some(head), false);
        }
        return (None, None, false);
    }

    // A plain verb, unless it is the "have to"/"need to" semi-auxiliary.
    if matches!(token.lemma.as_str(), "have" | "need")
        && parse
            .tokens()
            .get(verbal + 1)
            .is_some_and(|next| next.text == "to")
    {
        let verb = parse.tokens().get(verbal + 1).map(|to| to.head);
        return (Some(verbal), verb, true);
    }
    let aux = parse
        .children(verbal)
        .into_iter()
        .find(|&child| parse.token(child).pos == "AUX");
    (aux, Some(verbal), false)
}

/// Side keyword selection: copular verbs defer to their noun/adjective child,
/// "make sense"/"have effect" idioms stay two words, otherwise a clausal
/// complement or the verb lemma itself. A verbless side falls back to the
/// missed-keyword search from its representative token.
fn side_keyword(parse: &DepParse, side: &SideState) -> Option<String> {
    let Some(verb) = side.verb else {
        let representative = side.representative?;
        return missed_keyword(parse, representative)
            .map(|idx| parse.token(idx).lemma.clone());
    };
    let token = parse.token(verb);
    if token.lemma == "be" {
        let candidate = parse.children(verb).into_iter().find(|&child| {
            let child = parse.token(child);
            !child.dep.contains("subj") && (child.pos == "NOUN" || child.pos == "ADJ")
        });
        return Some(match candidate {
            Some(idx) => parse.token(idx).lemma.clone(),
            None => token.lemma.clone(),
        });
    }
    if token.lemma == "make" || token.lemma == "have" {
        let idiom_object = match token.lemma.as_str() {
            "make" => "sense",
            _ => "effect",
        };
        let idiom = parse.children(verb).into_iter().find(|&child| {
            let child = parse.token(child);
            child.dep == "dobj" && child.lemma == idiom_object
        });
        if idiom.is_some() {
            return Some(format!("{} {idiom_object}", token.lemma));
        }
    }
    let complement = parse
        .children(verb)
        .into_iter()
        .find(|&child| parse.token(child).dep == "ccomp");
    Some(match complement {
        Some(idx) => parse.token(idx).lemma.clone(),
        None => token.lemma.clone(),
    })
}

/// "Similar to -A": a prepositional-object placeholder reaches up through its
/// heads for the adjective that governs the comparison.
fn missed_keyword(parse: &DepParse, idx: usize) -> Option<usize> {
    if parse.token(idx).dep != "pobj" {
        return None;
    }
    let mut cur = parse.token(idx).head;
    while parse.token(cur).head != cur && parse.token(cur).pos != "ADJ" {
        cur = parse.token(cur).head;
    }
    Some(cur)
}

fn side_auxiliary(parse: &DepParse, side: &SideState) -> Option<String> {
    let aux = side.aux?;
    let lemma = &parse.token(aux).lemma;
    Some(if side.with_to {
        format!("{lemma} to")
    } else {
        lemma.clone()
    })
}

/// Negation scoped to an unrelated clause is discarded: the marker counts
/// only if its shortest path to one of the side verbs crosses no other verb.
fn negation_in_scope(parse: &DepParse, neg: usize, sides: &[SideState; 2]) -> bool {
    let verbs: Vec<usize> = sides.iter().filter_map(|side| side.verb).collect();
    if verbs.is_empty() {
        return true;
    }
    let allowed: Vec<usize> = sides
        .iter()
        .flat_map(|side| [side.verb, side.aux])
        .flatten()
        .collect();
    verbs.iter().any(|&verb| {
        parse
            .shortest_path(verb, neg)
            .iter()
            .all(|&idx| parse.token(idx).pos != "VERB" || allowed.contains(&idx))
    })
}

fn texts(parse: &DepParse, group: &[usize]) -> Vec<String> {
    group
        .iter()
        .map(|&idx| parse.token(idx).text.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::Token;

    fn token(text: &str, pos: &str, tag: &str, dep: &str, head: usize) -> Token {
        Token {
            text: text.to_string(),
            lemma: text.to_lowercase(),
            pos: pos.to_string(),
            tag: tag.to_string(),
            dep: dep.to_string(),
            head,
        }
    }

    fn lemma(text: &str, lemma: &str, pos: &str, tag: &str, dep: &str, head: usize) -> Token {
        Token {
            text: text.to_string(),
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            tag: tag.to_string(),
            dep: dep.to_string(),
            head,
        }
    }

    // "param_current conflicts with param1 ."
    fn simple_conflict_parse() -> DepParse {
        DepParse::new(vec![
            token("param_current", "NOUN", "NN", "nsubj", 1),
            lemma("conflicts", "conflict", "VERB", "VBZ", "ROOT", 1),
            token("with", "ADP", "IN", "prep", 1),
            token("param1", "NOUN", "NN", "pobj", 2),
            token(".", "PUNCT", ".", "punct", 1),
        ])
        .unwrap()
    }

    #[test]
    fn subject_and_object_sides_are_recovered() {
        let result = traverse_clause(&simple_conflict_parse(), &RulePolicy::default());
        assert_eq!(result.subject, vec!["param_current".to_string()]);
        assert_eq!(result.object, vec!["param1".to_string()]);
        assert_eq!(result.keywords[0].as_deref(), Some("conflict"));
        assert_eq!(result.negation_count, 0);
    }

    #[test]
    fn lone_subjectless_group_lands_on_the_object_side() {
        // "with param1 and param2" fragment: both placeholders coordinate and
        // sit under a preposition, so they are an object group.
        let parse = DepParse::new(vec![
            token("with", "ADP", "IN", "ROOT", 0),
            token("param1", "NOUN", "NN", "pobj", 0),
            token("and", "CCONJ", "CC", "cc", 1),
            token("param2", "NOUN", "NN", "conj", 1),
        ])
        .unwrap();
        let result = traverse_clause(&parse, &RulePolicy::default());
        assert!(result.subject.is_empty());
        assert_eq!(
            result.object,
            vec!["param1".to_string(), "param2".to_string()]
        );
        assert_eq!(result.object_cc, Connective::And);
    }

    #[test]
    fn negation_within_clause_is_counted() {
        // "param_current and param1 must not be used together ."
        let parse = DepParse::new(vec![
            token("param_current", "NOUN", "NN", "nsubjpass", 6),
            token("and", "CCONJ", "CC", "cc", 0),
            token("param1", "NOUN", "NN", "conj", 0),
            lemma("must", "must", "AUX", "MD", "aux", 6),
            lemma("not", "not", "PART", "RB", "neg", 6),
            lemma("be", "be", "AUX", "VB", "auxpass", 6),
            lemma("used", "use", "VERB", "VBN", "ROOT", 6),
            token("together", "ADV", "RB", "advmod", 6),
            token(".", "PUNCT", ".", "punct", 6),
        ])
        .unwrap();
        let result = traverse_clause(&parse, &RulePolicy::default());
        assert_eq!(
            result.subject,
            vec!["param_current".to_string(), "param1".to_string()]
        );
        assert_eq!(result.subject_cc, Connective::And);
        assert_eq!(result.negation_count, 1);
        assert_eq!(result.keywords[0].as_deref(), Some("use"));
        assert_eq!(result.auxiliaries[0].as_deref(), Some("must"));
    }

    #[test]
    fn have_to_counts_as_auxiliary() {
        // "param_current has to accompany param1 ."; "has to" merges into an
        // auxiliary and the infinitive is the side verb.
        let parse = DepParse::new(vec![
            token("param_current", "NOUN", "NN", "nsubj", 1),
            lemma("has", "have", "VERB", "VBZ", "ROOT", 1),
            token("to", "PART", "TO", "aux", 3),
            lemma("accompany", "accompany", "VERB", "VB", "xcomp", 1),
            token("param1", "NOUN", "NN", "dobj", 3),
            token(".", "PUNCT", ".", "punct", 1),
        ])
        .unwrap();
        let result = traverse_clause(&parse, &RulePolicy::default());
        assert_eq!(result.auxiliaries[0].as_deref(), Some("have to"));
        assert_eq!(result.keywords[0].as_deref(), Some("accompany"));
        assert_eq!(result.keywords[1].as_deref(), Some("accompany"));
    }

    #[test]
    fn copular_verb_defers_to_its_attribute() {
        // "param_current is useless ."
        let parse = DepParse::new(vec![
            token("param_current", "NOUN", "NN", "nsubj", 1),
            lemma("is", "be", "AUX", "VBZ", "ROOT", 1),
            lemma("useless", "useless", "ADJ", "JJ", "acomp", 1),
            token(".", "PUNCT", ".", "punct", 1),
        ])
        .unwrap();
        let result = traverse_clause(&parse, &RulePolicy::default());
        // Lone group with a "subj" role lands on the subject side; "be"
        // yields the adjective as keyword.
        assert_eq!(result.keywords[0].as_deref(), Some("useless"));
    }

    #[test]
    fn shared_object_flag_requires_a_direct_object_on_the_path() {
        // "param_current sets the mode that param1 clears ."; both verbs
        // funnel through "mode", a direct object.
        let parse = DepParse::new(vec![
            token("param_current", "NOUN", "NN", "nsubj", 1),
            lemma("sets", "set", "VERB", "VBZ", "ROOT", 1),
            token("the", "DET", "DT", "det", 3),
            lemma("mode", "mode", "NOUN", "NN", "dobj", 1),
            token("that", "PRON", "WDT", "dobj", 6),
            token("param1", "NOUN", "NN", "nsubj", 6),
            lemma("clears", "clear", "VERB", "VBZ", "relcl", 3),
            token(".", "PUNCT", ".", "punct", 1),
        ])
        .unwrap();
        let result = traverse_clause(&parse, &RulePolicy::default());
        assert!(result.shared_object);
    }

    #[test]
    fn modifier_placeholder_climbs_to_its_noun_head() {
        // "the param_current output matters ." with the placeholder as a
        // compound modifier of "output".
        let parse = DepParse::new(vec![
            token("the", "DET", "DT", "det", 2),
            token("param_current", "NOUN", "NN", "compound", 2),
            lemma("output", "output", "NOUN", "NN", "nsubj", 3),
            lemma("matters", "matter", "VERB", "VBZ", "ROOT", 3),
            token(".", "PUNCT", ".", "punct", 3),
        ])
        .unwrap();
        let result = traverse_clause(&parse, &RulePolicy::default());
        assert_eq!(result.subject, vec!["param_current".to_string()]);
        assert_eq!(result.keywords[0].as_deref(), Some("matter"));
    }

    #[test]
    fn empty_parse_produces_empty_result() {
        let parse = DepParse::new(Vec::new()).unwrap();
        let result = traverse_clause(&parse, &RulePolicy::default());
        assert!(result.subject.is_empty() && result.object.is_empty());
        assert_eq!(result.keywords, [None, None]);
    }
}
