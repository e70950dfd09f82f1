//! Clause handling: condition-clause extraction, main-clause recovery, and
//! the sub-sentence split for compound sentences.

use crate::annotate::{Annotator, ConstTree, DepParse};
use crate::lexicon::RulePolicy;
use anyhow::{Context, Result};
use regex::RegexBuilder;

/// Locate the leading condition clause: the first SBAR subtree whose first
/// leaf is one of the closed-set conditional/temporal markers.
pub fn condition_clause(tree: &ConstTree, policy: &RulePolicy) -> Option<String> {
    for subtree in tree.subtrees() {
        if subtree.label() != "SBAR" {
            continue;
        }
        let leaves = subtree.leaves();
        let Some(first) = leaves.first() else {
            continue;
        };
        if policy.is_condition_marker(&first.to_lowercase()) {
            return Some(leaves.join(" "));
        }
    }
    None
}

/// The main clause is the sentence with the condition clause textually
/// removed. When removal fails (the span does not occur, e.g. after upstream
/// normalization drift) the full sentence is the fallback.
pub fn main_clause(sentence: &str, condition: Option<&str>) -> String {
    if let Some(condition) = condition {
        if let Some(pos) = sentence.find(condition) {
            let mut remainder = String::new();
            remainder.push_str(&sentence[..pos]);
            remainder.push(' ');
            remainder.push_str(&sentence[pos + condition.len()..]);
            return collapse_spaces(remainder.trim().trim_start_matches(',').trim());
        }
    }
    sentence.to_string()
}

/// Split a compound sentence at verb coordinations. Each `conj` token whose
/// own tag (or whose head's tag) is verbal opens a new sub-sentence; a
/// trailing connective before the cut is dropped.
pub fn split_sub_sentences(parse: &DepParse) -> Vec<String> {
    let mut cuts = Vec::new();
    for (idx, token) in parse.tokens().iter().enumerate() {
        let head = parse.token(token.head);
        if token.dep == "conj" && (token.tag.starts_with('V') || head.tag.starts_with('V')) {
            cuts.push(idx);
        }
    }
    cuts.push(parse.len());

    let mut out = Vec::new();
    let mut start = 0;
    for cut in cuts {
        let mut words = Vec::new();
        for idx in start..cut {
            let text = parse.token(idx).text.as_str();
            if idx + 1 == cut && matches!(text, "and" | "or" | "but") {
                continue;
            }
            words.push(text);
        }
        let text = words.join(" ");
        let text = text.trim().trim_matches(',').trim();
        if !text.is_empty() {
            out.push(text.to_string());
        }
        start = cut;
    }
    out
}

/// Drop boilerplate sentence openers that carry no relation signal.
pub fn strip_preamble(sentence: &str) -> String {
    let trimmed = sentence.trim();
    let lower = trimmed.to_lowercase();
    for preamble in ["by default", "note that"] {
        if let Some(rest) = lower.strip_prefix(preamble) {
            let cut = trimmed.len() - rest.len();
            return trimmed[cut..].trim_start_matches([',', ' ']).to_string();
        }
    }
    trimmed.to_string()
}

/// Give a verb-initial sentence a synthetic subject so the dependency parse
/// of the rewritten text has a regular clause shape. Passives ("Used with
/// ...") become "It is ..."; other verb-initial forms get a bare "It".
pub fn add_subject(annotator: &dyn Annotator, sentence: &str) -> Result<String> {
    let trimmed = sentence.trim();
    let Some(first_word) = trimmed.split_whitespace().next() else {
        return Ok(trimmed.to_string());
    };
    // Placeholder-initial sentences already have a subject.
    if first_word.starts_with("param") {
        return Ok(trimmed.to_string());
    }
    let parse = annotator.dependencies(trimmed)?;
    let Some(first) = parse.tokens().first() else {
        return Ok(trimmed.to_string());
    };
    if first.pos != "VERB" {
        return Ok(trimmed.to_string());
    }
    let mut rest = trimmed.to_string();
    if let Some(lowered) = lowercase_first(&rest) {
        rest = lowered;
    }
    if first.tag == "VBN" {
        Ok(format!("It is {rest}"))
    } else {
        Ok(format!("It {rest}"))
    }
}

/// Rewrite self references ("this option", a bare leading "It"/"This") to the
/// placeholder standing for the described option.
pub fn rewrite_self_references(sentence: &str, current_token: &str) -> Result<String> {
    let this_option = RegexBuilder::new(r"this (option|switch|flag)")
        .case_insensitive(true)
        .build()
        .context("build self-reference pattern")?;
    let rewritten = this_option.replace_all(sentence, current_token);

    let leading_pronoun = RegexBuilder::new(r"^(it|this)(\s)")
        .case_insensitive(true)
        .build()
        .context("build leading-pronoun pattern")?;
    let rewritten = leading_pronoun.replace(&rewritten, format!("{current_token}$2"));
    Ok(collapse_spaces(rewritten.trim()))
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lowercase_first(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if first.is_lowercase() {
        return None;
    }
    Some(first.to_lowercase().chain(chars).collect())
}
