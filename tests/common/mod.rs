//! Shared fixtures for integration tests: annotation builders and a
//! records-document builder that mirrors what the extraction stage emits.

use optrel::annotate::{ConstTree, DepParse, PrecomputedAnnotator, Token};
use serde_json::{json, Value};

pub fn token(text: &str, lemma: &str, pos: &str, tag: &str, dep: &str, head: usize) -> Token {
    Token {
        text: text.to_string(),
        lemma: lemma.to_string(),
        pos: pos.to_string(),
        tag: tag.to_string(),
        dep: dep.to_string(),
        head,
    }
}

pub fn parse(tokens: Vec<Token>) -> DepParse {
    DepParse::new(tokens).expect("fixture parse should be well formed")
}

/// A single flat S node over the given words; enough for sentences without a
/// condition clause.
pub fn flat_tree(words: &[&str]) -> ConstTree {
    ConstTree::node("S", words.iter().map(|word| ConstTree::leaf(word)).collect())
}

/// Builder for one program's records document plus the matching annotator.
#[derive(Default)]
pub struct RecordsBuilder {
    program: String,
    options: Vec<String>,
    aliases: Value,
    sentences: Vec<Value>,
    topics: Vec<Value>,
    annotator: PrecomputedAnnotator,
}

impl RecordsBuilder {
    pub fn new(program: &str, options: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            options: options.iter().map(|option| (*option).to_string()).collect(),
            aliases: json!({}),
            ..Self::default()
        }
    }

    pub fn alias(mut self, canonical: &str, aliases: &[&str]) -> Self {
        self.aliases[canonical] = json!(aliases);
        self
    }

    pub fn sentence(mut self, option: &str, sent: &str) -> Self {
        self.sentences.push(json!({"option": option, "sent": sent}));
        self
    }

    pub fn topic(mut self, option: &str, predicate: &str, object: &str, particle: &str) -> Self {
        self.topics.push(json!({
            "option": option,
            "sent": format!("{option} {predicate} {object}"),
            "predicate": predicate,
            "object": object,
            "particle": particle,
        }));
        self
    }

    pub fn parse_for(mut self, text: &str, tokens: Vec<Token>) -> Self {
        self.annotator.insert_parse(text, parse(tokens));
        self
    }

    pub fn tree_for(mut self, text: &str, tree: ConstTree) -> Self {
        self.annotator.insert_tree(text, tree);
        self
    }

    pub fn build(self) -> (optrel::input::ProgramRecords, PrecomputedAnnotator) {
        let document = json!({
            "program": self.program,
            "options": self.options,
            "aliases": self.aliases,
            "sentences": self.sentences,
            "topics": self.topics,
        });
        let records = serde_json::from_value(document).expect("fixture records should deserialize");
        (records, self.annotator)
    }
}
