//! Externally produced linguistic annotations.
//!
//! Dependency parses and constituency trees come from outside collaborators
//! (a tagger/parser service) and are read-only once constructed. Traversal
//! code keeps its state in separate accumulators instead of annotating the
//! graphs in place.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One token of a dependency-parsed string, as delivered by the annotator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    /// Coarse part-of-speech (VERB, AUX, NOUN, ADJ, ...).
    pub pos: String,
    /// Fine-grained tag (VB, VBN, MD, NNS, ...).
    #[serde(default)]
    pub tag: String,
    /// Dependency label toward the head (nsubj, dobj, conj, ...).
    pub dep: String,
    /// Index of the head token; the root points at itself.
    pub head: usize,
}

/// A dependency parse of one string. Immutable after construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<Token>")]
pub struct DepParse {
    tokens: Vec<Token>,
}

impl TryFrom<Vec<Token>> for DepParse {
    type Error = anyhow::Error;

    fn try_from(tokens: Vec<Token>) -> Result<Self> {
        DepParse::new(tokens)
    }
}

impl DepParse {
    pub fn new(tokens: Vec<Token>) -> Result<Self> {
        for (idx, token) in tokens.iter().enumerate() {
            if token.head >= tokens.len() {
                return Err(anyhow!(
                    "token {idx} ({:?}) points at head {} outside the parse",
                    token.text,
                    token.head
                ));
            }
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, idx: usize) -> &Token {
        &self.tokens[idx]
    }

    /// Direct dependents of `idx`, excluding the root's self-loop.
    pub fn children(&self, idx: usize) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(child, token)| token.head == idx && *child != idx)
            .map(|(child, _)| child)
            .collect()
    }

    /// Head chain above `idx`, nearest first, excluding `idx` itself.
    pub fn ancestors(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = idx;
        while self.tokens[cur].head != cur {
            cur = self.tokens[cur].head;
            out.push(cur);
        }
        out
    }

    /// `idx` plus everything dominated by it, in preorder.
    pub fn subtree(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            let mut kids = self.children(cur);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// All tokens coordinated with `idx` through `conj` links, excluding
    /// `idx` itself. The chain is followed up to the head of the coordination
    /// and back down through every `conj` dependent.
    pub fn conjuncts(&self, idx: usize) -> Vec<usize> {
        let mut top = idx;
        while self.tokens[top].dep == "conj" && self.tokens[top].head != top {
            top = self.tokens[top].head;
        }
        let mut group = vec![top];
        let mut queue = vec![top];
        while let Some(cur) = queue.pop() {
            for child in self.children(cur) {
                if self.tokens[child].dep == "conj" {
                    group.push(child);
                    queue.push(child);
                }
            }
        }
        group.retain(|&other| other != idx);
        group.sort_unstable();
        group.dedup();
        group
    }

    /// Shortest path between two tokens over the undirected dependency graph,
    /// endpoints included. A disconnected pair yields an empty path (absence
    /// of evidence, not an error).
    pub fn shortest_path(&self, from: usize, to: usize) -> Vec<usize> {
        if from >= self.tokens.len() || to >= self.tokens.len() {
            return Vec::new();
        }
        if from == to {
            return vec![from];
        }
        let mut prev: BTreeMap<usize, usize> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        prev.insert(from, from);
        while let Some(cur) = queue.pop_front() {
            let mut neighbors = self.children(cur);
            let head = self.tokens[cur].head;
            if head != cur {
                neighbors.push(head);
            }
            for next in neighbors {
                if prev.contains_key(&next) {
                    continue;
                }
                prev.insert(next, cur);
                if next == to {
                    let mut path = vec![to];
                    let mut step = to;
                    while step != from {
                        step = prev[&step];
                        path.push(step);
                    }
                    path.reverse();
                    return path;
                }
                queue.push_back(next);
            }
        }
        Vec::new()
    }
}

/// A constituency tree node: either a leaf word or a labeled node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstTree {
    Leaf(String),
    Node {
        label: String,
        children: Vec<ConstTree>,
    },
}

impl ConstTree {
    pub fn node(label: &str, children: Vec<ConstTree>) -> Self {
        ConstTree::Node {
            label: label.to_string(),
            children,
        }
    }

    pub fn leaf(word: &str) -> Self {
        ConstTree::Leaf(word.to_string())
    }

    /// The node label, or the word itself for a leaf.
    pub fn label(&self) -> &str {
        match self {
            ConstTree::Leaf(word) => word,
            ConstTree::Node { label, .. } => label,
        }
    }

    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ConstTree::Leaf(word) => out.push(word),
            ConstTree::Node { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Leaves joined back into surface text.
    pub fn span_text(&self) -> String {
        self.leaves().join(" ")
    }

    /// All labeled nodes in preorder, this node included.
    pub fn subtrees(&self) -> Vec<&ConstTree> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a ConstTree>) {
        if let ConstTree::Node { children, .. } = self {
            out.push(self);
            for child in children {
                child.walk(out);
            }
        }
    }

    /// Grammar productions of the immediate children, lexical rules dropped,
    /// with the final entry reduced to its left-hand label. Used for the
    /// parallel-structure comparison of topic sentences.
    pub fn production_sequence(&self) -> Vec<String> {
        let mut seq = Vec::new();
        if let ConstTree::Node { children, .. } = self {
            for child in children {
                child.collect_productions(&mut seq);
            }
        }
        if let Some(last) = seq.last_mut() {
            if let Some(head) = last.split(' ').next() {
                *last = head.to_string();
            }
        }
        seq
    }

    fn collect_productions(&self, out: &mut Vec<String>) {
        if let ConstTree::Node { label, children } = self {
            let lexical = children
                .iter()
                .all(|child| matches!(child, ConstTree::Leaf(_)));
            if !lexical {
                let rhs: Vec<&str> = children.iter().map(ConstTree::label).collect();
                out.push(format!("{} {}", label, rhs.join(" ")));
            }
            for child in children {
                child.collect_productions(out);
            }
        }
    }
}

/// External annotation service: dependency parses and constituency trees for
/// arbitrary strings, synchronous call-and-return.
pub trait Annotator {
    fn dependencies(&self, text: &str) -> Result<DepParse>;
    fn constituency(&self, text: &str) -> Result<ConstTree>;
}

/// One pre-annotated string, as carried in the input records file.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRecord {
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub tree: Option<ConstTree>,
}

/// Annotator backed by a table of pre-annotated strings. A lookup miss is a
/// per-sentence error the caller downgrades to a skip.
#[derive(Debug, Default)]
pub struct PrecomputedAnnotator {
    parses: BTreeMap<String, DepParse>,
    trees: BTreeMap<String, ConstTree>,
}

impl PrecomputedAnnotator {
    pub fn from_records(records: &[AnnotationRecord]) -> Result<Self> {
        let mut annotator = Self::default();
        for record in records {
            let key = normalize_key(&record.text);
            if !record.tokens.is_empty() {
                annotator
                    .parses
                    .insert(key.clone(), DepParse::new(record.tokens.clone())?);
            }
            if let Some(tree) = &record.tree {
                annotator.trees.insert(key, tree.clone());
            }
        }
        Ok(annotator)
    }

    pub fn insert_parse(&mut self, text: &str, parse: DepParse) {
        self.parses.insert(normalize_key(text), parse);
    }

    pub fn insert_tree(&mut self, text: &str, tree: ConstTree) {
        self.trees.insert(normalize_key(text), tree);
    }
}

impl Annotator for PrecomputedAnnotator {
    fn dependencies(&self, text: &str) -> Result<DepParse> {
        self.parses
            .get(&normalize_key(text))
            .cloned()
            .ok_or_else(|| anyhow!("no dependency annotation for {text:?}"))
    }

    fn constituency(&self, text: &str) -> Result<ConstTree> {
        self.trees
            .get(&normalize_key(text))
            .cloned()
            .ok_or_else(|| anyhow!("no constituency annotation for {text:?}"))
    }
}

fn normalize_key(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
