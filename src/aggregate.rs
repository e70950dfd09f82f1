//! Per-sentence relation records and their program-level merge.

use std::collections::BTreeMap;
use tracing::warn;

/// An unordered conflict between two options. `negated` marks pairs derived
/// through double negation, which downstream consumers may treat as softer
/// evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictPair {
    pub a: String,
    pub b: String,
    pub negated: bool,
}

impl ConflictPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            negated: false,
        }
    }

    pub fn negated(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            negated: true,
        }
    }

    /// Membership test ignoring order and negation.
    pub fn same_pair(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    /// The wire form: negated pairs carry a trailing marker on both ids.
    pub fn render(&self) -> [String; 2] {
        if self.negated {
            [format!("{}^", self.a), format!("{}^", self.b)]
        } else {
            [self.a.clone(), self.b.clone()]
        }
    }
}

/// What one sentence contributed.
#[derive(Debug, Clone, Default)]
pub struct SentenceRelations {
    pub conflicts: Vec<ConflictPair>,
    /// Subject option to a dependency expression such as `-a&&-b` or `-a||-b`.
    pub dependents: BTreeMap<String, String>,
}

impl SentenceRelations {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty() && self.dependents.is_empty()
    }
}

/// All relations inferred for one program, merged across sentences.
#[derive(Debug, Clone, Default)]
pub struct ProgramRelationSet {
    pub conflicts: Vec<ConflictPair>,
    pub dependents: BTreeMap<String, String>,
}

impl ProgramRelationSet {
    /// Record a conflict unless the same unordered pair is already present.
    pub fn add_conflict(&mut self, pair: ConflictPair) {
        if pair.a == pair.b {
            return;
        }
        if self
            .conflicts
            .iter()
            .any(|existing| existing.same_pair(&pair.a, &pair.b))
        {
            return;
        }
        self.conflicts.push(pair);
    }

    /// Record a dependency expression for `subject`. When two sentences
    /// disagree, the expression that textually contains the other wins;
    /// otherwise the earlier one stands.
    pub fn add_dependency(&mut self, subject: &str, expression: &str) {
        match self.dependents.get(subject) {
            None => {
                self.dependents
                    .insert(subject.to_string(), expression.to_string());
            }
            Some(existing) if existing == expression => {}
            Some(existing) => {
                if expression.contains(existing.as_str()) {
                    self.dependents
                        .insert(subject.to_string(), expression.to_string());
                } else if !existing.contains(expression) {
                    warn!(
                        subject,
                        kept = existing.as_str(),
                        dropped = expression,
                        "dependency expressions disagree; keeping the earlier one"
                    );
                }
            }
        }
    }

    pub fn absorb(&mut self, sentence: SentenceRelations) {
        for pair in sentence.conflicts {
            self.add_conflict(pair);
        }
        for (subject, expression) in sentence.dependents {
            self.add_dependency(&subject, &expression);
        }
    }

    /// Conflicts take precedence over dependencies. Any conflicting
    /// alternative is struck from `||` expressions, and a dependency whose
    /// subject and sole target form a known non-negated conflict is dropped
    /// outright.
    pub fn resolve_precedence(&mut self) {
        let conflicts = self.conflicts.clone();
        self.dependents.retain(|subject, expression| {
            if expression.contains("||") {
                let kept: Vec<&str> = expression
                    .split("||")
                    .filter(|target| {
                        !conflicts
                            .iter()
                            .any(|pair| !pair.negated && pair.same_pair(subject, target))
                    })
                    .collect();
                if kept.is_empty() {
                    return false;
                }
                *expression = kept.join("||");
                return true;
            }
            // A conjunction that conflicts is contradictory evidence; the
            // conflict wins.
            !expression.split("&&").any(|target| {
                conflicts
                    .iter()
                    .any(|pair| !pair.negated && pair.same_pair(subject, target))
            })
        });
    }
}
