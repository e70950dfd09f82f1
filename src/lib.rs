//! Relationship inference between command-line options.
//!
//! Given NLP-annotated sentences from a program's manual, the engine derives
//! which options conflict with each other and which depend on others, and
//! writes the result as a per-program JSON report. Sentences arrive with
//! pre-computed dependency parses and constituency trees; the pipeline
//! rewrites option mentions into placeholder tokens, splits clauses, walks
//! the dependency graph backward from the placeholders, and classifies each
//! clause on a conflict-to-dependent scale before aggregating.

pub mod aggregate;
pub mod annotate;
pub mod classify;
pub mod clauses;
pub mod cli;
pub mod engine;
pub mod implicit;
pub mod input;
pub mod lexicon;
pub mod output;
pub mod resolver;
pub mod traverse;
