//! Input records: one JSON document per program, carrying the candidate
//! sentences, the option vocabulary, aliases, topic sentences, pre-computed
//! annotations, and the lexicon tables.

use crate::annotate::AnnotationRecord;
use crate::implicit::TopicSentence;
use crate::lexicon::TableLexicon;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One candidate sentence from the manual, attributed to the option whose
/// description it came from.
#[derive(Debug, Clone, Deserialize)]
pub struct SentenceRecord {
    /// Surface form of the described option, value field included.
    pub option: String,
    pub sent: String,
    /// Classifier confidence that this sentence states a relationship.
    #[serde(default)]
    pub score: Option<f64>,
    /// Hard override of the classifier, when present.
    #[serde(default)]
    pub relationship: Option<bool>,
}

/// Everything known about one program's manual.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramRecords {
    pub program: String,
    /// Full option vocabulary, value fields included.
    pub options: Vec<String>,
    /// Canonical surface to its alias surfaces.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    pub sentences: Vec<SentenceRecord>,
    #[serde(default)]
    pub topics: Vec<TopicSentence>,
    /// Pre-computed parses and trees for every string the engine derives.
    #[serde(default)]
    pub annotations: Vec<AnnotationRecord>,
    #[serde(default)]
    pub lexicon: TableLexicon,
}

pub fn load_program_records(path: &Path) -> Result<ProgramRecords> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading program records from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing program records in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_records_parse() {
        let records: ProgramRecords = serde_json::from_str(
            r#"{
                "program": "demo",
                "options": ["-a", "-b"],
                "sentences": [
                    {"option": "-a", "sent": "-a conflicts with -b .", "score": 0.9}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(records.program, "demo");
        assert_eq!(records.sentences.len(), 1);
        assert!(records.topics.is_empty());
        assert_eq!(records.sentences[0].score, Some(0.9));
    }

    #[test]
    fn load_reports_the_offending_path() {
        let err = load_program_records(Path::new("/nonexistent/records.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/records.json"));
    }
}
