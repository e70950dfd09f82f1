//! Relationship report serialization.

use crate::aggregate::ProgramRelationSet;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct RelationReport {
    pub options: OptionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionSummary {
    /// The full option vocabulary, value fields stripped.
    pub total_options: Vec<String>,
    /// Unordered conflicting pairs; negation-tagged ids end in `^`.
    pub conflict_options: Vec<[String; 2]>,
    /// Dependent option to its prerequisite expression (`&&` or `||`).
    pub dependent_options: BTreeMap<String, String>,
}

impl RelationReport {
    pub fn new(total_options: Vec<String>, relations: &ProgramRelationSet) -> Self {
        Self {
            options: OptionSummary {
                total_options,
                conflict_options: relations
                    .conflicts
                    .iter()
                    .map(|pair| pair.render())
                    .collect(),
                dependent_options: relations.dependents.clone(),
            },
        }
    }
}

/// Write the report as `relation_<program>.json` under `dir`, creating the
/// directory as needed. Returns the written path.
pub fn write_report(dir: &Path, program: &str, report: &RelationReport) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let path = dir.join(format!("relation_{program}.json"));
    let body = serde_json::to_vec_pretty(report).context("serializing relation report")?;
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ConflictPair;

    #[test]
    fn report_serializes_in_the_expected_shape() {
        let mut relations = ProgramRelationSet::default();
        relations.add_conflict(ConflictPair::new("-a", "-b"));
        relations.add_dependency("-z", "-a&&-b");
        let report = RelationReport::new(vec!["-a".into(), "-b".into(), "-z".into()], &relations);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json["options"]["conflict_options"][0],
            serde_json::json!(["-a", "-b"])
        );
        assert_eq!(json["options"]["dependent_options"]["-z"], "-a&&-b");
        assert_eq!(json["options"]["total_options"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn write_report_names_the_file_after_the_program() {
        let dir = tempfile::tempdir().unwrap();
        let report = RelationReport::new(Vec::new(), &ProgramRelationSet::default());
        let path = write_report(dir.path(), "demo", &report).unwrap();
        assert!(path.ends_with("relation_demo.json"));
        assert!(path.exists());
    }
}
