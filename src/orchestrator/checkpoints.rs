use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Stage;

/// Stages that suspend the task until the author confirms
///
/// A stage is a checkpoint purely by position. Two layouts are built in:
/// `standard` (topic selection and material readiness) and `extended`
/// (adds research review and style confirmation). Any explicit set is
/// accepted as well.
///
/// In configuration files the table is either a layout name or a list of
/// stage numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CheckpointSpec", into = "Vec<Stage>")]
pub struct CheckpointTable {
    stages: BTreeSet<Stage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CheckpointSpec {
    Layout(String),
    Stages(Vec<Stage>),
}

impl TryFrom<CheckpointSpec> for CheckpointTable {
    type Error = String;

    fn try_from(spec: CheckpointSpec) -> Result<Self, Self::Error> {
        match spec {
            CheckpointSpec::Layout(name) => name.parse(),
            CheckpointSpec::Stages(stages) => Ok(Self::from_stages(stages)),
        }
    }
}

impl From<CheckpointTable> for Vec<Stage> {
    fn from(table: CheckpointTable) -> Self {
        table.stages.into_iter().collect()
    }
}

impl Default for CheckpointTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CheckpointTable {
    /// Topic selection (S3) and material readiness (S6)
    pub fn standard() -> Self {
        Self::from_stages([Stage::TopicProposals, Stage::MaterialReadiness])
    }

    /// Standard plus research review (S2) and style confirmation (S5)
    pub fn extended() -> Self {
        Self::from_stages([
            Stage::Research,
            Stage::TopicProposals,
            Stage::StyleAndMaterials,
            Stage::MaterialReadiness,
        ])
    }

    pub fn from_stages(stages: impl IntoIterator<Item = Stage>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
        }
    }

    pub fn is_checkpoint(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.iter().copied()
    }
}

impl FromStr for CheckpointTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::standard()),
            "extended" => Ok(Self::extended()),
            other => Err(format!(
                "unknown checkpoint layout: {} (expected standard or extended)",
                other
            )),
        }
    }
}

impl std::fmt::Display for CheckpointTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let numbers: Vec<String> = self.stages().map(|s| s.number().to_string()).collect();
        write!(f, "{{{}}}", numbers.join(","))
    }
}
