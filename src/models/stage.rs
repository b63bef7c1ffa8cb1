use serde::{Deserialize, Serialize};

/// One of the nine fixed positions in the content procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Stage {
    /// Understand the request and extract a structured brief
    BriefAnalysis = 1,
    /// List research points and a short summary
    Research = 2,
    /// Propose candidate topics
    TopicProposals = 3,
    /// Split the work between the generator and the author
    Collaboration = 4,
    /// Match style exemplars and classify reference material
    StyleAndMaterials = 5,
    /// Wait until real material has been supplied
    MaterialReadiness = 6,
    /// Write the first draft
    Drafting = 7,
    /// Three-pass review producing the final article
    Review = 8,
    /// Suggest illustrations for the final article
    Illustration = 9,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::BriefAnalysis,
        Stage::Research,
        Stage::TopicProposals,
        Stage::Collaboration,
        Stage::StyleAndMaterials,
        Stage::MaterialReadiness,
        Stage::Drafting,
        Stage::Review,
        Stage::Illustration,
    ];

    pub const FIRST: Stage = Stage::BriefAnalysis;
    pub const LAST: Stage = Stage::Illustration;

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    /// The stage after this one, or `None` for the last stage
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::BriefAnalysis => "brief analysis",
            Stage::Research => "research",
            Stage::TopicProposals => "topic proposals",
            Stage::Collaboration => "collaboration checklist",
            Stage::StyleAndMaterials => "style and materials",
            Stage::MaterialReadiness => "material readiness",
            Stage::Drafting => "drafting",
            Stage::Review => "review",
            Stage::Illustration => "illustration plan",
        }
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.number()
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::from_number(number).ok_or_else(|| format!("stage must be 1-9, got {}", number))
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{} ({})", self.number(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_numbering() {
        assert_eq!(Stage::from_number(0), None);
        assert_eq!(Stage::from_number(1), Some(Stage::BriefAnalysis));
        assert_eq!(Stage::from_number(9), Some(Stage::Illustration));
        assert_eq!(Stage::from_number(10), None);
        assert_eq!(Stage::Review.next(), Some(Stage::Illustration));
        assert_eq!(Stage::Illustration.next(), None);
    }

    #[test]
    fn test_stage_serializes_as_number() {
        let json = serde_json::to_string(&Stage::Drafting).unwrap();
        assert_eq!(json, "7");
        let stage: Stage = serde_json::from_str("3").unwrap();
        assert_eq!(stage, Stage::TopicProposals);
        assert!(serde_json::from_str::<Stage>("12").is_err());
    }
}
