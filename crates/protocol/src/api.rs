use crate::{RiskLevel, SentimentLabel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    SentimentDistribution,
    RiskDistribution,
}

impl GraphKind {
    pub const ALL: [GraphKind; 2] = [GraphKind::SentimentDistribution, GraphKind::RiskDistribution];

    /// File stem of the rendered chart; `/graph/<name>` serves `<name>.png`.
    pub fn name(self) -> &'static str {
        match self {
            GraphKind::SentimentDistribution => "sentiment_distribution",
            GraphKind::RiskDistribution => "risk_distribution",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.png", self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelCount<L> {
    pub label: L,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub message: String,
    pub file_path: String,
    pub job_id: String,
    pub processed_path: String,
    pub rows: usize,
    pub lexicon_version: u64,
    pub sentiment_counts: Vec<LabelCount<SentimentLabel>>,
    pub risk_counts: Vec<LabelCount<RiskLevel>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    pub fn with_error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSnapshot {
    pub id: String,
    pub file_name: String,
    pub status: JobState,
    pub created_at_ms: u64,
    #[serde(default)]
    pub finished_at_ms: Option<u64>,
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub lexicon_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LexiconSnapshot {
    pub version: u64,
    pub keywords: Vec<String>,
}
