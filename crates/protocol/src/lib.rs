use serde::{Deserialize, Serialize};
use std::fmt;

pub mod api;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Chart and summary order.
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLevel {
    /// Chart and summary order.
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One annotated chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRecord {
    pub message: String,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    pub risk_level: RiskLevel,
}

/// Extra risk keywords supplied with an upload, grouped by the caller's severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordPayload {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub low: Vec<String>,
}

impl KeywordPayload {
    /// Parses the `keywords` form field.
    ///
    /// Only invalid JSON is an error. A value that is not an object, a missing
    /// category, a category that is not an array, or array entries that are not
    /// strings are all treated as empty.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let value: serde_json::Value = serde_json::from_str(trimmed)?;
        Ok(Self {
            high: string_list(&value, "high"),
            medium: string_list(&value, "medium"),
            low: string_list(&value, "low"),
        })
    }

    /// All terms across the three categories, in payload order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.high
            .iter()
            .chain(self.medium.iter())
            .chain(self.low.iter())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.medium.is_empty() && self.low.is_empty()
    }
}

fn string_list(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_serializes_with_display_names() {
        let json = serde_json::to_string(&RiskLevel::Medium).expect("serialize");
        assert_eq!(json, "\"Medium Risk\"");
        let decoded: RiskLevel = serde_json::from_str("\"High Risk\"").expect("deserialize");
        assert_eq!(decoded, RiskLevel::High);
    }

    #[test]
    fn parses_full_keyword_payload() {
        let payload =
            KeywordPayload::parse(r#"{"high":["coffee"],"medium":["tea"],"low":[]}"#)
                .expect("payload");
        assert_eq!(payload.high, vec!["coffee".to_string()]);
        assert_eq!(payload.medium, vec!["tea".to_string()]);
        assert!(payload.low.is_empty());
        assert_eq!(payload.terms().collect::<Vec<_>>(), vec!["coffee", "tea"]);
    }

    #[test]
    fn tolerates_partial_or_odd_payloads() {
        let payload = KeywordPayload::parse(r#"{"high":["a", 3, null], "medium": "b"}"#)
            .expect("payload");
        assert_eq!(payload.high, vec!["a".to_string()]);
        assert!(payload.medium.is_empty());
        assert!(payload.low.is_empty());

        assert!(KeywordPayload::parse("[1, 2]").expect("array").is_empty());
        assert!(KeywordPayload::parse("   ").expect("blank").is_empty());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(KeywordPayload::parse("{high: [").is_err());
    }
}
