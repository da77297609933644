use std::collections::HashSet;

use protocol::RiskLevel;

use crate::lexicon::Lexicon;

/// Scores at or below this are high risk on their own.
pub const HIGH_RISK_SCORE: f64 = -0.5;
/// Scores in `(HIGH_RISK_SCORE, MEDIUM_RISK_SCORE]` are medium risk on their own.
pub const MEDIUM_RISK_SCORE: f64 = -0.2;
pub const HIGH_RISK_KEYWORDS: usize = 2;

/// Distinct lowercase whitespace-delimited tokens. Punctuation stays attached.
pub fn tokenize(message: &str) -> HashSet<String> {
    message
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub fn keyword_count(message: &str, lexicon: &Lexicon) -> usize {
    tokenize(message)
        .iter()
        .filter(|token| lexicon.contains(token))
        .count()
}

pub fn classify_risk(message: &str, score: f64, lexicon: &Lexicon) -> RiskLevel {
    risk_for(keyword_count(message, lexicon), score)
}

/// Rules are checked in order; the first match wins.
pub fn risk_for(keyword_count: usize, score: f64) -> RiskLevel {
    if score <= HIGH_RISK_SCORE || keyword_count >= HIGH_RISK_KEYWORDS {
        RiskLevel::High
    } else if (score > HIGH_RISK_SCORE && score <= MEDIUM_RISK_SCORE) || keyword_count == 1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
