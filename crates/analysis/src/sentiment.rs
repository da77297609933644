use std::panic::{self, AssertUnwindSafe};

use protocol::SentimentLabel;
use vader_sentiment::SentimentIntensityAnalyzer;

pub const POSITIVE_THRESHOLD: f64 = 0.05;
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

/// Maps text to a compound polarity score in `[-1, 1]`.
pub trait SentimentScorer: Send + Sync {
    fn compound(&self, text: &str) -> Result<f64, String>;
}

pub fn label_for_score(score: f64) -> SentimentLabel {
    if score > POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if score < NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// VADER lexicon and rule based scorer. The lexicon is loaded once on construction.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn compound(&self, text: &str) -> Result<f64, String> {
        if text.trim().is_empty() {
            return Ok(0.0);
        }
        let scores = panic::catch_unwind(AssertUnwindSafe(|| {
            self.analyzer.polarity_scores(text).get("compound").copied()
        }))
        .map_err(|payload| panic_reason(payload.as_ref()))?;
        let score = scores.ok_or_else(|| "model returned no compound score".to_string())?;
        if score.is_nan() {
            return Err("model returned NaN".to_string());
        }
        Ok(score.clamp(-1.0, 1.0))
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("sentiment model panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("sentiment model panicked: {message}")
    } else {
        "sentiment model panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(label_for_score(0.06), SentimentLabel::Positive);
        assert_eq!(label_for_score(0.05), SentimentLabel::Neutral);
        assert_eq!(label_for_score(0.0), SentimentLabel::Neutral);
        assert_eq!(label_for_score(-0.05), SentimentLabel::Neutral);
        assert_eq!(label_for_score(-0.051), SentimentLabel::Negative);
        assert_eq!(label_for_score(-1.0), SentimentLabel::Negative);
    }

    #[test]
    fn empty_text_is_neutral() {
        let scorer = VaderScorer::new();
        assert_eq!(scorer.compound("").expect("score"), 0.0);
        assert_eq!(scorer.compound("   ").expect("score"), 0.0);
    }

    #[test]
    fn scores_obvious_polarity() {
        let scorer = VaderScorer::new();
        let negative = scorer
            .compound("I hate this, it is terrible and awful")
            .expect("score");
        let positive = scorer.compound("I love this, it is great").expect("score");
        assert!(negative < NEGATIVE_THRESHOLD, "negative score {negative}");
        assert!(positive > POSITIVE_THRESHOLD, "positive score {positive}");
        assert!((-1.0..=1.0).contains(&negative));
        assert!((-1.0..=1.0).contains(&positive));
    }
}
