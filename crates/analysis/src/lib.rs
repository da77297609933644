//! Sentiment scoring, keyword risk classification and chart rendering for chat
//! message exports.

pub mod chart;
pub mod error;
pub mod lexicon;
pub mod pipeline;
pub mod risk;
pub mod sentiment;

pub use error::AnalysisError;
pub use lexicon::{Lexicon, LexiconStore};
pub use pipeline::{AnnotatedTable, ChatTable, Distribution, ScoredTable};
pub use sentiment::{SentimentScorer, VaderScorer};
