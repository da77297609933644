use std::io::{Read, Write};
use std::path::Path;

use protocol::api::LabelCount;
use protocol::{ChatRecord, RiskLevel, SentimentLabel};

use crate::error::AnalysisError;
use crate::lexicon::Lexicon;
use crate::risk::classify_risk;
use crate::sentiment::{label_for_score, SentimentScorer};

pub const MESSAGE_COLUMN: &str = "Message";
pub const SCORE_COLUMN: &str = "Sentiment Score";
pub const LABEL_COLUMN: &str = "Sentiment Label";
pub const RISK_COLUMN: &str = "Risk Level";
pub const PROCESSED_FILE_NAME: &str = "processed_chat_data.csv";

/// Parsed chat export. Every column is kept so the annotated output can carry
/// the caller's data through unchanged.
#[derive(Debug, Clone)]
pub struct ChatTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    message_index: usize,
}

impl ChatTable {
    /// Short rows are padded with empty fields; rows longer than the header are
    /// rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnalysisError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let message_index = headers
            .iter()
            .position(|header| header == MESSAGE_COLUMN)
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: MESSAGE_COLUMN.to_string(),
            })?;
        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(AnalysisError::TooManyFields {
                    row: index + 1,
                    fields: record.len(),
                    expected: headers.len(),
                });
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self {
            headers,
            rows,
            message_index,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| {
            row.get(self.message_index)
                .map(String::as_str)
                .unwrap_or_default()
        })
    }

    /// Scores every row. Nothing outside the table is touched, so a failure here
    /// leaves shared state as it was.
    pub fn score(self, scorer: &dyn SentimentScorer) -> Result<ScoredTable, AnalysisError> {
        let scores = score_messages(self.messages(), scorer)?;
        Ok(ScoredTable {
            table: self,
            scores,
        })
    }

    /// Scores and classifies every row against one lexicon snapshot.
    pub fn annotate(
        self,
        scorer: &dyn SentimentScorer,
        lexicon: &Lexicon,
    ) -> Result<AnnotatedTable, AnalysisError> {
        Ok(self.score(scorer)?.classify(lexicon))
    }
}

/// A table whose rows all have a sentiment score but no risk level yet.
#[derive(Debug, Clone)]
pub struct ScoredTable {
    table: ChatTable,
    scores: Vec<f64>,
}

impl ScoredTable {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn classify(self, lexicon: &Lexicon) -> AnnotatedTable {
        let records = self
            .table
            .messages()
            .zip(&self.scores)
            .map(|(message, score)| record_for(message, *score, lexicon))
            .collect();
        AnnotatedTable {
            table: self.table,
            records,
        }
    }
}

fn record_for(message: &str, sentiment_score: f64, lexicon: &Lexicon) -> ChatRecord {
    ChatRecord {
        message: message.to_string(),
        sentiment_score,
        sentiment_label: label_for_score(sentiment_score),
        risk_level: classify_risk(message, sentiment_score, lexicon),
    }
}

fn score_messages<'a, I>(
    messages: I,
    scorer: &dyn SentimentScorer,
) -> Result<Vec<f64>, AnalysisError>
where
    I: IntoIterator<Item = &'a str>,
{
    messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| {
            scorer
                .compound(message)
                .map_err(|reason| AnalysisError::Scoring {
                    row: index + 1,
                    reason,
                })
        })
        .collect()
}

pub fn annotate_message(
    message: &str,
    scorer: &dyn SentimentScorer,
    lexicon: &Lexicon,
) -> Result<ChatRecord, String> {
    let sentiment_score = scorer.compound(message)?;
    Ok(record_for(message, sentiment_score, lexicon))
}

/// Maps messages to annotated records. The first row that fails to score aborts
/// the whole pass.
pub fn annotate<'a, I>(
    messages: I,
    scorer: &dyn SentimentScorer,
    lexicon: &Lexicon,
) -> Result<Vec<ChatRecord>, AnalysisError>
where
    I: IntoIterator<Item = &'a str>,
{
    messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| {
            annotate_message(message, scorer, lexicon).map_err(|reason| {
                AnalysisError::Scoring {
                    row: index + 1,
                    reason,
                }
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct AnnotatedTable {
    table: ChatTable,
    records: Vec<ChatRecord>,
}

impl AnnotatedTable {
    pub fn records(&self) -> &[ChatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn distribution(&self) -> Distribution {
        Distribution::from_records(&self.records)
    }

    /// Writes the input columns followed by the derived ones. Derived columns
    /// already present in the input are overwritten in place.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), AnalysisError> {
        let mut headers = self.table.headers.clone();
        let score_index = column_index(&mut headers, SCORE_COLUMN);
        let label_index = column_index(&mut headers, LABEL_COLUMN);
        let risk_index = column_index(&mut headers, RISK_COLUMN);

        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&headers)?;
        for (row, record) in self.table.rows.iter().zip(&self.records) {
            let mut fields = row.clone();
            fields.resize(headers.len(), String::new());
            fields[score_index] = format!("{:.4}", record.sentiment_score);
            fields[label_index] = record.sentiment_label.to_string();
            fields[risk_index] = record.risk_level.to_string();
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes through a staging file so a reader never sees a partial CSV.
    pub fn write_to_path(&self, path: &Path) -> Result<(), AnalysisError> {
        system_utils::fs::write_atomic_with(path, |staging| {
            let file = std::fs::File::create(staging)?;
            self.write_csv(std::io::BufWriter::new(file))
        })
    }
}

fn column_index(headers: &mut Vec<String>, name: &str) -> usize {
    match headers.iter().position(|header| header == name) {
        Some(index) => index,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}

/// Label counts in fixed category order, zero counts included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub sentiment: Vec<LabelCount<SentimentLabel>>,
    pub risk: Vec<LabelCount<RiskLevel>>,
}

impl Distribution {
    pub fn from_records(records: &[ChatRecord]) -> Self {
        let sentiment = SentimentLabel::ALL
            .iter()
            .map(|label| LabelCount {
                label: *label,
                count: records
                    .iter()
                    .filter(|record| record.sentiment_label == *label)
                    .count(),
            })
            .collect();
        let risk = RiskLevel::ALL
            .iter()
            .map(|level| LabelCount {
                label: *level,
                count: records
                    .iter()
                    .filter(|record| record.risk_level == *level)
                    .count(),
            })
            .collect();
        Self { sentiment, risk }
    }

    pub fn sentiment_count(&self, label: SentimentLabel) -> usize {
        self.sentiment
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    pub fn risk_count(&self, level: RiskLevel) -> usize {
        self.risk
            .iter()
            .find(|entry| entry.label == level)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}
