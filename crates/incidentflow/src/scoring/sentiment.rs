use super::lexicon::Lexicon;
use super::text::{join_fields, tokenize, TokenStyle};
use super::SentimentScorer;
use crate::error::ScoringError;
use crate::model::{IncidentRecord, SentimentLabel, SentimentScore};

const SCALE: f64 = 2.0;
const LABEL_THRESHOLD: f64 = 0.05;

/// Lexicon-based sentiment over the brief and full description.
#[derive(Debug, Clone)]
pub struct RuleBasedSentimentScorer {
    lexicon: Lexicon,
}

impl RuleBasedSentimentScorer {
    pub fn new() -> Self {
        Self {
            lexicon: Lexicon::sentiment(),
        }
    }

    /// Scores free text. Text without lexicon hits is neutral 0.
    pub fn score_text(&self, text: &str) -> SentimentScore {
        let tokens = tokenize(text, TokenStyle::Sentiment);
        let totals = self.lexicon.walk(&tokens);
        let score = (totals.total * SCALE).clamp(-1.0, 1.0);
        SentimentScore {
            score,
            label: label_for(score),
        }
    }
}

impl Default for RuleBasedSentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn label_for(score: f64) -> SentimentLabel {
    if score > LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if score < -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

impl SentimentScorer for RuleBasedSentimentScorer {
    fn score(&self, record: Option<&IncidentRecord>) -> Result<SentimentScore, ScoringError> {
        let record = record.ok_or(ScoringError::MissingRecord)?;
        let text = join_fields([
            record.brief_description.as_str(),
            record.description.as_str(),
        ]);
        Ok(self.score_text(&text))
    }
}
