pub mod automation;
pub mod lexicon;
pub mod sentiment;
pub mod text;

use std::sync::Arc;

use crate::error::ScoringError;
use crate::model::{AutomationAssessment, IncidentRecord, ProcessGroup, SentimentLabel, SentimentScore};

pub use automation::RuleBasedAutomationScorer;
pub use sentiment::RuleBasedSentimentScorer;

pub trait SentimentScorer: Send + Sync {
    fn score(&self, record: Option<&IncidentRecord>) -> Result<SentimentScore, ScoringError>;
}

pub trait AutomationScorer: Send + Sync {
    fn assess(&self, record: Option<&IncidentRecord>) -> Result<AutomationAssessment, ScoringError>;
}

/// Always neutral. Still rejects an absent record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSentimentScorer;

impl SentimentScorer for NoopSentimentScorer {
    fn score(&self, record: Option<&IncidentRecord>) -> Result<SentimentScore, ScoringError> {
        record.ok_or(ScoringError::MissingRecord)?;
        Ok(SentimentScore {
            score: 0.0,
            label: SentimentLabel::Neutral,
        })
    }
}

/// Always "not feasible" in the default group with zero confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAutomationScorer;

impl AutomationScorer for NoopAutomationScorer {
    fn assess(&self, record: Option<&IncidentRecord>) -> Result<AutomationAssessment, ScoringError> {
        record.ok_or(ScoringError::MissingRecord)?;
        Ok(AutomationAssessment {
            score: 0.0,
            feasible: false,
            process_group: ProcessGroup::DEFAULT,
            confidence: 0.0,
            reasons: Vec::new(),
        })
    }
}

/// Runs both scorers over a record and stores the derived fields on it.
#[derive(Clone)]
pub struct FeatureScorer {
    sentiment: Arc<dyn SentimentScorer>,
    automation: Arc<dyn AutomationScorer>,
}

impl FeatureScorer {
    pub fn new(sentiment: Arc<dyn SentimentScorer>, automation: Arc<dyn AutomationScorer>) -> Self {
        Self {
            sentiment,
            automation,
        }
    }

    pub fn rule_based() -> Self {
        Self::new(
            Arc::new(RuleBasedSentimentScorer::new()),
            Arc::new(RuleBasedAutomationScorer::new()),
        )
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopSentimentScorer), Arc::new(NoopAutomationScorer))
    }

    pub fn sentiment(&self) -> &dyn SentimentScorer {
        self.sentiment.as_ref()
    }

    pub fn automation(&self) -> &dyn AutomationScorer {
        self.automation.as_ref()
    }

    /// Scores `record` in place. Resolution hours are derived first so the
    /// automation scorer sees them.
    pub fn enrich(&self, record: &mut IncidentRecord) -> Result<(), ScoringError> {
        if record.resolution_hours.is_none() {
            record.compute_resolution_hours();
        }
        let sentiment = self.sentiment.score(Some(record))?;
        let automation = self.automation.assess(Some(record))?;
        record.sentiment = Some(sentiment);
        record.automation = Some(automation);
        Ok(())
    }
}

impl Default for FeatureScorer {
    fn default() -> Self {
        Self::rule_based()
    }
}

impl std::fmt::Debug for FeatureScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureScorer").finish_non_exhaustive()
    }
}
