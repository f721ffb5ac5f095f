use serde::Serialize;

use crate::config::Config;
use crate::db::Database;
use crate::error::JobError;
use crate::queue::{Job, JobContext, JobHandler, JobKind};
use crate::scoring::FeatureScorer;

use super::runner::IngestPipeline;
use super::scoring_stage::{ScoringKind, ScoringStage};

/// Production job handler: routes each job kind to its stage.
pub struct StageHandler {
    ingest: IngestPipeline,
    scoring: ScoringStage,
}

impl StageHandler {
    pub fn new(ingest: IngestPipeline, scoring: ScoringStage) -> Self {
        Self { ingest, scoring }
    }

    pub fn from_config(config: &Config, db: Database) -> Self {
        Self {
            ingest: IngestPipeline::from_config(config, db.clone()),
            scoring: ScoringStage::new(db, FeatureScorer::rule_based()),
        }
    }
}

impl JobHandler for StageHandler {
    fn handle(&self, job: &Job, ctx: &JobContext) -> Result<serde_json::Value, JobError> {
        let cancel = ctx.cancel_flag();
        match job.kind {
            JobKind::IngestUpload => encode(self.ingest.run(&job.upload_id, cancel, ctx)?),
            JobKind::ScoreSentiment => encode(self.scoring.run(
                &job.upload_id,
                ScoringKind::Sentiment,
                cancel,
                ctx,
            )?),
            JobKind::ScoreAutomation => encode(self.scoring.run(
                &job.upload_id,
                ScoringKind::Automation,
                cancel,
                ctx,
            )?),
        }
    }
}

fn encode<T: Serialize>(summary: T) -> Result<serde_json::Value, JobError> {
    serde_json::to_value(summary)
        .map_err(|e| JobError::Stage(format!("failed to encode job result: {}", e)))
}
