//! Isolated environment for integration tests: a temp upload directory and
//! a file-backed database inside it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use incidentflow::config::{Config, QueueConfig};
use incidentflow::db::{upload_repo, Database, SqliteBatchWriter};
use incidentflow::ingest::{ConcurrentIngester, SpreadsheetReader};
use incidentflow::pipeline::IngestPipeline;
use incidentflow::scoring::FeatureScorer;
use incidentflow::UploadRecord;

pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");
        let db = Database::open(&temp_dir.path().join("data").join("incidentflow.db"))
            .expect("Failed to open database");

        Self {
            temp_dir,
            upload_dir,
            db,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Config pointing at this harness, with fast retries.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.database_path = self
            .temp_dir
            .path()
            .join("data")
            .join("incidentflow.db")
            .to_string_lossy()
            .into_owned();
        config.upload_directory = self.upload_dir.to_string_lossy().into_owned();
        config.ingest.max_workers = 4;
        config.queue = QueueConfig {
            workers: 2,
            buffer_size: 16,
            max_retries: 2,
            backoff_unit_ms: 10,
        };
        config
    }

    /// Writes `csv` into the upload directory and registers an upload for it.
    pub fn add_upload(&self, csv: &str) -> UploadRecord {
        let upload = UploadRecord::new(
            format!("{}.csv", uuid::Uuid::new_v4().simple()),
            "incidents.csv",
        );
        std::fs::write(self.upload_dir.join(&upload.filename), csv)
            .expect("Failed to write upload");
        upload_repo::insert(&self.db, &upload).expect("Failed to insert upload");
        upload
    }

    /// Writes workbook bytes into the upload directory and registers them.
    pub fn add_xlsx_upload(&self, workbook: &[u8]) -> UploadRecord {
        let upload = UploadRecord::new(
            format!("{}.xlsx", uuid::Uuid::new_v4().simple()),
            "incidents.xlsx",
        );
        std::fs::write(self.upload_dir.join(&upload.filename), workbook)
            .expect("Failed to write upload");
        upload_repo::insert(&self.db, &upload).expect("Failed to insert upload");
        upload
    }

    /// Registers an upload whose file was never written.
    pub fn add_missing_upload(&self) -> UploadRecord {
        let upload = UploadRecord::new("missing.csv", "missing.csv");
        upload_repo::insert(&self.db, &upload).expect("Failed to insert upload");
        upload
    }

    pub fn pipeline(&self, workers: usize) -> IngestPipeline {
        IngestPipeline::new(
            self.db.clone(),
            &self.upload_dir,
            Arc::new(SpreadsheetReader::default()),
            ConcurrentIngester::new(workers),
            FeatureScorer::rule_based(),
            Arc::new(SqliteBatchWriter::new(self.db.clone())),
        )
    }
}
