use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};

use incidentflow::config::{load_config, Config};
use incidentflow::db::{upload_repo, Database};
use incidentflow::{
    CancelFlag, IncidentflowError, IngestPipeline, JobKind, JobQueue, JobStatus, StageHandler,
    UploadRecord,
};

/// Incident spreadsheet ingestion and scoring.
#[derive(Parser, Debug)]
#[command(name = "incidentflow")]
#[command(version)]
struct Args {
    /// JSON config file; built-in defaults when omitted
    #[arg(short, long, env = "INCIDENTFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a CSV or xlsx export of incidents
    Ingest {
        file: PathBuf,

        /// Also queue sentiment and automation re-scoring once ingest finishes
        #[arg(long)]
        score: bool,
    },

    /// List the most recent uploads
    Uploads {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Delete an upload's incidents and mark it unprocessed
    Rollback { upload_id: String },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every job completed.
fn run(args: Args) -> Result<bool, IncidentflowError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    incidentflow::logging::init(&config.logging)?;
    info!("Starting incidentflow v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::open(Path::new(&config.database_path))?;

    let interrupted = CancelFlag::new();
    {
        let interrupted = interrupted.clone();
        if let Err(e) = ctrlc::set_handler(move || interrupted.cancel()) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
    }

    match args.command {
        Command::Ingest { file, score } => ingest(&config, db, &file, score, &interrupted),
        Command::Uploads { limit } => {
            let uploads = upload_repo::list_recent(&db, limit)?;
            println!("{}", serde_json::to_string_pretty(&uploads)?);
            Ok(true)
        }
        Command::Rollback { upload_id } => {
            let deleted = IngestPipeline::from_config(&config, db).rollback(&upload_id)?;
            println!("{}", serde_json::json!({ "upload_id": upload_id, "deleted": deleted }));
            Ok(true)
        }
    }
}

fn ingest(
    config: &Config,
    db: Database,
    file: &Path,
    score: bool,
    interrupted: &CancelFlag,
) -> Result<bool, IncidentflowError> {
    let upload = register_upload(config, &db, file)?;
    info!("Registered upload {} for {}", upload.id, file.display());

    let handler = Arc::new(StageHandler::from_config(config, db));
    let queue = JobQueue::new(config.queue.clone(), handler);

    let ingest_job = queue.submit_job(JobKind::IngestUpload, &upload.id, serde_json::Value::Null)?;
    let ingest_job = wait(&queue, &ingest_job.id, interrupted)?;

    if score && ingest_job.status == JobStatus::Completed {
        for kind in [JobKind::ScoreSentiment, JobKind::ScoreAutomation] {
            let job = queue.submit_job(kind, &upload.id, serde_json::Value::Null)?;
            wait(&queue, &job.id, interrupted)?;
        }
    }

    queue.shutdown();

    let jobs = queue.jobs_by_upload(&upload.id);
    println!("{}", serde_json::to_string_pretty(&jobs)?);
    Ok(jobs.iter().all(|job| job.status == JobStatus::Completed))
}

/// Copies `file` into the upload directory under a unique name and records it.
fn register_upload(
    config: &Config,
    db: &Database,
    file: &Path,
) -> Result<UploadRecord, IncidentflowError> {
    let upload_dir = PathBuf::from(&config.upload_directory);
    std::fs::create_dir_all(&upload_dir).map_err(|e| IncidentflowError::Io {
        path: upload_dir.clone(),
        source: e,
    })?;

    let original = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.csv".to_string());
    let stored = format!("{}_{}", uuid::Uuid::new_v4().simple(), original);
    std::fs::copy(file, upload_dir.join(&stored)).map_err(|e| IncidentflowError::Io {
        path: file.to_path_buf(),
        source: e,
    })?;

    let upload = UploadRecord::new(stored, original);
    upload_repo::insert(db, &upload)?;
    Ok(upload)
}

/// Polls until the job is terminal; a Ctrl-C shuts the queue down first.
fn wait(
    queue: &JobQueue,
    job_id: &str,
    interrupted: &CancelFlag,
) -> Result<incidentflow::Job, IncidentflowError> {
    loop {
        if interrupted.is_cancelled() && !queue.is_shutdown() {
            info!("Interrupted, shutting down");
            queue.shutdown();
        }
        let job = queue.wait_for(job_id, Duration::from_millis(200))?;
        if job.status.is_terminal() || queue.is_shutdown() {
            return Ok(job);
        }
    }
}
