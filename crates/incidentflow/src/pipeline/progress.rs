use std::fmt;
use std::sync::Mutex;

/// Major steps of an ingest run, each with a fixed progress mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Reading,
    Parsing,
    Scoring,
    Persisting,
    Finalizing,
}

impl IngestPhase {
    pub fn percent(self) -> u8 {
        match self {
            IngestPhase::Reading => 10,
            IngestPhase::Parsing => 30,
            IngestPhase::Scoring => 50,
            IngestPhase::Persisting => 80,
            IngestPhase::Finalizing => 95,
        }
    }
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestPhase::Reading => "reading",
            IngestPhase::Parsing => "parsing",
            IngestPhase::Scoring => "scoring",
            IngestPhase::Persisting => "persisting",
            IngestPhase::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Events emitted by the stages while they run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Phase { phase: IngestPhase, message: String },
    Percent { percent: u8, message: String },
}

impl ProgressEvent {
    pub fn percent(&self) -> u8 {
        match self {
            ProgressEvent::Phase { phase, .. } => phase.percent(),
            ProgressEvent::Percent { percent, .. } => (*percent).min(100),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProgressEvent::Phase { message, .. } | ProgressEvent::Percent { message, .. } => message,
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Keeps every event; used by tests to assert on the reported sequence.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events().iter().map(ProgressEvent::percent).collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
