//! Fan-out/fan-in row parsing with order-preserving reassembly.

use std::thread;

use crossbeam_channel::{bounded, unbounded};

use super::columns::ColumnMap;
use super::parser::{RowOutcome, RowParser};
use crate::cancel::CancelFlag;
use crate::error::IngestError;
use crate::model::{IncidentRecord, ValidationError};

/// Parses data rows on a short-lived pool of scoped threads.
///
/// Row indices are fed through a bounded channel to at most
/// `min(max_workers, rows)` workers. Each worker tags its result with the
/// original index and a single collector writes it into the matching slot,
/// so the output order always equals the input order.
#[derive(Debug, Clone)]
pub struct ConcurrentIngester {
    max_workers: usize,
    parser: RowParser,
}

impl ConcurrentIngester {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            parser: RowParser::new(),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of worker threads used for `rows` data rows.
    pub fn worker_count_for(&self, rows: usize) -> usize {
        self.max_workers.min(rows)
    }

    /// Parses every row. Row numbers in errors are `index + 1`.
    ///
    /// Once `cancel` fires no new row is started; rows already being parsed
    /// finish, and the call returns `IngestError::Cancelled` if any row was
    /// left unparsed.
    pub fn ingest(
        &self,
        rows: &[Vec<String>],
        columns: &ColumnMap,
        cancel: &CancelFlag,
    ) -> Result<Vec<RowOutcome>, IngestError> {
        self.ingest_observed(rows, columns, cancel, |_, _| {})
    }

    /// Like [`ingest`](Self::ingest), calling `on_parsed(completed, total)`
    /// from the collecting thread after each row lands in its slot.
    pub fn ingest_observed<F>(
        &self,
        rows: &[Vec<String>],
        columns: &ColumnMap,
        cancel: &CancelFlag,
        on_parsed: F,
    ) -> Result<Vec<RowOutcome>, IngestError>
    where
        F: Fn(usize, usize),
    {
        let total = rows.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.worker_count_for(total);
        let parser = &self.parser;
        let (work_tx, work_rx) = bounded::<usize>(workers * 2);
        let (result_tx, result_rx) = unbounded::<(usize, RowOutcome)>();
        let mut slots: Vec<Option<RowOutcome>> = (0..total).map(|_| None).collect();

        log::debug!("Parsing {} rows with {} workers", total, workers);

        let worker_panicked = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let work_rx = work_rx.clone();
                    let result_tx = result_tx.clone();
                    scope.spawn(move || {
                        for index in work_rx.iter() {
                            if cancel.is_cancelled() {
                                break;
                            }
                            let outcome = parser.parse(&rows[index], index + 1, columns);
                            if result_tx.send((index, outcome)).is_err() {
                                break;
                            }
                        }
                    })
                })
                .collect();
            drop(work_rx);
            drop(result_tx);

            scope.spawn(move || {
                for index in 0..total {
                    if cancel.is_cancelled() {
                        log::debug!("Row distribution stopped at {} of {}", index, total);
                        break;
                    }
                    if work_tx.send(index).is_err() {
                        break;
                    }
                }
            });

            for (done, (index, outcome)) in result_rx.iter().enumerate() {
                slots[index] = Some(outcome);
                on_parsed(done + 1, total);
            }

            handles
                .into_iter()
                .map(|handle| handle.join())
                .any(|joined| joined.is_err())
        });

        if worker_panicked {
            return Err(IngestError::WorkerPanicked);
        }

        let completed = slots.iter().filter(|slot| slot.is_some()).count();
        if completed < total {
            return Err(IngestError::Cancelled { completed, total });
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Valid records and row errors split out of an ordered outcome list.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub total_rows: usize,
    pub records: Vec<IncidentRecord>,
    pub errors: Vec<ValidationError>,
}

impl IngestReport {
    pub fn from_outcomes(outcomes: Vec<RowOutcome>) -> Self {
        let mut report = Self {
            total_rows: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(record) => report.records.push(record),
                Err(errors) => report.errors.extend(errors),
            }
        }
        report
    }

    /// Number of rows that produced at least one error.
    pub fn invalid_rows(&self) -> usize {
        self.total_rows - self.records.len()
    }
}
