//! Field-level validation errors and batch insert results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable category of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// A required column or value is missing.
    RequiredFieldMissing,
    /// A value could not be parsed (dates, numbers).
    InvalidFormat,
    /// A value parsed but violates a rule (unknown priority, date order).
    InvalidValue,
    /// The identifier appeared earlier in the same batch.
    DuplicateInBatch,
    /// The identifier is already persisted for the same batch owner.
    AlreadyExists,
    /// The storage layer rejected the row.
    Storage,
}

impl ValidationKind {
    pub fn is_duplicate(self) -> bool {
        matches!(self, Self::DuplicateInBatch | Self::AlreadyExists)
    }
}

/// One field-tagged, row-numbered problem with an input row.
///
/// `row` is 1-based with the header row excluded; `0` means the error is not
/// tied to a particular row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub value: String,
    pub message: String,
    #[serde(default)]
    pub row: usize,
    pub kind: ValidationKind,
}

impl ValidationError {
    pub fn new(
        kind: ValidationKind,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            message: message.into(),
            row: 0,
            kind,
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row > 0 {
            write!(
                f,
                "row {}, field '{}': {} (value: '{}')",
                self.row, self.field, self.message, self.value
            )
        } else {
            write!(
                f,
                "field '{}': {} (value: '{}')",
                self.field, self.message, self.value
            )
        }
    }
}

impl std::error::Error for ValidationError {}

/// How a batch insert ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// At least one row was inserted and the transaction committed.
    Committed,
    /// The input batch was empty; nothing was attempted.
    NothingToInsert,
    /// Every row was rejected; the transaction was rolled back.
    AllRejected,
}

/// Result of one dedup-aware batch insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInsertResult {
    pub inserted_count: usize,
    pub errors: Vec<ValidationError>,
    pub success: bool,
    pub outcome: BatchOutcome,
}

impl BatchInsertResult {
    pub fn empty() -> Self {
        Self {
            inserted_count: 0,
            errors: Vec::new(),
            success: true,
            outcome: BatchOutcome::NothingToInsert,
        }
    }

    /// Number of rows rejected because their identifier was already seen.
    pub fn duplicate_count(&self) -> usize {
        self.errors.iter().filter(|e| e.kind.is_duplicate()).count()
    }

    /// Number of rows rejected for any other reason.
    pub fn rejected_count(&self) -> usize {
        self.errors.len() - self.duplicate_count()
    }
}
