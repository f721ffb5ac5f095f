//! The incident record and its derived scoring fields.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incident priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::P1, Priority::P2, Priority::P3, Priority::P4];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
        }
    }

    /// Parses `P1`..`P4` case-insensitively; a bare digit `1`..`4` is also accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix('P')
            .or_else(|| trimmed.strip_prefix('p'))
            .unwrap_or(trimmed);
        match digits {
            "1" => Some(Priority::P1),
            "2" => Some(Priority::P2),
            "3" => Some(Priority::P3),
            "4" => Some(Priority::P4),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

/// The fixed IT process taxonomy used to bucket automation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessGroup {
    #[serde(rename = "Infrastructure")]
    Infrastructure,
    #[serde(rename = "Application Support")]
    ApplicationSupport,
    #[serde(rename = "Security")]
    Security,
    #[serde(rename = "Monitoring")]
    Monitoring,
    #[serde(rename = "Backup & Recovery")]
    BackupRecovery,
    #[serde(rename = "Change Management")]
    ChangeManagement,
    #[serde(rename = "User Support")]
    UserSupport,
    #[serde(rename = "Network Operations")]
    NetworkOperations,
}

impl ProcessGroup {
    /// Every group, default first.
    pub const ALL: [ProcessGroup; 8] = [
        ProcessGroup::ApplicationSupport,
        ProcessGroup::Infrastructure,
        ProcessGroup::Security,
        ProcessGroup::Monitoring,
        ProcessGroup::BackupRecovery,
        ProcessGroup::ChangeManagement,
        ProcessGroup::UserSupport,
        ProcessGroup::NetworkOperations,
    ];

    pub const DEFAULT: ProcessGroup = ProcessGroup::ApplicationSupport;

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessGroup::Infrastructure => "Infrastructure",
            ProcessGroup::ApplicationSupport => "Application Support",
            ProcessGroup::Security => "Security",
            ProcessGroup::Monitoring => "Monitoring",
            ProcessGroup::BackupRecovery => "Backup & Recovery",
            ProcessGroup::ChangeManagement => "Change Management",
            ProcessGroup::UserSupport => "User Support",
            ProcessGroup::NetworkOperations => "Network Operations",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|group| group.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for ProcessGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the sentiment scorer. `score` is always within [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub score: f64,
    pub label: SentimentLabel,
}

/// Output of the automation scorer. `score` and `confidence` are within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationAssessment {
    pub score: f64,
    pub feasible: bool,
    pub process_group: ProcessGroup,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// One row of ingested incident data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Storage row id (UUID).
    pub id: String,
    /// Owning upload (batch) id.
    pub upload_id: String,
    /// External identifier, unique within a batch.
    pub incident_id: String,
    /// 1-based data row the record was parsed from (header excluded).
    #[serde(default)]
    pub source_row: usize,
    pub report_date: NaiveDateTime,
    pub resolve_date: Option<NaiveDateTime>,
    pub last_resolve_date: Option<NaiveDateTime>,
    pub brief_description: String,
    pub description: String,
    pub application_name: String,
    pub resolution_group: String,
    pub resolved_person: Option<String>,
    pub priority: Priority,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub status: Option<String>,
    pub root_cause: Option<String>,
    pub resolution_notes: Option<String>,

    // Derived
    pub resolution_hours: Option<i64>,
    pub sentiment: Option<SentimentScore>,
    pub automation: Option<AutomationAssessment>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncidentRecord {
    /// Creates a record with the given identifier and report time; every other
    /// field starts empty and priority defaults to P3.
    pub fn new(incident_id: impl Into<String>, report_date: NaiveDateTime) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            upload_id: String::new(),
            incident_id: incident_id.into(),
            source_row: 0,
            report_date,
            resolve_date: None,
            last_resolve_date: None,
            brief_description: String::new(),
            description: String::new(),
            application_name: String::new(),
            resolution_group: String::new(),
            resolved_person: None,
            priority: Priority::P3,
            category: None,
            subcategory: None,
            status: None,
            root_cause: None,
            resolution_notes: None,
            resolution_hours: None,
            sentiment: None,
            automation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whole hours between report and resolution, floor-divided.
    /// `None` while the incident is unresolved.
    pub fn derived_resolution_hours(&self) -> Option<i64> {
        self.resolve_date
            .map(|resolved| (resolved - self.report_date).num_seconds().div_euclid(3600))
    }

    /// Stored resolution hours, falling back to the value derived from the dates.
    pub fn resolution_hours(&self) -> Option<i64> {
        self.resolution_hours
            .or_else(|| self.derived_resolution_hours())
    }

    pub fn compute_resolution_hours(&mut self) {
        self.resolution_hours = self.derived_resolution_hours();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("P1"), Some(Priority::P1));
        assert_eq!(Priority::parse(" p2 "), Some(Priority::P2));
        assert_eq!(Priority::parse("3"), Some(Priority::P3));
        assert_eq!(Priority::parse("P5"), None);
        assert_eq!(Priority::parse("high"), None);
        assert_eq!(Priority::parse(""), None);
    }

    #[test]
    fn test_resolution_hours_floor() {
        let mut record = IncidentRecord::new("INC001", at(1, 8, 0));
        record.resolve_date = Some(at(1, 10, 59));
        assert_eq!(record.derived_resolution_hours(), Some(2));

        record.resolve_date = Some(at(3, 8, 0));
        record.compute_resolution_hours();
        assert_eq!(record.resolution_hours, Some(48));
    }

    #[test]
    fn test_resolution_hours_unresolved() {
        let record = IncidentRecord::new("INC002", at(1, 8, 0));
        assert_eq!(record.resolution_hours(), None);
    }

    #[test]
    fn test_process_group_round_trip_names() {
        for group in ProcessGroup::ALL {
            assert_eq!(ProcessGroup::parse(group.as_str()), Some(group));
        }
        assert_eq!(ProcessGroup::ALL[0], ProcessGroup::DEFAULT);
    }

    #[test]
    fn test_sentiment_label_parse() {
        assert_eq!(SentimentLabel::parse("Positive"), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse("unknown"), None);
    }
}
