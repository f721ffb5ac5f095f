use super::lexicon::{group_keywords, Lexicon};
use super::text::{contains_word, join_fields, tokenize, word_boundary_text, TokenStyle};
use super::AutomationScorer;
use crate::error::ScoringError;
use crate::model::{AutomationAssessment, IncidentRecord, Priority, ProcessGroup};

const BASE_WEIGHT: f64 = 0.4;
const TEXT_WEIGHT: f64 = 0.4;
const DURATION_WEIGHT: f64 = 0.15;
const PRIORITY_WEIGHT: f64 = 0.05;
const TEXT_SCALE: f64 = 0.4;
const TEXT_BONUS: f64 = 0.15;
const TEXT_BONUS_THRESHOLD: f64 = 0.05;

/// Minimum score for an incident in `group` to count as automatable. Also
/// used as the group's base rate.
pub fn group_threshold(group: ProcessGroup) -> f64 {
    match group {
        ProcessGroup::Infrastructure => 0.5,
        ProcessGroup::ApplicationSupport => 0.4,
        ProcessGroup::Security => 0.6,
        ProcessGroup::Monitoring => 0.4,
        ProcessGroup::BackupRecovery => 0.5,
        ProcessGroup::ChangeManagement => 0.5,
        ProcessGroup::UserSupport => 0.3,
        ProcessGroup::NetworkOperations => 0.5,
    }
}

/// Resolution-time bucket: fast fixes look scriptable, long ones do not.
pub fn duration_factor(hours: Option<i64>) -> f64 {
    match hours {
        None => 0.0,
        Some(h) if h < 1 => 0.3,
        Some(h) if h < 4 => 0.2,
        Some(h) if h < 24 => 0.0,
        Some(h) if h < 72 => -0.1,
        Some(_) => -0.2,
    }
}

pub fn priority_factor(priority: Priority) -> f64 {
    match priority {
        Priority::P1 => 0.2,
        Priority::P2 => 0.1,
        Priority::P3 => 0.0,
        Priority::P4 => -0.1,
    }
}

/// Keyword and heuristic based automation-feasibility assessment.
#[derive(Debug, Clone)]
pub struct RuleBasedAutomationScorer {
    lexicon: Lexicon,
}

impl RuleBasedAutomationScorer {
    pub fn new() -> Self {
        Self {
            lexicon: Lexicon::automation(),
        }
    }

    /// Picks the process group whose keywords best match the record. The
    /// default group is scored first and only a strictly higher score
    /// replaces it, so it wins ties and keyword-free records.
    pub fn classify(&self, record: &IncidentRecord) -> ProcessGroup {
        let text = word_boundary_text(&join_fields([
            record.brief_description.as_str(),
            record.description.as_str(),
            record.application_name.as_str(),
            record.resolution_group.as_str(),
            record.category.as_deref().unwrap_or(""),
            record.subcategory.as_deref().unwrap_or(""),
        ]));
        let brief = word_boundary_text(&record.brief_description);
        let application = word_boundary_text(&record.application_name);

        let mut best = ProcessGroup::DEFAULT;
        let mut best_score = group_score(ProcessGroup::DEFAULT, &text, &brief, &application);
        for group in ProcessGroup::ALL {
            if group == ProcessGroup::DEFAULT {
                continue;
            }
            let score = group_score(group, &text, &brief, &application);
            if score > best_score {
                best = group;
                best_score = score;
            }
        }
        best
    }

    /// Mean lexicon weight of the resolution text, scaled into [-1, 1].
    pub fn text_score(&self, record: &IncidentRecord) -> f64 {
        let text = join_fields([
            record.brief_description.as_str(),
            record.description.as_str(),
            record.resolution_notes.as_deref().unwrap_or(""),
            record.root_cause.as_deref().unwrap_or(""),
        ]);
        let tokens = tokenize(&text, TokenStyle::Keyword);
        self.lexicon
            .walk(&tokens)
            .mean()
            .map(|mean| (mean * TEXT_SCALE).clamp(-1.0, 1.0))
            .unwrap_or(0.0)
    }

    fn assess_record(&self, record: &IncidentRecord) -> AutomationAssessment {
        let text_score = self.text_score(record);
        let process_group = self.classify(record);
        let base = group_threshold(process_group);
        let hours = record.resolution_hours();
        let duration = duration_factor(hours);
        let priority = priority_factor(record.priority);

        let mut score = base * BASE_WEIGHT
            + text_score * TEXT_WEIGHT
            + duration * DURATION_WEIGHT
            + priority * PRIORITY_WEIGHT;
        if text_score > TEXT_BONUS_THRESHOLD {
            score += TEXT_BONUS;
        }
        let score = score.clamp(0.0, 1.0);

        AutomationAssessment {
            score,
            feasible: score >= base,
            process_group,
            confidence: confidence(record, hours, text_score),
            reasons: reasons(process_group, text_score, duration, priority, score),
        }
    }
}

impl Default for RuleBasedAutomationScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl AutomationScorer for RuleBasedAutomationScorer {
    fn assess(&self, record: Option<&IncidentRecord>) -> Result<AutomationAssessment, ScoringError> {
        let record = record.ok_or(ScoringError::MissingRecord)?;
        Ok(self.assess_record(record))
    }
}

fn group_score(group: ProcessGroup, text: &str, brief: &str, application: &str) -> f64 {
    group_keywords(group)
        .iter()
        .filter(|keyword| contains_word(text, keyword))
        .map(|keyword| {
            let length = keyword.chars().count();
            let mut weight = if length > 8 {
                2.0
            } else if length > 5 {
                1.5
            } else {
                1.0
            };
            if contains_word(brief, keyword) || contains_word(application, keyword) {
                weight *= 1.5;
            }
            weight
        })
        .sum()
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// 0.5 base plus a fixed increment per corroborating signal, capped at 1.
fn confidence(record: &IncidentRecord, hours: Option<i64>, text_score: f64) -> f64 {
    let mut confidence: f64 = 0.5;
    if hours.is_some() {
        confidence += 0.2;
    }
    if has_text(record.resolution_notes.as_deref()) {
        confidence += 0.1;
    }
    if has_text(record.root_cause.as_deref()) {
        confidence += 0.1;
    }
    if text_score != 0.0 {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

fn reasons(
    group: ProcessGroup,
    text_score: f64,
    duration: f64,
    priority: f64,
    score: f64,
) -> Vec<String> {
    let mut reasons = vec![format!(
        "Categorized as {} (base automation potential: {:.1})",
        group,
        group_threshold(group)
    )];

    let text_reason = if text_score > 0.1 {
        "Description contains automation-friendly keywords"
    } else if text_score < -0.1 {
        "Description suggests manual intervention required"
    } else {
        "Description is neutral regarding automation potential"
    };
    reasons.push(text_reason.to_string());

    if duration > 0.1 {
        reasons.push("Fast resolution time suggests automation potential".to_string());
    } else if duration < -0.1 {
        reasons.push("Slow resolution time suggests complex manual work".to_string());
    }

    if priority > 0.05 {
        reasons.push("High priority incidents benefit from automation".to_string());
    }

    let band = if score >= 0.7 {
        "High automation potential - strongly recommended"
    } else if score >= 0.5 {
        "Moderate automation potential - worth investigating"
    } else if score >= 0.3 {
        "Low automation potential - manual process preferred"
    } else {
        "Very low automation potential - requires human expertise"
    };
    reasons.push(band.to_string());

    reasons
}
