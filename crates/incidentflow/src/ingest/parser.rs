//! Converts one raw spreadsheet row into a validated `IncidentRecord`.

use chrono::NaiveDateTime;

use super::columns::{ColumnMap, Field};
use super::dates::parse_timestamp;
use crate::model::{IncidentRecord, Priority, ValidationError, ValidationKind};

/// Result of parsing a single row: the record, or every field error found in it.
pub type RowOutcome = Result<IncidentRecord, Vec<ValidationError>>;

/// Stateless row parser. `row_number` is 1-based with the header excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowParser;

impl RowParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, row: &[String], row_number: usize, columns: &ColumnMap) -> RowOutcome {
        if !columns.is_complete() {
            return Err(columns
                .missing_required()
                .iter()
                .map(|field| {
                    ValidationError::new(
                        ValidationKind::RequiredFieldMissing,
                        field.name(),
                        "",
                        "required column not found in header",
                    )
                    .at_row(row_number)
                })
                .collect());
        }

        let mut cells = Cells {
            row,
            row_number,
            columns,
            errors: Vec::new(),
        };

        let incident_id = cells.required_text(Field::IncidentId);
        let report_date = cells.required_date(Field::ReportDate);
        let priority = cells.priority();
        let brief_description = cells.required_text(Field::BriefDescription);
        let application_name = cells.required_text(Field::ApplicationName);
        let resolution_group = cells.required_text(Field::ResolutionGroup);
        let resolve_date = cells.optional_date(Field::ResolveDate);
        let last_resolve_date = cells.optional_date(Field::LastResolveDate);

        if let (Some(reported), Some(resolved)) = (report_date, resolve_date) {
            if resolved < reported {
                cells.error(
                    ValidationKind::InvalidValue,
                    Field::ResolveDate,
                    "resolve date cannot be before report date",
                );
            }
        }

        let (Some(report_date), Some(priority)) = (report_date, priority) else {
            return Err(cells.errors);
        };
        if !cells.errors.is_empty() {
            return Err(cells.errors);
        }

        let mut record = IncidentRecord::new(incident_id, report_date);
        record.source_row = row_number;
        record.priority = priority;
        record.brief_description = brief_description;
        record.application_name = application_name;
        record.resolution_group = resolution_group;
        record.resolve_date = resolve_date;
        record.last_resolve_date = last_resolve_date;
        record.description = cells.optional_text(Field::Description).unwrap_or_default();
        record.resolved_person = cells.optional_text(Field::ResolvedPerson);
        record.category = cells.optional_text(Field::Category);
        record.subcategory = cells.optional_text(Field::Subcategory);
        record.status = cells.optional_text(Field::Status);
        record.root_cause = cells.optional_text(Field::RootCause);
        record.resolution_notes = cells.optional_text(Field::ResolutionNotes);
        record.compute_resolution_hours();

        Ok(record)
    }
}

/// Per-row cursor that accumulates field errors as cells are read.
struct Cells<'a> {
    row: &'a [String],
    row_number: usize,
    columns: &'a ColumnMap,
    errors: Vec<ValidationError>,
}

impl Cells<'_> {
    fn error(&mut self, kind: ValidationKind, field: Field, message: &str) {
        let value = self.columns.raw(self.row, field).to_string();
        self.errors.push(
            ValidationError::new(kind, field.name(), value, message).at_row(self.row_number),
        );
    }

    fn required_text(&mut self, field: Field) -> String {
        match self.columns.cell(self.row, field) {
            Some(value) => value.to_string(),
            None => {
                self.error(
                    ValidationKind::RequiredFieldMissing,
                    field,
                    "required value is empty",
                );
                String::new()
            }
        }
    }

    fn optional_text(&self, field: Field) -> Option<String> {
        self.columns.cell(self.row, field).map(str::to_string)
    }

    fn required_date(&mut self, field: Field) -> Option<NaiveDateTime> {
        if self.columns.cell(self.row, field).is_none() {
            self.error(
                ValidationKind::RequiredFieldMissing,
                field,
                "required value is empty",
            );
            return None;
        }
        self.optional_date(field)
    }

    fn optional_date(&mut self, field: Field) -> Option<NaiveDateTime> {
        let raw = self.columns.cell(self.row, field)?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            self.error(
                ValidationKind::InvalidFormat,
                field,
                "unrecognized date format",
            );
        }
        parsed
    }

    fn priority(&mut self) -> Option<Priority> {
        let Some(raw) = self.columns.cell(self.row, Field::Priority) else {
            self.error(
                ValidationKind::RequiredFieldMissing,
                Field::Priority,
                "required value is empty",
            );
            return None;
        };
        let parsed = Priority::parse(raw);
        if parsed.is_none() {
            self.error(
                ValidationKind::InvalidValue,
                Field::Priority,
                "priority must be one of P1, P2, P3, P4",
            );
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn columns() -> ColumnMap {
        ColumnMap::from_header(&strings(&[
            "Incident ID",
            "Report Date",
            "Resolve Date",
            "Priority",
            "Brief Description",
            "Description",
            "Application Name",
            "Resolution Group",
            "Root Cause",
        ]))
    }

    #[test]
    fn test_parses_valid_row() {
        let row = strings(&[
            "INC001",
            "2024-03-01 08:00:00",
            "2024-03-01 10:30:00",
            "p2",
            "Disk full",
            "Cleaned temp files",
            "Billing",
            "Infra Team",
            "",
        ]);
        let record = RowParser::new().parse(&row, 4, &columns()).unwrap();

        assert_eq!(record.incident_id, "INC001");
        assert_eq!(record.source_row, 4);
        assert_eq!(record.priority, Priority::P2);
        assert_eq!(record.description, "Cleaned temp files");
        assert_eq!(record.resolution_hours, Some(2));
        assert_eq!(record.root_cause, None);
        assert_eq!(
            record.report_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_unresolved_row_has_no_duration() {
        let row = strings(&[
            "INC002", "2024-03-01", "", "P4", "Slow UI", "", "CRM", "Apps", "",
        ]);
        let record = RowParser::new().parse(&row, 1, &columns()).unwrap();
        assert_eq!(record.resolve_date, None);
        assert_eq!(record.resolution_hours, None);
    }

    #[test]
    fn test_collects_every_field_error() {
        let row = strings(&[
            "", "not a date", "", "P9", "", "", "CRM", "Apps", "",
        ]);
        let errors = RowParser::new().parse(&row, 7, &columns()).unwrap_err();

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["incident_id", "report_date", "priority", "brief_description"]
        );
        assert!(errors.iter().all(|e| e.row == 7));
        assert_eq!(errors[1].kind, ValidationKind::InvalidFormat);
        assert_eq!(errors[1].value, "not a date");
        assert_eq!(errors[2].kind, ValidationKind::InvalidValue);
    }

    #[test]
    fn test_resolve_before_report_is_rejected() {
        let row = strings(&[
            "INC003",
            "2024-03-02",
            "2024-03-01",
            "P1",
            "Outage",
            "",
            "Web",
            "Ops",
            "",
        ]);
        let errors = RowParser::new().parse(&row, 2, &columns()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "resolve_date");
        assert_eq!(errors[0].kind, ValidationKind::InvalidValue);
    }

    #[test]
    fn test_missing_column_fails_every_row() {
        let columns = ColumnMap::from_header(&strings(&["Incident ID", "Report Date"]));
        let row = strings(&["INC004", "2024-03-01"]);
        let errors = RowParser::new().parse(&row, 3, &columns).unwrap_err();

        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationKind::RequiredFieldMissing && e.row == 3));
    }

    #[test]
    fn test_short_row_reports_missing_values() {
        let row = strings(&["INC005", "2024-03-01", "", "P3"]);
        let errors = RowParser::new().parse(&row, 1, &columns()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["brief_description", "application_name", "resolution_group"]
        );
    }
}
