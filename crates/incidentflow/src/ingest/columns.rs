//! Header resolution: maps spreadsheet column names onto logical fields.

use std::collections::HashMap;

/// A logical incident field that can be read from a spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    IncidentId,
    ReportDate,
    Priority,
    BriefDescription,
    ApplicationName,
    ResolutionGroup,
    Description,
    ResolveDate,
    LastResolveDate,
    ResolvedPerson,
    Category,
    Subcategory,
    Status,
    RootCause,
    ResolutionNotes,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::IncidentId,
        Field::ReportDate,
        Field::Priority,
        Field::BriefDescription,
        Field::ApplicationName,
        Field::ResolutionGroup,
        Field::Description,
        Field::ResolveDate,
        Field::LastResolveDate,
        Field::ResolvedPerson,
        Field::Category,
        Field::Subcategory,
        Field::Status,
        Field::RootCause,
        Field::ResolutionNotes,
    ];

    /// Field name used in validation errors and storage columns.
    pub fn name(self) -> &'static str {
        match self {
            Field::IncidentId => "incident_id",
            Field::ReportDate => "report_date",
            Field::Priority => "priority",
            Field::BriefDescription => "brief_description",
            Field::ApplicationName => "application_name",
            Field::ResolutionGroup => "resolution_group",
            Field::Description => "description",
            Field::ResolveDate => "resolve_date",
            Field::LastResolveDate => "last_resolve_date",
            Field::ResolvedPerson => "resolved_person",
            Field::Category => "category",
            Field::Subcategory => "subcategory",
            Field::Status => "status",
            Field::RootCause => "root_cause",
            Field::ResolutionNotes => "resolution_notes",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            Field::IncidentId
                | Field::ReportDate
                | Field::Priority
                | Field::BriefDescription
                | Field::ApplicationName
                | Field::ResolutionGroup
        )
    }

    /// Accepted header spellings, already normalized.
    fn synonyms(self) -> &'static [&'static str] {
        match self {
            Field::IncidentId => &[
                "incidentid",
                "incidentnumber",
                "incident",
                "id",
                "ticketid",
                "ticketnumber",
                "ticket",
                "number",
            ],
            Field::ReportDate => &[
                "reportdate",
                "reporteddate",
                "reportedon",
                "date",
                "createddate",
                "created",
                "opened",
                "openeddate",
                "opendate",
            ],
            Field::Priority => &["priority", "prio", "severity"],
            Field::BriefDescription => &[
                "briefdescription",
                "shortdescription",
                "summary",
                "title",
                "subject",
            ],
            Field::ApplicationName => &[
                "applicationname",
                "application",
                "app",
                "appname",
                "service",
                "configurationitem",
            ],
            Field::ResolutionGroup => &[
                "resolutiongroup",
                "assignmentgroup",
                "assignedgroup",
                "assignee",
                "assignedto",
                "team",
            ],
            Field::Description => &["description", "desc", "details", "longdescription"],
            Field::ResolveDate => &[
                "resolvedate",
                "resolveddate",
                "resolvedon",
                "resolutiondate",
                "closeddate",
                "closedate",
            ],
            Field::LastResolveDate => &["lastresolvedate", "lastresolveddate"],
            Field::ResolvedPerson => &["resolvedperson", "resolver", "resolvedby"],
            Field::Category => &["category"],
            Field::Subcategory => &["subcategory"],
            Field::Status => &["status", "state"],
            Field::RootCause => &["rootcause", "cause"],
            Field::ResolutionNotes => &[
                "resolutionnotes",
                "resolution",
                "closenotes",
                "closurenotes",
                "worknotes",
            ],
        }
    }

    fn from_header(normalized: &str) -> Option<Field> {
        Self::ALL
            .into_iter()
            .find(|field| field.synonyms().contains(&normalized))
    }
}

/// Lower-cases and drops everything except letters and digits, so
/// `"Incident ID"`, `"incident_id"` and `"Incident-Id"` all compare equal.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolved column positions for one spreadsheet header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: HashMap<Field, usize>,
    missing: Vec<Field>,
}

impl ColumnMap {
    /// Resolves a header row. The first column matching a field wins; later
    /// duplicates are ignored. When no brief-description column exists the
    /// description column stands in for it.
    pub fn from_header(header: &[String]) -> Self {
        let mut indices = HashMap::new();
        for (index, name) in header.iter().enumerate() {
            if let Some(field) = Field::from_header(&normalize_header(name)) {
                indices.entry(field).or_insert(index);
            }
        }

        if !indices.contains_key(&Field::BriefDescription) {
            if let Some(&index) = indices.get(&Field::Description) {
                indices.insert(Field::BriefDescription, index);
            }
        }

        let missing = Field::ALL
            .into_iter()
            .filter(|field| field.is_required() && !indices.contains_key(field))
            .collect();

        Self { indices, missing }
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    /// Required fields with no matching header column.
    pub fn missing_required(&self) -> &[Field] {
        &self.missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Trimmed cell value for `field`, or `None` when the column is unmapped,
    /// the row is short, or the cell is blank.
    pub fn cell<'a>(&self, row: &'a [String], field: Field) -> Option<&'a str> {
        let index = self.index_of(field)?;
        let value = row.get(index)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Raw (untrimmed) cell text, empty when absent. Used for error reporting.
    pub fn raw<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        self.index_of(field)
            .and_then(|index| row.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }
}
