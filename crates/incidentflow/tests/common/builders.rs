//! Builders for incident spreadsheets, as CSV text or xlsx workbooks.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

pub const HEADER: [&str; 10] = [
    "Incident ID",
    "Report Date",
    "Resolve Date",
    "Brief Description",
    "Description",
    "Application",
    "Resolution Group",
    "Priority",
    "Resolution Notes",
    "Root Cause",
];

/// One spreadsheet row with sensible defaults for every required column.
#[derive(Debug, Clone)]
pub struct IncidentRow {
    id: String,
    reported: String,
    resolved: String,
    brief: String,
    description: String,
    application: String,
    group: String,
    priority: String,
    notes: String,
    root_cause: String,
}

impl IncidentRow {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            reported: "2024-03-01 09:00".to_string(),
            resolved: String::new(),
            brief: "Printer jam".to_string(),
            description: "Paper stuck in tray".to_string(),
            application: "Office".to_string(),
            group: "Desk".to_string(),
            priority: "P3".to_string(),
            notes: String::new(),
            root_cause: String::new(),
        }
    }

    pub fn reported(mut self, value: &str) -> Self {
        self.reported = value.to_string();
        self
    }

    pub fn resolved(mut self, value: &str) -> Self {
        self.resolved = value.to_string();
        self
    }

    pub fn brief(mut self, value: &str) -> Self {
        self.brief = value.to_string();
        self
    }

    pub fn description(mut self, value: &str) -> Self {
        self.description = value.to_string();
        self
    }

    pub fn application(mut self, value: &str) -> Self {
        self.application = value.to_string();
        self
    }

    pub fn group(mut self, value: &str) -> Self {
        self.group = value.to_string();
        self
    }

    pub fn priority(mut self, value: &str) -> Self {
        self.priority = value.to_string();
        self
    }

    pub fn notes(mut self, value: &str) -> Self {
        self.notes = value.to_string();
        self
    }

    pub fn root_cause(mut self, value: &str) -> Self {
        self.root_cause = value.to_string();
        self
    }

    fn cells(&self) -> [&str; 10] {
        [
            &self.id,
            &self.reported,
            &self.resolved,
            &self.brief,
            &self.description,
            &self.application,
            &self.group,
            &self.priority,
            &self.notes,
            &self.root_cause,
        ]
    }
}

/// Collects rows and renders them with the standard header.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    rows: Vec<IncidentRow>,
}

impl SheetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, row: IncidentRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = IncidentRow>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn build(&self) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER).unwrap();
        for row in &self.rows {
            writer.write_record(row.cells()).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    /// A single-sheet workbook. Numeric cells are written as numbers (so a
    /// report date like `45352.375` is a spreadsheet serial), the rest as
    /// inline strings.
    pub fn build_xlsx(&self) -> Vec<u8> {
        let mut sheet = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        let header = HEADER.map(str::to_string);
        let rows = std::iter::once(header.to_vec())
            .chain(self.rows.iter().map(|r| r.cells().map(str::to_string).to_vec()));
        for (r, cells) in rows.enumerate() {
            sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in cells.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                if value.parse::<f64>().is_ok() {
                    sheet.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value));
                } else {
                    sheet.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        reference,
                        escape_xml(value)
                    ));
                }
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("xl/worksheets/sheet1.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `count` rows where every fifth has an unparseable report date.
pub fn mixed_rows(count: usize) -> Vec<IncidentRow> {
    (1..=count)
        .map(|i| {
            let row = IncidentRow::new(&format!("INC{:04}", i))
                .brief(&format!("Ticket {}", i))
                .resolved("2024-03-01 10:00");
            if i % 5 == 0 {
                row.reported("someday")
            } else {
                row
            }
        })
        .collect()
}
