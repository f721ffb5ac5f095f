//! `.xlsx` workbooks, read from the package XML of the first worksheet.
//!
//! Cell values come back as text: shared and inline strings as written,
//! numbers (including date serials) as their stored decimal form, booleans
//! as `TRUE`/`FALSE`.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use super::reader::SheetReader;
use crate::error::IngestError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const DEFAULT_SHEET_PART: &str = "xl/worksheets/sheet1.xml";

#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSheetReader;

impl XlsxSheetReader {
    pub fn new() -> Self {
        Self
    }
}

impl SheetReader for XlsxSheetReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, IngestError> {
        let file = File::open(path).map_err(|e| IngestError::OpenWorkbook {
            path: path.to_path_buf(),
            source: e,
        })?;
        let invalid = |message: String| IngestError::Workbook {
            path: path.to_path_buf(),
            message,
        };

        let mut archive =
            ZipArchive::new(file).map_err(|e| invalid(format!("not an xlsx package: {}", e)))?;

        let shared = match read_part(&mut archive, SHARED_STRINGS_PART).map_err(invalid)? {
            Some(xml) => parse_shared_strings(&xml).map_err(invalid)?,
            None => Vec::new(),
        };
        let sheet_part = first_sheet_part(&mut archive).map_err(invalid)?;
        let sheet = read_part(&mut archive, &sheet_part)
            .map_err(invalid)?
            .ok_or_else(|| invalid(format!("worksheet {} is missing", sheet_part)))?;
        let rows = parse_sheet(&sheet, &shared).map_err(invalid)?;

        if rows.is_empty() {
            return Err(IngestError::MissingHeader(path.to_path_buf()));
        }

        log::debug!(
            "Read {} rows from {} ({})",
            rows.len(),
            path.display(),
            sheet_part
        );
        Ok(rows)
    }
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, String> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(format!("cannot open {}: {}", name, e)),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| format!("cannot read {}: {}", name, e))?;
    Ok(Some(xml))
}

/// Resolves the first `<sheet>` of the workbook through its relationship id.
/// Packages without a workbook part fall back to `sheet1.xml`.
fn first_sheet_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, String> {
    let Some(workbook) = read_part(archive, WORKBOOK_PART)? else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };
    let Some(rel_id) = first_element_attr(&workbook, b"sheet", |key| key == b"id")? else {
        return Err("workbook has no sheets".to_string());
    };

    let Some(rels) = read_part(archive, WORKBOOK_RELS_PART)? else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };
    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr(&e, |key| key == b"Id").as_deref() == Some(rel_id.as_str()) {
                    if let Some(target) = attr(&e, |key| key == b"Target") {
                        return Ok(resolve_target(&target));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(format!("no relationship target for sheet {}", rel_id))
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn first_element_attr(
    xml: &str,
    element: &[u8],
    key: impl Fn(&[u8]) -> bool + Copy,
) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == element => {
                return Ok(attr(&e, key));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Attribute value by local name. Package attributes never need unescaping.
fn attr(element: &BytesStart<'_>, key: impl Fn(&[u8]) -> bool) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| key(a.key.local_name().as_ref()))
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn unescaped(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&raw) {
        Ok(text) => text.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

fn entity(name: &[u8]) -> String {
    unescaped(format!("&{};", String::from_utf8_lossy(name)).as_bytes())
}

/// One string per `<si>`, rich-text runs joined, phonetic hints skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_phonetic = false;
    let mut capture = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" => capture = !in_phonetic,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(e) if capture => current.push_str(&unescaped(&e)),
            Event::GeneralRef(e) if capture => current.push_str(&entity(&e)),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                b"t" => capture = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellType {
    Shared,
    Boolean,
    Plain,
}

#[derive(Debug)]
struct Cell {
    column: usize,
    kind: CellType,
    value: String,
}

impl Cell {
    fn from_start(element: &BytesStart<'_>, next_column: usize) -> Self {
        let column = attr(element, |key| key == b"r")
            .and_then(|reference| column_index(&reference))
            .unwrap_or(next_column);
        let kind = match attr(element, |key| key == b"t").as_deref() {
            Some("s") => CellType::Shared,
            Some("b") => CellType::Boolean,
            _ => CellType::Plain,
        };
        Self {
            column,
            kind,
            value: String::new(),
        }
    }

    fn resolve(self, shared: &[String]) -> Result<(usize, String), String> {
        let value = match self.kind {
            CellType::Shared => {
                let index: usize = self
                    .value
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad shared string index '{}'", self.value))?;
                shared
                    .get(index)
                    .cloned()
                    .ok_or_else(|| format!("shared string {} out of range", index))?
            }
            CellType::Boolean if self.value.trim() == "1" => "TRUE".to_string(),
            CellType::Boolean => "FALSE".to_string(),
            CellType::Plain => self.value,
        };
        Ok((self.column, value.trim().to_string()))
    }
}

/// Zero-based column of an `A1`-style reference (`"AB12"` -> 27).
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let number = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1));
    Some(number - 1)
}

fn place(row: &mut Vec<String>, column: usize, value: String) {
    if column >= row.len() {
        row.resize(column, String::new());
        row.push(value);
    } else {
        row[column] = value;
    }
}

/// Rows of the sheet in document order. Gaps between cells become empty
/// strings; rows without any cell are skipped.
fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, String> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<Cell> = None;
    let mut capture = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => cell = Some(Cell::from_start(&e, row.len())),
                b"v" | b"t" if cell.is_some() => capture = true,
                _ => {}
            },
            Event::Text(e) if capture => {
                if let Some(cell) = cell.as_mut() {
                    cell.value.push_str(&unescaped(&e));
                }
            }
            Event::GeneralRef(e) if capture => {
                if let Some(cell) = cell.as_mut() {
                    cell.value.push_str(&entity(&e));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some(done) = cell.take() {
                        let (column, value) = done.resolve(shared)?;
                        place(&mut row, column, value);
                    }
                }
                b"row" if !row.is_empty() => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}
