//! Raw spreadsheet readers.

use std::path::Path;

use csv::{ReaderBuilder, Trim};

use super::xlsx::XlsxSheetReader;
use crate::error::IngestError;

/// Yields every row of a sheet as string cells; row 0 is the header.
pub trait SheetReader: Send + Sync {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, IngestError>;
}

/// Delimited-text reader backed by the `csv` crate.
#[derive(Debug, Clone, Copy)]
pub struct CsvSheetReader {
    delimiter: u8,
}

impl CsvSheetReader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvSheetReader {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl SheetReader for CsvSheetReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, IngestError> {
        let read_error = |source| IngestError::ReadFile {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .from_path(path)
            .map_err(read_error)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_error)?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(IngestError::MissingHeader(path.to_path_buf()));
        }

        log::debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }
}

/// Spreadsheet formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Delimited,
    Workbook,
}

impl SheetFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "xlsx" | "xlsm" => Some(Self::Workbook),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Routes each file to the reader for its extension.
#[derive(Debug, Clone, Copy)]
pub struct SpreadsheetReader {
    delimited: CsvSheetReader,
    workbook: XlsxSheetReader,
}

impl SpreadsheetReader {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimited: CsvSheetReader::new(delimiter),
            workbook: XlsxSheetReader::new(),
        }
    }
}

impl Default for SpreadsheetReader {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl SheetReader for SpreadsheetReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, IngestError> {
        match SheetFormat::from_path(path) {
            Some(SheetFormat::Delimited) => self.delimited.read_rows(path),
            Some(SheetFormat::Workbook) => self.workbook.read_rows(path),
            None => Err(IngestError::UnsupportedFormat(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )),
        }
    }
}

/// Splits the header row off a sheet.
pub fn split_header(mut rows: Vec<Vec<String>>) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    if rows.is_empty() {
        return None;
    }
    let header = rows.remove(0);
    Some((header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_trimmed_rows() {
        let file = write_file("Incident ID , Priority\n INC1 ,P1\nINC2,\"P2\"\n");
        let rows = CsvSheetReader::default().read_rows(file.path()).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Incident ID".to_string(), "Priority".to_string()],
                vec!["INC1".to_string(), "P1".to_string()],
                vec!["INC2".to_string(), "P2".to_string()],
            ]
        );
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let file = write_file("a,b,c\n1\n1,2,3,4\n");
        let rows = CsvSheetReader::default().read_rows(file.path()).unwrap();
        assert_eq!(rows[1].len(), 1);
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn test_custom_delimiter() {
        let file = write_file("a;b\n1;2\n");
        let rows = CsvSheetReader::new(b';').read_rows(file.path()).unwrap();
        assert_eq!(rows[1], vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let file = write_file("");
        let err = CsvSheetReader::default()
            .read_rows(file.path())
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingHeader(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvSheetReader::default()
            .read_rows(&dir.path().join("absent.csv"))
            .unwrap_err();
        assert!(matches!(err, IngestError::ReadFile { .. }));
    }

    #[test]
    fn test_split_header() {
        let (header, rows) = split_header(vec![vec!["h".to_string()]]).unwrap();
        assert_eq!(header, vec!["h".to_string()]);
        assert!(rows.is_empty());
        assert!(split_header(Vec::new()).is_none());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SheetFormat::from_extension("CSV"), Some(SheetFormat::Delimited));
        assert_eq!(SheetFormat::from_extension("xlsx"), Some(SheetFormat::Workbook));
        assert_eq!(SheetFormat::from_extension("xls"), None);
        assert_eq!(SheetFormat::from_path(Path::new("a_b.XLSM")), Some(SheetFormat::Workbook));
        assert_eq!(SheetFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_routes_by_extension() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(b"a;b\n1;2\n").unwrap();
        let rows = SpreadsheetReader::new(b';').read_rows(file.path()).unwrap();
        assert_eq!(rows[1], vec!["1".to_string(), "2".to_string()]);

        // Delimited text behind an .xlsx name goes to the workbook reader.
        let mut fake = tempfile::NamedTempFile::with_suffix(".xlsx").unwrap();
        fake.write_all(b"a,b\n").unwrap();
        let err = SpreadsheetReader::default().read_rows(fake.path()).unwrap_err();
        assert!(matches!(err, IngestError::Workbook { .. }));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = SpreadsheetReader::default()
            .read_rows(Path::new("incidents.xls"))
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(ext) if ext == "xls"));
    }
}
