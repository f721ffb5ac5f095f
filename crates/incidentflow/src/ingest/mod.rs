//! Spreadsheet ingestion: reading, column resolution and concurrent row parsing.

pub mod columns;
pub mod concurrent;
pub mod dates;
pub mod parser;
pub mod reader;
pub mod xlsx;

pub use columns::{normalize_header, ColumnMap, Field};
pub use concurrent::{ConcurrentIngester, IngestReport};
pub use dates::parse_timestamp;
pub use parser::{RowOutcome, RowParser};
pub use reader::{split_header, CsvSheetReader, SheetFormat, SheetReader, SpreadsheetReader};
pub use xlsx::XlsxSheetReader;
