//! Unified error type for the CT/XLSX codec.
//!
//! Each component that has its own natural failure domain gets a focused
//! error type; this module folds them into one [`CtError`] so callers at
//! the driver/CLI boundary have a single type to match on.

use thiserror::Error;

/// Errors from the CT binary codec (read and write paths).
#[derive(Error, Debug)]
pub enum CtFormatError {
    /// The first 16 bytes did not decode to the `RO2SEC!` magic.
    #[error("bad magic: expected 'RO2SEC!'")]
    BadMagic,

    /// The timestamp (or, on write, the column/type region) pushed the
    /// cursor past the fixed header offset `0x40`.
    #[error("header overflow: timestamp does not fit before offset 0x40")]
    HeaderOverflow,

    /// The timestamp alone reached or exceeded offset `0x40` while writing.
    #[error("timestamp too long: does not fit in the 0x40-byte header")]
    TimestampTooLong,

    /// `type_count != column_count`.
    #[error("schema mismatch: type_count {type_count} != column_count {column_count}")]
    SchemaMismatch { column_count: u32, type_count: u32 },

    /// A type code outside the table in §6, or an XLSX type name that
    /// does not name a known type.
    #[error("unknown type code {0}")]
    UnknownType(u32),

    /// Stored CRC disagreed with the computed CRC over the row region.
    #[error("bad checksum: stored {stored:#06x} != computed {computed:#06x}")]
    BadChecksum { stored: u16, computed: u16 },

    /// Bytes remained in the stream after the checksum field.
    #[error("trailing bytes after checksum: {0} byte(s) remaining")]
    TrailingBytes(usize),

    /// A numeric cell value did not fit its column's declared type.
    #[error("value {value} out of range for type {type_name}")]
    ValueOutOfRange { value: String, type_name: &'static str },

    /// A STRING cell's UTF-16 code-unit length exceeded `2^32 - 1`.
    #[error("string too long: {0} UTF-16 code units")]
    StringTooLong(usize),

    /// The byte stream ended before a field could be fully read.
    #[error("unexpected end of input reading {field} (need {needed} more byte(s))")]
    UnexpectedEof { field: &'static str, needed: usize },

    /// A row did not have exactly one cell per column, or a cell's tag
    /// did not match its column's type code.
    #[error("row/column shape invariant violated: {0}")]
    InvalidShape(String),

    /// An empty column name, or a timestamp containing an embedded NUL.
    #[error("invalid table metadata: {0}")]
    InvalidMetadata(String),
}

/// Errors from the XLSX side of the codec.
#[derive(Error, Debug)]
pub enum XlsxFormatError {
    /// Underlying I/O error while building the ZIP container in memory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying ZIP container error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Underlying XML parse/write error.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A required part (e.g. `xl/workbook.xml`) was missing from the archive.
    #[error("missing part: {0}")]
    MissingPart(String),

    /// Row 1's type name did not match a known CT type.
    #[error("unknown type name {0:?} in type row")]
    UnknownTypeName(String),

    /// A data cell could not be coerced to its column's declared type.
    #[error("cell at row {row}, column {col} ({type_name}) has invalid content: {detail}")]
    InvalidCell { row: usize, col: usize, type_name: &'static str, detail: String },

    /// The sheet's type row and header row disagree on column count, or a
    /// data row could not be read against the declared schema.
    #[error("malformed sheet: {0}")]
    MalformedSheet(String),

    /// The workbook had no usable sheet.
    #[error("workbook has no sheets")]
    NoSheets,

    /// The fully parsed table violated a `Table` invariant (empty column
    /// name, embedded NUL in timestamp, mismatched row shape).
    #[error(transparent)]
    Table(#[from] CtFormatError),
}

/// Errors from the conversion driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The input path's extension was neither `.ct` nor `.xlsx`, and it
    /// was not a directory.
    #[error("unsupported extension for path {0:?}")]
    UnsupportedExtension(std::path::PathBuf),

    /// The path did not exist or was not readable as a file/directory.
    #[error("path not found: {0:?}")]
    PathNotFound(std::path::PathBuf),
}

/// Top-level error type returned by every public entry point in this crate.
#[derive(Error, Debug)]
pub enum CtError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ct(#[from] CtFormatError),

    #[error(transparent)]
    Xlsx(#[from] XlsxFormatError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CtError>;
