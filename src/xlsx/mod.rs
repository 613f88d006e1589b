//! XLSX codec: a workbook representation of a [`crate::table::Table`] via
//! the fixed three-row convention specified in `spec.md` §4.5 — a type
//! row, a header row, then the data rows.

mod reader;
mod writer;
mod xml_util;

pub use reader::read_xlsx;
pub use writer::write_xlsx;
