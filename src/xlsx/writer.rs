//! XLSX write path (`spec.md` §4.5, "Writing Table → XLSX").
//!
//! Hand-builds a minimal OOXML spreadsheet package: `[Content_Types].xml`,
//! package/part relationships, `xl/workbook.xml`, one worksheet using the
//! fixed three-row convention, and a `docProps/custom.xml` custom property
//! carrying the CT timestamp. Grounded in
//! `litchi::ooxml::opc::pkgwriter::ContentTypesItem` (content-types shape,
//! `escape_xml`) and `litchi::ooxml::opc::phys_pkg::PhysPkgWriter::write`
//! (the `start_file` + `Deflated` convention) and
//! `litchi::ooxml::common::properties::DocumentProperties::to_xml` (the
//! escaped-string-building style for a metadata XML part) — generalized
//! down to exactly the parts a single fixed-layout sheet needs. The full
//! `OpcPackage`/`PackURI`/style-sheet machinery those modules build on is
//! unneeded here: this codec never has more than one part of each kind.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::XlsxFormatError;
use crate::table::{Cell, Table};
use crate::xlsx::xml_util::{cell_ref, escape_xml};

const CUSTOM_PROPS_FMTID: &str = "{D5CDD505-2E9C-101B-9397-08002B2CF9AE}";
const CT_TIMESTAMP_PROP: &str = "CT_Timestamp";

/// Serialize a [`Table`] to a complete XLSX byte buffer.
pub fn write_xlsx(table: &Table) -> Result<Vec<u8>, XlsxFormatError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6));

        write_part(&mut zip, options, "[Content_Types].xml", &content_types_xml())?;
        write_part(&mut zip, options, "_rels/.rels", ROOT_RELS_XML)?;
        write_part(&mut zip, options, "xl/workbook.xml", WORKBOOK_XML)?;
        write_part(&mut zip, options, "xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML)?;
        write_part(&mut zip, options, "xl/worksheets/sheet1.xml", &worksheet_xml(table))?;
        write_part(&mut zip, options, "docProps/custom.xml", &custom_props_xml(&table.timestamp))?;

        zip.finish()?;
    }
    Ok(cursor.into_inner())
}

fn write_part<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    content: &str,
) -> Result<(), XlsxFormatError> {
    zip.start_file(name, options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

// ── Fixed parts ─────────────────────────────────────────────────────

const ROOT_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/custom-properties" Target="docProps/custom.xml"/>"#,
    r#"</Relationships>"#,
);

const WORKBOOK_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheets><sheet name="Table" sheetId="1" r:id="rId1"/></sheets>"#,
    r#"</workbook>"#,
);

const WORKBOOK_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"</Relationships>"#,
);

fn content_types_xml() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
        r#"<Override PartName="/docProps/custom.xml" ContentType="application/vnd.openxmlformats-officedocument.custom-properties+xml"/>"#,
        r#"</Types>"#,
    )
    .to_string()
}

/// The CT timestamp round-trips through a single custom document property
/// (`spec.md` §4.5, "The CT timestamp is preserved in the workbook's
/// document-level ... custom-properties channel").
fn custom_props_xml(timestamp: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">"#,
            r#"<property fmtid="{fmtid}" pid="2" name="{name}"><vt:lpwstr>{value}</vt:lpwstr></property>"#,
            r#"</Properties>"#,
        ),
        fmtid = CUSTOM_PROPS_FMTID,
        name = CT_TIMESTAMP_PROP,
        value = escape_xml(timestamp),
    )
}

// ── Worksheet ─────────────────────────────────────────────────────────

fn worksheet_xml(table: &Table) -> String {
    let widths = column_widths(table);
    let mut xml = String::with_capacity(1024 + table.rows.len() * table.columns.len() * 16);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
    xml.push_str(&cols_xml(&widths));
    xml.push_str("<sheetData>");

    xml.push_str(r#"<row r="1">"#);
    for (col_idx, col) in table.columns.iter().enumerate() {
        push_text_cell(&mut xml, col_idx, 0, col.type_code.name());
    }
    xml.push_str("</row>");

    xml.push_str(r#"<row r="2">"#);
    for (col_idx, col) in table.columns.iter().enumerate() {
        push_text_cell(&mut xml, col_idx, 1, &col.name);
    }
    xml.push_str("</row>");

    for (row_idx, row) in table.rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, row_idx + 3));
        for (col_idx, cell) in row.iter().enumerate() {
            push_cell(&mut xml, col_idx, row_idx + 2, cell);
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData>");
    xml.push_str("</worksheet>");
    xml
}

/// Emit one data cell per its declared type (`spec.md` §4.5): numbers for
/// the integer/float types, `0x`-prefixed text for `DWORD_HEX`, text for
/// `STRING`, and literal `TRUE`/`FALSE` text for `BOOL`.
fn push_cell(xml: &mut String, col: usize, row: usize, cell: &Cell) {
    match cell {
        Cell::Byte(_)
        | Cell::Short(_)
        | Cell::Word(_)
        | Cell::Int(_)
        | Cell::Dword(_)
        | Cell::Int64(_)
        | Cell::Float(_) => push_number_cell(xml, col, row, &cell.display_text()),
        Cell::DwordHex(_) => push_text_cell(xml, col, row, &cell.display_text()),
        Cell::String(s) => push_text_cell(xml, col, row, s),
        Cell::Bool(v) => push_text_cell(xml, col, row, if *v { "TRUE" } else { "FALSE" }),
    }
}

fn push_text_cell(xml: &mut String, col: usize, row: usize, text: &str) {
    xml.push_str(&format!(
        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        cell_ref(col, row),
        escape_xml(text)
    ));
}

fn push_number_cell(xml: &mut String, col: usize, row: usize, value: &str) {
    xml.push_str(&format!(r#"<c r="{}"><v>{value}</v></c>"#, cell_ref(col, row)));
}

/// Column widths should be auto-sized (`spec.md` §4.5); approximated as
/// the widest rendered text in each column, across the type row, header
/// row, and every data row, plus a small margin.
fn column_widths(table: &Table) -> Vec<usize> {
    let mut widths: Vec<usize> = table
        .columns
        .iter()
        .map(|col| col.type_code.name().chars().count().max(col.name.chars().count()))
        .collect();

    for row in &table.rows {
        for (col_idx, cell) in row.iter().enumerate() {
            let len = cell.display_text().chars().count();
            if len > widths[col_idx] {
                widths[col_idx] = len;
            }
        }
    }

    widths
}

fn cols_xml(widths: &[usize]) -> String {
    if widths.is_empty() {
        return String::new();
    }
    let mut xml = String::from("<cols>");
    for (i, width) in widths.iter().enumerate() {
        let excel_width = (width + 2).max(8);
        xml.push_str(&format!(
            r#"<col min="{}" max="{}" width="{excel_width}" customWidth="1"/>"#,
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</cols>");
    xml
}
