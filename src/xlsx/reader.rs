//! XLSX read path (`spec.md` §4.5).
//!
//! Unzips the workbook and reads sheet 1 through the fixed three-row
//! convention (type row, header row, data rows), plus the `CT_Timestamp`
//! custom property. Grounded in `daemonp-batdoc::xlsx`'s walk of a
//! worksheet (`parse_xlsx`, `discover_sheets`, `parse_shared_strings`,
//! `parse_sheet_xml`) — minus the markdown/plain-text rendering and date
//! heuristics that module exists for, which this codec has no use for.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::ZipArchive;

use crate::error::XlsxFormatError;
use crate::table::{Cell, Column, Table, TypeCode};
use crate::xlsx::xml_util::{col_ref_to_index, get_attr, parse_rels_xml};

const CUSTOM_PROPS_PART: &str = "docProps/custom.xml";
const CT_TIMESTAMP_PROP: &str = "CT_Timestamp";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Parse a complete XLSX byte buffer into a [`Table`] (`spec.md` §4.5
/// "Reading XLSX → Table").
pub fn read_xlsx(data: &[u8]) -> Result<Table, XlsxFormatError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let timestamp = read_custom_timestamp(&mut archive).unwrap_or_default();
    let shared_strings = read_shared_strings(&mut archive);

    let sheet_path = first_sheet_path(&mut archive)?;
    let sheet_xml = read_part(&mut archive, &sheet_path)?;

    let sparse_rows = parse_sheet_rows(&sheet_xml, &shared_strings);
    build_table(timestamp, &sparse_rows)
}

// ── Assembling the Table ─────────────────────────────────────────────

fn build_table(timestamp: String, sparse_rows: &[Vec<(usize, String)>]) -> Result<Table, XlsxFormatError> {
    if sparse_rows.len() < 2 {
        return Err(XlsxFormatError::MalformedSheet(
            "sheet must have a type row and a header row".to_string(),
        ));
    }

    let column_count = row_width(&sparse_rows[0]);
    if row_width(&sparse_rows[1]) != column_count {
        return Err(XlsxFormatError::MalformedSheet(
            "type row and header row disagree on column count".to_string(),
        ));
    }

    let type_row = densify(&sparse_rows[0], column_count);
    let name_row = densify(&sparse_rows[1], column_count);

    let mut columns = Vec::with_capacity(column_count);
    for (name, type_name) in name_row.into_iter().zip(type_row.into_iter()) {
        let type_code = TypeCode::from_name(type_name.trim())
            .ok_or_else(|| XlsxFormatError::UnknownTypeName(type_name.clone()))?;
        columns.push(Column { name, type_code });
    }

    let mut rows = Vec::with_capacity(sparse_rows.len().saturating_sub(2));
    for (row_idx, sparse_row) in sparse_rows[2..].iter().enumerate() {
        let dense = densify(sparse_row, column_count);
        let mut row = Vec::with_capacity(column_count);
        for (col_idx, (text, col)) in dense.into_iter().zip(columns.iter()).enumerate() {
            row.push(parse_cell(&text, col.type_code).map_err(|detail| {
                XlsxFormatError::InvalidCell {
                    row: row_idx,
                    col: col_idx,
                    type_name: col.type_code.name(),
                    detail,
                }
            })?);
        }
        rows.push(row);
    }

    Table::new(timestamp, columns, rows).map_err(XlsxFormatError::from)
}

fn row_width(row: &[(usize, String)]) -> usize {
    row.iter().map(|&(col, _)| col + 1).max().unwrap_or(0)
}

fn densify(row: &[(usize, String)], width: usize) -> Vec<String> {
    let mut dense = vec![String::new(); width];
    for (col, text) in row {
        if *col < width {
            dense[*col] = text.clone();
        }
    }
    dense
}

/// Coerce one XLSX cell's resolved text into a typed [`Cell`] per the
/// column's declared type (`spec.md` §4.5).
fn parse_cell(text: &str, type_code: TypeCode) -> Result<Cell, String> {
    match type_code {
        TypeCode::String => Ok(Cell::String(text.to_string())),
        TypeCode::Float => text
            .trim()
            .parse::<f32>()
            .map(Cell::Float)
            .map_err(|e| format!("{e}")),
        TypeCode::Bool => parse_bool(text).map(Cell::Bool),
        TypeCode::DwordHex => parse_dword_hex(text),
        TypeCode::Byte
        | TypeCode::Short
        | TypeCode::Word
        | TypeCode::Int
        | TypeCode::Dword
        | TypeCode::Int64 => {
            let value = parse_integer(text)?;
            Cell::from_integer(type_code, value).map_err(|e| e.to_string())
        },
    }
}

fn parse_bool(text: &str) -> Result<bool, String> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("TRUE") || trimmed == "1" {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("FALSE") || trimmed == "0" {
        Ok(false)
    } else {
        Err(format!("{trimmed:?} is not a recognized boolean"))
    }
}

fn parse_dword_hex(text: &str) -> Result<Cell, String> {
    let trimmed = text.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16)
            .map(Cell::DwordHex)
            .map_err(|e| format!("{e}"));
    }
    let value = parse_integer(trimmed)?;
    Cell::from_integer(TypeCode::DwordHex, value).map_err(|e| e.to_string())
}

/// Parse an integer cell's textual form. Spreadsheet numbers are stored
/// without a guaranteed integer representation, so an integral float
/// (e.g. `"42.0"`) is accepted alongside a plain integer literal.
fn parse_integer(text: &str) -> Result<i128, String> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i128>() {
        return Ok(v);
    }
    let f: f64 = trimmed
        .parse()
        .map_err(|_| format!("{trimmed:?} is not a number"))?;
    if f.fract() != 0.0 {
        return Err(format!("{trimmed:?} is not an integer"));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(f as i128)
}

// ── Sheet XML parsing ─────────────────────────────────────────────────

/// Parse every `<row>` element into its `(column_index, text)` cells, in
/// document order. One entry is produced per `<row>` even when it has no
/// cells, so row count can be recovered even for a zero-column table.
fn parse_sheet_rows(xml: &str, shared_strings: &[String]) -> Vec<Vec<(usize, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"row" => {
                rows.push(parse_row(&mut reader, shared_strings));
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"row" => {
                rows.push(Vec::new());
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }

    rows
}

fn parse_row(reader: &mut Reader<&[u8]>, shared_strings: &[String]) -> Vec<(usize, String)> {
    let mut cells = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"c" => {
                let col_idx = get_attr(e, b"r").as_deref().map_or(cells.len(), col_ref_to_index);
                let cell_type = get_attr(e, b"t").unwrap_or_default();
                let value = parse_cell_content(reader, &cell_type, shared_strings);
                cells.push((col_idx, value));
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"c" => {
                let col_idx = get_attr(e, b"r").as_deref().map_or(cells.len(), col_ref_to_index);
                cells.push((col_idx, String::new()));
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"row" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }

    cells
}

fn parse_cell_content(reader: &mut Reader<&[u8]>, cell_type: &str, shared_strings: &[String]) -> String {
    let mut raw_value = String::new();
    let mut inline_text: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"v" => {
                    if let Ok(Event::Text(t)) = reader.read_event() {
                        if let Ok(s) = t.unescape() {
                            raw_value = s.into_owned();
                        }
                    }
                },
                b"is" => inline_text = Some(parse_inline_string(reader)),
                _ => {},
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"c" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }

    match cell_type {
        "s" => raw_value
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx).cloned())
            .unwrap_or_default(),
        "inlineStr" => inline_text.unwrap_or_default(),
        _ => raw_value,
    }
}

fn parse_inline_string(reader: &mut Reader<&[u8]>) -> String {
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(ref t)) => {
                if let Ok(s) = t.unescape() {
                    text.push_str(&s);
                }
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"is" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }

    text
}

// ── Part discovery ─────────────────────────────────────────────────────

fn read_part(archive: &mut Archive, name: &str) -> Result<String, XlsxFormatError> {
    let mut s = String::new();
    archive
        .by_name(name)
        .map_err(|_| XlsxFormatError::MissingPart(name.to_string()))?
        .read_to_string(&mut s)?;
    Ok(s)
}

fn read_part_optional(archive: &mut Archive, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut s = String::new();
    entry.read_to_string(&mut s).ok()?;
    Some(s)
}

fn first_sheet_path(archive: &mut Archive) -> Result<String, XlsxFormatError> {
    let workbook_xml = read_part(archive, "xl/workbook.xml")?;
    let rid = first_sheet_rid(&workbook_xml).ok_or(XlsxFormatError::NoSheets)?;

    let rels_xml = read_part(archive, "xl/_rels/workbook.xml.rels")?;
    let rels = parse_rels_xml(&rels_xml);
    let target = rels.get(&rid).ok_or(XlsxFormatError::NoSheets)?;

    Ok(if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else {
        format!("xl/{target}")
    })
}

fn first_sheet_rid(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                return get_attr(e, b"r:id");
            },
            Ok(Event::Eof) | Err(_) => return None,
            _ => {},
        }
    }
}

fn read_shared_strings(archive: &mut Archive) -> Vec<String> {
    match read_part_optional(archive, "xl/sharedStrings.xml") {
        Some(xml) => parse_shared_strings_xml(&xml),
        None => Vec::new(),
    }
}

fn parse_shared_strings_xml(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut in_si = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"si" => {
                in_si = true;
                current.clear();
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current));
                in_si = false;
            },
            Ok(Event::Text(ref t)) if in_si => {
                if let Ok(s) = t.unescape() {
                    current.push_str(&s);
                }
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }

    strings
}

fn read_custom_timestamp(archive: &mut Archive) -> Option<String> {
    let xml = read_part_optional(archive, CUSTOM_PROPS_PART)?;
    parse_custom_timestamp(&xml)
}

fn parse_custom_timestamp(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut in_target_property = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"property" => {
                in_target_property = get_attr(e, b"name").as_deref() == Some(CT_TIMESTAMP_PROP);
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"property" => {
                in_target_property = false;
            },
            Ok(Event::Start(ref e)) if in_target_property && e.local_name().as_ref() == b"lpwstr" => {
                if let Ok(Event::Text(t)) = reader.read_event() {
                    if let Ok(s) = t.unescape() {
                        return Some(s.into_owned());
                    }
                }
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_text_and_digits() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("false"), Ok(false));
        assert_eq!(parse_bool("1"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn parse_dword_hex_accepts_0x_prefix_case_insensitive() {
        assert_eq!(parse_dword_hex("0xDEADBEEF"), Ok(Cell::DwordHex(0xDEAD_BEEF)));
        assert_eq!(parse_dword_hex("0Xdeadbeef"), Ok(Cell::DwordHex(0xDEAD_BEEF)));
    }

    #[test]
    fn parse_integer_accepts_integral_float_text() {
        assert_eq!(parse_integer("42"), Ok(42));
        assert_eq!(parse_integer("42.0"), Ok(42));
        assert!(parse_integer("42.5").is_err());
    }

    #[test]
    fn parse_sheet_rows_counts_empty_rows() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <sheetData>
                <row r="1"/>
                <row r="2"/>
            </sheetData>
        </worksheet>"#;
        let rows = parse_sheet_rows(xml, &[]);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_empty());
    }

    #[test]
    fn parse_shared_strings_and_sheet() {
        let shared = vec!["DWORD".to_string(), "Id".to_string()];
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
            <sheetData>
                <row r="1"><c r="A1" t="s"><v>0</v></c></row>
                <row r="2"><c r="A2" t="s"><v>1</v></c></row>
                <row r="3"><c r="A3"><v>1</v></c></row>
            </sheetData>
        </worksheet>"#;
        let sparse = parse_sheet_rows(xml, &shared);
        let table = build_table("2024-01-01 00:00:00".to_string(), &sparse).unwrap();
        assert_eq!(table.columns[0].name, "Id");
        assert_eq!(table.columns[0].type_code, TypeCode::Dword);
        assert_eq!(table.rows[0][0], Cell::Dword(1));
    }

    #[test]
    fn custom_timestamp_roundtrip_through_xml() {
        let xml = r#"<?xml version="1.0"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="CT_Timestamp"><vt:lpwstr>2024-01-01 00:00:00</vt:lpwstr></property>
</Properties>"#;
        assert_eq!(parse_custom_timestamp(xml), Some("2024-01-01 00:00:00".to_string()));
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        let sparse = vec![
            vec![(0usize, "NOT_A_TYPE".to_string())],
            vec![(0usize, "Id".to_string())],
        ];
        assert!(matches!(
            build_table("t".to_string(), &sparse),
            Err(XlsxFormatError::UnknownTypeName(_))
        ));
    }

    #[test]
    fn mismatched_header_widths_rejected() {
        let sparse = vec![
            vec![(0usize, "DWORD".to_string()), (1usize, "DWORD".to_string())],
            vec![(0usize, "Id".to_string())],
        ];
        assert!(matches!(
            build_table("t".to_string(), &sparse),
            Err(XlsxFormatError::MalformedSheet(_))
        ));
    }
}
