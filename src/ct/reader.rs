//! CT read path (`spec.md` §4.3).

use super::{HEADER_END, MAGIC};
use crate::crc::crc16_xmodem;
use crate::error::CtFormatError;
use crate::primitives::CtReader;
use crate::table::{Cell, Column, Table, TypeCode};

/// Parse a complete CT byte buffer into a [`Table`].
///
/// Succeeds only if every step in `spec.md` §4.3 succeeds, in order:
/// magic, timestamp, header padding, schema, row body, checksum, and a
/// check that no bytes remain after the checksum.
pub fn read_ct(data: &[u8]) -> Result<Table, CtFormatError> {
    let mut r = CtReader::new(data);

    let magic = r.read_header_string("magic")?;
    if magic != MAGIC {
        return Err(CtFormatError::BadMagic);
    }

    let timestamp = r.read_header_string("timestamp")?;

    r.skip_padding_to(HEADER_END)?;

    let column_count = r.read_u32("column_count")?;
    let mut names = Vec::with_capacity(column_count as usize);
    for _ in 0..column_count {
        names.push(r.read_body_string("column_name")?);
    }

    let type_count = r.read_u32("type_count")?;
    if type_count != column_count {
        return Err(CtFormatError::SchemaMismatch { column_count, type_count });
    }

    let mut types = Vec::with_capacity(type_count as usize);
    for _ in 0..type_count {
        let code = r.read_u32("type_code")?;
        types.push(TypeCode::from_wire(code).ok_or(CtFormatError::UnknownType(code))?);
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(types.into_iter())
        .map(|(name, type_code)| Column { name, type_code })
        .collect();

    let row_count = r.read_u32("row_count")?;

    let row_start = r.position();
    let mut rows = Vec::with_capacity(row_count as usize);
    for _ in 0..row_count {
        let mut row = Vec::with_capacity(columns.len());
        for col in &columns {
            row.push(read_cell(&mut r, col.type_code)?);
        }
        rows.push(row);
    }
    let row_end = r.position();

    let stored_crc = r.read_u16("checksum")?;
    let computed_crc = crc16_xmodem(&data[row_start..row_end]);
    if stored_crc != computed_crc {
        return Err(CtFormatError::BadChecksum { stored: stored_crc, computed: computed_crc });
    }

    if r.remaining() != 0 {
        return Err(CtFormatError::TrailingBytes(r.remaining()));
    }

    Table::new(timestamp, columns, rows)
}

fn read_cell(r: &mut CtReader, type_code: TypeCode) -> Result<Cell, CtFormatError> {
    Ok(match type_code {
        TypeCode::Byte => Cell::Byte(r.read_u8("cell:BYTE")?),
        TypeCode::Short => Cell::Short(r.read_i16("cell:SHORT")?),
        TypeCode::Word => Cell::Word(r.read_u16("cell:WORD")?),
        TypeCode::Int => Cell::Int(r.read_i32("cell:INT")?),
        TypeCode::Dword => Cell::Dword(r.read_u32("cell:DWORD")?),
        TypeCode::DwordHex => Cell::DwordHex(r.read_u32("cell:DWORD_HEX")?),
        TypeCode::String => Cell::String(r.read_body_string("cell:STRING")?),
        TypeCode::Float => Cell::Float(r.read_f32("cell:FLOAT")?),
        TypeCode::Int64 => Cell::Int64(r.read_u64("cell:INT64")?),
        // Any nonzero byte is accepted and normalized to true (spec.md §4.4).
        TypeCode::Bool => Cell::Bool(r.read_u8("cell:BOOL")? != 0),
    })
}
