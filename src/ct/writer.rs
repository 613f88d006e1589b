//! CT write path (`spec.md` §4.4). Emits exactly the layout the reader in
//! `super::reader` accepts; byte-identical round trip is required for a
//! `Table` that originated from this same writer (`spec.md` §8 property 1).

use super::{HEADER_END, MAGIC};
use crate::crc::crc16_xmodem;
use crate::error::CtFormatError;
use crate::primitives::CtWriter;
use crate::table::{Cell, Table};

/// Serialize a [`Table`] to a complete CT byte buffer.
pub fn write_ct(table: &Table) -> Result<Vec<u8>, CtFormatError> {
    let mut w = CtWriter::new();

    w.write_header_string(MAGIC);
    debug_assert_eq!(w.position(), 16, "magic region must be exactly 16 bytes");

    w.write_header_string(&table.timestamp);
    w.pad_to(HEADER_END)?;

    w.write_u32(table.columns.len() as u32);
    for col in &table.columns {
        w.write_body_string(&col.name)?;
    }

    w.write_u32(table.columns.len() as u32);
    for col in &table.columns {
        w.write_u32(col.type_code.to_wire());
    }

    w.write_u32(table.rows.len() as u32);

    let row_start = w.position();
    for row in &table.rows {
        for cell in row {
            write_cell(&mut w, cell)?;
        }
    }
    let row_end = w.position();

    let mut out = w.into_bytes();
    let crc = crc16_xmodem(&out[row_start..row_end]);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

fn write_cell(w: &mut CtWriter, cell: &Cell) -> Result<(), CtFormatError> {
    match cell {
        Cell::Byte(v) => w.write_u8(*v),
        Cell::Short(v) => w.write_i16(*v),
        Cell::Word(v) => w.write_u16(*v),
        Cell::Int(v) => w.write_i32(*v),
        Cell::Dword(v) | Cell::DwordHex(v) => w.write_u32(*v),
        Cell::String(s) => w.write_body_string(s)?,
        Cell::Float(v) => w.write_f32(*v),
        Cell::Int64(v) => w.write_u64(*v),
        // Any nonzero input is normalized to exactly 1 (spec.md §4.4).
        Cell::Bool(v) => w.write_u8(if *v { 1 } else { 0 }),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, TypeCode};

    #[test]
    fn magic_region_is_16_bytes() {
        let table = Table::new("t".to_string(), vec![], vec![]).unwrap();
        let bytes = write_ct(&table).unwrap();
        assert_eq!(&bytes[0..16].len(), &16);
    }

    #[test]
    fn empty_string_cell_contributes_four_bytes() {
        let cols = vec![Column { name: "S".to_string(), type_code: TypeCode::String }];
        let table = Table::new("t".to_string(), cols, vec![vec![Cell::String(String::new())]])
            .unwrap();
        let bytes = write_ct(&table).unwrap();
        let back = crate::ct::read_ct(&bytes).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn timestamp_too_long_is_rejected() {
        // A timestamp whose UTF-16 encoding alone reaches 0x40 bytes
        // before the terminator leaves no room to pad to the header end.
        let long_timestamp = "x".repeat(40);
        let table = Table::new(long_timestamp, vec![], vec![]).unwrap();
        assert!(matches!(write_ct(&table), Err(CtFormatError::TimestampTooLong)));
    }
}
