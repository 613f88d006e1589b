//! In-memory intermediate representation shared by the CT and XLSX codecs.
//!
//! A [`Table`] is produced by exactly one reader and consumed by exactly
//! one writer; it has no shared ownership and is never mutated after
//! construction (see `spec.md` §3).

use crate::error::CtFormatError;

/// One of the ten type codes a CT column may declare (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Byte,
    Short,
    Word,
    Int,
    Dword,
    DwordHex,
    String,
    Float,
    Int64,
    Bool,
}

impl TypeCode {
    /// Decode a wire type code. Code `10` and anything above `12` are
    /// reserved/unknown (`spec.md` §6).
    pub fn from_wire(code: u32) -> Option<Self> {
        match code {
            2 => Some(Self::Byte),
            3 => Some(Self::Short),
            4 => Some(Self::Word),
            5 => Some(Self::Int),
            6 => Some(Self::Dword),
            7 => Some(Self::DwordHex),
            8 => Some(Self::String),
            9 => Some(Self::Float),
            11 => Some(Self::Int64),
            12 => Some(Self::Bool),
            _ => None,
        }
    }

    /// The 4-byte little-endian code written to the schema region.
    pub fn to_wire(self) -> u32 {
        match self {
            Self::Byte => 2,
            Self::Short => 3,
            Self::Word => 4,
            Self::Int => 5,
            Self::Dword => 6,
            Self::DwordHex => 7,
            Self::String => 8,
            Self::Float => 9,
            Self::Int64 => 11,
            Self::Bool => 12,
        }
    }

    /// Fixed cell width in bytes, or `None` for the variable-width STRING.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Byte | Self::Bool => Some(1),
            Self::Short | Self::Word => Some(2),
            Self::Int | Self::Dword | Self::DwordHex | Self::Float => Some(4),
            Self::Int64 => Some(8),
            Self::String => None,
        }
    }

    /// Uppercase name used as the XLSX type-row text (`spec.md` §4.5).
    pub fn name(self) -> &'static str {
        match self {
            Self::Byte => "BYTE",
            Self::Short => "SHORT",
            Self::Word => "WORD",
            Self::Int => "INT",
            Self::Dword => "DWORD",
            Self::DwordHex => "DWORD_HEX",
            Self::String => "STRING",
            Self::Float => "FLOAT",
            Self::Int64 => "INT64",
            Self::Bool => "BOOL",
        }
    }

    /// Parse an XLSX type-row name back into a [`TypeCode`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BYTE" => Some(Self::Byte),
            "SHORT" => Some(Self::Short),
            "WORD" => Some(Self::Word),
            "INT" => Some(Self::Int),
            "DWORD" => Some(Self::Dword),
            "DWORD_HEX" => Some(Self::DwordHex),
            "STRING" => Some(Self::String),
            "FLOAT" => Some(Self::Float),
            "INT64" => Some(Self::Int64),
            "BOOL" => Some(Self::Bool),
            _ => None,
        }
    }
}

/// A column descriptor: name plus declared type. Sequence position is
/// the column's identity; there is no separate column id.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub type_code: TypeCode,
}

/// A single typed cell value. The variant tag must equal the owning
/// column's `type_code`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Byte(u8),
    Short(i16),
    Word(u16),
    Int(i32),
    Dword(u32),
    DwordHex(u32),
    String(String),
    Float(f32),
    Int64(u64),
    Bool(bool),
}

impl Cell {
    /// The [`TypeCode`] this cell's variant corresponds to.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Cell::Byte(_) => TypeCode::Byte,
            Cell::Short(_) => TypeCode::Short,
            Cell::Word(_) => TypeCode::Word,
            Cell::Int(_) => TypeCode::Int,
            Cell::Dword(_) => TypeCode::Dword,
            Cell::DwordHex(_) => TypeCode::DwordHex,
            Cell::String(_) => TypeCode::String,
            Cell::Float(_) => TypeCode::Float,
            Cell::Int64(_) => TypeCode::Int64,
            Cell::Bool(_) => TypeCode::Bool,
        }
    }

    /// Render the cell as display text the way the CT file's numeric
    /// display hint dictates (`spec.md` §3): decimal for most numeric
    /// types, `0xXXXXXXXX` for `DWORD_HEX`, `TRUE`/`FALSE` for `BOOL`.
    pub fn display_text(&self) -> String {
        match self {
            Cell::Byte(v) => v.to_string(),
            Cell::Short(v) => v.to_string(),
            Cell::Word(v) => v.to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Dword(v) => v.to_string(),
            Cell::DwordHex(v) => format!("0x{v:08X}"),
            Cell::String(v) => v.clone(),
            Cell::Float(v) => v.to_string(),
            Cell::Int64(v) => v.to_string(),
            Cell::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    /// Build an integer cell for `type_code` from a wide signed integer,
    /// range-checking against the column's declared width/signedness
    /// (`spec.md` §4.4 value-to-bytes edge rules). `BOOL` normalizes any
    /// nonzero value to `true`, matching the writer's documented rule.
    pub fn from_integer(type_code: TypeCode, value: i128) -> Result<Cell, CtFormatError> {
        let out_of_range = || CtFormatError::ValueOutOfRange {
            value: value.to_string(),
            type_name: type_code.name(),
        };
        match type_code {
            TypeCode::Byte => Ok(Cell::Byte(u8::try_from(value).map_err(|_| out_of_range())?)),
            TypeCode::Short => Ok(Cell::Short(i16::try_from(value).map_err(|_| out_of_range())?)),
            TypeCode::Word => Ok(Cell::Word(u16::try_from(value).map_err(|_| out_of_range())?)),
            TypeCode::Int => Ok(Cell::Int(i32::try_from(value).map_err(|_| out_of_range())?)),
            TypeCode::Dword => Ok(Cell::Dword(u32::try_from(value).map_err(|_| out_of_range())?)),
            TypeCode::DwordHex => {
                Ok(Cell::DwordHex(u32::try_from(value).map_err(|_| out_of_range())?))
            },
            TypeCode::Int64 => Ok(Cell::Int64(u64::try_from(value).map_err(|_| out_of_range())?)),
            TypeCode::Bool => Ok(Cell::Bool(value != 0)),
            TypeCode::String | TypeCode::Float => Err(CtFormatError::InvalidShape(format!(
                "{:?} is not an integer type",
                type_code
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Byte(v) => Some(*v as i64),
            Cell::Short(v) => Some(*v as i64),
            Cell::Word(v) => Some(*v as i64),
            Cell::Int(v) => Some(*v as i64),
            Cell::Dword(v) | Cell::DwordHex(v) => Some(*v as i64),
            Cell::Int64(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }
}

/// The in-memory representation of one CT file / XLSX workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub timestamp: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a `Table`, enforcing the `spec.md` §3 invariants at the
    /// single construction boundary so no caller ever observes a value
    /// that violates them.
    pub fn new(
        timestamp: String,
        columns: Vec<Column>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, CtFormatError> {
        if timestamp.contains('\0') {
            return Err(CtFormatError::InvalidMetadata(
                "timestamp contains an embedded NUL".to_string(),
            ));
        }
        for col in &columns {
            if col.name.is_empty() {
                return Err(CtFormatError::InvalidMetadata(
                    "column name must not be empty".to_string(),
                ));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(CtFormatError::InvalidShape(format!(
                    "row {i} has {} cell(s), expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            for (j, cell) in row.iter().enumerate() {
                if cell.type_code() != columns[j].type_code {
                    return Err(CtFormatError::InvalidShape(format!(
                        "row {i} cell {j} has type {:?}, column declares {:?}",
                        cell.type_code(),
                        columns[j].type_code
                    )));
                }
            }
        }
        Ok(Table { timestamp, columns, rows })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_code_wire_round_trip() {
        for code in [2u32, 3, 4, 5, 6, 7, 8, 9, 11, 12] {
            let t = TypeCode::from_wire(code).unwrap();
            assert_eq!(t.to_wire(), code);
        }
    }

    #[test]
    fn type_code_10_is_unknown() {
        assert!(TypeCode::from_wire(10).is_none());
        assert!(TypeCode::from_wire(13).is_none());
    }

    #[test]
    fn name_round_trip() {
        for code in [
            TypeCode::Byte,
            TypeCode::Short,
            TypeCode::Word,
            TypeCode::Int,
            TypeCode::Dword,
            TypeCode::DwordHex,
            TypeCode::String,
            TypeCode::Float,
            TypeCode::Int64,
            TypeCode::Bool,
        ] {
            assert_eq!(TypeCode::from_name(code.name()), Some(code));
        }
    }

    #[test]
    fn empty_table_is_legal() {
        let t = Table::new("2024-01-01 00:00:00".to_string(), vec![], vec![]).unwrap();
        assert_eq!(t.column_count(), 0);
        assert_eq!(t.row_count(), 0);
    }

    #[test]
    fn empty_column_name_rejected() {
        let cols = vec![Column { name: String::new(), type_code: TypeCode::Dword }];
        assert!(Table::new("t".to_string(), cols, vec![]).is_err());
    }

    #[test]
    fn mismatched_row_shape_rejected() {
        let cols = vec![Column { name: "Id".to_string(), type_code: TypeCode::Dword }];
        let rows = vec![vec![Cell::Dword(1), Cell::Dword(2)]];
        assert!(Table::new("t".to_string(), cols, rows).is_err());
    }

    #[test]
    fn wrong_cell_tag_rejected() {
        let cols = vec![Column { name: "Id".to_string(), type_code: TypeCode::Dword }];
        let rows = vec![vec![Cell::Int(1)]];
        assert!(Table::new("t".to_string(), cols, rows).is_err());
    }

    #[test]
    fn dword_hex_display() {
        assert_eq!(Cell::DwordHex(0xDEADBEEF).display_text(), "0xDEADBEEF");
    }

    #[test]
    fn byte_boundary_enforcement() {
        assert!(Cell::from_integer(TypeCode::Byte, 256).is_err());
        assert_eq!(Cell::from_integer(TypeCode::Byte, 255).unwrap(), Cell::Byte(255));
    }

    #[test]
    fn word_boundary_enforcement() {
        assert!(Cell::from_integer(TypeCode::Word, -1).is_err());
        assert_eq!(Cell::from_integer(TypeCode::Word, 0).unwrap(), Cell::Word(0));
    }

    #[test]
    fn dword_boundary_enforcement() {
        assert!(Cell::from_integer(TypeCode::Dword, 1i128 << 32).is_err());
        assert_eq!(
            Cell::from_integer(TypeCode::Dword, (u32::MAX) as i128).unwrap(),
            Cell::Dword(u32::MAX)
        );
    }

    #[test]
    fn bool_normalizes_nonzero() {
        assert_eq!(Cell::from_integer(TypeCode::Bool, 42).unwrap(), Cell::Bool(true));
        assert_eq!(Cell::from_integer(TypeCode::Bool, 0).unwrap(), Cell::Bool(false));
    }
}
