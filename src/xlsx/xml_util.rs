//! Shared OOXML helpers: attribute extraction, relationship-file parsing,
//! A1-style cell references, and the text-escaping used by every hand-
//! templated XML part this codec writes.
//!
//! Grounded in `daemonp-batdoc::xml_util` (attribute/rels parsing) and
//! `litchi::ooxml::opc::{pkgwriter, rel}` (`escape_xml`).

use quick_xml::events::BytesStart;
use std::collections::HashMap;

/// rId → Target, as found in any `_rels/*.rels` part.
pub(crate) type Rels = HashMap<String, String>;

/// Read a single attribute's value off a `quick_xml` start/empty tag.
pub(crate) fn get_attr(e: &BytesStart, attr_name: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == attr_name {
            return std::str::from_utf8(&attr.value).ok().map(String::from);
        }
    }
    None
}

/// Parse a `_rels/*.rels` part into an rId → Target map.
pub(crate) fn parse_rels_xml(xml: &str) -> Rels {
    use quick_xml::events::Event;
    use quick_xml::reader::Reader;

    let mut rels = Rels::new();
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = get_attr(e, b"Id").unwrap_or_default();
                let target = get_attr(e, b"Target").unwrap_or_default();
                if !id.is_empty() && !target.is_empty() {
                    rels.insert(id, target);
                }
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }
    rels
}

/// The `_rels` sibling path for an OPC part, e.g. `xl/workbook.xml` →
/// `xl/_rels/workbook.xml.rels`.
pub(crate) fn rels_path(part_path: &str) -> String {
    if let Some((dir, file)) = part_path.rsplit_once('/') {
        format!("{dir}/_rels/{file}.rels")
    } else {
        format!("_rels/{part_path}.rels")
    }
}

/// Escape the five XML-significant characters for use in text or
/// attribute content.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Parse an A1-style column reference (`"AA7"` → `26`, 0-based) ignoring
/// any trailing row digits.
pub(crate) fn col_ref_to_index(cell_ref: &str) -> usize {
    let mut col = 0usize;
    for ch in cell_ref.bytes() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + usize::from(ch.to_ascii_uppercase() - b'A') + 1;
        } else {
            break;
        }
    }
    col.saturating_sub(1)
}

/// Render a 0-based column index as A1-style letters (`0` → `"A"`).
pub(crate) fn col_index_to_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).expect("ASCII letters are valid UTF-8")
}

/// Render a 0-based (column, row) pair as an A1-style cell reference.
pub(crate) fn cell_ref(col: usize, row: usize) -> String {
    format!("{}{}", col_index_to_letters(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn col_ref_round_trip() {
        for (letters, idx) in [("A", 0usize), ("Z", 25), ("AA", 26), ("AZ", 51), ("BA", 52)] {
            assert_eq!(col_index_to_letters(idx), letters);
            assert_eq!(col_ref_to_index(&format!("{letters}1")), idx);
        }
    }

    #[test]
    fn cell_ref_formats_a1() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(1, 2), "B3");
    }

    #[test]
    fn escape_xml_covers_all_five() {
        assert_eq!(escape_xml("<a&b>\"c'd\""), "&lt;a&amp;b&gt;&quot;c&apos;d&quot;");
    }

    #[test]
    fn rels_path_nested() {
        assert_eq!(rels_path("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
    }

    #[test]
    fn rels_path_no_dir() {
        assert_eq!(rels_path("workbook.xml"), "_rels/workbook.xml.rels");
    }

    #[test]
    fn parse_rels_extracts_targets() {
        let xml = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;
        let rels = parse_rels_xml(xml);
        assert_eq!(rels.get("rId1").unwrap(), "worksheets/sheet1.xml");
    }
}
