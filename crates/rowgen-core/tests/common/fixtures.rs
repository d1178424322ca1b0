//! In-memory zip and xlsx fixtures.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const CSV_A: &[u8] = b"id,name\n1,alpha\n2,beta\n";

/// Zip holding `entries` in order.
pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();
    for (name, data) in entries {
        w.start_file(*name, opts).unwrap();
        w.write_all(data).unwrap();
    }
    w.finish().unwrap().into_inner()
}

/// Smallest xlsx the inspector accepts: a zip with a `xl/workbook.xml`
/// naming `sheets`.
pub fn xlsx_with_sheets(sheets: &[&str]) -> Vec<u8> {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (i, name) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            name,
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    zip_of(&[
        ("[Content_Types].xml", b"<Types/>".as_slice()),
        ("xl/workbook.xml", xml.as_bytes()),
    ])
}

/// The `{a.csv, b.xlsx}` archive used across the inspection tests.
pub fn bundle() -> Vec<u8> {
    let book = xlsx_with_sheets(&["Data", "Notes"]);
    zip_of(&[("a.csv", CSV_A), ("b.xlsx", book.as_slice())])
}
