//! Worksheet names of xlsx workbooks.
//!
//! An xlsx file is a zip whose `xl/workbook.xml` lists the sheets in
//! display order; nothing else has to be parsed to enumerate them.

use super::archive::open_archive;
use crate::cache::ReadSeek;
use crate::error::{Result, RowgenError};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

const WORKBOOK_PART: &str = "xl/workbook.xml";

#[derive(Debug, Deserialize)]
struct Workbook {
    #[serde(default)]
    sheets: Sheets,
}

#[derive(Debug, Default, Deserialize)]
struct Sheets {
    #[serde(rename = "sheet", default)]
    sheet: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    #[serde(rename = "@name")]
    name: String,
}

/// Parses sheet names out of a `workbook.xml` document.
pub(crate) fn parse_sheet_names(xml: &str, location: &Path) -> Result<Vec<String>> {
    let wb: Workbook = quick_xml::de::from_str(xml).map_err(|e| {
        RowgenError::resolution(location.display().to_string(), format!("bad workbook.xml: {}", e))
    })?;
    Ok(wb.sheets.sheet.into_iter().map(|s| s.name).collect())
}

/// Sheet names of the xlsx workbook readable from `reader`.
pub fn sheet_names(reader: Box<dyn ReadSeek>, location: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(reader, location)?;
    let mut part = archive.by_name(WORKBOOK_PART).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => RowgenError::NotFound {
            what: WORKBOOK_PART.to_string(),
            location: location.display().to_string(),
        },
        other => RowgenError::Archive {
            path: location.to_path_buf(),
            source: other,
        },
    })?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| RowgenError::io(location.join(WORKBOOK_PART), e))?;
    parse_sheet_names(&xml, location)
}
