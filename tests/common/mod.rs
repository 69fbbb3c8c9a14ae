//! Builds small `.xlsx` workbooks for tests.
#![allow(dead_code)]

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

/// Column letter for a zero based index (tests stay below 26 columns).
fn col(c: usize) -> char {
    (b'A' + c as u8) as char
}

/// Worksheet XML for `rows`, starting at sheet row `first_row` (1-based).
///
/// Empty strings are left out, numbers are number cells, text in the first row goes to the
/// shared strings table and any other text is an inline string.
fn sheet_xml(rows: &[&[&str]], first_row: usize, shared: &mut Vec<String>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    for (i, row) in rows.iter().enumerate() {
        let r = first_row + i;
        xml += &format!(r#"<row r="{r}">"#);
        for (c, v) in row.iter().enumerate() {
            let cref = format!("{}{r}", col(c));
            if v.is_empty() {
                continue;
            } else if v.parse::<f64>().is_ok() {
                xml += &format!(r#"<c r="{cref}"><v>{v}</v></c>"#);
            } else if i == 0 {
                shared.push(v.to_string());
                xml += &format!(r#"<c r="{cref}" t="s"><v>{}</v></c>"#, shared.len() - 1);
            } else {
                xml += &format!(r#"<c r="{cref}" t="inlineStr"><is><t>{v}</t></is></c>"#);
            }
        }
        xml += "</row>";
    }

    xml + "</sheetData></worksheet>"
}

fn shared_strings_xml(shared: &[String]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">"#,
        n = shared.len()
    );
    for s in shared {
        xml += &format!("<si><t>{s}</t></si>");
    }
    xml + "</sst>"
}

/// Write a workbook named `name` into `dir` holding `rows` from cell `A1`.
pub fn write_xlsx(dir: &Path, name: &str, rows: &[&[&str]]) -> PathBuf {
    write_xlsx_at(dir, name, rows, 1)
}

/// Write a workbook whose first row is sheet row `first_row`.
pub fn write_xlsx_at(dir: &Path, name: &str, rows: &[&[&str]], first_row: usize) -> PathBuf {
    let mut shared = Vec::new();
    let sheet = sheet_xml(rows, first_row, &mut shared);
    write_parts(dir, name, sheet, &shared)
}

/// Write a workbook whose `<sheetData>` holds `sheet_data` as given.
pub fn write_xlsx_raw(dir: &Path, name: &str, sheet_data: &str) -> PathBuf {
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
    );
    write_parts(dir, name, sheet, &[])
}

fn write_parts(dir: &Path, name: &str, sheet: String, shared: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
    let opts = SimpleFileOptions::default();

    for (part, body) in [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet),
        ("xl/sharedStrings.xml", shared_strings_xml(shared)),
    ] {
        zip.start_file(part, opts).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }

    zip.finish().unwrap();
    path
}
