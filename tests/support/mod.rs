#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use docx_mailmerge::docx::{Document, DocxPackage};
use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet, Worksheet};
use zip::ZipWriter;
use zip::write::FileOptions;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

pub fn sheet(book: &mut Spreadsheet) -> &mut Worksheet {
    book.get_sheet_by_name_mut("Sheet1").expect("default sheet")
}

/// Write a header row and text rows starting at A1. Empty strings leave the
/// cell unset.
pub fn fill_text_rows(sheet: &mut Worksheet, headers: &[&str], rows: &[&[&str]]) {
    for (col, header) in headers.iter().enumerate() {
        sheet
            .get_cell_mut((col as u32 + 1, 1u32))
            .set_value_string(*header);
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            sheet
                .get_cell_mut((col as u32 + 1, row_idx as u32 + 2))
                .set_value_string(*value);
        }
    }
}

/// Store an Excel date serial with a day-first number format.
pub fn set_date_serial(sheet: &mut Worksheet, cell: &str, serial: f64) {
    sheet.get_cell_mut(cell).set_value_number(serial);
    sheet
        .get_style_mut(cell)
        .get_number_format_mut()
        .set_format_code("dd/mm/yyyy");
}

pub fn workbook_bytes<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut Spreadsheet),
{
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("records.xlsx");
    write_workbook_to_path(&path, f);
    std::fs::read(&path).expect("read workbook")
}

// -----------------------------------------------------------------------------
// Template fixtures
// -----------------------------------------------------------------------------

/// A body paragraph with a bold 14pt Arial run.
pub fn styled_paragraph(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial"/><w:b/><w:sz w:val="28"/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#
    )
}

pub fn plain_paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

fn cell(text: &str) -> String {
    format!(
        r#"<w:tc><w:tcPr><w:tcW w:w="400" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>"#
    )
}

/// A table whose single row has a label cell followed by `slots` empty cells.
pub fn grid_table(label: &str, slots: usize) -> String {
    let mut row = cell(label);
    for _ in 0..slots {
        row.push_str(&cell(""));
    }
    format!("<w:tbl><w:tblGrid/><w:tr>{row}</w:tr></w:tbl>")
}

/// A two-row table whose second cell holds `keyword` with explicit width,
/// span, alignment and spacing.
pub fn name_table(keyword: &str) -> String {
    format!(
        r#"<w:tbl><w:tr>{label}<w:tc><w:tcPr><w:tcW w:w="2400" w:type="dxa"/><w:gridSpan w:val="2"/></w:tcPr><w:p><w:pPr><w:spacing w:before="120" w:after="60"/><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:i/></w:rPr><w:t>{keyword}</w:t></w:r></w:p></w:tc></w:tr><w:tr>{other}</w:tr></w:tbl>"#,
        label = cell("Họ và tên"),
        other = cell("Ghi chú"),
    )
}

pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

pub fn docx_bytes(body: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, data) in [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("word/document.xml", document_xml(body)),
    ] {
        zip.start_file(name, options).expect("start part");
        zip.write_all(data.as_bytes()).expect("write part");
    }
    zip.finish().expect("finish zip").into_inner()
}

pub fn write_docx(path: &Path, body: &str) {
    std::fs::write(path, docx_bytes(body)).expect("write docx");
}

pub fn read_document(path: &Path) -> Document {
    DocxPackage::open(path)
        .and_then(|package| package.document())
        .expect("read generated document")
}

// -----------------------------------------------------------------------------
// Workspace
// -----------------------------------------------------------------------------

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_workbook<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }

    pub fn create_template(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        write_docx(&path, body);
        path
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("output_docs")
    }
}
