//! Body traversal and text access for `word/document.xml`.

use super::style::{CELL_PROPERTIES, RUN_PROPERTIES};
use super::xml::{XmlElement, XmlNode, XmlTree};
use crate::error::DocxError;

pub const PARAGRAPH: &str = "w:p";
pub const RUN: &str = "w:r";
pub const TABLE: &str = "w:tbl";
pub const ROW: &str = "w:tr";
pub const CELL: &str = "w:tc";

/// Inline containers whose runs count as part of the enclosing paragraph.
const RUN_CONTAINERS: &[&str] = &["w:hyperlink", "w:ins", "w:smartTag", "w:fldSimple"];

/// The main document part of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    tree: XmlTree,
}

impl Document {
    pub fn parse(xml: &str) -> Result<Self, DocxError> {
        let tree = XmlTree::parse(xml)?;
        if tree.root.child("w:body").is_none() {
            return Err(DocxError::MissingPart("w:body".to_string()));
        }
        Ok(Self { tree })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        self.tree.to_bytes()
    }

    pub fn root(&self) -> &XmlElement {
        &self.tree.root
    }

    pub fn body(&self) -> &XmlElement {
        self.tree
            .root
            .child("w:body")
            .expect("document body checked at parse")
    }

    pub fn body_mut(&mut self) -> &mut XmlElement {
        self.tree
            .root
            .child_mut("w:body")
            .expect("document body checked at parse")
    }

    /// Body-level paragraphs; paragraphs inside tables are not included.
    pub fn paragraphs(&self) -> impl Iterator<Item = &XmlElement> {
        self.body().children_named(PARAGRAPH)
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.body_mut().children_named_mut(PARAGRAPH)
    }

    /// Body-level tables in document order.
    pub fn tables(&self) -> impl Iterator<Item = &XmlElement> {
        self.body().children_named(TABLE)
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.body_mut().children_named_mut(TABLE)
    }

    /// Plain text of every body paragraph, one per line.
    pub fn body_text(&self) -> String {
        self.paragraphs()
            .map(paragraph_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn runs(paragraph: &XmlElement) -> Vec<&XmlElement> {
    let mut out = Vec::new();
    for el in paragraph.elements() {
        if el.is(RUN) {
            out.push(el);
        } else if RUN_CONTAINERS.contains(&el.name.as_str()) {
            out.extend(el.children_named(RUN));
        }
    }
    out
}

pub fn runs_mut(paragraph: &mut XmlElement) -> Vec<&mut XmlElement> {
    let mut out = Vec::new();
    for el in paragraph.elements_mut() {
        if el.is(RUN) {
            out.push(el);
        } else if RUN_CONTAINERS.contains(&el.name.as_str()) {
            out.extend(el.children_named_mut(RUN));
        }
    }
    out
}

/// Rendered text of a run: `w:t` content, tabs as `\t`, breaks as `\n`.
pub fn run_text(run: &XmlElement) -> String {
    let mut out = String::new();
    for el in run.elements() {
        match el.name.as_str() {
            "w:t" => out.push_str(&el.text()),
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            "w:noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
    out
}

/// Replace the run's content with `text`, keeping its `w:rPr`.
pub fn set_run_text(run: &mut XmlElement, text: &str) {
    run.retain_elements(&[RUN_PROPERTIES]);
    let mut pending = String::new();
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush_text(run, &mut pending);
                run.push(XmlElement::new("w:tab"));
            }
            '\n' => {
                flush_text(run, &mut pending);
                run.push(XmlElement::new("w:br"));
            }
            _ => pending.push(ch),
        }
    }
    flush_text(run, &mut pending);
}

fn flush_text(run: &mut XmlElement, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let mut t = XmlElement::new("w:t");
    if pending.starts_with(char::is_whitespace) || pending.ends_with(char::is_whitespace) {
        t.set_attr("xml:space", "preserve");
    }
    t.children.push(XmlNode::Text(std::mem::take(pending)));
    run.push(t);
}

/// Drop every run of the paragraph, including runs nested in hyperlinks and
/// other inline containers. Paragraph properties and bookmarks stay.
pub fn remove_runs(paragraph: &mut XmlElement) {
    paragraph.remove_children_named(RUN);
    for container in RUN_CONTAINERS {
        paragraph.remove_children_named(container);
    }
}

pub fn paragraph_text(paragraph: &XmlElement) -> String {
    runs(paragraph).into_iter().map(run_text).collect()
}

pub fn new_run(text: &str) -> XmlElement {
    let mut run = XmlElement::new(RUN);
    set_run_text(&mut run, text);
    run
}

pub fn rows(table: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    table.children_named(ROW)
}

pub fn rows_mut(table: &mut XmlElement) -> impl Iterator<Item = &mut XmlElement> {
    table.children_named_mut(ROW)
}

/// Physical cells of a row (`w:tc` children), spans counted once.
pub fn cells(row: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    row.children_named(CELL)
}

pub fn cells_mut(row: &mut XmlElement) -> impl Iterator<Item = &mut XmlElement> {
    row.children_named_mut(CELL)
}

pub fn cell_paragraphs(cell: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    cell.children_named(PARAGRAPH)
}

pub fn cell_paragraphs_mut(cell: &mut XmlElement) -> impl Iterator<Item = &mut XmlElement> {
    cell.children_named_mut(PARAGRAPH)
}

/// Cell text: paragraph texts joined by newlines.
pub fn cell_text(cell: &XmlElement) -> String {
    cell_paragraphs(cell)
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove all block content from a cell, keeping `w:tcPr`.
pub fn clear_cell_content(cell: &mut XmlElement) {
    cell.retain_elements(&[CELL_PROPERTIES]);
}
