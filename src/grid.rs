//! One-character-per-cell identifier layout.
//!
//! The grid row is found by shape: a row spanning `len(identifier) + 1` grid
//! columns, the first holding a label. A cell with `w:gridSpan` counts once
//! per column it covers. Rows are searched table by table, top to bottom, and
//! the first qualifying row is the only one filled.

use crate::docx::Document;
use crate::docx::document::{
    PARAGRAPH, cells, cells_mut, clear_cell_content, new_run, rows, rows_mut,
};
use crate::docx::style::{Alignment, CellFormat, RunFont, Spacing, VerticalAlignment};
use crate::docx::xml::XmlElement;
use serde::{Deserialize, Serialize};

/// Spacing before and after each character paragraph, in twips (~0.07 in).
pub const CHARACTER_SPACING_TWIPS: u32 = 101;

/// Position of a row among the body-level tables of a document, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLocation {
    pub table: usize,
    pub row: usize,
}

/// Physical cell index for each grid column of `row`.
fn column_cells(row: &XmlElement) -> Vec<usize> {
    cells(row)
        .enumerate()
        .flat_map(|(idx, cell)| {
            let span = CellFormat::capture(cell).span().max(1) as usize;
            std::iter::repeat_n(idx, span)
        })
        .collect()
}

/// First row, in document order, spanning `slots + 1` grid columns.
pub fn find_identifier_row(document: &Document, slots: usize) -> Option<GridLocation> {
    document.tables().enumerate().find_map(|(table_idx, table)| {
        rows(table)
            .position(|row| column_cells(row).len() == slots + 1)
            .map(|row_idx| GridLocation {
                table: table_idx,
                row: row_idx,
            })
    })
}

/// Fill the first grid-shaped row with `identifier`. Returns the filled
/// location, or `None` when no row has a matching shape.
pub fn fill_identifier_grid(document: &mut Document, identifier: &str) -> Option<GridLocation> {
    let slots = identifier.chars().count();
    if slots == 0 {
        return None;
    }
    let Some(location) = find_identifier_row(document, slots) else {
        tracing::debug!(slots, "no table row matches the identifier length");
        return None;
    };
    fill_identifier_grid_at(document, location, identifier).then_some(location)
}

/// Fill the row at `location`. The row must exist and span exactly one grid
/// column more than `identifier` has characters; otherwise nothing changes
/// and `false` is returned.
///
/// Character `i` goes to the cell covering grid column `i + 1`. A slot cell
/// spanning several columns ends up holding the last of its characters.
pub fn fill_identifier_grid_at(
    document: &mut Document,
    location: GridLocation,
    identifier: &str,
) -> bool {
    let slots = identifier.chars().count();
    let Some(row) = document
        .tables_mut()
        .nth(location.table)
        .and_then(|table| rows_mut(table).nth(location.row))
    else {
        tracing::debug!(table = location.table, row = location.row, "grid row not found");
        return false;
    };
    let columns = column_cells(row);
    if slots == 0 || columns.len() != slots + 1 {
        tracing::debug!(
            table = location.table,
            row = location.row,
            slots,
            "grid row shape does not match identifier"
        );
        return false;
    }

    for (&cell_idx, ch) in columns[1..].iter().zip(identifier.chars()) {
        if let Some(cell) = cells_mut(row).nth(cell_idx) {
            fill_character_cell(cell, ch);
        }
    }
    true
}

fn fill_character_cell(cell: &mut XmlElement, ch: char) {
    clear_cell_content(cell);

    let mut paragraph = XmlElement::new(PARAGRAPH);
    Spacing::fixed(CHARACTER_SPACING_TWIPS).write(&mut paragraph);
    Alignment::write(&mut paragraph, Some(&Alignment::Center));

    let mut run = new_run(ch.encode_utf8(&mut [0; 4]));
    RunFont::default().apply(&mut run);
    paragraph.push(run);

    cell.push(paragraph);
    VerticalAlignment::Center.apply(cell);
}
