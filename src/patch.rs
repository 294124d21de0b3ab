//! Keyword replacement inside a formatted table cell.
//!
//! Rebuilding a paragraph's runs discards their formatting, so the target
//! cell and paragraph are snapshotted first and the snapshot is written back
//! afterwards. Cell width, column span, paragraph alignment and spacing all
//! survive the replacement; the text itself gets the fixed run font.

use crate::docx::Document;
use crate::docx::document::{
    cell_paragraphs, cell_paragraphs_mut, cell_text, cells, cells_mut, new_run, paragraph_text,
    remove_runs, rows, rows_mut,
};
use crate::docx::style::{FormattingSnapshot, RunFont};
use crate::docx::xml::XmlElement;

/// Replace `keyword` with `value` in the first cell of `table` whose text
/// contains it. Returns whether a paragraph was rewritten.
pub fn patch_cell(table: &mut XmlElement, keyword: &str, value: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    let Some((row_idx, cell_idx)) = find_keyword_cell(table, keyword) else {
        return false;
    };
    let Some(cell) = rows_mut(table)
        .nth(row_idx)
        .and_then(|row| cells_mut(row).nth(cell_idx))
    else {
        return false;
    };

    let view: &XmlElement = cell;
    let edits: Vec<(usize, FormattingSnapshot, String)> = cell_paragraphs(view)
        .enumerate()
        .filter_map(|(idx, paragraph)| {
            let text = paragraph_text(paragraph);
            text.contains(keyword).then(|| {
                (
                    idx,
                    FormattingSnapshot::capture(view, paragraph),
                    text.replace(keyword, value),
                )
            })
        })
        .collect();
    let Some((_, first, _)) = edits.first() else {
        return false;
    };
    let cell_format = first.cell.clone();

    let mut pending = edits.into_iter().peekable();
    for (idx, paragraph) in cell_paragraphs_mut(cell).enumerate() {
        let Some((_, snapshot, text)) = pending.next_if(|(edit_idx, _, _)| *edit_idx == idx) else {
            continue;
        };
        remove_runs(paragraph);
        let mut run = new_run(&text);
        RunFont::default().apply(&mut run);
        paragraph.push(run);
        snapshot.paragraph.restore(paragraph);
    }
    cell_format.restore(cell);
    true
}

fn find_keyword_cell(table: &XmlElement, keyword: &str) -> Option<(usize, usize)> {
    rows(table).enumerate().find_map(|(row_idx, row)| {
        cells(row)
            .position(|cell| cell_text(cell).contains(keyword))
            .map(|cell_idx| (row_idx, cell_idx))
    })
}

/// Run [`patch_cell`] once against every body-level table. Returns the
/// number of tables patched.
pub fn patch_name_cells(document: &mut Document, keyword: &str, value: &str) -> usize {
    let patched = document
        .tables_mut()
        .map(|table| patch_cell(table, keyword, value))
        .filter(|patched| *patched)
        .count();
    if patched == 0 {
        tracing::debug!(keyword, "no table cell contains the keyword");
    }
    patched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::style::{
        Alignment, CELL_PROPERTIES, CellFormat, CellWidth, PARAGRAPH_PROPERTIES, Spacing,
    };

    fn table(xml: &str) -> XmlElement {
        let document = Document::parse(&format!(
            r#"<w:document xmlns:w="urn:w"><w:body><w:tbl>{xml}</w:tbl></w:body></w:document>"#
        ))
        .expect("parse");
        document.tables().next().expect("table").clone()
    }

    const STYLED: &str = r#"<w:tr>
<w:tc><w:p><w:r><w:t>Họ và tên</w:t></w:r></w:p></w:tc>
<w:tc><w:tcPr><w:tcW w:w="2400" w:type="dxa"/><w:gridSpan w:val="2"/></w:tcPr>
<w:p><w:pPr><w:spacing w:before="120" w:after="60"/><w:jc w:val="right"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>HỌ </w:t></w:r><w:r><w:t>TÊN</w:t></w:r></w:p>
<w:p><w:r><w:t>unrelated</w:t></w:r></w:p>
</w:tc></w:tr>"#;

    fn target(table: &XmlElement) -> &XmlElement {
        let row = rows(table).next().unwrap();
        cells(row).nth(1).unwrap()
    }

    #[test]
    fn keeps_width_span_alignment_and_spacing() {
        let mut table = table(STYLED);
        assert!(patch_cell(&mut table, "HỌ TÊN", "Nguyễn Văn An"));

        let cell = target(&table);
        assert_eq!(cell_text(cell), "Nguyễn Văn An\nunrelated");

        let format = CellFormat::capture(cell);
        assert_eq!(format.width, Some(CellWidth::dxa(2400)));
        assert_eq!(format.span(), 2);
        let tcpr = cell.child(CELL_PROPERTIES).unwrap();
        assert_eq!(tcpr.children_named("w:tcW").count(), 1);
        assert_eq!(tcpr.children_named("w:gridSpan").count(), 1);

        let paragraph = cell_paragraphs(cell).next().unwrap();
        assert_eq!(Alignment::read(paragraph), Some(Alignment::Right));
        assert_eq!(
            Spacing::read(paragraph),
            Spacing {
                before: Some("120".to_string()),
                after: Some("60".to_string())
            }
        );
        let runs: Vec<&XmlElement> = paragraph.children_named("w:r").collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(RunFont::read(runs[0]), Some(RunFont::default()));
        assert!(paragraph.child(PARAGRAPH_PROPERTIES).is_some());
    }

    #[test]
    fn long_values_do_not_change_cell_geometry() {
        let mut table = table(STYLED);
        let long = "A".repeat(200);
        assert!(patch_cell(&mut table, "HỌ TÊN", &long));
        let format = CellFormat::capture(target(&table));
        assert_eq!(format.width, Some(CellWidth::dxa(2400)));
        assert_eq!(format.grid_span.as_deref(), Some("2"));
    }

    #[test]
    fn only_the_first_matching_cell_is_patched() {
        let mut table = table(
            r#"<w:tr><w:tc><w:p><w:r><w:t>KEY one</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>KEY two</w:t></w:r></w:p></w:tc></w:tr>"#,
        );
        assert!(patch_cell(&mut table, "KEY", "v"));
        let row = rows(&table).next().unwrap();
        let texts: Vec<String> = cells(row).map(cell_text).collect();
        assert_eq!(texts, vec!["v one", "KEY two"]);
    }

    #[test]
    fn missing_keyword_leaves_table_untouched() {
        let mut table = table(STYLED);
        let before = table.clone();
        assert!(!patch_cell(&mut table, "SỐ CCCD", "x"));
        assert_eq!(table, before);
    }

    #[test]
    fn unset_spacing_and_alignment_stay_unset() {
        let mut table = table(
            r#"<w:tr><w:tc><w:p><w:r><w:t>KEY</w:t></w:r></w:p></w:tc></w:tr>"#,
        );
        assert!(patch_cell(&mut table, "KEY", "v"));
        let row = rows(&table).next().unwrap();
        let paragraph = cell_paragraphs(cells(row).next().unwrap()).next().unwrap();
        assert_eq!(Alignment::read(paragraph), None);
        assert!(!Spacing::read(paragraph).is_set());
    }

    #[test]
    fn patches_each_table_once() {
        let mut document = Document::parse(
            r#"<w:document xmlns:w="urn:w"><w:body>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>KEY</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>KEY</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>none</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>KEY</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#,
        )
        .expect("parse");
        assert_eq!(patch_name_cells(&mut document, "KEY", "v"), 2);
        let first = document.tables().next().unwrap();
        let row = rows(first).next().unwrap();
        let texts: Vec<String> = cells(row).map(cell_text).collect();
        assert_eq!(texts, vec!["v", "KEY"]);
    }
}
