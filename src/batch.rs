//! Per-record pipeline: normalize, instantiate, substitute, fill, patch, save.

use crate::docx::{Document, Template};
use crate::error::{MergeError, MergeResult, SourceKind};
use crate::grid::{GridLocation, fill_identifier_grid, fill_identifier_grid_at};
use crate::logging::record_span;
use crate::model::{BatchReport, GeneratedDocument, Record, SkippedRecord};
use crate::normalize::{FieldNames, FieldNormalizer, MergeFields, Normalized};
use crate::patch::patch_name_cells;
use crate::substitute::{SubstitutionMode, substitute_placeholders, unresolved_placeholders};
use crate::workbook::RecordSource;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_PREFIX: &str = "output_";
pub const OUTPUT_EXTENSION: &str = "docx";

/// Engine settings independent of where the inputs come from.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOptions {
    pub fields: FieldNames,
    pub mode: SubstitutionMode,
    /// Fill this row instead of searching for the first grid-shaped one.
    pub grid: Option<GridLocation>,
    pub output_prefix: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            fields: FieldNames::default(),
            mode: SubstitutionMode::default(),
            grid: None,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

/// What happened to one document besides plain substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOutcome {
    pub substituted_runs: usize,
    pub grid: Option<GridLocation>,
    pub name_cells_patched: usize,
}

/// A loaded spreadsheet and template, ready to generate one document per
/// qualifying record.
pub struct MailMerge {
    source: RecordSource,
    template: Template,
    normalizer: FieldNormalizer,
    options: MergeOptions,
}

impl MailMerge {
    pub fn open(
        spreadsheet_path: &Path,
        template_path: &Path,
        options: MergeOptions,
    ) -> MergeResult<Self> {
        let source = RecordSource::open(spreadsheet_path)?;
        let template = Template::open(template_path).map_err(|err| {
            MergeError::source_read(
                SourceKind::Template,
                Some(template_path.to_path_buf()),
                err.to_string(),
            )
        })?;
        Ok(Self::new(source, template, options))
    }

    /// Build from in-memory inputs, as received from an upload.
    pub fn from_bytes(
        spreadsheet: &[u8],
        template: &[u8],
        options: MergeOptions,
    ) -> MergeResult<Self> {
        let source = RecordSource::from_bytes(spreadsheet)?;
        let template = Template::from_bytes(template)
            .map_err(|err| MergeError::source_read(SourceKind::Template, None, err.to_string()))?;
        Ok(Self::new(source, template, options))
    }

    fn new(source: RecordSource, template: Template, options: MergeOptions) -> Self {
        Self {
            source,
            template,
            normalizer: FieldNormalizer::new(options.fields.clone()),
            options,
        }
    }

    pub fn source(&self) -> &RecordSource {
        &self.source
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Output file name for a record, e.g. `output_3.docx`.
    pub fn output_file_name(&self, record_index: usize) -> String {
        format!("{}{}.{}", self.options.output_prefix, record_index, OUTPUT_EXTENSION)
    }

    /// Generate every qualifying record into `output_dir`, creating it if
    /// needed. Stops at the first write failure; files already written stay.
    pub fn generate(&self, output_dir: &Path) -> MergeResult<BatchReport> {
        let mut report = BatchReport::default();
        let mut dir_ready = false;

        tracing::info!(
            sheet = self.source.sheet_name(),
            columns = ?self.source.headers(),
            output_dir = %output_dir.display(),
            "starting batch"
        );

        for record in self.source.records() {
            let fields = match self.normalizer.normalize(&record) {
                Normalized::Skip(reason) => {
                    tracing::debug!(record_index = record.index, %reason, "skipping record");
                    report.skipped.push(SkippedRecord {
                        record_index: record.index,
                        reason,
                    });
                    continue;
                }
                Normalized::Merge(fields) => fields,
            };

            let _span = record_span(fields.record_index).entered();
            let path = output_dir.join(self.output_file_name(fields.record_index));
            if !dir_ready {
                fs::create_dir_all(output_dir).map_err(|source| MergeError::OutputWrite {
                    record_index: fields.record_index,
                    path: path.clone(),
                    source,
                })?;
                dir_ready = true;
            }

            let (document, outcome) = self.render(&fields);
            self.save(&document, &path, fields.record_index)?;
            tracing::info!(
                record_index = fields.record_index,
                path = %path.display(),
                "document saved"
            );

            report.generated.push(GeneratedDocument {
                record_index: fields.record_index,
                path,
                identifier_grid_filled: outcome.grid.is_some(),
                name_cells_patched: outcome.name_cells_patched,
            });
        }

        tracing::info!(
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            "batch complete"
        );
        Ok(report)
    }

    /// Render one record onto a fresh copy of the template. Returns `None`
    /// for records the skip policy excludes.
    pub fn render_record(&self, record: &Record) -> Option<(Document, RenderOutcome)> {
        match self.normalizer.normalize(record) {
            Normalized::Merge(fields) => Some(self.render(&fields)),
            Normalized::Skip(_) => None,
        }
    }

    fn render(&self, fields: &MergeFields) -> (Document, RenderOutcome) {
        let mut document = self.template.instantiate();
        let mut outcome = RenderOutcome {
            substituted_runs: substitute_placeholders(
                &mut document,
                &fields.substitutions,
                self.options.mode,
            ),
            ..RenderOutcome::default()
        };

        let unresolved = unresolved_placeholders(&document);
        if !unresolved.is_empty() {
            tracing::debug!(
                record_index = fields.record_index,
                ?unresolved,
                "placeholders left in body"
            );
        }

        if let Some(identifier) = fields.identifier.as_deref() {
            outcome.grid = match self.options.grid {
                Some(location) => fill_identifier_grid_at(&mut document, location, identifier)
                    .then_some(location),
                None => fill_identifier_grid(&mut document, identifier),
            };
        }

        outcome.name_cells_patched = patch_name_cells(
            &mut document,
            &self.options.fields.name_cell_keyword,
            &fields.name_original,
        );
        (document, outcome)
    }

    fn save(&self, document: &Document, path: &Path, record_index: usize) -> MergeResult<()> {
        self.template
            .save(path, document)
            .map_err(|err| MergeError::OutputWrite {
                record_index,
                path: PathBuf::from(path),
                source: err.into_io(),
            })
    }
}
