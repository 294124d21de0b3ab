pub mod batch;
pub mod config;
pub mod docx;
pub mod error;
pub mod grid;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod patch;
pub mod substitute;
pub mod workbook;

pub use batch::{MailMerge, MergeOptions, RenderOutcome};
pub use config::{CliArgs, MergeConfig};
pub use error::{DocxError, ErrorCode, MergeError, MergeResult, SourceKind};
pub use grid::GridLocation;
pub use logging::{LoggingConfig, init_logging};
pub use model::{BatchReport, CellValue, Record, SkipReason};
pub use normalize::FieldNames;
pub use substitute::SubstitutionMode;

use anyhow::Result;

/// Validate `config`, load both inputs and generate the whole batch.
pub fn run(config: &MergeConfig) -> Result<BatchReport> {
    config.validate()?;

    tracing::info!(
        spreadsheet = %config.spreadsheet.display(),
        template = %config.template.display(),
        mode = ?config.substitution_mode,
        "loading inputs"
    );

    let merge = MailMerge::open(&config.spreadsheet, &config.template, config.options())?;
    let report = merge.generate(&config.output_dir)?;
    Ok(report)
}
