use crate::batch::{DEFAULT_OUTPUT_PREFIX, MergeOptions};
use crate::grid::GridLocation;
use crate::normalize::FieldNames;
use crate::substitute::SubstitutionMode;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SPREADSHEET: &str = "input.xlsx";
const DEFAULT_TEMPLATE: &str = "template.docx";
const DEFAULT_OUTPUT_DIR: &str = "output_docs";
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx"];
const TEMPLATE_EXTENSIONS: &[&str] = &["docx"];

#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub spreadsheet: PathBuf,
    pub template: PathBuf,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub fields: FieldNames,
    pub substitution_mode: SubstitutionMode,
    pub grid: Option<GridLocation>,
    pub report_json: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            spreadsheet: PathBuf::from(DEFAULT_SPREADSHEET),
            template: PathBuf::from(DEFAULT_TEMPLATE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            fields: FieldNames::default(),
            substitution_mode: SubstitutionMode::default(),
            grid: None,
            report_json: false,
        }
    }
}

impl MergeConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            spreadsheet: cli_spreadsheet,
            template: cli_template,
            output_dir: cli_output_dir,
            output_prefix: cli_output_prefix,
            substitution_mode: cli_substitution_mode,
            grid_table: cli_grid_table,
            grid_row: cli_grid_row,
            report_json,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            spreadsheet: file_spreadsheet,
            template: file_template,
            output_dir: file_output_dir,
            output_prefix: file_output_prefix,
            fields: file_fields,
            substitution_mode: file_substitution_mode,
            grid: file_grid,
        } = file_config;

        let cli_grid = match (cli_grid_table, cli_grid_row) {
            (Some(table), Some(row)) => Some(GridLocation { table, row }),
            (None, None) => None,
            _ => anyhow::bail!("--grid-table and --grid-row must be given together"),
        };

        let defaults = Self::default();
        Ok(Self {
            spreadsheet: cli_spreadsheet
                .or(file_spreadsheet)
                .unwrap_or(defaults.spreadsheet),
            template: cli_template.or(file_template).unwrap_or(defaults.template),
            output_dir: cli_output_dir
                .or(file_output_dir)
                .unwrap_or(defaults.output_dir),
            output_prefix: cli_output_prefix
                .or(file_output_prefix)
                .unwrap_or(defaults.output_prefix),
            fields: file_fields.unwrap_or(defaults.fields),
            substitution_mode: cli_substitution_mode
                .or(file_substitution_mode)
                .unwrap_or(defaults.substitution_mode),
            grid: cli_grid.or(file_grid),
            report_json,
        })
    }

    /// Fail fast on inputs the engine would reject later.
    pub fn validate(&self) -> Result<()> {
        ensure_input(&self.spreadsheet, "spreadsheet", SPREADSHEET_EXTENSIONS)?;
        ensure_input(&self.template, "template", TEMPLATE_EXTENSIONS)?;

        if self.output_dir.exists() {
            anyhow::ensure!(
                self.output_dir.is_dir(),
                "output path {:?} exists and is not a directory",
                self.output_dir
            );
        }
        anyhow::ensure!(
            !self.output_prefix.contains(['/', '\\']),
            "output prefix {:?} must not contain path separators",
            self.output_prefix
        );

        let FieldNames {
            name,
            name_original,
            date_of_birth,
            identifier,
            vacancy_marker: _,
            name_cell_keyword,
        } = &self.fields;
        for (label, value) in [
            ("name", name),
            ("name_original", name_original),
            ("date_of_birth", date_of_birth),
            ("identifier", identifier),
            ("name_cell_keyword", name_cell_keyword),
        ] {
            anyhow::ensure!(!value.trim().is_empty(), "field name '{label}' must not be empty");
        }
        Ok(())
    }

    pub fn options(&self) -> MergeOptions {
        MergeOptions {
            fields: self.fields.clone(),
            mode: self.substitution_mode,
            grid: self.grid,
            output_prefix: self.output_prefix.clone(),
        }
    }
}

fn ensure_input(path: &Path, label: &str, extensions: &[&str]) -> Result<()> {
    anyhow::ensure!(path.exists(), "{label} {:?} does not exist", path);
    anyhow::ensure!(path.is_file(), "{label} {:?} is not a file", path);
    let allowed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .map(|ext| extensions.contains(&ext.as_str()))
        .unwrap_or(false);
    anyhow::ensure!(
        allowed,
        "{label} {:?} does not match allowed extensions {:?}",
        path,
        extensions
    );
    Ok(())
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "docx-mailmerge",
    about = "Generate one Word document per spreadsheet row",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "MAILMERGE_SPREADSHEET",
        value_name = "FILE",
        help = "Spreadsheet whose active sheet holds the records (.xlsx)"
    )]
    pub spreadsheet: Option<PathBuf>,

    #[arg(
        long,
        env = "MAILMERGE_TEMPLATE",
        value_name = "FILE",
        help = "Word template containing {{FIELD}} placeholders (.docx)"
    )]
    pub template: Option<PathBuf>,

    #[arg(
        long,
        env = "MAILMERGE_OUTPUT_DIR",
        value_name = "DIR",
        help = "Directory receiving the generated documents"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "MAILMERGE_OUTPUT_PREFIX",
        value_name = "PREFIX",
        help = "File name prefix for generated documents"
    )]
    pub output_prefix: Option<String>,

    #[arg(
        long,
        env = "MAILMERGE_SUBSTITUTION_MODE",
        value_enum,
        value_name = "MODE",
        help = "Placeholder matching: run-local or merge-runs"
    )]
    pub substitution_mode: Option<SubstitutionMode>,

    #[arg(
        long,
        env = "MAILMERGE_GRID_TABLE",
        value_name = "N",
        help = "0-based table index of the identifier grid row",
        value_parser = clap::value_parser!(usize)
    )]
    pub grid_table: Option<usize>,

    #[arg(
        long,
        env = "MAILMERGE_GRID_ROW",
        value_name = "N",
        help = "0-based row index of the identifier grid row",
        value_parser = clap::value_parser!(usize)
    )]
    pub grid_row: Option<usize>,

    #[arg(long, help = "Print the batch report as JSON on stdout")]
    pub report_json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    spreadsheet: Option<PathBuf>,
    template: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    output_prefix: Option<String>,
    fields: Option<FieldNames>,
    substitution_mode: Option<SubstitutionMode>,
    grid: Option<GridLocation>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
