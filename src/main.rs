use clap::Parser;
use docx_mailmerge::{CliArgs, LoggingConfig, MergeConfig, init_logging, run};

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = MergeConfig::from_args(cli)?;

    let report = match run(&config) {
        Ok(report) => report,
        Err(err) => {
            if let Some(merge_err) = err.downcast_ref::<docx_mailmerge::MergeError>() {
                tracing::error!(
                    code = merge_err.code().code(),
                    category = merge_err.code().category(),
                    record_index = ?merge_err.record_index(),
                    "batch aborted: {merge_err}"
                );
            }
            return Err(err);
        }
    };

    if config.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
