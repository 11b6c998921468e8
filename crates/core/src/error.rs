use thiserror::Error;

use crate::parse::KvpError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure is terminal for the invocation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid {field}:\n{}", display_lines(.errors))]
    InputValidation { field: &'static str, errors: Vec<KvpError> },
    #[error("Error fetching sha {sha}: {reason}")]
    SourceResolution { sha: String, reason: String },
    #[error("Failed to list jobs for run {run_id}: {reason}")]
    Provider { run_id: u64, reason: String },
    #[error("Failed to render template: {0}")]
    TemplateRender(String),
    #[error("{0}")]
    Dispatch(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

fn display_lines(errors: &[KvpError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}
