use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use serde::Deserialize;
use url::Url;

use crate::{
    Error, Result,
    dispatch::ForcedOutcome,
    models::{Indicators, Kvp, WorkflowContext},
    parse::parse_multi_line_kvp,
    source::EventPullRequest,
    util::UrlExt,
};

/// The triggering run, read once at startup.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RunContext {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub git_ref: String,
    pub run_id: u64,
    pub job: String,
    pub workflow: String,
    pub server_url: Url,
    pub api_url: Option<Url>,
    pub pull_request: Option<EventPullRequest>,
}

impl RunContext {
    pub fn workflow_context(&self) -> WorkflowContext {
        let run_id = self.run_id.to_string();
        let url = self.server_url.with_segments(&[
            self.owner.as_str(),
            self.repo.as_str(),
            "actions",
            "runs",
            run_id.as_str(),
        ]);
        WorkflowContext {
            run_id: self.run_id,
            current_job_id: self.job.clone(),
            name: self.workflow.clone(),
            url: url.to_string(),
        }
    }
}

/// Optional YAML file holding invocation parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub github_token: Option<String>,
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub status: Option<String>,
    pub template_file: Option<PathBuf>,
    pub message_id: Option<String>,
    pub source_sha: Option<String>,
    pub inclusion_suffix: Option<String>,
    pub force_failure: bool,
    pub force_success: bool,
    pub params: Kvp,
    pub indicators: Kvp,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Config(format!("Failed to open {}: {e}", path.display())))?;
        serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
    }
}

/// Parameters given on the command line. Multi-line fields are raw
/// `- key: value` text.
#[derive(Debug, Clone, Default)]
pub struct InputArgs {
    pub github_token: Option<String>,
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub status: Option<String>,
    pub template_file: Option<PathBuf>,
    pub message_id: Option<String>,
    pub source_sha: Option<String>,
    pub inclusion_suffix: Option<String>,
    pub force_failure: bool,
    pub force_success: bool,
    pub params: Option<String>,
    pub indicators: Option<String>,
}

/// Validated invocation parameters.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub github_token: String,
    pub bot_token: String,
    pub channel_id: String,
    pub status: String,
    pub template_file: Option<PathBuf>,
    pub message_id: Option<String>,
    pub source_sha: Option<String>,
    pub inclusion_suffix: Option<String>,
    pub forced_outcome: Option<ForcedOutcome>,
    pub params: Kvp,
    pub indicators: Indicators,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_blank_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
}

fn pick(arg: Option<String>, file: Option<String>) -> Option<String> {
    non_blank(arg).or_else(|| non_blank(file))
}

fn required(arg: Option<String>, file: Option<String>, name: &str) -> Result<String> {
    pick(arg, file).ok_or_else(|| Error::Config(format!("Missing required input {name}")))
}

impl Inputs {
    /// Merges command line arguments over the config file and validates the
    /// result. KVP text is checked before anything else.
    pub fn resolve(file: ConfigFile, args: InputArgs) -> Result<Self> {
        let mut params = file.params;
        params.extend(
            parse_multi_line_kvp(args.params.as_deref())
                .map_err(|errors| Error::InputValidation { field: "params", errors })?,
        );
        let mut indicators = file.indicators;
        indicators.extend(
            parse_multi_line_kvp(args.indicators.as_deref())
                .map_err(|errors| Error::InputValidation { field: "indicators", errors })?,
        );
        Ok(Self {
            github_token: required(args.github_token, file.github_token, "github-token")?,
            bot_token: required(args.bot_token, file.bot_token, "bot-token")?,
            channel_id: required(args.channel_id, file.channel_id, "channel-id")?,
            status: required(args.status, file.status, "status")?,
            template_file: non_blank_path(args.template_file)
                .or_else(|| non_blank_path(file.template_file)),
            message_id: pick(args.message_id, file.message_id),
            source_sha: pick(args.source_sha, file.source_sha),
            inclusion_suffix: pick(args.inclusion_suffix, file.inclusion_suffix),
            forced_outcome: ForcedOutcome::from_flags(
                args.force_failure || file.force_failure,
                args.force_success || file.force_success,
            ),
            params,
            indicators: Indicators::with_overrides(&indicators),
        })
    }
}
