//! The GitHub Actions runner environment.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use ci_status_core::{config::RunContext, source::EventPullRequest};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct ActionsEnv {
    #[serde(rename = "GITHUB_REPOSITORY")]
    repository: String,
    #[serde(rename = "GITHUB_EVENT_NAME", default)]
    event_name: String,
    #[serde(rename = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,
    #[serde(rename = "GITHUB_SHA")]
    sha: String,
    #[serde(rename = "GITHUB_REF", default)]
    git_ref: String,
    #[serde(rename = "GITHUB_RUN_ID")]
    run_id: String,
    #[serde(rename = "GITHUB_JOB", default)]
    job: String,
    #[serde(rename = "GITHUB_WORKFLOW", default)]
    workflow: String,
    #[serde(rename = "GITHUB_SERVER_URL")]
    server_url: Option<String>,
    #[serde(rename = "GITHUB_API_URL")]
    api_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    head: PullRequestHead,
}

#[derive(Debug, Deserialize)]
struct PullRequestHead {
    #[serde(rename = "ref")]
    ref_field: String,
    sha: String,
}

/// Reads the run context from the process environment.
pub fn load_run_context() -> Result<RunContext> {
    run_context_from_vars(std::env::vars())
}

pub fn run_context_from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<RunContext> {
    let vars = vars
        .into_iter()
        .filter(|(k, _)| k.starts_with("GITHUB_"))
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect::<serde_json::Map<_, _>>();
    let env: ActionsEnv = serde_json::from_value(serde_json::Value::Object(vars))
        .context("Missing GitHub Actions environment")?;
    let Some((owner, repo)) = env.repository.split_once('/') else {
        bail!("Invalid GITHUB_REPOSITORY: {}", env.repository);
    };
    let run_id = env
        .run_id
        .parse::<u64>()
        .with_context(|| format!("Invalid GITHUB_RUN_ID: {}", env.run_id))?;
    let server_url = env.server_url.as_deref().unwrap_or("https://github.com");
    let server_url = Url::parse(server_url)
        .with_context(|| format!("Invalid GITHUB_SERVER_URL: {server_url}"))?;
    let api_url = env
        .api_url
        .as_deref()
        .map(|url| Url::parse(url).with_context(|| format!("Invalid GITHUB_API_URL: {url}")))
        .transpose()?;
    let payload = match &env.event_path {
        Some(path) => read_event(path)?,
        None => EventPayload::default(),
    };
    tracing::debug!(
        "Run {} of {}/{} ({}, job {})",
        run_id,
        owner,
        repo,
        env.event_name,
        env.job
    );
    Ok(RunContext {
        owner: owner.to_string(),
        repo: repo.to_string(),
        sha: env.sha,
        git_ref: env.git_ref,
        run_id,
        job: env.job,
        workflow: env.workflow,
        server_url,
        api_url,
        pull_request: payload.pull_request.map(|pr| EventPullRequest {
            head_ref: pr.head.ref_field,
            head_sha: pr.head.sha,
        }),
    })
}

fn read_event(path: &Path) -> Result<EventPayload> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open event payload {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse event payload {}", path.display()))
}
