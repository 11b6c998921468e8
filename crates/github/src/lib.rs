pub mod actions;
pub mod graphql;

use anyhow::{Context, Result};
use ci_status_core::{
    Error,
    config::RunContext,
    models::{Indicators, Job, SourceContext},
    source::{build_source_context, event_branch},
    status::{RawJob, build_jobs},
};
use octocrab::Octocrab;
use url::Url;

#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
}

#[derive(serde::Serialize)]
struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    per_page: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
}

#[derive(serde::Deserialize)]
struct JobsPage {
    total_count: u64,
    jobs: Vec<RawJob>,
}

impl GitHub {
    pub fn new(token: &str, api_url: Option<&Url>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(api_url) = api_url {
            builder = builder
                .base_uri(api_url.as_str())
                .with_context(|| format!("Invalid GitHub API URL {api_url}"))?;
        }
        let client = builder.build().context("Failed to create GitHub client")?;
        Ok(Self { client })
    }

    /// All jobs of a workflow run, in the order the API returns them.
    pub async fn list_jobs(&self, owner: &str, repo: &str, run_id: u64) -> Result<Vec<RawJob>> {
        let route = format!("/repos/{owner}/{repo}/actions/runs/{run_id}/jobs");
        let mut page = 1;
        let mut response: JobsPage = self
            .client
            .get(&route, Some(&PageParams { per_page: Some(100), page: Some(page) }))
            .await
            .with_context(|| format!("Failed to fetch jobs page {page}"))?;
        let total_count = response.total_count as usize;
        let mut jobs = std::mem::take(&mut response.jobs);
        while jobs.len() < total_count {
            page += 1;
            response = self
                .client
                .get(&route, Some(&PageParams { per_page: Some(100), page: Some(page) }))
                .await
                .with_context(|| format!("Failed to fetch jobs page {page}"))?;
            if response.jobs.is_empty() {
                break;
            }
            jobs.extend(response.jobs);
        }
        tracing::debug!("Run {} (jobs {})", run_id, jobs.len());
        Ok(jobs)
    }

    /// Builds the job tree for the current run.
    pub async fn fetch_jobs(
        &self,
        run: &RunContext,
        indicators: &Indicators,
        inclusion_suffix: Option<&str>,
    ) -> Result<Vec<Job>, Error> {
        let jobs = self
            .list_jobs(&run.owner, &run.repo, run.run_id)
            .await
            .map_err(|e| Error::Provider { run_id: run.run_id, reason: format!("{e:#}") })?;
        Ok(build_jobs(jobs, indicators, inclusion_suffix))
    }

    /// Resolves commit and pull request metadata for `sha`. A commit that
    /// can't be found is fatal.
    pub async fn resolve_source(&self, run: &RunContext, sha: &str) -> Result<SourceContext, Error> {
        let source_error =
            |reason: String| Error::SourceResolution { sha: sha.to_string(), reason };
        let commit = graphql::fetch_commit(&self.client, &run.owner, &run.repo, sha)
            .await
            .map_err(|e| source_error(format!("{e:#}")))?
            .ok_or_else(|| source_error("commit not found".to_string()))?;
        let branch = event_branch(run.pull_request.as_ref(), &run.git_ref);
        let source = build_source_context(&run.owner, &run.repo, sha, &branch, commit);
        tracing::info!("Resolved {} on {} by {}", source.sha, source.branch, source.commit_by);
        Ok(source)
    }
}
