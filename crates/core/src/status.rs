use serde::Deserialize;

use crate::models::{Indicators, Job, Phase, PhaseStatus};

/// A job as reported by the Actions API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJob {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub steps: Option<Vec<RawStep>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStep {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
}

/// Classifies a single provider report. Unknown states and conclusions
/// are `Unclear`.
pub fn derive_phase_status(state: &str, conclusion: Option<&str>) -> PhaseStatus {
    match (state, conclusion) {
        ("queued", _) => PhaseStatus::Queued,
        ("in_progress", _) => PhaseStatus::Running,
        ("completed", Some("cancelled")) => PhaseStatus::Cancelled,
        ("completed", Some("failure")) => PhaseStatus::Failed,
        ("completed", Some("success")) => PhaseStatus::Completed,
        ("completed", Some("skipped")) => PhaseStatus::Skipped,
        _ => PhaseStatus::Unclear,
    }
}

fn make_phase(
    name: String,
    state: &str,
    conclusion: Option<&str>,
    indicators: &Indicators,
) -> Phase {
    let status = derive_phase_status(state, conclusion);
    Phase { name, status, indicator: indicators.get(status).to_string() }
}

fn make_job(job: RawJob, indicators: &Indicators, inclusion_suffix: Option<&str>) -> Job {
    let steps = job
        .steps
        .unwrap_or_default()
        .into_iter()
        .filter_map(|step| {
            let name = match inclusion_suffix {
                Some(suffix) if step.name.ends_with(suffix) => step.name.replacen(suffix, "", 1),
                Some(_) => return None,
                None => step.name,
            };
            Some(make_phase(name, &step.status, step.conclusion.as_deref(), indicators))
        })
        .collect();
    Job {
        phase: make_phase(job.name, &job.status, job.conclusion.as_deref(), indicators),
        steps,
    }
}

/// Builds the job tree in provider order.
///
/// With an inclusion suffix, only steps whose name ends with it are kept and
/// the first occurrence of the suffix is removed from their name.
pub fn build_jobs(
    jobs: Vec<RawJob>,
    indicators: &Indicators,
    inclusion_suffix: Option<&str>,
) -> Vec<Job> {
    let inclusion_suffix = inclusion_suffix.filter(|s| !s.is_empty());
    jobs.into_iter().map(|job| make_job(job, indicators, inclusion_suffix)).collect()
}
