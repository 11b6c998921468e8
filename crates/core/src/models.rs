use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Free-form key/value input. Later writes win on merge.
pub type Kvp = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Unclear,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Skipped,
}

impl PhaseStatus {
    pub const fn variants() -> &'static [Self] {
        &[
            Self::Unclear,
            Self::Queued,
            Self::Running,
            Self::Completed,
            Self::Failed,
            Self::Cancelled,
            Self::Skipped,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclear => "unclear",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        }
    }

    fn default_indicator(&self) -> &'static str {
        match self {
            Self::Unclear => ":hash:",
            Self::Queued => ":double_vertical_bar:",
            Self::Running => ":hourglass:",
            Self::Completed => ":white_check_mark:",
            Self::Failed => ":x:",
            Self::Cancelled => ":octagonal_sign:",
            Self::Skipped => ":white_medium_square:",
        }
    }
}

impl FromStr for PhaseStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::variants().iter().copied().find(|v| v.as_str() == s).ok_or(())
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Display string for every [`PhaseStatus`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Indicators(BTreeMap<PhaseStatus, String>);

impl Default for Indicators {
    fn default() -> Self {
        Self(
            PhaseStatus::variants()
                .iter()
                .map(|status| (*status, status.default_indicator().to_string()))
                .collect(),
        )
    }
}

impl Indicators {
    /// Defaults overlaid with user overrides keyed by status name.
    /// Keys that don't name a status are ignored.
    pub fn with_overrides(overrides: &Kvp) -> Self {
        let mut indicators = Self::default();
        for (key, value) in overrides {
            match key.parse::<PhaseStatus>() {
                Ok(status) => {
                    indicators.0.insert(status, value.clone());
                }
                Err(()) => tracing::warn!("Ignoring indicator for unknown status {:?}", key),
            }
        }
        indicators
    }

    pub fn get(&self, status: PhaseStatus) -> &str {
        self.0.get(&status).map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Phase {
    pub name: String,
    pub status: PhaseStatus,
    pub indicator: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Job {
    #[serde(flatten)]
    pub phase: Phase,
    pub steps: Vec<Phase>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct PullRequestContext {
    pub title: String,
    pub body: String,
    pub url: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SourceContext {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub branch: String,
    pub author: String,
    pub committer: String,
    pub commit_by: String,
    pub date: String,
    pub message: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<PullRequestContext>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct WorkflowContext {
    pub run_id: u64,
    pub current_job_id: String,
    pub name: String,
    pub url: String,
}

/// Everything a template can reference.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TemplateVars {
    pub status: String,
    pub params: Kvp,
    pub workflow: WorkflowContext,
    pub gh: SourceContext,
    pub jobs: Vec<Job>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_name() {
        for status in PhaseStatus::variants() {
            assert_eq!(status.as_str().parse::<PhaseStatus>(), Ok(*status));
        }
        assert_eq!("in_progress".parse::<PhaseStatus>(), Err(()));
    }

    #[test]
    fn test_indicator_overrides() {
        let overrides = Kvp::from([
            ("failed".to_string(), ":boom:".to_string()),
            ("bogus".to_string(), ":shrug:".to_string()),
        ]);
        let indicators = Indicators::with_overrides(&overrides);
        assert_eq!(indicators.get(PhaseStatus::Failed), ":boom:");
        assert_eq!(indicators.get(PhaseStatus::Completed), ":white_check_mark:");
        assert_eq!(indicators.get(PhaseStatus::Unclear), ":hash:");
    }

    #[test]
    fn test_job_serializes_flat() {
        let job = Job {
            phase: Phase {
                name: "build".into(),
                status: PhaseStatus::Running,
                indicator: ":hourglass:".into(),
            },
            steps: vec![],
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "build",
                "status": "running",
                "indicator": ":hourglass:",
                "steps": [],
            })
        );
    }
}
