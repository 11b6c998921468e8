use std::future::Future;

use serde_json::Value;

use crate::{
    Result,
    models::{Indicators, Job, PhaseStatus},
};

/// Slack rejects messages with more blocks than this.
pub const MAX_BLOCKS: usize = 49;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ForcedOutcome {
    Failure,
    Success,
}

impl ForcedOutcome {
    /// Failure wins when both flags are set.
    pub fn from_flags(force_failure: bool, force_success: bool) -> Option<Self> {
        match (force_failure, force_success) {
            (true, _) => Some(Self::Failure),
            (false, true) => Some(Self::Success),
            (false, false) => None,
        }
    }

    pub fn status(&self) -> PhaseStatus {
        match self {
            Self::Failure => PhaseStatus::Failed,
            Self::Success => PhaseStatus::Completed,
        }
    }
}

/// Overwrites the status of the job named `current_job_id`.
/// Returns whether a job was found.
pub fn apply_forced_outcome(
    jobs: &mut [Job],
    current_job_id: &str,
    outcome: ForcedOutcome,
    indicators: &Indicators,
) -> bool {
    let Some(job) = jobs.iter_mut().find(|job| job.phase.name == current_job_id) else {
        return false;
    };
    let status = outcome.status();
    job.phase.status = status;
    job.phase.indicator = indicators.get(status).to_string();
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub channel: String,
    /// Plain-text fallback shown in notifications.
    pub text: String,
    pub blocks: Vec<Value>,
}

/// Chat platform operations. Both return the message id.
pub trait MessageApi {
    fn post(&self, message: &Message) -> impl Future<Output = Result<String>> + Send;

    fn update(&self, message_id: &str, message: &Message) -> impl Future<Output = Result<String>> + Send;
}

/// Drops blocks past [`MAX_BLOCKS`].
pub fn truncate_blocks(blocks: &mut Vec<Value>) {
    if blocks.len() > MAX_BLOCKS {
        tracing::debug!("Dropping {} blocks", blocks.len() - MAX_BLOCKS);
        blocks.truncate(MAX_BLOCKS);
    }
}

/// Updates the message when a prior id is given, posts a new one otherwise.
pub async fn dispatch<A: MessageApi>(
    api: &A,
    message_id: Option<&str>,
    mut message: Message,
) -> Result<String> {
    truncate_blocks(&mut message.blocks);
    match message_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            tracing::info!("Updating message {} in {}", id, message.channel);
            api.update(id, &message).await
        }
        None => {
            tracing::info!("Posting message to {}", message.channel);
            api.post(&message).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::models::Phase;

    #[derive(Default)]
    struct Recorder {
        posts: Mutex<Vec<Message>>,
        updates: Mutex<Vec<(String, Message)>>,
    }

    impl MessageApi for Recorder {
        async fn post(&self, message: &Message) -> Result<String> {
            self.posts.lock().unwrap().push(message.clone());
            Ok("1700000000.000100".to_string())
        }

        async fn update(&self, message_id: &str, message: &Message) -> Result<String> {
            self.updates.lock().unwrap().push((message_id.to_string(), message.clone()));
            Ok(message_id.to_string())
        }
    }

    fn message(blocks: usize) -> Message {
        Message {
            channel: "C123".into(),
            text: "Testing".into(),
            blocks: (0..blocks).map(|i| json!({"type": "section", "block_id": i})).collect(),
        }
    }

    fn job(name: &str, status: PhaseStatus) -> Job {
        let indicators = Indicators::default();
        Job {
            phase: Phase { name: name.into(), status, indicator: indicators.get(status).into() },
            steps: vec![],
        }
    }

    #[tokio::test]
    async fn test_dispatch_updates_with_message_id() {
        let api = Recorder::default();
        let id = dispatch(&api, Some("1690000000.000200"), message(2)).await.unwrap();
        assert_eq!(id, "1690000000.000200");
        assert!(api.posts.lock().unwrap().is_empty());
        let updates = api.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "1690000000.000200");
    }

    #[tokio::test]
    async fn test_dispatch_posts_without_message_id() {
        for message_id in [None, Some(""), Some("  ")] {
            let api = Recorder::default();
            let id = dispatch(&api, message_id, message(2)).await.unwrap();
            assert_eq!(id, "1700000000.000100");
            assert_eq!(api.posts.lock().unwrap().len(), 1);
            assert!(api.updates.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_dispatch_truncates_blocks() {
        let api = Recorder::default();
        dispatch(&api, None, message(60)).await.unwrap();
        let posts = api.posts.lock().unwrap();
        let blocks = &posts[0].blocks;
        assert_eq!(blocks.len(), MAX_BLOCKS);
        assert_eq!(blocks.first(), Some(&json!({"type": "section", "block_id": 0})));
        assert_eq!(blocks.last(), Some(&json!({"type": "section", "block_id": 48})));
    }

    #[test]
    fn test_truncate_blocks() {
        for (count, expected) in [(0, 0), (48, 48), (49, 49), (50, 49), (200, 49)] {
            let mut blocks = message(count).blocks;
            truncate_blocks(&mut blocks);
            assert_eq!(blocks.len(), expected, "{count}");
        }
    }

    #[test]
    fn test_forced_failure() {
        let indicators = Indicators::default();
        let mut jobs = vec![job("setup", PhaseStatus::Completed), job("notify", PhaseStatus::Running)];
        let before = jobs[0].clone();
        assert!(apply_forced_outcome(&mut jobs, "notify", ForcedOutcome::Failure, &indicators));
        assert_eq!(jobs[0], before);
        assert_eq!(jobs[1].phase.status, PhaseStatus::Failed);
        assert_eq!(jobs[1].phase.indicator, ":x:");
    }

    #[test]
    fn test_forced_success() {
        let indicators = Indicators::default();
        let mut jobs = vec![job("notify", PhaseStatus::Running)];
        assert!(apply_forced_outcome(&mut jobs, "notify", ForcedOutcome::Success, &indicators));
        assert_eq!(jobs[0].phase.status, PhaseStatus::Completed);
        assert_eq!(jobs[0].phase.indicator, ":white_check_mark:");
    }

    #[test]
    fn test_forced_outcome_without_match() {
        let indicators = Indicators::default();
        let mut jobs = vec![job("setup", PhaseStatus::Running)];
        let before = jobs.clone();
        assert!(!apply_forced_outcome(&mut jobs, "notify", ForcedOutcome::Failure, &indicators));
        assert_eq!(jobs, before);
    }

    #[test]
    fn test_forced_outcome_from_flags() {
        assert_eq!(ForcedOutcome::from_flags(false, false), None);
        assert_eq!(ForcedOutcome::from_flags(true, false), Some(ForcedOutcome::Failure));
        assert_eq!(ForcedOutcome::from_flags(false, true), Some(ForcedOutcome::Success));
        assert_eq!(ForcedOutcome::from_flags(true, true), Some(ForcedOutcome::Failure));
    }
}
