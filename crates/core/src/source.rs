use crate::models::{PullRequestContext, SourceContext};

/// The pull request carried by a `pull_request*` event payload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EventPullRequest {
    pub head_ref: String,
    pub head_sha: String,
}

/// Commit metadata as returned by the commit lookup.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommitInfo {
    pub message: String,
    pub committed_date: String,
    pub authored_by_committer: bool,
    pub author: Option<String>,
    pub committer: Option<String>,
    pub url: String,
    /// First associated pull request, in provider order.
    pub pull_request: Option<AssociatedPullRequest>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AssociatedPullRequest {
    pub head_ref_name: String,
    pub base_ref_name: String,
    pub title: String,
    pub body_text: String,
    pub url: String,
    pub merged: bool,
}

pub fn event_branch(pull_request: Option<&EventPullRequest>, git_ref: &str) -> String {
    match pull_request {
        Some(pr) => pr.head_ref.clone(),
        None => git_ref.replacen("refs/heads/", "", 1),
    }
}

/// A non-blank override wins over the event's own commit.
pub fn event_sha(
    pull_request: Option<&EventPullRequest>,
    sha: &str,
    sha_override: Option<&str>,
) -> String {
    if let Some(sha) = sha_override.map(str::trim).filter(|s| !s.is_empty()) {
        return sha.to_string();
    }
    match pull_request {
        Some(pr) => pr.head_sha.clone(),
        None => sha.to_string(),
    }
}

pub fn commit_by(commit: &CommitInfo) -> String {
    let author = commit.author.as_deref().unwrap_or_default();
    if commit.authored_by_committer {
        author.to_string()
    } else {
        format!("{}/{}", commit.committer.as_deref().unwrap_or_default(), author)
    }
}

pub fn build_source_context(
    owner: &str,
    repo: &str,
    sha: &str,
    event_branch: &str,
    commit: CommitInfo,
) -> SourceContext {
    let commit_by = commit_by(&commit);
    let branch = match &commit.pull_request {
        Some(pr) if pr.merged => pr.base_ref_name.clone(),
        Some(pr) => pr.head_ref_name.clone(),
        None => event_branch.to_string(),
    };
    SourceContext {
        owner: owner.to_string(),
        repo: repo.to_string(),
        sha: sha.to_string(),
        branch,
        author: commit.author.unwrap_or_default(),
        committer: commit.committer.unwrap_or_default(),
        commit_by,
        date: commit.committed_date,
        message: commit.message,
        url: commit.url,
        pr: commit.pull_request.map(|pr| PullRequestContext {
            title: pr.title,
            body: pr.body_text,
            url: pr.url,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit() -> CommitInfo {
        CommitInfo {
            message: "Add simple block templating".into(),
            committed_date: "2021-03-01T10:00:00Z".into(),
            authored_by_committer: true,
            author: Some("navilan".into()),
            committer: Some("navilan".into()),
            url: "https://github.com/navilan/slack-action-status/commit/c5c7b0a".into(),
            pull_request: None,
        }
    }

    fn pull_request(merged: bool) -> AssociatedPullRequest {
        AssociatedPullRequest {
            head_ref_name: "feature".into(),
            base_ref_name: "main".into(),
            title: "Feature".into(),
            body_text: "Adds a feature".into(),
            url: "https://github.com/navilan/slack-action-status/pull/3".into(),
            merged,
        }
    }

    #[test]
    fn test_event_branch() {
        let pr = EventPullRequest { head_ref: "feature".into(), head_sha: "abc".into() };
        assert_eq!(event_branch(Some(&pr), "refs/pull/3/merge"), "feature");
        assert_eq!(event_branch(None, "refs/heads/main"), "main");
        assert_eq!(event_branch(None, "refs/heads/release/refs/heads/x"), "release/refs/heads/x");
        assert_eq!(event_branch(None, "refs/tags/v1.0"), "refs/tags/v1.0");
    }

    #[test]
    fn test_event_sha() {
        let pr = EventPullRequest { head_ref: "feature".into(), head_sha: "head".into() };
        assert_eq!(event_sha(None, "merge", None), "merge");
        assert_eq!(event_sha(Some(&pr), "merge", None), "head");
        assert_eq!(event_sha(Some(&pr), "merge", Some("  ")), "head");
        assert_eq!(event_sha(Some(&pr), "merge", Some(" override ")), "override");
    }

    #[test]
    fn test_commit_by() {
        let mut info = commit();
        assert_eq!(commit_by(&info), "navilan");
        info.authored_by_committer = false;
        info.committer = Some("GitHub".into());
        assert_eq!(commit_by(&info), "GitHub/navilan");
    }

    #[test]
    fn test_source_context_without_pull_request() {
        let source = build_source_context("navilan", "slack-action-status", "c5c7b0a", "main", commit());
        assert_eq!(source.branch, "main");
        assert_eq!(source.commit_by, "navilan");
        assert_eq!(source.date, "2021-03-01T10:00:00Z");
        assert!(source.pr.is_none());
    }

    #[test]
    fn test_source_context_branch_from_pull_request() {
        for (merged, branch) in [(false, "feature"), (true, "main")] {
            let mut info = commit();
            info.pull_request = Some(pull_request(merged));
            let source = build_source_context("o", "r", "sha", "event-branch", info);
            assert_eq!(source.branch, branch);
            let pr = source.pr.unwrap();
            assert_eq!(pr.title, "Feature");
            assert_eq!(pr.body, "Adds a feature");
        }
    }
}
