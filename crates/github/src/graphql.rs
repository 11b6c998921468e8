use anyhow::{Result, anyhow, bail};
use ci_status_core::source::{AssociatedPullRequest, CommitInfo};
use graphql_client::{QueryBody, Response};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

const COMMIT_QUERY: &str = r#"
query CommitQuery($owner: String!, $repo: String!, $sha: String!) {
  repository(owner: $owner, name: $repo) {
    object(expression: $sha) {
      __typename
      ... on Commit {
        additions
        deletions
        message
        committedDate
        authoredByCommitter
        author {
          name
        }
        committer {
          name
        }
        url
        associatedPullRequests(first: 1) {
          nodes {
            headRefName
            baseRefName
            title
            bodyText
            url
            merged
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, Serialize)]
struct CommitQueryVariables<'a> {
    owner: &'a str,
    repo: &'a str,
    sha: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct CommitQueryData {
    repository: Option<CommitRepository>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommitRepository {
    object: Option<CommitObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitObject {
    #[serde(rename = "__typename")]
    typename: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    committed_date: String,
    #[serde(default)]
    authored_by_committer: bool,
    author: Option<GitActor>,
    committer: Option<GitActor>,
    #[serde(default)]
    url: String,
    associated_pull_requests: Option<PullRequestConnection>,
}

#[derive(Debug, Clone, Deserialize)]
struct GitActor {
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PullRequestConnection {
    nodes: Option<Vec<Option<PullRequestNode>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    head_ref_name: String,
    base_ref_name: String,
    title: String,
    body_text: String,
    url: String,
    merged: bool,
}

impl From<PullRequestNode> for AssociatedPullRequest {
    fn from(value: PullRequestNode) -> Self {
        Self {
            head_ref_name: value.head_ref_name,
            base_ref_name: value.base_ref_name,
            title: value.title,
            body_text: value.body_text,
            url: value.url,
            merged: value.merged,
        }
    }
}

impl CommitObject {
    fn into_commit_info(self) -> Option<CommitInfo> {
        if self.typename != "Commit" {
            return None;
        }
        // Provider order; no tie-break when several PRs contain the commit.
        let pull_request = self
            .associated_pull_requests
            .and_then(|c| c.nodes)
            .and_then(|nodes| nodes.into_iter().flatten().next())
            .map(AssociatedPullRequest::from);
        Some(CommitInfo {
            message: self.message,
            committed_date: self.committed_date,
            authored_by_committer: self.authored_by_committer,
            author: self.author.and_then(|a| a.name),
            committer: self.committer.and_then(|c| c.name),
            url: self.url,
            pull_request,
        })
    }
}

async fn run_query<V: Serialize, T: DeserializeOwned>(
    client: &Octocrab,
    query: QueryBody<V>,
) -> Result<T> {
    let response: Response<T> = client.graphql(&query).await?;
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let message = errors.into_iter().map(|error| error.message).collect::<Vec<_>>().join("\n");
        bail!("GraphQL query failed: {message}");
    }
    response.data.ok_or_else(|| anyhow!("No data returned from GraphQL query"))
}

/// Looks up a commit and its first associated pull request.
/// Returns `None` when the expression doesn't resolve to a commit.
pub async fn fetch_commit(
    client: &Octocrab,
    owner: &str,
    repo: &str,
    sha: &str,
) -> Result<Option<CommitInfo>> {
    let query = QueryBody {
        variables: CommitQueryVariables { owner, repo, sha },
        query: COMMIT_QUERY,
        operation_name: "CommitQuery",
    };
    let data: CommitQueryData = run_query(client, query).await?;
    Ok(commit_from_data(data))
}

fn commit_from_data(data: CommitQueryData) -> Option<CommitInfo> {
    data.repository.and_then(|r| r.object).and_then(CommitObject::into_commit_info)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Option<CommitInfo> {
        commit_from_data(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_commit_with_pull_request() {
        let commit = parse(json!({
            "repository": {
                "object": {
                    "__typename": "Commit",
                    "additions": 10,
                    "deletions": 2,
                    "message": "Add simple block templating\n\nDetails",
                    "committedDate": "2021-03-01T10:00:00Z",
                    "authoredByCommitter": false,
                    "author": { "name": "navilan" },
                    "committer": { "name": "GitHub" },
                    "url": "https://github.com/navilan/slack-action-status/commit/c5c7b0a",
                    "associatedPullRequests": {
                        "nodes": [{
                            "headRefName": "feature",
                            "baseRefName": "main",
                            "title": "Feature",
                            "bodyText": "Body",
                            "url": "https://github.com/navilan/slack-action-status/pull/3",
                            "merged": true
                        }]
                    }
                }
            }
        }))
        .unwrap();
        assert_eq!(commit.author.as_deref(), Some("navilan"));
        assert_eq!(commit.committer.as_deref(), Some("GitHub"));
        assert!(!commit.authored_by_committer);
        let pr = commit.pull_request.unwrap();
        assert_eq!(pr.base_ref_name, "main");
        assert!(pr.merged);
    }

    #[test]
    fn test_commit_without_pull_request() {
        let commit = parse(json!({
            "repository": {
                "object": {
                    "__typename": "Commit",
                    "message": "Fix",
                    "committedDate": "2021-03-01T10:00:00Z",
                    "authoredByCommitter": true,
                    "author": { "name": "navilan" },
                    "committer": { "name": "navilan" },
                    "url": "https://github.com/o/r/commit/abc",
                    "associatedPullRequests": { "nodes": [] }
                }
            }
        }))
        .unwrap();
        assert!(commit.pull_request.is_none());
    }

    #[test]
    fn test_missing_object() {
        assert!(parse(json!({ "repository": { "object": null } })).is_none());
        assert!(parse(json!({ "repository": null })).is_none());
        assert!(parse(json!({ "repository": { "object": { "__typename": "Tree" } } })).is_none());
    }
}
