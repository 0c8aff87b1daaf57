//! Source payload shapes.
//!
//! GitHub webhook bodies are loosely-typed JSON. Only the fields the normaliser
//! reads are modelled here; everything else is ignored. Every field is
//! optional at this level so that a missing value is reported by the
//! normaliser with its full path, rather than as an opaque serde error.

use serde::Deserialize;
use serde_json::Value;

use crate::RejectionReason;

/// The event-type hints this system understands (the `X-GitHub-Event` header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceEventType {
    /// `push`
    Push,
    /// `pull_request`: opened, updated or merged pull requests.
    PullRequest,
}

impl SourceEventType {
    /// Parses a hint, failing closed on anything unknown.
    pub fn parse(hint: &str) -> Result<Self, RejectionReason> {
        match hint.trim() {
            "push" => Ok(Self::Push),
            "pull_request" => Ok(Self::PullRequest),
            _ => Err(RejectionReason::UnsupportedEventType {
                event_type: hint.to_string(),
            }),
        }
    }

    /// The hint string for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
        }
    }
}

/// Tagged union of every payload shape the normaliser accepts.
#[derive(Debug, Clone)]
pub enum SourcePayload {
    /// Body of a `push` delivery.
    Push(PushPayload),
    /// Body of a `pull_request` delivery.
    PullRequest(PullRequestPayload),
}

impl SourcePayload {
    /// Reads `payload` as the shape selected by `event_type`.
    ///
    /// Fails with [`RejectionReason::MalformedPayload`] when the body is not a
    /// JSON object or a modelled field has the wrong JSON type.
    pub fn from_value(event_type: SourceEventType, payload: &Value) -> Result<Self, RejectionReason> {
        let shape_error =
            |e: serde_json::Error| RejectionReason::invalid("$", format!("unexpected shape: {e}"));
        match event_type {
            SourceEventType::Push => PushPayload::deserialize(payload)
                .map(Self::Push)
                .map_err(shape_error),
            SourceEventType::PullRequest => PullRequestPayload::deserialize(payload)
                .map(Self::PullRequest)
                .map_err(shape_error),
        }
    }
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

/// The fields of a `push` delivery the normaliser reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    /// Full ref that was pushed, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Who pushed.
    pub pusher: Option<Pusher>,
    /// Where.
    pub repository: Option<Repository>,
    /// The newest commit of the push; `null` for branch deletions.
    pub head_commit: Option<Commit>,
}

/// `push.pusher`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pusher {
    /// Git user name of the pusher.
    pub name: Option<String>,
}

/// `push.head_commit`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    /// RFC 3339 commit timestamp.
    pub timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// Pull request
// ---------------------------------------------------------------------------

/// The fields of a `pull_request` delivery the normaliser reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestPayload {
    /// Sub-state: `opened`, `synchronize`, `closed`, `labeled`, ...
    pub action: Option<String>,
    /// The pull request itself.
    pub pull_request: Option<PullRequest>,
    /// Where.
    pub repository: Option<Repository>,
    /// Account that triggered the delivery.
    pub sender: Option<Account>,
}

/// `pull_request.pull_request`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    /// `true` once the pull request has been merged.
    pub merged: Option<bool>,
    /// Account that performed the merge.
    pub merged_by: Option<Account>,
    /// RFC 3339 merge time.
    pub merged_at: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: Option<String>,
    /// RFC 3339 last-update time.
    pub updated_at: Option<String>,
    /// Account that opened the pull request.
    pub user: Option<Account>,
    /// Target of the pull request.
    pub base: Option<BranchRef>,
    /// Source of the pull request.
    pub head: Option<BranchRef>,
}

/// `pull_request.base` / `pull_request.head`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchRef {
    /// Branch name (GitHub sends it without `refs/heads/`, but tolerate either).
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// A GitHub account reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    /// GitHub login.
    pub login: Option<String>,
}

/// `repository`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    /// Short name, e.g. `hello-world`.
    pub name: Option<String>,
    /// Owner-qualified name, e.g. `octocat/hello-world`.
    pub full_name: Option<String>,
    /// Last push time: Unix seconds in `push` payloads, RFC 3339 elsewhere.
    pub pushed_at: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_hints_are_unsupported() {
        assert_eq!(SourceEventType::parse("push"), Ok(SourceEventType::Push));
        assert_eq!(
            SourceEventType::parse("pull_request"),
            Ok(SourceEventType::PullRequest)
        );
        assert_eq!(
            SourceEventType::parse("issue_comment"),
            Err(RejectionReason::UnsupportedEventType {
                event_type: "issue_comment".to_string()
            })
        );
    }

    #[test]
    fn non_object_bodies_are_malformed() {
        let err = SourcePayload::from_value(SourceEventType::Push, &json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_PAYLOAD");
    }

    #[test]
    fn wrong_field_types_are_malformed() {
        let err = SourcePayload::from_value(
            SourceEventType::PullRequest,
            &json!({ "action": "opened", "pull_request": { "merged": "yes" } }),
        )
        .unwrap_err();
        assert_eq!(err.code(), "MALFORMED_PAYLOAD");
    }

    #[test]
    fn null_objects_read_as_absent() {
        let payload = SourcePayload::from_value(
            SourceEventType::Push,
            &json!({ "ref": "refs/heads/main", "head_commit": null }),
        )
        .unwrap();
        match payload {
            SourcePayload::Push(push) => {
                assert_eq!(push.git_ref.as_deref(), Some("refs/heads/main"));
                assert!(push.head_commit.is_none());
            }
            SourcePayload::PullRequest(_) => panic!("expected a push payload"),
        }
    }
}
