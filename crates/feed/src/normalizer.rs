//! Maps source payloads into [`NormalizedEvent`]s.
//!
//! [`normalize`] is a pure function: no clock reads, no I/O. Either every
//! required field is present and a complete event comes back, or a
//! [`RejectionReason`] naming the first problem does.

use serde_json::Value;

use crate::payload::{
    Account, PullRequestPayload, PushPayload, Repository, SourceEventType, SourcePayload,
};
use crate::{Author, BranchName, NormalizedEvent, RejectionReason, RepositoryName, Timestamp};

/// Normalises one webhook payload.
///
/// `event_type` is the transport-level hint (GitHub's `X-GitHub-Event`
/// header). Unknown hints yield [`RejectionReason::UnsupportedEventType`].
pub fn normalize(payload: &Value, event_type: &str) -> Result<NormalizedEvent, RejectionReason> {
    let event_type = SourceEventType::parse(event_type)?;
    match SourcePayload::from_value(event_type, payload)? {
        SourcePayload::Push(push) => normalize_push(&push),
        SourcePayload::PullRequest(pr) => normalize_pull_request(&pr),
    }
}

fn normalize_push(push: &PushPayload) -> Result<NormalizedEvent, RejectionReason> {
    let author = push
        .pusher
        .as_ref()
        .and_then(|p| p.name.as_deref())
        .and_then(Author::new)
        .ok_or_else(|| RejectionReason::missing("pusher.name"))?;
    let to_branch = push
        .git_ref
        .as_deref()
        .and_then(BranchName::from_ref)
        .ok_or_else(|| RejectionReason::missing("ref"))?;
    let repository = repository_name(push.repository.as_ref())?;

    let occurred_at = match push.head_commit.as_ref().and_then(|c| c.timestamp.as_deref()) {
        Some(ts) => parse_time("head_commit.timestamp", ts)?,
        None => push
            .repository
            .as_ref()
            .and_then(|r| r.pushed_at.as_ref())
            .ok_or_else(|| RejectionReason::missing("head_commit.timestamp"))
            .and_then(|v| parse_time_value("repository.pushed_at", v))?,
    };

    Ok(NormalizedEvent::push(author, to_branch, repository, occurred_at))
}

/// Pull request sub-state, as far as event records are concerned.
enum PullRequestState {
    Open,
    Merged,
}

fn classify(pr: &PullRequestPayload) -> Result<PullRequestState, RejectionReason> {
    let action = pr
        .action
        .as_deref()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| RejectionReason::missing("action"))?;
    let merged = pr
        .pull_request
        .as_ref()
        .and_then(|p| p.merged)
        .unwrap_or(false);

    match action {
        "opened" | "reopened" | "synchronize" => Ok(PullRequestState::Open),
        "closed" if merged => Ok(PullRequestState::Merged),
        other => Err(RejectionReason::IgnoredAction {
            action: other.to_string(),
        }),
    }
}

fn normalize_pull_request(payload: &PullRequestPayload) -> Result<NormalizedEvent, RejectionReason> {
    let state = classify(payload)?;
    let pr = payload
        .pull_request
        .as_ref()
        .ok_or_else(|| RejectionReason::missing("pull_request"))?;

    let to_branch = pr
        .base
        .as_ref()
        .and_then(|b| b.git_ref.as_deref())
        .and_then(BranchName::from_ref)
        .ok_or_else(|| RejectionReason::missing("pull_request.base.ref"))?;
    let from_branch = pr
        .head
        .as_ref()
        .and_then(|h| h.git_ref.as_deref())
        .and_then(BranchName::from_ref)
        .ok_or_else(|| RejectionReason::missing("pull_request.head.ref"))?;
    let repository = repository_name(payload.repository.as_ref())?;

    match state {
        PullRequestState::Merged => {
            let author = login(pr.merged_by.as_ref())
                .or_else(|| login(payload.sender.as_ref()))
                .ok_or_else(|| RejectionReason::missing("pull_request.merged_by.login"))?;
            let merged_at = pr
                .merged_at
                .as_deref()
                .ok_or_else(|| RejectionReason::missing("pull_request.merged_at"))?;
            let occurred_at = parse_time("pull_request.merged_at", merged_at)?;
            Ok(NormalizedEvent::merge(
                author,
                to_branch,
                from_branch,
                repository,
                occurred_at,
            ))
        }
        PullRequestState::Open => {
            let author = login(pr.user.as_ref())
                .or_else(|| login(payload.sender.as_ref()))
                .ok_or_else(|| RejectionReason::missing("pull_request.user.login"))?;
            let occurred_at = match (pr.updated_at.as_deref(), pr.created_at.as_deref()) {
                (Some(ts), _) => parse_time("pull_request.updated_at", ts)?,
                (None, Some(ts)) => parse_time("pull_request.created_at", ts)?,
                (None, None) => return Err(RejectionReason::missing("pull_request.created_at")),
            };
            Ok(NormalizedEvent::pull_request(
                author,
                to_branch,
                from_branch,
                repository,
                occurred_at,
            ))
        }
    }
}

fn login(account: Option<&Account>) -> Option<Author> {
    account.and_then(|a| a.login.as_deref()).and_then(Author::new)
}

/// Prefers the owner-qualified name; falls back to the short name.
fn repository_name(repo: Option<&Repository>) -> Result<RepositoryName, RejectionReason> {
    let repo = repo.ok_or_else(|| RejectionReason::missing("repository"))?;
    repo.full_name
        .as_deref()
        .and_then(RepositoryName::new)
        .or_else(|| repo.name.as_deref().and_then(RepositoryName::new))
        .ok_or_else(|| RejectionReason::missing("repository.full_name"))
}

fn parse_time(field: &str, value: &str) -> Result<Timestamp, RejectionReason> {
    Timestamp::parse_rfc3339(value)
        .ok_or_else(|| RejectionReason::invalid(field, format!("'{value}' is not an RFC 3339 timestamp")))
}

fn parse_time_value(field: &str, value: &Value) -> Result<Timestamp, RejectionReason> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(Timestamp::from_unix_seconds)
            .ok_or_else(|| RejectionReason::invalid(field, format!("{n} is not a Unix timestamp"))),
        Value::String(s) => parse_time(field, s),
        Value::Null => Err(RejectionReason::missing(field)),
        other => Err(RejectionReason::invalid(
            field,
            format!("expected a timestamp, found {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventAction;
    use serde_json::json;

    fn push_payload() -> Value {
        json!({
            "ref": "refs/heads/main",
            "pusher": { "name": "alice", "email": "alice@example.com" },
            "repository": { "name": "r1", "full_name": "octo/r1", "pushed_at": 1617312600 },
            "head_commit": { "id": "abc", "timestamp": "2021-04-01T21:30:00Z" }
        })
    }

    fn pull_request_payload(action: &str, merged: bool) -> Value {
        let (merged_by, merged_at) = if merged {
            (json!({ "login": "bob" }), json!("2021-04-02T10:00:00Z"))
        } else {
            (Value::Null, Value::Null)
        };
        json!({
            "action": action,
            "pull_request": {
                "merged": merged,
                "merged_by": merged_by,
                "merged_at": merged_at,
                "created_at": "2021-04-01T08:00:00Z",
                "updated_at": "2021-04-01T09:00:00Z",
                "user": { "login": "carol" },
                "base": { "ref": "main" },
                "head": { "ref": "feature" }
            },
            "repository": { "name": "r1", "full_name": "octo/r1" },
            "sender": { "login": "dave" }
        })
    }

    #[test]
    fn push_maps_pusher_ref_and_commit_time() {
        let event = normalize(&push_payload(), "push").unwrap();
        assert_eq!(event.action(), EventAction::Push);
        assert_eq!(event.author().as_str(), "alice");
        assert_eq!(event.to_branch().as_str(), "main");
        assert!(event.from_branch().is_none());
        assert_eq!(event.repository().as_str(), "octo/r1");
        assert_eq!(
            event.occurred_at(),
            Timestamp::parse_rfc3339("2021-04-01T21:30:00Z").unwrap()
        );
    }

    #[test]
    fn push_without_head_commit_falls_back_to_pushed_at() {
        let mut payload = push_payload();
        payload["head_commit"] = Value::Null;
        let event = normalize(&payload, "push").unwrap();
        assert_eq!(event.occurred_at(), Timestamp::from_unix_seconds(1617312600).unwrap());
    }

    #[test]
    fn push_without_any_time_is_malformed() {
        let mut payload = push_payload();
        payload["head_commit"] = Value::Null;
        payload["repository"]["pushed_at"] = Value::Null;
        let err = normalize(&payload, "push").unwrap_err();
        assert_eq!(err, RejectionReason::missing("head_commit.timestamp"));
    }

    #[test]
    fn push_without_author_is_malformed() {
        let mut payload = push_payload();
        payload["pusher"] = json!({});
        assert_eq!(
            normalize(&payload, "push").unwrap_err(),
            RejectionReason::missing("pusher.name")
        );

        payload["pusher"] = json!({ "name": "" });
        assert_eq!(
            normalize(&payload, "push").unwrap_err(),
            RejectionReason::missing("pusher.name")
        );
    }

    #[test]
    fn repository_falls_back_to_short_name() {
        let mut payload = push_payload();
        payload["repository"]["full_name"] = Value::Null;
        let event = normalize(&payload, "push").unwrap();
        assert_eq!(event.repository().as_str(), "r1");
    }

    #[test]
    fn opened_pull_request_is_a_pull_request_event() {
        for action in ["opened", "reopened", "synchronize"] {
            let event = normalize(&pull_request_payload(action, false), "pull_request").unwrap();
            assert_eq!(event.action(), EventAction::PullRequest);
            assert_eq!(event.author().as_str(), "carol");
            assert_eq!(event.to_branch().as_str(), "main");
            assert_eq!(event.from_branch().unwrap().as_str(), "feature");
            assert_eq!(
                event.occurred_at(),
                Timestamp::parse_rfc3339("2021-04-01T09:00:00Z").unwrap()
            );
        }
    }

    #[test]
    fn merged_pull_request_is_a_merge_event() {
        let event = normalize(&pull_request_payload("closed", true), "pull_request").unwrap();
        assert_eq!(event.action(), EventAction::Merge);
        assert_eq!(event.author().as_str(), "bob");
        assert_eq!(event.from_branch().unwrap().as_str(), "feature");
        assert_eq!(
            event.occurred_at(),
            Timestamp::parse_rfc3339("2021-04-02T10:00:00Z").unwrap()
        );
    }

    #[test]
    fn merge_author_falls_back_to_sender() {
        let mut payload = pull_request_payload("closed", true);
        payload["pull_request"]["merged_by"] = Value::Null;
        let event = normalize(&payload, "pull_request").unwrap();
        assert_eq!(event.author().as_str(), "dave");
    }

    #[test]
    fn closed_without_merge_and_other_actions_are_ignored() {
        for action in ["closed", "labeled", "edited"] {
            let err = normalize(&pull_request_payload(action, false), "pull_request").unwrap_err();
            assert_eq!(
                err,
                RejectionReason::IgnoredAction {
                    action: action.to_string()
                }
            );
        }
    }

    #[test]
    fn pull_request_missing_head_ref_is_malformed() {
        let mut payload = pull_request_payload("opened", false);
        payload["pull_request"]["head"] = json!({ "ref": "" });
        assert_eq!(
            normalize(&payload, "pull_request").unwrap_err(),
            RejectionReason::missing("pull_request.head.ref")
        );
    }

    #[test]
    fn pull_request_without_any_author_is_malformed() {
        let mut payload = pull_request_payload("opened", false);
        payload["pull_request"]["user"] = Value::Null;
        payload["sender"] = Value::Null;
        assert_eq!(
            normalize(&payload, "pull_request").unwrap_err(),
            RejectionReason::missing("pull_request.user.login")
        );
    }

    #[test]
    fn unparseable_timestamp_is_malformed() {
        let mut payload = pull_request_payload("closed", true);
        payload["pull_request"]["merged_at"] = json!("yesterday");
        let err = normalize(&payload, "pull_request").unwrap_err();
        assert!(matches!(
            err,
            RejectionReason::MalformedPayload { ref field, .. } if field == "pull_request.merged_at"
        ));
    }

    #[test]
    fn unknown_event_type_is_unsupported() {
        let err = normalize(&push_payload(), "issue_comment").unwrap_err();
        assert_eq!(
            err,
            RejectionReason::UnsupportedEventType {
                event_type: "issue_comment".to_string()
            }
        );
    }

    #[test]
    fn identical_input_normalises_identically() {
        let payload = pull_request_payload("opened", false);
        assert_eq!(
            normalize(&payload, "pull_request").unwrap(),
            normalize(&payload, "pull_request").unwrap()
        );
    }
}
