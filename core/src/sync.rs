//! Fetch-and-classify for the user's open pull requests.

use crate::classify::fetch_and_classify;
use crate::error::CoreError;
use crate::error::ItemFailure;
use crate::error::Result;
use crate::fanout::run_bounded;
use crate::status::Thresholds;
use chrono::DateTime;
use chrono::Utc;
use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::IssueRef;
use ossmate_state::Digest;
use ossmate_state::EventType;
use ossmate_state::PrBucket;
use ossmate_state::PrStatus;
use ossmate_state::StateDocument;
use ossmate_state::TrackedPr;
use serde::Serialize;
use serde_json::json;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::HashSet;
use tracing::info;
use tracing::warn;

/// GitHub search never returns more than this many results.
pub const MAX_OPEN_PRS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Open PRs, most urgent first.
    pub prs: Vec<TrackedPr>,
    pub merged: Vec<TrackedPr>,
    pub closed: Vec<TrackedPr>,
    pub failures: Vec<ItemFailure>,
    pub digest: Digest,
}

pub fn open_pr_query(username: &str) -> String {
    format!("is:pr is:open author:{username} archived:false")
}

/// Classifies every open PR authored by the configured user, moves PRs that
/// have since merged or closed into history and replaces the digest.
pub async fn sync_prs(
    host: &dyn GithubHost,
    doc: &mut StateDocument,
    now: DateTime<Utc>,
) -> Result<SyncReport> {
    let username = doc
        .config
        .github_username
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            CoreError::MissingConfig(
                "githubUsername is not set; run `ossmate config set githubUsername <login>`"
                    .to_string(),
            )
        })?;
    let thresholds = Thresholds::from(&doc.config);

    let found = host.search_issues(&open_pr_query(&username), MAX_OPEN_PRS).await?;
    info!("found {} open pull requests for {username}", found.len());

    let mut failures = Vec::new();
    let mut open_urls: HashSet<String> = HashSet::new();
    let mut refs = Vec::new();
    for item in found {
        open_urls.insert(item.html_url.clone());
        match IssueRef::parse_url(&item.html_url) {
            Ok(pr) => refs.push((item.html_url, pr)),
            Err(err) => failures.push(ItemFailure::new(item.html_url, err)),
        }
    }

    let username = username.as_str();
    let classified = run_bounded(refs, move |(url, pr)| async move {
        let result = fetch_and_classify(host, &pr, username, thresholds, now).await;
        (url, result)
    })
    .await;

    let mut prs = Vec::new();
    for (url, result) in classified {
        match result {
            Ok(tracked) => prs.push(tracked),
            Err(HostError::Auth(message)) => return Err(CoreError::Authentication(message)),
            Err(err) => {
                warn!("failed to classify {url}: {err}");
                failures.push(ItemFailure::new(url, err));
            }
        }
    }

    let (merged, closed) = settle_vanished(host, doc, &open_urls, &mut failures, now).await?;

    for pr in &prs {
        let bucket = if pr.status == PrStatus::Dormant {
            PrBucket::Dormant
        } else {
            PrBucket::Active
        };
        let previous_status = doc.find_pr(&pr.url).map(|(_, existing)| existing.status);
        doc.place_pr(pr.clone(), bucket);
        match previous_status {
            None => {
                doc.record_event(
                    EventType::PrTracked,
                    json!({ "url": pr.url, "status": pr.status }),
                    now,
                );
            }
            Some(previous) if previous != pr.status => {
                doc.record_event(
                    EventType::PrStatusChanged,
                    json!({ "url": pr.url, "from": previous, "to": pr.status }),
                    now,
                );
            }
            Some(_) => {}
        }
    }

    sort_by_urgency(&mut prs);
    failures.sort_by(|a, b| a.url.cmp(&b.url));

    let digest = build_digest(doc, &prs, &merged, &closed, failures.len(), now);
    doc.last_digest = Some(digest.clone());

    Ok(SyncReport {
        prs,
        merged,
        closed,
        failures,
        digest,
    })
}

/// Tracked open PRs missing from the search results are re-fetched and moved
/// to the merged or closed history when they have finished.
async fn settle_vanished(
    host: &dyn GithubHost,
    doc: &mut StateDocument,
    open_urls: &HashSet<String>,
    failures: &mut Vec<ItemFailure>,
    now: DateTime<Utc>,
) -> Result<(Vec<TrackedPr>, Vec<TrackedPr>)> {
    let vanished: Vec<TrackedPr> = doc
        .open_prs()
        .filter(|pr| !open_urls.contains(&pr.url))
        .cloned()
        .collect();
    if vanished.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let fetched = run_bounded(vanished, move |tracked| async move {
        let result = match IssueRef::parse_url(&tracked.url) {
            Ok(pr) => host.get_pull_request(&pr.repo, pr.number).await,
            Err(err) => Err(HostError::Other(err.to_string())),
        };
        (tracked, result)
    })
    .await;

    let mut merged = Vec::new();
    let mut closed = Vec::new();
    for (mut tracked, result) in fetched {
        let pull_request = match result {
            Ok(pull_request) => pull_request,
            Err(HostError::Auth(message)) => return Err(CoreError::Authentication(message)),
            Err(err) => {
                warn!("failed to refresh {}: {err}", tracked.url);
                failures.push(ItemFailure::new(&tracked.url, err));
                continue;
            }
        };
        if pull_request.is_open() {
            continue;
        }
        tracked.title = pull_request.title.clone();
        tracked.updated_at = pull_request.updated_at;
        tracked.last_checked_at = Some(now);
        if pull_request.is_merged() {
            tracked.merged_at = pull_request.merged_at.or(Some(now));
            info!("{} was merged", tracked.url);
            doc.record_merge(tracked.clone(), now);
            merged.push(tracked);
        } else {
            tracked.closed_at = pull_request.closed_at.or(Some(now));
            info!("{} was closed without merging", tracked.url);
            doc.record_close(tracked.clone(), now);
            closed.push(tracked);
        }
    }
    merged.sort_by(|a, b| a.url.cmp(&b.url));
    closed.sort_by(|a, b| a.url.cmp(&b.url));
    Ok((merged, closed))
}

/// Priority, then longest idle, then URL.
pub fn sort_by_urgency(prs: &mut [TrackedPr]) {
    prs.sort_by(|a, b| {
        (a.status.priority(), Reverse(a.days_since_activity), &a.url).cmp(&(
            b.status.priority(),
            Reverse(b.days_since_activity),
            &b.url,
        ))
    });
}

fn build_digest(
    doc: &StateDocument,
    prs: &[TrackedPr],
    merged: &[TrackedPr],
    closed: &[TrackedPr],
    failures: usize,
    now: DateTime<Utc>,
) -> Digest {
    let mut status_counts = BTreeMap::new();
    for pr in prs {
        *status_counts.entry(pr.status).or_insert(0) += 1;
    }
    Digest {
        generated_at: now,
        status_counts,
        merged: merged.iter().map(|pr| pr.url.clone()).collect(),
        closed: closed.iter().map(|pr| pr.url.clone()).collect(),
        failures,
        total_active: doc.prs(PrBucket::Active).len(),
        total_dormant: doc.prs(PrBucket::Dormant).len(),
    }
}

/// Stops tracking a PR wherever it is held.
pub fn untrack_pr(doc: &mut StateDocument, url: &str, now: DateTime<Utc>) -> Result<PrBucket> {
    doc.untrack_pr(url, now)
        .map(|(bucket, _)| bucket)
        .ok_or_else(|| CoreError::NotFound(format!("{url} is not tracked")))
}
