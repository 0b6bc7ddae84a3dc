//! Conversation analysis for a pull request: did someone other than the
//! author speak last, and what did they ask for.

use chrono::DateTime;
use chrono::Utc;
use ossmate_github::types::IssueComment;
use ossmate_github::types::Review;
use ossmate_github::types::User;
use ossmate_state::MaintainerActionHint;
use ossmate_state::MaintainerComment;
use ossmate_state::ReviewDecision;
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const MAX_COMMENT_PREVIEW_CHARS: usize = 200;

/// Review states that do not ask the author for anything.
const SILENT_REVIEW_STATES: &[&str] = &["APPROVED", "DISMISSED", "PENDING"];

/// Ordered phrase table. Earlier rows win when hints are listed.
static HINT_TABLE: LazyLock<Vec<(Regex, MaintainerActionHint)>> = LazyLock::new(|| {
    [
        (
            r"(?i)\b(changes requested|please (change|update|fix|address)|could you (change|update|fix))\b",
            MaintainerActionHint::ChangesRequested,
        ),
        (
            r"(?i)\b(add (a |some )?(unit |integration )?tests?|needs? (a |more )?tests?|missing tests?|test coverage)\b",
            MaintainerActionHint::NeedsTests,
        ),
        (
            r"(?i)\b(docs|documentation|readme|docstrings?)\b",
            MaintainerActionHint::NeedsDocs,
        ),
        (
            r"(?i)\b(rebase|merge conflicts?|resolve (the )?conflicts?)\b",
            MaintainerActionHint::NeedsRebase,
        ),
        (
            r"(?i)\b(changelog|change log|release notes?)\b",
            MaintainerActionHint::NeedsChangelog,
        ),
        (
            r"(?i)\b(cla|contributor license agreement|sign(ed)?[- ]off|dco)\b",
            MaintainerActionHint::NeedsCla,
        ),
    ]
    .into_iter()
    .map(|(pattern, hint)| (compile_regex(pattern), hint))
    .collect()
});

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Every pattern is compiled by `hint_table_compiles`.
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    author: String,
    is_user: bool,
    is_bot: bool,
    body: String,
    at: DateTime<Utc>,
}

/// Comments from others posted after the user's last word, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unresponded {
    pub comments: Vec<MaintainerComment>,
}

impl Unresponded {
    pub fn has_any(&self) -> bool {
        !self.comments.is_empty()
    }

    pub fn latest(&self) -> Option<&MaintainerComment> {
        self.comments.last()
    }
}

/// Merges issue comments and review submissions into one timeline and
/// returns the non-bot entries from other people strictly after the user's
/// last entry. With no user entries every such entry counts.
pub fn find_unresponded(username: &str, comments: &[IssueComment], reviews: &[Review]) -> Unresponded {
    let mut entries: Vec<Entry> = comments
        .iter()
        .map(|comment| entry(username, comment.user.as_ref(), comment.body.as_deref(), comment.created_at))
        .chain(
            reviews
                .iter()
                .filter(|review| !SILENT_REVIEW_STATES.contains(&review.state.as_str()))
                .filter_map(|review| {
                    let at = review.submitted_at?;
                    Some(entry(username, review.user.as_ref(), review.body.as_deref(), at))
                }),
        )
        .collect();
    entries.sort_by_key(|entry| entry.at);

    let cutoff = entries
        .iter()
        .filter(|entry| entry.is_user)
        .map(|entry| entry.at)
        .max();

    let comments = entries
        .into_iter()
        .filter(|entry| !entry.is_user && !entry.is_bot)
        .filter(|entry| cutoff.is_none_or(|cutoff| entry.at > cutoff))
        .map(|entry| MaintainerComment {
            author: entry.author,
            body: truncate_preview(&entry.body),
            at: entry.at,
        })
        .collect();
    Unresponded { comments }
}

fn entry(username: &str, user: Option<&User>, body: Option<&str>, at: DateTime<Utc>) -> Entry {
    let author = user.map(|user| user.login.clone()).unwrap_or_else(|| "ghost".to_string());
    Entry {
        is_user: author.eq_ignore_ascii_case(username),
        is_bot: user.is_some_and(User::is_bot),
        author,
        body: body.unwrap_or_default().trim().to_string(),
        at,
    }
}

/// At most [`MAX_COMMENT_PREVIEW_CHARS`] characters, ellipsis included.
pub fn truncate_preview(body: &str) -> String {
    if body.chars().count() <= MAX_COMMENT_PREVIEW_CHARS {
        return body.to_string();
    }
    let mut preview: String = body.chars().take(MAX_COMMENT_PREVIEW_CHARS - 3).collect();
    preview.push_str("...");
    preview
}

/// Hints found in the unresponded comments, in table order without
/// duplicates. A changes-requested review always contributes its hint.
pub fn action_hints(unresponded: &Unresponded, decision: ReviewDecision) -> Vec<MaintainerActionHint> {
    HINT_TABLE
        .iter()
        .filter(|(pattern, hint)| {
            (*hint == MaintainerActionHint::ChangesRequested
                && decision == ReviewDecision::ChangesRequested)
                || unresponded
                    .comments
                    .iter()
                    .any(|comment| pattern.is_match(&comment.body))
        })
        .map(|(_, hint)| *hint)
        .collect()
}

/// Latest non-pending review per reviewer decides.
pub fn review_decision(reviews: &[Review]) -> ReviewDecision {
    let mut latest: HashMap<&str, (DateTime<Utc>, &str)> = HashMap::new();
    for review in reviews {
        if review.state == "PENDING" {
            continue;
        }
        let Some(user) = review.user.as_ref() else {
            continue;
        };
        let at = review.submitted_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let slot = latest.entry(user.login.as_str()).or_insert((at, review.state.as_str()));
        if at >= slot.0 {
            *slot = (at, review.state.as_str());
        }
    }

    if latest.is_empty() {
        ReviewDecision::NoReview
    } else if latest.values().any(|(_, state)| *state == "CHANGES_REQUESTED") {
        ReviewDecision::ChangesRequested
    } else if latest.values().any(|(_, state)| *state == "APPROVED") {
        ReviewDecision::Approved
    } else {
        ReviewDecision::ReviewRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0)
            .single()
            .expect("valid time")
    }

    fn user(login: &str) -> Option<User> {
        Some(User {
            login: login.to_string(),
            account_type: Some("User".to_string()),
        })
    }

    fn comment(login: &str, body: &str, hour: u32) -> IssueComment {
        IssueComment {
            user: user(login),
            body: Some(body.to_string()),
            created_at: at(hour),
            html_url: None,
        }
    }

    fn review(login: &str, state: &str, body: &str, hour: u32) -> Review {
        Review {
            user: user(login),
            state: state.to_string(),
            body: Some(body.to_string()),
            submitted_at: Some(at(hour)),
        }
    }

    #[test]
    fn hint_table_compiles() {
        assert_eq!(HINT_TABLE.len(), 6);
    }

    #[test]
    fn maintainer_comment_after_user_is_unresponded() {
        let comments = vec![
            comment("me", "Opened this", 1),
            comment("maintainer", "Please update the docs", 3),
        ];
        let unresponded = find_unresponded("me", &comments, &[]);
        assert!(unresponded.has_any());
        assert_eq!(
            unresponded.latest().map(|c| c.author.as_str()),
            Some("maintainer")
        );
    }

    #[test]
    fn user_reply_clears_earlier_comments() {
        let comments = vec![
            comment("maintainer", "Looks off", 1),
            comment("Me", "Fixed", 2),
        ];
        assert!(!find_unresponded("me", &comments, &[]).has_any());
    }

    #[test]
    fn bots_and_silent_reviews_are_ignored() {
        let mut bot = comment("dependabot[bot]", "Bump", 5);
        bot.user = Some(User {
            login: "codecov".to_string(),
            account_type: Some("Bot".to_string()),
        });
        let comments = vec![
            comment("me", "Ready", 1),
            comment("renovate[bot]", "Config", 4),
            bot,
        ];
        let reviews = vec![
            review("maintainer", "APPROVED", "LGTM", 6),
            review("other", "DISMISSED", "", 7),
        ];
        assert!(!find_unresponded("me", &comments, &reviews).has_any());
    }

    #[test]
    fn without_user_entries_everyone_else_counts() {
        let reviews = vec![review("maintainer", "CHANGES_REQUESTED", "Needs tests", 2)];
        let unresponded = find_unresponded("me", &[], &reviews);
        assert_eq!(unresponded.comments.len(), 1);
    }

    #[test]
    fn previews_are_truncated() {
        let long = "x".repeat(500);
        let preview = truncate_preview(&long);
        assert_eq!(preview.chars().count(), MAX_COMMENT_PREVIEW_CHARS);
        assert!(preview.ends_with("..."));
        assert_eq!(truncate_preview("short"), "short");
    }

    #[test]
    fn hints_follow_table_order_without_duplicates() {
        let comments = vec![
            comment("maintainer", "Please rebase onto main and add a changelog entry", 2),
            comment("maintainer", "Also add tests. And rebase again.", 3),
        ];
        let unresponded = find_unresponded("me", &comments, &[]);
        assert_eq!(
            action_hints(&unresponded, ReviewDecision::ChangesRequested),
            vec![
                MaintainerActionHint::ChangesRequested,
                MaintainerActionHint::NeedsTests,
                MaintainerActionHint::NeedsRebase,
                MaintainerActionHint::NeedsChangelog,
            ]
        );
        assert_eq!(
            action_hints(&Unresponded::default(), ReviewDecision::Approved),
            Vec::new()
        );
    }

    #[test]
    fn latest_review_per_reviewer_decides() {
        let reviews = vec![
            review("alice", "CHANGES_REQUESTED", "", 1),
            review("alice", "APPROVED", "", 2),
            review("bob", "COMMENTED", "", 3),
        ];
        assert_eq!(review_decision(&reviews), ReviewDecision::Approved);

        let reviews = vec![
            review("alice", "APPROVED", "", 1),
            review("bob", "CHANGES_REQUESTED", "", 2),
        ];
        assert_eq!(review_decision(&reviews), ReviewDecision::ChangesRequested);

        let reviews = vec![review("bob", "COMMENTED", "", 2), review("carol", "PENDING", "", 3)];
        assert_eq!(review_decision(&reviews), ReviewDecision::ReviewRequired);
        assert_eq!(review_decision(&[]), ReviewDecision::NoReview);
    }
}
