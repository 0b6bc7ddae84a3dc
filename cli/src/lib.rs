//! The `ossmate` command line: resolves the home directory, loads state,
//! runs one core operation and saves the result.

mod args;
mod output;

pub use args::Cli;
pub use args::Command;
pub use args::ConfigCommand;
pub use args::StateCommand;

use anyhow::Context;
use anyhow::bail;
use chrono::Utc;
use ossmate_core::CoreError;
use ossmate_core::IssueVetter;
use ossmate_core::REPORT_FILENAME;
use ossmate_github::GithubClient;
use ossmate_state::Config;
use ossmate_state::StateStore;
use ossmate_state::resolve_home;
use output::Printer;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Credential variables, in lookup order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` overrides the
/// default level.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(output::stderr_supports_color())
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

fn github_client() -> anyhow::Result<GithubClient> {
    let token = TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty());
    let Some(token) = token else {
        bail!(CoreError::Authentication(format!(
            "no GitHub token; set {} or {}",
            TOKEN_ENV_VARS[0], TOKEN_ENV_VARS[1]
        )));
    };
    Ok(GithubClient::new(token.trim())?)
}

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let home = resolve_home().context("failed to resolve the ossmate home directory")?;
    let store = StateStore::new(home);
    let printer = Printer::new(cli.json);
    let now = Utc::now();

    match cli.command {
        Command::Prs => {
            let host = github_client()?;
            let mut doc = store.load_at(now);
            let report = ossmate_core::sync_prs(&host, &mut doc, now).await?;
            store.save_at(&mut doc, now)?;
            printer.print(&report, output::sync_report)?;
        }
        Command::Vet(args) => {
            let host = github_client()?;
            let mut doc = store.load_at(now);
            let vetter = IssueVetter::default();
            let candidate = ossmate_core::vet_issue(&host, &mut doc, &vetter, &args.url, now).await?;
            if args.track && !ossmate_core::track_issue(&mut doc, &candidate, now) {
                tracing::info!("{} is already tracked", candidate.issue.url);
            }
            store.save_at(&mut doc, now)?;
            printer.print(&candidate, output::candidate)?;
        }
        Command::Search(args) => {
            let host = github_client()?;
            let mut doc = store.load_at(now);
            let vetter = IssueVetter::default();
            let report_path = store.home().join(REPORT_FILENAME);
            let report = ossmate_core::search_issues(
                &host,
                &mut doc,
                &vetter,
                args.max_results,
                &report_path,
                now,
            )
            .await?;
            store.save_at(&mut doc, now)?;
            printer.print(&report, output::search_report)?;
        }
        Command::Score(args) => {
            let mut doc = store.load_at(now);
            let update = args.update();
            if update.is_empty() {
                let repo = ossmate_github::RepoRef::parse(&args.repo)?;
                match doc.repo_scores.get(&repo.full_name()) {
                    Some(score) => printer.print(score, output::repo_score)?,
                    None => printer.print(
                        &json!({ "repo": repo.full_name(), "score": null }),
                        |_| format!("no score recorded for {repo}"),
                    )?,
                }
                return Ok(());
            }
            let score = ossmate_core::update_repo_score(&mut doc, &args.repo, update, now)?;
            store.save_at(&mut doc, now)?;
            printer.print(&score, output::repo_score)?;
        }
        Command::Config(ConfigCommand::Get { key }) => {
            let doc = store.load_at(now);
            let value = ossmate_core::read_config(&doc, key.as_deref())?;
            printer.print(&value, output::config_value)?;
        }
        Command::Config(ConfigCommand::Set { key, value }) => {
            let mut doc = store.load_at(now);
            let stored = ossmate_core::write_config(&mut doc, &key, &value, now)?;
            store.save_at(&mut doc, now)?;
            printer.print(&json!({ "key": &key, "value": &stored }), |_| {
                format!("{key} = {}", output::config_value(&stored))
            })?;
        }
        Command::Config(ConfigCommand::Keys) => {
            let keys: Vec<&str> = Config::keys().collect();
            printer.print(&keys, |keys| keys.join("\n"))?;
        }
        Command::Untrack(args) => {
            let mut doc = store.load_at(now);
            let message = match ossmate_core::untrack_pr(&mut doc, &args.url, now) {
                Ok(bucket) => format!("stopped tracking {} ({bucket})", args.url),
                Err(CoreError::NotFound(_)) => {
                    ossmate_core::untrack_issue(&mut doc, &args.url, now)?;
                    format!("stopped tracking {}", args.url)
                }
                Err(err) => return Err(err.into()),
            };
            store.save_at(&mut doc, now)?;
            printer.print(&json!({ "untracked": &args.url }), |_| message.clone())?;
        }
        Command::Stats => {
            let doc = store.load_at(now);
            let stats = ossmate_core::event_stats(&doc);
            printer.print(&stats, output::event_stats)?;
        }
        Command::State(StateCommand::Backups) => {
            let backups = store.list_backups()?;
            printer.print(&backups, |backups| {
                if backups.is_empty() {
                    return "no backups".to_string();
                }
                backups
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Command::State(StateCommand::Restore { backup }) => {
            let doc = store
                .restore_backup(&backup)
                .with_context(|| format!("failed to restore {}", backup.display()))?;
            printer.print(&json!({ "restored": &backup, "version": doc.version }), |_| {
                format!("restored state from {}", backup.display())
            })?;
        }
    }
    Ok(())
}
