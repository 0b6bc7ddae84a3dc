use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

/// Track your open-source pull requests and find issues worth picking up.
#[derive(Debug, Parser)]
#[clap(author, version, bin_name = "ossmate")]
pub struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and classify your open pull requests.
    Prs,

    /// Vet a single issue by URL.
    Vet(VetArgs),

    /// Search for issues, starred repositories first.
    Search(SearchArgs),

    /// Show or update the trust score of a repository.
    Score(ScoreArgs),

    /// Read or change settings.
    #[clap(subcommand)]
    Config(ConfigCommand),

    /// Stop tracking a pull request or issue.
    Untrack(UntrackArgs),

    /// Summarize the event log.
    Stats,

    /// Inspect and restore state backups.
    #[clap(subcommand)]
    State(StateCommand),
}

#[derive(Debug, Args)]
pub struct VetArgs {
    /// `https://github.com/{owner}/{repo}/issues/{number}`
    pub url: String,

    /// Start tracking the issue after vetting it.
    #[arg(long)]
    pub track: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Most candidates to return.
    #[arg(long = "max", default_value_t = ossmate_core::DEFAULT_MAX_RESULTS)]
    pub max_results: usize,
}

#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// Repository as `owner/repo`.
    pub repo: String,

    #[arg(long)]
    pub responsive: Option<bool>,

    #[arg(long = "active-maintainers")]
    pub active_maintainers: Option<bool>,

    #[arg(long)]
    pub hostile: Option<bool>,

    /// Average days until a maintainer responds.
    #[arg(long = "avg-response-days")]
    pub avg_response_days: Option<f64>,
}

impl ScoreArgs {
    pub fn update(&self) -> ossmate_state::RepoScoreUpdate {
        ossmate_state::RepoScoreUpdate {
            avg_response_days: self.avg_response_days,
            has_active_maintainers: self.active_maintainers,
            is_responsive: self.responsive,
            has_hostile_comments: self.hostile,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print one key, or the whole config.
    Get { key: Option<String> },

    /// Set a key. List values are comma-separated; an empty value clears
    /// optional keys.
    Set { key: String, value: String },

    /// List the settable keys.
    Keys,
}

#[derive(Debug, Args)]
pub struct UntrackArgs {
    /// Pull request or issue URL.
    pub url: String,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// List backups, newest first.
    Backups,

    /// Replace the state file with a backup. The current file is backed up
    /// first.
    Restore { backup: PathBuf },
}
