use clap::Parser;
use ossmate_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    ossmate_cli::init_logging();
    ossmate_cli::run_main(cli).await
}
