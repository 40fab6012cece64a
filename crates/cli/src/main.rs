use clap::Parser;

use basaltpass_cli::{Cli, run};
use basaltpass_session::SessionConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        basaltpass_observability::init();
    } else {
        basaltpass_observability::init_pretty();
    }

    let config = SessionConfig::load()?;
    let output = run(cli.command, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
