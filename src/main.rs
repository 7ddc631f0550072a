use clap::Parser;

use hanzi_flashcards::commands::{self, Cli};
use hanzi_flashcards::config::Config;
use hanzi_flashcards::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config);

    let cli = Cli::parse();
    if let Err(e) = commands::run(cli, config).await {
        tracing::error!(error = %e, "command failed");
        return Err(e);
    }
    Ok(())
}
