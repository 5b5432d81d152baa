use clap::Subcommand;
use planora_core::{Config, PlanoraClient};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Most recent sessions
    Recent {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Aggregates over the last N days
    Summary {
        #[arg(long, default_value = "7")]
        days: u32,
    },
}

pub async fn run(action: StatsAction) -> CliResult {
    let config = Config::load_or_default();
    let client = PlanoraClient::from_config(&config)?;
    let user_id = config.user.user_id.as_deref();

    match action {
        StatsAction::Recent { limit } => {
            let sessions = client.recent_sessions(user_id, limit).await?;
            print_json(&sessions)?;
        }
        StatsAction::Summary { days } => {
            let stats = client.session_stats(user_id, days).await?;
            print_json(&stats)?;
        }
    }
    Ok(())
}
