use planora_core::{Config, PlanoraClient};

use super::{print_json, CliResult};

/// Print the server's subject list. An unreachable server yields `[]`.
pub async fn run() -> CliResult {
    let config = Config::load_or_default();
    let client = PlanoraClient::from_config(&config)?;
    let subjects = client.fetch_subjects().await;
    print_json(&subjects)
}
