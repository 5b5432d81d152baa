use clap::Subcommand;
use planora_core::{Config, ConfigError};

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value (e.g. "server.base_url", "session.focus_minutes")
    Get { key: String },
    /// Change one value and save; an empty value clears optional fields
    Set { key: String, value: String },
    /// Print the whole configuration as JSON
    List,
    /// Overwrite the config file with defaults
    Reset,
}

fn lookup(config: &Config, key: &str) -> Result<String, ConfigError> {
    config
        .get(key)
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let value = lookup(&Config::load()?, &key)?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("{key} = {}", lookup(&config, &key)?);
        }
        ConfigAction::List => super::print_json(&Config::load()?)?,
        ConfigAction::Reset => {
            Config::default().save()?;
            eprintln!("configuration reset to defaults");
        }
    }
    Ok(())
}
