use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;
mod view;

const DEFAULT_LOG_FILTER: &str = "planora_core=info,planora_cli=info";

#[derive(Parser)]
#[command(name = "planora-cli", version, about = "Planora study timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Study timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// List subjects available on the server
    Subjects,
    /// Session history from the server
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Logs go to stderr so stdout stays parseable JSON.
fn init_logging() {
    let filter = EnvFilter::try_from_env("PLANORA_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Subjects => commands::subjects::run().await,
        Commands::Stats { action } => commands::stats::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "planora-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::timer::TimerAction;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_timer_start_overrides() {
        let cli = Cli::try_parse_from([
            "planora-cli",
            "timer",
            "start",
            "--subject",
            "Physics",
            "--cycles",
            "3",
            "--focus",
            "25",
            "--break-minutes",
            "0",
        ])
        .unwrap();
        match cli.command {
            Commands::Timer {
                action:
                    TimerAction::Start {
                        subject,
                        cycles,
                        focus,
                        break_minutes,
                    },
            } => {
                assert_eq!(subject.as_deref(), Some("Physics"));
                assert_eq!(cycles, Some(3));
                assert_eq!(focus, Some(25));
                assert_eq!(break_minutes, Some(0));
            }
            _ => panic!("expected timer start"),
        }
    }

    #[test]
    fn parses_modal_actions() {
        for (arg, expected) in [
            ("accept-break", "AcceptBreak"),
            ("skip-break", "SkipBreak"),
            ("continue", "Continue"),
            ("ack", "Ack"),
        ] {
            let cli = Cli::try_parse_from(["planora-cli", "timer", arg]).unwrap();
            let Commands::Timer { action } = cli.command else {
                panic!("expected timer command");
            };
            assert_eq!(format!("{action:?}"), expected);
        }
    }

    #[test]
    fn reset_accepts_yes_flag() {
        let cli = Cli::try_parse_from(["planora-cli", "timer", "reset", "--yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Timer {
                action: TimerAction::Reset { yes: true }
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_cycles() {
        assert!(Cli::try_parse_from(["planora-cli", "timer", "start", "--cycles", "four"]).is_err());
    }
}
