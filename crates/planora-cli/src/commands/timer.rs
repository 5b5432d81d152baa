use std::sync::Arc;

use clap::Subcommand;
use planora_core::display::{
    cycle_indicator, floating_status, format_countdown, format_study_time, session_format,
    session_status, session_total,
};
use planora_core::timer::{END_PROMPT, RESET_PROMPT};
use planora_core::{
    Config, Confirm, CoreError, Database, Event, HttpReporter, Phase, PlanoraClient, PresetAnswer,
    StudyTimerEngine, TimerShell, TimerSnapshot,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::{print_json, CliResult};
use crate::view::{is_yes, status_line, StdinConfirm, TerminalView};

#[derive(Debug, Subcommand)]
pub enum TimerAction {
    /// Start a session, or resume a paused one
    Start {
        /// Subject to study (defaults to session.subject)
        #[arg(long)]
        subject: Option<String>,
        /// Number of focus cycles
        #[arg(long)]
        cycles: Option<u32>,
        /// Focus minutes per cycle
        #[arg(long)]
        focus: Option<u32>,
        /// Break minutes between cycles
        #[arg(long)]
        break_minutes: Option<u32>,
    },
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Rewind the current phase
    Reset {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// End the session and report it
    End {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Take the offered break
    AcceptBreak,
    /// Skip the break and start the next cycle
    SkipBreak,
    /// Start the next cycle after a break
    Continue,
    /// Acknowledge session completion
    Ack,
    /// Print current timer state as JSON
    Status,
    /// Live countdown with interactive controls
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Start,
    Pause,
    Resume,
    Reset,
    End,
    AcceptBreak,
    SkipBreak,
    Continue,
    Ack,
}

impl Control {
    fn prompt(self) -> Option<&'static str> {
        match self {
            Control::Reset => Some(RESET_PROMPT),
            Control::End => Some(END_PROMPT),
            _ => None,
        }
    }
}

fn apply(engine: &mut StudyTimerEngine, control: Control) -> Result<Option<Event>, CoreError> {
    let event = match control {
        Control::Start => return engine.start(),
        Control::Resume => match engine.phase() {
            Phase::Paused => return engine.start(),
            _ => None,
        },
        Control::Pause => engine.pause(),
        Control::Reset => engine.reset_phase(),
        Control::End => engine.end_session(),
        Control::AcceptBreak => engine.accept_break(),
        Control::SkipBreak => engine.skip_break(),
        Control::Continue => engine.continue_after_break(),
        Control::Ack => engine.acknowledge_complete(),
    };
    Ok(event)
}

#[derive(Serialize)]
struct StatusReport<'a> {
    #[serde(flatten)]
    snapshot: &'a TimerSnapshot,
    countdown: String,
    cycle_indicator: String,
    session_status: &'static str,
    study_time: String,
    floating_status: Option<String>,
    session_format: String,
    session_total: String,
}

impl<'a> StatusReport<'a> {
    fn new(snapshot: &'a TimerSnapshot) -> Self {
        Self {
            snapshot,
            countdown: format_countdown(snapshot.time_remaining),
            cycle_indicator: cycle_indicator(snapshot),
            session_status: session_status(snapshot),
            study_time: format_study_time(snapshot.total_study_time),
            floating_status: floating_status(snapshot),
            session_format: session_format(&snapshot.session_config()),
            session_total: session_total(&snapshot.session_config()),
        }
    }
}

fn open_engine(config: &Config) -> Result<(StudyTimerEngine, Arc<HttpReporter>), CoreError> {
    let client = PlanoraClient::from_config(config)?;
    let reporter = Arc::new(HttpReporter::new(client)?);
    let db = Database::open()?;
    let mut engine = StudyTimerEngine::new(Box::new(db), reporter.clone());
    engine.set_user_id(config.user.user_id.clone());
    Ok((engine, reporter))
}

/// Apply time that passed while no process was running.
fn catch_up(engine: &mut StudyTimerEngine) -> CliResult {
    if let Some(event) = engine.restore() {
        print_json(&event)?;
    }
    if let Some(event) = engine.reconcile() {
        print_json(&event)?;
    }
    Ok(())
}

/// Apply session settings from config and flags when no session is open.
fn prepare_start(
    engine: &mut StudyTimerEngine,
    config: &Config,
    subject: Option<String>,
    cycles: Option<u32>,
    focus: Option<u32>,
    break_minutes: Option<u32>,
) -> Result<(), CoreError> {
    if engine.phase() != Phase::Idle {
        if subject.is_some() || cycles.is_some() || focus.is_some() || break_minutes.is_some() {
            warn!("a session is already open, ignoring session options");
        }
        return Ok(());
    }
    let mut session = config.session.session_config();
    if let Some(cycles) = cycles {
        session.total_cycles = cycles;
    }
    if let Some(focus) = focus {
        session.focus_minutes = focus;
    }
    if let Some(break_minutes) = break_minutes {
        session.break_minutes = break_minutes;
    }
    engine.configure(session)?;
    if let Some(subject) = subject.or_else(|| config.session.subject.clone()) {
        engine.select_subject(&subject)?;
    }
    Ok(())
}

fn emit(engine: &StudyTimerEngine, event: Option<Event>) -> CliResult {
    match event {
        Some(event) => print_json(&event),
        None => {
            warn!(phase = ?engine.phase(), "nothing to do in the current phase");
            print_json(&engine.snapshot_event())
        }
    }
}

fn confirmation(preconfirmed: bool) -> Box<dyn Confirm> {
    if preconfirmed {
        Box::new(PresetAnswer(true))
    } else {
        Box::new(StdinConfirm)
    }
}

fn execute(engine: &mut StudyTimerEngine, config: &Config, action: TimerAction) -> CliResult {
    let control = match action {
        TimerAction::Status => {
            let snapshot = engine.snapshot();
            return print_json(&StatusReport::new(&snapshot));
        }
        TimerAction::Start {
            subject,
            cycles,
            focus,
            break_minutes,
        } => {
            prepare_start(engine, config, subject, cycles, focus, break_minutes)?;
            Control::Start
        }
        TimerAction::Reset { yes } => {
            engine.set_confirm(confirmation(yes));
            Control::Reset
        }
        TimerAction::End { yes } => {
            engine.set_confirm(confirmation(yes));
            Control::End
        }
        TimerAction::Pause => Control::Pause,
        TimerAction::Resume => Control::Resume,
        TimerAction::AcceptBreak => Control::AcceptBreak,
        TimerAction::SkipBreak => Control::SkipBreak,
        TimerAction::Continue => Control::Continue,
        TimerAction::Ack => Control::Ack,
        TimerAction::Watch => return Ok(()),
    };
    let event = apply(engine, control)?;
    emit(engine, event)
}

pub async fn run(action: TimerAction) -> CliResult {
    let config = Config::load_or_default();
    let (mut engine, reporter) = open_engine(&config)?;
    catch_up(&mut engine)?;

    let result = match action {
        TimerAction::Watch => watch(engine, &config).await,
        action => execute(&mut engine, &config, action),
    };
    reporter.flush().await;
    result
}

// ── watch ────────────────────────────────────────────────────────────

const WATCH_HELP: &str = "commands: start pause resume reset end break skip continue ack status help quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchInput {
    Control(Control),
    Status,
    Help,
    Quit,
}

impl WatchInput {
    fn parse(line: &str) -> Option<Self> {
        let input = match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => WatchInput::Control(Control::Start),
            "pause" | "p" => WatchInput::Control(Control::Pause),
            "resume" | "r" => WatchInput::Control(Control::Resume),
            "reset" => WatchInput::Control(Control::Reset),
            "end" => WatchInput::Control(Control::End),
            "break" | "b" => WatchInput::Control(Control::AcceptBreak),
            "skip" => WatchInput::Control(Control::SkipBreak),
            "continue" | "c" => WatchInput::Control(Control::Continue),
            "ack" | "a" => WatchInput::Control(Control::Ack),
            "status" => WatchInput::Status,
            "help" | "?" => WatchInput::Help,
            "quit" | "q" | "exit" => WatchInput::Quit,
            _ => return None,
        };
        Some(input)
    }
}

fn run_control(shell: &TimerShell, control: Control) {
    match shell.with_engine(|engine| apply(engine, control)) {
        Ok(Some(event)) => debug!(?event, "applied"),
        Ok(None) => eprintln!("\n{control:?} is not available right now"),
        Err(e) => eprintln!("\n{e}"),
    }
}

async fn watch(engine: StudyTimerEngine, config: &Config) -> CliResult {
    let shell = TimerShell::new(engine);
    // Prompts are asked by the input loop before the action is applied.
    shell.with_engine(|engine| engine.set_confirm(Box::new(PresetAnswer(true))));
    let mut events = shell.subscribe();
    let session = shell.with_engine(|engine| engine.state().session_config());
    eprintln!("{}, {}", session_format(&session), session_total(&session));
    shell.mount_view(Box::new(TerminalView::new(config.alerts.bell)))?;
    eprintln!("\n{WATCH_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut awaiting_confirm: Option<Control> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(event) => debug!(?event, "clock event"),
                Err(RecvError::Lagged(missed)) => warn!("missed {missed} clock events"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(control) = awaiting_confirm.take() {
                    if is_yes(&line) {
                        run_control(&shell, control);
                    } else {
                        eprintln!("cancelled");
                    }
                } else if !line.trim().is_empty() {
                    match WatchInput::parse(&line) {
                        Some(WatchInput::Quit) => break,
                        Some(WatchInput::Help) => eprintln!("{WATCH_HELP}"),
                        Some(WatchInput::Status) => {
                            let snapshot = shell.with_engine(|engine| engine.snapshot());
                            println!("\n{}", status_line(&snapshot));
                        }
                        Some(WatchInput::Control(control)) => match control.prompt() {
                            Some(prompt) => {
                                eprint!("\n{prompt} [y/N] ");
                                awaiting_confirm = Some(control);
                            }
                            None => run_control(&shell, control),
                        },
                        None => eprintln!("\nunknown command: {}", line.trim()),
                    }
                }
            }
        }
        // Respawns the clock after an auto-end stopped it.
        shell.ensure_clock()?;
    }

    shell.unmount_view();
    shell.shutdown();
    println!();
    Ok(())
}
