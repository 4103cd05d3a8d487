//! The `rabbit` command: describe a problem, get it diagnosed.

#[macro_use]
extern crate tracing;

mod config;
mod setup;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rabbit::core::AgentEvent;
use rabbit::executor::CommandApproval;
use rabbit::{Session, SessionBuilder};
use rabbit_openai_model::OpenAIProvider;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::config::Config;

const BAR_CHAR: &str = "▎";
const PREVIEW_CHARS: usize = 200;

/// An AI assistant that troubleshoots problems on this machine by running
/// diagnostic commands.
#[derive(Parser)]
#[command(name = "rabbit", version)]
struct Cli {
    /// Path of the config file [default: ~/.rabbitai/config.yaml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run commands without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Skip checking that the model provider is reachable
    #[arg(long)]
    no_check: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// The problem to solve. Starts an interactive session if omitted.
    query: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Configure the model provider interactively
    Setup,
}

enum SessionEvent {
    Agent(AgentEvent),
    CommandRequest(CommandApproval),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Some(Command::Setup) = cli.command {
        return setup(cli.config.as_deref()).await;
    }

    if cli.config.is_none()
        && Config::default_path().is_none_or(|path| !path.exists())
    {
        println!(
            "{}",
            "No config file found, run `rabbit setup` to create one.".dimmed()
        );
    }
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env(|name| std::env::var(name).ok());
    debug!(
        "loaded config: provider={:?}, model={}",
        config.llm.provider,
        config.model()
    );

    let model_provider = OpenAIProvider::new(config.openai_config()?);
    if !cli.no_check {
        ensure_available(&model_provider, &config).await?;
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let mut builder = SessionBuilder::with_model_provider(model_provider)
        .with_settings(config.agent_settings())
        .with_command_timeout(config.command_timeout())
        .on_event({
            let event_tx = event_tx.clone();
            move |event: &AgentEvent| {
                event_tx.send(SessionEvent::Agent(event.clone())).ok();
            }
        });
    if config.safety.require_confirmation && !cli.yes {
        builder = builder.on_command_request(move |approval| {
            event_tx.send(SessionEvent::CommandRequest(approval)).ok();
        });
    }
    let session = builder.build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut console = Console {
        stdin: BufReader::new(io::stdin()).lines(),
        event_rx,
        progress_style,
        progress_bar: None,
    };

    if !cli.query.is_empty() {
        let query = cli.query.join(" ");
        console.run_query(&session, &query).await;
        return Ok(());
    }

    println!("{}", "RabbitAI: describe your problem, `exit` to leave.".dimmed());
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = console.read_line().await else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit")
            || query.eq_ignore_ascii_case("quit")
        {
            break;
        }
        console.run_query(&session, query).await;
    }
    Ok(())
}

async fn setup(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_owned(),
        None => Config::default_path()
            .context("cannot locate the home directory")?,
    };
    let current = if path.exists() {
        Config::load(Some(&path)).unwrap_or_else(|err| {
            warn!("ignoring the existing config: {:#}", err);
            Config::default()
        })
    } else {
        Config::default()
    };

    println!("{}", "RabbitAI setup".bold());
    let config = setup::run_setup(
        current,
        &mut std::io::stdin().lock(),
        &mut std::io::stdout(),
    )?;
    config.save(&path)?;
    println!("{} {}", "✓ Saved to".green(), path.display());

    let model_provider = OpenAIProvider::new(config.openai_config()?);
    ensure_available(&model_provider, &config).await
}

async fn ensure_available(
    model_provider: &OpenAIProvider,
    config: &Config,
) -> Result<()> {
    let timeout = Duration::from_secs(config.llm.timeout_seconds.max(1));
    if let Err(err) = setup::check_availability(model_provider, timeout).await {
        println!(
            "{} {:#}",
            format!("✗ {:?} is not available:", config.llm.provider).red(),
            err
        );
        for hint in config.unavailable_hints() {
            println!("  {}", hint.dimmed());
        }
        bail!("the model provider is not available");
    }
    debug!("model provider is available");
    Ok(())
}

struct Console {
    stdin: Lines<BufReader<Stdin>>,
    event_rx: mpsc::UnboundedReceiver<SessionEvent>,
    progress_style: ProgressStyle,
    progress_bar: Option<ProgressBar>,
}

impl Console {
    async fn run_query(&mut self, session: &Session, query: &str) {
        let mut solve = pin!(session.solve(query));

        let answer = loop {
            if let Some(progress_bar) = &self.progress_bar {
                progress_bar.inc(1);
            }

            let sleep = sleep(Duration::from_millis(100));
            select! {
                biased;
                event = self.event_rx.recv() => {
                    if let Some(event) = event {
                        self.handle_event(event).await;
                    }
                }
                answer = &mut solve => break answer,
                _ = sleep => {}
            }
        };

        // Events emitted right before the answer.
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event).await;
        }
        self.clear_progress();

        println!("\n{}🐰 {}\n", BAR_CHAR.bright_cyan(), answer.bright_white());
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        // Finish the progress bar before printing anything else.
        self.clear_progress();

        match event {
            SessionEvent::CommandRequest(approval) => {
                self.ask_approval(approval).await;
            }
            SessionEvent::Agent(event) => self.render(event),
        }
    }

    fn render(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::IterationStarted { iteration, .. } => {
                if iteration > 1 {
                    println!("\n{}\n", "─".repeat(50).dimmed());
                }
                let progress_bar = ProgressBar::new_spinner();
                progress_bar.set_style(self.progress_style.clone());
                progress_bar.set_message("Thinking...".yellow().to_string());
                self.progress_bar = Some(progress_bar);
            }
            AgentEvent::CommandDispatched { command } => {
                println!("{} {}", "▶ Running:".blue(), command.yellow());
            }
            AgentEvent::CommandFinished { outcome, .. } => {
                if outcome.is_blocked() {
                    println!("{} {}", "✗ Blocked:".red(), outcome.error());
                } else if outcome.success() {
                    println!(
                        "{} {}",
                        "  Output:".dimmed(),
                        preview(outcome.output())
                    );
                } else {
                    let error: String =
                        outcome.error().chars().take(PREVIEW_CHARS).collect();
                    println!("{} {}", "✗ Error:".red(), error);
                }
            }
            AgentEvent::UnknownAction { action } => {
                println!("{}", format!("⚠ Unknown action: {action}").yellow());
            }
            AgentEvent::EmptyCommand => {
                println!(
                    "{}",
                    "⚠ The assistant wanted to run a command but gave none"
                        .yellow()
                );
            }
            AgentEvent::ModelTimedOut { seconds } => {
                println!(
                    "{}",
                    format!("⚠ LLM API timed out after {seconds} seconds")
                        .yellow()
                );
            }
            AgentEvent::ModelFailed { reason }
            | AgentEvent::InvalidDecision { reason } => {
                println!(
                    "{}",
                    format!("⚠ Error getting LLM response: {reason}").yellow()
                );
            }
            AgentEvent::BudgetExhausted { max_iterations } => {
                println!(
                    "\n{}",
                    format!("⚠ Reached maximum iterations ({max_iterations})")
                        .yellow()
                );
            }
            AgentEvent::Finished { .. } => {}
        }
    }

    async fn ask_approval(&mut self, approval: CommandApproval) {
        let bar = BAR_CHAR.bright_yellow();
        println!("\n{bar}⚠️  RabbitAI wants to run command:");
        println!("{bar}{}", approval.command().bright_white().bold());
        print!("Proceed? [Y/n]: ");
        std::io::stdout().flush().ok();

        let Some(line) = self.read_line().await else {
            approval.reject(Some("No answer from the user".to_owned()));
            return;
        };
        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("y") {
            approval.approve();
        } else {
            approval.reject(None);
        }
        println!();
    }

    fn clear_progress(&mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }

    async fn read_line(&mut self) -> Option<String> {
        match self.stdin.next_line().await {
            Ok(line) => line,
            Err(err) => {
                error!("error reading input: {}", err);
                None
            }
        }
    }
}

fn preview(output: &str) -> String {
    let mut preview: String = output.chars().take(PREVIEW_CHARS).collect();
    let truncated = preview.len() < output.len();
    preview = preview.trim().to_owned();
    if truncated {
        preview.push_str("...");
    }
    preview
}
