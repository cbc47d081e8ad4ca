mod config;
mod demo;
mod planner;

use std::collections::HashMap;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use art_domain::RunId;
use art_model::Message;
use art_runtime::{Orchestrator, RunInput};

/// art-cli — a demo harness for the agent execution runtime.
#[derive(Debug, Parser)]
#[command(name = "art-agent", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive REPL against the demo agent (default when no subcommand is given).
    Chat {
        /// Session key; `/session <name>` switches it mid-REPL.
        #[arg(long, default_value = "cli:chat")]
        session: String,
    },
    /// Send a single message to the demo agent and print the response.
    Run {
        /// The message to send.
        message: String,
        /// Output the full response as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,art_cli=debug")))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            init_tracing();
            chat("cli:chat".into()).await
        }
        Some(Command::Chat { session }) => {
            init_tracing();
            chat(session).await
        }
        Some(Command::Run { message, json }) => {
            init_tracing();
            run_once(&message, json).await
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (cfg, path) = config::load_config()?;
            println!("# resolved from {path}");
            print!("{}", toml::to_string_pretty(&cfg)?);
            Ok(())
        }
        Some(Command::Version) => {
            println!("art-agent {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_once(message: &str, as_json: bool) -> anyhow::Result<()> {
    let (orchestrator, agent_id) = demo::build();
    let output = orchestrator
        .start_run(RunInput {
            run_id: None,
            agent_id,
            session_id: None,
            turn_id: None,
            messages: vec![Message::user(message)],
        })
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if as_json {
        println!(
            "{}",
            serde_json::json!({
                "run_id": output.run_id.to_string(),
                "text": output.message.text,
                "is_error": output.is_error,
            })
        );
    } else {
        println!("{}", output.message.text);
    }
    Ok(())
}

/// Interactive REPL (spec §10 "CLI demo harness"): each session key maps to
/// a `RunId` whose run is resumed (not restarted) on every subsequent
/// line, so the agent sees the full prior transcript via the ledger
/// projection `ResumeRun` seeds itself with.
async fn chat(mut session_key: String) -> anyhow::Result<()> {
    let (orchestrator, agent_id) = demo::build();
    let mut runs: HashMap<String, RunId> = HashMap::new();

    let history_path = dirs::home_dir().unwrap_or_default().join(".art-agent").join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    eprintln!("art-agent interactive chat");
    eprintln!("Session: {session_key}  |  Type /help for commands, Ctrl+D to exit");
    eprintln!();

    loop {
        let readline = rl.readline("you> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    if handle_slash_command(trimmed, &mut session_key) {
                        break;
                    }
                    continue;
                }

                if let Err(e) = send_message(&orchestrator, &agent_id, &mut runs, &session_key, trimmed).await {
                    eprintln!("error: {e}");
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Goodbye!");
    Ok(())
}

fn handle_slash_command(input: &str, session_key: &mut String) -> bool {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    match parts[0] {
        "/exit" | "/quit" => return true,
        "/session" => {
            if let Some(name) = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty()) {
                *session_key = name.to_string();
                eprintln!("Session switched to: {session_key}");
            } else {
                eprintln!("Current session: {session_key}");
            }
        }
        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /session <name>  Switch to a named session");
            eprintln!("  /exit, /quit     Exit the chat");
            eprintln!("  /help            Show this help");
            eprintln!("Say \"/time\" as a message to exercise the clock tool.");
        }
        other => eprintln!("Unknown command: {other} (type /help for a list)"),
    }
    false
}

async fn send_message(
    orchestrator: &std::sync::Arc<Orchestrator>,
    agent_id: &art_domain::AgentId,
    runs: &mut HashMap<String, RunId>,
    session_key: &str,
    user_message: &str,
) -> anyhow::Result<()> {
    let output = match runs.get(session_key) {
        Some(run_id) => orchestrator
            .resume_run(*run_id, vec![Message::user(user_message)])
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        None => orchestrator
            .start_run(RunInput {
                run_id: None,
                agent_id: agent_id.clone(),
                session_id: None,
                turn_id: None,
                messages: vec![Message::user(user_message)],
            })
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    };
    runs.insert(session_key.to_string(), output.run_id);

    if output.is_error {
        eprintln!("\x1b[31m{}\x1b[0m", output.message.text);
    } else {
        println!("{}", output.message.text);
    }
    Ok(())
}
