// ============================================================================
// recall — memory-augmented chat assistant REPL
// ============================================================================
// Usage:
//   recall                     Start the assistant (sign-in screen first)
//   recall --model gpt-4o      Override the chat/extraction model
//
// Chat commands:
//   /memories   Show stored memories
//   /clear      Delete all stored memories
//   /whoami     Show the signed-in account
//   /logout     Sign out and return to the sign-in screen
//   /help       Show command help
//   /quit       Exit
// ============================================================================

use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing_subscriber::EnvFilter;

use recall_core::{
    AppConfig, DialogueEngine, MemoryManager, MemoryService, RecallError, Session, SignUpOutcome,
    SupabaseAuth, View, RESOURCES,
};

const CHAT_COMMANDS: &[&str] = &["/clear", "/help", "/logout", "/memories", "/quit", "/whoami"];

/// How many memories `/memories` lists
const MEMORY_LIST_LIMIT: u64 = 20;

/// Memory-augmented chat assistant
#[derive(Parser)]
#[command(name = "recall", version, about = "Chat assistant that remembers you across sessions")]
struct Cli {
    /// Override the chat and extraction model (default: MODEL_CHOICE or gpt-4o-mini)
    #[arg(long)]
    model: Option<String>,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: CHAT_COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("recall=info".parse()?)
                .add_directive("recall_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }

    let resources = RESOURCES.get(&config).await?;
    let auth = SupabaseAuth::new(config.supabase_url.as_str(), config.supabase_key.as_str());
    let engine = DialogueEngine::new(resources.memory.clone(), resources.completion.clone());
    let mut session = Session::new();

    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Recall ===".bright_magenta().bold());
    println!("{}", format!("Model: {}", config.model).bright_black());

    loop {
        let keep_running = match session.view() {
            View::SignIn => sign_in_screen(&mut rl, &mut session, &auth).await?,
            View::Chat => {
                chat_screen(
                    &mut rl,
                    &mut session,
                    &engine,
                    &auth,
                    resources.memory.as_ref(),
                )
                .await?
            }
        };

        if !keep_running {
            break;
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

// ============================================================================
// Sign-in screen
// ============================================================================

async fn sign_in_screen(
    rl: &mut Editor<CliHelper, DefaultHistory>,
    session: &mut Session,
    auth: &SupabaseAuth,
) -> Result<bool> {
    println!();
    println!("{}", "Sign in to continue.".bright_black());
    println!("{}", "Commands: login, signup, quit".bright_black());

    loop {
        let line = match rl.readline("auth> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        match trimmed {
            "quit" | "exit" => return Ok(false),
            "login" => {
                let email = match prompt(rl, "email: ")? {
                    Some(value) if !value.is_empty() => value,
                    _ => continue,
                };
                let password = match prompt(rl, "password: ")? {
                    Some(value) if !value.is_empty() => value,
                    _ => continue,
                };

                match session.sign_in(auth, &email, &password).await {
                    Ok(user) => {
                        println!("{}", format!("Signed in as {}", user.email).bright_green());
                        return Ok(true);
                    }
                    Err(err) => report_error(err)?,
                }
            }
            "signup" => {
                let email = match prompt(rl, "email: ")? {
                    Some(value) if !value.is_empty() => value,
                    _ => continue,
                };
                let password = match prompt(rl, "password: ")? {
                    Some(value) if !value.is_empty() => value,
                    _ => continue,
                };
                let full_name = match prompt(rl, "full name (optional): ")? {
                    Some(value) if !value.is_empty() => Some(value),
                    Some(_) => None,
                    None => continue,
                };

                match session
                    .sign_up(auth, &email, &password, full_name.as_deref())
                    .await
                {
                    Ok(SignUpOutcome::SignedIn(_)) => {
                        println!("{}", "Account created. You are signed in.".bright_green());
                        return Ok(true);
                    }
                    Ok(SignUpOutcome::ConfirmationRequired) => {
                        println!(
                            "{}",
                            "Account created. Check your email to confirm, then log in.".yellow()
                        );
                    }
                    Err(err) => report_error(err)?,
                }
            }
            "help" => {
                println!("  login    Sign in with email and password");
                println!("  signup   Create a new account");
                println!("  quit     Exit");
            }
            _ => {
                println!("{}", "Unknown command. Try: login, signup, quit".bright_black());
            }
        }
    }
}

// ============================================================================
// Chat screen
// ============================================================================

async fn chat_screen(
    rl: &mut Editor<CliHelper, DefaultHistory>,
    session: &mut Session,
    engine: &DialogueEngine,
    auth: &SupabaseAuth,
    memory: &MemoryManager,
) -> Result<bool> {
    let display_name = session
        .user()
        .map(|user| user.full_name.clone().unwrap_or_else(|| user.email.clone()))
        .unwrap_or_default();

    println!();
    println!(
        "{}",
        format!("Chatting as {}. Type /help for commands.", display_name).bright_black()
    );

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        match trimmed {
            command if is_exit_command(command) => return Ok(false),
            "/help" => show_help(),
            "/whoami" => show_profile(session),
            "/memories" => {
                if let Err(err) = show_memories(session, memory).await {
                    report_error(err)?;
                }
            }
            "/clear" => match session.clear_memories(memory).await {
                Ok(()) => println!("{}", "All memories cleared.".bright_green()),
                Err(err) => report_error(err)?,
            },
            "/logout" => match session.sign_out(auth).await {
                Ok(()) => {
                    println!("{}", "Signed out.".bright_green());
                    return Ok(true);
                }
                Err(err) => report_error(err)?,
            },
            command if command.starts_with('/') => {
                println!("{}", "Unknown command. Type /help for the list.".bright_black());
            }
            message => match engine.handle_turn(session, message).await {
                Ok(reply) => {
                    for line in reply.lines() {
                        println!("{}", line.bright_blue());
                    }
                }
                Err(err) => report_error(err)?,
            },
        }
    }
}

async fn show_memories(session: &Session, memory: &MemoryManager) -> recall_core::Result<()> {
    let user_id = match session.user() {
        Some(user) => user.id.clone(),
        None => return Err(RecallError::auth("Sign in to manage memories")),
    };

    let records = memory.list(&user_id, MEMORY_LIST_LIMIT).await?;
    if records.is_empty() {
        println!("{}", "No memories stored yet.".bright_black());
        return Ok(());
    }

    println!(
        "{}",
        format!("=== {} stored memories ===", records.len()).bright_magenta()
    );
    for record in &records {
        println!(
            "  {}  {}",
            format_timestamp(record.created_at).bright_black(),
            record.text
        );
    }
    Ok(())
}

fn show_profile(session: &Session) {
    match session.user() {
        Some(user) => {
            println!("{}", format!("Signed in as {}", user.email).bright_green());
            if let Some(name) = &user.full_name {
                println!("  name: {}", name);
            }
            println!("  id:   {}", user.id);
        }
        None => println!("{}", "Not signed in.".bright_black()),
    }
}

fn show_help() {
    println!("{}", "Commands:".bright_magenta());
    println!("  /memories   Show stored memories");
    println!("  /clear      Delete all stored memories");
    println!("  /whoami     Show the signed-in account");
    println!("  /logout     Sign out and return to the sign-in screen");
    println!("  /quit       Exit");
    println!("{}", "Anything else is sent to the assistant.".bright_black());
}

// ============================================================================
// Shared helpers
// ============================================================================

fn prompt(rl: &mut Editor<CliHelper, DefaultHistory>, label: &str) -> Result<Option<String>> {
    match rl.readline(label) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Chat-screen exits are slash commands; a bare "quit" is chat text
/// and runs a turn like any other message.
fn is_exit_command(input: &str) -> bool {
    matches!(input, "/quit" | "/exit")
}

/// Print a recoverable error and keep the screen running. Fatal errors
/// propagate to the caller and halt the UI context.
fn report_error(err: RecallError) -> Result<()> {
    if err.is_fatal() {
        return Err(err.into());
    }
    eprintln!("{}", err.to_string().red());
    Ok(())
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_quit_is_chat_text_not_an_exit() {
        assert!(is_exit_command("/quit"));
        assert!(is_exit_command("/exit"));
        assert!(!is_exit_command("quit"));
        assert!(!is_exit_command("exit"));
        assert!(!is_exit_command("I want to quit smoking"));
    }

    #[test]
    fn report_error_escalates_only_fatal_errors() {
        assert!(report_error(RecallError::auth("bad credentials")).is_ok());
        assert!(report_error(RecallError::store_unavailable("connection refused")).is_ok());
        assert!(report_error(RecallError::configuration("DATABASE_URL must be set")).is_err());
    }
}
