//! Terminal front end for the support chat.
//!
//! Reads one utterance per line from stdin. Lines starting with `/` are
//! commands:
//!
//! - `/model <id>` switches model (resets the conversation)
//! - `/models` lists the registry
//! - `/tokens <n>` sets the response budget
//! - `/history` prints the visible transcript
//! - `/quit` exits

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use support_chat::adapters::ai::{GroqConfig, GroqProvider};
use support_chat::adapters::contact::CsvContactSink;
use support_chat::adapters::display::WriterSink;
use support_chat::application::{ChatSession, SessionError, TurnOutcome};
use support_chat::config::AppConfig;
use support_chat::domain::model::{ModelRegistry, ModelSelectionPolicy, MAX_TOKENS_STEP};

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Model(&'a str),
    Models,
    Tokens(i64),
    History,
    Quit,
    Utterance(&'a str),
    Invalid(&'static str),
}

fn parse_command(line: &str) -> Command<'_> {
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Utterance(line);
    };

    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("model"), Some(id)) => Command::Model(id),
        (Some("model"), None) => Command::Invalid("usage: /model <id>"),
        (Some("models"), _) => Command::Models,
        (Some("tokens"), Some(n)) => n
            .parse()
            .map(Command::Tokens)
            .unwrap_or(Command::Invalid("usage: /tokens <integer>")),
        (Some("tokens"), None) => Command::Invalid("usage: /tokens <integer>"),
        (Some("history"), _) => Command::History,
        (Some("quit") | Some("exit"), _) => Command::Quit,
        _ => Command::Utterance(line),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.app.log_level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn build_session(config: &AppConfig) -> Result<ChatSession, Box<dyn std::error::Error>> {
    let provider = GroqProvider::new(
        GroqConfig::new(config.ai.api_key.clone().unwrap_or_default())
            .with_base_url(&config.ai.base_url)
            .with_timeout(config.ai.timeout())
            .with_max_retries(config.ai.max_retries),
    )?;
    let contacts = CsvContactSink::new(config.capture.csv_path());
    let policy = ModelSelectionPolicy::with_initial_model(
        ModelRegistry::builtin().clone(),
        config.ai.initial_model(),
    )?;

    Ok(ChatSession::new(Arc::new(provider), Arc::new(contacts)).with_policy(policy))
}

fn print_models(session: &ChatSession) {
    for spec in session.policy().registry().iter() {
        let marker = if spec.id == session.model_id() { "*" } else { " " };
        println!(
            "{} {:<26} {:<28} {:>7} tokens  ({})",
            marker, spec.id, spec.display_name, spec.token_ceiling, spec.vendor
        );
    }
}

fn report_error(err: &SessionError) {
    match err {
        SessionError::StreamInterrupted(e) if !e.partial.is_empty() => {
            println!();
            eprintln!("[reply interrupted: {}]", e.reason);
        }
        SessionError::Persistence(_) => {
            eprintln!("Sorry, your details could not be saved. Please try again later.");
        }
        other => eprintln!("[{}] {}", other.code(), other),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let mut session = build_session(&config)?;
    tracing::info!(
        session_id = %session.id(),
        model = %session.model_id(),
        csv = %config.capture.csv_path,
        "session started"
    );

    println!(
        "Support chat on {} (max {} tokens). Type /quit to exit.",
        session.model_id(),
        session.max_tokens()
    );

    let mut display = WriterSink::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(line.trim_end_matches(['\r', '\n'])) {
            Command::Quit => break,
            Command::Models => print_models(&session),
            Command::History => {
                for message in session.visible_messages() {
                    println!("{}: {}", message.role(), message.content());
                }
            }
            Command::Model(id) => match session.select_model(id) {
                Ok(true) => println!(
                    "Switched to {}; conversation reset (max {} tokens).",
                    session.model_id(),
                    session.max_tokens()
                ),
                Ok(false) => println!("Already using {}.", session.model_id()),
                Err(err) => report_error(&err),
            },
            Command::Tokens(n) => {
                let applied = session.set_max_tokens(n);
                println!(
                    "Max tokens set to {} (range {}-{}, step {}).",
                    applied,
                    session.policy().selection().lower_bound(),
                    session.policy().selection().token_ceiling,
                    MAX_TOKENS_STEP
                );
            }
            Command::Invalid(usage) => eprintln!("{}", usage),
            Command::Utterance(text) => match session.handle_utterance(text, &mut display).await {
                Ok(TurnOutcome::Static { reply }) => println!("{}", reply),
                Ok(TurnOutcome::Streamed { .. }) => println!(),
                Ok(TurnOutcome::Ignored) => {}
                Err(err) => report_error(&err),
            },
        }
    }

    tracing::info!(session_id = %session.id(), "session ended");
    Ok(())
}
