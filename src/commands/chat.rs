use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::commands::{SessionArgs, Settings};
use crate::config::credentials_from_env;
use crate::rchain::{ChatError, Role, Session, Turn};

const REPL_HELP: &str = "Commands:
  /provider <id> <model>  switch backend (starts a new conversation)
  /models                 list models of the current provider
  /history                print the conversation so far
  /retry                  ask again for the last unanswered message
  /help                   show this help
  /quit                   leave";

#[derive(Debug, Args, Clone)]
pub struct ChatArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplInput {
    Message(String),
    Provider { id: String, model: String },
    Models,
    History,
    Retry,
    Help,
    Quit,
    Invalid(String),
}

impl ReplInput {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Message(line.to_string()));
        };

        let mut words = command.split_whitespace();
        let input = match words.next().unwrap_or("") {
            "provider" => match (words.next(), words.next(), words.next()) {
                (Some(id), Some(model), None) => Self::Provider {
                    id: id.to_string(),
                    model: model.to_string(),
                },
                _ => Self::Invalid("Usage: /provider <id> <model>".to_string()),
            },
            "models" => Self::Models,
            "history" => Self::History,
            "retry" => Self::Retry,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("Unknown command '/{other}'. Type /help.")),
        };
        Some(input)
    }
}

pub async fn run(args: ChatArgs) -> Result<()> {
    let settings = Settings::resolve(&args.session)?;
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| settings.provider.models()[0].to_string());

    let mut session = Session::open(
        settings.registry(),
        credentials_from_env(),
        settings.provider.as_str(),
        settings.model_spec(model),
    )?;
    if let Some(system) = &settings.system {
        session = session.with_system_prompt(system.clone());
    }

    println!(
        "Chatting with {}/{}. Type /help for commands.",
        session.provider_id(),
        session.model_spec().model
    );

    let mut lines = io::stdin().lock().lines();
    loop {
        print!("{} ", "you>".bold());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let Some(input) = ReplInput::parse(&line?) else {
            continue;
        };

        match input {
            ReplInput::Message(text) => print_reply(session.send_user_message(text).await),
            ReplInput::Retry => print_reply(session.resend().await),
            ReplInput::Provider { id, model } => match session.select_provider(&id, &model) {
                Ok(()) => println!(
                    "Switched to {}/{}. Started a new conversation.",
                    session.provider_id(),
                    session.model_spec().model
                ),
                Err(err) => eprintln!("{}", err.red()),
            },
            ReplInput::Models => {
                for model in session.models() {
                    let marker = if *model == session.model_spec().model {
                        "*"
                    } else {
                        " "
                    };
                    println!("{marker} {model}");
                }
            }
            ReplInput::History => print_history(session.history()),
            ReplInput::Help => println!("{REPL_HELP}"),
            ReplInput::Quit => break,
            ReplInput::Invalid(message) => eprintln!("{message}"),
        }
    }

    Ok(())
}

fn print_reply(result: Result<Turn, ChatError>) {
    match result {
        Ok(turn) => println!("{} {}", "assistant>".cyan().bold(), turn.content()),
        Err(err) => {
            eprintln!("{}", err.red());
            if err.is_retryable() {
                eprintln!("Type /retry to ask again.");
            }
        }
    }
}

fn print_history(history: &[Turn]) {
    for turn in history {
        let label = match turn.role() {
            Role::System => turn.role().dimmed().to_string(),
            Role::User => turn.role().bold().to_string(),
            Role::Assistant => turn.role().cyan().to_string(),
        };
        println!("[{label}] {}", turn.content());
    }
}
