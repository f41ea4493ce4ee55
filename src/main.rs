use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use mchat::commands::LONG_VERSION;
use mchat::commands::ask::{self, AskArgs};
use mchat::commands::chat::{self, ChatArgs};
use mchat::commands::config::{self, ConfigArgs};
use mchat::commands::models::{self, ModelsArgs};
use mchat::logging::{self, Verbosity};

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  mchat chat --provider cerebras --model llama3.1-70b\n  mchat ask --provider groq --model llama-3.1-70b-versatile \"2+2?\"\n  echo \"2+2?\" | mchat ask --provider cerebras --model llama3.1-8b\n  mchat models --provider groq\n  mchat config check\n  mchat completion bash > ~/.local/share/bash-completion/completions/mchat";

const ASK_HELP_EXAMPLES: &str = "Examples:\n  mchat ask --provider groq --model llama-3.1-70b-versatile \"2+2?\"\n  echo \"2+2?\" | mchat ask --provider cerebras --model llama3.1-8b\n  mchat ask --provider groq --model mixtral-8x7b-32768 --dry-run --json \"Explain retries\"";

#[derive(Debug, Parser)]
#[command(
    name = "mchat",
    about = "Chat with Groq and Cerebras models from the terminal",
    version = LONG_VERSION,
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Start an interactive conversation")]
    Chat(ChatArgs),
    #[command(about = "Ask a single question", after_help = ASK_HELP_EXAMPLES)]
    Ask(AskArgs),
    #[command(about = "List the models each provider offers")]
    Models(ModelsArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

impl Commands {
    fn verbosity(&self) -> Verbosity {
        match self {
            Self::Chat(args) => args.session.verbosity(),
            Self::Ask(args) => args.session.verbosity(),
            _ => Verbosity::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "mchat", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "mchat", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "mchat", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.command.verbosity());

    let result = match cli.command {
        Commands::Chat(args) => chat::run(args).await,
        Commands::Ask(args) => ask::run(args).await,
        Commands::Models(args) => models::run(args),
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
