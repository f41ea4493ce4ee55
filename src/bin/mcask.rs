use std::process;

use clap::Parser;
use mchat::commands::LONG_VERSION;
use mchat::commands::ask::{self, AskArgs};
use mchat::logging;

#[derive(Debug, Parser)]
#[command(
    name = "mcask",
    about = "Ask one question to an LLM provider",
    version = LONG_VERSION
)]
struct Cli {
    #[command(flatten)]
    ask: AskArgs,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.ask.session.verbosity());

    if let Err(err) = ask::run(cli.ask).await {
        eprintln!("{err}");
        process::exit(1);
    }
}
