use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config;
use crate::rchain::Provider;

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand, Clone)]
enum ConfigSubcommand {
    #[command(about = "Validate the config file or one profile")]
    Check {
        #[arg(long)]
        profile: Option<String>,
    },
    #[command(about = "Show which provider API keys are set")]
    Keys,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigSubcommand::Check { profile } => {
            let path = config::validate_config(profile.as_deref())?;
            println!("config OK: {}", path.display());
        }
        ConfigSubcommand::Keys => {
            let credentials = config::credentials_from_env();
            for provider in Provider::ALL {
                let state = if credentials.contains(provider.as_str()) {
                    "set"
                } else {
                    "missing"
                };
                println!("{provider}\t{}\t{state}", provider.api_key_env());
            }
        }
    }
    Ok(())
}
