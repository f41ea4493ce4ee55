use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::rchain::Provider;

#[derive(Debug, Args, Clone)]
pub struct ModelsArgs {
    #[arg(long, help = "Only list this provider")]
    provider: Option<String>,
    #[arg(long, help = "Print as JSON")]
    json: bool,
}

pub fn run(args: ModelsArgs) -> Result<()> {
    let providers = match &args.provider {
        Some(id) => vec![id.parse::<Provider>()?],
        None => Provider::ALL.to_vec(),
    };

    if args.json {
        let catalog = providers
            .iter()
            .map(|provider| {
                json!({
                    "provider": provider.as_str(),
                    "api_key_env": provider.api_key_env(),
                    "models": provider.models(),
                })
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::Value::Array(catalog));
        return Ok(());
    }

    for provider in providers {
        for model in provider.models() {
            println!("{provider}\t{model}");
        }
    }
    Ok(())
}
