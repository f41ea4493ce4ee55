use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use clap::Args;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::commands::{OutputMode, SessionArgs, Settings};
use crate::config::credentials_from_env;
use crate::rchain::{ChatError, DEFAULT_SYSTEM_PROMPT, Session, Turn};

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    #[command(flatten)]
    pub session: SessionArgs,
    #[arg(long, help = "Print the request that would be sent and exit")]
    pub dry_run: bool,
    #[arg(long, help = "Shorthand for --output json")]
    pub json: bool,
    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,
    #[arg(long, value_name = "PATH", help = "Also write the JSON result to a file")]
    pub save: Option<PathBuf>,
    #[arg(long, help = "Retries on rate limits, server errors and timeouts")]
    pub retries: Option<u32>,
    #[arg(long, value_name = "MS", help = "Base delay between retries, doubled each attempt")]
    pub retry_delay: Option<u64>,
    #[arg(help = "Prompt text; read from stdin when omitted")]
    pub prompt: Option<String>,
}

pub async fn run(args: AskArgs) -> Result<()> {
    let mut settings = Settings::resolve(&args.session)?;
    if let Some(output) = args.output {
        settings.output = output;
    }
    if args.json {
        settings.output = OutputMode::Json;
    }
    if let Some(retries) = args.retries {
        settings.retries = retries;
    }
    if let Some(delay) = args.retry_delay {
        settings.retry_delay_ms = delay;
    }

    let model = settings.require_model()?;
    let prompt = read_prompt(args.prompt)?;
    let spec = settings.model_spec(model);
    spec.validate()?;

    let credentials = credentials_from_env();
    let api_key_present = credentials.contains(settings.provider.as_str());
    debug!(
        provider = %settings.provider,
        model = %spec.model,
        api_key_present,
        output = %settings.output,
        "resolved ask settings"
    );

    let system = settings
        .system
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    if args.dry_run {
        let messages = [Turn::system(system), Turn::user(prompt)];
        let body = json!({
            "dry_run": true,
            "provider": settings.provider.as_str(),
            "model": spec.model,
            "output": settings.output.as_str(),
            "api_key_present": api_key_present,
            "messages": messages,
            "request": {
                "temperature": widen(spec.effective_temperature()),
                "max_tokens": spec.effective_max_tokens(),
                "timeout_secs": settings.timeout_secs,
                "retries": settings.retries,
            },
        });
        println!("{body}");
        return save(args.save.as_deref(), &body);
    }

    let mut session = Session::open(
        settings.registry(),
        credentials,
        settings.provider.as_str(),
        spec,
    )?
    .with_system_prompt(system);

    let started = Instant::now();
    let (reply, attempts) = ask_with_retries(
        &mut session,
        prompt,
        settings.retries,
        settings.retry_delay_ms,
    )
    .await?;

    let body = json!({
        "provider": session.provider_id(),
        "model": session.model_spec().model,
        "content": reply.content(),
        "attempts": attempts,
        "latency_ms": started.elapsed().as_millis() as u64,
    });
    match settings.output {
        OutputMode::Text => println!("{}", reply.content()),
        OutputMode::Json => println!("{body}"),
    }
    save(args.save.as_deref(), &body)
}

/// Sends `prompt`, then resends the same pending turn after each retryable
/// failure, up to `retries` more times. Returns the reply and the attempts made.
pub(crate) async fn ask_with_retries(
    session: &mut Session,
    prompt: String,
    retries: u32,
    retry_delay_ms: u64,
) -> Result<(Turn, u32), ChatError> {
    let mut pending = Some(prompt);
    let mut attempt = 0;
    loop {
        let result = match pending.take() {
            Some(text) => session.send_user_message(text).await,
            None => session.resend().await,
        };
        match result {
            Ok(reply) => return Ok((reply, attempt + 1)),
            Err(err) if err.is_retryable() && attempt < retries => {
                let delay = retry_delay(attempt, retry_delay_ms);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn read_prompt(argument: Option<String>) -> Result<String> {
    if let Some(prompt) = argument {
        return Ok(prompt);
    }

    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("No prompt provided. Pass it as an argument or pipe it on stdin.");
    }
    let mut raw = String::new();
    stdin.read_to_string(&mut raw)?;
    let prompt = raw.trim_end_matches(['\n', '\r']).to_string();
    if prompt.trim().is_empty() {
        bail!("No prompt provided. Pass it as an argument or pipe it on stdin.");
    }
    Ok(prompt)
}

fn save(path: Option<&Path>, body: &Value) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            anyhow!(
                "Failed to create output directory '{}': {err}",
                parent.display()
            )
        })?;
    }
    fs::write(path, body.to_string())
        .map_err(|err| anyhow!("Failed to write output file '{}': {err}", path.display()))
}

/// `f32` to `f64` by its shortest decimal form, so 0.7 prints as 0.7.
fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

/// Exponential backoff from `base_ms`, capped at 30 seconds.
fn retry_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor).min(30_000);
    Duration::from_millis(delay_ms)
}
