use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_empty};
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const GROQ_TEST_MODEL: &str = "llama-3.1-70b-versatile";
const CEREBRAS_TEST_MODEL: &str = "llama3.1-8b";

const ENV_VARS: [&str; 12] = [
    "MC_PROVIDER",
    "MC_MODEL",
    "MC_SYSTEM",
    "MC_TEMPERATURE",
    "MC_MAX_TOKENS",
    "MC_TIMEOUT",
    "MC_RETRIES",
    "MC_RETRY_DELAY",
    "MC_OUTPUT",
    "MC_CONFIG",
    "GROQ_API_KEY",
    "CEREBRAS_API_KEY",
];

fn clean(mut cmd: Command) -> Command {
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("MC_LOG");
    cmd
}

fn mcask_cmd() -> Command {
    clean(Command::new(assert_cmd::cargo::cargo_bin!("mcask")))
}

fn mchat_cmd() -> Command {
    clean(Command::new(assert_cmd::cargo::cargo_bin!("mchat")))
}

fn unique_temp_path(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("mchat-test-{label}-{nanos}"))
}

fn parse_stdout_json(output: &[u8]) -> Value {
    let text = String::from_utf8(output.to_vec()).expect("stdout should be utf-8");
    serde_json::from_str(text.trim()).expect("stdout should contain valid JSON")
}

#[test]
fn dry_run_succeeds_without_api_key() {
    let assert = mcask_cmd()
        .args([
            "--provider",
            "cerebras",
            "--model",
            CEREBRAS_TEST_MODEL,
            "--dry-run",
            "2+2?",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["dry_run"], Value::Bool(true));
    assert_eq!(body["provider"], json!("cerebras"));
    assert_eq!(body["model"], json!(CEREBRAS_TEST_MODEL));
    assert_eq!(body["api_key_present"], Value::Bool(false));
}

#[test]
fn dry_run_history_starts_with_the_system_turn() {
    let assert = mcask_cmd()
        .args(["--model", GROQ_TEST_MODEL, "--dry-run", "2+2?"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["provider"], json!("groq"));
    let messages = body["messages"]
        .as_array()
        .expect("messages should be an array");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], json!("system"));
    assert_eq!(messages[1], json!({"role": "user", "content": "2+2?"}));
}

#[test]
fn dry_run_reports_default_generation_parameters() {
    let assert = mcask_cmd()
        .args(["--model", GROQ_TEST_MODEL, "--dry-run", "hi"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["request"]["temperature"], json!(0.7));
    assert_eq!(body["request"]["max_tokens"], json!(4096));
    assert_eq!(body["request"]["timeout_secs"], Value::Null);
}

#[test]
fn missing_model_returns_explicit_error() {
    mcask_cmd()
        .arg("hello")
        .assert()
        .failure()
        .stderr(contains("No model provided. Use --model or set MC_MODEL."));
}

#[test]
fn missing_api_key_fails_before_any_request() {
    mcask_cmd()
        .args(["--provider", "cerebras", "--model", CEREBRAS_TEST_MODEL, "hello"])
        .assert()
        .failure()
        .stderr(contains("API key for cerebras not found: set CEREBRAS_API_KEY"));
}

#[test]
fn unknown_cli_provider_returns_error() {
    mcask_cmd()
        .args(["--provider", "openai", "--model", "gpt-4o", "hello"])
        .assert()
        .failure()
        .stderr(contains(
            "Unknown provider 'openai'. Supported values: groq, cerebras.",
        ));
}

#[test]
fn invalid_provider_from_env_returns_error() {
    mcask_cmd()
        .env("MC_PROVIDER", "bad")
        .args(["--model", "x", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid MC_PROVIDER 'bad'."));
}

#[test]
fn out_of_range_temperature_is_a_configuration_error() {
    mcask_cmd()
        .env("GROQ_API_KEY", "gsk-test")
        .args([
            "--model",
            GROQ_TEST_MODEL,
            "--temperature",
            "1.5",
            "hello",
        ])
        .assert()
        .failure()
        .stderr(contains("Invalid model configuration: temperature 1.5"));
}

#[test]
fn argument_prompt_has_priority_over_stdin() {
    let assert = mcask_cmd()
        .args([
            "--provider",
            "groq",
            "--model",
            GROQ_TEST_MODEL,
            "--dry-run",
            "argument prompt",
        ])
        .write_stdin("stdin prompt")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["messages"][1]["content"], json!("argument prompt"));
}

#[test]
fn stdin_prompt_is_used_when_no_argument_is_given() {
    let assert = mcask_cmd()
        .args(["--model", GROQ_TEST_MODEL, "--dry-run"])
        .write_stdin("piped prompt\n")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["messages"][1]["content"], json!("piped prompt"));
}

#[test]
fn json_flag_overrides_output_text() {
    let assert = mcask_cmd()
        .args([
            "--model",
            GROQ_TEST_MODEL,
            "--dry-run",
            "--output",
            "text",
            "--json",
            "hello",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["output"], json!("json"));
}

#[test]
fn profile_loads_provider_model_and_system_for_dry_run() {
    let config_path = unique_temp_path("config");
    fs::write(
        &config_path,
        "[profiles.fast]\nprovider = \"cerebras\"\nmodel = \"llama3.1-70b\"\nsystem = \"be terse\"\n",
    )
    .expect("config should be writable");

    let assert = mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .args(["--profile", "fast", "--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["provider"], json!("cerebras"));
    assert_eq!(body["model"], json!("llama3.1-70b"));
    assert_eq!(
        body["messages"][0],
        json!({"role": "system", "content": "be terse"})
    );
}

#[test]
fn profile_is_not_implicit_when_not_passed() {
    let config_path = unique_temp_path("config-no-implicit");
    fs::write(
        &config_path,
        "[profiles.default]\nprovider = \"cerebras\"\nmodel = \"llama3.1-8b\"\n",
    )
    .expect("config should be writable");

    mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .arg("hello")
        .assert()
        .failure()
        .stderr(contains("No model provided. Use --model or set MC_MODEL."));
}

#[test]
fn precedence_for_temperature_timeout_and_output_is_respected() {
    let config_path = unique_temp_path("precedence-more-options");
    fs::write(
        &config_path,
        "[profiles.fast]\nprovider = \"groq\"\nmodel = \"mixtral-8x7b-32768\"\ntemperature = 0.1\ntimeout = 7\noutput = \"json\"\n",
    )
    .expect("config should be writable");

    let env_over_profile = mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .env("MC_TEMPERATURE", "0.6")
        .env("MC_TIMEOUT", "21")
        .args(["--profile", "fast", "--dry-run", "hello"])
        .assert()
        .success();

    let env_body = parse_stdout_json(&env_over_profile.get_output().stdout);
    assert_eq!(env_body["request"]["temperature"], json!(0.6));
    assert_eq!(env_body["request"]["timeout_secs"], json!(21));
    assert_eq!(env_body["output"], json!("json"));

    let cli_over_env = mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .env("MC_TEMPERATURE", "0.6")
        .env("MC_TIMEOUT", "21")
        .args([
            "--profile",
            "fast",
            "--dry-run",
            "--temperature",
            "0.9",
            "--timeout",
            "33",
            "--output",
            "text",
            "hello",
        ])
        .assert()
        .success();

    let cli_body = parse_stdout_json(&cli_over_env.get_output().stdout);
    assert_eq!(cli_body["request"]["temperature"], json!(0.9));
    assert_eq!(cli_body["request"]["timeout_secs"], json!(33));
    assert_eq!(cli_body["output"], json!("text"));
}

#[test]
fn profile_env_and_cli_precedence_is_respected() {
    let config_path = unique_temp_path("precedence");
    fs::write(
        &config_path,
        "[profiles.fast]\nprovider = \"cerebras\"\nmodel = \"profile-model\"\n",
    )
    .expect("config should be writable");

    let assert = mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .env("MC_PROVIDER", "groq")
        .env("MC_MODEL", "env-model")
        .args([
            "--profile",
            "fast",
            "--provider",
            "cerebras",
            "--model",
            "cli-model",
            "--dry-run",
            "hello",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["provider"], json!("cerebras"));
    assert_eq!(body["model"], json!("cli-model"));
}

#[test]
fn save_writes_and_overwrites_output_file() {
    let output_path = unique_temp_path("save-output").join("nested").join("out.json");

    for prompt in ["first", "second"] {
        mcask_cmd()
            .args([
                "--model",
                GROQ_TEST_MODEL,
                "--dry-run",
                "--save",
                output_path.to_string_lossy().as_ref(),
                prompt,
            ])
            .assert()
            .success();
    }

    let saved = fs::read_to_string(&output_path).expect("output file should exist");
    assert!(saved.contains("\"content\":\"second\""));
    assert!(!saved.contains("\"content\":\"first\""));
}

#[test]
fn save_with_invalid_parent_path_returns_explicit_error() {
    let parent_file = unique_temp_path("save-invalid-parent");
    fs::write(&parent_file, "not a directory").expect("parent marker file should be writable");
    let output_path = parent_file.join("sub").join("out.json");

    mcask_cmd()
        .args([
            "--model",
            GROQ_TEST_MODEL,
            "--dry-run",
            "--save",
            output_path.to_string_lossy().as_ref(),
            "hello",
        ])
        .assert()
        .failure()
        .stderr(contains("Failed to create output directory"));
}

#[test]
fn verbose_does_not_leak_api_key() {
    let secret = "cerebras-secret-value";

    mcask_cmd()
        .env("CEREBRAS_API_KEY", secret)
        .args([
            "--provider",
            "cerebras",
            "--model",
            CEREBRAS_TEST_MODEL,
            "--dry-run",
            "--verbose",
            "hello",
        ])
        .assert()
        .success()
        .stderr(contains("api_key_present=true").and(contains(secret).not()));
}

#[test]
fn quiet_suppresses_verbose_logs_on_stderr() {
    mcask_cmd()
        .args([
            "--model",
            GROQ_TEST_MODEL,
            "--dry-run",
            "--verbose",
            "--quiet",
            "hello",
        ])
        .assert()
        .success()
        .stderr(is_empty());
}

#[test]
fn quiet_keeps_fatal_errors_visible() {
    mcask_cmd()
        .args(["--quiet", "hello"])
        .assert()
        .failure()
        .stderr(contains("No model provided. Use --model or set MC_MODEL."));
}

#[test]
fn profile_file_missing_returns_explicit_error() {
    let config_path = unique_temp_path("missing-config");

    mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .args(["--profile", "fast", "hello"])
        .assert()
        .failure()
        .stderr(contains("Failed to read config file"));
}

#[test]
fn invalid_profile_toml_returns_parse_error() {
    let config_path = unique_temp_path("invalid-toml");
    fs::write(&config_path, "[profiles.bad\nprovider = \"groq\"")
        .expect("config should be writable");

    mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .args(["--profile", "bad", "hello"])
        .assert()
        .failure()
        .stderr(contains("Failed to parse config file"));
}

#[test]
fn profile_not_found_returns_error() {
    let config_path = unique_temp_path("profile-not-found");
    fs::write(&config_path, "[profiles.fast]\nprovider = \"groq\"\n")
        .expect("config should be writable");

    mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .args(["--profile", "missing", "hello"])
        .assert()
        .failure()
        .stderr(contains("Profile 'missing' not found"));
}

#[test]
fn invalid_profile_provider_returns_error() {
    let config_path = unique_temp_path("invalid-provider");
    fs::write(
        &config_path,
        "[profiles.bad]\nprovider = \"unknown\"\nmodel = \"m\"\n",
    )
    .expect("config should be writable");

    mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .args(["--profile", "bad", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid profile provider 'unknown'"));
}

#[test]
fn invalid_profile_output_returns_error() {
    let config_path = unique_temp_path("invalid-output");
    fs::write(
        &config_path,
        "[profiles.bad]\nprovider = \"groq\"\nmodel = \"m\"\noutput = \"yaml\"\n",
    )
    .expect("config should be writable");

    mcask_cmd()
        .env("MC_CONFIG", &config_path)
        .args(["--profile", "bad", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid profile output 'yaml'"));
}

#[test]
fn version_prints_build_metadata() {
    mcask_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("commit:").and(contains("built:")));
}

#[test]
fn mchat_ask_dry_run_matches_mcask_output_shape() {
    let assert = mchat_cmd()
        .args([
            "ask",
            "--provider",
            "cerebras",
            "--model",
            CEREBRAS_TEST_MODEL,
            "--dry-run",
            "hello",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["provider"], json!("cerebras"));
    assert_eq!(body["output"], json!("text"));
}

#[test]
fn mchat_chat_without_key_fails_fast() {
    mchat_cmd()
        .args(["chat", "--provider", "groq"])
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(contains("API key for groq not found: set GROQ_API_KEY"));
}

#[test]
fn mchat_chat_handles_commands_without_network() {
    mchat_cmd()
        .env("GROQ_API_KEY", "gsk-test")
        .args(["chat", "--provider", "groq", "--system", "be terse"])
        .write_stdin("/models\n/history\n/bogus\n/quit\n")
        .assert()
        .success()
        .stdout(
            contains("Chatting with groq/mixtral-8x7b-32768")
                .and(contains("* mixtral-8x7b-32768"))
                .and(contains("llama-3.1-70b-versatile"))
                .and(contains("be terse")),
        )
        .stderr(contains("Unknown command '/bogus'"));
}

#[test]
fn mchat_chat_switch_without_key_keeps_the_session() {
    mchat_cmd()
        .env("GROQ_API_KEY", "gsk-test")
        .args(["chat"])
        .write_stdin("/provider cerebras llama3.1-8b\n/models\n")
        .assert()
        .success()
        .stdout(contains("* mixtral-8x7b-32768"))
        .stderr(contains("API key for cerebras not found"));
}

#[test]
fn mchat_models_lists_catalogs() {
    mchat_cmd()
        .arg("models")
        .assert()
        .success()
        .stdout(
            contains("groq\tmixtral-8x7b-32768")
                .and(contains("groq\tllama-3.1-70b-versatile"))
                .and(contains("cerebras\tllama3.1-8b"))
                .and(contains("cerebras\tllama3.1-70b")),
        );
}

#[test]
fn mchat_models_json_for_one_provider() {
    let assert = mchat_cmd()
        .args(["models", "--provider", "cerebras", "--json"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body,
        json!([{
            "provider": "cerebras",
            "api_key_env": "CEREBRAS_API_KEY",
            "models": ["llama3.1-8b", "llama3.1-70b"]
        }])
    );
}

#[test]
fn mchat_config_check_validates_profiles() {
    let config_path = unique_temp_path("config-check");
    fs::write(
        &config_path,
        "[profiles.a]\nprovider = \"groq\"\n\n[profiles.b]\nprovider = \"cerebras\"\ntemperature = 0.4\n",
    )
    .expect("config should be writable");

    mchat_cmd()
        .env("MC_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(contains("config OK:"));
}

#[test]
fn mchat_config_keys_never_prints_values() {
    mchat_cmd()
        .env("GROQ_API_KEY", "gsk-very-secret")
        .args(["config", "keys"])
        .assert()
        .success()
        .stdout(
            contains("groq\tGROQ_API_KEY\tset")
                .and(contains("cerebras\tCEREBRAS_API_KEY\tmissing"))
                .and(contains("gsk-very-secret").not()),
        );
}

#[test]
fn mchat_help_mentions_completion_command() {
    mchat_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("completion").and(contains("Generate shell completion script")));
}

#[test]
fn mchat_ask_help_includes_examples() {
    mchat_cmd()
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(contains("Examples:").and(contains("--dry-run --json")));
}

#[test]
fn mchat_completion_bash_outputs_script() {
    mchat_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(contains("_mchat").and(contains("complete")));
}

#[test]
fn mchat_completion_fish_outputs_script() {
    mchat_cmd()
        .args(["completion", "fish"])
        .assert()
        .success()
        .stdout(contains("complete -c mchat"));
}

fn dir_with_dotenv(label: &str, contents: &str) -> PathBuf {
    let dir = unique_temp_path(label);
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    fs::write(dir.join(".env"), contents).expect(".env should be writable");
    dir
}

#[test]
fn dotenv_file_supplies_api_keys() {
    let dir = dir_with_dotenv("dotenv-keys", "GROQ_API_KEY=x\n");

    mchat_cmd()
        .current_dir(&dir)
        .args(["config", "keys"])
        .assert()
        .success()
        .stdout(
            contains("groq\tGROQ_API_KEY\tset")
                .and(contains("cerebras\tCEREBRAS_API_KEY\tmissing")),
        );
}

#[test]
fn dotenv_file_supplies_settings_to_mcask() {
    let dir = dir_with_dotenv("dotenv-model", "MC_MODEL=dotenv-model\n");

    let assert = mcask_cmd()
        .current_dir(&dir)
        .args(["--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["model"], json!("dotenv-model"));
}

#[test]
fn process_env_wins_over_dotenv_file() {
    let dir = dir_with_dotenv("dotenv-precedence", "MC_MODEL=dotenv-model\n");

    let assert = mcask_cmd()
        .current_dir(&dir)
        .env("MC_MODEL", "env-model")
        .args(["--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["model"], json!("env-model"));
}
