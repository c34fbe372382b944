mod session;

use clap::{Parser, Subcommand, ValueEnum};
use component_survey::{
    config_schema, render_html, render_json_ui, render_text, run_events as survey_run_events,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::Value;
use session::{
    PromptContext, ResultFormat, SessionPresenter, Verbosity, apply_answer,
    parse_answer,
};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use survey_spec::{
    ConfigError, SubmitError, Trial, TrialConfig, TrialController, TrialResult, validate_config,
};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Single-page survey trial runner",
    long_about = "Runs, validates and renders survey trials described by a JSON trial configuration"
)]
struct Cli {
    /// Show debug logging and verbose session output.
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
    Html,
}

#[derive(Subcommand)]
enum Command {
    /// Run one trial in a text shell, or replay a scripted event file.
    Run {
        /// Path to the trial configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Seed for the question order shuffle.
        #[arg(long, env = "SURVEY_SEED")]
        seed: Option<u64>,
        /// JSON array of UI events to replay instead of prompting.
        #[arg(long, value_name = "EVENTS")]
        events: Option<PathBuf>,
        /// Encoding of the emitted trial record.
        #[arg(long, value_enum, default_value_t = ResultFormat::Json)]
        format: ResultFormat,
    },
    /// Check a trial configuration without running it.
    Validate {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
    },
    /// Print the rendered page for a configuration.
    Render {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        #[arg(long, env = "SURVEY_SEED")]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the JSON Schema of the trial configuration.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Run {
            config,
            seed,
            events,
            format,
        } => match events {
            Some(events) => run_scripted(config, events, seed, format),
            None => run_interactive(config, seed, format, cli.verbose),
        },
        Command::Validate { config } => run_validate(config),
        Command::Render {
            config,
            seed,
            format,
        } => run_render(config, seed, format),
        Command::Schema => {
            let schema = parse_component_result(&config_schema())?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_validate(config_path: PathBuf) -> CliResult<()> {
    let contents = fs::read_to_string(config_path)?;
    let outcome = TrialConfig::from_json(&contents).and_then(|config| {
        validate_config(&config)?;
        Ok(config)
    });

    match outcome {
        Ok(config) => {
            println!("Validation result: valid");
            println!("Questions: {}", config.questions.len());
            for (index, question) in config.questions.iter().enumerate() {
                let mut entry = format!(" - {} ({})", question.key(index), question.kind);
                if question.required {
                    entry.push_str(" [required]");
                }
                println!("{}", entry);
            }
            Ok(())
        }
        Err(err) => {
            println!("Validation result: invalid");
            describe_config_error(&err);
            Err("validation failed".into())
        }
    }
}

fn describe_config_error(err: &ConfigError) {
    println!("  {}", err);
    if let ConfigError::Parse(source) = err {
        println!("  at line {}, column {}", source.line(), source.column());
    }
}

fn run_render(config_path: PathBuf, seed: Option<u64>, format: RenderMode) -> CliResult<()> {
    let config = fs::read_to_string(config_path)?;
    match format {
        RenderMode::Text => println!("{}", component_text(&render_text(&config, seed))?),
        RenderMode::Html => println!("{}", component_text(&render_html(&config, seed))?),
        RenderMode::Json => {
            let ui = parse_component_result(&render_json_ui(&config, seed))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_scripted(
    config_path: PathBuf,
    events_path: PathBuf,
    seed: Option<u64>,
    format: ResultFormat,
) -> CliResult<()> {
    let config = fs::read_to_string(config_path)?;
    let events = fs::read_to_string(events_path)?;
    let outcome = parse_component_result(&survey_run_events(&config, &events, seed))?;

    if outcome["status"] == "complete" {
        let result: TrialResult = serde_json::from_value(outcome["trial_data"].clone())?;
        SessionPresenter::new(Verbosity::Clean).show_completion(&result, format)
    } else {
        println!("Trial incomplete: the event script ended before a valid submission.");
        println!("{}", serde_json::to_string_pretty(&outcome["validation"])?);
        Err("trial was not submitted".into())
    }
}

fn run_interactive(
    config_path: PathBuf,
    seed: Option<u64>,
    format: ResultFormat,
    verbose: bool,
) -> CliResult<()> {
    let contents = fs::read_to_string(config_path)?;
    let controller = TrialController::from_json(&contents)?;
    tracing::debug!(?seed, "starting interactive session");
    let mut trial = render_trial(&controller, seed);
    let mut presenter = SessionPresenter::new(Verbosity::from_verbose(verbose));
    presenter.show_header(trial.tree());

    let mut pending = trial.order().as_slice().to_vec();
    loop {
        let total = trial.tree().len();
        let prompts = pending
            .iter()
            .filter_map(|index| trial.tree().get(*index))
            .map(|handle| PromptContext::new(handle, total))
            .collect::<Vec<_>>();

        for prompt in &prompts {
            let answer = prompt_question(prompt, &presenter)?;
            apply_answer(&mut trial, prompt.original_index, &prompt.options, &answer)?;
        }

        match trial.submit() {
            Ok(result) => return presenter.show_completion(&result, format),
            Err(SubmitError::Invalid(report)) => {
                presenter.show_blocked(trial.tree(), &report);
                pending = trial
                    .order()
                    .as_slice()
                    .iter()
                    .copied()
                    .filter(|index| {
                        report
                            .issues
                            .iter()
                            .any(|issue| issue.original_index == *index)
                    })
                    .collect();
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn render_trial(controller: &TrialController, seed: Option<u64>) -> Trial {
    match seed {
        Some(seed) => controller.render(&mut SmallRng::seed_from_u64(seed)),
        None => controller.render(&mut rand::rng()),
    }
}

fn prompt_question(
    prompt: &PromptContext,
    presenter: &SessionPresenter,
) -> CliResult<session::Answer> {
    loop {
        presenter.show_prompt(prompt);
        let raw = if prompt.kind == survey_spec::QuestionType::LongText {
            read_paragraph()?
        } else {
            print!("> ");
            io::stdout().flush()?;
            read_line()?
        };

        if raw.trim().eq_ignore_ascii_case("exit") {
            return Err("survey aborted by user".into());
        }

        match parse_answer(prompt, &raw) {
            Ok(answer) => return Ok(answer),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

fn read_line() -> CliResult<String> {
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err("input closed before the survey was submitted".into());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_paragraph() -> CliResult<String> {
    let mut lines = Vec::new();
    loop {
        print!("| ");
        io::stdout().flush()?;
        let line = read_line()?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

/// Text responses are either the payload itself or a JSON error object.
fn component_text(response: &str) -> CliResult<String> {
    if let Ok(value) = serde_json::from_str::<Value>(response)
        && let Some(error) = value.get("error").and_then(Value::as_str)
    {
        return Err(error.into());
    }
    Ok(response.to_string())
}
