use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use recipeloops_agent::{create_client, ProviderType, API_KEY_ENV};
use recipeloops_chef::RecipeCreator;
use recipeloops_core::{LoopConfig, LoopContext, LoopOutcome, LoopRunner};
use recipeloops_critic::CriticEvaluator;
use recipeloops_logging::{init_tracing, LogFormat, Logger};

mod config;

use config::{CliOverrides, ProjectConfig, RunSettings};

#[derive(Parser, Debug)]
#[command(
    name = "recipeloops",
    about = "Chef-critic loop that revises a recipe until every constraint passes",
    version,
    author
)]
struct Cli {
    /// Base dish to build the recipe around
    #[arg(long)]
    dish: Option<String>,

    /// Dietary or nutritional constraint (repeatable, requires --dish)
    #[arg(short, long = "constraint")]
    constraints: Vec<String>,

    /// Load the request from a TOML or JSON file
    #[arg(long, conflicts_with_all = ["dish", "constraints"])]
    request_file: Option<PathBuf>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Model for both roles
    #[arg(short, long)]
    model: Option<String>,

    /// Model for the chef role only
    #[arg(long)]
    chef_model: Option<String>,

    /// Model for the critic role only
    #[arg(long)]
    critic_model: Option<String>,

    /// Sampling temperature for the chef (default: 1.0)
    #[arg(long)]
    chef_temperature: Option<f32>,

    /// Sampling temperature for the critic (default: 0.2)
    #[arg(long)]
    critic_temperature: Option<f32>,

    /// Maximum attempts before giving up (default: 5)
    #[arg(short = 'n', long)]
    max_attempts: Option<usize>,

    /// End the loop on the first generation error instead of retrying
    #[arg(long)]
    stop_on_error: bool,

    /// Only read the last "Overall Status:" line of a critique
    #[arg(long)]
    strict_verdict: bool,

    /// Print the chef prompt and each generated recipe
    #[arg(long)]
    debug_recipe: bool,

    /// Print the critic prompt and each raw critique
    #[arg(long)]
    debug_critique: bool,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds (default: 120)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Tracing level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Also append events as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress progress events on stderr
    #[arg(short, long)]
    quiet: bool,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show the resolved settings without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            dish: self.dish.clone(),
            constraints: self.constraints.clone(),
            request_file: self.request_file.clone(),
            model: self.model.clone(),
            chef_model: self.chef_model.clone(),
            critic_model: self.critic_model.clone(),
            chef_temperature: self.chef_temperature,
            critic_temperature: self.critic_temperature,
            max_attempts: self.max_attempts,
            stop_on_error: self.stop_on_error,
            strict_verdict: self.strict_verdict,
            debug_recipe: self.debug_recipe,
            debug_critique: self.debug_critique,
            base_url: self.base_url.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let project_config = ProjectConfig::load_layered(&working_dir)?;
    let settings = RunSettings::resolve(cli.overrides(), project_config, &working_dir)?;

    if cli.dry_run {
        print_dry_run(&settings, &working_dir);
        return Ok(());
    }

    let client = create_client(ProviderType::OpenAi, settings.client.clone())
        .context("Failed to create text generation client")?;
    if !client.is_available().await {
        anyhow::bail!(
            "Client '{}' is not available. Set {} to your API key.",
            client.name(),
            API_KEY_ENV
        );
    }

    let mut logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };
    if cli.quiet {
        logger = logger.quiet();
    }

    let chef = RecipeCreator::with_settings(client.as_ref(), settings.chef.clone());
    let critic = CriticEvaluator::with_settings(client.as_ref(), settings.critic.clone());
    let loop_config = LoopConfig {
        failure_policy: settings.failure_policy,
        debug: settings.debug,
    };
    let runner = LoopRunner::with_config(chef, critic, Arc::new(logger), loop_config);

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current attempt...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let context = LoopContext::new(settings.request).with_max_attempts(settings.max_attempts);
    let outcome = runner.run(context).await?;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

fn print_dry_run(settings: &RunSettings, working_dir: &std::path::Path) {
    println!("=== Dry Run ===");
    println!("Dish: {}", settings.request.base_dish);
    println!("Constraints: {}", settings.request.constraints_line());
    println!("Working dir: {}", working_dir.display());
    println!(
        "Chef: {} (temperature {})",
        settings.chef.model,
        format_temperature(settings.chef.temperature)
    );
    println!(
        "Critic: {} (temperature {}, {:?} verdict)",
        settings.critic.model,
        format_temperature(settings.critic.temperature),
        settings.critic.verdict_mode
    );
    println!("Max attempts: {}", settings.max_attempts);
    println!("On error: {:?}", settings.failure_policy);
    println!("Base URL: {}", settings.client.base_url);
}

fn format_temperature(temperature: Option<f32>) -> String {
    temperature
        .map(|t| t.to_string())
        .unwrap_or_else(|| "default".to_string())
}

fn print_outcome(outcome: &LoopOutcome) {
    match outcome {
        LoopOutcome::Success {
            attempts,
            taste_rating,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== RECIPE APPROVED ===".green().bold());
            eprintln!("Attempts: {}", attempts);
            if let Some(rating) = taste_rating {
                eprintln!("Taste: {}/10", rating);
            }
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        LoopOutcome::Exhausted {
            attempts,
            last_error,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== TOO MANY RETRIES ===".red().bold());
            eprintln!("No approved recipe after {} attempt(s)", attempts);
            if let Some(error) = last_error {
                eprintln!("Last error: {}", error);
            }
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        LoopOutcome::UserInterrupted {
            attempts,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== INTERRUPTED ===".yellow().bold());
            eprintln!("User stopped after {} attempt(s)", attempts);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }

    // The recipe is the only thing written to stdout
    match outcome.recipe() {
        Some(recipe) => {
            if !outcome.is_success() {
                eprintln!("Last unapproved recipe:");
            }
            eprintln!();
            println!("{}", recipe);
        }
        None => eprintln!("No recipe was produced."),
    }
}
