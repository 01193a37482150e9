use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Role of the agent producing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Chef,
    Critic,
}

impl AgentRole {
    fn label(&self) -> &'static str {
        match self {
            AgentRole::Chef => "CHEF",
            AgentRole::Critic => "CRITIC",
        }
    }
}

/// Structured log events for the chef-critic loop.
///
/// Attempt numbers are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        base_dish: String,
        constraints: Vec<String>,
        max_attempts: usize,
        chef_model: String,
        critic_model: String,
    },
    ChefStarted {
        attempt: usize,
        revision: bool,
    },
    ChefCompleted {
        attempt: usize,
        recipe_lines: usize,
        duration_secs: f64,
        /// Total tokens, when the provider reports usage
        tokens: Option<u64>,
    },
    CriticStarted {
        attempt: usize,
    },
    CriticCompleted {
        attempt: usize,
        verdict: String,
        taste_rating: Option<u8>,
        duration_secs: f64,
        tokens: Option<u64>,
    },
    /// Debug channel: the composed input sent to a role
    PromptComposed {
        attempt: usize,
        role: AgentRole,
        prompt: String,
    },
    /// Debug channel: the raw text a role returned
    ModelOutput {
        attempt: usize,
        role: AgentRole,
        text: String,
    },
    AttemptFailed {
        attempt: usize,
        role: AgentRole,
        error: String,
    },
    LoopCompleted {
        attempts: usize,
        duration_secs: f64,
    },
    RetryBudgetExhausted {
        attempts: usize,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for recipeloops events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
    console: bool,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
            console: true,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
            console: true,
        })
    }

    /// Suppress console output (file output, if any, is kept)
    pub fn quiet(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn log(&self, event: &LogEvent) {
        // Log to file if configured (always JSON format for file)
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::LoopStarted {
                base_dish,
                constraints,
                max_attempts,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "recipeloops".bold().bright_white(),
                    " ".repeat(56) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Dish:".dimmed(),
                    Self::truncate_with_padding(base_dish, 62, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Constraints:".dimmed(),
                    Self::truncate_with_padding(&constraints.join(", "), 55, 61).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Attempts:".dimmed(),
                    Self::truncate_with_padding(&max_attempts.to_string(), 58, 64).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ChefStarted { attempt, revision } => {
                let attempt_text = format!("─ Attempt {} ", attempt);
                let padding = "─".repeat(67usize.saturating_sub(attempt_text.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    attempt_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    "CHEF".bright_cyan().bold(),
                    if *revision {
                        "Revising recipe ...".dimmed()
                    } else {
                        "Generating recipe ...".dimmed()
                    }
                );
            }
            LogEvent::ChefCompleted {
                recipe_lines,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} lines ({:.1}s)",
                    "✓".bright_green(),
                    recipe_lines,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::CriticStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_magenta(),
                    "CRITIC".bright_magenta().bold(),
                    "Reviewing recipe ...".dimmed()
                );
            }
            LogEvent::CriticCompleted {
                verdict,
                taste_rating,
                duration_secs,
                ..
            } => {
                let taste = taste_rating
                    .map(|rating| format!(", taste {}/10", rating))
                    .unwrap_or_default();
                let styled_verdict = if verdict == "PASSED" {
                    format!("✓ Verdict: {}{} ({:.1}s)", verdict, taste, duration_secs)
                        .bright_green()
                        .to_string()
                } else {
                    format!("→ Verdict: {}{} ({:.1}s)", verdict, taste, duration_secs)
                        .bright_yellow()
                        .to_string()
                };
                let _ = writeln!(stderr, "    {}", styled_verdict);
                let _ = writeln!(stderr);
                Self::attempt_footer(&mut stderr);
            }
            LogEvent::PromptComposed {
                role, prompt, ..
            } => {
                Self::debug_block(&mut stderr, &format!("{} input", role.label()), prompt);
            }
            LogEvent::ModelOutput { role, text, .. } => {
                Self::debug_block(&mut stderr, &format!("{} output", role.label()), text);
            }
            LogEvent::AttemptFailed {
                attempt,
                role,
                error,
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} failed in attempt {}: {}",
                    "✗".bright_red(),
                    role.label(),
                    attempt,
                    error.bright_red()
                );
                let _ = writeln!(stderr);
                Self::attempt_footer(&mut stderr);
            }
            LogEvent::LoopCompleted { .. } => {
                // Final outcome is printed by the binary
            }
            LogEvent::RetryBudgetExhausted { attempts } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Too many retries: no approved recipe after {} attempt(s)",
                    "⚠".bright_yellow(),
                    attempts
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::LoopStarted {
                base_dish,
                max_attempts,
                ..
            } => format!("[{}] loop:start {} max={}", timestamp, base_dish, max_attempts),
            LogEvent::ChefStarted { attempt, revision } => format!(
                "[{}] chef:start:{}{}",
                timestamp,
                attempt,
                if *revision { " revise" } else { "" }
            ),
            LogEvent::ChefCompleted {
                attempt,
                recipe_lines,
                duration_secs,
                tokens,
            } => format!(
                "[{}] chef:done:{} lines={} {:.1}s{}",
                timestamp,
                attempt,
                recipe_lines,
                duration_secs,
                Self::tokens_suffix(*tokens)
            ),
            LogEvent::CriticStarted { attempt } => {
                format!("[{}] critic:start:{}", timestamp, attempt)
            }
            LogEvent::CriticCompleted {
                attempt,
                verdict,
                taste_rating,
                duration_secs,
                tokens,
            } => format!(
                "[{}] critic:done:{} {} taste={} {:.1}s{}",
                timestamp,
                attempt,
                verdict,
                taste_rating
                    .map(|rating| rating.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                duration_secs,
                Self::tokens_suffix(*tokens)
            ),
            LogEvent::PromptComposed {
                attempt,
                role,
                prompt,
            } => format!(
                "[{}] {}:input:{}\n{}",
                timestamp,
                role.label().to_lowercase(),
                attempt,
                prompt
            ),
            LogEvent::ModelOutput {
                attempt,
                role,
                text,
            } => format!(
                "[{}] {}:output:{}\n{}",
                timestamp,
                role.label().to_lowercase(),
                attempt,
                text
            ),
            LogEvent::AttemptFailed {
                attempt,
                role,
                error,
            } => format!(
                "[{}] error:{}:{} {}",
                timestamp,
                role.label().to_lowercase(),
                attempt,
                error
            ),
            LogEvent::LoopCompleted {
                attempts,
                duration_secs,
            } => format!(
                "[{}] loop:done:{} {:.1}s",
                timestamp, attempts, duration_secs
            ),
            LogEvent::RetryBudgetExhausted { attempts } => {
                format!("[{}] loop:limit:{}", timestamp, attempts)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    fn attempt_footer(stderr: &mut std::io::Stderr) {
        let _ = writeln!(
            stderr,
            "{}",
            "└─────────────────────────────────────────────────────────────────────┘"
                .bright_blue()
        );
        let _ = writeln!(stderr);
    }

    fn debug_block(stderr: &mut std::io::Stderr, title: &str, body: &str) {
        let _ = writeln!(stderr, "    {} {}", "┄".dimmed(), title.dimmed().bold());
        for line in body.lines() {
            let _ = writeln!(stderr, "{} {}", "    │".dimmed(), line.dimmed());
        }
        let _ = writeln!(stderr);
    }

    fn tokens_suffix(tokens: Option<u64>) -> String {
        tokens
            .map(|total| format!(" tokens={}", total))
            .unwrap_or_default()
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
