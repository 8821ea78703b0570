//! quartet CLI - four-mode assistant control core
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`QUARTET_*`)
//! 3. Project config (`.quartet/config.toml` under `--project`)
//! 4. Global config (`~/.quartet/config.toml`)
//! 5. Default values (lowest priority)
//!
//! # Usage
//!
//! ```text
//! quartet switch to debug mode          # one-shot, prints JSON
//! quartet '{"capability": "process.monitor", "payload": {"name": "db"}}'
//! quartet                               # interactive, one command per line
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use quartet_event::{Board, EventBus};
use quartet_runtime::command::Payload;
use quartet_runtime::config::{ConfigLoader, QuartetConfig};
use quartet_runtime::workspace::{CommandInput, CommandSurface, WorkspaceLoop, WorkspaceRuntime};
use quartet_types::Mode;
use serde_json::{json, Value};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Number of recent events kept for `:events`.
const EVENT_BOARD_CAPACITY: usize = 256;
const EVENTS_SHOWN: usize = 20;

/// quartet CLI - four-mode assistant control core
#[derive(Parser, Debug)]
#[command(name = "quartet")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long)]
    project: Option<PathBuf>,

    /// Initial mode: smart, debug, automation or insight
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Task worker count
    #[arg(short, long)]
    workers: Option<usize>,

    /// Make monitored processes crash (simulation only)
    #[arg(long)]
    simulate_crash: bool,

    /// Log filter directive (also: QUARTET_LOG, default: warn)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print compact single-line JSON
    #[arg(long)]
    json: bool,

    /// Command to execute (optional)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

impl Args {
    fn resolve_config(&self, project_root: &Path) -> Result<QuartetConfig> {
        let mut config = ConfigLoader::new()
            .with_project_root(project_root)
            .load()
            .context("Config error")?;

        // CLI args override (highest priority)
        if self.debug {
            config.debug = true;
        }
        if let Some(mode) = self.mode {
            config.runtime.initial_mode = mode;
        }
        if let Some(workers) = self.workers {
            config.runtime.max_workers = workers;
        }
        if self.simulate_crash {
            config.process.simulate_crash = true;
        }
        Ok(config)
    }

    fn render(&self, value: &Value) -> String {
        let rendered = if self.json {
            serde_json::to_string(value)
        } else {
            serde_json::to_string_pretty(value)
        };
        rendered.unwrap_or_else(|_| value.to_string())
    }
}

fn init_tracing(args: &Args, config: &QuartetConfig) {
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None if config.debug => EnvFilter::new("debug"),
        None => EnvFilter::try_from_env("QUARTET_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}

/// Text, or a JSON object when the line starts with `{`.
fn parse_input(line: &str) -> Result<CommandInput> {
    if line.starts_with('{') {
        let value: Value = serde_json::from_str(line).context("invalid JSON input")?;
        Ok(CommandInput::from_value(value)?)
    } else {
        Ok(CommandInput::Text(line.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_root = match &args.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let config = args.resolve_config(&project_root)?;
    init_tracing(&args, &config);
    info!(path = %project_root.display(), "Project root");

    let bus = Arc::new(EventBus::new());
    let board = Board::attach_with_capacity(&bus, "*", EVENT_BOARD_CAPACITY)?;
    let runtime = Arc::new(
        WorkspaceRuntime::builder()
            .with_config(&config)
            .with_bus(bus)
            .build()
            .context("failed to start runtime")?,
    );

    if args.command.is_empty() {
        interactive(&args, &config, runtime, &board).await
    } else {
        one_shot(&args, &config, &runtime)
    }
}

/// Blocking wait, moved off the async worker it is called from.
fn wait_for_tasks(runtime: &WorkspaceRuntime, wait: Duration) -> bool {
    tokio::task::block_in_place(|| runtime.wait_for_tasks(wait))
}

fn one_shot(args: &Args, config: &QuartetConfig, runtime: &Arc<WorkspaceRuntime>) -> Result<()> {
    let line = args.command.join(" ");
    let input = parse_input(&line)?;
    let surface = CommandSurface::new(Arc::clone(runtime));
    let result = surface.submit(input, Payload::new(), None);

    let wait = Duration::from_millis(config.cli.task_wait_ms);
    if !wait_for_tasks(runtime, wait) {
        tracing::warn!(wait_ms = config.cli.task_wait_ms, "Tasks still running at exit");
    }
    let tasks: Vec<Value> = runtime
        .task_records()
        .iter()
        .map(|r| {
            json!({
                "id": r.id.to_string(),
                "name": r.name,
                "status": r.status,
                "result": r.result,
                "error": r.error,
            })
        })
        .collect();

    println!("{}", args.render(&json!({"result": result, "tasks": tasks})));
    if result.get("status").and_then(Value::as_str) == Some("error") {
        anyhow::bail!(
            "command failed: {}",
            result.get("error").and_then(Value::as_str).unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn interactive(
    args: &Args,
    config: &QuartetConfig,
    runtime: Arc<WorkspaceRuntime>,
    board: &Board,
) -> Result<()> {
    println!(
        "quartet v{} (mode: {})",
        env!("CARGO_PKG_VERSION"),
        runtime.modes().mode()
    );
    println!("Type a command, a JSON object, or :help");

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    // Detached: a blocked stdin read must not hold up exit.
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut workspace = WorkspaceLoop::new(Arc::clone(&runtime));
    let wait = Duration::from_millis(config.cli.task_wait_ms);

    while let Some(line) = line_rx.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            ":quit" | ":q" | "quit" | "exit" => {
                println!("Quit requested");
                break;
            }
            ":help" => print_help(),
            ":status" => println!("{}", args.render(&json!(runtime.status()))),
            ":transcript" => {
                for entry in runtime.transcript().recent(config.cli.transcript_tail) {
                    println!(
                        "[{}] {} {}",
                        entry.kind.as_str(),
                        entry.message,
                        entry.data
                    );
                }
            }
            ":tasks" => {
                for record in runtime.task_records() {
                    println!("{} {} {}", record.id, record.name, record.status);
                }
            }
            ":events" => {
                for event in board.recent(EVENTS_SHOWN) {
                    println!("{} ({}) {}", event.name, event.source, event.payload);
                }
            }
            _ => {
                let input = match parse_input(line) {
                    Ok(input) => input,
                    Err(e) => {
                        eprintln!("Error: {e:#}");
                        continue;
                    }
                };
                workspace.enqueue_command(input, Payload::new())?;
                match workspace.process_next(wait).await {
                    Some(result) => println!("{}", args.render(&result)),
                    None => eprintln!("Error: command was not processed"),
                }
            }
        }
    }

    workspace.stop();
    if !wait_for_tasks(&runtime, wait) {
        tracing::warn!("Tasks still running at exit");
    }
    debug!(tasks = runtime.task_records().len(), "Interactive session ended");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  <text>        interpret and dispatch, e.g. 'switch to debug mode'");
    println!("  {{...}}         structured input, e.g. {{\"capability\": \"insight.analyze\"}}");
    println!("  :status       runtime status");
    println!("  :transcript   recent transcript entries");
    println!("  :tasks        submitted tasks");
    println!("  :events       recent events");
    println!("  :quit         exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_input_detects_json() {
        assert!(matches!(
            parse_input("{\"capability\": \"mode.set\"}").expect("json"),
            CommandInput::Structured(_)
        ));
        assert!(matches!(
            parse_input("switch to debug").expect("text"),
            CommandInput::Text(_)
        ));
        assert!(parse_input("{not json").is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn wait_for_tasks_runs_inside_async_context() {
        let runtime = WorkspaceRuntime::builder()
            .max_workers(1)
            .build()
            .expect("runtime");
        assert!(wait_for_tasks(&runtime, Duration::from_millis(50)));
    }

    #[test]
    fn cli_overrides_config() {
        let args = Args::parse_from(["quartet", "--mode", "insight", "-w", "2", "--simulate-crash"]);
        let dir = std::env::temp_dir();
        let config = args.resolve_config(&dir).expect("config");
        assert_eq!(config.runtime.initial_mode, Mode::Insight);
        assert_eq!(config.runtime.max_workers, 2);
        assert!(config.process.simulate_crash);
    }
}
