//! # agentctl
//!
//! Command-line helper for agents sharing one repository and one task list.
//!
//! - `agentctl ready/start/block/finish` — gated task lifecycle
//! - `agentctl verify` — run a task's verify commands
//! - `agentctl guard clean/commit` — staging hygiene before a task commit
//! - `agentctl task ...` — sanctioned edits and queries on tasks.json
//! - `agentctl agents` — list registered agents
//!
//! Refused operations (failed checks, not-ready tasks, lint failures) exit
//! with status 2; any other failure exits with status 1.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::Workspace;

/// Agent workflow helper: readiness, gated status changes, and git hygiene.
#[derive(Parser)]
#[command(name = "agentctl", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,

    /// Minimal output.
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered agents under .AGENTS/.
    Agents,
    /// Check if a task is ready to start (dependencies DONE).
    Ready {
        task_id: String,
    },
    /// Run the verify commands declared on a task.
    Verify {
        task_id: String,
        /// Fail if the task has no verify commands.
        #[arg(long)]
        require: bool,
    },
    /// Guardrails for git staging/commit hygiene.
    Guard {
        #[command(subcommand)]
        command: commands::guard::GuardCommands,
    },
    /// Mark a task DOING with a mandatory "Start:" comment.
    Start {
        task_id: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        body: String,
        /// Bypass readiness, transition, and comment checks.
        #[arg(long)]
        force: bool,
    },
    /// Mark a task BLOCKED with a mandatory "Blocked:" comment.
    Block {
        task_id: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        body: String,
        /// Bypass transition and comment checks.
        #[arg(long)]
        force: bool,
    },
    /// Mark a task DONE and attach commit metadata (after the code commit).
    Finish {
        #[command(flatten)]
        args: commands::lifecycle::FinishArgs,
    },
    /// Operate on tasks.json.
    Task {
        #[command(subcommand)]
        command: commands::task::TaskCommands,
    },
}

fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(commands::exit_code(&e))
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    // RUST_LOG wins when set; otherwise only library warnings are shown.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("swarm_tasks=warn,swarm_submit=warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let ws = Workspace::open(&project_root, cli.quiet)?;

    match &cli.command {
        Commands::Agents => commands::agents::execute(&ws),
        Commands::Ready { task_id } => commands::lifecycle::ready(&ws, task_id),
        Commands::Verify { task_id, require } => commands::lifecycle::verify(&ws, task_id, *require),
        Commands::Guard { command } => commands::guard::execute(command, &ws),
        Commands::Start {
            task_id,
            author,
            body,
            force,
        } => commands::lifecycle::start(&ws, task_id, author, body, *force),
        Commands::Block {
            task_id,
            author,
            body,
            force,
        } => commands::lifecycle::block(&ws, task_id, author, body, *force),
        Commands::Finish { args } => commands::lifecycle::finish(&ws, args),
        Commands::Task { command } => commands::task::execute(command, &ws),
    }
}
