use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use oddsrunner::backfill::{self, Mode};
use oddsrunner::bootstrap::{self, BootstrapOptions};
use oddsrunner::config::Config;
use oddsrunner::schedule::ScheduleError;
use oddsrunner::tasks::{invoker, RunResult, Task, TaskKind};
use oddsrunner::{env, platform, schedule, storage};

#[derive(Parser)]
#[command(
    name = "oddsrunner",
    about = "Operations launcher and scheduler for the odds-engine pipeline",
    version,
    long_about = None
)]
struct Cli {
    /// Pipeline project directory (where manage.py lives)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One-time environment preparation (directories, dependencies, schema)
    Setup {
        /// Skip the best-effort pip install of the dependency manifest
        #[arg(long)]
        no_pip: bool,

        /// Immediately run ingestion and feature computation afterwards
        #[arg(long)]
        run_now: bool,
    },

    /// Run a single pipeline task right now
    Run {
        #[arg(value_enum)]
        task: RunTarget,
    },

    /// Backfill historical odds (tierA|tierB|tierC|all|sport:<key>)
    Backfill {
        #[arg(default_value = "all")]
        mode: String,
    },

    /// Manage recurring schedules
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Show recent run results
    History {
        /// Maximum rows to show
        #[arg(long, default_value = "20")]
        limit: u32,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Install the tagged schedule set into the host scheduler
    Install {
        /// Render without installing
        #[arg(long)]
        dry_run: bool,

        /// Target platform (unix|windows|wsl); defaults to the detected host
        #[arg(long)]
        platform: Option<String>,
    },

    /// Remove the tagged schedule set
    Remove,

    /// Preview what will run in the next N hours
    Preview {
        /// Hours to preview
        #[arg(long, default_value = "24")]
        hours: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RunTarget {
    Ingest,
    Decision,
    Features,
    Setup,
}

impl From<RunTarget> for TaskKind {
    fn from(target: RunTarget) -> Self {
        match target {
            RunTarget::Ingest => TaskKind::Ingest,
            RunTarget::Decision => TaskKind::Decision,
            RunTarget::Features => TaskKind::Features,
            RunTarget::Setup => TaskKind::Setup,
        }
    }
}

fn print_results(results: &[RunResult]) {
    println!("{:<12} | {:<8} | {:<5} | Started", "Task", "Status", "Exit");
    println!("{:-<12}-|-{:-<8}-|-{:-<5}-|-{:-<25}", "", "", "", "");
    for r in results {
        let exit = r
            .exit_code
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        println!(
            "{:<12} | {:<8} | {:<5} | {}",
            r.task,
            r.status.to_string(),
            exit,
            r.started_at.to_rfc3339()
        );
    }
}

/// Exit 1 when any task in the sequence failed.
fn exit_on_failure(results: &[RunResult]) {
    if results.iter().any(|r| !r.is_success()) {
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.project_dir)?;

    match cli.command {
        Commands::Setup { no_pip, run_now } => {
            tracing::info!(project = %cfg.project_dir.display(), "Bootstrapping pipeline environment");
            let adapter = platform::detect();
            let profile = env::resolve(&cfg.project_dir, adapter.as_ref())?;
            let pool = storage::open_pool(&cfg.db_path())?;

            let opts = BootstrapOptions {
                skip_pip: no_pip,
                run_now,
            };
            let report = bootstrap::bootstrap(&cfg, &profile, &pool, &opts).await?;
            if let Some(remediation) = &report.remediation {
                print_results(std::slice::from_ref(remediation));
            }
            if report.results.is_empty() {
                println!("Environment ready; no tasks invoked.");
            } else {
                print_results(&report.results);
            }
            // The dependency install is best effort; only the bootstrap
            // sequence itself decides the exit code.
            exit_on_failure(&report.results);
        }
        Commands::Run { task } => {
            let kind: TaskKind = task.into();
            tracing::info!(task = kind.name(), "Running task");
            let adapter = platform::detect();
            let profile = env::resolve(&cfg.project_dir, adapter.as_ref())?;
            let pool = storage::open_pool(&cfg.db_path())?;

            let task = Task::for_kind(kind, &cfg, &profile);
            let result = invoker::invoke(&task, &[], &profile, Some(&pool)).await?;
            print_results(std::slice::from_ref(&result));
            exit_on_failure(std::slice::from_ref(&result));
        }
        Commands::Backfill { mode } => {
            let mode: Mode = match mode.parse() {
                Ok(mode) => mode,
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(2);
                }
            };
            tracing::info!(%mode, "Running backfill");
            let adapter = platform::detect();
            let profile = env::resolve(&cfg.project_dir, adapter.as_ref())?;
            let pool = storage::open_pool(&cfg.db_path())?;

            let results = backfill::run(&mode, &cfg, &profile, &pool).await?;
            print_results(&results);
            exit_on_failure(&results);
        }
        Commands::Schedule { action } => match action {
            ScheduleAction::Install { dry_run, platform } => {
                let adapter = match platform {
                    Some(name) => match platform::by_name(&name) {
                        Some(adapter) => adapter,
                        None => {
                            eprintln!("error: unknown platform '{name}' (expected unix, windows, or wsl)");
                            std::process::exit(2);
                        }
                    },
                    None => platform::detect(),
                };
                let profile = env::resolve(&cfg.project_dir, adapter.as_ref())?;
                let entries = schedule::defaults(&cfg);
                let tasks = Task::registry(&cfg, &profile);
                let rendered = schedule::render(&entries, &tasks, adapter.as_ref(), &cfg)?;

                if dry_run {
                    print!("{rendered}");
                } else {
                    let summary = adapter
                        .install(&rendered, &cfg.schedule_tag, &cfg.project_dir)
                        .await?;
                    println!("{summary}");
                }
            }
            ScheduleAction::Remove => {
                let adapter = platform::detect();
                let entries = schedule::defaults(&cfg);
                let summary = adapter
                    .remove(&entries, &cfg.schedule_tag, &cfg.project_dir)
                    .await?;
                println!("{summary}");
            }
            ScheduleAction::Preview { hours } => {
                let entries = schedule::defaults(&cfg);
                let preview = match schedule::preview_next_runs(&entries, hours) {
                    Ok(preview) => preview,
                    Err(e)
                        if matches!(
                            e.downcast_ref::<ScheduleError>(),
                            Some(ScheduleError::WindowOutOfRange(_))
                        ) =>
                    {
                        eprintln!("error: {e}");
                        std::process::exit(2);
                    }
                    Err(e) => return Err(e),
                };
                if preview.is_empty() {
                    println!("No runs scheduled in next {hours} hours.");
                } else {
                    println!("Upcoming runs (next {hours} hours):");
                    for (time, task) in preview {
                        println!("{time} : {task}");
                    }
                }
            }
        },
        Commands::History { limit, json } => {
            let pool = storage::open_pool(&cfg.db_path())?;
            let runs = storage::recent_runs(&pool, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                println!("No runs recorded yet.");
            } else {
                print_results(&runs);
            }
        }
    }

    Ok(())
}
