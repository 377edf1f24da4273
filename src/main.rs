//! anchor CLI: operate an anchor-day database from the terminal.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use anchor_day::config::AppConfig;
use anchor_day::model::{AnchorTaskPatch, DailyLogWithTasks, EnergyLevel};
use anchor_day::paths::AppPaths;
use anchor_day::planner::Planner;
use anchor_day::seeds::{SeedRegistry, SeedSource, dopamine_item_count};
use anchor_day::validate::SignUpForm;

#[derive(Parser)]
#[command(name = "anchor", version, about = "Energy-aware daily planner")]
struct Cli {
    /// Keep config, data and state under this directory instead of the XDG dirs.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the directories, a default config file and the database.
    Init,

    /// Apply seed packs (the configured ones when none are named).
    Seed {
        /// Pack ids, e.g. `initial-user playbook anchors`.
        packs: Vec<String>,

        /// List available packs instead of applying.
        #[arg(long)]
        list: bool,
    },

    /// Manage user accounts.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage a user's anchor tasks.
    Anchors {
        #[command(subcommand)]
        action: AnchorAction,
    },

    /// Record the energy level for a day.
    Log {
        #[arg(long)]
        email: String,

        /// low, medium or high.
        #[arg(long)]
        energy: String,

        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show a day's log and checklist.
    Today {
        #[arg(long)]
        email: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show paths and row counts.
    Info,

    /// How to start the web server.
    Serve,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account.
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum AnchorAction {
    /// Add an anchor task.
    Add {
        #[arg(long)]
        email: String,
        /// Task name.
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List anchor tasks.
    List {
        #[arg(long)]
        email: String,
        /// Include deactivated tasks.
        #[arg(long)]
        all: bool,
    },
    /// Flip a task between active and inactive.
    Toggle {
        #[arg(long)]
        email: String,
        /// Anchor task id.
        id: i64,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = match &cli.data_dir {
        Some(dir) => AppPaths::rooted(dir),
        None => AppPaths::resolve()?,
    };
    paths.ensure_dirs()?;

    let config_file = paths.config_file();
    let mut config = AppConfig::load_or_default(&config_file)?;
    config.apply_env()?;

    match cli.command {
        Commands::Init => {
            if !config_file.exists() {
                config.save(&config_file)?;
                println!("Wrote default config to {}", config_file.display());
            }
            let planner = Planner::from_config(&config, &paths)?;
            let db = config.database_path(&paths);
            println!("Initialized anchor-day database at {}", db.display());
            print_counts(&planner)?;
        }

        Commands::Seed { packs, list } => {
            let registry = SeedRegistry::discover(&paths.seeds_dir());
            if list {
                println!("Available seed packs:");
                for pack in registry.list() {
                    let source = match &pack.source {
                        SeedSource::Bundled => "bundled".to_string(),
                        SeedSource::External(path) => path.display().to_string(),
                    };
                    println!(
                        "  {} v{} ({source}): {} [{} users, {} playbook items ({} dopamine), {} anchor tasks, {} goals]",
                        pack.id,
                        pack.version,
                        pack.description,
                        pack.users.len(),
                        pack.playbook.len(),
                        dopamine_item_count(pack),
                        pack.anchor_tasks.len(),
                        pack.goals.len(),
                    );
                }
                return Ok(());
            }

            let packs = if packs.is_empty() {
                config.seed_packs.clone()
            } else {
                packs
            };
            let planner = Planner::from_config(&config, &paths)?;
            for report in planner.apply_seeds(&registry, &packs)? {
                if report.already_applied {
                    println!("{}: already applied", report.id);
                } else {
                    println!(
                        "{}: {} rows applied, {} skipped",
                        report.id, report.rows_applied, report.rows_skipped
                    );
                }
            }
        }

        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                name,
            } => {
                let planner = Planner::from_config(&config, &paths)?;
                let user = planner.create_user(&SignUpForm {
                    email,
                    password,
                    name,
                })?;
                println!("Created user {} <{}>", user.id, user.email);
            }
        },

        Commands::Anchors { action } => {
            let planner = Planner::from_config(&config, &paths)?;
            match action {
                AnchorAction::Add {
                    email,
                    name,
                    description,
                } => {
                    let user = planner.user_by_email(&email)?;
                    let task =
                        planner.create_anchor_task(user.id, &name, description.as_deref())?;
                    println!("Added anchor task {}: {}", task.id, task.task_name);
                }
                AnchorAction::List { email, all } => {
                    let user = planner.user_by_email(&email)?;
                    let tasks = planner.list_anchor_tasks(user.id, all)?;
                    if tasks.is_empty() {
                        println!("No anchor tasks.");
                    }
                    for task in &tasks {
                        let state = if task.is_active { "" } else { " (inactive)" };
                        match &task.description {
                            Some(d) => println!("  {:>4}  {}{state}: {d}", task.id, task.task_name),
                            None => println!("  {:>4}  {}{state}", task.id, task.task_name),
                        }
                    }
                }
                AnchorAction::Toggle { email, id } => {
                    let user = planner.user_by_email(&email)?;
                    let current = planner.store().anchor_task(user.id, id)?;
                    let task = planner.update_anchor_task(
                        user.id,
                        id,
                        &AnchorTaskPatch {
                            is_active: Some(!current.is_active),
                            ..Default::default()
                        },
                    )?;
                    let state = if task.is_active { "active" } else { "inactive" };
                    println!("{} is now {state}", task.task_name);
                }
            }
        }

        Commands::Log {
            email,
            energy,
            date,
        } => {
            let planner = Planner::from_config(&config, &paths)?;
            let user = planner.user_by_email(&email)?;
            let level: EnergyLevel = energy.parse()?;
            let date = date.unwrap_or_else(|| planner.today());
            let outcome = planner.set_energy_on(user.id, date, level)?;
            if outcome.created {
                println!(
                    "Energy level set to {level} for {date} ({} anchor tasks on today's checklist).",
                    outcome.statuses_created
                );
            } else {
                println!("Energy level set to {level} for {date}.");
            }
        }

        Commands::Today { email, date } => {
            let planner = Planner::from_config(&config, &paths)?;
            let user = planner.user_by_email(&email)?;
            let date = date.unwrap_or_else(|| planner.today());
            match planner.store().daily_log_with_tasks(user.id, date)? {
                Some(day) => print_day(&day),
                None => println!("No log for {date} yet."),
            }
        }

        Commands::Info => {
            let planner = Planner::from_config(&config, &paths)?;
            println!("Config:   {}", config_file.display());
            println!("Database: {}", config.database_path(&paths).display());
            println!("Seeds:    {}", paths.seeds_dir().display());
            print_counts(&planner)?;
        }

        Commands::Serve => {
            println!(
                "Run `anchord` to start the web server on {}.",
                config.listen_addr()
            );
        }
    }

    Ok(())
}

fn print_counts(planner: &Planner) -> Result<()> {
    for (table, count) in planner.store().table_counts().into_diagnostic()? {
        println!("  {table:<26} {count}");
    }
    Ok(())
}

fn print_day(day: &DailyLogWithTasks) {
    println!(
        "{}: {} energy, {}/{} anchor tasks done",
        day.log.log_date,
        day.log.energy_level,
        day.completed_count(),
        day.tasks.len()
    );
    for task in &day.tasks {
        let mark = if task.is_completed { "x" } else { " " };
        println!("  [{mark}] {:>4}  {}", task.status_id, task.task_name);
    }
}
