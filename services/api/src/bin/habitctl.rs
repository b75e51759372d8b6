//! services/api/src/bin/habitctl.rs
//!
//! Command-line client that runs the habit service directly against the database.
//! Credentials from the last `login`/`signup` are cached locally and used for a
//! silent sign-in on every later invocation.

use api_lib::{adapters::DbAdapter, adapters::FileCredentialCache, config::Config};
use chrono::Utc;
use clap::{Parser, Subcommand};
use habit_tracker_core::{
    auth::{forget, restore_session, sign_in_and_remember, sign_up_and_remember},
    require_session, CompletionOutcome, Habit, HabitService, NewHabitInput, Session,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "habitctl", version, about = "Habit tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and remember its credentials
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "HABIT_PASSWORD")]
        password: String,
    },
    /// Sign in and remember the credentials
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "HABIT_PASSWORD")]
        password: String,
    },
    /// Forget cached credentials
    Logout,
    /// List your habits
    List,
    /// Create a habit
    Create {
        /// Habit name
        name: String,
        /// Gap days tolerated before a streak restarts (with the reset policy)
        #[arg(long, default_value_t = 0)]
        missed_days_allowed: u32,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show one habit
    Show { habit_id: Uuid },
    /// Mark a habit done for today
    Done { habit_id: Uuid },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    let db = Arc::new(DbAdapter::new(pool));
    db.run_migrations().await?;

    let cache = FileCredentialCache::new(&config.credential_cache_path);
    let habits = HabitService::new(db.clone())
        .with_calendar_zone(config.calendar_zone)
        .with_gap_policy(config.gap_policy);

    match cli.command {
        Commands::Signup { email, password } => {
            let session = sign_up_and_remember(db.as_ref(), &cache, &email, &password).await?;
            println!("Signed up as {} ({})", email, session.user_id);
        }
        Commands::Login { email, password } => {
            let session = sign_in_and_remember(db.as_ref(), &cache, &email, &password).await?;
            println!("Signed in as {} ({})", email, session.user_id);
        }
        Commands::Logout => {
            forget(&cache).await?;
            println!("Forgot cached credentials at {}", cache.path().display());
        }
        command => {
            let restored = restore_session(db.as_ref(), &cache).await;
            let session = require_session(restored.as_ref())
                .map_err(|_| "not signed in; run `habitctl login` first")?;
            run_habit_command(&habits, session, command).await?;
        }
    }
    Ok(())
}

async fn run_habit_command(habits: &HabitService, session: &Session, command: Commands) -> CliResult {
    let now = Utc::now();
    match command {
        Commands::List => {
            let list = habits.list_habits(session).await?;
            if list.is_empty() {
                println!("No habits yet. Create one with `habitctl create <name>`.");
            }
            for habit in &list {
                print_line(habits, habit, now);
            }
        }
        Commands::Create {
            name,
            missed_days_allowed,
            notes,
        } => {
            let input = NewHabitInput {
                name,
                missed_days_allowed,
                notes,
            };
            let habit = habits.create_habit(session, input, now).await?;
            println!("Created '{}' ({})", habit.name, habit.id);
        }
        Commands::Show { habit_id } => {
            let habit = habits.get_habit(session, habit_id).await?;
            print_line(habits, &habit, now);
            println!("  missed days allowed: {}", habit.missed_days_allowed);
            println!("  recorded days: {}", habit.num_days_record);
            if habit.notes.is_empty() {
                println!("  notes: none");
            } else {
                println!("  notes: {}", habit.notes);
            }
        }
        Commands::Done { habit_id } => {
            let done = habits.mark_done(session, habit_id, now).await?;
            match done.outcome {
                CompletionOutcome::AlreadyDoneToday => {
                    println!("'{}' is already done today", done.habit.name)
                }
                CompletionOutcome::Incremented => {
                    println!("'{}' done, streak {}", done.habit.name, done.habit.streak)
                }
                CompletionOutcome::Restarted => println!(
                    "'{}' done, too many missed days so the streak restarts at {}",
                    done.habit.name, done.habit.streak
                ),
            }
        }
        Commands::Signup { .. } | Commands::Login { .. } | Commands::Logout => {}
    }
    Ok(())
}

fn print_line(habits: &HabitService, habit: &Habit, now: chrono::DateTime<Utc>) {
    let summary = habits.describe(habit, now);
    let mark = if summary.done_today { "x" } else { " " };
    println!(
        "[{}] {}  {}  streak {}  last: {}",
        mark, habit.id, habit.name, habit.streak, summary.label
    );
}
