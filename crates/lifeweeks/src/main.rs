//! Lifeweeks - your life in weeks, one square per week

mod commands;
mod context;
mod expectancy;
mod profile;
mod reminders;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, Weekday};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use weekcache::SystemClock;

use crate::commands::ReminderUpdate;
use crate::context::AppContext;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory
    #[arg(short, long, env = "LIFEWEEKS_DATA", default_value = "./data")]
    data: PathBuf,

    /// Print cache counters after the command
    #[arg(long)]
    counters: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Birth date and life expectancy
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// List the built-in life expectancy table
    Countries,
    /// Weeks lived, weeks remaining and table layout as JSON
    Stats,
    /// Render the life table (cached for the day) and print its URI
    Table {
        /// Discard today's render and draw a new one
        #[arg(long)]
        force: bool,
    },
    /// Show whether today's render is cached
    Status,
    /// Discard the cached render
    Invalidate,
    /// Reminder preferences
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Save the profile
    Set {
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth: NaiveDate,

        /// Country code or name for the expectancy table
        #[arg(long, conflicts_with = "target", required_unless_present = "target")]
        country: Option<String>,

        /// Last day of the table (YYYY-MM-DD)
        #[arg(long)]
        target: Option<NaiveDate>,
    },
    /// Print the stored profile
    Show,
}

#[derive(Subcommand, Debug)]
enum ReminderAction {
    /// Change reminder preferences; omitted options keep their values
    Set {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        #[arg(long)]
        disable: bool,

        /// Remind every day
        #[arg(long, conflicts_with = "weekday")]
        daily: bool,

        /// Remind once a week on this day (mon..sun)
        #[arg(long, value_parser = parse_weekday)]
        weekday: Option<Weekday>,

        /// Local time of day (HH:MM)
        #[arg(long, value_parser = parse_time)]
        at: Option<NaiveTime>,

        /// Body text; {lived} and {remaining} are replaced with week counts
        #[arg(long)]
        message: Option<String>,
    },
    /// Print the next scheduled reminder
    Show,
}

fn parse_weekday(s: &str) -> std::result::Result<Weekday, String> {
    s.parse::<Weekday>()
        .map_err(|_| format!("'{}' is not a weekday", s))
}

fn parse_time(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("'{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Lifeweeks v{}", env!("CARGO_PKG_VERSION"));

    let ctx = AppContext::open(&args.data, Arc::new(SystemClock))?;

    let output = match args.command {
        Command::Profile { action } => match action {
            ProfileAction::Set {
                birth,
                country,
                target,
            } => commands::set_profile(&ctx, birth, country, target)?,
            ProfileAction::Show => commands::show_profile(&ctx)?,
        },
        Command::Countries => commands::list_countries(),
        Command::Stats => commands::show_stats(&ctx)?,
        Command::Table { force } => commands::table(&ctx, force).await?,
        Command::Status => commands::status(&ctx),
        Command::Invalidate => commands::invalidate(&ctx),
        Command::Reminders { action } => match action {
            ReminderAction::Set {
                enable,
                disable,
                daily,
                weekday,
                at,
                message,
            } => commands::set_reminders(
                &ctx,
                ReminderUpdate {
                    enable,
                    disable,
                    daily,
                    weekday,
                    at,
                    message,
                },
            )?,
            ReminderAction::Show => commands::show_reminders(&ctx)?,
        },
    };

    println!("{}", output.trim_end());

    if args.counters {
        println!("{}", commands::counters(&ctx));
    }

    Ok(())
}
