use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod calendar;
mod clock;
mod config;
mod db;
mod format;
mod html;
mod picker;
mod server;
mod types;

use calendar::WeekStart;
use clock::{Clock, FixedClock, SystemClock};
use config::Settings;
use types::{format_timestamp, parse_timestamp, Issue};

#[derive(Parser, Debug)]
#[command(name = "scadenza")]
#[command(about = "Issue due dates with a Pacific-time calendar picker")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// SQLite database file (overrides SCADENZA_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// First day of the calendar week: sunday or monday (overrides SCADENZA_WEEK_START)
    #[arg(long, global = true)]
    week_start: Option<WeekStart>,

    /// Pin the current time to an ISO-8601 timestamp instead of the system clock
    #[arg(long, global = true)]
    now: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on (overrides SCADENZA_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the month grid the picker would show
    Calendar {
        /// Month to show as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Day to mark as selected, YYYY-MM-DD
        #[arg(short, long)]
        selected: Option<NaiveDate>,
    },

    /// Create an issue
    Add {
        title: String,

        /// Due date as an ISO-8601 timestamp
        #[arg(long)]
        due: Option<String>,
    },

    /// List issues and their due dates
    List,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{month}', expected YYYY-MM"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let mut settings = Settings::from_env()?;
    if let Some(db) = args.db {
        settings.db_path = db;
    }
    if let Some(week_start) = args.week_start {
        settings.week_start = week_start;
    }

    let clock: Arc<dyn Clock> = match args.now.as_deref() {
        Some(now) => {
            let instant = parse_timestamp(now)?;
            info!(now = %format_timestamp(instant), "Using a fixed clock");
            Arc::new(FixedClock(instant))
        }
        None => Arc::new(SystemClock),
    };

    match args.command {
        None => {
            server::serve(settings, clock).await?;
        }
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                settings.port = port;
            }
            server::serve(settings, clock).await?;
        }
        Some(Commands::Calendar { month, selected }) => {
            let today = clock.today();
            let reference = match (&month, selected) {
                (Some(m), _) => parse_month(m)?,
                (None, Some(day)) => day,
                (None, None) => today,
            };
            let selected = selected.unwrap_or(today);

            let cells = calendar::month_grid(reference, today, selected, settings.week_start);
            let title = reference.format("%B %Y").to_string();
            println!("{}", format::text_grid(&title, &cells, settings.week_start));
        }
        Some(Commands::Add { title, due }) => {
            let due_date = due
                .as_deref()
                .map(parse_timestamp)
                .transpose()?
                .map(format_timestamp);

            let conn = db::init_db(&settings.db_path)?;
            let issue = Issue::new(title, due_date, clock.now());
            db::insert_issue(&conn, &issue)?;
            info!(id = %issue.id, title = %issue.title, "Issue created");
        }
        Some(Commands::List) => {
            let conn = db::init_db(&settings.db_path)?;
            let issues = db::list_issues(&conn)?;
            info!(count = issues.len(), path = %settings.db_path.display(), "Found issues");
            for issue in &issues {
                let due = format::committed_label(issue.due_date.as_deref())
                    .unwrap_or_else(|| "no due date".to_string());
                info!(id = %issue.id, title = %issue.title, due = %due, "Issue");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-02").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("February").is_err());
    }

    #[test]
    fn test_args_parse_calendar() {
        let args = Args::try_parse_from([
            "scadenza",
            "calendar",
            "--month",
            "2023-12",
            "--week-start",
            "monday",
        ])
        .unwrap();

        assert_eq!(args.week_start, Some(WeekStart::Monday));
        match args.command {
            Some(Commands::Calendar { month, selected }) => {
                assert_eq!(month.as_deref(), Some("2023-12"));
                assert!(selected.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_args_parse_add_with_fixed_clock() {
        let args = Args::try_parse_from([
            "scadenza",
            "--now",
            "2024-05-20T17:45:00Z",
            "add",
            "Write docs",
            "--due",
            "2024-06-01T09:00:00Z",
        ])
        .unwrap();

        assert_eq!(args.now.as_deref(), Some("2024-05-20T17:45:00Z"));
        match args.command {
            Some(Commands::Add { title, due }) => {
                assert_eq!(title, "Write docs");
                assert_eq!(due.as_deref(), Some("2024-06-01T09:00:00Z"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_args_default_to_serve() {
        let args = Args::try_parse_from(["scadenza"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.log_level, "info");
    }
}
