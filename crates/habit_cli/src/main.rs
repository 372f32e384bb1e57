//! CLI entry point over `habit_core`.
//!
//! # Responsibility
//! - Provide a small operator surface to inspect and mutate the habit and
//!   diary stores from a terminal.
//! - Keep output plain and line-oriented for quick local checks.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use habit_core::db::open_db;
use habit_core::{
    Clock, CoreConfig, DiaryStore, HabitCategory, HabitStore, NewHabit, SqliteDiaryRepository,
    SqliteHabitRepository, SystemClock,
};
use log::info;
use rusqlite::Connection;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "habit", version, about = "Weekly habit and diary tracker")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "HABIT_JOURNEY_DB")]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, env = "HABIT_JOURNEY_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, env = "HABIT_JOURNEY_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core health and version.
    Ping,
    /// List the habits of a week with today's status.
    Week {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    AddHabit {
        title: String,
        first_sub_habit: String,
        #[arg(long, value_enum, default_value_t = CategoryArg::Other)]
        category: CategoryArg,
        #[arg(long, default_value_t = 1)]
        target: u32,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    AddSubHabit {
        habit_id: Uuid,
        title: String,
        #[arg(long, default_value_t = 1)]
        target: u32,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Rename {
        habit_id: Uuid,
        title: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Increment {
        sub_habit_id: Uuid,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    SetProgress {
        sub_habit_id: Uuid,
        value: u32,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Status of a habit or sub-habit on a day.
    Status {
        id: Uuid,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Completed days of a month.
    Month {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    #[command(subcommand)]
    Diary(DiaryCommand),
}

#[derive(Debug, Subcommand)]
enum DiaryCommand {
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Write {
        thoughts: String,
        emotions: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryArg {
    Learning,
    BodySport,
    Other,
}

impl From<CategoryArg> for HabitCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Learning => Self::Learning,
            CategoryArg::BodySport => Self::BodySport,
            CategoryArg::Other => Self::Other,
        }
    }
}

impl Cli {
    fn config(&self) -> CoreConfig {
        let defaults = CoreConfig::default();
        CoreConfig {
            db_path: self.db.clone().unwrap_or(defaults.db_path),
            log_dir: self.log_dir.clone(),
            log_level: self.log_level.clone().unwrap_or(defaults.log_level),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    config.init_logging().context("invalid configuration")?;

    if let Command::Ping = cli.command {
        println!("habit_core ping={}", habit_core::ping());
        println!("habit_core version={}", habit_core::core_version());
        return Ok(());
    }

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    info!("event=cli_start module=cli status=ok");
    let today = SystemClock.today().date();

    match cli.command {
        Command::Diary(command) => run_diary(&conn, command, today),
        command => run_habits(&conn, command, today),
    }
}

fn run_diary(conn: &Connection, command: DiaryCommand, today: NaiveDate) -> Result<()> {
    let mut store = DiaryStore::load(SqliteDiaryRepository::try_new(conn)?)?;
    match command {
        DiaryCommand::Show { date } => {
            let day = date.unwrap_or(today);
            match store.entry(day) {
                Some(entry) => {
                    println!("{} thoughts: {}", entry.day, entry.thoughts);
                    println!("{} emotions: {}", entry.day, entry.emotions);
                }
                None => println!("{day} no entry"),
            }
        }
        DiaryCommand::Write {
            thoughts,
            emotions,
            date,
        } => {
            let entry = store.update_entry(date.unwrap_or(today), thoughts, emotions)?;
            println!("saved diary entry {} for {}", entry.id, entry.day);
        }
    }
    Ok(())
}

fn run_habits(conn: &Connection, command: Command, today: NaiveDate) -> Result<()> {
    let mut store = HabitStore::load(SqliteHabitRepository::try_new(conn)?, SystemClock)?;
    let on = |date: Option<NaiveDate>| date.unwrap_or(today);

    match command {
        Command::Week { date } => {
            let day = on(date);
            for habit in store.habits_for_week(day) {
                println!(
                    "{} [{}] {} progress={} status={}",
                    habit.id,
                    habit.category,
                    habit.title,
                    store.habit_progress(habit.id, day)?,
                    store.habit_status(habit.id, day)?.as_str()
                );
                for sub_habit in &habit.sub_habits {
                    println!(
                        "  {} {} {}/{} {}",
                        sub_habit.id,
                        sub_habit.title,
                        store.sub_habit_progress(sub_habit.id, day),
                        sub_habit.target,
                        store.sub_habit_status(sub_habit.id, day)?.as_str()
                    );
                }
            }
            println!("free slots: {}", store.remaining_capacity(day));
        }
        Command::AddHabit {
            title,
            first_sub_habit,
            category,
            target,
            date,
        } => {
            let request = NewHabit::new(title, first_sub_habit)
                .with_category(category.into())
                .with_target(target);
            let habit = store.add_habit(request, on(date))?;
            println!("added habit {} (sub-habit {})", habit.id, habit.sub_habits[0].id);
        }
        Command::AddSubHabit {
            habit_id,
            title,
            target,
            date,
        } => {
            let sub_habit = store.add_sub_habit(habit_id, &title, target, on(date))?;
            println!("added sub-habit {}", sub_habit.id);
        }
        Command::Rename {
            habit_id,
            title,
            date,
        } => {
            store.rename_habit(habit_id, &title, on(date))?;
            println!("renamed habit {habit_id}");
        }
        Command::Increment { sub_habit_id, date } => {
            let record = store.increment(sub_habit_id, on(date))?;
            println!("{} {} count={}", record.sub_habit_id, record.day, record.count);
        }
        Command::SetProgress {
            sub_habit_id,
            value,
            date,
        } => {
            let record = store.set_progress(sub_habit_id, on(date), value)?;
            println!("{} {} count={}", record.sub_habit_id, record.day, record.count);
        }
        Command::Status { id, date } => {
            let day = on(date);
            let status = if store.habit(id).is_some() {
                store.habit_status(id, day)?
            } else {
                store.sub_habit_status(id, day)?
            };
            println!("{id} {day} {}", status.as_str());
        }
        Command::Month { date } => {
            for day in store.month_overview(on(date)) {
                let mark = if day.completed { "x" } else { "." };
                println!("{} {mark}", day.day);
            }
        }
        Command::Ping | Command::Diary(_) => {}
    }
    Ok(())
}
