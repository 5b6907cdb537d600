use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use shared::domain::{OutcomeQuery, Schedule, TaskId, TaskRecord};
use storage::{CareStore, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/care.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a task unless its id already exists.
    AddTask {
        id: String,
        title: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        interval_days: u32,
        #[arg(long, default_value_t = 1)]
        occurrences: u32,
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Print every stored task with its schedule.
    ListTasks,
    /// Print recorded outcomes, optionally filtered by task and date range.
    ListOutcomes {
        task_ids: Vec<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    storage.health_check().await?;

    match cli.command {
        Command::AddTask {
            id,
            title,
            start,
            end,
            interval_days,
            occurrences,
            instructions,
        } => {
            if interval_days == 0 {
                bail!("--interval-days must be at least 1");
            }
            let task = TaskRecord {
                id: TaskId::new(id),
                title,
                instructions,
                schedule: Schedule {
                    start,
                    end,
                    interval_days,
                    occurrences_per_day: occurrences,
                },
            };
            let added = storage.add_tasks_if_not_present(&[task.clone()]).await?;
            if added == 0 {
                println!("task {} already exists", task.id);
            } else {
                println!("added task {}", task.id);
            }
        }
        Command::ListTasks => {
            for task in storage.list_tasks().await? {
                println!("{}", serde_json::to_string(&task)?);
            }
        }
        Command::ListOutcomes { task_ids, from, to } => {
            let query = OutcomeQuery {
                task_ids: task_ids.into_iter().map(TaskId::new).collect(),
                from,
                to,
            };
            for outcome in storage.fetch_outcomes(&query).await? {
                println!("{}", serde_json::to_string(&outcome)?);
            }
        }
    }

    Ok(())
}
