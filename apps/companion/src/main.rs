use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    settings::{load_settings, prepare_database_url},
    surveys::{
        CHECK_IN_FORM_IDENTIFIER, CHECK_IN_IDENTIFIER, CHECK_IN_PAIN_ITEM_IDENTIFIER,
        CHECK_IN_SLEEP_ITEM_IDENTIFIER, ONBOARDING_IDENTIFIER,
    },
    CareFeed, EventBus, Insights, MissingRemoteSync, SurveyKind, SyncIndicator, SyncOrchestrator,
    SyncOutcome, ViewRefresh,
};
use shared::{
    domain::{task_ids, TaskId},
    protocol::{AppEvent, Answer, QuestionResult, StepResult, TaskResult, Topic},
};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the configured database url.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the care cards for a day.
    Feed {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the weekly charts for the week containing a day.
    Insights {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record a check-in (pain on a 0-10 scale, hours of sleep); defaults to today.
    CheckIn {
        #[arg(long)]
        pain: f64,
        #[arg(long)]
        sleep: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark onboarding as completed, unlocking the full care feed.
    Onboard,
    /// Synchronize the local store with the remote, if one is configured.
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let settings = load_settings();
    let database_url = prepare_database_url(cli.database_url.as_deref().unwrap_or(&settings.database_url))?;
    let storage = Arc::new(
        Storage::new(&database_url)
            .await
            .with_context(|| format!("failed to open care store at {database_url}"))?,
    );
    storage.health_check().await?;

    let bus = EventBus::new();
    let refresh = ViewRefresh::watch(&bus);
    bus.publish(AppEvent::StoreInitialized);
    let rendered_at = refresh.generation();

    let today = Local::now().date_naive();
    match cli.command {
        Command::Feed { date } => {
            let feed = CareFeed::new(storage, bus.clone());
            for card in feed.cards_for(date.unwrap_or(today), today).await {
                println!("{}", serde_json::to_string(&card)?);
            }
        }
        Command::Insights { date } => {
            let insights = Insights::new(storage);
            for chart in insights.charts_for(date.unwrap_or(today)).await {
                println!("{}", serde_json::to_string_pretty(&chart)?);
            }
        }
        Command::CheckIn { pain, sleep, date } => {
            let feed = CareFeed::new(storage, bus.clone());
            let saved = feed
                .complete_survey(
                    SurveyKind::CheckIn,
                    &TaskId::from(task_ids::CHECK_IN),
                    date.unwrap_or(today),
                    0,
                    &check_in_result(pain, sleep),
                )
                .await?;
            match saved {
                Some(outcome) => println!("saved check in outcome_id={}", outcome.id.0),
                None => println!("check in was not recorded"),
            }
        }
        Command::Onboard => {
            let feed = CareFeed::new(storage, bus.clone());
            let result = TaskResult {
                identifier: ONBOARDING_IDENTIFIER.into(),
                end_date: Some(Utc::now()),
                results: Vec::new(),
            };
            feed.complete_survey(
                SurveyKind::Onboarding,
                &TaskId::from(task_ids::ONBOARDING),
                today,
                0,
                &result,
            )
            .await?;
            println!("onboarding complete");
        }
        Command::Sync => {
            let orchestrator =
                SyncOrchestrator::with_options(bus.clone(), Arc::new(MissingRemoteSync), settings.first_launch);
            let _progress = {
                let orchestrator = Arc::clone(&orchestrator);
                bus.subscribe(Topic::ProgressUpdate, move |event| {
                    if let AppEvent::ProgressUpdate { progress } = event {
                        let state = orchestrator.state();
                        let indicator =
                            SyncIndicator::for_progress(*progress, state.last_error.as_deref());
                        println!("sync {progress}: {indicator:?}");
                    }
                })
            };
            match orchestrator.request_sync().await {
                SyncOutcome::Completed => println!("sync completed"),
                SyncOutcome::Failed(error) => println!("sync failed: {error}"),
                SyncOutcome::AlreadyInFlight => println!("sync already running"),
                SyncOutcome::NoRemote => println!("no remote configured; nothing to sync"),
            }
        }
    }

    if refresh.is_stale(rendered_at) {
        info!(generation = refresh.generation(), "store changed; views reloaded");
    }

    Ok(())
}

fn check_in_result(pain: f64, sleep: f64) -> TaskResult {
    let question = |identifier: &str, value: f64| QuestionResult {
        identifier: identifier.into(),
        answer: Some(Answer::Scale { value }),
    };
    TaskResult {
        identifier: CHECK_IN_IDENTIFIER.into(),
        end_date: Some(Utc::now()),
        results: vec![StepResult {
            identifier: CHECK_IN_FORM_IDENTIFIER.into(),
            results: vec![
                question(CHECK_IN_PAIN_ITEM_IDENTIFIER, pain),
                question(CHECK_IN_SLEEP_ITEM_IDENTIFIER, sleep),
            ],
        }],
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
