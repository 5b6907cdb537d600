use super::*;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).expect("date")
}

fn task(id: &str, schedule: Schedule) -> TaskRecord {
    TaskRecord {
        id: TaskId::new(id),
        title: id.to_string(),
        instructions: None,
        schedule,
    }
}

#[tokio::test]
async fn health_check_requires_every_care_table() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("fresh store is healthy");

    sqlx::query("DROP TABLE outcome_values")
        .execute(storage.pool())
        .await
        .expect("drop");
    let err = storage.health_check().await.expect_err("table is gone");
    assert!(err.to_string().contains("outcome_values"), "{err}");
}

#[test]
fn sqlite_path_only_for_file_urls() {
    assert_eq!(
        sqlite_path("sqlite://./data/care.db?mode=rwc"),
        Some(PathBuf::from("./data/care.db"))
    );
    assert_eq!(sqlite_path("sqlite:care.db"), Some(PathBuf::from("care.db")));
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://localhost/care"), None);
}

#[tokio::test]
async fn opening_a_file_url_creates_missing_directories() {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("care_storage_open_{stamp}"));
    let db_path = root.join("a").join("b").join("care.db");

    let storage = Storage::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("open");
    storage.health_check().await.expect("healthy");
    drop(storage);
    assert!(db_path.is_file());

    std::fs::remove_dir_all(root).expect("cleanup");
}

#[tokio::test]
async fn add_tasks_if_not_present_skips_existing_ids() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let water = task("water", Schedule::daily(day(1)));

    let added = storage
        .add_tasks_if_not_present(&[water.clone()])
        .await
        .expect("first add");
    assert_eq!(added, 1);

    let mut renamed = water.clone();
    renamed.title = "Drink water".into();
    let added = storage
        .add_tasks_if_not_present(&[renamed, task("steps", Schedule::daily(day(1)))])
        .await
        .expect("second add");
    assert_eq!(added, 1);

    let stored = storage
        .fetch_task(&TaskId::new("water"))
        .await
        .expect("fetch")
        .expect("water exists");
    assert_eq!(stored.title, "water");
    assert_eq!(storage.list_tasks().await.expect("list").len(), 2);
}

#[tokio::test]
async fn fetches_only_tasks_scheduled_on_date() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let every_other_day = Schedule {
        start: day(1),
        end: None,
        interval_days: 2,
        occurrences_per_day: 1,
    };
    let ended = Schedule {
        start: day(1),
        end: Some(day(2)),
        interval_days: 1,
        occurrences_per_day: 1,
    };
    storage
        .add_tasks_if_not_present(&[
            task("vitamins", Schedule::daily(day(1))),
            task("stretch", every_other_day),
            task("nausea", ended),
            task("kegels", Schedule::daily(day(10))),
        ])
        .await
        .expect("tasks");

    let ids: Vec<String> = storage
        .fetch_tasks_with_events_on(day(3))
        .await
        .expect("fetch")
        .into_iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(ids, vec!["vitamins", "stretch"]);

    let ids: Vec<String> = storage
        .fetch_tasks_with_events_on(day(4))
        .await
        .expect("fetch")
        .into_iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(ids, vec!["vitamins"]);
}

#[tokio::test]
async fn add_outcome_replaces_values_of_same_event() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage
        .add_outcome(NewOutcome {
            task_id: TaskId::new("checkIn"),
            date: day(2),
            occurrence: 0,
            values: vec![OutcomeValue::new("checkin.form.pain", 4.0)],
        })
        .await
        .expect("first outcome");
    let second = storage
        .add_outcome(NewOutcome {
            task_id: TaskId::new("checkIn"),
            date: day(2),
            occurrence: 0,
            values: vec![
                OutcomeValue::new("checkin.form.pain", 2.0),
                OutcomeValue::new("checkin.form.sleep", 8.0),
            ],
        })
        .await
        .expect("second outcome");
    assert_eq!(first.id, second.id);

    let outcomes = storage
        .fetch_outcomes(&OutcomeQuery::for_task("checkIn"))
        .await
        .expect("outcomes");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].values,
        vec![
            OutcomeValue::new("checkin.form.pain", 2.0),
            OutcomeValue::new("checkin.form.sleep", 8.0),
        ]
    );
}

#[tokio::test]
async fn fetch_outcomes_filters_by_task_and_date_range() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for (task_id, date) in [("nausea", day(1)), ("nausea", day(5)), ("doxylamine", day(3))] {
        storage
            .add_outcome(NewOutcome {
                task_id: TaskId::new(task_id),
                date,
                occurrence: 0,
                values: vec![OutcomeValue::new("logged", 1.0)],
            })
            .await
            .expect("outcome");
    }

    let in_range = storage
        .fetch_outcomes(&OutcomeQuery {
            task_ids: vec![TaskId::new("nausea"), TaskId::new("doxylamine")],
            from: Some(day(2)),
            to: Some(day(5)),
        })
        .await
        .expect("range");
    let dates: Vec<NaiveDate> = in_range.iter().map(|o| o.date).collect();
    assert_eq!(dates, vec![day(3), day(5)]);

    let everything = storage
        .fetch_outcomes(&OutcomeQuery::default())
        .await
        .expect("all");
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn events_carry_outcome_of_matching_occurrence() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .add_tasks_if_not_present(&[task(
            "doxylamine",
            Schedule {
                start: day(1),
                end: None,
                interval_days: 1,
                occurrences_per_day: 2,
            },
        )])
        .await
        .expect("task");
    storage
        .add_outcome(NewOutcome {
            task_id: TaskId::new("doxylamine"),
            date: day(6),
            occurrence: 1,
            values: vec![OutcomeValue::new("taken", 1.0)],
        })
        .await
        .expect("outcome");

    let events = storage
        .fetch_events(&TaskId::new("doxylamine"), day(6))
        .await
        .expect("events");
    assert_eq!(events.len(), 2);
    assert!(events[0].outcome.is_none());
    assert_eq!(
        events[1].outcome.as_ref().map(|o| o.values.len()),
        Some(1)
    );

    let unknown = storage
        .fetch_events(&TaskId::new("missing"), day(6))
        .await
        .expect("unknown task");
    assert!(unknown.is_empty());
}
