use std::{collections::HashMap, sync::Arc};

use chrono::{Datelike, Duration, NaiveDate};
use futures::future::join_all;
use serde::Serialize;
use shared::domain::{task_ids, EventRecord, TaskId};
use storage::CareStore;
use tracing::{debug, warn};

use crate::{care_feed::fetch_ordered_tasks, dispatch::TaskCatalog};

/// How the events of one day collapse into a single plotted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    /// Sum of every outcome value divided by the number of events that have
    /// an outcome; 0 when none do.
    Mean,
    /// Number of outcome values across the events.
    CountOutcomeValues,
}

impl Aggregator {
    pub fn aggregate(self, events: &[EventRecord]) -> f64 {
        let outcomes = events.iter().filter_map(|event| event.outcome.as_ref());
        match self {
            Aggregator::Mean => {
                let (sum, with_outcome) = outcomes.fold((0.0, 0usize), |(sum, count), outcome| {
                    (sum + outcome.values.iter().map(|v| v.value).sum::<f64>(), count + 1)
                });
                debug!(sum, with_outcome, "mean aggregate");
                if with_outcome == 0 {
                    0.0
                } else {
                    sum / with_outcome as f64
                }
            }
            Aggregator::CountOutcomeValues => outcomes.map(|o| o.values.len()).sum::<usize>() as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotType {
    Bar,
    Scatter,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gradient {
    pub start: &'static str,
    pub end: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSeriesConfig {
    pub task_id: TaskId,
    pub legend: &'static str,
    pub gradient: Gradient,
    pub marker_size: u32,
    pub aggregator: Aggregator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartConfig {
    pub title: &'static str,
    pub detail: &'static str,
    pub plot: PlotType,
    pub series: Vec<DataSeriesConfig>,
}

const ACCENT: Gradient = Gradient {
    start: "#10a8dc",
    end: "#007aff",
};
const GRAY: Gradient = Gradient {
    start: "#aeaeb2",
    end: "#8e8e93",
};

/// Lookup from task identifier to the chart that plots it.
#[derive(Debug, Clone, Default)]
pub struct ChartBuilder {
    configs: HashMap<TaskId, ChartConfig>,
}

impl ChartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, task_id: impl Into<TaskId>, config: ChartConfig) -> Self {
        self.configs.insert(task_id.into(), config);
        self
    }

    pub fn standard() -> Self {
        Self::new()
            .register(
                task_ids::CHECK_IN,
                ChartConfig {
                    title: "Average Check In's",
                    detail: "This Week",
                    plot: PlotType::Bar,
                    series: vec![DataSeriesConfig {
                        task_id: TaskId::from(task_ids::CHECK_IN),
                        legend: "Check In",
                        gradient: ACCENT,
                        marker_size: 10,
                        aggregator: Aggregator::Mean,
                    }],
                },
            )
            .register(
                task_ids::NAUSEA,
                ChartConfig {
                    title: "Nausea & Doxylamine Intake",
                    detail: "This Week",
                    plot: PlotType::Bar,
                    series: vec![
                        DataSeriesConfig {
                            task_id: TaskId::from(task_ids::NAUSEA),
                            legend: "Nausea",
                            gradient: ACCENT,
                            marker_size: 10,
                            aggregator: Aggregator::CountOutcomeValues,
                        },
                        DataSeriesConfig {
                            task_id: TaskId::from(task_ids::DOXYLAMINE),
                            legend: "Doxylamine",
                            gradient: GRAY,
                            marker_size: 10,
                            aggregator: Aggregator::CountOutcomeValues,
                        },
                    ],
                },
            )
    }

    pub fn config_for(&self, task_id: &TaskId) -> Option<ChartConfig> {
        self.configs.get(task_id).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesData {
    pub task_id: TaskId,
    pub legend: &'static str,
    pub points: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub config: ChartConfig,
    pub series: Vec<SeriesData>,
}

/// First day (Sunday) of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

pub struct Insights {
    store: Arc<dyn CareStore>,
    catalog: TaskCatalog,
    charts: ChartBuilder,
}

impl Insights {
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        Self::with_charts(store, TaskCatalog::standard(), ChartBuilder::standard())
    }

    pub fn with_charts(store: Arc<dyn CareStore>, catalog: TaskCatalog, charts: ChartBuilder) -> Self {
        Self {
            store,
            catalog,
            charts,
        }
    }

    /// Charts for the tasks scheduled on `date`, in catalog order.
    pub async fn charts_for(&self, date: NaiveDate) -> Vec<ChartData> {
        let configs: Vec<ChartConfig> = fetch_ordered_tasks(self.store.as_ref(), &self.catalog, date)
            .await
            .iter()
            .filter_map(|task| self.charts.config_for(&task.id))
            .collect();

        let mut charts = Vec::with_capacity(configs.len());
        for config in configs {
            charts.push(self.chart_data(config, date).await);
        }
        charts
    }

    /// One point per day of the week containing `date`, for every series.
    pub async fn chart_data(&self, config: ChartConfig, date: NaiveDate) -> ChartData {
        let days: Vec<NaiveDate> = (0..7).map(|n| week_start(date) + Duration::days(n)).collect();

        let mut series = Vec::with_capacity(config.series.len());
        for series_config in &config.series {
            let points = join_all(days.iter().map(|day| async move {
                let events = self.events_or_empty(&series_config.task_id, *day).await;
                DataPoint {
                    date: *day,
                    value: series_config.aggregator.aggregate(&events),
                }
            }))
            .await;
            series.push(SeriesData {
                task_id: series_config.task_id.clone(),
                legend: series_config.legend,
                points,
            });
        }

        ChartData { config, series }
    }

    async fn events_or_empty(&self, task_id: &TaskId, date: NaiveDate) -> Vec<EventRecord> {
        match self.store.fetch_events(task_id, date).await {
            Ok(events) => events,
            Err(error) => {
                warn!(%task_id, %date, error = %format!("{error:#}"), "failed to fetch events");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/insights_tests.rs"]
mod tests;
