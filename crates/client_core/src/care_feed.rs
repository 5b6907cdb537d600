use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    domain::{task_ids, EventRecord, NewOutcome, OutcomeQuery, OutcomeRecord, TaskId, TaskRecord},
    protocol::{AppEvent, TaskResult},
};
use storage::CareStore;
use tracing::{info, warn};

use crate::{
    dispatch::{DispatchTable, EventQuery, PresentationDescriptor, TaskCatalog, WidgetKind},
    event_bus::EventBus,
    surveys::{SurveyKind, CHECK_IN_PAIN_ITEM_IDENTIFIER, CHECK_IN_SLEEP_ITEM_IDENTIFIER},
};

/// Answers of a completed check-in, shown on its card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CheckInSummary {
    pub pain: f64,
    pub sleep_hours: f64,
}

impl CheckInSummary {
    /// `None` until the event has an outcome.
    pub fn from_event(event: &EventRecord) -> Option<Self> {
        event.outcome.as_ref()?;
        Some(Self {
            pain: event.answer(CHECK_IN_PAIN_ITEM_IDENTIFIER),
            sleep_hours: event.answer(CHECK_IN_SLEEP_ITEM_IDENTIFIER),
        })
    }
}

impl std::fmt::Display for CheckInSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pain: {}\nSleep: {} hours", self.pain as i64, self.sleep_hours as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareCard {
    pub descriptor: PresentationDescriptor,
    /// Only cards for the current day accept input.
    pub interactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CheckInSummary>,
}

/// Builds the daily list of care cards from the store, the catalog order, and
/// the dispatch table, and records survey completions back into the store.
pub struct CareFeed {
    store: Arc<dyn CareStore>,
    bus: EventBus,
    catalog: TaskCatalog,
    table: DispatchTable,
}

impl CareFeed {
    pub fn new(store: Arc<dyn CareStore>, bus: EventBus) -> Self {
        Self::with_table(store, bus, TaskCatalog::standard(), DispatchTable::standard())
    }

    pub fn with_table(
        store: Arc<dyn CareStore>,
        bus: EventBus,
        catalog: TaskCatalog,
        table: DispatchTable,
    ) -> Self {
        let unregistered = table.missing_from(&catalog);
        if !unregistered.is_empty() {
            info!(?unregistered, "catalog tasks without a card are never shown");
        }
        Self {
            store,
            bus,
            catalog,
            table,
        }
    }

    /// Tasks with an event on `date`, in catalog order. Tasks outside the
    /// catalog are dropped; a failing store yields an empty list.
    pub async fn fetch_ordered_tasks(&self, date: NaiveDate) -> Vec<TaskRecord> {
        fetch_ordered_tasks(self.store.as_ref(), &self.catalog, date).await
    }

    pub async fn is_onboarding_complete(&self) -> bool {
        match self
            .store
            .fetch_outcomes(&OutcomeQuery::for_task(task_ids::ONBOARDING))
            .await
        {
            Ok(outcomes) => !outcomes.is_empty(),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "failed to fetch onboarding outcomes");
                false
            }
        }
    }

    /// Cards to show for `date`. Until onboarding is complete the feed is only
    /// the onboarding survey.
    pub async fn cards_for(&self, date: NaiveDate, today: NaiveDate) -> Vec<CareCard> {
        if !self.is_onboarding_complete().await {
            return vec![CareCard {
                descriptor: PresentationDescriptor {
                    task_id: TaskId::from(task_ids::ONBOARDING),
                    widget: WidgetKind::Survey(SurveyKind::Onboarding),
                    query: EventQuery { date },
                },
                interactive: true,
                summary: None,
            }];
        }

        let interactive = date == today;
        let descriptors: Vec<PresentationDescriptor> = self
            .fetch_ordered_tasks(date)
            .await
            .iter()
            .filter_map(|task| self.table.dispatch(&task.id, date))
            .flatten()
            .collect();

        let mut cards = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let summary = match descriptor.widget {
                WidgetKind::Survey(SurveyKind::CheckIn) => {
                    self.check_in_summary(&descriptor.task_id, date).await
                }
                _ => None,
            };
            cards.push(CareCard {
                descriptor,
                interactive,
                summary,
            });
        }
        cards
    }

    async fn check_in_summary(&self, task_id: &TaskId, date: NaiveDate) -> Option<CheckInSummary> {
        match self.store.fetch_events(task_id, date).await {
            Ok(events) => events.iter().find_map(CheckInSummary::from_event),
            Err(error) => {
                warn!(%task_id, %date, error = %format!("{error:#}"), "failed to fetch check in events");
                None
            }
        }
    }

    /// Stores the outcome of a finished survey and asks views to reload.
    /// A result that cannot be extracted is logged and dropped (`Ok(None)`).
    pub async fn complete_survey(
        &self,
        survey: SurveyKind,
        task_id: &TaskId,
        date: NaiveDate,
        occurrence: u32,
        result: &TaskResult,
    ) -> Result<Option<OutcomeRecord>> {
        let values = match survey.extract(result) {
            Ok(values) => values,
            Err(malformed) => {
                warn!(%task_id, %malformed, "dropping survey completion");
                return Ok(None);
            }
        };

        let outcome = self
            .store
            .add_outcome(NewOutcome {
                task_id: task_id.clone(),
                date,
                occurrence,
                values,
            })
            .await
            .with_context(|| format!("failed to save {} survey outcome", survey.identifier()))?;

        info!(%task_id, %date, "survey outcome saved");
        self.bus.publish(AppEvent::ReloadView);
        Ok(Some(outcome))
    }
}

pub(crate) async fn fetch_ordered_tasks(
    store: &dyn CareStore,
    catalog: &TaskCatalog,
    date: NaiveDate,
) -> Vec<TaskRecord> {
    match store.fetch_tasks_with_events_on(date).await {
        Ok(tasks) => catalog.arrange(tasks, |task| &task.id),
        Err(error) => {
            warn!(%date, error = %format!("{error:#}"), "failed to fetch tasks");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "tests/care_feed_tests.rs"]
mod tests;
