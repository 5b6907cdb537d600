use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    domain::{task_ids, TaskId},
    error::CatalogError,
};

use crate::surveys::SurveyKind;

/// Fixed display order of task identifiers. Never contains duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCatalog {
    order: Vec<TaskId>,
}

impl TaskCatalog {
    pub fn new(ids: impl IntoIterator<Item = TaskId>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for id in ids {
            if !seen.insert(id.clone()) {
                return Err(CatalogError::Duplicate(id));
            }
            order.push(id);
        }
        Ok(Self { order })
    }

    pub fn standard() -> Self {
        Self {
            order: task_ids::ORDERED.iter().copied().map(TaskId::from).collect(),
        }
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.order
    }

    /// Keeps the items whose key is in the catalog and returns them in catalog
    /// order. Items absent from the catalog are dropped, and for repeated keys
    /// only the first item survives.
    pub fn arrange<T>(&self, items: Vec<T>, key: impl Fn(&T) -> &TaskId) -> Vec<T> {
        let mut by_id: HashMap<TaskId, T> = HashMap::with_capacity(items.len());
        for item in items {
            let id = key(&item).clone();
            by_id.entry(id).or_insert(item);
        }
        self.order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Link {
    pub title: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkSet {
    pub title: &'static str,
    pub detail: &'static str,
    pub links: &'static [Link],
}

pub const MEAL_LINKS: LinkSet = LinkSet {
    title: "Meal Links",
    detail: "Websites for good, healthy recipes!",
    links: &[
        Link {
            title: "All The Healthy Things",
            url: "https://allthehealthythings.com",
        },
        Link {
            title: "All Recipes",
            url: "https://www.allrecipes.com/recipes/84/healthy-recipes/",
        },
        Link {
            title: "Eating Well",
            url: "https://www.eatingwell.com/recipes/",
        },
        Link {
            title: "Healthy Recipes",
            url: "https://healthyrecipesblogs.com",
        },
    ],
};

pub const WORKOUT_LINKS: LinkSet = LinkSet {
    title: "Workout Links",
    detail: "Ideas for workouts you could do!",
    links: &[
        Link {
            title: "Beginner Lifting Plan",
            url: "https://www.muscleandfitness.com/workout-plan/workouts/workout-routines/complete-mf-beginners-training-guide-plan/",
        },
        Link {
            title: "Cardio Workouts",
            url: "https://greatist.com/fitness/best-cardio-workouts",
        },
        Link {
            title: "Bodyweight Workouts",
            url: "https://www.fatherly.com/health-science/best-damn-bodyweight-workout/",
        },
    ],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum WidgetKind {
    Checklist,
    ButtonLog,
    Grid,
    Survey(SurveyKind),
    Links(LinkSet),
    NumericProgress,
    Instructions,
    Simple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationDescriptor {
    pub task_id: TaskId,
    pub widget: WidgetKind,
    pub query: EventQuery,
}

type DescriptorFactory = Arc<dyn Fn(&TaskId, NaiveDate) -> Vec<PresentationDescriptor> + Send + Sync>;

/// Registry from task identifier to the cards that render it.
#[derive(Clone, Default)]
pub struct DispatchTable {
    factories: HashMap<TaskId, DescriptorFactory>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&TaskId> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("DispatchTable").field("tasks", &ids).finish()
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, task_id: impl Into<TaskId>, factory: F) -> Self
    where
        F: Fn(&TaskId, NaiveDate) -> Vec<PresentationDescriptor> + Send + Sync + 'static,
    {
        self.factories.insert(task_id.into(), Arc::new(factory));
        self
    }

    /// Registers a task rendered by a single card of `widget`.
    pub fn register_card(self, task_id: &str, widget: WidgetKind) -> Self {
        self.register(task_id, move |task_id, date| {
            vec![PresentationDescriptor {
                task_id: task_id.clone(),
                widget: widget.clone(),
                query: EventQuery { date },
            }]
        })
    }

    pub fn standard() -> Self {
        Self::new()
            .register_card(task_ids::VITAMINS, WidgetKind::Checklist)
            .register_card(task_ids::WATER, WidgetKind::ButtonLog)
            .register_card(task_ids::FASTING, WidgetKind::Grid)
            .register_card(task_ids::CHECK_IN, WidgetKind::Survey(SurveyKind::CheckIn))
            .register_card(
                task_ids::RANGE_OF_MOTION_CHECK,
                WidgetKind::Survey(SurveyKind::RangeOfMotion),
            )
            .register_card(task_ids::ONBOARDING, WidgetKind::Survey(SurveyKind::Onboarding))
            .register_card(task_ids::MEAL_LINKS, WidgetKind::Links(MEAL_LINKS))
            .register_card(task_ids::WORKOUT_LINKS, WidgetKind::Links(WORKOUT_LINKS))
            .register_card(task_ids::STEPS, WidgetKind::NumericProgress)
            .register_card(task_ids::STRETCH, WidgetKind::Instructions)
            .register_card(task_ids::EXERCISE, WidgetKind::Simple)
            .register_card(task_ids::DOXYLAMINE, WidgetKind::Checklist)
            .register_card(task_ids::NAUSEA, WidgetKind::ButtonLog)
    }

    /// Cards for `task_id` on `date`; `None` for tasks without a registration,
    /// which callers omit from display.
    pub fn dispatch(&self, task_id: &TaskId, date: NaiveDate) -> Option<Vec<PresentationDescriptor>> {
        self.factories
            .get(task_id)
            .map(|factory| factory(task_id, date))
    }

    pub fn is_registered(&self, task_id: &TaskId) -> bool {
        self.factories.contains_key(task_id)
    }

    /// Catalog entries that have no registered factory, in catalog order.
    pub fn missing_from(&self, catalog: &TaskCatalog) -> Vec<TaskId> {
        catalog
            .ids()
            .iter()
            .filter(|id| !self.is_registered(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
