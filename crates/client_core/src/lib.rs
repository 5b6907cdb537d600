use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::SyncProgress;

pub mod care_feed;
pub mod dispatch;
pub mod event_bus;
pub mod insights;
pub mod refresh;
pub mod settings;
pub mod surveys;
pub mod sync;

pub use care_feed::{CareCard, CareFeed, CheckInSummary};
pub use dispatch::{DispatchTable, PresentationDescriptor, TaskCatalog, WidgetKind};
pub use event_bus::{EventBus, Subscription, SubscriptionId};
pub use insights::{Aggregator, ChartBuilder, ChartConfig, Insights};
pub use refresh::ViewRefresh;
pub use surveys::SurveyKind;
pub use sync::{SyncIndicator, SyncOrchestrator, SyncOutcome, SyncState};

/// The remote side of synchronization. Conflict resolution and transport are
/// the implementor's business; the core only observes progress and completion.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    fn is_configured(&self) -> bool {
        true
    }

    /// Runs one synchronization, reporting intermediate progress through `progress`.
    async fn synchronize(&self, progress: &(dyn Fn(SyncProgress) + Send + Sync)) -> Result<()>;
}

pub struct MissingRemoteSync;

#[async_trait]
impl RemoteSync for MissingRemoteSync {
    fn is_configured(&self) -> bool {
        false
    }

    async fn synchronize(&self, _progress: &(dyn Fn(SyncProgress) + Send + Sync)) -> Result<()> {
        Err(anyhow!("remote sync is not configured"))
    }
}
