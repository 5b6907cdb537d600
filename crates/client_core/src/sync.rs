use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use shared::{
    domain::SyncProgress,
    protocol::{AppEvent, Topic},
};
use tracing::{debug, info, warn};

use crate::{
    event_bus::{EventBus, Subscription},
    RemoteSync,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub in_progress: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed,
    Failed(String),
    /// Another sync was running; nothing was started.
    AlreadyInFlight,
    /// No remote is configured; sync is a permanent no-op.
    NoRemote,
}

/// What the refresh affordance should show for a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIndicator {
    Ready,
    InProgress(SyncProgress),
    Completed,
    Failed,
}

impl SyncIndicator {
    pub fn for_progress(progress: SyncProgress, last_error: Option<&str>) -> Self {
        match progress.percent() {
            0 if last_error.is_some() => SyncIndicator::Failed,
            0 => SyncIndicator::Ready,
            100 => SyncIndicator::Completed,
            _ => SyncIndicator::InProgress(progress),
        }
    }
}

/// Runs at most one remote synchronization at a time and reports its
/// lifecycle on the event bus as `ProgressUpdate` events.
pub struct SyncOrchestrator {
    bus: EventBus,
    remote: Arc<dyn RemoteSync>,
    in_progress: AtomicBool,
    last_error: Mutex<Option<String>>,
    reload_on_success: bool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncOrchestrator {
    pub fn new(bus: EventBus, remote: Arc<dyn RemoteSync>) -> Arc<Self> {
        Self::with_options(bus, remote, false)
    }

    /// `reload_on_success` also publishes `ReloadView` after a successful sync,
    /// used on first launch when the local store starts out empty.
    pub fn with_options(
        bus: EventBus,
        remote: Arc<dyn RemoteSync>,
        reload_on_success: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            remote,
            in_progress: AtomicBool::new(false),
            last_error: Mutex::new(None),
            reload_on_success,
        })
    }

    pub fn state(&self) -> SyncState {
        SyncState {
            in_progress: self.in_progress.load(Ordering::Acquire),
            last_error: self.last_error_guard().clone(),
        }
    }

    pub async fn request_sync(&self) -> SyncOutcome {
        if !self.remote.is_configured() {
            debug!("sync requested without a configured remote");
            return SyncOutcome::NoRemote;
        }

        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sync already in flight");
            return SyncOutcome::AlreadyInFlight;
        }
        let _in_flight = InFlight(&self.in_progress);

        let bus = self.bus.clone();
        let report = move |progress: SyncProgress| {
            bus.publish(AppEvent::ProgressUpdate { progress });
        };

        match self.remote.synchronize(&report).await {
            Ok(()) => {
                info!("successful sync with remote");
                *self.last_error_guard() = None;
                self.bus.publish(AppEvent::ProgressUpdate {
                    progress: SyncProgress::COMPLETE,
                });
                if self.reload_on_success {
                    self.bus.publish(AppEvent::ReloadView);
                }
                SyncOutcome::Completed
            }
            Err(error) => {
                let message = format!("{error:#}");
                warn!(error = %message, "sync with remote failed");
                *self.last_error_guard() = Some(message.clone());
                self.bus.publish(AppEvent::ProgressUpdate {
                    progress: SyncProgress::IDLE,
                });
                SyncOutcome::Failed(message)
            }
        }
    }

    /// Starts a sync on the current tokio runtime for every `RequestSync` event.
    pub fn listen(self: &Arc<Self>) -> Subscription {
        let orchestrator = Arc::downgrade(self);
        self.bus.subscribe(Topic::RequestSync, move |_| {
            let Some(orchestrator) = orchestrator.upgrade() else {
                return;
            };
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        orchestrator.request_sync().await;
                    });
                }
                Err(_) => warn!("sync requested outside of a tokio runtime; ignoring"),
            }
        })
    }

    fn last_error_guard(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
