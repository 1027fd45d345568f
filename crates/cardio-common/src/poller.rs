//! Background status polling.
//!
//! Two independent tasks feed the [`StatusStore`]: the health poller, which runs for the
//! life of the dashboard, and the initialization poller, which runs only while an
//! initialization is in flight. Both are owned through a [`PollerHandle`].

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::GuidelinesClient;
use crate::error::ApiError;
use crate::status::{Applied, InitializationStatus, StatusEvent, StatusStore, SystemStatus};

/// Owns a polling task. Cancelling or dropping the handle aborts the task, and with it
/// any request future still in flight.
#[derive(Debug)]
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    /// True once the task has stopped on its own or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// --- Health ---

/// One `GET /health` round trip applied to the store. Also backs the manual
/// "retry connection" action.
pub async fn check_health_once(client: &GuidelinesClient, store: &StatusStore) -> Applied {
    let seq = store.next_seq();
    match client.health().await {
        Ok(resp) => {
            let status = SystemStatus::from_health(&resp);
            debug!(seq, initialized = status.initialized, status = status.status.as_str(), "health ok");
            store.apply(StatusEvent::HealthSucceeded { seq, status }).await
        }
        Err(e) => {
            warn!(seq, error = %e, unreachable = e.is_connection(), "health check failed");
            store.apply(StatusEvent::HealthFailed { seq }).await
        }
    }
}

/// Checks health immediately, then on a fixed cadence regardless of outcome.
pub fn spawn_health_poller(client: GuidelinesClient, store: StatusStore) -> PollerHandle {
    let period = client.config().health_interval;
    PollerHandle::new(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            check_health_once(&client, &store).await;
        }
    }))
}

// --- Initialization ---

/// What the initialization poller should do after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue,
    Finished(InitializationStatus),
    Abandoned,
}

/// One `GET /system/initialization-status` round trip applied to the store.
///
/// A non-2xx answer is skipped and polling continues; a transport or decode failure
/// abandons the poll with the status left at its last known value.
pub async fn poll_initialization_once(client: &GuidelinesClient, store: &StatusStore) -> PollStep {
    let seq = store.next_seq();
    match client.initialization_status().await {
        Ok(resp) => {
            let status = SystemStatus::from_initialization(&resp);
            store.apply(StatusEvent::Initialization { seq, status }).await;
            if status.status.is_terminal() {
                PollStep::Finished(status.status)
            } else {
                debug!(seq, progress = status.progress, "initialization in progress");
                PollStep::Continue
            }
        }
        Err(e) if e.status().is_some() => {
            debug!(seq, error = %e, "initialization status unavailable");
            PollStep::Continue
        }
        Err(e) => {
            warn!(seq, error = %e, "initialization status poll failed");
            PollStep::Abandoned
        }
    }
}

/// Polls initialization status until a terminal state or a failed poll.
pub fn spawn_initialization_poller(client: GuidelinesClient, store: StatusStore) -> PollerHandle {
    let period = client.config().init_poll_interval;
    PollerHandle::new(tokio::spawn(async move {
        loop {
            sleep(period).await;
            match poll_initialization_once(&client, &store).await {
                PollStep::Continue => {}
                PollStep::Finished(status) => {
                    info!(status = status.as_str(), "initialization finished");
                    break;
                }
                PollStep::Abandoned => break,
            }
        }
    }))
}

/// `POST /system/initialize`; once accepted, marks the system in progress and starts
/// polling. The caller owns the returned poller and should drop any previous one.
pub async fn start_initialization(
    client: &GuidelinesClient,
    store: &StatusStore,
) -> Result<PollerHandle, ApiError> {
    let seq = store.next_seq();
    client.initialize().await?;
    info!("initialization accepted");
    store.apply(StatusEvent::InitializeAccepted { seq }).await;
    Ok(spawn_initialization_poller(client.clone(), store.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn initialization_poll_stops_after_completed() {
        let backend = MockBackend::start().await;
        backend.respond("/system/initialize", 200, json!({"message": "Initialization started"}));
        backend.respond_sequence(
            "/system/initialization-status",
            vec![
                (200, json!({"is_initialized": false, "status": "in_progress", "progress": 40})),
                (200, json!({"is_initialized": true, "status": "completed", "progress": 100})),
            ],
        );
        let client = backend.client();
        let store = StatusStore::new();

        let handle = start_initialization(&client, &store).await.unwrap();
        let snap = store.snapshot().await;
        assert_eq!(snap.system.status, InitializationStatus::InProgress);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_finished());
        assert_eq!(backend.hits("/system/initialization-status"), 2);
        let snap = store.snapshot().await;
        assert!(snap.system.initialized);
        assert_eq!(snap.system.status, InitializationStatus::Completed);
        assert_eq!(snap.system.progress, 100);
    }

    #[tokio::test]
    async fn initialization_poll_stops_after_failed() {
        let backend = MockBackend::start().await;
        backend.respond("/system/initialization-status", 200, json!({"status": "failed"}));
        let client = backend.client();
        let store = StatusStore::new();

        let handle = spawn_initialization_poller(client, store.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(handle.is_finished());
        assert_eq!(backend.hits("/system/initialization-status"), 1);
        assert_eq!(store.snapshot().await.system.status, InitializationStatus::Failed);
    }

    #[tokio::test]
    async fn rejected_initialize_starts_no_poller() {
        let backend = MockBackend::start().await;
        backend.respond("/system/initialize", 500, json!({"detail": "already running"}));
        let client = backend.client();
        let store = StatusStore::new();

        assert!(start_initialization(&client, &store).await.is_err());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(backend.hits("/system/initialization-status"), 0);
        assert_eq!(store.snapshot().await.system.status, InitializationStatus::NotStarted);
    }

    #[tokio::test]
    async fn dropping_handle_stops_requests() {
        let backend = MockBackend::start().await;
        backend.respond("/health", 200, json!({"system_initialized": false}));
        let client = backend.client();
        let store = StatusStore::new();

        let handle = spawn_health_poller(client, store.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let seen = backend.hits("/health");
        assert!(seen >= 1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.hits("/health"), seen);
        assert!(store.snapshot().await.connected);
    }

    #[tokio::test]
    async fn health_with_null_fields_still_counts_as_connected() {
        let backend = MockBackend::start().await;
        backend.respond(
            "/health",
            200,
            json!({"system_initialized": null, "initialization_status": null, "initialization_progress": null}),
        );
        let client = backend.client();
        let store = StatusStore::new();

        assert_eq!(check_health_once(&client, &store).await, Applied::Applied);
        let snap = store.snapshot().await;
        assert!(snap.connected);
        assert!(!snap.system.initialized);
        assert_eq!(snap.system.status, InitializationStatus::NotStarted);
    }

    #[tokio::test]
    async fn failed_health_check_marks_disconnected_only() {
        let backend = MockBackend::start().await;
        backend.respond(
            "/health",
            200,
            json!({"system_initialized": false, "initialization_status": "in_progress", "initialization_progress": 30}),
        );
        let client = backend.client();
        let store = StatusStore::new();

        check_health_once(&client, &store).await;
        assert!(store.snapshot().await.connected);

        backend.respond("/health", 503, json!({"detail": "down"}));
        check_health_once(&client, &store).await;
        let snap = store.snapshot().await;
        assert!(!snap.connected);
        assert!(!snap.system.initialized);
        assert_eq!(snap.system.progress, 30);
    }

    #[tokio::test]
    async fn unreachable_status_endpoint_abandons_poll() {
        let client = GuidelinesClient::new(crate::config::ApiClientConfig::with_base_url(
            "http://127.0.0.1:1",
        ))
        .unwrap();
        let store = StatusStore::new();
        assert_eq!(poll_initialization_once(&client, &store).await, PollStep::Abandoned);
    }
}
