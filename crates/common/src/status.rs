//! Progress status events emitted while syncing a target.
//!
//! The orchestrator reports every transition through a caller-supplied
//! [`StatusCallback`]. The callback is awaited before the sync proceeds, so
//! a slow consumer (a terminal UI, a log shipper) applies backpressure.

use std::{fmt, sync::Mutex};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::info,
};

// ── SyncStep ────────────────────────────────────────────────────────────────

/// Transitions of a target sync, in the order they are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStep {
    GlobalStart,
    Run,
    RunComplete,
    GlobalDone,
    ReposStart,
    RunOnRepo,
    RunOnRepoComplete,
    ReposDone,
    /// Progress reported by a plugin hook itself.
    Plugin(String),
}

impl SyncStep {
    pub fn as_str(&self) -> &str {
        match self {
            Self::GlobalStart => "global-start",
            Self::Run => "run",
            Self::RunComplete => "run-complete",
            Self::GlobalDone => "global-done",
            Self::ReposStart => "repos-start",
            Self::RunOnRepo => "run-on-repo",
            Self::RunOnRepoComplete => "run-on-repo-complete",
            Self::ReposDone => "repos-done",
            Self::Plugin(step) => step,
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── StatusEvent ─────────────────────────────────────────────────────────────

/// Structured context attached to a status event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl StatusData {
    pub fn with_target(mut self, target: Option<&str>) -> Self {
        self.target = target.map(str::to_owned);
        self
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub step: SyncStep,
    pub message: String,
    #[serde(default)]
    pub data: StatusData,
}

impl StatusEvent {
    pub fn new(step: SyncStep, message: impl Into<String>, data: StatusData) -> Self {
        Self {
            step,
            message: message.into(),
            data,
        }
    }
}

// ── StatusCallback ──────────────────────────────────────────────────────────

/// Receives progress events. Implementations may suspend; the caller waits.
#[async_trait]
pub trait StatusCallback: Send + Sync {
    async fn on_status(&self, event: StatusEvent);
}

/// Discards every event.
pub struct NoopStatus;

#[async_trait]
impl StatusCallback for NoopStatus {
    async fn on_status(&self, _event: StatusEvent) {}
}

/// Logs every event through `tracing`.
pub struct TracingStatus;

#[async_trait]
impl StatusCallback for TracingStatus {
    async fn on_status(&self, event: StatusEvent) {
        let target = event.data.target.as_deref().unwrap_or("unnamed");
        info!(
            target_group = target,
            step = %event.step,
            plugin = event.data.plugin.as_deref(),
            repo = event.data.repo.as_deref(),
            "{}",
            event.message
        );
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Default)]
pub struct StatusRecorder {
    events: Mutex<Vec<StatusEvent>>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn steps(&self) -> Vec<SyncStep> {
        self.events().into_iter().map(|event| event.step).collect()
    }
}

#[async_trait]
impl StatusCallback for StatusRecorder {
    async fn on_status(&self, event: StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_are_kebab_case() {
        assert_eq!(SyncStep::GlobalStart.to_string(), "global-start");
        assert_eq!(SyncStep::RunOnRepoComplete.to_string(), "run-on-repo-complete");
        assert_eq!(SyncStep::Plugin("upload".into()).to_string(), "upload");
        assert_eq!(
            serde_json::to_string(&SyncStep::ReposDone).unwrap(),
            "\"repos-done\""
        );
    }

    #[test]
    fn status_data_skips_empty_fields() {
        let data = StatusData::default().with_plugin("env").with_count(2);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            serde_json::json!({ "plugin": "env", "count": 2 })
        );
    }

    #[tokio::test]
    async fn recorder_keeps_arrival_order() {
        let recorder = StatusRecorder::new();
        recorder
            .on_status(StatusEvent::new(
                SyncStep::GlobalStart,
                "start",
                StatusData::default(),
            ))
            .await;
        recorder
            .on_status(StatusEvent::new(
                SyncStep::GlobalDone,
                "done",
                StatusData::default(),
            ))
            .await;
        assert_eq!(recorder.steps(), vec![
            SyncStep::GlobalStart,
            SyncStep::GlobalDone
        ]);
    }
}
