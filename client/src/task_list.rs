// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use common::{Task, TaskId};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ServiceError, ValidationError};
use crate::horizon::Horizon;
use crate::preferences::PreferenceStore;
use crate::service::TaskService;

/// Storage key of the "show done tasks" preference.
pub const PREFERENCE_KEY: &str = "tasksState";

/// Whether the preference is shared by every horizon or kept per horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreferenceScope {
    Shared,
    #[default]
    PerHorizon,
}

impl PreferenceScope {
    pub fn key_for(&self, horizon: Horizon) -> String {
        match self {
            Self::Shared => PREFERENCE_KEY.to_string(),
            Self::PerHorizon => format!("{}:{}", PREFERENCE_KEY, horizon.key()),
        }
    }
}

// Stored as JSON so that more fields can be added without a new key.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StoredPreference {
    show_done_tasks: bool,
}

/// The subset of `tasks` shown to the user, in load order.
/// With `show_done_tasks` off, only pending tasks are kept.
pub fn visible_tasks(tasks: &[Task], show_done_tasks: bool) -> Vec<Task> {
    if show_done_tasks {
        tasks.to_vec()
    } else {
        tasks.iter().filter(|task| !task.is_done()).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Error,
}

/// Cloneable handle used to end a session while one of its requests is in flight.
/// Responses that arrive after `teardown` are dropped instead of applied.
#[derive(Debug, Clone, Default)]
pub struct SessionGuard {
    torn_down: Arc<AtomicBool>,
}

impl SessionGuard {
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

/// One task list session, bound to a single horizon.
///
/// The server is the source of truth: every mutation is sent to the
/// [`TaskService`] and followed by a full reload. Nothing is changed locally
/// ahead of the server's answer.
///
/// Operations take `&mut self`, so a session cannot run two of them at once.
pub struct TaskListState {
    horizon: Horizon,
    preference_key: String,
    service: Arc<dyn TaskService>,
    preferences: Arc<dyn PreferenceStore>,
    tasks: Vec<Task>,
    visible: Vec<Task>,
    show_done_tasks: bool,
    phase: Phase,
    guard: SessionGuard,
    pending_write: Option<JoinHandle<()>>,
}

impl TaskListState {
    pub fn new(
        horizon: Horizon,
        scope: PreferenceScope,
        service: Arc<dyn TaskService>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            horizon,
            preference_key: scope.key_for(horizon),
            service,
            preferences,
            tasks: Vec::new(),
            visible: Vec::new(),
            show_done_tasks: true,
            phase: Phase::Uninitialized,
            guard: SessionGuard::default(),
            pending_write: None,
        }
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn visible_tasks(&self) -> &[Task] {
        &self.visible
    }

    pub fn show_done_tasks(&self) -> bool {
        self.show_done_tasks
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn guard(&self) -> SessionGuard {
        self.guard.clone()
    }

    /// Applies the stored preference, then loads the tasks of the horizon.
    /// The preference is in effect before the remote load starts.
    pub async fn initialize(&mut self) -> Result<(), ClientError> {
        self.restore_preference().await;
        self.reload().await
    }

    /// Applies the stored preference without contacting the server.
    pub async fn restore_preference(&mut self) {
        self.show_done_tasks = self.load_preference().await;
        self.refilter();
        debug!(
            "Session for '{}' starts with show_done_tasks={}",
            self.horizon.key(),
            self.show_done_tasks
        );
    }

    /// Replaces the task list with what the server holds for this horizon.
    /// On failure the current tasks are kept.
    pub async fn reload(&mut self) -> Result<(), ClientError> {
        let previous = self.phase;
        self.reload_or_restore(previous).await
    }

    // `previous` is the phase put back when the session is torn down mid-request.
    async fn reload_or_restore(&mut self, previous: Phase) -> Result<(), ClientError> {
        let Some(max_date) = self.horizon.max_date(&Local::now()) else {
            warn!(
                "Horizon of {} days is out of range.",
                self.horizon.days_ahead()
            );
            self.phase = Phase::Error;
            return Err(ValidationError::HorizonOutOfRange(self.horizon.days_ahead()).into());
        };
        self.phase = Phase::Loading;

        let result = self.service.list_tasks(max_date).await;
        if self.guard.is_torn_down() {
            debug!("Session torn down, discarding task list response.");
            self.phase = previous;
            return Ok(());
        }

        match result {
            Ok(tasks) => {
                info!(
                    "Loaded {} tasks for '{}'.",
                    tasks.len(),
                    self.horizon.key()
                );
                self.tasks = tasks;
                self.refilter();
                self.phase = Phase::Ready;
                Ok(())
            }
            Err(err) => {
                warn!("Failed to load tasks: {}", err);
                self.phase = Phase::Error;
                Err(err.into())
            }
        }
    }

    /// Changes the preference and recomputes the visible tasks right away.
    /// Persisting runs in the background; a failure there is only logged.
    pub fn set_filter(&mut self, show_done_tasks: bool) {
        self.show_done_tasks = show_done_tasks;
        self.refilter();
        self.persist_preference();
    }

    pub fn toggle_filter(&mut self) {
        self.set_filter(!self.show_done_tasks);
    }

    /// Waits for the last preference write to finish.
    pub async fn settle(&mut self) {
        if let Some(write) = self.pending_write.take() {
            if let Err(e) = write.await {
                warn!("Preference write task failed: {}", e);
            }
        }
    }

    pub async fn add(
        &mut self,
        description: &str,
        estimated_at: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let description = description.trim();
        if description.is_empty() {
            warn!("Validation failed: task description is empty.");
            return Err(ValidationError::EmptyDescription.into());
        }

        let previous = std::mem::replace(&mut self.phase, Phase::Loading);
        let result = self.service.create_task(description, estimated_at).await;
        self.after_mutation(result, "create", previous).await
    }

    /// Asks the server to flip the task's completion. The new `done_at`
    /// becomes visible only through the reload that follows.
    pub async fn toggle(&mut self, id: TaskId) -> Result<(), ClientError> {
        let previous = std::mem::replace(&mut self.phase, Phase::Loading);
        let result = self.service.toggle_task(id).await;
        self.after_mutation(result, "toggle", previous).await
    }

    pub async fn remove(&mut self, id: TaskId) -> Result<(), ClientError> {
        let previous = std::mem::replace(&mut self.phase, Phase::Loading);
        let result = self.service.delete_task(id).await;
        self.after_mutation(result, "delete", previous).await
    }

    async fn after_mutation(
        &mut self,
        result: Result<(), ServiceError>,
        action: &str,
        previous: Phase,
    ) -> Result<(), ClientError> {
        if self.guard.is_torn_down() {
            debug!("Session torn down, skipping reload after {}.", action);
            self.phase = previous;
            return Ok(());
        }

        match result {
            Ok(()) => {
                debug!("Task {} accepted by the server, reloading.", action);
                self.reload_or_restore(previous).await
            }
            Err(err) => {
                warn!("Task {} failed: {}", action, err);
                self.phase = Phase::Error;
                Err(err.into())
            }
        }
    }

    fn refilter(&mut self) {
        self.visible = visible_tasks(&self.tasks, self.show_done_tasks);
    }

    async fn load_preference(&self) -> bool {
        let raw = match self.preferences.get(&self.preference_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return true,
            Err(e) => {
                warn!("Could not read preference '{}': {}", self.preference_key, e);
                return true;
            }
        };

        match serde_json::from_str::<StoredPreference>(&raw) {
            Ok(stored) => stored.show_done_tasks,
            Err(e) => {
                warn!(
                    "Ignoring malformed preference '{}': {}",
                    self.preference_key, e
                );
                true
            }
        }
    }

    fn persist_preference(&mut self) {
        let stored = StoredPreference {
            show_done_tasks: self.show_done_tasks,
        };
        let value = match serde_json::to_string(&stored) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not encode preference: {}", e);
                return;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime available, preference not persisted.");
            return;
        };

        let store = Arc::clone(&self.preferences);
        let key = self.preference_key.clone();
        // Chain on the previous write so the stored value is always the latest one.
        let previous = self.pending_write.take();
        self.pending_write = Some(runtime.spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!("Previous preference write task failed: {}", e);
                }
            }
            if let Err(e) = store.set(&key, &value).await {
                warn!("Could not persist preference '{}': {}", key, e);
            }
        }));
    }
}
