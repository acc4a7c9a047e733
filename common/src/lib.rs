// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a task by the remote API.
pub type TaskId = i64;

#[allow(clippy::doc_overindented_list_items)]
/// Represents a task as returned by the remote API.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: Allows conversion to/from JSON. Field names follow the
///    remote API (`desc`, `estimateAt`, `doneAt`).
/// - `Debug`: Enables displaying the structure for debugging (e.g., `println!("{:?}", task)`).
/// - `Clone`, `PartialEq`: Visible tasks are copies of the loaded ones and are compared in tests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,

    #[serde(rename = "desc")]
    pub description: String,

    // The point in time the task is planned for.
    #[serde(rename = "estimateAt")]
    pub estimated_at: DateTime<Utc>,

    // Absent means pending. The server sets it when the task is toggled.
    #[serde(rename = "doneAt", default)]
    pub done_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Returns true when the task has been completed.
    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }
}

/// Body of the task creation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewTaskPayload {
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(rename = "estimateAt")]
    pub estimated_at: DateTime<Utc>,
}

/// Body of the account creation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Body of the login request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SigninPayload {
    pub email: String,
    pub password: String,
}

/// What the remote API returns on a successful login.
/// The token must be sent back as a bearer credential on every task request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub name: String,
    pub email: String,
    pub token: String,
}
