// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
pub mod auth;
pub mod config;
pub mod error;
pub mod horizon;
pub mod preferences;
pub mod service;
pub mod task_list;

pub use error::{ClientError, PersistenceError, ServiceError, ValidationError};
pub use horizon::Horizon;
pub use preferences::{MemoryPreferenceStore, PreferenceStore, SqlitePreferenceStore};
pub use service::{HttpTaskService, TaskService};
pub use task_list::{Phase, PreferenceScope, SessionGuard, TaskListState};
