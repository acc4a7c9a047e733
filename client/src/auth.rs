// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use common::{SigninPayload, SignupPayload, UserData};
use tracing::{debug, info, warn};

use crate::error::{ClientError, PersistenceError, ValidationError};
use crate::preferences::PreferenceStore;
use crate::service::TaskService;

/// Storage key of the signed-in user's data.
pub const USER_DATA_KEY: &str = "userData";

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    SignIn,
    SignUp,
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The account was created; the user still has to sign in.
    Registered,
    /// `session_saved` is false when the user data could not be stored,
    /// so the next run will not find the session.
    SignedIn { user: UserData, session_saved: bool },
}

/// The sign-in / sign-up form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub stage: Stage,
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl AuthForm {
    pub fn sign_in(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn sign_up(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            stage: Stage::SignUp,
            name: name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Switches between "sign in" and "create account".
    pub fn toggle_stage(&mut self) {
        self.stage = match self.stage {
            Stage::SignIn => Stage::SignUp,
            Stage::SignUp => Stage::SignIn,
        };
    }

    /// Returns the first rule the form breaks, if any.
    /// Name and confirmation are only checked when creating an account.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        if self.stage == Stage::SignUp {
            if self.name.trim().chars().count() < MIN_NAME_LEN {
                return Err(ValidationError::NameTooShort);
            }
            if self.confirm_password != self.password {
                return Err(ValidationError::PasswordMismatch);
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validates the form, then signs in or creates the account.
    ///
    /// After a sign-up the form is reset to an empty sign-in form.
    /// After a sign-in the user data is stored under [`USER_DATA_KEY`]; a failure
    /// to store it is logged and does not fail the sign-in.
    pub async fn submit(
        &mut self,
        service: &dyn TaskService,
        store: &dyn PreferenceStore,
    ) -> Result<AuthOutcome, ClientError> {
        self.validate()?;

        match self.stage {
            Stage::SignUp => {
                let payload = SignupPayload {
                    name: self.name.clone(),
                    email: self.email.clone(),
                    password: self.password.clone(),
                    confirm_password: self.confirm_password.clone(),
                };
                service.signup(&payload).await?;
                info!("User {} registered.", payload.email);
                *self = Self::default();
                Ok(AuthOutcome::Registered)
            }
            Stage::SignIn => {
                let payload = SigninPayload {
                    email: self.email.clone(),
                    password: self.password.clone(),
                };
                let user = service.signin(&payload).await?;
                let session_saved = match store_user(store, &user).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Could not store user data: {}", e);
                        false
                    }
                };
                Ok(AuthOutcome::SignedIn {
                    user,
                    session_saved,
                })
            }
        }
    }
}

async fn store_user(store: &dyn PreferenceStore, user: &UserData) -> Result<(), PersistenceError> {
    let value = serde_json::to_string(user).map_err(anyhow::Error::from)?;
    store.set(USER_DATA_KEY, &value).await
}

/// Reads back the user stored by the last sign-in.
/// Absent or unreadable data means there is no session.
pub async fn restore_session(store: &dyn PreferenceStore) -> Option<UserData> {
    let raw = match store.get(USER_DATA_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Could not read user data: {}", e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Ignoring malformed user data: {}", e);
            None
        }
    }
}

/// Forgets the stored user.
pub async fn clear_session(store: &dyn PreferenceStore) -> Result<(), PersistenceError> {
    debug!("Clearing stored user data.");
    store.remove(USER_DATA_KEY).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::preferences::MemoryPreferenceStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use common::{Task, TaskId};
    use parking_lot::Mutex;

    /// Records the account requests it receives.
    #[derive(Default)]
    struct FakeAuthService {
        signups: Mutex<Vec<SignupPayload>>,
        signins: Mutex<Vec<SigninPayload>>,
        reject: bool,
    }

    impl FakeAuthService {
        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Default::default()
            }
        }

        fn check(&self) -> Result<(), ServiceError> {
            if self.reject {
                Err(ServiceError::Rejected {
                    status: 400,
                    message: "Invalid credentials".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TaskService for FakeAuthService {
        async fn list_tasks(&self, _max_date: DateTime<Utc>) -> Result<Vec<Task>, ServiceError> {
            Ok(Vec::new())
        }

        async fn create_task(&self, _d: &str, _at: DateTime<Utc>) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn toggle_task(&self, _id: TaskId) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn delete_task(&self, _id: TaskId) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn signup(&self, payload: &SignupPayload) -> Result<(), ServiceError> {
            self.signups.lock().push(payload.clone());
            self.check()
        }

        async fn signin(&self, payload: &SigninPayload) -> Result<UserData, ServiceError> {
            self.signins.lock().push(payload.clone());
            self.check()?;
            Ok(UserData {
                name: "Ana".to_string(),
                email: payload.email.clone(),
                token: "jwt-token".to_string(),
            })
        }
    }

    /// Rejects every write.
    struct ReadOnlyStore;

    #[async_trait]
    impl PreferenceStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(anyhow::anyhow!("read-only database").into())
        }

        async fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
            Err(anyhow::anyhow!("read-only database").into())
        }
    }

    #[test]
    fn test_validate_sign_in() {
        assert_eq!(
            AuthForm::sign_in("ana.example.com", "secret1").validate(),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            AuthForm::sign_in("ana@example.com", "12345").validate(),
            Err(ValidationError::PasswordTooShort)
        );
        assert!(AuthForm::sign_in("ana@example.com", "123456").is_valid());
    }

    #[test]
    fn test_sign_in_ignores_name_and_confirmation() {
        let mut form = AuthForm::sign_up("", "ana@example.com", "secret1", "other");
        form.toggle_stage();
        assert_eq!(form.stage, Stage::SignIn);
        assert!(form.is_valid());
    }

    #[test]
    fn test_validate_sign_up() {
        assert_eq!(
            AuthForm::sign_up("  Al  ", "ana@example.com", "secret1", "secret1").validate(),
            Err(ValidationError::NameTooShort)
        );
        assert_eq!(
            AuthForm::sign_up("Ana", "ana@example.com", "secret1", "secret2").validate(),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(AuthForm::sign_up("Ana", "ana@example.com", "secret1", "secret1").is_valid());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_service() {
        let service = FakeAuthService::default();
        let store = MemoryPreferenceStore::new();
        let mut form = AuthForm::sign_in("nope", "123");

        let result = form.submit(&service, &store).await;

        assert!(matches!(
            result,
            Err(ClientError::Validation(ValidationError::InvalidEmail))
        ));
        assert!(service.signins.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_resets_form() {
        let service = FakeAuthService::default();
        let store = MemoryPreferenceStore::new();
        let mut form = AuthForm::sign_up("Ana", "ana@example.com", "secret1", "secret1");

        let outcome = form.submit(&service, &store).await.unwrap();

        assert_eq!(outcome, AuthOutcome::Registered);
        assert_eq!(form, AuthForm::default());
        let signups = service.signups.lock();
        assert_eq!(signups.len(), 1);
        assert_eq!(signups[0].confirm_password, "secret1");
    }

    #[tokio::test]
    async fn test_sign_in_stores_user_data() {
        let service = FakeAuthService::default();
        let store = MemoryPreferenceStore::new();
        let mut form = AuthForm::sign_in("ana@example.com", "secret1");

        let outcome = form.submit(&service, &store).await.unwrap();

        let AuthOutcome::SignedIn {
            user,
            session_saved,
        } = outcome
        else {
            panic!("expected a signed in outcome");
        };
        assert!(session_saved);
        assert_eq!(user.token, "jwt-token");
        assert_eq!(restore_session(&store).await, Some(user));

        clear_session(&store).await.unwrap();
        assert_eq!(restore_session(&store).await, None);
    }

    #[tokio::test]
    async fn test_sign_in_reports_unsaved_session() {
        let service = FakeAuthService::default();
        let mut form = AuthForm::sign_in("ana@example.com", "secret1");

        let outcome = form.submit(&service, &ReadOnlyStore).await.unwrap();

        assert!(matches!(
            outcome,
            AuthOutcome::SignedIn {
                session_saved: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rejected_sign_in_keeps_form() {
        let service = FakeAuthService::rejecting();
        let store = MemoryPreferenceStore::new();
        let mut form = AuthForm::sign_in("ana@example.com", "wrongpass");

        let err = form.submit(&service, &store).await.unwrap_err();

        assert_eq!(
            err.user_message(),
            "Something went wrong! Message: Invalid credentials"
        );
        assert_eq!(form.email, "ana@example.com");
        assert_eq!(restore_session(&store).await, None);
    }

    #[tokio::test]
    async fn test_restore_session_ignores_malformed_data() {
        let store = MemoryPreferenceStore::with_entries([(USER_DATA_KEY, "{")]);
        assert_eq!(restore_session(&store).await, None);
    }
}
