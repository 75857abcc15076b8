use crate::domain::models::UserProfile;
use crate::infrastructure::backend_client::OAuthGateway;
use crate::infrastructure::client_storage::{ClientStorage, StorageScope};
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const USER_ID_KEY: &str = "userId";
const USER_KEY: &str = "user";
const LOGIN_ERROR_KEY: &str = "loginError";

pub const MISSING_CODE_MESSAGE: &str = "Authorization code not found";
pub const BACKEND_FAILURE_MESSAGE: &str = "Could not process authentication. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: String,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AuthState {
    Authenticated(UserSession),
    Anonymous,
}

/// Explicit view over the persisted login entries. Every command asks it
/// once instead of reading storage keys on its own.
#[derive(Clone)]
pub struct SessionContext {
    storage: Arc<dyn ClientStorage>,
}

impl SessionContext {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    pub fn check_authentication(&self) -> Result<AuthState, InfraError> {
        let user_id = self
            .storage
            .get_item(StorageScope::Local, USER_ID_KEY)?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let Some(user_id) = user_id else {
            return Ok(AuthState::Anonymous);
        };

        let profile = match self.storage.get_item(StorageScope::Local, USER_KEY)? {
            Some(raw) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => Some(profile),
                Err(error) => {
                    warn!(%error, "stored user profile is unreadable");
                    None
                }
            },
            None => None,
        };
        Ok(AuthState::Authenticated(UserSession { user_id, profile }))
    }

    pub fn require_user(&self) -> Result<UserSession, InfraError> {
        match self.check_authentication()? {
            AuthState::Authenticated(session) => Ok(session),
            AuthState::Anonymous => Err(InfraError::NotAuthenticated),
        }
    }

    pub fn sign_in(&self, user_id: &str, profile: &UserProfile) -> Result<UserSession, InfraError> {
        let payload = serde_json::to_string(profile)?;
        self.storage
            .set_item(StorageScope::Local, USER_ID_KEY, user_id)?;
        self.storage.set_item(StorageScope::Local, USER_KEY, &payload)?;
        Ok(UserSession {
            user_id: user_id.to_string(),
            profile: Some(profile.clone()),
        })
    }

    pub fn sign_out(&self) -> Result<(), InfraError> {
        self.storage.remove_item(StorageScope::Local, USER_ID_KEY)?;
        self.storage.remove_item(StorageScope::Local, USER_KEY)?;
        Ok(())
    }

    pub fn record_login_error(&self, message: &str) -> Result<(), InfraError> {
        self.storage
            .set_item(StorageScope::Session, LOGIN_ERROR_KEY, message)
    }

    pub fn take_login_error(&self) -> Result<Option<String>, InfraError> {
        self.storage.take_item(StorageScope::Session, LOGIN_ERROR_KEY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LoginStart {
    AlreadyAuthenticated {
        session: UserSession,
    },
    #[serde(rename_all = "camelCase")]
    Redirect {
        url: String,
        pending_error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LoginOutcome {
    SignedIn { session: UserSession },
    Failed { message: String },
}

pub struct LoginFlow<G>
where
    G: OAuthGateway,
{
    gateway: Arc<G>,
    session: SessionContext,
}

impl<G> LoginFlow<G>
where
    G: OAuthGateway,
{
    pub fn new(gateway: Arc<G>, session: SessionContext) -> Self {
        Self { gateway, session }
    }

    pub async fn begin(&self) -> Result<LoginStart, InfraError> {
        if let AuthState::Authenticated(session) = self.session.check_authentication()? {
            return Ok(LoginStart::AlreadyAuthenticated { session });
        }
        let pending_error = self.session.take_login_error()?;
        let url = self.gateway.login_url().await?;
        Ok(LoginStart::Redirect { url, pending_error })
    }

    /// Handles the provider redirect. Failures are stored as the one-shot
    /// login error and reported as `LoginOutcome::Failed`.
    pub async fn complete(
        &self,
        code: Option<&str>,
        provider_error: Option<&str>,
    ) -> Result<LoginOutcome, InfraError> {
        if let Some(provider_error) = provider_error.map(str::trim).filter(|value| !value.is_empty()) {
            return self.fail(format!("Authentication failed: {provider_error}"));
        }
        let Some(code) = code.map(str::trim).filter(|value| !value.is_empty()) else {
            return self.fail(MISSING_CODE_MESSAGE.to_string());
        };

        match self.gateway.exchange_code(code).await {
            Ok(callback) => {
                let session = self.session.sign_in(&callback.user_id, &callback.profile)?;
                info!(user_id = %session.user_id, "login completed");
                Ok(LoginOutcome::SignedIn { session })
            }
            Err(error) => {
                warn!(%error, "authorization code exchange failed");
                self.fail(BACKEND_FAILURE_MESSAGE.to_string())
            }
        }
    }

    fn fail(&self, message: String) -> Result<LoginOutcome, InfraError> {
        self.session.record_login_error(&message)?;
        Ok(LoginOutcome::Failed { message })
    }
}
