use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ApiClient, ClientError, ClientResult};
use crate::auth::dto::{
    AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest,
};
use crate::auth::repo_types::Profile;
use crate::tasks::dto::{CreateTaskRequest, TaskQuery, TaskStats, TaskView, UpdateTaskRequest};

/// Where the UI should go after a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Login,
}

/// Signed-in user and the bearer token that goes with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user: PublicUser,
    pub token: String,
}

impl From<AuthResponse> for Identity {
    fn from(resp: AuthResponse) -> Self {
        Self {
            user: resp.user,
            token: resp.token,
        }
    }
}

/// Owns the current identity. Every authenticated call goes through here so
/// the token is attached in one place.
#[derive(Debug)]
pub struct Session {
    api: ApiClient,
    identity: Option<Identity>,
    storage: Option<PathBuf>,
}

impl Session {
    /// Session that keeps its identity in memory only.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            identity: None,
            storage: None,
        }
    }

    /// Session persisted at `path`. A stored identity is picked up if the
    /// file parses; an unreadable file is removed and the session starts
    /// signed out.
    pub async fn restore(api: ApiClient, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let identity = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Identity>(&bytes) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding unreadable session");
                    let _ = tokio::fs::remove_file(&path).await;
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            api,
            identity,
            storage: Some(path),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn user(&self) -> Option<&PublicUser> {
        self.identity.as_ref().map(|i| &i.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Route a freshly mounted UI should show.
    pub fn landing(&self) -> Route {
        if self.is_authenticated() {
            Route::Dashboard
        } else {
            Route::Login
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<Route> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.api.login(&req).await?;
        self.set_identity(resp.into()).await?;
        Ok(Route::Dashboard)
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> ClientResult<Route> {
        let req = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.api.register(&req).await?;
        self.set_identity(resp.into()).await?;
        Ok(Route::Dashboard)
    }

    pub async fn logout(&mut self) -> ClientResult<Route> {
        self.identity = None;
        if let Some(path) = &self.storage {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!("session cleared");
        Ok(Route::Login)
    }

    async fn set_identity(&mut self, identity: Identity) -> ClientResult<()> {
        if let Some(path) = &self.storage {
            tokio::fs::write(path, serde_json::to_vec(&identity)?).await?;
        }
        debug!(user_id = %identity.user.id, "session stored");
        self.identity = Some(identity);
        Ok(())
    }

    fn token(&self) -> ClientResult<&str> {
        self.identity
            .as_ref()
            .map(|i| i.token.as_str())
            .ok_or(ClientError::NotLoggedIn)
    }

    pub async fn profile(&self) -> ClientResult<Profile> {
        self.api.profile(self.token()?).await
    }

    /// Sends the edit and swaps in the returned user and token.
    pub async fn update_profile(&mut self, req: &UpdateProfileRequest) -> ClientResult<PublicUser> {
        let resp = self.api.update_profile(self.token()?, req).await?;
        let identity = Identity::from(resp);
        let user = identity.user.clone();
        self.set_identity(identity).await?;
        Ok(user)
    }

    pub async fn tasks(&self, query: &TaskQuery) -> ClientResult<Vec<TaskView>> {
        self.api.list_tasks(self.token()?, query).await
    }

    pub async fn task(&self, id: Uuid) -> ClientResult<TaskView> {
        self.api.get_task(self.token()?, id).await
    }

    pub async fn create_task(&self, req: &CreateTaskRequest) -> ClientResult<TaskView> {
        self.api.create_task(self.token()?, req).await
    }

    pub async fn update_task(&self, id: Uuid, req: &UpdateTaskRequest) -> ClientResult<TaskView> {
        self.api.update_task(self.token()?, id, req).await
    }

    pub async fn delete_task(&self, id: Uuid) -> ClientResult<String> {
        self.api.delete_task(self.token()?, id).await
    }

    pub async fn stats(&self) -> ClientResult<TaskStats> {
        self.api.stats(self.token()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens here; tests only pass if no request is made.
    fn offline_api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9")
    }

    fn identity() -> Identity {
        Identity {
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
                avatar: "https://ui-avatars.com/api/?name=Ada".into(),
            },
            token: "tok".into(),
        }
    }

    #[tokio::test]
    async fn signed_out_calls_fail_without_network() {
        let session = Session::new(offline_api());
        assert_eq!(session.landing(), Route::Login);
        assert!(matches!(session.stats().await, Err(ClientError::NotLoggedIn)));
        assert!(matches!(
            session.tasks(&TaskQuery::default()).await,
            Err(ClientError::NotLoggedIn)
        ));
        assert!(matches!(session.profile().await, Err(ClientError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn restore_picks_up_stored_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let stored = identity();
        std::fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();

        let session = Session::restore(offline_api(), &path).await;
        assert_eq!(session.identity(), Some(&stored));
        assert_eq!(session.landing(), Route::Dashboard);
    }

    #[tokio::test]
    async fn restore_discards_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let session = Session::restore(offline_api(), &path).await;
        assert!(!session.is_authenticated());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn restore_without_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::restore(offline_api(), dir.path().join("missing.json")).await;
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn logout_clears_identity_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, serde_json::to_vec(&identity()).unwrap()).unwrap();

        let mut session = Session::restore(offline_api(), &path).await;
        assert_eq!(session.logout().await.unwrap(), Route::Login);
        assert!(!session.is_authenticated());
        assert!(!path.exists());
        assert!(matches!(session.stats().await, Err(ClientError::NotLoggedIn)));
    }
}
