use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{NewUser, Profile, UserChanges},
        validation::{self, avatar_url},
    },
    error::{AppError, AppResult, StoreError},
};

pub const USER_EXISTS: &str = "User already exists with this email";
pub const EMAIL_TAKEN: &str = "Email already in use by another account";
/// Shared by unknown-email and wrong-password so neither case is revealed.
pub const BAD_CREDENTIALS: &str = "Invalid email or password";

fn conflict_as(e: StoreError, message: &str) -> AppError {
    match e {
        StoreError::Duplicate(_) => AppError::Conflict(message.into()),
        other => other.into(),
    }
}

pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> AppResult<(PublicUser, String)> {
    let reg = validation::registration(req)?;

    if users.find_by_email(&reg.email).await?.is_some() {
        warn!(email = %reg.email, "email already registered");
        return Err(AppError::Conflict(USER_EXISTS.into()));
    }

    let password_hash = hash_password(&reg.password)?;
    let user = users
        .create(NewUser {
            avatar: avatar_url(&reg.name),
            name: reg.name,
            email: reg.email,
            password_hash,
        })
        .await
        .map_err(|e| conflict_as(e, USER_EXISTS))?;

    let token = keys.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user.into(), token))
}

pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<(PublicUser, String)> {
    let creds = validation::credentials(req)?;

    let Some(user) = users.find_by_email(&creds.email).await? else {
        warn!(email = %creds.email, "login unknown email");
        return Err(AppError::Unauthenticated(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&creds.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated(BAD_CREDENTIALS.into()));
    }

    let token = keys.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((user.into(), token))
}

pub async fn profile(users: &dyn UserStore, user_id: Uuid) -> AppResult<Profile> {
    users
        .find_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Applies profile edits and hands back a fresh token. Tokens issued before
/// a password change stay valid until they expire.
pub async fn update_profile(
    users: &dyn UserStore,
    keys: &JwtKeys,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<(PublicUser, String)> {
    let edit = validation::profile_edit(req)?;

    let current = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut changes = UserChanges::default();

    if let Some(email) = edit.email.filter(|e| *e != current.email) {
        if let Some(other) = users.find_by_email(&email).await? {
            if other.id != user_id {
                warn!(%user_id, email = %email, "profile email already taken");
                return Err(AppError::Conflict(EMAIL_TAKEN.into()));
            }
        }
        changes.email = Some(email);
    }

    if let Some(name) = edit.name.filter(|n| *n != current.name) {
        changes.avatar = Some(avatar_url(&name));
        changes.name = Some(name);
    }

    if let Some(password) = edit.password {
        changes.password_hash = Some(hash_password(&password)?);
    }

    let updated = users
        .update(user_id, changes)
        .await
        .map_err(|e| conflict_as(e, EMAIL_TAKEN))?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let token = keys.issue(updated.id)?;
    info!(user_id = %updated.id, email = %updated.email, "profile updated");
    Ok((updated.into(), token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, memory::MemoryUserStore};

    fn keys() -> JwtKeys {
        JwtKeys::new(&AppConfig::for_tests().jwt)
    }

    fn reg(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_issues_token_for_new_user() {
        let users = MemoryUserStore::default();
        let keys = keys();
        let (user, token) = register(&users, &keys, reg("Ada", "ada@example.com", "engine1"))
            .await
            .unwrap();
        assert_eq!(keys.verify(&token), Ok(user.id));
        assert!(user.avatar.contains("name=Ada"));

        let stored = users.find_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "engine1");
    }

    #[tokio::test]
    async fn register_with_used_email_conflicts_whatever_else_differs() {
        let users = MemoryUserStore::default();
        let keys = keys();
        register(&users, &keys, reg("Ada", "ada@example.com", "engine1"))
            .await
            .unwrap();
        let err = register(&users, &keys, reg("Someone Else", "ADA@example.com ", "other99"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == USER_EXISTS));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let users = MemoryUserStore::default();
        let keys = keys();
        register(&users, &keys, reg("Ada", "ada@example.com", "engine1"))
            .await
            .unwrap();

        let wrong_pw = login(&users, &keys, login_req("ada@example.com", "engine2"))
            .await
            .unwrap_err();
        let no_user = login(&users, &keys, login_req("nobody@example.com", "engine1"))
            .await
            .unwrap_err();
        assert_eq!(wrong_pw.status(), no_user.status());
        assert_eq!(wrong_pw.to_string(), BAD_CREDENTIALS);
        assert_eq!(no_user.to_string(), BAD_CREDENTIALS);
    }

    #[tokio::test]
    async fn login_succeeds_with_normalized_email() {
        let users = MemoryUserStore::default();
        let keys = keys();
        let (registered, _) = register(&users, &keys, reg("Ada", "ada@example.com", "engine1"))
            .await
            .unwrap();
        let (user, token) = login(&users, &keys, login_req("  ADA@example.com", "engine1"))
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);
        assert_eq!(keys.verify(&token), Ok(registered.id));
    }

    #[tokio::test]
    async fn profile_update_changes_name_avatar_and_password() {
        let users = MemoryUserStore::default();
        let keys = keys();
        let (user, _) = register(&users, &keys, reg("Ada", "ada@example.com", "engine1"))
            .await
            .unwrap();

        let (updated, token) = update_profile(
            &users,
            &keys,
            user.id,
            UpdateProfileRequest {
                name: Some("Ada King".into()),
                password: Some("analytical".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Ada King");
        assert_ne!(updated.avatar, user.avatar);
        assert_eq!(keys.verify(&token), Ok(user.id));

        assert!(login(&users, &keys, login_req("ada@example.com", "engine1"))
            .await
            .is_err());
        assert!(login(&users, &keys, login_req("ada@example.com", "analytical"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn profile_update_keeps_avatar_when_name_unchanged() {
        let users = MemoryUserStore::default();
        let keys = keys();
        let (user, _) = register(&users, &keys, reg("Ada", "ada@example.com", "engine1"))
            .await
            .unwrap();
        let (updated, _) = update_profile(
            &users,
            &keys,
            user.id,
            UpdateProfileRequest {
                name: Some(" Ada ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.avatar, user.avatar);
    }

    #[tokio::test]
    async fn profile_update_rejects_taken_email() {
        let users = MemoryUserStore::default();
        let keys = keys();
        let (ada, _) = register(&users, &keys, reg("Ada", "ada@example.com", "engine1"))
            .await
            .unwrap();
        register(&users, &keys, reg("Bob", "bob@example.com", "builder1"))
            .await
            .unwrap();

        let err = update_profile(
            &users,
            &keys,
            ada.id,
            UpdateProfileRequest {
                email: Some("bob@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == EMAIL_TAKEN));

        let (same, _) = update_profile(
            &users,
            &keys,
            ada.id,
            UpdateProfileRequest {
                email: Some("ADA@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(same.email, "ada@example.com");
    }

    #[tokio::test]
    async fn profile_of_missing_user_is_not_found() {
        let users = MemoryUserStore::default();
        let err = profile(&users, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
