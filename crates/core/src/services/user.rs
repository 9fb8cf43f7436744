//! User accounts and authentication.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::user::{self, Plan, SubscriptionStatus},
    repositories::UserRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for creating a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 1, max = 32), custom(function = "validate_username"))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 128))]
    pub name: Option<String>,
}

/// Credentials for signing in.
#[derive(Debug, Deserialize)]
pub struct SigninInput {
    pub username: String,
    pub password: String,
}

fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("username_charset"))
    }
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account and issue its first token.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            name: Set(input.name),
            password_hash: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            is_admin: Set(false),
            is_banned: Set(false),
            plan: Set(Plan::Free),
            billing_customer_id: Set(None),
            subscription_id: Set(None),
            subscription_status: Set(SubscriptionStatus::None),
            plan_renews_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

        Ok(user)
    }

    /// Authenticate by username and password, returning the user with a token.
    pub async fn signin(&self, input: SigninInput) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if user.is_banned {
            return Err(AppError::Forbidden("Account is banned".to_string()));
        }

        if user.token.is_some() {
            return Ok(user);
        }

        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token));
        self.user_repo.update(active).await
    }

    /// Invalidate the current token by rotating it.
    pub async fn signout(&self, user_id: &str) -> AppResult<()> {
        self.regenerate_token(user_id).await?;
        Ok(())
    }

    /// Authenticate a user by bearer token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.is_banned {
            return Err(AppError::Forbidden("Account is banned".to_string()));
        }

        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Regenerate a user's authentication token.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::plan::tests::test_user;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_username_charset() {
        assert!(validate_username("gala_host_2026").is_ok());
        assert!(validate_username("bad name").is_err());
    }

    #[tokio::test]
    async fn test_signup_rejects_short_password() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let result = svc
            .signup(SignupInput {
                username: "alice".to_string(),
                password: "short".to_string(),
                email: None,
                name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_signup_username_taken() {
        let existing = test_user("alice", Plan::Free);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = svc
            .signup(SignupInput {
                username: "Alice".to_string(),
                password: "long enough".to_string(),
                email: None,
                name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_signin_wrong_password() {
        let mut user = test_user("alice", Plan::Free);
        user.password_hash = hash_password("the right one").unwrap();
        let svc =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = svc
            .signin(SigninInput {
                username: "alice".to_string(),
                password: "the wrong one".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_banned_token_is_forbidden() {
        let mut user = test_user("alice", Plan::Free);
        user.is_banned = true;
        let svc =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = svc.authenticate_by_token("token-alice").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = svc.authenticate_by_token("nope").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
