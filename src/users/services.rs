use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::users::dto::{CreateUser, UpdateUser};
use crate::users::repo::{RepoError, UserRepository};
use crate::users::repo_types::User;

/// What a failed lookup was keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKey {
    Id(i32),
    Email(String),
    /// The row vanished between the existence check and the delete.
    Deletion(i32),
}

impl fmt::Display for NotFoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundKey::Id(id) => write!(f, "User with ID {id} not found"),
            NotFoundKey::Email(email) => write!(f, "User with email {email} not found"),
            NotFoundKey::Deletion(id) => write!(f, "Failed to delete user with ID {id}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    NotFound(NotFoundKey),
    #[error("User with this email already exists")]
    Conflict,
    #[error(transparent)]
    Store(sqlx::Error),
}

impl From<RepoError> for UserError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateEmail => UserError::Conflict,
            RepoError::Database(e) => UserError::Store(e),
        }
    }
}

pub type UserResult<T> = Result<T, UserError>;

/// Business rules over a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, dto), fields(email = %dto.email))]
    pub async fn create(&self, dto: CreateUser) -> UserResult<User> {
        if self.repo.find_by_email(&dto.email).await?.is_some() {
            warn!("email already registered");
            return Err(UserError::Conflict);
        }

        // The unique constraint catches a concurrent create of the same email.
        let user = self.repo.create_user(&dto.email, &dto.password).await?;
        info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub async fn find_all(&self) -> UserResult<Vec<User>> {
        let users = self.repo.find_all_users().await?;
        debug!(count = users.len(), "users listed");
        Ok(users)
    }

    pub async fn find_one(&self, id: i32) -> UserResult<User> {
        match self.repo.find_user_by_id(id).await? {
            Some(user) => Ok(user),
            None => {
                debug!(user_id = id, "user not found");
                Err(UserError::NotFound(NotFoundKey::Id(id)))
            }
        }
    }

    pub async fn find_by_email(&self, email: &str) -> UserResult<User> {
        self.repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| UserError::NotFound(NotFoundKey::Email(email.to_string())))
    }

    #[instrument(skip(self, dto))]
    pub async fn update(&self, id: i32, dto: UpdateUser) -> UserResult<User> {
        let current = self.find_one(id).await?;
        if dto.is_empty() {
            debug!(user_id = id, "empty update, only updated_at changes");
        }

        if let Some(email) = dto.changed_email(&current.email) {
            if self.repo.find_by_email(email).await?.is_some() {
                warn!(email, "email already registered");
                return Err(UserError::Conflict);
            }
        }

        match self.repo.update_user(id, &dto).await? {
            Some(user) => {
                info!(user_id = id, "user updated");
                Ok(user)
            }
            None => {
                warn!(user_id = id, "user disappeared during update");
                Err(UserError::NotFound(NotFoundKey::Id(id)))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> UserResult<()> {
        self.find_one(id).await?;

        if !self.repo.delete_user(id).await? {
            warn!(user_id = id, "user disappeared before delete");
            return Err(UserError::NotFound(NotFoundKey::Deletion(id)));
        }
        info!(user_id = id, "user removed");
        Ok(())
    }
}
