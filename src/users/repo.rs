use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::dto::UpdateUser;
use crate::users::repo_types::User;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The email is already owned by another row.
    #[error("email already taken")]
    DuplicateEmail,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Unique constraint on `users.email`, see `migrations/0001_create_users.sql`.
const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

fn is_email_violation(unique_violation: bool, constraint: Option<&str>) -> bool {
    unique_violation && constraint == Some(EMAIL_UNIQUE_CONSTRAINT)
}

impl RepoError {
    fn classify(e: sqlx::Error) -> Self {
        let email_taken = matches!(
            &e,
            sqlx::Error::Database(db) if is_email_violation(db.is_unique_violation(), db.constraint())
        );
        if email_taken {
            RepoError::DuplicateEmail
        } else {
            RepoError::Database(e)
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence operations for users. Absence is `None`, never an error.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, email: &str, password: &str) -> RepoResult<User>;
    /// Applies the present fields, then re-reads the row. `None` if the id is gone.
    async fn update_user(&self, id: i32, changes: &UpdateUser) -> RepoResult<Option<User>>;
    /// Whether a row was actually removed.
    async fn delete_user(&self, id: i32) -> RepoResult<bool>;
    /// Most recently created first.
    async fn find_all_users(&self) -> RepoResult<Vec<User>>;
    async fn find_user_by_id(&self, id: i32) -> RepoResult<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, email: &str, password: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password)
            VALUES ($1, $2)
            RETURNING id, email, password, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password)
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::classify)
    }

    async fn update_user(&self, id: i32, changes: &UpdateUser) -> RepoResult<Option<User>> {
        sqlx::query(
            r#"
            UPDATE users
               SET email = COALESCE($2, email),
                   password = COALESCE($3, password),
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.password.as_deref())
        .execute(&self.db)
        .await
        .map_err(RepoError::classify)?;

        self.find_user_by_id(id).await
    }

    async fn delete_user(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_all_users(&self) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password, created_at, updated_at
            FROM users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_user_by_id(&self, id: i32) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}



// Run with: DATABASE_URL=postgres://... cargo test -- --ignored
#[cfg(test)]
mod pg_tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn create_then_lookup_by_email_and_id(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let created = repo.create_user("a@x.com", "pw1").await.unwrap();
        assert_eq!(created.email, "a@x.com");
        assert_eq!(created.created_at, created.updated_at);

        let by_email = repo.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email, created);
        let by_id = repo.find_user_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);
        assert!(repo.find_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_email_is_classified(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        repo.create_user("a@x.com", "pw1").await.unwrap();
        let err = repo.create_user("a@x.com", "pw2").await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateEmail));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn other_unique_violations_stay_database_errors(pool: PgPool) {
        sqlx::query("CREATE UNIQUE INDEX users_password_key ON users (password)")
            .execute(&pool)
            .await
            .unwrap();
        let repo = PgUserRepository::new(pool);
        repo.create_user("a@x.com", "same").await.unwrap();
        let err = repo.create_user("b@x.com", "same").await.unwrap_err();
        assert!(matches!(err, RepoError::Database(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn partial_update_keeps_absent_fields(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let user = repo.create_user("a@x.com", "pw1").await.unwrap();
        let changes = UpdateUser {
            email: None,
            password: Some("pw3".into()),
        };
        let updated = repo.update_user(user.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.password, "pw3");
        assert_eq!(updated.created_at, user.created_at);
        assert!(updated.updated_at >= user.updated_at);

        assert!(repo.update_user(user.id + 1000, &changes).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn delete_reports_whether_a_row_went_away(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let user = repo.create_user("a@x.com", "pw1").await.unwrap();
        assert!(repo.delete_user(user.id).await.unwrap());
        assert!(!repo.delete_user(user.id).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn find_all_lists_newest_first(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let first = repo.create_user("a@x.com", "pw").await.unwrap();
        let second = repo.create_user("b@x.com", "pw").await.unwrap();
        let ids: Vec<i32> = repo
            .find_all_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
