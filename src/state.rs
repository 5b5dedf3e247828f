use std::sync::Arc;

use crate::config::AppConfig;
use crate::db;
use crate::users::{PgUserRepository, UserService};

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
}

impl AppState {
    /// Composition root: pool → repository → service.
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        db::migrate(&pool).await;

        let repo = Arc::new(PgUserRepository::new(pool));
        Ok(Self::from_parts(UserService::new(repo)))
    }

    pub fn from_parts(users: UserService) -> Self {
        Self { users }
    }
}
