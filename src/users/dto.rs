use serde::Deserialize;

/// Request body for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }

    /// The new email, if one is given and it differs from `current`.
    pub fn changed_email(&self, current: &str) -> Option<&str> {
        self.email.as_deref().filter(|e| *e != current)
    }
}
