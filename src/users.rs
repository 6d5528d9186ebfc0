// Dashboard user registry

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::storage::UserStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Developer,
    Admin,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Developer => "developer",
            UserRole::Admin => "admin",
            UserRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "developer" => Ok(UserRole::Developer),
            "admin" => Ok(UserRole::Admin),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(format!("unknown user role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl UserRecord {
    /// A new account; its last login starts at creation time
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role,
            created_at: now,
            last_login: now,
        }
    }
}

/// Validates and forwards user operations to the store
#[derive(Clone)]
pub struct UserRegistry {
    store: Arc<dyn UserStore>,
}

impl UserRegistry {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn add_user(
        &self,
        user_id: &str,
        email: &str,
        role: UserRole,
    ) -> Result<UserRecord, ServiceError> {
        let user_id = user_id.trim();
        let email = email.trim();
        if user_id.is_empty() || email.is_empty() {
            return Err(ServiceError::Validation(
                "User ID and Email are required.".to_string(),
            ));
        }

        let record = UserRecord::new(user_id, email, role);
        self.store.insert_user(record.clone()).await?;
        tracing::info!(user_id = %record.user_id, role = %role, "Added user");
        Ok(record)
    }

    /// Every registered user, oldest first
    pub async fn users(&self) -> Result<Vec<UserRecord>, ServiceError> {
        Ok(self.store.list_users().await?)
    }
}
