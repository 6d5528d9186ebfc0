// API key records and the key vault
//
// Users can park their own APIHub key through the chat widget; operators
// issue per-API keys from the dashboard.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::dashboard::catalog;
use crate::errors::ServiceError;
use crate::storage::ApiKeyStore;

/// Where users obtain a new key
pub const KEY_DASHBOARD_URL: &str = "https://www.apihub.digital/dashboard/getkey";

const ISSUED_KEY_LIFETIME_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Inactive,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(KeyStatus::Active),
            "inactive" => Ok(KeyStatus::Inactive),
            other => Err(format!("unknown key status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub user_id: String,
    /// Bound API for operator-issued keys; None for user-saved keys
    pub api: Option<String>,
    pub api_key: String,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// A key the user saved for reference
    pub fn user_saved(user_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        Self {
            key_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            api: None,
            api_key: api_key.into(),
            status: KeyStatus::Active,
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    /// A fresh `sk-` key bound to one API, valid for a year
    pub fn issue(user_id: impl Into<String>, api: impl Into<String>) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        Self {
            key_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            api: Some(api.into()),
            api_key: format!("sk-{}", Uuid::new_v4().simple()),
            status: KeyStatus::Active,
            created_at: now,
            updated_at: now,
            expires_at: Some(now + Duration::days(ISSUED_KEY_LIFETIME_DAYS)),
        }
    }

    pub fn masked(&self) -> String {
        mask_key(&self.api_key)
    }

    /// Active key that expires within `days` of `now` (already expired included)
    pub fn expires_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                self.status == KeyStatus::Active && expires_at < now + Duration::days(days)
            }
            None => false,
        }
    }
}

/// Show the first and last four characters only
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Masked key listing returned to the chat widget
#[derive(Debug, Clone, Serialize)]
pub struct MaskedKeys {
    pub user_id: String,
    pub keys: Vec<String>,
    pub get_key_url: &'static str,
}

/// Validates and forwards key operations to the store
#[derive(Clone)]
pub struct KeyVault {
    store: Arc<dyn ApiKeyStore>,
}

impl KeyVault {
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self { store }
    }

    pub async fn save_user_key(
        &self,
        user_id: &str,
        api_key: &str,
    ) -> Result<ApiKeyRecord, ServiceError> {
        let user_id = user_id.trim();
        let api_key = api_key.trim();
        if user_id.is_empty() || api_key.is_empty() {
            return Err(ServiceError::Validation(
                "Please provide both User ID and API Key".to_string(),
            ));
        }

        let record = self.store.save_user_key(user_id, api_key).await?;
        tracing::info!(user_id = %user_id, key_id = %record.key_id, "Stored user API key");
        Ok(record)
    }

    pub async fn masked_keys(&self, user_id: &str) -> Result<MaskedKeys, ServiceError> {
        let records = self.store.keys_for_user(user_id.trim()).await?;
        Ok(MaskedKeys {
            user_id: user_id.trim().to_string(),
            keys: records.iter().map(ApiKeyRecord::masked).collect(),
            get_key_url: KEY_DASHBOARD_URL,
        })
    }

    pub async fn issue_key(&self, user_id: &str, api: &str) -> Result<ApiKeyRecord, ServiceError> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::Validation("User ID is required".to_string()));
        }
        let profile = catalog::find(api)
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown API: {}", api)))?;

        let record = ApiKeyRecord::issue(user_id.trim(), profile.name);
        self.store.insert_key(record.clone()).await?;
        tracing::info!(user_id = %record.user_id, api = profile.name, "Issued API key");
        Ok(record)
    }

    pub async fn set_status(
        &self,
        key_id: &str,
        status: KeyStatus,
    ) -> Result<ApiKeyRecord, ServiceError> {
        let record = self.store.set_key_status(key_id, status).await?;
        tracing::info!(key_id = %key_id, status = %status, "API key status updated");
        Ok(record)
    }

    pub async fn keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, ServiceError> {
        Ok(self.store.keys_for_user(user_id).await?)
    }
}
