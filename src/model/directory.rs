use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// Width of the cache's `email` column
pub const MAX_EMAIL_LEN: usize = 255;

/// A user record as fetched from the external directory by the caller.
/// Length rules mirror the `azure_ad_cache` columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[validate(required, length(max = 255))]
    pub id: Option<String>,
    #[validate(length(max = 200))]
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl DirectoryUser {
    /// Convert one raw batch record, enforcing the cache's column constraints.
    /// Both stores call this per record inside their unit of work.
    pub fn from_record(record: &Value) -> anyhow::Result<Self> {
        let user: DirectoryUser = serde_json::from_value(record.clone())
            .context("Malformed directory user record")?;
        user.validate()
            .with_context(|| format!("Invalid directory user record {:?}", user.id))?;
        if let Some(email) = user.email() {
            if email.chars().count() > MAX_EMAIL_LEN {
                return Err(anyhow!(
                    "Email of directory user {:?} exceeds {} characters",
                    user.id,
                    MAX_EMAIL_LEN
                ));
            }
        }
        Ok(user)
    }

    /// External id; present on every user built by `from_record`
    pub fn external_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Address to cache: the mailbox if set, else the principal name
    pub fn email(&self) -> Option<&str> {
        self.mail.as_deref().or(self.user_principal_name.as_deref())
    }
}

/// A sync batch. Records stay raw JSON until the store converts them one by
/// one, so a bad record fails the batch instead of the whole body parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub users: Vec<Value>,
}

impl SyncRequest {
    /// An empty body or one that is not JSON at all is an empty batch. A JSON
    /// body whose `users` is not a list is an error.
    pub fn from_body(body: &[u8]) -> anyhow::Result<Self> {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => return Ok(Self::default()),
        };
        match value.get("users") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Array(users)) => Ok(Self {
                users: users.clone(),
            }),
            Some(_) => Err(anyhow!("Sync body field `users` must be an array")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub updated: usize,
}

/// Cached copy of a directory user, unique per organization and external id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryCacheEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub azure_ad_user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub last_sync_at: DateTime<Utc>,
}
