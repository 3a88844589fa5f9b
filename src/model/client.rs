use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An external client of the organization (not an application user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub firm_name: Option<String>,
    pub firm_address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[validate(required, length(max = 100))]
    pub first_name: Option<String>,
    #[validate(required, length(max = 100))]
    pub last_name: Option<String>,
    #[validate(required, email, length(max = 255))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub firm_name: Option<String>,
    #[validate(length(max = 500))]
    pub firm_address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub firm_name: Option<String>,
    #[validate(length(max = 500))]
    pub firm_address: Option<String>,
    pub is_active: Option<bool>,
}

impl Client {
    pub fn new(organization_id: Uuid, new_client: NewClient) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            first_name: new_client.first_name.unwrap_or_default(),
            last_name: new_client.last_name.unwrap_or_default(),
            email: new_client.email.unwrap_or_default(),
            phone: new_client.phone,
            firm_name: new_client.firm_name,
            firm_address: new_client.firm_address,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: ClientUpdate) {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if update.firm_name.is_some() {
            self.firm_name = update.firm_name;
        }
        if update.firm_address.is_some() {
            self.firm_address = update.firm_address;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}
