use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub time_zone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating an office
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOffice {
    #[validate(required, length(max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 50))]
    pub time_zone: Option<String>,
    /// Accepted for compatibility; new offices always start active.
    pub is_active: Option<bool>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OfficeUpdate {
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 50))]
    pub time_zone: Option<String>,
    pub is_active: Option<bool>,
}

impl Office {
    pub fn new(organization_id: Uuid, new_office: NewOffice) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: new_office.name.unwrap_or_default(),
            address: new_office.address,
            city: new_office.city,
            country: new_office.country,
            time_zone: new_office.time_zone,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: OfficeUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        if update.city.is_some() {
            self.city = update.city;
        }
        if update.country.is_some() {
            self.country = update.country;
        }
        if update.time_zone.is_some() {
            self.time_zone = update.time_zone;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}
