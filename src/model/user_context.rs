use serde::{Deserialize, Serialize};

/// Caller identity taken from request headers; used for lock checks and
/// modification stamps on documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

impl UserContext {
    pub fn with_details(user_id: String, email: Option<String>, name: Option<String>) -> Self {
        Self {
            user_id,
            user_email: email,
            user_name: name,
        }
    }

    /// Context for requests that carry no identity headers
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            user_email: None,
            user_name: None,
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
