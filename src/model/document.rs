use crate::model::{generate_id, Id};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Pending => "pending",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalFlow {
    Parallel,
    Consecutive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

fn default_version() -> i64 {
    1
}

/// Identity lists controlling who may see, edit and approve a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPermissions {
    pub owners: Vec<String>,
    pub viewers: Vec<String>,
    pub editors: Vec<String>,
    pub approvers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub created_by: String,
    pub created_at: String, // ISO 8601 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_flow: Option<ApprovalFlow>,
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub signers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<String>,
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_document_id: Option<String>,
}

/// A stored document. `(partition_key, id)` is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Id,
    pub partition_key: String,
    pub name: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    #[validate(url)]
    pub blob_url: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub permissions: DocumentPermissions,
}

impl Document {
    /// Whether a caller other than the lock holder is blocked from writing
    pub fn is_locked_against(&self, user_id: &str) -> bool {
        self.metadata.is_locked
            && self
                .metadata
                .locked_by
                .as_deref()
                .map_or(true, |holder| holder != user_id)
    }
}

/// Input model for creating a document. Required fields are optional here so
/// that missing ones are reported per field instead of as a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    #[validate(required)]
    pub partition_key: Option<String>,
    #[validate(required)]
    pub name: Option<String>,
    #[validate(required)]
    pub file_name: Option<String>,
    #[validate(required)]
    pub file_size: Option<u64>,
    #[validate(required)]
    pub mime_type: Option<String>,
    #[validate(required, url)]
    pub blob_url: Option<String>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(required, nested)]
    pub metadata: Option<NewDocumentMetadata>,
    #[serde(default)]
    pub permissions: DocumentPermissions,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDocumentMetadata {
    #[validate(required)]
    pub created_by: Option<String>,
    #[validate(required)]
    pub created_at: Option<String>,
    pub modified_by: Option<String>,
    pub modified_at: Option<String>,
    pub office_id: Option<String>,
    pub department_id: Option<String>,
    pub client_id: Option<String>,
    pub approval_flow: Option<ApprovalFlow>,
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub signers: Vec<String>,
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_locked: bool,
    pub locked_by: Option<String>,
    pub locked_at: Option<String>,
    #[serde(default = "default_version")]
    pub version: i64,
    pub parent_document_id: Option<String>,
}

impl NewDocumentMetadata {
    fn into_metadata(self) -> DocumentMetadata {
        DocumentMetadata {
            created_by: self.created_by.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
            modified_by: self.modified_by,
            modified_at: self.modified_at,
            office_id: self.office_id,
            department_id: self.department_id,
            client_id: self.client_id,
            approval_flow: self.approval_flow,
            validators: self.validators,
            signers: self.signers,
            deadline: self.deadline,
            priority: self.priority,
            is_locked: self.is_locked,
            locked_by: self.locked_by,
            locked_at: self.locked_at,
            version: self.version,
            parent_document_id: self.parent_document_id,
        }
    }
}

impl NewDocument {
    /// Convert a validated request into a stored document with a fresh id.
    /// Required fields are guaranteed present once `validate()` succeeded.
    pub fn into_document(self) -> Document {
        Document {
            id: generate_id(),
            partition_key: self.partition_key.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            file_name: self.file_name.unwrap_or_default(),
            file_size: self.file_size.unwrap_or_default(),
            mime_type: self.mime_type.unwrap_or_default(),
            blob_url: self.blob_url.unwrap_or_default(),
            status: self.status,
            category: self.category.unwrap_or_default(),
            tags: self.tags,
            metadata: self
                .metadata
                .map(NewDocumentMetadata::into_metadata)
                .unwrap_or_else(|| NewDocumentMetadata::default().into_metadata()),
            permissions: self.permissions,
        }
    }
}

impl Default for NewDocumentMetadata {
    fn default() -> Self {
        Self {
            created_by: None,
            created_at: None,
            modified_by: None,
            modified_at: None,
            office_id: None,
            department_id: None,
            client_id: None,
            approval_flow: None,
            validators: Vec::new(),
            signers: Vec::new(),
            deadline: None,
            priority: Priority::default(),
            is_locked: false,
            locked_by: None,
            locked_at: None,
            version: default_version(),
            parent_document_id: None,
        }
    }
}

/// Optional equality filters for listing documents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    pub tenant_id: Option<String>,
    pub status: Option<DocumentStatus>,
}
