use crate::model::{
    Client, ClientUpdate, Department, DepartmentUpdate, DirectoryCacheEntry,
    Document, DocumentFilter, NewClient, NewDepartment, NewOffice, Office, OfficeUpdate,
    OrganizationId,
};
use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents newest first; filters are applied only when set
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>>;
    /// Point lookup by id within a partition
    async fn get_document(&self, id: &str, partition_key: &str) -> Result<Option<Document>>;
    async fn create_document(&self, document: Document) -> Result<Document>;
    /// Replace a document only if its stored version still equals
    /// `expected_version`. Returns `None` when nothing was replaced.
    async fn replace_document(
        &self,
        document: Document,
        expected_version: i64,
    ) -> Result<Option<Document>>;
    async fn delete_document(&self, id: &str, partition_key: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Organization used when a request does not name one
    async fn default_organization_id(&self) -> Result<Option<OrganizationId>>;
    async fn organization_exists(&self, org: OrganizationId) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait OfficeStore: Send + Sync {
    async fn list_offices(&self, org: OrganizationId) -> Result<Vec<Office>>;
    async fn get_office(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Office>>;
    async fn create_office(&self, org: OrganizationId, office: NewOffice) -> Result<Office>;
    /// Coalescing update; `None` when no row matched
    async fn update_office(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: OfficeUpdate,
    ) -> Result<Option<Office>>;
    async fn delete_office(&self, org: OrganizationId, id: &Uuid) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait DepartmentStore: Send + Sync {
    async fn list_departments(&self, org: OrganizationId) -> Result<Vec<Department>>;
    async fn get_department(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Department>>;
    async fn create_department(
        &self,
        org: OrganizationId,
        department: NewDepartment,
    ) -> Result<Department>;
    async fn update_department(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: DepartmentUpdate,
    ) -> Result<Option<Department>>;
    async fn delete_department(&self, org: OrganizationId, id: &Uuid) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait ClientStore: Send + Sync {
    async fn list_clients(&self, org: OrganizationId) -> Result<Vec<Client>>;
    async fn get_client(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Client>>;
    async fn create_client(&self, org: OrganizationId, client: NewClient) -> Result<Client>;
    async fn update_client(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: ClientUpdate,
    ) -> Result<Option<Client>>;
    async fn delete_client(&self, org: OrganizationId, id: &Uuid) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Convert and upsert every raw record into the directory cache as one
    /// atomic unit, in input order. A record that fails conversion or the
    /// write leaves the cache exactly as it was.
    async fn sync_directory_users(&self, org: OrganizationId, records: &[Value]) -> Result<usize>;
    async fn list_directory_users(&self, org: OrganizationId) -> Result<Vec<DirectoryCacheEntry>>;
}

pub trait Store:
    DocumentStore
    + OrganizationStore
    + OfficeStore
    + DepartmentStore
    + ClientStore
    + DirectoryStore
    + Send
    + Sync
{
}
