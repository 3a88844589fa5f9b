use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::model::{
    Client, ClientUpdate, Department, DepartmentUpdate, DirectoryCacheEntry, DirectoryUser,
    Document, DocumentFilter, NewClient, NewDepartment, NewOffice, Office, OfficeUpdate,
    Organization, OrganizationId, MAX_LIST_ROWS,
};
use crate::store::traits::{
    ClientStore, DepartmentStore, DirectoryStore, DocumentStore, OfficeStore, OrganizationStore,
    Store,
};

/// In-process store with the same observable behavior as `PostgresStore`,
/// including all-or-nothing directory synchronization. Used by tests and for
/// running the API without databases.
#[derive(Debug, Default)]
pub struct MemoryStore {
    organizations: RwLock<Vec<Organization>>,
    documents: RwLock<HashMap<(String, String), Document>>,
    offices: RwLock<HashMap<Uuid, Office>>,
    departments: RwLock<HashMap<Uuid, Department>>,
    clients: RwLock<HashMap<Uuid, Client>>,
    directory: RwLock<HashMap<(Uuid, String), DirectoryCacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_organization(&self, name: &str) -> OrganizationId {
        let organization = Organization::new(name.to_string());
        let id = OrganizationId(organization.id);
        self.organizations.write().push(organization);
        id
    }
}

/// Newest first, capped like the relational list queries
fn newest_first<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows.truncate(MAX_LIST_ROWS as usize);
    rows
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .read()
            .values()
            .filter(|d| {
                filter
                    .tenant_id
                    .as_deref()
                    .map_or(true, |tenant| d.partition_key == tenant)
            })
            .filter(|d| {
                filter.status.map_or(true, |status| d.status == status)
            })
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        Ok(documents)
    }

    async fn get_document(&self, id: &str, partition_key: &str) -> Result<Option<Document>> {
        let key = (partition_key.to_string(), id.to_string());
        Ok(self.documents.read().get(&key).cloned())
    }

    async fn create_document(&self, document: Document) -> Result<Document> {
        let key = (document.partition_key.clone(), document.id.clone());
        let mut documents = self.documents.write();
        if documents.contains_key(&key) {
            return Err(anyhow!("Document {} already exists", document.id));
        }
        documents.insert(key, document.clone());
        Ok(document)
    }

    async fn replace_document(
        &self,
        document: Document,
        expected_version: i64,
    ) -> Result<Option<Document>> {
        let key = (document.partition_key.clone(), document.id.clone());
        let mut documents = self.documents.write();
        match documents.get_mut(&key) {
            Some(stored) if stored.metadata.version == expected_version => {
                *stored = document.clone();
                Ok(Some(document))
            }
            _ => Ok(None),
        }
    }

    async fn delete_document(&self, id: &str, partition_key: &str) -> Result<bool> {
        let key = (partition_key.to_string(), id.to_string());
        Ok(self.documents.write().remove(&key).is_some())
    }
}

#[async_trait::async_trait]
impl OrganizationStore for MemoryStore {
    async fn default_organization_id(&self) -> Result<Option<OrganizationId>> {
        Ok(self
            .organizations
            .read()
            .iter()
            .min_by_key(|o| o.created_at)
            .map(|o| OrganizationId(o.id)))
    }

    async fn organization_exists(&self, org: OrganizationId) -> Result<bool> {
        Ok(self.organizations.read().iter().any(|o| o.id == org.0))
    }
}

#[async_trait::async_trait]
impl OfficeStore for MemoryStore {
    async fn list_offices(&self, org: OrganizationId) -> Result<Vec<Office>> {
        let rows = self
            .offices
            .read()
            .values()
            .filter(|o| o.organization_id == org.0)
            .cloned()
            .collect();
        Ok(newest_first(rows, |o: &Office| o.created_at))
    }

    async fn get_office(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Office>> {
        Ok(self
            .offices
            .read()
            .get(id)
            .filter(|o| o.organization_id == org.0)
            .cloned())
    }

    async fn create_office(&self, org: OrganizationId, office: NewOffice) -> Result<Office> {
        let office = Office::new(org.0, office);
        self.offices.write().insert(office.id, office.clone());
        Ok(office)
    }

    async fn update_office(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: OfficeUpdate,
    ) -> Result<Option<Office>> {
        let mut offices = self.offices.write();
        Ok(offices
            .get_mut(id)
            .filter(|o| o.organization_id == org.0)
            .map(|office| {
                office.apply(update);
                office.clone()
            }))
    }

    async fn delete_office(&self, org: OrganizationId, id: &Uuid) -> Result<bool> {
        let mut offices = self.offices.write();
        if offices.get(id).map_or(false, |o| o.organization_id == org.0) {
            offices.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait::async_trait]
impl DepartmentStore for MemoryStore {
    async fn list_departments(&self, org: OrganizationId) -> Result<Vec<Department>> {
        let rows = self
            .departments
            .read()
            .values()
            .filter(|d| d.organization_id == org.0)
            .cloned()
            .collect();
        Ok(newest_first(rows, |d: &Department| d.created_at))
    }

    async fn get_department(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Department>> {
        Ok(self
            .departments
            .read()
            .get(id)
            .filter(|d| d.organization_id == org.0)
            .cloned())
    }

    async fn create_department(
        &self,
        org: OrganizationId,
        department: NewDepartment,
    ) -> Result<Department> {
        let department = Department::new(org.0, department);
        self.departments
            .write()
            .insert(department.id, department.clone());
        Ok(department)
    }

    async fn update_department(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: DepartmentUpdate,
    ) -> Result<Option<Department>> {
        let mut departments = self.departments.write();
        Ok(departments
            .get_mut(id)
            .filter(|d| d.organization_id == org.0)
            .map(|department| {
                department.apply(update);
                department.clone()
            }))
    }

    async fn delete_department(&self, org: OrganizationId, id: &Uuid) -> Result<bool> {
        let mut departments = self.departments.write();
        if departments.get(id).map_or(false, |d| d.organization_id == org.0) {
            departments.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait::async_trait]
impl ClientStore for MemoryStore {
    async fn list_clients(&self, org: OrganizationId) -> Result<Vec<Client>> {
        let rows = self
            .clients
            .read()
            .values()
            .filter(|c| c.organization_id == org.0)
            .cloned()
            .collect();
        Ok(newest_first(rows, |c: &Client| c.created_at))
    }

    async fn get_client(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Client>> {
        Ok(self
            .clients
            .read()
            .get(id)
            .filter(|c| c.organization_id == org.0)
            .cloned())
    }

    async fn create_client(&self, org: OrganizationId, client: NewClient) -> Result<Client> {
        let client = Client::new(org.0, client);
        self.clients.write().insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_client(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: ClientUpdate,
    ) -> Result<Option<Client>> {
        let mut clients = self.clients.write();
        Ok(clients
            .get_mut(id)
            .filter(|c| c.organization_id == org.0)
            .map(|client| {
                client.apply(update);
                client.clone()
            }))
    }

    async fn delete_client(&self, org: OrganizationId, id: &Uuid) -> Result<bool> {
        let mut clients = self.clients.write();
        if clients.get(id).map_or(false, |c| c.organization_id == org.0) {
            clients.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait::async_trait]
impl DirectoryStore for MemoryStore {
    async fn sync_directory_users(
        &self,
        org: OrganizationId,
        records: &[Value],
    ) -> Result<usize> {
        let mut directory = self.directory.write();
        // Work on a copy; it replaces the cache only if every record applied
        let mut staged = directory.clone();
        let synced_at = Utc::now();

        for record in records {
            let user = DirectoryUser::from_record(record)?;
            let external_id = user.external_id().to_string();
            let display_name = user.display_name.clone();
            let email = user.email().map(str::to_string);
            staged
                .entry((org.0, external_id.clone()))
                .and_modify(|entry| {
                    entry.display_name = display_name.clone();
                    entry.email = email.clone();
                    entry.last_sync_at = synced_at;
                })
                .or_insert_with(|| DirectoryCacheEntry {
                    id: Uuid::new_v4(),
                    organization_id: org.0,
                    azure_ad_user_id: external_id,
                    display_name,
                    email,
                    last_sync_at: synced_at,
                });
        }

        *directory = staged;
        Ok(records.len())
    }

    async fn list_directory_users(&self, org: OrganizationId) -> Result<Vec<DirectoryCacheEntry>> {
        let rows = self
            .directory
            .read()
            .values()
            .filter(|e| e.organization_id == org.0)
            .cloned()
            .collect();
        Ok(newest_first(rows, |e: &DirectoryCacheEntry| e.last_sync_at))
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: Option<&str>, name: &str) -> Value {
        json!({
            "id": id,
            "displayName": name,
            "userPrincipalName": format!("{}@contoso.com", name.to_lowercase()),
        })
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_per_external_id() {
        let store = MemoryStore::new();
        let org = store.add_organization("Contoso");
        let batch = vec![user(Some("aad-1"), "Anna"), user(Some("aad-2"), "Ben")];

        assert_eq!(store.sync_directory_users(org, &batch).await.unwrap(), 2);
        let first = store.list_directory_users(org).await.unwrap();

        assert_eq!(store.sync_directory_users(org, &batch).await.unwrap(), 2);
        let second = store.list_directory_users(org).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        for entry in &second {
            let before = first
                .iter()
                .find(|e| e.azure_ad_user_id == entry.azure_ad_user_id)
                .unwrap();
            assert_eq!(before.id, entry.id);
            assert!(entry.last_sync_at >= before.last_sync_at);
        }
    }

    #[tokio::test]
    async fn test_failed_record_rolls_back_whole_batch() {
        let store = MemoryStore::new();
        let org = store.add_organization("Contoso");
        store
            .sync_directory_users(org, &[user(Some("aad-1"), "Anna")])
            .await
            .unwrap();

        let batch = vec![
            user(Some("aad-1"), "Anna Renamed"),
            user(Some("aad-2"), "Ben"),
            user(None, "Broken"),
        ];
        assert!(store.sync_directory_users(org, &batch).await.is_err());

        let entries = store.list_directory_users(org).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name.as_deref(), Some("Anna"));
    }

    #[tokio::test]
    async fn test_oversized_display_name_rolls_back_like_the_column_limit() {
        let store = MemoryStore::new();
        let org = store.add_organization("Contoso");

        let batch = vec![user(Some("aad-1"), "Anna"), user(Some("aad-2"), &"B".repeat(500))];
        assert!(store.sync_directory_users(org, &batch).await.is_err());
        assert!(store.list_directory_users(org).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_are_scoped_to_their_organization() {
        let store = MemoryStore::new();
        let contoso = store.add_organization("Contoso");
        let fabrikam = store.add_organization("Fabrikam");

        let office = store
            .create_office(
                contoso,
                NewOffice {
                    name: Some("Riga HQ".to_string()),
                    address: None,
                    city: None,
                    country: None,
                    time_zone: None,
                    is_active: None,
                },
            )
            .await
            .unwrap();

        assert!(store.get_office(fabrikam, &office.id).await.unwrap().is_none());
        assert!(store.list_offices(fabrikam).await.unwrap().is_empty());
        assert!(!store.delete_office(fabrikam, &office.id).await.unwrap());
        assert_eq!(store.list_offices(contoso).await.unwrap().len(), 1);
        assert_eq!(store.default_organization_id().await.unwrap(), Some(contoso));
    }
}
