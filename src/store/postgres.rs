use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::model::{
    Client, ClientUpdate, Department, DepartmentUpdate, DirectoryCacheEntry, DirectoryUser,
    Document, DocumentFilter, NewClient, NewDepartment, NewOffice, Office, OfficeUpdate,
    OrganizationId, MAX_LIST_ROWS,
};
use crate::store::traits::{
    ClientStore, DepartmentStore, DirectoryStore, DocumentStore, OfficeStore, OrganizationStore,
    Store,
};

const OFFICE_COLUMNS: &str = "id, organization_id, name, address, city, country, time_zone, is_active, created_at, updated_at";
const DEPARTMENT_COLUMNS: &str =
    "id, organization_id, name, description, is_active, created_at, updated_at";
const CLIENT_COLUMNS: &str = "id, organization_id, first_name, last_name, email, phone, firm_name, firm_address, is_active, created_at, updated_at";
const DIRECTORY_COLUMNS: &str =
    "id, organization_id, azure_ad_user_id, display_name, email, last_sync_at";

/// A connection pool that is built on first use, exactly once.
///
/// Concurrent first callers wait on the same initialization. A failed
/// connect leaves the cell empty so the next call tries again.
struct LazyPool {
    name: &'static str,
    options: PgPoolOptions,
    connect: PgConnectOptions,
    pool: OnceCell<PgPool>,
}

impl LazyPool {
    fn new(name: &'static str, options: PgPoolOptions, connect: PgConnectOptions) -> Self {
        Self {
            name,
            options,
            connect,
            pool: OnceCell::new(),
        }
    }

    /// Wrap a pool that is already connected
    fn connected(name: &'static str, pool: PgPool) -> Self {
        Self {
            name,
            options: PgPoolOptions::new(),
            connect: pool.connect_options().as_ref().clone(),
            pool: OnceCell::new_with(Some(pool)),
        }
    }

    async fn get(&self) -> Result<&PgPool> {
        self.pool
            .get_or_try_init(|| async {
                log::info!("Opening {} connection pool", self.name);
                self.options
                    .clone()
                    .connect_with(self.connect.clone())
                    .await
                    .with_context(|| format!("Failed to create {} connection pool", self.name))
            })
            .await
    }
}

/// Process-wide holder of both datastores: documents live as JSONB rows in
/// the document database, organizational entities in the relational one.
pub struct PostgresStore {
    documents: LazyPool,
    relational: LazyPool,
    default_organization: Option<OrganizationId>,
}

impl PostgresStore {
    /// Prepare both pools from configuration without connecting
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut documents_connect = PgConnectOptions::from_str(&config.documents_url())
            .context("Invalid document store connection string")?;
        if let Some(database_name) = &config.documents.database_name {
            documents_connect = documents_connect.database(database_name);
        }
        let documents_options =
            PgPoolOptions::new().max_connections(config.documents.max_connections);

        let sql = &config.sql;
        let ssl_mode = if sql.trust_server_certificate {
            PgSslMode::Require
        } else {
            PgSslMode::VerifyFull
        };
        let relational_connect = PgConnectOptions::new()
            .host(&sql.host)
            .port(sql.port)
            .database(&sql.database)
            .username(&sql.user)
            .password(&sql.password)
            .ssl_mode(ssl_mode);
        let relational_options = PgPoolOptions::new()
            .max_connections(sql.max_connections)
            .min_connections(sql.min_connections)
            .idle_timeout(Duration::from_secs(sql.idle_timeout_secs));

        Ok(Self {
            documents: LazyPool::new("document store", documents_options, documents_connect),
            relational: LazyPool::new("relational", relational_options, relational_connect),
            default_organization: config.organization.default_id.map(OrganizationId),
        })
    }

    /// Build on existing pools, e.g. ones handed out by `#[sqlx::test]`
    pub fn from_pools(documents: PgPool, relational: PgPool) -> Self {
        Self {
            documents: LazyPool::connected("document store", documents),
            relational: LazyPool::connected("relational", relational),
            default_organization: None,
        }
    }

    /// Run the embedded migrations against both databases
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/documents")
            .run(self.documents.get().await?)
            .await
            .context("Failed to run document store migrations")?;
        sqlx::migrate!("./migrations/relational")
            .run(self.relational.get().await?)
            .await
            .context("Failed to run relational migrations")?;
        Ok(())
    }

    async fn upsert_directory_users(
        tx: &mut Transaction<'_, Postgres>,
        org: OrganizationId,
        records: &[Value],
    ) -> Result<()> {
        for record in records {
            let user = DirectoryUser::from_record(record)?;
            sqlx::query(
                r#"
                INSERT INTO azure_ad_cache (id, organization_id, azure_ad_user_id, display_name, email, last_sync_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                ON CONFLICT (organization_id, azure_ad_user_id) DO UPDATE SET
                    display_name = EXCLUDED.display_name,
                    email = EXCLUDED.email,
                    last_sync_at = NOW()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(org.0)
            .bind(user.external_id())
            .bind(user.display_name.as_deref())
            .bind(user.email())
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to upsert directory user {:?}", user.id))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresStore {
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let pool = self.documents.get().await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE 1=1");
        if let Some(tenant_id) = &filter.tenant_id {
            query.push(" AND partition_key = ").push_bind(tenant_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY body->'metadata'->>'createdAt' DESC");

        let rows: Vec<Json<Document>> = query
            .build_query_scalar()
            .fetch_all(pool)
            .await
            .context("Failed to list documents")?;

        Ok(rows.into_iter().map(|Json(document)| document).collect())
    }

    async fn get_document(&self, id: &str, partition_key: &str) -> Result<Option<Document>> {
        let pool = self.documents.get().await?;
        let row: Option<Json<Document>> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE id = $1 AND partition_key = $2",
        )
        .bind(id)
        .bind(partition_key)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch document")?;

        Ok(row.map(|Json(document)| document))
    }

    async fn create_document(&self, document: Document) -> Result<Document> {
        let pool = self.documents.get().await?;
        let Json(created): Json<Document> = sqlx::query_scalar(
            r#"
            INSERT INTO documents (id, partition_key, status, version, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING body
            "#,
        )
        .bind(&document.id)
        .bind(&document.partition_key)
        .bind(document.status.as_str())
        .bind(document.metadata.version)
        .bind(Json(&document))
        .fetch_one(pool)
        .await
        .context("Failed to create document")?;

        Ok(created)
    }

    async fn replace_document(
        &self,
        document: Document,
        expected_version: i64,
    ) -> Result<Option<Document>> {
        let pool = self.documents.get().await?;
        let row: Option<Json<Document>> = sqlx::query_scalar(
            r#"
            UPDATE documents SET
                body = $1,
                status = $2,
                version = $3
            WHERE id = $4 AND partition_key = $5 AND version = $6
            RETURNING body
            "#,
        )
        .bind(Json(&document))
        .bind(document.status.as_str())
        .bind(document.metadata.version)
        .bind(&document.id)
        .bind(&document.partition_key)
        .bind(expected_version)
        .fetch_optional(pool)
        .await
        .context("Failed to replace document")?;

        Ok(row.map(|Json(document)| document))
    }

    async fn delete_document(&self, id: &str, partition_key: &str) -> Result<bool> {
        let pool = self.documents.get().await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND partition_key = $2")
            .bind(id)
            .bind(partition_key)
            .execute(pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl OrganizationStore for PostgresStore {
    async fn default_organization_id(&self) -> Result<Option<OrganizationId>> {
        if let Some(org) = self.default_organization {
            return Ok(Some(org));
        }

        let pool = self.relational.get().await?;
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM organizations ORDER BY created_at LIMIT 1")
                .fetch_optional(pool)
                .await
                .context("Failed to look up default organization")?;

        Ok(id.map(OrganizationId))
    }

    async fn organization_exists(&self, org: OrganizationId) -> Result<bool> {
        let pool = self.relational.get().await?;
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM organizations WHERE id = $1)")
            .bind(org.0)
            .fetch_one(pool)
            .await
            .context("Failed to look up organization")
    }
}

#[async_trait::async_trait]
impl OfficeStore for PostgresStore {
    async fn list_offices(&self, org: OrganizationId) -> Result<Vec<Office>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            "SELECT {OFFICE_COLUMNS} FROM offices WHERE organization_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(org.0)
        .bind(MAX_LIST_ROWS)
        .fetch_all(pool)
        .await
        .context("Failed to list offices")
    }

    async fn get_office(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Office>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            "SELECT {OFFICE_COLUMNS} FROM offices WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org.0)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch office")
    }

    async fn create_office(&self, org: OrganizationId, office: NewOffice) -> Result<Office> {
        let pool = self.relational.get().await?;
        let office = Office::new(*org.as_uuid(), office);
        sqlx::query_as(&format!(
            r#"
            INSERT INTO offices (id, organization_id, name, address, city, country, time_zone, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            RETURNING {OFFICE_COLUMNS}
            "#
        ))
        .bind(office.id)
        .bind(office.organization_id)
        .bind(&office.name)
        .bind(&office.address)
        .bind(&office.city)
        .bind(&office.country)
        .bind(&office.time_zone)
        .fetch_one(pool)
        .await
        .context("Failed to create office")
    }

    async fn update_office(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: OfficeUpdate,
    ) -> Result<Option<Office>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            r#"
            UPDATE offices SET
                name = COALESCE($3, name),
                address = COALESCE($4, address),
                city = COALESCE($5, city),
                country = COALESCE($6, country),
                time_zone = COALESCE($7, time_zone),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {OFFICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(org.0)
        .bind(update.name)
        .bind(update.address)
        .bind(update.city)
        .bind(update.country)
        .bind(update.time_zone)
        .bind(update.is_active)
        .fetch_optional(pool)
        .await
        .context("Failed to update office")
    }

    async fn delete_office(&self, org: OrganizationId, id: &Uuid) -> Result<bool> {
        let pool = self.relational.get().await?;
        let result = sqlx::query("DELETE FROM offices WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org.0)
            .execute(pool)
            .await
            .context("Failed to delete office")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl DepartmentStore for PostgresStore {
    async fn list_departments(&self, org: OrganizationId) -> Result<Vec<Department>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE organization_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(org.0)
        .bind(MAX_LIST_ROWS)
        .fetch_all(pool)
        .await
        .context("Failed to list departments")
    }

    async fn get_department(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Department>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org.0)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch department")
    }

    async fn create_department(
        &self,
        org: OrganizationId,
        department: NewDepartment,
    ) -> Result<Department> {
        let pool = self.relational.get().await?;
        let department = Department::new(*org.as_uuid(), department);
        sqlx::query_as(&format!(
            r#"
            INSERT INTO departments (id, organization_id, name, description, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {DEPARTMENT_COLUMNS}
            "#
        ))
        .bind(department.id)
        .bind(department.organization_id)
        .bind(&department.name)
        .bind(&department.description)
        .fetch_one(pool)
        .await
        .context("Failed to create department")
    }

    async fn update_department(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: DepartmentUpdate,
    ) -> Result<Option<Department>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            r#"
            UPDATE departments SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {DEPARTMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(org.0)
        .bind(update.name)
        .bind(update.description)
        .bind(update.is_active)
        .fetch_optional(pool)
        .await
        .context("Failed to update department")
    }

    async fn delete_department(&self, org: OrganizationId, id: &Uuid) -> Result<bool> {
        let pool = self.relational.get().await?;
        let result = sqlx::query("DELETE FROM departments WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org.0)
            .execute(pool)
            .await
            .context("Failed to delete department")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl ClientStore for PostgresStore {
    async fn list_clients(&self, org: OrganizationId) -> Result<Vec<Client>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE organization_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(org.0)
        .bind(MAX_LIST_ROWS)
        .fetch_all(pool)
        .await
        .context("Failed to list clients")
    }

    async fn get_client(&self, org: OrganizationId, id: &Uuid) -> Result<Option<Client>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org.0)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch client")
    }

    async fn create_client(&self, org: OrganizationId, client: NewClient) -> Result<Client> {
        let pool = self.relational.get().await?;
        let client = Client::new(*org.as_uuid(), client);
        sqlx::query_as(&format!(
            r#"
            INSERT INTO clients (id, organization_id, first_name, last_name, email, phone, firm_name, firm_address, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(client.id)
        .bind(client.organization_id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.firm_name)
        .bind(&client.firm_address)
        .fetch_one(pool)
        .await
        .context("Failed to create client")
    }

    async fn update_client(
        &self,
        org: OrganizationId,
        id: &Uuid,
        update: ClientUpdate,
    ) -> Result<Option<Client>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            r#"
            UPDATE clients SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                firm_name = COALESCE($7, firm_name),
                firm_address = COALESCE($8, firm_address),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(org.0)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.email)
        .bind(update.phone)
        .bind(update.firm_name)
        .bind(update.firm_address)
        .bind(update.is_active)
        .fetch_optional(pool)
        .await
        .context("Failed to update client")
    }

    async fn delete_client(&self, org: OrganizationId, id: &Uuid) -> Result<bool> {
        let pool = self.relational.get().await?;
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org.0)
            .execute(pool)
            .await
            .context("Failed to delete client")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl DirectoryStore for PostgresStore {
    async fn sync_directory_users(
        &self,
        org: OrganizationId,
        records: &[Value],
    ) -> Result<usize> {
        let pool = self.relational.get().await?;
        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin directory sync transaction")?;

        match Self::upsert_directory_users(&mut tx, org, records).await {
            Ok(()) => {
                tx.commit()
                    .await
                    .context("Failed to commit directory sync transaction")?;
                Ok(records.len())
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    log::error!("Failed to roll back directory sync: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    async fn list_directory_users(&self, org: OrganizationId) -> Result<Vec<DirectoryCacheEntry>> {
        let pool = self.relational.get().await?;
        sqlx::query_as(&format!(
            "SELECT {DIRECTORY_COLUMNS} FROM azure_ad_cache WHERE organization_id = $1 ORDER BY last_sync_at DESC LIMIT $2"
        ))
        .bind(org.0)
        .bind(MAX_LIST_ROWS)
        .fetch_all(pool)
        .await
        .context("Failed to list directory cache")
    }
}

impl Store for PostgresStore {}
