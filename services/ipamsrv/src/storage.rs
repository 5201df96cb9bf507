//! SQLite persistence for connectors and their cached collections

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, info};

use crate::error::{IpamsrvError, Result};
use crate::models::{
    CollectionBatch, CollectionItem, CollectionSet, CollectionType, ConnectorDraft,
    ConnectorStatus, IpamConnector, SyncSummary,
};

/// Idempotent schema bootstrap, executed statement by statement
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ipam_connectors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        base_url TEXT NOT NULL,
        app_id TEXT NOT NULL,
        app_code TEXT NOT NULL DEFAULT '',
        app_permissions TEXT NOT NULL DEFAULT 'Read',
        app_security TEXT NOT NULL DEFAULT 'SSL with App code token',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_status TEXT NOT NULL DEFAULT 'unknown',
        last_checked_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ipam_collections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ipam_id INTEGER NOT NULL REFERENCES ipam_connectors(id) ON DELETE CASCADE,
        collection_type TEXT NOT NULL CHECK(collection_type IN ('section', 'datacenter', 'range')),
        name TEXT NOT NULL,
        description TEXT,
        metadata TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ipam_collections_owner ON ipam_collections(ipam_id, collection_type)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_ipam_connectors_identity ON ipam_connectors(base_url, lower(app_id))",
];

const CONNECTOR_COLUMNS: &str = "id, name, base_url, app_id, app_code, app_permissions, \
     app_security, created_at, updated_at, last_status, last_checked_at";

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn duplicate_conflict(draft: &ConnectorDraft) -> IpamsrvError {
    IpamsrvError::Conflict(format!(
        "An integration for {} with app id '{}' already exists",
        draft.base_url, draft.app_id
    ))
}

/// Unique-index violations on the connector identity become `Conflict`
fn map_write_error(err: sqlx::Error, draft: &ConnectorDraft) -> IpamsrvError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => duplicate_conflict(draft),
        _ => IpamsrvError::Database(err),
    }
}

fn hydrate_connector(row: &SqliteRow) -> Result<IpamConnector> {
    let status: String = row.try_get("last_status")?;
    Ok(IpamConnector {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        base_url: row.try_get("base_url")?,
        app_id: row.try_get("app_id")?,
        app_code: row.try_get("app_code")?,
        app_permissions: row.try_get("app_permissions")?,
        app_security: row.try_get("app_security")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_status: ConnectorStatus::from_db(&status),
        last_checked_at: row.try_get("last_checked_at")?,
    })
}

fn hydrate_item(row: &SqliteRow) -> Result<Option<CollectionItem>> {
    let kind: String = row.try_get("collection_type")?;
    let Some(collection_type) = CollectionType::from_db(&kind) else {
        return Ok(None);
    };
    let metadata: String = row.try_get("metadata")?;
    let metadata = serde_json::from_str(&metadata)?;
    Ok(Some(CollectionItem {
        id: row.try_get("id")?,
        ipam_id: row.try_get("ipam_id")?,
        collection_type,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        metadata,
    }))
}

/// Storage handle; cheap to clone, shares the pool
#[derive(Debug, Clone)]
pub struct IpamStore {
    pool: SqlitePool,
}

impl IpamStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("IPAM schema ready");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list_connectors(&self) -> Result<Vec<IpamConnector>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ipam_connectors ORDER BY id",
            CONNECTOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(hydrate_connector).collect()
    }

    pub async fn get_connector(&self, id: i64) -> Result<Option<IpamConnector>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ipam_connectors WHERE id = ?",
            CONNECTOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(hydrate_connector).transpose()
    }

    /// Same base URL and case-insensitively equal app id, other than `exclude_id`
    async fn ensure_unique(&self, draft: &ConnectorDraft, exclude_id: i64) -> Result<()> {
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM ipam_connectors WHERE base_url = ? AND lower(app_id) = lower(?) AND id != ?",
        )
        .bind(&draft.base_url)
        .bind(&draft.app_id)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(id) => Err(IpamsrvError::Conflict(format!(
                "An integration for {} with app id '{}' already exists (id {})",
                draft.base_url, draft.app_id, id
            ))),
            None => Ok(()),
        }
    }

    /// Insert a new connector with status `unknown`
    ///
    /// # Errors
    /// `Conflict` when the base URL and app id are already registered.
    pub async fn create_connector(&self, draft: &ConnectorDraft) -> Result<IpamConnector> {
        let app_code = draft
            .app_code
            .as_deref()
            .ok_or_else(|| IpamsrvError::validation("appCode is required"))?;
        self.ensure_unique(draft, 0).await?;

        let now = now_timestamp();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ipam_connectors
                (name, base_url, app_id, app_code, app_permissions, app_security,
                 created_at, updated_at, last_status, last_checked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'unknown', NULL)
            RETURNING id
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.base_url)
        .bind(&draft.app_id)
        .bind(app_code)
        .bind(&draft.app_permissions)
        .bind(&draft.app_security)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, draft))?;

        info!("Created IPAM integration {} ({})", id, draft.name);

        self.get_connector(id)
            .await?
            .ok_or_else(|| IpamsrvError::Internal(format!("integration {} vanished after insert", id)))
    }

    /// Update connector settings; status fields are left alone
    pub async fn update_connector(&self, id: i64, draft: &ConnectorDraft) -> Result<IpamConnector> {
        let current = self
            .get_connector(id)
            .await?
            .ok_or_else(|| IpamsrvError::connector_not_found(id))?;
        self.ensure_unique(draft, id).await?;

        let app_code = draft.app_code.as_deref().unwrap_or(&current.app_code);
        sqlx::query(
            r#"
            UPDATE ipam_connectors
            SET name = ?, base_url = ?, app_id = ?, app_code = ?,
                app_permissions = ?, app_security = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.base_url)
        .bind(&draft.app_id)
        .bind(app_code)
        .bind(&draft.app_permissions)
        .bind(&draft.app_security)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, draft))?;

        info!("Updated IPAM integration {}", id);

        self.get_connector(id)
            .await?
            .ok_or_else(|| IpamsrvError::connector_not_found(id))
    }

    /// Delete a connector and its cached collections
    pub async fn delete_connector(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ipam_collections WHERE ipam_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM ipam_connectors WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(IpamsrvError::connector_not_found(id));
        }

        tx.commit().await?;
        info!("Deleted IPAM integration {}", id);
        Ok(())
    }

    /// Record a test/sync outcome with the current time
    pub async fn update_status(&self, id: i64, status: ConnectorStatus) -> Result<()> {
        let now = now_timestamp();
        let updated = sqlx::query(
            "UPDATE ipam_connectors SET last_status = ?, last_checked_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(IpamsrvError::connector_not_found(id));
        }
        debug!("IPAM integration {} status -> {}", id, status);
        Ok(())
    }

    /// Replace every cached row of a connector in one transaction
    ///
    /// Readers see either the previous set or the new one, never a mix.
    pub async fn replace_collections(
        &self,
        ipam_id: i64,
        batch: &CollectionBatch,
    ) -> Result<SyncSummary> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM ipam_collections WHERE ipam_id = ?")
            .bind(ipam_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for (kind, record) in batch.iter() {
            let metadata = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO ipam_collections (ipam_id, collection_type, name, description, metadata)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(ipam_id)
            .bind(kind.as_str())
            .bind(&record.name)
            .bind(record.description.as_deref())
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let summary = batch.summary();
        debug!(
            "Replaced collections of integration {}: removed {}, wrote {:?}",
            ipam_id, removed, summary
        );
        Ok(summary)
    }

    /// Cached rows of one connector, in insertion order
    pub async fn list_collections(&self, ipam_id: i64) -> Result<CollectionSet> {
        let rows = sqlx::query(
            r#"
            SELECT id, ipam_id, collection_type, name, description, metadata
            FROM ipam_collections
            WHERE ipam_id = ?
            ORDER BY id
            "#,
        )
        .bind(ipam_id)
        .fetch_all(&self.pool)
        .await?;

        let mut set = CollectionSet::default();
        for row in &rows {
            if let Some(item) = hydrate_item(row)? {
                set.push(item);
            }
        }
        Ok(set)
    }

    /// Cached rows of every connector, keyed by connector id
    ///
    /// Connectors without cached rows still get an empty entry.
    pub async fn all_collections(&self) -> Result<BTreeMap<i64, CollectionSet>> {
        let mut by_connector: BTreeMap<i64, CollectionSet> = BTreeMap::new();

        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM ipam_connectors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        for id in ids {
            by_connector.entry(id).or_default();
        }

        let rows = sqlx::query(
            r#"
            SELECT id, ipam_id, collection_type, name, description, metadata
            FROM ipam_collections
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            if let Some(item) = hydrate_item(row)? {
                by_connector.entry(item.ipam_id).or_default().push(item);
            }
        }
        Ok(by_connector)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::models::{CollectionRecord, ConnectorInput};
    use common::sqlite::SqliteClient;
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_store() -> (IpamStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let client = SqliteClient::new(dir.path().join("ipam.db")).await.unwrap();
        let store = IpamStore::new(client.pool().clone());
        store.init_schema().await.unwrap();
        (store, dir)
    }

    fn draft(base_url: &str, app_id: &str) -> ConnectorDraft {
        ConnectorInput {
            name: Some("Lab".into()),
            base_url: Some(base_url.into()),
            app_id: Some(app_id.into()),
            app_code: Some("code".into()),
            ..Default::default()
        }
        .into_new_draft()
        .unwrap()
    }

    fn record(name: &str) -> CollectionRecord {
        CollectionRecord {
            name: name.into(),
            description: None,
            metadata: json!({"remoteId": name}),
        }
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let (store, _dir) = test_store().await;
        store.init_schema().await.unwrap(); // idempotent

        let created = store
            .create_connector(&draft("https://ipam.example.net/api", "console"))
            .await
            .unwrap();
        assert_eq!(created.last_status, ConnectorStatus::Unknown);
        assert_eq!(created.last_checked_at, None);
        assert_eq!(created.app_permissions, "Read");

        let listed = store.list_connectors().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(store.get_connector(created.id).await.unwrap(), Some(created));
        assert_eq!(store.get_connector(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_app_id_is_case_insensitive() {
        let (store, _dir) = test_store().await;
        store
            .create_connector(&draft("https://ipam.example.net/api", "Console"))
            .await
            .unwrap();

        let err = store
            .create_connector(&draft("https://ipam.example.net/api", "console"))
            .await
            .unwrap_err();
        assert!(matches!(err, IpamsrvError::Conflict(_)));

        // a different base URL is a different integration
        store
            .create_connector(&draft("https://other.example.net/api", "console"))
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_admit_one() {
        let (store, _dir) = test_store().await;
        let same = draft("https://ipam.example.net/api", "console");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let draft = same.clone();
                tokio::spawn(async move { store.create_connector(&draft).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(IpamsrvError::Conflict(_)) => {},
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_connectors().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identity_index_rejects_case_variants() {
        let (store, _dir) = test_store().await;
        let existing = draft("https://ipam.example.net/api", "Console");
        store.create_connector(&existing).await.unwrap();

        // straight to the table, skipping the friendly pre-check
        let err = sqlx::query(
            "INSERT INTO ipam_connectors (name, base_url, app_id, created_at, updated_at) \
             VALUES ('x', 'https://ipam.example.net/api', 'CONSOLE', 'now', 'now')",
        )
        .execute(store.pool())
        .await
        .unwrap_err();

        assert!(matches!(
            map_write_error(err, &existing),
            IpamsrvError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_an_error() {
        let (store, _dir) = test_store().await;
        let created = store
            .create_connector(&draft("https://ipam.example.net/api", "console"))
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO ipam_collections (ipam_id, collection_type, name, metadata) VALUES (?, 'range', 'r', '{broken')",
        )
        .bind(created.id)
        .execute(store.pool())
        .await
        .unwrap();

        assert!(matches!(
            store.list_collections(created.id).await,
            Err(IpamsrvError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_app_code_when_blank() {
        let (store, _dir) = test_store().await;
        let created = store
            .create_connector(&draft("https://ipam.example.net/api", "console"))
            .await
            .unwrap();

        let mut change = draft("https://ipam.example.net/api", "console");
        change.name = "Renamed".into();
        change.app_code = None;
        let updated = store.update_connector(created.id, &change).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.app_code, "code");

        let err = store.update_connector(42, &change).await.unwrap_err();
        assert!(matches!(err, IpamsrvError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_status_update() {
        let (store, _dir) = test_store().await;
        let created = store
            .create_connector(&draft("https://ipam.example.net/api", "console"))
            .await
            .unwrap();

        store
            .update_status(created.id, ConnectorStatus::Failed)
            .await
            .unwrap();
        let reloaded = store.get_connector(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.last_status, ConnectorStatus::Failed);
        assert!(reloaded.last_checked_at.is_some());

        assert!(matches!(
            store.update_status(77, ConnectorStatus::Connected).await,
            Err(IpamsrvError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_collections_swaps_whole_set() {
        let (store, _dir) = test_store().await;
        let a = store
            .create_connector(&draft("https://a.example.net/api", "console"))
            .await
            .unwrap();
        let b = store
            .create_connector(&draft("https://b.example.net/api", "console"))
            .await
            .unwrap();

        let first = CollectionBatch {
            sections: vec![record("s1"), record("s2")],
            datacenters: vec![record("d1")],
            ranges: vec![record("r1")],
        };
        store.replace_collections(a.id, &first).await.unwrap();
        store
            .replace_collections(b.id, &CollectionBatch {
                sections: vec![record("other")],
                ..Default::default()
            })
            .await
            .unwrap();

        let second = CollectionBatch {
            sections: vec![record("s3")],
            ..Default::default()
        };
        let summary = store.replace_collections(a.id, &second).await.unwrap();
        assert_eq!(summary.sections, 1);

        let set = store.list_collections(a.id).await.unwrap();
        assert_eq!(set.sections.len(), 1);
        assert_eq!(set.sections[0].name, "s3");
        assert!(set.datacenters.is_empty());
        assert!(set.ranges.is_empty());

        // the other connector is untouched
        let other = store.list_collections(b.id).await.unwrap();
        assert_eq!(other.sections[0].name, "other");
    }

    #[tokio::test]
    async fn test_delete_removes_collections() {
        let (store, _dir) = test_store().await;
        let created = store
            .create_connector(&draft("https://ipam.example.net/api", "console"))
            .await
            .unwrap();
        store
            .replace_collections(created.id, &CollectionBatch {
                ranges: vec![record("r1")],
                ..Default::default()
            })
            .await
            .unwrap();

        store.delete_connector(created.id).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ipam_collections")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            store.delete_connector(created.id).await,
            Err(IpamsrvError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_all_collections_includes_empty_connectors() {
        let (store, _dir) = test_store().await;
        let a = store
            .create_connector(&draft("https://a.example.net/api", "console"))
            .await
            .unwrap();
        let b = store
            .create_connector(&draft("https://b.example.net/api", "console"))
            .await
            .unwrap();
        store
            .replace_collections(a.id, &CollectionBatch {
                datacenters: vec![record("d1")],
                ..Default::default()
            })
            .await
            .unwrap();

        let all = store.all_collections().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&a.id].datacenters.len(), 1);
        assert_eq!(all[&b.id], CollectionSet::default());
    }
}
