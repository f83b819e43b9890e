use crate::access::TeamDirectory;
use crate::error::{Result, TranslationError};
use crate::i18n::{
    new_entry_id, EntryFilter, EntryPatch, EntryStore, NewEntry, ScopeFilter, TranslationEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use tracing::info;

const SELECT_COLUMNS: &str = "SELECT id, team_id, namespace, key_path, category, translations, \
     description, is_overrideable, created_at, updated_at FROM translations";

/// SQLite-backed entry store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to `database_url` (e.g. `sqlite:translations.db`) and create tables.
    ///
    /// The database file is created when it does not exist yet.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                TranslationError::Store(format!(
                    "Failed to open database at {}: {}",
                    database_url, e
                ))
            })?;

        let db = Self { pool };
        db.create_tables().await?;
        info!("Translation database ready at {}", database_url);
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS translations (
                id TEXT PRIMARY KEY NOT NULL,
                team_id TEXT,
                namespace TEXT NOT NULL,
                key_path TEXT NOT NULL,
                category TEXT NOT NULL,
                translations TEXT NOT NULL,
                description TEXT,
                is_overrideable INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // NULL team ids never collide in a plain UNIQUE index, so key on COALESCE.
        sqlx::query(
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS translations_scope_key
            ON translations (COALESCE(team_id, ''), namespace, key_path)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS teams (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record or rename a team for reporting views.
    pub async fn upsert_team(&self, team_id: &str, name: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO teams (id, name) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
        )
        .bind(team_id)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Total number of rows across both scopes.
    pub async fn entry_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM translations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &EntryFilter) {
    builder.push(" WHERE 1 = 1");
    match &filter.scope {
        ScopeFilter::Any => {}
        ScopeFilter::System => {
            builder.push(" AND team_id IS NULL");
        }
        ScopeFilter::AnyTeam => {
            builder.push(" AND team_id IS NOT NULL");
        }
        ScopeFilter::Team(team) => {
            builder.push(" AND team_id = ").push_bind(team.clone());
        }
    }
    if let Some(namespace) = &filter.namespace {
        builder.push(" AND namespace = ").push_bind(namespace.clone());
    }
    if let Some(key_path) = &filter.key_path {
        builder.push(" AND key_path = ").push_bind(key_path.clone());
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(flag) = filter.is_overrideable {
        builder.push(" AND is_overrideable = ").push_bind(flag);
    }
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            TranslationError::Store(format!("Invalid {} timestamp '{}': {}", column, raw, e))
        })
}

fn entry_from_row(row: &SqliteRow) -> Result<TranslationEntry> {
    let values: String = row.try_get("translations")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(TranslationEntry {
        id: row.try_get("id")?,
        team_id: row.try_get("team_id")?,
        namespace: row.try_get("namespace")?,
        key_path: row.try_get("key_path")?,
        category: row.try_get("category")?,
        values: serde_json::from_str(&values)?,
        description: row.try_get("description")?,
        is_overrideable: row.try_get("is_overrideable")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

fn map_insert_error(err: sqlx::Error, entry: &TranslationEntry) -> TranslationError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => TranslationError::DuplicateKey {
            team_id: entry.team_id.clone(),
            namespace: entry.namespace.clone(),
            key_path: entry.key_path.clone(),
        },
        _ => err.into(),
    }
}

async fn insert_row<'e, E>(executor: E, entry: &TranslationEntry) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let values = serde_json::to_string(&entry.values)?;
    sqlx::query(
        r"
        INSERT INTO translations (id, team_id, namespace, key_path, category, translations,
                                  description, is_overrideable, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ",
    )
    .bind(entry.id.clone())
    .bind(entry.team_id.clone())
    .bind(entry.namespace.clone())
    .bind(entry.key_path.clone())
    .bind(entry.category.clone())
    .bind(values)
    .bind(entry.description.clone())
    .bind(entry.is_overrideable)
    .bind(entry.created_at.to_rfc3339())
    .bind(entry.updated_at.to_rfc3339())
    .execute(executor)
    .await
    .map_err(|e| map_insert_error(e, entry))?;
    Ok(())
}

#[async_trait]
impl EntryStore for Database {
    async fn find(&self, filter: &EntryFilter) -> Result<Vec<TranslationEntry>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY namespace, key_path, team_id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn find_one(
        &self,
        team_id: Option<&str>,
        namespace: &str,
        key_path: &str,
    ) -> Result<Option<TranslationEntry>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        match team_id {
            Some(team) => builder.push(" WHERE team_id = ").push_bind(team.to_string()),
            None => builder.push(" WHERE team_id IS NULL"),
        };
        builder
            .push(" AND namespace = ")
            .push_bind(namespace.to_string())
            .push(" AND key_path = ")
            .push_bind(key_path.to_string());

        let row = builder.build().fetch_optional(&self.pool).await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TranslationEntry>> {
        let row = sqlx::query(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn insert(&self, entry: NewEntry) -> Result<TranslationEntry> {
        let stored = entry.into_entry(new_entry_id(), Utc::now());
        insert_row(&self.pool, &stored).await?;
        Ok(stored)
    }

    async fn insert_batch(&self, entries: Vec<NewEntry>) -> Result<Vec<TranslationEntry>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.into_entry(new_entry_id(), now);
            // Dropping the transaction on error rolls the whole batch back.
            insert_row(&mut *tx, &entry).await?;
            stored.push(entry);
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn update(&self, id: &str, patch: EntryPatch) -> Result<TranslationEntry> {
        let mut entry = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| TranslationError::not_found(id))?;
        patch.apply(&mut entry, Utc::now());

        let values = serde_json::to_string(&entry.values)?;
        let result = sqlx::query(
            r"
            UPDATE translations
            SET translations = ?1, description = ?2, category = ?3,
                is_overrideable = ?4, updated_at = ?5
            WHERE id = ?6
            ",
        )
        .bind(values)
        .bind(&entry.description)
        .bind(&entry.category)
        .bind(entry.is_overrideable)
        .bind(entry.updated_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TranslationError::not_found(id));
        }
        Ok(entry)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM translations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_where(&self, filter: &EntryFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM translations");
        push_filter(&mut builder, filter);
        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TeamDirectory for Database {
    async fn team_name(&self, team_id: &str) -> Result<Option<String>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM teams WHERE id = ?1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::values;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    /// Create a temporary database for testing
    async fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite:{}", temp_dir.path().join("test_translations.db").display());
        let db = Database::new(&url).await.expect("Failed to create database");
        (db, temp_dir)
    }

    // ==================== Schema Tests ====================

    #[tokio::test]
    async fn test_database_creation() {
        let (db, _temp_dir) = create_test_db().await;
        assert_eq!(db.entry_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_database_reopening_keeps_rows() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite:{}", temp_dir.path().join("reopen.db").display());

        {
            let db = Database::new(&url).await.expect("open");
            db.insert(NewEntry::system("buttons.save", values([("en", "Save")])))
                .await
                .expect("insert");
            db.close().await;
        }

        let db = Database::new(&url).await.expect("reopen");
        assert_eq!(db.entry_count().await.expect("count"), 1);
    }

    // ==================== Entry Tests ====================

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let (db, _temp_dir) = create_test_db().await;
        let inserted = db
            .insert(
                NewEntry::system("buttons.save", values([("en", "Save"), ("nl", "Opslaan")]))
                    .with_description("Primary save button"),
            )
            .await
            .expect("insert");

        let found = db.find_by_id(&inserted.id).await.expect("find").expect("row");
        assert_eq!(found, inserted);
        assert_eq!(found.category, "buttons");
        assert!(found.is_overrideable);
    }

    #[tokio::test]
    async fn test_duplicate_system_key_is_rejected() {
        let (db, _temp_dir) = create_test_db().await;
        db.insert(NewEntry::system("buttons.save", values([("en", "Save")])))
            .await
            .expect("first");

        let err = db
            .insert(NewEntry::system("buttons.save", values([("en", "Again")])))
            .await
            .expect_err("duplicate");
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_team_and_system_rows_share_a_key() {
        let (db, _temp_dir) = create_test_db().await;
        db.insert(NewEntry::system("buttons.save", values([("en", "Save")])))
            .await
            .expect("system");
        db.insert(NewEntry::team("t1", "buttons.save", values([("en", "Store")])))
            .await
            .expect("t1");
        db.insert(NewEntry::team("t2", "buttons.save", values([("en", "Keep")])))
            .await
            .expect("t2");

        let err = db
            .insert(NewEntry::team("t1", "buttons.save", values([("en", "Twice")])))
            .await
            .expect_err("duplicate team row");
        assert!(err.is_duplicate());

        let system = db.find_one(None, "ui", "buttons.save").await.expect("find").expect("row");
        assert_eq!(system.value_for("en"), Some("Save"));
        let team = db
            .find_one(Some("t2"), "ui", "buttons.save")
            .await
            .expect("find")
            .expect("row");
        assert_eq!(team.value_for("en"), Some("Keep"));
    }

    #[tokio::test]
    async fn test_find_applies_filters_and_order() {
        let (db, _temp_dir) = create_test_db().await;
        for entry in [
            NewEntry::system("nav.home", values([("en", "Home")])),
            NewEntry::system("buttons.save", values([("en", "Save")])),
            NewEntry::system("legal.terms", values([("en", "Terms")])).overrideable(false),
            NewEntry::team("t1", "buttons.save", values([("en", "Store")])),
            NewEntry::system("buttons.save", values([("en", "Save")])).with_namespace("pos"),
        ] {
            db.insert(entry).await.expect("seed");
        }

        let system_ui = db
            .find(&EntryFilter::system().namespace("ui"))
            .await
            .expect("find");
        let keys: Vec<_> = system_ui.iter().map(|e| e.key_path.as_str()).collect();
        assert_eq!(keys, vec!["buttons.save", "legal.terms", "nav.home"]);

        let locked = db
            .find(&EntryFilter::system().overrideable(false))
            .await
            .expect("find");
        assert_eq!(locked.len(), 1);

        let buttons = db.find(&EntryFilter::default().category("buttons")).await.expect("find");
        assert_eq!(buttons.len(), 3);

        let team = db.find(&EntryFilter::team("t1")).await.expect("find");
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].team_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_insert_batch_rolls_back_on_conflict() {
        let (db, _temp_dir) = create_test_db().await;
        db.insert(NewEntry::system("b", values([("en", "B")])))
            .await
            .expect("seed");

        let err = db
            .insert_batch(vec![
                NewEntry::system("a", values([("en", "A")])),
                NewEntry::system("b", values([("en", "B2")])),
            ])
            .await
            .expect_err("conflict");
        assert!(err.is_duplicate());
        assert_eq!(db.entry_count().await.expect("count"), 1);

        let inserted = db
            .insert_batch(vec![
                NewEntry::system("a", values([("en", "A")])),
                NewEntry::system("c", values([("en", "C")])),
            ])
            .await
            .expect("batch");
        assert_eq!(inserted.len(), 2);
        assert_eq!(db.entry_count().await.expect("count"), 3);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let (db, _temp_dir) = create_test_db().await;
        let entry = db
            .insert(
                NewEntry::system("buttons.save", values([("en", "Save")])).with_description("old"),
            )
            .await
            .expect("insert");

        let patch = EntryPatch {
            values: Some(values([("en", "Save now"), ("fr", "Enregistrer")])),
            description: Some(None),
            is_overrideable: Some(false),
            ..EntryPatch::default()
        };
        let updated = db.update(&entry.id, patch).await.expect("update");
        assert_eq!(updated.value_for("fr"), Some("Enregistrer"));
        assert_eq!(updated.description, None);
        assert!(!updated.is_overrideable);
        assert!(updated.updated_at >= entry.updated_at);

        let reloaded = db.find_by_id(&entry.id).await.expect("find").expect("row");
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_rows() {
        let (db, _temp_dir) = create_test_db().await;
        let err = db
            .update("missing", EntryPatch::values(values([("en", "x")])))
            .await
            .expect_err("missing");
        assert!(matches!(err, TranslationError::NotFound { .. }));
        assert!(!db.delete("missing").await.expect("delete"));
    }

    #[tokio::test]
    async fn test_delete_where_scopes_to_system_namespace() {
        let (db, _temp_dir) = create_test_db().await;
        for entry in [
            NewEntry::system("a", values([("en", "A")])),
            NewEntry::system("b", values([("en", "B")])),
            NewEntry::system("a", values([("en", "A")])).with_namespace("pos"),
            NewEntry::team("t1", "a", values([("en", "Team A")])),
        ] {
            db.insert(entry).await.expect("seed");
        }

        let removed = db
            .delete_where(&EntryFilter::system().namespace("ui"))
            .await
            .expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(db.entry_count().await.expect("count"), 2);
        assert!(db.find_one(Some("t1"), "ui", "a").await.expect("find").is_some());
    }

    #[tokio::test]
    async fn test_find_one_keeps_empty_team_id_apart_from_system() {
        let (db, _temp_dir) = create_test_db().await;
        db.insert(NewEntry::system("buttons.save", values([("en", "Save")])))
            .await
            .expect("system");

        let found = db.find_one(Some(""), "ui", "buttons.save").await.expect("find");
        assert!(found.is_none());

        let system = db.find_one(None, "ui", "buttons.save").await.expect("find");
        assert!(system.is_some_and(|e| e.team_id.is_none()));
    }

    // ==================== Team Directory Tests ====================

    #[tokio::test]
    async fn test_team_names() {
        let (db, _temp_dir) = create_test_db().await;
        assert_eq!(db.team_name("t1").await.expect("lookup"), None);

        db.upsert_team("t1", "Bakery").await.expect("upsert");
        db.upsert_team("t1", "Bakery & Co").await.expect("rename");
        assert_eq!(db.team_name("t1").await.expect("lookup"), Some("Bakery & Co".to_string()));
    }
}
