//! Database operations

use std::path::PathBuf;

use rdx_core::{AuditRecord, RuleKey, RulePattern};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use time::OffsetDateTime;

use crate::models::{NewRule, RuleRecord};
use crate::{Result, StorageError};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS redaction_rules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document_id TEXT,
        document_type TEXT NOT NULL,
        document_subtype TEXT,
        tenant_id TEXT,
        pattern TEXT NOT NULL,
        replacement TEXT NOT NULL,
        priority INTEGER NOT NULL DEFAULT 0,
        is_regex INTEGER NOT NULL DEFAULT 0,
        is_global INTEGER NOT NULL DEFAULT 1,
        case_sensitive INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_redaction_rules_lookup
        ON redaction_rules (document_type, document_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS redaction_activity (
        id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        version_id TEXT,
        requester_token_id TEXT,
        content_type TEXT NOT NULL,
        patterns_applied INTEGER NOT NULL,
        matches_found INTEGER NOT NULL,
        execution_time_ms INTEGER NOT NULL,
        requester_ip TEXT,
        requester_user_agent TEXT,
        occurred_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audit_trail (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        action TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        actor TEXT,
        details TEXT NOT NULL,
        ip_address TEXT,
        user_agent TEXT,
        occurred_at INTEGER NOT NULL
    )
    "#,
];

const RULE_COLUMNS: &str = "id, document_id, document_type, document_subtype, tenant_id, \
     pattern, replacement, priority, is_regex, is_global, case_sensitive, is_active, created_at";

/// Main storage interface. Cheap to clone (shares the pool).
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (or create) the database at `db_path`, defaulting to the
    /// project data directory
    pub async fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "Opened rule store");
        Self::with_pool(pool).await
    }

    /// Private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "rdx", "rdx") {
            dirs.data_dir().join("rdx.db")
        } else {
            std::env::temp_dir().join("rdx").join("rdx.db")
        }
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    pub async fn add_rule(&self, rule: &NewRule) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO redaction_rules (document_id, document_type, document_subtype, tenant_id, \
             pattern, replacement, priority, is_regex, is_global, case_sensitive, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&rule.document_id)
        .bind(&rule.document_type)
        .bind(&rule.document_subtype)
        .bind(&rule.tenant_id)
        .bind(&rule.rule.pattern)
        .bind(&rule.rule.replacement)
        .bind(rule.rule.priority)
        .bind(rule.rule.is_regex)
        .bind(rule.rule.is_global)
        .bind(rule.rule.case_sensitive)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Active rules for a key, ordered by priority then insertion order
    pub async fn rules_for(&self, key: &RuleKey) -> Result<Vec<RulePattern>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM redaction_rules \
             WHERE is_active = 1 \
               AND document_type = ?1 \
               AND (document_id IS NULL OR document_id = ?2) \
               AND (document_subtype IS NULL OR document_subtype = ?3) \
               AND (tenant_id IS NULL OR tenant_id = ?4) \
             ORDER BY priority ASC, id ASC"
        );

        let rows = sqlx::query(&sql)
            .bind(&key.document_type)
            .bind(&key.document_id)
            .bind(&key.document_subtype)
            .bind(&key.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row_to_rule(row).map(|record| record.rule))
            .collect()
    }

    pub async fn list_rules(&self, document_type: Option<&str>) -> Result<Vec<RuleRecord>> {
        let rows = match document_type {
            Some(doc_type) => {
                let sql = format!(
                    "SELECT {RULE_COLUMNS} FROM redaction_rules WHERE document_type = ? \
                     ORDER BY priority ASC, id ASC"
                );
                sqlx::query(&sql)
                    .bind(doc_type)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {RULE_COLUMNS} FROM redaction_rules \
                     ORDER BY document_type ASC, priority ASC, id ASC"
                );
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(row_to_rule).collect()
    }

    /// Soft-delete a rule so it is no longer resolved
    pub async fn deactivate_rule(&self, id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE redaction_rules SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::RuleNotFound(id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    pub async fn record_activity(&self, record: &AuditRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO redaction_activity (id, document_id, version_id, requester_token_id, \
             content_type, patterns_applied, matches_found, execution_time_ms, requester_ip, \
             requester_user_agent, occurred_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.document_id)
        .bind(&record.version_id)
        .bind(&record.requester_token_id)
        .bind(&record.content_type)
        .bind(record.patterns_applied as i64)
        .bind(record.matches_found as i64)
        .bind(record.execution_time_ms as i64)
        .bind(&record.requester_ip)
        .bind(&record.requester_user_agent)
        .bind(record.occurred_at.unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn record_audit_trail(&self, action: &str, record: &AuditRecord) -> Result<()> {
        let details = serde_json::json!({
            "activity_id": record.id,
            "version_id": record.version_id,
            "content_type": record.content_type,
            "patterns_applied": record.patterns_applied,
            "matches_found": record.matches_found,
            "execution_time_ms": record.execution_time_ms,
        });

        sqlx::query(
            "INSERT INTO audit_trail (action, entity_id, actor, details, ip_address, user_agent, \
             occurred_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(action)
        .bind(&record.document_id)
        .bind(&record.requester_token_id)
        .bind(details.to_string())
        .bind(&record.requester_ip)
        .bind(&record.requester_user_agent)
        .bind(record.occurred_at.unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Redaction activity for a document, oldest first
    pub async fn activity_for(&self, document_id: &str) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(
            "SELECT id, document_id, version_id, requester_token_id, content_type, \
             patterns_applied, matches_found, execution_time_ms, requester_ip, \
             requester_user_agent, occurred_at \
             FROM redaction_activity WHERE document_id = ? ORDER BY occurred_at ASC, rowid ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_activity).collect()
    }

    pub async fn audit_trail_count(&self, document_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM audit_trail WHERE entity_id = ?")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

fn timestamp(secs: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| StorageError::Other(anyhow::anyhow!("invalid timestamp {secs}: {e}")))
}

fn row_to_rule(row: &SqliteRow) -> Result<RuleRecord> {
    Ok(RuleRecord {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        document_type: row.try_get("document_type")?,
        document_subtype: row.try_get("document_subtype")?,
        tenant_id: row.try_get("tenant_id")?,
        rule: RulePattern {
            pattern: row.try_get("pattern")?,
            replacement: row.try_get("replacement")?,
            priority: row.try_get("priority")?,
            is_regex: row.try_get("is_regex")?,
            is_global: row.try_get("is_global")?,
            case_sensitive: row.try_get("case_sensitive")?,
        },
        is_active: row.try_get("is_active")?,
        created_at: timestamp(row.try_get("created_at")?)?,
    })
}

fn row_to_activity(row: &SqliteRow) -> Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        version_id: row.try_get("version_id")?,
        requester_token_id: row.try_get("requester_token_id")?,
        content_type: row.try_get("content_type")?,
        patterns_applied: row.try_get::<i64, _>("patterns_applied")? as usize,
        matches_found: row.try_get::<i64, _>("matches_found")? as usize,
        execution_time_ms: row.try_get::<i64, _>("execution_time_ms")? as u64,
        requester_ip: row.try_get("requester_ip")?,
        requester_user_agent: row.try_get("requester_user_agent")?,
        occurred_at: timestamp(row.try_get("occurred_at")?)?,
    })
}
