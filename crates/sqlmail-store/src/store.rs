//! Store construction and account/mailbox management

use crate::db::DatabasePool;
use crate::dialect::Dialect;
use crate::limit::{self, EffectiveLimit, LimitSetting};
use crate::mailbox::Mailbox;
use crate::notify::UpdateSink;
use async_trait::async_trait;
use chrono::Utc;
use sqlmail_common::config::StoreConfig;
use sqlmail_common::types::{AccountId, MailboxId};
use sqlmail_common::{Error, Result};
use sqlx::Row;
use std::sync::Arc;

/// Store-wide options, usually derived from [`StoreConfig`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Mailbox hierarchy delimiter
    pub delimiter: String,
    /// Global default append limit
    pub max_message_bytes: LimitSetting,
    /// Ceiling on messages examined per search call
    pub search_candidates: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            delimiter: ".".to_string(),
            max_message_bytes: LimitSetting::Unset,
            search_candidates: 10_000,
        }
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            delimiter: config.delimiter.clone(),
            max_message_bytes: config.max_message_bytes.into(),
            search_candidates: config.search_candidates,
        }
    }
}

/// Optional capability for backends that store per-mailbox or
/// per-account append limits. A store constructed without it treats
/// both scopes as unset; that is not an error.
#[async_trait]
pub trait AppendLimitOverrides: Send + Sync {
    async fn mailbox_limit(&self, mailbox_id: MailboxId) -> Result<LimitSetting>;
    async fn account_limit(&self, account_id: AccountId) -> Result<LimitSetting>;
}

/// SQL-backed implementation of [`AppendLimitOverrides`].
///
/// A missing row is `Unset`, never a zero-byte ceiling; collapsing
/// the two would reject every append at that scope.
pub struct SqlAppendLimits {
    pool: DatabasePool,
}

impl SqlAppendLimits {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppendLimitOverrides for SqlAppendLimits {
    async fn mailbox_limit(&self, mailbox_id: MailboxId) -> Result<LimitSetting> {
        let row = sqlx::query("SELECT size_limit_set, size_limit FROM mailboxes WHERE id = $1")
            .bind(mailbox_id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(format!("MailboxLimit {}: {}", mailbox_id, e)))?;
        Ok(match row {
            Some(row) => decode_limit(row.get("size_limit_set"), row.get("size_limit")),
            None => LimitSetting::Unset,
        })
    }

    async fn account_limit(&self, account_id: AccountId) -> Result<LimitSetting> {
        let row = sqlx::query("SELECT size_limit_set, size_limit FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(format!("AccountLimit {}: {}", account_id, e)))?;
        Ok(match row {
            Some(row) => decode_limit(row.get("size_limit_set"), row.get("size_limit")),
            None => LimitSetting::Unset,
        })
    }
}

pub(crate) fn decode_limit(set: i64, value: Option<i64>) -> LimitSetting {
    match (set, value) {
        (0, _) => LimitSetting::Unset,
        (_, Some(n)) => LimitSetting::Limited(n as u64),
        (_, None) => LimitSetting::Unlimited,
    }
}

pub(crate) fn encode_limit(limit: LimitSetting) -> (i64, Option<i64>) {
    match limit {
        LimitSetting::Unset => (0, None),
        LimitSetting::Limited(n) => (1, Some(n as i64)),
        LimitSetting::Unlimited => (1, None),
    }
}

/// The mailbox store: owns the pool, the update sink and the
/// store-wide options. Cheap to clone.
#[derive(Clone)]
pub struct SqlStore {
    pub(crate) pool: DatabasePool,
    pub(crate) updates: UpdateSink,
    pub(crate) opts: Arc<StoreOptions>,
    pub(crate) limits: Option<Arc<dyn AppendLimitOverrides>>,
}

impl SqlStore {
    /// Create a store over an initialized pool. Mailbox- and
    /// account-scope append limits are served from the same database
    /// by default.
    pub fn new(pool: DatabasePool, updates: UpdateSink, opts: StoreOptions) -> Self {
        let limits: Arc<dyn AppendLimitOverrides> = Arc::new(SqlAppendLimits::new(pool.clone()));
        Self {
            pool,
            updates,
            opts: Arc::new(opts),
            limits: Some(limits),
        }
    }

    /// Replace the append-limit capability.
    pub fn with_limit_overrides(mut self, overrides: Arc<dyn AppendLimitOverrides>) -> Self {
        self.limits = Some(overrides);
        self
    }

    /// Drop the append-limit capability; mailbox and account scopes
    /// then behave as unset.
    pub fn without_limit_overrides(mut self) -> Self {
        self.limits = None;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    /// Create an account together with its INBOX, in one transaction.
    pub async fn create_account(&self, name: &str) -> Result<AccountId> {
        let name = normalize_account(name);
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| Error::Database(format!("CreateAccount {}: {}", name, e)))?;
        let row = sqlx::query("INSERT INTO accounts (name) VALUES ($1) RETURNING id")
            .bind(&name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| conflict_or_db("CreateAccount", &name, e))?;
        let id: AccountId = row.get("id");
        sqlx::query(
            "INSERT INTO mailboxes (account_id, name, uid_validity) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind("INBOX")
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("CreateAccount {}: {}", name, e)))?;
        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("CreateAccount {}: {}", name, e)))?;
        Ok(id)
    }

    pub async fn account_id(&self, name: &str) -> Result<AccountId> {
        let name = normalize_account(name);
        let row = sqlx::query("SELECT id FROM accounts WHERE name = $1")
            .bind(&name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(format!("AccountId {}: {}", name, e)))?;
        match row {
            Some(row) => Ok(row.get("id")),
            None => Err(Error::NotFound(format!("account {}", name))),
        }
    }

    /// Create a mailbox with a fresh validity epoch and `uid_next = 1`.
    pub async fn create_mailbox(&self, account: &str, name: &str) -> Result<()> {
        let account_id = self.account_id(account).await?;
        let uid_validity = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO mailboxes (account_id, name, uid_validity) VALUES ($1, $2, $3)",
        )
        .bind(account_id)
        .bind(name)
        .bind(uid_validity)
        .execute(self.pool.pool())
        .await
        .map_err(|e| conflict_or_db("CreateMailbox", name, e))?;
        Ok(())
    }

    /// Resolve a mailbox handle by account and name. Mailbox names are
    /// case-sensitive; account names are not.
    pub async fn mailbox(&self, account: &str, name: &str) -> Result<Mailbox> {
        let account = normalize_account(account);
        let row = sqlx::query(
            "SELECT m.id, m.account_id FROM mailboxes m
             JOIN accounts a ON a.id = m.account_id
             WHERE a.name = $1 AND m.name = $2",
        )
        .bind(&account)
        .bind(name)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(format!("Mailbox {}: {}", name, e)))?;
        match row {
            Some(row) => Ok(Mailbox::new(
                self.clone(),
                row.get("id"),
                row.get("account_id"),
                account,
                name.to_string(),
            )),
            None => Err(Error::NotFound(format!("mailbox {}", name))),
        }
    }

    pub async fn list_mailboxes(&self, account: &str, subscribed_only: bool) -> Result<Vec<String>> {
        let account = normalize_account(account);
        let sql = if subscribed_only {
            "SELECT m.name FROM mailboxes m
             JOIN accounts a ON a.id = m.account_id
             WHERE a.name = $1 AND m.subscribed = 1 ORDER BY m.name"
        } else {
            "SELECT m.name FROM mailboxes m
             JOIN accounts a ON a.id = m.account_id
             WHERE a.name = $1 ORDER BY m.name"
        };
        let rows = sqlx::query(sql)
            .bind(&account)
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| Error::Database(format!("ListMailboxes {}: {}", account, e)))?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    /// Delete a mailbox with its messages and flags.
    pub async fn delete_mailbox(&self, account: &str, name: &str) -> Result<()> {
        let mailbox = self.mailbox(account, name).await?;
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| Error::Database(format!("DeleteMailbox {}: {}", name, e)))?;
        for sql in [
            "DELETE FROM flags WHERE mailbox_id = $1",
            "DELETE FROM messages WHERE mailbox_id = $1",
            "DELETE FROM mailboxes WHERE id = $1",
        ] {
            sqlx::query(sql)
                .bind(mailbox.id())
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Database(format!("DeleteMailbox {}: {}", name, e)))?;
        }
        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("DeleteMailbox {}: {}", name, e)))?;
        Ok(())
    }

    /// Set or clear the account-scope append limit.
    pub async fn set_account_limit(&self, account: &str, limit: LimitSetting) -> Result<()> {
        let account_id = self.account_id(account).await?;
        let (set, value) = encode_limit(limit);
        sqlx::query("UPDATE accounts SET size_limit_set = $1, size_limit = $2 WHERE id = $3")
            .bind(set)
            .bind(value)
            .bind(account_id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(format!("SetAccountLimit {}: {}", account, e)))?;
        Ok(())
    }

    /// Resolve the append limit that applies to a mailbox:
    /// mailbox scope, then account scope, then the global default.
    pub(crate) async fn effective_limit(
        &self,
        mailbox_id: MailboxId,
        account_id: AccountId,
    ) -> Result<EffectiveLimit> {
        let (mailbox, account) = match &self.limits {
            Some(limits) => (
                limits.mailbox_limit(mailbox_id).await?,
                limits.account_limit(account_id).await?,
            ),
            None => (LimitSetting::Unset, LimitSetting::Unset),
        };
        Ok(limit::resolve(mailbox, account, self.opts.max_message_bytes))
    }
}

/// Account names are case-insensitive: the lowercased form is what is
/// stored and what every lookup matches against.
fn normalize_account(name: &str) -> String {
    name.trim().to_lowercase()
}

fn conflict_or_db(op: &str, ctx: &str, e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return Error::AlreadyExists(ctx.to_string());
        }
    }
    Error::Database(format!("{} {}: {}", op, ctx, e))
}
