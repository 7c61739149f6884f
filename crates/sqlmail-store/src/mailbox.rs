//! Mailbox operations
//!
//! Every public mutating operation is one database transaction,
//! rolled back on every exit path unless explicitly committed.
//! Notification events are buffered in memory and handed to the
//! update sink strictly after a successful commit; a failed operation
//! never publishes anything.

use crate::codec::{self, LazyEntity};
use crate::flags::{FlagOp, FlagSetEngine, RECENT, SEEN};
use crate::limit::{EffectiveLimit, LimitSetting};
use crate::models::{
    BodySection, BodyStructure, Envelope, FetchItem, FetchedMessage, MailboxInfo, MailboxStatus,
    StatusItem, ATTR_HAS_CHILDREN, ATTR_HAS_NO_CHILDREN, ATTR_MARKED, ATTR_UNMARKED,
};
use crate::notify::UpdateEvent;
use crate::search::SearchCriteria;
use crate::sequence::{self, NumKind, NumSet};
use crate::store::{encode_limit, SqlStore};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mail_parser::Message;
use sqlmail_common::types::{AccountId, MailboxId, Uid};
use sqlmail_common::{Error, Result};
use sqlx::{Any, AnyConnection, Row, Transaction};
use tokio::sync::mpsc;
use tracing::warn;

/// Handle to one mailbox of one account.
#[derive(Clone)]
pub struct Mailbox {
    store: SqlStore,
    id: MailboxId,
    account_id: AccountId,
    account: String,
    name: String,
}

impl Mailbox {
    pub(crate) fn new(
        store: SqlStore,
        id: MailboxId,
        account_id: AccountId,
        account: String,
        name: String,
    ) -> Self {
        Self {
            store,
            id,
            account_id,
            account,
            name,
        }
    }

    pub fn id(&self) -> MailboxId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Store a message literal with the given flags and internal date.
    /// Returns the assigned permanent identifier.
    ///
    /// The message is rejected before any transaction is opened when
    /// it exceeds the resolved append limit. The `\Recent` marker is
    /// added automatically unless the caller already supplied it.
    pub async fn append(
        &self,
        flags: &[String],
        date: DateTime<Utc>,
        literal: &[u8],
    ) -> Result<Uid> {
        let effective = self
            .store
            .effective_limit(self.id, self.account_id)
            .await?;
        let size = literal.len() as u64;
        if !effective.accepts(size) {
            let limit = match effective {
                EffectiveLimit::Limited(n) => n,
                EffectiveLimit::Unlimited => u64::MAX,
            };
            return Err(Error::LimitExceeded { size, limit });
        }

        let mut tx = self.begin("Append").await?;

        let row = sqlx::query(
            "UPDATE mailboxes SET uid_next = uid_next + 1
             WHERE id = $1 RETURNING uid_next - 1 AS uid",
        )
        .bind(self.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| self.db_err("Append (uid reserve)", e))?;
        let uid: i64 = row.get("uid");

        let (header, body) = codec::split(literal);
        sqlx::query(
            "INSERT INTO messages
             (mailbox_id, uid, internal_date, header_len, header, body_len, body, marked_for_removal)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0)",
        )
        .bind(self.id)
        .bind(uid)
        .bind(date.timestamp())
        .bind(header.len() as i64)
        .bind(header.to_vec())
        .bind(body.len() as i64)
        .bind(body.to_vec())
        .execute(&mut *tx)
        .await
        .map_err(|e| self.db_err("Append (insert)", e))?;

        let mut all_flags = flags.to_vec();
        if !all_flags.iter().any(|f| f == RECENT) {
            all_flags.push(RECENT.to_string());
        }
        self.engine()
            .add(&mut tx, self.id, uid, uid, &all_flags)
            .await
            .map_err(|e| self.db_err("Append (flags)", e))?;

        let (messages, recent) = self
            .counts(&mut tx, self.id)
            .await
            .map_err(|e| self.db_err("Append (counts)", e))?;

        tx.commit()
            .await
            .map_err(|e| self.db_err("Append (commit)", e))?;

        self.store
            .updates
            .publish(vec![self.status_event(messages, recent)])
            .await;
        Ok(uid as Uid)
    }

    /// Stream the requested projections for every message in the
    /// range set. Results are sent to `out` one row at a time; a
    /// dropped receiver ends the stream without error. The MIME
    /// entity of a row is parsed at most once, and a parse failure
    /// degrades the affected projections instead of failing the row.
    pub async fn list(
        &self,
        set: &NumSet,
        items: &[FetchItem],
        out: &mpsc::Sender<FetchedMessage>,
    ) -> Result<()> {
        let needs_body = items.iter().any(FetchItem::needs_body);
        // Position resolution and the row fetch must see the same
        // snapshot; a concurrent expunge committing between the two
        // statements would otherwise shift ranks under a positional
        // range after its UID bounds were frozen.
        let mut tx = self.begin("List").await?;
        let bounds = sequence::resolve_uid_bounds(&mut tx, self.id, set)
            .await
            .map_err(|e| self.db_err("List (resolve)", e))?;

        let sql = self.fetch_query(needs_body, true);
        for (lo, hi) in bounds {
            let mut rows = sqlx::query(&sql)
                .bind(self.id)
                .bind(lo)
                .bind(hi)
                .fetch(&mut *tx);
            while let Some(row) = rows
                .try_next()
                .await
                .map_err(|e| self.db_err("List", e))?
            {
                let msg = project_row(&row, items, needs_body);
                if out.send(msg).await.is_err() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Evaluate conjunctive search criteria over the mailbox and
    /// return matching UIDs or sequence numbers per `kind`.
    ///
    /// At most `search_candidates` messages are examined per call;
    /// results over larger mailboxes are truncated with a warning.
    pub async fn search(&self, criteria: &SearchCriteria, kind: NumKind) -> Result<Vec<u32>> {
        let ceiling = self.store.opts.search_candidates;
        let mut conn = self
            .store
            .pool
            .pool()
            .acquire()
            .await
            .map_err(|e| self.db_err("Search (acquire)", e))?;

        let sql = format!("{} LIMIT $2", self.fetch_query(true, false));
        let mut rows = sqlx::query(&sql)
            .bind(self.id)
            .bind((ceiling + 1) as i64)
            .fetch(&mut *conn);

        let mut results = Vec::new();
        let mut scanned = 0usize;
        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| self.db_err("Search", e))?
        {
            scanned += 1;
            if scanned > ceiling {
                warn!(
                    mailbox = %self.name,
                    ceiling,
                    "search candidate ceiling reached, results truncated"
                );
                break;
            }

            let seqnum = row.get::<i64, _>("seqnum") as u32;
            let uid = row.get::<i64, _>("uid") as u32;
            if !criteria.matches_ids(seqnum, uid) {
                continue;
            }
            let flags = split_flags(row.get("flags"));
            if !criteria.matches_flags(&flags) {
                continue;
            }
            let date = DateTime::from_timestamp(row.get::<i64, _>("internal_date"), 0)
                .unwrap_or_default();
            if !criteria.matches_date(date) {
                continue;
            }

            let header: Vec<u8> = row.get("header");
            let body: Vec<u8> = row.get("body");
            let mut raw = header;
            raw.extend_from_slice(&body);
            let body_off = raw.len() - body.len();
            let mut entity = LazyEntity::new(&raw);
            if !criteria.matches_content(&mut entity, &raw, &raw[body_off..]) {
                continue;
            }

            results.push(match kind {
                NumKind::Uid => uid,
                NumKind::Seq => seqnum,
            });
        }
        Ok(results)
    }

    /// Apply a flag mutation to the range set. `\Recent` is stripped
    /// from the request; `Set` clears and re-adds within the same
    /// transaction. One `MessageFlags` event per affected position is
    /// published after commit, carrying the resulting flag set.
    pub async fn update_flags(&self, set: &NumSet, op: FlagOp, flags: &[String]) -> Result<()> {
        let flags = FlagSetEngine::sanitize(flags);
        let mut tx = self.begin("UpdateFlags").await?;
        let bounds = sequence::resolve_uid_bounds(&mut tx, self.id, set)
            .await
            .map_err(|e| self.db_err("UpdateFlags (resolve)", e))?;

        let engine = self.engine();
        for (lo, hi) in &bounds {
            engine
                .apply(&mut tx, self.id, *lo, *hi, op, &flags)
                .await
                .map_err(|e| self.db_err("UpdateFlags", e))?;
        }

        // Re-read the resulting flag sets while still inside the
        // transaction so the buffered events match the committed state.
        let mut events = Vec::new();
        let sql = format!(
            "SELECT t.seqnum, t.flags FROM (
                SELECT m.uid AS uid,
                       ROW_NUMBER() OVER (ORDER BY m.uid) AS seqnum,
                       (SELECT {} FROM flags f
                        WHERE f.mailbox_id = m.mailbox_id AND f.uid = m.uid) AS flags
                FROM messages m WHERE m.mailbox_id = $1
            ) t WHERE t.uid BETWEEN $2 AND $3 ORDER BY t.uid",
            self.store.dialect().flags_concat(),
        );
        for (lo, hi) in &bounds {
            let rows = sqlx::query(&sql)
                .bind(self.id)
                .bind(*lo)
                .bind(*hi)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| self.db_err("UpdateFlags (readback)", e))?;
            for row in rows {
                events.push(UpdateEvent::MessageFlags {
                    account: self.account.clone(),
                    mailbox: self.name.clone(),
                    seqnum: row.get::<i64, _>("seqnum") as u32,
                    flags: split_flags(row.get("flags")),
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| self.db_err("UpdateFlags (commit)", e))?;
        self.store.updates.publish(events).await;
        Ok(())
    }

    /// Copy the range set into another mailbox of the same account.
    /// Copies are stamped `\Recent` regardless of source flags. Fails
    /// atomically with `NotFound` when the destination is missing.
    pub async fn copy_to(&self, set: &NumSet, dest: &str) -> Result<()> {
        let mut tx = self.begin("Copy").await?;
        let bounds = sequence::resolve_uid_bounds(&mut tx, self.id, set)
            .await
            .map_err(|e| self.db_err("Copy (resolve)", e))?;
        let mut events = Vec::new();
        self.copy_range(&mut tx, &bounds, dest, &mut events).await?;
        tx.commit()
            .await
            .map_err(|e| self.db_err("Copy (commit)", e))?;
        self.store.updates.publish(events).await;
        Ok(())
    }

    /// Copy the range set into another mailbox, then run the delete
    /// protocol against the source range, all in one transaction.
    pub async fn move_to(&self, set: &NumSet, dest: &str) -> Result<()> {
        let mut tx = self.begin("Move").await?;
        let bounds = sequence::resolve_uid_bounds(&mut tx, self.id, set)
            .await
            .map_err(|e| self.db_err("Move (resolve)", e))?;
        let mut events = Vec::new();
        self.copy_range(&mut tx, &bounds, dest, &mut events).await?;
        self.mark_bounds(&mut tx, &bounds)
            .await
            .map_err(|e| self.db_err("Move (mark)", e))?;
        let seqnums = self
            .sweep(&mut tx)
            .await
            .map_err(|e| self.db_err("Move (sweep)", e))?;
        tx.commit()
            .await
            .map_err(|e| self.db_err("Move (commit)", e))?;

        events.extend(seqnums.into_iter().map(|seqnum| UpdateEvent::Expunge {
            account: self.account.clone(),
            mailbox: self.name.clone(),
            seqnum,
        }));
        self.store.updates.publish(events).await;
        Ok(())
    }

    /// Phase one of the two-phase delete protocol: set the removal
    /// mark on the targeted rows. Positions are not renumbered and no
    /// event is published; the sweep happens in [`Mailbox::expunge`].
    pub async fn delete(&self, set: &NumSet) -> Result<()> {
        let mut tx = self.begin("Delete").await?;
        let bounds = sequence::resolve_uid_bounds(&mut tx, self.id, set)
            .await
            .map_err(|e| self.db_err("Delete (resolve)", e))?;
        self.mark_bounds(&mut tx, &bounds)
            .await
            .map_err(|e| self.db_err("Delete", e))?;
        tx.commit()
            .await
            .map_err(|e| self.db_err("Delete (commit)", e))?;
        Ok(())
    }

    /// Phase two: physically remove every marked message. Positions
    /// of the removed messages are captured in descending order while
    /// the rows are still present, so a client processing the
    /// resulting notifications sequentially never sees its remaining
    /// positions invalidated mid-stream.
    pub async fn expunge(&self) -> Result<()> {
        let mut tx = self.begin("Expunge").await?;
        let seqnums = self
            .sweep(&mut tx)
            .await
            .map_err(|e| self.db_err("Expunge", e))?;
        tx.commit()
            .await
            .map_err(|e| self.db_err("Expunge (commit)", e))?;

        let events = seqnums
            .into_iter()
            .map(|seqnum| UpdateEvent::Expunge {
                account: self.account.clone(),
                mailbox: self.name.clone(),
                seqnum,
            })
            .collect();
        self.store.updates.publish(events).await;
        Ok(())
    }

    /// Read-only aggregation of the requested counters, one
    /// consistent snapshot.
    pub async fn status(&self, items: &[StatusItem]) -> Result<MailboxStatus> {
        let mut tx = self.begin("Status").await?;
        let mut status = MailboxStatus {
            name: self.name.clone(),
            ..Default::default()
        };

        for item in items {
            match item {
                StatusItem::Messages => {
                    let (messages, _) = self
                        .counts(&mut tx, self.id)
                        .await
                        .map_err(|e| self.db_err("Status (messages)", e))?;
                    status.messages = Some(messages);
                }
                StatusItem::Recent => {
                    let (_, recent) = self
                        .counts(&mut tx, self.id)
                        .await
                        .map_err(|e| self.db_err("Status (recent)", e))?;
                    status.recent = Some(recent);
                }
                StatusItem::Unseen => {
                    let row = sqlx::query(
                        "SELECT t.seqnum FROM (
                            SELECT uid, ROW_NUMBER() OVER (ORDER BY uid) AS seqnum
                            FROM messages WHERE mailbox_id = $1
                        ) t
                        WHERE NOT EXISTS (
                            SELECT 1 FROM flags f
                            WHERE f.mailbox_id = $2 AND f.uid = t.uid AND f.flag = $3
                        )
                        ORDER BY t.seqnum LIMIT 1",
                    )
                    .bind(self.id)
                    .bind(self.id)
                    .bind(SEEN)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| self.db_err("Status (unseen)", e))?;
                    status.first_unseen = row.map(|r| r.get::<i64, _>("seqnum") as u32);
                }
                StatusItem::UidNext | StatusItem::UidValidity => {
                    let row = sqlx::query(
                        "SELECT uid_next, uid_validity FROM mailboxes WHERE id = $1",
                    )
                    .bind(self.id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| self.db_err("Status (uid)", e))?;
                    match item {
                        StatusItem::UidNext => {
                            status.uid_next = Some(row.get::<i64, _>("uid_next") as u32)
                        }
                        _ => {
                            status.uid_validity =
                                Some(row.get::<i64, _>("uid_validity") as u32)
                        }
                    }
                }
                StatusItem::AppendLimit => {
                    if let Some(limits) = &self.store.limits {
                        status.append_limit = Some(limits.mailbox_limit(self.id).await?);
                    }
                }
            }
        }
        // Read-only; the implicit rollback on drop is fine.
        Ok(status)
    }

    /// Static attributes for listing: marked state and whether child
    /// mailboxes exist under the hierarchy delimiter.
    pub async fn info(&self) -> Result<MailboxInfo> {
        let delimiter = self.store.opts.delimiter.clone();
        let mut attributes = Vec::new();

        let row = sqlx::query("SELECT marked FROM mailboxes WHERE id = $1")
            .bind(self.id)
            .fetch_one(self.store.pool.pool())
            .await
            .map_err(|e| self.db_err("Info", e))?;
        let marked: i64 = row.get("marked");
        attributes.push(if marked == 1 { ATTR_MARKED } else { ATTR_UNMARKED }.to_string());

        let pattern = format!(
            "{}{}%",
            like_escape(&self.name),
            like_escape(&delimiter)
        );
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM mailboxes
             WHERE account_id = $1 AND name LIKE $2 ESCAPE '\\'",
        )
        .bind(self.account_id)
        .bind(&pattern)
        .fetch_one(self.store.pool.pool())
        .await
        .map_err(|e| self.db_err("Info (children)", e))?;
        let children: i64 = row.get("n");
        attributes.push(
            if children != 0 {
                ATTR_HAS_CHILDREN
            } else {
                ATTR_HAS_NO_CHILDREN
            }
            .to_string(),
        );

        Ok(MailboxInfo {
            name: self.name.clone(),
            delimiter,
            attributes,
        })
    }

    pub async fn set_subscribed(&self, subscribed: bool) -> Result<()> {
        sqlx::query("UPDATE mailboxes SET subscribed = $1 WHERE id = $2")
            .bind(subscribed as i64)
            .bind(self.id)
            .execute(self.store.pool.pool())
            .await
            .map_err(|e| self.db_err("SetSubscribed", e))?;
        Ok(())
    }

    /// Set by external events such as new mail delivery; surfaced as
    /// the `\Marked` attribute.
    pub async fn set_marked(&self, marked: bool) -> Result<()> {
        sqlx::query("UPDATE mailboxes SET marked = $1 WHERE id = $2")
            .bind(marked as i64)
            .bind(self.id)
            .execute(self.store.pool.pool())
            .await
            .map_err(|e| self.db_err("SetMarked", e))?;
        Ok(())
    }

    /// Set or clear the mailbox-scope append limit.
    pub async fn set_size_limit(&self, limit: LimitSetting) -> Result<()> {
        let (set, value) = encode_limit(limit);
        sqlx::query("UPDATE mailboxes SET size_limit_set = $1, size_limit = $2 WHERE id = $3")
            .bind(set)
            .bind(value)
            .bind(self.id)
            .execute(self.store.pool.pool())
            .await
            .map_err(|e| self.db_err("SetSizeLimit", e))?;
        Ok(())
    }

    async fn begin(&self, op: &str) -> Result<Transaction<'static, Any>> {
        self.store
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| self.db_err(&format!("{} (tx begin)", op), e))
    }

    fn engine(&self) -> FlagSetEngine {
        FlagSetEngine::new(self.store.dialect())
    }

    fn db_err(&self, op: &str, e: sqlx::Error) -> Error {
        Error::Database(format!("{} {}: {}", op, self.name, e))
    }

    fn status_event(&self, messages: u32, recent: u32) -> UpdateEvent {
        UpdateEvent::MailboxStatus {
            account: self.account.clone(),
            mailbox: self.name.clone(),
            messages,
            recent,
        }
    }

    async fn counts(
        &self,
        conn: &mut AnyConnection,
        mailbox_id: MailboxId,
    ) -> sqlx::Result<(u32, u32)> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE mailbox_id = $1")
            .bind(mailbox_id)
            .fetch_one(&mut *conn)
            .await?;
        let messages: i64 = row.get("n");
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM flags WHERE mailbox_id = $1 AND flag = $2")
                .bind(mailbox_id)
                .bind(RECENT)
                .fetch_one(&mut *conn)
                .await?;
        let recent: i64 = row.get("n");
        Ok((messages as u32, recent as u32))
    }

    /// The shared row query: windowed sequence numbers over the whole
    /// mailbox plus the flag set joined into one string. With
    /// `bounded`, rows are restricted to a UID range via `$2`/`$3`.
    fn fetch_query(&self, with_body: bool, bounded: bool) -> String {
        let body_cols = if with_body { ", m.header, m.body" } else { "" };
        let outer_body_cols = if with_body { ", t.header, t.body" } else { "" };
        let predicate = if bounded {
            "WHERE t.uid BETWEEN $2 AND $3 ORDER BY t.uid"
        } else {
            "ORDER BY t.seqnum"
        };
        format!(
            "SELECT t.seqnum, t.uid, t.internal_date, t.header_len, t.body_len{outer_body_cols}, t.flags
             FROM (
                SELECT m.uid AS uid, m.internal_date, m.header_len, m.body_len{body_cols},
                       ROW_NUMBER() OVER (ORDER BY m.uid) AS seqnum,
                       (SELECT {concat} FROM flags f
                        WHERE f.mailbox_id = m.mailbox_id AND f.uid = m.uid) AS flags
                FROM messages m WHERE m.mailbox_id = $1
             ) t {predicate}",
            concat = self.store.dialect().flags_concat(),
        )
    }

    async fn copy_range(
        &self,
        tx: &mut Transaction<'static, Any>,
        bounds: &[(i64, i64)],
        dest: &str,
        events: &mut Vec<UpdateEvent>,
    ) -> Result<()> {
        let row = sqlx::query("SELECT id FROM mailboxes WHERE account_id = $1 AND name = $2")
            .bind(self.account_id)
            .bind(dest)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| self.db_err("Copy (dest lookup)", e))?;
        let dest_id: i64 = match row {
            Some(row) => row.get("id"),
            None => return Err(Error::NotFound(format!("mailbox {}", dest))),
        };

        for (lo, hi) in bounds {
            // Clamp to the UIDs actually present so that a copy into
            // the same mailbox with an open-ended range cannot see its
            // own freshly inserted rows.
            let row = sqlx::query(
                "SELECT COUNT(*) AS n, MIN(uid) AS lo, MAX(uid) AS hi
                 FROM messages WHERE mailbox_id = $1 AND uid BETWEEN $2 AND $3",
            )
            .bind(self.id)
            .bind(*lo)
            .bind(*hi)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| self.db_err("Copy (count)", e))?;
            let n: i64 = row.get("n");
            if n == 0 {
                continue;
            }
            let src_lo = row.get::<Option<i64>, _>("lo").unwrap_or(*lo);
            let src_hi = row.get::<Option<i64>, _>("hi").unwrap_or(*hi);

            let row = sqlx::query(
                "UPDATE mailboxes SET uid_next = uid_next + $1
                 WHERE id = $2 RETURNING uid_next",
            )
            .bind(n)
            .bind(dest_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| self.db_err("Copy (uid reserve)", e))?;
            let base: i64 = row.get::<i64, _>("uid_next") - n;

            sqlx::query(
                "INSERT INTO messages
                 (mailbox_id, uid, internal_date, header_len, header, body_len, body, marked_for_removal)
                 SELECT $1, $2 + src.rn - 1, src.internal_date,
                        src.header_len, src.header, src.body_len, src.body, 0
                 FROM (
                    SELECT uid, internal_date, header_len, header, body_len, body,
                           ROW_NUMBER() OVER (ORDER BY uid) AS rn
                    FROM messages WHERE mailbox_id = $3 AND uid BETWEEN $4 AND $5
                 ) src",
            )
            .bind(dest_id)
            .bind(base)
            .bind(self.id)
            .bind(src_lo)
            .bind(src_hi)
            .execute(&mut **tx)
            .await
            .map_err(|e| self.db_err("Copy (messages)", e))?;

            sqlx::query(
                "INSERT INTO flags (mailbox_id, uid, flag)
                 SELECT $1, $2 + src.rn - 1, f.flag
                 FROM (
                    SELECT uid, ROW_NUMBER() OVER (ORDER BY uid) AS rn
                    FROM messages WHERE mailbox_id = $3 AND uid BETWEEN $4 AND $5
                 ) src
                 JOIN flags f ON f.mailbox_id = $6 AND f.uid = src.uid",
            )
            .bind(dest_id)
            .bind(base)
            .bind(self.id)
            .bind(src_lo)
            .bind(src_hi)
            .bind(self.id)
            .execute(&mut **tx)
            .await
            .map_err(|e| self.db_err("Copy (flags)", e))?;

            // Every copy is recent in the destination, independent of
            // its source flags.
            let sql = format!(
                "INSERT INTO flags (mailbox_id, uid, flag)
                 SELECT $1, uid, '\\Recent' FROM messages
                 WHERE mailbox_id = $2 AND uid BETWEEN $3 AND $4
                 {}",
                self.store.dialect().insert_ignore(),
            );
            sqlx::query(&sql)
                .bind(dest_id)
                .bind(dest_id)
                .bind(base)
                .bind(base + n - 1)
                .execute(&mut **tx)
                .await
                .map_err(|e| self.db_err("Copy (recent)", e))?;
        }

        let (messages, recent) = self
            .counts(tx, dest_id)
            .await
            .map_err(|e| self.db_err("Copy (counts)", e))?;
        events.push(UpdateEvent::MailboxStatus {
            account: self.account.clone(),
            mailbox: dest.to_string(),
            messages,
            recent,
        });
        Ok(())
    }

    async fn mark_bounds(
        &self,
        tx: &mut Transaction<'static, Any>,
        bounds: &[(i64, i64)],
    ) -> sqlx::Result<()> {
        for (lo, hi) in bounds {
            sqlx::query(
                "UPDATE messages SET marked_for_removal = 1
                 WHERE mailbox_id = $1 AND uid BETWEEN $2 AND $3",
            )
            .bind(self.id)
            .bind(*lo)
            .bind(*hi)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Capture the positions of all marked messages in descending
    /// order while the rows still exist, then remove the rows and
    /// their flags.
    async fn sweep(&self, tx: &mut Transaction<'static, Any>) -> sqlx::Result<Vec<u32>> {
        let rows = sqlx::query(
            "SELECT t.seqnum FROM (
                SELECT uid, marked_for_removal,
                       ROW_NUMBER() OVER (ORDER BY uid) AS seqnum
                FROM messages WHERE mailbox_id = $1
             ) t WHERE t.marked_for_removal = 1 ORDER BY t.seqnum DESC",
        )
        .bind(self.id)
        .fetch_all(&mut **tx)
        .await?;
        let seqnums: Vec<u32> = rows
            .iter()
            .map(|r| r.get::<i64, _>("seqnum") as u32)
            .collect();

        sqlx::query(
            "DELETE FROM flags WHERE mailbox_id = $1 AND uid IN (
                SELECT uid FROM messages WHERE mailbox_id = $2 AND marked_for_removal = 1
             )",
        )
        .bind(self.id)
        .bind(self.id)
        .execute(&mut **tx)
        .await?;
        sqlx::query("DELETE FROM messages WHERE mailbox_id = $1 AND marked_for_removal = 1")
            .bind(self.id)
            .execute(&mut **tx)
            .await?;

        Ok(seqnums)
    }
}

/// Escape LIKE metacharacters so a mailbox name matches literally
/// inside a prefix pattern.
fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn split_flags(joined: Option<String>) -> Vec<String> {
    match joined {
        // { is not a legal flag character, so it is safe as the
        // aggregate separator.
        Some(joined) if !joined.is_empty() => {
            joined.split('{').map(str::to_string).collect()
        }
        _ => Vec::new(),
    }
}

fn project_row(row: &sqlx::any::AnyRow, items: &[FetchItem], with_body: bool) -> FetchedMessage {
    let seqnum = row.get::<i64, _>("seqnum") as u32;
    let uid = row.get::<i64, _>("uid") as u32;
    let date: i64 = row.get("internal_date");
    let header_len = row.get::<i64, _>("header_len") as u32;
    let body_len = row.get::<i64, _>("body_len") as u32;
    let flags_joined: Option<String> = row.get("flags");

    let (raw, body_off) = if with_body {
        let header: Vec<u8> = row.get("header");
        let body: Vec<u8> = row.get("body");
        let off = header.len();
        let mut raw = header;
        raw.extend_from_slice(&body);
        (raw, off)
    } else {
        (Vec::new(), 0)
    };
    let mut entity = LazyEntity::new(&raw);

    let mut result = FetchedMessage {
        seqnum,
        uid,
        ..Default::default()
    };

    for item in items {
        match item {
            FetchItem::Flags => {
                result.flags = Some(split_flags(flags_joined.clone()));
            }
            FetchItem::InternalDate => {
                result.internal_date = DateTime::from_timestamp(date, 0);
            }
            FetchItem::Size => {
                result.size = Some(header_len + body_len);
            }
            FetchItem::Uid => {
                // Always populated on the record.
            }
            FetchItem::Envelope => {
                result.envelope = Some(match entity.get() {
                    Some(message) => envelope_from(message),
                    None => Envelope::default(),
                });
            }
            FetchItem::BodyStructure => {
                let lines = raw[body_off..].iter().filter(|b| **b == b'\n').count() as u32;
                result.structure = Some(BodyStructure {
                    size: header_len + body_len,
                    lines,
                    parts: entity.get().map(|m| m.parts.len() as u32).unwrap_or(0),
                });
            }
            FetchItem::BodySection(section) => {
                let bytes = match section {
                    BodySection::Full => raw.clone(),
                    BodySection::Header => raw[..body_off].to_vec(),
                    BodySection::Text => raw[body_off..].to_vec(),
                    // Missing parts yield an empty literal rather than
                    // an error.
                    BodySection::Part(n) => entity
                        .get()
                        .and_then(|m| m.part(*n))
                        .map(|p| p.contents().to_vec())
                        .unwrap_or_default(),
                };
                result.sections.push((section.clone(), bytes));
            }
        }
    }

    result
}

fn envelope_from(message: &Message<'_>) -> Envelope {
    Envelope {
        date: message
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0)),
        subject: message.subject().map(str::to_string),
        from: first_address(message.from()),
        to: first_address(message.to()),
        cc: first_address(message.cc()),
        message_id: message.message_id().map(str::to_string),
    }
}

fn first_address(address: Option<&mail_parser::Address<'_>>) -> Option<String> {
    address
        .and_then(|a| a.first())
        .and_then(|a| a.address())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabasePool;
    use crate::flags::{DELETED, FLAGGED};
    use crate::notify::UpdateSink;
    use crate::sequence::SeqRange;
    use crate::store::StoreOptions;
    use pretty_assertions::assert_eq;
    use sqlmail_common::config::DatabaseConfig;
    use tokio::sync::mpsc::Receiver;

    async fn test_store() -> (SqlStore, Receiver<UpdateEvent>) {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 0,
        };
        let pool = DatabasePool::connect(&config).await.unwrap();
        pool.init_schema().await.unwrap();
        let (sink, rx) = UpdateSink::channel(1024);
        let store = SqlStore::new(pool, sink, StoreOptions::default());
        store.create_account("alice").await.unwrap();
        (store, rx)
    }

    fn drain(rx: &mut Receiver<UpdateEvent>) -> Vec<UpdateEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn literal(subject: &str, body: &str) -> Vec<u8> {
        format!("Subject: {}\r\nFrom: a@example.org\r\n\r\n{}", subject, body).into_bytes()
    }

    async fn collect(
        mailbox: &Mailbox,
        set: &NumSet,
        items: &[FetchItem],
    ) -> Vec<FetchedMessage> {
        let (tx, mut rx) = mpsc::channel(64);
        mailbox.list(set, items, &tx).await.unwrap();
        drop(tx);
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn all() -> NumSet {
        NumSet::uid(vec![SeqRange::all()])
    }

    #[tokio::test]
    async fn test_append_assigns_strictly_increasing_uids() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();

        for i in 1..=3u32 {
            let uid = mailbox
                .append(&[], Utc::now(), &literal("m", "body"))
                .await
                .unwrap();
            assert_eq!(uid, i);
        }

        // Expunging must not make identifiers reusable.
        mailbox
            .delete(&NumSet::uid(vec![SeqRange::range(1, 3)]))
            .await
            .unwrap();
        mailbox.expunge().await.unwrap();
        let uid = mailbox
            .append(&[], Utc::now(), &literal("m", "body"))
            .await
            .unwrap();
        assert_eq!(uid, 4);

        let status = mailbox.status(&[StatusItem::UidNext]).await.unwrap();
        assert_eq!(status.uid_next, Some(5));
    }

    #[tokio::test]
    async fn test_seqnums_are_gapless_after_expunge() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        for i in 0..3 {
            mailbox
                .append(&[], Utc::now(), &literal(&format!("m{}", i), "body"))
                .await
                .unwrap();
        }

        mailbox
            .delete(&NumSet::seq(vec![SeqRange::single(2)]))
            .await
            .unwrap();
        mailbox.expunge().await.unwrap();

        let msgs = collect(&mailbox, &all(), &[FetchItem::Uid]).await;
        let seqnums: Vec<u32> = msgs.iter().map(|m| m.seqnum).collect();
        let uids: Vec<u32> = msgs.iter().map(|m| m.uid).collect();
        assert_eq!(seqnums, vec![1, 2]);
        assert_eq!(uids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_seq_addressed_list_uses_current_positions() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        for i in 0..3 {
            mailbox
                .append(&[], Utc::now(), &literal(&format!("m{}", i), "body"))
                .await
                .unwrap();
        }
        mailbox
            .delete(&NumSet::uid(vec![SeqRange::single(1)]))
            .await
            .unwrap();
        mailbox.expunge().await.unwrap();

        // Position 2 now means uid 3; the resolve and the fetch run in
        // the same transaction, so the reported seqnum matches the
        // addressed position.
        let msgs = collect(
            &mailbox,
            &NumSet::seq(vec![SeqRange::single(2)]),
            &[FetchItem::Uid],
        )
        .await;
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].seqnum, 2);
        assert_eq!(msgs[0].uid, 3);
    }

    #[tokio::test]
    async fn test_flag_operations_are_idempotent() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        mailbox
            .append(&[], Utc::now(), &literal("m", "body"))
            .await
            .unwrap();
        let target = NumSet::uid(vec![SeqRange::single(1)]);

        let flagged = vec![FLAGGED.to_string()];
        mailbox
            .update_flags(&target, FlagOp::Add, &flagged)
            .await
            .unwrap();
        mailbox
            .update_flags(&target, FlagOp::Add, &flagged)
            .await
            .unwrap();

        let msgs = collect(&mailbox, &target, &[FetchItem::Flags]).await;
        let flags = msgs[0].flags.clone().unwrap();
        assert_eq!(flags.iter().filter(|f| *f == FLAGGED).count(), 1);

        // Removing an absent flag is a no-op, not an error.
        mailbox
            .update_flags(&target, FlagOp::Remove, &[DELETED.to_string()])
            .await
            .unwrap();

        // Add then remove leaves the set unchanged.
        mailbox
            .update_flags(&target, FlagOp::Remove, &flagged)
            .await
            .unwrap();
        let msgs = collect(&mailbox, &target, &[FetchItem::Flags]).await;
        assert!(!msgs[0].flags.clone().unwrap().contains(&FLAGGED.to_string()));
    }

    #[tokio::test]
    async fn test_recent_is_not_client_settable() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        mailbox
            .append(&[], Utc::now(), &literal("m", "body"))
            .await
            .unwrap();
        let target = NumSet::uid(vec![SeqRange::single(1)]);

        // An explicit Set must neither add nor clear \Recent.
        mailbox
            .update_flags(
                &target,
                FlagOp::Set,
                &[SEEN.to_string(), RECENT.to_string()],
            )
            .await
            .unwrap();
        let msgs = collect(&mailbox, &target, &[FetchItem::Flags]).await;
        let flags = msgs[0].flags.clone().unwrap();
        assert!(flags.contains(&SEEN.to_string()));
        assert!(flags.contains(&RECENT.to_string()), "append-set \\Recent survives");
        assert_eq!(flags.iter().filter(|f| *f == RECENT).count(), 1);
    }

    #[tokio::test]
    async fn test_expunge_events_descend_and_positions_renumber() {
        let (store, mut rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        for i in 0..4 {
            mailbox
                .append(&[], Utc::now(), &literal(&format!("m{}", i), "body"))
                .await
                .unwrap();
        }
        drain(&mut rx);

        mailbox
            .delete(&NumSet::seq(vec![
                SeqRange::single(1),
                SeqRange::single(3),
            ]))
            .await
            .unwrap();
        assert!(drain(&mut rx).is_empty(), "marking publishes nothing");

        mailbox.expunge().await.unwrap();
        let events = drain(&mut rx);
        let seqnums: Vec<u32> = events
            .iter()
            .map(|e| match e {
                UpdateEvent::Expunge { seqnum, .. } => *seqnum,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(seqnums, vec![3, 1]);

        let msgs = collect(&mailbox, &all(), &[FetchItem::Uid]).await;
        let seqnums: Vec<u32> = msgs.iter().map(|m| m.seqnum).collect();
        let uids: Vec<u32> = msgs.iter().map(|m| m.uid).collect();
        assert_eq!(seqnums, vec![1, 2]);
        assert_eq!(uids, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_append_limit_scopes() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        let payload = |n: usize| vec![b'x'; n];

        mailbox
            .set_size_limit(LimitSetting::Limited(500))
            .await
            .unwrap();
        let err = mailbox.append(&[], Utc::now(), &payload(700)).await;
        assert!(matches!(
            err,
            Err(Error::LimitExceeded { size: 700, limit: 500 })
        ));
        mailbox.append(&[], Utc::now(), &payload(300)).await.unwrap();

        // With the mailbox limit unset, the account limit applies even
        // if the mailbox previously had a looser one.
        mailbox.set_size_limit(LimitSetting::Unset).await.unwrap();
        store
            .set_account_limit("alice", LimitSetting::Limited(100))
            .await
            .unwrap();
        let err = mailbox.append(&[], Utc::now(), &payload(400)).await;
        assert!(matches!(err, Err(Error::LimitExceeded { .. })));

        // Explicit mailbox-scope "unlimited" short-circuits the chain.
        mailbox
            .set_size_limit(LimitSetting::Unlimited)
            .await
            .unwrap();
        mailbox.append(&[], Utc::now(), &payload(400)).await.unwrap();
    }

    #[tokio::test]
    async fn test_limit_capability_absent_means_unset() {
        let (store, _rx) = test_store().await;
        let store = store.without_limit_overrides();
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        mailbox
            .set_size_limit(LimitSetting::Limited(10))
            .await
            .unwrap();
        // The stored limit exists but the capability is gone, so the
        // scope reads as unset.
        mailbox
            .append(&[], Utc::now(), &vec![b'x'; 100])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_move_is_copy_plus_delete() {
        let (store, mut rx) = test_store().await;
        store.create_mailbox("alice", "Archive").await.unwrap();
        let inbox = store.mailbox("alice", "INBOX").await.unwrap();
        let archive = store.mailbox("alice", "Archive").await.unwrap();
        for i in 0..2 {
            inbox
                .append(&[], Utc::now(), &literal(&format!("m{}", i), "body"))
                .await
                .unwrap();
        }
        drain(&mut rx);

        inbox
            .move_to(&NumSet::seq(vec![SeqRange::range(1, 2)]), "Archive")
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert!(matches!(
            events[0],
            UpdateEvent::MailboxStatus { messages: 2, recent: 2, ref mailbox, .. }
                if mailbox == "Archive"
        ));
        let expunged: Vec<u32> = events[1..]
            .iter()
            .map(|e| match e {
                UpdateEvent::Expunge { seqnum, .. } => *seqnum,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(expunged, vec![2, 1]);

        let src = inbox.status(&[StatusItem::Messages]).await.unwrap();
        assert_eq!(src.messages, Some(0));
        let dst = archive.status(&[StatusItem::Messages]).await.unwrap();
        assert_eq!(dst.messages, Some(2));
    }

    #[tokio::test]
    async fn test_move_to_missing_destination_is_atomic() {
        let (store, mut rx) = test_store().await;
        let inbox = store.mailbox("alice", "INBOX").await.unwrap();
        inbox
            .append(&[], Utc::now(), &literal("m", "body"))
            .await
            .unwrap();
        drain(&mut rx);

        let err = inbox.move_to(&all(), "NoSuchBox").await;
        assert!(matches!(err, Err(Error::NotFound(_))));

        // Nothing changed, nothing was published.
        let status = inbox.status(&[StatusItem::Messages]).await.unwrap();
        assert_eq!(status.messages, Some(1));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_copy_stamps_recent_and_advances_uid_next() {
        let (store, mut rx) = test_store().await;
        store.create_mailbox("alice", "Archive").await.unwrap();
        let inbox = store.mailbox("alice", "INBOX").await.unwrap();
        let archive = store.mailbox("alice", "Archive").await.unwrap();

        inbox
            .append(&[SEEN.to_string()], Utc::now(), &literal("m", "body"))
            .await
            .unwrap();
        drain(&mut rx);

        inbox.copy_to(&all(), "Archive").await.unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);

        let msgs = collect(&archive, &all(), &[FetchItem::Flags]).await;
        let flags = msgs[0].flags.clone().unwrap();
        assert!(flags.contains(&RECENT.to_string()));
        assert!(flags.contains(&SEEN.to_string()));

        let status = archive.status(&[StatusItem::UidNext]).await.unwrap();
        assert_eq!(status.uid_next, Some(2));

        // Source kept its message.
        let status = inbox.status(&[StatusItem::Messages]).await.unwrap();
        assert_eq!(status.messages, Some(1));
    }

    #[tokio::test]
    async fn test_update_flags_publishes_resulting_sets() {
        let (store, mut rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        for i in 0..2 {
            mailbox
                .append(&[], Utc::now(), &literal(&format!("m{}", i), "body"))
                .await
                .unwrap();
        }
        drain(&mut rx);

        mailbox
            .update_flags(
                &NumSet::seq(vec![SeqRange::range(1, 2)]),
                FlagOp::Set,
                &[SEEN.to_string()],
            )
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        for (i, event) in events.iter().enumerate() {
            match event {
                UpdateEvent::MessageFlags { seqnum, flags, .. } => {
                    assert_eq!(*seqnum, (i + 1) as u32);
                    assert!(flags.contains(&SEEN.to_string()));
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_projections() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        let raw = literal("Hello", "world\r\n");
        let date = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        mailbox.append(&[], date, &raw).await.unwrap();

        let msgs = collect(
            &mailbox,
            &all(),
            &[
                FetchItem::Envelope,
                FetchItem::Size,
                FetchItem::InternalDate,
                FetchItem::BodySection(BodySection::Full),
                FetchItem::BodySection(BodySection::Text),
            ],
        )
        .await;
        let msg = &msgs[0];

        assert_eq!(msg.uid, 1);
        assert_eq!(msg.size, Some(raw.len() as u32));
        assert_eq!(msg.internal_date, Some(date));
        let envelope = msg.envelope.clone().unwrap();
        assert_eq!(envelope.subject.as_deref(), Some("Hello"));
        assert_eq!(envelope.from.as_deref(), Some("a@example.org"));
        assert_eq!(msg.sections[0].1, raw);
        assert_eq!(msg.sections[1].1, b"world\r\n");
    }

    #[tokio::test]
    async fn test_fetch_degrades_on_unparseable_content() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        // No header/body boundary at all; header is empty.
        mailbox
            .append(&[], Utc::now(), b"\x00\x01\x02 not a message")
            .await
            .unwrap();

        let msgs = collect(
            &mailbox,
            &all(),
            &[FetchItem::Envelope, FetchItem::Size],
        )
        .await;
        let msg = &msgs[0];
        // The row is served; the structural projection is defaulted.
        assert_eq!(msg.envelope.clone().unwrap().subject, None);
        assert_eq!(msg.size, Some(17));
    }

    #[tokio::test]
    async fn test_search_by_content_flags_and_uid() {
        let (store, _rx) = test_store().await;
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        mailbox
            .append(&[], Utc::now(), &literal("Quarterly report", "profits"))
            .await
            .unwrap();
        mailbox
            .append(&[], Utc::now(), &literal("Lunch", "sandwiches"))
            .await
            .unwrap();

        let criteria = SearchCriteria {
            text: Some("quarterly".to_string()),
            ..Default::default()
        };
        assert_eq!(
            mailbox.search(&criteria, NumKind::Uid).await.unwrap(),
            vec![1]
        );

        mailbox
            .update_flags(
                &NumSet::uid(vec![SeqRange::single(2)]),
                FlagOp::Add,
                &[SEEN.to_string()],
            )
            .await
            .unwrap();
        let criteria = SearchCriteria {
            with_flags: vec![SEEN.to_string()],
            ..Default::default()
        };
        assert_eq!(
            mailbox.search(&criteria, NumKind::Seq).await.unwrap(),
            vec![2]
        );

        let criteria = SearchCriteria {
            uid: vec![SeqRange::range(2, 0)],
            ..Default::default()
        };
        assert_eq!(
            mailbox.search(&criteria, NumKind::Uid).await.unwrap(),
            vec![2]
        );
    }

    #[tokio::test]
    async fn test_status_and_info() {
        let (store, _rx) = test_store().await;
        store.create_mailbox("alice", "INBOX.work").await.unwrap();
        let mailbox = store.mailbox("alice", "INBOX").await.unwrap();
        for i in 0..2 {
            mailbox
                .append(&[], Utc::now(), &literal(&format!("m{}", i), "body"))
                .await
                .unwrap();
        }
        mailbox
            .update_flags(
                &NumSet::seq(vec![SeqRange::single(1)]),
                FlagOp::Add,
                &[SEEN.to_string()],
            )
            .await
            .unwrap();

        let status = mailbox
            .status(&[
                StatusItem::Messages,
                StatusItem::Recent,
                StatusItem::Unseen,
                StatusItem::UidNext,
                StatusItem::UidValidity,
                StatusItem::AppendLimit,
            ])
            .await
            .unwrap();
        assert_eq!(status.messages, Some(2));
        assert_eq!(status.recent, Some(2));
        assert_eq!(status.first_unseen, Some(2));
        assert_eq!(status.uid_next, Some(3));
        assert!(status.uid_validity.is_some());
        assert_eq!(status.append_limit, Some(LimitSetting::Unset));

        let info = mailbox.info().await.unwrap();
        assert_eq!(info.delimiter, ".");
        assert!(info.attributes.contains(&ATTR_UNMARKED.to_string()));
        assert!(info.attributes.contains(&ATTR_HAS_CHILDREN.to_string()));

        let work = store.mailbox("alice", "INBOX.work").await.unwrap();
        let info = work.info().await.unwrap();
        assert!(info.attributes.contains(&ATTR_HAS_NO_CHILDREN.to_string()));
    }

    #[tokio::test]
    async fn test_children_probe_matches_name_literally() {
        let (store, _rx) = test_store().await;
        store.create_mailbox("alice", "a%").await.unwrap();
        store.create_mailbox("alice", "ab.c").await.unwrap();

        // "ab.c" must not register as a child of "a%".
        let info = store
            .mailbox("alice", "a%")
            .await
            .unwrap()
            .info()
            .await
            .unwrap();
        assert!(info.attributes.contains(&ATTR_HAS_NO_CHILDREN.to_string()));

        store.create_mailbox("alice", "a%.sub").await.unwrap();
        let info = store
            .mailbox("alice", "a%")
            .await
            .unwrap()
            .info()
            .await
            .unwrap();
        assert!(info.attributes.contains(&ATTR_HAS_CHILDREN.to_string()));
    }
}
