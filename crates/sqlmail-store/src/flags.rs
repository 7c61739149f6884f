//! Flag-set algebra over a UID range
//!
//! Replace/add/remove set operations over (mailbox, message, flag)
//! tuples, always executed inside the caller's transaction. Targets
//! are concrete UID bounds, so the engine is agnostic to whether the
//! client addressed messages by UID or by position.

use crate::dialect::{placeholders, Dialect};
use sqlmail_common::types::MailboxId;
use sqlx::AnyConnection;

pub const SEEN: &str = "\\Seen";
pub const ANSWERED: &str = "\\Answered";
pub const FLAGGED: &str = "\\Flagged";
pub const DELETED: &str = "\\Deleted";
pub const DRAFT: &str = "\\Draft";

/// Session-transient marker set by the append and copy paths only.
/// Filtered out of every explicit client-driven mutation.
pub const RECENT: &str = "\\Recent";

/// Flags advertised for every mailbox.
pub const DEFINED_FLAGS: [&str; 5] = [SEEN, ANSWERED, FLAGGED, DELETED, DRAFT];

/// Requested flag mutation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOp {
    /// Replace the whole flag set.
    Set,
    /// Add the given flags.
    Add,
    /// Remove the given flags.
    Remove,
}

/// Executes flag-set operations in a given dialect.
#[derive(Debug, Clone, Copy)]
pub struct FlagSetEngine {
    dialect: Dialect,
}

impl FlagSetEngine {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Drop the `\Recent` pseudo-flag from an explicit request.
    pub fn sanitize(flags: &[String]) -> Vec<String> {
        flags.iter().filter(|f| *f != RECENT).cloned().collect()
    }

    /// Apply one mutation over one UID bound.
    pub async fn apply(
        &self,
        conn: &mut AnyConnection,
        mailbox_id: MailboxId,
        lo: i64,
        hi: i64,
        op: FlagOp,
        flags: &[String],
    ) -> sqlx::Result<()> {
        match op {
            FlagOp::Set => self.replace(conn, mailbox_id, lo, hi, flags).await,
            FlagOp::Add => self.add(conn, mailbox_id, lo, hi, flags).await,
            FlagOp::Remove => self.remove(conn, mailbox_id, lo, hi, flags).await,
        }
    }

    /// Clear all client-settable flags in range, then add the given
    /// set. Two statements inside the caller's transaction, so the
    /// intermediate state is never observable after commit.
    pub async fn replace(
        &self,
        conn: &mut AnyConnection,
        mailbox_id: MailboxId,
        lo: i64,
        hi: i64,
        flags: &[String],
    ) -> sqlx::Result<()> {
        self.clear_range(conn, mailbox_id, lo, hi).await?;
        self.add(conn, mailbox_id, lo, hi, flags).await
    }

    /// Insert (mailbox, uid, flag) tuples for every message in range
    /// and every requested flag. Existing tuples are left alone; a
    /// conflicting insert is a no-op, not an error.
    ///
    /// The flag list is joined in as a literal relation built by the
    /// dialect, one row per flag, so a single statement covers an
    /// arbitrary-length list.
    pub async fn add(
        &self,
        conn: &mut AnyConnection,
        mailbox_id: MailboxId,
        lo: i64,
        hi: i64,
        flags: &[String],
    ) -> sqlx::Result<()> {
        if flags.is_empty() {
            return Ok(());
        }

        // Placeholder layout: $1 inserted mailbox id, $2.. the flag
        // values, then the range predicate. Strictly ascending order
        // of first appearance keeps SQLite's named-parameter indexes
        // aligned with the bind order.
        let after_flags = 2 + flags.len();
        let sql = format!(
            "INSERT INTO flags (mailbox_id, uid, flag)
             SELECT $1, m.uid, fs.flag
             FROM messages m
             CROSS JOIN {relation}
             WHERE m.mailbox_id = ${mbox} AND m.uid BETWEEN ${lo} AND ${hi}
             {ignore}",
            relation = self.dialect.values_relation(2, flags.len()),
            mbox = after_flags,
            lo = after_flags + 1,
            hi = after_flags + 2,
            ignore = self.dialect.insert_ignore(),
        );

        let mut query = sqlx::query(&sql).bind(mailbox_id);
        for flag in flags {
            query = query.bind(flag.as_str());
        }
        query
            .bind(mailbox_id)
            .bind(lo)
            .bind(hi)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Delete matching tuples for the range and flag set; absent
    /// tuples are silently ignored.
    pub async fn remove(
        &self,
        conn: &mut AnyConnection,
        mailbox_id: MailboxId,
        lo: i64,
        hi: i64,
        flags: &[String],
    ) -> sqlx::Result<()> {
        if flags.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "DELETE FROM flags
             WHERE mailbox_id = $1 AND uid BETWEEN $2 AND $3
             AND flag IN ({})",
            placeholders(4, flags.len()),
        );

        let mut query = sqlx::query(&sql).bind(mailbox_id).bind(lo).bind(hi);
        for flag in flags {
            query = query.bind(flag.as_str());
        }
        query.execute(&mut *conn).await?;
        Ok(())
    }

    async fn clear_range(
        &self,
        conn: &mut AnyConnection,
        mailbox_id: MailboxId,
        lo: i64,
        hi: i64,
    ) -> sqlx::Result<()> {
        // \Recent is not client-settable, so a replace must not wipe it.
        sqlx::query(
            "DELETE FROM flags
             WHERE mailbox_id = $1 AND uid BETWEEN $2 AND $3
             AND flag <> '\\Recent'",
        )
        .bind(mailbox_id)
        .bind(lo)
        .bind(hi)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
