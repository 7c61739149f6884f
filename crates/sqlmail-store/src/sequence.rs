//! Sequence-number and identifier range mapping
//!
//! Clients address messages either by permanent identifier (UID) or by
//! transient 1-based position. This module converts a client-supplied
//! range set into concrete UID bounds usable in a `BETWEEN` predicate.
//! Positions are always derived fresh per request from a windowed
//! rank-by-uid query; they are never cached across operations that
//! could change membership.

use sqlmail_common::types::MailboxId;
use sqlx::{AnyConnection, Row};

/// Largest representable identifier, used as the "no upper bound"
/// sentinel in open-ended ranges.
pub const MAX_ID: u32 = u32::MAX;

/// One inclusive range of UIDs or sequence numbers. `0` at either end
/// means "unbounded" on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqRange {
    pub start: u32,
    pub stop: u32,
}

impl SeqRange {
    pub fn single(n: u32) -> Self {
        Self { start: n, stop: n }
    }

    pub fn range(start: u32, stop: u32) -> Self {
        Self { start, stop }
    }

    /// The full range, `1:*`.
    pub fn all() -> Self {
        Self { start: 0, stop: 0 }
    }

    /// Concrete SQL bounds with sentinels resolved: an open lower end
    /// becomes 1 and an open upper end becomes [`MAX_ID`].
    pub fn sql_bounds(&self) -> (i64, i64) {
        let lo = if self.start == 0 { 1 } else { self.start as i64 };
        let hi = if self.stop == 0 {
            MAX_ID as i64
        } else {
            self.stop as i64
        };
        (lo, hi)
    }

    pub fn contains(&self, n: u32) -> bool {
        let (lo, hi) = self.sql_bounds();
        (n as i64) >= lo && (n as i64) <= hi
    }
}

/// Whether a range set addresses messages by UID or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumKind {
    Uid,
    Seq,
}

/// A client-supplied set of ranges plus the addressing mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumSet {
    pub kind: NumKind,
    pub ranges: Vec<SeqRange>,
}

impl NumSet {
    pub fn uid(ranges: Vec<SeqRange>) -> Self {
        Self {
            kind: NumKind::Uid,
            ranges,
        }
    }

    pub fn seq(ranges: Vec<SeqRange>) -> Self {
        Self {
            kind: NumKind::Seq,
            ranges,
        }
    }
}

/// Resolve a range set to concrete inclusive UID bounds.
///
/// UID ranges pass through with sentinels mapped. Positional ranges
/// rank the mailbox's current messages by ascending UID and take the
/// smallest and largest UID whose rank falls inside the requested
/// positions; an empty window yields no bounds for that range.
pub async fn resolve_uid_bounds(
    conn: &mut AnyConnection,
    mailbox_id: MailboxId,
    set: &NumSet,
) -> sqlx::Result<Vec<(i64, i64)>> {
    let mut bounds = Vec::with_capacity(set.ranges.len());

    for range in &set.ranges {
        let (lo, hi) = range.sql_bounds();
        match set.kind {
            NumKind::Uid => bounds.push((lo, hi)),
            NumKind::Seq => {
                let row = sqlx::query(
                    "SELECT MIN(uid) AS lo, MAX(uid) AS hi FROM (
                        SELECT uid, ROW_NUMBER() OVER (ORDER BY uid) AS seqnum
                        FROM messages WHERE mailbox_id = $1
                    ) ranked WHERE seqnum BETWEEN $2 AND $3",
                )
                .bind(mailbox_id)
                .bind(lo)
                .bind(hi)
                .fetch_one(&mut *conn)
                .await?;

                let uid_lo: Option<i64> = row.get("lo");
                let uid_hi: Option<i64> = row.get("hi");
                if let (Some(uid_lo), Some(uid_hi)) = (uid_lo, uid_hi) {
                    bounds.push((uid_lo, uid_hi));
                }
            }
        }
    }

    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sql_bounds_sentinels() {
        assert_eq!(SeqRange::all().sql_bounds(), (1, MAX_ID as i64));
        assert_eq!(SeqRange::range(5, 0).sql_bounds(), (5, MAX_ID as i64));
        assert_eq!(SeqRange::range(0, 9).sql_bounds(), (1, 9));
        assert_eq!(SeqRange::single(7).sql_bounds(), (7, 7));
    }

    #[test]
    fn test_contains() {
        let open = SeqRange::range(10, 0);
        assert!(open.contains(10));
        assert!(open.contains(MAX_ID));
        assert!(!open.contains(9));

        let closed = SeqRange::range(2, 4);
        assert!(closed.contains(3));
        assert!(!closed.contains(5));
    }
}
