//! Common identifier types for SqlMail

/// Surrogate key of an account row
pub type AccountId = i64;

/// Surrogate key of a mailbox row
pub type MailboxId = i64;

/// Permanent, monotonically increasing message identifier within a
/// mailbox. Never reused while the mailbox's validity epoch is
/// unchanged.
pub type Uid = u32;

/// Transient 1-based rank of a message among the messages currently
/// present in its mailbox, recomputed per read. Not stored.
pub type SeqNum = u32;
