//! SqlMail Store - IMAP-style mailbox storage over SQL
//!
//! This crate implements the mailbox/message storage and consistency
//! layer: permanent identifier assignment, flag-set algebra, append
//! size limits, sequence-number projection, atomic multi-step
//! operations (append, flag update, copy, move, delete, expunge) and
//! commit-time update notification.
//!
//! Every public mutating operation on [`Mailbox`] is one database
//! transaction; change notifications are buffered in memory and handed
//! to the [`notify::UpdateSink`] strictly after the transaction
//! commits.

pub mod codec;
pub mod db;
pub mod dialect;
pub mod flags;
pub mod limit;
pub mod mailbox;
pub mod models;
pub mod notify;
pub mod search;
pub mod sequence;
pub mod store;

pub use db::DatabasePool;
pub use dialect::Dialect;
pub use flags::{FlagOp, FlagSetEngine};
pub use limit::{EffectiveLimit, LimitSetting};
pub use mailbox::Mailbox;
pub use models::{
    BodySection, Envelope, FetchItem, FetchedMessage, MailboxInfo, MailboxStatus, StatusItem,
};
pub use notify::{UpdateEvent, UpdateSink};
pub use search::SearchCriteria;
pub use sequence::{NumKind, NumSet, SeqRange};
pub use store::{AppendLimitOverrides, SqlStore, StoreOptions};
