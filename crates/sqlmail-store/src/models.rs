//! Request and result records exchanged with the protocol layer

use crate::limit::LimitSetting;
use chrono::{DateTime, Utc};

pub const ATTR_MARKED: &str = "\\Marked";
pub const ATTR_UNMARKED: &str = "\\Unmarked";
pub const ATTR_HAS_CHILDREN: &str = "\\HasChildren";
pub const ATTR_HAS_NO_CHILDREN: &str = "\\HasNoChildren";

/// One projection requested for each fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Header summary (subject, addresses, date, message id)
    Envelope,
    /// Coarse MIME shape of the entity
    BodyStructure,
    /// Raw bytes of one section of the message
    BodySection(BodySection),
    /// Current flag set
    Flags,
    /// Internal (arrival) date
    InternalDate,
    /// Total stored size in bytes
    Size,
    /// Permanent identifier
    Uid,
}

impl FetchItem {
    /// Whether serving this item requires the stored message bytes
    /// (and possibly a MIME parse) rather than row metadata alone.
    pub fn needs_body(&self) -> bool {
        matches!(
            self,
            FetchItem::Envelope | FetchItem::BodyStructure | FetchItem::BodySection(_)
        )
    }
}

/// Addressable section of a stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySection {
    /// The entire literal as appended
    Full,
    /// Header bytes only
    Header,
    /// Body bytes only
    Text,
    /// One MIME part by index; missing parts yield empty content
    Part(usize),
}

/// Header summary of a message. Fields the entity does not carry (or
/// that failed to parse) are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub date: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub message_id: Option<String>,
}

/// Coarse structural summary of a message entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyStructure {
    /// Total size of the stored literal in bytes
    pub size: u32,
    /// Line count of the body half
    pub lines: u32,
    /// Number of MIME parts (1 for a non-multipart message)
    pub parts: u32,
}

/// One fetched message, populated per the requested items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedMessage {
    pub seqnum: u32,
    pub uid: u32,
    pub flags: Option<Vec<String>>,
    pub internal_date: Option<DateTime<Utc>>,
    pub size: Option<u32>,
    pub envelope: Option<Envelope>,
    pub structure: Option<BodyStructure>,
    pub sections: Vec<(BodySection, Vec<u8>)>,
}

/// Items a status request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    Messages,
    Recent,
    Unseen,
    UidNext,
    UidValidity,
    AppendLimit,
}

/// Aggregated mailbox counters, populated per the requested items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    pub name: String,
    pub messages: Option<u32>,
    pub recent: Option<u32>,
    /// Position of the first message without `\Seen`; `None` when all
    /// messages are seen (the item is then omitted entirely).
    pub first_unseen: Option<u32>,
    pub uid_next: Option<u32>,
    pub uid_validity: Option<u32>,
    /// The mailbox-scope append limit, when requested and the backend
    /// exposes per-mailbox limits.
    pub append_limit: Option<LimitSetting>,
}

/// Static mailbox attributes for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxInfo {
    pub name: String,
    pub delimiter: String,
    pub attributes: Vec<String>,
}
