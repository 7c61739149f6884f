//! Append size limit resolution
//!
//! Three independently optional size ceilings exist: mailbox scope,
//! account scope, and a statically configured global default. The
//! first scope with an explicitly configured value wins, including an
//! explicit "unlimited", which short-circuits inheritance from the
//! lower-priority scopes.

/// A single scope's append limit configuration.
///
/// "No configured row" and "explicitly unlimited" are distinct states:
/// collapsing them (for example by substituting a zero-byte limit when
/// a lookup finds nothing) would silently block all appends at that
/// scope. A failed lookup is `Unset` and falls through to the next
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSetting {
    /// Nothing configured at this scope; defer to the next one.
    Unset,
    /// Explicit ceiling in bytes.
    Limited(u64),
    /// Explicitly configured "no limit"; stops the override chain.
    Unlimited,
}

/// The limit actually applied to an append, after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveLimit {
    Limited(u64),
    Unlimited,
}

/// Resolve the effective limit: mailbox, then account, then the
/// global default; all unset means unlimited.
pub fn resolve(
    mailbox: LimitSetting,
    account: LimitSetting,
    global: LimitSetting,
) -> EffectiveLimit {
    for scope in [mailbox, account, global] {
        match scope {
            LimitSetting::Unset => continue,
            LimitSetting::Limited(n) => return EffectiveLimit::Limited(n),
            LimitSetting::Unlimited => return EffectiveLimit::Unlimited,
        }
    }
    EffectiveLimit::Unlimited
}

impl EffectiveLimit {
    /// Whether a message of `size` bytes is accepted under this limit.
    pub fn accepts(&self, size: u64) -> bool {
        match self {
            EffectiveLimit::Limited(limit) => size <= *limit,
            EffectiveLimit::Unlimited => true,
        }
    }
}

impl From<Option<u64>> for LimitSetting {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(n) => LimitSetting::Limited(n),
            None => LimitSetting::Unset,
        }
    }
}
