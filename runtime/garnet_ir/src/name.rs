//! Interned names.

use std::fmt;

const SHARD_BITS: u32 = 4;
const LOCAL_BITS: u32 = u32::BITS - SHARD_BITS;

/// Handle to a string owned by a [`StringInterner`](crate::StringInterner).
///
/// The top four bits select the interner shard and the remaining bits index
/// into it. Names from one interner compare equal exactly when their
/// strings do.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The empty string; every interner places it at shard 0, slot 0.
    pub const EMPTY: Name = Name(0);

    pub const SHARDS: usize = 1 << SHARD_BITS;

    pub const MAX_LOCAL: u32 = (1 << LOCAL_BITS) - 1;

    #[allow(
        clippy::cast_possible_truncation,
        reason = "shard is below SHARDS, which fits in four bits"
    )]
    pub(crate) const fn new(shard: usize, local: u32) -> Self {
        debug_assert!(shard < Self::SHARDS);
        debug_assert!(local <= Self::MAX_LOCAL);
        Name(((shard as u32) << LOCAL_BITS) | local)
    }

    pub(crate) const fn shard(self) -> usize {
        (self.0 >> LOCAL_BITS) as usize
    }

    pub(crate) const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    /// Numeric id, stable for the life of the interner.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name#{}.{}", self.shard(), self.local())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
