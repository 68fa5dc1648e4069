//! Sharded string interner for global, model and property names.
//!
//! Each shard has its own lock, so threads interning unrelated names rarely
//! contend. Interned strings are leaked: they live as long as the process,
//! which lets `lookup` return `&'static str`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::Name;

/// Names every runtime resolves; interning them up front keeps the hot
/// lookup path read-only.
const PRE_INTERNED: &[&str] = &[
    // scope-relative
    "~", "&", "`", "'", "+", "_", "1", "2", "3", "4", "5", "6", "7", "8", "9",
    // thread-local
    "!", "@", "SAFE", "?",
    // streams
    "stdout", ">", "defout", "stderr", "stdin", "<",
    // separators
    "/", "-0", "\\", ",", ";", "-F",
    // flags and process state
    "VERBOSE", "-v", "-w", "DEBUG", "-d", "KCODE", "-K", "0", "PROGRAM_NAME", "*", "$",
    "LOAD_PATH", ":", "-I", "LOADED_FEATURES", "\"", "FILENAME",
    // model defaults
    "default", "id",
];

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InternError {
    #[error("interner shard {shard} is full ({count} names)")]
    ShardFull { shard: usize, count: usize },
}

#[derive(Default)]
struct Shard {
    slots: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Thread-safe interner mapping strings to [`Name`]s.
pub struct StringInterner {
    shards: [RwLock<Shard>; Name::SHARDS],
    count: AtomicUsize,
}

impl StringInterner {
    pub fn new() -> Self {
        let interner = StringInterner {
            shards: std::array::from_fn(|_| RwLock::new(Shard::default())),
            count: AtomicUsize::new(0),
        };
        // First insertion into shard 0, so it becomes `Name::EMPTY`.
        interner.intern("");
        for name in PRE_INTERNED {
            interner.intern(name);
        }
        interner
    }

    /// Shard for `s`. The empty string maps to shard 0.
    fn shard_of(s: &str) -> usize {
        let hash = s
            .bytes()
            .take(8)
            .fold(0u32, |hash, byte| hash.wrapping_mul(31).wrapping_add(u32::from(byte)));
        hash as usize % Name::SHARDS
    }

    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        let shard = Self::shard_of(s);
        if let Some(&local) = self.shards[shard].read().slots.get(s) {
            return Ok(Name::new(shard, local));
        }

        let mut guard = self.shards[shard].write();
        // Interned by another thread between the two locks.
        if let Some(&local) = guard.slots.get(s) {
            return Ok(Name::new(shard, local));
        }
        let count = guard.strings.len();
        let local = u32::try_from(count)
            .ok()
            .filter(|local| *local <= Name::MAX_LOCAL)
            .ok_or(InternError::ShardFull { shard, count })?;
        let text: &'static str = Box::leak(Box::<str>::from(s));
        guard.strings.push(text);
        guard.slots.insert(text, local);
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(Name::new(shard, local))
    }

    /// Intern `s`.
    ///
    /// # Panics
    /// If a shard is full; use [`try_intern`](Self::try_intern) to handle
    /// that case.
    pub fn intern(&self, s: &str) -> Name {
        match self.try_intern(s) {
            Ok(name) => name,
            Err(err) => panic!("{err}"),
        }
    }

    /// The name of an already interned string. Never interns.
    pub fn get(&self, s: &str) -> Option<Name> {
        let shard = Self::shard_of(s);
        let guard = self.shards[shard].read();
        guard.slots.get(s).map(|&local| Name::new(shard, local))
    }

    /// String of a name produced by this interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.shards[name.shard()].read().strings[name.local()]
    }

    /// Number of interned strings, the empty string included.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// `true` if nothing but the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Interner shared by every registry of one runtime; cheap to clone.
#[derive(Clone, Default)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &StringInterner {
        &self.0
    }
}

impl std::fmt::Debug for SharedInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedInterner({} names)", self.0.len())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
