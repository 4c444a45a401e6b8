// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! String interning for database loads.
//!
//! Object names, property names and verb names repeat heavily in a database
//! file. While loading, strings read through [`intern`] share one allocation
//! per distinct content. The table holds its own reference to each string, so
//! [`close`] should be called once loading is done to let unused ones go.

use crate::heap::Str;
use ahash::AHasher;
use once_cell::sync::Lazy;
use papaya::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

struct GlobalInternerState {
    strings: HashMap<Str, (), BuildHasherDefault<AHasher>>,
    /// Serializes insertion of new strings so two threads never create two
    /// allocations for the same content.
    allocation_lock: Mutex<()>,
    hits: AtomicUsize,
    bytes_saved: AtomicUsize,
}

impl GlobalInternerState {
    fn new() -> Self {
        Self {
            strings: Default::default(),
            allocation_lock: Mutex::new(()),
            hits: AtomicUsize::new(0),
            bytes_saved: AtomicUsize::new(0),
        }
    }

    fn found(&self, s: &Str) -> Str {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.bytes_saved.fetch_add(s.len(), Ordering::Relaxed);
        s.clone()
    }

    fn intern(&self, bytes: &[u8]) -> Str {
        let guard = self.strings.pin();
        if let Some((existing, _)) = guard.get_key_value(bytes) {
            return self.found(existing);
        }

        let _lock = self.allocation_lock.lock();
        if let Some((existing, _)) = guard.get_key_value(bytes) {
            return self.found(existing);
        }

        let s = Str::from_bytes(bytes);
        guard.insert(s.clone(), ());
        s
    }

    fn close(&self) {
        let guard = self.strings.pin();
        info!(
            strings = guard.len(),
            hits = self.hits.swap(0, Ordering::Relaxed),
            bytes_saved = self.bytes_saved.swap(0, Ordering::Relaxed),
            "string intern table closed"
        );
        guard.clear();
    }
}

static GLOBAL_INTERNER: Lazy<GlobalInternerState> = Lazy::new(GlobalInternerState::new);

/// A string with the contents of `bytes`, shared with every other interned
/// string of the same contents.
pub fn intern(bytes: &[u8]) -> Str {
    GLOBAL_INTERNER.intern(bytes)
}

/// Log sharing statistics and drop the table's references. Strings handed out
/// earlier stay valid; later calls to [`intern`] start a fresh table.
pub fn close() {
    GLOBAL_INTERNER.close()
}

/// Number of distinct strings currently in the table.
pub fn len() -> usize {
    GLOBAL_INTERNER.strings.pin().len()
}

/// Held by tests that depend on the table's contents, since [`close`] empties
/// it for every thread.
#[cfg(test)]
pub(crate) static TABLE_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
pub(crate) fn lock_table() -> std::sync::MutexGuard<'static, ()> {
    TABLE_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_content_shares_allocation() {
        let _table = lock_table();
        let a = intern(b"intern test: shared name");
        let b = intern(b"intern test: shared name");
        assert!(a.ptr_eq(&b));
        assert_eq!(a.as_bytes(), b"intern test: shared name");
    }

    #[test]
    fn test_case_sensitive() {
        let _table = lock_table();
        let a = intern(b"intern test: Case");
        let b = intern(b"intern test: case");
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_table_holds_one_reference() {
        let _table = lock_table();
        let a = intern(b"intern test: counted");
        // Ours plus the table's.
        assert_eq!(a.refcount(), 2);
        let b = intern(b"intern test: counted");
        assert_eq!(a.refcount(), 3);
        drop(b);
        assert_eq!(a.refcount(), 2);
        assert!(len() >= 1);
    }

    #[test]
    fn test_concurrent_interning() {
        let _table = lock_table();
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| intern(b"intern test: raced")))
            .collect();
        let results: Vec<Str> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for s in &results[1..] {
            assert!(s.ptr_eq(&results[0]));
        }
    }

    #[test]
    fn test_close_releases_table_references() {
        let _table = lock_table();
        let a = intern(b"intern test: closed");
        assert_eq!(a.refcount(), 2);
        close();
        assert_eq!(a.as_bytes(), b"intern test: closed");

        let b = intern(b"intern test: closed");
        assert!(!a.ptr_eq(&b));
    }
}
