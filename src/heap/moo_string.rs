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

//! Immutable, shared byte strings.
//!
//! Contents are bytes, not necessarily UTF-8: database strings are whatever the
//! file held. The length is stored with the allocation, so it is never rescanned.

use crate::options::Num;
use crate::stream::Stream;
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Clone)]
pub struct Str(Arc<[u8]>);

impl Str {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }

    /// Take a copy of everything accumulated in `stream`, leaving it empty.
    pub fn from_stream(stream: &mut Stream) -> Self {
        Self::from_bytes(stream.reset())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Do both handles point at the same allocation?
    pub fn ptr_eq(&self, other: &Str) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn eq_ignore_case(&self, other: &Str) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Bytes `[first, after)`, 1-based. An empty or inverted range yields "".
    pub fn substr(self, first: Num, after: Num) -> Str {
        if after <= first {
            return Str::from_bytes(b"");
        }
        let start = (first - 1) as usize;
        let end = (after - 1) as usize;
        Str::from_bytes(&self.0[start..end])
    }

    /// Replace bytes `[from, after)`, 1-based, with `value`.
    ///
    /// Everything before `from` and everything from `after` on is kept; when
    /// `after <= from` nothing is removed and `value` is spliced in at `from`.
    pub fn range_set(self, from: Num, after: Num, value: Str) -> Str {
        let base = self.as_bytes();
        let lenleft = if from > 1 { (from - 1) as usize } else { 0 };
        let right_start = (after.max(1) - 1) as usize;
        let right = if right_start <= base.len() {
            &base[right_start..]
        } else {
            &[][..]
        };

        let mut out = Vec::with_capacity(lenleft + value.len() + right.len());
        out.extend_from_slice(&base[..lenleft]);
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(right);
        Str::from_bytes(&out)
    }

    pub fn concat(self, other: Str) -> Str {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        let mut out = Vec::with_capacity(self.len() + other.len());
        out.extend_from_slice(&self.0);
        out.extend_from_slice(&other.0);
        Str::from_bytes(&out)
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Str {}

impl Hash for Str {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state)
    }
}

impl Borrow<[u8]> for Str {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<&str> for Str {
    fn from(value: &str) -> Self {
        Str::from_bytes(value.as_bytes())
    }
}

impl From<String> for Str {
    fn from(value: String) -> Self {
        Str::from_bytes(value.as_bytes())
    }
}

impl From<&[u8]> for Str {
    fn from(value: &[u8]) -> Self {
        Str::from_bytes(value)
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Str({:?})", self.as_str_lossy())
    }
}
