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

//! Shared, copy-on-write lists.
//!
//! Layout: `[Int(n), e1, e2, ..., en]`. Slot 0 carries the arity, the way the
//! database format and older code expect a length-prefixed array; elements are
//! addressed 1-based.
//!
//! Every operation consumes the list it is given. If that handle is the only
//! reference, appending mutates the storage in place; in every other case a new
//! list is built, the carried-over elements are cloned (which takes a reference
//! on any string or list they hold) and the old handle is dropped.
//!
//! All zero-length lists share one allocation.

use crate::options::Num;
use crate::var::Var;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

static EMPTY_LIST: Lazy<List> = Lazy::new(|| List(Arc::new(vec![Var::Int(0)])));

#[derive(Clone)]
pub struct List(Arc<Vec<Var>>);

impl List {
    /// A list of `size` elements, each `Int(0)`, for the caller to fill in.
    /// `new_list(0)` hands out another reference to the shared empty list.
    pub fn new_list(size: usize) -> List {
        if size == 0 {
            return Self::empty();
        }
        let mut slots = Vec::with_capacity(size + 1);
        slots.push(Var::Int(size as Num));
        slots.resize(size + 1, Var::Int(0));
        List(Arc::new(slots))
    }

    pub fn empty() -> List {
        EMPTY_LIST.clone()
    }

    pub fn from_vec(elements: Vec<Var>) -> List {
        if elements.is_empty() {
            return Self::empty();
        }
        let mut slots = Vec::with_capacity(elements.len() + 1);
        slots.push(Var::Int(elements.len() as Num));
        slots.extend(elements);
        List(Arc::new(slots))
    }

    pub fn from_slice(elements: &[Var]) -> List {
        Self::from_vec(elements.to_vec())
    }

    /// Arity, as recorded in slot 0.
    pub fn len(&self) -> usize {
        match self.0[0] {
            Var::Int(n) => n as usize,
            ref other => panic!("list slot 0 holds {other:?} instead of its arity"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at 1-based `pos`.
    pub fn get(&self, pos: usize) -> Option<&Var> {
        if pos == 0 {
            return None;
        }
        self.0.get(pos)
    }

    pub fn as_slice(&self) -> &[Var] {
        &self.0[1..]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Var> {
        self.as_slice().iter()
    }

    /// Do both handles share the same storage?
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    fn debug_check_arity(&self) {
        debug_assert_eq!(self.len() + 1, self.0.len(), "list arity out of sync");
    }

    fn build(capacity: usize, parts: &[&[Var]]) -> List {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.push(Var::Int(capacity as Num));
        for part in parts {
            slots.extend_from_slice(part);
        }
        if slots.len() == 1 {
            return Self::empty();
        }
        let list = List(Arc::new(slots));
        list.debug_check_arity();
        list
    }

    /// Insert `value` at `pos`, clamped to `[1, len + 1]`.
    pub fn insert(self, value: Var, pos: Num) -> List {
        let len = self.len();
        let pos = if pos <= 0 {
            1
        } else if pos as usize > len {
            len + 1
        } else {
            pos as usize
        };
        self.doinsert(value, pos)
    }

    pub fn append(self, value: Var) -> List {
        let pos = self.len() + 1;
        self.doinsert(value, pos)
    }

    fn doinsert(mut self, value: Var, pos: usize) -> List {
        let size = self.len() + 1;

        if pos == size {
            if let Some(slots) = Arc::get_mut(&mut self.0) {
                slots.push(value);
                slots[0] = Var::Int(size as Num);
                return self;
            }
        }

        let elements = self.as_slice();
        let mut slots = Vec::with_capacity(size + 1);
        slots.push(Var::Int(size as Num));
        slots.extend_from_slice(&elements[..pos - 1]);
        slots.push(value);
        slots.extend_from_slice(&elements[pos - 1..]);
        let list = List(Arc::new(slots));
        list.debug_check_arity();
        list
    }

    /// Remove the element at `pos`, which must be in `[1, len]`.
    pub fn delete(self, pos: usize) -> List {
        let elements = self.as_slice();
        Self::build(
            elements.len() - 1,
            &[&elements[..pos - 1], &elements[pos..]],
        )
    }

    /// Replace the element at `pos`, which must be in `[1, len]`. The storage
    /// is duplicated first if anyone else holds it.
    pub fn set(mut self, value: Var, pos: usize) -> List {
        let slots = Arc::make_mut(&mut self.0);
        slots[pos] = value;
        self
    }

    pub fn concat(self, other: List) -> List {
        let (a, b) = (self.as_slice(), other.as_slice());
        Self::build(a.len() + b.len(), &[a, b])
    }

    /// Elements `[first, after)`, 1-based. An empty or inverted range yields
    /// the empty list.
    pub fn sublist(self, first: Num, after: Num) -> List {
        if after <= first {
            return Self::empty();
        }
        let elements = self.as_slice();
        let (start, end) = ((first - 1) as usize, (after - 1) as usize);
        Self::build(end - start, &[&elements[start..end]])
    }

    /// Replace elements `[from, after)`, 1-based, with the elements of `value`.
    ///
    /// Keeps everything before `from` and everything from `after` on. `value`
    /// may share elements with `self`; each kept element is cloned before
    /// either input is released.
    pub fn range_set(self, from: Num, after: Num, value: List) -> List {
        let base = self.as_slice();
        let lenleft = if from > 1 { (from - 1) as usize } else { 0 };
        let right_start = (after.max(1) - 1) as usize;
        let right = if right_start <= base.len() {
            &base[right_start..]
        } else {
            &[][..]
        };
        let replacement = value.as_slice();
        Self::build(
            lenleft + replacement.len() + right.len(),
            &[&base[..lenleft], replacement, right],
        )
    }

    /// 1-based position of the first element equal to `value`, or 0.
    pub fn ismember(&self, value: &Var, case_matters: bool) -> usize {
        self.iter()
            .position(|e| value.equals(e, case_matters))
            .map_or(0, |i| i + 1)
    }

    /// Append `value` unless an equal element is already present.
    pub fn setadd(self, value: Var) -> List {
        if self.ismember(&value, false) != 0 {
            return self;
        }
        self.append(value)
    }

    /// Remove the first element equal to `value`, if any.
    pub fn setremove(self, value: &Var) -> List {
        match self.ismember(value, false) {
            0 => self,
            i => self.delete(i),
        }
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.as_slice() == other.as_slice()
    }
}

impl FromIterator<Var> for List {
    fn from_iter<T: IntoIterator<Item = Var>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Var;
    type IntoIter = std::slice::Iter<'a, Var>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::{v_int, v_str};

    fn ints(list: &List) -> Vec<Num> {
        list.iter()
            .map(|v| match v {
                Var::Int(n) => *n,
                other => panic!("expected an integer, got {other:?}"),
            })
            .collect()
    }

    fn list_of(ns: &[Num]) -> List {
        ns.iter().map(|n| v_int(*n)).collect()
    }

    #[test]
    fn test_empty_list_is_a_singleton() {
        let a = List::new_list(0);
        let b = List::new_list(0);
        assert!(a.ptr_eq(&b));
        assert!(a.ptr_eq(&List::from_vec(vec![])));
        assert!(a.ptr_eq(&list_of(&[1]).delete(1)));
        assert_eq!(a.len(), 0);
    }

    #[test]
    fn test_new_list_records_arity() {
        let l = List::new_list(3);
        assert_eq!(l.len(), 3);
        assert_eq!(l.as_slice().len(), 3);
        assert_eq!(l.get(0), None);
        assert_eq!(l.get(3), Some(&v_int(0)));
        assert_eq!(l.get(4), None);
    }

    #[test]
    fn test_insert_clamps_position() {
        assert_eq!(ints(&list_of(&[1, 2]).insert(v_int(0), -5)), vec![0, 1, 2]);
        assert_eq!(ints(&list_of(&[1, 2]).insert(v_int(9), 99)), vec![1, 2, 9]);
        assert_eq!(ints(&list_of(&[1, 2]).insert(v_int(5), 2)), vec![1, 5, 2]);
    }

    #[test]
    fn test_insert_into_shared_list_copies() {
        let original = list_of(&[1, 2, 3]);
        let other = original.clone();
        assert_eq!(original.refcount(), 2);

        let grown = original.insert(v_int(4), 4);
        assert!(!grown.ptr_eq(&other));
        assert_eq!(ints(&other), vec![1, 2, 3]);
        assert_eq!(ints(&grown), vec![1, 2, 3, 4]);
        assert_eq!(other.refcount(), 1);
    }

    #[test]
    fn test_append_to_unique_list_is_in_place() {
        let mut list = list_of(&[1, 2, 3]);
        let before_ptr = list.0.as_ref() as *const Vec<Var>;
        for n in 4..=64 {
            list = list.append(v_int(n));
            assert_eq!(list.0.as_ref() as *const Vec<Var>, before_ptr);
        }
        assert_eq!(ints(&list), (1..=64).collect::<Vec<_>>());
        assert_eq!(list.len(), 64);
    }

    #[test]
    fn test_middle_insert_on_unique_list_copies() {
        let list = list_of(&[1, 3]);
        let s = v_str("kept");
        let list = list.insert(s.clone(), 2).insert(v_int(2), 2);
        assert_eq!(list.len(), 4);
        assert_eq!(list.get(3), Some(&s));
    }

    #[test]
    fn test_delete() {
        let list = list_of(&[1, 2, 3]);
        let keep = list.clone();
        let smaller = list.delete(2);
        assert_eq!(ints(&smaller), vec![1, 3]);
        assert_eq!(ints(&keep), vec![1, 2, 3]);
    }

    #[test]
    fn test_set_duplicates_on_demand() {
        let list = list_of(&[1, 2, 3]);
        let keep = list.clone();
        let changed = list.set(v_int(20), 2);
        assert_eq!(ints(&changed), vec![1, 20, 3]);
        assert_eq!(ints(&keep), vec![1, 2, 3]);

        let unique = list_of(&[1]);
        let before = unique.0.as_ref() as *const Vec<Var>;
        let unique = unique.set(v_int(7), 1);
        assert_eq!(unique.0.as_ref() as *const Vec<Var>, before);
    }

    #[test]
    fn test_concat_releases_inputs() {
        let s = v_str("shared element");
        let a = List::from_vec(vec![s.clone(), v_int(1)]);
        let b = List::from_vec(vec![s.clone()]);
        let c = a.concat(b);
        assert_eq!(c.len(), 3);
        if let Var::Str(inner) = &s {
            // Ours plus two in `c`.
            assert_eq!(inner.refcount(), 3);
        }
    }

    #[test]
    fn test_sublist() {
        let list = list_of(&[1, 2, 3, 4, 5]);
        assert_eq!(ints(&list.clone().sublist(2, 4)), vec![2, 3]);
        assert_eq!(ints(&list.clone().sublist(1, 6)), vec![1, 2, 3, 4, 5]);
        assert!(list.clone().sublist(3, 3).ptr_eq(&List::empty()));
        assert!(list.sublist(4, 2).is_empty());
    }

    #[test]
    fn test_range_set() {
        let list = list_of(&[1, 2, 3, 4, 5]);
        assert_eq!(
            ints(&list.clone().range_set(2, 4, list_of(&[9]))),
            vec![1, 9, 4, 5]
        );
        assert_eq!(
            ints(&list.clone().range_set(3, 3, list_of(&[7, 8]))),
            vec![1, 2, 7, 8, 3, 4, 5]
        );
        assert_eq!(
            ints(&list.clone().range_set(1, 6, List::empty())),
            Vec::<Num>::new()
        );
        // Replacement aliasing the base.
        let alias = list.clone();
        assert_eq!(
            ints(&list.range_set(5, 6, alias)),
            vec![1, 2, 3, 4, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_ismember() {
        let list = List::from_vec(vec![v_int(1), v_str("Foo"), v_int(3)]);
        assert_eq!(list.ismember(&v_int(3), true), 3);
        assert_eq!(list.ismember(&v_str("foo"), false), 2);
        assert_eq!(list.ismember(&v_str("foo"), true), 0);
        assert_eq!(list.ismember(&v_int(99), false), 0);
    }

    #[test]
    fn test_setadd_setremove() {
        let list = list_of(&[1, 2]);
        let list = list.setadd(v_int(2));
        assert_eq!(ints(&list), vec![1, 2]);
        let list = list.setadd(v_int(3));
        assert_eq!(ints(&list), vec![1, 2, 3]);
        let list = list.setremove(&v_int(1));
        assert_eq!(ints(&list), vec![2, 3]);
        let list = list.setremove(&v_int(1));
        assert_eq!(ints(&list), vec![2, 3]);
    }
}
