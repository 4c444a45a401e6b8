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

//! Compile-time sizing for values and the database format.

/// The integer type carried by Int, Obj, Err, Catch and Finally values.
pub type Num = i64;

/// Object ids share the integer representation.
pub type Objid = Num;

/// Longest string a value may hold, in bytes.
pub const MAX_STRING: usize = i32::MAX as usize - 9;

/// Longest list a value may hold, in elements.
pub const MAX_LIST: usize = i32::MAX as usize / 16 - 2;

/// Deepest nesting of lists accepted when reading a value from a database.
pub const MAX_VALUE_DEPTH: usize = 128;

/// Significant digits used when a float is shown to users.
pub const FLOAT_DISPLAY_DIGITS: usize = f64::DIGITS as usize;

/// Significant digits used when a float is written to a database file.
/// Four more than `DBL_DIG` so that the value reads back bit-for-bit.
pub const FLOAT_DB_DIGITS: usize = f64::DIGITS as usize + 4;

/// Stream growth ceiling used while overflow mode is enabled, until a host
/// calls [`crate::stream::set_stream_alloc_maximum`].
pub const DEFAULT_STREAM_ALLOC_MAXIMUM: usize = MAX_STRING + 1;

/// Smallest buffer a stream will ever allocate.
pub const MIN_STREAM_SIZE: usize = 32;
