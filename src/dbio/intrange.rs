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

//! Integer widths the database format knows how to read, and the range check
//! applied to each.

use crate::dbio::error::IntegerError;
use crate::options::Num;

/// Invoke `$cb!` with one row per supported integer width:
/// `(Variant, rust type, reader suffix, scxnf conversion, skip range check)`.
///
/// The reader functions, the scan argument type and the range table are all
/// generated from this list so they cannot drift apart.
macro_rules! with_int_ranges {
    ($cb:ident) => {
        $cb! {
            (Num,    i64, num,    "ld", true),
            (IntMax, i64, intmax, "jd", true),
            (Int16,  i16, int16,  "hd", false),
            (UInt16, u16, uint16, "hu", false),
            (Int,    i32, int,    "d",  false),
            (UInt,   u32, uint,   "u",  false),
        }
    };
}
pub(crate) use with_int_ranges;

macro_rules! define_int_ranges {
    ($(($variant:ident, $ty:ty, $fn:ident, $conv:literal, $skip:literal)),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IntRange {
            $($variant,)*
        }

        impl IntRange {
            pub const ALL: &'static [IntRange] = &[$(IntRange::$variant,)*];

            pub fn min(self) -> i64 {
                match self {
                    $(IntRange::$variant => <$ty>::MIN as i64,)*
                }
            }

            pub fn max(self) -> i64 {
                match self {
                    $(IntRange::$variant => (<$ty>::MAX as i128).min(i64::MAX as i128) as i64,)*
                }
            }

            /// Ranges as wide as the parser itself need no checking.
            pub fn skip(self) -> bool {
                match self {
                    $(IntRange::$variant => $skip,)*
                }
            }

            /// The `scxnf` conversion letters selecting this width.
            pub fn conversion(self) -> &'static str {
                match self {
                    $(IntRange::$variant => $conv,)*
                }
            }
        }
    };
}
with_int_ranges!(define_int_ranges);

const _: () = assert!(Num::MAX as i128 == i64::MAX as i128);

pub(crate) fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

/// Parse a decimal integer from the front of `s` and check it against
/// `range`.
///
/// Returns the result together with how many bytes were consumed, so callers
/// can decide whether trailing text is acceptable. The count covers the digits
/// even when the value is out of range; it is 0 when no digits were found.
pub fn string_to_integer(range: IntRange, s: &[u8]) -> (Result<i64, IntegerError>, usize) {
    let negative = s.first() == Some(&b'-');
    let start = usize::from(negative);
    let digits = s[start..].iter().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return (Err(IntegerError::Expected), 0);
    }
    let consumed = start + digits;

    let mut value: Option<i64> = Some(0);
    for &c in &s[start..consumed] {
        let d = i64::from(c - b'0');
        value = value.and_then(|v| v.checked_mul(10)).and_then(|v| {
            if negative {
                v.checked_sub(d)
            } else {
                v.checked_add(d)
            }
        });
    }
    let Some(i) = value else {
        return (Err(IntegerError::Overflow), consumed);
    };

    let result = if range.skip() {
        Ok(i)
    } else if i < range.min() {
        Err(if range.min() == 0 {
            IntegerError::MustBeUnsigned
        } else {
            IntegerError::TooNegative
        })
    } else if i > range.max() {
        Err(IntegerError::TooLarge)
    } else {
        Ok(i)
    };
    (result, consumed)
}
