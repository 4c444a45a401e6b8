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

//! The tagged value type shared by the database and the virtual machine.
//!
//! Scalars (integers, object ids, error codes, floats and the stack markers)
//! are held inline. Strings and lists live in shared, reference-counted
//! storage; cloning a `Var` takes another reference and dropping it releases
//! one.

use crate::heap::{List, Str};
use crate::numbers::format_float_literal;
use crate::options::{FLOAT_DISPLAY_DIGITS, Num, Objid};
use crate::stream::{Stream, StreamTooBig};
use std::fmt;
use tracing::error;

/// On-disk and in-memory type tags. The discriminants are the numbers written
/// to database files.
#[repr(u8)]
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash)]
pub enum VarType {
    Int = 0,
    Obj = 1,
    Str = 2,
    Err = 3,
    List = 4,
    /// In a clear property's value slot.
    Clear = 5,
    /// In uninitialized variables.
    None = 6,
    /// Stack marker for an exception handler.
    Catch = 7,
    /// Stack marker for a TRY-FINALLY clause.
    Finally = 8,
    Float = 9,
}

/// Wildcard tag used when declaring built-in argument types. Very old
/// databases also wrote it for empty registers.
pub const TYPE_ANY: Num = -1;

impl VarType {
    pub fn from_db_tag(tag: Num) -> Option<VarType> {
        Some(match tag {
            0 => VarType::Int,
            1 => VarType::Obj,
            2 => VarType::Str,
            3 => VarType::Err,
            4 => VarType::List,
            5 => VarType::Clear,
            6 => VarType::None,
            7 => VarType::Catch,
            8 => VarType::Finally,
            9 => VarType::Float,
            _ => return None,
        })
    }

    pub fn db_tag(self) -> Num {
        self as Num
    }
}

#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash)]
pub enum Error {
    E_NONE = 0,
    E_TYPE = 1,
    E_DIV = 2,
    E_PERM = 3,
    E_PROPNF = 4,
    E_VERBNF = 5,
    E_VARNF = 6,
    E_INVIND = 7,
    E_RECMOVE = 8,
    E_MAXREC = 9,
    E_RANGE = 10,
    E_ARGS = 11,
    E_NACC = 12,
    E_INVARG = 13,
    E_QUOTA = 14,
    E_FLOAT = 15,
}

impl Error {
    const ALL: [Error; 16] = [
        Error::E_NONE,
        Error::E_TYPE,
        Error::E_DIV,
        Error::E_PERM,
        Error::E_PROPNF,
        Error::E_VERBNF,
        Error::E_VARNF,
        Error::E_INVIND,
        Error::E_RECMOVE,
        Error::E_MAXREC,
        Error::E_RANGE,
        Error::E_ARGS,
        Error::E_NACC,
        Error::E_INVARG,
        Error::E_QUOTA,
        Error::E_FLOAT,
    ];

    pub fn from_repr(code: Num) -> Option<Error> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn code(self) -> Num {
        self as Num
    }

    /// The symbolic name, e.g. `E_TYPE`.
    pub fn name(self) -> &'static str {
        match self {
            Error::E_NONE => "E_NONE",
            Error::E_TYPE => "E_TYPE",
            Error::E_DIV => "E_DIV",
            Error::E_PERM => "E_PERM",
            Error::E_PROPNF => "E_PROPNF",
            Error::E_VERBNF => "E_VERBNF",
            Error::E_VARNF => "E_VARNF",
            Error::E_INVIND => "E_INVIND",
            Error::E_RECMOVE => "E_RECMOVE",
            Error::E_MAXREC => "E_MAXREC",
            Error::E_RANGE => "E_RANGE",
            Error::E_ARGS => "E_ARGS",
            Error::E_NACC => "E_NACC",
            Error::E_INVARG => "E_INVARG",
            Error::E_QUOTA => "E_QUOTA",
            Error::E_FLOAT => "E_FLOAT",
        }
    }

    /// The human-readable message, e.g. `Type mismatch`.
    pub fn message(self) -> &'static str {
        match self {
            Error::E_NONE => "No error",
            Error::E_TYPE => "Type mismatch",
            Error::E_DIV => "Division by zero",
            Error::E_PERM => "Permission denied",
            Error::E_PROPNF => "Property not found",
            Error::E_VERBNF => "Verb not found",
            Error::E_VARNF => "Variable not found",
            Error::E_INVIND => "Invalid indirection",
            Error::E_RECMOVE => "Recursive move",
            Error::E_MAXREC => "Too many verb calls",
            Error::E_RANGE => "Range error",
            Error::E_ARGS => "Incorrect number of arguments",
            Error::E_NACC => "Move refused by destination",
            Error::E_INVARG => "Invalid argument",
            Error::E_QUOTA => "Resource limit exceeded",
            Error::E_FLOAT => "Floating-point arithmetic error",
        }
    }
}

#[derive(Clone)]
pub enum Var {
    Int(Num),
    Obj(Objid),
    Str(Str),
    Err(Error),
    List(List),
    Clear,
    None,
    Catch(Num),
    Finally(Num),
    Float(f64),
}

impl Default for Var {
    fn default() -> Self {
        Var::None
    }
}

impl Var {
    pub fn var_type(&self) -> VarType {
        match self {
            Var::Int(_) => VarType::Int,
            Var::Obj(_) => VarType::Obj,
            Var::Str(_) => VarType::Str,
            Var::Err(_) => VarType::Err,
            Var::List(_) => VarType::List,
            Var::Clear => VarType::Clear,
            Var::None => VarType::None,
            Var::Catch(_) => VarType::Catch,
            Var::Finally(_) => VarType::Finally,
            Var::Float(_) => VarType::Float,
        }
    }

    /// Does this value hold a reference to shared storage?
    pub fn is_complex(&self) -> bool {
        matches!(self, Var::Str(_) | Var::List(_))
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Var::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&Str> {
        match self {
            Var::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<Num> {
        match self {
            Var::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Value equality. Types must match; strings compare ignoring ASCII case
    /// unless `case_matters`, and lists compare element by element under the
    /// same rule.
    pub fn equals(&self, other: &Var, case_matters: bool) -> bool {
        match (self, other) {
            (Var::Int(a), Var::Int(b))
            | (Var::Obj(a), Var::Obj(b))
            | (Var::Catch(a), Var::Catch(b))
            | (Var::Finally(a), Var::Finally(b)) => a == b,
            (Var::Err(a), Var::Err(b)) => a == b,
            (Var::Float(a), Var::Float(b)) => a == b,
            (Var::Str(a), Var::Str(b)) => {
                if case_matters {
                    a == b
                } else {
                    a.eq_ignore_case(b)
                }
            }
            (Var::List(a), Var::List(b)) => {
                a.ptr_eq(b)
                    || (a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y, case_matters)))
            }
            (Var::Clear, Var::Clear) | (Var::None, Var::None) => true,
            _ => false,
        }
    }

    /// Approximate memory held by this value, counting shared storage as if it
    /// were owned.
    pub fn value_bytes(&self) -> usize {
        let mut size = std::mem::size_of::<Var>();
        match self {
            Var::Str(s) => size += s.len() + 1,
            Var::List(l) => {
                size += std::mem::size_of::<Var>();
                size += l.iter().map(Var::value_bytes).sum::<usize>();
            }
            _ => {}
        }
        size
    }

    /// The value as it would be written in source code.
    pub fn to_literal(&self) -> Result<String, StreamTooBig> {
        let mut stream = Stream::new(0);
        unparse_value(&mut stream, self)?;
        Ok(String::from_utf8_lossy(stream.contents()).into_owned())
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, true)
    }
}

/// Append the source-code form of `v` to `stream`: strings quoted with `"` and
/// `\` escaped, lists in braces, objects as `#n`, errors by name.
pub fn unparse_value(stream: &mut Stream, v: &Var) -> Result<(), StreamTooBig> {
    match v {
        Var::Int(n) => stream.add_fmt(format_args!("{n}")),
        Var::Obj(o) => stream.add_fmt(format_args!("#{o}")),
        Var::Err(e) => stream.add_str(e.name()),
        Var::Float(d) => stream.add_str(&format_float_literal(*d, FLOAT_DISPLAY_DIGITS)),
        Var::Str(s) => {
            stream.add_char(b'"')?;
            for &c in s.as_bytes() {
                if c == b'"' || c == b'\\' {
                    stream.add_char(b'\\')?;
                }
                stream.add_char(c)?;
            }
            stream.add_char(b'"')
        }
        Var::List(l) => {
            stream.add_char(b'{')?;
            for (i, e) in l.iter().enumerate() {
                if i > 0 {
                    stream.add_str(", ")?;
                }
                unparse_value(stream, e)?;
            }
            stream.add_char(b'}')
        }
        other => {
            error!("UNPARSE_VALUE: Unknown Var type = {:?}", other.var_type());
            stream.add_str(">>Unknown value<<")
        }
    }
}

/// The `tostr()` form: strings bare, errors by message, lists elided.
impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Int(n) => write!(f, "{n}"),
            Var::Obj(o) => write!(f, "#{o}"),
            Var::Str(s) => write!(f, "{s}"),
            Var::Err(e) => write!(f, "{}", e.message()),
            Var::Float(d) => write!(f, "{}", format_float_literal(*d, FLOAT_DISPLAY_DIGITS)),
            Var::List(_) => write!(f, "{{list}}"),
            _ => write!(f, ">>Unknown value<<"),
        }
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Int(n) => write!(f, "Var::Int({n})"),
            Var::Obj(o) => write!(f, "Var::Obj(#{o})"),
            Var::Str(s) => write!(f, "Var::Str({:?})", s.as_str_lossy()),
            Var::Err(e) => write!(f, "Var::Err({})", e.name()),
            Var::List(l) => write!(f, "Var::List({l:?})"),
            Var::Clear => write!(f, "Var::Clear"),
            Var::None => write!(f, "Var::None"),
            Var::Catch(n) => write!(f, "Var::Catch({n})"),
            Var::Finally(n) => write!(f, "Var::Finally({n})"),
            Var::Float(d) => write!(f, "Var::Float({d})"),
        }
    }
}

impl From<Num> for Var {
    fn from(value: Num) -> Self {
        Var::Int(value)
    }
}

impl From<f64> for Var {
    fn from(value: f64) -> Self {
        Var::Float(value)
    }
}

impl From<&str> for Var {
    fn from(value: &str) -> Self {
        Var::Str(Str::from(value))
    }
}

impl From<String> for Var {
    fn from(value: String) -> Self {
        Var::Str(Str::from(value))
    }
}

impl From<Str> for Var {
    fn from(value: Str) -> Self {
        Var::Str(value)
    }
}

impl From<List> for Var {
    fn from(value: List) -> Self {
        Var::List(value)
    }
}

impl From<Error> for Var {
    fn from(value: Error) -> Self {
        Var::Err(value)
    }
}

pub fn v_int(n: Num) -> Var {
    Var::Int(n)
}

pub fn v_obj(o: Objid) -> Var {
    Var::Obj(o)
}

pub fn v_str(s: &str) -> Var {
    Var::Str(Str::from(s))
}

pub fn v_string(s: String) -> Var {
    Var::Str(Str::from(s))
}

pub fn v_bytes(b: &[u8]) -> Var {
    Var::Str(Str::from_bytes(b))
}

pub fn v_err(e: Error) -> Var {
    Var::Err(e)
}

pub fn v_float(d: f64) -> Var {
    Var::Float(d)
}

pub fn v_list(elements: &[Var]) -> Var {
    Var::List(List::from_slice(elements))
}

pub fn v_empty_list() -> Var {
    Var::List(List::empty())
}

pub fn v_none() -> Var {
    Var::None
}

pub fn v_clear() -> Var {
    Var::Clear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        for tag in 0..=9 {
            assert_eq!(VarType::from_db_tag(tag).unwrap().db_tag(), tag);
        }
        assert_eq!(VarType::from_db_tag(10), None);
        assert_eq!(VarType::from_db_tag(TYPE_ANY), None);
        assert_eq!(v_float(1.0).var_type(), VarType::Float);
        assert_eq!(v_empty_list().var_type(), VarType::List);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::from_repr(1), Some(Error::E_TYPE));
        assert_eq!(Error::from_repr(15), Some(Error::E_FLOAT));
        assert_eq!(Error::from_repr(16), None);
        assert_eq!(Error::from_repr(-1), None);
        assert_eq!(Error::E_PERM.name(), "E_PERM");
        assert_eq!(Error::E_PERM.message(), "Permission denied");
        assert_eq!(Error::E_INVARG.code(), 13);
    }

    #[test]
    fn test_equality_requires_matching_types() {
        assert_ne!(v_int(1), v_obj(1));
        assert_ne!(v_int(1), v_float(1.0));
        assert_ne!(Var::Catch(1), Var::Finally(1));
        assert_eq!(Var::None, Var::None);
        assert_ne!(Var::None, Var::Clear);
    }

    #[test]
    fn test_string_case_sensitivity() {
        assert!(v_str("Hello").equals(&v_str("hELLO"), false));
        assert!(!v_str("Hello").equals(&v_str("hELLO"), true));
        assert_ne!(v_str("Hello"), v_str("hello"));
    }

    #[test]
    fn test_nested_list_equality() {
        let a = v_list(&[v_int(1), v_list(&[v_str("X"), v_float(2.5)])]);
        let b = v_list(&[v_int(1), v_list(&[v_str("x"), v_float(2.5)])]);
        assert!(a.equals(&b, false));
        assert!(!a.equals(&b, true));
        assert_ne!(a, v_list(&[v_int(1)]));
    }

    #[test]
    fn test_tostr() {
        assert_eq!(v_int(-3).to_string(), "-3");
        assert_eq!(v_obj(12).to_string(), "#12");
        assert_eq!(v_str("plain").to_string(), "plain");
        assert_eq!(v_err(Error::E_DIV).to_string(), "Division by zero");
        assert_eq!(v_float(2.0).to_string(), "2.0");
        assert_eq!(v_list(&[v_int(1)]).to_string(), "{list}");
    }

    #[test]
    fn test_toliteral() {
        let v = v_list(&[
            v_int(1),
            v_obj(-1),
            v_str("say \"hi\" \\ bye"),
            v_err(Error::E_RANGE),
            v_float(0.5),
            v_empty_list(),
        ]);
        assert_eq!(
            v.to_literal().unwrap(),
            r#"{1, #-1, "say \"hi\" \\ bye", E_RANGE, 0.5, {}}"#
        );
    }

    #[test]
    fn test_value_bytes() {
        let scalar = std::mem::size_of::<Var>();
        assert_eq!(v_int(5).value_bytes(), scalar);
        assert_eq!(v_str("abc").value_bytes(), scalar + 4);
        assert_eq!(
            v_list(&[v_int(1), v_str("ab")]).value_bytes(),
            scalar * 2 + scalar + (scalar + 3)
        );
    }

    #[test]
    fn test_clone_shares_storage() {
        let list = v_list(&[v_str("a")]);
        let copy = list.clone();
        assert!(list.as_list().unwrap().ptr_eq(copy.as_list().unwrap()));
        assert!(list.is_complex());
        assert!(!v_int(0).is_complex());
    }
}
