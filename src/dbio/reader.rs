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

//! Reading scalars and values from a database file.
//!
//! Every `read_*` method consumes whole lines. On failure the problem is logged
//! once, here, with the offending text and file position, and the returned
//! error carries the same details.

use crate::dbio::error::{DbError, FloatError, IntegerError};
use crate::dbio::intrange::{IntRange, is_space, string_to_integer, with_int_ranges};
use crate::dbio::line::{Line, LineReader};
use crate::dbio::version::DbVersion;
use crate::heap::{List, Str};
use crate::intern::intern;
use crate::options::{MAX_LIST, MAX_VALUE_DEPTH, Objid};
use crate::var::{Error, TYPE_ANY, Var, VarType};
use std::io::BufRead;
use tracing::{debug, error};

/// Elements reserved up front for a list, whatever length the file claims.
const LIST_PREALLOCATION: usize = 4096;

pub struct DbReader<R> {
    pub(crate) lines: LineReader<R>,
    version: DbVersion,
}

impl<R: BufRead> DbReader<R> {
    pub fn new(input: R) -> Self {
        Self::with_version(input, DbVersion::CURRENT)
    }

    pub fn with_version(input: R, version: DbVersion) -> Self {
        Self {
            lines: LineReader::new(input),
            version,
        }
    }

    pub fn version(&self) -> DbVersion {
        self.version
    }

    pub fn set_version(&mut self, version: DbVersion) {
        self.version = version;
    }

    /// Bytes consumed from the input so far.
    pub fn position(&self) -> u64 {
        self.lines.position()
    }

    pub fn peek_byte(&mut self) -> Result<Option<u8>, DbError> {
        Ok(self.lines.peek_byte()?)
    }

    pub fn skip_lines(&mut self, n: usize, caller: &'static str) -> Result<(), DbError> {
        if self.lines.skip_lines(n)? {
            return Ok(());
        }
        error!("{caller}: Unexpected end of file");
        Err(DbError::UnexpectedEof { caller })
    }

    pub fn into_inner(self) -> R {
        self.lines.into_inner()
    }

    fn read_line_noisy(&mut self, caller: &'static str) -> Result<Line<'_>, DbError> {
        match self.lines.read_line()? {
            Some(line) => Ok(line),
            None => {
                error!("{caller}: Unexpected end of file");
                Err(DbError::UnexpectedEof { caller })
            }
        }
    }

    /// Read a line holding nothing but a decimal integer within `range`.
    pub fn read_integer(&mut self, range: IntRange) -> Result<i64, DbError> {
        const CALLER: &str = "DBIO_READ_INTEGER";
        let line = self.read_line_noisy(CALLER)?;
        let text = line.bytes;

        let leading = text.iter().take_while(|&&c| is_space(c)).count();
        let (result, consumed) = string_to_integer(range, &text[leading..]);
        let result = result.and_then(|i| {
            if leading > 0 || leading + consumed != text.len() {
                Err(IntegerError::NotEntireLine)
            } else {
                Ok(i)
            }
        });

        result.map_err(|kind| {
            let text = String::from_utf8_lossy(text).into_owned();
            error!("{CALLER}: {kind}: {text:?} at file pos. {}", line.offset);
            DbError::BadInteger {
                caller: CALLER,
                kind,
                text,
                offset: line.offset,
            }
        })
    }

    pub fn read_objid(&mut self) -> Result<Objid, DbError> {
        self.read_num()
    }

    /// Read a line holding a finite floating-point number.
    pub fn read_float(&mut self) -> Result<f64, DbError> {
        const CALLER: &str = "DBIO_READ_FLOAT";
        let line = self.read_line_noisy(CALLER)?;
        let text = line.bytes;

        let parsed = match text.first() {
            Some(&c) if is_space(c) => None,
            _ => std::str::from_utf8(text)
                .ok()
                .and_then(|s| s.parse::<f64>().ok()),
        };
        let result = match parsed {
            None => Err(FloatError::NotEntireLine),
            Some(d) if !d.is_finite() => Err(FloatError::NotReal),
            Some(d) => Ok(d),
        };

        result.map_err(|kind| {
            let text = String::from_utf8_lossy(text).into_owned();
            error!("{CALLER}: {kind}: {text:?} at file pos. {}", line.offset);
            DbError::BadFloat {
                caller: CALLER,
                kind,
                text,
                offset: line.offset,
            }
        })
    }

    /// The next line, verbatim. Only valid until the next read; copy it to
    /// keep it.
    pub fn read_string(&mut self) -> Result<&[u8], DbError> {
        Ok(self.read_line_noisy("DBIO_READ_STRING")?.bytes)
    }

    /// The next line as a string shared with any equal string read before.
    pub fn read_string_intern(&mut self) -> Result<Str, DbError> {
        Ok(intern(
            self.read_line_noisy("DBIO_READ_STRING_INTERN")?.bytes,
        ))
    }

    /// Read a type tag line followed by that type's payload.
    pub fn read_var(&mut self) -> Result<Var, DbError> {
        self.read_nested_var(0)
    }

    /// Read the payload of a value whose type tag is already known.
    ///
    /// A list that fails partway through is discarded in full; nothing read for
    /// it outlives the error. Lists may nest at most [`MAX_VALUE_DEPTH`] deep.
    pub fn read_var_value(&mut self, tag: i64) -> Result<Var, DbError> {
        self.read_nested_value(tag, 0)
    }

    /// `depth` counts the lists enclosing the value being read.
    fn read_nested_var(&mut self, depth: usize) -> Result<Var, DbError> {
        let tag = self.read_intmax()?;
        self.read_nested_value(tag, depth)
    }

    fn read_nested_value(&mut self, tag: i64, depth: usize) -> Result<Var, DbError> {
        // Very old databases wrote TYPE_ANY for empty registers.
        let tag = if tag == TYPE_ANY && self.version == DbVersion::Prehistory {
            VarType::None.db_tag()
        } else {
            tag
        };

        let Some(var_type) = VarType::from_db_tag(tag) else {
            let offset = self.position();
            error!("DBIO_READ_VAR: Unknown type ({tag}) at DB file pos. {offset}");
            return Err(DbError::UnknownType { tag, offset });
        };

        Ok(match var_type {
            VarType::Clear => Var::Clear,
            VarType::None => Var::None,
            VarType::Str => Var::Str(self.read_string_intern()?),
            VarType::Int => Var::Int(self.read_num()?),
            VarType::Obj => Var::Obj(self.read_objid()?),
            VarType::Catch => Var::Catch(self.read_num()?),
            VarType::Finally => Var::Finally(self.read_num()?),
            VarType::Float => Var::Float(self.read_float()?),
            VarType::Err => {
                let code = self.read_num()?;
                match Error::from_repr(code) {
                    Some(e) => Var::Err(e),
                    None => {
                        let offset = self.position();
                        error!("DBIO_READ_VAR: Unknown error code ({code}) at DB file pos. {offset}");
                        return Err(DbError::UnknownError { code, offset });
                    }
                }
            }
            VarType::List => Var::List(self.read_list_elements(depth)?),
        })
    }

    fn read_list_elements(&mut self, depth: usize) -> Result<List, DbError> {
        if depth >= MAX_VALUE_DEPTH {
            let offset = self.position();
            error!("DBIO_READ_VAR: Lists nested deeper than {MAX_VALUE_DEPTH} at DB file pos. {offset}");
            return Err(DbError::TooDeep {
                limit: MAX_VALUE_DEPTH,
                offset,
            });
        }

        let len = self.read_num()?;
        let Some(count) = usize::try_from(len).ok().filter(|&n| n <= MAX_LIST) else {
            let offset = self.position();
            error!("DBIO_READ_VAR: Bad list length ({len}) at DB file pos. {offset}");
            return Err(DbError::BadListLength { len, offset });
        };

        let mut elements = Vec::with_capacity(count.min(LIST_PREALLOCATION));
        for _ in 0..count {
            match self.read_nested_var(depth + 1) {
                Ok(v) => elements.push(v),
                Err(e) => {
                    debug!(
                        read = elements.len(),
                        expected = count,
                        "discarding partially read list"
                    );
                    return Err(e);
                }
            }
        }
        Ok(List::from_vec(elements))
    }
}

// One `read_<width>` per row of the range table, e.g. `read_int16`.
macro_rules! define_integer_readers {
    ($(($variant:ident, $ty:ty, $fn:ident, $conv:literal, $skip:literal)),* $(,)?) => {
        paste::paste! {
            impl<R: BufRead> DbReader<R> {
                $(
                    pub fn [<read_ $fn>](&mut self) -> Result<$ty, DbError> {
                        self.read_integer(IntRange::$variant).map(|i| i as $ty)
                    }
                )*
            }
        }
    };
}
with_int_ranges!(define_integer_readers);
