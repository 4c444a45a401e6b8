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

//! Writing scalars and values to a database file.
//!
//! All output goes through [`DbWriter::put`]. A sink failure comes back as
//! [`DbioFailed`] and is meant to be passed straight up with `?` to whoever is
//! running the dump.

use crate::dbio::error::DbioFailed;
use crate::numbers::format_g;
use crate::options::{FLOAT_DB_DIGITS, Num, Objid};
use crate::var::Var;
use std::fmt::{self, Write as _};
use std::io::{self, Write};
use tracing::{error, warn};

pub struct DbWriter<W> {
    output: W,
    scratch: String,
}

impl<W: Write> DbWriter<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            scratch: String::new(),
        }
    }

    pub(crate) fn put(&mut self, bytes: &[u8]) -> Result<(), DbioFailed> {
        Ok(self.output.write_all(bytes)?)
    }

    /// Formatted output, e.g. `w.printf(format_args!("{n}\n"))`.
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> Result<(), DbioFailed> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        // Writing into a String cannot fail.
        let _ = scratch.write_fmt(args);
        let result = self.put(scratch.as_bytes());
        self.scratch = scratch;
        result
    }

    pub fn write_intmax(&mut self, n: i64) -> Result<(), DbioFailed> {
        self.printf(format_args!("{n}\n"))
    }

    pub fn write_num(&mut self, n: Num) -> Result<(), DbioFailed> {
        self.write_intmax(n)
    }

    pub fn write_objid(&mut self, oid: Objid) -> Result<(), DbioFailed> {
        self.write_intmax(oid)
    }

    /// Enough digits that reading the line back gives the same `f64`.
    pub fn write_float(&mut self, d: f64) -> Result<(), DbioFailed> {
        let text = format_g(d, FLOAT_DB_DIGITS);
        self.printf(format_args!("{text}\n"))
    }

    /// One line, verbatim. The bytes must not contain a newline.
    pub fn write_string(&mut self, s: &[u8]) -> Result<(), DbioFailed> {
        debug_assert!(!s.contains(&b'\n'), "database strings are single lines");
        self.put(s)?;
        self.put(b"\n")
    }

    /// The type tag, then the payload; lists write their length and then each
    /// element in order.
    pub fn write_var(&mut self, v: &Var) -> Result<(), DbioFailed> {
        self.write_intmax(v.var_type().db_tag())?;
        match v {
            Var::Clear | Var::None => Ok(()),
            Var::Str(s) => self.write_string(s.as_bytes()),
            Var::Int(n) | Var::Obj(n) | Var::Catch(n) | Var::Finally(n) => self.write_num(*n),
            Var::Err(e) => self.write_num(e.code()),
            Var::Float(d) => self.write_float(*d),
            Var::List(l) => {
                self.write_num(l.len() as Num)?;
                for element in l.iter() {
                    self.write_var(element)?;
                }
                Ok(())
            }
        }
    }

    pub fn flush(&mut self) -> Result<(), DbioFailed> {
        Ok(self.output.flush()?)
    }

    pub fn get_ref(&self) -> &W {
        &self.output
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

/// Run a complete dump, starting over with a fresh sink if it fails.
///
/// `open` is called once per attempt to produce the sink, and `dump` writes
/// everything to it. A failed attempt is logged and retried, up to `attempts`
/// tries in all. The last failure is returned if none succeed.
pub fn dump_with_retry<W, T>(
    attempts: usize,
    mut open: impl FnMut(usize) -> io::Result<W>,
    mut dump: impl FnMut(&mut DbWriter<W>) -> Result<T, DbioFailed>,
) -> Result<T, DbioFailed>
where
    W: Write,
{
    let mut last = None;
    for attempt in 1..=attempts.max(1) {
        let result = open(attempt).map(DbWriter::new).map_err(DbioFailed::from).and_then(
            |mut writer| {
                let value = dump(&mut writer)?;
                writer.flush()?;
                Ok(value)
            },
        );
        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, attempts, "database dump failed: {e}");
                last = Some(e);
            }
        }
    }
    let e = last.unwrap_or_else(|| DbioFailed(io::Error::other("no dump attempted")));
    error!("giving up on database dump: {e}");
    Err(e)
}
