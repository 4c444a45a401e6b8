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

//! Database format versions and the header line that records them.

use crate::dbio::error::{DbError, DbioFailed};
use crate::dbio::reader::DbReader;
use crate::dbio::scxnf::ScanArg;
use crate::dbio::writer::DbWriter;
use crate::options::Num;
use std::io::{BufRead, Write};
use tracing::{error, info};

/// On-disk format revisions, oldest first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DbVersion {
    /// Before format versions were recorded.
    Prehistory = 0,
    /// Adds the exception handling stack markers.
    Exceptions = 1,
    /// Adds `break` and `continue` in programs.
    BreakCont = 2,
    /// Adds floating-point values.
    Float = 3,
    /// Fixes the encoding of built-in function indices in suspended tasks.
    BfBugFixed = 4,
}

impl DbVersion {
    pub const CURRENT: DbVersion = DbVersion::BfBugFixed;

    pub fn from_num(n: Num) -> Option<DbVersion> {
        Some(match n {
            0 => DbVersion::Prehistory,
            1 => DbVersion::Exceptions,
            2 => DbVersion::BreakCont,
            3 => DbVersion::Float,
            4 => DbVersion::BfBugFixed,
            _ => return None,
        })
    }

    pub fn as_num(self) -> Num {
        self as Num
    }
}

impl Default for DbVersion {
    fn default() -> Self {
        DbVersion::CURRENT
    }
}

const HEADER_FORMAT: &str = "** LambdaMOO Database, Format Version %u **";

impl<R: BufRead> DbReader<R> {
    /// Read the database's first line and adopt the version it names.
    pub fn read_header(&mut self) -> Result<DbVersion, DbError> {
        let mut n: u32 = 0;
        if let Err(e) = self.scxnf(HEADER_FORMAT, &mut [ScanArg::UInt(&mut n)]) {
            error!("Bad format for database header line: {e}");
            return Err(e);
        }
        let Some(version) = DbVersion::from_num(Num::from(n)) else {
            error!("Unsupported database format version {n}");
            return Err(DbError::UnsupportedVersion(Num::from(n)));
        };
        info!(version = n, "reading database");
        self.set_version(version);
        Ok(version)
    }
}

impl<W: Write> DbWriter<W> {
    pub fn write_header(&mut self, version: DbVersion) -> Result<(), DbioFailed> {
        self.printf(format_args!(
            "** LambdaMOO Database, Format Version {} **\n",
            version.as_num()
        ))
    }
}
