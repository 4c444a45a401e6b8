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

//! The database file format: one item per line, values written as a type tag
//! line followed by their payload.

mod error;
mod intrange;
mod line;
mod program;
mod reader;
mod scxnf;
mod version;
mod writer;

pub use error::{DbError, DbioFailed, FloatError, IntegerError, ScanError};
pub use intrange::{IntRange, string_to_integer};
pub use line::{Line, LineError, LineReader};
pub use program::{ParserClient, ProgramParser, ProgramUnparser, ProgramVector};
pub use reader::DbReader;
pub use scxnf::ScanArg;
pub use version::DbVersion;
pub use writer::{DbWriter, dump_with_retry};
