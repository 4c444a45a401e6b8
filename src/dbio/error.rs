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

//! Error types for database reading and writing.

use crate::dbio::line::LineError;
use crate::options::Num;
use crate::stream::StreamTooBig;
use thiserror::Error;

/// Why a line of text is not an acceptable integer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerError {
    #[error("Integer overflow on read")]
    Overflow,
    #[error("Integer expected")]
    Expected,
    #[error("Integer too negative")]
    TooNegative,
    #[error("Integer must be unsigned")]
    MustBeUnsigned,
    #[error("Integer too large")]
    TooLarge,
    #[error("Did not read entire line")]
    NotEntireLine,
}

/// Why a line of text is not an acceptable float.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatError {
    #[error("Did not read entire line")]
    NotEntireLine,
    #[error("Magnitude too large or NaN")]
    NotReal,
}

/// Why a line-format match failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    #[error("premature EOF")]
    PrematureEof,
    #[error("could not match entire format")]
    IncompleteMatch,
    #[error("unexpected junk at end-of-line")]
    JunkAtEndOfLine,
    #[error("character mismatch")]
    Mismatch,
    #[error("expected an integer to skip")]
    ExpectedSkipInteger,
    #[error(transparent)]
    Integer(#[from] IntegerError),
}

/// Input-side failure while loading a database.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("{caller}: Unexpected end of file")]
    UnexpectedEof { caller: &'static str },

    #[error("{caller}: {kind}: {text:?} at file pos. {offset}")]
    BadInteger {
        caller: &'static str,
        kind: IntegerError,
        text: String,
        offset: u64,
    },

    #[error("{caller}: {kind}: {text:?} at file pos. {offset}")]
    BadFloat {
        caller: &'static str,
        kind: FloatError,
        text: String,
        offset: u64,
    },

    #[error("Unknown Var type ({tag}) at DB file pos. {offset}")]
    UnknownType { tag: i64, offset: u64 },

    #[error("Unknown error code ({code}) at DB file pos. {offset}")]
    UnknownError { code: Num, offset: u64 },

    #[error("Bad list length ({len}) at DB file pos. {offset}")]
    BadListLength { len: Num, offset: u64 },

    #[error("Lists nested deeper than {limit} at DB file pos. {offset}")]
    TooDeep { limit: usize, offset: u64 },

    #[error("Unsupported database format version {0}")]
    UnsupportedVersion(Num),

    #[error("Format mismatch: {0}")]
    Scan(#[from] ScanError),

    #[error("Could not parse program {name}")]
    Program { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TooBig(#[from] StreamTooBig),
}

impl DbError {
    /// Did the input simply run out?
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            DbError::UnexpectedEof { .. } | DbError::Scan(ScanError::PrematureEof)
        )
    }
}

/// The output sink refused a write. Propagated unchanged through the writer
/// so a whole dump can be abandoned and retried in one place.
#[derive(Error, Debug)]
#[error("DB output failed: {0}")]
pub struct DbioFailed(#[from] pub std::io::Error);

impl From<LineError> for DbError {
    fn from(e: LineError) -> Self {
        match e {
            LineError::Io(e) => DbError::Io(e),
            LineError::TooBig(e) => DbError::TooBig(e),
        }
    }
}
