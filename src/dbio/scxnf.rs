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

//! A small line-oriented matcher for the fixed-format lines of a database
//! file (headers, object and verb definitions).
//!
//! A format is a sequence of line templates separated by `\n`. Within a
//! template:
//!
//! - a literal byte must match exactly;
//! - a space matches any run of whitespace, including none;
//! - `%ms` assigns the rest of the line to a [`ScanArg::Str`] and must end the
//!   format;
//! - `%*s` discards the rest of the line;
//! - `%*d` skips an integer;
//! - `%ld`, `%jd`, `%hd`, `%hu`, `%d` and `%u` read an integer of the
//!   corresponding width into the next argument;
//! - `\v` marks the rest of the template as optional. At the start of a
//!   template it makes the whole line optional, so the input may end there.
//!
//! Success yields 1 plus the number of optional parts that were present. With
//! more than one optional part in a format that count cannot say which ones
//! matched, so formats should have at most one.

use crate::dbio::error::{DbError, ScanError};
use crate::dbio::intrange::{IntRange, is_space, string_to_integer, with_int_ranges};
use crate::dbio::reader::DbReader;
use std::io::BufRead;

const OPTIONAL: u8 = b'\x0b';

macro_rules! define_scan_args {
    ($(($variant:ident, $ty:ty, $fn:ident, $conv:literal, $skip:literal)),* $(,)?) => {
        /// Destination for one assigning conversion.
        #[derive(Debug)]
        pub enum ScanArg<'a> {
            $($variant(&'a mut $ty),)*
            Str(&'a mut Vec<u8>),
        }

        impl ScanArg<'_> {
            fn range(&self) -> Option<IntRange> {
                match self {
                    $(ScanArg::$variant(_) => Some(IntRange::$variant),)*
                    ScanArg::Str(_) => None,
                }
            }

            /// Store `i`, which has already been range-checked for this width.
            fn assign_integer(&mut self, i: i64) {
                match self {
                    $(ScanArg::$variant(p) => **p = i as $ty,)*
                    ScanArg::Str(_) => panic!("DBIO_SCXNF: string argument for an integer directive"),
                }
            }
        }
    };
}
with_int_ranges!(define_scan_args);

enum Step {
    /// Keep matching on the current line.
    Continue,
    /// The current template is finished; match the next one on a new line.
    NextLine,
    /// The whole format has been matched.
    Done,
}

struct Matcher<'f, 'a, 'b> {
    format: &'f [u8],
    fc: usize,
    args: std::slice::IterMut<'b, ScanArg<'a>>,
}

impl<'a, 'b> Matcher<'_, 'a, 'b> {
    fn peek(&self) -> Option<u8> {
        self.format.get(self.fc).copied()
    }

    /// Move past the current template's newline.
    fn end_template(&mut self) -> Step {
        self.fc += 1;
        if self.fc >= self.format.len() {
            Step::Done
        } else {
            Step::NextLine
        }
    }

    /// Skip the rest of an optional template that the input did not supply.
    fn skip_optional_template(&mut self) -> Step {
        loop {
            self.fc += 1;
            match self.peek() {
                None => return Step::Done,
                Some(b'\n') => return self.end_template(),
                Some(_) => {}
            }
        }
    }

    fn next_arg(&mut self) -> &'b mut ScanArg<'a> {
        match self.args.next() {
            Some(arg) => arg,
            None => panic!("DBIO_SCXNF: more directives than arguments"),
        }
    }

    /// Handle the conversion starting at the `%` under `fc`.
    fn convert(&mut self, line: &[u8], lc: &mut usize) -> Result<Step, ScanError> {
        self.fc += 1;
        let noassign = self.peek() == Some(b'*');
        if noassign {
            self.fc += 1;
        }

        match self.peek() {
            Some(b'm') => {
                if noassign {
                    panic!("DBIO_SCXNF: %*m... makes no sense");
                }
                self.fc += 1;
                if self.peek() != Some(b's') {
                    panic!("DBIO_SCXNF: %m must be followed by 's'");
                }
                self.fc += 1;
                if self.peek().is_some() {
                    panic!("DBIO_SCXNF: %ms must be at the end");
                }
                match self.next_arg() {
                    ScanArg::Str(dst) => {
                        dst.clear();
                        dst.extend_from_slice(&line[*lc..]);
                    }
                    other => panic!("DBIO_SCXNF: %ms needs a string argument, not {other:?}"),
                }
                Ok(Step::Done)
            }
            Some(b's') => {
                if !noassign {
                    panic!("DBIO_SCXNF: missing 'm' (must be %ms, not %s)");
                }
                self.fc += 1;
                match self.peek() {
                    None => Ok(Step::Done),
                    Some(b'\n') => Ok(self.end_template()),
                    Some(_) => panic!("DBIO_SCXNF: %*s can only be followed by a newline"),
                }
            }
            _ if noassign => {
                if self.peek() != Some(b'd') {
                    panic!("DBIO_SCXNF: %* can only be followed by s or d");
                }
                self.fc += 1;
                if line.get(*lc) == Some(&b'-') {
                    *lc += 1;
                }
                let digits = line[*lc..].iter().take_while(|c| c.is_ascii_digit()).count();
                if digits == 0 {
                    return Err(ScanError::ExpectedSkipInteger);
                }
                *lc += digits;
                Ok(Step::Continue)
            }
            _ => {
                let rest = &self.format[self.fc..];
                let Some(range) = IntRange::ALL
                    .iter()
                    .copied()
                    .find(|r| rest.starts_with(r.conversion().as_bytes()))
                else {
                    panic!("DBIO_SCXNF: Unsupported directive!");
                };
                self.fc += range.conversion().len();

                let (result, consumed) = string_to_integer(range, &line[*lc..]);
                let i = result?;
                *lc += consumed;

                let arg = self.next_arg();
                if arg.range() != Some(range) {
                    panic!("DBIO_SCXNF: %{} given {arg:?}", range.conversion());
                }
                arg.assign_integer(i);
                Ok(Step::Continue)
            }
        }
    }

    /// Match as much of the current template as `line` allows.
    fn match_line(&mut self, line: &[u8], rcount: &mut usize) -> Result<Step, ScanError> {
        let mut lc = 0;
        if self.peek() == Some(OPTIONAL) {
            self.fc += 1;
            *rcount += 1;
        }

        loop {
            if lc == line.len() {
                while self.peek() == Some(b' ') {
                    self.fc += 1;
                }
                let step = match self.peek() {
                    None => Step::Done,
                    Some(OPTIONAL) => self.skip_optional_template(),
                    Some(b'%') => self.convert(line, &mut lc)?,
                    Some(b'\n') => self.end_template(),
                    Some(_) => return Err(ScanError::IncompleteMatch),
                };
                match step {
                    Step::Continue => continue,
                    other => return Ok(other),
                }
            }

            // Input remains, so any optional segment we reach is present.
            while self.peek() == Some(OPTIONAL) {
                self.fc += 1;
                *rcount += 1;
            }
            match self.peek() {
                None | Some(b'\n') => return Err(ScanError::JunkAtEndOfLine),
                Some(b' ') => {
                    while lc < line.len() && is_space(line[lc]) {
                        lc += 1;
                    }
                    self.fc += 1;
                }
                Some(b'%') => match self.convert(line, &mut lc)? {
                    Step::Continue => {}
                    other => return Ok(other),
                },
                Some(c) => {
                    if line[lc] != c {
                        return Err(ScanError::Mismatch);
                    }
                    lc += 1;
                    self.fc += 1;
                }
            }
        }
    }

    /// The input has ended. That is only acceptable if every remaining
    /// template is optional.
    fn finish_at_eof(&mut self) -> Result<(), ScanError> {
        while self.peek() == Some(OPTIONAL) {
            if let Step::Done = self.skip_optional_template() {
                return Ok(());
            }
        }
        Err(ScanError::PrematureEof)
    }
}

impl<R: BufRead> DbReader<R> {
    /// Match the next line(s) of input against `format`, storing assigning
    /// conversions into `args` in order.
    ///
    /// Returns 1 plus the number of optional parts present. Nothing is logged
    /// on failure; that is left to the caller.
    ///
    /// # Panics
    ///
    /// If `format` is malformed or `args` does not fit it.
    pub fn scxnf(&mut self, format: &str, args: &mut [ScanArg<'_>]) -> Result<usize, DbError> {
        let mut matcher = Matcher {
            format: format.as_bytes(),
            fc: 0,
            args: args.iter_mut(),
        };
        let mut rcount = 1;

        loop {
            let Some(line) = self.lines.read_line()? else {
                matcher.finish_at_eof()?;
                return Ok(rcount);
            };
            match matcher.match_line(line.bytes, &mut rcount)? {
                Step::Done => return Ok(rcount),
                Step::NextLine | Step::Continue => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> DbReader<Cursor<Vec<u8>>> {
        DbReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    fn scan_error(r: Result<usize, DbError>) -> ScanError {
        match r {
            Err(DbError::Scan(e)) => e,
            other => panic!("expected a scan error, got {other:?}"),
        }
    }

    #[test]
    fn test_literal_and_integers() {
        let mut r = reader("#12 flags 7\n");
        let (mut obj, mut flags) = (0i64, 0i32);
        let n = r
            .scxnf(
                "#%ld flags %d",
                &mut [ScanArg::Num(&mut obj), ScanArg::Int(&mut flags)],
            )
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!((obj, flags), (12, 7));
    }

    #[test]
    fn test_space_matches_any_whitespace() {
        let mut r = reader("a\t \tb\nab\n");
        assert_eq!(r.scxnf("a b", &mut []).unwrap(), 1);
        assert_eq!(r.scxnf("a b", &mut []).unwrap(), 1);
    }

    #[test]
    fn test_optional_segment() {
        assert_eq!(reader("a\n").scxnf("a\x0bb", &mut []).unwrap(), 1);
        assert_eq!(reader("ab\n").scxnf("a\x0bb", &mut []).unwrap(), 2);
        assert_eq!(
            scan_error(reader("ac\n").scxnf("a\x0bb", &mut [])),
            ScanError::Mismatch
        );
    }

    #[test]
    fn test_optional_line_at_eof() {
        let mut n = 0i32;
        let mut r = reader("first\n");
        assert_eq!(
            r.scxnf("first\n\x0b%d", &mut [ScanArg::Int(&mut n)]).unwrap(),
            1
        );

        let mut r = reader("first\n42\n");
        assert_eq!(
            r.scxnf("first\n\x0b%d", &mut [ScanArg::Int(&mut n)]).unwrap(),
            2
        );
        assert_eq!(n, 42);

        assert_eq!(
            scan_error(reader("first\n").scxnf("first\n%d", &mut [ScanArg::Int(&mut n)])),
            ScanError::PrematureEof
        );
    }

    #[test]
    fn test_rest_of_line() {
        let mut name = Vec::new();
        let mut r = reader("name: The Wizard  \n");
        assert_eq!(
            r.scxnf("name: %ms", &mut [ScanArg::Str(&mut name)]).unwrap(),
            1
        );
        assert_eq!(name, b"The Wizard  ");

        let mut r = reader("skip whatever\nnext\n");
        assert_eq!(r.scxnf("skip%*s\nnext", &mut []).unwrap(), 1);
    }

    #[test]
    fn test_skip_integer() {
        let mut r = reader("-12 x\n");
        assert_eq!(r.scxnf("%*d x", &mut []).unwrap(), 1);
        assert_eq!(
            scan_error(reader("y\n").scxnf("%*d", &mut [])),
            ScanError::ExpectedSkipInteger
        );
    }

    #[test]
    fn test_failures() {
        assert_eq!(
            scan_error(reader("abc\n").scxnf("ab", &mut [])),
            ScanError::JunkAtEndOfLine
        );
        assert_eq!(
            scan_error(reader("ab\n").scxnf("abc", &mut [])),
            ScanError::IncompleteMatch
        );
        let mut small = 0u16;
        assert_eq!(
            scan_error(reader("70000\n").scxnf("%hu", &mut [ScanArg::UInt16(&mut small)])),
            ScanError::Integer(crate::dbio::error::IntegerError::TooLarge)
        );
    }

    #[test]
    fn test_integer_fields_take_sign_and_digits_only() {
        let mut n = 0i32;
        for text in ["+5\n", " 5\n"] {
            assert_eq!(
                scan_error(reader(text).scxnf("%d", &mut [ScanArg::Int(&mut n)])),
                ScanError::Integer(crate::dbio::error::IntegerError::Expected)
            );
        }
        // A space in the format absorbs the whitespace instead.
        assert_eq!(
            reader(" 5\n").scxnf(" %d", &mut [ScanArg::Int(&mut n)]).unwrap(),
            1
        );
        assert_eq!(n, 5);
    }

    #[test]
    #[should_panic(expected = "missing 'm'")]
    fn test_plain_s_is_rejected() {
        let mut out = Vec::new();
        let _ = reader("x\n").scxnf("%s", &mut [ScanArg::Str(&mut out)]);
    }
}
