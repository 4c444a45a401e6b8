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

//! Program text embedded in a database file.
//!
//! A program is stored as its source lines followed by a line holding a single
//! `.`. Source lines that themselves begin with `.` have it doubled. The
//! compiler is not part of this crate: reading hands the raw bytes to a
//! [`ProgramParser`] and writing asks a [`ProgramUnparser`] for the lines.

use crate::dbio::error::{DbError, DbioFailed};
use crate::dbio::line::LineReader;
use crate::dbio::reader::DbReader;
use crate::dbio::version::DbVersion;
use crate::dbio::writer::DbWriter;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use tracing::{error, info};

/// What a parser sees while compiling program text.
pub trait ParserClient {
    fn error(&mut self, message: &str);
    fn warning(&mut self, message: &str);
    /// The next byte of program text; `None` once the text has ended.
    fn getc(&mut self) -> Option<u8>;
}

pub trait ProgramParser {
    type Program;

    /// Compile everything `client` yields. `None` if the text did not
    /// compile; the reasons will have gone to `client.error`.
    fn parse_program(
        &self,
        version: DbVersion,
        client: &mut dyn ParserClient,
    ) -> Option<Self::Program>;
}

/// Which body of a program to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramVector {
    Main,
    /// The body of the `n`th `fork` statement.
    Fork(usize),
}

pub trait ProgramUnparser {
    type Program;

    /// Hand each source line of `vector`, without its newline, to `line`.
    fn unparse_program(
        &self,
        program: &Self::Program,
        vector: ProgramVector,
        line: &mut dyn FnMut(&[u8]) -> Result<(), DbioFailed>,
    ) -> Result<(), DbioFailed>;
}

/// Byte source for a parser that stops at the terminating `.` line.
struct ProgramSource<'a, R> {
    lines: &'a mut LineReader<R>,
    name: &'a dyn Display,
    prev_char: u8,
    ended: bool,
    io_error: Option<io::Error>,
}

impl<R: BufRead> ProgramSource<'_, R> {
    fn next_byte(&mut self) -> Option<u8> {
        match self.lines.read_byte() {
            Ok(c) => c,
            Err(e) => {
                self.io_error = Some(e);
                None
            }
        }
    }

    fn peek(&mut self) -> Option<u8> {
        match self.lines.peek_byte() {
            Ok(c) => c,
            Err(e) => {
                self.io_error = Some(e);
                None
            }
        }
    }
}

impl<R: BufRead> ParserClient for ProgramSource<'_, R> {
    fn error(&mut self, message: &str) {
        error!("PARSER: Error in {}: {message}", self.name);
    }

    fn warning(&mut self, message: &str) {
        info!("PARSER: Warning in {}: {message}", self.name);
    }

    fn getc(&mut self) -> Option<u8> {
        if self.ended {
            return None;
        }
        let Some(c) = self.next_byte() else {
            self.ended = true;
            self.error("Unexpected EOF");
            return None;
        };

        if c == b'.' && self.prev_char == b'\n' {
            match self.peek() {
                Some(b'\n') | None => {
                    // End of program; the newline after the dot goes with it.
                    self.next_byte();
                    self.ended = true;
                    return None;
                }
                Some(b'.') => {
                    self.next_byte();
                }
                Some(_) => {}
            }
        }
        self.prev_char = c;
        Some(c)
    }
}

impl<R: BufRead> DbReader<R> {
    /// Read program text up to its terminating `.` line and compile it with
    /// `parser`. `name` identifies the program in log messages.
    pub fn read_program<P: ProgramParser>(
        &mut self,
        parser: &P,
        name: &dyn Display,
    ) -> Result<P::Program, DbError> {
        let version = self.version();
        let mut source = ProgramSource {
            lines: &mut self.lines,
            name,
            prev_char: b'\n',
            ended: false,
            io_error: None,
        };
        let program = parser.parse_program(version, &mut source);
        if let Some(e) = source.io_error {
            return Err(DbError::Io(e));
        }
        program.ok_or_else(|| DbError::Program {
            name: name.to_string(),
        })
    }
}

impl<W: Write> DbWriter<W> {
    pub fn write_program<U: ProgramUnparser>(
        &mut self,
        unparser: &U,
        program: &U::Program,
    ) -> Result<(), DbioFailed> {
        self.write_program_vector(unparser, program, ProgramVector::Main)
    }

    pub fn write_forked_program<U: ProgramUnparser>(
        &mut self,
        unparser: &U,
        program: &U::Program,
        fork_index: usize,
    ) -> Result<(), DbioFailed> {
        self.write_program_vector(unparser, program, ProgramVector::Fork(fork_index))
    }

    fn write_program_vector<U: ProgramUnparser>(
        &mut self,
        unparser: &U,
        program: &U::Program,
        vector: ProgramVector,
    ) -> Result<(), DbioFailed> {
        unparser.unparse_program(program, vector, &mut |line| {
            if line.first() == Some(&b'.') {
                self.put(b".")?;
            }
            self.put(line)?;
            self.put(b"\n")
        })?;
        self.put(b".\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Treats program text as a list of lines; fails on text containing `!`.
    struct LineParser;

    impl ProgramParser for LineParser {
        type Program = Vec<Vec<u8>>;

        fn parse_program(
            &self,
            _version: DbVersion,
            client: &mut dyn ParserClient,
        ) -> Option<Self::Program> {
            let mut lines = vec![];
            let mut current = vec![];
            while let Some(c) = client.getc() {
                match c {
                    b'\n' => lines.push(std::mem::take(&mut current)),
                    b'!' => {
                        client.error("bang");
                        return None;
                    }
                    c => current.push(c),
                }
            }
            if !current.is_empty() {
                client.warning("missing final newline");
                lines.push(current);
            }
            Some(lines)
        }
    }

    struct LineUnparser;

    impl ProgramUnparser for LineUnparser {
        type Program = Vec<Vec<u8>>;

        fn unparse_program(
            &self,
            program: &Self::Program,
            vector: ProgramVector,
            line: &mut dyn FnMut(&[u8]) -> Result<(), DbioFailed>,
        ) -> Result<(), DbioFailed> {
            match vector {
                ProgramVector::Main => program.iter().try_for_each(|l| line(l)),
                ProgramVector::Fork(i) => line(format!("fork {i}").as_bytes()),
            }
        }
    }

    fn reader(text: &[u8]) -> DbReader<Cursor<Vec<u8>>> {
        DbReader::new(Cursor::new(text.to_vec()))
    }

    #[test]
    fn test_terminator_ends_program() {
        let mut r = reader(b"print(1);\n.\n0\n");
        let program = r.read_program(&LineParser, &"#0:test").unwrap();
        assert_eq!(program, vec![b"print(1);".to_vec()]);
        // The terminator's newline is consumed along with it.
        assert_eq!(r.read_num().unwrap(), 0);
    }

    #[test]
    fn test_terminator_at_end_of_input() {
        let mut r = reader(b"a\n.");
        assert_eq!(
            r.read_program(&LineParser, &"x").unwrap(),
            vec![b"a".to_vec()]
        );
    }

    #[test]
    fn test_dots_inside_lines_pass_through() {
        let mut r = reader(b"x = 1.5;\n..y\n.\n");
        assert_eq!(
            r.read_program(&LineParser, &"x").unwrap(),
            vec![b"x = 1.5;".to_vec(), b".y".to_vec()]
        );
    }

    #[test]
    fn test_parse_failure() {
        let mut r = reader(b"oops!\n.\n");
        assert!(matches!(
            r.read_program(&LineParser, &"bad"),
            Err(DbError::Program { name }) if name == "bad"
        ));
    }

    #[test]
    fn test_missing_terminator() {
        let mut r = reader(b"no end");
        // The parser still gets what there was; the EOF is reported to it.
        assert_eq!(
            r.read_program(&LineParser, &"x").unwrap(),
            vec![b"no end".to_vec()]
        );
    }

    #[test]
    fn test_write_program_round_trip() {
        let program = vec![b"return 1;".to_vec(), b".leading".to_vec()];
        let mut w = DbWriter::new(Vec::new());
        w.write_program(&LineUnparser, &program).unwrap();
        w.write_forked_program(&LineUnparser, &program, 2).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes, b"return 1;\n..leading\n.\nfork 2\n.\n");

        let mut r = reader(&bytes);
        assert_eq!(r.read_program(&LineParser, &"x").unwrap(), program);
        assert_eq!(
            r.read_program(&LineParser, &"x").unwrap(),
            vec![b"fork 2".to_vec()]
        );
    }
}
