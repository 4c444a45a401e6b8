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

//! Whole-line input over a reusable [`Stream`].

use crate::stream::{Stream, StreamTooBig};
use std::io::{self, BufRead, ErrorKind};

/// One line of input, without its terminating newline. Borrowed from the
/// reader's buffer, so it is only good until the next read.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub bytes: &'a [u8],
    /// Input position just past the line's newline.
    pub offset: u64,
}

pub struct LineReader<R> {
    input: R,
    stream: Stream,
    position: u64,
}

/// Copy bytes from `input` into `dst` up to and including the first newline,
/// stopping early if `dst` fills. Returns how many bytes were copied; 0 means
/// end of input.
fn fgets<R: BufRead>(input: &mut R, dst: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < dst.len() {
        let available = match input.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            break;
        }
        let room = (dst.len() - filled).min(available.len());
        let (take, found_newline) = match available[..room].iter().position(|&c| c == b'\n') {
            Some(i) => (i + 1, true),
            None => (room, false),
        };
        dst[filled..filled + take].copy_from_slice(&available[..take]);
        input.consume(take);
        filled += take;
        if found_newline {
            break;
        }
    }
    Ok(filled)
}

impl<R: BufRead> LineReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            stream: Stream::new(0),
            position: 0,
        }
    }

    /// Bytes consumed from the input so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next complete line. `None` means the input ended before a
    /// newline was seen; a trailing partial line is discarded.
    pub fn read_line(&mut self) -> Result<Option<Line<'_>>, LineError> {
        loop {
            let region = self.stream.begin_fill(2)?;
            let exposed = region.len();
            let got = fgets(&mut self.input, region)?;
            if got == 0 {
                break;
            }
            self.position += got as u64;
            let ended = region[got - 1] == b'\n';
            self.stream.end_fill(exposed - got);
            if ended || got < exposed {
                break;
            }
        }

        if self.stream.last_byte() != Some(b'\n') {
            self.stream.reset();
            return Ok(None);
        }
        self.stream.delete_char();
        let offset = self.position;
        Ok(Some(Line {
            bytes: self.stream.reset(),
            offset,
        }))
    }

    /// Consume one byte.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let c = self.peek_byte()?;
        if c.is_some() {
            self.input.consume(1);
            self.position += 1;
        }
        Ok(c)
    }

    /// The next byte, left in place.
    pub fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.input.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Discard `n` lines. Returns false if the input ended first.
    pub fn skip_lines(&mut self, mut n: usize) -> io::Result<bool> {
        while n > 0 {
            match self.read_byte()? {
                None => return Ok(false),
                Some(b'\n') => n -= 1,
                Some(_) => {}
            }
        }
        Ok(true)
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

/// Failure underneath line reading, as opposed to simply running out of input.
#[derive(thiserror::Error, Debug)]
pub enum LineError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    TooBig(#[from] StreamTooBig),
}
