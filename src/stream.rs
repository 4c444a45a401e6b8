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

//! Growable byte buffer used to accumulate output and to read input lines of
//! arbitrary length.
//!
//! A `Stream` owns a single byte region whose size is a power of two (at least
//! 32 bytes) and a cursor marking how much of it is in use. There is always at
//! least one spare byte past the cursor so the contents can be handed out
//! NUL-terminated.
//!
//! While overflow mode is enabled on the current thread (see
//! [`StreamExceptions`]), growth past [`stream_alloc_maximum`] fails with
//! [`StreamTooBig`] instead of allocating.

use crate::options::{DEFAULT_STREAM_ALLOC_MAXIMUM, MIN_STREAM_SIZE};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

/// Raised when a stream would grow past the allocation ceiling while overflow
/// mode is enabled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("stream too big: {requested} bytes needed, limit is {limit}")]
pub struct StreamTooBig {
    pub requested: usize,
    pub limit: usize,
}

static STREAM_ALLOC_MAXIMUM: AtomicUsize = AtomicUsize::new(DEFAULT_STREAM_ALLOC_MAXIMUM);

thread_local! {
    static ALLOW_STREAM_EXCEPTIONS: Cell<u32> = const { Cell::new(0) };
}

/// Set the ceiling enforced while overflow mode is enabled.
pub fn set_stream_alloc_maximum(limit: usize) {
    STREAM_ALLOC_MAXIMUM.store(limit, Ordering::Relaxed);
}

pub fn stream_alloc_maximum() -> usize {
    STREAM_ALLOC_MAXIMUM.load(Ordering::Relaxed)
}

/// Is overflow mode in effect on this thread?
pub fn stream_exceptions_enabled() -> bool {
    ALLOW_STREAM_EXCEPTIONS.with(|c| c.get() > 0)
}

/// Guard that keeps overflow mode enabled on the current thread until dropped.
///
/// Guards nest: overflow mode stays on until every outstanding guard is gone.
pub struct StreamExceptions {
    _not_send: PhantomData<*const ()>,
}

impl StreamExceptions {
    pub fn enable() -> Self {
        ALLOW_STREAM_EXCEPTIONS.with(|c| c.set(c.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for StreamExceptions {
    fn drop(&mut self) {
        ALLOW_STREAM_EXCEPTIONS.with(|c| c.set(c.get().saturating_sub(1)));
    }
}

/// Run `f` with overflow mode enabled. Any [`StreamTooBig`] raised inside
/// surfaces here as `f`'s error.
pub fn with_stream_exceptions<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let _guard = StreamExceptions::enable();
    f()
}

/// Held by tests that change the allocation ceiling, since it is process-wide.
#[cfg(test)]
pub(crate) fn lock_alloc_maximum() -> std::sync::MutexGuard<'static, ()> {
    static CEILING_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    CEILING_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Smallest power of two strictly greater than `v`.
fn next_2_power(v: usize) -> usize {
    (v + 1).next_power_of_two()
}

pub struct Stream {
    buffer: Vec<u8>,
    current: usize,
}

impl Stream {
    pub fn new(size_hint: usize) -> Self {
        let size = next_2_power(size_hint | (MIN_STREAM_SIZE - 1));
        Self {
            buffer: vec![0; size],
            current: 0,
        }
    }

    /// Make room for `need` more bytes plus the terminator.
    /// Returns whether the buffer was reallocated.
    fn grow(&mut self, need: usize) -> Result<bool, StreamTooBig> {
        let wanted = self.current + need;
        if wanted < self.buffer.len() {
            return Ok(false);
        }

        let mut newlen = next_2_power(wanted);
        if stream_exceptions_enabled() {
            let limit = stream_alloc_maximum();
            if newlen > limit {
                if wanted < limit {
                    newlen = limit;
                } else {
                    return Err(StreamTooBig {
                        requested: wanted,
                        limit,
                    });
                }
            }
        }

        debug!(from = self.buffer.len(), to = newlen, "growing stream");
        self.buffer.resize(newlen, 0);
        Ok(true)
    }

    pub fn add_char(&mut self, c: u8) -> Result<(), StreamTooBig> {
        self.grow(1)?;
        self.buffer[self.current] = c;
        self.current += 1;
        Ok(())
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamTooBig> {
        self.grow(bytes.len())?;
        self.buffer[self.current..self.current + bytes.len()].copy_from_slice(bytes);
        self.current += bytes.len();
        Ok(())
    }

    pub fn add_str(&mut self, s: &str) -> Result<(), StreamTooBig> {
        self.add_bytes(s.as_bytes())
    }

    /// Append formatted text, e.g. `stream.add_fmt(format_args!("#{}", n))`.
    pub fn add_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), StreamTooBig> {
        let mut adapter = StreamFmt {
            stream: self,
            error: None,
        };
        match fmt::write(&mut adapter, args) {
            Ok(()) => Ok(()),
            Err(_) => match adapter.error {
                Some(e) => Err(e),
                None => panic!("a formatting trait implementation returned an error"),
            },
        }
    }

    /// Drop the last byte, if there is one.
    pub fn delete_char(&mut self) {
        if self.current > 0 {
            self.current -= 1;
        }
    }

    /// Hand back the current contents and logically empty the stream. The
    /// allocation is kept, so the returned bytes stay intact until the stream
    /// is next written to.
    pub fn reset(&mut self) -> &[u8] {
        let len = self.current;
        self.buffer[len] = 0;
        self.current = 0;
        &self.buffer[..len]
    }

    pub fn contents(&self) -> &[u8] {
        &self.buffer[..self.current]
    }

    /// The contents followed by a NUL byte.
    pub fn c_contents(&mut self) -> &[u8] {
        self.buffer[self.current] = 0;
        &self.buffer[..=self.current]
    }

    pub fn last_byte(&self) -> Option<u8> {
        self.contents().last().copied()
    }

    pub fn len(&self) -> usize {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Expose at least `need` writable bytes past the cursor without moving it.
    ///
    /// The region stops one byte short of the allocation so the terminator
    /// always fits. Once the region has been filled, report the untouched tail
    /// with [`Stream::end_fill`].
    pub fn begin_fill(&mut self, need: usize) -> Result<&mut [u8], StreamTooBig> {
        self.grow(need)?;
        let end = self.buffer.len() - 1;
        Ok(&mut self.buffer[self.current..end])
    }

    /// Advance the cursor over the part of the last `begin_fill` region that
    /// was written, given how many bytes at its end were left `unused`.
    pub fn end_fill(&mut self, unused: usize) {
        let region = self.buffer.len() - 1 - self.current;
        debug_assert!(unused <= region, "end_fill: more unused than exposed");
        self.current += region - unused.min(region);
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("len", &self.current)
            .field("capacity", &self.buffer.len())
            .finish()
    }
}

struct StreamFmt<'a> {
    stream: &'a mut Stream,
    error: Option<StreamTooBig>,
}

impl fmt::Write for StreamFmt<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.stream.add_str(s).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_capacity() {
        assert_eq!(Stream::new(0).capacity(), 32);
        assert_eq!(Stream::new(31).capacity(), 32);
        assert_eq!(Stream::new(32).capacity(), 64);
        assert_eq!(Stream::new(100).capacity(), 128);
    }

    #[test]
    fn test_byte_at_a_time_growth() {
        let mut s = Stream::new(0);
        for i in 0..1000u32 {
            s.add_char((i % 251) as u8).unwrap();
            assert!(s.len() <= s.capacity() - 1);
            assert!(s.capacity().is_power_of_two());
        }
        assert_eq!(s.len(), 1000);
        for (i, b) in s.contents().iter().enumerate() {
            assert_eq!(*b, (i % 251) as u8);
        }
    }

    #[test]
    fn test_large_single_append() {
        let mut s = Stream::new(0);
        s.add_str("ab").unwrap();
        let big = vec![b'x'; 5000];
        s.add_bytes(&big).unwrap();
        assert_eq!(s.len(), 5002);
        assert_eq!(s.capacity(), 8192);
        assert_eq!(&s.contents()[..3], b"abx");
    }

    #[test]
    fn test_delete_char_never_underflows() {
        let mut s = Stream::new(0);
        s.delete_char();
        assert_eq!(s.len(), 0);
        s.add_str("hi").unwrap();
        s.delete_char();
        assert_eq!(s.contents(), b"h");
        s.delete_char();
        s.delete_char();
        assert!(s.is_empty());
    }

    #[test]
    fn test_reset_keeps_allocation() {
        let mut s = Stream::new(0);
        s.add_str("hello world, this is more than thirty-two bytes").unwrap();
        let cap = s.capacity();
        assert_eq!(s.reset(), b"hello world, this is more than thirty-two bytes");
        assert_eq!(s.len(), 0);
        assert_eq!(s.capacity(), cap);
        s.add_str("x").unwrap();
        assert_eq!(s.c_contents(), b"x\0");
    }

    #[test]
    fn test_add_fmt() {
        let mut s = Stream::new(0);
        s.add_fmt(format_args!("#{} and {:?}", -7, "q")).unwrap();
        assert_eq!(s.contents(), b"#-7 and \"q\"");
    }

    #[test]
    fn test_fill_round_trip() {
        let mut s = Stream::new(0);
        s.add_str("pre:").unwrap();
        let region = s.begin_fill(10).unwrap();
        assert!(region.len() >= 10);
        let exposed = region.len();
        region[..3].copy_from_slice(b"abc");
        s.end_fill(exposed - 3);
        assert_eq!(s.contents(), b"pre:abc");

        // A region larger than what is left forces growth.
        let region = s.begin_fill(100).unwrap();
        assert!(region.len() >= 100);
        let exposed = region.len();
        region[..100].fill(b'z');
        s.end_fill(exposed - 100);
        assert_eq!(s.len(), 107);
        assert_eq!(s.last_byte(), Some(b'z'));
    }

    #[test]
    fn test_overflow_mode() {
        let _ceiling = lock_alloc_maximum();
        let saved = stream_alloc_maximum();
        set_stream_alloc_maximum(100);

        // Without overflow mode the ceiling is ignored.
        let mut s = Stream::new(0);
        s.add_bytes(&[0; 200]).unwrap();

        let mut s = Stream::new(0);
        let result = with_stream_exceptions(|| {
            // 70 bytes would round up to 128; clamped to the ceiling instead.
            s.add_bytes(&[1; 70])?;
            assert_eq!(s.capacity(), 100);
            s.add_bytes(&[2; 29])?;
            // 70 + 29 + 1 leaves no room for the terminator.
            s.add_char(3)
        });
        assert_eq!(
            result,
            Err(StreamTooBig {
                requested: 100,
                limit: 100
            })
        );
        assert_eq!(s.len(), 99);

        // Guards nest.
        {
            let _outer = StreamExceptions::enable();
            {
                let _inner = StreamExceptions::enable();
                assert!(stream_exceptions_enabled());
            }
            assert!(stream_exceptions_enabled());
            assert!(Stream::new(0).add_bytes(&[0; 500]).is_err());
        }
        assert!(!stream_exceptions_enabled());

        set_stream_alloc_maximum(saved);
    }
}
