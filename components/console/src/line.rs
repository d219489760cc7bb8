//! Line prefixing and buffering
//!
//! Every output line starts with an identity prefix naming the tile that
//! printed it, so output of many tiles can be told apart on the host. With
//! buffering on, prefix and payload are collected and handed to the
//! backend as one block when the line ends or the buffer fills.

use core::fmt::{self, Write};

use static_assertions::const_assert_eq;

use crate::backend::Backend;
use crate::env::{Identity, TileId};
use crate::regs::{TcuWindow, MAX_PRINT_REGS};

/// Capacity of the prefix buffer, terminator slot included
pub const PREFIX_CAPACITY: usize = 32;

/// Size of the line accumulation buffer
pub const LINE_BUFFER_SIZE: usize = 256;

// a full line buffer is exactly one print window plus the byte that
// does not fit into a single print command
const_assert_eq!(LINE_BUFFER_SIZE, MAX_PRINT_REGS * TcuWindow::REG_SIZE);

/// Identity prefix, `"(Lx@C{chip}T0{tile}) "`
#[derive(Clone, Copy)]
pub struct Prefix {
    buf: [u8; PREFIX_CAPACITY],
    len: usize,
}

impl Prefix {
    pub fn for_tile(id: TileId) -> Self {
        let mut prefix = Self {
            buf: [0; PREFIX_CAPACITY],
            len: 0,
        };
        // write_str never fails, it truncates
        let _ = write!(prefix, "(Lx@C{}T0{}) ", id.chip(), id.tile());
        prefix
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Write for Prefix {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = PREFIX_CAPACITY - 1 - self.len;
        let take = s.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(s) => f.debug_tuple("Prefix").field(&s).finish(),
            Err(_) => f.debug_tuple("Prefix").field(&self.as_bytes()).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    LineStart,
    MidLine,
}

#[repr(C, align(8))]
struct LineBuffer([u8; LINE_BUFFER_SIZE]);

pub struct LineState {
    position: Position,
    prefix: Option<Prefix>,
    buf: LineBuffer,
    pos: usize,
    buffering: bool,
}

impl LineState {
    pub const fn new(buffering: bool) -> Self {
        Self {
            position: Position::LineStart,
            prefix: None,
            buf: LineBuffer([0; LINE_BUFFER_SIZE]),
            pos: 0,
            buffering,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn buffering(&self) -> bool {
        self.buffering
    }

    /// Bytes waiting for the next flush
    pub fn pending(&self) -> &[u8] {
        &self.buf.0[..self.pos]
    }

    /// The cached prefix, once the first character has been written
    pub fn prefix(&self) -> Option<&Prefix> {
        self.prefix.as_ref()
    }

    /// Feed one character
    pub fn put<K: Backend, I: Identity>(&mut self, backend: &mut K, identity: &I, ch: u8) {
        if self.position == Position::LineStart {
            let prefix = *self
                .prefix
                .get_or_insert_with(|| Prefix::for_tile(identity.tile_id()));
            for &b in prefix.as_bytes() {
                self.emit(backend, b);
            }
            self.position = Position::MidLine;
        }

        self.emit(backend, ch);
        if self.buffering && (ch == b'\n' || self.pos == LINE_BUFFER_SIZE) {
            self.flush(backend);
        }

        if ch == b'\n' {
            self.position = Position::LineStart;
        }
    }

    /// Hand buffered bytes to the backend in blocks it accepts whole
    pub fn flush<K: Backend>(&mut self, backend: &mut K) {
        if self.pos == 0 {
            return;
        }
        let max = backend.max_block().max(1);
        for chunk in self.buf.0[..self.pos].chunks(max) {
            backend.write_block(chunk);
        }
        self.pos = 0;
    }

    fn emit<K: Backend>(&mut self, backend: &mut K, b: u8) {
        if !self.buffering {
            backend.write_byte(b);
            return;
        }
        // put() flushes at capacity, and the prefix only goes into an empty buffer
        self.buf.0[self.pos] = b;
        self.pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Recorder;
    use std::vec::Vec;

    const ID: TileId = TileId::new(3, 5);

    #[test]
    fn test_prefix_format() {
        assert_eq!(Prefix::for_tile(ID).as_bytes(), b"(Lx@C3T05) ");
        assert_eq!(Prefix::for_tile(TileId::new(0, 12)).as_bytes(), b"(Lx@C0T012) ");
        assert_eq!(Prefix::for_tile(TileId::from_raw(0x0102)).as_bytes(), b"(Lx@C1T02) ");
    }

    #[test]
    fn test_prefix_truncates() {
        let mut p = Prefix::for_tile(ID);
        let _ = p.write_str("0123456789abcdefghijklmnopqrstuvwxyz");
        assert_eq!(p.as_bytes().len(), PREFIX_CAPACITY - 1);
        assert!(p.as_bytes().starts_with(b"(Lx@C3T05) 0123"));
    }

    #[test]
    fn test_buffered_waits_for_newline() {
        let mut out = Recorder::new(usize::MAX);
        let mut line = LineState::new(true);
        for &b in b"abc" {
            line.put(&mut out, &ID, b);
        }
        assert!(out.bytes.is_empty());
        assert_eq!(line.pending(), b"(Lx@C3T05) abc");

        line.put(&mut out, &ID, b'\n');
        assert_eq!(out.bytes, b"(Lx@C3T05) abc\n");
        assert_eq!(out.blocks, [15]);
        assert_eq!(line.position(), Position::LineStart);
    }

    #[test]
    fn test_prefix_once_per_line() {
        let mut out = Recorder::new(usize::MAX);
        let mut line = LineState::new(false);
        for &b in b"a\nb\n\n" {
            line.put(&mut out, &ID, b);
        }
        let expected: Vec<u8> = [&b"(Lx@C3T05) a\n"[..], b"(Lx@C3T05) b\n", b"(Lx@C3T05) \n"].concat();
        assert_eq!(out.bytes, expected);
        assert!(out.blocks.is_empty());
    }

    #[test]
    fn test_identity_read_once() {
        struct Counting(core::cell::Cell<u32>);
        impl Identity for Counting {
            fn tile_id(&self) -> TileId {
                self.0.set(self.0.get() + 1);
                ID
            }
        }
        let id = Counting(core::cell::Cell::new(0));
        let mut out = Recorder::new(usize::MAX);
        let mut line = LineState::new(true);
        for &b in b"x\ny\n" {
            line.put(&mut out, &id, b);
        }
        assert_eq!(id.0.get(), 1);
    }

    #[test]
    fn test_full_buffer_flushes_in_blocks() {
        let mut out = Recorder::new(255);
        let mut line = LineState::new(true);
        let payload = [b'z'; 300];
        for &b in &payload {
            line.put(&mut out, &ID, b);
        }
        // 11 prefix bytes + 245 payload fill the buffer once
        assert_eq!(out.blocks, [255, 1]);
        assert_eq!(line.pending().len(), 300 - 245);
        assert_eq!(line.position(), Position::MidLine);

        line.flush(&mut out);
        assert_eq!(out.bytes.len(), 11 + 300);
        assert!(line.pending().is_empty());
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let mut out = Recorder::new(usize::MAX);
        let mut line = LineState::new(true);
        line.flush(&mut out);
        assert!(out.blocks.is_empty());
    }
}
