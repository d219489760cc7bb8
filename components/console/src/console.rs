//! Boot console facade

use core::fmt;

use crate::backend::Backend;
use crate::discovery::ConsoleOptions;
use crate::env::Identity;
use crate::line::LineState;

/// Console context owned by boot code
///
/// Wraps the compiled-in backend with line prefixing and, unless the
/// device tree says `nobuf`, line buffering.
pub struct BootConsole<K, I> {
    backend: K,
    identity: I,
    line: LineState,
}

impl<K: Backend, I: Identity> BootConsole<K, I> {
    pub fn new(backend: K, identity: I, options: ConsoleOptions) -> Self {
        Self {
            backend,
            identity,
            line: LineState::new(options.buffering),
        }
    }

    /// Write one character
    pub fn putchar(&mut self, ch: u8) {
        self.line.put(&mut self.backend, &self.identity, ch);
    }

    /// Non-blocking read from the backend
    pub fn getchar(&mut self) -> Option<u8> {
        self.backend.read_byte()
    }

    /// Push out a partially collected line
    pub fn flush(&mut self) {
        self.line.flush(&mut self.backend);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.putchar(b);
        }
    }

    pub fn is_buffered(&self) -> bool {
        self.line.buffering()
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }
}

impl<K: Backend, I: Identity> fmt::Write for BootConsole<K, I> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}
