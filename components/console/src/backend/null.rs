//! Null console (no output)
//!
//! Discards everything. Selected with the `console-null` feature for builds
//! that must stay silent; writes cost nothing beyond the line buffering in
//! the facade.

use tilecon_fdt_scan::ScanError;

use super::{Backend, Probe};

#[derive(Debug, Clone, Copy, Default)]
pub struct NullConsole;

impl NullConsole {
    pub const fn new() -> Self {
        Self
    }
}

impl Backend for NullConsole {
    #[inline(always)]
    fn write_byte(&mut self, _byte: u8) {}

    #[inline(always)]
    fn write_block(&mut self, _buf: &[u8]) {}

    #[inline(always)]
    fn read_byte(&mut self) -> Option<u8> {
        None
    }
}

impl<B> Probe<B> for NullConsole {
    fn probe(_bus: B, _blob: &[u8]) -> Result<Self, ScanError> {
        Ok(Self)
    }
}
