//! Console backends
//!
//! Every backend implements [`Backend`], the byte-level capability the
//! console facade is written against. Exactly one backend is selected per
//! build (see [`crate::config`]) and never switched afterwards.
//!
//! All waits inside backends are unbounded busy loops: boot code has no
//! scheduler to yield to, and a device that never acknowledges hangs the
//! caller.

use tilecon_fdt_scan::ScanError;

pub mod gem5;
pub mod null;
pub mod sifive;
pub mod tcu;

pub use gem5::Gem5Console;
pub use null::NullConsole;
pub use sifive::{SifiveUart, TxPoll, UartConfig};
pub use tcu::TcuConsole;

/// Byte-oriented console device
pub trait Backend {
    /// Write one byte
    fn write_byte(&mut self, byte: u8);

    /// Write a run of bytes
    ///
    /// Backends with a block transfer path write at most [`max_block`]
    /// bytes per call and drop the rest. The default writes byte by byte.
    ///
    /// [`max_block`]: Backend::max_block
    fn write_block(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.write_byte(byte);
        }
    }

    /// Non-blocking read; `None` when no byte is available
    fn read_byte(&mut self) -> Option<u8>;

    /// Largest block [`write_block`](Backend::write_block) delivers in full
    fn max_block(&self) -> usize {
        usize::MAX
    }

    /// Whether discovery has bound the backend to a device
    fn is_bound(&self) -> bool {
        true
    }
}

/// Backend construction from the device tree at boot
pub trait Probe<B>: Backend + Sized {
    /// Build the backend on `bus` and run its discovery over `blob`
    fn probe(bus: B, blob: &[u8]) -> Result<Self, ScanError>;
}
