//! gem5 console
//!
//! Writes go straight to the simulator through its console trap. There is
//! no input path.

use log::info;
use tilecon_fdt_scan::ScanError;

use super::{Backend, Probe};
use crate::bus::{Bus, SIM_STDOUT, SIM_STDOUT_NAME};
use crate::discovery::{self, GEM5_UART0};
use crate::handle::BackendHandle;

pub struct Gem5Console<B> {
    bus: B,
    handle: BackendHandle<()>,
}

impl<B: Bus> Gem5Console<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus,
            handle: BackendHandle::unbound(),
        }
    }

    /// Bind if the tree has a `gem5,uart0` node
    pub fn discover(&mut self, blob: &[u8]) -> Result<bool, ScanError> {
        discovery::discover(blob, GEM5_UART0, |_| self.handle.bind(()))?;
        Ok(self.handle.is_bound())
    }
}

impl<B: Bus> Backend for Gem5Console<B> {
    fn write_byte(&mut self, byte: u8) {
        self.write_block(&[byte]);
    }

    fn write_block(&mut self, buf: &[u8]) {
        if self.handle.is_bound() && !buf.is_empty() {
            self.bus.sim_print(buf, SIM_STDOUT, SIM_STDOUT_NAME);
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        None
    }

    fn is_bound(&self) -> bool {
        self.handle.is_bound()
    }
}

impl<B: Bus> Probe<B> for Gem5Console<B> {
    fn probe(bus: B, blob: &[u8]) -> Result<Self, ScanError> {
        let mut console = Self::new(bus);
        if console.discover(blob)? {
            info!("gem5-console: bound");
        }
        Ok(console)
    }
}
