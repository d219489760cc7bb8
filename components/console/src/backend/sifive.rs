//! SiFive UART backend
//!
//! Memory-mapped UART with 32-bit registers. The TX FIFO register reads
//! negative while the FIFO is full; the RX FIFO register reads negative
//! while it is empty.

use log::{debug, info};
use tilecon_fdt_scan::ScanError;

use super::{Backend, Probe};
use crate::bus::Bus;
use crate::discovery::{self, SIFIVE_UART0};
use crate::handle::BackendHandle;
use crate::regs::{RxCtrl, TxCtrl, UartReg, UartWindow, FIFO_FLAG};

/// How the TX path waits for FIFO space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPoll {
    /// Atomically OR the byte into TXFIFO until the old value is non-negative
    AtomicOr,
    /// Spin on TXFIFO until non-negative, then store the byte
    ReadThenWrite,
}

impl TxPoll {
    /// Strategy matching the target's atomic support
    pub const NATIVE: Self = if cfg!(target_has_atomic = "32") {
        TxPoll::AtomicOr
    } else {
        TxPoll::ReadThenWrite
    };
}

/// Line settings applied when the UART is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    pub input_clock_hz: u64,
    pub baud: u64,
    pub tx_poll: TxPoll,
}

impl UartConfig {
    pub const DEFAULT: Self = Self {
        input_clock_hz: 80_000_000,
        baud: 115_200,
        tx_poll: TxPoll::NATIVE,
    };

    /// Baud divisor: `ceil(clock / baud) - 1`
    pub const fn divisor(&self) -> u32 {
        let div = (self.input_clock_hz + self.baud - 1) / self.baud;
        div.saturating_sub(1) as u32
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub struct SifiveUart<B> {
    bus: B,
    config: UartConfig,
    handle: BackendHandle<UartWindow>,
}

impl<B: Bus> SifiveUart<B> {
    pub const fn new(bus: B, config: UartConfig) -> Self {
        Self {
            bus,
            config,
            handle: BackendHandle::unbound(),
        }
    }

    /// Bind to the UART at `base` and program it
    ///
    /// Only the first call binds; later calls leave the device untouched
    /// and return `false`.
    pub fn bind(&mut self, base: usize) -> bool {
        let window = UartWindow::new(base);
        if !self.handle.bind(window) {
            debug!("sifive-uart: already bound, ignoring {:#x}", base);
            return false;
        }
        let div = self.config.divisor();
        window.write(&self.bus, UartReg::TxCtrl, TxCtrl::TXEN.bits());
        window.write(&self.bus, UartReg::RxCtrl, RxCtrl::RXEN.bits());
        window.write(&self.bus, UartReg::Div, div);
        info!("sifive-uart: bound at {:#x}, divisor {}", base, div);
        true
    }

    /// Scan `blob` for a `sifive,uart0` node and bind to the first one
    ///
    /// Returns whether the UART is bound afterwards.
    pub fn discover(&mut self, blob: &[u8]) -> Result<bool, ScanError> {
        discovery::discover(blob, SIFIVE_UART0, |reg| {
            usize::try_from(reg).map_or(false, |base| self.bind(base))
        })?;
        Ok(self.handle.is_bound())
    }

    /// Base address of the bound UART
    pub fn base(&self) -> Option<usize> {
        self.handle.get().map(|w| w.base())
    }
}

impl<B: Bus> Backend for SifiveUart<B> {
    fn write_byte(&mut self, byte: u8) {
        let Some(window) = self.handle.get() else {
            return;
        };
        match self.config.tx_poll {
            TxPoll::AtomicOr => {
                while window.fetch_or(&self.bus, UartReg::TxFifo, byte as u32) & FIFO_FLAG != 0 {
                    core::hint::spin_loop();
                }
            }
            TxPoll::ReadThenWrite => {
                while window.read(&self.bus, UartReg::TxFifo) & FIFO_FLAG != 0 {
                    core::hint::spin_loop();
                }
                window.write(&self.bus, UartReg::TxFifo, byte as u32);
            }
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let window = self.handle.get()?;
        let value = window.read(&self.bus, UartReg::RxFifo);
        if value & FIFO_FLAG != 0 {
            return None;
        }
        Some(value as u8)
    }

    fn is_bound(&self) -> bool {
        self.handle.is_bound()
    }
}

impl<B: Bus> Probe<B> for SifiveUart<B> {
    fn probe(bus: B, blob: &[u8]) -> Result<Self, ScanError> {
        let mut uart = Self::new(bus, UartConfig::DEFAULT);
        if !uart.discover(blob)? {
            info!("sifive-uart: no device found, output discarded");
        }
        Ok(uart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Platform, TileId};
    use crate::mock::MockBus;
    use crate::testutil::{tree, Node};

    const BASE: usize = 0x1001_0000;

    fn bus() -> MockBus {
        MockBus::new(Platform::Hardware, TileId::new(0, 0)).with_uart(BASE)
    }

    #[test]
    fn test_divisor() {
        assert_eq!(UartConfig::DEFAULT.divisor(), 694);
        let exact = UartConfig {
            input_clock_hz: 1_000,
            baud: 100,
            tx_poll: TxPoll::AtomicOr,
        };
        assert_eq!(exact.divisor(), 9);
    }

    #[test]
    fn test_bind_programs_device() {
        let bus = bus();
        let mut uart = SifiveUart::new(&bus, UartConfig::DEFAULT);
        assert!(uart.bind(BASE));

        let w = UartWindow::new(BASE);
        assert_eq!(bus.reg(w.addr(UartReg::TxCtrl)), 1);
        assert_eq!(bus.reg(w.addr(UartReg::RxCtrl)), 1);
        assert_eq!(bus.reg(w.addr(UartReg::Div)), 694);
    }

    #[test]
    fn test_second_bind_ignored() {
        let bus = bus();
        let mut uart = SifiveUart::new(&bus, UartConfig::DEFAULT);
        assert!(uart.bind(BASE));
        assert!(!uart.bind(0x2000_0000));
        assert_eq!(uart.base(), Some(BASE));
        assert_eq!(bus.reg(UartWindow::new(0x2000_0000).addr(UartReg::Div)), 0);
    }

    #[test]
    fn test_discover_twice_is_idempotent() {
        let blob = tree(&[
            Node::uart("serial@10010000", BASE as u64),
            Node::uart("serial@10011000", 0x1001_1000),
        ]);
        let bus = bus();
        let mut uart = SifiveUart::new(&bus, UartConfig::DEFAULT);
        assert!(uart.discover(&blob).unwrap());
        assert!(uart.discover(&blob).unwrap());
        assert_eq!(uart.base(), Some(BASE));
    }

    #[test]
    fn test_unbound_drops_writes() {
        let blob = tree(&[Node::new("cpus")]);
        let bus = bus();
        let mut uart = SifiveUart::probe(&bus, &blob).unwrap();
        assert!(!uart.is_bound());

        uart.write_byte(b'x');
        uart.write_block(b"lost");
        assert!(bus.uart_output().is_empty());
        assert_eq!(uart.read_byte(), None);
    }

    #[test]
    fn test_tx_waits_for_fifo() {
        for poll in [TxPoll::AtomicOr, TxPoll::ReadThenWrite] {
            let bus = bus();
            let config = UartConfig {
                tx_poll: poll,
                ..UartConfig::DEFAULT
            };
            let mut uart = SifiveUart::new(&bus, config);
            uart.bind(BASE);

            bus.set_tx_busy(3);
            uart.write_block(b"ok");
            assert_eq!(&*bus.uart_output(), b"ok");
        }
    }

    #[test]
    fn test_rx() {
        let bus = bus();
        let mut uart = SifiveUart::new(&bus, UartConfig::DEFAULT);
        uart.bind(BASE);

        assert_eq!(uart.read_byte(), None);
        bus.push_rx(b"ab");
        assert_eq!(uart.read_byte(), Some(b'a'));
        assert_eq!(uart.read_byte(), Some(b'b'));
        assert_eq!(uart.read_byte(), None);
    }
}
