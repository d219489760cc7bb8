//! Typed register windows
//!
//! A window is a base address plus named register indices with a fixed
//! access width. Backends never compute register addresses themselves.

use bitflags::bitflags;

use crate::bus::Bus;
use crate::env::Platform;

/// SiFive UART registers (32-bit, consecutive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum UartReg {
    TxFifo = 0,
    RxFifo = 1,
    TxCtrl = 2,
    RxCtrl = 3,
    Ie = 4,
    Ip = 5,
    Div = 6,
}

bitflags! {
    /// TXCTRL register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxCtrl: u32 {
        const TXEN = 1 << 0;
    }
}

bitflags! {
    /// RXCTRL register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxCtrl: u32 {
        const RXEN = 1 << 0;
    }
}

/// FIFO registers report "full" (TX) or "empty" (RX) in bit 31
pub const FIFO_FLAG: u32 = 1 << 31;

/// SiFive UART register file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartWindow {
    base: usize,
}

impl UartWindow {
    pub const REG_SIZE: usize = 4;

    pub const fn new(base: usize) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> usize {
        self.base
    }

    pub const fn addr(&self, reg: UartReg) -> usize {
        self.base + reg as usize * Self::REG_SIZE
    }

    #[inline]
    pub fn read<B: Bus>(&self, bus: &B, reg: UartReg) -> u32 {
        bus.read32(self.addr(reg))
    }

    #[inline]
    pub fn write<B: Bus>(&self, bus: &B, reg: UartReg, value: u32) {
        bus.write32(self.addr(reg), value)
    }

    #[inline]
    pub fn fetch_or<B: Bus>(&self, bus: &B, reg: UartReg, value: u32) -> u32 {
        bus.fetch_or32(self.addr(reg), value)
    }
}

/// Physical base of the TCU's memory-mapped register file
pub const TCU_MMIO_BASE: usize = 0xf000_0000;

/// Upper bound on print registers, sized to the block staging buffer
pub const MAX_PRINT_REGS: usize = 32;

/// Unprivileged control registers used by the console (64-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum CtrlReg {
    /// Free-running time counter
    Time = 4,
    /// Print length; the TCU clears it once the line has been sent
    Print = 5,
}

/// Register counts that make up the TCU window
///
/// The counts differ between TCU revisions, and the number of endpoint
/// register groups in front of the print registers depends on whether the
/// code runs on gem5 or on hardware. [`TcuLayout::resolve`] turns a layout
/// into concrete addresses once the platform is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcuLayout {
    /// Extension registers preceding the control block
    pub ext_regs: usize,
    /// Size of the unprivileged control block
    pub ctrl_regs: usize,
    /// Registers per endpoint
    pub ep_regs: usize,
    /// Endpoints preceding the print registers on gem5
    pub endpoints_gem5: usize,
    /// Endpoints preceding the print registers on hardware
    pub endpoints_hw: usize,
    /// Print data registers
    pub print_regs: usize,
}

impl TcuLayout {
    /// Layout of the current TCU revision
    pub const DEFAULT: Self = Self {
        ext_regs: 5,
        ctrl_regs: 6,
        ep_regs: 3,
        endpoints_gem5: 0,
        endpoints_hw: 0,
        print_regs: MAX_PRINT_REGS,
    };

    /// Older revision with two extension registers
    pub const REV_EXT2: Self = Self {
        ext_regs: 2,
        ..Self::DEFAULT
    };

    /// Older revision with three extension registers
    pub const REV_EXT3: Self = Self {
        ext_regs: 3,
        ..Self::DEFAULT
    };

    pub const fn endpoints(&self, platform: Platform) -> usize {
        match platform {
            Platform::Gem5 => self.endpoints_gem5,
            Platform::Hardware => self.endpoints_hw,
        }
    }

    /// Compute the register window for `platform`
    ///
    /// `print_regs` is clamped to [`MAX_PRINT_REGS`] (and to at least one).
    pub fn resolve(&self, base: usize, platform: Platform) -> TcuWindow {
        let ctrl = base + self.ext_regs * TcuWindow::REG_SIZE;
        let print_index = self.ext_regs + self.ctrl_regs + self.ep_regs * self.endpoints(platform);
        TcuWindow {
            ctrl,
            print: base + print_index * TcuWindow::REG_SIZE,
            print_regs: self.print_regs.clamp(1, MAX_PRINT_REGS),
        }
    }
}

impl Default for TcuLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Resolved TCU console registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcuWindow {
    ctrl: usize,
    print: usize,
    print_regs: usize,
}

impl TcuWindow {
    pub const REG_SIZE: usize = 8;

    pub const fn ctrl_addr(&self, reg: CtrlReg) -> usize {
        self.ctrl + reg as usize * Self::REG_SIZE
    }

    pub const fn print_addr(&self, index: usize) -> usize {
        self.print + index * Self::REG_SIZE
    }

    pub const fn print_regs(&self) -> usize {
        self.print_regs
    }

    /// Longest transfer a single print command carries
    pub const fn max_print_len(&self) -> usize {
        self.print_regs * Self::REG_SIZE - 1
    }

    #[inline]
    pub fn read_ctrl<B: Bus>(&self, bus: &B, reg: CtrlReg) -> u64 {
        bus.read64(self.ctrl_addr(reg))
    }

    #[inline]
    pub fn write_ctrl<B: Bus>(&self, bus: &B, reg: CtrlReg, value: u64) {
        bus.write64(self.ctrl_addr(reg), value)
    }

    #[inline]
    pub fn write_print<B: Bus>(&self, bus: &B, index: usize, word: u64) {
        debug_assert!(index < self.print_regs);
        bus.write64(self.print_addr(index), word)
    }
}
