//! Simulated register file
//!
//! `MockBus` stands in for the physical bus when the console runs on a
//! development host. It behaves like the devices the backends talk to:
//!
//! - the TCU acknowledges a PRINT command one poll after it was issued and
//!   captures the printed bytes from the print registers,
//! - the TCU TIME register advances by a fixed tick on every read,
//! - the UART TX FIFO can be made to report "full" for a number of polls,
//!   and the RX FIFO hands out queued bytes,
//! - the simulator trap records what it was given.
//!
//! Everything else is plain storage. No allocation is needed.

use core::cell::{Cell, Ref, RefCell};
use core::ffi::CStr;

use crate::bus::Bus;
use crate::env::{EnvBlock, Platform, TileId, ENV_START};
use crate::regs::{CtrlReg, TcuLayout, TcuWindow, UartReg, UartWindow, FIFO_FLAG, TCU_MMIO_BASE};

const SLOTS: usize = 128;
const OUTPUT_LEN: usize = 4096;
const HISTORY_LEN: usize = 128;

/// Default TIME increment per read
pub const DEFAULT_TICK: u64 = 25_000;

/// Fixed-capacity append-only log
pub struct Log<T, const N: usize> {
    items: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> Log<T, N> {
    fn new() -> Self {
        Self {
            items: [T::default(); N],
            len: 0,
        }
    }

    fn push(&mut self, item: T) {
        assert!(self.len < N, "mock log capacity exceeded");
        self.items[self.len] = item;
        self.len += 1;
    }

    fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }
}

/// Sparse register storage
struct Registers {
    slots: [(usize, u64); SLOTS],
    len: usize,
}

impl Registers {
    fn new() -> Self {
        Self {
            slots: [(0, 0); SLOTS],
            len: 0,
        }
    }

    fn get(&self, addr: usize) -> u64 {
        self.slots[..self.len]
            .iter()
            .find(|(a, _)| *a == addr)
            .map_or(0, |(_, v)| *v)
    }

    fn set(&mut self, addr: usize, value: u64) {
        if let Some(slot) = self.slots[..self.len].iter_mut().find(|(a, _)| *a == addr) {
            slot.1 = value;
            return;
        }
        assert!(self.len < SLOTS, "mock register file full");
        self.slots[self.len] = (addr, value);
        self.len += 1;
    }
}

/// Host-side stand-in for [`crate::bus::PhysBus`]
pub struct MockBus {
    platform: Platform,
    tcu: TcuWindow,
    uart: Option<UartWindow>,
    regs: RefCell<Registers>,
    time: Cell<u64>,
    tick: Cell<u64>,
    pending_ack: Cell<u64>,
    tx_busy: Cell<u32>,
    rx: RefCell<Log<u8, 256>>,
    rx_pos: Cell<usize>,
    tcu_out: RefCell<Log<u8, OUTPUT_LEN>>,
    uart_out: RefCell<Log<u8, OUTPUT_LEN>>,
    trap_out: RefCell<Log<u8, OUTPUT_LEN>>,
    print_lens: RefCell<Log<usize, HISTORY_LEN>>,
    print_times: RefCell<Log<u64, HISTORY_LEN>>,
    traps: Cell<usize>,
}

impl MockBus {
    /// Register file with the default TCU layout and an environment block
    /// describing `platform` and `tile`
    pub fn new(platform: Platform, tile: TileId) -> Self {
        let bus = Self {
            platform,
            tcu: TcuLayout::DEFAULT.resolve(TCU_MMIO_BASE, platform),
            uart: None,
            regs: RefCell::new(Registers::new()),
            time: Cell::new(0),
            tick: Cell::new(DEFAULT_TICK),
            pending_ack: Cell::new(0),
            tx_busy: Cell::new(0),
            rx: RefCell::new(Log::new()),
            rx_pos: Cell::new(0),
            tcu_out: RefCell::new(Log::new()),
            uart_out: RefCell::new(Log::new()),
            trap_out: RefCell::new(Log::new()),
            print_lens: RefCell::new(Log::new()),
            print_times: RefCell::new(Log::new()),
            traps: Cell::new(0),
        };
        let env = EnvBlock::new(ENV_START);
        let platform_word = match platform {
            Platform::Gem5 => 0,
            Platform::Hardware => 1,
        };
        bus.regs.borrow_mut().set(env.word_addr(0), platform_word);
        bus.regs.borrow_mut().set(env.word_addr(1), tile.raw());
        bus
    }

    /// Model a TCU with a different register layout
    pub fn with_layout(mut self, layout: TcuLayout) -> Self {
        self.tcu = layout.resolve(TCU_MMIO_BASE, self.platform);
        self
    }

    /// Place a SiFive UART at `base`
    pub fn with_uart(mut self, base: usize) -> Self {
        self.uart = Some(UartWindow::new(base));
        self
    }

    /// TIME increment per read
    pub fn with_tick(self, tick: u64) -> Self {
        self.tick.set(tick);
        self
    }

    pub fn tcu_window(&self) -> TcuWindow {
        self.tcu
    }

    /// Report a full TX FIFO for the next `polls` TX register accesses
    pub fn set_tx_busy(&self, polls: u32) {
        self.tx_busy.set(polls);
    }

    /// Queue bytes for the UART RX FIFO
    pub fn push_rx(&self, bytes: &[u8]) {
        let mut rx = self.rx.borrow_mut();
        for &b in bytes {
            rx.push(b);
        }
    }

    /// Current contents of a plain storage register
    pub fn reg(&self, addr: usize) -> u64 {
        self.regs.borrow().get(addr)
    }

    /// Bytes delivered through TCU PRINT commands
    pub fn tcu_output(&self) -> Ref<'_, [u8]> {
        Ref::map(self.tcu_out.borrow(), |log| log.as_slice())
    }

    /// Bytes transmitted by the UART
    pub fn uart_output(&self) -> Ref<'_, [u8]> {
        Ref::map(self.uart_out.borrow(), |log| log.as_slice())
    }

    /// Bytes handed to the simulator trap
    pub fn trap_output(&self) -> Ref<'_, [u8]> {
        Ref::map(self.trap_out.borrow(), |log| log.as_slice())
    }

    /// Length of every PRINT command, in issue order
    pub fn print_lens(&self) -> Ref<'_, [usize]> {
        Ref::map(self.print_lens.borrow(), |log| log.as_slice())
    }

    /// TIME counter value at every PRINT command
    pub fn print_times(&self) -> Ref<'_, [u64]> {
        Ref::map(self.print_times.borrow(), |log| log.as_slice())
    }

    pub fn print_count(&self) -> usize {
        self.print_lens.borrow().len
    }

    pub fn trap_count(&self) -> usize {
        self.traps.get()
    }

    fn uart_reg(&self, addr: usize) -> Option<UartReg> {
        let uart = self.uart?;
        [UartReg::TxFifo, UartReg::RxFifo]
            .into_iter()
            .find(|reg| uart.addr(*reg) == addr)
    }

    fn tx_full(&self) -> bool {
        match self.tx_busy.get() {
            0 => false,
            n => {
                self.tx_busy.set(n - 1);
                true
            }
        }
    }

    fn rx_pop(&self) -> u32 {
        let rx = self.rx.borrow();
        let pos = self.rx_pos.get();
        match rx.as_slice().get(pos) {
            Some(&b) => {
                self.rx_pos.set(pos + 1);
                b as u32
            }
            None => FIFO_FLAG,
        }
    }

    fn capture_print(&self, len: usize) {
        let regs = self.regs.borrow();
        let mut out = self.tcu_out.borrow_mut();
        let words = len.div_ceil(TcuWindow::REG_SIZE);
        let mut remaining = len;
        for i in 0..words {
            let bytes = regs.get(self.tcu.print_addr(i)).to_ne_bytes();
            let take = remaining.min(bytes.len());
            for &b in &bytes[..take] {
                out.push(b);
            }
            remaining -= take;
        }
        self.print_lens.borrow_mut().push(len);
        self.print_times.borrow_mut().push(self.time.get());
    }
}

impl Bus for MockBus {
    fn read32(&self, addr: usize) -> u32 {
        match self.uart_reg(addr) {
            Some(UartReg::TxFifo) => {
                if self.tx_full() {
                    FIFO_FLAG
                } else {
                    0
                }
            }
            Some(UartReg::RxFifo) => self.rx_pop(),
            _ => self.regs.borrow().get(addr) as u32,
        }
    }

    fn write32(&self, addr: usize, value: u32) {
        match self.uart_reg(addr) {
            Some(UartReg::TxFifo) => self.uart_out.borrow_mut().push(value as u8),
            Some(_) => {}
            None => self.regs.borrow_mut().set(addr, value as u64),
        }
    }

    fn fetch_or32(&self, addr: usize, value: u32) -> u32 {
        match self.uart_reg(addr) {
            Some(UartReg::TxFifo) => {
                if self.tx_full() {
                    return FIFO_FLAG;
                }
                self.uart_out.borrow_mut().push(value as u8);
                0
            }
            _ => {
                let old = self.read32(addr);
                self.write32(addr, old | value);
                old
            }
        }
    }

    fn read64(&self, addr: usize) -> u64 {
        if addr == self.tcu.ctrl_addr(CtrlReg::Time) {
            let now = self.time.get();
            self.time.set(now.wrapping_add(self.tick.get()));
            return now;
        }
        if addr == self.tcu.ctrl_addr(CtrlReg::Print) {
            let pending = self.pending_ack.get();
            if pending == 0 {
                return 0;
            }
            // first poll still sees the command, the next one the ack
            self.pending_ack.set(0);
            return pending;
        }
        self.regs.borrow().get(addr)
    }

    fn write64(&self, addr: usize, value: u64) {
        if addr == self.tcu.ctrl_addr(CtrlReg::Time) {
            return;
        }
        if addr == self.tcu.ctrl_addr(CtrlReg::Print) {
            if value != 0 {
                self.capture_print(value as usize);
                self.pending_ack.set(value);
            }
            return;
        }
        self.regs.borrow_mut().set(addr, value);
    }

    fn sim_print(&self, buf: &[u8], stream: usize, name: &CStr) {
        assert_eq!(stream, 0, "console trap must target stream 0");
        assert_eq!(name.to_bytes(), b"stdout");
        let mut out = self.trap_out.borrow_mut();
        for &b in buf {
            out.push(b);
        }
        self.traps.set(self.traps.get() + 1);
    }
}
