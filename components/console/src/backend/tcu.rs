//! TCU print backend
//!
//! The TCU forwards console output to the host. Bytes are stored in its
//! print registers, then a PRINT command carrying the byte count is issued
//! and polled until the TCU clears it. On hardware every command is paced
//! by [`RateLimiter`]; on gem5 block writes additionally go through the
//! simulator trap.

use core::mem;

use static_assertions::const_assert_eq;
use tilecon_fdt_scan::ScanError;

use super::{Backend, Probe};
use crate::bus::{Bus, SIM_STDOUT, SIM_STDOUT_NAME};
use crate::env::{EnvBlock, Platform};
use crate::rate_limit::RateLimiter;
use crate::regs::{CtrlReg, TcuLayout, TcuWindow, MAX_PRINT_REGS, TCU_MMIO_BASE};

const STAGING_LEN: usize = MAX_PRINT_REGS * TcuWindow::REG_SIZE;

/// Word-aligned copy area for unaligned sources
#[repr(C, align(8))]
struct Staging([u8; STAGING_LEN]);

const_assert_eq!(mem::align_of::<Staging>(), TcuWindow::REG_SIZE);
const_assert_eq!(mem::size_of::<Staging>(), STAGING_LEN);

pub struct TcuConsole<B> {
    bus: B,
    window: TcuWindow,
    platform: Platform,
    limiter: RateLimiter,
    staging: Staging,
}

impl<B: Bus> TcuConsole<B> {
    /// Console on the TCU at the fixed MMIO base, for the platform named
    /// in `env`
    pub fn new(bus: B, env: EnvBlock, layout: &TcuLayout) -> Self {
        let platform = env.platform(&bus);
        Self::with_platform(bus, platform, layout)
    }

    pub fn with_platform(bus: B, platform: Platform, layout: &TcuLayout) -> Self {
        let window = layout.resolve(TCU_MMIO_BASE, platform);
        log::debug!(
            "tcu-console: {:?}, ctrl {:#x}, {} print regs",
            platform,
            window.ctrl_addr(CtrlReg::Time),
            window.print_regs()
        );
        Self {
            bus,
            window,
            platform,
            limiter: RateLimiter::default(),
            staging: Staging([0; STAGING_LEN]),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn window(&self) -> &TcuWindow {
        &self.window
    }

    fn pace(&mut self) {
        if self.platform == Platform::Hardware {
            let (bus, window) = (&self.bus, &self.window);
            self.limiter.wait(|| window.read_ctrl(bus, CtrlReg::Time));
        }
    }

    /// Issue PRINT for `len` bytes and wait for the TCU to finish
    fn commit(&self, len: usize) {
        self.window.write_ctrl(&self.bus, CtrlReg::Print, len as u64);
        while self.window.read_ctrl(&self.bus, CtrlReg::Print) != 0 {
            core::hint::spin_loop();
        }
    }
}

/// Store `data` into consecutive print registers without reading past it
fn store_words<B: Bus>(bus: &B, window: &TcuWindow, data: &[u8]) {
    // SAFETY: every bit pattern is a valid u64
    let (head, words, tail) = unsafe { data.align_to::<u64>() };
    if !head.is_empty() {
        for (i, chunk) in data.chunks(TcuWindow::REG_SIZE).enumerate() {
            window.write_print(bus, i, pack_word(chunk));
        }
        return;
    }
    for (i, &word) in words.iter().enumerate() {
        window.write_print(bus, i, word);
    }
    if !tail.is_empty() {
        window.write_print(bus, words.len(), pack_word(tail));
    }
}

/// Zero-padded native-endian word from up to eight bytes
fn pack_word(bytes: &[u8]) -> u64 {
    let mut word = [0u8; TcuWindow::REG_SIZE];
    word[..bytes.len()].copy_from_slice(bytes);
    u64::from_ne_bytes(word)
}

impl<B: Bus> Backend for TcuConsole<B> {
    fn write_byte(&mut self, byte: u8) {
        self.window.write_print(&self.bus, 0, byte as u64);
        self.pace();
        self.commit(1);
    }

    fn write_block(&mut self, buf: &[u8]) {
        let len = buf.len().min(self.window.max_print_len());
        if len == 0 {
            return;
        }
        let src = &buf[..len];
        if src.as_ptr().align_offset(TcuWindow::REG_SIZE) == 0 {
            store_words(&self.bus, &self.window, src);
        } else {
            let staged = &mut self.staging.0[..len];
            staged.copy_from_slice(src);
            store_words(&self.bus, &self.window, staged);
        }

        match self.platform {
            Platform::Hardware => self.pace(),
            Platform::Gem5 => self.bus.sim_print(src, SIM_STDOUT, SIM_STDOUT_NAME),
        }
        self.commit(len);
    }

    /// The TCU has no console input
    fn read_byte(&mut self) -> Option<u8> {
        None
    }

    fn max_block(&self) -> usize {
        self.window.max_print_len()
    }
}

impl<B: Bus> Probe<B> for TcuConsole<B> {
    fn probe(bus: B, _blob: &[u8]) -> Result<Self, ScanError> {
        Ok(Self::new(bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::TileId;
    use crate::mock::MockBus;
    use crate::rate_limit::MIN_TX_INTERVAL;

    #[repr(C, align(8))]
    struct Aligned([u8; 64]);

    fn hw() -> MockBus {
        MockBus::new(Platform::Hardware, TileId::new(0, 0))
    }

    #[test]
    fn test_platform_from_env() {
        let bus = MockBus::new(Platform::Gem5, TileId::new(0, 0));
        let console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT);
        assert_eq!(console.platform(), Platform::Gem5);

        let bus = hw();
        let console = TcuConsole::probe(&bus, &[]).unwrap();
        assert_eq!(console.platform(), Platform::Hardware);
        assert_eq!(console.max_block(), 255);
    }

    #[test]
    fn test_write_byte() {
        let bus = hw();
        let mut console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT);
        console.write_byte(b'x');

        assert_eq!(&*bus.tcu_output(), b"x");
        assert_eq!(&*bus.print_lens(), &[1]);
        assert_eq!(console.read_byte(), None);
    }

    #[test]
    fn test_block_truncated() {
        let bus = hw();
        let mut console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT);
        let mut data = [0u8; 300];
        for (i, b) in data.iter_mut().enumerate() {
            *b = b'a' + (i % 26) as u8;
        }
        console.write_block(&data);

        assert_eq!(&*bus.print_lens(), &[255]);
        assert_eq!(&*bus.tcu_output(), &data[..255]);
    }

    #[test]
    fn test_unaligned_source() {
        let bus = hw();
        let mut console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT);
        let mut buf = Aligned([0; 64]);
        buf.0[1..20].copy_from_slice(b"unaligned payload!\n");
        console.write_block(&buf.0[1..20]);
        console.write_block(&buf.0[8..13]);

        let out = bus.tcu_output();
        assert_eq!(&out[..19], b"unaligned payload!\n");
        assert_eq!(&out[19..], &buf.0[8..13]);
    }

    #[test]
    fn test_hardware_is_paced() {
        let bus = hw();
        let mut console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT);
        console.write_block(b"one\n");
        console.write_block(b"two\n");
        console.write_byte(b'!');

        let times = bus.print_times();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= MIN_TX_INTERVAL);
        assert!(times[2] - times[1] >= MIN_TX_INTERVAL);
        assert_eq!(bus.trap_count(), 0);
    }

    #[test]
    fn test_gem5_block_traps_unpaced() {
        let bus = MockBus::new(Platform::Gem5, TileId::new(0, 0));
        let mut console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT);
        console.write_block(b"sim\n");
        console.write_byte(b'c');

        assert_eq!(&*bus.trap_output(), b"sim\n");
        assert_eq!(bus.trap_count(), 1);
        assert_eq!(&*bus.tcu_output(), b"sim\nc");
        assert_eq!(console.limiter.last(), 0);
    }

    #[test]
    fn test_alternate_layout() {
        let layout = TcuLayout::REV_EXT2;
        let bus = hw().with_layout(layout);
        let mut console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &layout);
        assert_eq!(console.window(), &bus.tcu_window());

        console.write_block(b"layout\n");
        assert_eq!(&*bus.tcu_output(), b"layout\n");
    }

    #[test]
    fn test_empty_block() {
        let bus = hw();
        let mut console = TcuConsole::new(&bus, EnvBlock::DEFAULT, &TcuLayout::DEFAULT);
        console.write_block(&[]);
        assert_eq!(bus.print_count(), 0);
    }
}
