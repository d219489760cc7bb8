//! Register bus
//!
//! Every register access made by the console goes through [`Bus`], so the
//! same backend code drives real MMIO ([`PhysBus`]) and the simulated
//! register file used for host-side runs (`mock::MockBus`).

use core::ffi::CStr;

/// Access to physical registers and the simulator console trap
pub trait Bus {
    fn read32(&self, addr: usize) -> u32;

    fn write32(&self, addr: usize, value: u32);

    /// Atomically OR `value` into a 32-bit register
    ///
    /// Returns the previous register contents.
    fn fetch_or32(&self, addr: usize, value: u32) -> u32;

    fn read64(&self, addr: usize) -> u64;

    fn write64(&self, addr: usize, value: u64);

    /// Hand `buf` to the simulator's console trap
    ///
    /// `stream` selects the output stream, `name` is the destination stream
    /// name. Outside the simulator this does nothing.
    fn sim_print(&self, buf: &[u8], stream: usize, name: &CStr);
}

impl<T: Bus + ?Sized> Bus for &T {
    #[inline]
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    #[inline]
    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }

    #[inline]
    fn fetch_or32(&self, addr: usize, value: u32) -> u32 {
        (**self).fetch_or32(addr, value)
    }

    #[inline]
    fn read64(&self, addr: usize) -> u64 {
        (**self).read64(addr)
    }

    #[inline]
    fn write64(&self, addr: usize, value: u64) {
        (**self).write64(addr, value)
    }

    #[inline]
    fn sim_print(&self, buf: &[u8], stream: usize, name: &CStr) {
        (**self).sim_print(buf, stream, name)
    }
}

/// Custom instruction intercepted by gem5 as a console write
pub const SIM_PRINT_INSN: u32 = 0x9E00_007B;

/// Stream number and name the console trap writes to
pub const SIM_STDOUT: usize = 0;
pub const SIM_STDOUT_NAME: &CStr = c"stdout";

/// Volatile access to physical memory
///
/// Uncached device memory is assumed: no barriers beyond the volatile
/// access itself are issued.
#[derive(Clone, Copy)]
pub struct PhysBus {
    _private: (),
}

impl PhysBus {
    /// Create the physical bus
    ///
    /// # Safety
    /// Every address the console derives (UART window from the device tree,
    /// TCU window, environment block) must be mapped, device-typed memory
    /// for as long as the bus is used.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Bus for PhysBus {
    #[inline]
    fn read32(&self, addr: usize) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write32(&self, addr: usize, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }

    fn fetch_or32(&self, addr: usize, value: u32) -> u32 {
        cfg_if::cfg_if! {
            if #[cfg(target_has_atomic = "32")] {
                use core::sync::atomic::{AtomicU32, Ordering};
                // amoor.w on RISC-V
                let reg = unsafe { &*(addr as *const AtomicU32) };
                reg.fetch_or(value, Ordering::SeqCst)
            } else {
                let old = self.read32(addr);
                self.write32(addr, old | value);
                old
            }
        }
    }

    #[inline]
    fn read64(&self, addr: usize) -> u64 {
        unsafe { core::ptr::read_volatile(addr as *const u64) }
    }

    #[inline]
    fn write64(&self, addr: usize, value: u64) {
        unsafe { core::ptr::write_volatile(addr as *mut u64, value) }
    }

    fn sim_print(&self, buf: &[u8], stream: usize, name: &CStr) {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "riscv64")] {
                unsafe {
                    core::arch::asm!(
                        // SIM_PRINT_INSN
                        ".4byte 0x9E00007B",
                        in("a0") buf.as_ptr(),
                        in("a1") buf.len(),
                        in("a2") stream,
                        in("a3") name.as_ptr(),
                        options(nostack, preserves_flags),
                    );
                }
            } else {
                let _ = (buf, stream, name);
            }
        }
    }
}
