//! Build configuration and console composition
//!
//! The backend is chosen at compile time through cargo features:
//! - `console-tcu`: TCU print registers (default)
//! - `console-uart`: SiFive UART found through the device tree
//! - `console-gem5`: gem5 console trap
//! - `console-null`: no output
//!
//! When several are enabled the first one in the order null, uart, gem5,
//! tcu wins.

use log::info;
use tilecon_fdt_scan::ScanError;

use crate::backend::{Backend, Probe};
use crate::bus::Bus;
use crate::console::BootConsole;
use crate::discovery::ConsoleOptions;
use crate::env::{EnvBlock, EnvReader};

cfg_if::cfg_if! {
    if #[cfg(feature = "console-null")] {
        use crate::backend::NullConsole;

        pub const BACKEND: &str = "null";
        pub type DefaultConsole<B> = BootConsole<NullConsole, EnvReader<B>>;
    } else if #[cfg(feature = "console-uart")] {
        use crate::backend::SifiveUart;

        pub const BACKEND: &str = "sifive-uart";
        pub type DefaultConsole<B> = BootConsole<SifiveUart<B>, EnvReader<B>>;
    } else if #[cfg(feature = "console-gem5")] {
        use crate::backend::Gem5Console;

        pub const BACKEND: &str = "gem5";
        pub type DefaultConsole<B> = BootConsole<Gem5Console<B>, EnvReader<B>>;
    } else {
        use crate::backend::TcuConsole;

        pub const BACKEND: &str = "tcu";
        pub type DefaultConsole<B> = BootConsole<TcuConsole<B>, EnvReader<B>>;
    }
}

/// Build the boot console from the device tree at `blob`
///
/// Reads the console options, probes the compiled-in backend and reads
/// the tile identity from the environment block. Must run once, early in
/// boot, before anything prints.
pub fn init_console<B: Bus + Copy>(bus: B, blob: &[u8]) -> Result<DefaultConsole<B>, ScanError> {
    let options = ConsoleOptions::discover(blob)?;
    let console: DefaultConsole<B> = compose(bus, blob, options)?;
    info!(
        "console: {} backend, {}, {}",
        BACKEND,
        if console.backend().is_bound() { "bound" } else { "unbound" },
        if options.buffering { "line buffered" } else { "unbuffered" }
    );
    Ok(console)
}

fn compose<B, K>(bus: B, blob: &[u8], options: ConsoleOptions) -> Result<BootConsole<K, EnvReader<B>>, ScanError>
where
    B: Bus + Copy,
    K: Backend + Probe<B>,
{
    let backend = K::probe(bus, blob)?;
    Ok(BootConsole::new(backend, EnvReader::new(bus, EnvBlock::DEFAULT), options))
}

/// Build the boot console from a blob at a physical address
///
/// # Safety
/// `addr` must point to a valid flattened device tree that stays mapped
/// and unmodified for the duration of the call.
pub unsafe fn init_console_raw<B: Bus + Copy>(bus: B, addr: usize) -> Result<DefaultConsole<B>, ScanError> {
    let blob = unsafe { tilecon_fdt_scan::blob_at(addr)? };
    init_console(bus, blob)
}
