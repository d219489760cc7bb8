//! Tile boot console
//!
//! Early boot output for tiles that may sit behind a SiFive UART, print
//! through the TCU, or run inside gem5. Boot code builds one
//! [`BootConsole`] (usually through [`config::init_console`]), which
//! prefixes every line with the tile identity, collects whole lines and
//! hands them to the backend compiled into the build.
//!
//! ```ignore
//! let bus = unsafe { PhysBus::new() };
//! let mut console = tilecon_console::config::init_console(bus, dtb)?;
//! writeln!(console, "tile up")?;
//! ```
//!
//! All register traffic goes through [`bus::Bus`], so the same code runs
//! against `mock::MockBus` (feature `mock`) on a development host.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod backend;
pub mod bus;
pub mod config;
pub mod console;
pub mod discovery;
pub mod env;
pub mod global;
pub mod handle;
pub mod line;
pub mod logger;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod rate_limit;
pub mod regs;

#[cfg(test)]
mod testutil;

pub use backend::{Backend, Gem5Console, NullConsole, Probe, SifiveUart, TcuConsole};
pub use bus::{Bus, PhysBus};
pub use console::BootConsole;
pub use discovery::ConsoleOptions;
pub use env::{EnvBlock, EnvReader, Identity, Platform, TileId};
pub use handle::BackendHandle;
pub use tilecon_fdt_scan::ScanError;
