//! Global console slot
//!
//! Boot code owns its [`BootConsole`](crate::BootConsole). Code that cannot
//! be handed a reference (panic handlers, the `log` backend) reaches it
//! through the slot installed here instead.

use core::fmt;

use spin::Mutex;

type Slot = Option<&'static mut (dyn fmt::Write + Send)>;

static CONSOLE: Mutex<Slot> = Mutex::new(None);

/// Make `console` the target of the print macros and the logger
///
/// Returns the previously installed console, if any.
pub fn install(console: &'static mut (dyn fmt::Write + Send)) -> Slot {
    CONSOLE.lock().replace(console)
}

/// Empty the slot, returning what was installed
pub fn uninstall() -> Slot {
    CONSOLE.lock().take()
}

pub fn is_installed() -> bool {
    CONSOLE.lock().is_some()
}

/// Run `f` on the installed console
///
/// Returns `None` without calling `f` when nothing is installed or the
/// slot is already held further up the stack.
pub fn with_console<R>(f: impl FnOnce(&mut dyn fmt::Write) -> R) -> Option<R> {
    let mut slot = CONSOLE.try_lock()?;
    let console = slot.as_mut()?;
    Some(f(&mut **console))
}

#[doc(hidden)]
pub fn print(args: fmt::Arguments<'_>) {
    with_console(|console| {
        let _ = console.write_fmt(args);
    });
}

#[macro_export]
macro_rules! console_print {
    ($($arg:tt)*) => ($crate::global::print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! console_println {
    () => ($crate::console_print!("\n"));
    ($($arg:tt)*) => ($crate::console_print!("{}\n", format_args!($($arg)*)));
}
