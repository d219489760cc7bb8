//! Transmit pacing
//!
//! Console traffic from FPGA tiles is relayed to the host over UDP. Sending
//! lines back to back drops packets, so every transmission first waits
//! until the TCU time counter has moved a fixed distance past the previous
//! one. This is coarse throttling, not a rate controller.

/// Minimum TCU time ticks between two transmissions
pub const MIN_TX_INTERVAL: u64 = 100_000;

/// Last-transmit clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    last: u64,
    interval: u64,
}

impl RateLimiter {
    pub const fn new(interval: u64) -> Self {
        Self { last: 0, interval }
    }

    pub const fn last(&self) -> u64 {
        self.last
    }

    /// Spin until `now()` is at least one interval past the last
    /// transmission, then record a fresh `now()` as the new reference.
    ///
    /// The wait has no timeout; a clock that never advances hangs here.
    pub fn wait<F: FnMut() -> u64>(&mut self, mut now: F) {
        while now().wrapping_sub(self.last) < self.interval {
            core::hint::spin_loop();
        }
        self.last = now();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MIN_TX_INTERVAL)
    }
}
