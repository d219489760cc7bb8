//! Write-once backend handle

/// Binding of a backend to its hardware
///
/// Starts unbound; [`BackendHandle::bind`] succeeds exactly once and every
/// later call leaves the first value in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHandle<T> {
    bound: Option<T>,
}

impl<T: Copy> BackendHandle<T> {
    pub const fn unbound() -> Self {
        Self { bound: None }
    }

    /// Bind to `value` unless already bound
    ///
    /// Returns `true` if this call performed the binding.
    pub fn bind(&mut self, value: T) -> bool {
        if self.bound.is_some() {
            return false;
        }
        self.bound = Some(value);
        true
    }

    #[inline]
    pub fn get(&self) -> Option<T> {
        self.bound
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }
}

impl<T: Copy> Default for BackendHandle<T> {
    fn default() -> Self {
        Self::unbound()
    }
}
