//! Freeze controller.
//!
//! While frozen, values keep arriving but are held back; only the newest one
//! survives. Unfreezing releases that single value.

/// Gates propagation of values to the presentation boundary.
#[derive(Debug, Clone)]
pub struct FreezeController<T> {
    frozen: bool,
    pending: Option<T>,
}

impl<T> Default for FreezeController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FreezeController<T> {
    /// Creates an unfrozen controller.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frozen: false,
            pending: None,
        }
    }

    /// Returns true while frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Returns the value held back while frozen, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Offers a freshly computed value.
    ///
    /// Returns it for propagation when unfrozen. When frozen it replaces any
    /// held value and nothing is returned.
    pub fn offer(&mut self, value: T) -> Option<T> {
        if self.frozen {
            self.pending = Some(value);
            None
        } else {
            Some(value)
        }
    }

    /// Flips the frozen flag.
    ///
    /// Returns the newest value held back when this call unfreezes.
    pub fn toggle_freeze(&mut self) -> Option<T> {
        if self.frozen {
            self.unfreeze()
        } else {
            self.freeze();
            None
        }
    }

    /// Freezes. No-op if already frozen.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Unfreezes and returns the newest held value.
    pub fn unfreeze(&mut self) -> Option<T> {
        self.frozen = false;
        self.pending.take()
    }
}
