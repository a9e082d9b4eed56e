//! Confirmed value plus an optional optimistic edit.

/// A value mirrored from the server with at most one unconfirmed local edit.
///
/// The displayed value is the pending edit when there is one, the confirmed
/// value otherwise. Resolution either settles the edit (`confirm`) or drops
/// it (`rollback`); the two never silently diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked<T> {
    confirmed: T,
    pending: Option<T>,
}

impl<T: Clone> Tracked<T> {
    pub fn new(confirmed: T) -> Self {
        Self { confirmed, pending: None }
    }

    /// Value to display
    pub fn current(&self) -> &T {
        self.pending.as_ref().unwrap_or(&self.confirmed)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply an optimistic edit
    pub fn propose(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// Server accepted `value`, which may differ from a reloaded pending edit
    pub fn confirm(&mut self, value: T) {
        self.confirmed = value;
        self.pending = None;
    }

    /// Server rejected the edit
    pub fn rollback(&mut self) {
        self.pending = None;
    }

    /// Take a fresh server value without disturbing an in-flight edit
    pub fn refresh_confirmed(&mut self, value: T) {
        self.confirmed = value;
    }
}
