//! Ledger of keys currently held down on the target.
//!
//! `Hold` bindings press their keys at dispatch and keep them down until the
//! action ends. Every key pressed through [`HeldKeys::press`] is recorded
//! here and released by [`HeldKeys::release_all`], which the orchestrator
//! calls on completion, interruption, reset, close and step errors.
//!
//! Release needs the async target, so it cannot happen in `Drop`. Dropping
//! a non-empty ledger logs a warning naming the stuck keys.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::target::{BoundaryError, TargetProcess};

/// Keys toggled on and not yet released.
#[derive(Debug, Default)]
pub struct HeldKeys {
    keys: BTreeSet<String>,
}

impl HeldKeys {
    /// An empty ledger.
    pub const fn new() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    /// Whether no key is held.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys currently held, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Press each key in `keys` that is not already held.
    ///
    /// Keys pressed before a failure stay in the ledger so that a later
    /// [`HeldKeys::release_all`] lets go of them.
    ///
    /// # Errors
    ///
    /// Returns the first [`BoundaryError`] raised by the target.
    pub async fn press<T: TargetProcess>(
        &mut self,
        target: &mut T,
        keys: &[String],
    ) -> Result<(), BoundaryError> {
        for key in keys {
            if self.keys.contains(key) {
                continue;
            }
            target.toggle_key(key, true).await?;
            debug!(key = %key, "Key held");
            self.keys.insert(key.clone());
        }
        Ok(())
    }

    /// Release every held key.
    ///
    /// Every key is attempted even if an earlier release fails. Keys whose
    /// release failed stay in the ledger.
    ///
    /// # Errors
    ///
    /// Returns the first [`BoundaryError`] raised by the target.
    pub async fn release_all<T: TargetProcess>(
        &mut self,
        target: &mut T,
    ) -> Result<(), BoundaryError> {
        let mut first_error = None;
        for key in std::mem::take(&mut self.keys) {
            match target.toggle_key(&key, false).await {
                Ok(()) => debug!(key = %key, "Key released"),
                Err(err) => {
                    warn!(key = %key, error = %err, "Failed to release key");
                    self.keys.insert(key);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for HeldKeys {
    fn drop(&mut self) {
        if !self.keys.is_empty() {
            let keys: Vec<&str> = self.keys().collect();
            warn!(?keys, "Input ledger dropped with keys still held");
        }
    }
}
