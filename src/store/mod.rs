//! Shared, synchronized in-memory stores.
//!
//! `KeyStore` and `ActivityLog` each own an independent lock, so allow-list
//! traffic never waits on audit traffic. Every mutation reports one of three
//! outcomes:
//!
//! - `Ok(Some(slot))`: the store changed; `slot` is the 1-based position touched
//! - `Ok(None)`: nothing changed (duplicate, absent or full)
//! - `Err(Error::Lock(_))`: the lock could not be acquired
//!
//! Callers rely on telling the first two apart (only a real change pulses the
//! amber indicator), so the no-op outcome is never folded into an error.

mod activity;
mod keys;

pub use activity::{AccessStatus, ActivityEntry, ActivityLog, MAX_LOG};
pub use keys::{KeyStore, MAX_VALID_KEYS};

use std::num::NonZeroUsize;

/// 1-based slot index returned by a successful mutation.
pub type Slot = NonZeroUsize;

fn slot(index: usize) -> Slot {
    NonZeroUsize::MIN.saturating_add(index)
}
